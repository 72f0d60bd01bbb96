//! # vizsim
//!
//! Content-based image retrieval: describe images by what they look like,
//! then find the corpus entries that look most alike.
//!
//! An image (or an object cropped out of it) is reduced to a
//! [`DescriptorSet`] of independent visual channels: color histograms,
//! dominant colors, Tamura texture, Gabor responses, Hu moments and HOG.
//! Two sets are compared channel by channel and the weighted distances are
//! averaged into a single score, lower meaning more alike.
//!
//! ## Quick Start
//!
//! ### As a CLI
//!
//! ```bash
//! vizsim describe photo.jpg
//! vizsim search --query photo.jpg --corpus ./images --k 5
//! ```
//!
//! ### As a Library
//!
//! ```rust,no_run
//! use std::path::Path;
//! use vizsim::prelude::*;
//!
//! let extractor = DescriptorExtractor::default();
//! let ingestor = Ingestor::new(&extractor, &FsImageLoader);
//!
//! let corpus = InMemoryCorpus::new();
//! for (_, outcome) in ingestor.ingest_batch(&list_images(Path::new("./images")).unwrap()) {
//!     if let Ok(ingested) = outcome {
//!         corpus.insert(ingested.record).unwrap();
//!     }
//! }
//!
//! let query = extractor.extract_path(&FsImageLoader, Path::new("query.jpg")).unwrap();
//! let ranker = SimilarityRanker::default();
//! let results = ranker.rank_corpus(&query, &corpus, &RankRequest::new(5)).unwrap();
//! ```
//!
//! ## Crate Structure
//!
//! - [`vizsim-core`](vizsim_core) - Data model, errors, collaborator traits, in-memory corpus
//! - [`vizsim-extract`](vizsim_extract) - Descriptor extraction, image loading, ingestion
//! - [`vizsim-similarity`](vizsim_similarity) - Distances, weights, comparator, ranker

pub mod config;

pub use config::AppConfig;

// Re-export core types
pub use vizsim_core::{
    BoundingBox, Channel, ColorHistogram, Corpus, CorpusItem, DescriptorSet, DetectedObject,
    DominantColor, Error, ImageId, ImageLoader, ImageRecord, InMemoryCorpus, NoDetector,
    ObjectDetector, Raster, Result, Tamura,
};

// Re-export extraction
pub use vizsim_extract::{
    list_images, DescriptorExtractor, Extraction, ExtractorConfig, FsImageLoader, IngestFailure,
    Ingested, Ingestor, DEFAULT_MIN_CONFIDENCE,
};

// Re-export similarity
pub use vizsim_similarity::{
    compare, ChannelScore, ChannelWeights, Comparison, DescriptorComparator, ExplainedMatch,
    MatchInfo, RankMode, RankRequest, RankedMatch, RankingStats, SearchResponse,
    SimilarityRanker,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        compare, list_images, AppConfig, ChannelWeights, Corpus, DescriptorComparator,
        DescriptorExtractor, DescriptorSet, DetectedObject, Error, FsImageLoader, ImageRecord,
        InMemoryCorpus, Ingested, Ingestor, ObjectDetector, RankMode, RankRequest, Result,
        SimilarityRanker,
    };
}
