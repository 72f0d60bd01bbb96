//! # vizsim Similarity
//!
//! Weighted comparison of descriptor sets and top-k ranking of a corpus,
//! with per-channel explanations.
//!
//! ## Scoring
//!
//! Each channel present on both sides yields a distance (0.0 is identical).
//! The score is the weighted mean of those distances over the channels that
//! could be compared, or `+∞` when none could.
//!
//! ## Example
//!
//! ```rust
//! use vizsim_core::{DescriptorSet, ImageRecord, Tamura};
//! use vizsim_similarity::{RankMode, SimilarityRanker};
//!
//! let texture = |roughness| DescriptorSet {
//!     tamura: Some(Tamura { roughness, contrast: 10.0, directionality: 0.5 }),
//!     ..Default::default()
//! };
//! let corpus = vec![
//!     ImageRecord::new("rough", Some(texture(8.0))),
//!     ImageRecord::new("smooth", Some(texture(1.0))),
//! ];
//!
//! let ranker = SimilarityRanker::default();
//! let results = ranker.rank(&texture(1.5), &corpus, 1, RankMode::WholeImage).unwrap();
//! assert_eq!(results[0].id.to_string(), "smooth");
//! ```

pub mod compare;
pub mod distance;
pub mod explain;
pub mod rank;
pub mod weights;

pub use compare::{compare, ChannelScore, Comparison, DescriptorComparator, Outcome};
pub use distance::{SkipReason, HU_SCALE, TAMURA_SCALE};
pub use explain::{ExplainedMatch, RankingStats, SearchResponse};
pub use rank::{MatchInfo, RankMode, RankRequest, RankedMatch, SimilarityRanker};
pub use weights::ChannelWeights;
