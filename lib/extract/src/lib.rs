//! # vizsim Extract
//!
//! Computes the [`DescriptorSet`](vizsim_core::DescriptorSet) of an image or
//! of an object crop.
//!
//! ## Channels
//!
//! - **Color histograms**: RGB and 8-bit HSV, each sub-channel normalised to a distribution
//! - **Dominant colors**: seeded k-means palette, largest cluster first
//! - **Tamura**: roughness, contrast, directionality
//! - **Gabor**: mean and spread of a frequency x orientation filter bank
//! - **Hu moments**: seven invariants on a signed log scale
//! - **HOG**: block-normalised gradient orientation histograms
//!
//! ## Example
//!
//! ```rust
//! use image::{Rgb, RgbImage};
//! use vizsim_extract::DescriptorExtractor;
//!
//! let image = RgbImage::from_fn(32, 32, |x, y| Rgb([(x * 8) as u8, (y * 8) as u8, 40]));
//! let extractor = DescriptorExtractor::default();
//! let descriptors = extractor.extract(&image).unwrap();
//! assert_eq!(descriptors.gabor.unwrap().len(), 64);
//! ```

pub mod color;
pub mod config;
pub mod dominant;
pub mod extractor;
pub mod gabor;
pub mod hog;
pub mod hu;
pub mod ingest;
pub mod loader;
pub mod plane;
pub mod tamura;

pub use config::{DominantConfig, ExtractorConfig, GaborConfig, HistogramConfig, HogConfig};
pub use extractor::{crop, DescriptorExtractor, Extraction};
pub use ingest::{IngestFailure, Ingested, Ingestor, DEFAULT_MIN_CONFIDENCE};
pub use loader::{decode, list_images, FsImageLoader};
