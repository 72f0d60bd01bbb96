//! # vizsim Core
//!
//! Core data model for the vizsim image retrieval engine.
//!
//! This crate provides the types every other vizsim crate speaks:
//!
//! - [`DescriptorSet`] - Multi-channel visual fingerprint, one optional field per channel
//! - [`ImageRecord`] - An image's whole-image descriptors plus its detected objects
//! - [`DetectedObject`] - Class label, confidence and box from an upstream detector
//! - [`ObjectDetector`], [`ImageLoader`], [`Corpus`] - Collaborator contracts
//! - [`InMemoryCorpus`] - Snapshot-capable record store
//!
//! ## Example
//!
//! ```rust
//! use vizsim_core::{Corpus, DescriptorSet, ImageRecord, InMemoryCorpus};
//!
//! let corpus = InMemoryCorpus::new();
//! let descriptors = DescriptorSet {
//!     hu_moments: Some(vec![0.0; 7]),
//!     ..Default::default()
//! };
//! corpus.insert(ImageRecord::new("beach.jpg", Some(descriptors))).unwrap();
//!
//! let snapshot = corpus.snapshot();
//! assert_eq!(snapshot.len(), 1);
//! ```

pub mod corpus;
pub mod descriptor;
pub mod error;
pub mod record;
pub mod traits;

pub use corpus::InMemoryCorpus;
pub use descriptor::{Channel, ColorHistogram, DescriptorSet, DominantColor, Tamura};
pub use error::{Error, Result};
pub use record::{BoundingBox, CorpusItem, CropRect, DetectedObject, ImageId, ImageRecord};
pub use traits::{Corpus, ImageLoader, NoDetector, ObjectDetector, Raster};
