//! Contracts for the collaborators the retrieval core consumes.
//!
//! None of these are global: callers construct an implementation once and
//! pass it by reference to whatever needs it, so tests can substitute a
//! double.

use std::path::Path;
use std::sync::Arc;

use crate::error::Result;
use crate::record::{CorpusItem, DetectedObject};

/// Decoded 8-bit RGB raster, row-major
pub type Raster = image::RgbImage;

/// Upstream object detector.
///
/// Returns objects in detector order; an empty list is a valid answer and
/// implementations must not invent boxes. Failures are reported as
/// [`crate::Error::Detection`].
pub trait ObjectDetector: Send + Sync {
    fn detect(&self, image: &Raster) -> Result<Vec<DetectedObject>>;
}

/// Reads an image from storage into a [`Raster`].
///
/// Fails with [`crate::Error::Load`] when the path is missing or undecodable.
pub trait ImageLoader: Send + Sync {
    fn read(&self, path: &Path) -> Result<Raster>;
}

/// Source of ranking candidates.
///
/// A snapshot is taken once per ranking call; writes that happen afterwards
/// are not visible to that call.
pub trait Corpus: Send + Sync {
    fn snapshot(&self) -> Vec<Arc<CorpusItem>>;
}

/// Detector that never finds anything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDetector;

impl ObjectDetector for NoDetector {
    fn detect(&self, _image: &Raster) -> Result<Vec<DetectedObject>> {
        Ok(Vec::new())
    }
}
