use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

use crate::descriptor::DescriptorSet;
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImageId {
    String(String),
    Uuid(Uuid),
    Integer(u64),
}

impl ImageId {
    /// Fresh random identifier for newly ingested images
    pub fn random() -> Self {
        ImageId::Uuid(Uuid::new_v4())
    }
}

impl std::fmt::Display for ImageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImageId::String(s) => write!(f, "{}", s),
            ImageId::Uuid(u) => write!(f, "{}", u),
            ImageId::Integer(i) => write!(f, "{}", i),
        }
    }
}

impl From<String> for ImageId {
    fn from(s: String) -> Self {
        ImageId::String(s)
    }
}

impl From<&str> for ImageId {
    fn from(s: &str) -> Self {
        ImageId::String(s.to_string())
    }
}

impl From<u64> for ImageId {
    fn from(i: u64) -> Self {
        ImageId::Integer(i)
    }
}

impl From<Uuid> for ImageId {
    fn from(u: Uuid) -> Self {
        ImageId::Uuid(u)
    }
}

/// Axis-aligned box `[x1, y1, x2, y2]` in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct BoundingBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl From<[f64; 4]> for BoundingBox {
    fn from(b: [f64; 4]) -> Self {
        Self::new(b[0], b[1], b[2], b[3])
    }
}

impl From<BoundingBox> for [f64; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.x1, b.y1, b.x2, b.y2]
    }
}

/// Integer pixel rectangle inside an image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Clamp into `[0, width] x [0, height]` and widen to at least 1x1.
    ///
    /// Returns `None` only when the image itself is empty or a coordinate is
    /// not a number.
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<CropRect> {
        let (x, w) = clamp_span(self.x1, self.x2, width)?;
        let (y, h) = clamp_span(self.y1, self.y2, height)?;
        Some(CropRect {
            x,
            y,
            width: w,
            height: h,
        })
    }
}

fn clamp_span(lo: f64, hi: f64, limit: u32) -> Option<(u32, u32)> {
    if limit == 0 || lo.is_nan() || hi.is_nan() {
        return None;
    }
    let max = limit as f64;
    // Truncation toward zero, as pixel indices
    let mut start = lo.clamp(0.0, max) as u32;
    let mut end = hi.clamp(0.0, max) as u32;
    if end <= start {
        start = start.min(limit - 1);
        end = start + 1;
    }
    Some((start, end - start))
}

/// An object found by the upstream detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedObject {
    #[serde(rename = "class")]
    pub class_label: String,
    pub confidence: f64,
    pub bbox: BoundingBox,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descriptors: Option<DescriptorSet>,
}

impl DetectedObject {
    pub fn new(class_label: impl Into<String>, confidence: f64, bbox: BoundingBox) -> Self {
        Self {
            class_label: class_label.into(),
            confidence,
            bbox,
            descriptors: None,
        }
    }

    #[must_use]
    pub fn with_descriptors(mut self, descriptors: DescriptorSet) -> Self {
        self.descriptors = Some(descriptors);
        self
    }
}

/// A fingerprinted image: whole-image descriptors plus detected objects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub id: ImageId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descriptors: Option<DescriptorSet>,
    #[serde(default)]
    pub objects: Vec<DetectedObject>,
}

/// The ranker's view of a corpus entry
pub type CorpusItem = ImageRecord;

impl AsRef<ImageRecord> for ImageRecord {
    fn as_ref(&self) -> &ImageRecord {
        self
    }
}

impl ImageRecord {
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<ImageId>, descriptors: Option<DescriptorSet>) -> Self {
        Self {
            id: id.into(),
            source: None,
            descriptors,
            objects: Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn with_objects(mut self, objects: Vec<DetectedObject>) -> Self {
        self.objects = objects;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_source(mut self, source: impl Into<PathBuf>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn has_class(&self, class_label: &str) -> bool {
        self.objects.iter().any(|o| o.class_label == class_label)
    }

    /// Descriptors to use when this record is itself the query.
    ///
    /// `None` selects the whole image, `Some(i)` the i-th detected object.
    pub fn query_descriptors(&self, object_index: Option<usize>) -> Result<Option<&DescriptorSet>> {
        match object_index {
            None => Ok(self.descriptors.as_ref()),
            Some(index) => self
                .objects
                .get(index)
                .map(|o| o.descriptors.as_ref())
                .ok_or(Error::InvalidObjectIndex {
                    index,
                    count: self.objects.len(),
                }),
        }
    }
}
