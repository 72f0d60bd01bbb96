//! Ingestion: turn a source image into an [`ImageRecord`].
//!
//! One pass extracts the whole image, runs the detector, and extracts every
//! detected object from its crop. Channels or crops that cannot be computed
//! leave a gap in the record and come back as [`IngestFailure`]s next to it.
//! Batch ingestion reports an outcome per path; one bad file never stops the
//! others.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{debug, info, warn};
use vizsim_core::{
    DetectedObject, Error, ImageId, ImageLoader, ImageRecord, NoDetector, ObjectDetector, Raster, Result,
};

use crate::extractor::DescriptorExtractor;

/// Detections below this confidence are dropped by default
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.25;

/// Something that could not be described while ingesting an image
#[derive(Debug)]
pub struct IngestFailure {
    /// Index into [`ImageRecord::objects`], `None` for the whole image
    pub object_index: Option<usize>,
    pub error: Error,
}

/// A record plus every channel or crop that is missing from it
#[derive(Debug)]
pub struct Ingested {
    pub record: ImageRecord,
    pub failures: Vec<IngestFailure>,
}

impl Ingested {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn into_record(self) -> ImageRecord {
        self.record
    }
}

pub struct Ingestor<'a> {
    extractor: &'a DescriptorExtractor,
    loader: &'a dyn ImageLoader,
    detector: &'a dyn ObjectDetector,
    min_confidence: f64,
}

impl<'a> Ingestor<'a> {
    /// Ingestor without a detector; images only get objects the caller supplies
    pub fn new(extractor: &'a DescriptorExtractor, loader: &'a dyn ImageLoader) -> Self {
        Self {
            extractor,
            loader,
            detector: &NoDetector,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
        }
    }

    #[must_use]
    pub fn with_detector(mut self, detector: &'a dyn ObjectDetector) -> Self {
        self.detector = detector;
        self
    }

    #[must_use]
    pub fn with_min_confidence(mut self, min_confidence: f64) -> Self {
        self.min_confidence = min_confidence;
        self
    }

    /// Fingerprint an already decoded raster.
    ///
    /// `objects` overrides the detector when the caller already has
    /// detections for this image. Only an undecodable image or a detector
    /// error fails the whole call.
    pub fn ingest_raster(
        &self,
        id: ImageId,
        image: &Raster,
        objects: Option<Vec<DetectedObject>>,
    ) -> Result<Ingested> {
        let extraction = self.extractor.extract_detailed(image)?;
        let mut failures: Vec<IngestFailure> = extraction
            .failures
            .into_iter()
            .map(|error| IngestFailure {
                object_index: None,
                error,
            })
            .collect();

        let detected = match objects {
            Some(objects) => objects,
            None => self.detector.detect(image)?,
        };

        let objects: Vec<DetectedObject> = detected
            .into_iter()
            .filter(|o| o.confidence >= self.min_confidence)
            .enumerate()
            .map(|(index, object)| self.describe_object(image, index, object, &mut failures))
            .collect();

        if !failures.is_empty() {
            warn!(%id, failures = failures.len(), "image ingested with gaps");
        }
        debug!(%id, objects = objects.len(), "ingested image");
        Ok(Ingested {
            record: ImageRecord::new(id, Some(extraction.descriptors)).with_objects(objects),
            failures,
        })
    }

    /// Load `path` and fingerprint it
    pub fn ingest_path(&self, id: ImageId, path: &Path) -> Result<Ingested> {
        self.ingest_path_with_objects(id, path, None)
    }

    pub fn ingest_path_with_objects(
        &self,
        id: ImageId,
        path: &Path,
        objects: Option<Vec<DetectedObject>>,
    ) -> Result<Ingested> {
        let image = self.loader.read(path)?;
        let mut ingested = self.ingest_raster(id, &image, objects)?;
        ingested.record = ingested.record.with_source(path);
        Ok(ingested)
    }

    /// Ingest many files in parallel, ids taken from the file names.
    ///
    /// Results come back in input order.
    pub fn ingest_batch(&self, paths: &[PathBuf]) -> Vec<(PathBuf, Result<Ingested>)> {
        self.ingest_batch_with(paths, |_| None)
    }

    /// Batch ingestion with per-path precomputed detections
    pub fn ingest_batch_with<F>(&self, paths: &[PathBuf], objects_for: F) -> Vec<(PathBuf, Result<Ingested>)>
    where
        F: Fn(&Path) -> Option<Vec<DetectedObject>> + Sync,
    {
        let outcomes: Vec<(PathBuf, Result<Ingested>)> = paths
            .par_iter()
            .map(|path| {
                let id = id_for(path);
                let outcome = self.ingest_path_with_objects(id, path, objects_for(path));
                if let Err(e) = &outcome {
                    warn!(path = %path.display(), "ingestion failed: {}", e);
                }
                (path.clone(), outcome)
            })
            .collect();

        let failed = outcomes.iter().filter(|(_, r)| r.is_err()).count();
        let partial = outcomes
            .iter()
            .filter(|(_, r)| matches!(r, Ok(ingested) if !ingested.is_complete()))
            .count();
        info!(total = outcomes.len(), failed, partial, "batch ingestion finished");
        outcomes
    }

    fn describe_object(
        &self,
        image: &Raster,
        index: usize,
        object: DetectedObject,
        failures: &mut Vec<IngestFailure>,
    ) -> DetectedObject {
        let record_failure = |error| IngestFailure {
            object_index: Some(index),
            error,
        };
        match self.extractor.extract_crop_detailed(image, &object.bbox) {
            Ok(extraction) => {
                failures.extend(extraction.failures.into_iter().map(record_failure));
                object.with_descriptors(extraction.descriptors)
            }
            Err(e) => {
                failures.push(record_failure(e));
                object
            }
        }
    }
}

/// File name when there is one, otherwise the full path
pub fn id_for(path: &Path) -> ImageId {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::FsImageLoader;
    use image::{Rgb, RgbImage};
    use vizsim_core::{BoundingBox, Channel};

    struct FixedDetector(Vec<DetectedObject>);

    impl ObjectDetector for FixedDetector {
        fn detect(&self, _image: &Raster) -> Result<Vec<DetectedObject>> {
            Ok(self.0.clone())
        }
    }

    fn scene() -> RgbImage {
        RgbImage::from_fn(48, 32, |x, y| {
            if x > 24 {
                Rgb([20, 200, 30])
            } else {
                Rgb([(x * 5) as u8, (y * 7) as u8, 120])
            }
        })
    }

    #[test]
    fn test_ingest_with_detector() {
        let extractor = DescriptorExtractor::default();
        let detector = FixedDetector(vec![
            DetectedObject::new("plant", 0.9, BoundingBox::new(24.0, 0.0, 48.0, 32.0)),
            DetectedObject::new("ghost", 0.1, BoundingBox::new(0.0, 0.0, 4.0, 4.0)),
        ]);
        let ingestor = Ingestor::new(&extractor, &FsImageLoader).with_detector(&detector);

        let ingested = ingestor.ingest_raster("scene".into(), &scene(), None).unwrap();
        assert!(ingested.is_complete(), "{:?}", ingested.failures);
        let record = ingested.record;
        assert!(record.descriptors.is_some());
        // Low-confidence detection dropped
        assert_eq!(record.objects.len(), 1);
        assert_eq!(record.objects[0].class_label, "plant");
        assert!(record.objects[0].descriptors.is_some());
    }

    #[test]
    fn test_explicit_objects_override_detector() {
        let extractor = DescriptorExtractor::default();
        let detector = FixedDetector(vec![]);
        let ingestor = Ingestor::new(&extractor, &FsImageLoader)
            .with_detector(&detector)
            .with_min_confidence(0.0);
        let objects = vec![DetectedObject::new("box", 0.05, BoundingBox::new(0.0, 0.0, 16.0, 16.0))];

        let record = ingestor.ingest_raster("a".into(), &scene(), Some(objects)).unwrap().into_record();
        assert_eq!(record.objects.len(), 1);
    }

    struct BrokenDetector;

    impl ObjectDetector for BrokenDetector {
        fn detect(&self, _image: &Raster) -> Result<Vec<DetectedObject>> {
            Err(Error::Detection("model not loaded".to_string()))
        }
    }

    #[test]
    fn test_detector_failure_fails_the_image() {
        let extractor = DescriptorExtractor::default();
        let ingestor = Ingestor::new(&extractor, &FsImageLoader).with_detector(&BrokenDetector);
        let err = ingestor.ingest_raster("a".into(), &scene(), None).unwrap_err();
        assert!(matches!(err, Error::Detection(_)));
    }

    #[test]
    fn test_no_detector_means_no_objects() {
        let extractor = DescriptorExtractor::default();
        let ingestor = Ingestor::new(&extractor, &FsImageLoader);
        let record = ingestor.ingest_raster("a".into(), &scene(), None).unwrap().into_record();
        assert!(record.objects.is_empty());
    }

    #[test]
    fn test_batch_isolates_failures() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.png");
        scene().save(&good).unwrap();
        let missing = dir.path().join("missing.png");

        let extractor = DescriptorExtractor::default();
        let ingestor = Ingestor::new(&extractor, &FsImageLoader);
        let outcomes = ingestor.ingest_batch(&[missing.clone(), good.clone()]);

        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].0, missing);
        assert!(matches!(outcomes[0].1, Err(Error::Load { .. })));
        let record = &outcomes[1].1.as_ref().unwrap().record;
        assert_eq!(record.id, ImageId::from("good.png"));
        assert_eq!(record.source.as_deref(), Some(good.as_path()));
    }

    #[test]
    fn test_crop_failures_are_reported() {
        let extractor = DescriptorExtractor::default();
        let ingestor = Ingestor::new(&extractor, &FsImageLoader).with_min_confidence(0.0);
        let objects = vec![
            DetectedObject::new("ok", 0.9, BoundingBox::new(0.0, 0.0, 24.0, 24.0)),
            DetectedObject::new("nan", 0.9, BoundingBox::new(f64::NAN, 0.0, 8.0, 8.0)),
            DetectedObject::new("tiny", 0.9, BoundingBox::new(2.0, 2.0, 6.0, 6.0)),
        ];

        let ingested = ingestor.ingest_raster("a".into(), &scene(), Some(objects)).unwrap();
        let record = &ingested.record;
        assert_eq!(record.objects.len(), 3);
        assert!(record.objects[0].descriptors.is_some());
        assert!(record.objects[1].descriptors.is_none());
        // 4x4 crop: everything but HOG
        let tiny = record.objects[2].descriptors.as_ref().unwrap();
        assert!(tiny.hog.is_none());
        assert!(tiny.gabor.is_some());

        assert_eq!(ingested.failures.len(), 2);
        assert_eq!(ingested.failures[0].object_index, Some(1));
        assert!(matches!(ingested.failures[0].error, Error::Extraction { channel: None, .. }));
        assert_eq!(ingested.failures[1].object_index, Some(2));
        assert!(matches!(
            ingested.failures[1].error,
            Error::Extraction {
                channel: Some(Channel::Hog),
                ..
            }
        ));
    }

    #[test]
    fn test_small_image_reports_whole_image_failure() {
        let extractor = DescriptorExtractor::default();
        let ingestor = Ingestor::new(&extractor, &FsImageLoader);
        let image = RgbImage::from_pixel(8, 8, Rgb([10, 20, 30]));

        let ingested = ingestor.ingest_raster("small".into(), &image, None).unwrap();
        assert!(!ingested.is_complete());
        assert!(ingested.failures.iter().all(|f| f.object_index.is_none()));
        assert!(ingested.record.descriptors.as_ref().unwrap().hog.is_none());
    }
}
