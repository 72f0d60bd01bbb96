use std::path::Path;

use image::imageops;
use tracing::{debug, warn};
use vizsim_core::{BoundingBox, Channel, DescriptorSet, Error, ImageLoader, Raster, Result};

use crate::color::{hsv_histogram, rgb_histogram};
use crate::config::ExtractorConfig;
use crate::dominant::dominant_colors;
use crate::gabor::gabor_features;
use crate::hog::hog;
use crate::hu::hu_moments;
use crate::plane::Plane;
use crate::tamura::tamura;

/// Result of an extraction: the channels that could be computed plus the
/// reason for each one that could not
#[derive(Debug)]
pub struct Extraction {
    pub descriptors: DescriptorSet,
    pub failures: Vec<Error>,
}

impl Extraction {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Turns rasters and object crops into [`DescriptorSet`]s
#[derive(Debug, Clone, Default)]
pub struct DescriptorExtractor {
    config: ExtractorConfig,
}

impl DescriptorExtractor {
    pub fn new(config: ExtractorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Extract every channel; channels that hit a degenerate case are left
    /// out and logged.
    pub fn extract(&self, image: &Raster) -> Result<DescriptorSet> {
        let extraction = self.extract_detailed(image)?;
        for failure in &extraction.failures {
            warn!("{}", failure);
        }
        Ok(extraction.descriptors)
    }

    /// Like [`extract`](Self::extract) but hands back per-channel failures
    pub fn extract_detailed(&self, image: &Raster) -> Result<Extraction> {
        let (w, h) = image.dimensions();
        if w == 0 || h == 0 {
            return Err(Error::Extraction {
                channel: None,
                reason: format!("empty raster {}x{}", w, h),
            });
        }

        let gray = Plane::from_raster(image);
        let mut descriptors = DescriptorSet::new();
        let mut failures = Vec::new();

        descriptors.color_histogram_rgb = Some(rgb_histogram(image, &self.config.histogram));
        descriptors.color_histogram_hsv = Some(hsv_histogram(image, &self.config.histogram));

        let colors = dominant_colors(image, &self.config.dominant);
        if colors.is_empty() {
            failures.push(Error::extraction(Channel::DominantColors, "no clusters found"));
        } else {
            descriptors.dominant_colors = Some(colors);
        }

        let texture = tamura(&gray);
        match check_finite(Channel::Tamura, &texture.as_array()) {
            Ok(()) => descriptors.tamura = Some(texture),
            Err(e) => failures.push(e),
        }

        let gabor = gabor_features(&gray, &self.config.gabor);
        match check_finite(Channel::Gabor, &gabor) {
            Ok(()) => descriptors.gabor = Some(gabor),
            Err(e) => failures.push(e),
        }

        let hu = hu_moments(&gray);
        match check_finite(Channel::HuMoments, &hu) {
            Ok(()) => descriptors.hu_moments = Some(hu),
            Err(e) => failures.push(e),
        }

        let hog = hog(&gray, &self.config.hog);
        if hog.is_empty() {
            failures.push(Error::extraction(
                Channel::Hog,
                format!(
                    "{}x{} image is smaller than one {}x{} px block",
                    w,
                    h,
                    self.config.hog.cell_size * self.config.hog.block_size,
                    self.config.hog.cell_size * self.config.hog.block_size,
                ),
            ));
        } else {
            match check_finite(Channel::Hog, &hog) {
                Ok(()) => descriptors.hog = Some(hog),
                Err(e) => failures.push(e),
            }
        }

        debug!(
            width = w,
            height = h,
            channels = descriptors.channels().len(),
            failures = failures.len(),
            "extracted descriptors"
        );
        Ok(Extraction {
            descriptors,
            failures,
        })
    }

    /// Extract from the region of `image` under `bbox`, clamped to the image
    /// and widened to at least one pixel
    pub fn extract_crop(&self, image: &Raster, bbox: &BoundingBox) -> Result<DescriptorSet> {
        let region = crop(image, bbox)?;
        self.extract(&region)
    }

    pub fn extract_crop_detailed(&self, image: &Raster, bbox: &BoundingBox) -> Result<Extraction> {
        let region = crop(image, bbox)?;
        self.extract_detailed(&region)
    }

    /// Load through `loader` and extract the whole image
    pub fn extract_path(&self, loader: &dyn ImageLoader, path: &Path) -> Result<DescriptorSet> {
        let image = loader.read(path)?;
        self.extract(&image)
    }
}

pub fn crop(image: &Raster, bbox: &BoundingBox) -> Result<Raster> {
    let rect = bbox
        .clamp_to(image.width(), image.height())
        .ok_or_else(|| Error::Extraction {
            channel: None,
            reason: format!(
                "cannot crop {:?} from {}x{} image",
                <[f64; 4]>::from(*bbox),
                image.width(),
                image.height()
            ),
        })?;
    Ok(imageops::crop_imm(image, rect.x, rect.y, rect.width, rect.height).to_image())
}

fn check_finite(channel: Channel, values: &[f64]) -> Result<()> {
    if values.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(Error::extraction(channel, "non-finite value"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn gradient(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 255 / width.max(1)) as u8, (y * 255 / height.max(1)) as u8, 90])
        })
    }

    #[test]
    fn test_full_extraction() {
        let extractor = DescriptorExtractor::default();
        let extraction = extractor.extract_detailed(&gradient(32, 24)).unwrap();
        assert!(extraction.is_complete(), "{:?}", extraction.failures);

        let set = extraction.descriptors;
        assert_eq!(set.channels(), Channel::ALL.to_vec());
        assert_eq!(set.gabor.as_ref().unwrap().len(), 64);
        assert_eq!(set.hu_moments.as_ref().unwrap().len(), 7);
        assert_eq!(
            set.hog.as_ref().unwrap().len(),
            extractor.config().hog.vector_len(32, 24)
        );
        let d = set.tamura.unwrap().directionality;
        assert!((0.0..=1.0).contains(&d));
    }

    #[test]
    fn test_tiny_image_is_partial() {
        let extractor = DescriptorExtractor::default();
        let extraction = extractor.extract_detailed(&gradient(4, 4)).unwrap();
        assert!(extraction.descriptors.hog.is_none());
        assert!(extraction.descriptors.color_histogram_rgb.is_some());
        assert_eq!(extraction.failures.len(), 1);
        assert!(matches!(
            extraction.failures[0],
            Error::Extraction { channel: Some(Channel::Hog), .. }
        ));
    }

    #[test]
    fn test_empty_raster_fails() {
        let extractor = DescriptorExtractor::default();
        let err = extractor.extract(&RgbImage::new(0, 0)).unwrap_err();
        assert!(matches!(err, Error::Extraction { channel: None, .. }));
    }

    #[test]
    fn test_crop_clamps() {
        let image = gradient(20, 10);
        let cropped = crop(&image, &BoundingBox::new(-4.0, 2.0, 12.0, 50.0)).unwrap();
        assert_eq!(cropped.dimensions(), (12, 8));
        assert_eq!(cropped.get_pixel(0, 0), image.get_pixel(0, 2));
    }

    #[test]
    fn test_single_pixel_crop() {
        let extractor = DescriptorExtractor::default();
        let set = extractor
            .extract_crop(&gradient(20, 20), &BoundingBox::new(5.0, 5.0, 5.0, 5.0))
            .unwrap();
        for hist in [set.color_histogram_rgb.unwrap(), set.color_histogram_hsv.unwrap()] {
            for sum in hist.sums() {
                assert!((sum - 1.0).abs() < 1e-6);
            }
        }
        assert!(set.hog.is_none());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = ExtractorConfig::default();
        config.dominant.k = 0;
        assert!(matches!(DescriptorExtractor::new(config), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_deterministic() {
        let extractor = DescriptorExtractor::default();
        let image = gradient(40, 30);
        assert_eq!(extractor.extract(&image).unwrap(), extractor.extract(&image).unwrap());
    }
}
