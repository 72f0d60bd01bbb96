//! Application configuration loaded from an optional JSON file.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;
use vizsim_core::{Error, Result};
use vizsim_extract::{ExtractorConfig, DEFAULT_MIN_CONFIDENCE};
use vizsim_similarity::ChannelWeights;

/// Everything tunable about extraction and scoring.
///
/// ```json
/// {
///   "extractor": { "dominant": { "k": 3 } },
///   "weights": { "gabor": 0.3 },
///   "min_confidence": 0.4
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub extractor: ExtractorConfig,
    pub weights: ChannelWeights,
    /// Detections below this confidence are dropped at ingestion
    pub min_confidence: f64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            extractor: ExtractorConfig::default(),
            weights: ChannelWeights::default(),
            min_confidence: DEFAULT_MIN_CONFIDENCE,
        }
    }
}

impl AppConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: AppConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Defaults when `path` is `None`
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.extractor.validate()?;
        self.weights.validate()?;
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(Error::InvalidConfig(format!(
                "min_confidence must be within [0, 1], got {}",
                self.min_confidence
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = AppConfig::from_json(r#"{"weights": {"gabor": 0.3}, "extractor": {"dominant": {"k": 3}}}"#)
            .unwrap();
        assert_eq!(config.weights.gabor, 0.3);
        assert_eq!(config.weights.hog, 0.15);
        assert_eq!(config.extractor.dominant.k, 3);
        assert_eq!(config.extractor.dominant.seed, 42);
        assert_eq!(config.min_confidence, DEFAULT_MIN_CONFIDENCE);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            AppConfig::from_json(r#"{"weights": {"tamura": -1.0}}"#),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            AppConfig::from_json(r#"{"min_confidence": 1.5}"#),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            AppConfig::from_json(r#"{"weights": {"texture": 1.0}}"#),
            Err(Error::Serialization(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vizsim.json");
        std::fs::write(&path, r#"{"min_confidence": 0.5}"#).unwrap();

        assert_eq!(AppConfig::load(&path).unwrap().min_confidence, 0.5);
        assert_eq!(AppConfig::load_or_default(None).unwrap(), AppConfig::default());
        assert!(matches!(
            AppConfig::load(&dir.path().join("missing.json")),
            Err(Error::Io(_))
        ));
    }
}
