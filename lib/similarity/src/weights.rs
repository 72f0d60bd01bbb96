//! Per-channel weights for descriptor comparison.
//!
//! Weights need not sum to 1: the comparator divides by the total weight of
//! the channels it actually compared, so only their ratios matter.

use serde::{Deserialize, Serialize};
use vizsim_core::{Channel, Error, Result};

/// Map key that sets both color histogram weights at once
pub const COLOR_HISTOGRAM_KEY: &str = "color_histogram";

/// Number of sub-channels in each color histogram; the histogram weight is
/// shared evenly among them
pub const HISTOGRAM_SUB_CHANNELS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChannelWeights {
    pub color_histogram_rgb: f64,
    pub color_histogram_hsv: f64,
    pub dominant_colors: f64,
    pub tamura: f64,
    pub gabor: f64,
    pub hu_moments: f64,
    pub hog: f64,
}

impl Default for ChannelWeights {
    fn default() -> Self {
        Self {
            color_histogram_rgb: 0.2,
            color_histogram_hsv: 0.2,
            dominant_colors: 0.15,
            tamura: 0.15,
            gabor: 0.2,
            hu_moments: 0.15,
            hog: 0.15,
        }
    }
}

impl ChannelWeights {
    /// All channels weighted zero
    pub fn zero() -> Self {
        Self {
            color_histogram_rgb: 0.0,
            color_histogram_hsv: 0.0,
            dominant_colors: 0.0,
            tamura: 0.0,
            gabor: 0.0,
            hu_moments: 0.0,
            hog: 0.0,
        }
    }

    /// Weight only the given channel
    pub fn only(channel: Channel, weight: f64) -> Self {
        Self::zero().with(channel, weight)
    }

    pub fn get(&self, channel: Channel) -> f64 {
        match channel {
            Channel::ColorHistogramRgb => self.color_histogram_rgb,
            Channel::ColorHistogramHsv => self.color_histogram_hsv,
            Channel::DominantColors => self.dominant_colors,
            Channel::Tamura => self.tamura,
            Channel::Gabor => self.gabor,
            Channel::HuMoments => self.hu_moments,
            Channel::Hog => self.hog,
        }
    }

    pub fn set(&mut self, channel: Channel, weight: f64) {
        let slot = match channel {
            Channel::ColorHistogramRgb => &mut self.color_histogram_rgb,
            Channel::ColorHistogramHsv => &mut self.color_histogram_hsv,
            Channel::DominantColors => &mut self.dominant_colors,
            Channel::Tamura => &mut self.tamura,
            Channel::Gabor => &mut self.gabor,
            Channel::HuMoments => &mut self.hu_moments,
            Channel::Hog => &mut self.hog,
        };
        *slot = weight;
    }

    #[must_use]
    pub fn with(mut self, channel: Channel, weight: f64) -> Self {
        self.set(channel, weight);
        self
    }

    /// Weight of one sub-channel (R, G, B or H, S, V) of a histogram channel
    pub fn sub_channel(&self, channel: Channel) -> f64 {
        self.get(channel) / HISTOGRAM_SUB_CHANNELS as f64
    }

    /// Weights must be finite and non-negative
    pub fn validate(&self) -> Result<()> {
        for channel in Channel::ALL {
            let w = self.get(channel);
            if !w.is_finite() || w < 0.0 {
                return Err(Error::InvalidConfig(format!(
                    "weight for {} must be a non-negative number, got {}",
                    channel, w
                )));
            }
        }
        Ok(())
    }

    /// Defaults with the given entries replaced
    pub fn from_map<I, K>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, f64)>,
        K: AsRef<str>,
    {
        Self::default().with_overrides(entries)
    }

    /// Replace the named weights.
    ///
    /// Keys are channel names, plus `color_histogram` for both histograms.
    /// Unknown keys are an error rather than being ignored.
    pub fn with_overrides<I, K>(&self, entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, f64)>,
        K: AsRef<str>,
    {
        let mut weights = *self;
        for (key, weight) in entries {
            let key = key.as_ref();
            if key == COLOR_HISTOGRAM_KEY {
                weights.color_histogram_rgb = weight;
                weights.color_histogram_hsv = weight;
            } else {
                weights.set(key.parse::<Channel>()?, weight);
            }
        }
        weights.validate()?;
        Ok(weights)
    }

    pub fn total(&self) -> f64 {
        Channel::ALL.iter().map(|c| self.get(*c)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let w = ChannelWeights::default();
        assert_eq!(w.gabor, 0.2);
        assert_eq!(w.hog, 0.15);
        assert!((w.sub_channel(Channel::ColorHistogramRgb) - 0.2 / 3.0).abs() < 1e-12);
        w.validate().unwrap();
    }

    #[test]
    fn test_overrides() {
        let w = ChannelWeights::from_map(HashMap::from([
            ("gabor".to_string(), 0.5),
            ("color_histogram".to_string(), 0.1),
        ]))
        .unwrap();
        assert_eq!(w.gabor, 0.5);
        assert_eq!(w.color_histogram_rgb, 0.1);
        assert_eq!(w.color_histogram_hsv, 0.1);
        assert_eq!(w.tamura, 0.15);
    }

    #[test]
    fn test_unknown_channel_rejected() {
        let err = ChannelWeights::from_map([("texture", 1.0)]).unwrap_err();
        assert!(matches!(err, Error::UnknownChannel(ref k) if k == "texture"));
    }

    #[test]
    fn test_negative_weight_rejected() {
        assert!(matches!(
            ChannelWeights::from_map([("hog", -0.1)]),
            Err(Error::InvalidConfig(_))
        ));
        assert!(ChannelWeights::from_map([("hog", f64::NAN)]).is_err());
    }

    #[test]
    fn test_only() {
        let w = ChannelWeights::only(Channel::Tamura, 2.0);
        assert_eq!(w.total(), 2.0);
        assert_eq!(w.get(Channel::Tamura), 2.0);
    }

    #[test]
    fn test_serde_rejects_unknown_fields() {
        let parsed: ChannelWeights = serde_json::from_str(r#"{"hog": 0.5}"#).unwrap();
        assert_eq!(parsed.hog, 0.5);
        assert_eq!(parsed.gabor, 0.2);
        assert!(serde_json::from_str::<ChannelWeights>(r#"{"shape": 1.0}"#).is_err());
    }
}
