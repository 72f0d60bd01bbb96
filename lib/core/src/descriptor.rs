//! Descriptor channels and the [`DescriptorSet`] bundle.
//!
//! Every channel is optional: an extraction that could not compute a channel
//! leaves it `None`, and comparison simply ignores channels missing on either
//! side.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Names of the descriptor channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    ColorHistogramRgb,
    ColorHistogramHsv,
    DominantColors,
    Tamura,
    Gabor,
    HuMoments,
    Hog,
}

impl Channel {
    /// All channels in canonical order
    pub const ALL: [Channel; 7] = [
        Channel::ColorHistogramRgb,
        Channel::ColorHistogramHsv,
        Channel::DominantColors,
        Channel::Tamura,
        Channel::Gabor,
        Channel::HuMoments,
        Channel::Hog,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::ColorHistogramRgb => "color_histogram_rgb",
            Channel::ColorHistogramHsv => "color_histogram_hsv",
            Channel::DominantColors => "dominant_colors",
            Channel::Tamura => "tamura",
            Channel::Gabor => "gabor",
            Channel::HuMoments => "hu_moments",
            Channel::Hog => "hog",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Channel::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| Error::UnknownChannel(s.to_string()))
    }
}

/// Three per-channel histograms, either (R, G, B) or (H, S, V)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorHistogram {
    pub channels: [Vec<f64>; 3],
}

impl ColorHistogram {
    pub fn new(first: Vec<f64>, second: Vec<f64>, third: Vec<f64>) -> Self {
        Self {
            channels: [first, second, third],
        }
    }

    /// Per sub-channel sums; each is ~1.0 for an extracted histogram.
    pub fn sums(&self) -> [f64; 3] {
        [
            self.channels[0].iter().sum(),
            self.channels[1].iter().sum(),
            self.channels[2].iter().sum(),
        ]
    }
}

/// A cluster centre and the share of pixels assigned to it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DominantColor {
    pub rgb: [u8; 3],
    pub proportion: f64,
}

impl DominantColor {
    pub fn new(rgb: [u8; 3], proportion: f64) -> Self {
        Self { rgb, proportion }
    }

    #[inline]
    pub fn as_f64(&self) -> [f64; 3] {
        [self.rgb[0] as f64, self.rgb[1] as f64, self.rgb[2] as f64]
    }
}

/// Tamura texture triad
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tamura {
    pub roughness: f64,
    pub contrast: f64,
    /// In `[0, 1]`; 1.0 means a single dominant edge direction
    pub directionality: f64,
}

impl Tamura {
    #[inline]
    pub fn as_array(&self) -> [f64; 3] {
        [self.roughness, self.contrast, self.directionality]
    }
}

/// The multi-channel visual fingerprint of one image or object crop
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DescriptorSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_histogram_rgb: Option<ColorHistogram>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_histogram_hsv: Option<ColorHistogram>,
    /// Sorted by proportion, largest first
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dominant_colors: Option<Vec<DominantColor>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tamura: Option<Tamura>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gabor: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hu_moments: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hog: Option<Vec<f64>>,
}

impl DescriptorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has(&self, channel: Channel) -> bool {
        match channel {
            Channel::ColorHistogramRgb => self.color_histogram_rgb.is_some(),
            Channel::ColorHistogramHsv => self.color_histogram_hsv.is_some(),
            Channel::DominantColors => self.dominant_colors.is_some(),
            Channel::Tamura => self.tamura.is_some(),
            Channel::Gabor => self.gabor.is_some(),
            Channel::HuMoments => self.hu_moments.is_some(),
            Channel::Hog => self.hog.is_some(),
        }
    }

    /// Channels present in this set, in canonical order
    pub fn channels(&self) -> Vec<Channel> {
        Channel::ALL.into_iter().filter(|c| self.has(*c)).collect()
    }

    pub fn is_empty(&self) -> bool {
        Channel::ALL.iter().all(|c| !self.has(*c))
    }

    /// Drop a channel, leaving the others untouched
    pub fn clear(&mut self, channel: Channel) {
        match channel {
            Channel::ColorHistogramRgb => self.color_histogram_rgb = None,
            Channel::ColorHistogramHsv => self.color_histogram_hsv = None,
            Channel::DominantColors => self.dominant_colors = None,
            Channel::Tamura => self.tamura = None,
            Channel::Gabor => self.gabor = None,
            Channel::HuMoments => self.hu_moments = None,
            Channel::Hog => self.hog = None,
        }
    }

    #[must_use]
    pub fn without(mut self, channel: Channel) -> Self {
        self.clear(channel);
        self
    }
}
