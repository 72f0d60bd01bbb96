//! Weighted multi-channel comparison of two descriptor sets.

use serde::{Deserialize, Serialize};
use vizsim_core::{Channel, ColorHistogram, DescriptorSet, Result};

use crate::distance::{
    chi_square, cosine_distance, dominant_color_distance, euclidean, Distance, SkipReason,
    HU_SCALE, TAMURA_SCALE,
};
use crate::weights::ChannelWeights;

const RGB_COMPONENTS: [&str; 3] = ["r", "g", "b"];
const HSV_COMPONENTS: [&str; 3] = ["h", "s", "v"];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Compared { distance: f64, weight: f64 },
    Skipped { reason: SkipReason },
}

/// One line of a comparison breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelScore {
    pub channel: Channel,
    /// Histogram sub-channel ("r", "h", ...) when the channel is split
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl ChannelScore {
    /// Weighted distance this line adds to the numerator
    pub fn contribution(&self) -> f64 {
        match self.outcome {
            Outcome::Compared { distance, weight } => distance * weight,
            Outcome::Skipped { .. } => 0.0,
        }
    }
}

/// A score together with the per-channel lines that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    /// `Σ distance·weight / Σ weight`, `+∞` when nothing was comparable
    pub score: f64,
    pub total_weight: f64,
    pub channels: Vec<ChannelScore>,
}

impl Comparison {
    pub fn skipped(&self) -> impl Iterator<Item = &ChannelScore> {
        self.channels
            .iter()
            .filter(|c| matches!(c.outcome, Outcome::Skipped { .. }))
    }
}

/// Scores the dissimilarity of two [`DescriptorSet`]s.
///
/// 0.0 means identical; larger is more different. Channels missing on either
/// side are left out together with their weight.
#[derive(Debug, Clone, Default)]
pub struct DescriptorComparator {
    weights: ChannelWeights,
}

impl DescriptorComparator {
    pub fn new(weights: ChannelWeights) -> Result<Self> {
        weights.validate()?;
        Ok(Self { weights })
    }

    pub fn weights(&self) -> &ChannelWeights {
        &self.weights
    }

    pub fn compare(&self, a: &DescriptorSet, b: &DescriptorSet) -> f64 {
        self.explain(a, b).score
    }

    /// Compare and keep the per-channel breakdown
    pub fn explain(&self, a: &DescriptorSet, b: &DescriptorSet) -> Comparison {
        let w = &self.weights;
        let mut acc = Accumulator::default();

        self.histogram(
            &mut acc,
            Channel::ColorHistogramRgb,
            &RGB_COMPONENTS,
            a.color_histogram_rgb.as_ref(),
            b.color_histogram_rgb.as_ref(),
        );
        self.histogram(
            &mut acc,
            Channel::ColorHistogramHsv,
            &HSV_COMPONENTS,
            a.color_histogram_hsv.as_ref(),
            b.color_histogram_hsv.as_ref(),
        );

        acc.push(
            Channel::DominantColors,
            None,
            w.dominant_colors,
            both(&a.dominant_colors, &b.dominant_colors)
                .and_then(|(x, y)| dominant_color_distance(x, y)),
        );
        acc.push(
            Channel::Tamura,
            None,
            w.tamura,
            both(&a.tamura, &b.tamura)
                .and_then(|(x, y)| euclidean(&x.as_array(), &y.as_array()))
                .map(|d| d / TAMURA_SCALE),
        );
        acc.push(
            Channel::Gabor,
            None,
            w.gabor,
            both(&a.gabor, &b.gabor).and_then(|(x, y)| cosine_distance(x, y)),
        );
        acc.push(
            Channel::HuMoments,
            None,
            w.hu_moments,
            both(&a.hu_moments, &b.hu_moments)
                .and_then(|(x, y)| euclidean(x, y))
                .map(|d| d / HU_SCALE),
        );
        acc.push(
            Channel::Hog,
            None,
            w.hog,
            both(&a.hog, &b.hog).and_then(|(x, y)| cosine_distance(x, y)),
        );

        acc.finish()
    }

    fn histogram(
        &self,
        acc: &mut Accumulator,
        channel: Channel,
        components: &[&str; 3],
        a: Option<&ColorHistogram>,
        b: Option<&ColorHistogram>,
    ) {
        let weight = self.weights.sub_channel(channel);
        for (i, component) in components.iter().enumerate() {
            let distance = match (a, b) {
                (Some(a), Some(b)) => chi_square(&a.channels[i], &b.channels[i]),
                _ => Err(SkipReason::Missing),
            };
            acc.push(channel, Some(*component), weight, distance);
        }
    }
}

/// Compare with the given weights, or the defaults when `None`
pub fn compare(a: &DescriptorSet, b: &DescriptorSet, weights: Option<&ChannelWeights>) -> Result<f64> {
    let comparator = match weights {
        Some(w) => DescriptorComparator::new(*w)?,
        None => DescriptorComparator::default(),
    };
    Ok(comparator.compare(a, b))
}

fn both<'a, T>(a: &'a Option<T>, b: &'a Option<T>) -> std::result::Result<(&'a T, &'a T), SkipReason> {
    match (a, b) {
        (Some(a), Some(b)) => Ok((a, b)),
        _ => Err(SkipReason::Missing),
    }
}

#[derive(Default)]
struct Accumulator {
    weighted: f64,
    weight: f64,
    channels: Vec<ChannelScore>,
}

impl Accumulator {
    fn push(&mut self, channel: Channel, component: Option<&str>, weight: f64, distance: Distance) {
        // Missing beats zero weight so explanations say why data was absent
        let outcome = match distance {
            Err(reason) => Outcome::Skipped { reason },
            Ok(_) if weight == 0.0 => Outcome::Skipped {
                reason: SkipReason::ZeroWeight,
            },
            Ok(distance) => {
                self.weighted += distance * weight;
                self.weight += weight;
                Outcome::Compared { distance, weight }
            }
        };
        self.channels.push(ChannelScore {
            channel,
            component: component.map(str::to_string),
            outcome,
        });
    }

    fn finish(self) -> Comparison {
        let score = if self.weight > 0.0 {
            self.weighted / self.weight
        } else {
            f64::INFINITY
        };
        Comparison {
            score,
            total_weight: self.weight,
            channels: self.channels,
        }
    }
}
