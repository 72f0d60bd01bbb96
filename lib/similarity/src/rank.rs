//! Top-k ranking of a corpus against a query descriptor set.

use std::fmt;
use std::str::FromStr;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;
use vizsim_core::{Corpus, CorpusItem, DescriptorSet, Error, ImageId, Result};

use crate::compare::DescriptorComparator;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankMode {
    /// Compare against each item's whole-image descriptors
    #[default]
    WholeImage,
    /// Compare against each detected object and keep the closest one
    PerObject,
}

impl fmt::Display for RankMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RankMode::WholeImage => write!(f, "whole"),
            RankMode::PerObject => write!(f, "object"),
        }
    }
}

impl FromStr for RankMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "whole" | "whole_image" | "image" => Ok(RankMode::WholeImage),
            "object" | "per_object" => Ok(RankMode::PerObject),
            other => Err(Error::InvalidConfig(format!(
                "unknown rank mode '{}', expected 'whole' or 'object'",
                other
            ))),
        }
    }
}

/// Which object of a corpus item produced a per-object match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchInfo {
    pub object_index: usize,
    #[serde(rename = "class")]
    pub class_label: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedMatch {
    pub id: ImageId,
    /// Lower is more similar
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_info: Option<MatchInfo>,
}

/// Ranking parameters beyond the query itself
#[derive(Debug, Clone, PartialEq)]
pub struct RankRequest {
    pub k: usize,
    pub mode: RankMode,
    /// Only items holding at least one object of this class; in per-object
    /// mode only objects of this class are compared
    pub class_filter: Option<String>,
}

impl RankRequest {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            mode: RankMode::WholeImage,
            class_filter: None,
        }
    }

    #[must_use]
    pub fn with_mode(mut self, mode: RankMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn with_class_filter(mut self, class_label: impl Into<String>) -> Self {
        self.class_filter = Some(class_label.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.k == 0 {
            return Err(Error::InvalidConfig("k must be positive".to_string()));
        }
        Ok(())
    }

    pub(crate) fn admits(&self, item: &CorpusItem) -> bool {
        match &self.class_filter {
            Some(class_label) => item.has_class(class_label),
            None => true,
        }
    }
}

/// A scored corpus item before it is turned into output
pub(crate) struct Scored<'a> {
    pub item: &'a CorpusItem,
    pub target: &'a DescriptorSet,
    pub score: f64,
    pub match_info: Option<MatchInfo>,
}

impl Scored<'_> {
    fn to_match(&self) -> RankedMatch {
        RankedMatch {
            id: self.item.id.clone(),
            score: self.score,
            match_info: self.match_info.clone(),
        }
    }
}

/// Orders corpus items by ascending distance to a query
#[derive(Debug, Clone, Default)]
pub struct SimilarityRanker {
    comparator: DescriptorComparator,
}

impl SimilarityRanker {
    pub fn new(comparator: DescriptorComparator) -> Self {
        Self { comparator }
    }

    pub fn comparator(&self) -> &DescriptorComparator {
        &self.comparator
    }

    /// The `k` closest items, best first.
    ///
    /// Ties keep corpus order. Fewer than `k` comparable items returns all
    /// of them.
    pub fn rank<I>(&self, query: &DescriptorSet, corpus: &[I], k: usize, mode: RankMode) -> Result<Vec<RankedMatch>>
    where
        I: AsRef<CorpusItem> + Sync,
    {
        self.rank_with(query, corpus, &RankRequest::new(k).with_mode(mode))
    }

    pub fn rank_with<I>(&self, query: &DescriptorSet, corpus: &[I], request: &RankRequest) -> Result<Vec<RankedMatch>>
    where
        I: AsRef<CorpusItem> + Sync,
    {
        let scored = self.score_all(query, corpus, request)?;
        Ok(scored.iter().map(Scored::to_match).collect())
    }

    /// Rank against a single snapshot of `corpus`
    pub fn rank_corpus(
        &self,
        query: &DescriptorSet,
        corpus: &dyn Corpus,
        request: &RankRequest,
    ) -> Result<Vec<RankedMatch>> {
        let snapshot = corpus.snapshot();
        self.rank_with(query, &snapshot, request)
    }

    /// Use a stored record as the query: its whole image, or one of its
    /// objects when `object_index` is given
    pub fn rank_existing(
        &self,
        record: &CorpusItem,
        object_index: Option<usize>,
        corpus: &dyn Corpus,
        request: &RankRequest,
    ) -> Result<Vec<RankedMatch>> {
        let query = existing_query(record, object_index)?;
        self.rank_corpus(query, corpus, request)
    }

    /// Score, sort and truncate
    pub(crate) fn score_all<'a, I>(
        &self,
        query: &DescriptorSet,
        corpus: &'a [I],
        request: &RankRequest,
    ) -> Result<Vec<Scored<'a>>>
    where
        I: AsRef<CorpusItem> + Sync,
    {
        request.validate()?;

        let mut scored: Vec<Scored<'a>> = corpus
            .par_iter()
            .map(|item| -> &'a CorpusItem { item.as_ref() })
            .filter(|item| request.admits(item))
            .filter_map(|item| match request.mode {
                RankMode::WholeImage => self.score_whole(query, item),
                RankMode::PerObject => self.score_objects(query, item, request.class_filter.as_deref()),
            })
            .collect();

        // Stable: equal scores keep corpus order
        scored.sort_by(|a, b| a.score.total_cmp(&b.score));
        let comparable = scored.len();
        scored.truncate(request.k);

        debug!(
            corpus = corpus.len(),
            comparable,
            returned = scored.len(),
            mode = %request.mode,
            "ranked corpus"
        );
        Ok(scored)
    }

    /// Items without a usable descriptor set are not candidates
    fn score_whole<'a>(&self, query: &DescriptorSet, item: &'a CorpusItem) -> Option<Scored<'a>> {
        let target = item.descriptors.as_ref().filter(|d| !d.is_empty())?;
        Some(Scored {
            item,
            target,
            score: self.comparator.compare(query, target),
            match_info: None,
        })
    }

    /// Closest object wins; the first one wins a tie
    fn score_objects<'a>(
        &self,
        query: &DescriptorSet,
        item: &'a CorpusItem,
        class_filter: Option<&str>,
    ) -> Option<Scored<'a>> {
        let mut best: Option<Scored<'a>> = None;
        for (index, object) in item.objects.iter().enumerate() {
            if class_filter.is_some_and(|c| c != object.class_label) {
                continue;
            }
            let Some(target) = object.descriptors.as_ref().filter(|d| !d.is_empty()) else {
                continue;
            };
            let score = self.comparator.compare(query, target);
            if best.as_ref().map_or(true, |b| score < b.score) {
                best = Some(Scored {
                    item,
                    target,
                    score,
                    match_info: Some(MatchInfo {
                        object_index: index,
                        class_label: object.class_label.clone(),
                        confidence: object.confidence,
                    }),
                });
            }
        }
        best
    }
}

pub(crate) fn existing_query(record: &CorpusItem, object_index: Option<usize>) -> Result<&DescriptorSet> {
    record
        .query_descriptors(object_index)?
        .ok_or_else(|| Error::Extraction {
            channel: None,
            reason: format!("record {} has no descriptors to query with", record.id),
        })
}
