//! Explained search results
//!
//! Pairs each ranked match with the per-channel breakdown of its score and
//! summarises the whole ranking, in a shape that serialises straight to JSON.

use serde::Serialize;
use vizsim_core::{Corpus, CorpusItem, DescriptorSet, ImageId, Result};

use crate::compare::ChannelScore;
use crate::rank::{existing_query, MatchInfo, RankRequest, RankedMatch, Scored, SimilarityRanker};

/// A ranked match with the channel lines behind its score
#[derive(Debug, Clone, Serialize)]
pub struct ExplainedMatch {
    pub id: ImageId,
    pub score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_info: Option<MatchInfo>,
    pub explain: Vec<ChannelScore>,
}

impl ExplainedMatch {
    pub fn to_match(&self) -> RankedMatch {
        RankedMatch {
            id: self.id.clone(),
            score: self.score,
            match_info: self.match_info.clone(),
        }
    }
}

/// Summary statistics for one ranking
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingStats {
    /// Corpus items that passed the class filter
    pub candidates_count: usize,
    pub results_count: usize,
    /// Score of the first result, when it is finite
    pub best_score: Option<f64>,
    /// Mean over the finite result scores
    pub mean_score: Option<f64>,
}

impl RankingStats {
    /// Results must already be sorted best first
    pub fn compute(scores: &[f64], candidates_count: usize) -> Self {
        let finite: Vec<f64> = scores.iter().copied().filter(|s| s.is_finite()).collect();
        let mean_score = if finite.is_empty() {
            None
        } else {
            Some(finite.iter().sum::<f64>() / finite.len() as f64)
        };
        Self {
            candidates_count,
            results_count: scores.len(),
            best_score: scores.first().copied().filter(|s| s.is_finite()),
            mean_score,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub result: Vec<ExplainedMatch>,
    pub stats: RankingStats,
}

impl SearchResponse {
    pub fn matches(&self) -> Vec<RankedMatch> {
        self.result.iter().map(ExplainedMatch::to_match).collect()
    }
}

impl SimilarityRanker {
    /// Rank like [`rank_with`](Self::rank_with) and explain every result
    pub fn search<I>(&self, query: &DescriptorSet, corpus: &[I], request: &RankRequest) -> Result<SearchResponse>
    where
        I: AsRef<CorpusItem> + Sync,
    {
        let scored = self.score_all(query, corpus, request)?;
        let candidates_count = corpus.iter().filter(|i| request.admits(i.as_ref())).count();

        let scores: Vec<f64> = scored.iter().map(|s| s.score).collect();
        let result = scored
            .into_iter()
            .map(|s| self.explain_one(query, s))
            .collect();

        Ok(SearchResponse {
            result,
            stats: RankingStats::compute(&scores, candidates_count),
        })
    }

    pub fn search_corpus(
        &self,
        query: &DescriptorSet,
        corpus: &dyn Corpus,
        request: &RankRequest,
    ) -> Result<SearchResponse> {
        let snapshot = corpus.snapshot();
        self.search(query, &snapshot, request)
    }

    pub fn search_existing(
        &self,
        record: &CorpusItem,
        object_index: Option<usize>,
        corpus: &dyn Corpus,
        request: &RankRequest,
    ) -> Result<SearchResponse> {
        let query = existing_query(record, object_index)?;
        self.search_corpus(query, corpus, request)
    }

    fn explain_one(&self, query: &DescriptorSet, scored: Scored<'_>) -> ExplainedMatch {
        let comparison = self.comparator().explain(query, scored.target);
        ExplainedMatch {
            id: scored.item.id.clone(),
            score: scored.score,
            match_info: scored.match_info,
            explain: comparison.channels,
        }
    }
}
