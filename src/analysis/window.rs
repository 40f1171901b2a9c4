// Stage 2 — the top-N window.
//
// `rank <= N` is a row-level predicate: every URL observed at or above rank
// N for a keyword goes into that keyword's set, duplicates collapse by set
// membership. Keywords are stored in lexicographic order, which fixes their
// dense indices independently of input row order.

use std::collections::{BTreeMap, HashSet};

use super::normalize::Observation;

/// Keyword -> set of URLs ranking within the top-N window.
///
/// Invariant: every set is non-empty and keywords ascend lexicographically.
/// A keyword's position in `keywords()` is its vertex id in the similarity
/// graph.
#[derive(Debug, Clone, Default)]
pub struct KeywordUrlSets {
    keywords: Vec<String>,
    sets: Vec<HashSet<String>>,
}

impl KeywordUrlSets {
    /// Apply the top-N filter to a stream of observations.
    pub fn from_observations(observations: &[Observation], top_n: u32) -> Self {
        let mut by_keyword: BTreeMap<&str, HashSet<String>> = BTreeMap::new();
        for obs in observations.iter().filter(|o| o.rank <= top_n) {
            by_keyword
                .entry(obs.keyword.as_str())
                .or_default()
                .insert(obs.url.clone());
        }

        let mut keywords = Vec::with_capacity(by_keyword.len());
        let mut sets = Vec::with_capacity(by_keyword.len());
        for (keyword, urls) in by_keyword {
            keywords.push(keyword.to_string());
            sets.push(urls);
        }

        tracing::debug!(keywords = keywords.len(), top_n, "Applied top-N window");
        Self { keywords, sets }
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn keyword(&self, idx: usize) -> &str {
        &self.keywords[idx]
    }

    pub fn sets(&self) -> &[HashSet<String>] {
        &self.sets
    }
}
