// Stage 3 — pairwise URL overlap between keywords.
//
// Similarity is the number of shared top-N URLs scaled by the window size:
//
//   sim(a, b) = 100 * |U_a ∩ U_b| / N
//
// The denominator is N, not |U_a ∪ U_b|. A threshold of 50% with N = 10
// reads as "five of the top ten URLs coincide" regardless of how many URLs
// either keyword actually has. Threshold checks are done on the integer
// shared count so no floating point rounding can move a pair across the
// boundary.
//
// Two engines produce the same edge set:
//   - pairwise: every unordered pair, intersecting from the smaller set
//     and bailing out as soon as the threshold is out of reach
//   - inverted index: url -> keywords, counting co-occurrences per pair,
//     O(sum over urls of |kw(url)|^2). Much faster on large sparse inputs.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info};

use super::control::RunControl;
use super::window::KeywordUrlSets;
use crate::error::AnalysisError;

/// Above this many keywords, `Auto` switches to the inverted index.
pub const INVERTED_INDEX_MIN_KEYWORDS: usize = 2000;

/// Which overlap engine to run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OverlapStrategy {
    /// Pick by input size
    #[default]
    Auto,
    /// Compare every pair directly
    Pairwise,
    /// Count co-occurrences through a url -> keywords index
    #[value(name = "inverted")]
    InvertedIndex,
}

/// An undirected edge between two keyword indices (`a < b`) whose overlap
/// met the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SimilarityEdge {
    pub a: u32,
    pub b: u32,
    /// Number of shared URLs in the top-N window.
    pub shared: u32,
}

impl SimilarityEdge {
    pub fn similarity(&self, top_n: u32) -> f64 {
        similarity(self.shared as usize, top_n)
    }
}

/// Overlap percentage for `shared` URLs in a window of `top_n`, capped at 100.
pub fn similarity(shared: usize, top_n: u32) -> f64 {
    if top_n == 0 {
        return 0.0;
    }
    (100.0 * shared as f64 / top_n as f64).min(100.0)
}

/// Smallest shared-URL count whose similarity reaches `threshold_pct`.
pub fn required_shared(top_n: u32, threshold_pct: u32) -> usize {
    ((threshold_pct as u64 * top_n as u64 + 99) / 100) as usize
}

/// Intersection size if it reaches `needed`, giving up as soon as the
/// remaining elements of the smaller set can no longer get there.
fn shared_at_least(a: &HashSet<String>, b: &HashSet<String>, needed: usize) -> Option<usize> {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    if small.len() < needed {
        return None;
    }

    let mut shared = 0;
    let mut remaining = small.len();
    for url in small {
        remaining -= 1;
        if large.contains(url) {
            shared += 1;
        } else if shared + remaining < needed {
            return None;
        }
    }
    (shared >= needed).then_some(shared)
}

/// Tracks processed pairs and forwards coarse updates to the progress sink.
struct PairProgress<'c, 'a> {
    control: &'c RunControl<'a>,
    keywords: u64,
    total: u64,
    done: u64,
    next_report: u64,
    step: u64,
}

impl<'c, 'a> PairProgress<'c, 'a> {
    fn new(control: &'c RunControl<'a>, keywords: usize) -> Self {
        let k = keywords as u64;
        let total = k * k.saturating_sub(1) / 2;
        let step = (total / 100).max(1);
        Self {
            control,
            keywords: k,
            total,
            done: 0,
            next_report: step,
            step,
        }
    }

    /// All pairs (i, j > i) are decided once row i is finished.
    fn row_done(&mut self, i: usize) {
        let decided = self.keywords - 1 - i as u64;
        if decided == 0 {
            return;
        }
        self.done += decided;
        if self.done >= self.next_report || self.done == self.total {
            self.control.progress.pairs_processed(self.done, self.total);
            self.next_report = self.done + self.step;
        }
    }
}

/// Compute every similarity edge at or above `threshold_pct`.
pub fn compute_edges(
    sets: &KeywordUrlSets,
    top_n: u32,
    threshold_pct: u32,
    strategy: OverlapStrategy,
    control: &RunControl<'_>,
) -> Result<Vec<SimilarityEdge>, AnalysisError> {
    let needed = required_shared(top_n, threshold_pct);

    // With a zero requirement every pair is an edge, including pairs that
    // share nothing, which the inverted index never visits.
    let engine = match strategy {
        _ if needed == 0 => OverlapStrategy::Pairwise,
        OverlapStrategy::Auto if sets.len() >= INVERTED_INDEX_MIN_KEYWORDS => {
            OverlapStrategy::InvertedIndex
        }
        OverlapStrategy::Auto => OverlapStrategy::Pairwise,
        other => other,
    };
    debug!(?engine, needed, keywords = sets.len(), "Computing keyword overlap");

    let edges = match engine {
        OverlapStrategy::InvertedIndex => inverted_index_edges(sets, needed, control)?,
        _ => pairwise_edges(sets, needed, control)?,
    };

    if let Some(strongest) = edges.iter().max_by_key(|e| e.shared) {
        debug!(
            a = sets.keyword(strongest.a as usize),
            b = sets.keyword(strongest.b as usize),
            similarity = strongest.similarity(top_n),
            "Strongest keyword overlap"
        );
    }
    info!(
        keywords = sets.len(),
        edges = edges.len(),
        threshold_pct,
        top_n,
        "Similarity graph built"
    );
    Ok(edges)
}

fn pairwise_edges(
    sets: &KeywordUrlSets,
    needed: usize,
    control: &RunControl<'_>,
) -> Result<Vec<SimilarityEdge>, AnalysisError> {
    let all = sets.sets();
    let mut progress = PairProgress::new(control, all.len());
    let mut edges = Vec::new();

    for (i, a) in all.iter().enumerate() {
        control.check_cancelled()?;
        for (j, b) in all.iter().enumerate().skip(i + 1) {
            if let Some(shared) = shared_at_least(a, b, needed) {
                edges.push(SimilarityEdge {
                    a: i as u32,
                    b: j as u32,
                    shared: shared as u32,
                });
            }
        }
        progress.row_done(i);
    }

    Ok(edges)
}

fn inverted_index_edges(
    sets: &KeywordUrlSets,
    needed: usize,
    control: &RunControl<'_>,
) -> Result<Vec<SimilarityEdge>, AnalysisError> {
    let all = sets.sets();

    // Postings lists come out ascending because keywords are visited in
    // index order.
    let mut index: HashMap<&str, Vec<u32>> = HashMap::new();
    for (i, urls) in all.iter().enumerate() {
        for url in urls {
            index.entry(url.as_str()).or_default().push(i as u32);
        }
    }
    debug!(urls = index.len(), "Built url -> keyword index");

    let mut progress = PairProgress::new(control, all.len());
    let mut counts = vec![0u32; all.len()];
    let mut touched: Vec<u32> = Vec::new();
    let mut edges = Vec::new();

    for (i, urls) in all.iter().enumerate() {
        control.check_cancelled()?;
        for url in urls {
            let Some(postings) = index.get(url.as_str()) else {
                continue;
            };
            let start = postings.partition_point(|&j| j <= i as u32);
            for &j in &postings[start..] {
                if counts[j as usize] == 0 {
                    touched.push(j);
                }
                counts[j as usize] += 1;
            }
        }

        for &j in &touched {
            let shared = counts[j as usize];
            if shared as usize >= needed {
                edges.push(SimilarityEdge {
                    a: i as u32,
                    b: j,
                    shared,
                });
            }
            counts[j as usize] = 0;
        }
        touched.clear();
        progress.row_done(i);
    }

    Ok(edges)
}
