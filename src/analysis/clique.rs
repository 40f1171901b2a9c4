// Stage 4 — maximal clique enumeration.
//
// Bron–Kerbosch with Tomita pivoting over an arena graph: vertices are dense
// keyword indices and each adjacency list is a sorted u32 array, so every
// set operation in the recursion is a linear merge. The outermost level
// walks vertices in degeneracy order, which keeps the top-level candidate
// sets no larger than the graph's degeneracy.
//
// Worst case is exponential. Real SEO graphs are sparse with small cliques,
// but a CliqueBudget can cap clique count and wall time as a safety valve.

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use super::control::RunControl;
use super::overlap::SimilarityEdge;
use crate::error::AnalysisError;

/// Default cap on emitted maximal cliques.
pub const DEFAULT_MAX_CLIQUES: u64 = 1_000_000;

/// How often (in recursive calls) the wall clock is consulted, starting
/// with the first.
const CLOCK_CHECK_INTERVAL: u64 = 256;

/// Operational limits on enumeration. Not part of the algorithm's contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CliqueBudget {
    pub max_cliques: Option<u64>,
    pub max_duration: Option<Duration>,
}

impl Default for CliqueBudget {
    fn default() -> Self {
        Self {
            max_cliques: Some(DEFAULT_MAX_CLIQUES),
            max_duration: None,
        }
    }
}

impl CliqueBudget {
    pub fn unlimited() -> Self {
        Self {
            max_cliques: None,
            max_duration: None,
        }
    }
}

/// Undirected simple graph over vertices `0..n`.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    adjacency: Vec<Vec<u32>>,
}

impl Graph {
    /// Build from vertex pairs. Self-loops are ignored and parallel edges
    /// collapse.
    pub fn from_pairs(vertex_count: usize, pairs: impl IntoIterator<Item = (u32, u32)>) -> Self {
        let mut adjacency = vec![Vec::new(); vertex_count];
        for (a, b) in pairs {
            if a == b {
                continue;
            }
            adjacency[a as usize].push(b);
            adjacency[b as usize].push(a);
        }
        for list in &mut adjacency {
            list.sort_unstable();
            list.dedup();
        }
        Self { adjacency }
    }

    pub fn from_edges(vertex_count: usize, edges: &[SimilarityEdge]) -> Self {
        Self::from_pairs(vertex_count, edges.iter().map(|e| (e.a, e.b)))
    }

    pub fn vertex_count(&self) -> usize {
        self.adjacency.len()
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency.iter().map(Vec::len).sum::<usize>() / 2
    }

    pub fn neighbors(&self, v: u32) -> &[u32] {
        &self.adjacency[v as usize]
    }

    /// Vertices in degeneracy order: repeatedly remove a minimum-degree
    /// vertex. Ties go to the lower index.
    pub fn degeneracy_order(&self) -> Vec<u32> {
        let n = self.vertex_count();
        let mut degree: Vec<usize> = self.adjacency.iter().map(Vec::len).collect();
        let mut removed = vec![false; n];
        let mut queue: BTreeSet<(usize, u32)> =
            (0..n).map(|v| (degree[v], v as u32)).collect();
        let mut order = Vec::with_capacity(n);

        while let Some((_, v)) = queue.pop_first() {
            removed[v as usize] = true;
            order.push(v);
            for &u in self.neighbors(v) {
                let ui = u as usize;
                if removed[ui] {
                    continue;
                }
                queue.remove(&(degree[ui], u));
                degree[ui] -= 1;
                queue.insert((degree[ui], u));
            }
        }
        order
    }
}

/// Enumerate every maximal clique with at least two vertices. Each clique is
/// returned with its vertices ascending; the order of cliques is unspecified.
pub fn enumerate_maximal_cliques(
    graph: &Graph,
    budget: &CliqueBudget,
    control: &RunControl<'_>,
) -> Result<Vec<Vec<u32>>, AnalysisError> {
    let mut search = Search {
        graph,
        budget,
        control,
        started: Instant::now(),
        calls: 0,
        found: Vec::new(),
    };

    let order = graph.degeneracy_order();
    let mut position = vec![0usize; graph.vertex_count()];
    for (pos, &v) in order.iter().enumerate() {
        position[v as usize] = pos;
    }

    let mut r = Vec::new();
    for &v in &order {
        let neighbors = graph.neighbors(v);
        if neighbors.is_empty() {
            continue;
        }
        let here = position[v as usize];
        let p: Vec<u32> = neighbors
            .iter()
            .copied()
            .filter(|&u| position[u as usize] > here)
            .collect();
        let x: Vec<u32> = neighbors
            .iter()
            .copied()
            .filter(|&u| position[u as usize] < here)
            .collect();

        r.push(v);
        search.expand(&mut r, p, x)?;
        r.pop();
    }

    debug!(calls = search.calls, "Clique search finished");
    info!(
        vertices = graph.vertex_count(),
        edges = graph.edge_count(),
        cliques = search.found.len(),
        "Enumerated maximal cliques"
    );
    control.progress.cliques_found(search.found.len());
    Ok(search.found)
}

struct Search<'g, 'c, 'a> {
    graph: &'g Graph,
    budget: &'g CliqueBudget,
    control: &'c RunControl<'a>,
    started: Instant,
    calls: u64,
    found: Vec<Vec<u32>>,
}

impl Search<'_, '_, '_> {
    fn expand(&mut self, r: &mut Vec<u32>, mut p: Vec<u32>, mut x: Vec<u32>) -> Result<(), AnalysisError> {
        self.tick()?;

        if p.is_empty() {
            if x.is_empty() && r.len() >= 2 {
                self.emit(r)?;
            }
            return Ok(());
        }

        let pivot = self.pivot(&p, &x);
        let candidates = difference(&p, self.graph.neighbors(pivot));

        for v in candidates {
            let nv = self.graph.neighbors(v);
            let next_p = intersect(&p, nv);
            let next_x = intersect(&x, nv);

            r.push(v);
            self.expand(r, next_p, next_x)?;
            r.pop();

            if let Ok(idx) = p.binary_search(&v) {
                p.remove(idx);
            }
            if let Err(idx) = x.binary_search(&v) {
                x.insert(idx, v);
            }
        }
        Ok(())
    }

    /// The vertex of P ∪ X with the most neighbours in P.
    fn pivot(&self, p: &[u32], x: &[u32]) -> u32 {
        let mut best = p[0];
        let mut best_count = 0;
        for &u in p.iter().chain(x) {
            let count = intersect_count(p, self.graph.neighbors(u));
            if count > best_count {
                best = u;
                best_count = count;
            }
        }
        best
    }

    fn tick(&mut self) -> Result<(), AnalysisError> {
        self.control.check_cancelled()?;
        self.calls += 1;
        if let Some(limit) = self.budget.max_duration {
            if self.calls % CLOCK_CHECK_INTERVAL == 1 && self.started.elapsed() > limit {
                return Err(AnalysisError::ResourceBudgetExceeded {
                    what: "enumeration seconds",
                    limit: limit.as_secs(),
                });
            }
        }
        Ok(())
    }

    fn emit(&mut self, r: &[u32]) -> Result<(), AnalysisError> {
        let mut clique = r.to_vec();
        clique.sort_unstable();
        self.found.push(clique);
        if let Some(limit) = self.budget.max_cliques {
            if self.found.len() as u64 > limit {
                return Err(AnalysisError::ResourceBudgetExceeded {
                    what: "maximal clique count",
                    limit,
                });
            }
        }
        Ok(())
    }
}

fn intersect(a: &[u32], b: &[u32]) -> Vec<u32> {
    let mut out = Vec::with_capacity(a.len().min(b.len()));
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                out.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }
    out
}

fn intersect_count(a: &[u32], b: &[u32]) -> usize {
    let (mut i, mut j, mut n) = (0, 0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                n += 1;
                i += 1;
                j += 1;
            }
        }
    }
    n
}

/// Elements of sorted `a` not present in sorted `b`.
fn difference(a: &[u32], b: &[u32]) -> Vec<u32> {
    let mut out = Vec::new();
    let mut j = 0;
    for &v in a {
        while j < b.len() && b[j] < v {
            j += 1;
        }
        if j >= b.len() || b[j] != v {
            out.push(v);
        }
    }
    out
}
