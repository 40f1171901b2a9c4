// The clique analyzer — five stages wired end to end.
//
//   table -> normalize -> top-N window -> overlap edges -> maximal cliques -> report
//
// Every stage consumes only the previous stage's output. Parameters are
// validated before stage 1 runs, and any error after that point discards
// everything computed so far.

use std::time::Duration;

use tracing::{info, warn};

use super::clique::{self, CliqueBudget, Graph};
use super::control::RunControl;
use super::normalize::{self, ColumnSelection};
use super::overlap::{self, OverlapStrategy};
use super::report::{self, GroupingReport, RunParameters, RunStats};
use super::window::KeywordUrlSets;
use crate::error::{AnalysisError, ConfigurationError};
use crate::table::Table;

pub const DEFAULT_TOP_N: u32 = 10;
pub const DEFAULT_THRESHOLD_PCT: u32 = 50;
pub const DEFAULT_MIN_GROUP_SIZE: usize = 2;

/// The windows SEO tools usually export.
pub const STANDARD_TOP_N: [u32; 6] = [10, 20, 30, 40, 50, 100];

const MAX_TOP_N: u32 = 100;
const MIN_GROUP_SIZE_RANGE: (usize, usize) = (2, 5);

/// Everything a clique analysis run needs besides the table itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisOptions {
    pub columns: ColumnSelection,
    /// Size of the ranking window; also the similarity denominator.
    pub top_n: u32,
    /// Minimum pairwise similarity, in percent of `top_n`.
    pub threshold_pct: u32,
    pub min_group_size: usize,
    pub strategy: OverlapStrategy,
    pub budget: CliqueBudget,
}

impl AnalysisOptions {
    /// Options with default parameters for the given columns.
    pub fn new(columns: ColumnSelection) -> Self {
        Self {
            columns,
            top_n: DEFAULT_TOP_N,
            threshold_pct: DEFAULT_THRESHOLD_PCT,
            min_group_size: DEFAULT_MIN_GROUP_SIZE,
            strategy: OverlapStrategy::Auto,
            budget: CliqueBudget::default(),
        }
    }

    pub fn with_top_n(mut self, top_n: u32) -> Self {
        self.top_n = top_n;
        self
    }

    pub fn with_threshold(mut self, threshold_pct: u32) -> Self {
        self.threshold_pct = threshold_pct;
        self
    }

    pub fn with_min_group_size(mut self, min_group_size: usize) -> Self {
        self.min_group_size = min_group_size;
        self
    }

    pub fn with_strategy(mut self, strategy: OverlapStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_budget(mut self, budget: CliqueBudget) -> Self {
        self.budget = budget;
        self
    }

    /// Range-check every parameter. Column existence is checked against the
    /// table at the start of the run.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        for (role, name) in [
            ("keyword", &self.columns.keyword),
            ("url", &self.columns.url),
            ("rank", &self.columns.rank),
        ] {
            if name.trim().is_empty() {
                return Err(ConfigurationError::Invalid(format!(
                    "no {role} column selected"
                )));
            }
        }

        if !(1..=MAX_TOP_N).contains(&self.top_n) {
            return Err(out_of_range("top_n", self.top_n as i64, 1, MAX_TOP_N as i64));
        }
        if self.threshold_pct > 100 {
            return Err(out_of_range("threshold_pct", self.threshold_pct as i64, 0, 100));
        }
        let (lo, hi) = MIN_GROUP_SIZE_RANGE;
        if !(lo..=hi).contains(&self.min_group_size) {
            return Err(out_of_range(
                "min_group_size",
                self.min_group_size as i64,
                lo as i64,
                hi as i64,
            ));
        }
        if self.budget.max_cliques == Some(0) {
            return Err(ConfigurationError::Invalid(
                "max_cliques must be positive when set".to_string(),
            ));
        }
        if self.budget.max_duration == Some(Duration::ZERO) {
            return Err(ConfigurationError::Invalid(
                "max_seconds must be positive when set".to_string(),
            ));
        }
        Ok(())
    }

    pub fn parameters(&self) -> RunParameters {
        RunParameters::new(&self.columns, self.top_n, self.threshold_pct, self.min_group_size)
    }
}

fn out_of_range(name: &'static str, value: i64, min: i64, max: i64) -> ConfigurationError {
    ConfigurationError::OutOfRange {
        name,
        value,
        min,
        max,
    }
}

/// Run the full clique analysis over a table.
pub fn analyze(
    table: &Table,
    options: &AnalysisOptions,
    control: &RunControl<'_>,
) -> Result<GroupingReport, AnalysisError> {
    options.validate()?;
    if !STANDARD_TOP_N.contains(&options.top_n) {
        warn!(top_n = options.top_n, "Non-standard top-N window");
    }

    // Stage 1
    let normalized = normalize::normalize_rows(table, &options.columns)?;
    control.progress.rows_dropped(&normalized.dropped);
    control.check_cancelled()?;

    // Stage 2
    let sets = KeywordUrlSets::from_observations(&normalized.observations, options.top_n);

    // Stage 3
    let edges = overlap::compute_edges(
        &sets,
        options.top_n,
        options.threshold_pct,
        options.strategy,
        control,
    )?;

    // Stage 4
    let graph = Graph::from_edges(sets.len(), &edges);
    let cliques = clique::enumerate_maximal_cliques(&graph, &options.budget, control)?;

    // Stage 5
    let stats = RunStats {
        rows_read: normalized.rows_read,
        dropped: normalized.dropped,
        keywords: sets.len(),
        edges: graph.edge_count(),
        maximal_cliques: cliques.len(),
    };
    let report = report::build_report(&cliques, &sets, options.parameters(), stats);

    info!(
        groups = report.groups.len(),
        grouped_keywords = report.grouped_keywords(),
        "Keyword grouping complete"
    );
    Ok(report)
}
