// Stage 5 — filter, order, and number the groups.
//
// Ordering is the only observable ordering in the whole pipeline:
//   1. size descending
//   2. lexicographically smallest member ascending
//   3. full sorted member list ascending (two different cliques can share
//      both size and smallest member)
// Group ids are 1..M in that order, and members inside a group ascend.

use std::cmp::Ordering;

use serde::Serialize;

use super::normalize::{ColumnSelection, DroppedRows};
use super::window::KeywordUrlSets;

/// The caller's choices, emitted next to the grouping table so a report
/// describes how it was produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunParameters {
    pub keyword_column: String,
    pub url_column: String,
    pub rank_column: String,
    pub top_n: u32,
    pub threshold_pct: u32,
    pub min_group_size: usize,
}

impl RunParameters {
    pub fn new(columns: &ColumnSelection, top_n: u32, threshold_pct: u32, min_group_size: usize) -> Self {
        Self {
            keyword_column: columns.keyword.clone(),
            url_column: columns.url.clone(),
            rank_column: columns.rank.clone(),
            top_n,
            threshold_pct,
            min_group_size,
        }
    }

    /// (name, value) rows for the parameters sheet.
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        vec![
            ("keyword_column", self.keyword_column.clone()),
            ("url_column", self.url_column.clone()),
            ("rank_column", self.rank_column.clone()),
            ("top_n", self.top_n.to_string()),
            ("threshold_pct", self.threshold_pct.to_string()),
            ("min_group_size", self.min_group_size.to_string()),
        ]
    }
}

/// Counters collected along the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub rows_read: usize,
    pub dropped: DroppedRows,
    pub keywords: usize,
    pub edges: usize,
    pub maximal_cliques: usize,
}

/// One numbered group of keywords.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Group {
    pub group_id: usize,
    pub keywords: Vec<String>,
}

impl Group {
    pub fn size(&self) -> usize {
        self.keywords.len()
    }
}

/// A flattened `(group_id, keyword, group_size)` row of the report table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    pub group_id: usize,
    pub keyword: String,
    pub group_size: usize,
}

/// The final result of a clique analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupingReport {
    pub parameters: RunParameters,
    pub stats: RunStats,
    pub groups: Vec<Group>,
}

impl GroupingReport {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// The report table, one row per (group, keyword).
    pub fn rows(&self) -> Vec<ReportRow> {
        group_rows(&self.groups)
    }

    /// Number of distinct keywords appearing in any group.
    pub fn grouped_keywords(&self) -> usize {
        let mut all: Vec<&str> = self
            .groups
            .iter()
            .flat_map(|g| g.keywords.iter().map(String::as_str))
            .collect();
        all.sort_unstable();
        all.dedup();
        all.len()
    }
}

/// Flatten groups into report rows.
pub fn group_rows(groups: &[Group]) -> Vec<ReportRow> {
    groups
        .iter()
        .flat_map(|g| {
            g.keywords.iter().map(move |kw| ReportRow {
                group_id: g.group_id,
                keyword: kw.clone(),
                group_size: g.size(),
            })
        })
        .collect()
}

/// Report order for two groups whose members are already sorted.
pub fn compare_groups(a: &[String], b: &[String]) -> Ordering {
    b.len().cmp(&a.len()).then_with(|| a.cmp(b))
}

/// Drop groups below `min_size`, sort members and groups, and number them.
pub fn order_groups(groups: Vec<Vec<String>>, min_size: usize) -> Vec<Group> {
    let mut kept: Vec<Vec<String>> = groups
        .into_iter()
        .filter(|g| g.len() >= min_size)
        .map(|mut g| {
            g.sort();
            g
        })
        .collect();

    kept.sort_by(|a, b| compare_groups(a, b));

    kept.into_iter()
        .enumerate()
        .map(|(i, keywords)| Group {
            group_id: i + 1,
            keywords,
        })
        .collect()
}

/// Turn maximal cliques (as keyword indices) into the final report.
pub fn build_report(
    cliques: &[Vec<u32>],
    sets: &KeywordUrlSets,
    parameters: RunParameters,
    stats: RunStats,
) -> GroupingReport {
    let named: Vec<Vec<String>> = cliques
        .iter()
        .map(|c| c.iter().map(|&v| sets.keyword(v as usize).to_string()).collect())
        .collect();
    let groups = order_groups(named, parameters.min_group_size);

    GroupingReport {
        parameters,
        stats,
        groups,
    }
}
