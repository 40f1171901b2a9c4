// Stage 1 — coerce raw table rows into (keyword, url, rank) observations.
//
// Rows that cannot be coerced are dropped and counted, never fatal. The only
// hard failure is a selected column that does not exist, and that is checked
// for all three columns before a single row is looked at.

use serde::Serialize;
use tracing::{info, warn};

use crate::error::ConfigurationError;
use crate::table::Table;

/// Which columns of the input table supply keyword, URL, and rank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnSelection {
    pub keyword: String,
    pub url: String,
    pub rank: String,
}

impl ColumnSelection {
    pub fn new(keyword: impl Into<String>, url: impl Into<String>, rank: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            url: url.into(),
            rank: rank.into(),
        }
    }
}

/// One ranking observation: `url` ranked at `rank` for `keyword`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub keyword: String,
    pub url: String,
    pub rank: u32,
}

/// Rows discarded during normalization, by reason. Each row is counted once,
/// under the first check it fails (keyword, then URL, then rank).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DroppedRows {
    pub empty_keyword: usize,
    pub empty_url: usize,
    pub invalid_rank: usize,
}

impl DroppedRows {
    pub fn total(&self) -> usize {
        self.empty_keyword + self.empty_url + self.invalid_rank
    }
}

/// Output of stage 1.
#[derive(Debug, Clone, Default)]
pub struct Normalized {
    pub observations: Vec<Observation>,
    pub dropped: DroppedRows,
    pub rows_read: usize,
}

/// Canonical form of a ranking URL: surrounding whitespace removed, nothing
/// else touched. URLs arrive already normalized by GSC / the SERP tool.
pub fn canonical_url(raw: &str) -> &str {
    raw.trim()
}

/// Coerce a rank cell to a positive integer.
///
/// Accepts integer literals and integral floats (`"3.0"` is what most
/// spreadsheet exports produce, `"1e1"` what some JSON serializers emit).
/// Ranks too large for `u32` saturate, which keeps them valid rows that no
/// window includes. Zero, negatives, fractions, and anything non-numeric
/// yield `None`.
pub fn coerce_rank(raw: &str) -> Option<u32> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(rank) = raw.parse::<u64>() {
        return (rank >= 1).then(|| u32::try_from(rank).unwrap_or(u32::MAX));
    }
    let value = raw.parse::<f64>().ok()?;
    if !value.is_finite() || value.fract() != 0.0 || value < 1.0 {
        return None;
    }
    // `as` saturates float-to-int casts
    Some(value as u32)
}

/// Run stage 1 over a table.
pub fn normalize_rows(
    table: &Table,
    columns: &ColumnSelection,
) -> Result<Normalized, ConfigurationError> {
    let keyword_idx = table.require_column(&columns.keyword)?;
    let url_idx = table.require_column(&columns.url)?;
    let rank_idx = table.require_column(&columns.rank)?;

    let mut out = Normalized {
        observations: Vec::with_capacity(table.len()),
        dropped: DroppedRows::default(),
        rows_read: table.len(),
    };

    for row in table.rows() {
        let keyword = row[keyword_idx].trim();
        if keyword.is_empty() {
            out.dropped.empty_keyword += 1;
            continue;
        }
        let url = canonical_url(&row[url_idx]);
        if url.is_empty() {
            out.dropped.empty_url += 1;
            continue;
        }
        let Some(rank) = coerce_rank(&row[rank_idx]) else {
            out.dropped.invalid_rank += 1;
            continue;
        };
        out.observations.push(Observation {
            keyword: keyword.to_string(),
            url: url.to_string(),
            rank,
        });
    }

    if out.dropped.total() > 0 {
        warn!(
            dropped = out.dropped.total(),
            empty_keyword = out.dropped.empty_keyword,
            empty_url = out.dropped.empty_url,
            invalid_rank = out.dropped.invalid_rank,
            "{} rows dropped during normalization",
            out.dropped.total()
        );
    }
    info!(
        rows = out.rows_read,
        observations = out.observations.len(),
        "Normalized ranking observations"
    );

    Ok(out)
}
