// Exact-signature keyword grouping (the SERP competitor audit).
//
// Each input row holds a keyword plus its top-K (competitor, URL) pairs.
// Keywords whose pair multisets are identical are grouped together. This is
// the degenerate case of the clique analysis where similarity is 100 on
// equality and 0 otherwise, so a hash bucket per signature replaces the
// graph entirely. Groups are filtered and ordered with the same rules as the
// clique report.

use std::collections::{BTreeSet, HashMap};

use regex_lite::Regex;
use serde::Serialize;
use tracing::{info, warn};

use crate::analysis::report::{compare_groups, Group};
use crate::error::{AnalysisError, ConfigurationError};
use crate::table::Table;

/// Column pair holding one SERP position: who ranks, and with which URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignatureColumns {
    pub competitor: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SemGroupOptions {
    pub keyword_column: String,
    /// One entry per SERP position, top first.
    pub positions: Vec<SignatureColumns>,
    pub min_group_size: usize,
}

impl SemGroupOptions {
    pub fn new(keyword_column: impl Into<String>, positions: Vec<SignatureColumns>) -> Self {
        Self {
            keyword_column: keyword_column.into(),
            positions,
            min_group_size: 2,
        }
    }

    /// Discover numbered columns such as `Competitor 1` / `URL 1` by prefix.
    ///
    /// With `top_k` set, positions 1..=top_k must all exist. Without it, the
    /// contiguous run starting at 1 is used.
    pub fn from_prefixes(
        table: &Table,
        keyword_column: &str,
        competitor_prefix: &str,
        url_prefix: &str,
        top_k: Option<usize>,
    ) -> Result<Self, ConfigurationError> {
        let competitors = numbered_columns(table, competitor_prefix)?;
        let urls = numbered_columns(table, url_prefix)?;

        let mut positions = Vec::new();
        let mut n = 1;
        loop {
            if top_k.is_some_and(|k| n > k) {
                break;
            }
            match (competitors.get(&n), urls.get(&n)) {
                (Some(c), Some(u)) => positions.push(SignatureColumns {
                    competitor: c.clone(),
                    url: u.clone(),
                }),
                (c, _) if top_k.is_some() => {
                    let missing = if c.is_none() {
                        format!("{competitor_prefix}{n}")
                    } else {
                        format!("{url_prefix}{n}")
                    };
                    return Err(ConfigurationError::UnknownColumn {
                        column: missing,
                        available: table.columns().to_vec(),
                    });
                }
                _ => break,
            }
            n += 1;
        }

        if positions.is_empty() {
            return Err(ConfigurationError::Invalid(format!(
                "no numbered columns found for prefixes '{competitor_prefix}' and '{url_prefix}'"
            )));
        }

        Ok(Self::new(keyword_column, positions))
    }

    pub fn with_min_group_size(mut self, min_group_size: usize) -> Self {
        self.min_group_size = min_group_size;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.positions.is_empty() {
            return Err(ConfigurationError::Invalid(
                "at least one competitor/URL column pair is required".to_string(),
            ));
        }
        if !(2..=5).contains(&self.min_group_size) {
            return Err(ConfigurationError::OutOfRange {
                name: "min_group_size",
                value: self.min_group_size as i64,
                min: 2,
                max: 5,
            });
        }
        Ok(())
    }
}

/// Map of position number -> column name for columns named `<prefix><n>`,
/// tolerating whitespace between prefix and number.
fn numbered_columns(table: &Table, prefix: &str) -> Result<HashMap<usize, String>, ConfigurationError> {
    let pattern = format!(r"^{}\s*(\d+)$", regex_lite::escape(prefix.trim()));
    let re = Regex::new(&pattern)
        .map_err(|e| ConfigurationError::Invalid(format!("bad column prefix '{prefix}': {e}")))?;

    let mut found = HashMap::new();
    for column in table.columns() {
        if let Some(n) = re
            .captures(column)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<usize>().ok())
        {
            found.entry(n).or_insert_with(|| column.clone());
        }
    }
    Ok(found)
}

/// One SERP position in a signature.
pub type SignatureEntry = (String, String);

/// A group of keywords sharing one SERP signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignatureGroup {
    #[serde(flatten)]
    pub group: Group,
    /// The shared (competitor, url) multiset, sorted.
    pub signature: Vec<SignatureEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SemGroupStats {
    pub rows_read: usize,
    pub empty_keyword: usize,
    pub empty_signature: usize,
    pub keywords: usize,
    pub signatures: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SemGroupReport {
    pub keyword_column: String,
    pub positions: Vec<SignatureColumns>,
    pub min_group_size: usize,
    pub stats: SemGroupStats,
    pub groups: Vec<SignatureGroup>,
}

impl SemGroupReport {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// (name, value) rows for the parameters sheet.
    pub fn parameter_entries(&self) -> Vec<(&'static str, String)> {
        let competitors: Vec<&str> = self.positions.iter().map(|p| p.competitor.as_str()).collect();
        let urls: Vec<&str> = self.positions.iter().map(|p| p.url.as_str()).collect();
        vec![
            ("keyword_column", self.keyword_column.clone()),
            ("competitor_columns", competitors.join(", ")),
            ("url_columns", urls.join(", ")),
            ("top_k", self.positions.len().to_string()),
            ("min_group_size", self.min_group_size.to_string()),
        ]
    }
}

/// Render a signature as `competitor | url; ...` for flat exports.
pub fn format_signature(signature: &[SignatureEntry]) -> String {
    signature
        .iter()
        .map(|(c, u)| format!("{c} | {u}"))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Group keywords whose top-K (competitor, url) multisets are identical.
pub fn group_by_signature(
    table: &Table,
    options: &SemGroupOptions,
) -> Result<SemGroupReport, AnalysisError> {
    options.validate()?;

    let keyword_idx = table.require_column(&options.keyword_column)?;
    let position_idx = options
        .positions
        .iter()
        .map(|p| -> Result<(usize, usize), ConfigurationError> {
            Ok((table.require_column(&p.competitor)?, table.require_column(&p.url)?))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut stats = SemGroupStats {
        rows_read: table.len(),
        ..Default::default()
    };
    let mut buckets: HashMap<Vec<SignatureEntry>, BTreeSet<String>> = HashMap::new();
    let mut keywords: BTreeSet<&str> = BTreeSet::new();

    for row in table.rows() {
        let keyword = row[keyword_idx].trim();
        if keyword.is_empty() {
            stats.empty_keyword += 1;
            continue;
        }

        let mut signature: Vec<SignatureEntry> = position_idx
            .iter()
            .map(|&(c, u)| (row[c].trim().to_string(), row[u].trim().to_string()))
            .filter(|(c, u)| !(c.is_empty() && u.is_empty()))
            .collect();
        if signature.is_empty() {
            stats.empty_signature += 1;
            continue;
        }
        signature.sort();

        keywords.insert(keyword);
        buckets.entry(signature).or_default().insert(keyword.to_string());
    }

    let dropped = stats.empty_keyword + stats.empty_signature;
    if dropped > 0 {
        warn!(
            dropped,
            empty_keyword = stats.empty_keyword,
            empty_signature = stats.empty_signature,
            "{dropped} rows dropped during normalization"
        );
    }
    stats.keywords = keywords.len();
    stats.signatures = buckets.len();

    let mut kept: Vec<(Vec<String>, Vec<SignatureEntry>)> = buckets
        .into_iter()
        .filter(|(_, kws)| kws.len() >= options.min_group_size)
        .map(|(sig, kws)| (kws.into_iter().collect(), sig))
        .collect();
    kept.sort_by(|a, b| compare_groups(&a.0, &b.0).then_with(|| a.1.cmp(&b.1)));

    let groups: Vec<SignatureGroup> = kept
        .into_iter()
        .enumerate()
        .map(|(i, (keywords, signature))| SignatureGroup {
            group: Group {
                group_id: i + 1,
                keywords,
            },
            signature,
        })
        .collect();

    info!(
        keywords = stats.keywords,
        signatures = stats.signatures,
        groups = groups.len(),
        "SERP signature grouping complete"
    );

    Ok(SemGroupReport {
        keyword_column: options.keyword_column.clone(),
        positions: options.positions.clone(),
        min_group_size: options.min_group_size,
        stats,
        groups,
    })
}
