use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;

use crate::analysis::clique::{CliqueBudget, DEFAULT_MAX_CLIQUES};
use crate::analysis::pipeline::{DEFAULT_MIN_GROUP_SIZE, DEFAULT_THRESHOLD_PCT, DEFAULT_TOP_N};
use crate::error::ConfigurationError;

/// Defaults loaded from environment variables.
///
/// The .env file is loaded automatically at startup via dotenvy. Command-line
/// flags override every value here; range checks happen when the analysis
/// options are validated, not at load time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub top_n: u32,
    pub threshold_pct: u32,
    pub min_group_size: usize,
    /// Cap on maximal cliques before the run is aborted. `None` disables it
    /// (CORANK_MAX_CLIQUES=0).
    pub max_cliques: Option<u64>,
    /// Wall-clock cap on clique enumeration.
    pub max_seconds: Option<u64>,
    /// Where reports go when no explicit output path is given.
    pub output_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            top_n: DEFAULT_TOP_N,
            threshold_pct: DEFAULT_THRESHOLD_PCT,
            min_group_size: DEFAULT_MIN_GROUP_SIZE,
            max_cliques: Some(DEFAULT_MAX_CLIQUES),
            max_seconds: None,
            output_dir: PathBuf::from("."),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Unset variables fall back to defaults; set-but-unparseable ones are
    /// an error rather than silently ignored.
    pub fn load() -> Result<Self> {
        let defaults = Self::default();

        let max_cliques = match env_parse::<u64>("CORANK_MAX_CLIQUES")? {
            Some(0) => None,
            Some(n) => Some(n),
            None => defaults.max_cliques,
        };

        Ok(Self {
            top_n: env_parse("CORANK_TOP_N")?.unwrap_or(defaults.top_n),
            threshold_pct: env_parse("CORANK_THRESHOLD")?.unwrap_or(defaults.threshold_pct),
            min_group_size: env_parse("CORANK_MIN_GROUP_SIZE")?
                .unwrap_or(defaults.min_group_size),
            max_cliques,
            max_seconds: env_parse::<u64>("CORANK_MAX_SECONDS")?.filter(|s| *s > 0),
            output_dir: env::var("CORANK_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
        })
    }

    /// The clique budget, with optional command-line overrides applied.
    pub fn budget(&self, max_cliques: Option<u64>, max_seconds: Option<u64>) -> CliqueBudget {
        let max_cliques = match max_cliques {
            Some(0) => None,
            Some(n) => Some(n),
            None => self.max_cliques,
        };
        let max_seconds = match max_seconds {
            Some(0) => None,
            Some(n) => Some(n),
            None => self.max_seconds,
        };
        CliqueBudget {
            max_cliques,
            max_duration: max_seconds.map(Duration::from_secs),
        }
    }
}

fn env_parse<T>(name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) if raw.trim().is_empty() => Ok(None),
        Ok(raw) => match raw.trim().parse::<T>() {
            Ok(value) => Ok(Some(value)),
            Err(e) => Err(ConfigurationError::Invalid(format!(
                "{name} is not a valid number: '{raw}' ({e})"
            ))
            .into()),
        },
        Err(_) => Ok(None),
    }
}
