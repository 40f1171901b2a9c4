use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use corank::analysis::control::{CancelFlag, ProgressSink, RunControl};
use corank::analysis::normalize::{ColumnSelection, DroppedRows};
use corank::analysis::overlap::OverlapStrategy;
use corank::analysis::{analyze, AnalysisOptions};
use corank::config::Config;
use corank::error::{AnalysisError, ConfigurationError};
use corank::output::export::{self, ExportFormat};
use corank::output::terminal;
use corank::semgroup::{self, SemGroupOptions, SignatureColumns};
use corank::table::{InputFormat, Table};

/// corank: keyword co-ranking analysis for SEO.
///
/// Groups keywords whose search results share the same ranking URLs, so they
/// can be targeted by one page instead of competing with each other.
#[derive(Parser)]
#[command(name = "corank", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Group keywords into maximal cliques of shared top-N ranking URLs
    Cluster {
        #[command(flatten)]
        input: InputArgs,

        /// Column holding the keyword
        #[arg(long = "keyword-col")]
        keyword_col: String,

        /// Column holding the ranking URL
        #[arg(long = "url-col")]
        url_col: String,

        /// Column holding the rank position
        #[arg(long = "rank-col")]
        rank_col: String,

        /// Ranking window N (default: 10, or CORANK_TOP_N)
        #[arg(long)]
        top_n: Option<u32>,

        /// Minimum shared URLs as a percentage of N (default: 50, or CORANK_THRESHOLD)
        #[arg(long)]
        threshold: Option<u32>,

        /// Smallest group to report (default: 2, or CORANK_MIN_GROUP_SIZE)
        #[arg(long)]
        min_group_size: Option<usize>,

        /// Abort after this many maximal cliques (0 = unlimited)
        #[arg(long)]
        max_cliques: Option<u64>,

        /// Abort clique enumeration after this many seconds (0 = unlimited)
        #[arg(long)]
        max_seconds: Option<u64>,

        /// Overlap engine
        #[arg(long, value_enum, default_value = "auto")]
        strategy: OverlapStrategy,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Group keywords whose top-K competitor/URL pairs are identical
    Semgroup {
        #[command(flatten)]
        input: InputArgs,

        /// Column holding the keyword
        #[arg(long = "keyword-col")]
        keyword_col: String,

        /// Explicit column pair COMPETITOR=URL, one per SERP position (repeatable)
        #[arg(long = "pair", conflicts_with_all = ["competitor_prefix", "url_prefix"])]
        pairs: Vec<String>,

        /// Prefix of numbered competitor columns (e.g. "Competitor ")
        #[arg(long, requires = "url_prefix")]
        competitor_prefix: Option<String>,

        /// Prefix of numbered URL columns (e.g. "URL ")
        #[arg(long, requires = "competitor_prefix")]
        url_prefix: Option<String>,

        /// Number of SERP positions to compare (default: every numbered column found)
        #[arg(long)]
        top_k: Option<usize>,

        /// Smallest group to report (default: 2, or CORANK_MIN_GROUP_SIZE)
        #[arg(long)]
        min_group_size: Option<usize>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// List the columns of an input table
    Columns {
        #[command(flatten)]
        input: InputArgs,
    },
}

#[derive(Args)]
struct InputArgs {
    /// Input table (.csv, .tsv, .json, .jsonl)
    input: PathBuf,

    /// Force the input format instead of inferring it from the extension
    #[arg(long, value_enum)]
    input_format: Option<InputFormat>,
}

#[derive(Args)]
struct OutputArgs {
    /// Report path (default: timestamped file in CORANK_OUTPUT_DIR)
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Report format
    #[arg(long, value_enum, default_value = "csv")]
    format: ExportFormat,

    /// Only display the report, don't write files
    #[arg(long)]
    no_write: bool,
}

#[tokio::main]
async fn main() {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    // Logs go to stderr so the report tables stay clean on stdout
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("corank=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        eprintln!("{} {:#}", "error:".red().bold(), err);
        std::process::exit(exit_code(&err));
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;

    match cli.command {
        Commands::Cluster {
            input,
            keyword_col,
            url_col,
            rank_col,
            top_n,
            threshold,
            min_group_size,
            max_cliques,
            max_seconds,
            strategy,
            output,
        } => {
            let table = load_table(&input)?;
            let options = AnalysisOptions::new(ColumnSelection::new(keyword_col, url_col, rank_col))
                .with_top_n(top_n.unwrap_or(config.top_n))
                .with_threshold(threshold.unwrap_or(config.threshold_pct))
                .with_min_group_size(min_group_size.unwrap_or(config.min_group_size))
                .with_strategy(strategy)
                .with_budget(config.budget(max_cliques, max_seconds));
            options.validate().map_err(AnalysisError::from)?;

            let report = run_cancellable(move |control| analyze(&table, &options, control)).await?;
            terminal::display_grouping_report(&report);

            if !output.no_write {
                let path = output_path(&output, &config, "keyword-groups");
                let written = export::write_grouping_report(&report, &path, output.format)?;
                print_written(&written);
            }
        }

        Commands::Semgroup {
            input,
            keyword_col,
            pairs,
            competitor_prefix,
            url_prefix,
            top_k,
            min_group_size,
            output,
        } => {
            let table = load_table(&input)?;
            let options = match (competitor_prefix, url_prefix) {
                (Some(c), Some(u)) => {
                    SemGroupOptions::from_prefixes(&table, &keyword_col, &c, &u, top_k)
                        .map_err(AnalysisError::from)?
                }
                _ => {
                    let mut positions = parse_pairs(&pairs).map_err(AnalysisError::from)?;
                    if let Some(k) = top_k {
                        positions.truncate(k);
                    }
                    SemGroupOptions::new(keyword_col, positions)
                }
            }
            .with_min_group_size(min_group_size.unwrap_or(config.min_group_size));

            let report = semgroup::group_by_signature(&table, &options)?;
            terminal::display_semgroup_report(&report);

            if !output.no_write {
                let path = output_path(&output, &config, "serp-groups");
                let written = export::write_semgroup_report(&report, &path, output.format)?;
                print_written(&written);
            }
        }

        Commands::Columns { input } => {
            let table = load_table(&input)?;
            terminal::display_columns(&table);
        }
    }

    Ok(())
}

fn load_table(input: &InputArgs) -> Result<Table> {
    Table::load(&input.input, input.input_format)
        .with_context(|| format!("could not load {}", input.input.display()))
}

fn output_path(output: &OutputArgs, config: &Config, prefix: &str) -> PathBuf {
    output
        .output
        .clone()
        .unwrap_or_else(|| export::default_output_path(&config.output_dir, prefix, output.format))
}

fn print_written(paths: &[PathBuf]) {
    for path in paths {
        println!("  {} {}", "wrote".green(), path.display());
    }
}

/// Parse `COMPETITOR=URL` column pairs.
fn parse_pairs(raw: &[String]) -> Result<Vec<SignatureColumns>, ConfigurationError> {
    if raw.is_empty() {
        return Err(ConfigurationError::Invalid(
            "pass --pair COMPETITOR=URL at least once, or --competitor-prefix with --url-prefix"
                .to_string(),
        ));
    }
    raw.iter()
        .map(|pair| match pair.split_once('=') {
            Some((c, u)) if !c.trim().is_empty() && !u.trim().is_empty() => Ok(SignatureColumns {
                competitor: c.trim().to_string(),
                url: u.trim().to_string(),
            }),
            _ => Err(ConfigurationError::Invalid(format!(
                "--pair expects COMPETITOR=URL, got '{pair}'"
            ))),
        })
        .collect()
}

/// Run the analyzer on the blocking pool while Ctrl-C flips the cancel flag.
///
/// The watcher outlives the analysis: once the flag is up, either from an
/// earlier interrupt or because the analysis finished, the next Ctrl-C exits
/// the process with code 130.
async fn run_cancellable<T, F>(job: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&RunControl<'_>) -> Result<T, AnalysisError> + Send + 'static,
{
    let cancel = CancelFlag::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                if interrupt(&cancel) == Interrupt::Exit {
                    warn!("Interrupt received, exiting");
                    std::process::exit(AnalysisError::Cancelled.exit_code());
                }
                warn!("Interrupt received, cancelling analysis");
            }
        });
    }

    let job_cancel = cancel.clone();
    let result = tokio::task::spawn_blocking(move || {
        let sink = BarProgress::new();
        let control = RunControl::new(&sink, job_cancel);
        let result = job(&control);
        sink.bar.finish_and_clear();
        result
    })
    .await
    .context("analysis task panicked")?;

    // Later interrupts exit instead of cancelling
    cancel.cancel();
    Ok(result?)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interrupt {
    Cancel,
    Exit,
}

/// First interrupt raises the cancel flag; any interrupt after that exits.
fn interrupt(cancel: &CancelFlag) -> Interrupt {
    if cancel.is_cancelled() {
        Interrupt::Exit
    } else {
        cancel.cancel();
        Interrupt::Cancel
    }
}

/// Progress sink backed by an indicatif bar for the overlap stage.
struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    fn new() -> Self {
        let bar = ProgressBar::new(0);
        if let Ok(style) =
            ProgressStyle::default_bar().template("  Overlap [{bar:30}] {pos}/{len} pairs ({eta})")
        {
            bar.set_style(style);
        }
        Self { bar }
    }
}

impl ProgressSink for BarProgress {
    fn rows_dropped(&self, dropped: &DroppedRows) {
        if dropped.total() > 0 {
            self.bar.println(format!(
                "  {} {} rows dropped ({} empty keyword, {} empty URL, {} invalid rank)",
                "~".yellow(),
                dropped.total(),
                dropped.empty_keyword,
                dropped.empty_url,
                dropped.invalid_rank
            ));
        }
    }

    fn pairs_processed(&self, done: u64, total: u64) {
        self.bar.set_length(total);
        self.bar.set_position(done);
    }

    fn cliques_found(&self, count: usize) {
        self.bar.finish_and_clear();
        info!(count, "Clique enumeration done");
    }
}

/// Map an error to the process exit code: 2 configuration, 3 budget,
/// 130 cancelled, 1 for everything else (I/O, malformed input).
fn exit_code(err: &anyhow::Error) -> i32 {
    for cause in err.chain() {
        if let Some(e) = cause.downcast_ref::<AnalysisError>() {
            return e.exit_code();
        }
        if cause.downcast_ref::<ConfigurationError>().is_some() {
            return 2;
        }
    }
    1
}
