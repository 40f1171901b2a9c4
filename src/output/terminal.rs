// Colored terminal output for grouping reports.
//
// This module handles all terminal-specific formatting: colors and tables.
// The main.rs commands delegate here after a run completes.

use colored::Colorize;

use crate::analysis::report::GroupingReport;
use crate::semgroup::{format_signature, SemGroupReport};
use crate::table::Table;

/// How many characters of a keyword list to show per group line.
const KEYWORDS_PREVIEW_CHARS: usize = 100;

/// Display a clique grouping report.
pub fn display_grouping_report(report: &GroupingReport) {
    let p = &report.parameters;
    let s = &report.stats;

    println!(
        "\n{}",
        format!(
            "=== Keyword Groups (top {}, {}% threshold, min size {}) ===",
            p.top_n, p.threshold_pct, p.min_group_size
        )
        .bold()
    );
    println!(
        "  {}",
        format!(
            "columns: keyword='{}' url='{}' rank='{}'",
            p.keyword_column, p.url_column, p.rank_column
        )
        .dimmed()
    );
    println!(
        "  {} rows read, {} dropped, {} keywords, {} similarity edges, {} maximal cliques",
        s.rows_read,
        s.dropped.total(),
        s.keywords,
        s.edges,
        s.maximal_cliques
    );

    if report.is_empty() {
        println!("\n  No groups met the threshold and minimum size.");
        return;
    }

    println!();
    println!(
        "  {:>5}  {:>4}  {}",
        "Group".dimmed(),
        "Size".dimmed(),
        "Keywords".dimmed()
    );
    println!("  {}", "-".repeat(78).dimmed());

    for group in &report.groups {
        let keywords = super::truncate_chars(&group.keywords.join(", "), KEYWORDS_PREVIEW_CHARS);
        println!(
            "  {:>5}  {}  {}",
            group.group_id,
            colorize_size(group.size()),
            keywords
        );
    }

    println!();
    println!(
        "  {} groups covering {} keywords",
        report.groups.len().to_string().bold(),
        report.grouped_keywords()
    );
}

/// Display a signature grouping report.
pub fn display_semgroup_report(report: &SemGroupReport) {
    let s = &report.stats;
    println!(
        "\n{}",
        format!(
            "=== SERP Signature Groups (top {}, min size {}) ===",
            report.positions.len(),
            report.min_group_size
        )
        .bold()
    );
    println!(
        "  {} rows read, {} keywords, {} distinct signatures",
        s.rows_read, s.keywords, s.signatures
    );
    if s.empty_keyword + s.empty_signature > 0 {
        println!(
            "  {} {} rows skipped ({} without keyword, {} without SERP data)",
            "~".yellow(),
            s.empty_keyword + s.empty_signature,
            s.empty_keyword,
            s.empty_signature
        );
    }

    if report.is_empty() {
        println!("\n  No keywords share an identical SERP signature.");
        return;
    }

    for sg in &report.groups {
        println!(
            "\n  {:>4}. {}  {}",
            sg.group.group_id,
            colorize_size(sg.group.size()),
            sg.group.keywords.join(", ")
        );
        println!(
            "        {}",
            super::truncate_chars(&format_signature(&sg.signature), KEYWORDS_PREVIEW_CHARS).dimmed()
        );
    }
    println!();
}

/// List a table's columns, so callers know what to pass as column names.
pub fn display_columns(table: &Table) {
    println!(
        "\n{}",
        format!("=== {} columns, {} rows ===", table.columns().len(), table.len()).bold()
    );
    for (i, column) in table.columns().iter().enumerate() {
        let sample = table
            .rows()
            .iter()
            .map(|r| r[i].trim())
            .find(|c| !c.is_empty())
            .unwrap_or("");
        println!(
            "  {:>3}. {:<32} {}",
            i + 1,
            column.bold(),
            super::truncate_chars(sample, 40).dimmed()
        );
    }
    println!();
}

/// Colorize a group size: bigger groups stand out more.
fn colorize_size(size: usize) -> colored::ColoredString {
    let label = format!("{size:>4}");
    match size {
        s if s >= 5 => label.green().bold(),
        s if s >= 3 => label.bright_green(),
        _ => label.normal(),
    }
}
