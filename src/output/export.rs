// Report export — the downloadable artifacts.
//
// CSV export produces two files: the grouping table and a parameters sheet
// next to it (`<stem>.parameters.csv`). JSON export is one document holding
// parameters, stats, and groups. Output depends only on the report, so the
// same input and parameters always give byte-identical files.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::analysis::report::GroupingReport;
use crate::semgroup::{format_signature, SemGroupReport};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

/// A timestamped output path in `dir`, e.g. `keyword-groups-20240101-120000.csv`.
pub fn default_output_path(dir: &Path, prefix: &str, format: ExportFormat) -> PathBuf {
    let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
    dir.join(format!("{prefix}-{stamp}.{}", format.extension()))
}

/// Path of the parameters sheet that accompanies a CSV grouping table.
pub fn parameters_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "report".to_string());
    path.with_file_name(format!("{stem}.parameters.csv"))
}

#[derive(Serialize)]
struct SignatureRow<'a> {
    group_id: usize,
    keyword: &'a str,
    group_size: usize,
    signature: String,
}

/// The grouping table as CSV text.
pub fn grouping_csv(report: &GroupingReport) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in report.rows() {
        writer.serialize(&row)?;
    }
    if report.is_empty() {
        writer.write_record(["group_id", "keyword", "group_size"])?;
    }
    finish(writer)
}

/// The parameters sheet as CSV text.
pub fn parameters_csv(entries: &[(&'static str, String)]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["parameter", "value"])?;
    for (name, value) in entries {
        writer.write_record([*name, value.as_str()])?;
    }
    finish(writer)
}

/// The signature grouping table as CSV text.
pub fn semgroup_csv(report: &SemGroupReport) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for group in &report.groups {
        let signature = format_signature(&group.signature);
        for keyword in &group.group.keywords {
            writer.serialize(SignatureRow {
                group_id: group.group.group_id,
                keyword,
                group_size: group.group.size(),
                signature: signature.clone(),
            })?;
        }
    }
    if report.groups.is_empty() {
        writer.write_record(["group_id", "keyword", "group_size", "signature"])?;
    }
    finish(writer)
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<String> {
    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("failed to flush CSV buffer: {}", e.error()))?;
    Ok(String::from_utf8(bytes)?)
}

/// Write a clique grouping report. Returns the files written.
pub fn write_grouping_report(
    report: &GroupingReport,
    path: &Path,
    format: ExportFormat,
) -> Result<Vec<PathBuf>> {
    match format {
        ExportFormat::Csv => {
            let table = grouping_csv(report)?;
            let params = parameters_csv(&report.parameters.entries())?;
            write_pair(path, &table, &params)
        }
        ExportFormat::Json => write_json(path, report),
    }
}

/// Write a signature grouping report. Returns the files written.
pub fn write_semgroup_report(
    report: &SemGroupReport,
    path: &Path,
    format: ExportFormat,
) -> Result<Vec<PathBuf>> {
    match format {
        ExportFormat::Csv => {
            let table = semgroup_csv(report)?;
            let params = parameters_csv(&report.parameter_entries())?;
            write_pair(path, &table, &params)
        }
        ExportFormat::Json => write_json(path, report),
    }
}

fn write_pair(path: &Path, table: &str, params: &str) -> Result<Vec<PathBuf>> {
    let params_path = parameters_path(path);
    write_file(path, table)?;
    write_file(&params_path, params)?;
    Ok(vec![path.to_path_buf(), params_path])
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<Vec<PathBuf>> {
    let mut json = serde_json::to_string_pretty(value)?;
    json.push('\n');
    write_file(path, &json)?;
    Ok(vec![path.to_path_buf()])
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))
}
