// CSV / TSV loading via the `csv` crate.
//
// Rows may be ragged (exports from spreadsheet tools often are), so the
// reader runs in flexible mode and `Table::push_row` squares them up.

use csv::ReaderBuilder;

use super::{Table, TableError};

/// Parse delimited text with a header row.
pub fn parse(content: &str, delimiter: u8) -> Result<Table, TableError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .has_headers(true)
        .from_reader(content.trim_start_matches('\u{feff}').as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let mut table = Table::new(&headers);

    for record in reader.records() {
        let record = record?;
        // Fully blank lines in the middle of an export carry nothing
        if record.iter().all(|c| c.trim().is_empty()) {
            continue;
        }
        table.push_row(record.iter());
    }

    Ok(table)
}
