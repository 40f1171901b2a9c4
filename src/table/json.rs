// JSON and JSON Lines loading.
//
// Each record is an object whose keys are column names. The column set is
// the union of keys in first-seen order; a record missing a key gets an
// empty cell there. Scalars are stringified so that `3` and `"3"` reach the
// normalizer identically.

use serde_json::{Map, Value};

use super::{Table, TableError};

/// Parse a JSON array of row objects.
pub fn parse_array(content: &str) -> Result<Table, TableError> {
    let value: Value = serde_json::from_str(content)?;
    let Value::Array(items) = value else {
        return Err(TableError::JsonShape(
            "expected a top-level array of row objects".to_string(),
        ));
    };

    let records = items
        .into_iter()
        .map(into_object)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(build(&records))
}

/// Parse newline-delimited JSON, one row object per non-blank line.
pub fn parse_lines(content: &str) -> Result<Table, TableError> {
    let mut records = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        records.push(into_object(serde_json::from_str(line)?)?);
    }
    Ok(build(&records))
}

fn into_object(value: Value) -> Result<Map<String, Value>, TableError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(TableError::JsonShape(format!(
            "expected a row object, found {}",
            kind(&other)
        ))),
    }
}

fn build(records: &[Map<String, Value>]) -> Table {
    let mut columns: Vec<String> = Vec::new();
    for record in records {
        for key in record.keys() {
            if !columns.iter().any(|c| c == key.trim()) {
                columns.push(key.trim().to_string());
            }
        }
    }

    let mut table = Table::new(&columns);
    for record in records {
        let mut row = vec![String::new(); columns.len()];
        for (key, value) in record {
            if let Some(idx) = columns.iter().position(|c| c == key.trim()) {
                row[idx] = stringify(value);
            }
        }
        table.push_row(row);
    }
    table
}

fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
