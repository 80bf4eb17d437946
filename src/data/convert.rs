//! Tabular data moves between CSV and JSON. JSON files hold an array of objects; CSV and TXT files
//! have a header row. Cells read from CSV are typed, nested JSON objects are flattened with `.` when
//! written to CSV.

use std::{collections::HashSet, fmt::Display, path::Path};

use anyhow::{bail, Context, Result};
use serde_json::{Map, Number, Value};
use tracing::debug;

use crate::{
    error::DaybookError,
    store::json_store::{read_json_file, write_json_file},
};

pub type Record = Map<String, Value>;

const SEPARATOR: &str = ".";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Csv,
    Json,
    /// Comma separated text with a `.txt` extension.
    Txt,
}

impl Format {
    pub fn of(path: &Path) -> Result<Format> {
        let extension = path
            .extension()
            .map(|v| v.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        match extension.as_str() {
            "csv" => Ok(Format::Csv),
            "json" => Ok(Format::Json),
            "txt" => Ok(Format::Txt),
            _ => Err(DaybookError::UnsupportedFormat(extension).into()),
        }
    }
}

impl Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Format::Csv => write!(f, "CSV"),
            Format::Json => write!(f, "JSON"),
            Format::Txt => write!(f, "TXT"),
        }
    }
}

/// Integer, float, bool, else string. An empty cell is null.
pub fn parse_cell(cell: &str) -> Value {
    if cell.is_empty() {
        return Value::Null;
    }
    if let Ok(v) = cell.parse::<i64>() {
        return Value::Number(v.into());
    }
    if let Some(v) = cell.parse::<f64>().ok().and_then(Number::from_f64) {
        return Value::Number(v);
    }
    match cell.to_lowercase().as_str() {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(cell.to_string()),
    }
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(v) => v.clone(),
        other => other.to_string(),
    }
}

/// Nested objects become `parent.child` keys, arrays are kept as JSON text.
pub fn flatten(record: &Record) -> Record {
    fn visit(prefix: &str, value: &Value, into: &mut Record) {
        match value {
            Value::Object(map) => {
                for (key, value) in map {
                    let key = if prefix.is_empty() {
                        key.clone()
                    } else {
                        format!("{prefix}{SEPARATOR}{key}")
                    };
                    visit(&key, value, into);
                }
            }
            Value::Array(_) => {
                into.insert(prefix.to_string(), Value::String(value.to_string()));
            }
            other => {
                into.insert(prefix.to_string(), other.clone());
            }
        }
    }

    let mut flat = Record::new();
    for (key, value) in record {
        visit(key, value, &mut flat);
    }
    flat
}

/// Union of all keys in first-seen order.
pub fn columns(records: &[Record]) -> Vec<String> {
    let mut seen = HashSet::new();
    records
        .iter()
        .flat_map(|record| record.keys())
        .filter(|key| seen.insert(key.as_str()))
        .cloned()
        .collect()
}

fn parse_csv(buffer: &[u8]) -> Result<Vec<Record>> {
    let mut reader = csv::Reader::from_reader(buffer);
    let headers = reader.headers()?.clone();
    reader
        .records()
        .map(|row| -> Result<Record> {
            let row = row?;
            Ok(headers
                .iter()
                .zip(row.iter())
                .map(|(header, cell)| (header.to_string(), parse_cell(cell)))
                .collect())
        })
        .collect()
}

fn render_csv(records: &[Record]) -> Result<Vec<u8>> {
    let flat = records.iter().map(flatten).collect::<Vec<_>>();
    let header = columns(&flat);
    if header.is_empty() {
        return Ok(vec![]);
    }
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record(&header)?;
    for record in &flat {
        writer.write_record(
            header
                .iter()
                .map(|column| record.get(column).map(cell_text).unwrap_or_default()),
        )?;
    }
    writer.into_inner().map_err(|e| e.into_error().into())
}

fn into_records(path: &Path, value: Value) -> Result<Vec<Record>> {
    match value {
        Value::Array(values) => values
            .into_iter()
            .map(|value| match value {
                Value::Object(record) => Ok(record),
                other => bail!("{path:?} is not tabular, found element {other}"),
            })
            .collect(),
        Value::Object(record) => Ok(vec![record]),
        other => bail!("{path:?} is not tabular, found {other}"),
    }
}

pub async fn read_records(path: &Path) -> Result<Vec<Record>> {
    let records = match Format::of(path)? {
        Format::Csv | Format::Txt => {
            let buffer = tokio::fs::read(path)
                .await
                .with_context(|| format!("Failed to read {path:?}"))?;
            parse_csv(&buffer).with_context(|| format!("Failed to parse CSV in {path:?}"))?
        }
        Format::Json => match read_json_file::<Value>(path).await? {
            Some(value) => into_records(path, value)?,
            None => vec![],
        },
    };
    debug!("Read {} records from {path:?}", records.len());
    Ok(records)
}

pub async fn write_records(path: &Path, records: &[Record]) -> Result<()> {
    match Format::of(path)? {
        Format::Csv | Format::Txt => tokio::fs::write(path, render_csv(records)?)
            .await
            .with_context(|| format!("Failed to write {path:?}")),
        Format::Json => write_json_file(path, records).await,
    }
}

/// Converts by file extension and returns the number of records written.
pub async fn convert(input: &Path, output: &Path) -> Result<usize> {
    Format::of(output)?;
    let records = read_records(input).await?;
    write_records(output, &records).await?;
    Ok(records.len())
}

#[derive(Debug, Clone, PartialEq)]
pub struct Validation {
    pub valid: bool,
    pub message: String,
}

/// Checks that a file parses and, for non-empty `expected_columns`, that it has exactly those
/// columns. Only an unsupported extension is an error.
pub async fn validate(path: &Path, expected_columns: &[String]) -> Result<Validation> {
    let format = Format::of(path)?;
    let records = match read_records(path).await {
        Ok(records) => records,
        Err(e) => {
            return Ok(Validation {
                valid: false,
                message: format!("Invalid {format}: {e:#}"),
            })
        }
    };
    if format != Format::Json && records.is_empty() {
        return Ok(Validation {
            valid: false,
            message: format!("{format} file is empty"),
        });
    }

    if !expected_columns.is_empty() {
        let actual = columns(&records);
        let missing = expected_columns
            .iter()
            .filter(|v| !actual.contains(v))
            .cloned()
            .collect::<Vec<_>>();
        let extra = actual
            .iter()
            .filter(|v| !expected_columns.contains(v))
            .cloned()
            .collect::<Vec<_>>();
        let mut problems = vec![];
        if !missing.is_empty() {
            problems.push(format!("Missing columns: {}.", missing.join(", ")));
        }
        if !extra.is_empty() {
            problems.push(format!("Extra columns: {}.", extra.join(", ")));
        }
        if !problems.is_empty() {
            return Ok(Validation {
                valid: false,
                message: problems.join(" "),
            });
        }
    }

    Ok(Validation {
        valid: true,
        message: format!("Valid {format} with {} records", records.len()),
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub equal: bool,
    pub reason: String,
    /// Index and both versions of the first record that differs.
    pub difference: Option<(usize, Record, Record)>,
}

/// Compares two files record by record. Both sides are flattened first so a CSV can be compared
/// with the JSON it was produced from.
pub async fn compare(first: &Path, second: &Path) -> Result<Comparison> {
    let first = read_records(first).await?;
    let second = read_records(second).await?;
    if first.len() != second.len() {
        return Ok(Comparison {
            equal: false,
            reason: format!(
                "Different number of records: {} vs {}",
                first.len(),
                second.len()
            ),
            difference: None,
        });
    }

    for (index, (a, b)) in first.iter().zip(second.iter()).enumerate() {
        let (a, b) = (flatten(a), flatten(b));
        if a != b {
            return Ok(Comparison {
                equal: false,
                reason: format!("Records differ at index {index}"),
                difference: Some((index, a, b)),
            });
        }
    }
    Ok(Comparison {
        equal: true,
        reason: "Files contain identical data".into(),
        difference: None,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Empty,
    Integer,
    Float,
    Bool,
    String,
    Mixed,
}

impl ColumnKind {
    fn of(value: &Value) -> Option<ColumnKind> {
        match value {
            Value::Null => None,
            Value::Bool(_) => Some(ColumnKind::Bool),
            Value::Number(v) if v.is_f64() => Some(ColumnKind::Float),
            Value::Number(_) => Some(ColumnKind::Integer),
            _ => Some(ColumnKind::String),
        }
    }

    /// Integers widen to floats, any other disagreement is mixed.
    fn merge(self, other: ColumnKind) -> ColumnKind {
        use ColumnKind::*;
        match (self, other) {
            (Empty, v) | (v, Empty) => v,
            (a, b) if a == b => a,
            (Integer, Float) | (Float, Integer) => Float,
            _ => Mixed,
        }
    }
}

impl Display for ColumnKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ColumnKind::Empty => "empty",
            ColumnKind::Integer => "integer",
            ColumnKind::Float => "float",
            ColumnKind::Bool => "bool",
            ColumnKind::String => "string",
            ColumnKind::Mixed => "mixed",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSummary {
    pub name: String,
    pub kind: ColumnKind,
    /// Records where the column is absent or null.
    pub missing: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Preview {
    pub total: usize,
    pub rows: Vec<Record>,
    pub columns: Vec<ColumnSummary>,
}

/// First `rows` records plus a summary of every column across the whole file.
pub async fn preview(path: &Path, rows: usize) -> Result<Preview> {
    let records = read_records(path)
        .await?
        .iter()
        .map(flatten)
        .collect::<Vec<_>>();
    let columns = columns(&records)
        .into_iter()
        .map(|name| {
            let values = records.iter().map(|record| record.get(&name));
            let missing = values
                .clone()
                .filter(|v| v.map_or(true, Value::is_null))
                .count();
            let kind = values
                .flatten()
                .filter_map(ColumnKind::of)
                .fold(ColumnKind::Empty, ColumnKind::merge);
            ColumnSummary {
                name,
                kind,
                missing,
            }
        })
        .collect();
    Ok(Preview {
        total: records.len(),
        rows: records.into_iter().take(rows).collect(),
        columns,
    })
}

impl Display for Preview {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{} records, {} columns", self.total, self.columns.len())?;
        for column in &self.columns {
            writeln!(
                f,
                "  {:<20} {:<8} {} missing",
                column.name, column.kind, column.missing
            )?;
        }
        write!(f, "First {} records:", self.rows.len())?;
        for row in &self.rows {
            write!(f, "\n  {}", Value::Object(row.clone()))?;
        }
        Ok(())
    }
}
