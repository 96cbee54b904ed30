//! JSONL interchange: one line per field.
//!
//! ```text
//! # comment lines and blank lines are skipped
//! {"group":"MetaData","name":"id","type":"int","values":[1,2,null]}
//! {"group":"GeoVaLs","name":"air_temperature","type":"float","levels":[[250.0,251.0,null]]}
//! ```
//!
//! `null` stands for the type's missing value.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// One field as it appears on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldRecord {
    pub group: String,
    pub name: String,
    /// Element type name, parsed with `ElementType::from_str`.
    #[serde(rename = "type")]
    pub element_type: String,
    /// One value per row for flat fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<serde_json::Value>>,
    /// `levels[level][row]` for multi-level float fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub levels: Option<Vec<Vec<Option<f32>>>>,
}

impl FieldRecord {
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.group, self.name)
    }
}

/// A record together with the line it was read from.
#[derive(Debug, Clone, PartialEq)]
pub struct NumberedRecord {
    pub line: usize,
    pub record: FieldRecord,
}

/// Read field records from a JSONL reader.
pub fn read_records(reader: impl BufRead) -> Result<Vec<NumberedRecord>, JsonlError> {
    let mut records = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| JsonlError::Io(line_no + 1, e.to_string()))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let record: FieldRecord = serde_json::from_str(trimmed)
            .map_err(|e| JsonlError::Parse(line_no + 1, e.to_string()))?;
        records.push(NumberedRecord {
            line: line_no + 1,
            record,
        });
    }
    Ok(records)
}

/// Read field records from a JSONL file path.
pub fn read_records_from_path(path: impl AsRef<Path>) -> Result<Vec<NumberedRecord>, JsonlError> {
    let path = path.as_ref();
    let bytes =
        fs::read(path).map_err(|e| JsonlError::Io(0, format!("{}: {e}", path.display())))?;
    if std::str::from_utf8(&bytes).is_err() {
        return Err(JsonlError::Corrupt(format!(
            "{}: contains non-UTF-8 byte sequence(s)",
            path.display()
        )));
    }
    read_records(BufReader::new(bytes.as_slice()))
}

/// Errors from JSONL reading.
#[derive(Debug, thiserror::Error)]
pub enum JsonlError {
    #[error("line {0}: I/O error: {1}")]
    Io(usize, String),

    #[error("line {0}: parse error: {1}")]
    Parse(usize, String),

    #[error("corrupted dataset: {0}")]
    Corrupt(String),
}
