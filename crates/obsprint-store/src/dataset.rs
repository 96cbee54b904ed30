//! A whole dataset in original row order, and its split across workers.

use crate::jsonl::{FieldRecord, JsonlError, NumberedRecord, read_records, read_records_from_path};
use crate::memory::{FieldData, MemoryStore, MemoryStoreError, field_key};
use chrono::{DateTime, Utc};
use obsprint_kernel::column::{MISSING_FLOAT, MISSING_INT, MISSING_TEXT, missing_timestamp};
use obsprint_kernel::{Column, ElementType};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::io::BufRead;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

/// Errors raised while loading or splitting a dataset.
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error(transparent)]
    Jsonl(#[from] JsonlError),

    #[error("line {line}: {field}: {message}")]
    Field {
        line: usize,
        field: String,
        message: String,
    },

    #[error("line {line}: {field} has {actual} rows, dataset has {expected}")]
    RowCount {
        line: usize,
        field: String,
        expected: usize,
        actual: usize,
    },

    #[error("line {line}: {field} is declared twice (first on line {first})")]
    Duplicate {
        line: usize,
        field: String,
        first: usize,
    },

    #[error("unknown partition {0:?} (expected round_robin, contiguous or replicated)")]
    UnknownPartition(String),

    #[error("worker count must be at least 1")]
    NoWorkers,

    #[error(transparent)]
    Store(#[from] MemoryStoreError),
}

/// How rows are dealt to workers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Partition {
    /// Row `r` goes to worker `r % workers`.
    #[default]
    RoundRobin,
    /// Kept rows are cut into one consecutive run per worker.
    Contiguous,
    /// Every worker holds every kept row.
    Replicated,
}

impl Partition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RoundRobin => "round_robin",
            Self::Contiguous => "contiguous",
            Self::Replicated => "replicated",
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Partition {
    type Err = DatasetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "round_robin" | "roundrobin" => Ok(Self::RoundRobin),
            "contiguous" => Ok(Self::Contiguous),
            "replicated" | "inefficient" => Ok(Self::Replicated),
            other => Err(DatasetError::UnknownPartition(other.to_string())),
        }
    }
}

/// All rows of a dataset, indexed by original row number.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    rows: usize,
    fields: BTreeMap<String, FieldData>,
}

impl Dataset {
    pub fn read(reader: impl BufRead) -> Result<Self, DatasetError> {
        Self::from_records(read_records(reader)?)
    }

    pub fn read_from_path(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let path = path.as_ref();
        let dataset = Self::from_records(read_records_from_path(path)?)?;
        info!(
            path = %path.display(),
            rows = dataset.rows,
            fields = dataset.fields.len(),
            "loaded dataset"
        );
        Ok(dataset)
    }

    /// Build a dataset from parsed records. The first record fixes the row
    /// count; every later field must match it.
    pub fn from_records(records: Vec<NumberedRecord>) -> Result<Self, DatasetError> {
        let mut rows = None;
        let mut lines: BTreeMap<String, usize> = BTreeMap::new();
        let mut fields = BTreeMap::new();
        for NumberedRecord { line, record } in records {
            let key = field_key(&record.group, &record.name);
            if let Some(&first) = lines.get(&key) {
                return Err(DatasetError::Duplicate {
                    line,
                    field: key,
                    first,
                });
            }
            let data = convert(line, &record)?;
            let expected = *rows.get_or_insert(data.rows());
            if data.rows() != expected {
                return Err(DatasetError::RowCount {
                    line,
                    field: key,
                    expected,
                    actual: data.rows(),
                });
            }
            lines.insert(key.clone(), line);
            fields.insert(key, data);
        }
        Ok(Self {
            rows: rows.unwrap_or(0),
            fields,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldData)> {
        self.fields.iter().map(|(name, data)| (name.as_str(), data))
    }

    /// Split the rows not in `excluded` across `workers` stores.
    ///
    /// Each store's row index lists original row numbers in ascending order.
    pub fn partition(
        &self,
        workers: usize,
        excluded: &BTreeSet<usize>,
        partition: Partition,
    ) -> Result<Vec<MemoryStore>, DatasetError> {
        if workers == 0 {
            return Err(DatasetError::NoWorkers);
        }
        let kept: Vec<usize> = (0..self.rows).filter(|r| !excluded.contains(r)).collect();
        let mut assignment = vec![Vec::new(); workers];
        match partition {
            Partition::RoundRobin => {
                for &row in &kept {
                    assignment[row % workers].push(row);
                }
            }
            Partition::Contiguous => {
                let chunk = kept.len().div_ceil(workers).max(1);
                for (rank, run) in kept.chunks(chunk).enumerate() {
                    assignment[rank] = run.to_vec();
                }
            }
            Partition::Replicated => assignment.fill(kept.clone()),
        }
        debug!(
            workers,
            kept = kept.len(),
            %partition,
            "partitioned dataset"
        );

        assignment
            .into_iter()
            .map(|rows| {
                let mut store = MemoryStore::new(rows.clone());
                for (name, data) in &self.fields {
                    store.insert(name.clone(), data.take(&rows))?;
                }
                Ok(store)
            })
            .collect()
    }

    pub fn summary(&self) -> DatasetSummary {
        DatasetSummary {
            rows: self.rows,
            fields: self
                .fields
                .iter()
                .map(|(name, data)| FieldSummary {
                    name: name.clone(),
                    element_type: data.element_type(),
                    levels: match data {
                        FieldData::Levels(levels) => Some(levels.len()),
                        FieldData::Flat(_) => None,
                    },
                })
                .collect(),
        }
    }
}

/// Shape of a dataset, for `obsprint summary`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetSummary {
    pub rows: usize,
    pub fields: Vec<FieldSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldSummary {
    pub name: String,
    pub element_type: ElementType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub levels: Option<usize>,
}

impl fmt::Display for DatasetSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} rows, {} fields", self.rows, self.fields.len())?;
        for field in &self.fields {
            match field.levels {
                Some(levels) => writeln!(
                    f,
                    "  {}: {}, {levels} levels",
                    field.name, field.element_type
                )?,
                None => writeln!(f, "  {}: {}", field.name, field.element_type)?,
            }
        }
        Ok(())
    }
}

fn convert(line: usize, record: &FieldRecord) -> Result<FieldData, DatasetError> {
    let field = record.full_name();
    let fail = |message: String| DatasetError::Field {
        line,
        field: field.clone(),
        message,
    };
    let element_type =
        ElementType::from_str(&record.element_type).map_err(|e| fail(e.to_string()))?;

    match (&record.values, &record.levels) {
        (Some(values), None) => convert_values(element_type, values)
            .map(FieldData::Flat)
            .map_err(fail),
        (None, Some(levels)) if element_type == ElementType::Float => {
            if let Some(first) = levels.first()
                && let Some(level) = levels.iter().position(|l| l.len() != first.len())
            {
                return Err(fail(format!(
                    "level {level} has {} rows, level 0 has {}",
                    levels[level].len(),
                    first.len()
                )));
            }
            Ok(FieldData::Levels(
                levels
                    .iter()
                    .map(|level| level.iter().map(|v| v.unwrap_or(MISSING_FLOAT)).collect())
                    .collect(),
            ))
        }
        (None, Some(_)) => Err(fail(format!(
            "levels are only supported for float fields, not {element_type}"
        ))),
        (Some(_), Some(_)) => Err(fail("has both values and levels".to_string())),
        (None, None) => Err(fail("has neither values nor levels".to_string())),
    }
}

fn convert_values(element_type: ElementType, values: &[Value]) -> Result<Column, String> {
    let at = |row: usize, value: &Value| {
        format!("row {row}: {value} is not a valid {element_type}")
    };
    let column = match element_type {
        ElementType::Integer => Column::Integer(
            values
                .iter()
                .enumerate()
                .map(|(row, value)| match value {
                    Value::Null => Ok(MISSING_INT),
                    other => other
                        .as_i64()
                        .and_then(|n| i32::try_from(n).ok())
                        .ok_or_else(|| at(row, other)),
                })
                .collect::<Result<_, _>>()?,
        ),
        ElementType::Float => Column::Float(
            values
                .iter()
                .enumerate()
                .map(|(row, value)| match value {
                    Value::Null => Ok(MISSING_FLOAT),
                    other => other.as_f64().map(|n| n as f32).ok_or_else(|| at(row, other)),
                })
                .collect::<Result<_, _>>()?,
        ),
        ElementType::Text => Column::Text(
            values
                .iter()
                .enumerate()
                .map(|(row, value)| match value {
                    Value::Null => Ok(MISSING_TEXT.to_string()),
                    Value::String(text) => Ok(text.clone()),
                    other => Err(at(row, other)),
                })
                .collect::<Result<_, _>>()?,
        ),
        ElementType::Timestamp => Column::Timestamp(
            values
                .iter()
                .enumerate()
                .map(|(row, value)| match value {
                    Value::Null => Ok(missing_timestamp()),
                    Value::String(text) => DateTime::parse_from_rfc3339(text)
                        .map(|t| t.with_timezone(&Utc))
                        .map_err(|e| format!("row {row}: {text:?}: {e}")),
                    other => Err(at(row, other)),
                })
                .collect::<Result<_, _>>()?,
        ),
        ElementType::Boolean => Column::from_bools(
            values
                .iter()
                .enumerate()
                .map(|(row, value)| match value {
                    Value::Bool(flag) => Ok(*flag),
                    Value::Number(n) if n.as_i64() == Some(0) => Ok(false),
                    Value::Number(n) if n.as_i64() == Some(1) => Ok(true),
                    other => Err(at(row, other)),
                })
                .collect::<Result<Vec<_>, _>>()?,
        ),
    };
    Ok(column)
}
