//! Typed columns and their missing-value sentinels.

use crate::error::PrintError;
use crate::field::ElementType;
use chrono::{DateTime, Utc};

/// Integer "no data" sentinel.
pub const MISSING_INT: i32 = -i32::MAX;
/// Float "no data" sentinel.
pub const MISSING_FLOAT: f32 = -3.368_795_3e38;
/// Text "no data" sentinel.
pub const MISSING_TEXT: &str = "*** MISSING ***";
/// Timestamp "no data" sentinel, 9996-02-28T23:58:57Z, as Unix seconds.
pub const MISSING_TIMESTAMP_SECS: i64 = 253_281_167_937;

/// The timestamp sentinel as a value.
pub fn missing_timestamp() -> DateTime<Utc> {
    DateTime::from_timestamp(MISSING_TIMESTAMP_SECS, 0).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Values that carry a type-specific "no data" sentinel.
pub trait MissingValue {
    fn is_missing(&self) -> bool;
}

impl MissingValue for i32 {
    fn is_missing(&self) -> bool {
        *self == MISSING_INT
    }
}

impl MissingValue for f32 {
    fn is_missing(&self) -> bool {
        *self == MISSING_FLOAT
    }
}

impl MissingValue for String {
    fn is_missing(&self) -> bool {
        self == MISSING_TEXT
    }
}

impl MissingValue for DateTime<Utc> {
    fn is_missing(&self) -> bool {
        self.timestamp() == MISSING_TIMESTAMP_SECS
    }
}

/// One column of values, closed over the supported element types.
///
/// Booleans are held as 0/1 integers: there is no boolean sentinel, and the
/// integer form is what gets rendered.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Integer(Vec<i32>),
    Float(Vec<f32>),
    Text(Vec<String>),
    Timestamp(Vec<DateTime<Utc>>),
    Boolean(Vec<i32>),
}

impl Column {
    /// An empty column of the given type.
    pub fn empty(element_type: ElementType) -> Self {
        match element_type {
            ElementType::Integer => Self::Integer(Vec::new()),
            ElementType::Float => Self::Float(Vec::new()),
            ElementType::Text => Self::Text(Vec::new()),
            ElementType::Timestamp => Self::Timestamp(Vec::new()),
            ElementType::Boolean => Self::Boolean(Vec::new()),
        }
    }

    pub fn from_bools(values: impl IntoIterator<Item = bool>) -> Self {
        Self::Boolean(values.into_iter().map(i32::from).collect())
    }

    pub fn element_type(&self) -> ElementType {
        match self {
            Self::Integer(_) => ElementType::Integer,
            Self::Float(_) => ElementType::Float,
            Self::Text(_) => ElementType::Text,
            Self::Timestamp(_) => ElementType::Timestamp,
            Self::Boolean(_) => ElementType::Boolean,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Integer(v) | Self::Boolean(v) => v.len(),
            Self::Float(v) => v.len(),
            Self::Text(v) => v.len(),
            Self::Timestamp(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append `other` to this column. Both must have the same element type.
    pub fn extend(&mut self, other: Column) -> Result<(), PrintError> {
        match (&mut *self, other) {
            (Self::Integer(a), Self::Integer(b)) => a.extend(b),
            (Self::Float(a), Self::Float(b)) => a.extend(b),
            (Self::Text(a), Self::Text(b)) => a.extend(b),
            (Self::Timestamp(a), Self::Timestamp(b)) => a.extend(b),
            (Self::Boolean(a), Self::Boolean(b)) => a.extend(b),
            (this, other) => {
                return Err(PrintError::ColumnTypeMismatch {
                    expected: this.element_type(),
                    actual: other.element_type(),
                });
            }
        }
        Ok(())
    }

    /// Concatenate partial columns in the order given.
    pub fn concat(
        element_type: ElementType,
        parts: impl IntoIterator<Item = Column>,
    ) -> Result<Self, PrintError> {
        let mut merged = Self::empty(element_type);
        for part in parts {
            merged.extend(part)?;
        }
        Ok(merged)
    }

    /// A new column holding the values at `positions`, in that order.
    ///
    /// Positions past the end are skipped.
    pub fn take(&self, positions: &[usize]) -> Self {
        fn pick<T: Clone>(values: &[T], positions: &[usize]) -> Vec<T> {
            positions
                .iter()
                .filter_map(|&p| values.get(p).cloned())
                .collect()
        }
        match self {
            Self::Integer(v) => Self::Integer(pick(v, positions)),
            Self::Float(v) => Self::Float(pick(v, positions)),
            Self::Text(v) => Self::Text(pick(v, positions)),
            Self::Timestamp(v) => Self::Timestamp(pick(v, positions)),
            Self::Boolean(v) => Self::Boolean(pick(v, positions)),
        }
    }
}
