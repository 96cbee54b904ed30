//! One worker's in-memory share of a dataset.
//!
//! This is the store boundary for `obsprint-store`:
//! - hold typed columns and level-major multi-level fields
//! - answer the kernel's [`ObsStore`] queries
//! - never mutate once built

use obsprint_kernel::{Column, ElementType, ObsStore, StoreError, Variable};
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Prefix of the groups that hold derived copies of a field.
pub const DERIVED_PREFIX: &str = "Derived";

/// Storage key of a field: `<group>/<name>`, or `<name>` without a group.
pub fn field_key(group: &str, name: &str) -> String {
    if group.is_empty() {
        name.to_string()
    } else {
        format!("{group}/{name}")
    }
}

/// Values of one stored field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldData {
    /// One value per row.
    Flat(Column),
    /// `levels[level][row]`; always float.
    Levels(Vec<Vec<f32>>),
}

impl FieldData {
    pub fn element_type(&self) -> ElementType {
        match self {
            Self::Flat(column) => column.element_type(),
            Self::Levels(_) => ElementType::Float,
        }
    }

    /// Number of rows covered; zero for a field with no levels.
    pub fn rows(&self) -> usize {
        match self {
            Self::Flat(column) => column.len(),
            Self::Levels(levels) => levels.first().map_or(0, Vec::len),
        }
    }

    /// Values at `positions`, in that order.
    pub fn take(&self, positions: &[usize]) -> Self {
        match self {
            Self::Flat(column) => Self::Flat(column.take(positions)),
            Self::Levels(levels) => Self::Levels(
                levels
                    .iter()
                    .map(|level| {
                        positions
                            .iter()
                            .filter_map(|&p| level.get(p).copied())
                            .collect()
                    })
                    .collect(),
            ),
        }
    }
}

/// Errors raised while building a store.
#[derive(Debug, thiserror::Error)]
pub enum MemoryStoreError {
    #[error("{field} has {actual} rows, store has {expected}")]
    RowCount {
        field: String,
        expected: usize,
        actual: usize,
    },

    #[error("{field} level {level} has {actual} rows, store has {expected}")]
    LevelRowCount {
        field: String,
        level: usize,
        expected: usize,
        actual: usize,
    },
}

/// Canonical in-memory state for one worker.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryStore {
    row_index: Vec<usize>,
    fields: BTreeMap<String, FieldData>,
}

impl MemoryStore {
    /// An empty store whose local rows map to `row_index` in the original
    /// dataset.
    pub fn new(row_index: Vec<usize>) -> Self {
        Self {
            row_index,
            fields: BTreeMap::new(),
        }
    }

    /// Insert or replace a field under `<group>/<name>`.
    ///
    /// Every column and every level must have one value per local row.
    pub fn insert(
        &mut self,
        full_name: impl Into<String>,
        data: FieldData,
    ) -> Result<Option<FieldData>, MemoryStoreError> {
        let field = full_name.into();
        let expected = self.row_index.len();
        match &data {
            FieldData::Flat(column) if column.len() != expected => {
                return Err(MemoryStoreError::RowCount {
                    field,
                    expected,
                    actual: column.len(),
                });
            }
            FieldData::Levels(levels) => {
                if let Some((level, values)) =
                    levels.iter().enumerate().find(|(_, v)| v.len() != expected)
                {
                    return Err(MemoryStoreError::LevelRowCount {
                        field,
                        level,
                        expected,
                        actual: values.len(),
                    });
                }
            }
            FieldData::Flat(_) => {}
        }
        Ok(self.fields.insert(field, data))
    }

    /// Builder form of [`MemoryStore::insert`].
    pub fn with(
        mut self,
        full_name: impl Into<String>,
        data: FieldData,
    ) -> Result<Self, MemoryStoreError> {
        self.insert(full_name, data)?;
        Ok(self)
    }

    /// Stored field names in sorted order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Look up `<group>/<name>`, preferring `Derived<group>/<name>` unless
    /// `skip_derived` is set.
    fn resolve(&self, group: &str, name: &str, skip_derived: bool) -> Option<&FieldData> {
        if !skip_derived
            && !group.is_empty()
            && let Some(data) = self.fields.get(&format!("{DERIVED_PREFIX}{group}/{name}"))
        {
            return Some(data);
        }
        self.fields.get(&field_key(group, name))
    }

    /// The first declared channel of `variable` that is stored.
    fn first_channel(&self, variable: &Variable, skip_derived: bool) -> Option<&FieldData> {
        (0..variable.channels().len()).find_map(|index| {
            self.resolve(variable.group(), &variable.variable(index), skip_derived)
        })
    }

    fn lookup(&self, variable: &Variable, skip_derived: bool) -> Option<&FieldData> {
        self.resolve(variable.group(), variable.name(), skip_derived)
            .or_else(|| self.first_channel(variable, skip_derived))
    }
}

impl ObsStore for MemoryStore {
    fn has_field(&self, variable: &Variable, skip_derived: bool) -> bool {
        self.lookup(variable, skip_derived).is_some()
    }

    fn element_type(&self, variable: &Variable, skip_derived: bool) -> Option<ElementType> {
        self.lookup(variable, skip_derived).map(FieldData::element_type)
    }

    fn level_count(&self, variable: &Variable, skip_derived: bool) -> usize {
        match self.resolve(variable.group(), variable.name(), skip_derived) {
            Some(FieldData::Levels(levels)) => levels.len(),
            _ => 0,
        }
    }

    fn local_rows(&self) -> usize {
        self.row_index.len()
    }

    fn row_index(&self) -> Vec<usize> {
        self.row_index.clone()
    }

    fn fetch(&self, variable: &Variable, skip_derived: bool) -> Result<Column, StoreError> {
        match self.resolve(variable.group(), variable.name(), skip_derived) {
            Some(FieldData::Flat(column)) => Ok(column.clone()),
            Some(FieldData::Levels(_)) => Err(StoreError::Shape {
                field: variable.full_name(),
                requested: "a single column".to_string(),
            }),
            None => Err(StoreError::NotFound(variable.full_name())),
        }
    }

    fn fetch_channel(
        &self,
        variable: &Variable,
        channel_index: usize,
        skip_derived: bool,
    ) -> Result<Column, StoreError> {
        let name = variable.variable(channel_index);
        match self.resolve(variable.group(), &name, skip_derived) {
            Some(FieldData::Flat(column)) => Ok(column.clone()),
            Some(FieldData::Levels(_)) => Err(StoreError::Shape {
                field: field_key(variable.group(), &name),
                requested: "a channel".to_string(),
            }),
            None => Err(StoreError::NotFound(field_key(variable.group(), &name))),
        }
    }

    fn fetch_at_level(
        &self,
        variable: &Variable,
        level: usize,
        skip_derived: bool,
    ) -> Result<Vec<f32>, StoreError> {
        match self.resolve(variable.group(), variable.name(), skip_derived) {
            Some(FieldData::Levels(levels)) => {
                levels
                    .get(level)
                    .cloned()
                    .ok_or_else(|| StoreError::LevelOutOfRange {
                        field: variable.full_name(),
                        level,
                        count: levels.len(),
                    })
            }
            Some(FieldData::Flat(_)) => Err(StoreError::Shape {
                field: variable.full_name(),
                requested: format!("level {level}"),
            }),
            None => Err(StoreError::NotFound(variable.full_name())),
        }
    }

    fn summary(&self) -> String {
        let mut text = format!(
            "MemoryStore: {} local rows, {} fields\n",
            self.row_index.len(),
            self.fields.len()
        );
        for (name, data) in &self.fields {
            let _ = match data {
                FieldData::Flat(column) => writeln!(text, "  {name}: {}", column.element_type()),
                FieldData::Levels(levels) => {
                    writeln!(text, "  {name}: float, {} levels", levels.len())
                }
            };
        }
        text
    }
}
