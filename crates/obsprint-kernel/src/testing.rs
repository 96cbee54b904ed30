//! In-crate store double for unit tests.

use crate::column::Column;
use crate::field::{ElementType, Variable};
use crate::store::{ObsStore, StoreError};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub(crate) struct FakeStore {
    rows: Vec<usize>,
    columns: BTreeMap<String, Column>,
    levels: BTreeMap<String, Vec<Vec<f32>>>,
}

impl FakeStore {
    pub(crate) fn new(rows: Vec<usize>) -> Self {
        Self {
            rows,
            ..Self::default()
        }
    }

    pub(crate) fn column(mut self, key: &str, column: Column) -> Self {
        self.columns.insert(key.to_string(), column);
        self
    }

    pub(crate) fn levels(mut self, key: &str, levels: Vec<Vec<f32>>) -> Self {
        self.levels.insert(key.to_string(), levels);
        self
    }

    fn channel_column(&self, variable: &Variable) -> Option<&Column> {
        (0..variable.channels().len()).find_map(|index| {
            self.columns
                .get(&format!("{}/{}", variable.group(), variable.variable(index)))
        })
    }
}

impl ObsStore for FakeStore {
    fn has_field(&self, variable: &Variable, skip_derived: bool) -> bool {
        self.element_type(variable, skip_derived).is_some()
    }

    fn element_type(&self, variable: &Variable, _skip_derived: bool) -> Option<ElementType> {
        let name = variable.full_name();
        if let Some(column) = self.columns.get(&name) {
            return Some(column.element_type());
        }
        if self.levels.contains_key(&name) {
            return Some(ElementType::Float);
        }
        self.channel_column(variable).map(Column::element_type)
    }

    fn level_count(&self, variable: &Variable, _skip_derived: bool) -> usize {
        self.levels.get(&variable.full_name()).map_or(0, Vec::len)
    }

    fn local_rows(&self) -> usize {
        self.rows.len()
    }

    fn row_index(&self) -> Vec<usize> {
        self.rows.clone()
    }

    fn fetch(&self, variable: &Variable, _skip_derived: bool) -> Result<Column, StoreError> {
        let name = variable.full_name();
        self.columns
            .get(&name)
            .cloned()
            .ok_or(StoreError::NotFound(name))
    }

    fn fetch_channel(
        &self,
        variable: &Variable,
        channel_index: usize,
        _skip_derived: bool,
    ) -> Result<Column, StoreError> {
        let name = format!("{}/{}", variable.group(), variable.variable(channel_index));
        self.columns
            .get(&name)
            .cloned()
            .ok_or(StoreError::NotFound(name))
    }

    fn fetch_at_level(
        &self,
        variable: &Variable,
        level: usize,
        _skip_derived: bool,
    ) -> Result<Vec<f32>, StoreError> {
        let name = variable.full_name();
        self.levels
            .get(&name)
            .and_then(|levels| levels.get(level))
            .cloned()
            .ok_or(StoreError::NotFound(name))
    }

    fn summary(&self) -> String {
        format!(
            "FakeStore: {} rows, {} columns\n",
            self.rows.len(),
            self.columns.len() + self.levels.len()
        )
    }
}
