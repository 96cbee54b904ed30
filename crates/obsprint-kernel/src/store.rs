//! Contracts for the per-worker backing store and the selection predicate.
//!
//! The store is read-only for the whole print procedure.

use crate::column::Column;
use crate::field::{ElementType, Variable};
use serde::{Deserialize, Serialize};

/// Errors raised by a backing store fetch.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The requested field, channel, or derived copy is not stored.
    #[error("{0} not found in store")]
    NotFound(String),

    /// The field exists but not in the requested shape (e.g. a per-level
    /// fetch of a flat field).
    #[error("{field} cannot be fetched as {requested}")]
    Shape { field: String, requested: String },

    /// The level index is outside the field's level count.
    #[error("level {level} out of range for {field} ({count} levels)")]
    LevelOutOfRange {
        field: String,
        level: usize,
        count: usize,
    },
}

/// What a worker knows about one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldInfo {
    pub element_type: ElementType,
    pub level_count: usize,
}

/// One worker's view of the partitioned dataset.
///
/// Every lookup takes `skip_derived`. When it is false a store may answer
/// from a derived copy of the field; when it is true only the field itself
/// is read. Metadata and data lookups with the same flag describe the same
/// copy.
pub trait ObsStore {
    /// Whether the field, or one of its declared channels, is stored.
    fn has_field(&self, variable: &Variable, skip_derived: bool) -> bool;

    fn element_type(&self, variable: &Variable, skip_derived: bool) -> Option<ElementType>;

    /// Number of vertical levels; zero for flat fields.
    fn level_count(&self, variable: &Variable, skip_derived: bool) -> usize;

    /// Number of rows held by this worker.
    fn local_rows(&self) -> usize;

    /// Original row number of each local row, in local order.
    fn row_index(&self) -> Vec<usize>;

    /// The whole local column of a channel-free field.
    fn fetch(&self, variable: &Variable, skip_derived: bool) -> Result<Column, StoreError>;

    /// The local column of the sub-variable at `channel_index`. May fail with
    /// [`StoreError::NotFound`] even when [`ObsStore::has_field`] is true.
    fn fetch_channel(
        &self,
        variable: &Variable,
        channel_index: usize,
        skip_derived: bool,
    ) -> Result<Column, StoreError>;

    /// One value per local row at the given level.
    fn fetch_at_level(
        &self,
        variable: &Variable,
        level: usize,
        skip_derived: bool,
    ) -> Result<Vec<f32>, StoreError>;

    /// Human-readable description of the store contents.
    fn summary(&self) -> String;

    /// Element type and level count, when the field is stored.
    fn describe(&self, variable: &Variable, skip_derived: bool) -> Option<FieldInfo> {
        if !self.has_field(variable, skip_derived) {
            return None;
        }
        self.element_type(variable, skip_derived)
            .map(|element_type| FieldInfo {
                element_type,
                level_count: self.level_count(variable, skip_derived),
            })
    }
}

/// Produces the apply mask: one flag per local row.
pub trait SelectionPredicate {
    /// `skip_derived` has the same meaning as for [`ObsStore`] lookups.
    fn evaluate(&self, store: &dyn ObsStore, skip_derived: bool) -> Vec<bool>;
}

/// Selects every local row.
#[derive(Debug, Clone, Copy, Default)]
pub struct SelectAll;

impl SelectionPredicate for SelectAll {
    fn evaluate(&self, store: &dyn ObsStore, _skip_derived: bool) -> Vec<bool> {
        vec![true; store.local_rows()]
    }
}
