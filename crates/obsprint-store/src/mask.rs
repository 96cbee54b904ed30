//! Row selection read from a stored boolean field.

use obsprint_kernel::{Column, ObsStore, SelectionPredicate, Variable};
use tracing::warn;

/// Selects the rows where a boolean (or integer 0/1) field is set.
///
/// The field is read the way the run reads its other fields: the derived
/// copy first unless `skip_derived` is set. A field that cannot be read
/// selects nothing, so the worker still takes part in every collective call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMask {
    variable: Variable,
}

impl FieldMask {
    pub fn new(variable: Variable) -> Self {
        Self { variable }
    }

    pub fn variable(&self) -> &Variable {
        &self.variable
    }
}

impl SelectionPredicate for FieldMask {
    fn evaluate(&self, store: &dyn ObsStore, skip_derived: bool) -> Vec<bool> {
        let rows = store.local_rows();
        match store.fetch(&self.variable, skip_derived) {
            Ok(Column::Boolean(flags) | Column::Integer(flags)) if flags.len() == rows => {
                flags.into_iter().map(|flag| flag == 1).collect()
            }
            Ok(column) => {
                warn!(
                    field = %self.variable.full_name(),
                    element_type = %column.element_type(),
                    len = column.len(),
                    rows,
                    "mask field is not a boolean column; selecting no rows"
                );
                vec![false; rows]
            }
            Err(error) => {
                warn!(
                    field = %self.variable.full_name(),
                    %error,
                    "mask field unavailable; selecting no rows"
                );
                vec![false; rows]
            }
        }
    }
}
