//! # obsprint kernel
//!
//! Rebuilds the original row order of a dataset that has been split across
//! cooperating workers, and renders selected fields of it as a paginated
//! plain-text table.
//!
//! This crate is **store-agnostic**: it does not own observation storage or
//! the transport between workers. It consumes both through the [`ObsStore`]
//! and [`Distribution`] contracts and prescribes only how partial columns are
//! merged, reordered and laid out.
//!
//! ## Architecture
//!
//! ```text
//! Distribution          ← all_gather: rank order, then local order
//!     │
//! ObsStore              ← per-worker columns + local→original row index
//!     │
//! FieldSelector         ← declared fields → ColumnGatherer → FilterData
//!     │
//! GlobalPermutation     ← stable sort of the gathered row index
//!     │
//! paginate              ← window + apply mask → pages of PageEntry
//!     │
//! TableRenderer         ← header, separator, one line per display key
//! ```
//!
//! Every worker must walk the same sequence of collective calls. The
//! [`FieldSelector`] derives that sequence from [`PrintParameters`] alone,
//! never from what a worker happens to find in its local store.

pub mod column;
pub mod distribution;
pub mod error;
pub mod field;
pub mod gather;
pub mod paginate;
pub mod params;
pub mod printer;
pub mod reconcile;
pub mod render;
pub mod store;

#[cfg(test)]
mod testing;

pub use column::{Column, MissingValue};
pub use distribution::{CollectiveError, Distribution, Solo, ThreadGroup};
pub use error::PrintError;
pub use field::{DisplayKey, ElementType, MAX_CHANNEL_SET, Variable, parse_channel_set};
pub use gather::{ColumnGatherer, FieldSelector, FilterData, GatherOutcome, SkipNotice, SkipReason};
pub use paginate::{Page, PageEntry, RowWindow, paginate, rows_per_page};
pub use params::{FieldSpec, OutputChannel, PrintParameters, VariablePrintParameters};
pub use printer::{FilterPrinter, PrintReport};
pub use reconcile::GlobalPermutation;
pub use render::{CellFormat, Notation, TableRenderer};
pub use store::{FieldInfo, ObsStore, SelectAll, SelectionPredicate, StoreError};
