//! # obsprint-store
//!
//! Backing stores for the obsprint kernel.
//!
//! This crate provides:
//! - JSONL read (portable dataset interchange, one line per field)
//! - `Dataset` (all rows in original order) and its split across workers
//! - `MemoryStore` (one worker's share, implementing `ObsStore`)
//! - `FieldMask` (a selection predicate over a stored boolean field)
//!
//! ## Data model
//!
//! ```text
//! JSONL (on disk, one line per field)
//!     ↓  Dataset::read
//! Dataset (original row order)
//!     ↓  Dataset::partition
//! MemoryStore × workers (local rows + row index)
//! ```

pub mod dataset;
pub mod jsonl;
pub mod mask;
pub mod memory;

pub use dataset::{Dataset, DatasetError, DatasetSummary, FieldSummary, Partition};
pub use jsonl::{FieldRecord, JsonlError, NumberedRecord, read_records, read_records_from_path};
pub use mask::FieldMask;
pub use memory::{DERIVED_PREFIX, FieldData, MemoryStore, MemoryStoreError, field_key};
