//! Collective column gathering and the per-run column cache.
//!
//! # Collective ordering
//!
//! Each gather is a barrier across all workers, so every worker must issue
//! the same gathers in the same order. [`FieldSelector::select_all`] walks the
//! declared fields in configuration order and decides what to gather from
//! information that every worker shares: the configuration, and field
//! descriptions that are themselves agreed through a gather. A worker that
//! cannot fetch its part of a column still takes part in that column's
//! gather, contributing `None`; the column is then skipped on every worker.

use crate::column::Column;
use crate::distribution::Distribution;
use crate::error::PrintError;
use crate::field::{DisplayKey, ElementType, Variable};
use crate::params::FieldSpec;
use crate::store::{FieldInfo, ObsStore, StoreError};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::debug;

/// Gathered columns keyed by display key, in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterData {
    entries: Vec<(DisplayKey, Column)>,
    index: BTreeMap<String, usize>,
}

impl FilterData {
    /// Store `column` under `key`. Replacing an existing key keeps its
    /// position and returns the previous column.
    pub fn insert(&mut self, key: DisplayKey, column: Column) -> Option<Column> {
        match self.index.get(key.as_str()) {
            Some(&slot) => Some(std::mem::replace(&mut self.entries[slot].1, column)),
            None => {
                self.index.insert(key.as_str().to_string(), self.entries.len());
                self.entries.push((key, column));
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&Column> {
        self.index.get(key).map(|&slot| &self.entries[slot].1)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &DisplayKey> {
        self.entries.iter().map(|(key, _)| key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&DisplayKey, &Column)> {
        self.entries.iter().map(|(key, column)| (key, column))
    }
}

/// Why a display key has no column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The field is absent from the store (on at least one worker).
    MissingField,
    /// One channel of a present field is absent.
    MissingChannel,
    /// The requested level is outside the field's level count.
    OutOfRangeLevel,
}

/// A recoverable miss, reported as one line of output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkipNotice {
    pub key: String,
    pub reason: SkipReason,
}

impl fmt::Display for SkipNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} not present in filter data", self.key)
    }
}

/// Gathered columns plus the misses met along the way.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GatherOutcome {
    pub data: FilterData,
    pub notices: Vec<SkipNotice>,
}

impl GatherOutcome {
    fn skip(&mut self, key: impl Into<String>, reason: SkipReason) {
        let key = key.into();
        debug!(key = %key, ?reason, "skipping display key");
        self.notices.push(SkipNotice { key, reason });
    }
}

/// Fetches local partial columns and merges them across workers.
pub struct ColumnGatherer<'a, D> {
    store: &'a dyn ObsStore,
    dist: &'a D,
    skip_derived: bool,
}

impl<'a, D: Distribution> ColumnGatherer<'a, D> {
    pub fn new(store: &'a dyn ObsStore, dist: &'a D, skip_derived: bool) -> Self {
        Self {
            store,
            dist,
            skip_derived,
        }
    }

    /// Gather a channel-free field, or each channel of a channelled one.
    pub fn gather_field(
        &self,
        variable: &Variable,
        element_type: ElementType,
        outcome: &mut GatherOutcome,
    ) -> Result<(), PrintError> {
        if variable.channels().is_empty() {
            let key = DisplayKey::for_channel(variable, 0);
            let local = local_part(&key, self.store.fetch(variable, self.skip_derived));
            return self.merge(key, element_type, local, SkipReason::MissingField, outcome);
        }

        for index in 0..variable.size() {
            let key = DisplayKey::for_channel(variable, index);
            let local = local_part(
                &key,
                self.store.fetch_channel(variable, index, self.skip_derived),
            )
            .filter(|column| {
                let matches = column.element_type() == element_type;
                if !matches {
                    debug!(
                        key = %key,
                        expected = %element_type,
                        actual = %column.element_type(),
                        "channel type differs from its field"
                    );
                }
                matches
            });
            self.merge(key, element_type, local, SkipReason::MissingChannel, outcome)?;
        }
        Ok(())
    }

    /// Gather the requested levels of a multi-level float field.
    pub fn gather_levels(
        &self,
        variable: &Variable,
        levels: &BTreeSet<i32>,
        level_count: usize,
        outcome: &mut GatherOutcome,
    ) -> Result<(), PrintError> {
        let full_name = variable.full_name();
        for &level in levels {
            let key = DisplayKey::at_level(&full_name, level);
            let Some(index) = usize::try_from(level).ok().filter(|&l| l < level_count) else {
                outcome.skip(key.as_str(), SkipReason::OutOfRangeLevel);
                continue;
            };
            let local = local_part(
                &key,
                self.store
                    .fetch_at_level(variable, index, self.skip_derived)
                    .map(Column::Float),
            );
            self.merge(key, ElementType::Float, local, SkipReason::MissingField, outcome)?;
        }
        Ok(())
    }

    /// Gather every worker's part of one display key. Called by every worker
    /// for every key, including workers whose `local` is `None`.
    fn merge(
        &self,
        key: DisplayKey,
        element_type: ElementType,
        local: Option<Column>,
        reason: SkipReason,
        outcome: &mut GatherOutcome,
    ) -> Result<(), PrintError> {
        let parts = self.dist.all_gather(vec![local])?;
        match parts.into_iter().collect::<Option<Vec<Column>>>() {
            Some(parts) => {
                let column = Column::concat(element_type, parts)?;
                debug!(key = %key, rows = column.len(), "gathered column");
                outcome.data.insert(key, column);
            }
            None => outcome.skip(key.as_str(), reason),
        }
        Ok(())
    }
}

fn local_part(key: &DisplayKey, fetched: Result<Column, StoreError>) -> Option<Column> {
    match fetched {
        Ok(column) => Some(column),
        Err(error) => {
            debug!(key = %key, %error, "local fetch failed");
            None
        }
    }
}

/// Walks the declared fields and fills the column cache.
///
/// Every worker must call [`FieldSelector::select_all`] with the same
/// fields; the sequence of collective calls depends on nothing else.
pub struct FieldSelector<'a, D> {
    store: &'a dyn ObsStore,
    dist: &'a D,
    skip_derived: bool,
    gatherer: ColumnGatherer<'a, D>,
}

impl<'a, D: Distribution> FieldSelector<'a, D> {
    pub fn new(store: &'a dyn ObsStore, dist: &'a D, skip_derived: bool) -> Self {
        Self {
            store,
            dist,
            skip_derived,
            gatherer: ColumnGatherer::new(store, dist, skip_derived),
        }
    }

    /// Gather every declared field in order.
    pub fn select_all(&self, fields: &[FieldSpec]) -> Result<GatherOutcome, PrintError> {
        let mut outcome = GatherOutcome::default();
        for spec in fields {
            let variable = &spec.variable;
            let Some(info) = self.agree(variable)? else {
                outcome.skip(variable.full_name(), SkipReason::MissingField);
                continue;
            };
            match info.element_type {
                ElementType::Float if variable.is_multi_level() => {
                    self.gatherer
                        .gather_levels(variable, &spec.levels, info.level_count, &mut outcome)?;
                }
                ElementType::Integer
                | ElementType::Float
                | ElementType::Text
                | ElementType::Timestamp
                | ElementType::Boolean => {
                    self.gatherer
                        .gather_field(variable, info.element_type, &mut outcome)?;
                }
            }
        }
        Ok(outcome)
    }

    /// Combine every worker's description of `variable`.
    ///
    /// The field counts as present only when every worker stores it. Level
    /// counts are reduced to the smallest one reported.
    fn agree(&self, variable: &Variable) -> Result<Option<FieldInfo>, PrintError> {
        let views = self
            .dist
            .all_gather(vec![self.store.describe(variable, self.skip_derived)])?;
        let mut agreed: Option<FieldInfo> = None;
        for view in views {
            let Some(info) = view else {
                return Ok(None);
            };
            agreed = Some(match agreed {
                None => info,
                Some(first) if first.element_type != info.element_type => {
                    return Err(PrintError::InconsistentSchema {
                        field: variable.full_name(),
                        first: first.element_type,
                        other: info.element_type,
                    });
                }
                Some(first) => FieldInfo {
                    element_type: first.element_type,
                    level_count: first.level_count.min(info.level_count),
                },
            });
        }
        Ok(agreed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distribution::{Solo, ThreadGroup};
    use crate::params::VariablePrintParameters;
    use crate::testing::FakeStore;
    use std::thread;

    fn specs(declared: &[VariablePrintParameters]) -> Vec<FieldSpec> {
        declared
            .iter()
            .map(|d| d.resolve().expect("resolve"))
            .collect()
    }

    #[test]
    fn insert_replaces_in_place() {
        let mut data = FilterData::default();
        let a = DisplayKey::at_level("a", 0);
        let b = DisplayKey::at_level("b", 0);
        data.insert(a.clone(), Column::Integer(vec![1]));
        data.insert(b, Column::Integer(vec![2]));
        let previous = data.insert(a, Column::Integer(vec![3]));
        assert_eq!(previous, Some(Column::Integer(vec![1])));
        assert_eq!(
            data.keys().map(DisplayKey::as_str).collect::<Vec<_>>(),
            vec!["a (level 0)", "b (level 0)"]
        );
        assert_eq!(data.get("a (level 0)"), Some(&Column::Integer(vec![3])));
    }

    #[test]
    fn select_all_dispatches_and_reports_misses() {
        let store = FakeStore::new(vec![0, 1])
            .column("ObsValue/airTemperature", Column::Float(vec![1.0, 2.0]))
            .column("MetaData/stationId", Column::Integer(vec![7, 8]))
            .column("ObsValue/brightnessTemperature_1", Column::Float(vec![3.0, 4.0]))
            .levels("GeoVaLs/air_temperature", vec![vec![5.0, 6.0], vec![7.0, 8.0]]);

        let fields = specs(&[
            VariablePrintParameters::new("ObsValue/airTemperature"),
            VariablePrintParameters::new("MetaData/stationId"),
            VariablePrintParameters::new("Nowhere/thing"),
            VariablePrintParameters::new("ObsValue/brightnessTemperature").with_channels("1-2"),
            VariablePrintParameters::new("GeoVaLs/air_temperature").with_levels([1, 3]),
        ]);

        let outcome = FieldSelector::new(&store, &Solo, false)
            .select_all(&fields)
            .expect("gather");

        assert_eq!(
            outcome.data.keys().map(DisplayKey::as_str).collect::<Vec<_>>(),
            vec![
                "ObsValue/airTemperature",
                "MetaData/stationId",
                "ObsValue/brightnessTemperature_1",
                "GeoVaLs/air_temperature (level 1)",
            ]
        );
        assert_eq!(
            outcome.data.get("GeoVaLs/air_temperature (level 1)"),
            Some(&Column::Float(vec![7.0, 8.0]))
        );
        let notices: Vec<String> = outcome.notices.iter().map(ToString::to_string).collect();
        assert_eq!(
            notices,
            vec![
                "Nowhere/thing not present in filter data",
                "ObsValue/brightnessTemperature_2 not present in filter data",
                "GeoVaLs/air_temperature (level 3) not present in filter data",
            ]
        );
        assert_eq!(
            outcome.notices.iter().map(|n| n.reason).collect::<Vec<_>>(),
            vec![
                SkipReason::MissingField,
                SkipReason::MissingChannel,
                SkipReason::OutOfRangeLevel
            ]
        );
    }

    #[test]
    fn negative_level_is_out_of_range() {
        let store = FakeStore::new(vec![0]).levels("ObsDiag/x", vec![vec![1.0]]);
        let fields = specs(&[VariablePrintParameters::new("ObsDiag/x").with_levels([-1, 0])]);
        let outcome = FieldSelector::new(&store, &Solo, false)
            .select_all(&fields)
            .expect("gather");
        assert_eq!(outcome.data.len(), 1);
        assert_eq!(outcome.notices[0].key, "ObsDiag/x (level -1)");
    }

    #[test]
    fn channel_missing_on_one_worker_is_skipped_everywhere() {
        let fields = specs(&[
            VariablePrintParameters::new("ObsValue/brightnessTemperature").with_channels("1, 2")
        ]);

        let handles: Vec<_> = ThreadGroup::new(2)
            .into_iter()
            .map(|group| {
                let fields = fields.clone();
                thread::spawn(move || {
                    let rank = group.rank();
                    let mut store = FakeStore::new(vec![rank]).column(
                        "ObsValue/brightnessTemperature_1",
                        Column::Float(vec![rank as f32]),
                    );
                    if rank == 0 {
                        store = store
                            .column("ObsValue/brightnessTemperature_2", Column::Float(vec![9.0]));
                    }
                    FieldSelector::new(&store, &group, false)
                        .select_all(&fields)
                        .expect("gather")
                })
            })
            .collect();

        for handle in handles {
            let outcome = handle.join().expect("worker thread");
            assert_eq!(
                outcome.data.get("ObsValue/brightnessTemperature_1"),
                Some(&Column::Float(vec![0.0, 1.0]))
            );
            assert!(!outcome.data.contains_key("ObsValue/brightnessTemperature_2"));
            assert_eq!(outcome.notices.len(), 1);
            assert_eq!(outcome.notices[0].reason, SkipReason::MissingChannel);
        }
    }

    #[test]
    fn field_missing_on_one_worker_is_missing_everywhere() {
        let fields = specs(&[
            VariablePrintParameters::new("ObsValue/a"),
            VariablePrintParameters::new("ObsValue/b"),
        ]);

        let handles: Vec<_> = ThreadGroup::new(3)
            .into_iter()
            .map(|group| {
                let fields = fields.clone();
                thread::spawn(move || {
                    let rank = group.rank();
                    let mut store = FakeStore::new(vec![rank])
                        .column("ObsValue/b", Column::Integer(vec![rank as i32]));
                    if rank != 1 {
                        store = store.column("ObsValue/a", Column::Integer(vec![0]));
                    }
                    FieldSelector::new(&store, &group, false)
                        .select_all(&fields)
                        .expect("gather")
                })
            })
            .collect();

        for handle in handles {
            let outcome = handle.join().expect("worker thread");
            assert_eq!(outcome.data.len(), 1);
            assert_eq!(outcome.data.get("ObsValue/b"), Some(&Column::Integer(vec![0, 1, 2])));
            assert_eq!(outcome.notices[0].key, "ObsValue/a");
        }
    }

    #[test]
    fn channel_with_a_different_type_is_skipped() {
        let store = FakeStore::new(vec![0, 1])
            .column("ObsValue/bt_1", Column::Float(vec![1.0, 2.0]))
            .column("ObsValue/bt_2", Column::Integer(vec![3, 4]))
            .column("ObsValue/bt_3", Column::Float(vec![5.0, 6.0]));
        let fields = specs(&[VariablePrintParameters::new("ObsValue/bt").with_channels("1-3")]);

        let outcome = FieldSelector::new(&store, &Solo, false)
            .select_all(&fields)
            .expect("gather");
        assert_eq!(
            outcome.data.keys().map(DisplayKey::as_str).collect::<Vec<_>>(),
            vec!["ObsValue/bt_1", "ObsValue/bt_3"]
        );
        assert_eq!(
            outcome.notices,
            vec![SkipNotice {
                key: "ObsValue/bt_2".to_string(),
                reason: SkipReason::MissingChannel,
            }]
        );
    }

    #[test]
    fn undeclared_channels_do_not_make_a_field_present() {
        let store = FakeStore::new(vec![0])
            .column("ObsValue/bt_0flag", Column::Integer(vec![1]))
            .column("ObsValue/bt_9", Column::Float(vec![2.0]));
        let fields = specs(&[VariablePrintParameters::new("ObsValue/bt").with_channels("4")]);

        let outcome = FieldSelector::new(&store, &Solo, false)
            .select_all(&fields)
            .expect("gather");
        assert!(outcome.data.is_empty());
        assert_eq!(outcome.notices[0].key, "ObsValue/bt");
        assert_eq!(outcome.notices[0].reason, SkipReason::MissingField);
    }

    #[test]
    fn disagreeing_types_fail_on_every_worker() {
        let fields = specs(&[VariablePrintParameters::new("ObsValue/a")]);
        let handles: Vec<_> = ThreadGroup::new(2)
            .into_iter()
            .map(|group| {
                let fields = fields.clone();
                thread::spawn(move || {
                    let column = if group.rank() == 0 {
                        Column::Integer(vec![1])
                    } else {
                        Column::Float(vec![1.0])
                    };
                    let store = FakeStore::new(vec![group.rank()]).column("ObsValue/a", column);
                    FieldSelector::new(&store, &group, false).select_all(&fields)
                })
            })
            .collect();
        for handle in handles {
            let result = handle.join().expect("worker thread");
            assert!(matches!(result, Err(PrintError::InconsistentSchema { .. })));
        }
    }
}
