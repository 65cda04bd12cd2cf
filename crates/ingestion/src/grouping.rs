//! Grouping records by indicator key.
//!
//! Groups are rebuilt on every call and hold borrowed records; nothing here
//! mutates or retains the input.

use crate::key::{normalize_key, DefaultKeyResolver, KeyResolver};
use econ_core::config::GroupingConfig;
use econ_core::Record;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, trace};

/// Records sharing one indicator key.
#[derive(Debug, Clone)]
pub struct IndicatorGroup<'a> {
    /// Resolved group key.
    pub key: String,
    /// Members in input order.
    pub records: Vec<&'a Record>,
}

impl<'a> IndicatorGroup<'a> {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Counts of what happened to each input record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupingStats {
    /// Records seen.
    pub total_records: usize,
    /// Records placed in a group.
    pub grouped_records: usize,
    /// Records whose key resolved to an empty string.
    pub empty_key: usize,
    /// Records removed by the allow/deny lists.
    pub filtered: usize,
    /// Records with a NaN or infinite value.
    pub non_finite: usize,
}

/// Output of a grouping pass.
#[derive(Debug, Clone)]
pub struct Grouping<'a> {
    /// Groups ordered by key.
    pub groups: Vec<IndicatorGroup<'a>>,
    pub stats: GroupingStats,
}

/// Groups records by indicator key after allow/deny filtering.
pub struct RecordGrouper {
    allow_list: Vec<String>,
    deny_list: Vec<String>,
    resolver: Box<dyn KeyResolver + Send + Sync>,
}

impl RecordGrouper {
    /// Create a grouper with the default key resolver.
    pub fn new(config: &GroupingConfig) -> Self {
        Self {
            allow_list: config.allow_list.clone(),
            deny_list: config.deny_list.clone(),
            resolver: Box::new(DefaultKeyResolver),
        }
    }

    /// Replace the key resolver.
    pub fn with_resolver<R>(mut self, resolver: R) -> Self
    where
        R: KeyResolver + Send + Sync + 'static,
    {
        self.resolver = Box::new(resolver);
        self
    }

    /// Resolve one record's key.
    pub fn key_for(&self, record: &Record) -> String {
        self.resolver.resolve(record)
    }

    /// Build the filter set, normalized like the keys it is matched against.
    fn filter_set(&self, list: &[String]) -> BTreeSet<String> {
        if self.resolver.normalizes() {
            list.iter().map(|entry| normalize_key(entry)).collect()
        } else {
            list.iter().cloned().collect()
        }
    }

    /// Group records by key.
    pub fn group<'a>(&self, records: &'a [Record]) -> Grouping<'a> {
        let allow = self.filter_set(&self.allow_list);
        let deny = self.filter_set(&self.deny_list);

        let mut stats = GroupingStats {
            total_records: records.len(),
            ..Default::default()
        };
        let mut by_key: BTreeMap<String, Vec<&'a Record>> = BTreeMap::new();

        for record in records {
            if !record.value.is_finite() {
                debug!(record_id = %record.id, value = record.value, "dropping record with non-finite value");
                stats.non_finite += 1;
                continue;
            }

            let key = self.key_for(record);
            if key.is_empty() {
                trace!(record_id = %record.id, "dropping record with empty indicator key");
                stats.empty_key += 1;
                continue;
            }

            if deny.contains(&key) || (!allow.is_empty() && !allow.contains(&key)) {
                trace!(record_id = %record.id, key = %key, "record filtered by allow/deny list");
                stats.filtered += 1;
                continue;
            }

            by_key.entry(key).or_default().push(record);
            stats.grouped_records += 1;
        }

        let groups: Vec<IndicatorGroup<'a>> = by_key
            .into_iter()
            .map(|(key, records)| IndicatorGroup { key, records })
            .collect();

        debug!(
            groups = groups.len(),
            grouped = stats.grouped_records,
            total = stats.total_records,
            "grouped indicator records"
        );

        Grouping { groups, stats }
    }
}
