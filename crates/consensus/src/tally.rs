//! Dimension tallies.
//!
//! Extracts one currency / magnitude / time token per record and counts
//! them per group. Precedence differs per dimension:
//! currency and magnitude prefer the explicit field, time prefers the
//! unit-string token.

use econ_core::config::ShareBasis;
use econ_core::{
    is_iso_currency_code, DimensionShares, IndicatorType, Record, TemporalAggregation, UnitParser,
    MAGNITUDE_ONES,
};
use std::collections::BTreeMap;
use tracing::trace;

/// Tokens one record contributes to its group's tally.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordTokens {
    /// First valid ISO-4217 candidate.
    pub currency: Option<String>,
    /// Scale token, `"ones"` when the record has none.
    pub magnitude: String,
    pub time: Option<String>,
    /// Currency candidates rejected as implausible.
    pub rejected_currencies: Vec<String>,
}

fn non_empty(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

/// Extract the per-dimension tokens of a record.
pub fn extract_tokens(record: &Record, parser: &dyn UnitParser) -> RecordTokens {
    let unit = record
        .unit
        .as_deref()
        .map(|unit| parser.parse(unit))
        .unwrap_or_default();

    let mut tokens = RecordTokens::default();

    for candidate in [record.explicit_currency.as_deref(), unit.currency.as_deref()] {
        let Some(candidate) = non_empty(candidate) else {
            continue;
        };
        let code = candidate.to_ascii_uppercase();
        if is_iso_currency_code(&code) {
            tokens.currency = Some(code);
            break;
        }
        trace!(record_id = %record.id, candidate = %candidate, "rejecting currency candidate");
        tokens.rejected_currencies.push(candidate.to_string());
    }

    tokens.magnitude = non_empty(record.explicit_scale.as_deref())
        .or_else(|| non_empty(unit.scale.as_deref()))
        .map(str::to_lowercase)
        .unwrap_or_else(|| MAGNITUDE_ONES.to_string());

    tokens.time = non_empty(unit.time_scale.as_deref())
        .or_else(|| non_empty(record.explicit_periodicity.as_deref()))
        .map(str::to_lowercase);

    tokens
}

/// Token counts for one dimension of one group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DimensionTally {
    counts: BTreeMap<String, usize>,
    observed: usize,
    group_size: usize,
}

impl DimensionTally {
    /// Count one record; `None` still counts toward the group size.
    pub fn record(&mut self, token: Option<&str>) {
        self.group_size += 1;
        if let Some(token) = token {
            *self.counts.entry(token.to_string()).or_insert(0) += 1;
            self.observed += 1;
        }
    }

    pub fn count(&self, token: &str) -> usize {
        self.counts.get(token).copied().unwrap_or(0)
    }

    pub fn counts(&self) -> &BTreeMap<String, usize> {
        &self.counts
    }

    /// Records that carried a token.
    pub fn observed(&self) -> usize {
        self.observed
    }

    pub fn group_size(&self) -> usize {
        self.group_size
    }

    /// Token shares. Empty when no token was observed.
    pub fn shares(&self, basis: ShareBasis) -> DimensionShares {
        let denominator = match basis {
            ShareBasis::GroupSize => self.group_size,
            ShareBasis::ObservedTokens => self.observed,
        };
        if self.observed == 0 || denominator == 0 {
            return DimensionShares::new();
        }

        self.counts
            .iter()
            .map(|(token, &count)| (token.clone(), count as f64 / denominator as f64))
            .collect()
    }
}

/// Tallies of all three dimensions for one group.
#[derive(Debug, Clone, Default)]
pub struct GroupTally {
    pub currency: DimensionTally,
    pub magnitude: DimensionTally,
    pub time: DimensionTally,
    /// Tokens per record, in group order.
    pub tokens: Vec<RecordTokens>,
}

impl GroupTally {
    /// Tally a group's records.
    pub fn from_records(records: &[&Record], parser: &dyn UnitParser) -> Self {
        let mut tally = GroupTally::default();
        for record in records {
            let tokens = extract_tokens(record, parser);
            tally.currency.record(tokens.currency.as_deref());
            tally.magnitude.record(Some(tokens.magnitude.as_str()));
            tally.time.record(tokens.time.as_deref());
            tally.tokens.push(tokens);
        }
        tally
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Upstream classification of a group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroupProfile {
    pub indicator_type: Option<IndicatorType>,
    pub temporal_aggregation: Option<TemporalAggregation>,
}

impl GroupProfile {
    /// Take each tag from the first record in the group that carries it.
    /// Unrecognized temporal-aggregation tags are skipped.
    pub fn from_records(records: &[&Record]) -> Self {
        Self {
            indicator_type: records.iter().find_map(|r| r.indicator_type),
            temporal_aggregation: records.iter().find_map(|r| {
                r.temporal_aggregation
                    .filter(|tag| *tag != TemporalAggregation::Unknown)
            }),
        }
    }
}
