//! Consensus selection.
//!
//! Turns a group's tallies into one target per dimension. Each dimension
//! resolves through exactly one path and writes one reason clause:
//! - `majority(<token>,<share>)` when the leading token reaches the threshold
//! - `tie-break(<policy>)` when a configured fallback applies
//! - `skipped(<tag>)` for time on indicators without a time axis
//! - `none` otherwise

use crate::tally::{GroupProfile, GroupTally};
use econ_core::config::{ConsensusConfig, CurrencyTieBreak, MagnitudeTieBreak, TimeTieBreak};
use econ_core::{
    AutoTargetSelection, DimensionShares, SelectionShares, TemporalAggregation, MAGNITUDE_ONES,
};
use ordered_float::OrderedFloat;
use std::cmp::Reverse;
use tracing::debug;

/// Fraction of the majority threshold a non-"ones" magnitude needs to be
/// preferred outright for count-like indicators.
const COUNT_ALTERNATIVE_FACTOR: f64 = 0.3;

/// Outcome for one dimension.
type Choice = (Option<String>, String);

/// Highest share, ties broken by the lexicographically smaller token.
fn leader<'a>(shares: impl Iterator<Item = (&'a String, &'a f64)>) -> Option<(&'a str, f64)> {
    shares
        .max_by_key(|(token, share)| (OrderedFloat(**share), Reverse(*token)))
        .map(|(token, share)| (token.as_str(), *share))
}

/// Consensus selector.
pub struct ConsensusSelector {
    config: ConsensusConfig,
}

impl ConsensusSelector {
    /// Create a new selector.
    pub fn new(config: ConsensusConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ConsensusConfig {
        &self.config
    }

    /// Select the normalization target of one group.
    pub fn select(&self, tally: &GroupTally, profile: &GroupProfile) -> AutoTargetSelection {
        let basis = self.config.share_basis;
        let shares = SelectionShares {
            currency: tally.currency.shares(basis),
            magnitude: tally.magnitude.shares(basis),
            time: tally.time.shares(basis),
        };

        let (currency, currency_reason) = self.select_currency(&shares.currency);
        let (magnitude, magnitude_reason) = self.select_magnitude(&shares.magnitude, profile);
        let (time_scale, time_reason) = self.select_time(&shares.time, profile);

        let reason = [currency_reason, magnitude_reason, time_reason].join("; ");
        debug!(records = tally.len(), reason = %reason, "group target selected");

        AutoTargetSelection {
            currency,
            magnitude,
            time_scale,
            shares,
            reason,
        }
    }

    /// Leading token if it reaches the majority share.
    fn majority(&self, dimension: &str, shares: &DimensionShares) -> Option<Choice> {
        let (token, share) = leader(shares.iter())?;
        (share >= self.config.min_majority_share).then(|| {
            (
                Some(token.to_string()),
                format!("{dimension}=majority({token},{share:.2})"),
            )
        })
    }

    fn select_currency(&self, shares: &DimensionShares) -> Choice {
        if let Some(choice) = self.majority("currency", shares) {
            return choice;
        }
        if shares.is_empty() {
            return (None, "currency=none".to_string());
        }

        let policy = self.config.tie_breakers.currency;
        let preferred = match policy {
            CurrencyTieBreak::PreferTargetCurrency => self.config.target_currency.clone(),
            CurrencyTieBreak::PreferUsd => Some("USD".to_string()),
            CurrencyTieBreak::None => None,
        };

        match preferred {
            Some(code) => (Some(code), format!("currency=tie-break({})", policy.as_str())),
            None => (None, "currency=none".to_string()),
        }
    }

    fn select_magnitude(&self, shares: &DimensionShares, profile: &GroupProfile) -> Choice {
        let (magnitude, reason) = match self.majority("magnitude", shares) {
            Some(choice) => choice,
            None if shares.is_empty() => (None, "magnitude=none".to_string()),
            None => match self.config.tie_breakers.magnitude {
                MagnitudeTieBreak::PreferMillions => (
                    Some("millions".to_string()),
                    format!("magnitude=tie-break({})", MagnitudeTieBreak::PreferMillions.as_str()),
                ),
                MagnitudeTieBreak::None => (None, "magnitude=none".to_string()),
            },
        };

        let count_like = profile.indicator_type.is_some_and(|t| t.is_count_like());
        if !count_like || magnitude.as_deref() != Some(MAGNITUDE_ONES) {
            return (magnitude, reason);
        }

        // Raw counts are unreadable; prefer any scale the data actually used.
        let alternatives = shares.iter().filter(|(token, _)| token.as_str() != MAGNITUDE_ONES);
        match leader(alternatives) {
            Some((token, share)) => {
                let rule = if share >= COUNT_ALTERNATIVE_FACTOR * self.config.min_majority_share {
                    "count-preferred"
                } else {
                    "count-fallback"
                };
                (
                    Some(token.to_string()),
                    format!("{reason}+{rule}({token},{share:.2})"),
                )
            }
            None => (magnitude, reason),
        }
    }

    fn select_time(&self, shares: &DimensionShares, profile: &GroupProfile) -> Choice {
        // An unrecognized tag counts as no tag.
        let exemption = match profile.temporal_aggregation {
            Some(tag) if tag != TemporalAggregation::Unknown => tag.exempts_time().then(|| tag.as_str()),
            _ => profile
                .indicator_type
                .filter(|t| t.lacks_time_axis())
                .map(|t| t.as_str()),
        };
        if let Some(tag) = exemption {
            return (None, format!("time=skipped({tag})"));
        }

        if let Some(choice) = self.majority("time", shares) {
            return choice;
        }
        if shares.is_empty() {
            return (None, "time=none".to_string());
        }

        match self.config.tie_breakers.time {
            TimeTieBreak::PreferMonth => (
                Some("month".to_string()),
                format!("time=tie-break({})", TimeTieBreak::PreferMonth.as_str()),
            ),
            TimeTieBreak::None => (None, "time=none".to_string()),
        }
    }
}
