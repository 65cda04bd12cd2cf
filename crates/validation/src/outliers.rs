//! Scale outlier detection.
//!
//! Buckets a group's normalized values by order of magnitude and flags
//! members far from the dominant bucket, which usually means a unit or
//! scale reporting error upstream.

use econ_core::config::OutlierConfig;
use econ_core::{ScaleOutlierWarning, ScaledValue};
use std::collections::BTreeMap;
use tracing::debug;

/// `floor(log10(|value|))`, or `None` for zero and non-finite values.
pub fn magnitude_of(value: f64) -> Option<i32> {
    if !value.is_finite() || value == 0.0 {
        return None;
    }

    let abs = value.abs();
    let mut magnitude = abs.log10().floor() as i32;

    // log10 can land one ulp short of an exact power of ten.
    if 10f64.powi(magnitude + 1) <= abs {
        magnitude += 1;
    } else if 10f64.powi(magnitude) > abs {
        magnitude -= 1;
    }

    Some(magnitude)
}

/// Values split by the filter mode.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutlierPartition {
    /// Values that stay in the group, in input order.
    pub kept: Vec<ScaledValue>,
    /// Flagged values, in input order.
    pub flagged: Vec<ScaledValue>,
    /// One warning per flagged value.
    pub warnings: Vec<ScaleOutlierWarning>,
}

/// Scale outlier detector.
pub struct ScaleOutlierDetector {
    config: OutlierConfig,
}

impl ScaleOutlierDetector {
    /// Create a new detector.
    pub fn new(config: OutlierConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OutlierConfig {
        &self.config
    }

    /// Magnitude -> count over the values that have a magnitude.
    pub fn distribution(&self, values: &[ScaledValue]) -> BTreeMap<i32, usize> {
        let mut histogram = BTreeMap::new();
        for magnitude in values.iter().filter_map(|v| magnitude_of(v.value)) {
            *histogram.entry(magnitude).or_insert(0) += 1;
        }
        histogram
    }

    /// The bucket holding at least `cluster_threshold` of the group.
    ///
    /// Ties between qualifying buckets go to the larger count, then the
    /// lower magnitude.
    pub fn dominant_magnitude(&self, distribution: &BTreeMap<i32, usize>) -> Option<i32> {
        let total: usize = distribution.values().sum();
        if total == 0 {
            return None;
        }

        let mut best: Option<(i32, usize)> = None;
        for (&magnitude, &count) in distribution {
            if (count as f64 / total as f64) < self.config.cluster_threshold {
                continue;
            }
            if best.map_or(true, |(_, best_count)| count > best_count) {
                best = Some((magnitude, count));
            }
        }

        best.map(|(magnitude, _)| magnitude)
    }

    /// Flag values far from the group's dominant magnitude.
    pub fn detect(&self, values: &[ScaledValue]) -> Vec<ScaleOutlierWarning> {
        self.scan(values).into_iter().map(|(_, w)| w).collect()
    }

    /// Detect outliers and move them to a side list.
    pub fn partition(&self, values: &[ScaledValue]) -> OutlierPartition {
        let flagged_at = self.scan(values);

        let mut partition = OutlierPartition::default();
        let mut flags = flagged_at.iter().map(|(index, _)| *index).peekable();
        for (index, value) in values.iter().enumerate() {
            if flags.next_if_eq(&index).is_some() {
                partition.flagged.push(value.clone());
            } else {
                partition.kept.push(value.clone());
            }
        }
        partition.warnings = flagged_at.into_iter().map(|(_, w)| w).collect();

        partition
    }

    /// Warnings paired with the index of the flagged value.
    fn scan(&self, values: &[ScaledValue]) -> Vec<(usize, ScaleOutlierWarning)> {
        let distribution = self.distribution(values);
        let Some(dominant) = self.dominant_magnitude(&distribution) else {
            debug!(
                values = values.len(),
                buckets = distribution.len(),
                "no dominant magnitude cluster, skipping outlier scan"
            );
            return Vec::new();
        };

        let threshold = i32::try_from(self.config.magnitude_difference_threshold).unwrap_or(i32::MAX);
        let flagged: Vec<(usize, ScaleOutlierWarning)> = values
            .iter()
            .enumerate()
            .filter_map(|(index, v)| {
                let magnitude = magnitude_of(v.value)?;
                let difference = (magnitude - dominant).abs();
                (difference >= threshold).then(|| {
                    let warning = ScaleOutlierWarning {
                        record_id: v.record_id.clone(),
                        value: v.value,
                        magnitude,
                        dominant_magnitude: dominant,
                        magnitude_difference: difference,
                        distribution: distribution.clone(),
                    };
                    (index, warning)
                })
            })
            .collect();

        if !flagged.is_empty() {
            debug!(dominant, flagged = flagged.len(), "scale outliers detected");
        }

        flagged
    }
}
