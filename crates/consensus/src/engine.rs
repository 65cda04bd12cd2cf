//! Normalization engine.
//!
//! Runs one batch end to end: grouping, per-group tallies and target
//! selection, quality warnings and sample-series validation. Each stage
//! is also usable on its own through the crates it comes from.

use crate::selector::ConsensusSelector;
use crate::tally::{GroupProfile, GroupTally};
use crate::warnings::quality_warnings;
use econ_core::{
    AutoTargetSelection, Config, NoUnitParser, QualityWarning, Record, Result,
    ScaleOutlierWarning, ScaledValue, UnitParser, ValidationResult,
};
use econ_ingestion::{GroupingStats, IndicatorGroup, KeyResolver, RecordGrouper};
use econ_validation::{validate_record, ScaleOutlierDetector};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Everything one batch run produces.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    /// Selection per group key.
    pub selections: BTreeMap<String, AutoTargetSelection>,
    /// Quality warnings, in group key order then record order.
    pub warnings: Vec<QualityWarning>,
    /// Sample-series verdicts, in input order.
    pub validations: Vec<ValidationResult>,
    pub stats: GroupingStats,
}

/// Outlier scan result for one group.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutlierReport {
    pub warnings: Vec<ScaleOutlierWarning>,
    /// Values left in the group. All values unless filtering is on.
    pub kept: Vec<ScaledValue>,
    /// Values moved aside. Always empty unless filtering is on.
    pub flagged: Vec<ScaledValue>,
}

/// Selection and warnings for one group.
struct GroupOutcome {
    key: String,
    selection: AutoTargetSelection,
    warnings: Vec<QualityWarning>,
}

/// Batch normalization engine.
pub struct NormalizationEngine {
    config: Config,
    grouper: RecordGrouper,
    selector: ConsensusSelector,
    outliers: ScaleOutlierDetector,
    parser: Box<dyn UnitParser + Send + Sync>,
}

impl NormalizationEngine {
    /// Create an engine from a validated configuration.
    ///
    /// Unit strings are ignored until a parser is set with
    /// [`with_unit_parser`](Self::with_unit_parser).
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            grouper: RecordGrouper::new(&config.grouping),
            selector: ConsensusSelector::new(config.consensus.clone()),
            outliers: ScaleOutlierDetector::new(config.outliers.clone()),
            parser: Box::new(NoUnitParser),
            config,
        })
    }

    /// Use `parser` to read tokens from unit strings.
    pub fn with_unit_parser<P>(mut self, parser: P) -> Self
    where
        P: UnitParser + Send + Sync + 'static,
    {
        self.parser = Box::new(parser);
        self
    }

    /// Replace the default group key resolver.
    pub fn with_key_resolver<R>(mut self, resolver: R) -> Self
    where
        R: KeyResolver + Send + Sync + 'static,
    {
        self.grouper = RecordGrouper::new(&self.config.grouping).with_resolver(resolver);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Select the target of an already-formed group.
    pub fn select_group(&self, records: &[&Record]) -> AutoTargetSelection {
        let tally = GroupTally::from_records(records, self.parser.as_ref());
        self.selector.select(&tally, &GroupProfile::from_records(records))
    }

    /// Run a whole batch.
    pub fn run(&self, records: &[Record]) -> BatchReport {
        let grouping = self.grouper.group(records);

        #[cfg(feature = "parallel")]
        let outcomes: Vec<GroupOutcome> = grouping
            .groups
            .par_iter()
            .map(|group| self.process_group(group))
            .collect();
        #[cfg(not(feature = "parallel"))]
        let outcomes: Vec<GroupOutcome> = grouping
            .groups
            .iter()
            .map(|group| self.process_group(group))
            .collect();

        let mut report = BatchReport {
            validations: self.validate_series(records),
            stats: grouping.stats,
            ..BatchReport::default()
        };
        for outcome in outcomes {
            report.warnings.extend(outcome.warnings);
            report.selections.insert(outcome.key, outcome.selection);
        }

        debug!(
            groups = report.selections.len(),
            warnings = report.warnings.len(),
            validations = report.validations.len(),
            "batch normalized"
        );

        report
    }

    /// Time-series verdicts for every record carrying a sample series.
    pub fn validate_series(&self, records: &[Record]) -> Vec<ValidationResult> {
        #[cfg(feature = "parallel")]
        let results: Vec<ValidationResult> = records.par_iter().filter_map(validate_record).collect();
        #[cfg(not(feature = "parallel"))]
        let results: Vec<ValidationResult> = records.iter().filter_map(validate_record).collect();

        results
    }

    /// Scan normalized values per group for scale outliers.
    pub fn scan_outliers(
        &self,
        groups: &BTreeMap<String, Vec<ScaledValue>>,
    ) -> BTreeMap<String, OutlierReport> {
        groups
            .iter()
            .map(|(key, values)| {
                let report = if self.outliers.config().filter {
                    let partition = self.outliers.partition(values);
                    OutlierReport {
                        warnings: partition.warnings,
                        kept: partition.kept,
                        flagged: partition.flagged,
                    }
                } else {
                    OutlierReport {
                        warnings: self.outliers.detect(values),
                        kept: values.clone(),
                        flagged: Vec::new(),
                    }
                };
                if !report.warnings.is_empty() {
                    debug!(group = %key, outliers = report.warnings.len(), "group has scale outliers");
                }
                (key.clone(), report)
            })
            .collect()
    }

    fn process_group(&self, group: &IndicatorGroup<'_>) -> GroupOutcome {
        let tally = GroupTally::from_records(&group.records, self.parser.as_ref());
        let profile = GroupProfile::from_records(&group.records);
        let selection = self.selector.select(&tally, &profile);
        let warnings = quality_warnings(&group.key, &group.records, &tally, &selection);

        debug!(group = %group.key, records = group.len(), reason = %selection.reason, "group processed");

        GroupOutcome {
            key: group.key.clone(),
            selection,
            warnings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use econ_core::config::OutlierConfig;
    use econ_core::{Dimension, TimeSeriesPoint, UnitTokens};

    fn ytd_series() -> Vec<TimeSeriesPoint> {
        let mut series = Vec::new();
        for year in [2022, 2023] {
            for month in 1..=12 {
                series.push(TimeSeriesPoint::new(
                    format!("{year}-{month:02}-01"),
                    100.0 * month as f64,
                ));
            }
        }
        series
    }

    fn batch() -> Vec<Record> {
        vec![
            Record::new("1", 10.0).with_name("Exports").with_unit("USD per month"),
            Record::new("2", 11.0).with_name("exports ").with_unit("USD per month"),
            Record::new("3", 12.0).with_name("Exports").with_unit("EUR per month"),
            Record::new("4", 5.0)
                .with_name("Reserves")
                .with_currency("USD")
                .with_scale("billions")
                .with_temporal_aggregation(econ_core::TemporalAggregation::PointInTime),
            Record::new("5", f64::NAN).with_name("Exports"),
            Record::new("6", 900.0).with_name("Car Sales").with_series(ytd_series()),
        ]
    }

    fn unit_parser(unit: &str) -> UnitTokens {
        let mut words = unit.split_whitespace();
        UnitTokens {
            currency: words.next().map(str::to_string),
            scale: None,
            time_scale: unit.split(" per ").nth(1).map(str::to_string),
        }
    }

    fn engine() -> NormalizationEngine {
        NormalizationEngine::new(Config::default())
            .expect("default config is valid")
            .with_unit_parser(unit_parser)
    }

    #[test]
    fn test_run_batch() {
        let report = engine().run(&batch());

        assert_eq!(report.stats.total_records, 6);
        assert_eq!(report.stats.non_finite, 1);
        assert_eq!(
            report.selections.keys().collect::<Vec<_>>(),
            vec!["car sales", "exports", "reserves"]
        );

        let exports = &report.selections["exports"];
        assert_eq!(exports.currency.as_deref(), Some("USD"));
        assert_eq!(exports.time_scale.as_deref(), Some("month"));
        assert_abs_diff_eq!(exports.shares.currency["USD"], 2.0 / 3.0, epsilon = 1e-12);

        let reserves = &report.selections["reserves"];
        assert_eq!(reserves.magnitude.as_deref(), Some("billions"));
        assert_eq!(reserves.reason_for(Dimension::Time), Some("time=skipped(point-in-time)"));

        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].record_id, "3");

        assert_eq!(report.validations.len(), 1);
        assert_eq!(report.validations[0].record_id, "6");
        assert!(report.validations[0].analysis.is_cumulative);
    }

    #[test]
    fn test_null_value_still_validates_series() {
        let series: Vec<String> = (1..=6)
            .map(|m| format!(r#"{{"date": "2023-{m:02}-01", "value": {}}}"#, m * 10))
            .collect();
        let json = format!(
            r#"[
                {{"id": "a", "name": "Car Sales", "value": null, "sampleSeries": [{}]}},
                {{"id": "b", "name": "Car Sales", "value": 4.0}}
            ]"#,
            series.join(",")
        );
        let records = econ_ingestion::parse_records(&json).expect("valid batch");
        assert_eq!(records.len(), 2);

        let report = engine().run(&records);

        assert_eq!(report.stats.non_finite, 1);
        assert_eq!(report.stats.grouped_records, 1);
        assert_eq!(report.validations.len(), 1);
        assert_eq!(report.validations[0].record_id, "a");
    }

    #[test]
    fn test_run_is_deterministic() {
        let engine = engine();
        let records = batch();

        let first = serde_json::to_string(&engine.run(&records)).expect("serializable");
        let second = serde_json::to_string(&engine.run(&records)).expect("serializable");
        assert_eq!(first, second);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = Config::default();
        config.consensus.min_majority_share = 1.5;
        assert!(NormalizationEngine::new(config).is_err());
    }

    #[test]
    fn test_custom_key_resolver() {
        let engine = engine().with_key_resolver(|r: &Record| r.id.clone());
        let report = engine.run(&batch());
        assert_eq!(report.selections.len(), 5);
        assert!(report.selections.contains_key("1"));
    }

    #[test]
    fn test_select_group_without_parser() {
        let engine = NormalizationEngine::new(Config::default()).expect("default config is valid");
        let records = batch();
        let refs: Vec<&Record> = records[..3].iter().collect();

        // Unit strings are ignored without a parser.
        let selection = engine.select_group(&refs);
        assert_eq!(selection.currency, None);
        assert_eq!(selection.magnitude.as_deref(), Some("ones"));
    }

    #[test]
    fn test_scan_outliers_modes() {
        let values: Vec<ScaledValue> = [("a", 1.0), ("b", 2.0), ("c", 3.0), ("d", 5_000.0)]
            .iter()
            .map(|(id, v)| ScaledValue::new(*id, *v))
            .collect();
        let groups = BTreeMap::from([("g".to_string(), values)]);

        let annotate = engine().scan_outliers(&groups);
        assert_eq!(annotate["g"].warnings.len(), 1);
        assert_eq!(annotate["g"].kept.len(), 4);
        assert!(annotate["g"].flagged.is_empty());

        let mut config = Config::default();
        config.outliers = OutlierConfig {
            filter: true,
            ..OutlierConfig::default()
        };
        let filtering = NormalizationEngine::new(config).expect("valid config");
        let filtered = filtering.scan_outliers(&groups);
        assert_eq!(filtered["g"].kept.len(), 3);
        assert_eq!(filtered["g"].flagged[0].record_id, "d");
    }
}
