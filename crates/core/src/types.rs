//! Core data types for the econ-normalize system.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Magnitude token assumed when a record carries no scale information.
pub const MAGNITUDE_ONES: &str = "ones";

/// Token -> fraction of the group carrying it.
pub type DimensionShares = BTreeMap<String, f64>;

/// Whether a token is a plausible ISO-4217 code (`^[A-Z]{3}$`).
pub fn is_iso_currency_code(token: &str) -> bool {
    token.len() == 3 && token.bytes().all(|b| b.is_ascii_uppercase())
}

/// Normalization dimension an indicator group is voted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Currency,
    Magnitude,
    Time,
}

impl Dimension {
    /// All dimensions in reporting order.
    pub const ALL: [Dimension; 3] = [Dimension::Currency, Dimension::Magnitude, Dimension::Time];

    /// Name used in reason clauses.
    pub fn as_str(self) -> &'static str {
        match self {
            Dimension::Currency => "currency",
            Dimension::Magnitude => "magnitude",
            Dimension::Time => "time",
        }
    }
}

/// Indicator type as classified by an upstream stage.
///
/// Treated as an opaque tag: this crate never derives it, it only reads it
/// to decide the time-dimension exemption and the count/volume rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum IndicatorType {
    Flow,
    Stock,
    Balance,
    Capacity,
    Price,
    Ratio,
    Percentage,
    Rate,
    Index,
    Count,
    Volume,
    Yield,
    Spread,
    Share,
    Sentiment,
    Allocation,
    Other,
}

impl IndicatorType {
    pub fn as_str(self) -> &'static str {
        match self {
            IndicatorType::Flow => "flow",
            IndicatorType::Stock => "stock",
            IndicatorType::Balance => "balance",
            IndicatorType::Capacity => "capacity",
            IndicatorType::Price => "price",
            IndicatorType::Ratio => "ratio",
            IndicatorType::Percentage => "percentage",
            IndicatorType::Rate => "rate",
            IndicatorType::Index => "index",
            IndicatorType::Count => "count",
            IndicatorType::Volume => "volume",
            IndicatorType::Yield => "yield",
            IndicatorType::Spread => "spread",
            IndicatorType::Share => "share",
            IndicatorType::Sentiment => "sentiment",
            IndicatorType::Allocation => "allocation",
            IndicatorType::Other => "other",
        }
    }

    /// Types that are levels or ratios and have no per-period time axis.
    pub fn lacks_time_axis(self) -> bool {
        matches!(
            self,
            IndicatorType::Stock
                | IndicatorType::Balance
                | IndicatorType::Capacity
                | IndicatorType::Price
                | IndicatorType::Ratio
                | IndicatorType::Index
                | IndicatorType::Percentage
                | IndicatorType::Rate
        )
    }

    /// Types whose raw magnitude ("ones") is hard to read.
    pub fn is_count_like(self) -> bool {
        matches!(self, IndicatorType::Count | IndicatorType::Volume)
    }
}

impl From<&str> for IndicatorType {
    fn from(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "flow" => IndicatorType::Flow,
            "stock" => IndicatorType::Stock,
            "balance" => IndicatorType::Balance,
            "capacity" => IndicatorType::Capacity,
            "price" => IndicatorType::Price,
            "ratio" => IndicatorType::Ratio,
            "percentage" => IndicatorType::Percentage,
            "rate" => IndicatorType::Rate,
            "index" => IndicatorType::Index,
            "count" => IndicatorType::Count,
            "volume" => IndicatorType::Volume,
            "yield" => IndicatorType::Yield,
            "spread" => IndicatorType::Spread,
            "share" => IndicatorType::Share,
            "sentiment" => IndicatorType::Sentiment,
            "allocation" => IndicatorType::Allocation,
            _ => IndicatorType::Other,
        }
    }
}

impl From<String> for IndicatorType {
    fn from(s: String) -> Self {
        IndicatorType::from(s.as_str())
    }
}

impl From<IndicatorType> for String {
    fn from(t: IndicatorType) -> Self {
        t.as_str().to_string()
    }
}

/// How an indicator aggregates over time, as tagged upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TemporalAggregation {
    PointInTime,
    PeriodRate,
    PeriodCumulative,
    PeriodTotal,
    PeriodAverage,
    NotApplicable,
    Unknown,
}

impl TemporalAggregation {
    pub fn as_str(self) -> &'static str {
        match self {
            TemporalAggregation::PointInTime => "point-in-time",
            TemporalAggregation::PeriodRate => "period-rate",
            TemporalAggregation::PeriodCumulative => "period-cumulative",
            TemporalAggregation::PeriodTotal => "period-total",
            TemporalAggregation::PeriodAverage => "period-average",
            TemporalAggregation::NotApplicable => "not-applicable",
            TemporalAggregation::Unknown => "unknown",
        }
    }

    /// Tags for which a per-period time scale is meaningless.
    pub fn exempts_time(self) -> bool {
        matches!(
            self,
            TemporalAggregation::PointInTime
                | TemporalAggregation::NotApplicable
                | TemporalAggregation::PeriodCumulative
        )
    }
}

impl From<&str> for TemporalAggregation {
    fn from(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "point-in-time" => TemporalAggregation::PointInTime,
            "period-rate" => TemporalAggregation::PeriodRate,
            "period-cumulative" => TemporalAggregation::PeriodCumulative,
            "period-total" => TemporalAggregation::PeriodTotal,
            "period-average" => TemporalAggregation::PeriodAverage,
            "not-applicable" => TemporalAggregation::NotApplicable,
            _ => TemporalAggregation::Unknown,
        }
    }
}

impl From<String> for TemporalAggregation {
    fn from(s: String) -> Self {
        TemporalAggregation::from(s.as_str())
    }
}

impl From<TemporalAggregation> for String {
    fn from(t: TemporalAggregation) -> Self {
        t.as_str().to_string()
    }
}

/// A single dated observation inside a record's sample series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    /// ISO date (`YYYY-MM-DD`, optionally followed by a time part).
    pub date: String,
    /// Observed value; `None` for nulls and non-numeric entries.
    #[serde(default, deserialize_with = "lenient_number")]
    pub value: Option<f64>,
}

impl TimeSeriesPoint {
    pub fn new(date: impl Into<String>, value: f64) -> Self {
        Self {
            date: date.into(),
            value: Some(value),
        }
    }
}

/// Accept any JSON value, keeping only numbers.
fn lenient_number<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    Ok(raw.as_f64())
}

fn missing_value() -> f64 {
    f64::NAN
}

fn lenient_value<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_number(deserializer)?.unwrap_or(f64::NAN))
}

/// One economic-indicator observation.
///
/// Field precedence per dimension:
///
/// | dimension | first choice          | second choice        | absent   |
/// |-----------|-----------------------|----------------------|----------|
/// | currency  | `explicit_currency`   | unit-string token    | no vote  |
/// | magnitude | `explicit_scale`      | unit-string token    | `"ones"` |
/// | time      | unit-string token     | `explicit_periodicity` | no vote |
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Record identifier.
    pub id: String,
    /// Indicator display name (e.g. "GDP").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Indicator identifier from metadata, used when the name is missing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indicator_key: Option<String>,
    /// Observed value. Missing or non-numeric values decode as NaN, which
    /// keeps the record out of group tallies but not out of series analysis.
    #[serde(default = "missing_value", deserialize_with = "lenient_value")]
    pub value: f64,
    /// Free-text unit string, interpreted by a [`UnitParser`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explicit_currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explicit_scale: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explicit_periodicity: Option<String>,
    /// Upstream indicator-type classification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indicator_type: Option<IndicatorType>,
    /// Upstream temporal-aggregation classification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temporal_aggregation: Option<TemporalAggregation>,
    /// Embedded chronological sample of the indicator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_series: Option<Vec<TimeSeriesPoint>>,
}

impl Record {
    /// Create a record with only an id and a value.
    pub fn new(id: impl Into<String>, value: f64) -> Self {
        Self {
            id: id.into(),
            value,
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_indicator_key(mut self, key: impl Into<String>) -> Self {
        self.indicator_key = Some(key.into());
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.explicit_currency = Some(currency.into());
        self
    }

    pub fn with_scale(mut self, scale: impl Into<String>) -> Self {
        self.explicit_scale = Some(scale.into());
        self
    }

    pub fn with_periodicity(mut self, periodicity: impl Into<String>) -> Self {
        self.explicit_periodicity = Some(periodicity.into());
        self
    }

    pub fn with_indicator_type(mut self, indicator_type: IndicatorType) -> Self {
        self.indicator_type = Some(indicator_type);
        self
    }

    pub fn with_temporal_aggregation(mut self, aggregation: TemporalAggregation) -> Self {
        self.temporal_aggregation = Some(aggregation);
        self
    }

    pub fn with_series(mut self, series: Vec<TimeSeriesPoint>) -> Self {
        self.sample_series = Some(series);
        self
    }
}

/// Tokens extracted from a unit string by an external parser.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitTokens {
    pub currency: Option<String>,
    pub scale: Option<String>,
    pub time_scale: Option<String>,
}

/// Extracts currency/scale/time tokens from a free-text unit string.
pub trait UnitParser {
    fn parse(&self, unit: &str) -> UnitTokens;
}

impl<F> UnitParser for F
where
    F: Fn(&str) -> UnitTokens,
{
    fn parse(&self, unit: &str) -> UnitTokens {
        self(unit)
    }
}

/// Parser for callers that only supply explicit fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoUnitParser;

impl UnitParser for NoUnitParser {
    fn parse(&self, _unit: &str) -> UnitTokens {
        UnitTokens::default()
    }
}

/// Per-dimension share maps of one group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectionShares {
    pub currency: DimensionShares,
    pub magnitude: DimensionShares,
    pub time: DimensionShares,
}

impl SelectionShares {
    pub fn get(&self, dimension: Dimension) -> &DimensionShares {
        match dimension {
            Dimension::Currency => &self.currency,
            Dimension::Magnitude => &self.magnitude,
            Dimension::Time => &self.time,
        }
    }
}

/// Normalization target agreed for one indicator group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoTargetSelection {
    pub currency: Option<String>,
    pub magnitude: Option<String>,
    pub time_scale: Option<String>,
    pub shares: SelectionShares,
    /// `"; "`-joined audit trail, one clause per dimension.
    pub reason: String,
}

impl AutoTargetSelection {
    /// Selected token for a dimension.
    pub fn get(&self, dimension: Dimension) -> Option<&str> {
        match dimension {
            Dimension::Currency => self.currency.as_deref(),
            Dimension::Magnitude => self.magnitude.as_deref(),
            Dimension::Time => self.time_scale.as_deref(),
        }
    }

    /// The reason clause for a dimension (e.g. `"time=skipped(stock)"`).
    pub fn reason_for(&self, dimension: Dimension) -> Option<&str> {
        let prefix = format!("{}=", dimension.as_str());
        self.reason
            .split("; ")
            .find(|clause| clause.starts_with(&prefix))
    }
}

/// Evidence metrics behind a time-series verdict.
///
/// A field is `None` when nothing in the series could feed it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeriesEvidence {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dec_jan_ratio: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub within_year_increase_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year_boundaries: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_at_boundary_pct: Option<f64>,
}

impl TimeSeriesEvidence {
    pub fn is_empty(&self) -> bool {
        self == &TimeSeriesEvidence::default()
    }
}

/// Cumulative (year-to-date) pattern classification for one series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeriesAnalysis {
    pub is_cumulative: bool,
    /// 0..1, additive over the three signals.
    pub cumulative_confidence: f64,
    pub has_seasonal_reset: bool,
    pub is_monotonic_within_year: bool,
    pub evidence: TimeSeriesEvidence,
}

impl TimeSeriesAnalysis {
    /// Result for series too short to judge.
    pub fn insufficient() -> Self {
        Self {
            is_cumulative: false,
            cumulative_confidence: 0.0,
            has_seasonal_reset: false,
            is_monotonic_within_year: false,
            evidence: TimeSeriesEvidence::default(),
        }
    }
}

/// A normalized value fed to the scale outlier detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaledValue {
    pub record_id: String,
    pub value: f64,
}

impl ScaledValue {
    pub fn new(record_id: impl Into<String>, value: f64) -> Self {
        Self {
            record_id: record_id.into(),
            value,
        }
    }
}

/// A record whose order of magnitude is far from its group's cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaleOutlierWarning {
    pub record_id: String,
    pub value: f64,
    pub magnitude: i32,
    pub dominant_magnitude: i32,
    /// Absolute distance from the dominant magnitude.
    pub magnitude_difference: i32,
    /// Magnitude -> record count for the whole group.
    pub distribution: BTreeMap<i32, usize>,
}

/// Per-record quality annotation produced alongside a selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityWarning {
    pub record_id: String,
    pub group_key: String,
    pub kind: QualityWarningKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum QualityWarningKind {
    /// A currency candidate was not a plausible ISO-4217 code and was ignored.
    InvalidCurrency { candidate: String },
    /// The record's token differs from the group target and needs conversion.
    TargetMismatch {
        dimension: Dimension,
        observed: String,
        selected: String,
    },
}

/// Time-series verdict for one record, keyed for merge-back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub record_id: String,
    pub analysis: TimeSeriesAnalysis,
    pub narrative: String,
}
