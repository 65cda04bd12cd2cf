//! Cumulative (year-to-date) pattern analysis.
//!
//! Decides whether an indicator's sample series is a running total since
//! the start of each calendar year rather than a per-period value. Three
//! signals are measured:
//! - values rise within each year
//! - December is much larger than January
//! - the value collapses across each December -> January boundary
//!
//! The verdict requires all three. The confidence gives partial credit per
//! signal, so the two can disagree (two signals -> 0.6/0.7, not cumulative).

use crate::narrative::format_time_series_narrative;
use chrono::{Datelike, NaiveDate};
use econ_core::{Record, TimeSeriesAnalysis, TimeSeriesEvidence, TimeSeriesPoint, ValidationResult};
use statrs::statistics::Statistics;
use std::collections::BTreeMap;
use tracing::{debug, trace};

/// Minimum number of valid points needed to classify a series.
pub const MIN_SERIES_POINTS: usize = 6;

/// January below this fraction of the prior December counts as a reset.
const RESET_RATIO: f64 = 0.2;
/// Percent of boundaries that must reset.
const SEASONAL_RESET_PCT: f64 = 50.0;
/// Percent of within-year steps that must not decrease.
const MONOTONIC_PCT: f64 = 80.0;
/// December / January ratio above which growth looks cumulative.
const HIGH_DEC_JAN_RATIO: f64 = 5.0;

const RESET_WEIGHT: f64 = 0.4;
const MONOTONIC_WEIGHT: f64 = 0.3;
const DEC_JAN_WEIGHT: f64 = 0.3;

#[derive(Debug, Clone, Copy)]
struct DatedValue {
    date: NaiveDate,
    value: f64,
}

/// Parse `YYYY-MM-DD`, allowing a trailing `T...` or ` ...` time part.
fn parse_point_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let head = raw.get(..10)?;
    match raw.as_bytes().get(10) {
        None | Some(b'T') | Some(b' ') => NaiveDate::parse_from_str(head, "%Y-%m-%d").ok(),
        Some(_) => None,
    }
}

/// Keep points with a finite value and a parseable date, sorted by date.
fn clean_series(points: &[TimeSeriesPoint]) -> Vec<DatedValue> {
    let mut cleaned: Vec<DatedValue> = points
        .iter()
        .filter_map(|p| {
            let value = p.value.filter(|v| v.is_finite())?;
            let date = parse_point_date(&p.date)?;
            Some(DatedValue { date, value })
        })
        .collect();

    cleaned.sort_by_key(|p| p.date);
    cleaned
}

/// Analyze a sample series for a cumulative year-to-date pattern.
pub fn analyze_time_series_pattern(points: &[TimeSeriesPoint]) -> TimeSeriesAnalysis {
    let series = clean_series(points);
    if series.len() < MIN_SERIES_POINTS {
        trace!(
            valid = series.len(),
            raw = points.len(),
            "too few valid points for pattern analysis"
        );
        return TimeSeriesAnalysis::insufficient();
    }

    let mut by_year: BTreeMap<i32, Vec<DatedValue>> = BTreeMap::new();
    for point in &series {
        by_year.entry(point.date.year()).or_default().push(*point);
    }

    // Within-year monotonicity
    let mut comparisons = 0u32;
    let mut increases = 0u32;
    for points in by_year.values() {
        for pair in points.windows(2) {
            comparisons += 1;
            if pair[1].value >= pair[0].value {
                increases += 1;
            }
        }
    }
    let within_year_increase_pct = if comparisons > 0 {
        increases as f64 / comparisons as f64 * 100.0
    } else {
        0.0
    };

    // December / January ratio per year
    let ratios: Vec<f64> = by_year
        .values()
        .filter_map(|points| {
            let jan = first_in_month(points, 1)?;
            let dec = last_in_month(points, 12)?;
            (jan > 0.0).then(|| dec / jan)
        })
        .collect();
    let dec_jan_ratio = if ratios.is_empty() {
        0.0
    } else {
        ratios.iter().mean()
    };

    // December(N) -> January(N+1) resets
    let mut boundaries = 0u32;
    let mut resets = 0u32;
    for (year, points) in &by_year {
        let Some(dec) = last_in_month(points, 12) else {
            continue;
        };
        let Some(jan) = by_year
            .get(&(year + 1))
            .and_then(|next| first_in_month(next, 1))
        else {
            continue;
        };

        boundaries += 1;
        if jan < RESET_RATIO * dec {
            resets += 1;
        }
    }
    let reset_at_boundary_pct = if boundaries > 0 {
        resets as f64 / boundaries as f64 * 100.0
    } else {
        0.0
    };

    let has_seasonal_reset = reset_at_boundary_pct > SEASONAL_RESET_PCT;
    let is_monotonic_within_year = within_year_increase_pct > MONOTONIC_PCT;
    let has_high_dec_jan_ratio = dec_jan_ratio > HIGH_DEC_JAN_RATIO;

    let is_cumulative = has_seasonal_reset && is_monotonic_within_year && has_high_dec_jan_ratio;

    let mut cumulative_confidence = 0.0;
    if has_seasonal_reset {
        cumulative_confidence += RESET_WEIGHT;
    }
    if is_monotonic_within_year {
        cumulative_confidence += MONOTONIC_WEIGHT;
    }
    if has_high_dec_jan_ratio {
        cumulative_confidence += DEC_JAN_WEIGHT;
    }

    let evidence = TimeSeriesEvidence {
        dec_jan_ratio: (!ratios.is_empty()).then_some(dec_jan_ratio),
        within_year_increase_pct: (comparisons > 0).then_some(within_year_increase_pct),
        year_boundaries: (boundaries > 0).then_some(boundaries),
        reset_at_boundary_pct: (boundaries > 0).then_some(reset_at_boundary_pct),
    };

    debug!(
        points = series.len(),
        years = by_year.len(),
        is_cumulative,
        confidence = cumulative_confidence,
        "time-series pattern analyzed"
    );

    TimeSeriesAnalysis {
        is_cumulative,
        cumulative_confidence,
        has_seasonal_reset,
        is_monotonic_within_year,
        evidence,
    }
}

fn first_in_month(points: &[DatedValue], month: u32) -> Option<f64> {
    points.iter().find(|p| p.date.month() == month).map(|p| p.value)
}

fn last_in_month(points: &[DatedValue], month: u32) -> Option<f64> {
    points.iter().rev().find(|p| p.date.month() == month).map(|p| p.value)
}

/// Analyze a record's embedded sample series, if it has one.
pub fn validate_record(record: &Record) -> Option<ValidationResult> {
    let series = record.sample_series.as_ref()?;
    let analysis = analyze_time_series_pattern(series);
    let narrative = format_time_series_narrative(&analysis);

    Some(ValidationResult {
        record_id: record.id.clone(),
        analysis,
        narrative,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    /// Monthly points `Jan..Dec` for each year with `value(month)`.
    fn monthly(years: &[i32], value: impl Fn(i32, u32) -> f64) -> Vec<TimeSeriesPoint> {
        let mut points = Vec::new();
        for &year in years {
            for month in 1..=12u32 {
                points.push(TimeSeriesPoint::new(
                    format!("{year}-{month:02}-28"),
                    value(year, month),
                ));
            }
        }
        points
    }

    #[test]
    fn test_parse_point_date() {
        assert!(parse_point_date("2024-03-31").is_some());
        assert!(parse_point_date("2024-03-31T00:00:00Z").is_some());
        assert!(parse_point_date(" 2024-03-31 ").is_some());
        assert!(parse_point_date("2024-3-31").is_none());
        assert!(parse_point_date("2024-02-30").is_none());
        assert!(parse_point_date("2024-03-311").is_none());
        assert!(parse_point_date("March 2024").is_none());
    }

    #[test]
    fn test_ytd_series_is_cumulative() {
        // Running totals: December = 12x January, January restarts near zero.
        let points = monthly(&[2021, 2022, 2023], |_, month| 100.0 * month as f64);

        let analysis = analyze_time_series_pattern(&points);

        assert!(analysis.is_cumulative);
        assert!(analysis.has_seasonal_reset);
        assert!(analysis.is_monotonic_within_year);
        assert!(analysis.cumulative_confidence >= 0.9);
        assert_abs_diff_eq!(analysis.cumulative_confidence, 1.0, epsilon = 1e-9);

        let evidence = &analysis.evidence;
        assert_abs_diff_eq!(evidence.dec_jan_ratio.unwrap(), 12.0, epsilon = 1e-9);
        assert_abs_diff_eq!(evidence.within_year_increase_pct.unwrap(), 100.0, epsilon = 1e-9);
        assert_eq!(evidence.year_boundaries, Some(2));
        assert_abs_diff_eq!(evidence.reset_at_boundary_pct.unwrap(), 100.0, epsilon = 1e-9);
    }

    #[test]
    fn test_unordered_input_with_noise() {
        let mut points = monthly(&[2022, 2023], |_, month| 50.0 * month as f64);
        points.reverse();
        points.push(TimeSeriesPoint {
            date: "2022-06-15".to_string(),
            value: None,
        });
        points.push(TimeSeriesPoint::new("not a date", 1e9));
        points.push(TimeSeriesPoint::new("2022-07-01", f64::NAN));

        let analysis = analyze_time_series_pattern(&points);

        assert!(analysis.is_cumulative);
        assert_eq!(analysis.evidence.year_boundaries, Some(1));
    }

    #[test]
    fn test_too_few_points_returns_sentinel() {
        let points = vec![
            TimeSeriesPoint::new("2023-01-31", 10.0),
            TimeSeriesPoint::new("2023-02-28", 20.0),
            TimeSeriesPoint::new("2023-03-31", 30.0),
            TimeSeriesPoint::new("2023-04-30", 40.0),
            TimeSeriesPoint::new("2023-05-31", 50.0),
            TimeSeriesPoint::new("bad", 60.0),
            TimeSeriesPoint {
                date: "2023-07-31".to_string(),
                value: None,
            },
        ];

        let analysis = analyze_time_series_pattern(&points);

        assert_eq!(analysis, TimeSeriesAnalysis::insufficient());
        assert!(!analysis.is_cumulative);
        assert_eq!(analysis.cumulative_confidence, 0.0);
        assert!(analysis.evidence.is_empty());
    }

    #[test]
    fn test_flat_annual_series_has_no_evidence() {
        let points: Vec<TimeSeriesPoint> = (2015..=2022)
            .map(|year| TimeSeriesPoint::new(format!("{year}-06-30"), 42.0))
            .collect();

        let analysis = analyze_time_series_pattern(&points);

        assert!(!analysis.is_cumulative);
        assert_eq!(analysis.cumulative_confidence, 0.0);
        assert!(!analysis.has_seasonal_reset);
        assert!(!analysis.is_monotonic_within_year);
        assert!(analysis.evidence.is_empty());
    }

    #[test]
    fn test_two_signals_diverge_from_verdict() {
        // A single year of running totals: no boundary to observe a reset.
        let points = monthly(&[2023], |_, month| 10.0 * month as f64);

        let analysis = analyze_time_series_pattern(&points);

        assert!(!analysis.is_cumulative);
        assert!(!analysis.has_seasonal_reset);
        assert!(analysis.is_monotonic_within_year);
        assert_abs_diff_eq!(analysis.cumulative_confidence, 0.6, epsilon = 1e-9);
        assert_eq!(analysis.evidence.year_boundaries, None);
    }

    #[test]
    fn test_discrete_monthly_series_not_cumulative() {
        // Per-period values oscillating around a level.
        let points = monthly(&[2021, 2022], |_, month| {
            if month % 2 == 0 {
                105.0
            } else {
                95.0
            }
        });

        let analysis = analyze_time_series_pattern(&points);

        assert!(!analysis.is_cumulative);
        assert!(!analysis.has_seasonal_reset);
        assert!(!analysis.is_monotonic_within_year);
        assert_eq!(analysis.cumulative_confidence, 0.0);
        assert_eq!(analysis.evidence.year_boundaries, Some(1));
        assert_abs_diff_eq!(analysis.evidence.reset_at_boundary_pct.unwrap(), 0.0);
    }

    #[test]
    fn test_non_positive_january_skipped_in_ratio() {
        let points = monthly(&[2022, 2023], |year, month| {
            if year == 2022 && month == 1 {
                0.0
            } else {
                20.0 * month as f64
            }
        });

        let analysis = analyze_time_series_pattern(&points);

        // Only 2023 qualifies for the ratio.
        assert_abs_diff_eq!(analysis.evidence.dec_jan_ratio.unwrap(), 12.0, epsilon = 1e-9);
    }

    #[test]
    fn test_validate_record() {
        let record = Record::new("r1", 1.0)
            .with_series(monthly(&[2022, 2023], |_, month| 100.0 * month as f64));
        let result = validate_record(&record).unwrap();

        assert_eq!(result.record_id, "r1");
        assert!(result.analysis.is_cumulative);
        assert!(!result.narrative.is_empty());

        assert!(validate_record(&Record::new("r2", 1.0)).is_none());
    }
}
