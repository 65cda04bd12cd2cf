//! Narrative rendering of time-series verdicts.
//!
//! Output is built only from an already-computed [`TimeSeriesAnalysis`];
//! nothing here recomputes a metric.

use econ_core::TimeSeriesAnalysis;

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

/// Render an analysis as a short multi-line summary for human or LLM review.
pub fn format_time_series_narrative(analysis: &TimeSeriesAnalysis) -> String {
    let evidence = &analysis.evidence;

    if evidence.is_empty() && analysis.cumulative_confidence == 0.0 {
        return "Time-series pattern: no usable evidence; treat values as discrete per-period."
            .to_string();
    }

    let mut out = String::new();

    let verdict = if analysis.is_cumulative {
        "CUMULATIVE (year-to-date running total)"
    } else {
        "DISCRETE (per-period values)"
    };
    out.push_str(&format!(
        "Time-series pattern: {} (confidence {:.0}%)\n",
        verdict,
        analysis.cumulative_confidence * 100.0
    ));

    match (evidence.reset_at_boundary_pct, evidence.year_boundaries) {
        (Some(pct), Some(boundaries)) => out.push_str(&format!(
            "- Reset at year boundary: {} ({:.1}% of {} December->January transitions)\n",
            yes_no(analysis.has_seasonal_reset),
            pct,
            boundaries
        )),
        _ => out.push_str("- Reset at year boundary: no December->January transitions observed\n"),
    }

    match evidence.within_year_increase_pct {
        Some(pct) => out.push_str(&format!(
            "- Rising within each year: {} ({:.1}% of steps non-decreasing)\n",
            yes_no(analysis.is_monotonic_within_year),
            pct
        )),
        None => out.push_str("- Rising within each year: fewer than two points in every year\n"),
    }

    match evidence.dec_jan_ratio {
        Some(ratio) => out.push_str(&format!("- December/January ratio: {ratio:.2}\n")),
        None => out.push_str("- December/January ratio: no year with both months\n"),
    }

    if !analysis.is_cumulative && analysis.cumulative_confidence > 0.0 {
        out.push_str("Some cumulative signals are present but not all three agree.\n");
    }

    out.trim_end().to_string()
}
