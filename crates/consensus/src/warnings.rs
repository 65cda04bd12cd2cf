//! Per-record quality warnings for a selected group.

use crate::tally::GroupTally;
use econ_core::{AutoTargetSelection, Dimension, QualityWarning, QualityWarningKind, Record};

/// Warnings for the records of one group.
///
/// `tally` must have been built from `records`, in the same order.
pub fn quality_warnings(
    group_key: &str,
    records: &[&Record],
    tally: &GroupTally,
    selection: &AutoTargetSelection,
) -> Vec<QualityWarning> {
    let mut warnings = Vec::new();

    for (record, tokens) in records.iter().zip(&tally.tokens) {
        let mut push = |kind: QualityWarningKind| {
            warnings.push(QualityWarning {
                record_id: record.id.clone(),
                group_key: group_key.to_string(),
                kind,
            })
        };

        for candidate in &tokens.rejected_currencies {
            push(QualityWarningKind::InvalidCurrency {
                candidate: candidate.clone(),
            });
        }

        let observed = [
            (Dimension::Currency, tokens.currency.as_deref()),
            (Dimension::Magnitude, Some(tokens.magnitude.as_str())),
            (Dimension::Time, tokens.time.as_deref()),
        ];
        for (dimension, token) in observed {
            let (Some(token), Some(selected)) = (token, selection.get(dimension)) else {
                continue;
            };
            if token != selected {
                push(QualityWarningKind::TargetMismatch {
                    dimension,
                    observed: token.to_string(),
                    selected: selected.to_string(),
                });
            }
        }
    }

    warnings
}
