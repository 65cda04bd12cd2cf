//! Configuration structures for the econ-normalize system.

use crate::error::{Error, Result};
use crate::types::is_iso_currency_code;
use serde::{Deserialize, Serialize};

/// Largest usable magnitude gap. Finite non-zero `f64` values span
/// magnitudes -324 through 308.
pub const MAX_MAGNITUDE_DIFFERENCE: u32 = 632;

/// Main configuration for the normalization core.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Consensus selection configuration.
    pub consensus: ConsensusConfig,
    /// Grouping / filtering configuration.
    pub grouping: GroupingConfig,
    /// Scale outlier configuration.
    pub outliers: OutlierConfig,
}

impl Config {
    /// Parse a (possibly partial) JSON configuration and validate it.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that thresholds are usable.
    pub fn validate(&self) -> Result<()> {
        let share = self.consensus.min_majority_share;
        if !(share > 0.0 && share <= 1.0) {
            return Err(Error::config(format!(
                "minMajorityShare must be in (0, 1], got {share}"
            )));
        }

        if let Some(target) = &self.consensus.target_currency {
            if !is_iso_currency_code(target) {
                return Err(Error::config(format!(
                    "targetCurrency must be a three-letter ISO code, got {target:?}"
                )));
            }
        }

        let cluster = self.outliers.cluster_threshold;
        if !(cluster > 0.0 && cluster <= 1.0) {
            return Err(Error::config(format!(
                "clusterThreshold must be in (0, 1], got {cluster}"
            )));
        }

        let difference = self.outliers.magnitude_difference_threshold;
        if !(1..=MAX_MAGNITUDE_DIFFERENCE).contains(&difference) {
            return Err(Error::config(format!(
                "magnitudeDifferenceThreshold must be in [1, {MAX_MAGNITUDE_DIFFERENCE}], got {difference}"
            )));
        }

        Ok(())
    }
}

/// Denominator used when turning token counts into shares.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShareBasis {
    /// Every record in the group, including those without a token.
    #[default]
    GroupSize,
    /// Only records that carried a token for the dimension.
    ObservedTokens,
}

/// Currency fallback when no token reaches the majority share.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CurrencyTieBreak {
    #[default]
    #[serde(rename = "prefer-targetCurrency")]
    PreferTargetCurrency,
    #[serde(rename = "prefer-USD")]
    PreferUsd,
    #[serde(rename = "none")]
    None,
}

impl CurrencyTieBreak {
    pub fn as_str(self) -> &'static str {
        match self {
            CurrencyTieBreak::PreferTargetCurrency => "prefer-targetCurrency",
            CurrencyTieBreak::PreferUsd => "prefer-USD",
            CurrencyTieBreak::None => "none",
        }
    }
}

/// Magnitude fallback when no token reaches the majority share.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MagnitudeTieBreak {
    #[default]
    #[serde(rename = "prefer-millions")]
    PreferMillions,
    #[serde(rename = "none")]
    None,
}

impl MagnitudeTieBreak {
    pub fn as_str(self) -> &'static str {
        match self {
            MagnitudeTieBreak::PreferMillions => "prefer-millions",
            MagnitudeTieBreak::None => "none",
        }
    }
}

/// Time-scale fallback when no token reaches the majority share.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeTieBreak {
    #[default]
    #[serde(rename = "prefer-month")]
    PreferMonth,
    #[serde(rename = "none")]
    None,
}

impl TimeTieBreak {
    pub fn as_str(self) -> &'static str {
        match self {
            TimeTieBreak::PreferMonth => "prefer-month",
            TimeTieBreak::None => "none",
        }
    }
}

/// Tie-break policy per dimension.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TieBreakers {
    pub currency: CurrencyTieBreak,
    pub magnitude: MagnitudeTieBreak,
    pub time: TimeTieBreak,
}

impl TieBreakers {
    /// Disable every tie-break rule.
    pub fn none() -> Self {
        Self {
            currency: CurrencyTieBreak::None,
            magnitude: MagnitudeTieBreak::None,
            time: TimeTieBreak::None,
        }
    }
}

/// Consensus selection configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConsensusConfig {
    /// Share a token needs to win outright (e.g., 0.5 for 50%).
    pub min_majority_share: f64,
    /// Currency chosen by `prefer-targetCurrency`.
    pub target_currency: Option<String>,
    /// Fallback policies.
    pub tie_breakers: TieBreakers,
    /// Share denominator.
    pub share_basis: ShareBasis,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            min_majority_share: 0.5,
            target_currency: None,
            tie_breakers: TieBreakers::default(),
            share_basis: ShareBasis::GroupSize,
        }
    }
}

/// Record filtering applied before grouping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GroupingConfig {
    /// If non-empty, only these indicator keys are grouped.
    pub allow_list: Vec<String>,
    /// Indicator keys that are never grouped.
    pub deny_list: Vec<String>,
}

/// Scale outlier detection configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OutlierConfig {
    /// Fraction of the group a magnitude bucket needs to be dominant.
    pub cluster_threshold: f64,
    /// Orders of magnitude from the dominant bucket that make an outlier.
    pub magnitude_difference_threshold: u32,
    /// Move flagged records to a side list instead of only annotating.
    pub filter: bool,
}

impl Default for OutlierConfig {
    fn default() -> Self {
        Self {
            cluster_threshold: 0.6,
            magnitude_difference_threshold: 2,
            filter: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.consensus.min_majority_share, 0.5);
        assert_eq!(config.outliers.cluster_threshold, 0.6);
        assert_eq!(config.outliers.magnitude_difference_threshold, 2);
        assert_eq!(config.consensus.share_basis, ShareBasis::GroupSize);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_config() {
        let json = r#"{
            "consensus": {
                "minMajorityShare": 0.6,
                "targetCurrency": "EUR",
                "shareBasis": "observed-tokens",
                "tieBreakers": { "currency": "prefer-targetCurrency", "time": "none" }
            }
        }"#;

        let config = Config::from_json_str(json).unwrap();
        assert_eq!(config.consensus.min_majority_share, 0.6);
        assert_eq!(config.consensus.target_currency.as_deref(), Some("EUR"));
        assert_eq!(config.consensus.tie_breakers.time, TimeTieBreak::None);
        assert_eq!(config.consensus.tie_breakers.magnitude, MagnitudeTieBreak::PreferMillions);
        assert_eq!(config.consensus.share_basis, ShareBasis::ObservedTokens);
        assert_eq!(config.outliers, OutlierConfig::default());
    }

    #[test]
    fn test_config_json_uses_camel_case() {
        let json = r#"{
            "grouping": { "denyList": ["cpi"] },
            "outliers": { "clusterThreshold": 0.7, "magnitudeDifferenceThreshold": 3, "filter": true }
        }"#;
        let config = Config::from_json_str(json).unwrap();
        assert_eq!(config.grouping.deny_list, vec!["cpi"]);
        assert_eq!(config.outliers.cluster_threshold, 0.7);
        assert_eq!(config.outliers.magnitude_difference_threshold, 3);
        assert!(config.outliers.filter);

        let out = serde_json::to_value(&config).unwrap();
        assert_eq!(out["consensus"]["minMajorityShare"], 0.5);
        assert!(out["consensus"].get("min_majority_share").is_none());
    }

    #[test]
    fn test_invalid_thresholds() {
        let mut config = Config::default();
        config.consensus.min_majority_share = 0.0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let mut config = Config::default();
        config.outliers.cluster_threshold = 1.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.outliers.magnitude_difference_threshold = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.outliers.magnitude_difference_threshold = u32::MAX;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
        config.outliers.magnitude_difference_threshold = MAX_MAGNITUDE_DIFFERENCE;
        assert!(config.validate().is_ok());

        let mut config = Config::default();
        config.consensus.target_currency = Some("euro".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_tie_break_names() {
        assert_eq!(CurrencyTieBreak::PreferUsd.as_str(), "prefer-USD");
        let parsed: CurrencyTieBreak = serde_json::from_str("\"prefer-USD\"").unwrap();
        assert_eq!(parsed, CurrencyTieBreak::PreferUsd);
        assert_eq!(TieBreakers::none().magnitude, MagnitudeTieBreak::None);
    }
}
