//! Analysis configuration.
//!
//! Every heuristic constant the components rely on (fallback offsets, fixed
//! multiple ladders, thresholds, keyword lists, stage benchmark multiples)
//! lives here as one immutable value injected into each computation.
//! `Default` carries the documented values; a YAML/JSON file may override any
//! subset thanks to `#[serde(default)]`.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::FundModelError;
use crate::time_value::DEFAULT_IRR_GUESS;
use crate::types::{Money, Multiple, Rate, Years};
use crate::FundModelResult;

/// Investment date assumed when a company has none: now − 730 days.
pub const UNKNOWN_INVESTMENT_DATE_OFFSET_DAYS: i64 = 730;
/// Exit date assumed when an exited company has none: now − 180 days.
pub const UNKNOWN_EXIT_DATE_OFFSET_DAYS: i64 = 180;
/// Holding period used by the simple-multiple IRR fallback.
pub const FALLBACK_IRR_YEARS: Years = dec!(3);

pub const DEFAULT_EXIT_MULTIPLIER: Multiple = dec!(5.0);
/// Target exit used when a company has no current valuation.
pub const FALLBACK_TARGET_EXIT_VALUE: Money = dec!(500_000_000);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    // -- IRR / fund metrics --
    pub irr_seed: Rate,
    pub fallback_irr_years: Years,
    pub unknown_investment_date_offset_days: i64,
    pub unknown_exit_date_offset_days: i64,

    // -- Scenario combinator --
    pub default_exit_multiplier: Multiple,
    pub fallback_target_exit_value: Money,
    /// Runway (months) below which the trajectory scenario picks "bridge".
    pub bridge_runway_months: Decimal,

    // -- Scenario tree --
    /// Trailing label tokens stripped when recovering a company name.
    pub tree_label_keywords: Vec<String>,

    // -- Follow-on --
    pub follow_on_exit_multiples: Vec<Multiple>,

    // -- Reserves --
    pub quarter_days: i64,
    pub default_months_until_round: u32,

    // -- Exit planning --
    pub secondary_discount: Rate,
    pub secondary_timeline: String,
    pub ma_arr_multiples: Vec<Multiple>,
    pub ipo_arr_threshold: Money,
    pub ipo_step_months: u32,
    pub ipo_horizon_months: u32,
    pub hold_horizon_months: u32,
    /// Hold when hold MOIC ≥ this × sell-now MOIC.
    pub hold_over_sell_ratio: Multiple,
    /// Consider a secondary when sell-now MOIC exceeds this.
    pub secondary_moic_threshold: Multiple,
    /// Benchmark exit multiple (× ARR) per stage, keyed by lower-cased stage.
    pub stage_benchmark_multiples: BTreeMap<String, Multiple>,
    pub default_stage_multiple: Multiple,
    /// Annual decay applied to the growth rate by the default ARR projector.
    pub arr_growth_decay: Rate,

    // -- Pacing --
    pub deployment_period_years: Years,
    pub target_deployment: Rate,
    pub behind_threshold: Rate,
    pub ahead_threshold: Rate,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        let stage_benchmark_multiples = [
            ("pre_seed", dec!(20)),
            ("seed", dec!(15)),
            ("series_a", dec!(12)),
            ("series_b", dec!(10)),
            ("series_c", dec!(8)),
            ("growth", dec!(6)),
            ("late", dec!(5)),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        let tree_label_keywords = [
            "bull", "base", "bear", "upside", "downside", "outperform", "underperform",
            "growth_decay", "bridge",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        AnalysisConfig {
            irr_seed: DEFAULT_IRR_GUESS,
            fallback_irr_years: FALLBACK_IRR_YEARS,
            unknown_investment_date_offset_days: UNKNOWN_INVESTMENT_DATE_OFFSET_DAYS,
            unknown_exit_date_offset_days: UNKNOWN_EXIT_DATE_OFFSET_DAYS,
            default_exit_multiplier: DEFAULT_EXIT_MULTIPLIER,
            fallback_target_exit_value: FALLBACK_TARGET_EXIT_VALUE,
            bridge_runway_months: dec!(9),
            tree_label_keywords,
            follow_on_exit_multiples: vec![dec!(3), dec!(5), dec!(8), dec!(10)],
            quarter_days: 91,
            default_months_until_round: 12,
            secondary_discount: dec!(0.20),
            secondary_timeline: "2-4 weeks".to_string(),
            ma_arr_multiples: vec![dec!(5), dec!(8), dec!(10), dec!(15)],
            ipo_arr_threshold: dec!(100_000_000),
            ipo_step_months: 6,
            ipo_horizon_months: 120,
            hold_horizon_months: 24,
            hold_over_sell_ratio: dec!(1.5),
            secondary_moic_threshold: dec!(2.0),
            stage_benchmark_multiples,
            default_stage_multiple: dec!(8),
            arr_growth_decay: dec!(0.85),
            deployment_period_years: dec!(5),
            target_deployment: dec!(0.85),
            behind_threshold: dec!(0.8),
            ahead_threshold: dec!(1.2),
        }
    }
}

impl AnalysisConfig {
    /// Benchmark multiple for a stage label ("Series A", "series-a" and
    /// "series_a" all resolve to the same entry).
    pub fn stage_multiple(&self, stage: Option<&str>) -> Option<Multiple> {
        let key = stage?.trim().to_lowercase().replace([' ', '-'], "_");
        self.stage_benchmark_multiples.get(&key).copied()
    }

    pub fn validate(&self) -> FundModelResult<()> {
        if self.default_exit_multiplier <= Decimal::ZERO {
            return Err(invalid("default_exit_multiplier", "must be positive"));
        }
        if self.fallback_irr_years <= Decimal::ZERO {
            return Err(invalid("fallback_irr_years", "must be positive"));
        }
        if self.unknown_investment_date_offset_days < 0 || self.unknown_exit_date_offset_days < 0 {
            return Err(invalid("unknown_*_date_offset_days", "offsets must be non-negative"));
        }
        if self.quarter_days <= 0 {
            return Err(invalid("quarter_days", "must be positive"));
        }
        if self.secondary_discount < Decimal::ZERO || self.secondary_discount >= Decimal::ONE {
            return Err(invalid("secondary_discount", "must be in [0, 1)"));
        }
        if self.ipo_step_months == 0 {
            return Err(invalid("ipo_step_months", "must be at least 1"));
        }
        if self.deployment_period_years <= Decimal::ZERO {
            return Err(invalid("deployment_period_years", "must be positive"));
        }
        if self.target_deployment <= Decimal::ZERO || self.target_deployment > Decimal::ONE {
            return Err(invalid("target_deployment", "must be in (0, 1]"));
        }
        if self.behind_threshold > self.ahead_threshold {
            return Err(invalid(
                "behind_threshold",
                "must not exceed ahead_threshold",
            ));
        }
        for (name, ladder) in [
            ("follow_on_exit_multiples", &self.follow_on_exit_multiples),
            ("ma_arr_multiples", &self.ma_arr_multiples),
        ] {
            if ladder.iter().any(|m| *m <= Decimal::ZERO) {
                return Err(invalid(name, "multiples must be positive"));
            }
        }
        Ok(())
    }
}

fn invalid(field: &str, reason: &str) -> FundModelError {
    FundModelError::InvalidInput {
        field: field.into(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(AnalysisConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_override_keeps_defaults() {
        let cfg: AnalysisConfig =
            serde_json::from_str(r#"{"secondary_discount": "0.25", "quarter_days": 90}"#).unwrap();
        assert_eq!(cfg.secondary_discount, dec!(0.25));
        assert_eq!(cfg.quarter_days, 90);
        assert_eq!(cfg.ipo_horizon_months, 120);
        assert_eq!(cfg.follow_on_exit_multiples.len(), 4);
    }

    #[test]
    fn test_stage_multiple_normalises_label() {
        let cfg = AnalysisConfig::default();
        assert_eq!(cfg.stage_multiple(Some("Series A")), Some(dec!(12)));
        assert_eq!(cfg.stage_multiple(Some("series-b")), Some(dec!(10)));
        assert_eq!(cfg.stage_multiple(Some("unknown")), None);
        assert_eq!(cfg.stage_multiple(None), None);
    }

    #[test]
    fn test_reject_bad_discount() {
        let cfg = AnalysisConfig {
            secondary_discount: dec!(1.0),
            ..AnalysisConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
