//! Per-company exit routes: discounted secondary, M&A at ARR multiples, IPO
//! timing against an ARR threshold, and a hold-versus-sell recommendation.
//!
//! Plans are ordered by two-year hold MOIC, highest first.

use std::time::Instant;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::projector::ArrProjector;
use crate::config::AnalysisConfig;
use crate::portfolio::FundContext;
use crate::types::*;
use crate::FundModelResult;

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecondaryExit {
    pub discount: Rate,
    pub value: Money,
    pub proceeds: Money,
    pub moic: Multiple,
    pub timeline: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaExit {
    pub arr_multiple: Multiple,
    pub exit_value: Money,
    pub proceeds: Money,
    pub moic: Multiple,
    pub fund_dpi_impact: Multiple,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpoTiming {
    pub current_arr: Option<Money>,
    pub arr_threshold: Money,
    /// None when the threshold is not reached within the horizon.
    pub months_to_ipo: Option<u32>,
    pub projected_arr_at_ipo: Option<Money>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitRecommendation {
    Hold,
    ConsiderSecondary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MultipleSource {
    Analytics,
    StageTable,
    Default,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoldVsSell {
    pub projected_arr_24mo: Money,
    pub benchmark_multiple: Multiple,
    pub multiple_source: MultipleSource,
    pub hold_2yr_moic: Multiple,
    pub sell_now_moic: Multiple,
    pub recommendation: ExitRecommendation,
    pub rationale: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExitPlan {
    pub company_id: String,
    pub company_name: String,
    pub stage: Option<String>,
    pub invested: Money,
    pub ownership_pct: Percent,
    pub current_valuation: Money,
    pub secondary: SecondaryExit,
    pub ma_ladder: Vec<MaExit>,
    pub ipo: IpoTiming,
    pub hold_vs_sell: HoldVsSell,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExitPlanSummary {
    pub num_companies: u32,
    pub hold_count: u32,
    pub consider_secondary_count: u32,
    pub ipo_candidates: u32,
    /// Proceeds if every company were sold on the secondary market today.
    pub total_secondary_proceeds: Money,
    pub total_secondary_dpi: Multiple,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExitPlanOutput {
    pub fund_id: String,
    pub fund_name: String,
    pub fund_size: Money,
    pub plans: Vec<ExitPlan>,
    pub summary: ExitPlanSummary,
}

// ---------------------------------------------------------------------------
// Recommendation rule
// ---------------------------------------------------------------------------

pub fn recommend(
    hold_2yr_moic: Multiple,
    sell_now_moic: Multiple,
    config: &AnalysisConfig,
) -> (ExitRecommendation, String) {
    if hold_2yr_moic >= config.hold_over_sell_ratio * sell_now_moic {
        (
            ExitRecommendation::Hold,
            format!(
                "Hold MOIC {:.2}x is at least {}x the sell-now MOIC {:.2}x",
                hold_2yr_moic, config.hold_over_sell_ratio, sell_now_moic
            ),
        )
    } else if sell_now_moic > config.secondary_moic_threshold {
        (
            ExitRecommendation::ConsiderSecondary,
            format!(
                "Secondary already returns {:.2}x, above {}x, and holding adds too little",
                sell_now_moic, config.secondary_moic_threshold
            ),
        )
    } else {
        (
            ExitRecommendation::Hold,
            format!("Secondary at {:.2}x does not justify selling", sell_now_moic),
        )
    }
}

// ---------------------------------------------------------------------------
// Core computation
// ---------------------------------------------------------------------------

pub fn plan_exits(
    ctx: &FundContext,
    projector: &dyn ArrProjector,
    config: &AnalysisConfig,
) -> FundModelResult<ComputationOutput<ExitPlanOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();
    let fund_size = ctx.fund.fund_size;

    let mut plans: Vec<ExitPlan> = Vec::new();
    for cc in ctx.companies.iter().filter(|c| c.company.is_active()) {
        let company = &cc.company;
        let analytics = cc.analytics.clone().unwrap_or_default();
        let invested = company.investment_amount;
        let own = company.ownership_fraction();

        if invested <= Decimal::ZERO {
            push_warning(
                &mut warnings,
                format!("{}: no invested capital; MOICs reported as zero", company.name),
            );
        }

        // Secondary
        let valuation = match (company.current_valuation, analytics.implied_current_valuation) {
            (Some(v), _) => v,
            (None, Some(v)) => {
                push_warning(
                    &mut warnings,
                    format!("{}: no current valuation; secondary uses implied valuation", company.name),
                );
                v
            }
            (None, None) => {
                push_warning(
                    &mut warnings,
                    format!("{}: no valuation; secondary value is zero", company.name),
                );
                Decimal::ZERO
            }
        };
        let secondary_value = valuation * (Decimal::ONE - config.secondary_discount);
        let secondary_proceeds = secondary_value * own;
        let secondary = SecondaryExit {
            discount: config.secondary_discount,
            value: secondary_value,
            proceeds: secondary_proceeds,
            moic: ratio_or_zero(secondary_proceeds, invested),
            timeline: config.secondary_timeline.clone(),
        };

        // M&A ladder
        let ma_ladder: Vec<MaExit> = match analytics.current_arr {
            Some(arr) => config
                .ma_arr_multiples
                .iter()
                .map(|&m| {
                    let exit_value = arr * m;
                    let proceeds = exit_value * own;
                    MaExit {
                        arr_multiple: m,
                        exit_value,
                        proceeds,
                        moic: ratio_or_zero(proceeds, invested),
                        fund_dpi_impact: ratio_or_zero(proceeds, fund_size),
                    }
                })
                .collect(),
            None => {
                push_warning(
                    &mut warnings,
                    format!("{}: ARR unknown; M&A ladder and IPO timing skipped", company.name),
                );
                Vec::new()
            }
        };

        let growth = analytics.growth_rate.unwrap_or_else(|| {
            if analytics.current_arr.is_some() {
                push_warning(
                    &mut warnings,
                    format!("{}: growth rate unknown; ARR held flat", company.name),
                );
            }
            Decimal::ZERO
        });

        // IPO timing
        let mut months_to_ipo = None;
        let mut projected_arr_at_ipo = None;
        if let Some(arr) = analytics.current_arr {
            if arr >= config.ipo_arr_threshold {
                months_to_ipo = Some(0);
                projected_arr_at_ipo = Some(arr);
            } else {
                let mut month = config.ipo_step_months;
                while month <= config.ipo_horizon_months {
                    let projected = projector.project_arr(arr, growth, month);
                    if projected >= config.ipo_arr_threshold {
                        months_to_ipo = Some(month);
                        projected_arr_at_ipo = Some(projected);
                        break;
                    }
                    month += config.ipo_step_months;
                }
            }
        }
        let ipo = IpoTiming {
            current_arr: analytics.current_arr,
            arr_threshold: config.ipo_arr_threshold,
            months_to_ipo,
            projected_arr_at_ipo,
        };

        // Hold vs sell
        let projected_arr_24mo = match (analytics.projected_arr_24mo, analytics.current_arr) {
            (Some(p), _) => p,
            (None, Some(arr)) => projector.project_arr(arr, growth, config.hold_horizon_months),
            (None, None) => Decimal::ZERO,
        };
        let (benchmark_multiple, multiple_source) = match analytics.stage_benchmark_multiple {
            Some(m) => (m, MultipleSource::Analytics),
            None => match config.stage_multiple(company.stage.as_deref()) {
                Some(m) => (m, MultipleSource::StageTable),
                None => {
                    push_warning(
                        &mut warnings,
                        format!(
                            "{}: no benchmark multiple for stage {:?}; using {}x",
                            company.name, company.stage, config.default_stage_multiple
                        ),
                    );
                    (config.default_stage_multiple, MultipleSource::Default)
                }
            },
        };
        let hold_2yr_moic = ratio_or_zero(projected_arr_24mo * benchmark_multiple * own, invested);
        let sell_now_moic = secondary.moic;
        let (recommendation, rationale) = recommend(hold_2yr_moic, sell_now_moic, config);

        plans.push(ExitPlan {
            company_id: company.id.clone(),
            company_name: company.name.clone(),
            stage: company.stage.clone(),
            invested,
            ownership_pct: company.ownership_pct,
            current_valuation: valuation,
            secondary,
            ma_ladder,
            ipo,
            hold_vs_sell: HoldVsSell {
                projected_arr_24mo,
                benchmark_multiple,
                multiple_source,
                hold_2yr_moic,
                sell_now_moic,
                recommendation,
                rationale,
            },
        });
    }

    plans.sort_by(|a, b| b.hold_vs_sell.hold_2yr_moic.cmp(&a.hold_vs_sell.hold_2yr_moic));

    let summary = summarize(&plans, fund_size);
    let output = ExitPlanOutput {
        fund_id: ctx.fund.id.clone(),
        fund_name: ctx.fund.name.clone(),
        fund_size,
        plans,
        summary,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Exit planning: secondary, M&A ARR ladder, IPO timing, hold vs. sell",
        &serde_json::json!({
            "secondary_discount": config.secondary_discount.to_string(),
            "ipo_arr_threshold": config.ipo_arr_threshold.to_string(),
            "hold_horizon_months": config.hold_horizon_months,
            "hold_over_sell_ratio": config.hold_over_sell_ratio.to_string(),
            "secondary_moic_threshold": config.secondary_moic_threshold.to_string(),
        }),
        warnings,
        elapsed,
        output,
    ))
}

fn summarize(plans: &[ExitPlan], fund_size: Money) -> ExitPlanSummary {
    let total_secondary_proceeds: Money = plans.iter().map(|p| p.secondary.proceeds).sum();
    ExitPlanSummary {
        num_companies: plans.len() as u32,
        hold_count: plans
            .iter()
            .filter(|p| p.hold_vs_sell.recommendation == ExitRecommendation::Hold)
            .count() as u32,
        consider_secondary_count: plans
            .iter()
            .filter(|p| p.hold_vs_sell.recommendation == ExitRecommendation::ConsiderSecondary)
            .count() as u32,
        ipo_candidates: plans.iter().filter(|p| p.ipo.months_to_ipo.is_some()).count() as u32,
        total_secondary_proceeds,
        total_secondary_dpi: ratio_or_zero(total_secondary_proceeds, fund_size),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exits::DecayingGrowthProjector;
    use crate::portfolio::{
        CompanyAnalytics, CompanyContext, CompanyStatus, Fund, PortfolioCompany,
    };
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn cc(id: &str, stage: Option<&str>, analytics: Option<CompanyAnalytics>) -> CompanyContext {
        CompanyContext {
            company: PortfolioCompany {
                id: id.into(),
                name: id.to_uppercase(),
                investment_amount: dec!(10),
                ownership_pct: dec!(10),
                current_valuation: Some(dec!(200)),
                stage: stage.map(String::from),
                investment_date: None,
                status: CompanyStatus::Active,
                exit_value: None,
                exit_date: None,
            },
            analytics,
            cap_table: None,
        }
    }

    fn ctx(companies: Vec<CompanyContext>) -> FundContext {
        FundContext {
            fund: Fund {
                id: "f1".into(),
                name: "Fund I".into(),
                fund_size: dec!(1000),
                start_date: None,
            },
            companies,
            as_of: NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
        }
    }

    #[test]
    fn test_secondary_and_ladder() {
        let a = CompanyAnalytics {
            current_arr: Some(dec!(10)),
            growth_rate: Some(Decimal::ZERO),
            ..Default::default()
        };
        let out = plan_exits(
            &ctx(vec![cc("a", Some("Series A"), Some(a))]),
            &DecayingGrowthProjector::default(),
            &AnalysisConfig::default(),
        )
        .unwrap();
        let plan = &out.result.plans[0];
        assert_eq!(plan.secondary.value, dec!(160));
        assert_eq!(plan.secondary.proceeds, dec!(16));
        assert_eq!(plan.secondary.moic, dec!(1.6));
        assert_eq!(plan.secondary.timeline, "2-4 weeks");
        let ladder: Vec<Decimal> = plan.ma_ladder.iter().map(|m| m.exit_value).collect();
        assert_eq!(ladder, vec![dec!(50), dec!(80), dec!(100), dec!(150)]);
        assert_eq!(plan.ma_ladder[3].proceeds, dec!(15));
        assert_eq!(plan.ma_ladder[3].fund_dpi_impact, dec!(0.015));
        // flat ARR never reaches the IPO bar
        assert_eq!(plan.ipo.months_to_ipo, None);
        // 10 × 12 (series_a) × 10% / 10
        assert_eq!(plan.hold_vs_sell.multiple_source, MultipleSource::StageTable);
        assert_eq!(plan.hold_vs_sell.hold_2yr_moic, dec!(1.2));
    }

    #[test]
    fn test_ipo_timing() {
        let above = CompanyAnalytics {
            current_arr: Some(dec!(150_000_000)),
            ..Default::default()
        };
        let doubling = CompanyAnalytics {
            current_arr: Some(dec!(30_000_000)),
            growth_rate: Some(dec!(1)),
            ..Default::default()
        };
        let out = plan_exits(
            &ctx(vec![cc("a", None, Some(above)), cc("b", None, Some(doubling))]),
            &DecayingGrowthProjector::new(Decimal::ONE),
            &AnalysisConfig::default(),
        )
        .unwrap();
        let a = out.result.plans.iter().find(|p| p.company_id == "a").unwrap();
        let b = out.result.plans.iter().find(|p| p.company_id == "b").unwrap();
        assert_eq!(a.ipo.months_to_ipo, Some(0));
        // 30 → 60 → 120 at 24 months; 18 months is 30 × 2^1.5 ≈ 84.9
        assert_eq!(b.ipo.months_to_ipo, Some(24));
        assert_eq!(out.result.summary.ipo_candidates, 2);
    }

    #[test]
    fn test_recommendation_rule() {
        let config = AnalysisConfig::default();
        assert_eq!(recommend(dec!(3), dec!(2), &config).0, ExitRecommendation::Hold);
        assert_eq!(recommend(dec!(3.5), dec!(2.5), &config).0, ExitRecommendation::ConsiderSecondary);
        assert_eq!(recommend(dec!(1), dec!(1.5), &config).0, ExitRecommendation::Hold);
        assert_eq!(recommend(dec!(1), dec!(2), &config).0, ExitRecommendation::Hold);
    }

    #[test]
    fn test_sorted_by_hold_moic() {
        let with = |arr24: Decimal| CompanyAnalytics {
            projected_arr_24mo: Some(arr24),
            stage_benchmark_multiple: Some(dec!(10)),
            ..Default::default()
        };
        let out = plan_exits(
            &ctx(vec![
                cc("a", None, Some(with(dec!(12)))),
                cc("b", None, Some(with(dec!(35)))),
                cc("c", None, Some(with(dec!(8)))),
            ]),
            &DecayingGrowthProjector::default(),
            &AnalysisConfig::default(),
        )
        .unwrap();
        let moics: Vec<Decimal> = out
            .result
            .plans
            .iter()
            .map(|p| p.hold_vs_sell.hold_2yr_moic)
            .collect();
        assert_eq!(moics, vec![dec!(3.5), dec!(1.2), dec!(0.8)]);
    }

    #[test]
    fn test_missing_arr_and_unknown_stage() {
        let out = plan_exits(
            &ctx(vec![cc("a", Some("Stealth"), None)]),
            &DecayingGrowthProjector::default(),
            &AnalysisConfig::default(),
        )
        .unwrap();
        let plan = &out.result.plans[0];
        assert!(plan.ma_ladder.is_empty());
        assert_eq!(plan.ipo.months_to_ipo, None);
        assert_eq!(plan.hold_vs_sell.hold_2yr_moic, Decimal::ZERO);
        assert_eq!(plan.hold_vs_sell.multiple_source, MultipleSource::Default);
        assert_eq!(out.warnings.len(), 2);
    }
}
