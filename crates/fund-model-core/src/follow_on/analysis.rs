//! Follow-on decision support for a single company.
//!
//! Pairs the pro-rata outcome of the predicted next round with an exit
//! sensitivity table, keeping the round prediction and the company's
//! trajectory signals as separate sections of the output.

use std::time::Instant;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::pro_rata::{ProRataCalculator, ProRataOutcome};
use crate::config::AnalysisConfig;
use crate::error::FundModelError;
use crate::portfolio::{FundContext, ValuationDirection};
use crate::types::*;
use crate::FundModelResult;

const METHODOLOGY: &str = "Follow-on analysis: pro-rata dilution and exit-multiple sensitivity";

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PredictedNextRound {
    pub stage: Option<String>,
    pub months_away: Option<u32>,
    pub amount: Option<Money>,
    pub pre_money_valuation: Option<Money>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Trajectory {
    pub growth_rate: Option<Rate>,
    pub growth_trend: Option<String>,
    pub runway_months: Option<Decimal>,
    pub valuation_direction: ValuationDirection,
    pub signals: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExitSensitivityRow {
    pub exit_multiple: Multiple,
    pub exit_value: Money,
    pub proceeds_with: Money,
    pub proceeds_without: Money,
    pub incremental_proceeds: Money,
    /// proceeds_with / (invested + pro_rata_cost)
    pub moic_with: Multiple,
    /// proceeds_without / invested
    pub moic_without: Multiple,
    pub fund_dpi_contribution_with: Multiple,
    pub fund_dpi_contribution_without: Multiple,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FollowOnAnalysis {
    pub company_id: String,
    pub company_name: String,
    pub fund_size: Money,
    pub invested: Money,
    pub ownership_pct: Percent,
    pub predicted_next_round: PredictedNextRound,
    pub trajectory: Trajectory,
    pub pro_rata: ProRataOutcome,
    /// ownership_with − ownership_without, in percentage points.
    pub ownership_protected: Percent,
    /// Valuation the exit multiples are applied to.
    pub sensitivity_base_valuation: Money,
    pub exit_sensitivity: Vec<ExitSensitivityRow>,
    /// Multiple of the base valuation at which incremental proceeds repay
    /// the pro-rata cost.
    pub breakeven_exit_multiple: Option<Multiple>,
}

// ---------------------------------------------------------------------------
// Core computation
// ---------------------------------------------------------------------------

pub fn analyze_follow_on(
    ctx: &FundContext,
    company_id: &str,
    calculator: &dyn ProRataCalculator,
    config: &AnalysisConfig,
) -> FundModelResult<ComputationOutput<FollowOnAnalysis>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if company_id.trim().is_empty() {
        return Err(FundModelError::InvalidInput {
            field: "company_id".into(),
            reason: "Company id must not be empty".into(),
        });
    }

    let Some(cc) = ctx.find_company(company_id) else {
        return Ok(error_record(
            METHODOLOGY,
            FundModelError::not_found("Company", company_id).to_string(),
        ));
    };
    let company = &cc.company;
    let analytics = cc.analytics.clone().unwrap_or_else(|| {
        push_warning(
            &mut warnings,
            format!("{}: no analytics; round prediction unavailable", company.name),
        );
        Default::default()
    });

    if company.is_exited() {
        push_warning(
            &mut warnings,
            format!("{}: company has exited; follow-on shown for reference only", company.name),
        );
    }

    let round_amount = analytics.predicted_next_round_amount.unwrap_or_else(|| {
        push_warning(
            &mut warnings,
            format!("{}: no predicted round size; pro-rata cost is zero", company.name),
        );
        Decimal::ZERO
    });

    let pre_money = match (
        analytics.predicted_next_round_valuation,
        analytics.implied_current_valuation,
        company.current_valuation,
    ) {
        (Some(v), _, _) => v,
        (None, Some(v), _) => {
            push_warning(
                &mut warnings,
                format!("{}: no predicted pre-money; using implied current valuation", company.name),
            );
            v
        }
        (None, None, Some(v)) => {
            push_warning(
                &mut warnings,
                format!("{}: no predicted pre-money; using current valuation", company.name),
            );
            v
        }
        (None, None, None) => {
            push_warning(
                &mut warnings,
                format!("{}: no valuation of any kind; dilution not modeled", company.name),
            );
            Decimal::ZERO
        }
    };

    let pro_rata = calculator.calculate(company.ownership_pct, round_amount, pre_money);

    let base_valuation = match analytics.implied_current_valuation {
        Some(v) => v,
        None => {
            if company.current_valuation.is_some() {
                push_warning(
                    &mut warnings,
                    format!("{}: no implied valuation; sensitivity uses current valuation", company.name),
                );
            }
            company.valuation()
        }
    };

    let invested = company.investment_amount;
    let fund_size = ctx.fund.fund_size;
    let exit_sensitivity: Vec<ExitSensitivityRow> = config
        .follow_on_exit_multiples
        .iter()
        .map(|&multiple| {
            let exit_value = base_valuation * multiple;
            let proceeds_with =
                exit_value * pro_rata.ownership_with_follow_on / Decimal::ONE_HUNDRED;
            let proceeds_without =
                exit_value * pro_rata.ownership_without_follow_on / Decimal::ONE_HUNDRED;
            ExitSensitivityRow {
                exit_multiple: multiple,
                exit_value,
                proceeds_with,
                proceeds_without,
                incremental_proceeds: proceeds_with - proceeds_without,
                moic_with: ratio_or_zero(proceeds_with, invested + pro_rata.pro_rata_cost),
                moic_without: ratio_or_zero(proceeds_without, invested),
                fund_dpi_contribution_with: ratio_or_zero(proceeds_with, fund_size),
                fund_dpi_contribution_without: ratio_or_zero(proceeds_without, fund_size),
            }
        })
        .collect();

    let ownership_protected =
        pro_rata.ownership_with_follow_on - pro_rata.ownership_without_follow_on;
    let breakeven_exit_multiple = if ownership_protected > Decimal::ZERO
        && base_valuation > Decimal::ZERO
    {
        Some(pro_rata.pro_rata_cost * Decimal::ONE_HUNDRED / (base_valuation * ownership_protected))
    } else {
        None
    };

    let output = FollowOnAnalysis {
        company_id: company.id.clone(),
        company_name: company.name.clone(),
        fund_size,
        invested,
        ownership_pct: company.ownership_pct,
        predicted_next_round: PredictedNextRound {
            stage: analytics.predicted_next_round_stage.clone(),
            months_away: analytics.predicted_next_round_months,
            amount: analytics.predicted_next_round_amount,
            pre_money_valuation: analytics.predicted_next_round_valuation,
        },
        trajectory: Trajectory {
            growth_rate: analytics.growth_rate,
            growth_trend: analytics.growth_trend.clone(),
            runway_months: analytics.estimated_runway_months,
            valuation_direction: analytics.valuation_direction,
            signals: analytics.signals.clone(),
        },
        pro_rata,
        ownership_protected,
        sensitivity_base_valuation: base_valuation,
        exit_sensitivity,
        breakeven_exit_multiple,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        METHODOLOGY,
        &serde_json::json!({
            "round_amount": round_amount.to_string(),
            "pre_money": pre_money.to_string(),
            "exit_multiples": config
                .follow_on_exit_multiples
                .iter()
                .map(|m| m.to_string())
                .collect::<Vec<_>>(),
        }),
        warnings,
        elapsed,
        output,
    ))
}
