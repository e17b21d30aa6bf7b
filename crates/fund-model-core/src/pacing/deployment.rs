use std::time::Instant;

use chrono::{Months, NaiveDate};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::config::AnalysisConfig;
use crate::portfolio::FundContext;
use crate::time_value::year_fraction;
use crate::types::*;
use crate::FundModelResult;

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PacingStatus {
    Behind,
    #[default]
    OnTrack,
    Ahead,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartDateSource {
    #[default]
    Fund,
    EarliestInvestment,
    AsOf,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PacingAnalysis {
    pub fund_id: String,
    pub fund_name: String,
    pub fund_size: Money,
    pub start_date: Option<NaiveDate>,
    pub start_date_source: StartDateSource,
    pub years_since_start: Years,
    pub actual_invested: Money,
    /// actual / fund_size
    pub deployment_pct: Rate,
    pub ideal_pct: Rate,
    pub ideal_invested: Money,
    /// actual / ideal
    pub pacing_ratio: Multiple,
    pub status: PacingStatus,
    pub target_invested: Money,
    pub remaining_to_target: Money,
    pub monthly_pace: Money,
    pub months_to_target: Option<u32>,
    pub projected_target_date: Option<NaiveDate>,
}

/// `behind` below `behind_threshold × ideal`, `ahead` above
/// `ahead_threshold × ideal`; both edges are on track.
pub fn classify_pacing(actual: Money, ideal: Money, config: &AnalysisConfig) -> PacingStatus {
    if actual < config.behind_threshold * ideal {
        PacingStatus::Behind
    } else if actual > config.ahead_threshold * ideal {
        PacingStatus::Ahead
    } else {
        PacingStatus::OnTrack
    }
}

// ---------------------------------------------------------------------------
// Core computation
// ---------------------------------------------------------------------------

pub fn analyze_pacing(
    ctx: &FundContext,
    config: &AnalysisConfig,
) -> FundModelResult<ComputationOutput<PacingAnalysis>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();
    let fund = &ctx.fund;

    let earliest_investment = ctx
        .companies
        .iter()
        .filter_map(|c| c.company.investment_date)
        .min();
    let (start_date, start_date_source) = match (fund.start_date, earliest_investment) {
        (Some(d), _) => (d, StartDateSource::Fund),
        (None, Some(d)) => {
            push_warning(
                &mut warnings,
                format!("Fund '{}' has no start date; using earliest investment {d}", fund.id),
            );
            (d, StartDateSource::EarliestInvestment)
        }
        (None, None) => {
            push_warning(
                &mut warnings,
                format!("Fund '{}' has no start date or dated investments; pacing from today", fund.id),
            );
            (ctx.as_of, StartDateSource::AsOf)
        }
    };

    let mut years_since_start = year_fraction(start_date, ctx.as_of);
    if years_since_start < Decimal::ZERO {
        push_warning(
            &mut warnings,
            format!("Start date {start_date} is after {}; treating as zero elapsed", ctx.as_of),
        );
        years_since_start = Decimal::ZERO;
    }

    let period = config.deployment_period_years;
    let ideal_pct = years_since_start.min(period) / period;
    let ideal_invested = fund.fund_size * ideal_pct * config.target_deployment;
    let actual_invested = ctx.total_invested();
    let status = classify_pacing(actual_invested, ideal_invested, config);

    let target_invested = fund.fund_size * config.target_deployment;
    let remaining_to_target = (target_invested - actual_invested).max(Decimal::ZERO);
    let months_elapsed = years_since_start * dec!(12);
    let monthly_pace = ratio_or_zero(actual_invested, months_elapsed);

    let months_to_target = if remaining_to_target.is_zero() {
        Some(0)
    } else if monthly_pace <= Decimal::ZERO {
        push_warning(&mut warnings, "No deployment pace yet; months to target unknown");
        None
    } else {
        (remaining_to_target / monthly_pace).ceil().to_u32()
    };
    let projected_target_date =
        months_to_target.and_then(|m| ctx.as_of.checked_add_months(Months::new(m)));

    let output = PacingAnalysis {
        fund_id: fund.id.clone(),
        fund_name: fund.name.clone(),
        fund_size: fund.fund_size,
        start_date: Some(start_date),
        start_date_source,
        years_since_start,
        actual_invested,
        deployment_pct: ratio_or_zero(actual_invested, fund.fund_size),
        ideal_pct,
        ideal_invested,
        pacing_ratio: ratio_or_zero(actual_invested, ideal_invested),
        status,
        target_invested,
        remaining_to_target,
        monthly_pace,
        months_to_target,
        projected_target_date,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Deployment pacing: linear ideal schedule over the investment period",
        &serde_json::json!({
            "as_of": ctx.as_of.to_string(),
            "deployment_period_years": period.to_string(),
            "target_deployment": config.target_deployment.to_string(),
            "behind_threshold": config.behind_threshold.to_string(),
            "ahead_threshold": config.ahead_threshold.to_string(),
        }),
        warnings,
        elapsed,
        output,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portfolio::{CompanyContext, CompanyStatus, Fund, PortfolioCompany};

    fn company(invested: Decimal, date: Option<NaiveDate>) -> CompanyContext {
        CompanyContext::new(PortfolioCompany {
            id: "a".into(),
            name: "Acme".into(),
            investment_amount: invested,
            ownership_pct: dec!(10),
            current_valuation: None,
            stage: None,
            investment_date: date,
            status: CompanyStatus::Active,
            exit_value: None,
            exit_date: None,
        })
    }

    fn ctx(start: Option<NaiveDate>, companies: Vec<CompanyContext>) -> FundContext {
        FundContext {
            fund: Fund {
                id: "f1".into(),
                name: "Fund I".into(),
                fund_size: dec!(100),
                start_date: start,
            },
            companies,
            as_of: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        }
    }

    #[test]
    fn test_band_edges() {
        let config = AnalysisConfig::default();
        // ideal 85: bands at 68 and 102
        assert_eq!(classify_pacing(dec!(68), dec!(85), &config), PacingStatus::OnTrack);
        assert_eq!(classify_pacing(dec!(67.99), dec!(85), &config), PacingStatus::Behind);
        assert_eq!(classify_pacing(dec!(102), dec!(85), &config), PacingStatus::OnTrack);
        assert_eq!(classify_pacing(dec!(102.01), dec!(85), &config), PacingStatus::Ahead);
    }

    #[test]
    fn test_halfway_through_period() {
        // 2021-07-01 → 2024-01-01 is 914 days
        let start = NaiveDate::from_ymd_opt(2021, 7, 1);
        let out = analyze_pacing(&ctx(start, vec![company(dec!(20), start)]), &AnalysisConfig::default())
            .unwrap();
        let r = out.result;
        let years = dec!(914) / dec!(365);
        assert_eq!(r.years_since_start, years);
        assert_eq!(r.ideal_pct, years / dec!(5));
        assert_eq!(r.status, PacingStatus::Behind);
        assert_eq!(r.target_invested, dec!(85));
        assert_eq!(r.remaining_to_target, dec!(65));
        assert!(r.months_to_target.is_some());
        assert!(r.projected_target_date.is_some_and(|d| d > r.start_date.unwrap()));
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_past_period_ideal_is_capped() {
        let start = NaiveDate::from_ymd_opt(2015, 1, 1);
        let out = analyze_pacing(&ctx(start, vec![company(dec!(90), start)]), &AnalysisConfig::default())
            .unwrap();
        assert_eq!(out.result.ideal_pct, Decimal::ONE);
        assert_eq!(out.result.ideal_invested, dec!(85));
        assert_eq!(out.result.status, PacingStatus::OnTrack);
        assert_eq!(out.result.months_to_target, Some(0));
        assert_eq!(out.result.projected_target_date, NaiveDate::from_ymd_opt(2024, 1, 1));
    }

    #[test]
    fn test_start_date_fallbacks() {
        let first = NaiveDate::from_ymd_opt(2022, 1, 1);
        let out = analyze_pacing(&ctx(None, vec![company(dec!(10), first)]), &AnalysisConfig::default())
            .unwrap();
        assert_eq!(out.result.start_date_source, StartDateSource::EarliestInvestment);
        assert_eq!(out.result.start_date, first);

        let out = analyze_pacing(&ctx(None, vec![company(dec!(10), None)]), &AnalysisConfig::default())
            .unwrap();
        assert_eq!(out.result.start_date_source, StartDateSource::AsOf);
        assert_eq!(out.result.years_since_start, Decimal::ZERO);
        assert_eq!(out.result.monthly_pace, Decimal::ZERO);
        assert_eq!(out.result.months_to_target, None);
        assert_eq!(out.warnings.len(), 2);
    }
}
