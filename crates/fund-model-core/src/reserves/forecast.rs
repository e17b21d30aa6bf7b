use std::time::Instant;

use chrono::{Datelike, Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::AnalysisConfig;
use crate::portfolio::FundContext;
use crate::types::*;
use crate::FundModelResult;

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReserveObligation {
    pub company_id: String,
    pub company_name: String,
    pub ownership_pct: Percent,
    pub predicted_stage: Option<String>,
    pub months_until_round: u32,
    /// "Q<n> <year>"
    pub quarter: String,
    pub expected_date: NaiveDate,
    pub predicted_raise_amount: Money,
    pub pro_rata_amount: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuarterlyReserve {
    pub quarter: String,
    pub amount: Money,
    pub num_companies: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReserveForecast {
    pub fund_id: String,
    pub fund_name: String,
    pub fund_size: Money,
    pub total_invested: Money,
    pub available_reserves: Money,
    pub total_obligations: Money,
    pub shortfall: Money,
    pub has_shortfall: bool,
    /// available_reserves / total_obligations (0 when nothing is owed)
    pub reserve_coverage_ratio: Multiple,
    pub obligations: Vec<ReserveObligation>,
    pub by_quarter: Vec<QuarterlyReserve>,
}

// ---------------------------------------------------------------------------
// Quarter arithmetic
// ---------------------------------------------------------------------------

/// "Q<n> <year>" for a calendar date.
pub fn quarter_label(date: NaiveDate) -> String {
    format!("Q{} {}", date.month0() / 3 + 1, date.year())
}

/// Date `int(months / 3)` approximate quarters after `as_of`.
pub fn quarter_date(as_of: NaiveDate, months_until_round: u32, quarter_days: i64) -> NaiveDate {
    let quarter_offset = i64::from(months_until_round / 3);
    as_of + Duration::days(quarter_offset * quarter_days)
}

// ---------------------------------------------------------------------------
// Core computation
// ---------------------------------------------------------------------------

pub fn forecast_reserves(
    ctx: &FundContext,
    config: &AnalysisConfig,
) -> FundModelResult<ComputationOutput<ReserveForecast>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let mut obligations: Vec<ReserveObligation> = Vec::new();
    for cc in &ctx.companies {
        let company = &cc.company;
        if !company.is_active() || company.investment_amount <= Decimal::ZERO {
            continue;
        }
        let analytics = cc.analytics.as_ref();
        let raise = analytics
            .and_then(|a| a.predicted_next_round_amount)
            .unwrap_or(Decimal::ZERO);
        if raise <= Decimal::ZERO {
            continue;
        }

        let months_until_round = match analytics.and_then(|a| a.predicted_next_round_months) {
            Some(m) => m,
            None => {
                push_warning(
                    &mut warnings,
                    format!(
                        "{}: round timing unknown; assuming {} months",
                        company.name, config.default_months_until_round
                    ),
                );
                config.default_months_until_round
            }
        };
        let expected_date = quarter_date(ctx.as_of, months_until_round, config.quarter_days);

        obligations.push(ReserveObligation {
            company_id: company.id.clone(),
            company_name: company.name.clone(),
            ownership_pct: company.ownership_pct,
            predicted_stage: analytics.and_then(|a| a.predicted_next_round_stage.clone()),
            months_until_round,
            quarter: quarter_label(expected_date),
            expected_date,
            predicted_raise_amount: raise,
            pro_rata_amount: company.ownership_fraction() * raise,
        });
    }

    obligations.sort_by_key(|o| o.months_until_round);

    // Sorted by months, so quarters are first seen in chronological order.
    let mut by_quarter: Vec<QuarterlyReserve> = Vec::new();
    for o in &obligations {
        match by_quarter.iter_mut().find(|q| q.quarter == o.quarter) {
            Some(q) => {
                q.amount += o.pro_rata_amount;
                q.num_companies += 1;
            }
            None => by_quarter.push(QuarterlyReserve {
                quarter: o.quarter.clone(),
                amount: o.pro_rata_amount,
                num_companies: 1,
            }),
        }
    }

    let fund_size = ctx.fund.fund_size;
    let total_invested = ctx.total_invested();
    let available_reserves = fund_size - total_invested;
    if available_reserves < Decimal::ZERO {
        push_warning(
            &mut warnings,
            format!("Fund is over-deployed by {}", -available_reserves),
        );
    }
    let total_obligations: Money = obligations.iter().map(|o| o.pro_rata_amount).sum();
    let shortfall = (total_obligations - available_reserves).max(Decimal::ZERO);

    let output = ReserveForecast {
        fund_id: ctx.fund.id.clone(),
        fund_name: ctx.fund.name.clone(),
        fund_size,
        total_invested,
        available_reserves,
        total_obligations,
        shortfall,
        has_shortfall: shortfall > Decimal::ZERO,
        reserve_coverage_ratio: ratio_or_zero(available_reserves, total_obligations),
        obligations,
        by_quarter,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Reserve forecast: pro-rata of predicted next rounds vs. uncalled fund capacity",
        &serde_json::json!({
            "as_of": ctx.as_of.to_string(),
            "quarter_days": config.quarter_days,
            "default_months_until_round": config.default_months_until_round,
        }),
        warnings,
        elapsed,
        output,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portfolio::{
        CompanyAnalytics, CompanyContext, CompanyStatus, Fund, PortfolioCompany,
    };
    use rust_decimal_macros::dec;

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    fn cc(id: &str, invested: Decimal, own: Decimal, raise: Option<Decimal>, months: Option<u32>) -> CompanyContext {
        CompanyContext {
            company: PortfolioCompany {
                id: id.into(),
                name: id.to_uppercase(),
                investment_amount: invested,
                ownership_pct: own,
                current_valuation: Some(dec!(100)),
                stage: None,
                investment_date: None,
                status: CompanyStatus::Active,
                exit_value: None,
                exit_date: None,
            },
            analytics: Some(CompanyAnalytics {
                predicted_next_round_amount: raise,
                predicted_next_round_months: months,
                predicted_next_round_stage: Some("Series B".into()),
                ..Default::default()
            }),
            cap_table: None,
        }
    }

    fn ctx(fund_size: Decimal, companies: Vec<CompanyContext>) -> FundContext {
        FundContext {
            fund: Fund {
                id: "f1".into(),
                name: "Fund I".into(),
                fund_size,
                start_date: None,
            },
            companies,
            as_of: as_of(),
        }
    }

    #[test]
    fn test_quarter_labels() {
        assert_eq!(quarter_label(as_of()), "Q1 2024");
        // 7 months → 2 quarters → 182 days
        assert_eq!(quarter_date(as_of(), 7, 91), NaiveDate::from_ymd_opt(2024, 7, 15).unwrap());
        assert_eq!(quarter_label(quarter_date(as_of(), 12, 91)), "Q1 2025");
    }

    #[test]
    fn test_obligations_sorted_and_rolled_up() {
        let forecast = forecast_reserves(
            &ctx(
                dec!(100),
                vec![
                    cc("a", dec!(20), dec!(10), Some(dec!(50)), Some(12)),
                    cc("b", dec!(20), dec!(20), Some(dec!(30)), Some(1)),
                    cc("c", dec!(20), dec!(10), Some(dec!(10)), Some(2)),
                ],
            ),
            &AnalysisConfig::default(),
        )
        .unwrap()
        .result;
        let order: Vec<&str> = forecast.obligations.iter().map(|o| o.company_id.as_str()).collect();
        assert_eq!(order, vec!["b", "c", "a"]);
        assert_eq!(forecast.by_quarter.len(), 2);
        assert_eq!(forecast.by_quarter[0].quarter, "Q1 2024");
        assert_eq!(forecast.by_quarter[0].amount, dec!(7));
        assert_eq!(forecast.by_quarter[0].num_companies, 2);
        assert_eq!(forecast.by_quarter[1].amount, dec!(5));
        assert_eq!(forecast.total_obligations, dec!(12));
        assert_eq!(forecast.available_reserves, dec!(40));
        assert!(!forecast.has_shortfall);
        assert_eq!(forecast.reserve_coverage_ratio, dec!(40) / dec!(12));
    }

    #[test]
    fn test_shortfall() {
        let forecast = forecast_reserves(
            &ctx(dec!(50), vec![cc("a", dec!(45), dec!(20), Some(dec!(40)), Some(3))]),
            &AnalysisConfig::default(),
        )
        .unwrap()
        .result;
        assert_eq!(forecast.total_obligations, dec!(8));
        assert_eq!(forecast.shortfall, dec!(3));
        assert!(forecast.has_shortfall);
    }

    #[test]
    fn test_skips_unknown_raise_and_exited() {
        let mut exited = cc("x", dec!(20), dec!(10), Some(dec!(50)), Some(3));
        exited.company.status = CompanyStatus::Exited;
        let forecast = forecast_reserves(
            &ctx(
                dec!(100),
                vec![
                    cc("a", dec!(20), dec!(10), None, Some(3)),
                    cc("b", dec!(20), dec!(10), Some(Decimal::ZERO), Some(3)),
                    cc("c", Decimal::ZERO, dec!(10), Some(dec!(50)), Some(3)),
                    exited,
                ],
            ),
            &AnalysisConfig::default(),
        )
        .unwrap()
        .result;
        assert!(forecast.obligations.is_empty());
        assert!(forecast.by_quarter.is_empty());
        assert_eq!(forecast.reserve_coverage_ratio, Decimal::ZERO);
        // exited capital still counts as deployed
        assert_eq!(forecast.available_reserves, dec!(40));
    }

    #[test]
    fn test_unknown_timing_defaults_to_a_year() {
        let out = forecast_reserves(
            &ctx(dec!(100), vec![cc("a", dec!(20), dec!(10), Some(dec!(50)), None)]),
            &AnalysisConfig::default(),
        )
        .unwrap();
        assert_eq!(out.result.obligations[0].months_until_round, 12);
        assert_eq!(out.warnings.len(), 1);
    }
}
