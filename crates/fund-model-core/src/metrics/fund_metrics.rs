//! Fund-level NAV, DPI, TVPI, RVPI, IRR and deployment rate.
//!
//! NAV is the ownership share of each active company's current valuation;
//! distributions are the ownership share of each exited company's exit value.
//! IRR is solved on dated flows (one call per investment, one distribution per
//! exit, terminal NAV today) and falls back to the simple multiple when the
//! solver cannot answer.

use std::time::Instant;

use chrono::Duration;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::AnalysisConfig;
use crate::portfolio::{CompanyStatus, FundContext};
use crate::time_value::{irr_with_fallback, IrrMethod};
use crate::types::*;
use crate::FundModelResult;

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Per-company contribution to the fund metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyMetrics {
    pub company_id: String,
    pub company_name: String,
    pub status: CompanyStatus,
    pub invested: Money,
    pub nav_contribution: Money,
    pub distributed: Money,
    /// (nav_contribution + distributed) / invested
    pub moic: Multiple,
    /// Share of fund NAV on a 0-100 scale.
    pub pct_of_nav: Percent,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FundMetrics {
    pub fund_id: String,
    pub fund_name: String,
    pub fund_size: Money,
    pub total_invested: Money,
    pub total_nav: Money,
    pub total_distributed: Money,
    pub dpi: Multiple,
    pub tvpi: Multiple,
    pub rvpi: Multiple,
    pub irr: Rate,
    pub irr_method: IrrMethod,
    pub deployment_rate: Rate,
    pub num_companies: u32,
    pub active_companies: u32,
    pub exited_companies: u32,
    pub company_metrics: Vec<CompanyMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

// ---------------------------------------------------------------------------
// Core computation
// ---------------------------------------------------------------------------

pub fn calculate_fund_metrics(
    ctx: &FundContext,
    config: &AnalysisConfig,
) -> FundModelResult<ComputationOutput<FundMetrics>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();
    let fund = &ctx.fund;

    if ctx.companies.is_empty() {
        let warning = format!("Fund '{}' has no portfolio companies", fund.id);
        push_warning(&mut warnings, warning.clone());
        let metrics = FundMetrics {
            fund_id: fund.id.clone(),
            fund_name: fund.name.clone(),
            fund_size: fund.fund_size,
            warning: Some(warning),
            ..Default::default()
        };
        return Ok(wrap(ctx, config, warnings, start, metrics));
    }

    let mut total_invested = Decimal::ZERO;
    let mut total_nav = Decimal::ZERO;
    let mut total_distributed = Decimal::ZERO;
    let mut active_companies = 0u32;
    let mut exited_companies = 0u32;
    let mut flows: Vec<CashFlow> = Vec::with_capacity(ctx.companies.len() + 1);
    let mut rows: Vec<CompanyMetrics> = Vec::with_capacity(ctx.companies.len());

    let fallback_investment_date =
        ctx.as_of - Duration::days(config.unknown_investment_date_offset_days);
    let fallback_exit_date = ctx.as_of - Duration::days(config.unknown_exit_date_offset_days);

    for cc in &ctx.companies {
        let company = &cc.company;
        total_invested += company.investment_amount;

        if company.investment_amount > Decimal::ZERO {
            let date = company.investment_date.unwrap_or_else(|| {
                push_warning(
                    &mut warnings,
                    format!(
                        "{}: no investment date; assuming {}",
                        company.name, fallback_investment_date
                    ),
                );
                fallback_investment_date
            });
            flows.push(CashFlow::labelled(
                date,
                -company.investment_amount,
                format!("investment:{}", company.id),
            ));
        }

        let (nav_contribution, distributed) = match company.status {
            CompanyStatus::Active => {
                active_companies += 1;
                if company.current_valuation.is_none() {
                    push_warning(
                        &mut warnings,
                        format!("{}: no current valuation; NAV counted as zero", company.name),
                    );
                }
                (company.current_nav(), Decimal::ZERO)
            }
            CompanyStatus::Exited => {
                exited_companies += 1;
                if company.exit_value.is_none() {
                    push_warning(
                        &mut warnings,
                        format!("{}: exited without an exit value; distribution counted as zero", company.name),
                    );
                }
                let proceeds = company.realized_proceeds();
                if proceeds > Decimal::ZERO {
                    let date = company.exit_date.unwrap_or_else(|| {
                        push_warning(
                            &mut warnings,
                            format!(
                                "{}: no exit date; assuming {}",
                                company.name, fallback_exit_date
                            ),
                        );
                        fallback_exit_date
                    });
                    flows.push(CashFlow::labelled(
                        date,
                        proceeds,
                        format!("distribution:{}", company.id),
                    ));
                }
                (Decimal::ZERO, proceeds)
            }
        };

        total_nav += nav_contribution;
        total_distributed += distributed;

        rows.push(CompanyMetrics {
            company_id: company.id.clone(),
            company_name: company.name.clone(),
            status: company.status,
            invested: company.investment_amount,
            nav_contribution,
            distributed,
            moic: ratio_or_zero(nav_contribution + distributed, company.investment_amount),
            pct_of_nav: Decimal::ZERO,
        });
    }

    for row in &mut rows {
        row.pct_of_nav = ratio_or_zero(row.nav_contribution, total_nav) * Decimal::ONE_HUNDRED;
    }

    if total_nav > Decimal::ZERO {
        flows.push(CashFlow::labelled(ctx.as_of, total_nav, "terminal_nav"));
    }

    let total_value = total_nav + total_distributed;
    let irr = irr_with_fallback(
        &flows,
        total_value,
        total_invested,
        config.fallback_irr_years,
        config.irr_seed,
    );
    if let Some(reason) = &irr.fallback_reason {
        push_warning(
            &mut warnings,
            format!(
                "IRR solver did not converge ({reason}); using simple multiple over {} years",
                config.fallback_irr_years
            ),
        );
    }

    let metrics = FundMetrics {
        fund_id: fund.id.clone(),
        fund_name: fund.name.clone(),
        fund_size: fund.fund_size,
        total_invested,
        total_nav,
        total_distributed,
        dpi: ratio_or_zero(total_distributed, total_invested),
        tvpi: ratio_or_zero(total_value, total_invested),
        rvpi: ratio_or_zero(total_nav, total_invested),
        irr: irr.irr,
        irr_method: irr.method,
        deployment_rate: ratio_or_zero(total_invested, fund.fund_size),
        num_companies: ctx.companies.len() as u32,
        active_companies,
        exited_companies,
        company_metrics: rows,
        warning: None,
    };

    Ok(wrap(ctx, config, warnings, start, metrics))
}

fn wrap(
    ctx: &FundContext,
    config: &AnalysisConfig,
    warnings: Vec<String>,
    start: Instant,
    metrics: FundMetrics,
) -> ComputationOutput<FundMetrics> {
    let elapsed = start.elapsed().as_micros() as u64;
    with_metadata(
        "Fund metrics: NAV, DPI, TVPI, RVPI, XIRR with simple-multiple fallback",
        &serde_json::json!({
            "as_of": ctx.as_of.to_string(),
            "unknown_investment_date_offset_days": config.unknown_investment_date_offset_days,
            "unknown_exit_date_offset_days": config.unknown_exit_date_offset_days,
            "fallback_irr_years": config.fallback_irr_years.to_string(),
        }),
        warnings,
        elapsed,
        metrics,
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portfolio::{Fund, FundSnapshot, PortfolioCompany};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn approx_eq(a: Decimal, b: Decimal, eps: Decimal) -> bool {
        (a - b).abs() < eps
    }

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()
    }

    fn company(id: &str, invested: Decimal, own: Decimal, valuation: Decimal) -> PortfolioCompany {
        PortfolioCompany {
            id: id.into(),
            name: id.to_uppercase(),
            investment_amount: invested,
            ownership_pct: own,
            current_valuation: Some(valuation),
            stage: None,
            investment_date: NaiveDate::from_ymd_opt(2023, 1, 1),
            status: CompanyStatus::Active,
            exit_value: None,
            exit_date: None,
        }
    }

    fn ctx(companies: Vec<PortfolioCompany>) -> FundContext {
        FundContext::new(
            FundSnapshot {
                fund: Fund {
                    id: "f1".into(),
                    name: "Fund I".into(),
                    fund_size: dec!(100),
                    start_date: NaiveDate::from_ymd_opt(2022, 1, 1),
                },
                companies,
            },
            as_of(),
        )
    }

    #[test]
    fn test_nav_dpi_tvpi() {
        let mut exited = company("b", dec!(10), dec!(20), dec!(0));
        exited.status = CompanyStatus::Exited;
        exited.exit_value = Some(dec!(150));
        exited.exit_date = NaiveDate::from_ymd_opt(2025, 1, 1);
        let c = ctx(vec![company("a", dec!(20), dec!(10), dec!(400)), exited]);

        let out = calculate_fund_metrics(&c, &AnalysisConfig::default()).unwrap();
        let m = out.result;
        assert_eq!(m.total_invested, dec!(30));
        assert_eq!(m.total_nav, dec!(40));
        assert_eq!(m.total_distributed, dec!(30));
        assert_eq!(m.dpi, dec!(1));
        assert!(approx_eq(m.tvpi, dec!(70) / dec!(30), dec!(0.000001)));
        assert!(approx_eq(m.rvpi, dec!(40) / dec!(30), dec!(0.000001)));
        assert_eq!(m.deployment_rate, dec!(0.3));
        assert_eq!(m.active_companies, 1);
        assert_eq!(m.exited_companies, 1);
        assert_eq!(m.irr_method, IrrMethod::Xirr);
        assert!(m.irr > Decimal::ZERO);
    }

    #[test]
    fn test_empty_portfolio_returns_warning_record() {
        let out = calculate_fund_metrics(&ctx(vec![]), &AnalysisConfig::default()).unwrap();
        assert!(out.result.warning.is_some());
        assert_eq!(out.result.total_invested, Decimal::ZERO);
        assert_eq!(out.result.dpi, Decimal::ZERO);
        assert_eq!(out.result.tvpi, Decimal::ZERO);
        assert!(!out.is_error());
    }

    #[test]
    fn test_zero_invested_never_divides() {
        let c = ctx(vec![company("a", dec!(0), dec!(10), dec!(100))]);
        let m = calculate_fund_metrics(&c, &AnalysisConfig::default()).unwrap().result;
        assert_eq!(m.dpi, Decimal::ZERO);
        assert_eq!(m.tvpi, Decimal::ZERO);
        assert_eq!(m.rvpi, Decimal::ZERO);
        assert_eq!(m.irr, Decimal::ZERO);
        assert_eq!(m.irr_method, IrrMethod::SimpleMultiple);
    }

    #[test]
    fn test_missing_investment_date_uses_offset() {
        let mut a = company("a", dec!(100), dec!(10), dec!(3000));
        a.investment_date = None;
        let c = ctx(vec![a]);
        let out = calculate_fund_metrics(&c, &AnalysisConfig::default()).unwrap();
        assert!(out.warnings.iter().any(|w| w.contains("no investment date")));
        // 3x over 730 days
        let expected = dec!(0.7320508);
        assert!(
            approx_eq(out.result.irr, expected, dec!(0.001)),
            "got {}",
            out.result.irr
        );
    }

    #[test]
    fn test_total_loss_falls_back_to_minus_one() {
        let c = ctx(vec![company("a", dec!(100), dec!(10), dec!(0))]);
        let m = calculate_fund_metrics(&c, &AnalysisConfig::default()).unwrap().result;
        assert_eq!(m.irr_method, IrrMethod::SimpleMultiple);
        assert_eq!(m.irr, dec!(-1));
    }

    #[test]
    fn test_pct_of_nav_sums_to_hundred() {
        let c = ctx(vec![
            company("a", dec!(10), dec!(10), dec!(100)),
            company("b", dec!(10), dec!(20), dec!(150)),
        ]);
        let m = calculate_fund_metrics(&c, &AnalysisConfig::default()).unwrap().result;
        let total: Decimal = m.company_metrics.iter().map(|r| r.pct_of_nav).sum();
        assert!(approx_eq(total, dec!(100), dec!(0.0001)));
    }
}
