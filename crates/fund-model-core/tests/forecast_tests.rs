mod common;

use common::*;
use fund_model_core::exits::planner::ExitRecommendation;
use fund_model_core::pacing::deployment::PacingStatus;
use fund_model_core::portfolio::{CompanyAnalytics, Fund, FundSnapshot, PortfolioDataset};
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn single_company_fund(fund_size_mm: Decimal, invested_mm: Decimal, start: chrono::NaiveDate) -> PortfolioDataset {
    PortfolioDataset::single(FundSnapshot {
        fund: Fund {
            id: FUND_ID.into(),
            name: "Example Ventures II".into(),
            fund_size: fund_size_mm * MM,
            start_date: Some(start),
        },
        companies: vec![company("acme", "Acme", invested_mm, dec!(10), dec!(100), start)],
    })
}

// ===========================================================================
// Reserves
// ===========================================================================

#[test]
fn test_reserve_forecast_known_answers() {
    let data = dataset();
    let out = analyzer(&data).forecast_reserves(FUND_ID).unwrap();
    assert!(out.warnings.is_empty(), "{:?}", out.warnings);
    let r = out.result;

    let order: Vec<&str> = r.obligations.iter().map(|o| o.company_id.as_str()).collect();
    assert_eq!(order, vec!["globex", "acme", "initech"]);
    let quarters: Vec<&str> = r.obligations.iter().map(|o| o.quarter.as_str()).collect();
    assert_eq!(quarters, vec!["Q2 2024", "Q3 2024", "Q2 2025"]);

    assert_eq!(r.obligations[1].pro_rata_amount, dec!(20) * MM);
    assert_eq!(r.total_obligations, dec!(32) * MM);
    assert_eq!(r.available_reserves, dec!(110) * MM);
    assert_eq!(r.shortfall, Decimal::ZERO);
    assert!(!r.has_shortfall);
    assert_eq!(r.by_quarter.len(), 3);
}

#[test]
fn test_shortfall_matches_obligations_vs_reserves() {
    // obligations stay at 32; available = fund_size − 150
    for fund_size_mm in [dec!(150), dec!(170), dec!(182), dec!(182.01), dec!(400)] {
        let mut data = dataset();
        data.funds[0].fund.fund_size = fund_size_mm * MM;
        let r = analyzer(&data).forecast_reserves(FUND_ID).unwrap().result;
        assert_eq!(r.has_shortfall, r.total_obligations > r.available_reserves, "{fund_size_mm}");
        assert_eq!(
            r.shortfall,
            (r.total_obligations - r.available_reserves).max(Decimal::ZERO),
            "{fund_size_mm}"
        );
    }
}

// ===========================================================================
// Exits
// ===========================================================================

#[test]
fn test_exit_plans_sorted_by_hold_moic() {
    let mut data = PortfolioDataset::single(FundSnapshot {
        fund: Fund {
            id: FUND_ID.into(),
            name: "Example Ventures II".into(),
            fund_size: dec!(100) * MM,
            start_date: None,
        },
        companies: vec![
            company("a", "Alpha", dec!(10), dec!(10), dec!(50), date(2022, 1, 1)),
            company("b", "Beta", dec!(10), dec!(10), dec!(50), date(2022, 1, 1)),
            company("c", "Gamma", dec!(10), dec!(10), dec!(50), date(2022, 1, 1)),
        ],
    });
    // hold = arr_24 × 10 × 10% / 10M
    for (id, arr_mm) in [("a", dec!(12)), ("b", dec!(35)), ("c", dec!(8))] {
        data = data.with_analytics(
            id,
            CompanyAnalytics {
                projected_arr_24mo: Some(arr_mm * MM),
                stage_benchmark_multiple: Some(dec!(10)),
                ..Default::default()
            },
        );
    }
    let r = analyzer(&data).plan_exits(FUND_ID).unwrap().result;
    let moics: Vec<Decimal> = r.plans.iter().map(|p| p.hold_vs_sell.hold_2yr_moic).collect();
    assert_eq!(moics, vec![dec!(3.5), dec!(1.2), dec!(0.8)]);
    let ids: Vec<&str> = r.plans.iter().map(|p| p.company_id.as_str()).collect();
    assert_eq!(ids, vec!["b", "a", "c"]);
}

#[test]
fn test_exit_plan_for_fixture() {
    let data = dataset();
    let out = analyzer(&data).plan_exits(FUND_ID).unwrap();
    let acme = out.result.plans.iter().find(|p| p.company_id == "acme").unwrap();

    // 400 × 0.8 × 20%
    assert_eq!(acme.secondary.proceeds, dec!(64) * MM);
    assert_eq!(acme.ma_ladder.len(), 4);
    // 40 → 80 after a year, then 80 × 1.85^0.5 ≈ 108.8 at 18 months
    assert_eq!(acme.ipo.months_to_ipo, Some(18));
    // 40 × 2 × 1.85 = 148; × 10 (series_b) × 20% / 50
    assert!(approx_eq(acme.hold_vs_sell.hold_2yr_moic, dec!(5.92), dec!(0.0001)));
    assert_eq!(acme.hold_vs_sell.recommendation, ExitRecommendation::Hold);

    let globex = out.result.plans.iter().find(|p| p.company_id == "globex").unwrap();
    assert_eq!(globex.ipo.months_to_ipo, None);

    assert_eq!(out.result.summary.num_companies, 3);
    assert_eq!(out.result.plans[0].company_id, "acme");
}

// ===========================================================================
// Pacing
// ===========================================================================

#[test]
fn test_pacing_fixture_on_track() {
    let data = dataset();
    let r = analyzer(&data).analyze_pacing(FUND_ID).unwrap().result;
    assert_eq!(r.years_since_start, dec!(1276) / dec!(365));
    assert_eq!(r.status, PacingStatus::OnTrack);
    assert_eq!(r.target_invested, dec!(221) * MM);
    assert_eq!(r.remaining_to_target, dec!(71) * MM);
    assert!(r.months_to_target.is_some_and(|m| m > 0));
}

#[test]
fn test_pacing_band_edges() {
    // past the deployment period: ideal = 100 × 0.85
    let start = date(2015, 1, 1);
    let cases = [
        (dec!(67.99), PacingStatus::Behind),
        (dec!(68), PacingStatus::OnTrack),
        (dec!(85), PacingStatus::OnTrack),
        (dec!(102), PacingStatus::OnTrack),
        (dec!(102.01), PacingStatus::Ahead),
    ];
    for (invested_mm, expected) in cases {
        let data = single_company_fund(dec!(100), invested_mm, start);
        let r = analyzer(&data).analyze_pacing(FUND_ID).unwrap().result;
        assert_eq!(r.ideal_invested, dec!(85) * MM);
        assert_eq!(r.status, expected, "invested {invested_mm}M");
    }
}
