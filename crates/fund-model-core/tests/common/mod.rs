#![allow(dead_code)]

use chrono::NaiveDate;
use fund_model_core::portfolio::{
    CapTableScenario, CompanyAnalytics, CompanyScenarioCapTable, CompanyStatus, Fund,
    FundSnapshot, PortfolioCompany, PortfolioDataset, ValuationDirection, WaterfallAtExit,
};
use fund_model_core::{AnalysisConfig, FundAnalyzer};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

pub const FUND_ID: &str = "fund-ii";
pub const MM: Decimal = dec!(1_000_000);

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn as_of() -> NaiveDate {
    date(2024, 6, 30)
}

pub fn company(
    id: &str,
    name: &str,
    invested_mm: Decimal,
    ownership_pct: Decimal,
    valuation_mm: Decimal,
    invested_on: NaiveDate,
) -> PortfolioCompany {
    PortfolioCompany {
        id: id.into(),
        name: name.into(),
        investment_amount: invested_mm * MM,
        ownership_pct,
        current_valuation: Some(valuation_mm * MM),
        stage: Some("Series B".into()),
        investment_date: Some(invested_on),
        status: CompanyStatus::Active,
        exit_value: None,
        exit_date: None,
    }
}

/// Four named scenarios, each with an entry at `target` (the fund's exit
/// target for the company) and a decoy at half of it.
fn cap_table(target_mm: Decimal, invested_mm: Decimal, proceeds_mm: [(&str, Decimal); 4]) -> CompanyScenarioCapTable {
    CompanyScenarioCapTable {
        entry_round: Some("Series A".into()),
        ownership_pre: None,
        scenarios: proceeds_mm
            .iter()
            .map(|(name, p)| CapTableScenario {
                name: name.to_string(),
                waterfall_at_exits: vec![
                    WaterfallAtExit {
                        exit_value: target_mm / dec!(2) * MM,
                        our_proceeds: *p / dec!(2) * MM,
                        our_moic: *p / dec!(2) / invested_mm,
                        ownership_post: dec!(10),
                        total_preferences: Some(dec!(50) * MM),
                        senior_preferences: None,
                    },
                    WaterfallAtExit {
                        exit_value: target_mm * MM,
                        our_proceeds: *p * MM,
                        our_moic: *p / invested_mm,
                        ownership_post: dec!(10),
                        total_preferences: Some(dec!(50) * MM),
                        senior_preferences: Some(dec!(20) * MM),
                    },
                ],
            })
            .collect(),
    }
}

/// $260M fund, $150M invested across three companies.
///
/// | company | invested | own | valuation | NAV | MOIC | signal          |
/// |---------|----------|-----|-----------|-----|------|-----------------|
/// | Acme    | 50       | 20% | 400       | 80  | 1.6  | up round likely |
/// | Globex  | 60       | 15% | 200       | 30  | 0.5  | 6 months runway |
/// | Initech | 40       | 10% | 500       | 50  | 1.25 | down round risk |
pub fn dataset() -> PortfolioDataset {
    let fund = Fund {
        id: FUND_ID.into(),
        name: "Example Ventures II".into(),
        fund_size: dec!(260) * MM,
        start_date: Some(date(2021, 1, 1)),
    };
    let companies = vec![
        company("acme", "Acme", dec!(50), dec!(20), dec!(400), date(2021, 3, 1)),
        company("globex", "Globex", dec!(60), dec!(15), dec!(200), date(2021, 9, 1)),
        company("initech", "Initech", dec!(40), dec!(10), dec!(500), date(2022, 2, 1)),
    ];

    PortfolioDataset::single(FundSnapshot { fund, companies })
        .with_analytics(
            "acme",
            CompanyAnalytics {
                valuation_direction: ValuationDirection::UpRoundLikely,
                estimated_runway_months: Some(dec!(30)),
                predicted_next_round_stage: Some("Series C".into()),
                predicted_next_round_months: Some(5),
                predicted_next_round_amount: Some(dec!(100) * MM),
                predicted_next_round_valuation: Some(dec!(600) * MM),
                implied_current_valuation: Some(dec!(450) * MM),
                current_arr: Some(dec!(40) * MM),
                growth_rate: Some(dec!(1.0)),
                ..Default::default()
            },
        )
        .with_analytics(
            "globex",
            CompanyAnalytics {
                valuation_direction: ValuationDirection::Stable,
                estimated_runway_months: Some(dec!(6)),
                predicted_next_round_months: Some(2),
                predicted_next_round_amount: Some(dec!(40) * MM),
                current_arr: Some(dec!(12) * MM),
                growth_rate: Some(dec!(0.3)),
                ..Default::default()
            },
        )
        .with_analytics(
            "initech",
            CompanyAnalytics {
                valuation_direction: ValuationDirection::DownRoundRisk,
                estimated_runway_months: Some(dec!(18)),
                predicted_next_round_months: Some(14),
                predicted_next_round_amount: Some(dec!(60) * MM),
                current_arr: Some(dec!(25) * MM),
                growth_rate: Some(dec!(0.5)),
                ..Default::default()
            },
        )
        // exit targets are valuation × 5
        .with_cap_table(
            "acme",
            cap_table(
                dec!(2000),
                dec!(50),
                [("base", dec!(200)), ("outperform", dec!(350)), ("growth_decay", dec!(80)), ("bridge", dec!(40))],
            ),
        )
        .with_cap_table(
            "globex",
            cap_table(
                dec!(1000),
                dec!(60),
                [("base", dec!(90)), ("outperform", dec!(150)), ("growth_decay", dec!(45)), ("bridge", dec!(20))],
            ),
        )
        .with_cap_table(
            "initech",
            cap_table(
                dec!(2500),
                dec!(40),
                [("base", dec!(120)), ("outperform", dec!(200)), ("growth_decay", dec!(60)), ("bridge", dec!(30))],
            ),
        )
}

pub fn analyzer(data: &PortfolioDataset) -> FundAnalyzer<'_> {
    FundAnalyzer::for_dataset(data, AnalysisConfig::default())
        .unwrap()
        .with_as_of(as_of())
}

pub fn approx_eq(a: Decimal, b: Decimal, eps: Decimal) -> bool {
    (a - b).abs() < eps
}
