use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{Money, Multiple, Percent, Rate};

// ---------------------------------------------------------------------------
// Fund and companies (PortfolioStore records)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fund {
    pub id: String,
    pub name: String,
    #[serde(alias = "fund_size_usd")]
    pub fund_size: Money,
    #[serde(default, alias = "created_at", skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompanyStatus {
    #[default]
    Active,
    Exited,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioCompany {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub investment_amount: Money,
    /// Ownership on a 0-100 scale.
    #[serde(default)]
    pub ownership_pct: Percent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_valuation: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub investment_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: CompanyStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_value: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_date: Option<NaiveDate>,
}

impl PortfolioCompany {
    /// Ownership as a fraction. The only place the /100 conversion happens.
    pub fn ownership_fraction(&self) -> Decimal {
        self.ownership_pct / Decimal::ONE_HUNDRED
    }

    pub fn is_active(&self) -> bool {
        self.status == CompanyStatus::Active
    }

    pub fn is_exited(&self) -> bool {
        self.status == CompanyStatus::Exited
    }

    pub fn valuation(&self) -> Money {
        self.current_valuation.unwrap_or(Decimal::ZERO)
    }

    /// Ownership share of the current valuation.
    pub fn current_nav(&self) -> Money {
        self.ownership_fraction() * self.valuation()
    }

    /// Ownership share of the exit value (zero when unknown).
    pub fn realized_proceeds(&self) -> Money {
        self.ownership_fraction() * self.exit_value.unwrap_or(Decimal::ZERO)
    }
}

/// One batched read of a fund and its portfolio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundSnapshot {
    pub fund: Fund,
    #[serde(default)]
    pub companies: Vec<PortfolioCompany>,
}

// ---------------------------------------------------------------------------
// Company analytics (CompanyAnalyticsProvider records)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValuationDirection {
    DownRoundRisk,
    Stable,
    UpRoundLikely,
    #[default]
    Unknown,
}

/// Externally derived per-company signals. Treated as opaque inputs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanyAnalytics {
    pub growth_rate: Option<Rate>,
    pub growth_trend: Option<String>,
    pub estimated_runway_months: Option<Decimal>,
    pub valuation_direction: ValuationDirection,
    pub predicted_next_round_stage: Option<String>,
    pub predicted_next_round_months: Option<u32>,
    pub predicted_next_round_amount: Option<Money>,
    /// Predicted pre-money valuation of the next round.
    pub predicted_next_round_valuation: Option<Money>,
    pub implied_current_valuation: Option<Money>,
    pub current_arr: Option<Money>,
    pub stage_benchmark_multiple: Option<Multiple>,
    pub projected_arr_24mo: Option<Money>,
    pub signals: Vec<String>,
}

// ---------------------------------------------------------------------------
// Scenario cap tables (ValuationScenarioProvider records)
// ---------------------------------------------------------------------------

/// Our position in the company's waterfall at one exit value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaterfallAtExit {
    pub exit_value: Money,
    pub our_proceeds: Money,
    #[serde(default)]
    pub our_moic: Multiple,
    #[serde(default)]
    pub ownership_post: Percent,
    /// Total liquidation preference stack at this exit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_preferences: Option<Money>,
    /// Preferences senior to ours.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub senior_preferences: Option<Money>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapTableScenario {
    pub name: String,
    #[serde(default)]
    pub waterfall_at_exits: Vec<WaterfallAtExit>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyScenarioCapTable {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_round: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ownership_pre: Option<Percent>,
    /// Listed in provider order; the first entry is the fallback scenario.
    #[serde(default)]
    pub scenarios: Vec<CapTableScenario>,
}

/// company_id → scenario name.
pub type ScenarioAssignment = BTreeMap<String, String>;
