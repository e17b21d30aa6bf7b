//! Contracts for the external collaborators the engine reads from.
//!
//! The traits carry no storage-specific types so any backend (database, API
//! client, fixture file) can supply the read-only snapshot. All reads are
//! synchronous: one batched fetch per top-level operation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::model::{CompanyAnalytics, CompanyScenarioCapTable, FundSnapshot, PortfolioCompany};
use crate::FundModelResult;

/// Source of fund and portfolio-company records.
pub trait PortfolioStore: Send + Sync {
    /// Fetch a fund and all of its companies in one read.
    ///
    /// `Ok(None)` means the fund does not exist; `Err` is reserved for the
    /// store itself failing.
    fn fetch_fund_snapshot(&self, fund_id: &str) -> FundModelResult<Option<FundSnapshot>>;
}

/// Per-company growth, runway and next-round predictions.
pub trait CompanyAnalyticsProvider: Send + Sync {
    fn company_analytics(&self, company: &PortfolioCompany) -> Option<CompanyAnalytics>;
}

/// Per-company named exit scenarios with waterfall outcomes.
pub trait ValuationScenarioProvider: Send + Sync {
    fn scenario_cap_table(&self, company: &PortfolioCompany) -> Option<CompanyScenarioCapTable>;
}

/// In-memory dataset implementing all three provider contracts.
///
/// Analytics and cap tables are keyed by company id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PortfolioDataset {
    #[serde(default)]
    pub funds: Vec<FundSnapshot>,
    #[serde(default)]
    pub analytics: BTreeMap<String, CompanyAnalytics>,
    #[serde(default)]
    pub cap_tables: BTreeMap<String, CompanyScenarioCapTable>,
}

impl PortfolioDataset {
    pub fn single(snapshot: FundSnapshot) -> Self {
        PortfolioDataset {
            funds: vec![snapshot],
            ..Default::default()
        }
    }

    pub fn with_analytics(mut self, company_id: &str, analytics: CompanyAnalytics) -> Self {
        self.analytics.insert(company_id.to_string(), analytics);
        self
    }

    pub fn with_cap_table(mut self, company_id: &str, table: CompanyScenarioCapTable) -> Self {
        self.cap_tables.insert(company_id.to_string(), table);
        self
    }

    /// Id of the only fund, if the dataset holds exactly one.
    pub fn sole_fund_id(&self) -> Option<&str> {
        match self.funds.as_slice() {
            [only] => Some(only.fund.id.as_str()),
            _ => None,
        }
    }
}

impl PortfolioStore for PortfolioDataset {
    fn fetch_fund_snapshot(&self, fund_id: &str) -> FundModelResult<Option<FundSnapshot>> {
        Ok(self.funds.iter().find(|s| s.fund.id == fund_id).cloned())
    }
}

impl CompanyAnalyticsProvider for PortfolioDataset {
    fn company_analytics(&self, company: &PortfolioCompany) -> Option<CompanyAnalytics> {
        self.analytics.get(&company.id).cloned()
    }
}

impl ValuationScenarioProvider for PortfolioDataset {
    fn scenario_cap_table(&self, company: &PortfolioCompany) -> Option<CompanyScenarioCapTable> {
        self.cap_tables.get(&company.id).cloned()
    }
}
