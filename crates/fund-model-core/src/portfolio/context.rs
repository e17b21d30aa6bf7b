use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::model::{
    CompanyAnalytics, CompanyScenarioCapTable, Fund, FundSnapshot, PortfolioCompany,
};
use super::providers::{CompanyAnalyticsProvider, ValuationScenarioProvider};
use crate::types::Money;

/// A company together with whatever the providers returned for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyContext {
    pub company: PortfolioCompany,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analytics: Option<CompanyAnalytics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cap_table: Option<CompanyScenarioCapTable>,
}

impl CompanyContext {
    pub fn new(company: PortfolioCompany) -> Self {
        CompanyContext {
            company,
            analytics: None,
            cap_table: None,
        }
    }
}

/// Read-only per-request view of one fund, pinned to an `as_of` date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundContext {
    pub fund: Fund,
    pub companies: Vec<CompanyContext>,
    pub as_of: NaiveDate,
}

impl FundContext {
    pub fn new(snapshot: FundSnapshot, as_of: NaiveDate) -> Self {
        FundContext {
            fund: snapshot.fund,
            companies: snapshot
                .companies
                .into_iter()
                .map(CompanyContext::new)
                .collect(),
            as_of,
        }
    }

    pub fn with_analytics(mut self, provider: &dyn CompanyAnalyticsProvider) -> Self {
        for ctx in &mut self.companies {
            ctx.analytics = provider.company_analytics(&ctx.company);
        }
        self
    }

    pub fn with_cap_tables(mut self, provider: &dyn ValuationScenarioProvider) -> Self {
        for ctx in &mut self.companies {
            ctx.cap_table = provider.scenario_cap_table(&ctx.company);
        }
        self
    }

    pub fn find_company(&self, company_id: &str) -> Option<&CompanyContext> {
        self.companies.iter().find(|c| c.company.id == company_id)
    }

    pub fn total_invested(&self) -> Money {
        self.companies
            .iter()
            .map(|c| c.company.investment_amount)
            .sum::<Decimal>()
    }
}
