//! Return attribution for one scenario combination.
//!
//! Marginal impact is computed in O(1) per company by removing that company's
//! invested capital and proceeds from the fund totals. This holds because
//! each company's waterfall is independent of every other company's.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::combinator::CompanyOutcome;
use crate::types::{ratio_or_zero, Money, Multiple, Percent};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnAttribution {
    pub company_id: String,
    pub company_name: String,
    pub scenario: String,
    pub invested: Money,
    pub proceeds: Money,
    /// proceeds / total_proceeds × 100
    pub pct_of_total_returns: Percent,
    /// Fund MOIC with this company removed.
    pub fund_moic_without: Multiple,
    /// fund_moic − fund_moic_without
    pub marginal_moic_impact: Multiple,
}

/// Attribute fund proceeds to companies, largest contributor first.
///
/// Ties keep portfolio order.
pub fn attribute_returns(
    outcomes: &[CompanyOutcome],
    total_invested: Money,
    total_proceeds: Money,
) -> Vec<ReturnAttribution> {
    let fund_moic = ratio_or_zero(total_proceeds, total_invested);

    let mut rows: Vec<ReturnAttribution> = outcomes
        .iter()
        .map(|o| {
            let fund_moic_without =
                ratio_or_zero(total_proceeds - o.proceeds, total_invested - o.invested);
            ReturnAttribution {
                company_id: o.company_id.clone(),
                company_name: o.company_name.clone(),
                scenario: o.scenario.clone(),
                invested: o.invested,
                proceeds: o.proceeds,
                pct_of_total_returns: ratio_or_zero(o.proceeds, total_proceeds)
                    * Decimal::ONE_HUNDRED,
                fund_moic_without,
                marginal_moic_impact: fund_moic - fund_moic_without,
            }
        })
        .collect();

    rows.sort_by(|a, b| b.proceeds.cmp(&a.proceeds));
    rows
}
