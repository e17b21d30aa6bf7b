//! Fund-level evaluation of an externally built scenario tree.
//!
//! The tree covers a subset of the portfolio. Path labels are mapped back to
//! company names so the remaining companies can be valued at current NAV and
//! added to every path without double counting.

use std::collections::BTreeSet;
use std::time::Instant;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::config::AnalysisConfig;
use crate::error::FundModelError;
use crate::portfolio::PortfolioCompany;
use crate::types::*;
use crate::FundModelResult;

// ---------------------------------------------------------------------------
// Input / Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeYearData {
    #[serde(default)]
    pub year: u32,
    pub fund_nav: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioTreePath {
    pub path_id: String,
    /// Ordered node labels, e.g. ["Acme Bull", "Globex 30%"].
    pub labels: Vec<String>,
    pub cumulative_probability: Rate,
    #[serde(default)]
    pub yearly_data: Vec<TreeYearData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioTreeInput {
    pub paths: Vec<ScenarioTreePath>,
    pub companies: Vec<PortfolioCompany>,
    pub fund_size: Money,
    /// Overrides tree + rest invested when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_invested: Option<Money>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathFundResult {
    pub path_id: String,
    pub labels: Vec<String>,
    pub cumulative_probability: Rate,
    pub tree_nav: Money,
    pub rest_of_portfolio_nav: Money,
    pub fund_total_nav: Money,
    pub fund_tvpi: Multiple,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScenarioTreeFundOutput {
    pub fund_size: Money,
    pub in_tree_companies: Vec<String>,
    pub rest_of_portfolio_companies: Vec<String>,
    pub unmatched_labels: Vec<String>,
    pub tree_invested: Money,
    pub rest_invested: Money,
    pub combined_invested: Money,
    pub rest_of_portfolio_nav: Money,
    pub paths: Vec<PathFundResult>,
    /// Σ probability × fund_total_nav
    pub expected_fund_nav: Money,
    pub expected_fund_tvpi: Multiple,
}

// ---------------------------------------------------------------------------
// Label parsing
// ---------------------------------------------------------------------------

fn trim_token(token: &str) -> &str {
    token.trim_matches(|c: char| matches!(c, '(' | ')' | '[' | ']' | ':' | ',' | '-' | '|'))
}

fn is_percentage(token: &str) -> bool {
    token
        .strip_suffix('%')
        .is_some_and(|n| !n.is_empty() && n.parse::<Decimal>().is_ok())
}

fn is_strippable(token: &str, keywords: &[String]) -> bool {
    let t = trim_token(token);
    let lower = t.to_lowercase();
    t.is_empty() || is_percentage(t) || keywords.iter().any(|k| *k == lower)
}

/// Strip trailing scenario keywords and percentages ("Acme Corp Bull 30%" →
/// "Acme Corp").
pub fn company_name_from_label(label: &str, keywords: &[String]) -> String {
    let mut tokens: Vec<&str> = label.split_whitespace().collect();
    while tokens.last().is_some_and(|t| is_strippable(t, keywords)) {
        tokens.pop();
    }
    tokens.join(" ")
}

/// Resolve a path label to a portfolio company. The full label is tried
/// first, then one trailing keyword or percentage is stripped per attempt,
/// so the longest matching company name wins ("Scale Up Bull" matches
/// "Scale Up" before "Scale").
pub fn match_label_to_company<'a>(
    label: &str,
    companies: &'a [PortfolioCompany],
    keywords: &[String],
) -> Option<&'a PortfolioCompany> {
    let mut tokens: Vec<&str> = label.split_whitespace().collect();
    while !tokens.is_empty() {
        let candidate = trim_token(&tokens.join(" ")).to_lowercase();
        if let Some(c) = companies
            .iter()
            .find(|c| c.name.trim().to_lowercase() == candidate)
        {
            return Some(c);
        }
        if !tokens.last().is_some_and(|t| is_strippable(t, keywords)) {
            break;
        }
        tokens.pop();
    }
    None
}

// ---------------------------------------------------------------------------
// Core computation
// ---------------------------------------------------------------------------

pub fn evaluate_scenario_tree_on_fund(
    input: &ScenarioTreeInput,
    config: &AnalysisConfig,
) -> FundModelResult<ComputationOutput<ScenarioTreeFundOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if let Some(t) = input.total_invested {
        if t < Decimal::ZERO {
            return Err(FundModelError::InvalidInput {
                field: "total_invested".into(),
                reason: "Total invested override cannot be negative".into(),
            });
        }
    }

    // Recover company names from every label in every path.
    let mut in_tree_ids: BTreeSet<&str> = BTreeSet::new();
    let mut unmatched: BTreeSet<String> = BTreeSet::new();
    for path in &input.paths {
        for label in &path.labels {
            let keywords = &config.tree_label_keywords;
            match match_label_to_company(label, &input.companies, keywords) {
                Some(c) => {
                    in_tree_ids.insert(c.id.as_str());
                }
                None => {
                    let name = company_name_from_label(label, keywords);
                    if !name.is_empty() {
                        unmatched.insert(name);
                    }
                }
            }
        }
    }
    for name in &unmatched {
        push_warning(
            &mut warnings,
            format!("Tree label '{name}' does not match any portfolio company"),
        );
    }

    let mut tree_invested = Decimal::ZERO;
    let mut rest_invested = Decimal::ZERO;
    let mut rest_nav = Decimal::ZERO;
    let mut in_tree_companies = Vec::new();
    let mut rest_companies = Vec::new();
    for c in &input.companies {
        if in_tree_ids.contains(c.id.as_str()) {
            tree_invested += c.investment_amount;
            in_tree_companies.push(c.name.clone());
        } else {
            rest_invested += c.investment_amount;
            rest_nav += c.current_nav();
            rest_companies.push(c.name.clone());
        }
    }

    let combined_invested = input.total_invested.unwrap_or(tree_invested + rest_invested);

    let mut expected_fund_nav = Decimal::ZERO;
    let mut probability_total = Decimal::ZERO;
    let paths: Vec<PathFundResult> = input
        .paths
        .iter()
        .map(|path| {
            let tree_nav = match path.yearly_data.last() {
                Some(y) => y.fund_nav,
                None => {
                    push_warning(
                        &mut warnings,
                        format!("Path '{}' has no yearly data; tree NAV counted as zero", path.path_id),
                    );
                    Decimal::ZERO
                }
            };
            let fund_total_nav = rest_nav + tree_nav;
            expected_fund_nav += path.cumulative_probability * fund_total_nav;
            probability_total += path.cumulative_probability;
            PathFundResult {
                path_id: path.path_id.clone(),
                labels: path.labels.clone(),
                cumulative_probability: path.cumulative_probability,
                tree_nav,
                rest_of_portfolio_nav: rest_nav,
                fund_total_nav,
                fund_tvpi: ratio_or_zero(fund_total_nav, combined_invested),
            }
        })
        .collect();

    if !paths.is_empty() && (probability_total - Decimal::ONE).abs() > dec!(0.01) {
        push_warning(
            &mut warnings,
            format!("Path probabilities sum to {probability_total}, not 1.0"),
        );
    }

    let output = ScenarioTreeFundOutput {
        fund_size: input.fund_size,
        in_tree_companies,
        rest_of_portfolio_companies: rest_companies,
        unmatched_labels: unmatched.into_iter().collect(),
        tree_invested,
        rest_invested,
        combined_invested,
        rest_of_portfolio_nav: rest_nav,
        paths,
        expected_fund_nav,
        expected_fund_tvpi: ratio_or_zero(expected_fund_nav, combined_invested),
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Scenario tree on fund: tree path NAV + rest-of-portfolio NAV at current marks",
        &serde_json::json!({
            "num_paths": input.paths.len(),
            "total_invested_override": input.total_invested.map(|t| t.to_string()),
        }),
        warnings,
        elapsed,
        output,
    ))
}
