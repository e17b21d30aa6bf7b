//! Per-company scenario combinations rolled up to fund level.
//!
//! Each company contributes the `waterfall_at_exits` entry closest to its
//! target exit (current valuation × exit multiplier) under the scenario it is
//! assigned. Four standard assignments are generated deterministically; a
//! fifth, custom one is evaluated only when the caller supplies it.

use std::time::Instant;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::attribution::{attribute_returns, ReturnAttribution};
use crate::config::AnalysisConfig;
use crate::error::FundModelError;
use crate::portfolio::{
    CapTableScenario, CompanyContext, CompanyScenarioCapTable, FundContext, ScenarioAssignment,
    ValuationDirection, WaterfallAtExit,
};
use crate::types::*;
use crate::FundModelResult;

pub const BASE: &str = "base";
pub const OUTPERFORM: &str = "outperform";
pub const GROWTH_DECAY: &str = "growth_decay";
pub const BRIDGE: &str = "bridge";

// ---------------------------------------------------------------------------
// Scenario selection
// ---------------------------------------------------------------------------

/// Outcome of resolving a requested scenario name against a company's table.
#[derive(Debug, Clone, PartialEq)]
pub enum ScenarioPick<'a> {
    Found(&'a CapTableScenario),
    FellBackTo {
        scenario: &'a CapTableScenario,
        requested: String,
    },
}

impl<'a> ScenarioPick<'a> {
    pub fn scenario(&self) -> &'a CapTableScenario {
        match self {
            ScenarioPick::Found(s) => s,
            ScenarioPick::FellBackTo { scenario, .. } => scenario,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, ScenarioPick::FellBackTo { .. })
    }
}

/// Select `requested` from the table, else its first listed scenario.
///
/// `None` only when the table lists no scenarios at all.
pub fn pick_scenario<'a>(
    table: &'a CompanyScenarioCapTable,
    requested: &str,
) -> Option<ScenarioPick<'a>> {
    if let Some(found) = table.scenarios.iter().find(|s| s.name == requested) {
        return Some(ScenarioPick::Found(found));
    }
    table.scenarios.first().map(|first| ScenarioPick::FellBackTo {
        scenario: first,
        requested: requested.to_string(),
    })
}

/// Index and entry whose exit value is nearest `target`. Ties go to the
/// earlier entry.
pub fn closest_exit(
    entries: &[WaterfallAtExit],
    target: Money,
) -> Option<(usize, &WaterfallAtExit)> {
    let mut best: Option<(usize, &WaterfallAtExit)> = None;
    for (i, entry) in entries.iter().enumerate() {
        let distance = (entry.exit_value - target).abs();
        match best {
            Some((_, b)) if (b.exit_value - target).abs() <= distance => {}
            _ => best = Some((i, entry)),
        }
    }
    best
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioResolution {
    Exact,
    Fallback,
}

/// One company's contribution to a scenario combination, with enough context
/// to trace every number back to its waterfall entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyOutcome {
    pub company_id: String,
    pub company_name: String,
    /// Scenario actually used.
    pub scenario: String,
    pub requested_scenario: String,
    pub scenario_resolution: ScenarioResolution,
    // entry context
    pub invested: Money,
    pub entry_round: Option<String>,
    pub ownership_pre: Percent,
    pub ownership_post: Percent,
    // exit context
    pub target_exit_value: Money,
    pub exit_value: Money,
    pub total_preference_stack: Option<Money>,
    /// Preferences senior to this investor.
    pub seniority_above: Option<Money>,
    /// total_preference_stack / exit_value × 100
    pub preference_pct_of_exit: Option<Percent>,
    // proceeds
    pub proceeds: Money,
    pub moic: Multiple,
    pub proceeds_source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioScenarioResult {
    pub scenario_name: String,
    pub label: String,
    pub description: String,
    pub assignment: ScenarioAssignment,
    pub total_invested: Money,
    pub total_proceeds: Money,
    pub fund_moic: Multiple,
    pub fund_dpi: Multiple,
    /// Portfolio order.
    pub company_outcomes: Vec<CompanyOutcome>,
    /// Largest proceeds first.
    pub return_attribution: Vec<ReturnAttribution>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScenarioSummary {
    pub best_scenario: Option<String>,
    pub best_fund_moic: Multiple,
    pub worst_scenario: Option<String>,
    pub worst_fund_moic: Multiple,
    pub moic_spread: Multiple,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScenarioModelOutput {
    pub fund_id: String,
    pub fund_name: String,
    pub fund_size: Money,
    pub exit_multiplier: Multiple,
    pub companies_modeled: u32,
    /// Companies with investment but no scenario cap table.
    pub companies_excluded: Vec<String>,
    pub scenarios: Vec<PortfolioScenarioResult>,
    pub summary: ScenarioSummary,
}

/// Caller options for `model_fund_scenarios`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioRequest {
    pub custom_combo: Option<ScenarioAssignment>,
    pub custom_label: Option<String>,
    pub exit_multiplier: Option<Multiple>,
}

// ---------------------------------------------------------------------------
// Standard scenarios
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandardScenario {
    EverythingOnPlan,
    PowerLaw,
    CurrentTrajectory,
    StressTest,
}

impl StandardScenario {
    pub const ALL: [StandardScenario; 4] = [
        StandardScenario::EverythingOnPlan,
        StandardScenario::PowerLaw,
        StandardScenario::CurrentTrajectory,
        StandardScenario::StressTest,
    ];

    pub fn name(self) -> &'static str {
        match self {
            StandardScenario::EverythingOnPlan => "everything_on_plan",
            StandardScenario::PowerLaw => "power_law",
            StandardScenario::CurrentTrajectory => "current_trajectory",
            StandardScenario::StressTest => "stress_test",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StandardScenario::EverythingOnPlan => "Everything On Plan",
            StandardScenario::PowerLaw => "Power Law",
            StandardScenario::CurrentTrajectory => "Current Trajectory",
            StandardScenario::StressTest => "Stress Test",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            StandardScenario::EverythingOnPlan => "Every company hits its base case",
            StandardScenario::PowerLaw => {
                "Largest position outperforms, upper half on plan, remainder decays"
            }
            StandardScenario::CurrentTrajectory => {
                "Each company follows its own valuation direction and runway signals"
            }
            StandardScenario::StressTest => "Weakest half by current MOIC needs a bridge",
        }
    }

    pub fn assign(self, companies: &[&CompanyContext], config: &AnalysisConfig) -> ScenarioAssignment {
        match self {
            StandardScenario::EverythingOnPlan => companies
                .iter()
                .map(|c| (c.company.id.clone(), BASE.to_string()))
                .collect(),
            StandardScenario::PowerLaw => power_law_assignment(companies),
            StandardScenario::CurrentTrajectory => companies
                .iter()
                .map(|c| (c.company.id.clone(), trajectory_scenario(c, config).to_string()))
                .collect(),
            StandardScenario::StressTest => stress_test_assignment(companies),
        }
    }
}

/// Rank by NAV descending: top → outperform, next ⌊N/2⌋ → base, rest decay.
fn power_law_assignment(companies: &[&CompanyContext]) -> ScenarioAssignment {
    let mut ranked: Vec<&CompanyContext> = companies.to_vec();
    ranked.sort_by(|a, b| b.company.current_nav().cmp(&a.company.current_nav()));
    let half = ranked.len() / 2;
    ranked
        .iter()
        .enumerate()
        .map(|(rank, c)| {
            let scenario = if rank == 0 {
                OUTPERFORM
            } else if rank <= half {
                BASE
            } else {
                GROWTH_DECAY
            };
            (c.company.id.clone(), scenario.to_string())
        })
        .collect()
}

fn trajectory_scenario(ctx: &CompanyContext, config: &AnalysisConfig) -> &'static str {
    let Some(analytics) = &ctx.analytics else {
        return BASE;
    };
    match analytics.valuation_direction {
        ValuationDirection::DownRoundRisk => return GROWTH_DECAY,
        ValuationDirection::UpRoundLikely => return OUTPERFORM,
        _ => {}
    }
    match analytics.estimated_runway_months {
        Some(runway) if runway < config.bridge_runway_months => BRIDGE,
        _ => BASE,
    }
}

/// Rank by current MOIC ascending: bottom ⌈N/2⌉ → bridge, rest → base.
/// With an odd count the middle company is bridged too, so a single-company
/// portfolio is still stressed.
fn stress_test_assignment(companies: &[&CompanyContext]) -> ScenarioAssignment {
    let moic = |c: &CompanyContext| {
        ratio_or_zero(c.company.current_nav(), c.company.investment_amount)
    };
    let mut ranked: Vec<&CompanyContext> = companies.to_vec();
    ranked.sort_by(|a, b| moic(a).cmp(&moic(b)));
    let bottom = ranked.len().div_ceil(2);
    ranked
        .iter()
        .enumerate()
        .map(|(rank, c)| {
            let scenario = if rank < bottom { BRIDGE } else { BASE };
            (c.company.id.clone(), scenario.to_string())
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Combination evaluation
// ---------------------------------------------------------------------------

/// Fund totals and per-company outcomes for one assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct ComboMetrics {
    pub total_invested: Money,
    pub total_proceeds: Money,
    pub fund_moic: Multiple,
    pub fund_dpi: Multiple,
    pub company_outcomes: Vec<CompanyOutcome>,
}

/// Evaluate one company→scenario assignment.
///
/// Companies without a cap table (or with an empty one) are skipped; those
/// absent from `combo` are evaluated under "base".
pub fn fund_metrics_for_combo(
    companies: &[&CompanyContext],
    combo: &ScenarioAssignment,
    exit_multiplier: Multiple,
    fund_size: Money,
    config: &AnalysisConfig,
    warnings: &mut Vec<String>,
) -> ComboMetrics {
    let mut total_invested = Decimal::ZERO;
    let mut total_proceeds = Decimal::ZERO;
    let mut outcomes = Vec::with_capacity(companies.len());

    for ctx in companies {
        let company = &ctx.company;
        let Some(table) = &ctx.cap_table else {
            continue;
        };
        let requested = combo.get(&company.id).map(String::as_str).unwrap_or(BASE);
        let Some(pick) = pick_scenario(table, requested) else {
            continue;
        };
        let scenario = pick.scenario();
        if let ScenarioPick::FellBackTo { requested, .. } = &pick {
            // One warning per (company, requested) across all combinations
            let message = format!(
                "{}: scenario '{}' not available; using '{}'",
                company.name, requested, scenario.name
            );
            if !warnings.contains(&message) {
                push_warning(warnings, message);
            }
        }

        let target_exit_value = match company.current_valuation {
            Some(v) if v > Decimal::ZERO => v * exit_multiplier,
            _ => config.fallback_target_exit_value,
        };

        let outcome = match closest_exit(&scenario.waterfall_at_exits, target_exit_value) {
            Some((index, entry)) => {
                let preference_pct_of_exit = entry.total_preferences.map(|p| {
                    ratio_or_zero(p, entry.exit_value) * Decimal::ONE_HUNDRED
                });
                CompanyOutcome {
                    company_id: company.id.clone(),
                    company_name: company.name.clone(),
                    scenario: scenario.name.clone(),
                    requested_scenario: requested.to_string(),
                    scenario_resolution: resolution(&pick),
                    invested: company.investment_amount,
                    entry_round: table.entry_round.clone(),
                    ownership_pre: table.ownership_pre.unwrap_or(company.ownership_pct),
                    ownership_post: entry.ownership_post,
                    target_exit_value,
                    exit_value: entry.exit_value,
                    total_preference_stack: entry.total_preferences,
                    seniority_above: entry.senior_preferences,
                    preference_pct_of_exit,
                    proceeds: entry.our_proceeds,
                    moic: entry.our_moic,
                    proceeds_source: format!(
                        "cap_table:{}:waterfall_at_exits[{}]",
                        scenario.name, index
                    ),
                }
            }
            None => {
                push_warning(
                    warnings,
                    format!(
                        "{}: scenario '{}' has no waterfall entries; proceeds counted as zero",
                        company.name, scenario.name
                    ),
                );
                CompanyOutcome {
                    company_id: company.id.clone(),
                    company_name: company.name.clone(),
                    scenario: scenario.name.clone(),
                    requested_scenario: requested.to_string(),
                    scenario_resolution: resolution(&pick),
                    invested: company.investment_amount,
                    entry_round: table.entry_round.clone(),
                    ownership_pre: table.ownership_pre.unwrap_or(company.ownership_pct),
                    ownership_post: company.ownership_pct,
                    target_exit_value,
                    exit_value: Decimal::ZERO,
                    total_preference_stack: None,
                    seniority_above: None,
                    preference_pct_of_exit: None,
                    proceeds: Decimal::ZERO,
                    moic: Decimal::ZERO,
                    proceeds_source: format!("cap_table:{}:empty", scenario.name),
                }
            }
        };

        total_invested += outcome.invested;
        total_proceeds += outcome.proceeds;
        outcomes.push(outcome);
    }

    ComboMetrics {
        total_invested,
        total_proceeds,
        fund_moic: ratio_or_zero(total_proceeds, total_invested),
        fund_dpi: ratio_or_zero(total_proceeds, fund_size),
        company_outcomes: outcomes,
    }
}

fn resolution(pick: &ScenarioPick<'_>) -> ScenarioResolution {
    if pick.is_fallback() {
        ScenarioResolution::Fallback
    } else {
        ScenarioResolution::Exact
    }
}

fn build_result(
    name: &str,
    label: &str,
    description: &str,
    assignment: ScenarioAssignment,
    metrics: ComboMetrics,
) -> PortfolioScenarioResult {
    let return_attribution = attribute_returns(
        &metrics.company_outcomes,
        metrics.total_invested,
        metrics.total_proceeds,
    );
    PortfolioScenarioResult {
        scenario_name: name.to_string(),
        label: label.to_string(),
        description: description.to_string(),
        assignment,
        total_invested: metrics.total_invested,
        total_proceeds: metrics.total_proceeds,
        fund_moic: metrics.fund_moic,
        fund_dpi: metrics.fund_dpi,
        company_outcomes: metrics.company_outcomes,
        return_attribution,
    }
}

fn summarize(results: &[PortfolioScenarioResult]) -> ScenarioSummary {
    let best = results.iter().max_by(|a, b| a.fund_moic.cmp(&b.fund_moic));
    let worst = results.iter().min_by(|a, b| a.fund_moic.cmp(&b.fund_moic));
    match (best, worst) {
        (Some(best), Some(worst)) => ScenarioSummary {
            best_scenario: Some(best.scenario_name.clone()),
            best_fund_moic: best.fund_moic,
            worst_scenario: Some(worst.scenario_name.clone()),
            worst_fund_moic: worst.fund_moic,
            moic_spread: best.fund_moic - worst.fund_moic,
        },
        _ => ScenarioSummary::default(),
    }
}

// ---------------------------------------------------------------------------
// Main function
// ---------------------------------------------------------------------------

/// Model the four standard scenario combinations (plus a custom one when
/// requested) and roll each up to fund MOIC/DPI with return attribution.
pub fn model_fund_scenarios(
    ctx: &FundContext,
    request: &ScenarioRequest,
    config: &AnalysisConfig,
) -> FundModelResult<ComputationOutput<ScenarioModelOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let exit_multiplier = request
        .exit_multiplier
        .unwrap_or(config.default_exit_multiplier);
    if exit_multiplier <= Decimal::ZERO {
        return Err(FundModelError::InvalidInput {
            field: "exit_multiplier".into(),
            reason: "Exit multiplier must be positive".into(),
        });
    }

    let mut excluded: Vec<String> = Vec::new();
    let modeled: Vec<&CompanyContext> = ctx
        .companies
        .iter()
        .filter(|c| c.company.investment_amount > Decimal::ZERO)
        .filter(|c| {
            let has_table = c
                .cap_table
                .as_ref()
                .is_some_and(|t| !t.scenarios.is_empty());
            if !has_table {
                push_warning(
                    &mut warnings,
                    format!("{}: no scenario cap table; excluded from scenarios", c.company.name),
                );
                excluded.push(c.company.name.clone());
            }
            has_table
        })
        .collect();

    for c in &modeled {
        if c.analytics.is_none() {
            push_warning(
                &mut warnings,
                format!("{}: no analytics; current trajectory assumes base", c.company.name),
            );
        }
    }

    let mut scenarios: Vec<PortfolioScenarioResult> = Vec::with_capacity(5);
    for standard in StandardScenario::ALL {
        let assignment = standard.assign(&modeled, config);
        let metrics = fund_metrics_for_combo(
            &modeled,
            &assignment,
            exit_multiplier,
            ctx.fund.fund_size,
            config,
            &mut warnings,
        );
        scenarios.push(build_result(
            standard.name(),
            standard.label(),
            standard.description(),
            assignment,
            metrics,
        ));
    }

    if let Some(combo) = &request.custom_combo {
        for company_id in combo.keys() {
            if !modeled.iter().any(|c| &c.company.id == company_id) {
                push_warning(
                    &mut warnings,
                    format!("Custom combo references unknown or unmodeled company '{company_id}'"),
                );
            }
        }
        let assignment: ScenarioAssignment = modeled
            .iter()
            .map(|c| {
                let scenario = combo.get(&c.company.id).cloned().unwrap_or_else(|| BASE.into());
                (c.company.id.clone(), scenario)
            })
            .collect();
        let metrics = fund_metrics_for_combo(
            &modeled,
            &assignment,
            exit_multiplier,
            ctx.fund.fund_size,
            config,
            &mut warnings,
        );
        let label = request.custom_label.as_deref().unwrap_or("Custom");
        scenarios.push(build_result(
            "custom",
            label,
            "Caller-supplied company scenario combination",
            assignment,
            metrics,
        ));
    }

    let summary = summarize(&scenarios);
    let output = ScenarioModelOutput {
        fund_id: ctx.fund.id.clone(),
        fund_name: ctx.fund.name.clone(),
        fund_size: ctx.fund.fund_size,
        exit_multiplier,
        companies_modeled: modeled.len() as u32,
        companies_excluded: excluded,
        scenarios,
        summary,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Portfolio scenario combinations: nearest waterfall entry to valuation × exit multiplier",
        &serde_json::json!({
            "exit_multiplier": exit_multiplier.to_string(),
            "fallback_target_exit_value": config.fallback_target_exit_value.to_string(),
            "bridge_runway_months": config.bridge_runway_months.to_string(),
            "custom_combo": request.custom_combo.is_some(),
        }),
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
