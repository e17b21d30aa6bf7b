use clap::Args;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use fund_model_core::portfolio::ScenarioAssignment;
use fund_model_core::scenarios::combinator::ScenarioRequest;
use fund_model_core::scenarios::tree::ScenarioTreePath;

use super::{build_analyzer, load_dataset, resolve_fund_id, FundArgs, GlobalOpts};
use crate::input;

/// Arguments for portfolio scenario combinations
#[derive(Args)]
pub struct ScenariosArgs {
    #[command(flatten)]
    pub fund: FundArgs,

    /// Exit target as a multiple of current valuation (default from config)
    #[arg(long)]
    pub exit_multiplier: Option<Decimal>,

    /// Custom combination as company_id=scenario pairs (e.g. "acme=bridge,globex=outperform")
    #[arg(long, value_delimiter = ',')]
    pub combo: Option<Vec<String>>,

    /// Label for the custom combination
    #[arg(long)]
    pub label: Option<String>,
}

fn parse_combo(pairs: &[String]) -> Result<ScenarioAssignment, Box<dyn std::error::Error>> {
    pairs
        .iter()
        .map(|pair| match pair.split_once('=') {
            Some((company, scenario)) if !company.trim().is_empty() && !scenario.trim().is_empty() => {
                Ok((company.trim().to_string(), scenario.trim().to_string()))
            }
            _ => Err(format!("Combo entries must be company_id=scenario, got '{}'", pair).into()),
        })
        .collect()
}

pub fn run_scenarios(args: ScenariosArgs, opts: &GlobalOpts) -> Result<Value, Box<dyn std::error::Error>> {
    let dataset = load_dataset(&args.fund)?;
    let fund_id = resolve_fund_id(&args.fund, &dataset)?;
    let analyzer = build_analyzer(&dataset, opts)?;

    let request = ScenarioRequest {
        custom_combo: args.combo.as_deref().map(parse_combo).transpose()?,
        custom_label: args.label,
        exit_multiplier: args.exit_multiplier,
    };
    let result = analyzer.model_fund_scenarios(&fund_id, &request)?;
    Ok(serde_json::to_value(result)?)
}

/// Arguments for evaluating a scenario tree against the fund
#[derive(Args)]
pub struct ScenarioTreeArgs {
    #[command(flatten)]
    pub fund: FundArgs,

    /// Path to JSON file with the tree: {"paths": [...], "total_invested": optional}
    #[arg(long)]
    pub tree: String,

    /// Override combined invested capital used for TVPI
    #[arg(long)]
    pub total_invested: Option<Decimal>,
}

#[derive(Deserialize)]
struct TreeFile {
    paths: Vec<ScenarioTreePath>,
    #[serde(default)]
    total_invested: Option<Decimal>,
}

pub fn run_scenario_tree(args: ScenarioTreeArgs, opts: &GlobalOpts) -> Result<Value, Box<dyn std::error::Error>> {
    let dataset = load_dataset(&args.fund)?;
    let fund_id = resolve_fund_id(&args.fund, &dataset)?;
    let analyzer = build_analyzer(&dataset, opts)?;

    let tree: TreeFile = input::file::read_json(&args.tree)?;
    let total_invested = args.total_invested.or(tree.total_invested);
    let result = analyzer.evaluate_scenario_tree_on_fund(&fund_id, tree.paths, total_invested)?;
    Ok(serde_json::to_value(result)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_combo() {
        let combo = parse_combo(&["acme=bridge".into(), " globex = outperform ".into()]).unwrap();
        assert_eq!(combo["acme"], "bridge");
        assert_eq!(combo["globex"], "outperform");
        assert!(parse_combo(&["acme".into()]).is_err());
        assert!(parse_combo(&["=base".into()]).is_err());
    }
}
