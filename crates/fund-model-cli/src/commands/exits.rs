use clap::Args;
use serde_json::Value;

use fund_model_core::exits::planner::ExitRecommendation;

use super::{build_analyzer, load_dataset, resolve_fund_id, FundArgs, GlobalOpts};

/// Arguments for exit planning
#[derive(Args)]
pub struct ExitsArgs {
    #[command(flatten)]
    pub fund: FundArgs,

    /// Only list companies where a secondary sale is worth considering
    #[arg(long)]
    pub secondary_only: bool,
}

pub fn run_exits(args: ExitsArgs, opts: &GlobalOpts) -> Result<Value, Box<dyn std::error::Error>> {
    let dataset = load_dataset(&args.fund)?;
    let fund_id = resolve_fund_id(&args.fund, &dataset)?;
    let analyzer = build_analyzer(&dataset, opts)?;

    let mut result = analyzer.plan_exits(&fund_id)?;
    if args.secondary_only {
        result
            .result
            .plans
            .retain(|p| p.hold_vs_sell.recommendation == ExitRecommendation::ConsiderSecondary);
    }
    Ok(serde_json::to_value(result)?)
}
