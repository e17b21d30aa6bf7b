use clap::Args;
use serde_json::Value;

use super::{build_analyzer, load_dataset, resolve_fund_id, FundArgs, GlobalOpts};

/// Arguments for follow-on analysis
#[derive(Args)]
pub struct FollowOnArgs {
    #[command(flatten)]
    pub fund: FundArgs,

    /// Portfolio company to analyze
    #[arg(long)]
    pub company_id: String,
}

pub fn run_follow_on(args: FollowOnArgs, opts: &GlobalOpts) -> Result<Value, Box<dyn std::error::Error>> {
    let dataset = load_dataset(&args.fund)?;
    let fund_id = resolve_fund_id(&args.fund, &dataset)?;
    let analyzer = build_analyzer(&dataset, opts)?;

    let result = analyzer.analyze_follow_on(&fund_id, &args.company_id)?;
    Ok(serde_json::to_value(result)?)
}
