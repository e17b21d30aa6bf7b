use clap::Args;
use serde_json::Value;

use super::{build_analyzer, load_dataset, resolve_fund_id, FundArgs, GlobalOpts};

/// Arguments for fund metrics
#[derive(Args)]
pub struct MetricsArgs {
    #[command(flatten)]
    pub fund: FundArgs,

    /// Drop the per-company breakdown from the output
    #[arg(long)]
    pub summary_only: bool,
}

pub fn run_metrics(args: MetricsArgs, opts: &GlobalOpts) -> Result<Value, Box<dyn std::error::Error>> {
    let dataset = load_dataset(&args.fund)?;
    let fund_id = resolve_fund_id(&args.fund, &dataset)?;
    let analyzer = build_analyzer(&dataset, opts)?;

    let mut result = analyzer.calculate_fund_metrics(&fund_id)?;
    if args.summary_only {
        result.result.company_metrics.clear();
    }
    Ok(serde_json::to_value(result)?)
}
