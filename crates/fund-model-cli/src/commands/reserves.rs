use serde_json::Value;

use super::{build_analyzer, load_dataset, resolve_fund_id, FundArgs, GlobalOpts};

pub fn run_reserves(args: FundArgs, opts: &GlobalOpts) -> Result<Value, Box<dyn std::error::Error>> {
    let dataset = load_dataset(&args)?;
    let fund_id = resolve_fund_id(&args, &dataset)?;
    let analyzer = build_analyzer(&dataset, opts)?;

    let result = analyzer.forecast_reserves(&fund_id)?;
    if result.result.has_shortfall {
        tracing::info!(
            fund_id = %fund_id,
            shortfall = %result.result.shortfall,
            "reserve shortfall"
        );
    }
    Ok(serde_json::to_value(result)?)
}
