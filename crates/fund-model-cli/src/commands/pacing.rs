use serde_json::Value;

use super::{build_analyzer, load_dataset, resolve_fund_id, FundArgs, GlobalOpts};

pub fn run_pacing(args: FundArgs, opts: &GlobalOpts) -> Result<Value, Box<dyn std::error::Error>> {
    let dataset = load_dataset(&args)?;
    let fund_id = resolve_fund_id(&args, &dataset)?;
    let analyzer = build_analyzer(&dataset, opts)?;

    let result = analyzer.analyze_pacing(&fund_id)?;
    Ok(serde_json::to_value(result)?)
}
