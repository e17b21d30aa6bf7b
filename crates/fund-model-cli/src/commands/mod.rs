pub mod exits;
pub mod follow_on;
pub mod irr;
pub mod metrics;
pub mod pacing;
pub mod reserves;
pub mod scenarios;

use chrono::NaiveDate;
use clap::Args;

use fund_model_core::portfolio::PortfolioDataset;
use fund_model_core::{AnalysisConfig, FundAnalyzer};

use crate::input;

/// Flags shared by every command.
pub struct GlobalOpts {
    pub config: Option<String>,
    pub as_of: Option<NaiveDate>,
}

/// Portfolio dataset selection shared by the fund commands
#[derive(Args)]
pub struct FundArgs {
    /// Path to JSON portfolio dataset (funds, analytics, cap_tables); stdin if omitted
    #[arg(long)]
    pub input: Option<String>,

    /// Fund to analyze (defaults to the only fund in the dataset)
    #[arg(long)]
    pub fund_id: Option<String>,
}

pub fn load_dataset(args: &FundArgs) -> Result<PortfolioDataset, Box<dyn std::error::Error>> {
    if let Some(ref path) = args.input {
        input::file::read_json(path)
    } else if let Some(dataset) = input::stdin::read_stdin()? {
        Ok(dataset)
    } else {
        Err("--input <dataset.json> or stdin required".into())
    }
}

pub fn resolve_fund_id(
    args: &FundArgs,
    dataset: &PortfolioDataset,
) -> Result<String, Box<dyn std::error::Error>> {
    match (&args.fund_id, dataset.sole_fund_id()) {
        (Some(id), _) => Ok(id.clone()),
        (None, Some(id)) => Ok(id.to_string()),
        (None, None) => Err(format!(
            "--fund-id is required when the dataset holds {} funds",
            dataset.funds.len()
        )
        .into()),
    }
}

/// `AnalysisConfig` from a YAML or JSON file; defaults when no file is given.
pub fn load_config(path: Option<&str>) -> Result<AnalysisConfig, Box<dyn std::error::Error>> {
    let Some(path) = path else {
        return Ok(AnalysisConfig::default());
    };
    let config: AnalysisConfig = input::file::read_structured(path)?;
    tracing::debug!(path, "loaded analysis config");
    Ok(config)
}

pub fn build_analyzer<'a>(
    dataset: &'a PortfolioDataset,
    opts: &GlobalOpts,
) -> Result<FundAnalyzer<'a>, Box<dyn std::error::Error>> {
    let config = load_config(opts.config.as_deref())?;
    let analyzer = FundAnalyzer::for_dataset(dataset, config)?;
    Ok(match opts.as_of {
        Some(as_of) => analyzer.with_as_of(as_of),
        None => analyzer,
    })
}
