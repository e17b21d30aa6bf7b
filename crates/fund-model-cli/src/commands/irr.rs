use std::time::Instant;

use chrono::NaiveDate;
use clap::Args;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use fund_model_core::time_value::{npv_dated, xirr};
use fund_model_core::types::{ratio_or_zero, with_metadata, CashFlow};

use super::{load_config, GlobalOpts};
use crate::input;

/// Arguments for XIRR on dated cash flows
#[derive(Args)]
pub struct IrrArgs {
    /// Path to JSON input file: {"cash_flows": [{"date", "amount"}], "guess": optional}
    #[arg(long)]
    pub input: Option<String>,

    /// Dated flows as date:amount (e.g. "2021-01-01:-100,2024-01-01:300")
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub flows: Option<Vec<String>>,

    /// Scale applied to amounts: units, thousands, millions, billions
    #[arg(long, default_value = "units")]
    pub units: String,

    /// Initial rate guess (default from config)
    #[arg(long)]
    pub guess: Option<Decimal>,
}

#[derive(Deserialize)]
struct IrrInput {
    cash_flows: Vec<CashFlow>,
    #[serde(default)]
    guess: Option<Decimal>,
}

#[derive(Debug, Serialize)]
struct IrrOutput {
    irr: Decimal,
    npv_at_irr: Decimal,
    num_flows: usize,
    first_date: Option<NaiveDate>,
    last_date: Option<NaiveDate>,
    total_invested: Decimal,
    total_returned: Decimal,
    moic: Decimal,
}

fn unit_scale(units: &str) -> Result<Decimal, Box<dyn std::error::Error>> {
    match units.to_lowercase().as_str() {
        "units" | "unit" => Ok(dec!(1)),
        "thousands" | "k" => Ok(dec!(1_000)),
        "millions" | "mm" | "m" => Ok(dec!(1_000_000)),
        "billions" | "bn" | "b" => Ok(dec!(1_000_000_000)),
        _ => Err(format!(
            "Unknown units '{}'. Use: units, thousands, millions, billions",
            units
        )
        .into()),
    }
}

fn parse_flow(spec: &str) -> Result<CashFlow, Box<dyn std::error::Error>> {
    let (date, amount) = spec
        .split_once(':')
        .ok_or_else(|| format!("Cash flow must be date:amount, got '{}'", spec))?;
    let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .map_err(|e| format!("Invalid date in '{}': {}", spec, e))?;
    Ok(CashFlow::new(date, amount.trim().parse()?))
}

pub fn run_irr(args: IrrArgs, opts: &GlobalOpts) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let config = load_config(opts.config.as_deref())?;

    let irr_input: IrrInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(flows) = args.flows {
        IrrInput {
            cash_flows: flows.iter().map(|f| parse_flow(f)).collect::<Result<_, _>>()?,
            guess: None,
        }
    } else if let Some(data) = input::stdin::read_stdin()? {
        data
    } else {
        return Err("--flows, --input <file.json> or stdin required".into());
    };

    let scale = unit_scale(&args.units)?;
    let flows: Vec<CashFlow> = irr_input
        .cash_flows
        .into_iter()
        .map(|mut cf| {
            cf.amount *= scale;
            cf
        })
        .collect();
    let guess = args.guess.or(irr_input.guess).unwrap_or(config.irr_seed);

    let irr = xirr(&flows, guess)?;
    let total_invested: Decimal = flows.iter().filter(|f| f.amount < Decimal::ZERO).map(|f| -f.amount).sum();
    let total_returned: Decimal = flows.iter().filter(|f| f.amount > Decimal::ZERO).map(|f| f.amount).sum();
    let output = IrrOutput {
        irr,
        npv_at_irr: npv_dated(irr, &flows)?,
        num_flows: flows.len(),
        first_date: flows.iter().map(|f| f.date).min(),
        last_date: flows.iter().map(|f| f.date).max(),
        total_invested,
        total_returned,
        moic: ratio_or_zero(total_returned, total_invested),
    };

    let result = with_metadata(
        "XIRR: Newton-Raphson on actual/365 dated cash flows",
        &serde_json::json!({ "guess": guess.to_string(), "units": args.units }),
        Vec::new(),
        start.elapsed().as_micros() as u64,
        output,
    );
    Ok(serde_json::to_value(result)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flow() {
        let cf = parse_flow("2021-01-01:-100").unwrap();
        assert_eq!(cf.date, NaiveDate::from_ymd_opt(2021, 1, 1).unwrap());
        assert_eq!(cf.amount, dec!(-100));
        assert!(parse_flow("2021-01-01").is_err());
        assert!(parse_flow("01/01/2021:-100").is_err());
    }

    #[test]
    fn test_unit_scale() {
        assert_eq!(unit_scale("MM").unwrap(), dec!(1_000_000));
        assert!(unit_scale("lakh").is_err());
    }
}
