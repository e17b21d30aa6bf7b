mod commands;
mod input;
mod output;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

use commands::exits::ExitsArgs;
use commands::follow_on::FollowOnArgs;
use commands::irr::IrrArgs;
use commands::metrics::MetricsArgs;
use commands::scenarios::{ScenarioTreeArgs, ScenariosArgs};
use commands::{FundArgs, GlobalOpts};

/// Venture fund return modeling and scenario engine
#[derive(Parser)]
#[command(
    name = "fundm",
    version,
    about = "Venture fund return modeling and scenario engine",
    long_about = "A CLI for modeling venture fund returns with decimal precision. \
                  Computes fund metrics (DPI, TVPI, XIRR), portfolio scenario \
                  combinations with return attribution, follow-on and reserve \
                  forecasts, exit plans, and deployment pacing from a JSON \
                  portfolio dataset."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Analysis config overrides (YAML or JSON)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Valuation date, YYYY-MM-DD (defaults to today)
    #[arg(long, global = true)]
    as_of: Option<NaiveDate>,

    /// Log at info level (RUST_LOG takes precedence)
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// XIRR on dated cash flows
    Irr(IrrArgs),
    /// Fund NAV, DPI, TVPI, RVPI, IRR and deployment
    Metrics(MetricsArgs),
    /// Standard and custom portfolio scenario combinations with attribution
    Scenarios(ScenariosArgs),
    /// Evaluate a scenario tree against the whole fund
    ScenarioTree(ScenarioTreeArgs),
    /// Pro-rata follow-on analysis for one company
    FollowOn(FollowOnArgs),
    /// Quarterly reserve obligations vs. available capital
    Reserves(FundArgs),
    /// Exit routes and hold-vs-sell recommendations
    Exits(ExitsArgs),
    /// Deployment pacing vs. the ideal schedule
    Pacing(FundArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let opts = GlobalOpts {
        config: cli.config,
        as_of: cli.as_of,
    };

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Irr(args) => commands::irr::run_irr(args, &opts),
        Commands::Metrics(args) => commands::metrics::run_metrics(args, &opts),
        Commands::Scenarios(args) => commands::scenarios::run_scenarios(args, &opts),
        Commands::ScenarioTree(args) => commands::scenarios::run_scenario_tree(args, &opts),
        Commands::FollowOn(args) => commands::follow_on::run_follow_on(args, &opts),
        Commands::Reserves(args) => commands::reserves::run_reserves(args, &opts),
        Commands::Exits(args) => commands::exits::run_exits(args, &opts),
        Commands::Pacing(args) => commands::pacing::run_pacing(args, &opts),
        Commands::Version => {
            println!("fundm {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            let failed = value.get("error").is_some_and(|e| !e.is_null());
            process::exit(if failed { 2 } else { 0 });
        }
        Err(e) => {
            tracing::debug!(error = %e, "command failed");
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
