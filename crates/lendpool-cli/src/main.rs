mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use log::LevelFilter;
use std::process;

use commands::helpers::{AbsorbArgs, SplitArgs, WriteOffArgs};
use commands::simulate::{SimulateArgs, SummaryArgs};

/// Pooled lending fund simulator
#[derive(Parser)]
#[command(
    name = "lendpool",
    version,
    about = "Pooled lending fund simulator",
    long_about = "Simulates a pooled lending fund day by day: unit pricing, repayment \
                  splitting, compounding rebidding loans, write-off absorption and \
                  monthly lender payouts, with decimal precision."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log engine events (loan creation, recovery, month close) to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario over its whole horizon
    Simulate(SimulateArgs),
    /// Fund summary and per-lender returns for a scenario
    Summary(SummaryArgs),
    /// Split one repayment into its four pool shares
    Split(SplitArgs),
    /// Run a write-off through the absorption waterfall
    Absorb(AbsorbArgs),
    /// Derive a defaulted borrower's write-off date and outstanding amount
    WriteOff(WriteOffArgs),
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
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Simulate(args) => commands::simulate::run_simulate(args),
        Commands::Summary(args) => commands::simulate::run_summary(args),
        Commands::Split(args) => commands::helpers::run_split(args),
        Commands::Absorb(args) => commands::helpers::run_absorb(args),
        Commands::WriteOff(args) => commands::helpers::run_write_off(args),
        Commands::Version => {
            println!("lendpool {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
