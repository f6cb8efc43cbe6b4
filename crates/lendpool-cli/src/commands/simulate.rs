use clap::{Args, ValueEnum};
use rust_decimal::Decimal;
use serde_json::{json, Value};

use lendpool_core::engine::{run_simulation, SimulationInput, SimulationResult};
use lendpool_core::nav::{NavMode, DEFAULT_MARGIN_REBIDDING_PCT};
use lendpool_core::report;

use crate::input;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum NavModeArg {
    MarginPool,
    MarginRebidding,
}

/// Which part of the run to print
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum View {
    /// Complete result with metadata
    Full,
    /// One row per simulated day
    Daily,
    /// One row per month close
    Payouts,
    /// Fund-level summary
    Summary,
}

/// Scenario source and overrides shared by `simulate` and `summary`
#[derive(Args)]
pub struct ScenarioArgs {
    /// Path to a JSON or YAML scenario file (stdin is read when omitted)
    #[arg(long)]
    pub input: Option<String>,

    /// Override the horizon length in 30-day months
    #[arg(long)]
    pub horizon_months: Option<u32>,

    /// Override the pricing mode
    #[arg(long, value_enum)]
    pub nav_mode: Option<NavModeArg>,

    /// Share of margin diverted in margin-rebidding mode (0-100)
    #[arg(long)]
    pub rebidding_pct: Option<Decimal>,
}

#[derive(Args)]
pub struct SimulateArgs {
    #[command(flatten)]
    pub scenario: ScenarioArgs,

    #[arg(long, value_enum, default_value = "full")]
    pub view: View,
}

#[derive(Args)]
pub struct SummaryArgs {
    #[command(flatten)]
    pub scenario: ScenarioArgs,
}

fn load_scenario(args: &ScenarioArgs) -> Result<SimulationInput, Box<dyn std::error::Error>> {
    let mut scenario: SimulationInput = if let Some(ref path) = args.input {
        input::file::read_scenario(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        data
    } else {
        return Err("--input <scenario.json|yaml> or stdin required".into());
    };

    if let Some(months) = args.horizon_months {
        scenario.config.horizon_months = months;
    }
    let current_pct = match scenario.config.nav_mode {
        NavMode::MarginRebidding { rebidding_pct } => rebidding_pct,
        NavMode::MarginPool => DEFAULT_MARGIN_REBIDDING_PCT,
    };
    match (args.nav_mode, args.rebidding_pct) {
        (Some(NavModeArg::MarginPool), _) => scenario.config.nav_mode = NavMode::MarginPool,
        (Some(NavModeArg::MarginRebidding), pct) => {
            scenario.config.nav_mode = NavMode::MarginRebidding {
                rebidding_pct: pct.unwrap_or(current_pct),
            }
        }
        (None, Some(pct)) => {
            if scenario.config.nav_mode.is_margin_rebidding() {
                scenario.config.nav_mode = NavMode::MarginRebidding { rebidding_pct: pct };
            } else {
                return Err("--rebidding-pct requires margin-rebidding mode".into());
            }
        }
        (None, None) => {}
    }
    Ok(scenario)
}

fn daily_rows(result: &SimulationResult) -> Value {
    let rows: Vec<Value> = result
        .daily
        .iter()
        .map(|s| {
            json!({
                "date": s.date,
                "unit_price": s.unit_price.round_dp(4),
                "total_units": s.total_units.round_dp(4),
                "aum": s.aum,
                "lender_margin": s.pools.lender_margin,
                "lender_principal": s.pools.lender_principal,
                "platform_provision": s.pools.platform_provision,
                "platform_revenue": s.pools.platform_revenue,
                "repaid_today": s.daily_repayments.total(),
                "active_loans": s.active_loans,
                "deficit": s.write_off_deficit,
                "recovery": s.recovery_mode,
            })
        })
        .collect();
    Value::Array(rows)
}

fn payout_rows(result: &SimulationResult) -> Value {
    let rows: Vec<Value> = result
        .monthly_payouts
        .iter()
        .map(|m| {
            json!({
                "date": m.date,
                "total_units": m.total_units.round_dp(4),
                "distributable": m.distributable,
                "distributed": m.distributed,
                "lenders_paid": m.payouts.iter().filter(|p| p.payout > Decimal::ZERO).count(),
                "write_off": m.write_off_amount,
                "absorbed": m.absorption.as_ref().map(|a| a.absorbed).unwrap_or_default(),
                "unabsorbed": m.absorption.as_ref().map(|a| a.unabsorbed).unwrap_or_default(),
                "recovery": m.recovery_mode,
                "recovery_funneled": m.recovery_funneled,
            })
        })
        .collect();
    Value::Array(rows)
}

pub fn run_simulate(args: SimulateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let scenario = load_scenario(&args.scenario)?;
    let output = run_simulation(&scenario)?;
    for w in &output.warnings {
        log::warn!("{w}");
    }

    let value = match args.view {
        View::Full => serde_json::to_value(&output)?,
        View::Daily => daily_rows(&output.result),
        View::Payouts => payout_rows(&output.result),
        View::Summary => json!({
            "result": report::summarize(&output.result),
            "warnings": output.warnings,
            "methodology": output.methodology,
        }),
    };
    Ok(value)
}

pub fn run_summary(args: SummaryArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let scenario = load_scenario(&args.scenario)?;
    let output = run_simulation(&scenario)?;
    let fund = report::fund_report(&output.result);
    Ok(json!({
        "result": fund.summary,
        "lenders": fund.lenders,
        "monthly_returns": report::monthly_return_rates(&output.result),
        "warnings": output.warnings,
        "methodology": output.methodology,
        "metadata": output.metadata,
    }))
}
