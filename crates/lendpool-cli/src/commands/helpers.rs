use chrono::NaiveDate;
use clap::{Args, ValueEnum};
use rust_decimal::Decimal;
use serde_json::{json, Value};

use lendpool_core::borrower::{self, derive_write_off};
use lendpool_core::loan::{LoanInput, RepaymentSchedule, DEFAULT_LOAN_PRINCIPAL};
use lendpool_core::pools::absorption::{absorb_write_off, absorption_capacity};
use lendpool_core::pools::splitter::split_repayment;
use lendpool_core::pools::PoolAmounts;

use crate::input;

/// Arguments for splitting one repayment
#[derive(Args)]
pub struct SplitArgs {
    /// Repayment amount
    #[arg(long)]
    pub amount: Decimal,
}

pub fn run_split(args: SplitArgs) -> Result<Value, Box<dyn std::error::Error>> {
    if args.amount < Decimal::ZERO {
        return Err("--amount cannot be negative".into());
    }
    let shares = split_repayment(args.amount);
    Ok(json!({
        "amount": args.amount,
        "lender_principal": shares.lender_principal,
        "lender_margin": shares.lender_margin,
        "platform_revenue": shares.platform_revenue,
        "platform_provision": shares.platform_provision,
    }))
}

/// Arguments for the write-off absorption waterfall
#[derive(Args)]
pub struct AbsorbArgs {
    /// Path to a JSON or YAML file holding the four pool balances
    #[arg(long)]
    pub input: Option<String>,

    /// Write-off amount to absorb
    #[arg(long)]
    pub write_off: Decimal,

    #[arg(long)]
    pub lender_margin: Option<Decimal>,

    #[arg(long)]
    pub platform_provision: Option<Decimal>,

    #[arg(long)]
    pub platform_revenue: Option<Decimal>,

    /// Principal awaiting rebidding
    #[arg(long)]
    pub lender_principal: Option<Decimal>,
}

pub fn run_absorb(args: AbsorbArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let pools: PoolAmounts = if let Some(ref path) = args.input {
        input::file::read_scenario(path)?
    } else {
        PoolAmounts {
            lender_margin: args.lender_margin.unwrap_or_default(),
            lender_principal: args.lender_principal.unwrap_or_default(),
            platform_provision: args.platform_provision.unwrap_or_default(),
            platform_revenue: args.platform_revenue.unwrap_or_default(),
        }
    };
    if args.write_off < Decimal::ZERO {
        return Err("--write-off cannot be negative".into());
    }

    let result = absorb_write_off(&pools, args.write_off);
    Ok(json!({
        "result": {
            "write_off": args.write_off,
            "capacity": absorption_capacity(&pools),
            "total_absorbed": result.total_absorbed,
            "unabsorbed": result.unabsorbed,
            "margin_wiped_out": result.margin_wiped_out,
            "lender_margin": result.pools.lender_margin,
            "platform_provision": result.pools.platform_provision,
            "platform_revenue": result.pools.platform_revenue,
            "lender_principal": result.pools.lender_principal,
        },
        "absorbed": result.absorbed,
    }))
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ScheduleArg {
    Daily,
    Weekly,
}

impl From<ScheduleArg> for RepaymentSchedule {
    fn from(arg: ScheduleArg) -> Self {
        match arg {
            ScheduleArg::Daily => RepaymentSchedule::Daily,
            ScheduleArg::Weekly => RepaymentSchedule::Weekly,
        }
    }
}

/// Arguments for deriving one borrower's write-off
#[derive(Args)]
pub struct WriteOffArgs {
    /// Loan start date (YYYY-MM-DD)
    #[arg(long)]
    pub start_date: NaiveDate,

    /// Date repayments stopped (YYYY-MM-DD)
    #[arg(long)]
    pub stop_date: NaiveDate,

    #[arg(long, value_enum, default_value = "weekly")]
    pub schedule: ScheduleArg,

    /// Fixed installment amount
    #[arg(long)]
    pub installment: Decimal,

    #[arg(long, default_value_t = DEFAULT_LOAN_PRINCIPAL)]
    pub principal: Decimal,

    #[arg(long, default_value = "borrower")]
    pub borrower_id: String,
}

pub fn run_write_off(args: WriteOffArgs) -> Result<Value, Box<dyn std::error::Error>> {
    if args.stop_date < args.start_date {
        return Err("--stop-date cannot precede --start-date".into());
    }
    if args.installment <= Decimal::ZERO {
        return Err("--installment must be positive".into());
    }
    let loan = LoanInput {
        borrower_id: args.borrower_id,
        schedule: args.schedule.into(),
        start_date: args.start_date,
        installment_amount: args.installment,
        principal: args.principal,
        stop_date: Some(args.stop_date),
    };
    let write_off = derive_write_off(&loan).ok_or("Write-off date is outside the supported calendar")?;
    let paid = borrower::count_installments(loan.start_date, loan.schedule, args.stop_date)
        .min(borrower::max_installments(loan.principal, loan.installment_amount));

    Ok(json!({
        "result": {
            "borrower_id": write_off.borrower_id,
            "stop_date": write_off.stop_date,
            "write_off_date": write_off.write_off_date,
            "installments_paid": paid,
            "outstanding": write_off.outstanding,
        }
    }))
}
