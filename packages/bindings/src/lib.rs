use napi::Result as NapiResult;
use napi_derive::napi;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use lendpool_core::borrower;
use lendpool_core::engine::{self, SimulationInput};
use lendpool_core::loan::LoanInput;
use lendpool_core::pools::absorption::{self, AbsorptionResult};
use lendpool_core::pools::{splitter, PoolAmounts};
use lendpool_core::report;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

#[napi]
pub fn simulate(input_json: String) -> NapiResult<String> {
    let input: SimulationInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = engine::run_simulation(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[derive(Serialize)]
struct SummaryOutput {
    report: report::FundReport,
    monthly_returns: Vec<report::MonthlyReturnRate>,
    warnings: Vec<String>,
}

#[napi]
pub fn summarize(input_json: String) -> NapiResult<String> {
    let input: SimulationInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = engine::run_simulation(&input).map_err(to_napi_error)?;
    let summary = SummaryOutput {
        report: report::fund_report(&output.result),
        monthly_returns: report::monthly_return_rates(&output.result),
        warnings: output.warnings,
    };
    serde_json::to_string(&summary).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Pure helpers
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct SplitInput {
    amount: Decimal,
    #[serde(default)]
    split: splitter::RepaymentSplit,
}

#[napi]
pub fn split_repayment(input_json: String) -> NapiResult<String> {
    let input: SplitInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let shares: PoolAmounts = input.split.split(input.amount);
    serde_json::to_string(&shares).map_err(to_napi_error)
}

#[derive(Deserialize)]
struct AbsorbInput {
    pools: PoolAmounts,
    write_off: Decimal,
}

#[napi]
pub fn absorb_write_off(input_json: String) -> NapiResult<String> {
    let input: AbsorbInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let result: AbsorptionResult = absorption::absorb_write_off(&input.pools, input.write_off);
    serde_json::to_string(&result).map_err(to_napi_error)
}

#[napi]
pub fn derive_write_off(input_json: String) -> NapiResult<String> {
    let loan: LoanInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let write_off = borrower::derive_write_off(&loan)
        .ok_or_else(|| to_napi_error("Loan has no stop date; nothing to write off"))?;
    serde_json::to_string(&write_off).map_err(to_napi_error)
}
