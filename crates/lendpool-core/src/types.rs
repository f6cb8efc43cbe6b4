use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// All monetary values in the single ledger unit. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Fund units (fungible ownership shares).
pub type Units = Decimal;

/// Rates expressed as decimals (0.05 = 5%). Percentages are named `_pct` and are 0..=100.
pub type Rate = Decimal;

/// Lender identifier as supplied by the caller
pub type LenderId = String;

/// Borrower identifier as supplied by the caller
pub type BorrowerId = String;

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}

/// Clamp a value that must never go negative (pools, deficit, AUM).
pub(crate) fn non_negative(value: Decimal) -> Decimal {
    value.max(Decimal::ZERO)
}
