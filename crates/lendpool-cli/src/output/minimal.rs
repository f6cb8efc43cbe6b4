use serde_json::Value;

use super::cell;

/// Fields that answer each command, in priority order.
const PRIORITY_KEYS: [&str; 6] = [
    "final_unit_price",
    "unit_price",
    "outstanding",
    "unabsorbed",
    "distributed",
    "lender_principal",
];

/// Print just the key answer value from the output: the first priority
/// field of the result, or of the last row for row output.
pub fn print_minimal(value: &Value) {
    let target = match value {
        Value::Array(rows) => rows.last().unwrap_or(value),
        Value::Object(map) => map.get("result").unwrap_or(value),
        _ => value,
    };
    // the full result carries its prices in the daily rows
    let target = match target.get("daily").and_then(Value::as_array) {
        Some(daily) => daily.last().unwrap_or(target),
        None => target,
    };
    println!("{}", pick(target));
}

fn pick(value: &Value) -> String {
    let Value::Object(map) = value else {
        return cell(value);
    };
    for key in PRIORITY_KEYS {
        if let Some(val) = map.get(key).filter(|v| !v.is_null()) {
            return cell(val);
        }
    }
    match map.iter().next() {
        Some((key, val)) => format!("{key}: {}", cell(val)),
        None => String::new(),
    }
}
