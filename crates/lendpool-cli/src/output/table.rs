use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::{cell, headers};

/// Format output as tables using the tabled crate.
///
/// Arrays of rows (daily and payout views) print as one wide table. An
/// envelope prints its `result` as field/value pairs, followed by any
/// `lenders` rows, warnings and methodology.
pub fn print_table(value: &Value) {
    match value {
        Value::Array(rows) => print_rows(rows),
        Value::Object(map) => match map.get("result") {
            Some(Value::Object(result)) => print_envelope(result, map),
            _ => print_fields(map),
        },
        _ => println!("{value}"),
    }
}

fn print_envelope(result: &Map<String, Value>, envelope: &Map<String, Value>) {
    // the full simulation result is too wide for field/value rows
    if let Some(Value::Array(daily)) = result.get("daily") {
        print_rows(daily);
    } else {
        print_fields(result);
    }

    if let Some(Value::Array(lenders)) = envelope.get("lenders") {
        println!("\nLenders:");
        print_rows(lenders);
    }

    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings.iter().filter_map(Value::as_str) {
                println!("  - {w}");
            }
        }
    }

    if let Some(Value::String(methodology)) = envelope.get("methodology") {
        println!("\nMethodology: {methodology}");
    }
}

fn print_fields(map: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in map {
        builder.push_record([key.as_str(), cell(val).as_str()]);
    }
    println!("{}", Table::from(builder));
}

fn print_rows(rows: &[Value]) {
    if rows.is_empty() {
        println!("(empty)");
        return;
    }

    let Some(headers) = headers(rows) else {
        for item in rows {
            println!("{}", cell(item));
        }
        return;
    };

    let mut builder = Builder::default();
    builder.push_record(&headers);
    for map in rows.iter().filter_map(Value::as_object) {
        let row: Vec<String> = headers
            .iter()
            .map(|h| map.get(h.as_str()).map(cell).unwrap_or_default())
            .collect();
        builder.push_record(row);
    }
    println!("{}", Table::from(builder));
}
