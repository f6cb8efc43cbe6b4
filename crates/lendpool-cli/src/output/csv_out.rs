use serde_json::Value;
use std::io;

use super::{cell, headers};

/// Write output as CSV to stdout.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    let written = match value {
        Value::Array(rows) => write_rows(&mut wtr, rows),
        Value::Object(map) => match map.get("result") {
            Some(Value::Object(result)) => match result.get("daily") {
                Some(Value::Array(daily)) => write_rows(&mut wtr, daily),
                _ => write_fields(&mut wtr, result.iter()),
            },
            _ => write_fields(&mut wtr, map.iter()),
        },
        _ => wtr.write_record([cell(value)]),
    };

    if let Err(e) = written.and_then(|_| wtr.flush().map_err(csv::Error::from)) {
        log::error!("CSV write error: {e}");
    }
}

fn write_fields<'a, W, I>(wtr: &mut csv::Writer<W>, fields: I) -> csv::Result<()>
where
    W: io::Write,
    I: Iterator<Item = (&'a String, &'a Value)>,
{
    wtr.write_record(["field", "value"])?;
    for (key, val) in fields {
        wtr.write_record([key.as_str(), cell(val).as_str()])?;
    }
    Ok(())
}

fn write_rows<W: io::Write>(wtr: &mut csv::Writer<W>, rows: &[Value]) -> csv::Result<()> {
    let Some(headers) = headers(rows) else {
        for item in rows {
            wtr.write_record([cell(item)])?;
        }
        return Ok(());
    };

    wtr.write_record(&headers)?;
    for map in rows.iter().filter_map(Value::as_object) {
        let row: Vec<String> = headers
            .iter()
            .map(|h| map.get(h.as_str()).map(cell).unwrap_or_default())
            .collect();
        wtr.write_record(&row)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rows_to_csv() {
        let rows = vec![
            json!({"date": "2024-01-31", "distributed": "345000"}),
            json!({"date": "2024-02-29", "distributed": "315000"}),
        ];
        let mut wtr = csv::Writer::from_writer(Vec::new());
        write_rows(&mut wtr, &rows).unwrap();
        let out = String::from_utf8(wtr.into_inner().unwrap()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].contains("345000"));
    }
}
