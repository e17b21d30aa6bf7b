use serde_json::Value;
use std::io;

use super::{format_value, result_body, row_collections, row_headers, scalar_fields};

/// Write the result's main row collection as CSV, or field/value pairs when
/// the result has none.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    let body = result_body(value);
    let outcome = match body {
        Value::Object(map) => match row_collections(map).first() {
            Some((_, rows)) => write_rows(&mut wtr, rows),
            None => write_fields(&mut wtr, scalar_fields(map)),
        },
        Value::Array(rows) => write_rows(&mut wtr, rows),
        _ => wtr.write_record([format_value(body)]),
    };

    if let Err(e) = outcome.and_then(|_| wtr.flush().map_err(csv::Error::from)) {
        tracing::error!(error = %e, "failed to write CSV");
    }
}

fn write_rows<W: io::Write>(wtr: &mut csv::Writer<W>, rows: &[Value]) -> csv::Result<()> {
    let headers = row_headers(rows);
    if headers.is_empty() {
        return Ok(());
    }
    wtr.write_record(&headers)?;
    for row in rows {
        if let Value::Object(map) = row {
            wtr.write_record(
                headers
                    .iter()
                    .map(|h| map.get(h).map(format_value).unwrap_or_default()),
            )?;
        }
    }
    Ok(())
}

fn write_fields<W: io::Write>(wtr: &mut csv::Writer<W>, fields: Vec<(&str, &Value)>) -> csv::Result<()> {
    wtr.write_record(["field", "value"])?;
    for (key, val) in fields {
        wtr.write_record([key, format_value(val).as_str()])?;
    }
    Ok(())
}
