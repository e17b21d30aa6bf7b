use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::{format_value, result_body, row_collections, row_headers, scalar_fields};

/// Headline fields as a Field/Value table, then one table per row
/// collection, then warnings and methodology from the envelope.
pub fn print_table(value: &Value) {
    let body = result_body(value);
    match body {
        Value::Object(map) => print_object(map),
        Value::Array(rows) => print_rows(rows),
        _ => println!("{}", format_value(body)),
    }

    if let Value::Object(envelope) = value {
        print_envelope(envelope);
    }
}

fn print_object(map: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in scalar_fields(map) {
        builder.push_record([key, format_value(val).as_str()]);
    }
    // Nested records such as `summary` or `pro_rata` flatten one level.
    for (key, val) in map {
        if let Value::Object(inner) = val {
            for (inner_key, inner_val) in scalar_fields(inner) {
                builder.push_record([format!("{key}.{inner_key}"), format_value(inner_val)]);
            }
        }
    }
    println!("{}", Table::from(builder));

    for (name, rows) in row_collections(map) {
        println!("\n{name}:");
        print_rows(rows);
    }
}

fn print_rows(rows: &[Value]) {
    if rows.is_empty() {
        println!("(empty)");
        return;
    }
    let headers = row_headers(rows);
    let mut builder = Builder::default();
    builder.push_record(headers.iter().map(String::as_str));
    for row in rows {
        if let Value::Object(map) = row {
            builder.push_record(
                headers
                    .iter()
                    .map(|h| map.get(h).map(format_value).unwrap_or_default()),
            );
        }
    }
    println!("{}", Table::from(builder));
}

fn print_envelope(envelope: &Map<String, Value>) {
    if let Some(Value::String(error)) = envelope.get("error") {
        println!("\nError: {}", error);
    }

    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings.iter().filter_map(Value::as_str) {
                println!("  - {}", w);
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}
