pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::{Map, Value};

/// Row collections, in the order they are preferred as the "main" rows of a
/// result (scenario list, exit plans, obligations, ...).
const ROW_FIELDS: [&str; 8] = [
    "scenarios",
    "plans",
    "obligations",
    "company_metrics",
    "exit_sensitivity",
    "paths",
    "by_quarter",
    "ma_ladder",
];

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => json::print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// The `result` body of a computation envelope, or the value itself.
pub fn result_body(value: &Value) -> &Value {
    value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value)
}

/// Fields that render as a single cell.
pub fn scalar_fields(map: &Map<String, Value>) -> Vec<(&str, &Value)> {
    map.iter()
        .filter(|(_, v)| !v.is_object() && !is_row_array(v))
        .map(|(k, v)| (k.as_str(), v))
        .collect()
}

/// Named arrays of objects in `map`, in preferred order.
pub fn row_collections(map: &Map<String, Value>) -> Vec<(&str, &[Value])> {
    ROW_FIELDS
        .iter()
        .filter_map(|name| match map.get(*name) {
            Some(Value::Array(rows)) if rows.first().is_some_and(Value::is_object) => {
                Some((*name, rows.as_slice()))
            }
            _ => None,
        })
        .collect()
}

fn is_row_array(value: &Value) -> bool {
    matches!(value, Value::Array(rows) if rows.first().is_some_and(Value::is_object))
}

/// Column headers for a row collection: scalar keys of the first row.
pub fn row_headers(rows: &[Value]) -> Vec<String> {
    match rows.first() {
        Some(Value::Object(first)) => scalar_fields(first)
            .into_iter()
            .map(|(k, _)| k.to_string())
            .collect(),
        _ => Vec::new(),
    }
}

pub fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        Value::Array(arr) => arr.iter().map(format_value).collect::<Vec<_>>().join(", "),
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}
