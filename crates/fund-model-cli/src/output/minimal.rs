use serde_json::Value;

use super::{format_value, result_body};

/// Headline figure per command, first match wins. Dotted keys descend into
/// nested records.
const HEADLINE_KEYS: [&str; 10] = [
    "irr",
    "tvpi",
    "summary.best_fund_moic",
    "expected_fund_tvpi",
    "breakeven_exit_multiple",
    "shortfall",
    "summary.total_secondary_proceeds",
    "status",
    "moic",
    "fund_moic",
];

/// Print just the headline value, or the error of an error record.
pub fn print_minimal(value: &Value) {
    if let Some(Value::String(error)) = value.get("error") {
        println!("error: {}", error);
        return;
    }

    let body = result_body(value);
    if let Some(found) = HEADLINE_KEYS.iter().find_map(|key| lookup(body, key)) {
        println!("{}", format_value(found));
        return;
    }

    match body.as_object().and_then(|m| m.iter().next()) {
        Some((key, val)) => println!("{}: {}", key, format_value(val)),
        None => println!("{}", format_value(body)),
    }
}

fn lookup<'a>(body: &'a Value, dotted: &str) -> Option<&'a Value> {
    dotted
        .split('.')
        .try_fold(body, |v, key| v.get(key))
        .filter(|v| !v.is_null())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lookup_descends_and_skips_null() {
        let body = json!({"summary": {"best_fund_moic": "2.4"}, "breakeven_exit_multiple": null});
        assert_eq!(lookup(&body, "summary.best_fund_moic"), Some(&json!("2.4")));
        assert_eq!(lookup(&body, "breakeven_exit_multiple"), None);
        assert_eq!(lookup(&body, "irr"), None);
    }
}
