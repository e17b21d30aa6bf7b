use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates expressed as decimals (0.05 = 5%). Never as percentages.
pub type Rate = Decimal;

/// Percentages on a 0-100 scale (ownership, share of returns).
/// Divide by 100 explicitly before using as a fraction.
pub type Percent = Decimal;

/// Multiples (e.g., 3.0x MOIC, 8x ARR)
pub type Multiple = Decimal;

/// Year fractions or counts
pub type Years = Decimal;

/// A single dated cash flow. Investments are negative; distributions and
/// terminal NAV are positive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlow {
    pub date: NaiveDate,
    pub amount: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl CashFlow {
    pub fn new(date: NaiveDate, amount: Money) -> Self {
        CashFlow {
            date,
            amount,
            label: None,
        }
    }

    pub fn labelled(date: NaiveDate, amount: Money, label: impl Into<String>) -> Self {
        CashFlow {
            date,
            amount,
            label: Some(label.into()),
        }
    }
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    /// Set when the request could not be resolved (e.g. unknown fund); the
    /// `result` is then a zeroed record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub metadata: ComputationMetadata,
}

impl<T: Serialize> ComputationOutput<T> {
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

fn metadata(elapsed_us: u64) -> ComputationMetadata {
    ComputationMetadata {
        version: env!("CARGO_PKG_VERSION").to_string(),
        computation_time_us: elapsed_us,
        precision: "rust_decimal_128bit".to_string(),
    }
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
        error: None,
        metadata: metadata(elapsed_us),
    }
}

/// Explicit error record for an unresolvable request: zeroed result plus the
/// error message. Never used for missing optional data.
pub fn error_record<T: Serialize + Default>(methodology: &str, error: String) -> ComputationOutput<T> {
    log::warn!("{methodology}: {error}");
    ComputationOutput {
        result: T::default(),
        methodology: methodology.to_string(),
        assumptions: serde_json::Value::Null,
        warnings: Vec::new(),
        error: Some(error),
        metadata: metadata(0),
    }
}

/// Record a degradation: logged through the `log` facade and kept on the
/// output envelope so a partial answer can still be rendered.
pub fn push_warning(warnings: &mut Vec<String>, message: impl Into<String>) {
    let message = message.into();
    log::warn!("{message}");
    warnings.push(message);
}

/// `numerator / denominator`, or zero when the denominator is zero.
pub fn ratio_or_zero(numerator: Decimal, denominator: Decimal) -> Decimal {
    if denominator.is_zero() {
        Decimal::ZERO
    } else {
        numerator / denominator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_ratio_or_zero() {
        assert_eq!(ratio_or_zero(dec!(10), dec!(4)), dec!(2.5));
        assert_eq!(ratio_or_zero(dec!(10), Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn test_error_record_is_zeroed() {
        let out: ComputationOutput<Vec<u32>> = error_record("Test", "Fund not found: f1".into());
        assert!(out.is_error());
        assert!(out.result.is_empty());
        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["error"], "Fund not found: f1");
    }

    #[test]
    fn test_error_field_omitted_on_success() {
        let out = with_metadata("Test", &serde_json::json!({}), vec![], 0, 1u32);
        let json = serde_json::to_value(&out).unwrap();
        assert!(json.get("error").is_none());
    }
}
