//! Core data models for the risk predictor

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// A single scalar cell of client data
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureValue {
    Null,
    Number(f64),
    Text(String),
}

impl FeatureValue {
    /// Parse a raw text cell (CSV field, form value)
    ///
    /// Empty strings and the usual NA markers become `Null`, finite numbers
    /// become `Number`, everything else is kept as text.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if is_na_marker(trimmed) {
            return FeatureValue::Null;
        }
        match trimmed.parse::<f64>() {
            // Integers past 2^53 would be rounded by f64; keep their digits as written
            Ok(n) if n.is_finite() && !(is_integer_literal(trimmed) && n.abs() > MAX_EXACT_INTEGER) => {
                FeatureValue::Number(n)
            }
            _ => FeatureValue::Text(raw.to_string()),
        }
    }

    /// Convert a JSON scalar; arrays and objects are not valid cells
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(FeatureValue::Null),
            Value::Bool(b) => Some(FeatureValue::Number(if *b { 1.0 } else { 0.0 })),
            Value::Number(n) => n.as_f64().map(FeatureValue::Number),
            Value::String(s) => Some(FeatureValue::Text(s.clone())),
            Value::Array(_) | Value::Object(_) => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            FeatureValue::Null => Value::Null,
            FeatureValue::Number(n) => {
                if is_integral(*n) {
                    Value::from(*n as i64)
                } else {
                    serde_json::Number::from_f64(*n)
                        .map(Value::Number)
                        .unwrap_or(Value::Null)
                }
            }
            FeatureValue::Text(s) => Value::String(s.clone()),
        }
    }

    /// Numeric view of the cell; numeric-looking text is accepted
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FeatureValue::Number(n) => Some(*n),
            FeatureValue::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            FeatureValue::Null => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FeatureValue::Null)
    }
}

impl fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureValue::Null => Ok(()),
            FeatureValue::Number(n) if is_integral(*n) => write!(f, "{}", *n as i64),
            FeatureValue::Number(n) => write!(f, "{}", n),
            FeatureValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for FeatureValue {
    fn from(n: f64) -> Self {
        FeatureValue::Number(n)
    }
}

impl From<&str> for FeatureValue {
    fn from(s: &str) -> Self {
        FeatureValue::Text(s.to_string())
    }
}

impl From<String> for FeatureValue {
    fn from(s: String) -> Self {
        FeatureValue::Text(s)
    }
}

const NA_MARKERS: &[&str] = &["", "NA", "N/A", "NaN", "nan", "null", "NULL", "None"];

fn is_na_marker(s: &str) -> bool {
    NA_MARKERS.contains(&s)
}

/// Largest integer every f64 below it represents exactly (2^53)
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

fn is_integer_literal(s: &str) -> bool {
    let digits = s.strip_prefix(['-', '+']).unwrap_or(s);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

fn is_integral(n: f64) -> bool {
    n.fract() == 0.0 && n.abs() < 1e15
}

/// A single client's feature values, keyed by feature name
pub type ClientRecord = BTreeMap<String, FeatureValue>;

/// Build a record from a JSON object
///
/// Returns the offending key when a value is not a scalar.
pub fn record_from_json(object: &serde_json::Map<String, Value>) -> Result<ClientRecord, String> {
    object
        .iter()
        .map(|(key, value)| {
            FeatureValue::from_json(value)
                .map(|v| (key.clone(), v))
                .ok_or_else(|| key.clone())
        })
        .collect()
}

/// Risk class assigned by the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLabel {
    #[serde(rename = "At Risk")]
    AtRisk,
    #[serde(rename = "Low Risk")]
    LowRisk,
}

impl RiskLabel {
    pub fn from_class(class: u8) -> Self {
        if class == 1 {
            RiskLabel::AtRisk
        } else {
            RiskLabel::LowRisk
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLabel::AtRisk => "At Risk",
            RiskLabel::LowRisk => "Low Risk",
        }
    }
}

/// Single-client prediction response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub prediction_label: RiskLabel,
    pub prediction_value: u8,
    pub probability_percent: String,
    pub probability_float: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_cells() {
        assert_eq!(FeatureValue::parse("12"), FeatureValue::Number(12.0));
        assert_eq!(FeatureValue::parse(" 3.5 "), FeatureValue::Number(3.5));
        assert_eq!(FeatureValue::parse(""), FeatureValue::Null);
        assert_eq!(FeatureValue::parse("NaN"), FeatureValue::Null);
        assert_eq!(FeatureValue::parse("N/A"), FeatureValue::Null);
        assert_eq!(FeatureValue::parse("Premium"), FeatureValue::Text("Premium".into()));
        // "inf" parses as f64 but is not a usable feature value
        assert_eq!(FeatureValue::parse("inf"), FeatureValue::Text("inf".into()));
    }

    #[test]
    fn test_long_integers_keep_their_digits() {
        let id = FeatureValue::parse("12345678901234567");
        assert_eq!(id, FeatureValue::Text("12345678901234567".into()));
        assert_eq!(id.to_string(), "12345678901234567");
        assert_eq!(FeatureValue::parse("-12345678901234567").to_string(), "-12345678901234567");

        // Still exact as f64, so still numeric
        assert_eq!(
            FeatureValue::parse("9007199254740992"),
            FeatureValue::Number(9007199254740992.0)
        );
        assert_eq!(FeatureValue::parse("1e20"), FeatureValue::Number(1e20));
    }

    #[test]
    fn test_display_integral_numbers() {
        assert_eq!(FeatureValue::Number(5.0).to_string(), "5");
        assert_eq!(FeatureValue::Number(0.25).to_string(), "0.25");
        assert_eq!(FeatureValue::Null.to_string(), "");
    }

    #[test]
    fn test_record_from_json() {
        let body = json!({"Anciennete": 5, "Type_abonnement": "Premium", "Actif": true, "Note": null});
        let record = record_from_json(body.as_object().unwrap()).unwrap();
        assert_eq!(record["Anciennete"], FeatureValue::Number(5.0));
        assert_eq!(record["Actif"], FeatureValue::Number(1.0));
        assert!(record["Note"].is_null());

        let nested = json!({"Anciennete": [1, 2]});
        assert_eq!(record_from_json(nested.as_object().unwrap()), Err("Anciennete".to_string()));
    }

    #[test]
    fn test_as_f64_accepts_numeric_text() {
        assert_eq!(FeatureValue::Text("4.5".into()).as_f64(), Some(4.5));
        assert_eq!(FeatureValue::Text("PME".into()).as_f64(), None);
        assert_eq!(FeatureValue::Null.as_f64(), None);
    }

    #[test]
    fn test_label_serialization() {
        let result = PredictionResult {
            prediction_label: RiskLabel::from_class(1),
            prediction_value: 1,
            probability_percent: "87.00%".to_string(),
            probability_float: 0.87,
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["prediction_label"], "At Risk");
        assert_eq!(RiskLabel::from_class(0).as_str(), "Low Risk");
    }
}
