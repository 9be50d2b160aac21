//! Feature extraction for the risk and trend models.

use crate::domain::model::FeatureVector;
use serde_json::{Map, Value};

const SEVERITY_MAP: &[(&str, f64)] = &[
    ("low", 1.0),
    ("medium", 2.0),
    ("high", 3.0),
    ("critical", 4.0),
];

const LOCATION_RISK_MAP: &[(&str, f64)] = &[
    ("highway", 3.0),
    ("urban", 2.0),
    ("rural", 1.0),
    ("residential", 2.0),
];

/// 查表失敗時的預設值 (中等嚴重度、中等地點風險)
const DEFAULT_LOOKUP_VALUE: f64 = 2.0;

pub const DEFAULT_RISK_FEATURES: [f64; 2] = [DEFAULT_LOOKUP_VALUE, DEFAULT_LOOKUP_VALUE];

/// 趨勢特徵的讀取順序，缺少的欄位直接略過
pub const TREND_FIELDS: [&str; 3] = ["count", "average_severity", "growth_rate"];

const NORMALIZE_EPSILON: f64 = 1e-8;

pub struct FeatureExtractor;

impl FeatureExtractor {
    /// 風險特徵 `[severity_value, location_risk_value]`，只忽略大小寫，查不到的值一律以 2.0 代替
    pub fn extract_risk_features(location: &str, severity: &str) -> FeatureVector {
        let severity_value = Self::severity_value(severity);
        let location_risk = Self::location_risk_value(location);

        let features = vec![severity_value, location_risk];
        tracing::debug!("Extracted risk features: {:?}", features);
        features
    }

    pub fn severity_value(severity: &str) -> f64 {
        lookup(SEVERITY_MAP, severity)
    }

    pub fn location_risk_value(location: &str) -> f64 {
        lookup(LOCATION_RISK_MAP, location)
    }

    /// 依 `count`、`average_severity`、`growth_rate` 的順序讀取，長度不固定
    ///
    /// 任何欄位無法轉成有限數值時回傳空向量。
    pub fn extract_trend_features(data: &Map<String, Value>) -> FeatureVector {
        let mut features = Vec::with_capacity(TREND_FIELDS.len());

        for field in TREND_FIELDS {
            let Some(value) = data.get(field) else {
                continue;
            };
            match numeric_value(value) {
                Some(number) => features.push(number),
                None => {
                    tracing::error!(
                        "Error extracting trend features: field '{}' is not numeric ({})",
                        field,
                        value
                    );
                    return Vec::new();
                }
            }
        }

        tracing::debug!("Extracted trend features: {:?}", features);
        features
    }

    pub fn normalize_features(features: &[f64], mean: f64, std: f64) -> FeatureVector {
        features
            .iter()
            .map(|f| (f - mean) / (std + NORMALIZE_EPSILON))
            .collect()
    }
}

fn lookup(table: &[(&str, f64)], key: &str) -> f64 {
    let key = key.to_lowercase();
    table
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, value)| *value)
        .unwrap_or(DEFAULT_LOOKUP_VALUE)
}

fn numeric_value(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn as_map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn test_severity_levels_any_case() {
        let cases = [
            ("low", 1.0),
            ("Medium", 2.0),
            ("HIGH", 3.0),
            ("cRiTiCaL", 4.0),
            ("catastrophic", 2.0),
            ("", 2.0),
        ];
        for (severity, expected) in cases {
            let features = FeatureExtractor::extract_risk_features("urban", severity);
            assert_eq!(features[0], expected, "severity {}", severity);
        }
    }

    #[test]
    fn test_location_levels_any_case() {
        let cases = [
            ("highway", 3.0),
            ("URBAN", 2.0),
            ("Rural", 1.0),
            ("residential", 2.0),
            ("airport", 2.0),
            (" highway", 2.0),
            ("rural ", 2.0),
        ];
        for (location, expected) in cases {
            let features = FeatureExtractor::extract_risk_features(location, "low");
            assert_eq!(features[1], expected, "location {}", location);
        }
    }

    #[test]
    fn test_mixed_case_example() {
        assert_eq!(
            FeatureExtractor::extract_risk_features("Urban", "HIGH"),
            vec![3.0, 2.0]
        );
    }

    #[test]
    fn test_unknown_inputs_use_default_vector() {
        assert_eq!(
            FeatureExtractor::extract_risk_features("moon base", "unknown"),
            DEFAULT_RISK_FEATURES.to_vec()
        );
    }

    #[test]
    fn test_trend_features_keep_field_order() {
        let data = as_map(json!({"growth_rate": 0.25, "count": 12, "average_severity": "2.5"}));
        assert_eq!(
            FeatureExtractor::extract_trend_features(&data),
            vec![12.0, 2.5, 0.25]
        );
    }

    #[test]
    fn test_trend_features_skip_missing_fields() {
        let data = as_map(json!({"growth_rate": -0.5, "unrelated": "x"}));
        assert_eq!(FeatureExtractor::extract_trend_features(&data), vec![-0.5]);
        assert!(FeatureExtractor::extract_trend_features(&Map::new()).is_empty());
    }

    #[test]
    fn test_trend_features_bad_value_yields_empty() {
        let data = as_map(json!({"count": 3, "average_severity": "severe"}));
        assert!(FeatureExtractor::extract_trend_features(&data).is_empty());

        let data = as_map(json!({"count": [1, 2]}));
        assert!(FeatureExtractor::extract_trend_features(&data).is_empty());
    }

    #[test]
    fn test_normalize_features() {
        let normalized = FeatureExtractor::normalize_features(&[4.0], 2.0, 2.0);
        assert!((normalized[0] - 1.0).abs() < 1e-6);

        let normalized = FeatureExtractor::normalize_features(&[5.0], 0.0, 0.0);
        assert!(normalized[0].is_finite());
        assert!((normalized[0] - 5.0 / 1e-8).abs() < 1.0);
    }
}
