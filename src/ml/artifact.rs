//! Model artifacts exported by the training tooling.
//!
//! Artifacts are JSON documents tagged by `type`. Each decoded artifact is
//! wrapped in a [`ModelHandle`] whose [`Capabilities`] are fixed when it is
//! loaded, so callers never query the estimator per request.

use crate::domain::model::{FeatureVector, ModelKind};
use crate::utils::error::PredictionError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EstimatorError {
    #[error("expected {expected} features, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("{0} is not supported")]
    Unsupported(&'static str),

    #[error("invalid artifact: {0}")]
    InvalidArtifact(String),

    #[error("{0}")]
    Runtime(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub predict: bool,
    pub predict_proba: bool,
    pub transform: bool,
}

/// 已還原的模型物件，推論必須可以被多個執行緒同時呼叫
pub trait Estimator: Send + Sync + fmt::Debug {
    fn capabilities(&self) -> Capabilities;

    fn predict(&self, _rows: &[FeatureVector]) -> Result<Vec<f64>, EstimatorError> {
        Err(EstimatorError::Unsupported("predict"))
    }

    fn predict_proba(&self, _rows: &[FeatureVector]) -> Result<Vec<Vec<f64>>, EstimatorError> {
        Err(EstimatorError::Unsupported("predict_proba"))
    }

    fn transform(&self, _rows: &[FeatureVector]) -> Result<Vec<FeatureVector>, EstimatorError> {
        Err(EstimatorError::Unsupported("transform"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModelArtifact {
    Linear(LinearModel),
    Logistic(LogisticModel),
    StandardScaler(StandardScaler),
}

impl ModelArtifact {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    pub fn into_estimator(self) -> Result<Box<dyn Estimator>, EstimatorError> {
        match self {
            ModelArtifact::Linear(model) => {
                model.check()?;
                Ok(Box::new(model))
            }
            ModelArtifact::Logistic(model) => {
                model.check()?;
                Ok(Box::new(model))
            }
            ModelArtifact::StandardScaler(scaler) => {
                scaler.check()?;
                Ok(Box::new(scaler))
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearModel {
    pub weights: Vec<f64>,
    #[serde(default)]
    pub bias: f64,
}

impl LinearModel {
    fn check(&self) -> Result<(), EstimatorError> {
        if self.weights.is_empty() {
            return Err(EstimatorError::InvalidArtifact(
                "linear model has no weights".to_string(),
            ));
        }
        ensure_finite("weights", &self.weights)?;
        ensure_finite("bias", &[self.bias])
    }
}

impl Estimator for LinearModel {
    fn capabilities(&self) -> Capabilities {
        Capabilities {
            predict: true,
            ..Default::default()
        }
    }

    fn predict(&self, rows: &[FeatureVector]) -> Result<Vec<f64>, EstimatorError> {
        rows.iter()
            .map(|row| {
                check_width(self.weights.len(), row)?;
                Ok(dot(&self.weights, row) + self.bias)
            })
            .collect()
    }
}

/// 邏輯迴歸分類器。二元分類時 `coefficients` 只有一列。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticModel {
    pub classes: Vec<f64>,
    pub coefficients: Vec<Vec<f64>>,
    pub intercepts: Vec<f64>,
}

impl LogisticModel {
    fn check(&self) -> Result<(), EstimatorError> {
        let rows = self.coefficients.len();
        let binary = rows == 1 && self.classes.len() == 2;
        if !binary && (rows < 2 || rows != self.classes.len()) {
            return Err(EstimatorError::InvalidArtifact(format!(
                "{} coefficient rows do not match {} classes",
                rows,
                self.classes.len()
            )));
        }
        if self.intercepts.len() != rows {
            return Err(EstimatorError::InvalidArtifact(format!(
                "{} intercepts for {} coefficient rows",
                self.intercepts.len(),
                rows
            )));
        }
        let width = self.width();
        if width == 0 || self.coefficients.iter().any(|row| row.len() != width) {
            return Err(EstimatorError::InvalidArtifact(
                "coefficient rows must share a non-zero width".to_string(),
            ));
        }
        for row in &self.coefficients {
            ensure_finite("coefficients", row)?;
        }
        ensure_finite("intercepts", &self.intercepts)?;
        ensure_finite("classes", &self.classes)
    }

    fn width(&self) -> usize {
        self.coefficients.first().map(Vec::len).unwrap_or(0)
    }

    fn row_proba(&self, row: &[f64]) -> Result<Vec<f64>, EstimatorError> {
        check_width(self.width(), row)?;
        let logits: Vec<f64> = self
            .coefficients
            .iter()
            .zip(&self.intercepts)
            .map(|(coef, intercept)| dot(coef, row) + intercept)
            .collect();
        if logits.iter().any(|z| !z.is_finite()) {
            return Err(EstimatorError::Runtime(
                "logits overflowed to a non-finite value".to_string(),
            ));
        }

        if logits.len() == 1 {
            let positive = 1.0 / (1.0 + (-logits[0]).exp());
            return Ok(vec![1.0 - positive, positive]);
        }

        let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let exps: Vec<f64> = logits.iter().map(|z| (z - max).exp()).collect();
        let total: f64 = exps.iter().sum();
        Ok(exps.into_iter().map(|e| e / total).collect())
    }
}

impl Estimator for LogisticModel {
    fn capabilities(&self) -> Capabilities {
        Capabilities {
            predict: true,
            predict_proba: true,
            transform: false,
        }
    }

    fn predict(&self, rows: &[FeatureVector]) -> Result<Vec<f64>, EstimatorError> {
        rows.iter()
            .map(|row| {
                let proba = self.row_proba(row)?;
                let best = proba
                    .iter()
                    .enumerate()
                    .fold((0, f64::NEG_INFINITY), |best, (i, p)| {
                        if *p > best.1 {
                            (i, *p)
                        } else {
                            best
                        }
                    })
                    .0;
                Ok(self.classes[best])
            })
            .collect()
    }

    fn predict_proba(&self, rows: &[FeatureVector]) -> Result<Vec<Vec<f64>>, EstimatorError> {
        rows.iter().map(|row| self.row_proba(row)).collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    fn check(&self) -> Result<(), EstimatorError> {
        if self.mean.len() != self.scale.len() || self.mean.is_empty() {
            return Err(EstimatorError::InvalidArtifact(format!(
                "scaler has {} means and {} scales",
                self.mean.len(),
                self.scale.len()
            )));
        }
        ensure_finite("mean", &self.mean)?;
        ensure_finite("scale", &self.scale)
    }
}

impl Estimator for StandardScaler {
    fn capabilities(&self) -> Capabilities {
        Capabilities {
            transform: true,
            ..Default::default()
        }
    }

    fn transform(&self, rows: &[FeatureVector]) -> Result<Vec<FeatureVector>, EstimatorError> {
        rows.iter()
            .map(|row| {
                check_width(self.mean.len(), row)?;
                Ok(row
                    .iter()
                    .zip(self.mean.iter().zip(&self.scale))
                    // 標準差為 0 的欄位只做平移
                    .map(|(x, (mean, scale))| {
                        let scale = if *scale == 0.0 { 1.0 } else { *scale };
                        (x - mean) / scale
                    })
                    .collect())
            })
            .collect()
    }
}

/// 快取持有的模型，呼叫端只會拿到 `Arc` 共享參考
pub struct ModelHandle {
    kind: ModelKind,
    capabilities: Capabilities,
    estimator: Box<dyn Estimator>,
}

impl ModelHandle {
    pub fn new(kind: ModelKind, estimator: Box<dyn Estimator>) -> Self {
        let capabilities = estimator.capabilities();
        Self {
            kind,
            capabilities,
            estimator,
        }
    }

    /// 解碼 JSON 模型檔
    pub fn decode(kind: ModelKind, bytes: &[u8]) -> Result<Self, PredictionError> {
        let artifact = ModelArtifact::from_slice(bytes).map_err(|e| PredictionError::ArtifactLoad {
            kind,
            message: e.to_string(),
        })?;
        let estimator = artifact
            .into_estimator()
            .map_err(|e| PredictionError::ArtifactLoad {
                kind,
                message: e.to_string(),
            })?;
        Ok(Self::new(kind, estimator))
    }

    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn predict(&self, rows: &[FeatureVector]) -> Result<Vec<f64>, PredictionError> {
        self.require(self.capabilities.predict, "predict")?;
        let predictions = self
            .estimator
            .predict(rows)
            .map_err(|e| self.estimator_error(e))?;

        if predictions.len() != rows.len() {
            return Err(PredictionError::inference(
                self.kind,
                format!(
                    "model returned {} predictions for {} rows",
                    predictions.len(),
                    rows.len()
                ),
            ));
        }
        if predictions.iter().any(|p| !p.is_finite()) {
            return Err(PredictionError::inference(
                self.kind,
                "model produced a non-finite prediction",
            ));
        }
        Ok(predictions)
    }

    /// 單筆推論：以一列的批次呼叫 `predict` 並取第一個結果
    pub fn predict_one(&self, features: &[f64]) -> Result<f64, PredictionError> {
        self.predict(&[features.to_vec()])?
            .into_iter()
            .next()
            .ok_or_else(|| PredictionError::inference(self.kind, "model returned no prediction"))
    }

    pub fn predict_proba(&self, rows: &[FeatureVector]) -> Result<Vec<Vec<f64>>, PredictionError> {
        self.require(self.capabilities.predict_proba, "predict_proba")?;
        let probabilities = self
            .estimator
            .predict_proba(rows)
            .map_err(|e| self.estimator_error(e))?;

        if probabilities.len() != rows.len() {
            return Err(PredictionError::inference(
                self.kind,
                format!(
                    "model returned {} probability rows for {} rows",
                    probabilities.len(),
                    rows.len()
                ),
            ));
        }
        if probabilities.iter().flatten().any(|p| !p.is_finite()) {
            return Err(PredictionError::inference(
                self.kind,
                "model produced a non-finite probability",
            ));
        }
        Ok(probabilities)
    }

    pub fn transform(&self, rows: &[FeatureVector]) -> Result<Vec<FeatureVector>, PredictionError> {
        self.require(self.capabilities.transform, "transform")?;
        self.estimator
            .transform(rows)
            .map_err(|e| self.estimator_error(e))
    }

    fn require(&self, supported: bool, capability: &'static str) -> Result<(), PredictionError> {
        if supported {
            Ok(())
        } else {
            Err(PredictionError::Unsupported {
                kind: self.kind,
                capability,
            })
        }
    }

    fn estimator_error(&self, error: EstimatorError) -> PredictionError {
        match error {
            EstimatorError::Unsupported(capability) => PredictionError::Unsupported {
                kind: self.kind,
                capability,
            },
            other => PredictionError::inference(self.kind, other.to_string()),
        }
    }
}

impl fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelHandle")
            .field("kind", &self.kind)
            .field("capabilities", &self.capabilities)
            .finish()
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn check_width(expected: usize, row: &[f64]) -> Result<(), EstimatorError> {
    if row.len() != expected {
        return Err(EstimatorError::ShapeMismatch {
            expected,
            actual: row.len(),
        });
    }
    Ok(())
}

fn ensure_finite(field: &str, values: &[f64]) -> Result<(), EstimatorError> {
    if values.iter().any(|v| !v.is_finite()) {
        return Err(EstimatorError::InvalidArtifact(format!(
            "'{}' contains a non-finite value",
            field
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(kind: ModelKind, json: &str) -> ModelHandle {
        ModelHandle::decode(kind, json.as_bytes()).unwrap()
    }

    #[test]
    fn test_linear_model_predicts_dot_product() {
        let model = handle(
            ModelKind::Risk,
            r#"{"type": "linear", "weights": [0.1, 0.2], "bias": 0.05}"#,
        );
        let score = model.predict_one(&[3.0, 2.0]).unwrap();
        assert!((score - 0.75).abs() < 1e-12);
        assert!(!model.capabilities().predict_proba);
    }

    #[test]
    fn test_shape_mismatch_is_inference_error() {
        let model = handle(ModelKind::Risk, r#"{"type": "linear", "weights": [1.0, 1.0]}"#);
        let err = model.predict_one(&[1.0]).unwrap_err();
        assert!(matches!(err, PredictionError::Inference { kind: ModelKind::Risk, .. }));
    }

    #[test]
    fn test_binary_logistic_probabilities() {
        let model = handle(
            ModelKind::Risk,
            r#"{"type": "logistic", "classes": [0, 1], "coefficients": [[1.0, 0.0]], "intercepts": [0.0]}"#,
        );
        let proba = model.predict_proba(&[vec![0.0, 5.0]]).unwrap();
        assert!((proba[0][0] - 0.5).abs() < 1e-12);
        assert!((proba[0][1] - 0.5).abs() < 1e-12);

        let labels = model.predict(&[vec![4.0, 0.0], vec![-4.0, 0.0]]).unwrap();
        assert_eq!(labels, vec![1.0, 0.0]);
    }

    #[test]
    fn test_multiclass_logistic_softmax_sums_to_one() {
        let model = handle(
            ModelKind::Risk,
            r#"{"type": "logistic", "classes": [1, 2, 3],
                "coefficients": [[1.0, 0.0], [0.0, 1.0], [0.5, 0.5]],
                "intercepts": [0.0, 0.0, 0.0]}"#,
        );
        let proba = model.predict_proba(&[vec![3.0, 1.0]]).unwrap();
        let total: f64 = proba[0].iter().sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert_eq!(model.predict_one(&[3.0, 1.0]).unwrap(), 1.0);
    }

    #[test]
    fn test_scaler_only_transforms() {
        let scaler = handle(
            ModelKind::Scaler,
            r#"{"type": "standard_scaler", "mean": [2.0, 2.0], "scale": [2.0, 0.0]}"#,
        );
        let scaled = scaler.transform(&[vec![4.0, 3.0]]).unwrap();
        assert_eq!(scaled, vec![vec![1.0, 1.0]]);
        assert!(matches!(
            scaler.predict_one(&[1.0, 1.0]),
            Err(PredictionError::Unsupported { capability: "predict", .. })
        ));
    }

    #[test]
    fn test_malformed_artifacts_fail_to_decode() {
        let cases = [
            "not json",
            r#"{"type": "random_forest"}"#,
            r#"{"type": "linear", "weights": []}"#,
            r#"{"type": "logistic", "classes": [0, 1, 2], "coefficients": [[1.0]], "intercepts": [0.0]}"#,
            r#"{"type": "standard_scaler", "mean": [1.0], "scale": []}"#,
        ];
        for json in cases {
            assert!(
                matches!(
                    ModelHandle::decode(ModelKind::Trend, json.as_bytes()),
                    Err(PredictionError::ArtifactLoad { kind: ModelKind::Trend, .. })
                ),
                "{}",
                json
            );
        }
    }

    #[test]
    fn test_overflowing_logits_are_inference_errors() {
        let model = handle(
            ModelKind::Risk,
            r#"{"type": "logistic", "classes": [1, 2, 3],
                "coefficients": [[1e308, 0.0], [0.0, 1e308], [0.0, 0.0]],
                "intercepts": [0.0, 0.0, 0.0]}"#,
        );
        let rows = [vec![10.0, 10.0]];
        assert!(matches!(
            model.predict(&rows),
            Err(PredictionError::Inference { kind: ModelKind::Risk, .. })
        ));
        assert!(matches!(
            model.predict_proba(&rows),
            Err(PredictionError::Inference { kind: ModelKind::Risk, .. })
        ));
    }

    #[derive(Debug)]
    struct NanProba;

    impl Estimator for NanProba {
        fn capabilities(&self) -> Capabilities {
            Capabilities {
                predict_proba: true,
                ..Default::default()
            }
        }

        fn predict_proba(&self, rows: &[FeatureVector]) -> Result<Vec<Vec<f64>>, EstimatorError> {
            Ok(rows.iter().map(|_| vec![f64::NAN, 1.0]).collect())
        }
    }

    #[test]
    fn test_non_finite_probabilities_are_rejected() {
        let model = ModelHandle::new(ModelKind::Trend, Box::new(NanProba));
        assert_eq!(
            model.predict_proba(&[vec![1.0]]),
            Err(PredictionError::inference(
                ModelKind::Trend,
                "model produced a non-finite probability"
            ))
        );
    }
}
