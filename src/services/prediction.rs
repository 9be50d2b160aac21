//! Boundary-facing prediction façade.
//!
//! Everything below this service reports failures as [`PredictionError`].
//! This is the only place where those errors are traded for the configured
//! default score.

use crate::domain::model::{FeatureVector, ModelKind, TrendDirection, TrendForecast};
use crate::domain::ports::ModelSettings;
use crate::ml::{FeatureExtractor, ModelCache, Predictor};
use crate::utils::error::PredictionError;
use serde_json::{Map, Value};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

pub const DEFAULT_RISK_SCORE: f64 = 0.5;

#[derive(Debug, Clone)]
pub struct PredictionService {
    cache: Arc<ModelCache>,
    default_risk_score: f64,
}

impl PredictionService {
    pub fn new(cache: Arc<ModelCache>) -> Self {
        Self {
            cache,
            default_risk_score: DEFAULT_RISK_SCORE,
        }
    }

    pub fn from_settings<C: ModelSettings + ?Sized>(settings: &C) -> Self {
        Self::new(Arc::new(ModelCache::from_settings(settings)))
            .with_default_risk_score(settings.default_risk_score())
    }

    pub fn with_default_risk_score(mut self, score: f64) -> Self {
        self.default_risk_score = score;
        self
    }

    pub fn cache(&self) -> &Arc<ModelCache> {
        &self.cache
    }

    pub fn default_risk_score(&self) -> f64 {
        self.default_risk_score
    }

    /// 風險分數，永遠回傳可用的數值
    pub fn predict_risk(&self, location: &str, severity: &str) -> f64 {
        tracing::info!(
            "🔮 Predicting risk for location: {}, severity: {}",
            location,
            severity
        );

        match self.try_predict_risk(location, severity) {
            Ok(score) => {
                tracing::info!("✅ Risk prediction completed: {}", score);
                score
            }
            Err(PredictionError::ModelUnavailable { .. }) => {
                tracing::warn!(
                    "⚠️ Risk model not loaded, returning default risk score {}",
                    self.default_risk_score
                );
                self.default_risk_score
            }
            Err(e) => {
                tracing::error!(
                    "❌ Error during risk prediction: {}, returning default risk score {}",
                    e,
                    self.default_risk_score
                );
                self.default_risk_score
            }
        }
    }

    /// 不套用預設值的版本，保留錯誤類型供稽核
    pub fn try_predict_risk(&self, location: &str, severity: &str) -> Result<f64, PredictionError> {
        let model = self.cache.try_load(ModelKind::Risk)?;
        let features = FeatureExtractor::extract_risk_features(location, severity);
        guarded(ModelKind::Risk, || model.predict_one(&features))
    }

    /// 趨勢預測；沒有趨勢模型或推論失敗時回傳 `None`
    pub fn predict_trend(&self, historical_data: &Map<String, Value>) -> Option<TrendForecast> {
        tracing::info!("📈 Predicting trends from historical data");

        let Some(model) = self.cache.load(ModelKind::Trend) else {
            tracing::warn!("⚠️ Trend model not loaded");
            return None;
        };

        let features = FeatureExtractor::extract_trend_features(historical_data);
        let supports_proba = model.capabilities().predict_proba;
        let predictor = Predictor::with_models(None, Some(model));

        let score = guarded(ModelKind::Trend, || predictor.predict_trend(&features)).ok()?;
        let confidence = if supports_proba {
            guarded(ModelKind::Trend, || {
                predictor.predict_trend_probability(&features)
            })
            .ok()
            .and_then(|proba| proba.into_iter().reduce(f64::max))
        } else {
            None
        };

        let forecast = TrendForecast {
            direction: TrendDirection::from_score(score),
            score,
            confidence,
        };
        tracing::info!("✅ Trend prediction completed: {:?}", forecast);
        Some(forecast)
    }

    /// 批次評分，整批失敗時每筆都填入預設分數
    pub fn score_batch<L, S>(&self, rows: &[(L, S)]) -> Vec<f64>
    where
        L: AsRef<str>,
        S: AsRef<str>,
    {
        if rows.is_empty() {
            return Vec::new();
        }

        let features: Vec<FeatureVector> = rows
            .iter()
            .map(|(location, severity)| {
                FeatureExtractor::extract_risk_features(location.as_ref(), severity.as_ref())
            })
            .collect();

        let predictor = Predictor::with_models(self.cache.load(ModelKind::Risk), None);
        match guarded(ModelKind::Risk, || predictor.batch_predict(&features)) {
            Ok(scores) => {
                tracing::info!("✅ Scored {} accidents", scores.len());
                scores
            }
            Err(e) => {
                tracing::warn!(
                    "⚠️ Batch scoring unavailable ({}), using default score for {} rows",
                    e,
                    rows.len()
                );
                vec![self.default_risk_score; rows.len()]
            }
        }
    }

    /// 以目前快取內容建立新的 `Predictor`
    pub fn predictor(&self) -> Predictor {
        Predictor::new(&self.cache)
    }

    /// 清除快取並重新載入所有模型，回傳成功載入的種類
    pub fn reload(&self) -> Vec<ModelKind> {
        self.cache.invalidate_all();
        ModelKind::ALL
            .into_iter()
            .filter(|kind| self.cache.load(*kind).is_some())
            .collect()
    }
}

/// 模型實作若 panic，視同推論失敗
fn guarded<T>(
    kind: ModelKind,
    f: impl FnOnce() -> Result<T, PredictionError>,
) -> Result<T, PredictionError> {
    panic::catch_unwind(AssertUnwindSafe(f))
        .unwrap_or_else(|_| Err(PredictionError::inference(kind, "model panicked during inference")))
}
