use crate::domain::model::{FeatureVector, ModelKind};
use crate::ml::artifact::ModelHandle;
use crate::ml::cache::ModelCache;
use crate::utils::error::PredictionError;
use std::sync::Arc;

/// 建立時從快取取得模型；之後快取被清除也不會更新，需要重新建立
#[derive(Debug, Clone, Default)]
pub struct Predictor {
    risk_model: Option<Arc<ModelHandle>>,
    trend_model: Option<Arc<ModelHandle>>,
}

impl Predictor {
    pub fn new(cache: &ModelCache) -> Self {
        Self {
            risk_model: cache.load(ModelKind::Risk),
            trend_model: cache.load(ModelKind::Trend),
        }
    }

    pub fn with_models(
        risk_model: Option<Arc<ModelHandle>>,
        trend_model: Option<Arc<ModelHandle>>,
    ) -> Self {
        Self {
            risk_model,
            trend_model,
        }
    }

    pub fn has_risk_model(&self) -> bool {
        self.risk_model.is_some()
    }

    pub fn has_trend_model(&self) -> bool {
        self.trend_model.is_some()
    }

    pub fn predict_risk(&self, features: &[f64]) -> Result<f64, PredictionError> {
        let result = model(&self.risk_model, ModelKind::Risk)
            .and_then(|model| model.predict_one(features));
        logged(result, "risk prediction")
    }

    pub fn predict_risk_probability(&self, features: &[f64]) -> Result<Vec<f64>, PredictionError> {
        let result = model(&self.risk_model, ModelKind::Risk).and_then(|model| {
            model
                .predict_proba(&[features.to_vec()])?
                .into_iter()
                .next()
                .ok_or_else(|| {
                    PredictionError::inference(ModelKind::Risk, "model returned no probabilities")
                })
        });
        logged(result, "risk probability prediction")
    }

    pub fn predict_trend(&self, features: &[f64]) -> Result<f64, PredictionError> {
        let result = model(&self.trend_model, ModelKind::Trend)
            .and_then(|model| model.predict_one(features));
        logged(result, "trend prediction")
    }

    pub fn predict_trend_probability(
        &self,
        features: &[f64],
    ) -> Result<Vec<f64>, PredictionError> {
        let result = model(&self.trend_model, ModelKind::Trend).and_then(|model| {
            model
                .predict_proba(&[features.to_vec()])?
                .into_iter()
                .next()
                .ok_or_else(|| {
                    PredictionError::inference(ModelKind::Trend, "model returned no probabilities")
                })
        });
        logged(result, "trend probability prediction")
    }

    /// 以風險模型一次推論多筆，輸出長度與輸入相同
    pub fn batch_predict(
        &self,
        features_list: &[FeatureVector],
    ) -> Result<Vec<f64>, PredictionError> {
        let result =
            model(&self.risk_model, ModelKind::Risk).and_then(|model| model.predict(features_list));
        logged(result, "batch prediction")
    }
}

fn model(slot: &Option<Arc<ModelHandle>>, kind: ModelKind) -> Result<&ModelHandle, PredictionError> {
    slot.as_deref()
        .ok_or(PredictionError::ModelUnavailable { kind })
}

fn logged<T>(result: Result<T, PredictionError>, operation: &str) -> Result<T, PredictionError> {
    if let Err(e) = &result {
        match e {
            PredictionError::ModelUnavailable { .. } | PredictionError::Unsupported { .. } => {
                tracing::warn!("⚠️ Skipping {}: {}", operation, e)
            }
            PredictionError::ArtifactLoad { .. } | PredictionError::Inference { .. } => {
                tracing::error!("❌ Error during {}: {}", operation, e)
            }
        }
    }
    result
}
