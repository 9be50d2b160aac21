use crate::domain::model::{
    Accident, AccidentCreate, AccidentStatus, AccidentUpdate, Severity, TrendForecast,
};
use crate::domain::ports::{AccidentRepository, UserRepository};
use crate::ml::FeatureExtractor;
use crate::services::prediction::PredictionService;
use crate::utils::error::{Result, RiskError};
use crate::utils::validation::{self, as_validation_error, Validate};
use serde_json::{json, Map, Value};
use std::sync::Arc;

impl Validate for AccidentCreate {
    fn validate(&self) -> Result<()> {
        validation::validate_non_empty_string("location", &self.location)
            .map_err(as_validation_error)?;
        validate_coordinates(self.latitude, self.longitude)
    }
}

impl Validate for AccidentUpdate {
    fn validate(&self) -> Result<()> {
        if let Some(location) = &self.location {
            validation::validate_non_empty_string("location", location)
                .map_err(as_validation_error)?;
        }
        if let Some(score) = self.risk_score {
            validation::validate_finite("risk_score", score).map_err(as_validation_error)?;
        }
        validate_coordinates(self.latitude, self.longitude)
    }
}

fn validate_coordinates(latitude: Option<f64>, longitude: Option<f64>) -> Result<()> {
    if let Some(latitude) = latitude {
        validation::validate_range("latitude", latitude, -90.0, 90.0)
            .map_err(as_validation_error)?;
    }
    if let Some(longitude) = longitude {
        validation::validate_range("longitude", longitude, -180.0, 180.0)
            .map_err(as_validation_error)?;
    }
    Ok(())
}

/// 將事故紀錄彙總為趨勢特徵 `{count, average_severity, growth_rate}`
///
/// 以最舊與最新 `created_at` 的中點切成前後兩段，成長率為
/// `(newer - older) / max(older, 1)`。少於兩筆或時間跨度為 0 時成長率為 0。
pub fn summarize_history(accidents: &[Accident]) -> Map<String, Value> {
    let count = accidents.len();
    let average_severity = if count == 0 {
        0.0
    } else {
        accidents
            .iter()
            .map(|a| FeatureExtractor::severity_value(a.severity.as_str()))
            .sum::<f64>()
            / count as f64
    };

    let mut summary = Map::new();
    summary.insert("count".to_string(), json!(count));
    summary.insert("average_severity".to_string(), json!(average_severity));
    summary.insert("growth_rate".to_string(), json!(growth_rate(accidents)));
    summary
}

fn growth_rate(accidents: &[Accident]) -> f64 {
    let oldest = accidents.iter().map(|a| a.created_at).min();
    let newest = accidents.iter().map(|a| a.created_at).max();
    let (Some(oldest), Some(newest)) = (oldest, newest) else {
        return 0.0;
    };
    if newest <= oldest {
        return 0.0;
    }

    let midpoint = oldest + (newest - oldest) / 2;
    let older = accidents.iter().filter(|a| a.created_at < midpoint).count();
    let newer = accidents.len() - older;
    (newer as f64 - older as f64) / older.max(1) as f64
}

pub struct AccidentService<R: AccidentRepository, U: UserRepository> {
    repository: R,
    users: Arc<U>,
    prediction: PredictionService,
}

impl<R: AccidentRepository, U: UserRepository> AccidentService<R, U> {
    pub fn new(repository: R, users: Arc<U>, prediction: PredictionService) -> Self {
        Self {
            repository,
            users,
            prediction,
        }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// 建立事故並附上風險分數；預測失敗只會得到預設分數，不會讓建立失敗
    ///
    /// `user_id` 必須對應到已存在的使用者。
    pub async fn create_accident(
        &self,
        data: AccidentCreate,
        user_id: Option<u64>,
    ) -> Result<Accident> {
        data.validate()?;
        if let Some(user_id) = user_id {
            self.ensure_user_exists(user_id).await?;
        }
        tracing::info!("📝 Creating accident at location: {}", data.location);

        let risk_score = self.score(&data.location, data.severity).await;
        let accident = self
            .repository
            .create(data, user_id, Some(risk_score))
            .await?;

        tracing::info!(
            "✅ Accident created successfully: {} (Risk Score: {})",
            accident.id,
            risk_score
        );
        Ok(accident)
    }

    async fn ensure_user_exists(&self, user_id: u64) -> Result<()> {
        if self.users.get_by_id(user_id).await?.is_none() {
            tracing::warn!("⚠️ Rejecting accident for unknown user: {}", user_id);
            return Err(RiskError::NotFound {
                entity: "user".to_string(),
                id: user_id.to_string(),
            });
        }
        Ok(())
    }

    /// 第一次載入模型會讀檔，放到 blocking 執行緒避免卡住 runtime
    async fn score(&self, location: &str, severity: Severity) -> f64 {
        let prediction = self.prediction.clone();
        let location = location.to_string();
        let fallback = prediction.default_risk_score();

        tokio::task::spawn_blocking(move || {
            prediction.predict_risk(&location, severity.as_str())
        })
        .await
        .unwrap_or_else(|e| {
            tracing::error!("❌ Risk scoring task failed: {}", e);
            fallback
        })
    }

    pub async fn get_accident(&self, id: u64) -> Result<Option<Accident>> {
        self.repository.get_by_id(id).await
    }

    pub async fn list_accidents(&self, skip: usize, limit: usize) -> Result<Vec<Accident>> {
        self.repository.list(skip, limit).await
    }

    pub async fn list_by_user(
        &self,
        user_id: u64,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<Accident>> {
        self.repository.list_by_user(user_id, skip, limit).await
    }

    pub async fn list_by_severity(
        &self,
        severity: Severity,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<Accident>> {
        self.repository.list_by_severity(severity, skip, limit).await
    }

    pub async fn list_by_status(
        &self,
        status: AccidentStatus,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<Accident>> {
        self.repository.list_by_status(status, skip, limit).await
    }

    pub async fn update_accident(
        &self,
        id: u64,
        data: AccidentUpdate,
    ) -> Result<Option<Accident>> {
        data.validate()?;
        tracing::info!("✏️ Updating accident: {}", id);

        let updated = self.repository.update(id, data).await?;
        match &updated {
            Some(_) => tracing::info!("✅ Accident updated successfully: {}", id),
            None => tracing::warn!("⚠️ Accident not found: {}", id),
        }
        Ok(updated)
    }

    pub async fn delete_accident(&self, id: u64) -> Result<bool> {
        tracing::info!("🗑️ Deleting accident: {}", id);

        let deleted = self.repository.delete(id).await?;
        if deleted {
            tracing::info!("✅ Accident deleted successfully: {}", id);
        } else {
            tracing::warn!("⚠️ Accident not found: {}", id);
        }
        Ok(deleted)
    }

    /// 以目前所有事故的彙總資料預測趨勢
    pub async fn forecast_trend(&self) -> Result<Option<TrendForecast>> {
        let history = self.repository.list(0, usize::MAX).await?;
        let summary = summarize_history(&history);
        tracing::debug!("Trend summary over {} accidents: {:?}", history.len(), summary);

        let prediction = self.prediction.clone();
        let forecast = tokio::task::spawn_blocking(move || prediction.predict_trend(&summary))
            .await
            .unwrap_or_else(|e| {
                tracing::error!("❌ Trend forecasting task failed: {}", e);
                None
            });
        Ok(forecast)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn accident(id: u64, severity: Severity, days_ago: i64) -> Accident {
        let created_at = Utc::now() - Duration::days(days_ago);
        Accident {
            id,
            user_id: None,
            location: "urban".to_string(),
            latitude: None,
            longitude: None,
            severity,
            description: None,
            status: AccidentStatus::Open,
            risk_score: None,
            created_at,
            updated_at: created_at,
        }
    }

    fn growth(history: &[Accident]) -> f64 {
        summarize_history(history)["growth_rate"].as_f64().unwrap()
    }

    #[test]
    fn test_summarize_empty_history() {
        let summary = summarize_history(&[]);
        assert_eq!(summary["count"], json!(0));
        assert_eq!(summary["average_severity"], json!(0.0));
        assert_eq!(summary["growth_rate"], json!(0.0));
    }

    #[test]
    fn test_summarize_average_severity() {
        let history = vec![
            accident(1, Severity::Low, 3),
            accident(2, Severity::High, 2),
            accident(3, Severity::Critical, 1),
        ];
        let summary = summarize_history(&history);

        assert_eq!(summary["count"], json!(3));
        let average = summary["average_severity"].as_f64().unwrap();
        assert!((average - 8.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_growth_rate_follows_creation_time() {
        let rising = vec![
            accident(1, Severity::Low, 300),
            accident(2, Severity::Low, 1),
            accident(3, Severity::Low, 0),
            accident(4, Severity::Low, 0),
        ];
        let falling = vec![
            accident(1, Severity::Low, 300),
            accident(2, Severity::Low, 300),
            accident(3, Severity::Low, 299),
            accident(4, Severity::Low, 0),
        ];

        // older = 1, newer = 3
        assert!((growth(&rising) - 2.0).abs() < 1e-12);
        // older = 3, newer = 1
        assert!((growth(&falling) + 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_growth_rate_is_zero_without_time_span() {
        let now = Utc::now();
        let same_time: Vec<Accident> = (1..=5)
            .map(|id| Accident {
                created_at: now,
                ..accident(id, Severity::Medium, 0)
            })
            .collect();

        for n in 1..=5 {
            assert_eq!(growth(&same_time[..n]), 0.0);
        }
    }

    #[test]
    fn test_create_validation() {
        assert!(AccidentCreate::new("highway", Severity::Low).validate().is_ok());
        assert!(AccidentCreate::new("  ", Severity::Low).validate().is_err());

        let mut data = AccidentCreate::new("highway", Severity::Low);
        data.latitude = Some(120.0);
        assert!(matches!(
            data.validate(),
            Err(RiskError::ValidationError { .. })
        ));
    }

    #[test]
    fn test_update_validation() {
        assert!(AccidentUpdate::default().validate().is_ok());

        let update = AccidentUpdate {
            longitude: Some(-181.0),
            ..Default::default()
        };
        assert!(update.validate().is_err());

        let update = AccidentUpdate {
            risk_score: Some(f64::INFINITY),
            ..Default::default()
        };
        assert!(update.validate().is_err());
    }
}
