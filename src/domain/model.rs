use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 模型輸入的特徵向量，欄位順序由抽取策略決定
pub type FeatureVector = Vec<f64>;

/// 快取中的模型種類，每種各佔一個槽位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    Risk,
    Trend,
    Scaler,
}

impl ModelKind {
    pub const ALL: [ModelKind; 3] = [ModelKind::Risk, ModelKind::Trend, ModelKind::Scaler];

    /// 模型檔名 (不含副檔名)
    pub fn file_stem(&self) -> &'static str {
        match self {
            ModelKind::Risk => "risk_model",
            ModelKind::Trend => "trend_model",
            ModelKind::Scaler => "scaler",
        }
    }

    pub fn file_name(&self, extension: &str) -> String {
        format!("{}.{}", self.file_stem(), extension)
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModelKind::Risk => "risk",
            ModelKind::Trend => "trend",
            ModelKind::Scaler => "scaler",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            other => Err(format!(
                "unknown severity '{}', expected one of low, medium, high, critical",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccidentStatus {
    #[default]
    Open,
    Investigating,
    Closed,
}

impl fmt::Display for AccidentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AccidentStatus::Open => "open",
            AccidentStatus::Investigating => "investigating",
            AccidentStatus::Closed => "closed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Accident {
    pub id: u64,
    pub user_id: Option<u64>,
    pub location: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub severity: Severity,
    pub description: Option<String>,
    pub status: AccidentStatus,
    pub risk_score: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccidentCreate {
    pub location: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub severity: Severity,
    pub description: Option<String>,
}

impl AccidentCreate {
    pub fn new(location: impl Into<String>, severity: Severity) -> Self {
        Self {
            location: location.into(),
            latitude: None,
            longitude: None,
            severity,
            description: None,
        }
    }
}

/// 部分更新，`None` 代表不變更該欄位
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccidentUpdate {
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub severity: Option<Severity>,
    pub description: Option<String>,
    pub status: Option<AccidentStatus>,
    pub risk_score: Option<f64>,
}

impl AccidentUpdate {
    pub fn apply_to(self, accident: &mut Accident) {
        if let Some(location) = self.location {
            accident.location = location;
        }
        if let Some(latitude) = self.latitude {
            accident.latitude = Some(latitude);
        }
        if let Some(longitude) = self.longitude {
            accident.longitude = Some(longitude);
        }
        if let Some(severity) = self.severity {
            accident.severity = severity;
        }
        if let Some(description) = self.description {
            accident.description = Some(description);
        }
        if let Some(status) = self.status {
            accident.status = status;
        }
        if let Some(risk_score) = self.risk_score {
            accident.risk_score = Some(risk_score);
        }
    }
}

/// 系統使用者；`hashed_password` 不會被序列化輸出
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    #[serde(skip_serializing, default)]
    pub hashed_password: String,
    pub is_active: bool,
    pub is_superuser: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserCreate {
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    pub password: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl UserCreate {
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            full_name: None,
            password: password.into(),
            is_active: true,
        }
    }
}

/// 部分更新；密碼由服務層雜湊後才寫入
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserUpdate {
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub password: Option<String>,
    pub is_active: Option<bool>,
}

/// 寫入資料表的使用者變更，已不含明文密碼
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserChanges {
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub hashed_password: Option<String>,
    pub is_active: Option<bool>,
}

impl UserChanges {
    pub fn apply_to(self, user: &mut User) {
        if let Some(email) = self.email {
            user.email = email;
        }
        if let Some(full_name) = self.full_name {
            user.full_name = Some(full_name);
        }
        if let Some(hashed_password) = self.hashed_password {
            user.hashed_password = hashed_password;
        }
        if let Some(is_active) = self.is_active {
            user.is_active = is_active;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    Flat,
}

impl TrendDirection {
    pub fn from_score(score: f64) -> Self {
        if score > 0.0 {
            TrendDirection::Up
        } else if score < 0.0 {
            TrendDirection::Down
        } else {
            TrendDirection::Flat
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendForecast {
    pub direction: TrendDirection,
    pub score: f64,
    pub confidence: Option<f64>,
}
