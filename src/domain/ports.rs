use crate::domain::model::{
    Accident, AccidentCreate, AccidentStatus, AccidentUpdate, Severity, User, UserChanges,
    UserCreate,
};
use crate::utils::error::Result;
use async_trait::async_trait;

/// 模型檔案的讀取來源，名稱相對於模型目錄
pub trait ArtifactStore: Send + Sync {
    fn exists(&self, name: &str) -> bool;
    fn read(&self, name: &str) -> Result<Vec<u8>>;
    fn location(&self, name: &str) -> String;
}

pub trait ModelSettings: Send + Sync {
    fn model_path(&self) -> &str;
    fn artifact_extension(&self) -> &str;
    fn default_risk_score(&self) -> f64;
}

#[async_trait]
pub trait AccidentRepository: Send + Sync {
    async fn create(
        &self,
        data: AccidentCreate,
        user_id: Option<u64>,
        risk_score: Option<f64>,
    ) -> Result<Accident>;
    async fn get_by_id(&self, id: u64) -> Result<Option<Accident>>;
    async fn list(&self, skip: usize, limit: usize) -> Result<Vec<Accident>>;
    async fn list_by_user(&self, user_id: u64, skip: usize, limit: usize) -> Result<Vec<Accident>>;
    async fn list_by_severity(
        &self,
        severity: Severity,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<Accident>>;
    async fn list_by_status(
        &self,
        status: AccidentStatus,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<Accident>>;
    async fn update(&self, id: u64, data: AccidentUpdate) -> Result<Option<Accident>>;
    async fn delete(&self, id: u64) -> Result<bool>;
    async fn count(&self) -> Result<usize>;
    async fn count_by_severity(&self, severity: Severity) -> Result<usize>;
}

/// 使用者資料表；username 與 email 必須唯一
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, data: UserCreate, hashed_password: String) -> Result<User>;
    async fn get_by_id(&self, id: u64) -> Result<Option<User>>;
    async fn get_by_username(&self, username: &str) -> Result<Option<User>>;
    async fn get_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn list(&self, skip: usize, limit: usize) -> Result<Vec<User>>;
    async fn update(&self, id: u64, changes: UserChanges) -> Result<Option<User>>;
    async fn delete(&self, id: u64) -> Result<bool>;
    async fn count(&self) -> Result<usize>;
}

/// 密碼雜湊演算法由外部提供
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, password: &str) -> Result<String>;
    fn verify(&self, password: &str, hashed_password: &str) -> bool;
}
