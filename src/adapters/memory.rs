use crate::domain::model::{
    Accident, AccidentCreate, AccidentStatus, AccidentUpdate, Severity, User, UserChanges,
    UserCreate,
};
use crate::domain::ports::{AccidentRepository, UserRepository};
use crate::utils::error::{Result, RiskError};
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

#[derive(Debug)]
struct Table<T> {
    next_id: u64,
    rows: Vec<T>,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            next_id: 0,
            rows: Vec::new(),
        }
    }
}

/// 記憶體內的事故資料表，依建立順序保存，id 從 1 開始
#[derive(Debug, Default)]
pub struct InMemoryAccidentRepository {
    table: RwLock<Table<Accident>>,
}

impl InMemoryAccidentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以既有紀錄建立資料表 (依 `created_at` 排序)，新 id 接在最大 id 之後
    pub fn with_accidents(mut rows: Vec<Accident>) -> Self {
        rows.sort_by_key(|a| a.created_at);
        let next_id = rows.iter().map(|a| a.id).max().unwrap_or(0);
        Self {
            table: RwLock::new(Table { next_id, rows }),
        }
    }

    async fn select<F>(&self, skip: usize, limit: usize, filter: F) -> Vec<Accident>
    where
        F: Fn(&Accident) -> bool + Send,
    {
        let table = self.table.read().await;
        table
            .rows
            .iter()
            .filter(|accident| filter(accident))
            .skip(skip)
            .take(limit)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl AccidentRepository for InMemoryAccidentRepository {
    async fn create(
        &self,
        data: AccidentCreate,
        user_id: Option<u64>,
        risk_score: Option<f64>,
    ) -> Result<Accident> {
        let mut table = self.table.write().await;
        table.next_id += 1;

        let now = Utc::now();
        let accident = Accident {
            id: table.next_id,
            user_id,
            location: data.location,
            latitude: data.latitude,
            longitude: data.longitude,
            severity: data.severity,
            description: data.description,
            status: AccidentStatus::default(),
            risk_score,
            created_at: now,
            updated_at: now,
        };
        table.rows.push(accident.clone());
        Ok(accident)
    }

    async fn get_by_id(&self, id: u64) -> Result<Option<Accident>> {
        let table = self.table.read().await;
        Ok(table.rows.iter().find(|a| a.id == id).cloned())
    }

    async fn list(&self, skip: usize, limit: usize) -> Result<Vec<Accident>> {
        Ok(self.select(skip, limit, |_| true).await)
    }

    async fn list_by_user(&self, user_id: u64, skip: usize, limit: usize) -> Result<Vec<Accident>> {
        Ok(self
            .select(skip, limit, |a| a.user_id == Some(user_id))
            .await)
    }

    async fn list_by_severity(
        &self,
        severity: Severity,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<Accident>> {
        Ok(self.select(skip, limit, |a| a.severity == severity).await)
    }

    async fn list_by_status(
        &self,
        status: AccidentStatus,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<Accident>> {
        Ok(self.select(skip, limit, |a| a.status == status).await)
    }

    async fn update(&self, id: u64, data: AccidentUpdate) -> Result<Option<Accident>> {
        let mut table = self.table.write().await;
        let Some(accident) = table.rows.iter_mut().find(|a| a.id == id) else {
            return Ok(None);
        };

        data.apply_to(accident);
        accident.updated_at = Utc::now();
        Ok(Some(accident.clone()))
    }

    async fn delete(&self, id: u64) -> Result<bool> {
        let mut table = self.table.write().await;
        let before = table.rows.len();
        table.rows.retain(|a| a.id != id);
        Ok(table.rows.len() < before)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.table.read().await.rows.len())
    }

    async fn count_by_severity(&self, severity: Severity) -> Result<usize> {
        let table = self.table.read().await;
        Ok(table.rows.iter().filter(|a| a.severity == severity).count())
    }
}

/// 記憶體內的使用者資料表，username 與 email 唯一
#[derive(Debug, Default)]
pub struct InMemoryUserRepository {
    table: RwLock<Table<User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn conflict(field: &str, value: &str) -> RiskError {
    RiskError::Conflict {
        entity: "user".to_string(),
        field: field.to_string(),
        value: value.to_string(),
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, data: UserCreate, hashed_password: String) -> Result<User> {
        let mut table = self.table.write().await;
        if table.rows.iter().any(|u| u.username == data.username) {
            return Err(conflict("username", &data.username));
        }
        if table.rows.iter().any(|u| u.email == data.email) {
            return Err(conflict("email", &data.email));
        }
        table.next_id += 1;

        let now = Utc::now();
        let user = User {
            id: table.next_id,
            username: data.username,
            email: data.email,
            full_name: data.full_name,
            hashed_password,
            is_active: data.is_active,
            is_superuser: false,
            created_at: now,
            updated_at: now,
        };
        table.rows.push(user.clone());
        Ok(user)
    }

    async fn get_by_id(&self, id: u64) -> Result<Option<User>> {
        let table = self.table.read().await;
        Ok(table.rows.iter().find(|u| u.id == id).cloned())
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let table = self.table.read().await;
        Ok(table.rows.iter().find(|u| u.username == username).cloned())
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let table = self.table.read().await;
        Ok(table.rows.iter().find(|u| u.email == email).cloned())
    }

    async fn list(&self, skip: usize, limit: usize) -> Result<Vec<User>> {
        let table = self.table.read().await;
        Ok(table.rows.iter().skip(skip).take(limit).cloned().collect())
    }

    async fn update(&self, id: u64, changes: UserChanges) -> Result<Option<User>> {
        let mut table = self.table.write().await;
        if let Some(email) = &changes.email {
            if table.rows.iter().any(|u| u.id != id && &u.email == email) {
                return Err(conflict("email", email));
            }
        }

        let Some(user) = table.rows.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        changes.apply_to(user);
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn delete(&self, id: u64) -> Result<bool> {
        let mut table = self.table.write().await;
        let before = table.rows.len();
        table.rows.retain(|u| u.id != id);
        Ok(table.rows.len() < before)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.table.read().await.rows.len())
    }
}
