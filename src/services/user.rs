use crate::domain::model::{User, UserChanges, UserCreate, UserUpdate};
use crate::domain::ports::{PasswordHasher, UserRepository};
use crate::utils::error::{Result, RiskError};
use crate::utils::validation::{self, as_validation_error, Validate};
use std::sync::Arc;

const USERNAME_MIN: usize = 3;
const USERNAME_MAX: usize = 50;
const PASSWORD_MIN: usize = 8;

impl Validate for UserCreate {
    fn validate(&self) -> Result<()> {
        validation::validate_length("username", &self.username, USERNAME_MIN, USERNAME_MAX)
            .map_err(as_validation_error)?;
        validation::validate_email("email", &self.email).map_err(as_validation_error)?;
        validate_password(&self.password)
    }
}

impl Validate for UserUpdate {
    fn validate(&self) -> Result<()> {
        if let Some(email) = &self.email {
            validation::validate_email("email", email).map_err(as_validation_error)?;
        }
        if let Some(password) = &self.password {
            validate_password(password)?;
        }
        Ok(())
    }
}

fn validate_password(password: &str) -> Result<()> {
    validation::validate_length("password", password, PASSWORD_MIN, usize::MAX).map_err(|_| {
        RiskError::ValidationError {
            message: format!("password must be at least {} characters", PASSWORD_MIN),
        }
    })
}

pub struct UserService<U: UserRepository, H: PasswordHasher> {
    repository: Arc<U>,
    hasher: H,
}

impl<U: UserRepository, H: PasswordHasher> UserService<U, H> {
    pub fn new(repository: Arc<U>, hasher: H) -> Self {
        Self { repository, hasher }
    }

    pub fn repository(&self) -> &Arc<U> {
        &self.repository
    }

    pub async fn create_user(&self, data: UserCreate) -> Result<User> {
        data.validate()?;
        tracing::info!("👤 Creating user: {}", data.username);

        let hashed_password = self.hasher.hash(&data.password)?;
        let user = self.repository.create(data, hashed_password).await?;

        tracing::info!("✅ User created successfully: {}", user.id);
        Ok(user)
    }

    /// 帳號不存在或密碼錯誤都回傳 `None`
    pub async fn authenticate_user(&self, username: &str, password: &str) -> Result<Option<User>> {
        tracing::info!("🔐 Authenticating user: {}", username);

        let user = self.repository.get_by_username(username).await?;
        match user {
            Some(user) if self.hasher.verify(password, &user.hashed_password) => {
                tracing::info!("✅ User authenticated successfully: {}", username);
                Ok(Some(user))
            }
            _ => {
                tracing::warn!("⚠️ Authentication failed for user: {}", username);
                Ok(None)
            }
        }
    }

    pub async fn get_user_by_id(&self, id: u64) -> Result<Option<User>> {
        self.repository.get_by_id(id).await
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.repository.get_by_username(username).await
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.repository.get_by_email(email).await
    }

    pub async fn list_users(&self, skip: usize, limit: usize) -> Result<Vec<User>> {
        self.repository.list(skip, limit).await
    }

    pub async fn update_user(&self, id: u64, data: UserUpdate) -> Result<Option<User>> {
        data.validate()?;
        tracing::info!("✏️ Updating user: {}", id);

        let hashed_password = match &data.password {
            Some(password) => Some(self.hasher.hash(password)?),
            None => None,
        };
        let changes = UserChanges {
            email: data.email,
            full_name: data.full_name,
            hashed_password,
            is_active: data.is_active,
        };

        let updated = self.repository.update(id, changes).await?;
        match &updated {
            Some(_) => tracing::info!("✅ User updated successfully: {}", id),
            None => tracing::warn!("⚠️ User not found: {}", id),
        }
        Ok(updated)
    }

    pub async fn delete_user(&self, id: u64) -> Result<bool> {
        tracing::info!("🗑️ Deleting user: {}", id);

        let deleted = self.repository.delete(id).await?;
        if deleted {
            tracing::info!("✅ User deleted successfully: {}", id);
        } else {
            tracing::warn!("⚠️ User not found: {}", id);
        }
        Ok(deleted)
    }
}
