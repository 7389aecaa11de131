use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{NewUser, User};
use crate::repositories::UserRepository;

/// プロセス内メモリ上のユーザーストア
///
/// DATABASE_URL 未設定時の開発用、およびテスト用。
/// プロセス終了で内容は失われる。
#[derive(Default)]
pub struct MemoryUserRepository {
    users: RwLock<HashMap<Uuid, User>>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>, AppError> {
        let users = self.users.read().await;
        Ok(users.get(&user_id).cloned())
    }

    async fn create_user(&self, new_user: NewUser<'_>) -> Result<User, AppError> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == new_user.email) {
            return Err(AppError::EmailAlreadyExists);
        }

        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            username: new_user.username.to_string(),
            email: new_user.email.to_string(),
            password_hash: new_user.password_hash.to_string(),
            token_version: 0,
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_password(
        &self,
        user_id: Uuid,
        expected_version: i32,
        new_password_hash: &str,
    ) -> Result<bool, AppError> {
        let mut users = self.users.write().await;
        match users.get_mut(&user_id) {
            Some(user) if user.token_version == expected_version => {
                user.password_hash = new_password_hash.to_string();
                user.token_version += 1;
                user.updated_at = OffsetDateTime::now_utc();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
