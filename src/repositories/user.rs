use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{NewUser, User};

/// ユーザー資格情報ストア
///
/// 1レコード単位の読み書きはアトミックであること。
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// ストア種別（ヘルスチェック表示用）
    fn backend(&self) -> &'static str;

    /// メールアドレスでユーザーを検索
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    /// ユーザーIDでユーザーを検索
    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>, AppError>;

    /// 新しいユーザーを作成
    ///
    /// # Errors
    /// - メールアドレス重複時: `AppError::EmailAlreadyExists`
    async fn create_user(&self, new_user: NewUser<'_>) -> Result<User, AppError>;

    /// パスワードを更新し、token_version を1加算する
    ///
    /// 現在の token_version が `expected_version` と一致する場合のみ更新する。
    /// 更新できた場合は true を返す。
    async fn update_password(
        &self,
        user_id: Uuid,
        expected_version: i32,
        new_password_hash: &str,
    ) -> Result<bool, AppError>;
}

const EMAIL_UNIQUE_CONSTRAINT: &str = "users_email_key";

/// PostgreSQL 実装
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, token_version, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, token_version, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn create_user(&self, new_user: NewUser<'_>) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, username, email, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING id, username, email, password_hash, token_version, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new_user.username)
        .bind(new_user.email)
        .bind(new_user.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            // UNIQUE制約違反チェック（事前確認との競合時）
            if let sqlx::Error::Database(db_err) = &e
                && db_err.constraint() == Some(EMAIL_UNIQUE_CONSTRAINT)
            {
                return AppError::EmailAlreadyExists;
            }
            AppError::Database(e)
        })
    }

    async fn update_password(
        &self,
        user_id: Uuid,
        expected_version: i32,
        new_password_hash: &str,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $3,
                token_version = token_version + 1,
                updated_at = NOW()
            WHERE id = $1 AND token_version = $2
            "#,
        )
        .bind(user_id)
        .bind(expected_version)
        .bind(new_password_hash)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
