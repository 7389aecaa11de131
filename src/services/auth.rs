use std::sync::Arc;

use crate::error::AppError;
use crate::models::{NewUser, User};
use crate::repositories::UserRepository;
use crate::services::password::{hash_password_async, verify_dummy_async, verify_password_async};
use crate::services::token::TokenService;

/// ログイン成功時の結果
#[derive(Debug)]
pub struct LoginOutcome {
    pub token: String,
    pub user: User,
}

/// 認証サービス
#[derive(Clone)]
pub struct AuthService {
    user_repo: Arc<dyn UserRepository>,
    token_service: TokenService,
}

impl AuthService {
    /// 新しい AuthService を作成
    pub fn new(user_repo: Arc<dyn UserRepository>, token_service: TokenService) -> Self {
        Self {
            user_repo,
            token_service,
        }
    }

    /// ユーザー登録
    ///
    /// # Security
    /// - パスワードはログに出力しない
    /// - パスワードは即座にハッシュ化
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<User, AppError> {
        if self.user_repo.find_by_email(email).await?.is_some() {
            tracing::warn!(email = %email, "登録失敗: メールアドレス重複");
            return Err(AppError::EmailAlreadyExists);
        }

        let password_hash = hash_password_async(password).await?;

        let user = self
            .user_repo
            .create_user(NewUser {
                username,
                email,
                password_hash: &password_hash,
            })
            .await?;

        tracing::info!(user_id = %user.id, email = %email, "ユーザー登録成功");

        Ok(user)
    }

    /// ユーザー認証を実行し、ログイントークンを発行
    ///
    /// タイミング攻撃対策: ユーザーが存在しない場合もダミーのパスワード検証を実行
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome, AppError> {
        let user = self.authenticate(email, password).await?;
        let token = self.token_service.issue_login_token(user.id)?;
        Ok(LoginOutcome { token, user })
    }

    async fn authenticate(&self, email: &str, password: &str) -> Result<User, AppError> {
        let user = match self.user_repo.find_by_email(email).await? {
            Some(user) => user,
            None => {
                verify_dummy_async(password).await;
                tracing::warn!(email = %email, "認証失敗: ユーザー不在");
                return Err(AppError::InvalidCredentials);
            }
        };

        if verify_password_async(password, &user.password_hash).await? {
            tracing::info!(user_id = %user.id, email = %email, "認証成功");
            Ok(user)
        } else {
            tracing::warn!(email = %email, "認証失敗: パスワード不一致");
            Err(AppError::InvalidCredentials)
        }
    }
}
