use std::sync::Arc;

use crate::error::AppError;
use crate::repositories::UserRepository;
use crate::services::EmailService;
use crate::services::password::hash_password_async;
use crate::services::token::{TokenPurpose, TokenService};

/// パスワードリセットサービス
///
/// リセットトークンはDBに保存しない自己完結型の署名付きトークン。
/// ユーザーの token_version を埋め込み、リセット成功時に加算することで
/// 使用済みトークンを無効化する。
#[derive(Clone)]
pub struct PasswordResetService {
    user_repo: Arc<dyn UserRepository>,
    token_service: TokenService,
    email_service: EmailService,
    reset_url_base: String,
}

impl PasswordResetService {
    /// 新しい PasswordResetService を作成
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        token_service: TokenService,
        email_service: EmailService,
        reset_url_base: String,
    ) -> Self {
        Self {
            user_repo,
            token_service,
            email_service,
            reset_url_base,
        }
    }

    /// パスワードリセットをリクエスト
    ///
    /// # Security
    /// - トークンはログに出力しない
    pub async fn request_reset(&self, email: &str) -> Result<(), AppError> {
        tracing::info!(email = %email, "パスワードリセットリクエスト");

        let user = self.user_repo.find_by_email(email).await?.ok_or_else(|| {
            tracing::warn!(email = %email, "パスワードリセット: ユーザー不在");
            AppError::UserNotFound
        })?;

        let token = self
            .token_service
            .issue_reset_token(user.id, user.token_version)?;

        let reset_url = self.build_reset_url(&token);

        self.email_service
            .send_password_reset_email(&user.email, &reset_url)
            .await?;

        Ok(())
    }

    /// パスワードをリセット
    ///
    /// # Security
    /// - トークン・新パスワードはログに出力しない
    /// - 失敗理由（署名不正・期限切れ・ユーザー不在・使用済み）は区別しない
    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), AppError> {
        let claims = self
            .token_service
            .verify(token, TokenPurpose::PasswordReset)?;

        let user = self
            .user_repo
            .find_by_id(claims.sub)
            .await?
            .ok_or_else(|| {
                tracing::warn!(user_id = %claims.sub, "リセット対象ユーザー不在");
                AppError::InvalidToken
            })?;

        // 使用済みチェック
        if claims.ver != Some(user.token_version) {
            tracing::warn!(user_id = %user.id, "使用済みトークン");
            return Err(AppError::InvalidToken);
        }

        let password_hash = hash_password_async(new_password).await?;

        let updated = self
            .user_repo
            .update_password(user.id, user.token_version, &password_hash)
            .await?;
        if !updated {
            // 検証後に別リクエストが先に更新した
            tracing::warn!(user_id = %user.id, "トークン競合（使用済み）");
            return Err(AppError::InvalidToken);
        }

        tracing::info!(user_id = %user.id, "パスワードリセット完了");

        Ok(())
    }

    /// リセットURLを構築（トークンはパスセグメント）
    fn build_reset_url(&self, token: &str) -> String {
        format!("{}/{}", self.reset_url_base.trim_end_matches('/'), token)
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use time::Duration;
    use tokio::sync::Mutex;

    use super::*;
    use crate::repositories::MemoryUserRepository;
    use crate::services::auth::AuthService;
    use crate::services::email::{Mailer, OutgoingMail};

    #[derive(Default)]
    struct CapturingMailer {
        sent: Mutex<Vec<OutgoingMail>>,
    }

    #[async_trait]
    impl Mailer for CapturingMailer {
        fn transport(&self) -> &'static str {
            "capture"
        }

        async fn send(&self, mail: OutgoingMail) -> Result<(), AppError> {
            self.sent.lock().await.push(mail);
            Ok(())
        }
    }

    struct Fixture {
        auth: AuthService,
        reset: PasswordResetService,
        tokens: TokenService,
        mailer: Arc<CapturingMailer>,
    }

    fn fixture() -> Fixture {
        let repo: Arc<dyn UserRepository> = Arc::new(MemoryUserRepository::new());
        let tokens =
            TokenService::new("test-secret", Duration::hours(1), Duration::minutes(15)).unwrap();
        let mailer = Arc::new(CapturingMailer::default());
        let email = EmailService::new(mailer.clone(), "noreply@example.com".to_string());
        Fixture {
            auth: AuthService::new(repo.clone(), tokens.clone()),
            reset: PasswordResetService::new(
                repo,
                tokens.clone(),
                email,
                "http://localhost:3004/reset-password/".to_string(),
            ),
            tokens,
            mailer,
        }
    }

    /// 送信済みメール本文からトークンを取り出す
    async fn last_token(mailer: &CapturingMailer) -> String {
        let sent = mailer.sent.lock().await;
        let body = &sent.last().unwrap().body;
        body.rsplit('/').next().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_request_reset_sends_link() {
        let f = fixture();
        let user = f.auth.register("alice", "a@x.com", "secret1").await.unwrap();

        f.reset.request_reset("a@x.com").await.unwrap();

        let sent = f.mailer.sent.lock().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "a@x.com");
        assert!(
            sent[0]
                .body
                .contains("http://localhost:3004/reset-password/ey")
        );
        drop(sent);

        let token = last_token(&f.mailer).await;
        let claims = f.tokens.verify(&token, TokenPurpose::PasswordReset).unwrap();
        assert_eq!(claims.sub, user.id);
    }

    #[tokio::test]
    async fn test_request_reset_unknown_email() {
        let f = fixture();
        let result = f.reset.request_reset("nobody@x.com").await;
        assert!(matches!(result, Err(AppError::UserNotFound)));
        assert!(f.mailer.sent.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_reset_password_is_single_use() {
        let f = fixture();
        f.auth.register("alice", "a@x.com", "secret1").await.unwrap();
        f.reset.request_reset("a@x.com").await.unwrap();
        let token = last_token(&f.mailer).await;

        f.reset.reset_password(&token, "secret2").await.unwrap();
        assert!(f.auth.login("a@x.com", "secret1").await.is_err());
        assert!(f.auth.login("a@x.com", "secret2").await.is_ok());

        let replay = f.reset.reset_password(&token, "secret3").await;
        assert!(matches!(replay, Err(AppError::InvalidToken)));
        assert!(f.auth.login("a@x.com", "secret2").await.is_ok());
    }

    #[tokio::test]
    async fn test_reset_invalidates_other_outstanding_tokens() {
        let f = fixture();
        f.auth.register("alice", "a@x.com", "secret1").await.unwrap();
        f.reset.request_reset("a@x.com").await.unwrap();
        let first = last_token(&f.mailer).await;
        f.reset.request_reset("a@x.com").await.unwrap();
        let second = last_token(&f.mailer).await;

        f.reset.reset_password(&second, "secret2").await.unwrap();

        let result = f.reset.reset_password(&first, "secret3").await;
        assert!(matches!(result, Err(AppError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_reset_password_unknown_user() {
        let f = fixture();
        let token = f
            .tokens
            .issue_reset_token(uuid::Uuid::new_v4(), 0)
            .unwrap();

        let result = f.reset.reset_password(&token, "secret2").await;
        assert!(matches!(result, Err(AppError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_reset_password_rejects_login_token() {
        let f = fixture();
        let user = f.auth.register("alice", "a@x.com", "secret1").await.unwrap();
        let login_token = f.tokens.issue_login_token(user.id).unwrap();

        let result = f.reset.reset_password(&login_token, "secret2").await;
        assert!(matches!(result, Err(AppError::InvalidToken)));
    }
}
