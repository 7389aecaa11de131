use std::sync::Arc;

use secrecy::ExposeSecret;
use time::Duration;

use crate::config::Config;
use crate::error::AppError;
use crate::repositories::UserRepository;
use crate::services::{EmailService, Mailer, TokenService};

const FALLBACK_FROM_ADDRESS: &str = "noreply@localhost";

/// アプリケーション共有状態
///
/// axum の State として全ハンドラーで共有される。
/// Clone は必須（axum が内部で clone するため）。
#[derive(Clone)]
pub struct AppState {
    /// アプリケーション設定（Arc で共有）
    pub config: Arc<Config>,
    /// ユーザーリポジトリ
    pub user_repo: Arc<dyn UserRepository>,
    /// トークン発行・検証
    pub token_service: TokenService,
    /// メールサービス
    pub email_service: EmailService,
}

impl AppState {
    /// 新しい AppState を作成
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        mailer: Arc<dyn Mailer>,
        config: Config,
    ) -> Result<Self, AppError> {
        let config = Arc::new(config);

        let token_service = TokenService::new(
            config.jwt_secret.expose_secret(),
            Duration::seconds(config.login_token_ttl_secs),
            Duration::seconds(config.password_reset_token_ttl_secs),
        )?;

        let from_address = config
            .smtp_from_address
            .clone()
            .or_else(|| config.smtp_login().map(|u| u.expose_secret().clone()))
            .unwrap_or_else(|| FALLBACK_FROM_ADDRESS.to_string());
        let email_service = EmailService::new(mailer, from_address);

        Ok(Self {
            config,
            user_repo,
            token_service,
            email_service,
        })
    }
}
