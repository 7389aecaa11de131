use axum::{Json, extract::State};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// ユーザーストア種別（postgres / memory）
    pub storage: &'static str,
    /// メール送信方式（smtp / log）
    pub mailer: &'static str,
}

/// GET /health
///
/// 開発時に DB・SMTP 未設定のフォールバックで起動していないか確認できる。
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        storage: state.user_repo.backend(),
        mailer: state.email_service.transport(),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::Config;
    use crate::repositories::MemoryUserRepository;
    use crate::services::LogMailer;

    #[tokio::test]
    async fn test_health_check_reports_backends() {
        let config =
            Config::from_vars(vec![("JWT_SECRET".to_string(), "test-secret".to_string())])
                .unwrap();
        let state = AppState::new(
            Arc::new(MemoryUserRepository::new()),
            Arc::new(LogMailer),
            config,
        )
        .unwrap();

        let response = health_check(State(state)).await;
        assert_eq!(response.status, "ok");
        assert_eq!(response.version, env!("CARGO_PKG_VERSION"));
        assert_eq!(response.storage, "memory");
        assert_eq!(response.mailer, "log");
    }
}
