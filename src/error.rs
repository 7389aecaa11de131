use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("バリデーションエラー: {0}")]
    Validation(String),

    #[error("このメールアドレスは既に使用されています")]
    EmailAlreadyExists,

    #[error("メールアドレスまたはパスワードが正しくありません")]
    InvalidCredentials,

    #[error("ユーザーが見つかりません")]
    UserNotFound,

    #[error("無効または期限切れのトークンです")]
    InvalidToken,

    #[error("データベースエラー")]
    Database(#[from] sqlx::Error),

    #[error("メール送信エラー: {0}")]
    Mail(String),

    #[error("内部エラー")]
    Internal(#[from] anyhow::Error),
}

#[derive(Serialize)]
struct ErrorResponse {
    message: String,
}

impl AppError {
    /// HTTPステータスコードへの対応付け
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_)
            | Self::EmailAlreadyExists
            | Self::InvalidCredentials
            | Self::UserNotFound
            | Self::InvalidToken => StatusCode::BAD_REQUEST,
            Self::Database(_) | Self::Mail(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = match &self {
            Self::Validation(msg) => msg.clone(),
            Self::EmailAlreadyExists => "User already exists".to_string(),
            // 存在有無の漏洩防止: ユーザー不在とパスワード不一致で同一メッセージ
            Self::InvalidCredentials => "Invalid email or password".to_string(),
            Self::UserNotFound => "User not found".to_string(),
            Self::InvalidToken => "Invalid token or user does not exist".to_string(),
            Self::Database(e) => {
                tracing::error!(error = ?e, "データベースエラー");
                "Internal server error".to_string()
            }
            Self::Mail(e) => {
                tracing::error!(error = %e, "メール送信エラー");
                "Internal server error".to_string()
            }
            Self::Internal(e) => {
                tracing::error!(error = ?e, "内部エラー");
                "Internal server error".to_string()
            }
        };

        (self.status(), Json(ErrorResponse { message })).into_response()
    }
}
