use axum::{Json, extract::State, http::StatusCode};
use garde::Validate;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::extract::ValidatedJson;
use crate::services::AuthService;
use crate::state::AppState;

/// 欠けたフィールドは空文字として扱い、検証で弾く
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct RegisterRequest {
    #[garde(length(min = 1))]
    pub username: String,
    #[garde(length(min = 1), email)]
    pub email: String,
    #[garde(length(min = 1))]
    pub password: String, // SecretBox不要（Deserialize後すぐハッシュ化）
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub message: String,
}

/// ユーザー登録ハンドラー
///
/// POST /register
///
/// # Security
/// - パスワードはログに出力しない
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    let auth_service = AuthService::new(state.user_repo.clone(), state.token_service.clone());
    auth_service
        .register(&request.username, &request.email, &request.password)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully".to_string(),
        }),
    ))
}
