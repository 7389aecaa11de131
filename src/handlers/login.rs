use axum::{Json, extract::State};
use garde::Validate;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::extract::ValidatedJson;
use crate::services::AuthService;
use crate::state::AppState;

/// ログインリクエスト
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct LoginRequest {
    /// ユーザーのメールアドレス
    #[garde(length(min = 1))]
    pub email: String,
    /// ユーザーのパスワード
    #[garde(length(min = 1))]
    pub password: String,
}

/// ログインレスポンス
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    /// ログイントークン（有効期限1時間）
    pub token: String,
    pub username: String,
}

/// ログインハンドラー
///
/// POST /login
///
/// ユーザー不在・パスワード不一致はどちらも同じ 400 応答になる。
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let auth_service = AuthService::new(state.user_repo.clone(), state.token_service.clone());
    let outcome = auth_service
        .login(&request.email, &request.password)
        .await?;

    Ok(Json(LoginResponse {
        token: outcome.token,
        username: outcome.user.username,
    }))
}
