use axum::{Json, extract::State};
use garde::Validate;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::extract::ValidatedJson;
use crate::services::PasswordResetService;
use crate::state::AppState;

// === リセットリクエスト ===

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct ForgotPasswordRequest {
    #[garde(length(min = 1), email)]
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// POST /forgot-password
///
/// メール送信完了まで待ってから応答する。
pub async fn forgot_password(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    reset_service(&state).request_reset(&request.email).await?;

    Ok(Json(MessageResponse {
        message: "Password reset link sent to your email".to_string(),
    }))
}

// === パスワードリセット実行 ===

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct ResetPasswordRequest {
    #[garde(length(min = 1))]
    pub token: String,
    #[garde(length(min = 1))]
    pub password: String,
}

/// POST /reset-password
///
/// # Security
/// - token, password はログに出力しない
pub async fn reset_password(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    reset_service(&state)
        .reset_password(&request.token, &request.password)
        .await?;

    Ok(Json(MessageResponse {
        message: "Password has been reset successfully".to_string(),
    }))
}

fn reset_service(state: &AppState) -> PasswordResetService {
    PasswordResetService::new(
        state.user_repo.clone(),
        state.token_service.clone(),
        state.email_service.clone(),
        state.config.password_reset_url_base.clone(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_empty_email() {
        let request = ForgotPasswordRequest {
            email: "".to_string(),
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_validate_invalid_email() {
        let request = ForgotPasswordRequest {
            email: "invalid-email".to_string(),
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_validate_valid_email() {
        let request = ForgotPasswordRequest {
            email: "test@example.com".to_string(),
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_token() {
        let request = ResetPasswordRequest {
            token: "".to_string(),
            password: "secret2".to_string(),
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_validate_empty_password() {
        let request = ResetPasswordRequest {
            token: "valid-token".to_string(),
            password: "".to_string(),
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_validate_valid_reset_request() {
        let request = ResetPasswordRequest {
            token: "valid-token".to_string(),
            password: "secret2".to_string(),
        };
        assert!(request.validate().is_ok());
    }
}
