use axum::{
    Json,
    extract::{FromRequest, Request},
};
use garde::Validate;
use serde::de::DeserializeOwned;

use crate::error::AppError;

/// JSON ボディをデシリアライズし、garde で検証するエクストラクタ
///
/// 不正な JSON・型不一致・検証エラーはすべて `AppError::Validation`（400）になる。
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    T::Context: Default,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::Validation(rejection.body_text()))?;

        value.validate().map_err(|report| {
            tracing::debug!(error = %report, "リクエスト検証エラー");
            AppError::Validation(report.to_string())
        })?;

        Ok(Self(value))
    }
}
