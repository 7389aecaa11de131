use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::error::AppError;

/// トークンの用途。用途違いのトークンは検証で拒否する
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenPurpose {
    Login,
    PasswordReset,
}

/// JWT クレーム
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub purpose: TokenPurpose,
    /// 発行時点のユーザーの token_version（リセットトークンのみ）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ver: Option<i32>,
    pub iat: i64,
    pub exp: i64,
}

/// 署名付きベアラートークンの発行・検証（HS256）
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    login_ttl: Duration,
    reset_ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str, login_ttl: Duration, reset_ttl: Duration) -> Result<Self, AppError> {
        if secret.is_empty() {
            return Err(AppError::Internal(anyhow::anyhow!(
                "token signing secret must not be empty"
            )));
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            login_ttl,
            reset_ttl,
        })
    }

    /// ログイントークンを発行
    pub fn issue_login_token(&self, user_id: Uuid) -> Result<String, AppError> {
        self.issue(user_id, TokenPurpose::Login, None, self.login_ttl)
    }

    /// パスワードリセットトークンを発行
    pub fn issue_reset_token(&self, user_id: Uuid, token_version: i32) -> Result<String, AppError> {
        self.issue(
            user_id,
            TokenPurpose::PasswordReset,
            Some(token_version),
            self.reset_ttl,
        )
    }

    /// 署名・有効期限・用途を検証してクレームを返す
    ///
    /// 失敗理由は区別せず `AppError::InvalidToken` を返す。
    pub fn verify(&self, token: &str, purpose: TokenPurpose) -> Result<Claims, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| {
                tracing::warn!(error = %e, "トークン検証失敗");
                AppError::InvalidToken
            })?;

        if data.claims.purpose != purpose {
            tracing::warn!(
                expected = ?purpose,
                actual = ?data.claims.purpose,
                "トークン用途不一致"
            );
            return Err(AppError::InvalidToken);
        }

        Ok(data.claims)
    }

    fn issue(
        &self,
        user_id: Uuid,
        purpose: TokenPurpose,
        ver: Option<i32>,
        ttl: Duration,
    ) -> Result<String, AppError> {
        let now = OffsetDateTime::now_utc();
        let claims = Claims {
            sub: user_id,
            purpose,
            ver,
            iat: now.unix_timestamp(),
            exp: (now + ttl).unix_timestamp(),
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key).map_err(
            |e| {
                tracing::error!(error = ?e, "トークン署名エラー");
                AppError::Internal(anyhow::anyhow!("token signing error"))
            },
        )
    }
}
