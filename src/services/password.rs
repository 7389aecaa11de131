use std::sync::LazyLock;

use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};

use crate::error::AppError;

/// ユーザー不在時に照合するダミーハッシュ（応答時間を揃えるため）
static DUMMY_HASH: LazyLock<String> =
    LazyLock::new(|| hash_password("passgate-dummy-password").unwrap_or_default());

/// パスワードをargon2idでハッシュ化
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| {
            tracing::error!(error = ?e, "パスワードハッシュ生成エラー");
            AppError::Internal(anyhow::anyhow!("password hash error"))
        })?;
    Ok(hash.to_string())
}

/// パスワードを検証
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|e| {
        tracing::error!(error = ?e, "パスワードハッシュのパースエラー");
        AppError::Internal(anyhow::anyhow!("password hash parse error"))
    })?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// タイミング攻撃対策: 結果を捨てるダミー検証
pub fn verify_dummy(password: &str) {
    let _ = verify_password(password, &DUMMY_HASH);
}

/// argon2 はCPUを占有するため、ブロッキング用スレッドで実行する
async fn run_blocking<T, F>(task: F) -> Result<T, AppError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, AppError> + Send + 'static,
{
    tokio::task::spawn_blocking(task).await.map_err(|e| {
        tracing::error!(error = %e, "パスワード処理タスク異常終了");
        AppError::Internal(e.into())
    })?
}

/// [`hash_password`] の非同期版
pub async fn hash_password_async(password: &str) -> Result<String, AppError> {
    let password = password.to_owned();
    run_blocking(move || hash_password(&password)).await
}

/// [`verify_password`] の非同期版
pub async fn verify_password_async(password: &str, hash: &str) -> Result<bool, AppError> {
    let password = password.to_owned();
    let hash = hash.to_owned();
    run_blocking(move || verify_password(&password, &hash)).await
}

/// [`verify_dummy`] の非同期版
pub async fn verify_dummy_async(password: &str) {
    let password = password.to_owned();
    let _ = run_blocking(move || {
        verify_dummy(&password);
        Ok(())
    })
    .await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("secret1").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("secret1", &hash).unwrap());
        assert!(!verify_password("wrong", &hash).unwrap());
    }

    #[test]
    fn test_hash_is_salted() {
        let first = hash_password("same-password").unwrap();
        let second = hash_password("same-password").unwrap();
        assert_ne!(first, second);
        assert_ne!(first, "same-password");
    }

    #[test]
    fn test_verify_invalid_hash_format() {
        let result = verify_password("secret1", "invalid_hash_format");
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_async_hash_and_verify() {
        let hash = hash_password_async("secret1").await.unwrap();
        assert!(verify_password_async("secret1", &hash).await.unwrap());
        assert!(!verify_password_async("wrong", &hash).await.unwrap());
        assert!(
            verify_password_async("secret1", "invalid_hash_format")
                .await
                .is_err()
        );
        verify_dummy_async("secret1").await;
    }
}
