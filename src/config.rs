use secrecy::SecretBox;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    /// トークン署名用シークレット（必須）
    pub jwt_secret: SecretBox<String>,
    /// 未設定の場合はインメモリストアで起動
    pub database_url: Option<SecretBox<String>>,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,

    // SMTP設定（未設定時はログ出力のみのメーラーを使用）
    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    pub smtp_username: Option<SecretBox<String>>,
    pub smtp_password: Option<SecretBox<String>>,
    /// 旧名 EMAIL（SMTP_USERNAME が優先）
    pub email: Option<SecretBox<String>>,
    /// 旧名 EMAIL_PASSWORD（SMTP_PASSWORD が優先）
    pub email_password: Option<SecretBox<String>>,
    #[serde(default)]
    pub smtp_from_address: Option<String>,

    // トークン設定
    #[serde(default = "default_password_reset_url_base")]
    pub password_reset_url_base: String,
    #[serde(default = "default_login_token_ttl_secs")]
    pub login_token_ttl_secs: i64,
    #[serde(default = "default_password_reset_token_ttl_secs")]
    pub password_reset_token_ttl_secs: i64,

    /// 許可するオリジン（未設定時は全許可）
    #[serde(default)]
    pub cors_allowed_origin: Option<String>,
}

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";
const DEFAULT_SMTP_PORT: u16 = 587;
const DEFAULT_PASSWORD_RESET_URL_BASE: &str = "http://localhost:3004/reset-password";
const DEFAULT_LOGIN_TOKEN_TTL_SECS: i64 = 3600;
const DEFAULT_PASSWORD_RESET_TOKEN_TTL_SECS: i64 = 900;

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_smtp_host() -> String {
    DEFAULT_SMTP_HOST.to_string()
}

fn default_smtp_port() -> u16 {
    DEFAULT_SMTP_PORT
}

fn default_password_reset_url_base() -> String {
    DEFAULT_PASSWORD_RESET_URL_BASE.to_string()
}

fn default_login_token_ttl_secs() -> i64 {
    DEFAULT_LOGIN_TOKEN_TTL_SECS
}

fn default_password_reset_token_ttl_secs() -> i64 {
    DEFAULT_PASSWORD_RESET_TOKEN_TTL_SECS
}

impl Config {
    pub fn load() -> Result<Self, envy::Error> {
        envy::from_env()
    }

    /// 任意のキー・値の組から設定を構築（テスト用途）
    pub fn from_vars<I>(vars: I) -> Result<Self, envy::Error>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::from_iter(vars)
    }

    /// SMTPユーザー名（SMTP_USERNAME、なければ EMAIL）
    pub fn smtp_login(&self) -> Option<&SecretBox<String>> {
        self.smtp_username.as_ref().or(self.email.as_ref())
    }

    /// SMTPユーザー名とパスワードの組（どちらか欠けていれば None）
    pub fn smtp_credentials(&self) -> Option<(&SecretBox<String>, &SecretBox<String>)> {
        let password = self
            .smtp_password
            .as_ref()
            .or(self.email_password.as_ref())?;
        Some((self.smtp_login()?, password))
    }

    /// SMTP認証情報が揃っているか
    pub fn smtp_configured(&self) -> bool {
        self.smtp_credentials().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_applied() {
        let config = Config::from_vars(vars(&[("JWT_SECRET", "secret")])).unwrap();
        assert_eq!(config.jwt_secret.expose_secret(), "secret");
        assert!(config.database_url.is_none());
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.smtp_host, "smtp.gmail.com");
        assert_eq!(config.login_token_ttl_secs, 3600);
        assert_eq!(config.password_reset_token_ttl_secs, 900);
        assert_eq!(
            config.password_reset_url_base,
            "http://localhost:3004/reset-password"
        );
        assert!(!config.smtp_configured());
    }

    #[test]
    fn test_missing_jwt_secret() {
        let result = Config::from_vars(vars(&[("PORT", "8080")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_legacy_email_variables() {
        let config = Config::from_vars(vars(&[
            ("JWT_SECRET", "secret"),
            ("EMAIL", "noreply@example.com"),
            ("EMAIL_PASSWORD", "app-password"),
        ]))
        .unwrap();
        assert!(config.smtp_configured());
        assert_eq!(
            config.smtp_login().unwrap().expose_secret(),
            "noreply@example.com"
        );
    }

    #[test]
    fn test_new_and_legacy_email_variables_together() {
        let config = Config::from_vars(vars(&[
            ("JWT_SECRET", "secret"),
            ("SMTP_USERNAME", "smtp@example.com"),
            ("EMAIL", "legacy@example.com"),
            ("SMTP_PASSWORD", "smtp-password"),
            ("EMAIL_PASSWORD", "legacy-password"),
        ]))
        .unwrap();

        let (username, password) = config.smtp_credentials().unwrap();
        assert_eq!(username.expose_secret(), "smtp@example.com");
        assert_eq!(password.expose_secret(), "smtp-password");
    }

    #[test]
    fn test_credentials_require_password() {
        let config = Config::from_vars(vars(&[
            ("JWT_SECRET", "secret"),
            ("EMAIL", "noreply@example.com"),
        ]))
        .unwrap();
        assert!(config.smtp_credentials().is_none());
        assert!(!config.smtp_configured());
    }
}
