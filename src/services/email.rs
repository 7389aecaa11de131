use std::sync::Arc;

use async_trait::async_trait;

use crate::error::AppError;

/// 送信するメール1通分
#[derive(Debug, Clone)]
pub struct OutgoingMail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// メール送信トランスポート
#[async_trait]
pub trait Mailer: Send + Sync {
    /// トランスポート種別（ヘルスチェック表示用）
    fn transport(&self) -> &'static str;

    async fn send(&self, mail: OutgoingMail) -> Result<(), AppError>;
}

/// ログ出力のみのメーラー（開発環境用）
#[derive(Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    fn transport(&self) -> &'static str {
        "log"
    }

    async fn send(&self, mail: OutgoingMail) -> Result<(), AppError> {
        tracing::info!(
            to = %mail.to,
            subject = %mail.subject,
            "メール送信（開発モード）"
        );
        tracing::info!("本文: {}", mail.body);
        Ok(())
    }
}

#[cfg(feature = "email")]
pub use smtp::SmtpMailer;

#[cfg(feature = "email")]
mod smtp {
    use async_trait::async_trait;
    use lettre::message::Mailbox;
    use lettre::message::header::ContentType;
    use lettre::transport::smtp::authentication::Credentials;
    use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

    use super::{Mailer, OutgoingMail};
    use crate::error::AppError;

    /// SMTP（STARTTLS）経由のメーラー
    #[derive(Clone)]
    pub struct SmtpMailer {
        transport: AsyncSmtpTransport<Tokio1Executor>,
    }

    impl SmtpMailer {
        pub fn new(
            host: &str,
            port: u16,
            username: String,
            password: String,
        ) -> Result<Self, AppError> {
            let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                .map_err(|e| {
                    tracing::error!(error = ?e, host = %host, "SMTPトランスポートの初期化に失敗");
                    AppError::Mail(e.to_string())
                })?
                .port(port)
                .credentials(Credentials::new(username, password))
                .build();

            Ok(Self { transport })
        }
    }

    #[async_trait]
    impl Mailer for SmtpMailer {
        fn transport(&self) -> &'static str {
            "smtp"
        }

        async fn send(&self, mail: OutgoingMail) -> Result<(), AppError> {
            let from: Mailbox = mail
                .from
                .parse()
                .map_err(|e| AppError::Mail(format!("invalid from address: {e}")))?;
            let to: Mailbox = mail
                .to
                .parse()
                .map_err(|e| AppError::Mail(format!("invalid to address: {e}")))?;

            let message = Message::builder()
                .from(from)
                .to(to)
                .subject(mail.subject)
                .header(ContentType::TEXT_PLAIN)
                .body(mail.body)
                .map_err(|e| AppError::Mail(e.to_string()))?;

            self.transport
                .send(message)
                .await
                .map_err(|e| AppError::Mail(e.to_string()))?;

            Ok(())
        }
    }
}

/// メール送信サービス
#[derive(Clone)]
pub struct EmailService {
    mailer: Arc<dyn Mailer>,
    from_address: String,
}

impl EmailService {
    /// 新しい EmailService を作成
    pub fn new(mailer: Arc<dyn Mailer>, from_address: String) -> Self {
        Self {
            mailer,
            from_address,
        }
    }

    /// パスワードリセットメールを送信
    ///
    /// 送信完了まで待機する（キューイングなし）。
    pub async fn send_password_reset_email(
        &self,
        to: &str,
        reset_url: &str,
    ) -> Result<(), AppError> {
        let mail = OutgoingMail {
            from: self.from_address.clone(),
            to: to.to_string(),
            subject: "Password Reset".to_string(),
            body: format!("Click the link to reset your password: {}", reset_url),
        };

        self.mailer.send(mail).await?;

        tracing::info!(to = %to, "パスワードリセットメール送信完了");

        Ok(())
    }

    pub fn transport(&self) -> &'static str {
        self.mailer.transport()
    }
}
