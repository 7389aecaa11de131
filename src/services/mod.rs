pub mod auth;
pub mod email;
pub mod password;
pub mod password_reset;
pub mod token;

#[cfg(feature = "email")]
pub use email::SmtpMailer;
pub use auth::AuthService;
pub use email::{EmailService, LogMailer, Mailer, OutgoingMail};
pub use password_reset::PasswordResetService;
pub use token::{TokenPurpose, TokenService};
