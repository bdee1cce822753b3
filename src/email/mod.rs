/// Email sending functionality
///
/// Messages go out over SMTP through lettre. With `email.mock` set they are
/// only logged, which is the default outside production.

pub mod smtp;
pub mod templates;

use crate::app_config::{self, EmailConfig};

/// Email sending result
pub type EmailResult<T> = Result<T, EmailError>;

/// Email errors
#[derive(Debug)]
pub enum EmailError {
    /// SMTP configuration error
    ConfigError(String),
    /// Email building error
    BuildError(lettre::error::Error),
    /// Email sending error
    SendError(lettre::transport::smtp::Error),
}

impl std::fmt::Display for EmailError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmailError::ConfigError(msg) => write!(f, "Email config error: {}", msg),
            EmailError::BuildError(e) => write!(f, "Email build error: {}", e),
            EmailError::SendError(e) => write!(f, "Email send error: {}", e),
        }
    }
}

impl std::error::Error for EmailError {}

impl From<lettre::error::Error> for EmailError {
    fn from(e: lettre::error::Error) -> Self {
        EmailError::BuildError(e)
    }
}

impl From<lettre::transport::smtp::Error> for EmailError {
    fn from(e: lettre::transport::smtp::Error) -> Self {
        EmailError::SendError(e)
    }
}

/// A rendered message ready for delivery.
#[derive(Clone, Debug)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub body_text: String,
    pub body_html: Option<String>,
}

/// Send an email using the current configuration.
pub async fn send_email(email: &OutgoingEmail) -> EmailResult<()> {
    send_email_with(&app_config::email(), email).await
}

pub async fn send_email_with(config: &EmailConfig, email: &OutgoingEmail) -> EmailResult<()> {
    if config.mock {
        log::info!("MOCK EMAIL:");
        log::info!("  To: {}", email.to);
        log::info!("  Subject: {}", email.subject);
        log::info!("  Body: {}", email.body_text);
        return Ok(());
    }

    smtp::send_email(config, email).await
}

/// Sends in the background. Failures are logged and otherwise dropped.
pub fn spawn_email(email: OutgoingEmail) {
    actix::spawn(async move {
        if let Err(e) = send_email(&email).await {
            log::error!("Failed to send '{}' to {}: {}", email.subject, email.to, e);
        }
    });
}
