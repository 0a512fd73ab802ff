use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials, Message,
    SmtpTransport, Transport,
};
use secrecy::ExposeSecret;

use crate::config::SmtpConfig;
use crate::services::ServiceError;

#[async_trait]
pub trait EmailProvider: Send + Sync {
    async fn send_mfa_code(&self, to_email: &str, code: &str) -> Result<(), ServiceError>;
}

#[derive(Clone)]
pub struct SmtpEmailService {
    mailer: SmtpTransport,
    from_email: String,
}

impl SmtpEmailService {
    pub fn new(config: &SmtpConfig) -> Result<Self, ServiceError> {
        let mut builder = SmtpTransport::starttls_relay(&config.host)
            .map_err(|e| ServiceError::Email(e.to_string()))?
            .port(config.port)
            .timeout(Some(Duration::from_secs(10)));

        if !config.user.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.user.clone(),
                config.password.expose_secret().clone(),
            ));
        }

        tracing::info!(host = %config.host, port = config.port, "Email service initialized");

        Ok(Self {
            mailer: builder.build(),
            from_email: config.from.clone(),
        })
    }
}

#[async_trait]
impl EmailProvider for SmtpEmailService {
    async fn send_mfa_code(&self, to_email: &str, code: &str) -> Result<(), ServiceError> {
        let email = Message::builder()
            .from(
                self.from_email
                    .parse()
                    .map_err(|e: lettre::address::AddressError| ServiceError::Email(e.to_string()))?,
            )
            .to(to_email
                .parse()
                .map_err(|e: lettre::address::AddressError| ServiceError::Email(e.to_string()))?)
            .subject("Your Guardian verification code")
            .header(ContentType::TEXT_PLAIN)
            .body(format!(
                "Your Guardian verification code is {}.\n\n\
                 It expires in a few minutes. If you did not try to sign in, \
                 change your password.",
                code
            ))
            .map_err(|e| ServiceError::Email(e.to_string()))?;

        // SmtpTransport blocks; keep it off the async workers.
        let mailer = self.mailer.clone();
        let result = tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| ServiceError::Internal(e.into()))?;

        match result {
            Ok(_) => {
                tracing::info!("Verification code email sent");
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to send verification code email");
                Err(ServiceError::Email(e.to_string()))
            }
        }
    }
}

/// Records every code instead of sending it.
#[derive(Default)]
pub struct MockEmailService {
    sent: Mutex<Vec<(String, String)>>,
}

impl MockEmailService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent code sent to `email`.
    pub fn last_code_for(&self, email: &str) -> Option<String> {
        self.sent.lock().ok().and_then(|sent| {
            sent.iter()
                .rev()
                .find(|(to, _)| to == email)
                .map(|(_, code)| code.clone())
        })
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().map(|sent| sent.len()).unwrap_or(0)
    }
}

#[async_trait]
impl EmailProvider for MockEmailService {
    async fn send_mfa_code(&self, to_email: &str, code: &str) -> Result<(), ServiceError> {
        self.sent
            .lock()
            .map_err(|e| ServiceError::Internal(anyhow::anyhow!("Mock mailbox poisoned: {}", e)))?
            .push((to_email.to_string(), code.to_string()));
        Ok(())
    }
}
