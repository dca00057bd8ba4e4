//! Email delivery for verification links.
//!
//! SMTP via lettre. The mailer is optional: when SMTP is not
//! configured, senders log a warning and carry on, so signup never
//! fails on a mail problem.

use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::header::ContentType,
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use booknest_core::Email;

use crate::config::EmailConfig;

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("invalid email address: {0}")]
    InvalidAddress(#[from] lettre::address::AddressError),
}

/// Transactional mailer.
#[derive(Clone)]
pub struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl Mailer {
    /// Create a mailer from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the SMTP relay cannot be configured.
    pub fn new(config: &EmailConfig) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            transport,
            from_address: config.from_address.clone(),
        })
    }

    /// Send the account-verification email.
    ///
    /// # Errors
    ///
    /// Returns an error when the message cannot be built or delivered.
    pub async fn send_verification(&self, to: &Email, link: &str) -> Result<(), EmailError> {
        let body = format!(
            "Welcome to BookNest!\n\n\
             Confirm your email address by opening this link:\n\n\
             {link}\n\n\
             The link expires in 7 days. If you didn't create an account,\n\
             you can ignore this message.\n"
        );

        let message = Message::builder()
            .from(self.from_address.parse()?)
            .to(to.as_str().parse()?)
            .subject("Verify your BookNest account")
            .header(ContentType::TEXT_PLAIN)
            .body(body)?;

        self.transport.send(message).await?;
        Ok(())
    }
}
