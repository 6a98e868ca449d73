//! Outbound email.
//!
//! [`Mailer`] is the seam the registration flow talks to. [`SmtpMailer`]
//! delivers over SMTP via lettre with Askama text + HTML templates.

use askama::Template;
use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use rockland_core::Email;

use crate::config::EmailConfig;

const CONFIRMATION_SUBJECT: &str = "Email Verification";

#[derive(Template)]
#[template(path = "email/confirm_email.html")]
struct ConfirmEmailHtml<'a> {
    first_name: &'a str,
    link: &'a str,
}

#[derive(Template)]
#[template(path = "email/confirm_email.txt")]
struct ConfirmEmailText<'a> {
    first_name: &'a str,
    link: &'a str,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// Delivery of account emails.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Send the "confirm your address" message containing `link`.
    async fn send_email_confirmation(
        &self,
        to: &Email,
        first_name: &str,
        link: &str,
    ) -> Result<(), EmailError>;
}

/// SMTP delivery through a STARTTLS relay.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// Create a mailer from configuration.
    ///
    /// # Errors
    ///
    /// Returns `EmailError::Smtp` if the relay cannot be configured and
    /// `EmailError::InvalidAddress` if the sender address does not parse.
    pub fn new(config: &EmailConfig) -> Result<Self, EmailError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        let address = config
            .from_address
            .parse()
            .map_err(|_| EmailError::InvalidAddress(config.from_address.clone()))?;

        Ok(Self {
            transport,
            from: Mailbox::new(Some(config.from_name.clone()), address),
        })
    }

    async fn send_multipart_email(
        &self,
        to: &str,
        subject: &str,
        text_body: String,
        html_body: String,
    ) -> Result<(), EmailError> {
        let email = Message::builder()
            .from(self.from.clone())
            .to(to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_body),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body),
                    ),
            )?;

        self.transport.send(email).await?;

        tracing::info!(to = %to, subject = %subject, "Email sent successfully");
        Ok(())
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_email_confirmation(
        &self,
        to: &Email,
        first_name: &str,
        link: &str,
    ) -> Result<(), EmailError> {
        let (text, html) = render_confirmation(first_name, link)?;
        self.send_multipart_email(to.as_str(), CONFIRMATION_SUBJECT, text, html)
            .await
    }
}

/// Render the plain-text and HTML confirmation bodies.
fn render_confirmation(first_name: &str, link: &str) -> Result<(String, String), EmailError> {
    let text = ConfirmEmailText { first_name, link }.render()?;
    let html = ConfirmEmailHtml { first_name, link }.render()?;
    Ok((text, html))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_confirmation_bodies_contain_link() {
        let link = "https://orders.example.com/confirm-email?token=abc&email=a%40x.com";
        let (text, html) = render_confirmation("Alice", link).unwrap();

        assert!(text.contains("Hello Alice,"));
        assert!(text.contains(link));
        assert!(html.contains("Hello Alice,"));
        assert!(html.contains("confirm-email?token=abc"));
    }
}
