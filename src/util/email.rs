use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{header::ContentType, Attachment, Body, Mailbox, MultiPart, SinglePart},
    transport::smtp::{
        authentication::Credentials,
        client::{Tls, TlsParameters},
    },
};
use serde::Serialize;
use tracing::{error, info, instrument, warn};

use crate::config::{ConfigError, EmailConfig};

/// Email service errors
#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("SMTP error: {0}")]
    SmtpError(String),

    #[error("Message building error: {0}")]
    MessageError(String),

    #[error("Address error: {0}")]
    AddressError(String),
}

impl From<ConfigError> for EmailError {
    fn from(err: ConfigError) -> Self {
        EmailError::ConfigError(err.to_string())
    }
}

/// Binary attachment (quote PDF, CV, ...)
#[derive(Debug, Clone)]
pub struct EmailAttachment {
    pub filename: String,
    pub content_type: String,
    pub content: Vec<u8>,
}

/// Email message builder
#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub text_body: Option<String>,
    pub html_body: Option<String>,
    pub attachments: Vec<EmailAttachment>,
}

impl EmailMessage {
    pub fn new(to: String, subject: String) -> Self {
        Self {
            to,
            subject,
            text_body: None,
            html_body: None,
            attachments: Vec::new(),
        }
    }

    pub fn with_text_body(mut self, body: String) -> Self {
        self.text_body = Some(body);
        self
    }

    pub fn with_html_body(mut self, body: String) -> Self {
        self.html_body = Some(body);
        self
    }

    pub fn with_attachment(mut self, attachment: EmailAttachment) -> Self {
        self.attachments.push(attachment);
        self
    }
}

/// Sender abstraction so services can be exercised without an SMTP server
#[async_trait]
pub trait EmailService: Send + Sync {
    async fn send_email(&self, message: EmailMessage) -> Result<(), EmailError>;
}

/// Outcome of a batch of independent sends
#[derive(Debug, Clone, Copy, Serialize)]
pub struct DispatchReport {
    pub success: usize,
    pub failed: usize,
    pub total: usize,
}

impl DispatchReport {
    /// The only caller-visible hard failure: nothing went out at all.
    /// Partial failures are reported through the counts but the submission
    /// still counts as received.
    pub fn is_hard_failure(&self) -> bool {
        self.total > 0 && self.success == 0
    }
}

/// Send the client-facing and internal copies concurrently. Both sends are
/// always attempted; neither waits for or depends on the other, and a
/// failed send is logged and counted, never retried.
pub async fn dispatch_pair(
    service: &dyn EmailService,
    client_message: EmailMessage,
    internal_message: EmailMessage,
) -> DispatchReport {
    let client_to = client_message.to.clone();
    let internal_to = internal_message.to.clone();

    let (client_result, internal_result) = tokio::join!(
        service.send_email(client_message),
        service.send_email(internal_message),
    );

    let mut success = 0;
    let mut failed = 0;
    for (recipient, result) in [(client_to, client_result), (internal_to, internal_result)] {
        match result {
            Ok(()) => success += 1,
            Err(e) => {
                warn!("Failed to send email to {}: {}", recipient, e);
                failed += 1;
            }
        }
    }

    DispatchReport { success, failed, total: success + failed }
}

/// SMTP email service implementation
pub struct SmtpEmailService {
    pub config: EmailConfig,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpEmailService {
    /// Create a new SMTP email service
    #[instrument(skip(config), fields(host = %config.smtp_host, port = config.smtp_port))]
    pub fn new(config: EmailConfig) -> Result<Self, EmailError> {
        info!("Initializing SMTP email service");

        config.validate().map_err(EmailError::from)?;

        let mut transport_builder =
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
                .port(config.smtp_port)
                .timeout(Some(std::time::Duration::from_secs(config.connection_timeout_secs)));

        // Configure TLS settings
        if config.use_tls {
            let tls_parameters = TlsParameters::new(config.smtp_host.clone())
                .map_err(|e| EmailError::ConfigError(format!("TLS configuration error: {}", e)))?;

            if config.use_starttls {
                transport_builder = transport_builder.tls(Tls::Required(tls_parameters));
            } else {
                transport_builder = transport_builder.tls(Tls::Wrapper(tls_parameters));
            }
        } else {
            transport_builder = transport_builder.tls(Tls::None);
        }

        // Configure authentication if credentials are provided
        if !config.smtp_username.is_empty() && !config.smtp_password.is_empty() {
            let credentials = Credentials::new(
                config.smtp_username.clone(),
                config.smtp_password.clone(),
            );
            transport_builder = transport_builder.credentials(credentials);
        }

        let transport = transport_builder.build();

        info!("SMTP email service initialized successfully");
        Ok(Self { config, transport })
    }

    /// Build a lettre Message from EmailMessage
    fn build_message(&self, email_message: EmailMessage) -> Result<Message, EmailError> {
        let from_mailbox: Mailbox = format!("{} <{}>", self.config.from_name, self.config.from_email)
            .parse()
            .map_err(|e| EmailError::AddressError(format!("Invalid from address: {}", e)))?;

        let to_mailbox: Mailbox = email_message.to
            .parse()
            .map_err(|e| EmailError::AddressError(format!("Invalid to address: {}", e)))?;

        let message_builder = Message::builder()
            .from(from_mailbox)
            .to(to_mailbox)
            .subject(&email_message.subject);

        // Body part: text, HTML or both
        let body_part = match (email_message.text_body, email_message.html_body) {
            (Some(text), Some(html)) => BodyPart::Multi(MultiPart::alternative_plain_html(text, html)),
            (Some(text), None) => BodyPart::Single(
                SinglePart::builder()
                    .header(ContentType::TEXT_PLAIN)
                    .body(text),
            ),
            (None, Some(html)) => BodyPart::Single(
                SinglePart::builder()
                    .header(ContentType::TEXT_HTML)
                    .body(html),
            ),
            (None, None) => {
                return Err(EmailError::MessageError("No message body provided".to_string()));
            }
        };

        if email_message.attachments.is_empty() {
            let message = match body_part {
                BodyPart::Multi(multi) => message_builder.multipart(multi),
                BodyPart::Single(single) => message_builder.singlepart(single),
            }
            .map_err(|e| EmailError::MessageError(format!("Failed to build message: {}", e)))?;
            return Ok(message);
        }

        let mut mixed = match body_part {
            BodyPart::Multi(multi) => MultiPart::mixed().multipart(multi),
            BodyPart::Single(single) => MultiPart::mixed().singlepart(single),
        };
        for attachment in email_message.attachments {
            let content_type = ContentType::parse(&attachment.content_type)
                .map_err(|e| EmailError::MessageError(format!("Invalid attachment content type: {}", e)))?;
            mixed = mixed.singlepart(
                Attachment::new(attachment.filename)
                    .body(Body::new(attachment.content), content_type),
            );
        }

        let message = message_builder
            .multipart(mixed)
            .map_err(|e| EmailError::MessageError(format!("Failed to build message with attachments: {}", e)))?;
        Ok(message)
    }

    /// Validate email address format
    fn validate_email_address(&self, email: &str) -> Result<(), EmailError> {
        if email.is_empty() {
            return Err(EmailError::AddressError("Email address cannot be empty".to_string()));
        }

        if !email.contains('@') {
            return Err(EmailError::AddressError("Invalid email format".to_string()));
        }

        let parts: Vec<&str> = email.split('@').collect();
        if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
            return Err(EmailError::AddressError("Invalid email format".to_string()));
        }

        Ok(())
    }
}

enum BodyPart {
    Multi(MultiPart),
    Single(SinglePart),
}

#[async_trait]
impl EmailService for SmtpEmailService {
    /// Send an email message
    #[instrument(skip(self, message), fields(to = %message.to, subject = %message.subject))]
    async fn send_email(&self, message: EmailMessage) -> Result<(), EmailError> {
        info!("Sending email to: {}", message.to);

        self.validate_email_address(&message.to)?;

        let email_message = self.build_message(message)?;

        self.transport
            .send(email_message)
            .await
            .map_err(|e| {
                error!("Failed to send email: {}", e);
                EmailError::SmtpError(format!("Failed to send email: {}", e))
            })?;

        info!("Email sent successfully");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> SmtpEmailService {
        SmtpEmailService::new(EmailConfig::from_test_env()).expect("test smtp service")
    }

    #[tokio::test]
    async fn test_build_message_with_both_bodies() {
        let message = EmailMessage::new("dest@example.com".to_string(), "Hola".to_string())
            .with_text_body("texto".to_string())
            .with_html_body("<p>html</p>".to_string());
        assert!(service().build_message(message).is_ok());
    }

    #[tokio::test]
    async fn test_build_message_without_body_fails() {
        let message = EmailMessage::new("dest@example.com".to_string(), "Hola".to_string());
        assert!(service().build_message(message).is_err());
    }

    #[tokio::test]
    async fn test_build_message_with_attachment() {
        let message = EmailMessage::new("dest@example.com".to_string(), "Presupuesto".to_string())
            .with_html_body("<p>adjunto</p>".to_string())
            .with_attachment(EmailAttachment {
                filename: "presupuesto-PRE-7000.pdf".to_string(),
                content_type: "application/pdf".to_string(),
                content: vec![0x25, 0x50, 0x44, 0x46],
            });
        assert!(service().build_message(message).is_ok());
    }

    #[tokio::test]
    async fn test_build_message_invalid_attachment_content_type() {
        let message = EmailMessage::new("dest@example.com".to_string(), "Presupuesto".to_string())
            .with_html_body("<p>adjunto</p>".to_string())
            .with_attachment(EmailAttachment {
                filename: "cv".to_string(),
                content_type: "not a mime type at all ***".to_string(),
                content: vec![1, 2, 3],
            });
        assert!(service().build_message(message).is_err());
    }

    #[tokio::test]
    async fn test_validate_email_address() {
        let svc = service();
        assert!(svc.validate_email_address("a@b.com").is_ok());
        assert!(svc.validate_email_address("").is_err());
        assert!(svc.validate_email_address("nope").is_err());
        assert!(svc.validate_email_address("@b.com").is_err());
    }

    #[test]
    fn test_hard_failure_only_when_nothing_succeeded() {
        assert!(DispatchReport { success: 0, failed: 2, total: 2 }.is_hard_failure());
        assert!(!DispatchReport { success: 1, failed: 1, total: 2 }.is_hard_failure());
        assert!(!DispatchReport { success: 2, failed: 0, total: 2 }.is_hard_failure());
    }
}
