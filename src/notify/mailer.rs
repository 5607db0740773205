use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::{debug, info};

use crate::{
    config::{SmtpConfig, TlsMode},
    error::{NotifyError, Result},
    notify::message::OutboundEmail,
};

/// Submits one composed message for delivery
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Sends `email` to all of its recipients in a single message.
    /// An email without recipients is a no-op.
    async fn send(&self, email: &OutboundEmail) -> Result<()>;
}

/// SMTP delivery through lettre
pub struct SmtpMailer {
    config: SmtpConfig,
}

impl SmtpMailer {
    pub fn new(config: SmtpConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Build the single message carrying every recipient in `To`
    pub fn build_message(&self, email: &OutboundEmail) -> Result<Message> {
        let from: Mailbox = self.config.sender.parse().map_err(|e| {
            NotifyError::Dispatch(format!("Invalid sender address {}: {}", self.config.sender, e))
        })?;

        let mut builder = Message::builder()
            .from(from)
            .subject(email.subject.clone())
            .header(ContentType::TEXT_PLAIN);

        for recipient in &email.recipients {
            let mailbox: Mailbox = recipient.parse().map_err(|e| {
                NotifyError::Dispatch(format!("Invalid recipient address {}: {}", recipient, e))
            })?;
            builder = builder.to(mailbox);
        }

        builder
            .body(email.body.clone())
            .map_err(|e| NotifyError::Dispatch(format!("Failed to build message: {}", e)))
    }

    fn transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>> {
        let host = self.config.host.as_str();
        let builder = match self.config.tls {
            TlsMode::Starttls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                .map_err(|e| NotifyError::Dispatch(format!("SMTP setup failed: {}", e)))?,
            TlsMode::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(host)
                .map_err(|e| NotifyError::Dispatch(format!("SMTP setup failed: {}", e)))?,
            TlsMode::None => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host),
        };

        let mut builder = builder
            .port(self.config.port)
            .timeout(Some(self.config.timeout()));

        if !self.config.password.is_empty() {
            builder = builder.credentials(Credentials::new(
                self.config.sender.clone(),
                self.config.password.clone(),
            ));
        }

        Ok(builder.build())
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: &OutboundEmail) -> Result<()> {
        if email.is_empty() {
            debug!("No recipients, skipping dispatch");
            return Ok(());
        }

        let message = self.build_message(email)?;
        let transport = self.transport()?;

        info!(
            "Sending '{}' to {} recipients via {}:{}",
            email.subject,
            email.recipients.len(),
            self.config.host,
            self.config.port
        );

        match tokio::time::timeout(self.config.timeout(), transport.send(message)).await {
            Ok(Ok(response)) => {
                debug!("SMTP accepted message: {:?}", response.code());
                Ok(())
            }
            Ok(Err(e)) => Err(NotifyError::Dispatch(e.to_string())),
            Err(_) => Err(NotifyError::Dispatch(format!(
                "SMTP send timed out after {}s",
                self.config.timeout_secs
            ))),
        }
    }
}
