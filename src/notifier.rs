//! Notification transports

use crate::alert::Notifier;
use crate::config::NotifierConfig;
use crate::errors::{MonitorError, Result};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::{Credentials, Mechanism};
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const SMTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Sends alerts as plain-text mail through an SMTP relay.
///
/// STARTTLS is used when the relay offers it. PLAIN credentials are sent
/// only when a password is configured.
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpNotifier {
    pub fn new(host: &str, port: u16, from: &str, password: &str) -> Result<Self> {
        let sender: Mailbox = from
            .parse()
            .map_err(|e| MonitorError::Config(format!("invalid EMAIL_FROM {:?}: {}", from, e)))?;

        let tls = TlsParameters::new(host.to_string())?;
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
            .port(port)
            .tls(Tls::Opportunistic(tls))
            .timeout(Some(SMTP_TIMEOUT));

        if !password.is_empty() {
            builder = builder
                .credentials(Credentials::new(from.to_string(), password.to_string()))
                .authentication(vec![Mechanism::Plain]);
        }

        Ok(Self {
            transport: builder.build(),
            from: sender,
        })
    }

    fn build_message(&self, to: &str, subject: &str, body: &str) -> Result<Message> {
        let recipient: Mailbox = to
            .parse()
            .map_err(|e| MonitorError::Notify(format!("invalid recipient {:?}: {}", to, e)))?;

        Message::builder()
            .from(self.from.clone())
            .to(recipient)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| MonitorError::Notify(format!("could not build message: {}", e)))
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    fn name(&self) -> &str {
        "smtp"
    }

    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        let message = self.build_message(to, subject, body)?;
        let response = self.transport.send(message).await?;
        debug!("Mail relay accepted message for {}: {}", to, response.code());
        Ok(())
    }
}

/// Writes alerts to the log only
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &str {
        "log"
    }

    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        warn!(to = %to, subject = %subject, "{}", body);
        Ok(())
    }
}

/// SMTP when `SMTP_HOST` is configured, otherwise the log
pub fn from_config(config: &NotifierConfig) -> Result<Arc<dyn Notifier>> {
    match &config.smtp_host {
        Some(host) => Ok(Arc::new(SmtpNotifier::new(
            host,
            config.smtp_port,
            &config.from,
            &config.password,
        )?)),
        None => Ok(Arc::new(LogNotifier)),
    }
}
