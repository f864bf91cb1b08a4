use std::time::Duration;

use async_trait::async_trait;
use herald_queue::QueueEntry;
use lettre::{
    Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::{
        authentication::Credentials,
        client::{Tls, TlsParameters},
    },
};
use serde::Deserialize;

use super::{MailTransport, PartialDeliveryFailure};
use crate::error::{SystemError, TransportError};

const fn default_port() -> u16 {
    587
}

const fn default_timeout_secs() -> u64 {
    30
}

/// How the connection to the relay is secured
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum TlsMode {
    /// Plain text only
    None,
    /// Upgrade with STARTTLS when the server offers it
    #[default]
    Opportunistic,
    /// Require STARTTLS
    StartTls,
    /// TLS from the first byte (usually port 465)
    Wrapper,
}

/// SMTP relay settings
#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub tls: TlsMode,

    /// Accept invalid TLS certificates (for testing only)
    ///
    /// **SECURITY WARNING**: disables certificate validation, making the
    /// relay connection vulnerable to Man-in-the-Middle attacks.
    #[serde(default)]
    pub accept_invalid_certs: bool,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    /// Sender address used in the `From` header and the envelope
    pub from_address: String,

    /// Optional display name for the sender
    #[serde(default)]
    pub from_name: Option<String>,

    /// Per-connection timeout (in seconds)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Delivers through an SMTP relay, one message per receiver
#[derive(Debug, Clone)]
pub struct SmtpTransport {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpTransport {
    /// Build the relay client
    ///
    /// No connection is made until the first delivery.
    ///
    /// # Errors
    /// Returns an error if the sender address is invalid or the TLS
    /// parameters cannot be built.
    pub fn new(config: &SmtpConfig) -> Result<Self, TransportError> {
        let address: Address = config.from_address.parse()?;
        let from = Mailbox::new(config.from_name.clone(), address);

        let tls = match config.tls {
            TlsMode::None => Tls::None,
            mode => {
                let parameters = TlsParameters::builder(config.host.clone())
                    .dangerous_accept_invalid_certs(config.accept_invalid_certs)
                    .build()
                    .map_err(|e| SystemError::Configuration(e.to_string()))?;

                match mode {
                    TlsMode::Wrapper => Tls::Wrapper(parameters),
                    TlsMode::StartTls => Tls::Required(parameters),
                    _ => Tls::Opportunistic(parameters),
                }
            }
        };

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
            .port(config.port)
            .tls(tls)
            .timeout(Some(Duration::from_secs(config.timeout_secs)));

        if let Some(username) = &config.username {
            builder = builder.credentials(Credentials::new(
                username.clone(),
                config.password.clone().unwrap_or_default(),
            ));
        }

        Ok(Self {
            mailer: builder.build(),
            from,
        })
    }

    fn message(&self, entry: &QueueEntry, address: &str) -> Result<Message, TransportError> {
        let to: Address = address.trim().parse()?;

        Ok(Message::builder()
            .from(self.from.clone())
            .to(Mailbox::new(None, to))
            .subject(entry.subject.clone())
            .header(ContentType::TEXT_HTML)
            .body(entry.body.clone())?)
    }

    async fn send_one(&self, entry: &QueueEntry, address: &str) -> Result<(), TransportError> {
        let message = self.message(entry, address)?;
        self.mailer.send(message).await?;
        Ok(())
    }
}

#[async_trait]
impl MailTransport for SmtpTransport {
    async fn deliver(&self, entry: &QueueEntry) -> Result<(), PartialDeliveryFailure> {
        let mut failure = PartialDeliveryFailure::default();

        for position in entry.undelivered_positions() {
            let address = &entry.receivers[position].address;

            match self.send_one(entry, address).await {
                Ok(()) => {
                    tracing::debug!(receiver = %address, "Delivered to receiver");
                }
                Err(error) => {
                    if error.is_unreachable() {
                        tracing::warn!(receiver = %address, error = %error, "SMTP relay unreachable");
                    } else {
                        tracing::warn!(receiver = %address, error = %error, "Delivery to receiver failed");
                    }
                    failure.push(entry, position, error);
                }
            }
        }

        failure.into_result()
    }
}
