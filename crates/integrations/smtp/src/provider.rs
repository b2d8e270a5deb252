use std::collections::BTreeSet;

use lettre::message::{Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use mailcast_core::{
    FailureDetail, OutboundMessage, SendResult, SuppressionReason, WebhookResult,
};
use mailcast_provider::{EspError, EspProvider, WebhookRequest};
use tracing::{debug, info, instrument, warn};

use crate::config::SmtpConfig;

/// Direct SMTP relay backend.
///
/// Hands each message to a local mail transport one at a time: a raw relay
/// has no batch API, produces no inbound events and keeps no block list, so
/// webhook parsing always yields the empty result and suppression sync is a
/// no-op.
pub struct SmtpProvider {
    config: SmtpConfig,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl std::fmt::Debug for SmtpProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpProvider")
            .field("config", &self.config)
            .field("transport", &"<AsyncSmtpTransport>")
            .finish()
    }
}

impl SmtpProvider {
    /// Create a new relay from the given configuration.
    pub fn new(config: SmtpConfig) -> Result<Self, EspError> {
        let transport = build_transport(&config)?;
        Ok(Self { config, transport })
    }

    /// Create a relay with a pre-built transport (for testing).
    pub fn with_transport(
        config: SmtpConfig,
        transport: AsyncSmtpTransport<Tokio1Executor>,
    ) -> Self {
        Self { config, transport }
    }

    async fn deliver(&self, message: &OutboundMessage) -> Result<(), EspError> {
        debug!(to = %message.to_email, subject = %message.subject, "building SMTP message");
        let wire_message = build_message(message)?;

        self.transport
            .send(wire_message)
            .await
            .map_err(|e| map_smtp_error(&e))?;

        info!(to = %message.to_email, "message relayed via SMTP");
        Ok(())
    }
}

impl EspProvider for SmtpProvider {
    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "smtp"
    }

    #[instrument(skip(self, messages), fields(provider = "smtp", count = messages.len()))]
    async fn send_batch(&self, messages: &[OutboundMessage]) -> SendResult {
        if !self.config.is_configured() {
            warn!("SMTP relay host is not configured, failing batch without sending");
            return SendResult::configuration_error(
                messages.len(),
                "SMTP relay host is not configured",
            );
        }

        // One transport conversation per message. A failed message never
        // aborts the remainder of the batch.
        let mut result = SendResult::new();
        for message in messages {
            match self.deliver(message).await {
                Ok(()) => result.record_accepted(&message.to_email, None),
                Err(e) => {
                    warn!(to = %message.to_email, error = %e, "SMTP delivery failed");
                    result.record_failed(
                        FailureDetail::new(e.to_string()).with_recipient(&message.to_email),
                    );
                }
            }
        }
        result
    }

    fn validate_from_address(&self, address: &str) -> bool {
        self.config.is_configured() && address.parse::<Mailbox>().is_ok()
    }

    fn parse_webhook(&self, _request: &WebhookRequest) -> WebhookResult {
        // A raw relay produces no bounce/complaint/unsubscribe callbacks.
        debug!("SMTP relay received a webhook request; no events exist for this path");
        WebhookResult::new()
    }

    async fn sync_suppressions(&self, addresses: &BTreeSet<String>, reason: SuppressionReason) {
        debug!(
            count = addresses.len(),
            reason = %reason,
            "SMTP relay has no provider-side suppression list, skipping sync"
        );
    }
}

/// Build a wire message from the unified [`OutboundMessage`].
///
/// Free-form headers are not mapped: lettre's builder only accepts typed
/// headers, so the relay carries reply-to and the text/html bodies and
/// leaves the rest to the HTTP backends.
fn build_message(msg: &OutboundMessage) -> Result<Message, EspError> {
    let from_mailbox: Mailbox = msg
        .formatted_from()
        .parse()
        .map_err(|e| EspError::Configuration(format!("invalid from address: {e}")))?;

    let to_mailbox: Mailbox = msg
        .formatted_to()
        .parse()
        .map_err(|e| EspError::Api(format!("invalid recipient address: {e}")))?;

    let mut builder = Message::builder()
        .from(from_mailbox)
        .to(to_mailbox)
        .subject(&msg.subject);

    if let Some(ref reply_to) = msg.reply_to {
        let reply_mailbox: Mailbox = reply_to
            .parse()
            .map_err(|e| EspError::Api(format!("invalid reply-to address: {e}")))?;
        builder = builder.reply_to(reply_mailbox);
    }

    let message = match (&msg.text_body, &msg.html_body) {
        (Some(text), Some(html)) => builder
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(lettre::message::header::ContentType::TEXT_PLAIN)
                            .body(text.clone()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(lettre::message::header::ContentType::TEXT_HTML)
                            .body(html.clone()),
                    ),
            )
            .map_err(|e| EspError::Api(format!("failed to build message: {e}")))?,
        (Some(text), None) => builder
            .body(text.clone())
            .map_err(|e| EspError::Api(format!("failed to build message: {e}")))?,
        (None, Some(html)) => builder
            .singlepart(
                SinglePart::builder()
                    .header(lettre::message::header::ContentType::TEXT_HTML)
                    .body(html.clone()),
            )
            .map_err(|e| EspError::Api(format!("failed to build message: {e}")))?,
        (None, None) => {
            return Err(EspError::Api(
                "message has neither a text nor an HTML body".to_owned(),
            ));
        }
    };

    Ok(message)
}

/// Build an async SMTP transport from the given configuration.
fn build_transport(config: &SmtpConfig) -> Result<AsyncSmtpTransport<Tokio1Executor>, EspError> {
    let builder = if config.tls {
        AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| EspError::Configuration(format!("SMTP TLS relay error: {e}")))?
    } else {
        AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
    };

    let builder = builder.port(config.port);

    let builder = if let (Some(user), Some(pass)) = (&config.username, &config.password) {
        builder.credentials(Credentials::new(user.clone(), pass.clone()))
    } else {
        builder
    };

    Ok(builder.build())
}

/// Map a lettre SMTP error onto the transport/API split.
fn map_smtp_error(error: &lettre::transport::smtp::Error) -> EspError {
    let message = error.to_string();

    if error.is_permanent() {
        EspError::Api(format!("permanent SMTP error: {message}"))
    } else {
        EspError::Transport(format!("SMTP error: {message}"))
    }
}
