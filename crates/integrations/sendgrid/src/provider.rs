use std::collections::BTreeSet;

use mailcast_core::{
    OutboundMessage, SendResult, SuppressionReason, WebhookResult, is_valid_address,
};
use mailcast_provider::{EspProvider, WebhookRequest};
use reqwest::Client;
use tracing::{debug, instrument, warn};

use crate::config::SendgridConfig;
use crate::error::SendgridError;
use crate::types::{SendgridEmailList, SendgridGroupSuppressions, SendgridMailRequest};
use crate::webhook;

/// Personalization-array ESP backend.
///
/// The batch payload carries one personalization entry per recipient, each
/// with its own address, subject, headers and correlation fields, while
/// sender, reply-to and body content appear once per request. Batching
/// therefore only requires those shared fields to match — subject and
/// correlation data may vary per recipient, unlike the shared-content
/// backends.
pub struct SendgridProvider {
    config: SendgridConfig,
    client: Client,
}

impl SendgridProvider {
    /// Create a new provider with the given configuration.
    ///
    /// Uses a default `reqwest::Client` with reasonable timeouts.
    pub fn new(config: SendgridConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("failed to build HTTP client");
        Self { config, client }
    }

    /// Create a provider with a custom HTTP client.
    pub fn with_client(config: SendgridConfig, client: Client) -> Self {
        Self { config, client }
    }

    /// The weaker batching predicate: only the fields the payload factors
    /// once per request (sender, reply-to, body content) must match.
    fn can_batch(messages: &[OutboundMessage]) -> bool {
        match messages {
            [] | [_] => false,
            [first, rest @ ..] => rest.iter().all(|m| first.shared_fields_match(m)),
        }
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/{path}", self.config.api_base_url.trim_end_matches('/'))
    }

    /// Issue one `mail/send` call. Success is 202; the response's
    /// `X-Message-Id` header is the only per-request delivery handle.
    async fn dispatch(
        &self,
        api_key: &str,
        request: &SendgridMailRequest,
    ) -> Result<Option<String>, SendgridError> {
        let url = self.api_url("mail/send");
        debug!(
            personalizations = request.personalizations.len(),
            "posting send call"
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SendgridError::Api {
                status: status.as_u16(),
                message: format!("HTTP {status}: {body}"),
            });
        }

        Ok(response
            .headers()
            .get("x-message-id")
            .and_then(|v| v.to_str().ok())
            .map(ToOwned::to_owned))
    }
}

impl EspProvider for SendgridProvider {
    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "sendgrid"
    }

    #[instrument(skip(self, messages), fields(provider = "sendgrid", count = messages.len()))]
    async fn send_batch(&self, messages: &[OutboundMessage]) -> SendResult {
        let Some(api_key) = self.config.api_key.as_deref().filter(|k| !k.is_empty()) else {
            warn!("API key is not configured, failing batch without sending");
            return SendResult::configuration_error(
                messages.len(),
                "sendgrid API key is not configured",
            );
        };

        let mut result = SendResult::new();

        if Self::can_batch(messages) {
            debug!(
                recipients = messages.len(),
                "merging batch into one personalized send call"
            );
            let request = SendgridMailRequest::build(&messages[0], messages);
            match self.dispatch(api_key, &request).await {
                Ok(message_id) => {
                    for message in messages {
                        result.record_accepted(&message.to_email, message_id.clone());
                    }
                }
                Err(e) => {
                    warn!(error = %e, "batch send failed");
                    result.record_batch_failed(messages.len(), e.into_detail());
                }
            }
        } else {
            // One call per message; a failure never aborts the rest.
            for message in messages {
                let request = SendgridMailRequest::build(message, std::slice::from_ref(message));
                match self.dispatch(api_key, &request).await {
                    Ok(message_id) => result.record_accepted(&message.to_email, message_id),
                    Err(e) => {
                        warn!(to = %message.to_email, error = %e, "send failed");
                        result.record_failed(e.into_detail().with_recipient(&message.to_email));
                    }
                }
            }
        }

        result
    }

    fn validate_from_address(&self, address: &str) -> bool {
        self.config.is_configured() && is_valid_address(address)
    }

    fn parse_webhook(&self, request: &WebhookRequest) -> WebhookResult {
        webhook::parse(&self.config, request)
    }

    #[instrument(
        skip(self, addresses),
        fields(provider = "sendgrid", count = addresses.len(), reason = %reason)
    )]
    async fn sync_suppressions(&self, addresses: &BTreeSet<String>, reason: SuppressionReason) {
        let Some(api_key) = self.config.api_key.as_deref().filter(|k| !k.is_empty()) else {
            warn!("API key is not configured, skipping suppression sync");
            return;
        };

        let emails: Vec<String> = addresses.iter().cloned().collect();

        // Bounces and complaints take a flat email array on their own
        // endpoints; manual suppressions go into the configured
        // unsubscribe group with a differently keyed payload.
        let (url, body) = match reason {
            SuppressionReason::Bounce => (
                self.api_url("suppression/bounces"),
                serde_json::to_value(SendgridEmailList { emails }),
            ),
            SuppressionReason::Complaint => (
                self.api_url("suppression/spam_reports"),
                serde_json::to_value(SendgridEmailList { emails }),
            ),
            SuppressionReason::Manual => {
                let Some(group_id) = self.config.unsubscribe_group_id else {
                    warn!("no unsubscribe group configured, skipping manual suppression sync");
                    return;
                };
                (
                    self.api_url(&format!("asm/groups/{group_id}/suppressions")),
                    serde_json::to_value(SendgridGroupSuppressions {
                        recipient_emails: emails,
                    }),
                )
            }
        };
        let Ok(body) = body else {
            warn!("failed to encode suppression payload");
            return;
        };

        match self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => {
                debug!(count = addresses.len(), "addresses pushed to provider suppression list");
            }
            Ok(response) => {
                warn!(status = %response.status(), "provider rejected suppression push");
            }
            Err(e) => {
                warn!(error = %e, "suppression push failed");
            }
        }
    }
}
