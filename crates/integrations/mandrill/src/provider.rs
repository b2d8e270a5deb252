use std::collections::{BTreeSet, HashMap};

use mailcast_core::{
    FailureDetail, OutboundMessage, SendResult, SuppressionReason, WebhookResult,
    is_valid_address,
};
use mailcast_provider::{EspProvider, WebhookRequest, content_uniform};
use reqwest::Client;
use tracing::{debug, instrument, warn};

use crate::config::MandrillConfig;
use crate::error::MandrillError;
use crate::types::{
    MandrillMessage, MandrillRejectAddRequest, MandrillSendRequest, MandrillSendStatus,
};
use crate::webhook;

/// Transactional-array ESP backend.
///
/// Batches shared-content messages into one `messages/send.json` call whose
/// `to` array holds one entry per recipient; the response carries one status
/// per recipient, which is honored individually. Content that varies by
/// recipient falls back to one call per message.
pub struct MandrillProvider {
    config: MandrillConfig,
    client: Client,
}

impl MandrillProvider {
    /// Create a new provider with the given configuration.
    ///
    /// Uses a default `reqwest::Client` with reasonable timeouts.
    pub fn new(config: MandrillConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("failed to build HTTP client");
        Self { config, client }
    }

    /// Create a provider with a custom HTTP client.
    ///
    /// Useful for testing or for sharing a connection pool across providers.
    pub fn with_client(config: MandrillConfig, client: Client) -> Self {
        Self { config, client }
    }

    /// Batch only when the content is identical across every message: the
    /// batch API carries one subject/body and a recipient list.
    fn can_batch(messages: &[OutboundMessage]) -> bool {
        content_uniform(messages)
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/{path}", self.config.api_base_url.trim_end_matches('/'))
    }

    /// Issue one send call and decode the per-recipient status array.
    async fn dispatch(
        &self,
        api_key: &str,
        request: &MandrillSendRequest,
    ) -> Result<Vec<MandrillSendStatus>, MandrillError> {
        let url = self.api_url("messages/send.json");
        debug!(recipients = request.message.to.len(), "posting send call");

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
            return Err(MandrillError::Api {
                status: status.as_u16(),
                message: format!("HTTP {status}: {body}"),
            });
        }

        response
            .json::<Vec<MandrillSendStatus>>()
            .await
            .map_err(|e| MandrillError::Decode(e.to_string()))
    }

    /// Distribute per-recipient response statuses onto the result. A
    /// recipient the response does not mention is failed explicitly so the
    /// counts still cover every input message.
    fn apply_statuses(
        result: &mut SendResult,
        statuses: Vec<MandrillSendStatus>,
        recipients: &[OutboundMessage],
    ) {
        let mut by_email: HashMap<String, MandrillSendStatus> = statuses
            .into_iter()
            .map(|s| (s.email.to_lowercase(), s))
            .collect();

        for message in recipients {
            match by_email.remove(&message.to_email.to_lowercase()) {
                Some(status) if status.is_accepted() => {
                    result.record_accepted(&message.to_email, status.id);
                }
                Some(status) => {
                    let error = status
                        .reject_reason
                        .clone()
                        .unwrap_or_else(|| format!("rejected with status {}", status.status));
                    result.record_failed(
                        FailureDetail::new(error)
                            .with_code(status.status)
                            .with_recipient(&message.to_email),
                    );
                }
                None => {
                    result.record_failed(
                        FailureDetail::new("no status returned for recipient")
                            .with_recipient(&message.to_email),
                    );
                }
            }
        }
    }
}

impl EspProvider for MandrillProvider {
    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "mandrill"
    }

    #[instrument(skip(self, messages), fields(provider = "mandrill", count = messages.len()))]
    async fn send_batch(&self, messages: &[OutboundMessage]) -> SendResult {
        let Some(api_key) = self.config.api_key.as_deref().filter(|k| !k.is_empty()) else {
            warn!("API key is not configured, failing batch without sending");
            return SendResult::configuration_error(
                messages.len(),
                "mandrill API key is not configured",
            );
        };

        let mut result = SendResult::new();

        if Self::can_batch(messages) {
            debug!(recipients = messages.len(), "merging batch into one send call");
            let request = MandrillSendRequest {
                message: MandrillMessage::build(&messages[0], messages),
            };
            match self.dispatch(api_key, &request).await {
                Ok(statuses) => Self::apply_statuses(&mut result, statuses, messages),
                Err(e) => {
                    warn!(error = %e, "batch send failed");
                    result.record_batch_failed(messages.len(), e.into_detail());
                }
            }
        } else {
            // One call per message; a failure never aborts the rest.
            for message in messages {
                let request = MandrillSendRequest {
                    message: MandrillMessage::build(message, std::slice::from_ref(message)),
                };
                match self.dispatch(api_key, &request).await {
                    Ok(statuses) => {
                        Self::apply_statuses(&mut result, statuses, std::slice::from_ref(message));
                    }
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
        fields(provider = "mandrill", count = addresses.len(), reason = %reason)
    )]
    async fn sync_suppressions(&self, addresses: &BTreeSet<String>, reason: SuppressionReason) {
        let Some(api_key) = self.config.api_key.as_deref().filter(|k| !k.is_empty()) else {
            warn!("API key is not configured, skipping suppression sync");
            return;
        };

        let url = self.api_url("rejects/add.json");
        for address in addresses {
            let request = MandrillRejectAddRequest {
                email: address.clone(),
            };
            match self
                .client
                .post(&url)
                .bearer_auth(api_key)
                .json(&request)
                .send()
                .await
            {
                Ok(response) if response.status().is_success() => {
                    debug!(address = %address, "address pushed to provider reject list");
                }
                Ok(response) => {
                    warn!(
                        address = %address,
                        status = %response.status(),
                        "provider rejected suppression push"
                    );
                }
                Err(e) => {
                    warn!(address = %address, error = %e, "suppression push failed");
                }
            }
        }
    }
}
