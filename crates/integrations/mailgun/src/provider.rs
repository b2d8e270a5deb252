use std::collections::BTreeSet;

use mailcast_core::{
    OutboundMessage, SendResult, SuppressionReason, WebhookResult, is_valid_address,
};
use mailcast_provider::{EspProvider, WebhookRequest, content_uniform};
use reqwest::Client;
use tracing::{debug, instrument, warn};

use crate::config::MailgunConfig;
use crate::error::MailgunError;
use crate::types::MailgunSendResponse;
use crate::webhook;

/// Domain-relay ESP backend.
///
/// Sends form-encoded posts to `{base}/{domain}/messages` with basic auth
/// (`api` + API key). A merged batch carries one comma-joined `to` field,
/// which means every recipient in the batch sees the full recipient list in
/// the delivered `To:` header — an inherent trade-off of this provider's
/// shared-header batch API, reproduced deliberately. Content must already
/// be identical for the merge to be valid; callers needing recipient
/// isolation get it by varying content, which forces the serial path.
pub struct MailgunProvider {
    config: MailgunConfig,
    client: Client,
}

impl MailgunProvider {
    /// Create a new provider with the given configuration.
    ///
    /// Uses a default `reqwest::Client` with reasonable timeouts.
    pub fn new(config: MailgunConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("failed to build HTTP client");
        Self { config, client }
    }

    /// Create a provider with a custom HTTP client.
    pub fn with_client(config: MailgunConfig, client: Client) -> Self {
        Self { config, client }
    }

    /// Batch only when the content is identical across every message.
    fn can_batch(messages: &[OutboundMessage]) -> bool {
        content_uniform(messages)
    }

    fn domain_url(&self, domain: &str, path: &str) -> String {
        format!(
            "{}/{domain}/{path}",
            self.config.api_base_url.trim_end_matches('/')
        )
    }

    /// Build the form fields for one post: shared content plus a
    /// comma-joined recipient list. Headers map to `h:` fields, correlation
    /// metadata to `v:` fields.
    fn build_form(content: &OutboundMessage, recipients: &[OutboundMessage]) -> Vec<(String, String)> {
        let to = recipients
            .iter()
            .map(OutboundMessage::formatted_to)
            .collect::<Vec<_>>()
            .join(", ");

        let mut form = vec![
            ("from".to_owned(), content.formatted_from()),
            ("to".to_owned(), to),
            ("subject".to_owned(), content.subject.clone()),
        ];
        if let Some(ref text) = content.text_body {
            form.push(("text".to_owned(), text.clone()));
        }
        if let Some(ref html) = content.html_body {
            form.push(("html".to_owned(), html.clone()));
        }
        if let Some(ref reply_to) = content.reply_to {
            form.push(("h:Reply-To".to_owned(), reply_to.clone()));
        }
        for (name, value) in &content.headers {
            form.push((format!("h:{name}"), value.clone()));
        }
        for (key, value) in &content.metadata {
            form.push((format!("v:{key}"), value.clone()));
        }
        form
    }

    /// Issue one send post and decode the queue id.
    async fn dispatch(
        &self,
        api_key: &str,
        domain: &str,
        form: &[(String, String)],
    ) -> Result<MailgunSendResponse, MailgunError> {
        let url = self.domain_url(domain, "messages");
        debug!("posting send call");

        let response = self
            .client
            .post(&url)
            .basic_auth("api", Some(api_key))
            .form(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailgunError::Api {
                status: status.as_u16(),
                message: format!("HTTP {status}: {body}"),
            });
        }

        // Tolerate a missing/odd body; the id is the only field used.
        Ok(response
            .json::<MailgunSendResponse>()
            .await
            .unwrap_or(MailgunSendResponse {
                id: None,
                message: None,
            }))
    }

    /// The reason-specific suppression endpoint path.
    fn suppression_path(reason: SuppressionReason) -> &'static str {
        match reason {
            SuppressionReason::Bounce => "bounces",
            SuppressionReason::Complaint => "complaints",
            SuppressionReason::Manual => "unsubscribes",
        }
    }
}

impl EspProvider for MailgunProvider {
    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "mailgun"
    }

    #[instrument(skip(self, messages), fields(provider = "mailgun", count = messages.len()))]
    async fn send_batch(&self, messages: &[OutboundMessage]) -> SendResult {
        let (Some(api_key), Some(domain)) = (
            self.config.api_key.as_deref().filter(|k| !k.is_empty()),
            self.config.domain.as_deref().filter(|d| !d.is_empty()),
        ) else {
            warn!("API key or domain is not configured, failing batch without sending");
            return SendResult::configuration_error(
                messages.len(),
                "mailgun API key or domain is not configured",
            );
        };

        let mut result = SendResult::new();

        if Self::can_batch(messages) {
            debug!(recipients = messages.len(), "merging batch into one send call");
            let form = Self::build_form(&messages[0], messages);
            match self.dispatch(api_key, domain, &form).await {
                Ok(response) => {
                    // One queue id covers the whole post; it is the only
                    // handle the provider offers per recipient.
                    for message in messages {
                        result.record_accepted(&message.to_email, response.id.clone());
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
                let form = Self::build_form(message, std::slice::from_ref(message));
                match self.dispatch(api_key, domain, &form).await {
                    Ok(response) => result.record_accepted(&message.to_email, response.id),
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
        fields(provider = "mailgun", count = addresses.len(), reason = %reason)
    )]
    async fn sync_suppressions(&self, addresses: &BTreeSet<String>, reason: SuppressionReason) {
        let (Some(api_key), Some(domain)) = (
            self.config.api_key.as_deref().filter(|k| !k.is_empty()),
            self.config.domain.as_deref().filter(|d| !d.is_empty()),
        ) else {
            warn!("API key or domain is not configured, skipping suppression sync");
            return;
        };

        let url = self.domain_url(domain, Self::suppression_path(reason));
        for address in addresses {
            let form = [("address".to_owned(), address.clone())];
            match self
                .client
                .post(&url)
                .basic_auth("api", Some(api_key))
                .form(&form)
                .send()
                .await
            {
                Ok(response) if response.status().is_success() => {
                    debug!(address = %address, "address pushed to provider suppression list");
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

#[cfg(test)]
mod tests {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD as B64;

    use super::*;

    /// A minimal mock HTTP server built on tokio that returns canned
    /// responses and hands back the raw request bytes.
    struct MockServer {
        listener: tokio::net::TcpListener,
        base_url: String,
    }

    impl MockServer {
        async fn start() -> Self {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                .await
                .expect("failed to bind mock server");
            let port = listener.local_addr().unwrap().port();
            let base_url = format!("http://127.0.0.1:{port}");
            Self { listener, base_url }
        }

        async fn respond(self, responses: Vec<(u16, String)>) -> Vec<Vec<u8>> {
            use tokio::io::{AsyncReadExt, AsyncWriteExt};

            let mut requests = Vec::new();
            for (status_code, body) in responses {
                let (mut stream, _) = self.listener.accept().await.unwrap();
                let mut buf = Vec::new();
                let mut chunk = [0u8; 4096];
                loop {
                    let n = stream.read(&mut chunk).await.unwrap();
                    if n == 0 {
                        break;
                    }
                    buf.extend_from_slice(&chunk[..n]);
                    if request_complete(&buf) {
                        break;
                    }
                }

                let response = format!(
                    "HTTP/1.1 {status_code} OK\r\n\
                     Content-Type: application/json\r\n\
                     Content-Length: {}\r\n\
                     Connection: close\r\n\
                     \r\n\
                     {body}",
                    body.len()
                );
                stream.write_all(response.as_bytes()).await.unwrap();
                stream.shutdown().await.unwrap();
                requests.push(buf);
            }
            requests
        }
    }

    fn request_complete(buf: &[u8]) -> bool {
        let Some(header_end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
            return false;
        };
        let headers = String::from_utf8_lossy(&buf[..header_end]);
        let content_length = headers
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                if name.eq_ignore_ascii_case("content-length") {
                    value.trim().parse::<usize>().ok()
                } else {
                    None
                }
            })
            .unwrap_or(0);
        buf.len() >= header_end + 4 + content_length
    }

    fn form_of(request: &[u8]) -> Vec<(String, String)> {
        let header_end = request
            .windows(4)
            .position(|w| w == b"\r\n\r\n")
            .expect("request has no header terminator");
        let body = String::from_utf8_lossy(&request[header_end + 4..]);
        serde_urlencoded::from_str(&body).expect("body is not form-encoded")
    }

    fn field<'a>(form: &'a [(String, String)], name: &str) -> Option<&'a str> {
        form.iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    fn uniform_messages() -> Vec<OutboundMessage> {
        vec![
            OutboundMessage::new("news@example.com", "a@example.com", "Update")
                .with_to_name("A")
                .with_text_body("hello")
                .with_metadata("campaign_id", "42"),
            OutboundMessage::new("news@example.com", "b@example.com", "Update")
                .with_to_name("B")
                .with_text_body("hello")
                .with_metadata("campaign_id", "42"),
        ]
    }

    fn provider_for(server: &MockServer) -> MailgunProvider {
        MailgunProvider::new(
            MailgunConfig::new("key-test", "mg.example.com").with_api_base_url(&server.base_url),
        )
    }

    #[tokio::test]
    async fn uniform_batch_is_one_call_with_joined_to_field() {
        let server = MockServer::start().await;
        let provider = provider_for(&server);

        let body = r#"{"id":"<queued-1@mg.example.com>","message":"Queued. Thank you."}"#;
        let handle =
            tokio::spawn(async move { server.respond(vec![(200, body.to_owned())]).await });

        let result = provider.send_batch(&uniform_messages()).await;
        let requests = handle.await.unwrap();

        assert_eq!(requests.len(), 1);
        let request_str = String::from_utf8_lossy(&requests[0]);
        assert!(request_str.contains("POST /mg.example.com/messages"));
        let credentials = B64.encode(b"api:key-test");
        assert!(request_str.contains(&format!("Basic {credentials}")));

        let form = form_of(&requests[0]);
        // The merged post carries one literal recipient list: every batch
        // recipient sees the full list in the delivered To: header.
        assert_eq!(
            field(&form, "to"),
            Some("A <a@example.com>, B <b@example.com>")
        );
        assert_eq!(field(&form, "subject"), Some("Update"));
        assert_eq!(field(&form, "text"), Some("hello"));
        assert_eq!(field(&form, "v:campaign_id"), Some("42"));

        assert_eq!(result.accepted, 2);
        assert_eq!(result.failed, 0);
        assert_eq!(
            result.message_ids["a@example.com"],
            "<queued-1@mg.example.com>"
        );
        assert_eq!(
            result.message_ids["b@example.com"],
            "<queued-1@mg.example.com>"
        );
    }

    #[tokio::test]
    async fn varying_content_takes_the_serial_path() {
        let server = MockServer::start().await;
        let provider = provider_for(&server);

        let mut messages = uniform_messages();
        messages[1].subject = "Different".to_owned();

        let handle = tokio::spawn(async move {
            server
                .respond(vec![
                    (200, r#"{"id":"<q-1@mg>","message":"Queued"}"#.to_owned()),
                    (200, r#"{"id":"<q-2@mg>","message":"Queued"}"#.to_owned()),
                ])
                .await
        });

        let result = provider.send_batch(&messages).await;
        let requests = handle.await.unwrap();

        assert_eq!(requests.len(), 2, "one network call per message");
        let first_form = form_of(&requests[0]);
        assert_eq!(field(&first_form, "to"), Some("A <a@example.com>"));
        assert_eq!(result.accepted, 2);
        assert_eq!(result.message_ids["b@example.com"], "<q-2@mg>");
    }

    #[tokio::test]
    async fn serial_failure_does_not_abort_remaining_messages() {
        let server = MockServer::start().await;
        let provider = provider_for(&server);

        let mut messages = uniform_messages();
        messages[1].subject = "Different".to_owned();

        let handle = tokio::spawn(async move {
            server
                .respond(vec![
                    (400, r#"{"message":"'to' parameter is invalid"}"#.to_owned()),
                    (200, r#"{"id":"<q-2@mg>","message":"Queued"}"#.to_owned()),
                ])
                .await
        });

        let result = provider.send_batch(&messages).await;
        let requests = handle.await.unwrap();

        assert_eq!(requests.len(), 2);
        assert_eq!(result.accepted, 1);
        assert_eq!(result.failed, 1);
        assert_eq!(result.total(), 2);
        assert_eq!(result.failures[0].code.as_deref(), Some("400"));
        assert_eq!(result.failures[0].recipient.as_deref(), Some("a@example.com"));
    }

    #[tokio::test]
    async fn unconfigured_backend_fails_fast_without_network() {
        let provider = MailgunProvider::new(MailgunConfig::default());
        let result = provider.send_batch(&uniform_messages()).await;

        assert_eq!(result.accepted, 0);
        assert_eq!(result.failed, 2);
        assert_eq!(result.failures.len(), 1);
        assert!(result.failures[0].error.contains("not configured"));
    }

    #[tokio::test]
    async fn reply_to_and_headers_use_h_prefix() {
        let server = MockServer::start().await;
        let provider = provider_for(&server);

        let messages = vec![
            OutboundMessage::new("news@example.com", "a@example.com", "Update")
                .with_text_body("hello")
                .with_reply_to("support@example.com")
                .with_header("X-Campaign", "42"),
        ];

        let handle = tokio::spawn(async move {
            server
                .respond(vec![(200, r#"{"id":"<q@mg>","message":"Queued"}"#.to_owned())])
                .await
        });

        provider.send_batch(&messages).await;
        let requests = handle.await.unwrap();

        let form = form_of(&requests[0]);
        assert_eq!(field(&form, "h:Reply-To"), Some("support@example.com"));
        assert_eq!(field(&form, "h:X-Campaign"), Some("42"));
    }

    #[tokio::test]
    async fn suppression_sync_hits_reason_specific_endpoint() {
        for (reason, path) in [
            (SuppressionReason::Bounce, "/mg.example.com/bounces"),
            (SuppressionReason::Complaint, "/mg.example.com/complaints"),
            (SuppressionReason::Manual, "/mg.example.com/unsubscribes"),
        ] {
            let server = MockServer::start().await;
            let provider = provider_for(&server);

            let handle = tokio::spawn(async move {
                server
                    .respond(vec![(200, r#"{"message":"ok"}"#.to_owned())])
                    .await
            });

            let addresses: BTreeSet<String> = ["a@example.com".to_owned()].into();
            provider.sync_suppressions(&addresses, reason).await;

            let requests = handle.await.unwrap();
            let request_str = String::from_utf8_lossy(&requests[0]);
            assert!(request_str.contains(&format!("POST {path}")), "{reason}");
            let form = form_of(&requests[0]);
            assert_eq!(field(&form, "address"), Some("a@example.com"));
        }
    }

    #[tokio::test]
    async fn suppression_sync_swallows_provider_errors() {
        let server = MockServer::start().await;
        let provider = provider_for(&server);

        let handle = tokio::spawn(async move {
            server
                .respond(vec![(500, r#"{"message":"nope"}"#.to_owned())])
                .await
        });

        let addresses: BTreeSet<String> = ["a@example.com".to_owned()].into();
        provider
            .sync_suppressions(&addresses, SuppressionReason::Bounce)
            .await;
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn validate_from_address_requires_config_and_syntax() {
        let configured = MailgunProvider::new(MailgunConfig::new("key", "mg.example.com"));
        assert!(configured.validate_from_address("news@example.com"));
        assert!(!configured.validate_from_address("nope"));

        let unconfigured = MailgunProvider::new(MailgunConfig::default());
        assert!(!unconfigured.validate_from_address("news@example.com"));
    }
}
