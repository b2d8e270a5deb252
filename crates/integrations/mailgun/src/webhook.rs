//! Inbound webhook verification and normalization for the domain-relay
//! provider.
//!
//! Events arrive either as a legacy form post (event fields and
//! `timestamp`/`token`/`signature` as flat parameters) or as a JSON body —
//! a single `{signature, event-data}` envelope or an `{"items": [...]}`
//! list of such envelopes. The signature is hex(HMAC-SHA256(signing key,
//! timestamp ‖ token)) and is checked with a constant-time comparison.

use hmac::{Hmac, Mac};
use mailcast_core::{DeliveryEvent, UnsubscribeEvent, WebhookResult};
use mailcast_provider::WebhookRequest;
use sha2::Sha256;
use tracing::{debug, warn};

use crate::config::MailgunConfig;
use crate::types::MailgunSignatureBlock;

type HmacSha256 = Hmac<Sha256>;

/// Verify and normalize one inbound webhook request.
pub fn parse(config: &MailgunConfig, request: &WebhookRequest) -> WebhookResult {
    // Legacy form mode: signature fields arrive as flat parameters next to
    // the event fields themselves.
    if let (Some(timestamp), Some(token)) = (request.param("timestamp"), request.param("token")) {
        let signature = request.param("signature").unwrap_or_default();
        if !verify(config, timestamp, token, signature) {
            warn!(url = %request.url, "rejecting form webhook with invalid signature");
            return WebhookResult::new();
        }
        let mut result = WebhookResult::new();
        normalize_legacy(request, &mut result);
        return result;
    }

    // JSON mode.
    let Some(body) = request.body_str() else {
        warn!("webhook body is not valid UTF-8");
        return WebhookResult::new();
    };
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        warn!("webhook body is not valid JSON");
        return WebhookResult::new();
    };

    let envelopes: Vec<serde_json::Value> =
        match value.get("items").and_then(|i| i.as_array()).cloned() {
            Some(items) => items,
            None => vec![value],
        };

    let mut result = WebhookResult::new();
    for envelope in envelopes {
        let block = envelope
            .get("signature")
            .cloned()
            .and_then(|s| serde_json::from_value::<MailgunSignatureBlock>(s).ok());
        let Some(block) = block else {
            warn!("webhook envelope carried no signature block, skipping");
            continue;
        };
        if !verify(config, &block.timestamp, &block.token, &block.signature) {
            warn!("rejecting webhook envelope with invalid signature");
            continue;
        }
        if let Some(event_data) = envelope.get("event-data") {
            normalize_event(event_data, &mut result);
        }
    }
    result
}

/// Check hex(HMAC-SHA256(key, timestamp ‖ token)) against the provided
/// signature. Rejects when no signing key is configured.
pub fn verify(config: &MailgunConfig, timestamp: &str, token: &str, signature: &str) -> bool {
    let Some(key) = config
        .webhook_signing_key
        .as_deref()
        .filter(|k| !k.is_empty())
    else {
        warn!("no webhook signing key configured, treating event as unverifiable");
        return false;
    };
    let Ok(provided) = hex::decode(signature) else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(key.as_bytes()) else {
        return false;
    };
    mac.update(timestamp.as_bytes());
    mac.update(token.as_bytes());
    mac.verify_slice(&provided).is_ok()
}

/// Map one JSON-mode event onto the canonical buckets.
fn normalize_event(event_data: &serde_json::Value, result: &mut WebhookResult) {
    let Some(kind) = event_data.get("event").and_then(serde_json::Value::as_str) else {
        return;
    };
    let Some(recipient) = event_data
        .get("recipient")
        .and_then(serde_json::Value::as_str)
    else {
        return;
    };

    let variables = event_data.get("user-variables");
    let campaign_id = correlation_value(variables, "campaign_id");
    let list_id = correlation_value(variables, "list_id");

    push_event(kind, recipient, campaign_id, list_id, result);
}

/// Map a legacy form-mode event: fields are flat request parameters.
fn normalize_legacy(request: &WebhookRequest, result: &mut WebhookResult) {
    let Some(kind) = request.param("event") else {
        return;
    };
    let Some(recipient) = request.param("recipient") else {
        return;
    };
    let campaign_id = request.param("campaign_id").map(str::to_owned);
    let list_id = request.param("list_id").map(str::to_owned);

    push_event(kind, recipient, campaign_id, list_id, result);
}

fn push_event(
    kind: &str,
    recipient: &str,
    campaign_id: Option<String>,
    list_id: Option<String>,
    result: &mut WebhookResult,
) {
    match kind {
        "bounced" | "failed" => result
            .bounces
            .push(DeliveryEvent::new(recipient, campaign_id, list_id)),
        "complained" => result
            .complaints
            .push(DeliveryEvent::new(recipient, campaign_id, list_id)),
        "unsubscribed" => result
            .unsubscribes
            .push(UnsubscribeEvent::new(recipient, campaign_id, list_id)),
        other => debug!(event = other, "ignoring webhook event type"),
    }
}

/// Pull a correlation value out of the user-variables side-channel,
/// accepting both string and numeric encodings.
fn correlation_value(variables: Option<&serde_json::Value>, key: &str) -> Option<String> {
    match variables?.get(key)? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
