//! Inbound webhook verification and normalization for the
//! personalization-array provider.
//!
//! The payload is a flat JSON array of events with custom args flattened
//! into each event object. The signature scheme is Ed25519 over the
//! timestamp header concatenated with the raw request body; both the
//! signature and the configured public key travel base64-encoded.
//! Verification is skipped entirely when no public key is configured.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use ed25519_dalek::{Signature, VerifyingKey};
use mailcast_core::{DeliveryEvent, UnsubscribeEvent, WebhookResult};
use mailcast_provider::WebhookRequest;
use tracing::{debug, warn};

use crate::config::SendgridConfig;

/// Signature header set by the provider.
pub const SIGNATURE_HEADER: &str = "x-twilio-email-event-webhook-signature";

/// Timestamp header covered by the signature.
pub const TIMESTAMP_HEADER: &str = "x-twilio-email-event-webhook-timestamp";

/// Verify and normalize one inbound webhook request.
pub fn parse(config: &SendgridConfig, request: &WebhookRequest) -> WebhookResult {
    if !verify(config, request) {
        warn!(url = %request.url, "rejecting webhook with missing or invalid signature");
        return WebhookResult::new();
    }

    let Some(body) = request.body_str() else {
        warn!("webhook body is not valid UTF-8");
        return WebhookResult::new();
    };
    let Ok(events) = serde_json::from_str::<Vec<serde_json::Value>>(body) else {
        warn!("webhook body is not a JSON event array");
        return WebhookResult::new();
    };

    normalize(&events)
}

/// Check the Ed25519 signature over `timestamp ‖ body`.
///
/// Treated as verified when no public key is configured; the provider
/// supports unsigned webhook endpoints and documents the key as optional.
pub fn verify(config: &SendgridConfig, request: &WebhookRequest) -> bool {
    let Some(public_key) = config
        .webhook_public_key
        .as_deref()
        .filter(|k| !k.is_empty())
    else {
        debug!("no webhook public key configured, skipping signature verification");
        return true;
    };

    let (Some(signature), Some(timestamp)) = (
        request.header(SIGNATURE_HEADER),
        request.header(TIMESTAMP_HEADER),
    ) else {
        return false;
    };

    let Ok(key_bytes) = B64.decode(public_key) else {
        warn!("configured webhook public key is not valid base64");
        return false;
    };
    let Ok(key_bytes) = <[u8; 32]>::try_from(key_bytes.as_slice()) else {
        warn!("configured webhook public key is not 32 bytes");
        return false;
    };
    let Ok(verifying_key) = VerifyingKey::from_bytes(&key_bytes) else {
        warn!("configured webhook public key is not a valid Ed25519 key");
        return false;
    };

    let Ok(signature_bytes) = B64.decode(signature) else {
        return false;
    };
    let Ok(signature) = Signature::from_slice(&signature_bytes) else {
        return false;
    };

    let mut payload = Vec::with_capacity(timestamp.len() + request.body.len());
    payload.extend_from_slice(timestamp.as_bytes());
    payload.extend_from_slice(&request.body);

    verifying_key.verify_strict(&payload, &signature).is_ok()
}

/// Map provider event types onto the canonical buckets. Custom args are
/// flattened into the event object, so correlation keys are read directly.
fn normalize(events: &[serde_json::Value]) -> WebhookResult {
    let mut result = WebhookResult::new();

    for event in events {
        let Some(kind) = event.get("event").and_then(serde_json::Value::as_str) else {
            continue;
        };
        let Some(email) = event.get("email").and_then(serde_json::Value::as_str) else {
            continue;
        };

        let campaign_id = correlation_value(event, "campaign_id");
        let list_id = correlation_value(event, "list_id");

        match kind {
            "bounce" | "dropped" => result
                .bounces
                .push(DeliveryEvent::new(email, campaign_id, list_id)),
            "spamreport" => result
                .complaints
                .push(DeliveryEvent::new(email, campaign_id, list_id)),
            "unsubscribe" | "group_unsubscribe" => result
                .unsubscribes
                .push(UnsubscribeEvent::new(email, campaign_id, list_id)),
            other => debug!(event = other, "ignoring webhook event type"),
        }
    }

    result
}

fn correlation_value(event: &serde_json::Value, key: &str) -> Option<String> {
    match event.get(key)? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
