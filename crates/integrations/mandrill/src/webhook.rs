//! Inbound webhook verification and normalization for the
//! transactional-array provider.
//!
//! Events arrive as a JSON array in the `mandrill_events` form parameter
//! (or the raw body), sometimes wrapped in an envelope object and sometimes
//! double-encoded as a JSON string. The signature is HMAC-SHA1 over the
//! request URL concatenated with every request parameter as `key` + `value`
//! in sorted key order, base64-encoded, delivered in the
//! `X-Mandrill-Signature` header.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use hmac::{Hmac, Mac};
use mailcast_core::{DeliveryEvent, UnsubscribeEvent, WebhookResult};
use mailcast_provider::WebhookRequest;
use sha1::Sha1;
use tracing::{debug, warn};

use crate::config::MandrillConfig;

type HmacSha1 = Hmac<Sha1>;

/// Signature header set by the provider.
pub const SIGNATURE_HEADER: &str = "x-mandrill-signature";

/// Verify and normalize one inbound webhook request.
pub fn parse(config: &MandrillConfig, request: &WebhookRequest) -> WebhookResult {
    if !verify(config, request) {
        warn!(url = %request.url, "rejecting webhook with missing or invalid signature");
        return WebhookResult::new();
    }

    let raw = request
        .param("mandrill_events")
        .or_else(|| request.body_str());
    let Some(raw) = raw else {
        warn!("webhook request carried no event payload");
        return WebhookResult::new();
    };

    let Some(events) = decode_events(raw) else {
        warn!("webhook event payload was not a JSON event array");
        return WebhookResult::new();
    };

    normalize(&events)
}

/// Check the sorted-parameter HMAC-SHA1 signature.
///
/// Rejects when no webhook key is configured: without the key no
/// authenticity check is possible and spoofing is the default assumption.
pub fn verify(config: &MandrillConfig, request: &WebhookRequest) -> bool {
    let Some(key) = config.webhook_key.as_deref().filter(|k| !k.is_empty()) else {
        warn!("no webhook key configured, treating event as unverifiable");
        return false;
    };
    let Some(signature) = request.header(SIGNATURE_HEADER) else {
        return false;
    };
    let Ok(provided) = B64.decode(signature) else {
        return false;
    };

    let Ok(mut mac) = HmacSha1::new_from_slice(key.as_bytes()) else {
        return false;
    };
    mac.update(signed_payload(request).as_bytes());
    mac.verify_slice(&provided).is_ok()
}

/// The byte string the provider signs: the webhook URL followed by each
/// parameter's key and value, in sorted key order.
fn signed_payload(request: &WebhookRequest) -> String {
    let mut payload = request.url.clone();
    for (key, value) in &request.params {
        payload.push_str(key);
        payload.push_str(value);
    }
    payload
}

/// Unwrap the event array from its possible encodings: a plain array, a
/// double-encoded JSON string, or an object envelope holding either.
fn decode_events(raw: &str) -> Option<Vec<serde_json::Value>> {
    let value: serde_json::Value = serde_json::from_str(raw.trim()).ok()?;
    unwrap_events(value)
}

fn unwrap_events(value: serde_json::Value) -> Option<Vec<serde_json::Value>> {
    match value {
        serde_json::Value::Array(events) => Some(events),
        serde_json::Value::String(inner) => {
            serde_json::from_str(&inner).ok().and_then(unwrap_events)
        }
        serde_json::Value::Object(mut envelope) => {
            envelope.remove("mandrill_events").and_then(unwrap_events)
        }
        _ => None,
    }
}

/// Map provider event types onto the canonical buckets.
fn normalize(events: &[serde_json::Value]) -> WebhookResult {
    let mut result = WebhookResult::new();

    for event in events {
        let Some(kind) = event.get("event").and_then(serde_json::Value::as_str) else {
            continue;
        };
        let Some(email) = event
            .pointer("/msg/email")
            .and_then(serde_json::Value::as_str)
        else {
            continue;
        };

        let metadata = event.pointer("/msg/metadata");
        let campaign_id = correlation_value(metadata, "campaign_id");
        let list_id = correlation_value(metadata, "list_id");

        match kind {
            "hard_bounce" | "soft_bounce" | "reject" | "defer" => result
                .bounces
                .push(DeliveryEvent::new(email, campaign_id, list_id)),
            "spam" => result
                .complaints
                .push(DeliveryEvent::new(email, campaign_id, list_id)),
            "unsub" => result
                .unsubscribes
                .push(UnsubscribeEvent::new(email, campaign_id, list_id)),
            other => debug!(event = other, "ignoring webhook event type"),
        }
    }

    result
}

/// Pull a correlation value out of the metadata side-channel, accepting
/// both string and numeric encodings.
fn correlation_value(metadata: Option<&serde_json::Value>, key: &str) -> Option<String> {
    match metadata?.get(key)? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
