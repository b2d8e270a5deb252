use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// One failed delivery attempt.
///
/// Carries at minimum a human-readable error; a provider status code, the
/// affected recipient and any further provider fields are attached when
/// available.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureDetail {
    /// Human-readable error captured from the provider or transport.
    pub error: String,

    /// Provider status code, when the provider reported one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    /// Recipient address for per-message failures. Absent for batch-level
    /// and configuration failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,

    /// Any further provider-specific fields worth keeping for investigation.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl FailureDetail {
    /// Create a detail from a human-readable error.
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            ..Self::default()
        }
    }

    /// Attach a provider status code.
    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Attach the affected recipient address.
    #[must_use]
    pub fn with_recipient(mut self, recipient: impl Into<String>) -> Self {
        self.recipient = Some(recipient.into());
        self
    }

    /// Attach an extra provider field.
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// Aggregate outcome of one dispatch call.
///
/// Invariant: `accepted + failed` equals the number of input messages
/// whenever the call completes without a transport-level abort. Callers
/// persist the per-recipient message ids and surface the failure details to
/// campaign operators.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SendResult {
    /// Messages the provider accepted for delivery.
    pub accepted: usize,

    /// Messages that failed, whether rejected by the provider or lost to a
    /// transport error.
    pub failed: usize,

    /// One entry per failure, in encounter order. Batch-level failures
    /// produce a single entry covering the whole batch.
    pub failures: Vec<FailureDetail>,

    /// Provider-assigned message id per accepted recipient address. Absent
    /// for backends that do not return ids.
    pub message_ids: HashMap<String, String>,
}

impl SendResult {
    /// An empty result to accumulate into.
    pub fn new() -> Self {
        Self::default()
    }

    /// The fail-fast result for a backend missing required configuration:
    /// nothing accepted, every input message failed, exactly one detail.
    pub fn configuration_error(message_count: usize, error: impl Into<String>) -> Self {
        Self {
            accepted: 0,
            failed: message_count,
            failures: vec![FailureDetail::new(error)],
            message_ids: HashMap::new(),
        }
    }

    /// Record one accepted recipient, with the provider message id when the
    /// provider returned one.
    pub fn record_accepted(&mut self, recipient: &str, message_id: Option<String>) {
        self.accepted += 1;
        if let Some(id) = message_id {
            self.message_ids.insert(recipient.to_owned(), id);
        }
    }

    /// Record one failed recipient (or, via a detail without a recipient, a
    /// batch-level failure counted once).
    pub fn record_failed(&mut self, detail: FailureDetail) {
        self.failed += 1;
        self.failures.push(detail);
    }

    /// Record a batch-level failure covering `count` recipients with a
    /// single detail entry.
    pub fn record_batch_failed(&mut self, count: usize, detail: FailureDetail) {
        self.failed += count;
        self.failures.push(detail);
    }

    /// Total messages this result accounts for.
    pub fn total(&self) -> usize {
        self.accepted + self.failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_counts() {
        let mut result = SendResult::new();
        result.record_accepted("a@example.com", Some("id-1".to_owned()));
        result.record_accepted("b@example.com", None);
        result.record_failed(
            FailureDetail::new("mailbox full")
                .with_code("552")
                .with_recipient("c@example.com"),
        );

        assert_eq!(result.accepted, 2);
        assert_eq!(result.failed, 1);
        assert_eq!(result.total(), 3);
        assert_eq!(result.failures.len(), 1);
        assert_eq!(
            result.message_ids.get("a@example.com").map(String::as_str),
            Some("id-1")
        );
        assert!(!result.message_ids.contains_key("b@example.com"));
    }

    #[test]
    fn configuration_error_shape() {
        let result = SendResult::configuration_error(2, "API key is not configured");
        assert_eq!(result.accepted, 0);
        assert_eq!(result.failed, 2);
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].error, "API key is not configured");
        assert!(result.failures[0].recipient.is_none());
        assert!(result.message_ids.is_empty());
    }

    #[test]
    fn batch_failure_counts_every_recipient_once() {
        let mut result = SendResult::new();
        result.record_batch_failed(3, FailureDetail::new("HTTP 500").with_code("500"));
        assert_eq!(result.failed, 3);
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.total(), 3);
    }

    #[test]
    fn failure_detail_extra_fields() {
        let detail = FailureDetail::new("rejected")
            .with_extra("reject_reason", "hard-bounce")
            .with_extra("provider", "test");
        assert_eq!(
            detail.extra.get("reject_reason").map(String::as_str),
            Some("hard-bounce")
        );
        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["extra"]["provider"], "test");
        assert!(json.get("code").is_none());
    }
}
