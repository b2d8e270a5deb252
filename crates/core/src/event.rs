use serde::{Deserialize, Serialize};

/// Why an address is being suppressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuppressionReason {
    /// The address bounced.
    Bounce,
    /// The recipient filed a spam complaint.
    Complaint,
    /// An operator suppressed the address by hand.
    Manual,
}

impl SuppressionReason {
    /// Stable lowercase name, used in logs and provider payloads.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bounce => "bounce",
            Self::Complaint => "complaint",
            Self::Manual => "manual",
        }
    }
}

impl std::fmt::Display for SuppressionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A canonical bounce or complaint event extracted from a provider webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryEvent {
    /// Affected recipient address.
    pub email: String,

    /// Campaign identifier recovered from the provider's correlation
    /// side-channel, when present.
    pub campaign_id: Option<String>,

    /// List identifier recovered the same way.
    pub list_id: Option<String>,
}

impl DeliveryEvent {
    /// Create an event for the given recipient and correlation data.
    pub fn new(
        email: impl Into<String>,
        campaign_id: Option<String>,
        list_id: Option<String>,
    ) -> Self {
        Self {
            email: email.into(),
            campaign_id,
            list_id,
        }
    }
}

/// A canonical unsubscribe event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsubscribeEvent {
    /// Affected recipient address.
    pub email: String,

    /// Campaign identifier, when present in the correlation data.
    pub campaign_id: Option<String>,

    /// List identifier, when present in the correlation data.
    pub list_id: Option<String>,

    /// `true` when no list identifier was found: the opt-out applies to
    /// every list rather than a single one.
    pub all_lists: bool,
}

impl UnsubscribeEvent {
    /// Create an unsubscribe event. `all_lists` is derived from the absence
    /// of a list identifier.
    pub fn new(
        email: impl Into<String>,
        campaign_id: Option<String>,
        list_id: Option<String>,
    ) -> Self {
        Self {
            email: email.into(),
            campaign_id,
            all_lists: list_id.is_none(),
            list_id,
        }
    }
}

/// Normalized outcome of one inbound webhook request.
///
/// Built fresh per request and never persisted here; the caller maps the
/// events onto its own recipient and subscription records. A request that
/// fails signature verification yields the default (empty) value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookResult {
    /// Bounce events, in payload order.
    pub bounces: Vec<DeliveryEvent>,

    /// Complaint events, in payload order.
    pub complaints: Vec<DeliveryEvent>,

    /// Unsubscribe events, in payload order.
    pub unsubscribes: Vec<UnsubscribeEvent>,
}

impl WebhookResult {
    /// An empty result.
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` when no events of any kind were extracted.
    pub fn is_empty(&self) -> bool {
        self.bounces.is_empty() && self.complaints.is_empty() && self.unsubscribes.is_empty()
    }

    /// Total events across all three lists.
    pub fn total(&self) -> usize {
        self.bounces.len() + self.complaints.len() + self.unsubscribes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reason_names() {
        assert_eq!(SuppressionReason::Bounce.as_str(), "bounce");
        assert_eq!(SuppressionReason::Complaint.to_string(), "complaint");
        assert_eq!(SuppressionReason::Manual.as_str(), "manual");
    }

    #[test]
    fn unsubscribe_without_list_applies_to_all() {
        let event = UnsubscribeEvent::new("a@example.com", Some("42".to_owned()), None);
        assert!(event.all_lists);
        assert_eq!(event.campaign_id.as_deref(), Some("42"));
    }

    #[test]
    fn unsubscribe_with_list_is_scoped() {
        let event = UnsubscribeEvent::new("a@example.com", None, Some("7".to_owned()));
        assert!(!event.all_lists);
        assert_eq!(event.list_id.as_deref(), Some("7"));
    }

    #[test]
    fn empty_result() {
        let result = WebhookResult::new();
        assert!(result.is_empty());
        assert_eq!(result.total(), 0);
    }

    #[test]
    fn counts_all_lists() {
        let mut result = WebhookResult::new();
        result.bounces.push(DeliveryEvent::new("a@example.com", None, None));
        result
            .unsubscribes
            .push(UnsubscribeEvent::new("b@example.com", None, None));
        assert!(!result.is_empty());
        assert_eq!(result.total(), 2);
    }
}
