use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::address::format_mailbox;

/// A single rendered campaign email, ready for dispatch.
///
/// Messages are immutable once built and owned by the caller. Body content
/// arrives already rendered; at least one of `html_body`/`text_body` is
/// expected to be present. Address syntax is validated by the backend at
/// send time, not by this type.
///
/// # Examples
///
/// ```
/// use mailcast_core::OutboundMessage;
///
/// let msg = OutboundMessage::new("news@example.com", "alice@example.com", "March update")
///     .with_to_name("Alice")
///     .with_text_body("Hello Alice")
///     .with_metadata("campaign_id", "42");
/// assert_eq!(msg.formatted_to(), "Alice <alice@example.com>");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// Recipient email address.
    pub to_email: String,

    /// Optional recipient display name.
    pub to_name: Option<String>,

    /// Sender email address.
    pub from_email: String,

    /// Optional sender display name.
    pub from_name: Option<String>,

    /// Subject line.
    pub subject: String,

    /// Optional reply-to address.
    pub reply_to: Option<String>,

    /// Rendered HTML body. Optional if `text_body` is present.
    pub html_body: Option<String>,

    /// Rendered plain-text body. Optional if `html_body` is present.
    pub text_body: Option<String>,

    /// Extra message headers, applied verbatim where the backend supports
    /// them. Order is irrelevant.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,

    /// Application correlation data (campaign/list identifiers) round-tripped
    /// through the provider's custom-field mechanism.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl OutboundMessage {
    /// Create a new message with the given sender, recipient and subject.
    pub fn new(
        from_email: impl Into<String>,
        to_email: impl Into<String>,
        subject: impl Into<String>,
    ) -> Self {
        Self {
            to_email: to_email.into(),
            to_name: None,
            from_email: from_email.into(),
            from_name: None,
            subject: subject.into(),
            reply_to: None,
            html_body: None,
            text_body: None,
            headers: BTreeMap::new(),
            metadata: BTreeMap::new(),
        }
    }

    /// Set the recipient display name.
    #[must_use]
    pub fn with_to_name(mut self, name: impl Into<String>) -> Self {
        self.to_name = Some(name.into());
        self
    }

    /// Set the sender display name.
    #[must_use]
    pub fn with_from_name(mut self, name: impl Into<String>) -> Self {
        self.from_name = Some(name.into());
        self
    }

    /// Set the reply-to address.
    #[must_use]
    pub fn with_reply_to(mut self, address: impl Into<String>) -> Self {
        self.reply_to = Some(address.into());
        self
    }

    /// Set the rendered HTML body.
    #[must_use]
    pub fn with_html_body(mut self, html: impl Into<String>) -> Self {
        self.html_body = Some(html.into());
        self
    }

    /// Set the rendered plain-text body.
    #[must_use]
    pub fn with_text_body(mut self, text: impl Into<String>) -> Self {
        self.text_body = Some(text.into());
        self
    }

    /// Add a message header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Add a correlation metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// The recipient as an RFC 5322 mailbox: `Name <addr>` or the bare
    /// address when no display name is set.
    pub fn formatted_to(&self) -> String {
        format_mailbox(self.to_name.as_deref(), &self.to_email)
    }

    /// The sender as an RFC 5322 mailbox.
    pub fn formatted_from(&self) -> String {
        format_mailbox(self.from_name.as_deref(), &self.from_email)
    }

    /// Returns `true` when `other` is identical to `self` in every field
    /// except the recipient address and display name.
    ///
    /// Shared-content batch APIs carry one subject/body and a list of
    /// recipients, so merging messages into one call is only safe when this
    /// holds for every message in the candidate batch.
    pub fn content_matches(&self, other: &Self) -> bool {
        self.from_email == other.from_email
            && self.from_name == other.from_name
            && self.subject == other.subject
            && self.reply_to == other.reply_to
            && self.html_body == other.html_body
            && self.text_body == other.text_body
            && self.headers == other.headers
            && self.metadata == other.metadata
    }

    /// Returns `true` when `other` shares the fields a personalization-style
    /// batch API factors once per request: sender identity, reply-to and
    /// body content. Subject, headers and metadata may differ.
    pub fn shared_fields_match(&self, other: &Self) -> bool {
        self.from_email == other.from_email
            && self.from_name == other.from_name
            && self.reply_to == other.reply_to
            && self.html_body == other.html_body
            && self.text_body == other.text_body
    }
}
