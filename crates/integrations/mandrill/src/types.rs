use std::collections::BTreeMap;

use mailcast_core::OutboundMessage;
use serde::{Deserialize, Serialize};

/// Envelope for the `messages/send.json` call.
#[derive(Debug, Serialize)]
pub struct MandrillSendRequest {
    pub message: MandrillMessage,
}

/// One outbound message: shared content plus a recipient array.
#[derive(Debug, Serialize)]
pub struct MandrillMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    pub subject: String,

    pub from_email: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_name: Option<String>,

    pub to: Vec<MandrillRecipient>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl MandrillMessage {
    /// Build the wire message from shared `content` and one entry per
    /// recipient. Reply-to travels as a `Reply-To` header, per the API.
    pub fn build(content: &OutboundMessage, recipients: &[OutboundMessage]) -> Self {
        let mut headers = content.headers.clone();
        if let Some(ref reply_to) = content.reply_to {
            headers.insert("Reply-To".to_owned(), reply_to.clone());
        }

        Self {
            html: content.html_body.clone(),
            text: content.text_body.clone(),
            subject: content.subject.clone(),
            from_email: content.from_email.clone(),
            from_name: content.from_name.clone(),
            to: recipients.iter().map(MandrillRecipient::from_message).collect(),
            headers,
            metadata: content.metadata.clone(),
        }
    }
}

/// One entry in the `to` array. Every recipient is tagged as a primary
/// (`"to"`) recipient; the API's cc/bcc kinds are not used here.
#[derive(Debug, Serialize)]
pub struct MandrillRecipient {
    pub email: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(rename = "type")]
    pub recipient_type: &'static str,
}

impl MandrillRecipient {
    fn from_message(message: &OutboundMessage) -> Self {
        Self {
            email: message.to_email.clone(),
            name: message.to_name.clone(),
            recipient_type: "to",
        }
    }
}

/// Per-recipient entry in a send response.
#[derive(Debug, Clone, Deserialize)]
pub struct MandrillSendStatus {
    pub email: String,

    /// `sent`, `queued`, `scheduled`, `rejected` or `invalid`.
    pub status: String,

    #[serde(rename = "_id")]
    pub id: Option<String>,

    pub reject_reason: Option<String>,
}

impl MandrillSendStatus {
    /// `true` when the provider accepted the message for delivery.
    pub fn is_accepted(&self) -> bool {
        matches!(self.status.as_str(), "sent" | "queued" | "scheduled")
    }
}

/// Body for the `rejects/add.json` suppression call.
#[derive(Debug, Serialize)]
pub struct MandrillRejectAddRequest {
    pub email: String,
}
