use std::collections::BTreeMap;

use mailcast_core::OutboundMessage;
use serde::Serialize;

/// Body of a `mail/send` call: per-recipient personalization entries plus
/// the fields the API factors once per request.
#[derive(Debug, Serialize)]
pub struct SendgridMailRequest {
    pub personalizations: Vec<SendgridPersonalization>,

    pub from: SendgridAddress,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<SendgridAddress>,

    pub content: Vec<SendgridContent>,
}

impl SendgridMailRequest {
    /// Build the wire request. Sender, reply-to and content come from
    /// `shared`; each message contributes one personalization entry with
    /// its own recipient, subject, headers and correlation fields.
    pub fn build(shared: &OutboundMessage, messages: &[OutboundMessage]) -> Self {
        let mut content = Vec::new();
        // The API requires text/plain before text/html.
        if let Some(ref text) = shared.text_body {
            content.push(SendgridContent {
                content_type: "text/plain",
                value: text.clone(),
            });
        }
        if let Some(ref html) = shared.html_body {
            content.push(SendgridContent {
                content_type: "text/html",
                value: html.clone(),
            });
        }

        Self {
            personalizations: messages
                .iter()
                .map(SendgridPersonalization::from_message)
                .collect(),
            from: SendgridAddress {
                email: shared.from_email.clone(),
                name: shared.from_name.clone(),
            },
            reply_to: shared.reply_to.as_ref().map(|address| SendgridAddress {
                email: address.clone(),
                name: None,
            }),
            content,
        }
    }
}

/// One per-recipient entry in the personalizations array.
#[derive(Debug, Serialize)]
pub struct SendgridPersonalization {
    pub to: Vec<SendgridAddress>,

    pub subject: String,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_args: BTreeMap<String, String>,
}

impl SendgridPersonalization {
    fn from_message(message: &OutboundMessage) -> Self {
        Self {
            to: vec![SendgridAddress {
                email: message.to_email.clone(),
                name: message.to_name.clone(),
            }],
            subject: message.subject.clone(),
            headers: message.headers.clone(),
            custom_args: message.metadata.clone(),
        }
    }
}

/// An email/name pair.
#[derive(Debug, Serialize)]
pub struct SendgridAddress {
    pub email: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// One content part.
#[derive(Debug, Serialize)]
pub struct SendgridContent {
    #[serde(rename = "type")]
    pub content_type: &'static str,

    pub value: String,
}

/// Payload for the bounce and spam-report suppression endpoints.
#[derive(Debug, Serialize)]
pub struct SendgridEmailList {
    pub emails: Vec<String>,
}

/// Payload for adding addresses to an unsubscribe (ASM) group.
#[derive(Debug, Serialize)]
pub struct SendgridGroupSuppressions {
    pub recipient_emails: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(to: &str, subject: &str) -> OutboundMessage {
        OutboundMessage::new("news@example.com", to, subject)
            .with_from_name("Newsletter")
            .with_text_body("hello")
            .with_html_body("<p>hello</p>")
            .with_reply_to("support@example.com")
            .with_metadata("campaign_id", "42")
    }

    #[test]
    fn shared_fields_are_factored_once() {
        let a = message("a@example.com", "Hi A");
        let b = message("b@example.com", "Hi B");
        let request = SendgridMailRequest::build(&a, &[a.clone(), b]);

        assert_eq!(request.personalizations.len(), 2);
        assert_eq!(request.from.email, "news@example.com");
        assert_eq!(request.from.name.as_deref(), Some("Newsletter"));
        assert_eq!(
            request.reply_to.as_ref().map(|r| r.email.as_str()),
            Some("support@example.com")
        );
        // text/plain must precede text/html.
        assert_eq!(request.content[0].content_type, "text/plain");
        assert_eq!(request.content[1].content_type, "text/html");
    }

    #[test]
    fn personalizations_carry_per_recipient_fields() {
        let a = message("a@example.com", "Hi A").with_header("X-Seq", "1");
        let b = message("b@example.com", "Hi B").with_to_name("B");
        let request = SendgridMailRequest::build(&a, &[a.clone(), b]);

        assert_eq!(request.personalizations[0].subject, "Hi A");
        assert_eq!(request.personalizations[1].subject, "Hi B");
        assert_eq!(
            request.personalizations[0].headers.get("X-Seq").map(String::as_str),
            Some("1")
        );
        assert_eq!(
            request.personalizations[1].to[0].name.as_deref(),
            Some("B")
        );
        assert_eq!(
            request.personalizations[1]
                .custom_args
                .get("campaign_id")
                .map(String::as_str),
            Some("42")
        );
    }

    #[test]
    fn wire_shape() {
        let a = message("a@example.com", "Hi");
        let request = SendgridMailRequest::build(&a, std::slice::from_ref(&a));
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["personalizations"][0]["to"][0]["email"], "a@example.com");
        assert_eq!(json["content"][0]["type"], "text/plain");
        assert_eq!(
            json["personalizations"][0]["custom_args"]["campaign_id"],
            "42"
        );
    }
}
