use serde::Deserialize;

/// Response body of a successful `messages` post.
#[derive(Debug, Deserialize)]
pub struct MailgunSendResponse {
    /// Queue id for the whole post. Batched sends get one id covering every
    /// recipient.
    pub id: Option<String>,

    /// Human-readable acknowledgement.
    pub message: Option<String>,
}

/// The signature block attached to a JSON webhook envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct MailgunSignatureBlock {
    pub timestamp: String,
    pub token: String,
    pub signature: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_response_decodes() {
        let response: MailgunSendResponse = serde_json::from_str(
            r#"{"id":"<20260806.1@mg.example.com>","message":"Queued. Thank you."}"#,
        )
        .unwrap();
        assert_eq!(response.id.as_deref(), Some("<20260806.1@mg.example.com>"));
        assert!(response.message.unwrap().starts_with("Queued"));
    }

    #[test]
    fn signature_block_decodes() {
        let block: MailgunSignatureBlock = serde_json::from_str(
            r#"{"timestamp":"1754400000","token":"tok","signature":"deadbeef"}"#,
        )
        .unwrap();
        assert_eq!(block.timestamp, "1754400000");
        assert_eq!(block.token, "tok");
    }
}
