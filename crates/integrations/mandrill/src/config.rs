use serde::{Deserialize, Serialize};

/// Settings for the transactional-array backend.
#[derive(Clone, Serialize, Deserialize)]
pub struct MandrillConfig {
    /// API key, sent as a bearer credential. Sends fail fast when absent.
    pub api_key: Option<String>,

    /// Webhook signing key. Inbound events are rejected when absent —
    /// without it no authenticity check is possible.
    pub webhook_key: Option<String>,

    /// API base URL. Overridable for tests.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
}

fn default_api_base_url() -> String {
    "https://mandrillapp.com/api/1.0".to_owned()
}

impl std::fmt::Debug for MandrillConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MandrillConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("webhook_key", &self.webhook_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_base_url", &self.api_base_url)
            .finish()
    }
}

impl Default for MandrillConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            webhook_key: None,
            api_base_url: default_api_base_url(),
        }
    }
}

impl MandrillConfig {
    /// Create a config with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..Self::default()
        }
    }

    /// Set the webhook signing key.
    #[must_use]
    pub fn with_webhook_key(mut self, key: impl Into<String>) -> Self {
        self.webhook_key = Some(key.into());
        self
    }

    /// Override the API base URL.
    #[must_use]
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// `true` when an API key is present.
    pub fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }
}
