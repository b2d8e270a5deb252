use serde::{Deserialize, Serialize};

/// Settings for the personalization-array backend.
#[derive(Clone, Serialize, Deserialize)]
pub struct SendgridConfig {
    /// API key, sent as a bearer credential. Sends fail fast when absent.
    pub api_key: Option<String>,

    /// Base64-encoded Ed25519 public key for webhook verification. When
    /// absent, verification is skipped entirely — the provider documents
    /// unsigned webhooks as a supported configuration.
    pub webhook_public_key: Option<String>,

    /// Suppression group for manual unsubscribes. Manual sync is skipped
    /// with a warning when absent.
    pub unsubscribe_group_id: Option<u64>,

    /// API base URL. Overridable for tests.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
}

fn default_api_base_url() -> String {
    "https://api.sendgrid.com/v3".to_owned()
}

impl std::fmt::Debug for SendgridConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SendgridConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("webhook_public_key", &self.webhook_public_key)
            .field("unsubscribe_group_id", &self.unsubscribe_group_id)
            .field("api_base_url", &self.api_base_url)
            .finish()
    }
}

impl Default for SendgridConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            webhook_public_key: None,
            unsubscribe_group_id: None,
            api_base_url: default_api_base_url(),
        }
    }
}

impl SendgridConfig {
    /// Create a config with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..Self::default()
        }
    }

    /// Set the webhook verification public key (base64).
    #[must_use]
    pub fn with_webhook_public_key(mut self, key: impl Into<String>) -> Self {
        self.webhook_public_key = Some(key.into());
        self
    }

    /// Set the suppression group for manual unsubscribes.
    #[must_use]
    pub fn with_unsubscribe_group_id(mut self, id: u64) -> Self {
        self.unsubscribe_group_id = Some(id);
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
