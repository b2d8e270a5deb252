use serde::{Deserialize, Serialize};

/// Settings for the domain-relay backend.
#[derive(Clone, Serialize, Deserialize)]
pub struct MailgunConfig {
    /// API key, used as the basic-auth password with the fixed `api`
    /// username. Sends fail fast when absent.
    pub api_key: Option<String>,

    /// Sending domain; part of every endpoint path. Sends fail fast when
    /// absent.
    pub domain: Option<String>,

    /// Webhook signing key. Inbound events are rejected when absent.
    pub webhook_signing_key: Option<String>,

    /// API base URL. Overridable for tests and regional endpoints.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
}

fn default_api_base_url() -> String {
    "https://api.mailgun.net/v3".to_owned()
}

impl std::fmt::Debug for MailgunConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailgunConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("domain", &self.domain)
            .field(
                "webhook_signing_key",
                &self.webhook_signing_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("api_base_url", &self.api_base_url)
            .finish()
    }
}

impl Default for MailgunConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            domain: None,
            webhook_signing_key: None,
            api_base_url: default_api_base_url(),
        }
    }
}

impl MailgunConfig {
    /// Create a config with the given API key and sending domain.
    pub fn new(api_key: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            domain: Some(domain.into()),
            ..Self::default()
        }
    }

    /// Set the webhook signing key.
    #[must_use]
    pub fn with_webhook_signing_key(mut self, key: impl Into<String>) -> Self {
        self.webhook_signing_key = Some(key.into());
        self
    }

    /// Override the API base URL.
    #[must_use]
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// `true` when both the API key and the sending domain are present.
    pub fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
            && self.domain.as_deref().is_some_and(|d| !d.is_empty())
    }
}
