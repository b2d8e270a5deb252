use serde::{Deserialize, Serialize};

/// Connection settings for the direct SMTP relay.
#[derive(Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    /// SMTP server hostname.
    pub host: String,

    /// SMTP server port. Defaults to 587 (STARTTLS submission port).
    #[serde(default = "default_port")]
    pub port: u16,

    /// Optional SMTP username for authentication.
    pub username: Option<String>,

    /// Optional SMTP password for authentication.
    pub password: Option<String>,

    /// Whether to use STARTTLS. Defaults to `true`.
    #[serde(default = "default_tls")]
    pub tls: bool,
}

fn default_port() -> u16 {
    587
}

fn default_tls() -> bool {
    true
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("tls", &self.tls)
            .finish()
    }
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_owned(),
            port: 587,
            username: None,
            password: None,
            tls: true,
        }
    }
}

impl SmtpConfig {
    /// Create a config for the given relay host.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::default()
        }
    }

    /// Set authentication credentials.
    #[must_use]
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Override the default port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set whether STARTTLS should be used.
    #[must_use]
    pub fn with_tls(mut self, tls: bool) -> Self {
        self.tls = tls;
        self
    }

    /// `true` when a relay host is configured.
    pub fn is_configured(&self) -> bool {
        !self.host.is_empty()
    }
}
