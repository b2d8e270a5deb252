//! Configuration-driven provider selection.
//!
//! The campaign dispatcher names a provider in deployment settings; this
//! crate routes that name to a concrete backend behind
//! `Arc<dyn DynEspProvider>`. A selected-but-unconfigured backend is still
//! constructed: its `send_batch` fails fast with the all-failed result, so
//! a missing API key surfaces as per-recipient failure counts rather than
//! a construction error.

use std::sync::Arc;

use mailcast_mailgun::{MailgunConfig, MailgunProvider};
use mailcast_mandrill::{MandrillConfig, MandrillProvider};
use mailcast_provider::{DynEspProvider, EspError};
use mailcast_sendgrid::{SendgridConfig, SendgridProvider};
use mailcast_smtp::{SmtpConfig, SmtpProvider};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Deployment settings for the delivery engine: the active provider name
/// plus one optional section per backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MailerSettings {
    /// Active backend: `smtp`, `mandrill`, `mailgun` or `sendgrid`.
    pub provider: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smtp: Option<SmtpConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mandrill: Option<MandrillConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mailgun: Option<MailgunConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sendgrid: Option<SendgridConfig>,
}

/// Construct the backend named by `settings.provider`.
///
/// Only an unroutable name (or an SMTP transport that cannot be built) is
/// an error; missing credentials are left to the backend's own fail-fast
/// path so campaign runs degrade to counted failures instead of crashing.
pub fn create_provider(settings: &MailerSettings) -> Result<Arc<dyn DynEspProvider>, EspError> {
    let provider: Arc<dyn DynEspProvider> = match settings.provider.as_str() {
        "smtp" => Arc::new(SmtpProvider::new(
            settings.smtp.clone().unwrap_or_default(),
        )?),
        "mandrill" => Arc::new(MandrillProvider::new(
            settings.mandrill.clone().unwrap_or_default(),
        )),
        "mailgun" => Arc::new(MailgunProvider::new(
            settings.mailgun.clone().unwrap_or_default(),
        )),
        "sendgrid" => Arc::new(SendgridProvider::new(
            settings.sendgrid.clone().unwrap_or_default(),
        )),
        other => {
            return Err(EspError::Configuration(format!(
                "unknown mail provider: {other}"
            )));
        }
    };

    info!(provider = provider.name(), "mail provider selected");
    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn routes_every_known_name() {
        for name in ["smtp", "mandrill", "mailgun", "sendgrid"] {
            let settings = MailerSettings {
                provider: name.to_owned(),
                ..MailerSettings::default()
            };
            let provider = create_provider(&settings).expect(name);
            assert_eq!(provider.name(), name);
        }
    }

    #[test]
    fn unknown_name_is_a_configuration_error() {
        let settings = MailerSettings {
            provider: "postal-pigeon".to_owned(),
            ..MailerSettings::default()
        };
        let err = match create_provider(&settings) {
            Ok(_) => panic!("expected a configuration error"),
            Err(e) => e,
        };
        assert!(matches!(err, EspError::Configuration(_)));
        assert!(err.to_string().contains("postal-pigeon"));
    }

    #[test]
    fn settings_deserialize_from_json() {
        let settings: MailerSettings = serde_json::from_str(
            r#"{
                "provider": "mailgun",
                "mailgun": {
                    "api_key": "key-test",
                    "domain": "mg.example.com",
                    "webhook_signing_key": "sk-test"
                }
            }"#,
        )
        .unwrap();
        assert_eq!(settings.provider, "mailgun");
        let mailgun = settings.mailgun.as_ref().unwrap();
        assert!(mailgun.is_configured());
        assert!(settings.sendgrid.is_none());

        let provider = create_provider(&settings).unwrap();
        assert_eq!(provider.name(), "mailgun");
    }

    #[tokio::test]
    async fn selected_but_unconfigured_backend_fails_fast_on_send() {
        let settings = MailerSettings {
            provider: "mandrill".to_owned(),
            ..MailerSettings::default()
        };
        let provider = create_provider(&settings).unwrap();

        let messages = vec![
            mailcast_core::OutboundMessage::new("news@example.com", "a@example.com", "Hi")
                .with_text_body("hello"),
            mailcast_core::OutboundMessage::new("news@example.com", "b@example.com", "Hi")
                .with_text_body("hello"),
        ];
        let result = provider.send_batch(&messages).await;
        assert_eq!(result.accepted, 0);
        assert_eq!(result.failed, 2);
        assert_eq!(result.failures.len(), 1);
    }
}
