use mailcast_core::FailureDetail;
use thiserror::Error;

/// Errors from the domain-relay API. Folded into failure details at the
/// provider boundary, never propagated.
#[derive(Debug, Error)]
pub enum MailgunError {
    /// The API returned a non-success response.
    #[error("API error: HTTP {status}: {message}")]
    Api { status: u16, message: String },

    /// A transport-level failure (connect, timeout, TLS).
    #[error("transport error: {0}")]
    Http(#[from] reqwest::Error),
}

impl MailgunError {
    /// Fold into a failure detail, keeping the HTTP status as the provider
    /// code when one is available.
    pub(crate) fn into_detail(self) -> FailureDetail {
        match self {
            Self::Api { status, message } => {
                FailureDetail::new(message).with_code(status.to_string())
            }
            other => FailureDetail::new(other.to_string()),
        }
    }
}
