use mailcast_core::FailureDetail;
use thiserror::Error;

/// Errors from the transactional-array API.
///
/// Never escapes the provider: `send_batch` folds these into failure
/// details and suppression sync logs them.
#[derive(Debug, Error)]
pub enum MandrillError {
    /// The API returned a non-success response.
    #[error("API error: HTTP {status}: {message}")]
    Api { status: u16, message: String },

    /// A transport-level failure (connect, timeout, TLS).
    #[error("transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// The response body did not have the documented shape.
    #[error("unexpected response shape: {0}")]
    Decode(String),
}

impl MandrillError {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_keeps_status_code() {
        let detail = MandrillError::Api {
            status: 500,
            message: "Internal error".to_owned(),
        }
        .into_detail();
        assert_eq!(detail.error, "Internal error");
        assert_eq!(detail.code.as_deref(), Some("500"));
    }

    #[test]
    fn decode_error_has_no_code() {
        let detail = MandrillError::Decode("not an array".to_owned()).into_detail();
        assert!(detail.code.is_none());
        assert!(detail.error.contains("not an array"));
    }
}
