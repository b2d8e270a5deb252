use mailcast_core::FailureDetail;
use thiserror::Error;

/// Errors from the personalization-array API. Folded into failure details
/// at the provider boundary, never propagated.
#[derive(Debug, Error)]
pub enum SendgridError {
    /// The API returned a non-success response.
    #[error("API error: HTTP {status}: {message}")]
    Api { status: u16, message: String },

    /// A transport-level failure (connect, timeout, TLS).
    #[error("transport error: {0}")]
    Http(#[from] reqwest::Error),
}

impl SendgridError {
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
        let detail = SendgridError::Api {
            status: 400,
            message: "bad personalization".to_owned(),
        }
        .into_detail();
        assert_eq!(detail.code.as_deref(), Some("400"));
        assert_eq!(detail.error, "bad personalization");
    }
}
