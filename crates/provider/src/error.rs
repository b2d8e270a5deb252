use thiserror::Error;

/// Errors raised while talking to an ESP.
///
/// These never cross the [`EspProvider`](crate::EspProvider) boundary as
/// errors: `send_batch` folds them into
/// [`FailureDetail`](mailcast_core::FailureDetail) records, webhook parsing
/// logs and returns an empty result, and suppression sync logs and
/// swallows. They exist so internal request construction and response
/// handling can use `?` like any other fallible code.
#[derive(Debug, Error)]
pub enum EspError {
    /// Required configuration (API key, domain) is absent or malformed.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// A network or transport-level failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The provider returned a non-success response.
    #[error("provider API error: {0}")]
    Api(String),

    /// A payload could not be encoded or a response could not be decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A webhook signature did not verify.
    #[error("signature verification failed: {0}")]
    Signature(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = EspError::Configuration("API key missing".into());
        assert_eq!(err.to_string(), "invalid configuration: API key missing");

        let err = EspError::Api("HTTP 500: oops".into());
        assert_eq!(err.to_string(), "provider API error: HTTP 500: oops");
    }
}
