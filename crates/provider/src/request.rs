use std::collections::{BTreeMap, HashMap};

/// A framework-agnostic view of an inbound webhook HTTP request.
///
/// The surrounding web framework routes provider callbacks here after
/// extracting the pieces the signature schemes need: the externally visible
/// request URL, the headers, the decoded query/form parameters and the raw
/// body bytes. Parameters live in a `BTreeMap` because one scheme signs
/// them in sorted key order; the body is kept as raw bytes because another
/// signs it verbatim.
#[derive(Debug, Clone, Default)]
pub struct WebhookRequest {
    /// Externally visible request URL, as the provider signed it.
    pub url: String,

    /// Request headers, keys lowercased.
    pub headers: HashMap<String, String>,

    /// Decoded query/form parameters, sorted by key.
    pub params: BTreeMap<String, String>,

    /// Raw request body.
    pub body: Vec<u8>,
}

impl WebhookRequest {
    /// Create an empty request for the given URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Add a header. The name is lowercased for case-insensitive lookup.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into().to_lowercase(), value.into());
        self
    }

    /// Add a query/form parameter.
    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Set the raw body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Look up a header, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }

    /// Look up a parameter.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// The body as UTF-8, if it is valid UTF-8.
    pub fn body_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }
}
