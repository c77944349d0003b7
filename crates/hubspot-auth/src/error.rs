//! Error types for HubSpot OAuth operations

/// Errors from OAuth and credential storage operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// The token endpoint answered without an access token. Carries the
    /// vendor body verbatim so callers can surface it.
    #[error("token exchange rejected by vendor")]
    TokenRejected(serde_json::Value),

    #[error("unexpected vendor response: {0}")]
    VendorResponseShape(String),

    #[error("malformed state: {0}")]
    MalformedState(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("credential store error: {0}")]
    Store(String),

    #[error("credential parse error: {0}")]
    CredentialParse(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("not found: {0}")]
    NotFound(String),
}

/// Result alias for auth operations.
pub type Result<T> = std::result::Result<T, Error>;
