//! Error types for CRM fetch operations

/// Errors from fetching CRM items.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Reading the stored token payload failed (including not-found).
    #[error(transparent)]
    Credentials(#[from] hubspot_auth::Error),

    #[error("HTTP request failed: {0}")]
    Http(String),

    /// HubSpot answered with a non-success status.
    #[error("vendor returned {status}")]
    Vendor { status: u16, body: serde_json::Value },

    #[error("unexpected vendor response: {0}")]
    VendorResponseShape(String),
}

/// Result alias for CRM operations.
pub type Result<T> = std::result::Result<T, Error>;
