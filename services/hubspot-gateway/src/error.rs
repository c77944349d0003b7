//! Request-path errors and their HTTP mapping
//!
//! Every failure a handler can hit is a variant here; `IntoResponse` turns
//! it into the JSON body `{"error": ..., "details"?: ...}`. Store and
//! serialization failures are logged but their details stay server-side.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    MissingInput(&'static str),

    /// Token endpoint answered without an access token
    #[error("OAuth failed")]
    OAuthFailed(Value),

    #[error("Malformed state: {0}")]
    MalformedState(String),

    #[error("No credentials found for HubSpot")]
    NotFound,

    #[error("HubSpot request failed: {0}")]
    Upstream(String),

    #[error("HubSpot returned {status}")]
    VendorStatus { status: u16, body: Value },

    #[error("Unexpected HubSpot response: {0}")]
    VendorResponseShape(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingInput(_) | ApiError::OAuthFailed(_) | ApiError::MalformedState(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Upstream(_)
            | ApiError::VendorStatus { .. }
            | ApiError::VendorResponseShape(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> Value {
        match self {
            ApiError::MissingInput(message) => json!({ "error": message }),
            ApiError::OAuthFailed(details) => {
                json!({ "error": "OAuth failed", "details": details })
            }
            ApiError::MalformedState(details) => {
                json!({ "error": "Malformed state", "details": details })
            }
            ApiError::NotFound => json!({ "error": "No credentials found for HubSpot" }),
            ApiError::Upstream(details) => {
                json!({ "error": "HubSpot request failed", "details": details })
            }
            ApiError::VendorStatus { status, body } => json!({
                "error": "HubSpot request failed",
                "details": { "status": status, "body": body },
            }),
            ApiError::VendorResponseShape(details) => {
                json!({ "error": "Unexpected HubSpot response", "details": details })
            }
            ApiError::Internal(_) => json!({ "error": "Internal error" }),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(ref details) = self {
            error!(error = %details, "request failed with internal error");
        }
        (
            self.status(),
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            self.body().to_string(),
        )
            .into_response()
    }
}

impl From<hubspot_auth::Error> for ApiError {
    fn from(err: hubspot_auth::Error) -> Self {
        use hubspot_auth::Error as E;
        match err {
            E::TokenRejected(details) => ApiError::OAuthFailed(details),
            E::MalformedState(msg) => ApiError::MalformedState(msg),
            E::NotFound(_) => ApiError::NotFound,
            E::Http(msg) => ApiError::Upstream(msg),
            E::VendorResponseShape(msg) => ApiError::VendorResponseShape(msg),
            E::InvalidUrl(_) | E::Store(_) | E::CredentialParse(_) | E::Io(_) => {
                ApiError::Internal(err.to_string())
            }
        }
    }
}

impl From<hubspot_crm::Error> for ApiError {
    fn from(err: hubspot_crm::Error) -> Self {
        use hubspot_crm::Error as E;
        match err {
            E::Credentials(inner) => inner.into(),
            E::Http(msg) => ApiError::Upstream(msg),
            E::Vendor { status, body } => ApiError::VendorStatus { status, body },
            E::VendorResponseShape(msg) => ApiError::VendorResponseShape(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn render(err: ApiError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn missing_input_has_no_details() {
        let (status, body) = render(ApiError::MissingInput("Missing code or state")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "Missing code or state"}));
    }

    #[tokio::test]
    async fn vendor_rejection_echoes_details() {
        let err: ApiError = hubspot_auth::Error::TokenRejected(json!({})).into();
        let (status, body) = render(err).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "OAuth failed", "details": {}}));
    }

    #[tokio::test]
    async fn not_found_maps_to_404() {
        let err: ApiError = hubspot_crm::Error::Credentials(hubspot_auth::Error::NotFound(
            "No credentials found for HubSpot".into(),
        ))
        .into();
        let (status, body) = render(err).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "No credentials found for HubSpot");
    }

    #[tokio::test]
    async fn internal_errors_hide_details() {
        let err: ApiError = hubspot_auth::Error::Store("redis SET failed: auth".into()).into();
        let (status, body) = render(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"error": "Internal error"}));
    }

    #[tokio::test]
    async fn vendor_status_maps_to_bad_gateway() {
        let err: ApiError = hubspot_crm::Error::Vendor {
            status: 401,
            body: json!({"category": "EXPIRED_AUTHENTICATION"}),
        }
        .into();
        let (status, body) = render(err).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["details"]["status"], 401);
        assert_eq!(body["details"]["body"]["category"], "EXPIRED_AUTHENTICATION");
    }

    #[test]
    fn malformed_state_is_client_error() {
        let err: ApiError = hubspot_auth::Error::MalformedState("no colon".into()).into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Malformed state: no colon");
    }
}
