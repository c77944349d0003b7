//! Authorization code exchange
//!
//! POSTs the code received on callback to HubSpot's token endpoint. The
//! response is kept verbatim as a `TokenPayload`: besides the access token
//! HubSpot returns refresh token, expiry and token type, and all of it is
//! persisted unchanged.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::authorize::OAuthSettings;
use crate::error::{Error, Result};

/// Raw token endpoint response, guaranteed to carry a string `access_token`
/// when produced by `exchange_code`.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenPayload(Map<String, Value>);

impl TokenPayload {
    /// Validate a token endpoint response.
    ///
    /// A JSON object without an `access_token` string is a vendor rejection
    /// and is returned whole so the caller can echo it. Anything that is not
    /// an object is an unexpected response shape.
    pub fn from_exchange_response(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => {
                if map.get("access_token").and_then(Value::as_str).is_some() {
                    Ok(Self(map))
                } else {
                    Err(Error::TokenRejected(Value::Object(map)))
                }
            }
            other => Err(Error::VendorResponseShape(format!(
                "token endpoint returned non-object JSON: {other}"
            ))),
        }
    }

    pub fn access_token(&self) -> Option<&str> {
        self.0.get("access_token").and_then(Value::as_str)
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.0.get("refresh_token").and_then(Value::as_str)
    }

    /// Seconds until the access token expires, as reported at exchange time
    pub fn expires_in(&self) -> Option<u64> {
        self.0.get("expires_in").and_then(Value::as_u64)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl fmt::Debug for TokenPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPayload")
            .field("fields", &self.0.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Exchange an authorization code for tokens.
///
/// The body is inspected whatever the HTTP status: HubSpot reports a bad
/// code as a JSON error object, which surfaces as `Error::TokenRejected`.
pub async fn exchange_code(
    client: &reqwest::Client,
    settings: &OAuthSettings,
    code: &str,
) -> Result<TokenPayload> {
    let response = client
        .post(settings.token_url())
        .form(&[
            ("grant_type", "authorization_code"),
            ("client_id", settings.client_id.as_str()),
            ("client_secret", settings.client_secret.expose().as_str()),
            ("redirect_uri", settings.redirect_uri.as_str()),
            ("code", code),
        ])
        .send()
        .await
        .map_err(|e| Error::Http(format!("token exchange request failed: {e}")))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| Error::Http(format!("reading token response failed: {e}")))?;

    let value: Value = serde_json::from_str(&body).map_err(|e| {
        Error::VendorResponseShape(format!(
            "token endpoint returned {status} with non-JSON body: {e}"
        ))
    })?;

    match TokenPayload::from_exchange_response(value) {
        Ok(payload) => {
            debug!(%status, fields = payload.as_map().len(), "token exchange succeeded");
            Ok(payload)
        }
        Err(e) => {
            warn!(%status, error = %e, "token exchange did not return an access token");
            Err(e)
        }
    }
}
