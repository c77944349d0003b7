//! Authorization redirect construction
//!
//! The first leg of the flow: the gateway sends the user's browser to
//! HubSpot's consent page carrying the client id, requested scope, the
//! registered redirect URI and the state token.

use common::Secret;
use url::Url;

use crate::constants::{
    API_BASE_URL, AUTHORIZE_ENDPOINT, CONTACTS_PATH, REDIRECT_URI, SCOPES, TOKEN_PATH,
};
use crate::error::{Error, Result};

/// OAuth client registration plus the vendor endpoints to talk to.
#[derive(Debug, Clone)]
pub struct OAuthSettings {
    pub client_id: String,
    pub client_secret: Secret<String>,
    pub redirect_uri: String,
    pub scope: String,
    pub authorize_url: String,
    /// Base for the token and CRM endpoints, without trailing path
    pub api_base_url: String,
}

impl OAuthSettings {
    /// Settings for the production HubSpot endpoints.
    pub fn new(client_id: impl Into<String>, client_secret: Secret<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret,
            redirect_uri: REDIRECT_URI.to_string(),
            scope: SCOPES.to_string(),
            authorize_url: AUTHORIZE_ENDPOINT.to_string(),
            api_base_url: API_BASE_URL.to_string(),
        }
    }

    pub fn token_url(&self) -> String {
        format!("{}{TOKEN_PATH}", self.api_base_url.trim_end_matches('/'))
    }

    pub fn contacts_url(&self) -> String {
        format!("{}{CONTACTS_PATH}", self.api_base_url.trim_end_matches('/'))
    }
}

/// Build the full authorization URL with every parameter percent-encoded.
pub fn build_authorization_url(settings: &OAuthSettings, state: &str) -> Result<String> {
    let url = Url::parse_with_params(
        &settings.authorize_url,
        &[
            ("client_id", settings.client_id.as_str()),
            ("scope", settings.scope.as_str()),
            ("redirect_uri", settings.redirect_uri.as_str()),
            ("state", state),
        ],
    )
    .map_err(|e| Error::InvalidUrl(format!("{}: {e}", settings.authorize_url)))?;

    Ok(url.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> OAuthSettings {
        OAuthSettings::new("client-123", Secret::new("shh".to_string()))
    }

    #[test]
    fn authorization_url_contains_required_params() {
        let url = build_authorization_url(&settings(), "u1:o1").unwrap();

        assert!(url.starts_with(AUTHORIZE_ENDPOINT));
        assert!(url.contains("client_id=client-123"));
        assert!(url.contains("scope=crm.objects.contacts.read"));
        assert!(url.contains(
            "redirect_uri=http%3A%2F%2Flocalhost%3A8000%2Foauth2callback%2Fhubspot"
        ));
        assert!(url.contains("state=u1%3Ao1"));
        assert!(!url.contains("shh"), "client secret must never reach the URL");
    }

    #[test]
    fn state_decodes_back_unchanged() {
        let url = build_authorization_url(&settings(), "alice&co:acme=1").unwrap();
        let parsed = Url::parse(&url).unwrap();
        let state = parsed
            .query_pairs()
            .find(|(k, _)| k == "state")
            .map(|(_, v)| v.into_owned());
        assert_eq!(state.as_deref(), Some("alice&co:acme=1"));
    }

    #[test]
    fn invalid_authorize_url_is_rejected() {
        let mut settings = settings();
        settings.authorize_url = "not a url".into();
        assert!(matches!(
            build_authorization_url(&settings, "s"),
            Err(Error::InvalidUrl(_))
        ));
    }

    #[test]
    fn endpoint_urls_join_base_without_double_slash() {
        let mut settings = settings();
        settings.api_base_url = "http://127.0.0.1:9999/".into();
        assert_eq!(settings.token_url(), "http://127.0.0.1:9999/oauth/v1/token");
        assert_eq!(
            settings.contacts_url(),
            "http://127.0.0.1:9999/crm/v3/objects/contacts"
        );
    }

    #[test]
    fn production_endpoints_by_default() {
        let settings = settings();
        assert_eq!(settings.token_url(), "https://api.hubapi.com/oauth/v1/token");
        assert_eq!(
            settings.contacts_url(),
            "https://api.hubapi.com/crm/v3/objects/contacts"
        );
    }
}
