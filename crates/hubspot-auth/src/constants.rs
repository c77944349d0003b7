//! HubSpot OAuth defaults
//!
//! Endpoint bases are overridable through configuration; these are the
//! production values.

/// Authorization page the user is redirected to for consent
pub const AUTHORIZE_ENDPOINT: &str = "https://app.hubspot.com/oauth/authorize";

/// Base URL of the HubSpot REST API (token exchange and CRM objects)
pub const API_BASE_URL: &str = "https://api.hubapi.com";

/// Path of the token endpoint, relative to `API_BASE_URL`
pub const TOKEN_PATH: &str = "/oauth/v1/token";

/// Path of the CRM contacts list endpoint, relative to `API_BASE_URL`
pub const CONTACTS_PATH: &str = "/crm/v3/objects/contacts";

/// Callback registered with the HubSpot app
pub const REDIRECT_URI: &str = "http://localhost:8000/oauth2callback/hubspot";

/// Read access to CRM contacts is the only scope the integration needs.
pub const SCOPES: &str = "crm.objects.contacts.read";

/// Provider prefix of every credential store key
pub const PROVIDER: &str = "hubspot";

/// Lifetime of an unconsumed opaque state token
pub const STATE_TTL_SECS: u64 = 600;

/// Upper bound on opaque state tokens awaiting a callback
pub const MAX_PENDING_STATES: usize = 10_000;

/// Histogram of vendor round-trip latency, labelled by `endpoint`
pub const VENDOR_REQUEST_DURATION: &str = "hubspot_vendor_request_duration_seconds";
