//! HubSpot integration endpoints
//!
//! - GET /integrations/hubspot/authorize  : redirect to HubSpot consent
//! - GET /oauth2callback/hubspot          : exchange code, store credentials
//! - GET /integrations/hubspot/credentials: stored token payload
//! - GET /integrations/hubspot/items      : formatted CRM contacts

use std::time::Instant;

use axum::Json;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::response::Redirect;
use hubspot_auth::IdentityPair;
use hubspot_crm::IntegrationItem;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, instrument, warn};

use crate::AppState;
use crate::error::ApiError;
use crate::metrics;

/// Query parameters naming the identity a request acts for.
#[derive(Debug, Default, Deserialize)]
pub struct IdentityQuery {
    user_id: Option<String>,
    org_id: Option<String>,
}

impl IdentityQuery {
    /// Both ids must be present; their contents are not checked.
    fn identity(query: Result<Query<Self>, QueryRejection>) -> Result<IdentityPair, ApiError> {
        let query = query.map(|Query(q)| q).unwrap_or_else(|e| {
            warn!(error = %e, "identity query rejected");
            Self::default()
        });
        match (query.user_id, query.org_id) {
            (Some(user_id), Some(org_id)) => Ok(IdentityPair::new(user_id, org_id)),
            _ => Err(ApiError::MissingInput("Missing user_id or org_id")),
        }
    }
}

/// Parameters HubSpot appends to the redirect URI.
#[derive(Debug, Default, Deserialize)]
pub struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
}

fn new_request_id() -> String {
    format!("req_{}", uuid::Uuid::new_v4().as_simple())
}

/// GET /integrations/hubspot/authorize: 307 to the HubSpot consent page.
#[instrument(skip_all, fields(request_id = %new_request_id()))]
pub async fn authorize(
    State(state): State<AppState>,
    query: Result<Query<IdentityQuery>, QueryRejection>,
) -> Result<Redirect, ApiError> {
    let identity = IdentityQuery::identity(query)?;
    let state_token = state.states.issue(&identity).await?;
    let url = hubspot_auth::build_authorization_url(&state.oauth, &state_token)?;

    info!(
        user_id = identity.user_id,
        org_id = identity.org_id,
        "redirecting to hubspot authorization"
    );
    Ok(Redirect::temporary(&url))
}

/// GET /oauth2callback/hubspot: complete the OAuth flow.
#[instrument(skip_all, fields(request_id = %new_request_id()))]
pub async fn oauth_callback(
    State(state): State<AppState>,
    query: Result<Query<CallbackQuery>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    // An unparseable query (e.g. a repeated `code`) counts as missing input
    let query = query.map(|Query(q)| q).unwrap_or_else(|e| {
        warn!(error = %e, "callback query rejected");
        CallbackQuery::default()
    });
    let result = complete_authorization(&state, query).await;

    let outcome = match &result {
        Ok(_) => "connected",
        Err(ApiError::OAuthFailed(_)) => "rejected",
        Err(ApiError::MissingInput(_) | ApiError::MalformedState(_)) => "invalid_request",
        Err(_) => "error",
    };
    metrics::record_callback(outcome);

    result.map(|_| Json(json!({ "message": "HubSpot connected successfully" })))
}

async fn complete_authorization(
    state: &AppState,
    query: CallbackQuery,
) -> Result<IdentityPair, ApiError> {
    let (code, raw_state) = match (query.code, query.state) {
        (Some(code), Some(raw_state)) if !code.is_empty() && !raw_state.is_empty() => {
            (code, raw_state)
        }
        _ => return Err(ApiError::MissingInput("Missing code or state")),
    };

    let identity = state.states.resolve(&raw_state).await.inspect_err(|e| {
        warn!(error = %e, "callback state rejected");
    })?;

    let started = Instant::now();
    let exchanged = hubspot_auth::exchange_code(&state.http_client, &state.oauth, &code).await;
    metrics::record_vendor_duration("token", started.elapsed().as_secs_f64());
    let payload = exchanged?;

    state.store.save(&identity, &payload).await?;

    info!(
        user_id = identity.user_id,
        org_id = identity.org_id,
        has_refresh_token = payload.refresh_token().is_some(),
        expires_in = payload.expires_in(),
        "hubspot connected"
    );
    Ok(identity)
}

/// GET /integrations/hubspot/credentials: the stored payload, verbatim.
#[instrument(skip_all, fields(request_id = %new_request_id()))]
pub async fn credentials(
    State(state): State<AppState>,
    query: Result<Query<IdentityQuery>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let identity = IdentityQuery::identity(query)?;
    let payload = state.store.load(&identity).await?;
    Ok(Json(payload.into_value()))
}

/// GET /integrations/hubspot/items: the identity's contacts, formatted.
#[instrument(skip_all, fields(request_id = %new_request_id()))]
pub async fn items(
    State(state): State<AppState>,
    query: Result<Query<IdentityQuery>, QueryRejection>,
) -> Result<Json<Vec<IntegrationItem>>, ApiError> {
    let identity = IdentityQuery::identity(query)?;

    let result = hubspot_crm::get_items(&state.http_client, &state.oauth, &state.store, &identity)
        .await
        .map_err(ApiError::from);

    let outcome = match &result {
        Ok(_) => "ok",
        Err(ApiError::NotFound) => "not_found",
        Err(_) => "error",
    };
    metrics::record_items_request(outcome);

    result.map(Json)
}
