//! OAuth `state` correlation tokens
//!
//! The state parameter binds a vendor callback to the authorize request that
//! started it. Two encodings are supported:
//!
//! - `Plain`: the identity itself, `<user_id>:<org_id>`. Unsigned, so a
//!   caller can forge a callback for any identity. Kept for deployments
//!   whose HubSpot app was registered against the colon format.
//! - `Opaque`: a random token mapped server-side to the identity. Tokens are
//!   single-use and expire after the configured TTL.

use std::collections::HashMap;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngExt;
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::constants::MAX_PENDING_STATES;
use crate::error::{Error, Result};
use crate::identity::IdentityPair;

/// How state tokens are encoded on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateMode {
    Plain,
    #[default]
    Opaque,
}

/// Encode an identity as `<user_id>:<org_id>`.
///
/// The callback splits on the first `:`, so only `user_id` must be free of
/// colons for the pair to survive the round trip.
pub fn encode_plain(identity: &IdentityPair) -> Result<String> {
    if identity.user_id.contains(':') {
        return Err(Error::MalformedState(
            "user_id must not contain ':' in plain state mode".into(),
        ));
    }
    Ok(identity.to_string())
}

/// Parse a plain state back into an identity, splitting on the first `:`.
///
/// Either half may be empty: identities carry no format rules, so `:o1`
/// resolves to an empty `user_id`.
pub fn parse_plain(state: &str) -> Result<IdentityPair> {
    let (user_id, org_id) = state.split_once(':').ok_or_else(|| {
        Error::MalformedState(format!("expected <user_id>:<org_id>, got {state:?}"))
    })?;
    Ok(IdentityPair::new(user_id, org_id))
}

/// Generate a random opaque state token.
///
/// 32 random bytes encoded as URL-safe base64 without padding (43 chars).
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

struct PendingState {
    identity: IdentityPair,
    created_at: Instant,
}

/// Issues state tokens for authorize requests and resolves them on callback.
///
/// At most `max_pending` opaque tokens are held; issuing beyond that evicts
/// the oldest one.
pub struct StateManager {
    mode: StateMode,
    ttl: Duration,
    max_pending: usize,
    pending: Mutex<HashMap<String, PendingState>>,
}

impl StateManager {
    pub fn new(mode: StateMode, ttl: Duration) -> Self {
        Self {
            mode,
            ttl,
            max_pending: MAX_PENDING_STATES,
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Override the pending token cap (clamped to at least 1).
    pub fn with_max_pending(mut self, max_pending: usize) -> Self {
        self.max_pending = max_pending.max(1);
        self
    }

    /// Produce the state value to send with the authorization redirect.
    pub async fn issue(&self, identity: &IdentityPair) -> Result<String> {
        match self.mode {
            StateMode::Plain => encode_plain(identity),
            StateMode::Opaque => {
                let token = generate_token();
                let mut pending = self.pending.lock().await;
                // Lazy cleanup: drop expired entries while holding the lock
                pending.retain(|_, s| s.created_at.elapsed() < self.ttl);
                while pending.len() >= self.max_pending {
                    let oldest = pending
                        .iter()
                        .min_by_key(|(_, s)| s.created_at)
                        .map(|(token, _)| token.clone());
                    let Some(oldest) = oldest else { break };
                    if let Some(evicted) = pending.remove(&oldest) {
                        warn!(
                            user_id = evicted.identity.user_id,
                            org_id = evicted.identity.org_id,
                            max_pending = self.max_pending,
                            "pending state tokens at capacity, evicted oldest"
                        );
                    }
                }
                pending.insert(
                    token.clone(),
                    PendingState {
                        identity: identity.clone(),
                        created_at: Instant::now(),
                    },
                );
                debug!(
                    user_id = identity.user_id,
                    org_id = identity.org_id,
                    "issued opaque state token"
                );
                Ok(token)
            }
        }
    }

    /// Resolve the state received on callback back to its identity.
    ///
    /// Opaque tokens are removed on first use, whether or not they expired.
    pub async fn resolve(&self, state: &str) -> Result<IdentityPair> {
        match self.mode {
            StateMode::Plain => parse_plain(state),
            StateMode::Opaque => {
                let entry = self.pending.lock().await.remove(state);
                let entry = entry.ok_or_else(|| {
                    Error::MalformedState("unknown or already used state token".into())
                })?;

                if entry.created_at.elapsed() >= self.ttl {
                    warn!(
                        user_id = entry.identity.user_id,
                        org_id = entry.identity.org_id,
                        "state token expired before callback"
                    );
                    return Err(Error::MalformedState("state token expired".into()));
                }

                Ok(entry.identity)
            }
        }
    }

    /// Number of opaque tokens awaiting a callback (expired ones included
    /// until the next cleanup).
    pub async fn pending_len(&self) -> usize {
        self.pending.lock().await.len()
    }
}
