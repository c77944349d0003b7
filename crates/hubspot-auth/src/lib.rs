//! HubSpot OAuth authentication library
//!
//! Covers the OAuth half of the HubSpot integration: building the
//! authorization redirect, correlating the callback through a state token,
//! exchanging the authorization code, and persisting the resulting token
//! payload in a key-value store. It has no dependency on the gateway binary.
//!
//! Credential flow:
//! 1. Gateway issues a state token via `state::StateManager::issue()`
//! 2. User is redirected to `authorize::build_authorization_url()`
//! 3. Callback resolves the state back to an `IdentityPair`
//! 4. Gateway calls `token::exchange_code()` with the authorization code
//! 5. Payload stored via `credentials::CredentialStore::save()`
//! 6. Later reads go through `credentials::CredentialStore::load()`

pub mod authorize;
pub mod constants;
pub mod credentials;
pub mod error;
pub mod identity;
pub mod redis_store;
pub mod state;
pub mod token;

pub use authorize::{OAuthSettings, build_authorization_url};
pub use constants::*;
pub use credentials::{CredentialStore, FileStore, KeyValueStore, MemoryStore};
pub use error::{Error, Result};
pub use identity::IdentityPair;
pub use redis_store::RedisStore;
pub use state::{StateManager, StateMode};
pub use token::{TokenPayload, exchange_code};
