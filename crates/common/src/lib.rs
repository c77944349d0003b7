//! Shared types for the HubSpot integration gateway
//!
//! Holds the pieces every crate in the workspace needs: a redacting
//! wrapper for OAuth client secrets and the configuration error type.

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
