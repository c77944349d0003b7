//! HubSpot CRM item fetching
//!
//! Reads a stored token payload, lists the CRM contacts it grants access to,
//! and reshapes them into `IntegrationItem`s for display. Only the first page
//! of contacts is returned.

pub mod contacts;
pub mod error;
pub mod item;

pub use contacts::{RawContact, fetch_contacts};
pub use error::{Error, Result};
pub use item::{IntegrationItem, format_contact, format_contacts};

use hubspot_auth::{CredentialStore, IdentityPair, OAuthSettings};
use tracing::{info, instrument};

/// Fetch and format the contacts visible to an identity.
///
/// Fails with `Error::Credentials(NotFound)` when the identity never
/// completed the OAuth flow.
#[instrument(skip_all, fields(user_id = %identity.user_id, org_id = %identity.org_id))]
pub async fn get_items(
    client: &reqwest::Client,
    settings: &OAuthSettings,
    store: &CredentialStore,
    identity: &IdentityPair,
) -> Result<Vec<IntegrationItem>> {
    let credentials = store.load(identity).await?;
    let access_token = credentials.access_token().ok_or_else(|| {
        Error::VendorResponseShape("stored credentials have no access_token".into())
    })?;

    let contacts = fetch_contacts(client, &settings.contacts_url(), access_token).await?;
    let items = format_contacts(&contacts);
    info!(count = items.len(), "fetched hubspot contacts");
    Ok(items)
}
