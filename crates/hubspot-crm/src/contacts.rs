//! CRM contacts list endpoint
//!
//! `GET /crm/v3/objects/contacts` with the stored access token as a Bearer
//! credential. HubSpot pages results; only the first page is read.

use std::collections::HashMap;
use std::time::Instant;

use hubspot_auth::VENDOR_REQUEST_DURATION;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// A contact as HubSpot returns it.
#[derive(Debug, Clone, Deserialize)]
pub struct RawContact {
    pub id: String,
    #[serde(default)]
    pub properties: HashMap<String, Value>,
}

impl RawContact {
    /// String value of a property, or `""` when absent, null or non-string.
    pub fn property(&self, name: &str) -> &str {
        self.properties
            .get(name)
            .and_then(Value::as_str)
            .unwrap_or("")
    }
}

#[derive(Deserialize)]
struct ContactPage {
    results: Vec<RawContact>,
}

/// Fetch the first page of contacts.
///
/// The round trip is recorded in the vendor latency histogram, failed
/// attempts included.
pub async fn fetch_contacts(
    client: &reqwest::Client,
    contacts_url: &str,
    access_token: &str,
) -> Result<Vec<RawContact>> {
    let started = Instant::now();
    let received = request_contacts(client, contacts_url, access_token).await;
    metrics::histogram!(VENDOR_REQUEST_DURATION, "endpoint" => "contacts")
        .record(started.elapsed().as_secs_f64());
    let (status, text) = received?;

    let body = match serde_json::from_str::<Value>(&text) {
        Ok(body) => body,
        Err(_) if !status.is_success() => Value::String(text),
        Err(e) => {
            return Err(Error::VendorResponseShape(format!(
                "contacts endpoint returned non-JSON body: {e}"
            )));
        }
    };

    if !status.is_success() {
        warn!(%status, "contacts request rejected by vendor");
        return Err(Error::Vendor {
            status: status.as_u16(),
            body,
        });
    }

    let page: ContactPage = serde_json::from_value(body)
        .map_err(|e| Error::VendorResponseShape(format!("invalid contacts page: {e}")))?;

    debug!(count = page.results.len(), "received contacts page");
    Ok(page.results)
}

async fn request_contacts(
    client: &reqwest::Client,
    contacts_url: &str,
    access_token: &str,
) -> Result<(reqwest::StatusCode, String)> {
    let response = client
        .get(contacts_url)
        .bearer_auth(access_token)
        .header(CONTENT_TYPE, "application/json")
        .send()
        .await
        .map_err(|e| Error::Http(format!("contacts request failed: {e}")))?;

    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| Error::Http(format!("reading contacts response failed: {e}")))?;
    Ok((status, text))
}
