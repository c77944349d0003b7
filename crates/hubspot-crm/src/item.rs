//! Reshaping vendor contacts into display items

use serde::{Deserialize, Serialize};

use crate::contacts::RawContact;

/// A contact as shown to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrationItem {
    pub id: String,
    /// `firstname + " " + lastname`, untrimmed
    pub name: String,
    pub email: String,
}

/// Map one vendor record. Absent or null properties become empty strings.
pub fn format_contact(contact: &RawContact) -> IntegrationItem {
    let firstname = contact.property("firstname");
    let lastname = contact.property("lastname");

    IntegrationItem {
        id: contact.id.clone(),
        name: format!("{firstname} {lastname}"),
        email: contact.property("email").to_string(),
    }
}

/// Map every record, preserving vendor order.
pub fn format_contacts(contacts: &[RawContact]) -> Vec<IntegrationItem> {
    contacts.iter().map(format_contact).collect()
}
