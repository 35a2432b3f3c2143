//! Preview Renderer
//!
//! Plain-text fragments shown next to the form. Hidden lines are `None`.

use serde::{Deserialize, Serialize};

use crate::fields::{Field, InvitationFields};

pub const GUEST_PLACEHOLDER: &str = "Dear [Guest Name]";

pub fn guest_line(guest_name: &str) -> String {
    let name = guest_name.trim();
    if name.is_empty() {
        GUEST_PLACEHOLDER.to_string()
    } else {
        format!("Dear {}", name)
    }
}

pub fn family_line(family_name: &str) -> Option<String> {
    let name = family_name.trim();
    (!name.is_empty()).then(|| format!("{} Family", name))
}

pub fn contact_line(phone_number: &str) -> Option<String> {
    let phone = phone_number.trim();
    (!phone.is_empty()).then(|| format!("Contact: {}", phone))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewState {
    pub guest_line: String,
    pub family_line: Option<String>,
    pub contact_line: Option<String>,
}

impl PreviewState {
    pub fn render(fields: &InvitationFields) -> Self {
        Self {
            guest_line: guest_line(&fields.guest_name),
            family_line: family_line(&fields.family_name),
            contact_line: contact_line(&fields.phone_number),
        }
    }

    /// Recompute the fragment owned by `field` and nothing else.
    pub fn apply(&mut self, field: Field, value: &str) {
        match field {
            Field::GuestName => self.guest_line = guest_line(value),
            Field::FamilyName => self.family_line = family_line(value),
            Field::PhoneNumber => self.contact_line = contact_line(value),
        }
    }

    pub fn family_visible(&self) -> bool {
        self.family_line.is_some()
    }

    pub fn contact_visible(&self) -> bool {
        self.contact_line.is_some()
    }
}

impl Default for PreviewState {
    fn default() -> Self {
        Self::render(&InvitationFields::default())
    }
}
