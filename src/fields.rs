//! Field Store - the three inputs of an invitation
//!
//! Values are kept exactly as typed. Every read goes through `trim`, so a
//! snapshot never carries leading or trailing whitespace.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    GuestName,
    FamilyName,
    PhoneNumber,
}

impl Field {
    pub const ALL: [Field; 3] = [Field::GuestName, Field::FamilyName, Field::PhoneNumber];

    pub fn label(&self) -> &'static str {
        match self {
            Field::GuestName => "guest name",
            Field::FamilyName => "family name",
            Field::PhoneNumber => "phone number",
        }
    }
}

/// Read-only snapshot of the form, already trimmed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvitationFields {
    pub guest_name: String,
    #[serde(default)]
    pub family_name: String,
    #[serde(default)]
    pub phone_number: String,
}

impl InvitationFields {
    pub fn new(guest_name: &str, family_name: &str, phone_number: &str) -> Self {
        Self {
            guest_name: guest_name.trim().to_string(),
            family_name: family_name.trim().to_string(),
            phone_number: phone_number.trim().to_string(),
        }
    }

    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::GuestName => &self.guest_name,
            Field::FamilyName => &self.family_name,
            Field::PhoneNumber => &self.phone_number,
        }
    }

    pub fn is_empty(&self) -> bool {
        Field::ALL.iter().all(|f| self.get(*f).is_empty())
    }
}

/// Mutable per-session input state.
#[derive(Debug, Clone, Default)]
pub struct FieldStore {
    guest_name: String,
    family_name: String,
    phone_number: String,
}

impl FieldStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a raw value and return its trimmed form.
    ///
    /// Only the slot for `field` is written.
    pub fn set(&mut self, field: Field, value: &str) -> &str {
        let slot = match field {
            Field::GuestName => &mut self.guest_name,
            Field::FamilyName => &mut self.family_name,
            Field::PhoneNumber => &mut self.phone_number,
        };
        slot.clear();
        slot.push_str(value);
        slot.trim()
    }

    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::GuestName => self.guest_name.trim(),
            Field::FamilyName => self.family_name.trim(),
            Field::PhoneNumber => self.phone_number.trim(),
        }
    }

    pub fn snapshot(&self) -> InvitationFields {
        InvitationFields::new(&self.guest_name, &self.family_name, &self.phone_number)
    }

    pub fn clear(&mut self) {
        self.guest_name.clear();
        self.family_name.clear();
        self.phone_number.clear();
    }
}
