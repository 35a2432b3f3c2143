//! Validation System - Rule/Policy Separation
//!
//! Rules produce structured violations.
//! Policy: errors block generation, warnings are only reported.

use serde::{Deserialize, Serialize};

use crate::fields::{Field, InvitationFields};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ViolationSeverity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationViolation {
    pub rule: String,
    pub field: Field,
    pub severity: ViolationSeverity,
    pub message: String,
    pub remediation: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub violations: Vec<ValidationViolation>,
}

impl ValidationResult {
    pub fn has_errors(&self) -> bool {
        self.violations.iter().any(|v| v.severity == ViolationSeverity::Error)
    }

    /// The field input focus goes back to: the first one with an error.
    pub fn focus_field(&self) -> Option<Field> {
        self.violations
            .iter()
            .find(|v| v.severity == ViolationSeverity::Error)
            .map(|v| v.field)
    }

    pub fn first_error(&self) -> Option<&ValidationViolation> {
        self.violations.iter().find(|v| v.severity == ViolationSeverity::Error)
    }
}

/// Validation rule trait - produces violations
pub trait ValidationRule: Send + Sync {
    fn name(&self) -> &'static str;
    fn validate(&self, fields: &InvitationFields) -> Vec<ValidationViolation>;
}

// --- Concrete Rules ---

pub struct GuestNameRequiredRule;

impl ValidationRule for GuestNameRequiredRule {
    fn name(&self) -> &'static str { "guest_name_required" }

    fn validate(&self, fields: &InvitationFields) -> Vec<ValidationViolation> {
        if !fields.guest_name.trim().is_empty() {
            return vec![];
        }

        vec![ValidationViolation {
            rule: self.name().to_string(),
            field: Field::GuestName,
            severity: ViolationSeverity::Error,
            message: "Please enter a guest name to generate the complete invitation.".to_string(),
            remediation: vec!["Type the name of the guest being invited".to_string()],
        }]
    }
}

pub struct PhoneNumberRule;

impl PhoneNumberRule {
    fn allowed(c: char) -> bool {
        c.is_ascii_digit() || matches!(c, ' ' | '+' | '-' | '(' | ')' | '.')
    }
}

impl ValidationRule for PhoneNumberRule {
    fn name(&self) -> &'static str { "phone_number_charset" }

    fn validate(&self, fields: &InvitationFields) -> Vec<ValidationViolation> {
        let phone = fields.phone_number.trim();
        if phone.is_empty() || phone.chars().all(Self::allowed) {
            return vec![];
        }

        vec![ValidationViolation {
            rule: self.name().to_string(),
            field: Field::PhoneNumber,
            severity: ViolationSeverity::Warning,
            message: format!("Phone number '{}' contains unexpected characters", phone),
            remediation: vec!["Use digits, spaces, '+', '-', '.' or parentheses".to_string()],
        }]
    }
}

/// Validator orchestrates rules and applies policy
pub struct Validator {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl Validator {
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(GuestNameRequiredRule),
                Box::new(PhoneNumberRule),
            ],
        }
    }

    pub fn validate(&self, fields: &InvitationFields) -> ValidationResult {
        let violations: Vec<_> = self.rules
            .iter()
            .flat_map(|rule| rule.validate(fields))
            .collect();

        // Warnings don't block
        let valid = !violations.iter().any(|v| v.severity == ViolationSeverity::Error);

        ValidationResult { valid, violations }
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}
