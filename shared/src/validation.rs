//! Input validation functions
//!
//! Validators return `Result<(), String>` with a human-readable message.
//! [`FieldErrors`] accumulates those messages per field so that a request
//! reports every violation at once.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::ValidateEmail;

pub const NAME_MAX_LEN: usize = 50;
pub const HEADLINE_MAX_LEN: usize = 50;
pub const BIO_MAX_LEN: usize = 500;
pub const EMAIL_MAX_LEN: usize = 256;
pub const PASSWORD_MAX_LEN: usize = 256;

/// Field name to list of validation messages
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message for `field`
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    /// Record the error of a validator result, if any
    pub fn check(&mut self, field: &str, result: Result<(), String>) {
        if let Err(message) = result {
            self.add(field, message);
        }
    }

    pub fn merge(&mut self, other: FieldErrors) {
        for (field, messages) in other.0 {
            self.0.entry(field).or_default().extend(messages);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// `Ok(())` when empty, otherwise the collected errors
    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    pub fn into_inner(self) -> BTreeMap<String, Vec<String>> {
        self.0
    }
}

/// Validate email format
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.trim().is_empty() {
        return Err("Email is required.".to_string());
    }
    if email.len() > EMAIL_MAX_LEN {
        return Err("Email is too long.".to_string());
    }
    if !email.validate_email() {
        return Err("Invalid email format.".to_string());
    }
    Ok(())
}

/// Validate a new password
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("Password is required.".to_string());
    }
    if password.chars().count() > PASSWORD_MAX_LEN {
        return Err("Password is too long.".to_string());
    }
    Ok(())
}

/// Validate a required first or last name
pub fn validate_name(label: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{label} is required."));
    }
    if value.chars().count() > NAME_MAX_LEN {
        return Err(format!("{label} must be at most {NAME_MAX_LEN} characters."));
    }
    Ok(())
}

pub fn validate_headline(headline: &str) -> Result<(), String> {
    if headline.chars().count() > HEADLINE_MAX_LEN {
        return Err(format!("Headline must be at most {HEADLINE_MAX_LEN} characters."));
    }
    Ok(())
}

pub fn validate_bio(bio: &str) -> Result<(), String> {
    if bio.chars().count() > BIO_MAX_LEN {
        return Err(format!("Bio must be at most {BIO_MAX_LEN} characters."));
    }
    Ok(())
}
