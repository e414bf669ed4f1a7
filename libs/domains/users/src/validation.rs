//! Field validation for registration requests.
//!
//! Every field is checked in a single pass, so one call reports all problems
//! of a request. Within a field, `required` short-circuits: a blank field
//! carries exactly one entry and no format or length entry.

use std::collections::BTreeMap;

use core_config::ConfigError;
use serde::Serialize;
use validator::{ValidateEmail, ValidateLength};

use crate::models::{Field, RegistrationRequest};

pub const DEFAULT_MIN_PASSWORD_LENGTH: usize = 8;
pub const DEFAULT_MAX_PASSWORD_LENGTH: usize = 80;

/// Identifier of the rule that produced a field error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    Required,
    Format,
    Email,
    MinLength,
    MaxLength,
    Confirmation,
    Unique,
}

impl Rule {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rule::Required => "required",
            Rule::Format => "format",
            Rule::Email => "email",
            Rule::MinLength => "min_length",
            Rule::MaxLength => "max_length",
            Rule::Confirmation => "confirmation",
            Rule::Unique => "unique",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub rule: Rule,
    pub message: String,
}

/// Field errors of one registration attempt, keyed by field
///
/// Entries of a field keep the order in which rules fired. Serializes as
/// `{"email": [{"rule": "unique", "message": "has already been taken"}]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrorSet(BTreeMap<Field, Vec<FieldError>>);

impl FieldErrorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// A set holding a single entry
    pub fn single(field: Field, rule: Rule, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, rule, message);
        errors
    }

    pub fn add(&mut self, field: Field, rule: Rule, message: impl Into<String>) {
        self.0.entry(field).or_default().push(FieldError {
            rule,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: Field) -> bool {
        self.0.contains_key(&field)
    }

    /// Entries for `field`, empty when the field is valid
    pub fn get(&self, field: Field) -> &[FieldError] {
        self.0.get(&field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.0.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &[FieldError])> {
        self.0.iter().map(|(field, errors)| (*field, errors.as_slice()))
    }
}

impl std::fmt::Display for FieldErrorSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, errors) in self.iter() {
            for error in errors {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{} {}", field, error.message)?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Length bounds for passwords, counted in characters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordPolicy {
    min_length: usize,
    max_length: usize,
}

impl PasswordPolicy {
    pub fn new(min_length: usize, max_length: usize) -> Result<Self, ConfigError> {
        if min_length == 0 {
            return Err(ConfigError::Invalid(
                "minimum password length must be at least 1".to_string(),
            ));
        }
        if min_length > max_length {
            return Err(ConfigError::Invalid(format!(
                "minimum password length {} exceeds maximum {}",
                min_length, max_length
            )));
        }
        Ok(Self {
            min_length,
            max_length,
        })
    }

    pub fn min_length(&self) -> usize {
        self.min_length
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: DEFAULT_MIN_PASSWORD_LENGTH,
            max_length: DEFAULT_MAX_PASSWORD_LENGTH,
        }
    }
}

/// Human-readable messages per rule
///
/// `{count}` in the length messages is replaced with the configured bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationMessages {
    pub required: String,
    pub format: String,
    pub email: String,
    pub min_length: String,
    pub max_length: String,
    pub confirmation: String,
    pub unique: String,
}

impl ValidationMessages {
    fn too_short(&self, min: usize) -> String {
        self.min_length.replace("{count}", &min.to_string())
    }

    fn too_long(&self, max: usize) -> String {
        self.max_length.replace("{count}", &max.to_string())
    }
}

impl Default for ValidationMessages {
    fn default() -> Self {
        Self {
            required: "can't be blank".to_string(),
            format: "contains invalid characters".to_string(),
            email: "is not a valid email address".to_string(),
            min_length: "must be at least {count} characters long".to_string(),
            max_length: "must be at most {count} characters long".to_string(),
            confirmation: "passwords do not match".to_string(),
            unique: "has already been taken".to_string(),
        }
    }
}

/// Stateless checker for [`RegistrationRequest`]s
#[derive(Debug, Clone, Default)]
pub struct RegistrationValidator {
    policy: PasswordPolicy,
    messages: ValidationMessages,
}

impl RegistrationValidator {
    pub fn new(policy: PasswordPolicy, messages: ValidationMessages) -> Self {
        Self { policy, messages }
    }

    pub fn messages(&self) -> &ValidationMessages {
        &self.messages
    }

    /// Check every field of `request`; an empty set means it is acceptable.
    pub fn validate(&self, request: &RegistrationRequest) -> FieldErrorSet {
        let mut errors = FieldErrorSet::new();

        self.check_email(&request.email, &mut errors);
        self.check_display_name(&request.display_name, &mut errors);
        self.check_password(&request.password, &mut errors);
        self.check_confirmation(request, &mut errors);

        errors
    }

    fn check_email(&self, email: &str, errors: &mut FieldErrorSet) {
        if email.trim().is_empty() {
            errors.add(Field::Email, Rule::Required, &self.messages.required);
        } else if has_control_chars(email) {
            errors.add(Field::Email, Rule::Format, &self.messages.format);
        } else if !email.validate_email() {
            errors.add(Field::Email, Rule::Email, &self.messages.email);
        }
    }

    fn check_display_name(&self, display_name: &str, errors: &mut FieldErrorSet) {
        if display_name.trim().is_empty() {
            errors.add(Field::DisplayName, Rule::Required, &self.messages.required);
        } else if has_control_chars(display_name) {
            errors.add(Field::DisplayName, Rule::Format, &self.messages.format);
        }
    }

    fn check_password(&self, password: &str, errors: &mut FieldErrorSet) {
        let min = self.policy.min_length as u64;
        let max = self.policy.max_length as u64;

        if password.is_empty() {
            errors.add(Field::Password, Rule::Required, &self.messages.required);
        } else if !password.validate_length(Some(min), None, None) {
            errors.add(
                Field::Password,
                Rule::MinLength,
                self.messages.too_short(self.policy.min_length),
            );
        } else if !password.validate_length(None, Some(max), None) {
            errors.add(
                Field::Password,
                Rule::MaxLength,
                self.messages.too_long(self.policy.max_length),
            );
        }
    }

    fn check_confirmation(&self, request: &RegistrationRequest, errors: &mut FieldErrorSet) {
        if request.password_confirmation.is_empty() {
            errors.add(
                Field::PasswordConfirmation,
                Rule::Required,
                &self.messages.required,
            );
        } else if request.password_confirmation.as_bytes() != request.password.as_bytes() {
            errors.add(
                Field::PasswordConfirmation,
                Rule::Confirmation,
                &self.messages.confirmation,
            );
        }
    }
}

/// NUL cannot be stored in a Postgres `text` column; other control
/// characters have no place in a name or address either
fn has_control_chars(value: &str) -> bool {
    value.chars().any(char::is_control)
}
