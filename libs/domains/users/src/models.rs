use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Input fields of a registration form
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    Email,
    DisplayName,
    Password,
    PasswordConfirmation,
}

impl Field {
    /// Wire name of the field, as used by forms and serialized error sets
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Email => "email",
            Field::DisplayName => "displayName",
            Field::Password => "password",
            Field::PasswordConfirmation => "passwordConfirmation",
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Untrusted registration input, decoded by the presentation layer
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegistrationRequest {
    pub email: String,
    pub display_name: String,
    pub password: String,
    pub password_confirmation: String,
}

// Plaintext passwords must never end up in logs
impl std::fmt::Debug for RegistrationRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrationRequest")
            .field("email", &self.email)
            .field("display_name", &self.display_name)
            .field("password", &"[REDACTED]")
            .field("password_confirmation", &"[REDACTED]")
            .finish()
    }
}

impl RegistrationRequest {
    pub fn new(
        email: impl Into<String>,
        display_name: impl Into<String>,
        password: impl Into<String>,
        password_confirmation: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            display_name: display_name.into(),
            password: password.into(),
            password_confirmation: password_confirmation.into(),
        }
    }
}

/// Validated data handed to the repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub email: String,
    pub display_name: String,
    /// Argon2 PHC string
    pub password_hash: String,
}

/// Account entity - matches the `users` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Account {
    /// Assigned by storage
    pub id: Uuid,
    /// Unique under case-insensitive comparison
    pub email: String,
    pub display_name: String,
    /// Argon2 password hash (never exposed in responses)
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Account projection safe to hand to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            email: account.email,
            display_name: account.display_name,
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}
