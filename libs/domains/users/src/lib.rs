//! Users Domain
//!
//! Account registration: validate a submitted request, hash the password and
//! store the account under a case-insensitive unique email.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │   Service   │  ← register / verify_password, outcome mapping
//! └──────┬──────┘
//!        ├──────────────► Validator  (field rules, messages)
//!        ├──────────────► Hasher     (Argon2id on the blocking pool)
//! ┌──────▼──────┐
//! │ Repository  │  ← Data access (trait + in-memory / Postgres)
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │   Models    │  ← Requests, accounts, field names
//! └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use domain_users::{
//!     InMemoryAccountRepository, RegistrationConfig, RegistrationOutcome,
//!     RegistrationRequest, RegistrationService,
//! };
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let service = RegistrationService::new(
//!     InMemoryAccountRepository::new(),
//!     &RegistrationConfig::default(),
//! )?;
//!
//! let request = RegistrationRequest::new("user@example.com", "Jane", "foobar123123", "foobar123123");
//! match service.register(request).await {
//!     RegistrationOutcome::Created(account) => println!("created {}", account.id),
//!     RegistrationOutcome::Rejected(errors) => println!("rejected: {}", errors),
//!     RegistrationOutcome::Failed(fault) => eprintln!("failed: {}", fault),
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod models;
pub mod password;
pub mod postgres;
pub mod repository;
pub mod service;
pub mod validation;

// Re-export commonly used types
pub use config::RegistrationConfig;
pub use error::{ConflictError, HashError, RegistrationFault, RepositoryError, RepositoryResult};
pub use models::{Account, AccountResponse, Field, NewAccount, RegistrationRequest};
pub use password::{Argon2Hasher, CredentialHasher, HashParams};
pub use postgres::PgAccountRepository;
pub use repository::{AccountRepository, InMemoryAccountRepository};
pub use service::{RegistrationOutcome, RegistrationService};
pub use validation::{
    FieldError, FieldErrorSet, PasswordPolicy, RegistrationValidator, Rule, ValidationMessages,
};
