use std::sync::Arc;
use tracing::instrument;

use crate::config::RegistrationConfig;
use crate::error::{HashError, RegistrationFault, RepositoryError};
use crate::models::{Account, NewAccount, RegistrationRequest};
use crate::password::{Argon2Hasher, CredentialHasher};
use crate::repository::AccountRepository;
use crate::validation::{FieldErrorSet, RegistrationValidator, Rule, ValidationMessages};

/// Result of one registration attempt
#[derive(Debug)]
pub enum RegistrationOutcome {
    /// The account was stored
    Created(Account),
    /// Caller-correctable problems, keyed by field
    Rejected(FieldErrorSet),
    /// Infrastructure failure; nothing the caller can fix
    Failed(RegistrationFault),
}

impl RegistrationOutcome {
    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }

    pub fn account(&self) -> Option<&Account> {
        match self {
            Self::Created(account) => Some(account),
            _ => None,
        }
    }

    pub fn errors(&self) -> Option<&FieldErrorSet> {
        match self {
            Self::Rejected(errors) => Some(errors),
            _ => None,
        }
    }

    pub fn fault(&self) -> Option<&RegistrationFault> {
        match self {
            Self::Failed(fault) => Some(fault),
            _ => None,
        }
    }
}

/// Service layer for account registration
pub struct RegistrationService<R: AccountRepository, H: CredentialHasher = Argon2Hasher> {
    repository: Arc<R>,
    hasher: Arc<H>,
    validator: RegistrationValidator,
}

impl<R: AccountRepository> RegistrationService<R> {
    /// Build a service with an Argon2id hasher and default messages.
    /// Fails if the configured hash costs are rejected by Argon2.
    pub fn new(repository: R, config: &RegistrationConfig) -> Result<Self, HashError> {
        Ok(Self::with_parts(
            repository,
            Argon2Hasher::new(config.hash)?,
            RegistrationValidator::new(config.password, ValidationMessages::default()),
        ))
    }
}

impl<R: AccountRepository, H: CredentialHasher + 'static> RegistrationService<R, H> {
    pub fn with_parts(repository: R, hasher: H, validator: RegistrationValidator) -> Self {
        Self {
            repository: Arc::new(repository),
            hasher: Arc::new(hasher),
            validator,
        }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Validate, hash and store a new account
    #[instrument(skip_all, fields(email = %request.email))]
    pub async fn register(&self, request: RegistrationRequest) -> RegistrationOutcome {
        let errors = self.validator.validate(&request);
        if !errors.is_empty() {
            tracing::info!(%errors, "Registration rejected");
            return RegistrationOutcome::Rejected(errors);
        }

        let RegistrationRequest {
            email,
            display_name,
            password,
            ..
        } = request;

        let hasher = Arc::clone(&self.hasher);
        let password_hash = match tokio::task::spawn_blocking(move || hasher.hash(&password)).await
        {
            Ok(Ok(hash)) => hash,
            Ok(Err(e)) => return self.fail(e.into()),
            Err(e) => return self.fail(RegistrationFault::Task(e.to_string())),
        };

        let new_account = NewAccount {
            email,
            display_name,
            password_hash,
        };

        match self.repository.insert(new_account).await {
            Ok(account) => RegistrationOutcome::Created(account),
            Err(RepositoryError::Conflict(conflict)) => {
                tracing::info!(constraint = %conflict.constraint, "Registration rejected: duplicate");
                RegistrationOutcome::Rejected(FieldErrorSet::single(
                    conflict.field,
                    Rule::Unique,
                    self.validator.messages().unique.clone(),
                ))
            }
            Err(RepositoryError::Storage(e)) => self.fail(RegistrationFault::Storage(e)),
        }
    }

    /// Check a password against a stored hash on the blocking pool
    pub async fn verify_password(
        &self,
        password: &str,
        password_hash: &str,
    ) -> Result<bool, RegistrationFault> {
        let hasher = Arc::clone(&self.hasher);
        let password = password.to_string();
        let password_hash = password_hash.to_string();

        tokio::task::spawn_blocking(move || hasher.verify(&password, &password_hash))
            .await
            .map_err(|e| RegistrationFault::Task(e.to_string()))
    }

    fn fail(&self, fault: RegistrationFault) -> RegistrationOutcome {
        tracing::error!(error = %fault, "Registration failed");
        RegistrationOutcome::Failed(fault)
    }
}

impl<R: AccountRepository, H: CredentialHasher> Clone for RegistrationService<R, H> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            hasher: Arc::clone(&self.hasher),
            validator: self.validator.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConflictError;
    use crate::models::Field;
    use crate::password::MockCredentialHasher;
    use crate::repository::MockAccountRepository;
    use chrono::Utc;
    use mockall::predicate::eq;
    use uuid::Uuid;

    fn valid_request() -> RegistrationRequest {
        RegistrationRequest::new(
            "user@example.com",
            "Jane",
            "foobar123123",
            "foobar123123",
        )
    }

    fn stored(account: NewAccount) -> Account {
        let now = Utc::now();
        Account {
            id: Uuid::now_v7(),
            email: account.email,
            display_name: account.display_name,
            password_hash: account.password_hash,
            created_at: now,
            updated_at: now,
        }
    }

    fn service(
        repo: MockAccountRepository,
        hasher: MockCredentialHasher,
    ) -> RegistrationService<MockAccountRepository, MockCredentialHasher> {
        RegistrationService::with_parts(repo, hasher, RegistrationValidator::default())
    }

    #[tokio::test]
    async fn test_valid_request_is_created() {
        let mut hasher = MockCredentialHasher::new();
        hasher
            .expect_hash()
            .with(eq("foobar123123"))
            .times(1)
            .returning(|_| Ok("$argon2id$hashed".to_string()));

        let mut repo = MockAccountRepository::new();
        repo.expect_insert()
            .withf(|account| {
                account.email == "user@example.com"
                    && account.display_name == "Jane"
                    && account.password_hash == "$argon2id$hashed"
            })
            .times(1)
            .returning(|account| Ok(stored(account)));

        let outcome = service(repo, hasher).register(valid_request()).await;

        let account = outcome.account().expect("account should be created");
        assert_eq!(account.email, "user@example.com");
        assert_eq!(account.display_name, "Jane");
        assert_ne!(account.password_hash, "foobar123123");
    }

    #[tokio::test]
    async fn test_invalid_request_touches_nothing() {
        let mut hasher = MockCredentialHasher::new();
        hasher.expect_hash().times(0);
        let mut repo = MockAccountRepository::new();
        repo.expect_insert().times(0);

        let request = RegistrationRequest::new("invalid", "Jane", "short", "nomatch");
        let outcome = service(repo, hasher).register(request).await;

        let errors = outcome.errors().expect("request should be rejected");
        assert!(errors.contains(Field::Email));
        assert!(errors.contains(Field::Password));
        assert!(errors.contains(Field::PasswordConfirmation));
        assert!(!errors.contains(Field::DisplayName));
    }

    #[tokio::test]
    async fn test_control_characters_rejected_before_storage() {
        let mut hasher = MockCredentialHasher::new();
        hasher.expect_hash().times(0);
        let mut repo = MockAccountRepository::new();
        repo.expect_insert().times(0);

        let request =
            RegistrationRequest::new("nul@example.com", "Ja\0ne", "foobar123123", "foobar123123");
        let outcome = service(repo, hasher).register(request).await;

        let errors = outcome.errors().expect("request should be rejected");
        assert_eq!(errors.fields().collect::<Vec<_>>(), vec![Field::DisplayName]);
        assert_eq!(errors.get(Field::DisplayName)[0].rule, Rule::Format);
    }

    #[tokio::test]
    async fn test_conflict_becomes_unique_entry() {
        let mut hasher = MockCredentialHasher::new();
        hasher
            .expect_hash()
            .returning(|_| Ok("$argon2id$hashed".to_string()));

        let mut repo = MockAccountRepository::new();
        repo.expect_insert().times(1).returning(|_| {
            Err(ConflictError {
                field: Field::Email,
                constraint: "users_email_key".to_string(),
            }
            .into())
        });

        let outcome = service(repo, hasher).register(valid_request()).await;

        let errors = outcome.errors().expect("duplicate should be rejected");
        assert_eq!(errors.fields().collect::<Vec<_>>(), vec![Field::Email]);
        let entries = errors.get(Field::Email);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].rule, Rule::Unique);
        assert_eq!(entries[0].message, "has already been taken");
    }

    #[tokio::test]
    async fn test_conflict_uses_configured_message() {
        let mut hasher = MockCredentialHasher::new();
        hasher
            .expect_hash()
            .returning(|_| Ok("$argon2id$hashed".to_string()));

        let mut repo = MockAccountRepository::new();
        repo.expect_insert().returning(|_| {
            Err(ConflictError {
                field: Field::Email,
                constraint: "users_email_key".to_string(),
            }
            .into())
        });

        let messages = ValidationMessages {
            unique: "is already registered".to_string(),
            ..Default::default()
        };
        let validator = RegistrationValidator::new(Default::default(), messages);
        let service = RegistrationService::with_parts(repo, hasher, validator);

        let outcome = service.register(valid_request()).await;
        let errors = outcome.errors().expect("duplicate should be rejected");
        assert_eq!(errors.get(Field::Email)[0].message, "is already registered");
    }

    #[tokio::test]
    async fn test_storage_error_is_fault() {
        let mut hasher = MockCredentialHasher::new();
        hasher
            .expect_hash()
            .returning(|_| Ok("$argon2id$hashed".to_string()));

        let mut repo = MockAccountRepository::new();
        repo.expect_insert()
            .returning(|_| Err(RepositoryError::Storage("connection refused".to_string())));

        let outcome = service(repo, hasher).register(valid_request()).await;

        match outcome {
            RegistrationOutcome::Failed(RegistrationFault::Storage(message)) => {
                assert_eq!(message, "connection refused")
            }
            other => panic!("Expected storage fault, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_hash_error_is_fault() {
        let mut hasher = MockCredentialHasher::new();
        hasher
            .expect_hash()
            .returning(|_| Err(HashError("out of memory".to_string())));

        let mut repo = MockAccountRepository::new();
        repo.expect_insert().times(0);

        let outcome = service(repo, hasher).register(valid_request()).await;

        assert!(matches!(
            outcome.fault(),
            Some(RegistrationFault::PasswordHash(HashError(_)))
        ));
    }

    #[tokio::test]
    async fn test_verify_password_delegates_to_hasher() {
        let mut hasher = MockCredentialHasher::new();
        hasher
            .expect_verify()
            .times(2)
            .returning(|password, hash| password == "foobar123123" && hash == "$argon2id$hashed");

        let service = service(MockAccountRepository::new(), hasher);

        assert!(service
            .verify_password("foobar123123", "$argon2id$hashed")
            .await
            .unwrap());
        assert!(!service
            .verify_password("wrong", "$argon2id$hashed")
            .await
            .unwrap());
    }
}
