use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{ConflictError, RepositoryError, RepositoryResult};
use crate::models::{Account, Field, NewAccount};

/// Constraint name reported by [`InMemoryAccountRepository`] on duplicates
pub const IN_MEMORY_EMAIL_CONSTRAINT: &str = "accounts_email_unique";

/// Repository trait for Account persistence
///
/// Implementations own the email uniqueness invariant: `insert` must check and
/// write atomically, and report duplicates as [`RepositoryError::Conflict`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Persist a new account; storage assigns id and timestamps
    async fn insert(&self, account: NewAccount) -> RepositoryResult<Account>;

    /// Look up an account by email, ignoring letter case
    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<Account>>;

    /// Number of stored accounts
    async fn count(&self) -> RepositoryResult<usize>;
}

/// In-memory implementation of AccountRepository (for development/testing)
#[derive(Debug, Default, Clone)]
pub struct InMemoryAccountRepository {
    accounts: Arc<RwLock<HashMap<Uuid, Account>>>,
}

impl InMemoryAccountRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn same_email(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

#[async_trait]
impl AccountRepository for InMemoryAccountRepository {
    async fn insert(&self, account: NewAccount) -> RepositoryResult<Account> {
        // Same guarantees as the CHECK constraints on the users table
        if account.email.is_empty()
            || account.display_name.trim().is_empty()
            || account.password_hash.is_empty()
        {
            return Err(RepositoryError::Storage(
                "check constraint violated: account fields must not be empty".to_string(),
            ));
        }

        // Postgres `text` rejects NUL with SQLSTATE 22021
        if [&account.email, &account.display_name, &account.password_hash]
            .iter()
            .any(|value| value.contains('\0'))
        {
            return Err(RepositoryError::Storage(
                "invalid byte sequence: account fields must not contain NUL".to_string(),
            ));
        }

        // Check and insert under one write guard
        let mut accounts = self.accounts.write().await;

        if accounts
            .values()
            .any(|existing| same_email(&existing.email, &account.email))
        {
            tracing::info!(email = %account.email, "Rejected duplicate email");
            return Err(ConflictError {
                field: Field::Email,
                constraint: IN_MEMORY_EMAIL_CONSTRAINT.to_string(),
            }
            .into());
        }

        let now = Utc::now();
        let created = Account {
            id: Uuid::now_v7(),
            email: account.email,
            display_name: account.display_name,
            password_hash: account.password_hash,
            created_at: now,
            updated_at: now,
        };
        accounts.insert(created.id, created.clone());

        tracing::info!(account_id = %created.id, email = %created.email, "Created account");
        Ok(created)
    }

    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<Account>> {
        let accounts = self.accounts.read().await;
        Ok(accounts
            .values()
            .find(|account| same_email(&account.email, email))
            .cloned())
    }

    async fn count(&self) -> RepositoryResult<usize> {
        Ok(self.accounts.read().await.len())
    }
}
