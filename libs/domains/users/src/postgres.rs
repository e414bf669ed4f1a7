use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{DbBackend, DbErr, FromQueryResult, RuntimeErr, Statement};
use uuid::Uuid;

use crate::error::{ConflictError, RepositoryError, RepositoryResult};
use crate::models::{Account, Field, NewAccount};
use crate::repository::AccountRepository;

/// Unique index over `lower(email)` created by the users migration
pub const EMAIL_UNIQUE_CONSTRAINT: &str = "users_email_key";

/// SQLSTATE `unique_violation`
const UNIQUE_VIOLATION: &str = "23505";

/// PostgreSQL implementation of AccountRepository using SeaORM
#[derive(Clone)]
pub struct PgAccountRepository {
    db: sea_orm::DatabaseConnection,
}

impl PgAccountRepository {
    pub fn new(db: sea_orm::DatabaseConnection) -> Self {
        Self { db }
    }
}

#[derive(Debug, FromQueryResult)]
struct AccountRow {
    id: Uuid,
    email: String,
    display_name: String,
    password_hash: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        Account {
            id: row.id,
            email: row.email,
            display_name: row.display_name,
            password_hash: row.password_hash,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromQueryResult)]
struct CountRow {
    count: i64,
}

fn storage_error(e: DbErr) -> RepositoryError {
    RepositoryError::Storage(format!("Database error: {}", e))
}

/// Classify a driver error by SQLSTATE and constraint name. The message text
/// is never inspected; it follows the server's `lc_messages`.
fn email_conflict(code: Option<&str>, constraint: Option<&str>) -> Option<ConflictError> {
    match (code, constraint) {
        (Some(UNIQUE_VIOLATION), Some(EMAIL_UNIQUE_CONSTRAINT)) => Some(ConflictError {
            field: Field::Email,
            constraint: EMAIL_UNIQUE_CONSTRAINT.to_string(),
        }),
        _ => None,
    }
}

/// Only a violation of the email index is a conflict; any other constraint
/// failure is a storage error
fn map_insert_error(e: DbErr) -> RepositoryError {
    if let DbErr::Query(RuntimeErr::SqlxError(err)) | DbErr::Exec(RuntimeErr::SqlxError(err)) = &e
        && let sea_orm::sqlx::Error::Database(db) = &**err
    {
        let code = db.code();
        if let Some(conflict) = email_conflict(code.as_deref(), db.constraint()) {
            return conflict.into();
        }
        if code.as_deref() == Some(UNIQUE_VIOLATION) {
            tracing::warn!(constraint = ?db.constraint(), "Unexpected unique constraint violation");
        }
    }
    storage_error(e)
}

const ACCOUNT_COLUMNS: &str = "id, email, display_name, password_hash, created_at, updated_at";

#[async_trait]
impl AccountRepository for PgAccountRepository {
    async fn insert(&self, account: NewAccount) -> RepositoryResult<Account> {
        let sql = format!(
            "INSERT INTO users (email, display_name, password_hash) VALUES ($1, $2, $3) RETURNING {}",
            ACCOUNT_COLUMNS
        );

        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            sql,
            [
                account.email.into(),
                account.display_name.into(),
                account.password_hash.into(),
            ],
        );

        let account: Account = AccountRow::find_by_statement(stmt)
            .one(&self.db)
            .await
            .map_err(map_insert_error)?
            .ok_or_else(|| RepositoryError::Storage("Insert returned no row".to_string()))?
            .into();

        tracing::info!(account_id = %account.id, email = %account.email, "Created account");
        Ok(account)
    }

    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<Account>> {
        let sql = format!(
            "SELECT {} FROM users WHERE lower(email) = lower($1)",
            ACCOUNT_COLUMNS
        );

        let stmt = Statement::from_sql_and_values(DbBackend::Postgres, sql, [email.into()]);

        let row = AccountRow::find_by_statement(stmt)
            .one(&self.db)
            .await
            .map_err(storage_error)?;

        Ok(row.map(Account::from))
    }

    async fn count(&self) -> RepositoryResult<usize> {
        let stmt = Statement::from_string(DbBackend::Postgres, "SELECT COUNT(*) AS count FROM users");

        let row = CountRow::find_by_statement(stmt)
            .one(&self.db)
            .await
            .map_err(storage_error)?
            .ok_or_else(|| RepositoryError::Storage("Count returned no row".to_string()))?;

        usize::try_from(row.count)
            .map_err(|e| RepositoryError::Storage(format!("Invalid row count: {}", e)))
    }
}
