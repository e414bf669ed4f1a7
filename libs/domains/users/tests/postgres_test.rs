//! Integration tests for the Postgres account repository
//!
//! These tests use real PostgreSQL via testcontainers to ensure:
//! - The case-insensitive unique index is what detects duplicates
//! - Other constraint violations are not mistaken for duplicates
//! - Concurrent inserts of one email produce exactly one row

use domain_users::postgres::EMAIL_UNIQUE_CONSTRAINT;
use domain_users::*;
use futures::future::join_all;
use sea_orm::{ConnectionTrait, DbBackend, Statement};
use test_utils::{TestDataBuilder, TestDatabase, assertions::*};

fn new_account(email: String, display_name: String) -> NewAccount {
    NewAccount {
        email,
        display_name,
        password_hash: "$argon2id$v=19$m=8,t=1,p=1$c2FsdHNhbHQ$aGFzaGhhc2g".to_string(),
    }
}

// ============================================================================
// Repository Tests
// ============================================================================

#[tokio::test]
async fn test_insert_and_find_by_email() {
    let db = TestDatabase::new().await;
    let repo = PgAccountRepository::new(db.connection());
    let builder = TestDataBuilder::from_test_name("insert_and_find");

    let email = builder.email("main");
    let created = repo
        .insert(new_account(email.clone(), builder.display_name("main")))
        .await
        .unwrap();

    assert_eq!(created.email, email);
    assert_eq!(created.display_name, builder.display_name("main"));
    assert!(!created.id.is_nil());
    assert_eq!(created.created_at, created.updated_at);

    let found = repo.find_by_email(&email.to_uppercase()).await.unwrap();
    let found = assert_some(found, "account should be found case-insensitively");
    assert_eq!(found, created);

    assert_eq!(repo.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_email_is_stored_as_submitted() {
    let db = TestDatabase::new().await;
    let repo = PgAccountRepository::new(db.connection());

    let created = repo
        .insert(new_account("Mixed.Case@Example.com".to_string(), "Jane".to_string()))
        .await
        .unwrap();

    assert_eq!(created.email, "Mixed.Case@Example.com");
}

#[tokio::test]
async fn test_duplicate_email_any_case_is_conflict() {
    let db = TestDatabase::new().await;
    let repo = PgAccountRepository::new(db.connection());

    repo.insert(new_account("a@b.com".to_string(), "First".to_string()))
        .await
        .unwrap();

    for email in ["a@b.com", "A@B.com", "A@b.Com"] {
        let result = repo
            .insert(new_account(email.to_string(), "Second".to_string()))
            .await;

        match result {
            Err(RepositoryError::Conflict(conflict)) => {
                assert_eq!(conflict.field, Field::Email);
                assert_eq!(conflict.constraint, "users_email_key");
            }
            other => panic!("Expected conflict for {}, got {:?}", email, other),
        }
    }

    assert_eq!(repo.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_other_constraint_is_storage_error() {
    let db = TestDatabase::new().await;
    let repo = PgAccountRepository::new(db.connection());

    // Violates the display name CHECK constraint, not the email index
    let result = repo
        .insert(new_account("blank@example.com".to_string(), "   ".to_string()))
        .await;
    assert!(matches!(result, Err(RepositoryError::Storage(_))));

    // A second unique index on another column must not surface as an email conflict
    db.connection()
        .execute_raw(Statement::from_string(
            DbBackend::Postgres,
            "CREATE UNIQUE INDEX users_display_name_key ON users (display_name)",
        ))
        .await
        .unwrap();

    repo.insert(new_account("one@example.com".to_string(), "Same".to_string()))
        .await
        .unwrap();
    let result = repo
        .insert(new_account("two@example.com".to_string(), "Same".to_string()))
        .await;
    assert!(matches!(result, Err(RepositoryError::Storage(_))));

    assert_eq!(repo.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_nul_display_name_never_reaches_postgres() {
    let db = TestDatabase::new().await;
    let config = RegistrationConfig {
        hash: HashParams {
            time_cost: 1,
            memory_cost: 8,
            parallelism: 1,
        },
        ..Default::default()
    };
    let service =
        RegistrationService::new(PgAccountRepository::new(db.connection()), &config).unwrap();

    let request =
        RegistrationRequest::new("nul@example.com", "Ja\0ne", "foobar123123", "foobar123123");
    let outcome = service.register(request).await;

    let errors = outcome.errors().expect("request should be rejected, not fail");
    assert_eq!(errors.get(Field::DisplayName)[0].rule, Rule::Format);
    assert_eq!(service.repository().count().await.unwrap(), 0);
}

#[test]
fn test_constraint_name_matches_migration() {
    assert_eq!(EMAIL_UNIQUE_CONSTRAINT, migration::USERS_EMAIL_KEY);
}

// ============================================================================
// Concurrency Tests
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_inserts_single_row() {
    let db = TestDatabase::new().await;
    let repo = PgAccountRepository::new(db.connection());
    let builder = TestDataBuilder::from_test_name("concurrent_inserts");
    let email = builder.email("race");

    let futures = (0..10).map(|i| {
        let repo = repo.clone();
        let email = if i % 2 == 0 { email.clone() } else { email.to_uppercase() };
        let display_name = builder.display_name(&i.to_string());
        async move { repo.insert(new_account(email, display_name)).await }
    });

    let results = join_all(futures).await;

    let created = results.iter().filter(|r| r.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Err(RepositoryError::Conflict(_))))
        .count();

    assert_eq!(created, 1);
    assert_eq!(conflicts, 9);
    assert_eq!(repo.count().await.unwrap(), 1);
}

// ============================================================================
// Service Tests
// ============================================================================

#[tokio::test]
async fn test_service_registers_against_postgres() {
    let db = TestDatabase::new().await;
    let config = RegistrationConfig {
        hash: HashParams {
            time_cost: 1,
            memory_cost: 8,
            parallelism: 1,
        },
        ..Default::default()
    };
    let service =
        RegistrationService::new(PgAccountRepository::new(db.connection()), &config).unwrap();

    let request =
        RegistrationRequest::new("user@example.com", "Jane", "foobar123123", "foobar123123");
    let account = match service.register(request).await {
        RegistrationOutcome::Created(account) => account,
        other => panic!("Expected Created, got {:?}", other),
    };
    assert!(service
        .verify_password("foobar123123", &account.password_hash)
        .await
        .unwrap());

    let duplicate =
        RegistrationRequest::new("USER@example.com", "Jane", "foobar123123", "foobar123123");
    let outcome = service.register(duplicate).await;
    let errors = outcome.errors().expect("duplicate should be rejected");
    assert_eq!(errors.get(Field::Email)[0].rule, Rule::Unique);
    assert_eq!(errors.get(Field::Email)[0].message, "has already been taken");
}
