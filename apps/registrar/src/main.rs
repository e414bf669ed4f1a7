//! Registrar
//!
//! Command-line front end for account registration. Applies the schema,
//! registers accounts and checks passwords against stored hashes.
//!
//! Exit codes: 0 on success, 2 when the request is rejected with field
//! errors, 1 on any failure.
//!
//! Passwords can be passed through `REGISTRAR_PASSWORD` and
//! `REGISTRAR_PASSWORD_CONFIRMATION` instead of argv.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use core_config::FromEnv;
use core_config::tracing::{init_tracing, install_color_eyre};
use domain_users::{
    AccountRepository, AccountResponse, FieldErrorSet, PgAccountRepository, RegistrationOutcome,
    RegistrationRequest, RegistrationService,
};
use eyre::{Result, WrapErr};
use migration::Migrator;
use serde::Serialize;
use tracing::info;

mod config;

use config::Config;

/// Exit code for requests rejected with field errors
const EXIT_REJECTED: u8 = 2;

#[derive(Parser)]
#[command(name = "registrar")]
#[command(about = "Register user accounts")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,

    /// Register a new account
    Register {
        #[arg(long, default_value_t = String::new())]
        email: String,

        #[arg(long, default_value_t = String::new())]
        display_name: String,

        #[arg(long, env = "REGISTRAR_PASSWORD", hide_env_values = true, default_value_t = String::new())]
        password: String,

        #[arg(
            long,
            env = "REGISTRAR_PASSWORD_CONFIRMATION",
            hide_env_values = true,
            default_value_t = String::new()
        )]
        password_confirmation: String,
    },

    /// Check a password against the stored account
    Verify {
        #[arg(long)]
        email: String,

        #[arg(long, env = "REGISTRAR_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

#[derive(Serialize)]
struct Rejection<'a> {
    errors: &'a FieldErrorSet,
}

#[derive(Serialize)]
struct Verification<'a> {
    email: &'a str,
    valid: bool,
}

/// Render an outcome as stdout JSON plus exit code; faults become errors
fn render(outcome: RegistrationOutcome) -> Result<(String, u8)> {
    match outcome {
        RegistrationOutcome::Created(account) => Ok((
            serde_json::to_string_pretty(&AccountResponse::from(account))?,
            0,
        )),
        RegistrationOutcome::Rejected(errors) => Ok((
            serde_json::to_string_pretty(&Rejection { errors: &errors })?,
            EXIT_REJECTED,
        )),
        RegistrationOutcome::Failed(fault) => {
            Err(eyre::Report::new(fault).wrap_err("Registration failed"))
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    install_color_eyre();

    let config = Config::from_env()?;
    init_tracing(&config.environment);

    let cli = Cli::parse();

    info!("Connecting to database...");
    let db = database::postgres::connect_from_config_with_retry(config.database.clone(), None)
        .await
        .wrap_err("Database connection failed")?;
    database::postgres::check_health(&db).await?;

    match cli.command {
        Commands::Migrate => {
            database::postgres::run_migrations::<Migrator>(&db, "registrar").await?;
            Ok(ExitCode::SUCCESS)
        }

        Commands::Register {
            email,
            display_name,
            password,
            password_confirmation,
        } => {
            let service =
                RegistrationService::new(PgAccountRepository::new(db), &config.registration)?;

            let request =
                RegistrationRequest::new(email, display_name, password, password_confirmation);
            let (output, code) = render(service.register(request).await)?;
            println!("{}", output);
            Ok(ExitCode::from(code))
        }

        Commands::Verify { email, password } => {
            let service =
                RegistrationService::new(PgAccountRepository::new(db), &config.registration)?;

            let account = service
                .repository()
                .find_by_email(&email)
                .await
                .wrap_err("Account lookup failed")?;

            let valid = match account {
                Some(account) => service
                    .verify_password(&password, &account.password_hash)
                    .await
                    .wrap_err("Password verification failed")?,
                None => false,
            };

            println!(
                "{}",
                serde_json::to_string_pretty(&Verification {
                    email: &email,
                    valid
                })?
            );
            Ok(if valid {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}
