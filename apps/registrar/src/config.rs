//! Configuration for the registrar

use core_config::{ConfigError, Environment, FromEnv};
use database::postgres::PostgresConfig;
use domain_users::RegistrationConfig;

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    pub database: PostgresConfig,
    pub registration: RegistrationConfig,
}

impl FromEnv for Config {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            environment: Environment::from_env(),
            database: PostgresConfig::from_env()?,
            registration: RegistrationConfig::from_env()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_url_required() {
        temp_env::with_var_unset("DATABASE_URL", || {
            let err = Config::from_env().unwrap_err();
            assert!(matches!(err, ConfigError::MissingEnvVar(ref key) if key == "DATABASE_URL"));
        });
    }

    #[test]
    fn test_loads_all_sections() {
        temp_env::with_vars(
            [
                ("APP_ENV", Some("production")),
                ("DATABASE_URL", Some("postgres://localhost/registrar")),
                ("PASSWORD_MIN_LENGTH", Some("10")),
                ("PASSWORD_MAX_LENGTH", None),
            ],
            || {
                let config = Config::from_env().unwrap();
                assert!(config.environment.is_production());
                assert_eq!(config.database.url(), "postgres://localhost/registrar");
                assert_eq!(config.registration.password.min_length(), 10);
                assert_eq!(config.registration.password.max_length(), 80);
            },
        );
    }
}
