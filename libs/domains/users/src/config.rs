use core_config::{ConfigError, FromEnv, env_parse};

use crate::password::HashParams;
use crate::validation::{DEFAULT_MAX_PASSWORD_LENGTH, DEFAULT_MIN_PASSWORD_LENGTH, PasswordPolicy};

/// Registration settings: password length bounds and hashing costs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistrationConfig {
    pub password: PasswordPolicy,
    pub hash: HashParams,
}

impl FromEnv for RegistrationConfig {
    /// Reads:
    /// - PASSWORD_MIN_LENGTH (default 8)
    /// - PASSWORD_MAX_LENGTH (default 80)
    /// - HASH_TIME_COST, HASH_MEMORY_COST (KiB), HASH_PARALLELISM
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = HashParams::default();

        let password = PasswordPolicy::new(
            env_parse("PASSWORD_MIN_LENGTH", DEFAULT_MIN_PASSWORD_LENGTH)?,
            env_parse("PASSWORD_MAX_LENGTH", DEFAULT_MAX_PASSWORD_LENGTH)?,
        )?;

        let hash = HashParams {
            time_cost: env_parse("HASH_TIME_COST", defaults.time_cost)?,
            memory_cost: env_parse("HASH_MEMORY_COST", defaults.memory_cost)?,
            parallelism: env_parse("HASH_PARALLELISM", defaults.parallelism)?,
        };

        Ok(Self { password, hash })
    }
}
