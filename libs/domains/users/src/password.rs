//! Argon2id password hashing.
//!
//! Hashes are PHC strings (`$argon2id$v=19$m=..,t=..,p=..$salt$hash`) that
//! record their own parameters. Verification always uses the parameters stored
//! in the hash, so accounts hashed under older settings keep verifying after
//! the configured costs change.

use argon2::{
    Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version,
    password_hash::{
        SaltString,
        rand_core::{OsRng, RngCore},
    },
};

use crate::error::HashError;

/// Iterations
pub const HASH_TIME_COST: u32 = 2;
/// Memory in KiB (19 MiB)
pub const HASH_MEMORY_COST: u32 = 19 * 1024;
pub const HASH_PARALLELISM: u32 = 1;
/// Salt length in bytes
pub const HASH_SALT_LEN: usize = 16;
/// Digest length in bytes
pub const HASH_OUTPUT_LEN: usize = 32;

/// Tunable Argon2id costs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashParams {
    pub time_cost: u32,
    pub memory_cost: u32,
    pub parallelism: u32,
}

impl Default for HashParams {
    fn default() -> Self {
        Self {
            time_cost: HASH_TIME_COST,
            memory_cost: HASH_MEMORY_COST,
            parallelism: HASH_PARALLELISM,
        }
    }
}

/// One-way, salted password hashing
///
/// Both operations are CPU and memory heavy; async callers should run them
/// on a blocking thread.
#[cfg_attr(test, mockall::automock)]
pub trait CredentialHasher: Send + Sync {
    /// Produce a self-describing hash of `password`
    fn hash(&self, password: &str) -> Result<String, HashError>;

    /// Check `password` against a stored hash. Malformed hashes never verify.
    fn verify(&self, password: &str, hash: &str) -> bool;
}

/// [`CredentialHasher`] backed by Argon2id v0x13
#[derive(Clone)]
pub struct Argon2Hasher {
    argon2: Argon2<'static>,
}

impl Argon2Hasher {
    pub fn new(params: HashParams) -> Result<Self, HashError> {
        let params = Params::new(
            params.memory_cost,
            params.time_cost,
            params.parallelism,
            Some(HASH_OUTPUT_LEN),
        )
        .map_err(|e| HashError(format!("invalid Argon2 parameters: {}", e)))?;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// Parameters new hashes are produced with
    pub fn params(&self) -> HashParams {
        let params = self.argon2.params();
        HashParams {
            time_cost: params.t_cost(),
            memory_cost: params.m_cost(),
            parallelism: params.p_cost(),
        }
    }
}

impl std::fmt::Debug for Argon2Hasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Argon2Hasher")
            .field("params", &self.params())
            .finish()
    }
}

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, password: &str) -> Result<String, HashError> {
        let mut salt = [0u8; HASH_SALT_LEN];
        OsRng
            .try_fill_bytes(&mut salt)
            .map_err(|e| HashError(format!("salt generation failed: {}", e)))?;
        let salt = SaltString::encode_b64(&salt).map_err(|e| HashError(e.to_string()))?;

        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| HashError(e.to_string()))
    }

    fn verify(&self, password: &str, hash: &str) -> bool {
        let parsed = match PasswordHash::new(hash) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(error = %e, "Stored password hash is malformed");
                return false;
            }
        };

        self.argon2
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }
}
