//! Password Service
//!
//! Salted Argon2id hashing. Verification goes through the algorithm's own
//! verifier, never a comparison of raw hash strings.

use argon2::{
    password_hash::{
        rand_core::OsRng,
        PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
    },
    Argon2, Algorithm, Params, Version,
};
use tracing::{debug, warn};

use crate::shared::error::{PlatformError, Result};

/// Password length policy applied at signup and seeding
#[derive(Debug, Clone)]
pub struct PasswordPolicy {
    pub min_length: usize,
    pub max_length: usize,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 8,
            max_length: 128,
        }
    }
}

impl PasswordPolicy {
    pub fn with_min_length(min_length: usize) -> Self {
        Self {
            min_length,
            ..Self::default()
        }
    }

    pub fn validate(&self, password: &str) -> std::result::Result<(), String> {
        let length = password.chars().count();
        if length < self.min_length {
            return Err(format!("Password must be at least {} characters", self.min_length));
        }
        if length > self.max_length {
            return Err(format!("Password must be at most {} characters", self.max_length));
        }
        Ok(())
    }
}

/// Argon2id cost parameters
#[derive(Debug, Clone)]
pub struct Argon2Config {
    /// Memory cost in KiB
    pub memory_cost: u32,
    pub time_cost: u32,
    pub parallelism: u32,
    pub output_len: usize,
}

impl Default for Argon2Config {
    fn default() -> Self {
        Self {
            memory_cost: 19456, // 19 MiB
            time_cost: 2,
            parallelism: 1,
            output_len: 32,
        }
    }
}

impl Argon2Config {
    /// Low memory config for tests
    pub fn testing() -> Self {
        Self {
            memory_cost: 4096,
            time_cost: 1,
            parallelism: 1,
            output_len: 32,
        }
    }

    fn to_params(&self) -> Result<Params> {
        Params::new(
            self.memory_cost,
            self.time_cost,
            self.parallelism,
            Some(self.output_len),
        )
        .map_err(|e| PlatformError::internal(format!("Invalid Argon2 params: {}", e)))
    }
}

pub struct PasswordService {
    argon2: Argon2<'static>,
    policy: PasswordPolicy,
    /// Hash with the configured cost, verified when no account matches a login
    decoy_hash: String,
}

impl PasswordService {
    pub fn new(config: Argon2Config, policy: PasswordPolicy) -> Result<Self> {
        let params = config.to_params()?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let salt = SaltString::generate(&mut OsRng);
        let decoy_hash = argon2
            .hash_password(b"no-such-account", &salt)
            .map_err(|e| PlatformError::internal(format!("Failed to hash password: {}", e)))?
            .to_string();

        Ok(Self { argon2, policy, decoy_hash })
    }

    /// Hash a password after checking it against the policy.
    pub fn hash_password(&self, password: &str) -> Result<String> {
        self.validate_password(password)?;

        let salt = SaltString::generate(&mut OsRng);

        let hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| PlatformError::internal(format!("Failed to hash password: {}", e)))?;

        debug!("Password hashed");
        Ok(hash.to_string())
    }

    /// `Ok(false)` for a wrong password, `Err` for a malformed stored hash.
    pub fn verify_password(&self, password: &str, hash: &str) -> Result<bool> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| PlatformError::internal(format!("Invalid password hash format: {}", e)))?;

        match self.argon2.verify_password(password.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => {
                warn!("Password verification failed");
                Ok(false)
            }
            Err(e) => Err(PlatformError::internal(format!("Password verification error: {}", e))),
        }
    }

    /// One full verification against the decoy hash, result discarded.
    /// Login calls this when the email matches no account.
    pub fn verify_decoy(&self, password: &str) {
        if let Ok(parsed_hash) = PasswordHash::new(&self.decoy_hash) {
            let _ = self.argon2.verify_password(password.as_bytes(), &parsed_hash);
        }
    }

    pub fn validate_password(&self, password: &str) -> Result<()> {
        self.policy
            .validate(password)
            .map_err(PlatformError::invalid_argument)
    }

    pub fn policy(&self) -> &PasswordPolicy {
        &self.policy
    }
}
