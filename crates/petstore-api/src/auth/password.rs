/// Password hashing and verification using Argon2id
///
/// Hashes are stored as PHC strings, so the algorithm, cost parameters
/// and salt travel with the hash:
/// - Algorithm: Argon2id
/// - Memory: 64 MB
/// - Iterations: 3
/// - Parallelism: 4 threads
/// - Salt: 16 bytes random
///
/// Hashing is CPU bound; async callers run these functions on the blocking pool.
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, Params,
};
use thiserror::Error;

/// Shortest accepted password, in characters
pub const MIN_PASSWORD_LEN: usize = 6;

/// Longest accepted password, in characters
pub const MAX_PASSWORD_LEN: usize = 50;

/// Message returned when the composition rule is not met
pub const PASSWORD_POLICY_MESSAGE: &str =
    "The password must have an Uppercase, lowercase letter, and a number";

/// Password hashing and verification errors
#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("Failed to hash password: {0}")]
    HashingFailed(String),

    #[error("Failed to verify password: {0}")]
    VerificationFailed(String),

    #[error("Invalid password hash format")]
    InvalidHashFormat,
}

/// Password hashing configuration
#[derive(Debug, Clone)]
pub struct PasswordConfig {
    /// Memory cost in KB (default: 65536 = 64 MB)
    pub memory_cost: u32,
    /// Time cost (iterations, default: 3)
    pub time_cost: u32,
    /// Parallelism (threads, default: 4)
    pub parallelism: u32,
    /// Output length in bytes (default: 32)
    pub output_len: Option<usize>,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            memory_cost: 65536,
            time_cost: 3,
            parallelism: 4,
            output_len: Some(32),
        }
    }
}

impl PasswordConfig {
    /// Minimal cost parameters for test suites
    pub fn fast() -> Self {
        Self {
            memory_cost: 4096,
            time_cost: 1,
            parallelism: 1,
            output_len: Some(32),
        }
    }

    fn to_params(&self) -> Result<Params, PasswordError> {
        Params::new(
            self.memory_cost,
            self.time_cost,
            self.parallelism,
            self.output_len,
        )
        .map_err(|e| PasswordError::HashingFailed(e.to_string()))
    }
}

/// Hash a plaintext password using Argon2id with default parameters
///
/// # Example
///
/// ```no_run
/// use petstore_api::auth::password::hash_password;
///
/// let hash = hash_password("ClientPassword123").expect("Failed to hash password");
/// assert!(hash.starts_with("$argon2id$"));
/// ```
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    hash_password_with_config(password, &PasswordConfig::default())
}

/// Hash a password with custom configuration
pub fn hash_password_with_config(
    password: &str,
    config: &PasswordConfig,
) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    let params = config.to_params()?;
    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::HashingFailed(e.to_string()))?;

    Ok(password_hash.to_string())
}

/// Verify a plaintext password against a stored hash
///
/// Returns `Ok(false)` on mismatch. A hash that cannot be parsed is an error,
/// not a mismatch.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| PasswordError::InvalidHashFormat)?;

    // Parameters come from the PHC string, not from the default instance
    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerificationFailed(e.to_string())),
    }
}

/// Check the registration password policy
///
/// - 6 to 50 characters
/// - At least 1 uppercase letter
/// - At least 1 lowercase letter
/// - At least 1 digit
///
/// Symbols are allowed but not required.
pub fn validate_password_policy(password: &str) -> Result<(), String> {
    let len = password.chars().count();
    if len < MIN_PASSWORD_LEN {
        return Err(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters long"
        ));
    }
    if len > MAX_PASSWORD_LEN {
        return Err(format!(
            "Password must be at most {MAX_PASSWORD_LEN} characters long"
        ));
    }

    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());

    if !(has_upper && has_lower && has_digit) {
        return Err(PASSWORD_POLICY_MESSAGE.to_string());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify_password() {
        let password = "ClientPassword123";
        let hash = hash_password_with_config(password, &PasswordConfig::fast())
            .expect("Failed to hash password");

        assert!(verify_password(password, &hash).expect("Verification failed"));
        assert!(!verify_password("WrongPassword1", &hash).expect("Verification failed"));
    }

    #[test]
    fn test_same_password_produces_different_hashes() {
        let config = PasswordConfig::fast();
        let hash1 = hash_password_with_config("SamePassword123", &config).unwrap();
        let hash2 = hash_password_with_config("SamePassword123", &config).unwrap();

        assert_ne!(hash1, hash2);
        assert!(verify_password("SamePassword123", &hash1).unwrap());
        assert!(verify_password("SamePassword123", &hash2).unwrap());
    }

    #[test]
    fn test_hash_never_contains_plaintext() {
        let hash = hash_password_with_config("Plaintext99", &PasswordConfig::fast()).unwrap();
        assert!(!hash.contains("Plaintext99"));
        assert!(hash.starts_with("$argon2id$"));
    }

    #[test]
    fn test_invalid_hash_format() {
        let result = verify_password("password", "invalid-hash-format");
        assert!(matches!(result, Err(PasswordError::InvalidHashFormat)));
    }

    #[test]
    fn test_custom_config_is_encoded_in_hash() {
        let config = PasswordConfig {
            memory_cost: 8192,
            time_cost: 2,
            parallelism: 2,
            output_len: Some(32),
        };

        let hash = hash_password_with_config("TestPassword123", &config).unwrap();
        assert!(verify_password("TestPassword123", &hash).unwrap());
        assert!(hash.contains("m=8192"));
        assert!(hash.contains("t=2"));
        assert!(hash.contains("p=2"));
    }

    #[test]
    fn test_password_policy() {
        assert!(validate_password_policy("Abc123").is_ok());
        assert!(validate_password_policy("ClientPassword123").is_ok());
        assert!(validate_password_policy("Symbols!Ok9").is_ok());

        // Too short
        assert!(validate_password_policy("Ab1").is_err());
        // Too long
        let long = format!("Aa1{}", "x".repeat(48));
        assert!(validate_password_policy(&long).is_err());

        assert_eq!(
            validate_password_policy("password123").unwrap_err(),
            PASSWORD_POLICY_MESSAGE
        );
        assert_eq!(
            validate_password_policy("PASSWORD123").unwrap_err(),
            PASSWORD_POLICY_MESSAGE
        );
        assert_eq!(
            validate_password_policy("Password").unwrap_err(),
            PASSWORD_POLICY_MESSAGE
        );
    }
}
