//! Password hashing with Argon2id.
//!
//! Hashes are PHC strings (`$argon2id$v=19$m=...,t=...,p=...$salt$hash`), so
//! the salt and work factor travel with the hash and verification needs no
//! extra configuration.

use crate::error::AuthError;
use argon2::{
    password_hash::{
        rand_core::{OsRng, RngCore},
        PasswordHash, PasswordHasher, PasswordVerifier, Salt, SaltString,
    },
    Algorithm, Argon2, Params, Version,
};
use std::sync::Arc;
use zeroize::Zeroizing;

/// One-way password hashing and verification.
pub trait CredentialHasher: Send + Sync {
    /// Hash `plaintext` with a fresh random salt.
    fn hash_password(&self, plaintext: &str) -> Result<String, AuthError>;

    /// Check `plaintext` against a stored hash.
    ///
    /// Returns [`AuthError::AuthenticationFailed`] on mismatch.
    fn verify_password(&self, hash: &str, plaintext: &str) -> Result<(), AuthError>;
}

/// Argon2id hasher.
///
/// Defaults to m=19456 KiB, t=2, p=1 (OWASP recommendation).
#[derive(Debug, Clone)]
pub struct Argon2Hasher {
    params: Params,
}

impl Argon2Hasher {
    pub fn new(memory_kib: u32, iterations: u32, parallelism: u32) -> Result<Self, AuthError> {
        let params = Params::new(memory_kib, iterations, parallelism, None)
            .map_err(|e| AuthError::HashingFailed(format!("Argon2 params: {}", e)))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl Default for Argon2Hasher {
    fn default() -> Self {
        Self {
            params: Params::DEFAULT,
        }
    }
}

impl CredentialHasher for Argon2Hasher {
    fn hash_password(&self, plaintext: &str) -> Result<String, AuthError> {
        let salt = generate_salt(&mut OsRng)?;
        self.argon2()
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::HashingFailed(e.to_string()))
    }

    fn verify_password(&self, hash: &str, plaintext: &str) -> Result<(), AuthError> {
        let parsed = PasswordHash::new(hash)
            .map_err(|e| AuthError::HashingFailed(format!("Invalid hash format: {}", e)))?;

        // Parameters come from the stored hash, not from self.
        match self.argon2().verify_password(plaintext.as_bytes(), &parsed) {
            Ok(()) => Ok(()),
            Err(argon2::password_hash::Error::Password) => Err(AuthError::AuthenticationFailed),
            Err(e) => Err(AuthError::HashingFailed(e.to_string())),
        }
    }
}

/// Random salt from `rng`. An RNG failure is returned, not raised.
fn generate_salt<R: RngCore + ?Sized>(rng: &mut R) -> Result<SaltString, AuthError> {
    let mut bytes = Zeroizing::new([0u8; Salt::RECOMMENDED_LENGTH]);
    rng.try_fill_bytes(&mut bytes[..]).map_err(|e| {
        AuthError::HashingFailed(format!("Secure random source unavailable: {}", e))
    })?;
    SaltString::encode_b64(&bytes[..])
        .map_err(|e| AuthError::HashingFailed(format!("Salt encoding: {}", e)))
}

/// Hash with the default Argon2id parameters.
pub fn hash_password(plaintext: &str) -> Result<String, AuthError> {
    Argon2Hasher::default().hash_password(plaintext)
}

/// Verify with the parameters embedded in `hash`.
pub fn verify_password(hash: &str, plaintext: &str) -> Result<(), AuthError> {
    Argon2Hasher::default().verify_password(hash, plaintext)
}

/// Run `hash_password` on the blocking thread pool.
pub async fn hash_off_thread(
    hasher: Arc<dyn CredentialHasher>,
    plaintext: Zeroizing<String>,
) -> Result<String, AuthError> {
    tokio::task::spawn_blocking(move || hasher.hash_password(&plaintext))
        .await
        .map_err(|e| AuthError::HashingFailed(format!("Hashing task failed: {}", e)))?
}

/// Run `verify_password` on the blocking thread pool.
pub async fn verify_off_thread(
    hasher: Arc<dyn CredentialHasher>,
    hash: String,
    plaintext: Zeroizing<String>,
) -> Result<(), AuthError> {
    tokio::task::spawn_blocking(move || hasher.verify_password(&hash, &plaintext))
        .await
        .map_err(|e| AuthError::HashingFailed(format!("Verification task failed: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use argon2::password_hash::rand_core;

    /// Cheap parameters so the suite stays fast; behaviour is identical.
    fn fast_hasher() -> Argon2Hasher {
        Argon2Hasher::new(1024, 1, 1).unwrap()
    }

    #[test]
    fn test_hash_and_verify() {
        let hasher = fast_hasher();
        let hash = hasher.hash_password("correct horse").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.verify_password(&hash, "correct horse").is_ok());
    }

    #[test]
    fn test_appended_char_fails_authentication() {
        let hasher = fast_hasher();
        let hash = hasher.hash_password("secret").unwrap();

        assert!(matches!(
            hasher.verify_password(&hash, "secretx"),
            Err(AuthError::AuthenticationFailed)
        ));
    }

    #[test]
    fn test_same_password_different_hashes() {
        let hasher = fast_hasher();
        let a = hasher.hash_password("password").unwrap();
        let b = hasher.hash_password("password").unwrap();

        assert_ne!(a, b);
        assert!(hasher.verify_password(&a, "password").is_ok());
        assert!(hasher.verify_password(&b, "password").is_ok());
    }

    #[test]
    fn test_verify_uses_params_from_hash() {
        // Hash produced with different parameters still verifies with the default hasher
        let hash = fast_hasher().hash_password("portable").unwrap();
        assert!(verify_password(&hash, "portable").is_ok());
    }

    #[test]
    fn test_default_params_embedded() {
        let hash = hash_password("password").unwrap();
        assert!(hash.contains("m=19456,t=2,p=1"));
        assert!(verify_password(&hash, "password").is_ok());
    }

    #[test]
    fn test_malformed_hash_is_hashing_failure() {
        assert!(matches!(
            verify_password("not-a-phc-string", "password"),
            Err(AuthError::HashingFailed(_))
        ));
    }

    /// RNG whose every draw fails, as when the OS source is unavailable.
    struct BrokenRng;

    impl RngCore for BrokenRng {
        fn next_u32(&mut self) -> u32 {
            unreachable!("only try_fill_bytes is used for salts")
        }

        fn next_u64(&mut self) -> u64 {
            unreachable!("only try_fill_bytes is used for salts")
        }

        fn fill_bytes(&mut self, _dest: &mut [u8]) {
            unreachable!("only try_fill_bytes is used for salts")
        }

        fn try_fill_bytes(&mut self, _dest: &mut [u8]) -> Result<(), rand_core::Error> {
            let code = std::num::NonZeroU32::new(rand_core::Error::CUSTOM_START).unwrap();
            Err(code.into())
        }
    }

    #[test]
    fn test_rng_failure_is_hashing_error() {
        assert!(matches!(
            generate_salt(&mut BrokenRng),
            Err(AuthError::HashingFailed(_))
        ));
    }

    #[test]
    fn test_generated_salt_is_usable() {
        let salt = generate_salt(&mut OsRng).unwrap();
        assert!(salt.as_str().len() >= Salt::MIN_LENGTH);
        assert_ne!(salt.as_str(), generate_salt(&mut OsRng).unwrap().as_str());
    }

    #[test]
    fn test_invalid_params_are_an_error() {
        // Memory cost below the Argon2 minimum (8 * p_cost KiB)
        assert!(matches!(
            Argon2Hasher::new(1, 1, 1),
            Err(AuthError::HashingFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_off_thread_round_trip() {
        let hasher: Arc<dyn CredentialHasher> = Arc::new(fast_hasher());
        let hash = hash_off_thread(hasher.clone(), Zeroizing::new("password".to_string()))
            .await
            .unwrap();

        assert!(
            verify_off_thread(hasher.clone(), hash.clone(), Zeroizing::new("password".to_string()))
                .await
                .is_ok()
        );
        assert!(matches!(
            verify_off_thread(hasher, hash, Zeroizing::new("passwordx".to_string())).await,
            Err(AuthError::AuthenticationFailed)
        ));
    }
}
