//! Signed session tokens.
//!
//! A token is `base64url(id || HMAC-SHA256(key, id))` where `id` is 32 bytes
//! from the OS random source. Validation needs only the signing key, so any
//! replica holding the same key can check a token minted by another replica
//! without touching the session store.

use crate::error::AuthError;
use base64::{engine::general_purpose, Engine as _};
use hmac::{Hmac, Mac};
use rand::{rngs::OsRng, TryRngCore};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt;
use zeroize::Zeroizing;

type HmacSha256 = Hmac<Sha256>;

/// Length of the random identifier portion of a token.
pub const ID_LEN: usize = 32;

/// Length of the HMAC-SHA256 tag appended to the identifier.
pub const MAC_LEN: usize = 32;

/// Server-wide secret used to sign and verify session tokens.
///
/// The key material is wiped from memory on drop and never printed.
#[derive(Clone)]
pub struct SigningKey(Zeroizing<String>);

impl SigningKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(Zeroizing::new(key.into()))
    }

    fn mac(&self) -> HmacSha256 {
        HmacSha256::new_from_slice(self.0.as_bytes()).expect("HMAC accepts keys of any length")
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningKey([REDACTED])")
    }
}

/// A session token that was minted or validated with a [`SigningKey`].
///
/// Only [`mint`] and [`validate`] produce values of this type.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Bearer credential: only a short prefix is shown in debug output.
impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix: String = self.0.chars().take(8).collect();
        write!(f, "SessionId({}…)", prefix)
    }
}

/// Mint a new signed session id.
///
/// Fails only if the OS random source cannot produce bytes.
pub fn mint(key: &SigningKey) -> Result<SessionId, AuthError> {
    let mut buf = Zeroizing::new([0u8; ID_LEN + MAC_LEN]);
    OsRng
        .try_fill_bytes(&mut buf[..ID_LEN])
        .map_err(|e| AuthError::RandomUnavailable(e.to_string()))?;

    let mut mac = key.mac();
    mac.update(&buf[..ID_LEN]);
    buf[ID_LEN..].copy_from_slice(&mac.finalize().into_bytes());

    Ok(SessionId(general_purpose::URL_SAFE.encode(&buf[..])))
}

/// Check that `candidate` was minted with `key`.
///
/// The trailing [`MAC_LEN`] bytes are the tag; everything before it is the
/// identifier. The tag is compared in constant time.
pub fn validate(candidate: &str, key: &SigningKey) -> Result<SessionId, AuthError> {
    let buf = Zeroizing::new(
        general_purpose::URL_SAFE
            .decode(candidate)
            .map_err(|_| AuthError::InvalidToken)?,
    );

    if buf.len() < ID_LEN + MAC_LEN {
        return Err(AuthError::InvalidToken);
    }

    let (id, tag) = buf.split_at(buf.len() - MAC_LEN);
    let mut mac = key.mac();
    mac.update(id);
    mac.verify_slice(tag).map_err(|_| AuthError::InvalidToken)?;

    Ok(SessionId(candidate.to_string()))
}

/// Generate a random signing key suitable for `SESSION_KEY`.
pub fn generate_signing_key() -> Result<String, AuthError> {
    let mut bytes = Zeroizing::new([0u8; 32]);
    OsRng
        .try_fill_bytes(&mut bytes[..])
        .map_err(|e| AuthError::RandomUnavailable(e.to_string()))?;
    Ok(general_purpose::URL_SAFE_NO_PAD.encode(&bytes[..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> SigningKey {
        SigningKey::new(s)
    }

    #[test]
    fn test_mint_then_validate_returns_same_token() {
        let k = key("8675309");
        let token = mint(&k).unwrap();
        let validated = validate(token.as_str(), &k).unwrap();
        assert_eq!(validated, token);
    }

    #[test]
    fn test_token_shape() {
        let token = mint(&key("k")).unwrap();

        // 64 bytes -> 88 base64 characters (with padding)
        assert_eq!(token.as_str().len(), 88);
        assert!(token
            .as_str()
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '='));

        let decoded = general_purpose::URL_SAFE.decode(token.as_str()).unwrap();
        assert_eq!(decoded.len(), ID_LEN + MAC_LEN);
    }

    #[test]
    fn test_tokens_are_unique() {
        let k = key("k");
        assert_ne!(mint(&k).unwrap(), mint(&k).unwrap());
    }

    #[test]
    fn test_any_flipped_byte_is_rejected() {
        let k = key("tamper-test");
        let token = mint(&k).unwrap();
        let decoded = general_purpose::URL_SAFE.decode(token.as_str()).unwrap();

        for i in 0..decoded.len() {
            let mut tampered = decoded.clone();
            tampered[i] ^= 0x01;
            let candidate = general_purpose::URL_SAFE.encode(&tampered);
            assert!(
                matches!(validate(&candidate, &k), Err(AuthError::InvalidToken)),
                "flipping byte {} must invalidate the token",
                i
            );
        }
    }

    #[test]
    fn test_other_key_is_rejected() {
        let token = mint(&key("key-one")).unwrap();
        assert!(matches!(
            validate(token.as_str(), &key("key-two")),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_malformed_input_is_invalid_token() {
        let k = key("k");
        // Not base64
        assert!(matches!(validate("not base64!!", &k), Err(AuthError::InvalidToken)));
        // Empty
        assert!(matches!(validate("", &k), Err(AuthError::InvalidToken)));
        // Valid base64 but too short to hold id + tag
        let short = general_purpose::URL_SAFE.encode([0u8; ID_LEN + MAC_LEN - 1]);
        assert!(matches!(validate(&short, &k), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_debug_output_hides_secrets() {
        let k = key("super-secret-value");
        assert_eq!(format!("{:?}", k), "SigningKey([REDACTED])");

        let token = mint(&k).unwrap();
        let debug = format!("{:?}", token);
        assert!(!debug.contains(token.as_str()));
    }

    #[test]
    fn test_generate_signing_key() {
        let a = generate_signing_key().unwrap();
        let b = generate_signing_key().unwrap();
        assert_ne!(a, b);
        assert_eq!(general_purpose::URL_SAFE_NO_PAD.decode(&a).unwrap().len(), 32);
    }
}
