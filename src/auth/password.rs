use pbkdf2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Params, Pbkdf2,
};
use rand::RngCore;

const SALT_LENGTH: usize = 16;
const KEY_LENGTH: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("Password hashing failed: {0}")]
    Hash(String),

    #[error("Stored password hash is malformed: {0}")]
    MalformedHash(String),
}

/// Hash a password as a PHC string (`$pbkdf2-sha256$i=...,l=32$salt$hash`)
pub fn hash_password(password: &str, rounds: u32) -> Result<String, PasswordError> {
    let mut salt = [0u8; SALT_LENGTH];
    rand::thread_rng().fill_bytes(&mut salt);
    let salt = SaltString::encode_b64(&salt).map_err(|e| PasswordError::Hash(e.to_string()))?;

    let params = Params {
        rounds,
        output_length: KEY_LENGTH,
    };

    Pbkdf2
        .hash_password_customized(password.as_bytes(), None, None, params, &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::Hash(e.to_string()))
}

/// Well-formed hash that matches no password. Verifying against it costs the
/// same as verifying a real hash made with `rounds`.
pub fn dummy_hash(rounds: u32) -> String {
    format!(
        "$pbkdf2-sha256$i={},l={}${}${}",
        rounds,
        KEY_LENGTH,
        "A".repeat(22),
        "A".repeat(43)
    )
}

/// Check a password against a stored PHC hash. The iteration count is read
/// from the hash itself, so hashes made with older settings keep verifying.
pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool, PasswordError> {
    let parsed =
        PasswordHash::new(stored_hash).map_err(|e| PasswordError::MalformedHash(e.to_string()))?;
    Ok(Pbkdf2.verify_password(password.as_bytes(), &parsed).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROUNDS: u32 = 1_000;

    #[test]
    fn verifies_matching_password() {
        let hash = hash_password("testpass123", ROUNDS).unwrap();
        assert!(hash.starts_with("$pbkdf2-sha256$"));
        assert!(verify_password("testpass123", &hash).unwrap());
        assert!(!verify_password("wrongpass", &hash).unwrap());
    }

    #[test]
    fn salts_differ_between_hashes() {
        let a = hash_password("same-password", ROUNDS).unwrap();
        let b = hash_password("same-password", ROUNDS).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn dummy_hash_parses_and_never_matches() {
        let hash = dummy_hash(ROUNDS);
        assert_eq!(verify_password("", &hash).unwrap(), false);
        assert_eq!(verify_password("testpass123", &hash).unwrap(), false);
    }

    #[test]
    fn malformed_hash_is_an_error() {
        assert!(verify_password("x", "not-a-phc-string").is_err());
    }
}
