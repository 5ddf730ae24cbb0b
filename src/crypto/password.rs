use super::SALT_LEN;
use super::aead::secure_random;
use super::kdf::KdfParams;
use crate::error::ChatError;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};

/// Hashes a login password into an argon2id PHC string
/// (`$argon2id$v=19$m=...,t=...,p=...$salt$hash`).
pub fn hash_password(password: &str, kdf: KdfParams) -> Result<String, ChatError> {
    let mut salt = [0u8; SALT_LEN];
    secure_random(&mut salt)?;
    let salt = SaltString::encode_b64(&salt)
        .map_err(|e| ChatError::Crypto(format!("invalid salt: {e}")))?;

    let hash = kdf
        .hasher()
        .map_err(|e| ChatError::Crypto(format!("{e:#}")))?
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| ChatError::Crypto(format!("password hashing failed: {e}")))?;

    Ok(hash.to_string())
}

/// Checks a password against a stored PHC string. Cost parameters are taken
/// from the hash itself, so hashes made with older settings still verify.
pub fn verify_password(password: &str, phc: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(phc) else {
        return false;
    };
    argon2::Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}
