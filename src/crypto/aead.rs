use super::NONCE_LEN;
use super::kdf::derive;
use crate::error::ChatError;
use crate::format::{self, SealedToken};
use chacha20poly1305::{
    Key, XChaCha20Poly1305, XNonce,
    aead::{Aead, KeyInit},
};
use getrandom::fill;
use zeroize::Zeroizing;

/// Fill buffer with cryptographically secure random bytes
pub(crate) fn secure_random(buf: &mut [u8]) -> Result<(), ChatError> {
    fill(buf).map_err(|_| ChatError::Crypto("OS random generator unavailable".into()))
}

/// Encrypts `plaintext` under the key derived from `passphrase`.
///
/// Every call draws a fresh nonce, so sealing the same text twice yields
/// different tokens. The returned bytes are opaque and must be stored verbatim.
pub fn seal(plaintext: &str, passphrase: &str) -> Result<Vec<u8>, ChatError> {
    let key = derive(passphrase);
    let cipher = XChaCha20Poly1305::new(Key::from_slice(key.as_slice()));

    let mut nonce = [0u8; NONCE_LEN];
    secure_random(&mut nonce)?;

    let ciphertext = cipher
        .encrypt(XNonce::from_slice(&nonce), plaintext.as_bytes())
        .map_err(|_| ChatError::Crypto("encryption failed".into()))?;

    format::serialize(&SealedToken::new(nonce, ciphertext))
        .map_err(|e| ChatError::Crypto(e.to_string()))
}

/// Verifies and decrypts a token produced by [`seal`].
///
/// Any failure (wrong passphrase, truncated or tampered token, unknown
/// version) is reported as [`ChatError::AuthFailure`].
pub fn open(token: &[u8], passphrase: &str) -> Result<String, ChatError> {
    let sealed = format::parse(token).map_err(|_| ChatError::AuthFailure)?;

    let key = derive(passphrase);
    let cipher = XChaCha20Poly1305::new(Key::from_slice(key.as_slice()));

    let plaintext = Zeroizing::new(
        cipher
            .decrypt(XNonce::from_slice(sealed.nonce()), sealed.ciphertext())
            .map_err(|_| ChatError::AuthFailure)?,
    );

    std::str::from_utf8(&plaintext)
        .map(str::to_owned)
        .map_err(|_| ChatError::AuthFailure)
}
