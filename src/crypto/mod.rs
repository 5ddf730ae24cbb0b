//! Cryptographic primitives for cipherchat.
//!
//! Message sealing, passphrase key derivation, and login password hashing.

pub mod aead;
pub mod kdf;
pub mod password;

pub use aead::{open, seal};
pub use kdf::{KdfParams, MessageKey, derive};
pub use password::{hash_password, verify_password};

/// Length of the password hash salt (16 bytes).
pub const SALT_LEN: usize = 16;
/// Length of the nonce (24 bytes for XChaCha20-Poly1305).
pub const NONCE_LEN: usize = 24;
/// Length of the message key (32 bytes / 256 bits).
pub const KEY_LEN: usize = 32;
/// Length of the Poly1305 authentication tag.
pub const TAG_LEN: usize = 16;
