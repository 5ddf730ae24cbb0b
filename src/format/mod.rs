//! Wire format of sealed message tokens.
//!
//! The first byte is the format version; everything after it is owned by the
//! version-specific module.

use thiserror::Error;

use crate::crypto::NONCE_LEN;

pub mod v1;

/// Length of version field.
pub const VER_LEN: usize = 1;
/// Latest token version
pub const CURRENT_VERSION: u8 = v1::VERSION_V1;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormatError {
    #[error("token too short")]
    TooShort,
    #[error("unsupported token version: {0}")]
    UnsupportedVersion(u8),
}

/// A parsed sealed message: nonce plus ciphertext with its trailing tag.
#[derive(Debug)]
pub(crate) struct SealedToken {
    version: u8,
    nonce: [u8; NONCE_LEN],
    ciphertext: Vec<u8>,
}

impl SealedToken {
    pub fn new(nonce: [u8; NONCE_LEN], ciphertext: Vec<u8>) -> Self {
        Self {
            version: CURRENT_VERSION,
            nonce,
            ciphertext,
        }
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn nonce(&self) -> &[u8; NONCE_LEN] {
        &self.nonce
    }

    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }
}

/// Parses a token, dispatching on its version byte.
pub(crate) fn parse(data: &[u8]) -> Result<SealedToken, FormatError> {
    let Some(&version) = data.first() else {
        return Err(FormatError::TooShort);
    };

    match version {
        v1::VERSION_V1 => v1::parse(data),
        other => Err(FormatError::UnsupportedVersion(other)),
    }
}

pub(crate) fn serialize(token: &SealedToken) -> Result<Vec<u8>, FormatError> {
    match token.version() {
        v1::VERSION_V1 => v1::serialize(token),
        other => Err(FormatError::UnsupportedVersion(other)),
    }
}
