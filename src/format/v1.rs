//! Token format v1.
//!
//! ```text
//! VERSION (1) | NONCE (24) | CIPHERTEXT || TAG (16)
//! ```

use super::{FormatError, SealedToken, VER_LEN};
use crate::crypto::{NONCE_LEN, TAG_LEN};

pub const VERSION_V1: u8 = 1;

const HEADER_LEN: usize = VER_LEN + NONCE_LEN;
const MIN_LEN: usize = HEADER_LEN + TAG_LEN;

pub(crate) fn parse(data: &[u8]) -> Result<SealedToken, FormatError> {
    if data.len() < MIN_LEN {
        return Err(FormatError::TooShort);
    }

    let nonce: [u8; NONCE_LEN] = data[VER_LEN..HEADER_LEN]
        .try_into()
        .map_err(|_| FormatError::TooShort)?;

    Ok(SealedToken::new(nonce, data[HEADER_LEN..].to_vec()))
}

pub(crate) fn serialize(token: &SealedToken) -> Result<Vec<u8>, FormatError> {
    if token.version() != VERSION_V1 {
        return Err(FormatError::UnsupportedVersion(token.version()));
    }
    if token.ciphertext().len() < TAG_LEN {
        return Err(FormatError::TooShort);
    }

    let mut buf = Vec::with_capacity(HEADER_LEN + token.ciphertext().len());
    buf.push(VERSION_V1);
    buf.extend_from_slice(token.nonce());
    buf.extend_from_slice(token.ciphertext());

    Ok(buf)
}
