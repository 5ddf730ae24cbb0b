use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::crypto::aead::secure_random;
use crate::error::ChatError;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct User {
    username: String,
    password_hash: String,
}

impl User {
    pub(crate) fn new(username: String, password_hash: String) -> Self {
        Self {
            username,
            password_hash,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password_hash(&self) -> &str {
        &self.password_hash
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Unread,
    Read,
}

impl MessageStatus {
    /// Applies a status update. `Read` is terminal: once read, an envelope
    /// stays read whatever is requested.
    pub fn advance(self, requested: MessageStatus) -> MessageStatus {
        match (self, requested) {
            (MessageStatus::Read, _) => MessageStatus::Read,
            (MessageStatus::Unread, next) => next,
        }
    }
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageStatus::Unread => f.write_str("unread"),
            MessageStatus::Read => f.write_str("read"),
        }
    }
}

/// Stable identifier of a stored envelope: 24 lowercase hex characters.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct EnvelopeId(String);

impl EnvelopeId {
    const RAW_LEN: usize = 12;

    pub fn generate() -> Result<Self, ChatError> {
        let mut raw = [0u8; Self::RAW_LEN];
        secure_random(&mut raw)?;
        Ok(Self(raw.iter().map(|b| format!("{b:02x}")).collect()))
    }

    /// Parses user input into an id, rejecting anything that is not
    /// 24 hex characters.
    pub fn parse(s: &str) -> Result<Self, ChatError> {
        let s = s.trim();
        if s.len() != Self::RAW_LEN * 2 || !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ChatError::validation(format!("invalid message id '{s}'")));
        }
        Ok(Self(s.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EnvelopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    id: EnvelopeId,
    from: String,
    to: String,
    ciphertext: Vec<u8>,
    status: MessageStatus,
    timestamp: DateTime<Utc>,
}

impl Envelope {
    /// New unread envelope carrying an already sealed token.
    pub fn new(
        from: &str,
        to: &str,
        ciphertext: Vec<u8>,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, ChatError> {
        Ok(Self {
            id: EnvelopeId::generate()?,
            from: from.to_string(),
            to: to.to_string(),
            ciphertext,
            status: MessageStatus::Unread,
            timestamp,
        })
    }

    pub fn id(&self) -> &EnvelopeId {
        &self.id
    }

    pub fn sender(&self) -> &str {
        &self.from
    }

    pub fn recipient(&self) -> &str {
        &self.to
    }

    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    pub fn status(&self) -> MessageStatus {
        self.status
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub(crate) fn set_status(&mut self, requested: MessageStatus) {
        self.status = self.status.advance(requested);
    }
}
