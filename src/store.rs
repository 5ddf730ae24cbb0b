//! Collections of users and message envelopes.
//!
//! [`UserStore`] and [`InboxStore`] are the only way the rest of the crate
//! touches persisted data. Services receive a store explicitly; there is no
//! process-wide handle.

mod document;

pub use document::DocumentStore;

use crate::error::ChatError;
use crate::model::{Envelope, EnvelopeId, MessageStatus, User};
use serde::{Deserialize, Serialize};

pub trait UserStore {
    fn find_by_username(&self, username: &str) -> Result<Option<User>, ChatError>;

    /// Inserts a user and returns its key (the username).
    /// Fails with [`ChatError::UsernameTaken`] if the name is in use.
    fn insert_user(&mut self, user: User) -> Result<String, ChatError>;
}

pub trait InboxStore {
    fn insert_envelope(&mut self, envelope: Envelope) -> Result<EnvelopeId, ChatError>;

    /// Envelopes addressed to `to` with the given status, newest first.
    fn find(&self, to: &str, status: MessageStatus) -> Result<Vec<Envelope>, ChatError>;

    fn find_by_id(&self, id: &EnvelopeId) -> Result<Option<Envelope>, ChatError>;

    /// Single-document status update. Never moves an envelope back to unread.
    fn update_status(&mut self, id: &EnvelopeId, status: MessageStatus) -> Result<(), ChatError>;
}

/// In-process collections. Also the on-disk shape of a [`DocumentStore`].
#[derive(Serialize, Deserialize, Debug, Default, Clone)]
pub struct MemoryStore {
    #[serde(default)]
    users: Vec<User>,
    #[serde(default)]
    messages: Vec<Envelope>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }
}

impl UserStore for MemoryStore {
    fn find_by_username(&self, username: &str) -> Result<Option<User>, ChatError> {
        Ok(self
            .users
            .iter()
            .find(|u| u.username() == username)
            .cloned())
    }

    fn insert_user(&mut self, user: User) -> Result<String, ChatError> {
        if self.users.iter().any(|u| u.username() == user.username()) {
            return Err(ChatError::UsernameTaken(user.username().to_string()));
        }
        let key = user.username().to_string();
        self.users.push(user);
        Ok(key)
    }
}

impl InboxStore for MemoryStore {
    fn insert_envelope(&mut self, envelope: Envelope) -> Result<EnvelopeId, ChatError> {
        let id = envelope.id().clone();
        self.messages.push(envelope);
        Ok(id)
    }

    fn find(&self, to: &str, status: MessageStatus) -> Result<Vec<Envelope>, ChatError> {
        let mut found: Vec<Envelope> = self
            .messages
            .iter()
            .filter(|e| e.recipient() == to && e.status() == status)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.timestamp().cmp(&a.timestamp()));
        Ok(found)
    }

    fn find_by_id(&self, id: &EnvelopeId) -> Result<Option<Envelope>, ChatError> {
        Ok(self.messages.iter().find(|e| e.id() == id).cloned())
    }

    fn update_status(&mut self, id: &EnvelopeId, status: MessageStatus) -> Result<(), ChatError> {
        match self.messages.iter_mut().find(|e| e.id() == id) {
            Some(envelope) => {
                envelope.set_status(status);
                Ok(())
            }
            None => Err(ChatError::NotFound(format!("message {id}"))),
        }
    }
}
