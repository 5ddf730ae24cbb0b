mod accounts;
mod config;
pub mod crypto;
mod error;
mod format;
mod inbox;
mod model;
mod storage;
mod store;

pub use crate::accounts::Session;
pub use crate::config::{Config, default_store_path};
pub use crate::crypto::{KdfParams, open, seal};
pub use crate::error::ChatError;
pub use crate::inbox::{
    DEFAULT_MIN_MESSAGE_LEN, InboxListing, ListedEnvelope, OpenedMessage, validate_body,
};
pub use crate::model::{Envelope, EnvelopeId, MessageStatus, User};
pub use crate::storage::{Storage, StorageLock};
pub use crate::store::{DocumentStore, InboxStore, MemoryStore, UserStore};

/// Chat operations over an explicitly provided store.
pub struct Messenger<S> {
    store: S,
    config: Config,
}

impl Messenger<DocumentStore> {
    /// Opens the document store named by `config`.
    pub fn open(config: Config) -> Self {
        let store = DocumentStore::new(config.storage());
        Self::new(store, config)
    }
}

impl<S: UserStore + InboxStore> Messenger<S> {
    pub fn new(store: S, config: Config) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn register(&mut self, username: &str, password: &str) -> Result<(), ChatError> {
        accounts::register(&mut self.store, username, password, self.config.kdf())
    }

    pub fn login(&self, username: &str, password: &str) -> Result<Session, ChatError> {
        accounts::login(&self.store, username, password)
    }

    /// Seals `body` with `passphrase` and delivers it to `to`.
    ///
    /// The minimum length is not enforced here; clients call
    /// [`validate_body`] before asking for the passphrase.
    pub fn send(
        &mut self,
        session: &Session,
        to: &str,
        body: &str,
        passphrase: &str,
    ) -> Result<EnvelopeId, ChatError> {
        inbox::send(&mut self.store, session, to, body, passphrase)
    }

    pub fn inbox(
        &self,
        session: &Session,
        status: MessageStatus,
    ) -> Result<InboxListing, ChatError> {
        inbox::list(&self.store, session, status)
    }

    pub fn read(
        &mut self,
        session: &Session,
        id: &EnvelopeId,
        passphrase: &str,
    ) -> Result<OpenedMessage, ChatError> {
        inbox::read(&mut self.store, session, id, passphrase)
    }
}
