use anyhow::Context;
use tracing::debug;

use super::{InboxStore, MemoryStore, UserStore};
use crate::error::ChatError;
use crate::model::{Envelope, EnvelopeId, MessageStatus, User};
use crate::storage::Storage;

/// Users and envelopes kept in a single JSON document on disk.
///
/// Every call reads the current file, so several processes can share one
/// store. Writes take the exclusive lock on `<file>.lock`, reload, apply the
/// change and replace the file atomically before releasing it. Concurrent
/// writers are serialized: each sees every change acknowledged before it,
/// and a document is either fully persisted or not at all.
pub struct DocumentStore {
    storage: Storage,
}

impl DocumentStore {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Reads the current collections; a missing file is an empty store.
    pub fn snapshot(&self) -> Result<MemoryStore, ChatError> {
        if !self.storage.exists() {
            return Ok(MemoryStore::new());
        }

        let data = self.storage.load()?;
        let docs = serde_json::from_slice(&data).with_context(|| {
            format!(
                "failed to parse chat store at {}",
                self.storage.path().display()
            )
        })?;
        Ok(docs)
    }

    fn mutate<T>(
        &mut self,
        apply: impl FnOnce(&mut MemoryStore) -> Result<T, ChatError>,
    ) -> Result<T, ChatError> {
        let _lock = self.storage.lock()?;
        let mut docs = self.snapshot()?;
        let out = apply(&mut docs)?;

        let data = serde_json::to_vec_pretty(&docs).context("failed to serialize chat store")?;
        self.storage.save(&data)?;
        debug!(
            path = %self.storage.path().display(),
            users = docs.user_count(),
            messages = docs.message_count(),
            "chat store saved"
        );
        Ok(out)
    }
}

impl UserStore for DocumentStore {
    fn find_by_username(&self, username: &str) -> Result<Option<User>, ChatError> {
        self.snapshot()?.find_by_username(username)
    }

    fn insert_user(&mut self, user: User) -> Result<String, ChatError> {
        self.mutate(|docs| docs.insert_user(user))
    }
}

impl InboxStore for DocumentStore {
    fn insert_envelope(&mut self, envelope: Envelope) -> Result<EnvelopeId, ChatError> {
        self.mutate(|docs| docs.insert_envelope(envelope))
    }

    fn find(&self, to: &str, status: MessageStatus) -> Result<Vec<Envelope>, ChatError> {
        self.snapshot()?.find(to, status)
    }

    fn find_by_id(&self, id: &EnvelopeId) -> Result<Option<Envelope>, ChatError> {
        self.snapshot()?.find_by_id(id)
    }

    fn update_status(&mut self, id: &EnvelopeId, status: MessageStatus) -> Result<(), ChatError> {
        self.mutate(|docs| docs.update_status(id, status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::tempdir;

    #[test]
    fn missing_file_is_empty_store() {
        let dir = tempdir().unwrap();
        let store = DocumentStore::new(Storage::new(dir.path().join("chat.json")));
        assert!(store.find_by_username("alice").unwrap().is_none());
        assert!(!store.storage().exists());
    }

    #[test]
    fn writes_are_visible_to_a_second_handle() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("chat.json");

        let mut a = DocumentStore::new(Storage::new(path.clone()));
        let b = DocumentStore::new(Storage::new(path));

        a.insert_user(User::new("alice".into(), "h".into())).unwrap();
        let id = a
            .insert_envelope(Envelope::new("alice", "bob", vec![1; 41], Utc::now()).unwrap())
            .unwrap();

        assert!(b.find_by_username("alice").unwrap().is_some());
        assert_eq!(b.find_by_id(&id).unwrap().unwrap().ciphertext(), &[1; 41]);
    }

    #[test]
    fn failed_mutation_leaves_file_untouched() {
        let dir = tempdir().unwrap();
        let mut store = DocumentStore::new(Storage::new(dir.path().join("chat.json")));
        store.insert_user(User::new("alice".into(), "h".into())).unwrap();
        let before = store.storage().load().unwrap();

        assert!(store
            .insert_user(User::new("alice".into(), "other".into()))
            .is_err());
        assert_eq!(store.storage().load().unwrap(), before);
    }

    #[test]
    fn status_update_persists() {
        let dir = tempdir().unwrap();
        let mut store = DocumentStore::new(Storage::new(dir.path().join("chat.json")));
        let id = store
            .insert_envelope(Envelope::new("alice", "bob", vec![0; 41], Utc::now()).unwrap())
            .unwrap();

        store.update_status(&id, MessageStatus::Read).unwrap();

        assert!(store.find("bob", MessageStatus::Unread).unwrap().is_empty());
        assert_eq!(store.find("bob", MessageStatus::Read).unwrap().len(), 1);
    }

    #[test]
    fn corrupted_file_is_storage_error() {
        let dir = tempdir().unwrap();
        let storage = Storage::new(dir.path().join("chat.json"));
        storage.save(b"{not json").unwrap();

        let store = DocumentStore::new(storage);
        assert!(matches!(
            store.find_by_username("alice"),
            Err(ChatError::Storage(_))
        ));
    }

    #[test]
    fn concurrent_handles_do_not_lose_envelopes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("chat.json");

        let workers: Vec<_> = (0..8)
            .map(|_| {
                let path = path.clone();
                std::thread::spawn(move || {
                    let mut store = DocumentStore::new(Storage::new(path));
                    for _ in 0..10 {
                        let env = Envelope::new("alice", "bob", vec![7; 41], Utc::now()).unwrap();
                        store.insert_envelope(env).unwrap();
                    }
                })
            })
            .collect();
        for w in workers {
            w.join().unwrap();
        }

        let store = DocumentStore::new(Storage::new(path));
        assert_eq!(store.find("bob", MessageStatus::Unread).unwrap().len(), 80);
    }

    #[test]
    fn read_status_survives_concurrent_sends() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("chat.json");

        let mut setup = DocumentStore::new(Storage::new(path.clone()));
        let ids: Vec<_> = (0..20)
            .map(|_| {
                let env = Envelope::new("alice", "bob", vec![1; 41], Utc::now()).unwrap();
                setup.insert_envelope(env).unwrap()
            })
            .collect();

        let reader = {
            let path = path.clone();
            std::thread::spawn(move || {
                let mut store = DocumentStore::new(Storage::new(path));
                for id in &ids {
                    store.update_status(id, MessageStatus::Read).unwrap();
                }
            })
        };
        let senders: Vec<_> = (0..2)
            .map(|_| {
                let path = path.clone();
                std::thread::spawn(move || {
                    let mut store = DocumentStore::new(Storage::new(path));
                    for _ in 0..10 {
                        let env = Envelope::new("alice", "carol", vec![2; 41], Utc::now()).unwrap();
                        store.insert_envelope(env).unwrap();
                    }
                })
            })
            .collect();
        reader.join().unwrap();
        for s in senders {
            s.join().unwrap();
        }

        let store = DocumentStore::new(Storage::new(path));
        assert!(store.find("bob", MessageStatus::Unread).unwrap().is_empty());
        assert_eq!(store.find("bob", MessageStatus::Read).unwrap().len(), 20);
        assert_eq!(store.find("carol", MessageStatus::Unread).unwrap().len(), 20);
    }
}
