//! Sending sealed messages and reading them back out of an inbox.
//!
//! An envelope starts `unread` and becomes `read` the first time its
//! recipient opens it with the right passphrase. A failed open leaves it
//! untouched so the recipient can try again.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::accounts::Session;
use crate::crypto;
use crate::error::ChatError;
use crate::model::{Envelope, EnvelopeId, MessageStatus};
use crate::store::{InboxStore, UserStore};

/// Minimum message length the interactive clients ask for.
pub const DEFAULT_MIN_MESSAGE_LEN: usize = 50;

/// Caller-side length check, counted in characters.
pub fn validate_body(body: &str, min_len: usize) -> Result<(), ChatError> {
    let len = body.chars().count();
    if len < min_len {
        return Err(ChatError::validation(format!(
            "message too short ({len} characters); type at least {min_len}"
        )));
    }
    Ok(())
}

/// Seals `body` for `to`. Surrounding whitespace in `passphrase` is
/// ignored, here and in [`read`].
pub fn send<S>(
    store: &mut S,
    session: &Session,
    to: &str,
    body: &str,
    passphrase: &str,
) -> Result<EnvelopeId, ChatError>
where
    S: UserStore + InboxStore + ?Sized,
{
    let to = to.trim();
    if to.is_empty() {
        return Err(ChatError::validation("recipient must not be empty"));
    }
    if body.is_empty() {
        return Err(ChatError::validation("message must not be empty"));
    }
    let passphrase = passphrase.trim();
    if passphrase.is_empty() {
        return Err(ChatError::validation("passphrase must not be empty"));
    }
    if store.find_by_username(to)?.is_none() {
        return Err(ChatError::NotFound(format!("user '{to}'")));
    }

    let token = crypto::seal(body, passphrase)?;
    let envelope = Envelope::new(session.username(), to, token, Utc::now())?;
    let id = store.insert_envelope(envelope)?;

    info!(from = session.username(), to, id = %id, "message sent");
    Ok(id)
}

/// One row of an [`InboxListing`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedEnvelope {
    pub position: usize,
    pub id: EnvelopeId,
    pub from: String,
    pub timestamp: DateTime<Utc>,
}

/// A snapshot of one inbox query.
///
/// Positions are 1-based and belong to this listing only: each one resolves
/// to the id it was listed with, regardless of later changes to the store.
#[derive(Debug, Clone)]
pub struct InboxListing {
    status: MessageStatus,
    entries: Vec<ListedEnvelope>,
}

impl InboxListing {
    pub fn status(&self) -> MessageStatus {
        self.status
    }

    pub fn entries(&self) -> &[ListedEnvelope] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn resolve(&self, position: usize) -> Option<&EnvelopeId> {
        position
            .checked_sub(1)
            .and_then(|i| self.entries.get(i))
            .map(|e| &e.id)
    }
}

pub fn list<S: InboxStore + ?Sized>(
    store: &S,
    session: &Session,
    status: MessageStatus,
) -> Result<InboxListing, ChatError> {
    let entries = store
        .find(session.username(), status)?
        .into_iter()
        .enumerate()
        .map(|(i, env)| ListedEnvelope {
            position: i + 1,
            id: env.id().clone(),
            from: env.sender().to_string(),
            timestamp: env.timestamp(),
        })
        .collect();

    Ok(InboxListing { status, entries })
}

/// A successfully opened message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenedMessage {
    pub id: EnvelopeId,
    pub from: String,
    pub timestamp: DateTime<Utc>,
    pub body: String,
}

pub fn read<S: InboxStore + ?Sized>(
    store: &mut S,
    session: &Session,
    id: &EnvelopeId,
    passphrase: &str,
) -> Result<OpenedMessage, ChatError> {
    let envelope = store
        .find_by_id(id)?
        .filter(|e| e.recipient() == session.username())
        .ok_or_else(|| ChatError::NotFound(format!("message {id}")))?;

    let passphrase = passphrase.trim();
    if passphrase.is_empty() {
        return Err(ChatError::validation("passphrase must not be empty"));
    }

    let body = match crypto::open(envelope.ciphertext(), passphrase) {
        Ok(body) => body,
        Err(e) => {
            warn!(user = session.username(), id = %id, "message could not be opened");
            return Err(e);
        }
    };

    if envelope.status() == MessageStatus::Unread {
        store.update_status(id, MessageStatus::Read)?;
        info!(user = session.username(), id = %id, "message marked read");
    }

    Ok(OpenedMessage {
        id: id.clone(),
        from: envelope.sender().to_string(),
        timestamp: envelope.timestamp(),
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::session_for;
    use crate::model::User;
    use crate::store::MemoryStore;
    use chrono::Duration;

    fn store_with(users: &[&str]) -> MemoryStore {
        let mut store = MemoryStore::new();
        for name in users {
            store
                .insert_user(User::new(name.to_string(), "hash".into()))
                .unwrap();
        }
        store
    }

    #[test]
    fn sealed_body_opens_with_same_passphrase() {
        let mut store = store_with(&["alice", "bob"]);
        let alice = session_for("alice");
        let bob = session_for("bob");
        let body = "A".repeat(50);

        let id = send(&mut store, &alice, "bob", &body, "secret").unwrap();
        let msg = read(&mut store, &bob, &id, "secret").unwrap();

        assert_eq!(msg.body, body);
        assert_eq!(msg.from, "alice");
    }

    #[test]
    fn stored_ciphertext_does_not_contain_plaintext() {
        let mut store = store_with(&["alice", "bob"]);
        let body = "plain words that should never be stored as they are";
        let id = send(&mut store, &session_for("alice"), "bob", body, "k").unwrap();

        let env = store.find_by_id(&id).unwrap().unwrap();
        let stored = env.ciphertext();
        assert!(!stored.windows(body.len()).any(|w| w == body.as_bytes()));
    }

    #[test]
    fn wrong_passphrase_keeps_message_unread() {
        let mut store = store_with(&["alice", "bob"]);
        let bob = session_for("bob");
        let body = "A".repeat(50);
        let id = send(&mut store, &session_for("alice"), "bob", &body, "secret").unwrap();

        assert!(matches!(
            read(&mut store, &bob, &id, "wrong"),
            Err(ChatError::AuthFailure)
        ));
        let env = store.find_by_id(&id).unwrap().unwrap();
        assert_eq!(env.status(), MessageStatus::Unread);

        // retry with the right passphrase
        read(&mut store, &bob, &id, "secret").unwrap();
        let env = store.find_by_id(&id).unwrap().unwrap();
        assert_eq!(env.status(), MessageStatus::Read);
    }

    #[test]
    fn reading_again_stays_read() {
        let mut store = store_with(&["alice", "bob"]);
        let bob = session_for("bob");
        let id = send(&mut store, &session_for("alice"), "bob", "hello", "k").unwrap();

        read(&mut store, &bob, &id, "k").unwrap();
        let again = read(&mut store, &bob, &id, "k").unwrap();

        assert_eq!(again.body, "hello");
        assert_eq!(list(&store, &bob, MessageStatus::Read).unwrap().len(), 1);
        assert!(list(&store, &bob, MessageStatus::Unread).unwrap().is_empty());
    }

    #[test]
    fn passphrase_whitespace_is_ignored() {
        let mut store = store_with(&["alice", "bob"]);
        let bob = session_for("bob");
        let id = send(&mut store, &session_for("alice"), "bob", "hello", " secret ").unwrap();

        assert_eq!(read(&mut store, &bob, &id, "secret").unwrap().body, "hello");
        assert_eq!(read(&mut store, &bob, &id, "secret\t").unwrap().body, "hello");
        assert!(matches!(
            read(&mut store, &bob, &id, "   "),
            Err(ChatError::Validation(_))
        ));
    }

    #[test]
    fn send_to_unknown_user_persists_nothing() {
        let mut store = store_with(&["alice"]);
        assert!(matches!(
            send(&mut store, &session_for("alice"), "ghost", "hi", "k"),
            Err(ChatError::NotFound(_))
        ));
        assert_eq!(store.message_count(), 0);
    }

    #[test]
    fn send_rejects_blank_input() {
        let mut store = store_with(&["alice", "bob"]);
        let alice = session_for("alice");
        for (to, body, key) in [(" ", "hi", "k"), ("bob", "", "k"), ("bob", "hi", "")] {
            assert!(matches!(
                send(&mut store, &alice, to, body, key),
                Err(ChatError::Validation(_))
            ));
        }
        assert_eq!(store.message_count(), 0);
    }

    #[test]
    fn other_users_cannot_open_someone_elses_message() {
        let mut store = store_with(&["alice", "bob", "carol"]);
        let id = send(&mut store, &session_for("alice"), "bob", "for bob", "k").unwrap();

        assert!(matches!(
            read(&mut store, &session_for("carol"), &id, "k"),
            Err(ChatError::NotFound(_))
        ));
    }

    #[test]
    fn listing_is_newest_first_with_stable_positions() {
        let mut store = store_with(&["alice", "bob"]);
        let t1 = Utc::now() - Duration::hours(2);
        let t2 = Utc::now() - Duration::hours(1);
        let first = crypto::seal("one", "k").unwrap();
        let second = crypto::seal("two", "k").unwrap();
        let old = store
            .insert_envelope(Envelope::new("alice", "bob", first, t1).unwrap())
            .unwrap();
        let new = store
            .insert_envelope(Envelope::new("alice", "bob", second, t2).unwrap())
            .unwrap();

        let bob = session_for("bob");
        let listing = list(&store, &bob, MessageStatus::Unread).unwrap();
        let stamps: Vec<_> = listing.entries().iter().map(|e| e.timestamp).collect();
        assert_eq!(stamps, vec![t2, t1]);
        assert_eq!(listing.resolve(1), Some(&new));
        assert_eq!(listing.resolve(2), Some(&old));
        assert_eq!(listing.resolve(0), None);
        assert_eq!(listing.resolve(3), None);

        // a newer arrival does not shift what position 1 means for this listing
        send(&mut store, &session_for("alice"), "bob", "three", "k").unwrap();
        let first = listing.resolve(1).unwrap().clone();
        assert_eq!(read(&mut store, &bob, &first, "k").unwrap().body, "two");
    }

    #[test]
    fn validate_body_counts_characters() {
        assert!(validate_body(&"é".repeat(50), 50).is_ok());
        let err = validate_body("short", 50).unwrap_err();
        assert!(err.to_string().contains("(5 characters)"));
    }
}
