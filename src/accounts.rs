use tracing::{info, warn};

use crate::crypto::{KdfParams, hash_password, verify_password};
use crate::error::ChatError;
use crate::model::User;
use crate::store::UserStore;

/// An authenticated user. Only [`login`] hands these out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    username: String,
}

impl Session {
    pub fn username(&self) -> &str {
        &self.username
    }
}

pub fn register<S: UserStore + ?Sized>(
    store: &mut S,
    username: &str,
    password: &str,
    kdf: KdfParams,
) -> Result<(), ChatError> {
    let username = username.trim();
    if username.is_empty() || password.is_empty() {
        return Err(ChatError::validation(
            "username and password must not be empty",
        ));
    }

    if store.find_by_username(username)?.is_some() {
        return Err(ChatError::UsernameTaken(username.to_string()));
    }

    let password_hash = hash_password(password, kdf)?;
    store.insert_user(User::new(username.to_string(), password_hash))?;

    info!(user = username, "user registered");
    Ok(())
}

/// Unknown usernames and wrong passwords fail identically.
pub fn login<S: UserStore + ?Sized>(
    store: &S,
    username: &str,
    password: &str,
) -> Result<Session, ChatError> {
    let username = username.trim();

    match store.find_by_username(username)? {
        Some(user) if verify_password(password, user.password_hash()) => {
            info!(user = username, "login succeeded");
            Ok(Session {
                username: user.username().to_string(),
            })
        }
        _ => {
            warn!(user = username, "login rejected");
            Err(ChatError::InvalidCredentials)
        }
    }
}

#[cfg(test)]
pub(crate) fn session_for(username: &str) -> Session {
    Session {
        username: username.to_string(),
    }
}
