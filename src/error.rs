use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChatError {
    /// Input rejected before any work was done (empty fields, short message).
    #[error("{0}")]
    Validation(String),

    /// Sealed message could not be opened with the given passphrase.
    #[error("wrong passphrase or corrupted message")]
    AuthFailure,

    #[error("crypto failure: {0}")]
    Crypto(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("username '{0}' is already taken")]
    UsernameTaken(String),

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl ChatError {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        ChatError::Validation(msg.into())
    }

    /// Whether the caller can sensibly prompt again and retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ChatError::AuthFailure | ChatError::Validation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_failure_is_retryable_but_crypto_is_not() {
        assert!(ChatError::AuthFailure.is_retryable());
        assert!(!ChatError::Crypto("rng".into()).is_retryable());
        assert!(!ChatError::NotFound("message".into()).is_retryable());
    }

    #[test]
    fn not_found_message_names_the_subject() {
        let err = ChatError::NotFound("user 'bob'".into());
        assert_eq!(err.to_string(), "user 'bob' not found");
    }
}
