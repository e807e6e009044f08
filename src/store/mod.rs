/// Record storage
///
/// The pipeline treats persistence as an external collaborator behind the
/// `SnippetStore` and `UserStore` traits. Implementations can be swapped
/// for different backends; the in-memory implementations here back the
/// reference binary and the tests.
mod memory;

pub use self::memory::{MemorySnippetStore, MemoryUserStore};

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A stored snippet
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snippet {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub created: DateTime<Utc>,
    pub expires: DateTime<Utc>,
}

/// A registered user
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub created: DateTime<Utc>,
}

/// Errors surfaced by the record store
///
/// `NoRecord`, `DuplicateEmail` and `InvalidCredentials` are domain
/// outcomes that handlers resolve into specific branches; `Backend` is an
/// infrastructure fault escalated to the server-fault path.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    /// The requested record does not exist
    NoRecord,

    /// A user with the given email address already exists
    DuplicateEmail,

    /// Email/password or current-password check failed
    InvalidCredentials,

    /// The storage backend failed
    Backend {
        message: String,
    },
}

impl StoreError {
    /// Create a Backend error
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NoRecord => write!(f, "No matching record found"),
            StoreError::DuplicateEmail => write!(f, "Email address is already in use"),
            StoreError::InvalidCredentials => write!(f, "Invalid credentials"),
            StoreError::Backend { message } => write!(f, "Store backend error: {}", message),
        }
    }
}

impl std::error::Error for StoreError {}

/// Trait for snippet persistence
pub trait SnippetStore: Send + Sync {
    /// Get a non-expired snippet by id
    fn get(&self, id: i64) -> Result<Snippet, StoreError>;

    /// The ten most recently created non-expired snippets, newest first
    fn latest(&self) -> Result<Vec<Snippet>, StoreError>;

    /// Insert a snippet expiring `expires_days` from now; returns the new id
    fn insert(&self, title: &str, content: &str, expires_days: i64) -> Result<i64, StoreError>;
}

/// Trait for user persistence and credential checks
pub trait UserStore: Send + Sync {
    /// Get a user by id
    fn get(&self, id: i64) -> Result<User, StoreError>;

    /// Register a new user; fails with `DuplicateEmail` if the address is taken
    fn insert(&self, name: &str, email: &str, password: &str) -> Result<(), StoreError>;

    /// Verify credentials; returns the user id on success
    fn authenticate(&self, email: &str, password: &str) -> Result<i64, StoreError>;

    /// Change a user's password after verifying the current one
    fn update_password(&self, id: i64, current: &str, new: &str) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_display() {
        assert_eq!(StoreError::NoRecord.to_string(), "No matching record found");
        assert_eq!(
            StoreError::backend("connection refused").to_string(),
            "Store backend error: connection refused"
        );
    }
}
