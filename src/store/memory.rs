use std::sync::{Arc, Mutex};

use chrono::{Duration, Utc};

use super::{Snippet, SnippetStore, StoreError, User, UserStore};

/// In-memory snippet store
///
/// Rows live in a mutex-guarded vector; ids are assigned from an
/// incrementing counter. Expired snippets stay in the vector but are
/// invisible to `get` and `latest`.
#[derive(Debug, Clone, Default)]
pub struct MemorySnippetStore {
    inner: Arc<Mutex<SnippetRows>>,
}

#[derive(Debug, Default)]
struct SnippetRows {
    rows: Vec<Snippet>,
    next_id: i64,
}

impl MemorySnippetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with a snippet (test/demo helper)
    pub fn with_snippet(self, title: &str, content: &str, expires_days: i64) -> Self {
        // Seeding cannot fail: the mutex is unshared at this point.
        let _ = self.insert(title, content, expires_days);
        self
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, SnippetRows>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::backend("snippet store mutex poisoned"))
    }
}

impl SnippetStore for MemorySnippetStore {
    fn get(&self, id: i64) -> Result<Snippet, StoreError> {
        let rows = self.lock()?;
        let now = Utc::now();

        rows.rows
            .iter()
            .find(|s| s.id == id && s.expires > now)
            .cloned()
            .ok_or(StoreError::NoRecord)
    }

    fn latest(&self) -> Result<Vec<Snippet>, StoreError> {
        let rows = self.lock()?;
        let now = Utc::now();

        let mut latest: Vec<Snippet> = rows
            .rows
            .iter()
            .filter(|s| s.expires > now)
            .cloned()
            .collect();
        latest.sort_by(|a, b| b.created.cmp(&a.created).then(b.id.cmp(&a.id)));
        latest.truncate(10);

        Ok(latest)
    }

    fn insert(&self, title: &str, content: &str, expires_days: i64) -> Result<i64, StoreError> {
        let mut rows = self.lock()?;
        rows.next_id += 1;
        let id = rows.next_id;

        let created = Utc::now();
        rows.rows.push(Snippet {
            id,
            title: title.to_string(),
            content: content.to_string(),
            created,
            expires: created + Duration::days(expires_days),
        });

        Ok(id)
    }
}

/// In-memory user store
///
/// Secrets are compared directly; password hashing belongs to a real
/// backend behind the `UserStore` trait.
#[derive(Debug, Clone, Default)]
pub struct MemoryUserStore {
    inner: Arc<Mutex<UserRows>>,
}

#[derive(Debug, Default)]
struct UserRows {
    rows: Vec<UserRecord>,
    next_id: i64,
}

#[derive(Debug, Clone)]
struct UserRecord {
    user: User,
    secret: String,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with a user (test/demo helper)
    pub fn with_user(self, name: &str, email: &str, password: &str) -> Self {
        let _ = self.insert(name, email, password);
        self
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, UserRows>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::backend("user store mutex poisoned"))
    }
}

impl UserStore for MemoryUserStore {
    fn get(&self, id: i64) -> Result<User, StoreError> {
        let rows = self.lock()?;

        rows.rows
            .iter()
            .find(|r| r.user.id == id)
            .map(|r| r.user.clone())
            .ok_or(StoreError::NoRecord)
    }

    fn insert(&self, name: &str, email: &str, password: &str) -> Result<(), StoreError> {
        let mut rows = self.lock()?;

        if rows
            .rows
            .iter()
            .any(|r| r.user.email.eq_ignore_ascii_case(email))
        {
            return Err(StoreError::DuplicateEmail);
        }

        rows.next_id += 1;
        let id = rows.next_id;
        rows.rows.push(UserRecord {
            user: User {
                id,
                name: name.to_string(),
                email: email.to_string(),
                created: Utc::now(),
            },
            secret: password.to_string(),
        });

        Ok(())
    }

    fn authenticate(&self, email: &str, password: &str) -> Result<i64, StoreError> {
        let rows = self.lock()?;

        let record = rows
            .rows
            .iter()
            .find(|r| r.user.email.eq_ignore_ascii_case(email))
            .ok_or(StoreError::InvalidCredentials)?;

        if record.secret == password {
            Ok(record.user.id)
        } else {
            Err(StoreError::InvalidCredentials)
        }
    }

    fn update_password(&self, id: i64, current: &str, new: &str) -> Result<(), StoreError> {
        let mut rows = self.lock()?;

        let record = rows
            .rows
            .iter_mut()
            .find(|r| r.user.id == id)
            .ok_or(StoreError::NoRecord)?;

        if record.secret != current {
            return Err(StoreError::InvalidCredentials);
        }

        record.secret = new.to_string();
        Ok(())
    }
}
