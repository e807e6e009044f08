/// Session state
///
/// Per-client state keyed by an opaque token carried in a cookie. The
/// backend is an external collaborator behind the `SessionBackend` trait;
/// the pipeline loads a `Session` at chain entry and saves it at chain
/// exit, treating load → mutate → save as the unit of work per request.
mod memory;

pub use self::memory::MemoryBackend;

use rand::{Rng, distributions::Alphanumeric};

/// Length of session and CSRF tokens; 32 alphanumeric characters give
/// just under 191 bits of entropy.
const TOKEN_LEN: usize = 32;

/// Generate an opaque alphanumeric token
pub fn generate_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect()
}

/// The values a session can hold
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionData {
    /// Authenticated-user identifier; presence means "logged in"
    pub user_id: Option<i64>,

    /// One-shot message for post-redirect feedback
    pub flash: Option<String>,

    /// Where to send the user after a login forced by the auth gate
    pub redirect_path: Option<String>,

    /// Expected value for unsafe-method CSRF checks
    pub csrf_token: String,
}

/// Trait for session persistence, keyed by the opaque token
pub trait SessionBackend: Send + Sync {
    /// Load the data for a token, if the session exists
    fn load(&self, token: &str) -> Option<SessionData>;

    /// Persist the data under a token
    fn save(&self, token: &str, data: &SessionData);

    /// Remove a session
    fn delete(&self, token: &str);
}

/// One request's handle on its session
///
/// Created by the session middleware before the handler runs and saved
/// after it returns. `renew_token` must be called on every privilege
/// transition (login, logout) so a token never survives across privilege
/// boundaries.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    token: String,
    data: SessionData,
}

impl Session {
    /// A fresh session with new tokens, not yet persisted
    pub fn anonymous() -> Self {
        Self {
            token: generate_token(),
            data: SessionData {
                csrf_token: generate_token(),
                ..SessionData::default()
            },
        }
    }

    /// Load the session for a cookie token, or create a fresh one if the
    /// token is absent or unknown
    pub fn load_or_create(backend: &dyn SessionBackend, token: Option<&str>) -> Self {
        match token {
            Some(token) => match backend.load(token) {
                Some(data) => Self {
                    token: token.to_string(),
                    data,
                },
                None => Self::anonymous(),
            },
            None => Self::anonymous(),
        }
    }

    /// The opaque token identifying this session
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Issue a new token and invalidate the old one
    pub fn renew_token(&mut self, backend: &dyn SessionBackend) {
        backend.delete(&self.token);
        self.token = generate_token();
    }

    /// Persist the current data under the current token
    pub fn save(&self, backend: &dyn SessionBackend) {
        backend.save(&self.token, &self.data);
    }

    pub fn user_id(&self) -> Option<i64> {
        self.data.user_id
    }

    pub fn set_user_id(&mut self, id: i64) {
        self.data.user_id = Some(id);
    }

    pub fn remove_user_id(&mut self) {
        self.data.user_id = None;
    }

    pub fn put_flash(&mut self, message: impl Into<String>) {
        self.data.flash = Some(message.into());
    }

    /// Take the flash message, leaving none (single-read)
    pub fn pop_flash(&mut self) -> Option<String> {
        self.data.flash.take()
    }

    pub fn put_redirect_path(&mut self, path: impl Into<String>) {
        self.data.redirect_path = Some(path.into());
    }

    /// Take the saved redirect target, leaving none (single-read)
    pub fn pop_redirect_path(&mut self) -> Option<String> {
        self.data.redirect_path.take()
    }

    pub fn csrf_token(&self) -> &str {
        &self.data.csrf_token
    }

    /// Ensure the session carries a CSRF token, generating one if absent
    pub fn ensure_csrf_token(&mut self) {
        if self.data.csrf_token.is_empty() {
            self.data.csrf_token = generate_token();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_token_shape() {
        let a = generate_token();
        let b = generate_token();

        assert_eq!(a.len(), TOKEN_LEN);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_anonymous_session_has_csrf_token() {
        let session = Session::anonymous();
        assert_eq!(session.csrf_token().len(), TOKEN_LEN);
        assert_eq!(session.user_id(), None);
    }

    #[test]
    fn test_load_or_create_roundtrip() {
        let backend = MemoryBackend::new();

        let mut session = Session::anonymous();
        session.set_user_id(7);
        session.save(&backend);

        let loaded = Session::load_or_create(&backend, Some(session.token()));
        assert_eq!(loaded.user_id(), Some(7));
        assert_eq!(loaded.token(), session.token());
    }

    #[test]
    fn test_unknown_token_creates_fresh_session() {
        let backend = MemoryBackend::new();
        let session = Session::load_or_create(&backend, Some("bogus-token"));

        assert_ne!(session.token(), "bogus-token");
        assert_eq!(session.user_id(), None);
    }

    #[test]
    fn test_renew_token_invalidates_old_token() {
        let backend = MemoryBackend::new();

        let mut session = Session::anonymous();
        session.set_user_id(7);
        session.save(&backend);
        let old_token = session.token().to_string();

        session.renew_token(&backend);
        session.save(&backend);

        assert_ne!(session.token(), old_token);
        assert!(backend.load(&old_token).is_none());
        assert_eq!(backend.load(session.token()).unwrap().user_id, Some(7));
    }

    #[test]
    fn test_flash_is_single_read() {
        let mut session = Session::anonymous();
        session.put_flash("Snippet successfully created!");

        assert_eq!(
            session.pop_flash().as_deref(),
            Some("Snippet successfully created!")
        );
        assert_eq!(session.pop_flash(), None);
    }

    #[test]
    fn test_redirect_path_is_single_read() {
        let mut session = Session::anonymous();
        session.put_redirect_path("/snippet/create");

        assert_eq!(session.pop_redirect_path().as_deref(), Some("/snippet/create"));
        assert_eq!(session.pop_redirect_path(), None);
    }
}
