use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::{SessionBackend, SessionData};

/// In-memory session backend
///
/// Sessions for different tokens never interfere; the map is guarded by a
/// single mutex held only for the duration of one load/save/delete.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    sessions: Arc<Mutex<HashMap<String, SessionData>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live sessions
    pub fn len(&self) -> usize {
        self.sessions.lock().map(|s| s.len()).unwrap_or(0)
    }

    /// True if no sessions are stored
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionBackend for MemoryBackend {
    fn load(&self, token: &str) -> Option<SessionData> {
        self.sessions.lock().ok()?.get(token).cloned()
    }

    fn save(&self, token: &str, data: &SessionData) {
        if let Ok(mut sessions) = self.sessions.lock() {
            sessions.insert(token.to_string(), data.clone());
        }
    }

    fn delete(&self, token: &str) {
        if let Ok(mut sessions) = self.sessions.lock() {
            sessions.remove(token);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_load_delete() {
        let backend = MemoryBackend::new();
        let data = SessionData {
            user_id: Some(1),
            ..SessionData::default()
        };

        backend.save("token-a", &data);
        assert_eq!(backend.load("token-a"), Some(data));
        assert_eq!(backend.len(), 1);

        backend.delete("token-a");
        assert_eq!(backend.load("token-a"), None);
        assert!(backend.is_empty());
    }

    #[test]
    fn test_distinct_tokens_do_not_interfere() {
        let backend = MemoryBackend::new();
        let a = SessionData {
            user_id: Some(1),
            ..SessionData::default()
        };
        let b = SessionData {
            user_id: Some(2),
            ..SessionData::default()
        };

        backend.save("token-a", &a);
        backend.save("token-b", &b);

        assert_eq!(backend.load("token-a").unwrap().user_id, Some(1));
        assert_eq!(backend.load("token-b").unwrap().user_id, Some(2));
    }
}
