//! Session persistence for sticky per-user values.
//!
//! Holds the values the bootstrap carries between requests: the chosen
//! cobrand, the debug flag, and user preferences such as the browser override.
//! Keys are dotted paths into the session's tree.
//!
//! # Design Decisions
//! - Only ids minted by [`SessionStore::issue`] can be resumed; an unknown or
//!   expired id from a client never creates a session
//! - Sessions idle for longer than the store's TTL are dropped on resume and
//!   by [`SessionStore::sweep`]

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::config::value::{get_path, set_path, Map, Value};

pub const DEFAULT_IDLE_TTL: Duration = Duration::from_secs(30 * 60);

/// Session collaborator used by the resolver and the bootstrap.
pub trait Session: Send + Sync {
    /// Read a persisted value by dotted key.
    fn get_persisted(&self, key: &str) -> Option<Value>;

    /// Persist a value under a dotted key.
    fn set_persisted(&self, key: &str, value: Value);
}

struct SessionEntry {
    data: Map,
    last_access: Instant,
}

impl SessionEntry {
    fn new() -> Self {
        Self {
            data: Map::new(),
            last_access: Instant::now(),
        }
    }
}

/// A thread-safe in-process session table keyed by session id.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<DashMap<String, SessionEntry>>,
    idle_ttl: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_idle_ttl(DEFAULT_IDLE_TTL)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_idle_ttl(idle_ttl: Duration) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            idle_ttl,
        }
    }

    pub fn idle_ttl(&self) -> Duration {
        self.idle_ttl
    }

    /// Create a session under a fresh UUID v4 id.
    pub fn issue(&self) -> SessionHandle {
        let id = uuid::Uuid::new_v4().to_string();
        self.inner.insert(id.clone(), SessionEntry::new());
        self.open(id)
    }

    /// Resume a session this store issued. Unknown and expired ids yield `None`.
    pub fn resume(&self, id: &str) -> Option<SessionHandle> {
        let expired = {
            let mut entry = self.inner.get_mut(id)?;
            if entry.last_access.elapsed() >= self.idle_ttl {
                true
            } else {
                entry.last_access = Instant::now();
                false
            }
        };
        if expired {
            self.inner.remove(id);
            return None;
        }
        Some(self.open(id))
    }

    /// Handle to one session by id. Nothing is stored until the first write.
    pub fn open(&self, id: impl Into<String>) -> SessionHandle {
        SessionHandle {
            store: self.clone(),
            id: id.into(),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.inner.contains_key(id)
    }

    /// Number of live sessions.
    pub fn count(&self) -> usize {
        self.inner.len()
    }

    /// Drop a session and everything in it.
    pub fn remove(&self, id: &str) -> bool {
        self.inner.remove(id).is_some()
    }

    /// Drop every session idle for at least the TTL. Returns how many were dropped.
    pub fn sweep(&self) -> usize {
        let idle_ttl = self.idle_ttl;
        let before = self.inner.len();
        self.inner.retain(|_, entry| entry.last_access.elapsed() < idle_ttl);
        before.saturating_sub(self.inner.len())
    }
}

/// A single session, cheap to clone and safe to move into worker threads.
#[derive(Clone)]
pub struct SessionHandle {
    store: SessionStore,
    id: String,
}

impl SessionHandle {
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl Session for SessionHandle {
    fn get_persisted(&self, key: &str) -> Option<Value> {
        self.store
            .inner
            .get(&self.id)
            .and_then(|entry| get_path(&entry.data, key).cloned())
    }

    fn set_persisted(&self, key: &str, value: Value) {
        let mut entry = self.store.inner.entry(self.id.clone()).or_insert_with(SessionEntry::new);
        entry.last_access = Instant::now();
        set_path(&mut entry.data, key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sessions_are_isolated() {
        let store = SessionStore::new();
        let a = store.open("a");
        let b = store.open("b");

        assert!(a.get_persisted("cobrand").is_none());
        assert_eq!(store.count(), 0);

        a.set_persisted("cobrand", Value::from("acme"));
        assert_eq!(a.get_persisted("cobrand"), Some(Value::from("acme")));
        assert!(b.get_persisted("cobrand").is_none());
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn test_dotted_keys_nest() {
        let store = SessionStore::new();
        let s = store.open("s");
        s.set_persisted("user.preferences.browser.override", Value::from("msie"));
        s.set_persisted("user.preferences.theme", Value::from("dark"));

        let prefs = s.get_persisted("user.preferences").unwrap();
        assert_eq!(prefs.get_path("browser.override"), Some(&Value::from("msie")));
        assert_eq!(prefs.get_path("theme"), Some(&Value::from("dark")));

        assert!(store.remove("s"));
        assert!(s.get_persisted("user").is_none());
    }

    #[test]
    fn test_handles_share_state_across_threads() {
        let store = SessionStore::new();
        let writer = store.open("shared");
        std::thread::spawn(move || writer.set_persisted("debug", Value::Bool(true)))
            .join()
            .unwrap();
        assert_eq!(store.open("shared").get_persisted("debug"), Some(Value::Bool(true)));
    }

    #[test]
    fn test_only_issued_ids_resume() {
        let store = SessionStore::new();
        assert!(store.resume("attacker-chosen").is_none());
        assert_eq!(store.count(), 0);

        let issued = store.issue();
        assert_eq!(store.count(), 1);
        issued.set_persisted("cobrand", Value::from("acme"));

        let resumed = store.resume(issued.id()).unwrap();
        assert_eq!(resumed.get_persisted("cobrand"), Some(Value::from("acme")));
        assert_ne!(store.issue().id(), issued.id());
    }

    #[test]
    fn test_idle_sessions_expire() {
        let store = SessionStore::with_idle_ttl(Duration::from_millis(30));
        let stale = store.issue();
        let stale_id = stale.id().to_string();
        store.issue();
        std::thread::sleep(Duration::from_millis(50));
        let fresh = store.issue();

        assert!(store.resume(&stale_id).is_none());
        assert!(!store.contains(&stale_id));
        assert_eq!(store.sweep(), 1);
        assert_eq!(store.count(), 1);
        assert!(store.resume(fresh.id()).is_some());
    }
}
