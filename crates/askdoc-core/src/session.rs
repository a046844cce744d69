//! Per-upload session registry.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use askdoc_memory::VectorIndex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::RagError;

/// Opaque identifier handed to the client after a successful upload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

struct Session {
    index: Arc<VectorIndex>,
    created_at: Instant,
    /// Nanoseconds since the registry epoch.
    last_access: AtomicU64,
}

/// Owns every live session and its vector index.
///
/// Lookups take the read lock and bump an atomic access stamp, so concurrent
/// queries never serialize on each other. The lock is never held across an
/// `.await`.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, Session>>,
    epoch: Instant,
    max_sessions: usize,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("sessions", &self.len())
            .field("max_sessions", &self.max_sessions)
            .finish_non_exhaustive()
    }
}

impl SessionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity_limit(0)
    }

    /// Registry holding at most `max_sessions` sessions; 0 means unbounded.
    #[must_use]
    pub fn with_capacity_limit(max_sessions: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            epoch: Instant::now(),
            max_sessions,
        }
    }

    fn now(&self) -> u64 {
        u64::try_from(self.epoch.elapsed().as_nanos()).unwrap_or(u64::MAX)
    }

    /// Register `index` under a fresh identifier.
    ///
    /// When the registry is full, the least recently accessed session is dropped first.
    pub fn create(&self, index: VectorIndex) -> SessionId {
        let now = self.now();
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);

        if self.max_sessions > 0 && sessions.len() >= self.max_sessions {
            let oldest = sessions
                .iter()
                .min_by_key(|(_, s)| s.last_access.load(Ordering::Relaxed))
                .map(|(id, _)| id.clone());
            if let Some(oldest) = oldest {
                sessions.remove(&oldest);
                tracing::info!(session_id = %oldest, "session capacity reached, evicted least recently used");
            }
        }

        let mut id = SessionId::random();
        while sessions.contains_key(&id) {
            id = SessionId::random();
        }

        sessions.insert(
            id.clone(),
            Session {
                index: Arc::new(index),
                created_at: Instant::now(),
                last_access: AtomicU64::new(now),
            },
        );
        id
    }

    /// Shared handle to the session's index.
    ///
    /// # Errors
    ///
    /// Returns `SessionNotFound` if no session has this id.
    pub fn get(&self, id: &SessionId) -> Result<Arc<VectorIndex>, RagError> {
        let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
        let session = sessions
            .get(id)
            .ok_or_else(|| RagError::SessionNotFound(id.to_string()))?;
        session.last_access.store(self.now(), Ordering::Relaxed);
        Ok(Arc::clone(&session.index))
    }

    /// Age of the longest-lived session, if any.
    #[must_use]
    pub fn oldest_age(&self) -> Option<Duration> {
        let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
        sessions.values().map(|s| s.created_at.elapsed()).max()
    }

    /// Drop every session. Returns how many were removed.
    pub fn clear(&self) -> usize {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let count = sessions.len();
        sessions.clear();
        count
    }

    /// Drop sessions not accessed within `ttl`. Returns how many were removed.
    pub fn evict_idle(&self, ttl: Duration) -> usize {
        let now = self.now();
        let ttl = u64::try_from(ttl.as_nanos()).unwrap_or(u64::MAX);
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let before = sessions.len();
        sessions.retain(|id, session| {
            let idle = now.saturating_sub(session.last_access.load(Ordering::Relaxed));
            let keep = idle < ttl;
            if !keep {
                tracing::debug!(session_id = %id, "evicting idle session");
            }
            keep
        });
        before - sessions.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use askdoc_memory::Chunk;

    use super::*;

    fn index_with(content: &str) -> VectorIndex {
        let mut index = VectorIndex::new();
        index
            .insert(
                Chunk {
                    content: content.into(),
                    index: 0,
                },
                vec![1.0, 0.0],
            )
            .unwrap();
        index
    }

    #[test]
    fn create_then_get() {
        let registry = SessionRegistry::new();
        let id = registry.create(index_with("hello"));
        let index = registry.get(&id).unwrap();
        assert_eq!(index.chunks().next().unwrap().content, "hello");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn ids_are_unique_uuids() {
        let registry = SessionRegistry::new();
        let a = registry.create(VectorIndex::new());
        let b = registry.create(VectorIndex::new());
        assert_ne!(a, b);
        assert!(Uuid::parse_str(a.as_str()).is_ok());
    }

    #[test]
    fn unknown_id_is_not_found() {
        let registry = SessionRegistry::new();
        let err = registry.get(&SessionId::from("nope")).unwrap_err();
        assert!(matches!(err, RagError::SessionNotFound(ref id) if id == "nope"));
    }

    #[test]
    fn sessions_are_isolated() {
        let registry = SessionRegistry::new();
        let a = registry.create(index_with("alpha"));
        let b = registry.create(index_with("beta"));
        assert_eq!(registry.get(&a).unwrap().chunks().next().unwrap().content, "alpha");
        assert_eq!(registry.get(&b).unwrap().chunks().next().unwrap().content, "beta");
    }

    #[test]
    fn clear_drops_everything() {
        let registry = SessionRegistry::new();
        let id = registry.create(VectorIndex::new());
        registry.create(VectorIndex::new());
        assert_eq!(registry.clear(), 2);
        assert!(registry.is_empty());
        assert!(registry.get(&id).is_err());
    }

    #[test]
    fn handle_survives_clear() {
        let registry = SessionRegistry::new();
        let id = registry.create(index_with("kept"));
        let handle = registry.get(&id).unwrap();
        registry.clear();
        assert_eq!(handle.len(), 1);
    }

    #[test]
    fn evict_idle_with_zero_ttl_removes_all() {
        let registry = SessionRegistry::new();
        registry.create(VectorIndex::new());
        registry.create(VectorIndex::new());
        assert_eq!(registry.evict_idle(Duration::ZERO), 2);
        assert!(registry.is_empty());
    }

    #[test]
    fn evict_idle_keeps_recent_sessions() {
        let registry = SessionRegistry::new();
        registry.create(VectorIndex::new());
        assert_eq!(registry.evict_idle(Duration::from_secs(3600)), 0);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn evict_idle_respects_access() {
        let registry = SessionRegistry::new();
        let stale = registry.create(VectorIndex::new());
        let fresh = registry.create(VectorIndex::new());
        std::thread::sleep(Duration::from_millis(30));
        registry.get(&fresh).unwrap();
        assert_eq!(registry.evict_idle(Duration::from_millis(20)), 1);
        assert!(registry.get(&stale).is_err());
        assert!(registry.get(&fresh).is_ok());
    }

    #[test]
    fn capacity_limit_evicts_least_recently_used() {
        let registry = SessionRegistry::with_capacity_limit(2);
        let first = registry.create(VectorIndex::new());
        std::thread::sleep(Duration::from_millis(2));
        let second = registry.create(VectorIndex::new());
        std::thread::sleep(Duration::from_millis(2));
        registry.get(&first).unwrap();
        std::thread::sleep(Duration::from_millis(2));
        let third = registry.create(VectorIndex::new());

        assert_eq!(registry.len(), 2);
        assert!(registry.get(&first).is_ok());
        assert!(registry.get(&second).is_err());
        assert!(registry.get(&third).is_ok());
    }

    #[test]
    fn oldest_age_tracks_first_created() {
        let registry = SessionRegistry::new();
        assert!(registry.oldest_age().is_none());

        registry.create(VectorIndex::new());
        std::thread::sleep(Duration::from_millis(30));
        let young = registry.create(VectorIndex::new());
        let oldest = registry.oldest_age().unwrap();
        assert!(oldest >= Duration::from_millis(30));

        registry.evict_idle(Duration::ZERO);
        assert!(registry.oldest_age().is_none());
        assert!(registry.get(&young).is_err());
    }

    #[test]
    fn concurrent_gets_from_many_threads() {
        let registry = Arc::new(SessionRegistry::new());
        let ids: Vec<_> = (0..8)
            .map(|i| registry.create(index_with(&format!("doc{i}"))))
            .collect();

        let handles: Vec<_> = ids
            .iter()
            .enumerate()
            .map(|(i, id)| {
                let registry = Arc::clone(&registry);
                let id = id.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        let index = registry.get(&id).unwrap();
                        assert_eq!(index.chunks().next().unwrap().content, format!("doc{i}"));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
    }
}
