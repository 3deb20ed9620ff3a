// src/session.rs

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::notifications::store::NotificationStore;

/// One signed-in browser session and its notification feed.
pub struct PortalSession {
    pub session_id: Uuid,
    pub user_id: String,
    pub started_at: DateTime<Utc>,
    /// The bearer token's `exp`; the session dies with it.
    pub expires_at: Option<DateTime<Utc>>,
    pub store: Arc<NotificationStore>,
}

impl PortalSession {
    pub fn new(
        user_id: &str,
        expires_at: Option<DateTime<Utc>>,
        store: Arc<NotificationStore>,
    ) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            started_at: Utc::now(),
            expires_at,
            store,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| exp <= now)
    }
}

/// Active sessions keyed by the hash of their bearer token.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    inner: Arc<RwLock<HashMap<String, Arc<PortalSession>>>>,
}

impl SessionRegistry {
    pub fn get(&self, token_hash: &str) -> Option<Arc<PortalSession>> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(token_hash)
            .cloned()
    }

    /// Registers a session, stopping whichever one held the key before.
    pub fn insert(&self, token_hash: String, session: Arc<PortalSession>) {
        let previous = self
            .inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(token_hash, session);
        if let Some(previous) = previous {
            tracing::info!(session_id = %previous.session_id, "replacing portal session");
            previous.store.stop();
        }
    }

    /// Removes and stops a session.
    pub fn end(&self, token_hash: &str) -> Option<Arc<PortalSession>> {
        let removed = self
            .inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(token_hash);
        if let Some(session) = &removed {
            session.store.stop();
        }
        removed
    }

    pub fn end_all(&self) -> usize {
        let drained: Vec<_> = self
            .inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .map(|(_, session)| session)
            .collect();
        for session in &drained {
            session.store.stop();
        }
        drained.len()
    }

    /// Ends every session whose token has expired. Returns how many.
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> usize {
        let expired: Vec<_> = {
            let mut sessions = self.inner.write().unwrap_or_else(PoisonError::into_inner);
            let keys: Vec<String> = sessions
                .iter()
                .filter(|(_, session)| session.is_expired(now))
                .map(|(key, _)| key.clone())
                .collect();
            keys.iter().filter_map(|key| sessions.remove(key)).collect()
        };
        for session in &expired {
            tracing::info!(session_id = %session.session_id, "portal session expired");
            session.store.stop();
        }
        expired.len()
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::{session, session_until};
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_insert_replaces_and_stops_previous() {
        let registry = SessionRegistry::default();
        let first = session("u1");
        registry.insert("k".into(), first.clone());
        registry.insert("k".into(), session("u1"));

        assert_eq!(registry.len(), 1);
        assert!(!first.store.is_active());
        assert!(registry.get("k").unwrap().store.is_active());
    }

    #[test]
    fn test_end_removes_and_stops() {
        let registry = SessionRegistry::default();
        registry.insert("k".into(), session("u1"));

        let ended = registry.end("k").unwrap();
        assert!(!ended.store.is_active());
        assert!(registry.get("k").is_none());
        assert!(registry.end("k").is_none());
    }

    #[test]
    fn test_end_all_drains_registry() {
        let registry = SessionRegistry::default();
        registry.insert("a".into(), session("u1"));
        registry.insert("b".into(), session("u2"));

        assert_eq!(registry.end_all(), 2);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_sweep_ends_only_expired_sessions() {
        let registry = SessionRegistry::default();
        let now = Utc::now();
        let stale = session_until("u1", Some(now - Duration::seconds(1)));
        let fresh = session_until("u2", Some(now + Duration::hours(1)));
        registry.insert("stale".into(), stale.clone());
        registry.insert("fresh".into(), fresh.clone());
        registry.insert("open".into(), session("u3"));

        assert_eq!(registry.sweep_expired(now), 1);
        assert!(!stale.store.is_active());
        assert!(fresh.store.is_active());
        assert!(registry.get("stale").is_none());
        assert_eq!(registry.len(), 2);

        assert_eq!(registry.sweep_expired(now), 0);
    }
}
