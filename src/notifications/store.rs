// src/notifications/store.rs

//! Session-scoped notification state.
//!
//! The store merges a fetched page with pushed events and keeps a denormalised
//! unread counter in step with every transition. State sits behind a plain
//! mutex that is never held across an `.await`, so each transition is applied
//! as a whole and callers never observe a half-updated list.

use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use serde::Serialize;

use crate::error::{BackendError, PushError};
use crate::notifications::api::NotificationApi;
use crate::notifications::push::{PushEvent, PushSink, PushSubscription, PushTransport};
use crate::notifications::{ConnectionState, LoadOptions, Notification};

/// What happens to an optimistic change when the backend call fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MutationPolicy {
    /// Undo the local change and hand the error back.
    #[default]
    Rollback,
    /// Keep the local change and only log the failure.
    FireAndForget,
}

impl FromStr for MutationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rollback" => Ok(MutationPolicy::Rollback),
            "fire_and_forget" | "fire-and-forget" => Ok(MutationPolicy::FireAndForget),
            other => Err(format!("unknown mutation policy: {other}")),
        }
    }
}

/// How a pushed notification whose id is already listed is handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// The older copy is removed before the new one is prepended.
    #[default]
    Replace,
    /// Every delivery is shown, duplicates included.
    KeepAll,
}

impl FromStr for DuplicatePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "replace" => Ok(DuplicatePolicy::Replace),
            "keep_all" | "keep-all" => Ok(DuplicatePolicy::KeepAll),
            other => Err(format!("unknown duplicate policy: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StorePolicy {
    pub mutations: MutationPolicy,
    pub duplicates: DuplicatePolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSnapshot {
    pub notifications: Vec<Notification>,
    pub unread_count: u64,
    pub connection_state: ConnectionState,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "outcome")]
pub enum LoadOutcome {
    #[serde(rename_all = "camelCase")]
    Applied { fetched: usize, unread_count: u64 },
    /// A newer `load` was issued while this one was in flight.
    Superseded,
    /// The store was stopped before the response arrived.
    Inactive,
}

#[derive(Debug)]
struct StoreState {
    notifications: Vec<Notification>,
    unread_count: u64,
    connection: ConnectionState,
    last_error: Option<String>,
    active: bool,
}

pub struct NotificationStore {
    api: Arc<dyn NotificationApi>,
    policy: StorePolicy,
    state: Mutex<StoreState>,
    load_seq: AtomicU64,
    feed_generation: AtomicU64,
    subscription: Mutex<Option<PushSubscription>>,
}

fn relock<T>(lock: &Mutex<T>) -> MutexGuard<'_, T> {
    lock.lock().unwrap_or_else(PoisonError::into_inner)
}

impl NotificationStore {
    pub fn new(api: Arc<dyn NotificationApi>, policy: StorePolicy) -> Self {
        Self {
            api,
            policy,
            state: Mutex::new(StoreState {
                notifications: Vec::new(),
                unread_count: 0,
                connection: ConnectionState::Disconnected,
                last_error: None,
                active: true,
            }),
            load_seq: AtomicU64::new(0),
            feed_generation: AtomicU64::new(0),
            subscription: Mutex::new(None),
        }
    }

    fn state(&self) -> MutexGuard<'_, StoreState> {
        relock(&self.state)
    }

    pub fn snapshot(&self) -> NotificationSnapshot {
        let state = self.state();
        NotificationSnapshot {
            notifications: state.notifications.clone(),
            unread_count: state.unread_count,
            connection_state: state.connection,
            last_error: state.last_error.clone(),
        }
    }

    pub fn unread_count(&self) -> u64 {
        self.state().unread_count
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.state().connection
    }

    pub fn is_active(&self) -> bool {
        self.state().active
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Opens the push subscription, replacing any previous one first.
    ///
    /// A failed handshake leaves the store active but disconnected; fetched
    /// data and local mutations keep working.
    pub async fn start(self: &Arc<Self>, transport: &dyn PushTransport) -> Result<(), PushError> {
        self.cancel_subscription();
        self.state().active = true;

        let generation = self.feed_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let feed: Arc<dyn PushSink> = Arc::new(SessionFeed {
            store: Arc::downgrade(self),
            generation,
        });

        match transport.subscribe(feed).await {
            Ok(subscription) => {
                if self.feed_generation.load(Ordering::SeqCst) == generation && self.is_active() {
                    *relock(&self.subscription) = Some(subscription);
                } else {
                    subscription.cancel();
                }
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "push subscription failed");
                self.set_connection_state(ConnectionState::Disconnected);
                Err(e)
            }
        }
    }

    /// Tears the session down: no more pushed events, late `load` results
    /// are discarded. History is kept.
    pub fn stop(&self) {
        {
            let mut state = self.state();
            state.active = false;
            state.connection = ConnectionState::Disconnected;
        }
        self.feed_generation.fetch_add(1, Ordering::SeqCst);
        self.cancel_subscription();
        tracing::debug!("notification store stopped");
    }

    fn cancel_subscription(&self) {
        if let Some(previous) = relock(&self.subscription).take() {
            previous.cancel();
        }
    }

    // ------------------------------------------------------------------
    // Fetch
    // ------------------------------------------------------------------

    /// Replaces the list and counter with a fresh page from the backend.
    ///
    /// Only the most recently issued call may write; earlier ones resolve to
    /// [`LoadOutcome::Superseded`]. On failure the previous content stays and
    /// the error is both recorded and returned.
    pub async fn load(&self, options: &LoadOptions) -> Result<LoadOutcome, BackendError> {
        let ticket = self.load_seq.fetch_add(1, Ordering::SeqCst) + 1;

        let fetched = tokio::try_join!(self.api.list(options), self.api.unread_count());

        let mut state = self.state();
        if !state.active {
            return Ok(LoadOutcome::Inactive);
        }
        if self.load_seq.load(Ordering::SeqCst) != ticket {
            tracing::debug!(ticket, "discarding superseded notification load");
            return Ok(LoadOutcome::Superseded);
        }

        match fetched {
            Ok((notifications, unread_count)) => {
                state.notifications = notifications.into_iter().map(Notification::normalized).collect();
                state.unread_count = unread_count;
                state.last_error = None;
                Ok(LoadOutcome::Applied {
                    fetched: state.notifications.len(),
                    unread_count,
                })
            }
            Err(e) => {
                tracing::warn!(error = %e, "notification load failed");
                state.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    // ------------------------------------------------------------------
    // Local transitions
    // ------------------------------------------------------------------

    /// Prepends a pushed notification. Arrival order is kept as is.
    pub fn receive(&self, notification: Notification) {
        let notification = notification.normalized();
        let mut state = self.state();
        if !state.active {
            tracing::debug!(id = %notification.id, "ignoring notification for stopped store");
            return;
        }

        if self.policy.duplicates == DuplicatePolicy::Replace {
            if let Some(pos) = state.notifications.iter().position(|n| n.id == notification.id) {
                let previous = state.notifications.remove(pos);
                if !previous.is_read {
                    state.unread_count = state.unread_count.saturating_sub(1);
                }
            }
        }

        if !notification.is_read {
            state.unread_count += 1;
        }
        state.notifications.insert(0, notification);
    }

    /// Authoritative counter from the server, overriding local accounting.
    pub fn apply_unread_count(&self, count: u64) {
        let mut state = self.state();
        if state.active {
            state.unread_count = count;
        }
    }

    pub fn set_connection_state(&self, connection: ConnectionState) {
        let mut state = self.state();
        if state.connection != connection {
            tracing::info!(?connection, "notification feed connection changed");
        }
        state.connection = connection;
    }

    // ------------------------------------------------------------------
    // Optimistic mutations
    // ------------------------------------------------------------------

    /// Marks one notification read. Unknown or already-read ids are no-ops
    /// and do not reach the backend.
    pub async fn mark_read(&self, id: &str) -> Result<(), BackendError> {
        let changed = {
            let mut guard = self.state();
            let state = &mut *guard;
            match state.notifications.iter_mut().find(|n| n.id == id) {
                Some(entry) if !entry.is_read => {
                    entry.is_read = true;
                    state.unread_count = state.unread_count.saturating_sub(1);
                    true
                }
                _ => false,
            }
        };
        if !changed {
            return Ok(());
        }

        let result = self.api.mark_read(id).await;
        self.settle(result, "mark_read", || {
            let mut guard = self.state();
            let state = &mut *guard;
            if let Some(entry) = state.notifications.iter_mut().find(|n| n.id == id) {
                if entry.is_read {
                    entry.is_read = false;
                    state.unread_count += 1;
                }
            }
        })
    }

    pub async fn mark_all_read(&self) -> Result<(), BackendError> {
        let (reverted_ids, previous_count) = {
            let mut guard = self.state();
            let state = &mut *guard;
            let mut ids = Vec::new();
            for entry in state.notifications.iter_mut().filter(|n| !n.is_read) {
                entry.is_read = true;
                ids.push(entry.id.clone());
            }
            let previous = state.unread_count;
            state.unread_count = 0;
            (ids, previous)
        };

        let result = self.api.mark_all_read().await;
        self.settle(result, "mark_all_read", || {
            let mut guard = self.state();
            let state = &mut *guard;
            let mut restored = 0u64;
            for entry in state
                .notifications
                .iter_mut()
                .filter(|n| n.is_read && reverted_ids.contains(&n.id))
            {
                entry.is_read = false;
                restored += 1;
            }
            // Ids removed or re-delivered since the optimistic clear are
            // already accounted for. Everything received since is counted.
            let gone = reverted_ids.len() as u64 - restored;
            state.unread_count += previous_count.saturating_sub(gone);
        })
    }

    /// Deletes one notification. The counter only moves if it was unread.
    pub async fn remove(&self, id: &str) -> Result<(), BackendError> {
        let removed = {
            let mut state = self.state();
            match state.notifications.iter().position(|n| n.id == id) {
                Some(pos) => {
                    let entry = state.notifications.remove(pos);
                    if !entry.is_read {
                        state.unread_count = state.unread_count.saturating_sub(1);
                    }
                    Some((pos, entry))
                }
                None => None,
            }
        };
        let Some((pos, entry)) = removed else {
            return Ok(());
        };

        let result = self.api.delete(id).await;
        self.settle(result, "remove", move || {
            let mut state = self.state();
            // Re-delivered while the delete was in flight; keep the newer copy.
            if state.notifications.iter().any(|n| n.id == entry.id) {
                return;
            }
            let at = pos.min(state.notifications.len());
            if !entry.is_read {
                state.unread_count += 1;
            }
            state.notifications.insert(at, entry);
        })
    }

    fn settle(
        &self,
        result: Result<(), BackendError>,
        operation: &'static str,
        rollback: impl FnOnce(),
    ) -> Result<(), BackendError> {
        let Err(e) = result else {
            return Ok(());
        };

        match self.policy.mutations {
            MutationPolicy::FireAndForget => {
                tracing::warn!(operation, error = %e, "backend rejected notification update; keeping local state");
                Ok(())
            }
            MutationPolicy::Rollback => {
                tracing::warn!(operation, error = %e, "backend rejected notification update; rolling back");
                if self.is_active() {
                    rollback();
                }
                Err(e)
            }
        }
    }
}

/// Routes one subscription's events into the store while it is current.
struct SessionFeed {
    store: Weak<NotificationStore>,
    generation: u64,
}

impl SessionFeed {
    fn current(&self) -> Option<Arc<NotificationStore>> {
        self.store
            .upgrade()
            .filter(|store| store.feed_generation.load(Ordering::SeqCst) == self.generation)
    }
}

impl PushSink for SessionFeed {
    fn on_event(&self, event: PushEvent) {
        let Some(store) = self.current() else {
            return;
        };
        match event {
            PushEvent::Notification(n) => store.receive(n),
            PushEvent::UnreadCount(count) => store.apply_unread_count(count),
        }
    }

    fn on_connection(&self, state: ConnectionState) {
        if let Some(store) = self.current() {
            store.set_connection_state(state);
        }
    }
}
