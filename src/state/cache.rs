//! Keyed, invalidation-driven cache of server board snapshots.
//!
//! Both UI modules read board state exclusively through this cache; it is
//! constructed once per session and passed by context, never as module-level
//! state. Network activity happens only through [`SnapshotCache::ensure_fresh`],
//! which guarantees at most one in-flight fetch per key.
//!
//! ORDERING
//! ========
//! Every settled write bumps a per-key version counter. A fetch records the
//! version it started from; a completion that finds the version moved (an
//! optimistic edit or a mutation response landed first) is discarded rather
//! than clobbering the newer value. A fetch whose key was invalidated while
//! it was in flight stores its result but stays stale and reports
//! [`FetchOutcome::Refetch`], so `ensure_fresh` immediately runs the fetcher
//! once more instead of accepting the response as final.

#[cfg(test)]
#[path = "cache_test.rs"]
mod cache_test;

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use crate::net::types::{BoardId, BoardSnapshot, RequestError};

/// One cacheable view of a board.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// The board's current state.
    Current(BoardId),
    /// The non-mutating one-generation-ahead preview.
    PreviewNext(BoardId),
}

impl CacheKey {
    pub fn current(id: &str) -> Self {
        Self::Current(id.to_owned())
    }

    pub fn preview_next(id: &str) -> Self {
        Self::PreviewNext(id.to_owned())
    }

    /// The board identity this key belongs to.
    pub fn board_id(&self) -> &str {
        match self {
            Self::Current(id) | Self::PreviewNext(id) => id,
        }
    }
}

/// What a subscriber sees for one key: the last known snapshot plus
/// query-level status, mirroring what the UI needs to render.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryView {
    pub snapshot: Option<BoardSnapshot>,
    pub error: Option<RequestError>,
    pub fetching: bool,
    pub stale: bool,
}

impl QueryView {
    /// True while nothing has arrived yet and no failure has been recorded.
    pub fn loading(&self) -> bool {
        self.snapshot.is_none() && self.error.is_none()
    }
}

/// How a completed fetch settled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Response stored and listeners notified.
    Stored,
    /// A newer write settled first; the response was discarded.
    Superseded,
    /// The key was invalidated mid-flight; run the fetcher again.
    Refetch,
    /// The fetch failed; the error is recorded on the entry.
    Failed,
}

/// Token for one in-flight fetch, returned by [`SnapshotCache::begin_fetch`].
#[derive(Debug)]
pub struct FetchTicket {
    key: CacheKey,
    ticket: u64,
}

type ListenerFn = Rc<dyn Fn(&QueryView)>;

struct Listener {
    id: u64,
    callback: ListenerFn,
}

struct Fetch {
    ticket: u64,
    base_version: u64,
    invalidated: bool,
}

#[derive(Default)]
struct Entry {
    snapshot: Option<BoardSnapshot>,
    error: Option<RequestError>,
    stale: bool,
    version: u64,
    fetch: Option<Fetch>,
    listeners: Vec<Listener>,
}

impl Entry {
    fn view(&self) -> QueryView {
        QueryView {
            snapshot: self.snapshot.clone(),
            error: self.error.clone(),
            fetching: self.fetch.is_some(),
            stale: self.stale,
        }
    }
}

#[derive(Default)]
struct CacheInner {
    entries: HashMap<CacheKey, Entry>,
    next_listener: u64,
    next_ticket: u64,
}

/// Shared snapshot cache. Cheap to clone; clones share the same entries.
#[derive(Clone, Default)]
pub struct SnapshotCache {
    inner: Rc<RefCell<CacheInner>>,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last known snapshot for `key`, without triggering any network activity.
    pub fn read(&self, key: &CacheKey) -> Option<BoardSnapshot> {
        self.inner
            .borrow()
            .entries
            .get(key)
            .and_then(|e| e.snapshot.clone())
    }

    /// Current query-level view for `key`.
    pub fn view(&self, key: &CacheKey) -> QueryView {
        self.inner
            .borrow()
            .entries
            .get(key)
            .map(Entry::view)
            .unwrap_or_default()
    }

    /// Register `listener` for `key`. The current view is delivered
    /// synchronously before this returns, so late subscribers never miss
    /// the initial state.
    pub fn subscribe(
        &self,
        key: &CacheKey,
        listener: impl Fn(&QueryView) + 'static,
    ) -> Subscription {
        let callback: ListenerFn = Rc::new(listener);
        let (id, view) = {
            let mut inner = self.inner.borrow_mut();
            let id = inner.next_listener;
            inner.next_listener += 1;
            let entry = inner.entries.entry(key.clone()).or_default();
            entry.listeners.push(Listener { id, callback: Rc::clone(&callback) });
            (id, entry.view())
        };
        let subscription = Subscription {
            inner: Rc::downgrade(&self.inner),
            key: key.clone(),
            id,
        };
        // Initial delivery happens outside the borrow so the listener may
        // re-enter the cache.
        callback(&view);
        subscription
    }

    /// Synchronously overwrite the cached value and notify listeners.
    /// Returns the new version of the entry, for guarded settlement via
    /// [`SnapshotCache::write_if_version`].
    pub fn write(&self, key: &CacheKey, snapshot: BoardSnapshot) -> u64 {
        let version = {
            let mut inner = self.inner.borrow_mut();
            let entry = inner.entries.entry(key.clone()).or_default();
            Self::store(entry, snapshot)
        };
        self.notify(key);
        version
    }

    /// Overwrite the cached value only if no newer write has settled since
    /// `expected` was observed. Returns whether the write was applied.
    pub fn write_if_version(&self, key: &CacheKey, snapshot: BoardSnapshot, expected: u64) -> bool {
        let applied = {
            let mut inner = self.inner.borrow_mut();
            let entry = inner.entries.entry(key.clone()).or_default();
            if entry.version == expected {
                Self::store(entry, snapshot);
                true
            } else {
                false
            }
        };
        if applied {
            self.notify(key);
        }
        applied
    }

    /// Mark `key` stale so the next [`SnapshotCache::ensure_fresh`] refetches.
    /// An in-flight fetch is flagged so its completion is treated as stale
    /// rather than accepted as final.
    pub fn invalidate(&self, key: &CacheKey) {
        {
            let mut inner = self.inner.borrow_mut();
            let entry = inner.entries.entry(key.clone()).or_default();
            entry.stale = true;
            if let Some(fetch) = entry.fetch.as_mut() {
                fetch.invalidated = true;
            }
        }
        self.notify(key);
    }

    /// Whether a fresh fetch should be started for `key` right now.
    pub fn needs_fetch(&self, key: &CacheKey) -> bool {
        let inner = self.inner.borrow();
        match inner.entries.get(key) {
            None => true,
            Some(e) => e.fetch.is_none() && (e.snapshot.is_none() || e.stale),
        }
    }

    /// Mark `key` in flight and hand back a ticket, or `None` when a fetch
    /// for the key is already in flight (the dedup guarantee).
    pub fn begin_fetch(&self, key: &CacheKey) -> Option<FetchTicket> {
        let ticket = {
            let mut inner = self.inner.borrow_mut();
            let ticket = inner.next_ticket;
            let entry = inner.entries.entry(key.clone()).or_default();
            if entry.fetch.is_some() {
                return None;
            }
            entry.fetch = Some(Fetch {
                ticket,
                base_version: entry.version,
                invalidated: false,
            });
            inner.next_ticket += 1;
            ticket
        };
        self.notify(key);
        Some(FetchTicket { key: key.clone(), ticket })
    }

    /// Settle the fetch identified by `ticket` with the network result.
    pub fn complete_fetch(
        &self,
        ticket: FetchTicket,
        result: Result<BoardSnapshot, RequestError>,
    ) -> FetchOutcome {
        let outcome = {
            let mut inner = self.inner.borrow_mut();
            let Some(entry) = inner.entries.get_mut(&ticket.key) else {
                return FetchOutcome::Superseded;
            };
            let Some(fetch) = entry.fetch.take_if(|f| f.ticket == ticket.ticket) else {
                return FetchOutcome::Superseded;
            };

            match result {
                Ok(snapshot) => {
                    if fetch.invalidated {
                        // Not accepted as final; one more fetch follows. The
                        // value still lands unless a newer write beat it.
                        if fetch.base_version == entry.version {
                            Self::store(entry, snapshot);
                            entry.stale = true;
                        }
                        FetchOutcome::Refetch
                    } else if fetch.base_version != entry.version {
                        // A write settled while we were in flight; by arrival
                        // order the response is older than the cached value.
                        FetchOutcome::Superseded
                    } else {
                        Self::store(entry, snapshot);
                        FetchOutcome::Stored
                    }
                }
                Err(_) if fetch.invalidated => FetchOutcome::Refetch,
                Err(error) => {
                    entry.error = Some(error);
                    FetchOutcome::Failed
                }
            }
        };
        self.notify(&ticket.key);
        outcome
    }

    /// Fetch `key` unless a fetch is already in flight, storing the result
    /// and notifying listeners. Re-runs the fetcher when the key was
    /// invalidated while the request was in flight.
    pub async fn ensure_fresh<F, Fut>(&self, key: &CacheKey, fetcher: F)
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<BoardSnapshot, RequestError>>,
    {
        loop {
            let Some(ticket) = self.begin_fetch(key) else {
                return;
            };
            let result = fetcher().await;
            if self.complete_fetch(ticket, result) != FetchOutcome::Refetch {
                return;
            }
        }
    }

    fn store(entry: &mut Entry, snapshot: BoardSnapshot) -> u64 {
        entry.version += 1;
        entry.snapshot = Some(snapshot);
        entry.stale = false;
        entry.error = None;
        entry.version
    }

    fn notify(&self, key: &CacheKey) {
        // Snapshot the listener list and the view first; callbacks run
        // without the borrow held and may re-enter the cache.
        let notifications: Option<(Vec<ListenerFn>, QueryView)> = {
            let inner = self.inner.borrow();
            inner.entries.get(key).map(|entry| {
                (
                    entry.listeners.iter().map(|l| Rc::clone(&l.callback)).collect(),
                    entry.view(),
                )
            })
        };
        if let Some((listeners, view)) = notifications {
            for listener in listeners {
                listener(&view);
            }
        }
    }
}

/// Handle returned by [`SnapshotCache::subscribe`]. Unsubscribing is
/// idempotent; a dropped handle without an explicit unsubscribe keeps the
/// listener alive for the cache's lifetime.
pub struct Subscription {
    inner: Weak<RefCell<CacheInner>>,
    key: CacheKey,
    id: u64,
}

impl Subscription {
    pub fn unsubscribe(&self) {
        if let Some(inner) = self.inner.upgrade() {
            let mut inner = inner.borrow_mut();
            if let Some(entry) = inner.entries.get_mut(&self.key) {
                entry.listeners.retain(|l| l.id != self.id);
            }
        }
    }
}
