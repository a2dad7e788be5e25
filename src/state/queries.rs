//! Signal bridges between the synchronization core and the Leptos UI.
//!
//! Components never talk to the cache or the identity bus directly from
//! reactive closures; they hold `StoredValue` handles (provided by the app
//! shell) and use these hooks, which subscribe on mount, feed deliveries
//! into signals, refetch stale keys, and unsubscribe on cleanup.

use leptos::prelude::*;

use super::cache::{CacheKey, QueryView, SnapshotCache, Subscription};
use super::identity::{BusListener, IdentityBus};
#[cfg(feature = "hydrate")]
use crate::net::types::{BoardSnapshot, RequestError};

/// Route a cache key to the endpoint that refreshes it.
#[cfg(feature = "hydrate")]
async fn fetch_for(key: CacheKey) -> Result<BoardSnapshot, RequestError> {
    match &key {
        CacheKey::Current(id) => crate::net::api::read_board(id).await,
        CacheKey::PreviewNext(id) => crate::net::api::preview_next(id).await,
    }
}

/// Kick off a deduplicated background refresh for `key` when it is missing
/// or stale. No-op outside the browser and when a fetch is already in
/// flight.
pub fn spawn_refresh(cache: &SnapshotCache, key: &CacheKey) {
    #[cfg(feature = "hydrate")]
    {
        if !cache.needs_fetch(key) {
            return;
        }
        let cache = cache.clone();
        let key = key.clone();
        leptos::task::spawn_local(async move {
            let fetch_key = key.clone();
            cache.ensure_fresh(&key, move || fetch_for(fetch_key.clone())).await;
        });
    }
    #[cfg(not(feature = "hydrate"))]
    {
        let _ = (cache, key);
    }
}

/// Subscribe a component to the key produced by `key`, re-subscribing when
/// it changes. The returned signal always holds the latest settled view;
/// stale deliveries trigger a refetch, which keeps subscribed keys fresh
/// under invalidation.
pub fn use_board_query(
    cache: StoredValue<SnapshotCache, LocalStorage>,
    key: impl Fn() -> Option<CacheKey> + 'static,
) -> RwSignal<QueryView> {
    let view = RwSignal::new(QueryView::default());
    let subscription: StoredValue<Option<Subscription>, LocalStorage> =
        StoredValue::new_local(None);

    Effect::new(move || {
        let next = key();
        if let Some(old) = subscription.try_update_value(Option::take).flatten() {
            old.unsubscribe();
        }
        let Some(k) = next else {
            view.set(QueryView::default());
            return;
        };
        let cache = cache.get_value();
        let listener_cache = cache.clone();
        let listener_key = k.clone();
        let sub = cache.subscribe(&k, move |v| {
            view.set(v.clone());
            if v.stale && !v.fetching {
                spawn_refresh(&listener_cache, &listener_key);
            }
        });
        spawn_refresh(&cache, &k);
        subscription.set_value(Some(sub));
    });

    on_cleanup(move || {
        if let Some(old) = subscription.try_update_value(Option::take).flatten() {
            old.unsubscribe();
        }
    });

    view
}

/// The active board identity as a signal, converging across modules.
pub fn use_active_identity(
    bus: StoredValue<IdentityBus, LocalStorage>,
) -> RwSignal<Option<String>> {
    let id = RwSignal::new(None);
    let handle = bus.with_value(|b| {
        // Synchronous initial delivery seeds the signal.
        b.on_identity_changed(move |next| id.set(next.map(ToOwned::to_owned)))
    });
    let handle = StoredValue::new_local(handle);
    on_cleanup(move || handle.with_value(BusListener::unsubscribe));
    id
}

/// Whether the user has interacted with the grid yet, as a signal.
pub fn use_interacted(bus: StoredValue<IdentityBus, LocalStorage>) -> RwSignal<bool> {
    let interacted = RwSignal::new(bus.with_value(IdentityBus::was_interacted));
    let handle = bus.with_value(|b| b.on_interaction(move || interacted.set(true)));
    let handle = StoredValue::new_local(handle);
    on_cleanup(move || handle.with_value(BusListener::unsubscribe));
    interacted
}
