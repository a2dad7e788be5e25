use std::cell::RefCell;
use std::rc::Rc;

use super::*;

fn snapshot(generation: u64, alive: usize) -> BoardSnapshot {
    BoardSnapshot {
        id: "b-1".to_owned(),
        generation,
        width: 3,
        height: 3,
        alive_count: alive,
        grid: Some(vec![vec![false; 3]; 3]),
    }
}

fn current() -> CacheKey {
    CacheKey::current("b-1")
}

fn record_views(cache: &SnapshotCache, key: &CacheKey) -> (Rc<RefCell<Vec<QueryView>>>, Subscription) {
    let views = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&views);
    let sub = cache.subscribe(key, move |v| sink.borrow_mut().push(v.clone()));
    (views, sub)
}

// =============================================================
// Subscribe / write / read
// =============================================================

#[test]
fn read_returns_nothing_before_any_write() {
    let cache = SnapshotCache::new();
    assert!(cache.read(&current()).is_none());
    assert!(cache.view(&current()).loading());
}

#[test]
fn subscribe_delivers_current_value_synchronously() {
    let cache = SnapshotCache::new();
    cache.write(&current(), snapshot(0, 2));

    let (views, _sub) = record_views(&cache, &current());
    assert_eq!(views.borrow().len(), 1);
    assert_eq!(views.borrow()[0].snapshot.as_ref().map(|s| s.alive_count), Some(2));
}

#[test]
fn write_notifies_every_listener() {
    let cache = SnapshotCache::new();
    let (first, _s1) = record_views(&cache, &current());
    let (second, _s2) = record_views(&cache, &current());

    cache.write(&current(), snapshot(1, 4));

    assert_eq!(first.borrow().last().and_then(|v| v.snapshot.as_ref().map(|s| s.generation)), Some(1));
    assert_eq!(second.borrow().last().and_then(|v| v.snapshot.as_ref().map(|s| s.generation)), Some(1));
}

#[test]
fn unsubscribe_stops_delivery_and_is_idempotent() {
    let cache = SnapshotCache::new();
    let (views, sub) = record_views(&cache, &current());

    sub.unsubscribe();
    sub.unsubscribe();
    cache.write(&current(), snapshot(0, 1));

    assert_eq!(views.borrow().len(), 1);
}

// =============================================================
// Fetch dedup and settlement
// =============================================================

#[test]
fn begin_fetch_dedupes_concurrent_requests() {
    let cache = SnapshotCache::new();
    let first = cache.begin_fetch(&current());
    let second = cache.begin_fetch(&current());

    assert!(first.is_some());
    assert!(second.is_none());
}

#[test]
fn different_keys_fetch_independently() {
    let cache = SnapshotCache::new();
    assert!(cache.begin_fetch(&CacheKey::current("b-1")).is_some());
    assert!(cache.begin_fetch(&CacheKey::preview_next("b-1")).is_some());
}

#[test]
fn complete_fetch_stores_result_and_clears_in_flight() {
    let cache = SnapshotCache::new();
    let ticket = cache.begin_fetch(&current()).expect("ticket");

    let outcome = cache.complete_fetch(ticket, Ok(snapshot(0, 0)));

    assert_eq!(outcome, FetchOutcome::Stored);
    let view = cache.view(&current());
    assert!(!view.fetching);
    assert!(!view.stale);
    assert!(view.snapshot.is_some());
    assert!(cache.begin_fetch(&current()).is_some());
}

#[test]
fn fetch_failure_is_recorded_as_query_error() {
    let cache = SnapshotCache::new();
    cache.write(&current(), snapshot(0, 1));
    let ticket = cache.begin_fetch(&current()).expect("ticket");

    let outcome = cache.complete_fetch(
        ticket,
        Err(RequestError::Server { status: 500, message: "boom".to_owned() }),
    );

    assert_eq!(outcome, FetchOutcome::Failed);
    let view = cache.view(&current());
    assert_eq!(view.error.as_ref().and_then(RequestError::status), Some(500));
    // the last known snapshot survives a failed refresh
    assert_eq!(view.snapshot.map(|s| s.alive_count), Some(1));
}

#[test]
fn write_clears_a_recorded_error() {
    let cache = SnapshotCache::new();
    let ticket = cache.begin_fetch(&current()).expect("ticket");
    cache.complete_fetch(ticket, Err(RequestError::Timeout));

    cache.write(&current(), snapshot(0, 0));
    assert!(cache.view(&current()).error.is_none());
}

// =============================================================
// Invalidation and ordering
// =============================================================

#[test]
fn invalidate_marks_the_key_for_refetch() {
    let cache = SnapshotCache::new();
    cache.write(&current(), snapshot(0, 0));
    assert!(!cache.needs_fetch(&current()));

    cache.invalidate(&current());
    assert!(cache.needs_fetch(&current()));
}

#[test]
fn invalidate_during_flight_forces_another_fetch() {
    let cache = SnapshotCache::new();
    let ticket = cache.begin_fetch(&current()).expect("ticket");
    cache.invalidate(&current());

    let outcome = cache.complete_fetch(ticket, Ok(snapshot(1, 0)));

    // the response lands but is not accepted as final
    assert_eq!(outcome, FetchOutcome::Refetch);
    let view = cache.view(&current());
    assert!(view.stale);
    assert_eq!(view.snapshot.map(|s| s.generation), Some(1));
    assert!(cache.begin_fetch(&current()).is_some());
}

#[test]
fn write_during_flight_supersedes_the_fetch_response() {
    let cache = SnapshotCache::new();
    cache.write(&current(), snapshot(0, 0));
    let ticket = cache.begin_fetch(&current()).expect("ticket");

    // an optimistic edit settles while the read is in flight
    cache.write(&current(), snapshot(0, 5));
    let outcome = cache.complete_fetch(ticket, Ok(snapshot(0, 0)));

    assert_eq!(outcome, FetchOutcome::Superseded);
    assert_eq!(cache.read(&current()).map(|s| s.alive_count), Some(5));
}

#[test]
fn write_if_version_applies_only_without_newer_write() {
    let cache = SnapshotCache::new();
    let version = cache.write(&current(), snapshot(0, 1));

    assert!(cache.write_if_version(&current(), snapshot(0, 2), version));

    // the first handle's version is now behind
    assert!(!cache.write_if_version(&current(), snapshot(0, 9), version));
    assert_eq!(cache.read(&current()).map(|s| s.alive_count), Some(2));
}

// =============================================================
// ensure_fresh
// =============================================================

#[test]
fn ensure_fresh_fetches_and_stores_once() {
    let cache = SnapshotCache::new();
    let calls = Rc::new(RefCell::new(0_u32));

    let counter = Rc::clone(&calls);
    futures::executor::block_on(cache.ensure_fresh(&current(), move || {
        *counter.borrow_mut() += 1;
        async move { Ok(snapshot(0, 0)) }
    }));

    assert_eq!(*calls.borrow(), 1);
    assert!(cache.read(&current()).is_some());
    assert!(!cache.view(&current()).stale);
}

#[test]
fn ensure_fresh_skips_when_a_fetch_is_in_flight() {
    let cache = SnapshotCache::new();
    let _ticket = cache.begin_fetch(&current()).expect("ticket");

    let calls = Rc::new(RefCell::new(0_u32));
    let counter = Rc::clone(&calls);
    futures::executor::block_on(cache.ensure_fresh(&current(), move || {
        *counter.borrow_mut() += 1;
        async move { Ok(snapshot(0, 0)) }
    }));

    assert_eq!(*calls.borrow(), 0);
}

#[test]
fn ensure_fresh_refetches_after_mid_flight_invalidation() {
    let cache = SnapshotCache::new();
    let calls = Rc::new(RefCell::new(0_u64));

    // the first response finds its key invalidated and triggers exactly one
    // more fetch
    let counter = Rc::clone(&calls);
    let invalidator = cache.clone();
    futures::executor::block_on(cache.ensure_fresh(&current(), move || {
        let n = {
            let mut calls = counter.borrow_mut();
            *calls += 1;
            *calls
        };
        if n == 1 {
            invalidator.invalidate(&current());
        }
        async move { Ok(snapshot(n, 0)) }
    }));

    assert_eq!(*calls.borrow(), 2);
    let view = cache.view(&current());
    assert!(!view.stale);
    assert_eq!(view.snapshot.map(|s| s.generation), Some(2));
}
