//! Optimistic grid edits and board lifecycle mutations.
//!
//! A cell toggle is applied to the cache immediately (same generation,
//! exact alive-count recount), then confirmed or rolled back when the
//! update request settles. Settlement is version-guarded: a response for an
//! edit that has since been superseded by a newer write never overwrites
//! the newer value, it invalidates the key instead.

#[cfg(test)]
#[path = "edit_test.rs"]
mod edit_test;

use super::cache::{CacheKey, SnapshotCache};
use super::identity::IdentityBus;
use crate::net::api;
use crate::net::types::{BoardId, BoardSnapshot, RequestError};

/// Side length of the default board uploaded when no identity exists yet.
pub const DEFAULT_SIZE: usize = 20;

/// An all-dead `height`×`width` grid.
pub fn empty_grid(height: usize, width: usize) -> Vec<Vec<bool>> {
    vec![vec![false; width]; height]
}

/// Exact count of live cells. Always a full recount, never an increment,
/// so a stale base snapshot cannot make the count drift.
pub fn count_alive(grid: &[Vec<bool>]) -> usize {
    grid.iter().map(|row| row.iter().filter(|c| **c).count()).sum()
}

/// The grid with the cell at `(row, col)` flipped, or `None` when the
/// coordinates fall outside the grid.
pub fn toggled_grid(grid: &[Vec<bool>], row: usize, col: usize) -> Option<Vec<Vec<bool>>> {
    if col >= grid.get(row)?.len() {
        return None;
    }
    let mut next = grid.to_vec();
    next[row][col] = !next[row][col];
    Some(next)
}

/// Bookkeeping for one staged toggle: the snapshot to restore on failure,
/// the cache version of the optimistic write, and the grid sent to the
/// server.
#[derive(Clone, Debug)]
pub struct EditTicket {
    pub prev: BoardSnapshot,
    pub version: u64,
    pub candidate: Vec<Vec<bool>>,
}

/// Stage a toggle of `(row, col)`: capture the pre-edit snapshot from the
/// latest cache value (which may itself be an unsettled optimistic value,
/// so overlapping rollbacks compose) and write the optimistic snapshot.
///
/// Rejects with a validation error, touching neither cache nor network,
/// when no snapshot is cached for `id` or the cell is out of bounds.
pub fn stage_toggle(
    cache: &SnapshotCache,
    id: &str,
    row: usize,
    col: usize,
) -> Result<EditTicket, RequestError> {
    let key = CacheKey::current(id);
    let Some(prev) = cache.read(&key) else {
        return Err(RequestError::Validation("no board loaded".to_owned()));
    };
    let base = prev.grid_or_empty();
    let Some(candidate) = toggled_grid(&base, row, col) else {
        return Err(RequestError::Validation(format!("cell ({row}, {col}) out of bounds")));
    };

    // Same generation: only the server advances it.
    let optimistic = BoardSnapshot {
        alive_count: count_alive(&candidate),
        grid: Some(candidate.clone()),
        ..prev.clone()
    };
    let version = cache.write(&key, optimistic);
    Ok(EditTicket { prev, version, candidate })
}

/// Settle a staged toggle with the update request's outcome.
///
/// Success commits the server-confirmed snapshot (the server is
/// authoritative for generation, grid, and alive count) and invalidates
/// the now-stale preview. Failure rolls back to the captured pre-edit
/// snapshot and returns the error for module-local display. Either way, a
/// settlement whose optimistic write was superseded invalidates instead of
/// overwriting the newer value.
pub fn settle_toggle(
    cache: &SnapshotCache,
    id: &str,
    ticket: EditTicket,
    result: Result<BoardSnapshot, RequestError>,
) -> Result<(), RequestError> {
    let key = CacheKey::current(id);
    match result {
        Ok(confirmed) => {
            if !cache.write_if_version(&key, confirmed, ticket.version) {
                cache.invalidate(&key);
            }
            cache.invalidate(&CacheKey::preview_next(id));
            Ok(())
        }
        Err(error) => {
            if !cache.write_if_version(&key, ticket.prev, ticket.version) {
                cache.invalidate(&key);
            }
            Err(error)
        }
    }
}

/// Toggle one cell optimistically and reconcile with the server.
pub async fn toggle_cell(
    cache: &SnapshotCache,
    id: &str,
    row: usize,
    col: usize,
) -> Result<(), RequestError> {
    let ticket = stage_toggle(cache, id, row, col)?;
    let result = api::update_grid(id, ticket.candidate.clone()).await;
    settle_toggle(cache, id, ticket, result)
}

/// Upload an empty default-size board and publish its identity to every
/// module through the broadcaster.
pub async fn create_default_board(bus: &IdentityBus) -> Result<BoardId, RequestError> {
    let id = api::create_board(Some(empty_grid(DEFAULT_SIZE, DEFAULT_SIZE))).await?;
    bus.set_active(&id);
    Ok(id)
}

/// Reset the board to all-dead at its current dimensions. The server
/// response is written through and the preview invalidated.
pub async fn reset_board(cache: &SnapshotCache, id: &str) -> Result<(), RequestError> {
    let key = CacheKey::current(id);
    let (height, width) = cache
        .read(&key)
        .map_or((DEFAULT_SIZE, DEFAULT_SIZE), |s| (s.height, s.width));
    let confirmed = api::update_grid(id, empty_grid(height, width)).await?;
    cache.write(&key, confirmed);
    cache.invalidate(&CacheKey::preview_next(id));
    Ok(())
}
