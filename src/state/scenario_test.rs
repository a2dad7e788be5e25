//! Scenario tests driving the synchronization core against a scripted
//! server double that implements the standard Game of Life rule.

use super::cache::{CacheKey, FetchOutcome, SnapshotCache};
use super::edit;
use crate::net::types::BoardSnapshot;

/// Server transition rule double: 8-neighbor Moore neighborhood on a fixed
/// finite grid with no wraparound. A live cell survives with 2 or 3 live
/// neighbors; a dead cell becomes live with exactly 3.
fn life_step(grid: &[Vec<bool>]) -> Vec<Vec<bool>> {
    let height = grid.len();
    let width = grid.first().map_or(0, Vec::len);
    let mut next = vec![vec![false; width]; height];
    for (r, row) in next.iter_mut().enumerate() {
        for (c, cell) in row.iter_mut().enumerate() {
            let mut neighbors = 0;
            for dr in -1_i64..=1 {
                for dc in -1_i64..=1 {
                    if dr == 0 && dc == 0 {
                        continue;
                    }
                    let (nr, nc) = (r as i64 + dr, c as i64 + dc);
                    if nr >= 0
                        && nc >= 0
                        && (nr as usize) < height
                        && (nc as usize) < width
                        && grid[nr as usize][nc as usize]
                    {
                        neighbors += 1;
                    }
                }
            }
            *cell = if grid[r][c] { neighbors == 2 || neighbors == 3 } else { neighbors == 3 };
        }
    }
    next
}

/// What the server would respond with for `grid` at `generation`.
fn server_snapshot(id: &str, generation: u64, grid: Vec<Vec<bool>>) -> BoardSnapshot {
    BoardSnapshot {
        id: id.to_owned(),
        generation,
        width: grid.first().map_or(0, Vec::len),
        height: grid.len(),
        alive_count: edit::count_alive(&grid),
        grid: Some(grid),
    }
}

fn grid_from(rows: &[&[u8]]) -> Vec<Vec<bool>> {
    rows.iter().map(|row| row.iter().map(|c| *c == 1).collect()).collect()
}

// =============================================================
// The rule contract itself
// =============================================================

#[test]
fn blinker_oscillates_with_period_two() {
    let vertical = grid_from(&[
        &[0, 1, 0, 0, 0],
        &[0, 1, 0, 0, 0],
        &[0, 1, 0, 0, 0],
        &[0, 0, 0, 0, 0],
        &[0, 0, 0, 0, 0],
    ]);
    let horizontal = grid_from(&[
        &[0, 0, 0, 0, 0],
        &[1, 1, 1, 0, 0],
        &[0, 0, 0, 0, 0],
        &[0, 0, 0, 0, 0],
        &[0, 0, 0, 0, 0],
    ]);

    assert_eq!(life_step(&vertical), horizontal);
    assert_eq!(life_step(&horizontal), vertical);
}

#[test]
fn underpopulated_cells_die_and_three_neighbors_give_birth() {
    let lonely = grid_from(&[&[1, 0], &[0, 0]]);
    assert_eq!(edit::count_alive(&life_step(&lonely)), 0);

    let corner_trio = grid_from(&[&[1, 1], &[1, 0]]);
    // the empty corner has exactly three live neighbors: a block forms
    assert_eq!(edit::count_alive(&life_step(&corner_trio)), 4);
}

#[test]
fn edges_do_not_wrap_around() {
    // a vertical pair hugging the left edge dies out instead of finding
    // wrapped neighbors on the right
    let pair = grid_from(&[&[1, 0, 0], &[1, 0, 0], &[0, 0, 0]]);
    assert_eq!(edit::count_alive(&life_step(&pair)), 0);
}

// =============================================================
// End-to-end scenarios
// =============================================================

#[test]
fn upload_toggle_confirm_leaves_cache_matching_the_server_exactly() {
    // Upload an empty 10x10 grid -> identity X -> read shows aliveCount 0
    // -> toggle (0,0) -> cache shows 1 before the update settles -> server
    // confirms aliveCount 1 at generation 0 -> cache equals the response.
    let cache = SnapshotCache::new();
    let key = CacheKey::current("X");

    let ticket = cache.begin_fetch(&key).expect("initial read");
    let outcome = cache.complete_fetch(ticket, Ok(server_snapshot("X", 0, edit::empty_grid(10, 10))));
    assert_eq!(outcome, FetchOutcome::Stored);
    assert_eq!(cache.read(&key).expect("snapshot").alive_count, 0);

    let staged = edit::stage_toggle(&cache, "X", 0, 0).expect("staged");
    let optimistic = cache.read(&key).expect("optimistic");
    assert_eq!(optimistic.alive_count, 1);
    assert_eq!(optimistic.generation, 0);

    let confirmed = server_snapshot("X", 0, staged.candidate.clone());
    edit::settle_toggle(&cache, "X", staged, Ok(confirmed.clone())).expect("settled");
    assert_eq!(cache.read(&key), Some(confirmed));
}

#[test]
fn advance_settles_by_invalidation_and_the_refetch_returns_the_stepped_grid() {
    let cache = SnapshotCache::new();
    let key = CacheKey::current("Y");
    let preview_key = CacheKey::preview_next("Y");

    let blinker = grid_from(&[
        &[0, 1, 0],
        &[0, 1, 0],
        &[0, 1, 0],
    ]);
    cache.write(&key, server_snapshot("Y", 0, blinker.clone()));
    cache.write(&preview_key, server_snapshot("Y", 1, life_step(&blinker)));

    // one advance tick: the mutation settles by invalidating both keys
    cache.invalidate(&key);
    cache.invalidate(&preview_key);
    assert!(cache.needs_fetch(&key));
    assert!(cache.needs_fetch(&preview_key));

    let stepped = life_step(&blinker);
    let ticket = cache.begin_fetch(&key).expect("refetch");
    cache.complete_fetch(ticket, Ok(server_snapshot("Y", 1, stepped.clone())));

    let refreshed = cache.read(&key).expect("refetched snapshot");
    assert_eq!(refreshed.generation, 1);
    assert_eq!(refreshed.grid, Some(stepped.clone()));

    let ticket = cache.begin_fetch(&preview_key).expect("preview refetch");
    cache.complete_fetch(ticket, Ok(server_snapshot("Y", 2, life_step(&stepped))));
    assert_eq!(cache.read(&preview_key).expect("preview").grid, Some(blinker));
}

#[test]
fn preview_never_mutates_what_the_current_key_sees() {
    let cache = SnapshotCache::new();
    let key = CacheKey::current("Y");
    let preview_key = CacheKey::preview_next("Y");

    let glider_seed = grid_from(&[&[0, 1, 0], &[0, 0, 1], &[1, 1, 1]]);
    cache.write(&key, server_snapshot("Y", 7, glider_seed.clone()));

    let ticket = cache.begin_fetch(&preview_key).expect("preview fetch");
    cache.complete_fetch(ticket, Ok(server_snapshot("Y", 8, life_step(&glider_seed))));

    let current = cache.read(&key).expect("current");
    assert_eq!(current.generation, 7);
    assert_eq!(current.grid, Some(glider_seed));
}
