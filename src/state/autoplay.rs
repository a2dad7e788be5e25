//! Cancellable autoplay loop and manual-advance gating.
//!
//! The scheduler is a two-state machine (`Stopped`/`Running`) with an epoch
//! counter as its single cancellation handle: `start` hands the spawned
//! loop a [`TickToken`] carrying the epoch and the board it targets, and
//! every stop or identity switch bumps the epoch, so an outstanding loop
//! can never fire a tick at the wrong board or after cancellation. Requests
//! already in flight are left to complete; they schedule nothing further.

#[cfg(test)]
#[path = "autoplay_test.rs"]
mod autoplay_test;

use leptos::prelude::*;

use super::cache::{CacheKey, SnapshotCache};
use crate::net::types::RequestError;

/// Fixed autoplay cadence.
pub const TICK_INTERVAL_MS: u64 = 500;

/// Cooldown after a manual advance settles, absorbing rapid re-triggers.
pub const MANUAL_COOLDOWN_MS: u64 = 120;

/// Scheduler phase.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Stopped,
    Running,
}

/// Pure scheduler state, shared via a signal between the control surface
/// and the spawned tick loop.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AutoplayState {
    phase: Phase,
    board_id: Option<String>,
    epoch: u64,
    manual_pending: bool,
}

/// Permission slip for one autoplay loop: dead as soon as the epoch moves.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TickToken {
    board_id: String,
    epoch: u64,
}

impl TickToken {
    pub fn board_id(&self) -> &str {
        &self.board_id
    }
}

impl AutoplayState {
    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }

    /// `Stopped -> Running`. Returns the token the new loop must present on
    /// every tick, or `None` when already running.
    pub fn start(&mut self, id: &str) -> Option<TickToken> {
        if self.is_running() {
            return None;
        }
        self.phase = Phase::Running;
        self.board_id = Some(id.to_owned());
        self.epoch += 1;
        Some(TickToken { board_id: id.to_owned(), epoch: self.epoch })
    }

    /// `Running -> Stopped`. Safe to call from any state; bumping the epoch
    /// kills every outstanding token without touching requests already sent.
    pub fn stop(&mut self) {
        self.phase = Phase::Stopped;
        self.board_id = None;
        self.epoch += 1;
    }

    /// Stop the loop when the active identity moves away from the board it
    /// was started for, before any tick can target the new one.
    pub fn handle_identity_change(&mut self, new_id: Option<&str>) {
        if self.is_running() && self.board_id.as_deref() != new_id {
            self.stop();
        }
    }

    /// Whether a loop holding `token` may fire a tick right now.
    pub fn tick_allowed(&self, token: &TickToken) -> bool {
        self.is_running()
            && self.epoch == token.epoch
            && self.board_id.as_deref() == Some(token.board_id.as_str())
    }

    /// Manual advance is unavailable while running or while another manual
    /// advance is pending.
    pub fn manual_locked(&self) -> bool {
        self.is_running() || self.manual_pending
    }

    /// Enter the transient pending sub-state for a manual advance.
    /// Returns `false` without state change when locked.
    pub fn begin_manual(&mut self) -> bool {
        if self.manual_locked() {
            return false;
        }
        self.manual_pending = true;
        true
    }

    pub fn finish_manual(&mut self) {
        self.manual_pending = false;
    }
}

/// Spawn the repeating advance loop for `token`'s board. The loop re-checks
/// `tick_allowed` after every sleep, so stop and identity switches take
/// effect before the next tick. Tick failures are logged and retried on the
/// next tick. No-op outside the browser.
pub fn spawn_autoplay(state: RwSignal<AutoplayState>, cache: SnapshotCache, token: TickToken) {
    #[cfg(feature = "hydrate")]
    {
        leptos::task::spawn_local(async move {
            loop {
                gloo_timers::future::sleep(std::time::Duration::from_millis(TICK_INTERVAL_MS))
                    .await;
                if !state.get_untracked().tick_allowed(&token) {
                    break;
                }
                match crate::net::api::advance(token.board_id(), 1).await {
                    Ok(_) => {
                        cache.invalidate(&CacheKey::current(token.board_id()));
                        cache.invalidate(&CacheKey::preview_next(token.board_id()));
                    }
                    Err(e) => {
                        leptos::logging::warn!("autoplay advance failed: {e}");
                    }
                }
            }
        });
    }
    #[cfg(not(feature = "hydrate"))]
    {
        let _ = (state, cache, token);
    }
}

/// One manual advance of `steps` generations, with the pending/cooldown
/// double-submission guard. Rejected while autoplay runs or another manual
/// advance is pending.
pub async fn advance_manual(
    state: RwSignal<AutoplayState>,
    cache: &SnapshotCache,
    id: &str,
    steps: u32,
) -> Result<(), RequestError> {
    let mut began = false;
    state.update(|s| began = s.begin_manual());
    if !began {
        return Err(RequestError::Validation(
            "advance unavailable while autoplay is running".to_owned(),
        ));
    }

    let result = crate::net::api::advance(id, steps).await;
    if result.is_ok() {
        cache.invalidate(&CacheKey::current(id));
        cache.invalidate(&CacheKey::preview_next(id));
    }

    #[cfg(feature = "hydrate")]
    gloo_timers::future::sleep(std::time::Duration::from_millis(MANUAL_COOLDOWN_MS)).await;
    state.update(|s| s.finish_manual());

    result.map(|_| ())
}
