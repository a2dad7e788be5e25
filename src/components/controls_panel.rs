//! Controls module: simulation driving and status.
//!
//! Mounted independently of the board module. Until the user has a board
//! (or has started interacting with the grid) the panel shows a hint; once
//! an identity is broadcast it renders the advance/play/reset controls,
//! the next-generation preview, and the current status line. Manual
//! advance and autoplay are mutually exclusive through the shared
//! scheduler state.

use leptos::prelude::*;

use crate::components::error_line::ErrorLine;
use crate::state::autoplay::{AutoplayState, spawn_autoplay};
use crate::state::cache::{CacheKey, SnapshotCache};
use crate::state::identity::IdentityBus;
use crate::state::queries::{use_active_identity, use_board_query, use_interacted};

/// The simulation-control panel.
#[component]
pub fn ControlsPanel() -> impl IntoView {
    let cache = expect_context::<StoredValue<SnapshotCache, LocalStorage>>();
    let bus = expect_context::<StoredValue<IdentityBus, LocalStorage>>();
    let autoplay = expect_context::<RwSignal<AutoplayState>>();

    let board_id = use_active_identity(bus);
    let interacted = use_interacted(bus);
    let board = use_board_query(cache, move || {
        board_id.get().map(|id| CacheKey::current(&id))
    });
    let preview = use_board_query(cache, move || {
        board_id.get().map(|id| CacheKey::preview_next(&id))
    });

    let steps = RwSignal::new(1u32);
    let advance_error = RwSignal::new(None::<String>);
    let reset_error = RwSignal::new(None::<String>);
    let reset_pending = RwSignal::new(false);

    let manual_locked = move || autoplay.get().manual_locked();
    let playing = move || autoplay.get().is_running();

    let run_advance = move |n: u32| {
        let Some(id) = board_id.get_untracked() else {
            return;
        };
        #[cfg(feature = "hydrate")]
        {
            let cache = cache.get_value();
            leptos::task::spawn_local(async move {
                if let Err(e) =
                    crate::state::autoplay::advance_manual(autoplay, &cache, &id, n).await
                {
                    advance_error.set(Some(e.to_string()));
                }
            });
        }
        #[cfg(not(feature = "hydrate"))]
        {
            let _ = (cache, id, n);
        }
    };
    let on_next = move |_| run_advance(1);
    let on_advance_n = move |_| run_advance(steps.get_untracked().max(1));

    let toggle_play = move |_| {
        if autoplay.get_untracked().is_running() {
            autoplay.update(AutoplayState::stop);
        } else if let Some(id) = board_id.get_untracked() {
            let mut token = None;
            autoplay.update(|a| token = a.start(&id));
            if let Some(token) = token {
                spawn_autoplay(autoplay, cache.get_value(), token);
            }
        }
    };

    let on_reset = move |_| {
        let Some(id) = board_id.get_untracked() else {
            return;
        };
        reset_pending.set(true);
        #[cfg(feature = "hydrate")]
        {
            let cache = cache.get_value();
            leptos::task::spawn_local(async move {
                if let Err(e) = crate::state::edit::reset_board(&cache, &id).await {
                    reset_error.set(Some(e.to_string()));
                }
                reset_pending.set(false);
            });
        }
        #[cfg(not(feature = "hydrate"))]
        {
            let _ = (cache, id);
            reset_pending.set(false);
        }
    };

    let on_steps_change = move |ev| {
        if let Ok(v) = event_target_value(&ev).parse::<u32>() {
            steps.set(v.max(1));
        }
    };

    view! {
        <div class="controls-panel">
            {move || {
                if board_id.get().is_none() {
                    if interacted.get() {
                        return view! {
                            <div class="controls-panel__card">
                                <h2>"Controls"</h2>
                                <p>"Loading controls..."</p>
                            </div>
                        }
                            .into_any();
                    }
                    return view! {
                        <p class="controls-panel__hint">"Create a board on the left."</p>
                    }
                        .into_any();
                }
                let q = board.get();
                if let Some(err) = q.error {
                    return view! {
                        <p class="controls-panel__error">
                            {format!("Failed to load board: {err}")}
                        </p>
                    }
                        .into_any();
                }
                if q.snapshot.is_none() {
                    return view! {
                        <div class="controls-panel__card">
                            <h2>"Controls"</h2>
                            <p>"Loading controls..."</p>
                        </div>
                    }
                        .into_any();
                }
                view! {
                    <div class="controls-panel__card">
                        <h2>"Controls"</h2>
                        <div class="controls-panel__buttons">
                            <button on:click=on_next disabled=manual_locked>
                                "Next"
                            </button>
                            <div class="controls-panel__advance">
                                <input
                                    type="number"
                                    min="1"
                                    prop:value=move || steps.get().to_string()
                                    on:change=on_steps_change
                                />
                                <button on:click=on_advance_n disabled=manual_locked>
                                    "Advance N"
                                </button>
                            </div>
                            <button on:click=toggle_play>
                                {move || if playing() { "Stop" } else { "Play" }}
                            </button>
                            <button on:click=on_reset disabled=move || reset_pending.get()>
                                "Reset"
                            </button>
                        </div>
                    </div>
                }
                    .into_any()
            }}
            {move || {
                advance_error.get().map(|msg| {
                    view! { <ErrorLine prefix="Advance failed" message=msg signal=advance_error/> }
                })
            }}
            {move || {
                reset_error.get().map(|msg| {
                    view! { <ErrorLine prefix="Reset failed" message=msg signal=reset_error/> }
                })
            }}
            {move || {
                board_id.get().is_some().then(|| {
                    let p = preview.get();
                    let alive_next = p.snapshot.map_or_else(
                        || "Alive next: ...".to_owned(),
                        |s| format!("Alive next: {}", s.alive_count),
                    );
                    view! {
                        <div class="controls-panel__preview">
                            <strong>"Preview Next"</strong>
                            {p
                                .error
                                .map(|e| {
                                    view! {
                                        <p class="controls-panel__error">
                                            {format!("Preview failed: {e}")}
                                        </p>
                                    }
                                })}
                            <p class="controls-panel__dim">{alive_next}</p>
                        </div>
                    }
                })
            }}
            {move || {
                board.get().snapshot.map(|s| {
                    view! {
                        <p class="controls-panel__dim">
                            {format!(
                                "Current: Gen {} \u{2022} Alive {}",
                                s.generation,
                                s.alive_count,
                            )}
                        </p>
                    }
                })
            }}
        </div>
    }
}
