//! Board module: displays and edits the active board.
//!
//! Mounted independently of the controls module; the only shared state is
//! the snapshot cache and the identity bus, both taken from context. On
//! first mount with no persisted identity, uploads a default empty board
//! and publishes the new identity through the broadcaster.

use leptos::prelude::*;

use crate::components::board_grid::BoardGrid;
use crate::components::error_line::ErrorLine;
use crate::state::cache::{CacheKey, SnapshotCache};
use crate::state::identity::IdentityBus;
use crate::state::queries::{use_active_identity, use_board_query};

/// The board renderer/editor.
#[component]
pub fn BoardPanel() -> impl IntoView {
    let cache = expect_context::<StoredValue<SnapshotCache, LocalStorage>>();
    let bus = expect_context::<StoredValue<IdentityBus, LocalStorage>>();

    let board_id = use_active_identity(bus);
    let query = use_board_query(cache, move || {
        board_id.get().map(|id| CacheKey::current(&id))
    });

    let create_error = RwSignal::new(None::<String>);
    let update_error = RwSignal::new(None::<String>);

    // No persisted identity yet: create a board once. A failure surfaces as
    // a dismissible message and leaves the page usable.
    #[cfg(feature = "hydrate")]
    {
        if board_id.get_untracked().is_none() {
            leptos::task::spawn_local(async move {
                let bus = bus.get_value();
                if let Err(e) = crate::state::edit::create_default_board(&bus).await {
                    create_error.set(Some(e.to_string()));
                }
            });
        }
    }

    let on_toggle = Callback::new(move |(row, col): (usize, usize)| {
        // Broadcast the interaction on every click, before and independent
        // of the request's outcome.
        bus.with_value(|b| b.mark_interacted());
        let Some(id) = board_id.get_untracked() else {
            return;
        };
        #[cfg(feature = "hydrate")]
        {
            let cache = cache.get_value();
            leptos::task::spawn_local(async move {
                if let Err(e) = crate::state::edit::toggle_cell(&cache, &id, row, col).await {
                    update_error.set(Some(e.to_string()));
                }
            });
        }
        #[cfg(not(feature = "hydrate"))]
        {
            let _ = (cache, id, row, col);
        }
    });

    view! {
        <div class="board-panel">
            {move || {
                let Some(id) = board_id.get() else {
                    return view! { <p class="board-panel__loading">"Loading board..."</p> }
                        .into_any();
                };
                let q = query.get();
                if let Some(err) = q.error {
                    return view! {
                        <p class="board-panel__error">{format!("Failed to load board: {err}")}</p>
                    }
                    .into_any();
                }
                let Some(snapshot) = q.snapshot else {
                    return view! { <p class="board-panel__loading">"Loading board..."</p> }
                        .into_any();
                };
                let meta = format!(
                    "Board ID: {id} \u{2022} Gen: {} \u{2022} Alive: {}",
                    snapshot.generation, snapshot.alive_count
                );
                view! {
                    <div>
                        <BoardGrid grid=snapshot.grid_or_empty() on_toggle=on_toggle/>
                        <p class="board-panel__meta">{meta}</p>
                    </div>
                }
                .into_any()
            }}
            {move || {
                create_error.get().map(|msg| {
                    view! {
                        <ErrorLine prefix="Failed to create board" message=msg signal=create_error/>
                    }
                })
            }}
            {move || {
                update_error.get().map(|msg| {
                    view! {
                        <ErrorLine prefix="Failed to update board" message=msg signal=update_error/>
                    }
                })
            }}
        </div>
    }
}
