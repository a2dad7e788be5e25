//! Main page composing the board and controls modules side by side.

use leptos::prelude::*;

use crate::components::board_panel::BoardPanel;
use crate::components::controls_panel::ControlsPanel;

/// Two-column shell: board on the left, controls on the right. The panels
/// hold no reference to each other; they converge through the cache and
/// the identity broadcaster alone.
#[component]
pub fn LifePage() -> impl IntoView {
    view! {
        <div class="life-page">
            <div class="life-page__board">
                <h1>"Conway's Game of Life"</h1>
                <BoardPanel/>
            </div>
            <div class="life-page__controls">
                <ControlsPanel/>
            </div>
        </div>
    }
}
