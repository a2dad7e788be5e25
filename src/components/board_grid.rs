//! Presentational grid of clickable cells.

use leptos::prelude::*;

/// Render `grid` as rows of cell buttons; clicks report `(row, col)`.
#[component]
pub fn BoardGrid(grid: Vec<Vec<bool>>, on_toggle: Callback<(usize, usize)>) -> impl IntoView {
    view! {
        <div class="board-grid">
            {grid
                .into_iter()
                .enumerate()
                .map(|(row, cells)| {
                    view! {
                        <div class="board-grid__row">
                            {cells
                                .into_iter()
                                .enumerate()
                                .map(|(col, alive)| {
                                    let class = if alive {
                                        "board-grid__cell board-grid__cell--alive"
                                    } else {
                                        "board-grid__cell"
                                    };
                                    view! {
                                        <button
                                            class=class
                                            on:click=move |_| on_toggle.run((row, col))
                                        ></button>
                                    }
                                })
                                .collect::<Vec<_>>()}
                        </div>
                    }
                })
                .collect::<Vec<_>>()}
        </div>
    }
}
