//! Dismissible module-local error message.

use leptos::prelude::*;

/// One error line with a dismiss button clearing the owning slot.
#[component]
pub fn ErrorLine(
    prefix: &'static str,
    message: String,
    signal: RwSignal<Option<String>>,
) -> impl IntoView {
    view! {
        <p class="error-line">
            {format!("{prefix}: {message}")}
            <button class="error-line__dismiss" on:click=move |_| signal.set(None)>
                "\u{2715}"
            </button>
        </p>
    }
}
