//! Root application component with routing and context providers.

use leptos::prelude::*;
use leptos_meta::{MetaTags, Stylesheet, Title, provide_meta_context};
use leptos_router::{
    StaticSegment,
    components::{Route, Router, Routes},
};

use crate::pages::life::LifePage;
use crate::state::autoplay::AutoplayState;
use crate::state::cache::SnapshotCache;
use crate::state::identity::IdentityBus;

/// HTML shell rendered on the server for SSR + hydration.
pub fn shell(options: LeptosOptions) -> impl IntoView {
    view! {
        <!DOCTYPE html>
        <html lang="en">
            <head>
                <meta charset="utf-8"/>
                <meta name="viewport" content="width=device-width, initial-scale=1"/>
                <AutoReload options=options.clone()/>
                <HydrationScripts options/>
                <MetaTags/>
            </head>
            <body>
                <App/>
            </body>
        </html>
    }
}

/// Root application component.
///
/// Constructs the session-scoped synchronization state — one snapshot
/// cache and one identity bus, shared by both modules through context —
/// and wires identity switches into the autoplay scheduler.
#[component]
pub fn App() -> impl IntoView {
    provide_meta_context();

    let cache = StoredValue::new_local(SnapshotCache::new());
    let bus = StoredValue::new_local(IdentityBus::new());
    let autoplay = RwSignal::new(AutoplayState::default());

    provide_context(cache);
    provide_context(bus);
    provide_context(autoplay);

    // Fold broadcasts from other modules into this bus.
    bus.with_value(|b| b.attach_window_events());

    // An identity switch stops the running loop before any tick can target
    // the new board. The listener lives for the whole session.
    let _ = bus.with_value(|b| {
        b.on_identity_changed(move |id| {
            autoplay.update(|a| a.handle_identity_change(id));
        })
    });

    view! {
        <Stylesheet id="leptos" href="/pkg/lifeboard.css"/>
        <Title text="Conway's Game of Life"/>

        <Router>
            <Routes fallback=|| "Page not found.".into_view()>
                <Route path=StaticSegment("") view=LifePage/>
            </Routes>
        </Router>
    }
}
