//! # lifeboard
//!
//! Leptos + WASM client for a server-authoritative Conway's Game of Life.
//! The board renderer/editor and the simulation-control panel mount
//! independently and hold no reference to each other; the `state` module
//! is the synchronization core that keeps them — and the server —
//! consistent: a request-deduplicated snapshot cache, a durable board
//! identity broadcast, optimistic edits with rollback, and a cancellable
//! autoplay loop.

pub mod app;
pub mod components;
pub mod net;
pub mod pages;
pub mod state;

#[cfg(feature = "hydrate")]
#[wasm_bindgen::prelude::wasm_bindgen]
pub fn hydrate() {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Info);
    leptos::mount::hydrate_body(crate::app::App);
}
