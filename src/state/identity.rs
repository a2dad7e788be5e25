//! Active-board identity pointer shared across independently-mounted modules.
//!
//! The board module and the controls module have no reference to one
//! another; they converge on the same board through a durable pointer
//! (`localStorage`) plus a page-wide broadcast event. Subscribers receive
//! the current value synchronously on registration, so a late-mounting
//! module never misses the initial state.
//!
//! The bus also carries the cell-interaction signal: fired on every grid
//! click regardless of request outcome, and used by the controls module to
//! distinguish "user has started interacting" from "no board yet".

#[cfg(test)]
#[path = "identity_test.rs"]
mod identity_test;

use std::cell::RefCell;
use std::rc::{Rc, Weak};

#[cfg(feature = "hydrate")]
const STORAGE_KEY: &str = "lifeboard_board";
#[cfg(feature = "hydrate")]
const IDENTITY_EVENT: &str = "lifeboard:board-changed";
#[cfg(feature = "hydrate")]
const INTERACTION_EVENT: &str = "lifeboard:board-interacted";

type IdentityFn = Rc<dyn Fn(Option<&str>)>;
type InteractionFn = Rc<dyn Fn()>;

#[derive(Default)]
struct BusInner {
    active: Option<String>,
    interacted: bool,
    next_listener: u64,
    identity_listeners: Vec<(u64, IdentityFn)>,
    interaction_listeners: Vec<(u64, InteractionFn)>,
}

/// Page-wide identity broadcaster. Cheap to clone; clones share listeners.
#[derive(Clone, Default)]
pub struct IdentityBus {
    inner: Rc<RefCell<BusInner>>,
}

impl IdentityBus {
    /// A bus seeded from the persisted pointer, when one exists.
    pub fn new() -> Self {
        let bus = Self::default();
        if let Some(id) = read_stored() {
            bus.inner.borrow_mut().active = Some(id);
        }
        bus
    }

    /// The persisted active board identity.
    pub fn active(&self) -> Option<String> {
        self.inner.borrow().active.clone()
    }

    /// Persist `id` as the active board and broadcast the change to every
    /// listener in the page, including those registered in other modules.
    /// After this returns, every `active()` call observes `id`.
    pub fn set_active(&self, id: &str) {
        persist(id);
        let changed = {
            let mut inner = self.inner.borrow_mut();
            if inner.active.as_deref() == Some(id) {
                false
            } else {
                inner.active = Some(id.to_owned());
                true
            }
        };
        if changed {
            self.notify_identity();
            dispatch_identity_event(id);
        }
    }

    /// Deliver the current identity synchronously, then again on every
    /// subsequent change.
    pub fn on_identity_changed(&self, listener: impl Fn(Option<&str>) + 'static) -> BusListener {
        let callback: IdentityFn = Rc::new(listener);
        let (id, current) = {
            let mut inner = self.inner.borrow_mut();
            let id = inner.next_listener;
            inner.next_listener += 1;
            inner.identity_listeners.push((id, Rc::clone(&callback)));
            (id, inner.active.clone())
        };
        callback(current.as_deref());
        BusListener {
            inner: Rc::downgrade(&self.inner),
            id,
            kind: ListenerKind::Identity,
        }
    }

    /// Record a grid interaction and broadcast it page-wide. Fired on every
    /// click, before and independent of the resulting request.
    pub fn mark_interacted(&self) {
        self.inner.borrow_mut().interacted = true;
        self.notify_interaction();
        dispatch_interaction_event();
    }

    pub fn was_interacted(&self) -> bool {
        self.inner.borrow().interacted
    }

    /// Deliver on every interaction; delivered once immediately when the
    /// user has already interacted.
    pub fn on_interaction(&self, listener: impl Fn() + 'static) -> BusListener {
        let callback: InteractionFn = Rc::new(listener);
        let (id, interacted) = {
            let mut inner = self.inner.borrow_mut();
            let id = inner.next_listener;
            inner.next_listener += 1;
            inner.interaction_listeners.push((id, Rc::clone(&callback)));
            (id, inner.interacted)
        };
        if interacted {
            callback();
        }
        BusListener {
            inner: Rc::downgrade(&self.inner),
            id,
            kind: ListenerKind::Interaction,
        }
    }

    /// Bind this bus to the page: changes published by other modules via
    /// the broadcast events are folded back into local state. Call once
    /// after mounting. No-op outside the browser.
    pub fn attach_window_events(&self) {
        #[cfg(feature = "hydrate")]
        {
            use wasm_bindgen::JsCast;
            use wasm_bindgen::prelude::Closure;

            let Some(window) = web_sys::window() else {
                return;
            };

            let bus = self.clone();
            let on_identity = Closure::<dyn Fn(web_sys::Event)>::new(move |event: web_sys::Event| {
                let detail = event
                    .dyn_into::<web_sys::CustomEvent>()
                    .ok()
                    .and_then(|e| e.detail().as_string())
                    .or_else(read_stored);
                bus.apply_external(detail.as_deref());
            });
            let _ = window.add_event_listener_with_callback(
                IDENTITY_EVENT,
                on_identity.as_ref().unchecked_ref(),
            );
            on_identity.forget();

            let bus = self.clone();
            let on_interaction = Closure::<dyn Fn(web_sys::Event)>::new(move |_event: web_sys::Event| {
                bus.apply_external_interaction();
            });
            let _ = window.add_event_listener_with_callback(
                INTERACTION_EVENT,
                on_interaction.as_ref().unchecked_ref(),
            );
            on_interaction.forget();
        }
    }

    /// Fold in an identity observed from another module's broadcast.
    /// Updates local state and listeners without re-dispatching the event.
    #[cfg(feature = "hydrate")]
    fn apply_external(&self, id: Option<&str>) {
        let changed = {
            let mut inner = self.inner.borrow_mut();
            if inner.active.as_deref() == id {
                false
            } else {
                inner.active = id.map(ToOwned::to_owned);
                true
            }
        };
        if changed {
            self.notify_identity();
        }
    }

    #[cfg(feature = "hydrate")]
    fn apply_external_interaction(&self) {
        self.inner.borrow_mut().interacted = true;
        self.notify_interaction();
    }

    fn notify_identity(&self) {
        let (listeners, current): (Vec<IdentityFn>, Option<String>) = {
            let inner = self.inner.borrow();
            (
                inner.identity_listeners.iter().map(|(_, l)| Rc::clone(l)).collect(),
                inner.active.clone(),
            )
        };
        for listener in listeners {
            listener(current.as_deref());
        }
    }

    fn notify_interaction(&self) {
        let listeners: Vec<InteractionFn> = {
            let inner = self.inner.borrow();
            inner.interaction_listeners.iter().map(|(_, l)| Rc::clone(l)).collect()
        };
        for listener in listeners {
            listener();
        }
    }
}

#[derive(Clone, Copy)]
enum ListenerKind {
    Identity,
    Interaction,
}

/// Handle returned by the subscribe methods. Unsubscribing is idempotent.
pub struct BusListener {
    inner: Weak<RefCell<BusInner>>,
    id: u64,
    kind: ListenerKind,
}

impl BusListener {
    pub fn unsubscribe(&self) {
        if let Some(inner) = self.inner.upgrade() {
            let mut inner = inner.borrow_mut();
            match self.kind {
                ListenerKind::Identity => {
                    inner.identity_listeners.retain(|(id, _)| *id != self.id);
                }
                ListenerKind::Interaction => {
                    inner.interaction_listeners.retain(|(id, _)| *id != self.id);
                }
            }
        }
    }
}

/// Read the persisted board pointer from localStorage.
fn read_stored() -> Option<String> {
    #[cfg(feature = "hydrate")]
    {
        let storage = web_sys::window()?.local_storage().ok()??;
        storage.get_item(STORAGE_KEY).ok()?
    }
    #[cfg(not(feature = "hydrate"))]
    {
        None
    }
}

/// Persist the board pointer to localStorage.
fn persist(id: &str) {
    #[cfg(feature = "hydrate")]
    {
        if let Some(window) = web_sys::window() {
            if let Ok(Some(storage)) = window.local_storage() {
                let _ = storage.set_item(STORAGE_KEY, id);
            }
        }
    }
    #[cfg(not(feature = "hydrate"))]
    {
        let _ = id;
    }
}

/// Broadcast an identity change to other modules in the page.
fn dispatch_identity_event(id: &str) {
    #[cfg(feature = "hydrate")]
    {
        if let Some(window) = web_sys::window() {
            let init = web_sys::CustomEventInit::new();
            init.set_detail(&wasm_bindgen::JsValue::from_str(id));
            if let Ok(event) =
                web_sys::CustomEvent::new_with_event_init_dict(IDENTITY_EVENT, &init)
            {
                let _ = window.dispatch_event(&event);
            }
        }
    }
    #[cfg(not(feature = "hydrate"))]
    {
        let _ = id;
    }
}

/// Broadcast a grid interaction to other modules in the page.
fn dispatch_interaction_event() {
    #[cfg(feature = "hydrate")]
    {
        if let Some(window) = web_sys::window() {
            if let Ok(event) = web_sys::Event::new(INTERACTION_EVENT) {
                let _ = window.dispatch_event(&event);
            }
        }
    }
}
