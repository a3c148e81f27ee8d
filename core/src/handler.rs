//! Event handler values carried in [`Props`](crate::Props).

use core::fmt::Debug;
use std::rc::Rc;

use crate::event::Event;

/// A shareable event callback.
///
/// Handlers are reference counted: cloning a [`Props`](crate::Props) for a component
/// invocation shares the callback instead of copying it.
#[derive(Clone)]
pub struct Handler(Rc<dyn Fn(&Event)>);

impl Handler {
    /// Wraps a closure as a handler.
    pub fn new(f: impl Fn(&Event) + 'static) -> Self {
        Self(Rc::new(f))
    }

    /// Invokes the handler with `event`.
    pub fn call(&self, event: &Event) {
        (self.0)(event);
    }

    /// Returns `true` when both handlers share the same callback.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Address of the shared callback; equal for clones, distinct for live handlers
    /// created separately.
    pub(crate) fn address(&self) -> usize {
        Rc::as_ptr(&self.0).cast::<()>().addr()
    }
}

impl Debug for Handler {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("Handler(..)")
    }
}

impl<F: Fn(&Event) + 'static> From<F> for Handler {
    fn from(f: F) -> Self {
        Self::new(f)
    }
}
