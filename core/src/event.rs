//! Events delivered to handler props and the property → event name table.
//!
//! The core never subscribes to anything itself. Backends consult
//! [`EVENT_HANDLERS`] to decide which props become event subscriptions; every
//! key in that table must be left out when a backend applies plain attributes.

use serde_json::Value;

/// Mapping from handler property name to the event it subscribes to.
pub const EVENT_HANDLERS: [(&str, &str); 7] = [
    ("onClick", "click"),
    ("onMouseDown", "mousedown"),
    ("onMouseUp", "mouseup"),
    ("onMouseMove", "mousemove"),
    ("onKeyPress", "keypress"),
    ("onKeyDown", "keydown"),
    ("onKeyUp", "keyup"),
];

/// Returns the event name a handler property subscribes to, if it is one.
#[must_use]
pub fn event_name(prop: &str) -> Option<&'static str> {
    EVENT_HANDLERS
        .iter()
        .find(|(key, _)| *key == prop)
        .map(|(_, name)| *name)
}

/// Returns `true` when `prop` is a key of [`EVENT_HANDLERS`].
#[must_use]
pub fn is_event_prop(prop: &str) -> bool {
    event_name(prop).is_some()
}

/// An event dispatched to a [`Handler`](crate::Handler).
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    name: String,
    detail: Value,
}

impl Event {
    /// Creates an event with no detail payload.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            detail: Value::Null,
        }
    }

    /// Attaches a detail payload, e.g. the pressed key or pointer coordinates.
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<Value>) -> Self {
        self.detail = detail.into();
        self
    }

    /// The event name (`click`, `keydown`, ...).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The detail payload, `null` when none was attached.
    #[must_use]
    pub const fn detail(&self) -> &Value {
        &self.detail
    }
}
