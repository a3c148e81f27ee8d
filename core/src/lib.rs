#![allow(clippy::multiple_crate_versions)]

//! Core engine of the Jiffy UI framework.
//!
//! A UI is described as a tree of lightweight [`Node`] descriptors. The engine walks
//! that tree in pre-order, asks a backend [`Composer`] to build one artifact per
//! intrinsic node, and hands the result to a [`Sink`]. Components are plain functions
//! that receive their [`Props`] and a [`Hooks`] handle, which gives them persistent
//! state and mount effects across re-renders of the same render target.
//!
//! # Architecture
//!
//! ```text
//! Runtime::render ──▶ pass lock ──▶ walker (pre-order) ──▶ Composer ──▶ Sink ──▶ effects
//!        ▲                              │
//!        │                              ▼
//!   scheduler loop ◀── Setter ◀── Hooks / render state store
//! ```
//!
//! Node identity across passes is the pre-order visitation position (or a key
//! anchor, see [`Node::with_key`]). Reordering or conditionally omitting unkeyed
//! children moves state, effects and cached results to whichever node ends up at
//! the old position.

#[macro_use]
mod macros;

pub mod compose;
pub mod composer;
pub mod config;
pub mod error;
pub mod event;
pub mod fingerprint;
pub mod handler;
pub mod hooks;
pub mod node;
pub mod props;
pub mod runtime;
pub mod scheduler;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

#[doc(inline)]
pub use composer::{Composed, Composer, Leaf, Sink};
#[doc(inline)]
pub use config::{LockScope, RenderOptions, RuntimeConfig};
#[doc(inline)]
pub use error::{ComposeError, ConfigError, HookError, RenderError};
#[doc(inline)]
pub use event::{EVENT_HANDLERS, Event, event_name, is_event_prop};
#[doc(inline)]
pub use handler::Handler;
#[doc(inline)]
pub use hooks::{Hooks, Setter, Teardown};
#[doc(inline)]
pub use node::{Child, Component, FRAGMENT, Node, Target, composable};
#[doc(inline)]
pub use props::{Prop, Props};
#[doc(inline)]
pub use runtime::{PassStats, RecordSummary, Rendered, Runtime};
#[doc(inline)]
pub use scheduler::RerenderRequest;
#[doc(inline)]
pub use store::{SlotId, TargetId};

pub use serde_json::{Value, json};
