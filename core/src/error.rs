//! Error types of the composition engine.
//!
//! Per-node problems ([`ComposeError`]) never abort a pass: the node composes to
//! nothing, the error is logged and collected into
//! [`Rendered::diagnostics`](crate::Rendered). Only a render call without a usable
//! target identifier fails as a whole ([`RenderError`]).

use thiserror::Error;

use crate::store::{SlotId, TargetId};

/// A node that could not be composed. The rest of the pass continues.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComposeError {
    /// The composition subject is neither a raw value nor a descriptor.
    #[error("invalid composition subject at {slot}: {description}")]
    InvalidNode {
        /// Where the subject was visited.
        slot: SlotId,
        /// What was found instead.
        description: String,
    },
    /// The node's target is neither an intrinsic name nor a component.
    #[error("unsupported composition target at {slot}: {description}")]
    UnsupportedTarget {
        /// Where the node was visited.
        slot: SlotId,
        /// The offending target.
        description: String,
    },
    /// A component function returned an error.
    #[error("component `{component}` at {slot} failed: {message}")]
    Component {
        /// Where the component was visited.
        slot: SlotId,
        /// The component name.
        component: String,
        /// The rendered error chain.
        message: String,
    },
}

impl ComposeError {
    /// The slot of the node that failed.
    #[must_use]
    pub const fn slot(&self) -> &SlotId {
        match self {
            Self::InvalidNode { slot, .. }
            | Self::UnsupportedTarget { slot, .. }
            | Self::Component { slot, .. } => slot,
        }
    }
}

/// A render call that was rejected before any composition happened.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// The target has no usable identifier.
    #[error("invalid render target: a non-empty identifier is required")]
    MissingTarget,
}

/// Misuse or failure of a hook or state setter.
#[derive(Debug, Error)]
pub enum HookError {
    /// The hook handle belongs to a pass that is no longer running.
    #[error("hooks for `{target}` may only be used during the composition pass that created them")]
    OutsidePass {
        /// Target the handle belongs to.
        target: TargetId,
    },
    /// The value could not be represented as state.
    #[error("state value cannot be serialized: {0}")]
    Serialize(#[source] serde_json::Error),
    /// The stored state no longer fits the requested type.
    #[error("state at {slot}[{index}] does not match the requested type: {source}")]
    StateShape {
        /// Slot of the owning node.
        slot: SlotId,
        /// Hook index within the node.
        index: usize,
        /// Deserialization failure.
        #[source]
        source: serde_json::Error,
    },
    /// The render target was disposed.
    #[error("render target `{target}` has been disposed")]
    TargetDisposed {
        /// The disposed target.
        target: TargetId,
    },
    /// The runtime's scheduler was shut down.
    #[error("re-render scheduler is closed")]
    SchedulerClosed,
}

/// Invalid runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// An environment variable held a value that could not be parsed.
    #[error("invalid value `{value}` for {key}")]
    InvalidValue {
        /// Variable name.
        key: &'static str,
        /// Offending value.
        value: String,
    },
}
