use jiffy_core::RenderError;
use thiserror::Error;

/// Error type produced by the document backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomError {
    /// The requested mount element cannot be located.
    #[error("failed to find element with id `{0}`")]
    RootNotFound(String),
    /// An element addressed by id for event dispatch does not exist.
    #[error("no element with id `{0}` is mounted")]
    ElementNotFound(String),
    /// The render call was rejected.
    #[error(transparent)]
    Render(#[from] RenderError),
}
