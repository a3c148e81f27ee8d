use std::rc::Rc;

use jiffy_core::{Child, Event, RenderError, RenderOptions, Rendered, Runtime, RuntimeConfig};
use tracing::{debug, error};

use crate::{
    dom::{Document, DomNode, Element},
    error::DomError,
    renderer::{DomComposer, MountSink},
};

const DEFAULT_ROOT_ID: &str = "jiffy-root";

/// Renders `root` into `element`, subscribing to re-renders.
///
/// The element's `id` is the render target, so rendering into the same element
/// again reuses its state and cached output.
///
/// # Errors
///
/// [`RenderError::MissingTarget`] when `element` has no `id`.
pub async fn render_dom(
    runtime: &Runtime,
    root: impl Into<Child>,
    element: &Element,
) -> Result<Rendered<Element>, RenderError> {
    render_dom_with(runtime, root, element, RenderOptions::new().allow_rerender(true)).await
}

/// Like [`render_dom`], with explicit options.
///
/// # Errors
///
/// [`RenderError::MissingTarget`] when `element` has no `id`.
pub async fn render_dom_with(
    runtime: &Runtime,
    root: impl Into<Child>,
    element: &Element,
    options: RenderOptions<Element>,
) -> Result<Rendered<Element>, RenderError> {
    let Some(id) = element.id().filter(|id| !id.trim().is_empty()) else {
        error!(element = %element.tag(), "invalid target: mount element must have an id");
        return Err(RenderError::MissingTarget);
    };
    runtime
        .render(
            root,
            Rc::new(DomComposer),
            Rc::new(MountSink::new(element.clone())),
            id,
            options,
        )
        .await
}

/// Builder for [`DomApp`].
#[derive(Debug, Default, Clone)]
pub struct DomAppBuilder {
    root_id: Option<String>,
    config: RuntimeConfig,
}

impl DomAppBuilder {
    /// Creates a new builder with default configuration.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            root_id: None,
            config: RuntimeConfig::new(),
        }
    }

    /// Sets the id of the element that should host the application.
    #[must_use]
    pub fn with_root_id(mut self, id: impl Into<String>) -> Self {
        self.root_id = Some(id.into());
        self
    }

    /// Sets the runtime configuration.
    #[must_use]
    pub const fn with_config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Finalises the builder against `document`.
    ///
    /// Without a root id a `div#jiffy-root` host is appended to the body.
    ///
    /// # Errors
    ///
    /// [`DomError::RootNotFound`] when the configured root id does not exist.
    pub fn build(self, document: &Document) -> Result<DomApp, DomError> {
        let root = match self.root_id {
            Some(id) => document
                .get_element_by_id(&id)
                .ok_or(DomError::RootNotFound(id))?,
            None => {
                let host = document.create_element("div");
                host.set_id(DEFAULT_ROOT_ID);
                document.body().append_child(DomNode::Element(host.clone()));
                host
            }
        };
        debug!(root = ?root.id(), "document app created");
        Ok(DomApp {
            runtime: Runtime::with_config(self.config),
            document: document.clone(),
            root,
        })
    }
}

/// An application mounted into one element of a [`Document`].
#[derive(Debug, Clone)]
pub struct DomApp {
    runtime: Runtime,
    document: Document,
    root: Element,
}

impl DomApp {
    /// Starts building an app.
    #[must_use]
    pub const fn builder() -> DomAppBuilder {
        DomAppBuilder::new()
    }

    /// The runtime driving this app.
    #[must_use]
    pub const fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// The host document.
    #[must_use]
    pub const fn document(&self) -> &Document {
        &self.document
    }

    /// The mount element.
    #[must_use]
    pub const fn root(&self) -> &Element {
        &self.root
    }

    /// Renders `tree` into the mount element.
    ///
    /// # Errors
    ///
    /// [`DomError::Render`] when the mount element lost its id.
    pub async fn render(&self, tree: impl Into<Child>) -> Result<Rendered<Element>, DomError> {
        Ok(render_dom(&self.runtime, tree, &self.root).await?)
    }

    /// Dispatches `event` to the element with `id`, then runs the re-renders it
    /// caused. Returns the number of listeners called.
    ///
    /// # Errors
    ///
    /// [`DomError::ElementNotFound`] when no element has that id.
    pub async fn dispatch(&self, id: &str, event: &Event) -> Result<usize, DomError> {
        let element = self
            .document
            .get_element_by_id(id)
            .ok_or_else(|| DomError::ElementNotFound(id.to_owned()))?;
        let called = element.dispatch_event(event);
        let passes = self.runtime.run_until_idle().await;
        debug!(id, event = event.name(), called, passes, "event dispatched");
        Ok(called)
    }

    /// Disposes the mounted tree, running its effect teardowns, and clears the
    /// mount element.
    pub async fn unmount(&self) -> bool {
        let Some(id) = self.root.id() else {
            return false;
        };
        let disposed = self.runtime.dispose(id).await;
        self.root.clear();
        disposed
    }
}
