use std::rc::Rc;

use futures::FutureExt;
use futures::future::LocalBoxFuture;
use jiffy_core::{Child, Composed, Leaf, RenderError, RenderOptions, Rendered, Runtime, Sink};
use tracing::debug;
use uuid::Uuid;

use crate::composer::{MarkupComposer, escape};

/// Turns a composed root into one string.
///
/// A fragment at the root is written one child per line; everything else is
/// concatenated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StringSink {
    escape: bool,
}

impl StringSink {
    /// A sink that writes root-level text unchanged.
    #[must_use]
    pub const fn new() -> Self {
        Self { escape: false }
    }

    /// A sink that escapes root-level text.
    #[must_use]
    pub const fn escaping() -> Self {
        Self { escape: true }
    }

    /// Joins `composed` into the final string.
    #[must_use]
    pub fn join(&self, composed: &Composed<String>) -> String {
        match composed {
            Composed::Fragment(items) => items
                .iter()
                .map(|item| self.flatten(item))
                .collect::<Vec<_>>()
                .join("\n"),
            other => self.flatten(other),
        }
    }

    fn flatten(&self, composed: &Composed<String>) -> String {
        let mut out = String::new();
        composed.for_each_leaf(&mut |leaf| match leaf {
            Leaf::Text(text) if self.escape => out.push_str(&escape(text)),
            Leaf::Text(text) => out.push_str(text),
            Leaf::Node(markup) => out.push_str(markup),
        });
        out
    }
}

impl Sink<String> for StringSink {
    type Output = String;

    fn mount(&self, composed: Composed<String>) -> LocalBoxFuture<'_, String> {
        let joined = self.join(&composed);
        async move { joined }.boxed_local()
    }
}

/// Options for [`render_string`].
#[derive(Debug, Clone, Default)]
pub struct StringOptions {
    render_id: Option<String>,
    escape: bool,
    render: RenderOptions<String>,
}

impl StringOptions {
    /// Anonymous, unescaped, no re-render subscription.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Renders into a named target, so later calls with the same id reuse its state
    /// and cached output. Without an id every call gets a fresh random target.
    #[must_use]
    pub fn render_id(mut self, id: impl Into<String>) -> Self {
        self.render_id = Some(id.into());
        self
    }

    /// Escapes text children and attribute values.
    #[must_use]
    pub const fn escaping(mut self, escape: bool) -> Self {
        self.escape = escape;
        self
    }

    /// Subscribes the target to re-render requests.
    #[must_use]
    pub fn allow_rerender(mut self, allow: bool) -> Self {
        self.render = self.render.allow_rerender(allow);
        self
    }

    /// Receives the string produced by every re-render.
    #[must_use]
    pub fn on_rerender(mut self, callback: impl Fn(&Rendered<String>) + 'static) -> Self {
        self.render = self.render.on_rerender(callback);
        self
    }

    /// The target id this render will use, if one was set.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.render_id.as_deref()
    }
}

/// Renders `root` to a markup string.
///
/// # Errors
///
/// [`RenderError::MissingTarget`] when an explicit, empty render id was given.
pub async fn render_string(
    runtime: &Runtime,
    root: impl Into<Child>,
    options: StringOptions,
) -> Result<Rendered<String>, RenderError> {
    let StringOptions {
        render_id,
        escape,
        render,
    } = options;
    let target = render_id.unwrap_or_else(|| Uuid::new_v4().to_string());
    debug!(render_target = %target, escape, "rendering to string");

    let (composer, sink) = if escape {
        (MarkupComposer::escaping(), StringSink::escaping())
    } else {
        (MarkupComposer::new(), StringSink::new())
    };
    runtime
        .render(root, Rc::new(composer), Rc::new(sink), target, render)
        .await
}
