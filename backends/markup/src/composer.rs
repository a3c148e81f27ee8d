use futures::FutureExt;
use futures::future::LocalBoxFuture;
use jiffy_core::{Composed, Composer, Leaf, Node, Prop, Target, Value, is_event_prop};

/// Builds `<tag attr=value ...>children</tag>` strings.
///
/// The output keeps the historical format byte for byte: the opening tag always has
/// a space after the name, attributes are `key=value` pairs separated by single
/// spaces and values are not quoted. String values are written raw, any other JSON
/// value in JSON notation. Event-table keys and handler props are left out.
///
/// Nothing is escaped unless the composer is created with [`MarkupComposer::escaping`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MarkupComposer {
    escape: bool,
}

impl MarkupComposer {
    /// A composer that writes text and attribute values unchanged.
    #[must_use]
    pub const fn new() -> Self {
        Self { escape: false }
    }

    /// A composer that HTML-escapes raw text children and attribute values.
    #[must_use]
    pub const fn escaping() -> Self {
        Self { escape: true }
    }

    /// Whether this composer escapes its output.
    #[must_use]
    pub const fn escapes(&self) -> bool {
        self.escape
    }

    /// Builds the markup for `node` synchronously.
    #[must_use]
    pub fn markup(&self, node: &Node, children: &[Composed<String>]) -> String {
        let tag = match node.target() {
            Target::Intrinsic(name) => name.as_ref(),
            Target::Component(component) => component.name(),
            Target::Unsupported(_) => "",
        };

        let attributes = node
            .props()
            .iter()
            .filter(|(key, _)| !is_event_prop(key))
            .filter_map(|(key, prop)| match prop {
                Prop::Value(value) => Some(format!("{key}={}", self.attribute(value))),
                Prop::Handler(_) => None,
            })
            .collect::<Vec<_>>()
            .join(" ");

        let mut out = format!("<{tag} {attributes}>");
        for child in children {
            child.for_each_leaf(&mut |leaf| match leaf {
                Leaf::Text(text) => out.push_str(&self.text(text)),
                Leaf::Node(markup) => out.push_str(markup),
            });
        }
        out.push_str("</");
        out.push_str(tag);
        out.push('>');
        out
    }

    fn attribute(&self, value: &Value) -> String {
        let raw = match value {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        };
        if self.escape { escape(&raw) } else { raw }
    }

    fn text(&self, text: &str) -> String {
        if self.escape {
            escape(text)
        } else {
            text.to_owned()
        }
    }
}

impl Composer for MarkupComposer {
    type Output = String;

    fn compose<'a>(
        &'a self,
        node: &'a Node,
        children: &'a [Composed<String>],
    ) -> LocalBoxFuture<'a, String> {
        let markup = self.markup(node, children);
        async move { markup }.boxed_local()
    }
}

/// Escapes `&`, `<`, `>`, `"`, `'` and `/` for HTML.
#[must_use]
pub fn escape(text: &str) -> String {
    v_htmlescape::escape(text).to_string()
}
