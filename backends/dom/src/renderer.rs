use futures::FutureExt;
use futures::future::LocalBoxFuture;
use jiffy_core::{Composed, Composer, Leaf, Node, Prop, Sink, Target, Value, event_name};
use tracing::trace;

use crate::dom::{DomNode, Element};

/// Builds one [`Element`] per intrinsic node.
///
/// Handler props listed in the event table become listeners; value props become
/// attributes. Handlers under any other key and values under an event-table key
/// are skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct DomComposer;

impl DomComposer {
    /// Builds the element for `node` synchronously.
    #[must_use]
    pub fn element(&self, node: &Node, children: &[Composed<Element>]) -> Element {
        let tag = match node.target() {
            Target::Intrinsic(name) => name.to_string(),
            Target::Component(component) => component.name().to_owned(),
            Target::Unsupported(_) => String::new(),
        };
        let element = Element::new(tag);

        for (key, prop) in node.props().iter() {
            match (event_name(key), prop) {
                (Some(event), Prop::Handler(handler)) => {
                    element.add_event_listener(event, handler.clone());
                }
                (None, Prop::Value(value)) => element.set_attribute(key, attribute_value(value)),
                _ => trace!(prop = key, "prop skipped"),
            }
        }

        for child in children {
            append(&element, child);
        }
        element
    }
}

impl Composer for DomComposer {
    type Output = Element;

    fn compose<'a>(
        &'a self,
        node: &'a Node,
        children: &'a [Composed<Element>],
    ) -> LocalBoxFuture<'a, Element> {
        let element = self.element(node, children);
        async move { element }.boxed_local()
    }
}

fn attribute_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Appends every leaf of `composed` to `parent`: text as text nodes, elements as-is.
pub(crate) fn append(parent: &Element, composed: &Composed<Element>) {
    composed.for_each_leaf(&mut |leaf| match leaf {
        Leaf::Text(text) => parent.append_text(text),
        Leaf::Node(element) => parent.append_child(DomNode::Element(element.clone())),
    });
}

/// Replaces the content of a mount element with the composed root.
#[derive(Debug, Clone)]
pub struct MountSink {
    mount: Element,
}

impl MountSink {
    /// A sink writing into `mount`.
    #[must_use]
    pub const fn new(mount: Element) -> Self {
        Self { mount }
    }

    /// The mount element.
    #[must_use]
    pub const fn element(&self) -> &Element {
        &self.mount
    }
}

impl Sink<Element> for MountSink {
    type Output = Element;

    fn mount(&self, composed: Composed<Element>) -> LocalBoxFuture<'_, Element> {
        self.mount.clear();
        append(&self.mount, &composed);
        let mount = self.mount.clone();
        async move { mount }.boxed_local()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiffy_core::{Event, Props, composable};
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn maps_props_to_attributes_and_listeners() {
        let clicks = Rc::new(Cell::new(0));
        let node = composable!(
            "button",
            Props::new()
                .with("class", "primary")
                .with("disabled", false)
                .on("onClick", {
                    let clicks = clicks.clone();
                    move |_| clicks.set(clicks.get() + 1)
                })
                .on("onHover", |_| {})
        );

        let element = DomComposer.element(&node, &[Composed::Text("go".into())]);
        assert_eq!(element.outer_html(), "<button class=\"primary\" disabled=\"false\">go</button>");
        assert_eq!(element.dispatch_event(&Event::new("click")), 1);
        assert_eq!(clicks.get(), 1);
        assert_eq!(element.listener_count("hover"), 0);
    }

    #[test]
    fn mounting_replaces_previous_content() {
        let mount = Element::new("div");
        mount.append_text("stale");
        let sink = MountSink::new(mount.clone());

        let composed = Composed::Fragment(vec![
            Composed::Node(Element::new("h1")),
            Composed::Text("tail".into()),
        ]);
        let mounted = futures::executor::block_on(sink.mount(composed));
        assert_eq!(mounted, mount);
        assert_eq!(mount.inner_html(), "<h1></h1>tail");
        assert_eq!(sink.element(), &mount);
    }
}
