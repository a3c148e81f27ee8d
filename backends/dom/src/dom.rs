//! A small in-memory document: elements with attributes, event listeners and
//! ordered child nodes.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::rc::Rc;

use jiffy_core::{Event, Handler};
use v_htmlescape::escape;

#[derive(Default)]
struct ElementData {
    tag: String,
    attributes: BTreeMap<String, String>,
    listeners: Vec<(String, Handler)>,
    children: Vec<DomNode>,
}

/// A shared handle to one element. Clones refer to the same element.
#[derive(Clone)]
pub struct Element(Rc<RefCell<ElementData>>);

impl core::fmt::Debug for Element {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.outer_html())
    }
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Element {}

/// A child of an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomNode {
    /// A nested element.
    Element(Element),
    /// A text node.
    Text(String),
}

impl Element {
    /// Creates a detached element.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self(Rc::new(RefCell::new(ElementData {
            tag: tag.into(),
            ..ElementData::default()
        })))
    }

    /// The tag name.
    #[must_use]
    pub fn tag(&self) -> String {
        self.0.borrow().tag.clone()
    }

    /// The `id` attribute.
    #[must_use]
    pub fn id(&self) -> Option<String> {
        self.attribute("id")
    }

    /// Sets the `id` attribute.
    pub fn set_id(&self, id: impl Into<String>) {
        self.set_attribute("id", id);
    }

    /// Sets an attribute, replacing any previous value.
    pub fn set_attribute(&self, name: impl Into<String>, value: impl Into<String>) {
        self.0.borrow_mut().attributes.insert(name.into(), value.into());
    }

    /// Reads an attribute.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<String> {
        self.0.borrow().attributes.get(name).cloned()
    }

    /// All attributes in name order.
    #[must_use]
    pub fn attributes(&self) -> Vec<(String, String)> {
        self.0
            .borrow()
            .attributes
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }

    /// Subscribes `handler` to events named `event`.
    pub fn add_event_listener(&self, event: impl Into<String>, handler: Handler) {
        self.0.borrow_mut().listeners.push((event.into(), handler));
    }

    /// Number of listeners subscribed to `event`.
    #[must_use]
    pub fn listener_count(&self, event: &str) -> usize {
        self.0
            .borrow()
            .listeners
            .iter()
            .filter(|(name, _)| name == event)
            .count()
    }

    /// Calls every listener subscribed to the event's name, in subscription order,
    /// and returns how many ran.
    pub fn dispatch_event(&self, event: &Event) -> usize {
        let handlers: Vec<Handler> = self
            .0
            .borrow()
            .listeners
            .iter()
            .filter(|(name, _)| name == event.name())
            .map(|(_, handler)| handler.clone())
            .collect();
        for handler in &handlers {
            handler.call(event);
        }
        handlers.len()
    }

    /// Appends a child node.
    pub fn append_child(&self, child: DomNode) {
        self.0.borrow_mut().children.push(child);
    }

    /// Appends a text node.
    pub fn append_text(&self, text: impl Into<String>) {
        self.append_child(DomNode::Text(text.into()));
    }

    /// Removes every child.
    pub fn clear(&self) {
        self.0.borrow_mut().children.clear();
    }

    /// The child nodes.
    #[must_use]
    pub fn children(&self) -> Vec<DomNode> {
        self.0.borrow().children.clone()
    }

    /// The child elements, text nodes skipped.
    #[must_use]
    pub fn child_elements(&self) -> Vec<Self> {
        self.0
            .borrow()
            .children
            .iter()
            .filter_map(|child| match child {
                DomNode::Element(element) => Some(element.clone()),
                DomNode::Text(_) => None,
            })
            .collect()
    }

    /// Concatenated text of every descendant text node.
    #[must_use]
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for child in &self.0.borrow().children {
            match child {
                DomNode::Element(element) => out.push_str(&element.text_content()),
                DomNode::Text(text) => out.push_str(text),
            }
        }
        out
    }

    /// First descendant (or this element) whose `id` is `id`, depth first.
    #[must_use]
    pub fn find_by_id(&self, id: &str) -> Option<Self> {
        if self.id().as_deref() == Some(id) {
            return Some(self.clone());
        }
        self.child_elements()
            .into_iter()
            .find_map(|child| child.find_by_id(id))
    }

    /// Serialized children.
    #[must_use]
    pub fn inner_html(&self) -> String {
        let mut out = String::new();
        for child in &self.0.borrow().children {
            match child {
                DomNode::Element(element) => out.push_str(&element.outer_html()),
                DomNode::Text(text) => {
                    let _ = write!(out, "{}", escape(text));
                }
            }
        }
        out
    }

    /// Serialized element, including itself.
    #[must_use]
    pub fn outer_html(&self) -> String {
        let data = self.0.borrow();
        let mut out = format!("<{}", data.tag);
        for (name, value) in &data.attributes {
            let _ = write!(out, " {name}=\"{}\"", escape(value));
        }
        out.push('>');
        drop(data);
        out.push_str(&self.inner_html());
        let _ = write!(out, "</{}>", self.0.borrow().tag);
        out
    }
}

/// A document with a `body` element.
#[derive(Debug, Clone)]
pub struct Document {
    body: Element,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Creates an empty document.
    #[must_use]
    pub fn new() -> Self {
        Self {
            body: Element::new("body"),
        }
    }

    /// The body element.
    #[must_use]
    pub const fn body(&self) -> &Element {
        &self.body
    }

    /// Creates a detached element.
    #[must_use]
    pub fn create_element(&self, tag: impl Into<String>) -> Element {
        Element::new(tag)
    }

    /// Finds an element in the body by `id`.
    #[must_use]
    pub fn get_element_by_id(&self, id: &str) -> Option<Element> {
        self.body.find_by_id(id)
    }
}
