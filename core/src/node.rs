//! Composable node descriptors.
//!
//! A [`Node`] is an immutable description of a piece of UI: a [`Target`], its
//! [`Props`] and an ordered sequence of [`Child`] values. Nodes carry no behavior;
//! the walker in [`compose`](crate::compose) gives them meaning.

use std::borrow::Cow;
use std::future::Future;
use std::rc::Rc;

use futures::FutureExt;
use futures::future::LocalBoxFuture;
use serde_json::Value;

use crate::{hooks::Hooks, props::Props};

/// Intrinsic target name that renders its children without a wrapping element.
pub const FRAGMENT: &str = "null";

type RenderFn = dyn Fn(Props, Hooks) -> LocalBoxFuture<'static, anyhow::Result<Child>>;

/// A component function producing another composable tree.
#[derive(Clone)]
pub struct Component {
    name: Cow<'static, str>,
    render: Rc<RenderFn>,
}

impl Component {
    /// Creates a component from an async function.
    ///
    /// The function receives a copy of the node's props (with `children` filled in)
    /// and the [`Hooks`] handle for its position.
    pub fn new<F, Fut>(name: impl Into<Cow<'static, str>>, render: F) -> Self
    where
        F: Fn(Props, Hooks) -> Fut + 'static,
        Fut: Future<Output = anyhow::Result<Child>> + 'static,
    {
        Self {
            name: name.into(),
            render: Rc::new(move |props, hooks| render(props, hooks).boxed_local()),
        }
    }

    /// Creates a component from a synchronous function.
    pub fn from_fn<F>(name: impl Into<Cow<'static, str>>, render: F) -> Self
    where
        F: Fn(Props, Hooks) -> anyhow::Result<Child> + 'static,
    {
        Self {
            name: name.into(),
            render: Rc::new(move |props, hooks| {
                let out = render(props, hooks);
                async move { out }.boxed_local()
            }),
        }
    }

    /// The component name, used in fingerprints and diagnostics.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn call(&self, props: Props, hooks: Hooks) -> LocalBoxFuture<'static, anyhow::Result<Child>> {
        (self.render)(props, hooks)
    }
}

impl core::fmt::Debug for Component {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("Component").field(&self.name).finish()
    }
}

/// What a node renders to.
#[derive(Debug, Clone)]
pub enum Target {
    /// A backend primitive such as `div`; [`FRAGMENT`] renders children only.
    Intrinsic(Cow<'static, str>),
    /// A component function.
    Component(Component),
    /// Anything else. Composed as nothing, reported as unsupported.
    Unsupported(String),
}

impl Target {
    /// Returns `true` for the [`FRAGMENT`] intrinsic.
    #[must_use]
    pub fn is_fragment(&self) -> bool {
        matches!(self, Self::Intrinsic(name) if name == FRAGMENT)
    }
}

impl From<&'static str> for Target {
    fn from(name: &'static str) -> Self {
        Self::Intrinsic(Cow::Borrowed(name))
    }
}

impl From<String> for Target {
    fn from(name: String) -> Self {
        Self::Intrinsic(Cow::Owned(name))
    }
}

impl From<Component> for Target {
    fn from(component: Component) -> Self {
        Self::Component(component)
    }
}

/// An immutable UI descriptor.
#[derive(Debug, Clone)]
pub struct Node {
    target: Target,
    props: Props,
    children: Vec<Child>,
    key: Option<String>,
}

impl Node {
    /// Creates a node without props or children.
    #[must_use]
    pub fn new(target: impl Into<Target>) -> Self {
        Self {
            target: target.into(),
            props: Props::new(),
            children: Vec::new(),
            key: None,
        }
    }

    /// Builder-style property insert.
    #[must_use]
    pub fn prop(mut self, key: impl Into<String>, value: impl Into<crate::Prop>) -> Self {
        self.props.insert(key, value);
        self
    }

    /// Builder-style child append.
    #[must_use]
    pub fn child(mut self, child: impl Into<Child>) -> Self {
        self.children.push(child.into());
        self
    }

    /// Gives the node a stable identity.
    ///
    /// A keyed node and its whole subtree keep their state, effects and cached
    /// results when siblings before them are added or removed. Keys must be unique
    /// among the nodes rendered for one target.
    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// The node's target.
    #[must_use]
    pub const fn target(&self) -> &Target {
        &self.target
    }

    /// The node's properties.
    #[must_use]
    pub const fn props(&self) -> &Props {
        &self.props
    }

    /// The node's children.
    #[must_use]
    pub fn children(&self) -> &[Child] {
        &self.children
    }

    /// The stable key, if any.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }
}

/// Builds a node from a target, props and children.
///
/// See also the [`composable!`](crate::composable!) macro.
#[must_use]
pub fn composable(
    target: impl Into<Target>,
    props: Props,
    children: impl IntoIterator<Item = Child>,
) -> Node {
    Node {
        target: target.into(),
        props,
        children: children.into_iter().collect(),
        key: None,
    }
}

/// One entry in a children sequence.
#[derive(Debug, Clone)]
pub enum Child {
    /// A nested descriptor.
    Node(Node),
    /// Raw text, passed through unchanged.
    Text(String),
    /// A raw number, passed through as text.
    Number(f64),
    /// Nothing. Composed as empty and reported as an invalid node.
    Empty,
    /// A value that is neither raw nor a descriptor.
    Invalid(String),
}

impl Child {
    /// Loads a descriptor tree from JSON.
    ///
    /// Objects are read as `{"target": .., "props": {..}, "children": [..], "key": ..}`.
    /// A non-string target yields [`Target::Unsupported`]; `null` yields
    /// [`Child::Empty`]; booleans, arrays and objects without a target yield
    /// [`Child::Invalid`].
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Null => Self::Empty,
            Value::String(text) => Self::Text(text.clone()),
            Value::Number(number) => number
                .as_f64()
                .map_or_else(|| Self::Invalid(number.to_string()), Self::Number),
            Value::Object(object) => {
                let Some(target) = object.get("target") else {
                    return Self::Invalid(value.to_string());
                };
                let target = match target {
                    Value::String(name) => Target::from(name.clone()),
                    other => Target::Unsupported(other.to_string()),
                };
                let props = object
                    .get("props")
                    .and_then(Value::as_object)
                    .map(|props| {
                        props
                            .iter()
                            .map(|(key, value)| (key.clone(), value.clone()))
                            .collect()
                    })
                    .unwrap_or_default();
                let children = object
                    .get("children")
                    .and_then(Value::as_array)
                    .map(|children| children.iter().map(Self::from_value).collect())
                    .unwrap_or_default();
                let key = object.get("key").and_then(Value::as_str).map(str::to_owned);
                Self::Node(Node {
                    target,
                    props,
                    children,
                    key,
                })
            }
            Value::Bool(_) | Value::Array(_) => Self::Invalid(value.to_string()),
        }
    }

    /// Returns the nested node, if this is one.
    #[must_use]
    pub const fn as_node(&self) -> Option<&Node> {
        match self {
            Self::Node(node) => Some(node),
            _ => None,
        }
    }
}

impl From<Node> for Child {
    fn from(node: Node) -> Self {
        Self::Node(node)
    }
}

impl From<&str> for Child {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<String> for Child {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Option<Node>> for Child {
    fn from(node: Option<Node>) -> Self {
        node.map_or(Self::Empty, Self::Node)
    }
}

macro_rules! impl_child_from_number {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Child {
                fn from(number: $ty) -> Self {
                    Self::Number(f64::from(number))
                }
            }
        )*
    };
}

impl_child_from_number!(i8, i16, i32, u8, u16, u32, f32, f64);

/// Formats a raw number the way it is written into output: integral values
/// without a fractional part.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn format_number(number: f64) -> String {
    if number.is_finite() && number.fract() == 0.0 && number.abs() < 1e15 {
        format!("{}", number as i64)
    } else {
        number.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn composable_collects_children() {
        let node = crate::composable!("div", Props::new().with("id", "x"), "a", 1, Node::new("span"));
        assert!(matches!(node.target(), Target::Intrinsic(name) if name == "div"));
        assert_eq!(node.children().len(), 3);
        assert!(matches!(node.children()[1], Child::Number(n) if n == 1.0));
        assert!(node.children()[2].as_node().is_some());
        assert!(node.key().is_none());
    }

    #[test]
    fn fragment_target() {
        assert!(Node::new(FRAGMENT).target().is_fragment());
        assert!(!Node::new("div").target().is_fragment());
    }

    #[test]
    fn loads_trees_from_json() {
        let child = Child::from_value(&json!({
            "target": "ul",
            "props": { "class": "list" },
            "children": [
                { "target": "li", "children": ["one"], "key": "1" },
                { "target": { "class": "Widget" } },
                null,
                true,
                7
            ]
        }));

        let node = child.as_node().expect("node");
        assert_eq!(node.props().get_as::<String>("class").as_deref(), Some("list"));
        let children = node.children();
        assert_eq!(children[0].as_node().and_then(Node::key), Some("1"));
        assert!(matches!(
            children[1].as_node().map(Node::target),
            Some(Target::Unsupported(_))
        ));
        assert!(matches!(children[2], Child::Empty));
        assert!(matches!(children[3], Child::Invalid(_)));
        assert!(matches!(children[4], Child::Number(n) if n == 7.0));
    }

    #[test]
    fn formats_numbers_like_text() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(-2.0), "-2");
        assert_eq!(format_number(1.5), "1.5");
    }
}
