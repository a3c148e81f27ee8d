//! Property bags attached to nodes.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{event::Event, handler::Handler, node::Child};

/// A single property value: plain data or an event handler.
#[derive(Debug, Clone)]
pub enum Prop {
    /// Plain data, applied by backends as an attribute.
    Value(Value),
    /// A callback, subscribed by backends when the key is an event handler prop.
    Handler(Handler),
}

impl Prop {
    /// Returns the data value, if this is not a handler.
    #[must_use]
    pub const fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(value) => Some(value),
            Self::Handler(_) => None,
        }
    }

    /// Returns the handler, if this is one.
    #[must_use]
    pub const fn as_handler(&self) -> Option<&Handler> {
        match self {
            Self::Handler(handler) => Some(handler),
            Self::Value(_) => None,
        }
    }
}

impl From<Value> for Prop {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<Handler> for Prop {
    fn from(handler: Handler) -> Self {
        Self::Handler(handler)
    }
}

macro_rules! impl_prop_from_value {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Prop {
                fn from(value: $ty) -> Self {
                    Self::Value(Value::from(value))
                }
            }
        )*
    };
}

impl_prop_from_value!(&str, String, bool, i32, i64, u32, u64, usize, f64);

/// Properties of a node.
///
/// Keys are kept sorted so that iteration, attribute output and fingerprints are
/// deterministic. `children` is only populated on the copy handed to a component
/// function; the children of a [`Node`](crate::Node) live on the node itself.
#[derive(Debug, Clone, Default)]
pub struct Props {
    entries: BTreeMap<String, Prop>,
    children: Vec<Child>,
}

impl Props {
    /// Creates an empty property bag.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Prop>) -> Self {
        self.insert(key, value);
        self
    }

    /// Builder-style insert of an event handler.
    #[must_use]
    pub fn on(self, key: impl Into<String>, handler: impl Fn(&Event) + 'static) -> Self {
        self.with(key, Handler::new(handler))
    }

    /// Inserts or replaces a property, returning the previous one.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Prop>) -> Option<Prop> {
        self.entries.insert(key.into(), value.into())
    }

    /// Returns the property stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Prop> {
        self.entries.get(key)
    }

    /// Returns the data value stored under `key`.
    #[must_use]
    pub fn value(&self, key: &str) -> Option<&Value> {
        self.get(key).and_then(Prop::as_value)
    }

    /// Deserializes the data value stored under `key`.
    ///
    /// Returns `None` when the key is missing, holds a handler, or does not fit `T`.
    #[must_use]
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.value(key)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    /// Returns the handler stored under `key`.
    #[must_use]
    pub fn handler(&self, key: &str) -> Option<&Handler> {
        self.get(key).and_then(Prop::as_handler)
    }

    /// Iterates over all properties in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Prop)> {
        self.entries.iter().map(|(key, prop)| (key.as_str(), prop))
    }

    /// Number of properties, children excluded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when there are no properties.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Children handed to a component function.
    #[must_use]
    pub fn children(&self) -> &[Child] {
        &self.children
    }

    /// Takes the children out, leaving an empty sequence.
    pub fn take_children(&mut self) -> Vec<Child> {
        core::mem::take(&mut self.children)
    }

    pub(crate) fn with_children(mut self, children: Vec<Child>) -> Self {
        self.children = children;
        self
    }
}

impl<K: Into<String>, V: Into<Prop>> FromIterator<(K, V)> for Props {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut props = Self::new();
        for (key, value) in iter {
            props.insert(key, value);
        }
        props
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn typed_access() {
        let props = Props::new()
            .with("count", 3)
            .with("title", "hello")
            .with("style", json!({ "color": "red" }))
            .on("onClick", |_| {});

        assert_eq!(props.get_as::<i32>("count"), Some(3));
        assert_eq!(props.get_as::<String>("title").as_deref(), Some("hello"));
        assert_eq!(props.get_as::<i32>("title"), None);
        assert!(props.handler("onClick").is_some());
        assert!(props.value("onClick").is_none());
        assert_eq!(props.value("style"), Some(&json!({ "color": "red" })));
    }

    #[test]
    fn iterates_in_key_order() {
        let props: Props = [("b", 1), ("a", 2), ("c", 3)].into_iter().collect();
        let keys: Vec<_> = props.iter().map(|(key, _)| key).collect();
        assert_eq!(keys, ["a", "b", "c"]);
        assert_eq!(props.len(), 3);
    }

    #[test]
    fn clones_are_independent() {
        let original = Props::new().with("list", json!([1, 2]));
        let mut copy = original.clone();
        copy.insert("list", json!([]));
        assert_eq!(original.value("list"), Some(&json!([1, 2])));
    }
}
