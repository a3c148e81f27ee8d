//! Backend contracts.
//!
//! A [`Composer`] turns one intrinsic node plus its already-composed children into a
//! backend artifact. A [`Sink`] receives the composed root and produces whatever the
//! render call returns (a mounted element, a string, ...).

use futures::future::LocalBoxFuture;

use crate::node::Node;

/// Result of composing one child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Composed<R> {
    /// Nothing was produced (invalid node, unsupported target, failed component).
    Empty,
    /// A raw string or number.
    Text(String),
    /// A backend artifact.
    Node(R),
    /// The children of a fragment, in order.
    Fragment(Vec<Composed<R>>),
}

impl<R> Composed<R> {
    /// Returns `true` for [`Composed::Empty`].
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Visits every text and artifact leaf in order, descending into fragments.
    pub fn for_each_leaf<'a>(&'a self, f: &mut impl FnMut(Leaf<'a, R>)) {
        match self {
            Self::Empty => {}
            Self::Text(text) => f(Leaf::Text(text)),
            Self::Node(node) => f(Leaf::Node(node)),
            Self::Fragment(items) => {
                for item in items {
                    item.for_each_leaf(f);
                }
            }
        }
    }
}

/// A leaf of a [`Composed`] tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Leaf<'a, R> {
    /// Raw text.
    Text(&'a str),
    /// A backend artifact.
    Node(&'a R),
}

/// Builds the backend artifact for one intrinsic node.
pub trait Composer: 'static {
    /// The artifact type. Cached per slot, so cloning should be cheap.
    type Output: Clone + 'static;

    /// Produces the artifact for `node` given its composed `children`.
    fn compose<'a>(
        &'a self,
        node: &'a Node,
        children: &'a [Composed<Self::Output>],
    ) -> LocalBoxFuture<'a, Self::Output>;
}

/// Receives the composed root of a pass.
pub trait Sink<R>: 'static {
    /// What the render call returns.
    type Output;

    /// Hands the composed root to the backend target.
    fn mount(&self, composed: Composed<R>) -> LocalBoxFuture<'_, Self::Output>;
}
