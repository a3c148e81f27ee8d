//! Test doubles shared by the unit tests of this crate.

use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use futures::FutureExt;
use futures::executor::block_on;
use futures::future::LocalBoxFuture;

use crate::{
    Child, Composed, Composer, Node, RenderOptions, Rendered, Runtime, Sink, Target,
    composer::Leaf,
};

/// Renders `<tag>children</tag>` and records every call.
#[derive(Debug, Default)]
pub(crate) struct RecordingComposer {
    calls: RefCell<Vec<String>>,
}

impl Composer for RecordingComposer {
    type Output = String;

    fn compose<'a>(&'a self, node: &'a Node, children: &'a [Composed<String>]) -> LocalBoxFuture<'a, String> {
        let tag = match node.target() {
            Target::Intrinsic(name) => name.to_string(),
            Target::Component(component) => component.name().to_owned(),
            Target::Unsupported(_) => String::new(),
        };
        self.calls.borrow_mut().push(tag.clone());
        let inner: String = children.iter().map(flatten).collect();
        async move { format!("<{tag}>{inner}</{tag}>") }.boxed_local()
    }
}

/// Returns the composed root unchanged.
#[derive(Debug, Default)]
pub(crate) struct PassThrough;

impl Sink<String> for PassThrough {
    type Output = Composed<String>;

    fn mount(&self, composed: Composed<String>) -> LocalBoxFuture<'_, Composed<String>> {
        async move { composed }.boxed_local()
    }
}

/// Concatenates every leaf of a composed tree.
pub(crate) fn flatten(composed: &Composed<String>) -> String {
    let mut out = String::new();
    composed.for_each_leaf(&mut |leaf| match leaf {
        Leaf::Text(text) => out.push_str(text),
        Leaf::Node(node) => out.push_str(node),
    });
    out
}

pub(crate) fn text_of(rendered: &Rendered<Composed<String>>) -> String {
    flatten(&rendered.output)
}

/// A runtime wired to a [`RecordingComposer`] and a [`PassThrough`] sink.
pub(crate) struct Harness {
    pub(crate) runtime: Runtime,
    composer: Rc<RecordingComposer>,
    sink: Rc<PassThrough>,
}

impl Harness {
    pub(crate) fn new() -> Self {
        Self {
            runtime: Runtime::new(),
            composer: Rc::new(RecordingComposer::default()),
            sink: Rc::new(PassThrough),
        }
    }

    pub(crate) fn render(&self, root: impl Into<Child>, target: &str) -> Rendered<Composed<String>> {
        block_on(self.runtime.render(
            root,
            self.composer.clone(),
            self.sink.clone(),
            target,
            RenderOptions::new(),
        ))
        .expect("render")
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.composer.calls.borrow().clone()
    }

    pub(crate) fn clear_calls(&self) {
        self.composer.calls.borrow_mut().clear();
    }
}

/// Suspends once, then completes.
pub(crate) fn yield_now() -> impl Future<Output = ()> {
    struct YieldNow(bool);

    impl Future for YieldNow {
        type Output = ();

        fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
            if self.0 {
                return Poll::Ready(());
            }
            self.0 = true;
            cx.waker().wake_by_ref();
            Poll::Pending
        }
    }

    YieldNow(false)
}
