//! The composition walker.
//!
//! One [`Pass`] walks a tree in pre-order for one render target. Every visited
//! child, raw values included, takes the next position. Children are composed
//! sequentially, so positions are assigned deterministically even when component
//! functions or the composer suspend.
//!
//! Per node:
//!
//! 1. take the next position and resolve its [`SlotId`];
//! 2. raw values are returned as text, invalid subjects compose to nothing;
//! 3. intrinsic nodes compose their children first, then skip the composer call if
//!    the slot's fingerprint is unchanged and no child produced a fresh result;
//! 4. component nodes always run (their hooks must be re-evaluated) and compose the
//!    tree they return; the children they were given are not composed by the walker;
//! 5. the result is cached at the slot.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;
use std::sync::Arc;

use async_channel::Sender;
use futures::FutureExt;
use futures::future::LocalBoxFuture;
use tracing::{error, warn};

use crate::{
    composer::{Composed, Composer},
    error::ComposeError,
    fingerprint::{fingerprint, node_fingerprint},
    hooks::{Hooks, MountQueue},
    node::{Child, Component, Node, Target, format_number},
    scheduler::RerenderRequest,
    store::{Record, SlotId, TargetId},
};

/// Counters for one composition pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassStats {
    /// Children visited, raw values included.
    pub visited: usize,
    /// Composer calls (and fragment assemblies) performed.
    pub composed: usize,
    /// Intrinsic nodes served from the slot cache.
    pub cached: usize,
    /// Component functions invoked.
    pub components: usize,
    /// Keyed nodes whose key path was already used earlier in the pass.
    pub duplicate_keys: usize,
}

/// Output of one visit: the composed value and whether it differs from what the
/// previous pass produced at this slot.
pub(crate) struct Step<R> {
    pub(crate) output: Composed<R>,
    pub(crate) fresh: bool,
}

impl<R> Step<R> {
    const fn stable(output: Composed<R>) -> Self {
        Self {
            output,
            fresh: false,
        }
    }
}

struct Anchor {
    path: Arc<str>,
    base: usize,
}

/// State of one composition pass.
pub(crate) struct Pass<'c, C: Composer> {
    composer: &'c C,
    target: TargetId,
    record: Rc<RefCell<Record>>,
    pass: u64,
    position: usize,
    anchors: Vec<Anchor>,
    keys: HashSet<Arc<str>>,
    mounts: MountQueue,
    requests: Sender<RerenderRequest>,
    pub(crate) stats: PassStats,
    pub(crate) diagnostics: Vec<ComposeError>,
}

impl<'c, C: Composer> Pass<'c, C> {
    pub(crate) fn new(
        composer: &'c C,
        target: TargetId,
        record: Rc<RefCell<Record>>,
        pass: u64,
        requests: Sender<RerenderRequest>,
    ) -> Self {
        Self {
            composer,
            target,
            record,
            pass,
            position: 0,
            anchors: Vec::new(),
            keys: HashSet::new(),
            mounts: Rc::new(RefCell::new(Vec::new())),
            requests,
            stats: PassStats::default(),
            diagnostics: Vec::new(),
        }
    }

    pub(crate) fn mounts(&self) -> MountQueue {
        self.mounts.clone()
    }

    fn slot_for(&self, position: usize) -> SlotId {
        self.anchors.last().map_or_else(
            || SlotId::position(position),
            |anchor| SlotId::keyed(anchor.path.clone(), position - anchor.base),
        )
    }

    fn report(&mut self, error: ComposeError) {
        match &error {
            ComposeError::UnsupportedTarget { .. } => {
                warn!(render_target = %self.target, pass = self.pass, "{error}");
            }
            _ => error!(render_target = %self.target, pass = self.pass, "{error}"),
        }
        self.diagnostics.push(error);
    }

    /// Composes one child, recursing into its subtree.
    pub(crate) fn visit<'a>(&'a mut self, child: &'a Child) -> LocalBoxFuture<'a, Step<C::Output>> {
        async move {
            let position = self.position;
            self.position += 1;
            self.stats.visited += 1;

            match child {
                Child::Text(text) => Step::stable(Composed::Text(text.clone())),
                Child::Number(number) => Step::stable(Composed::Text(format_number(*number))),
                Child::Empty => {
                    let slot = self.slot_for(position);
                    self.report(ComposeError::InvalidNode {
                        slot,
                        description: "empty composition subject".into(),
                    });
                    Step::stable(Composed::Empty)
                }
                Child::Invalid(description) => {
                    let slot = self.slot_for(position);
                    self.report(ComposeError::InvalidNode {
                        slot,
                        description: description.clone(),
                    });
                    Step::stable(Composed::Empty)
                }
                Child::Node(node) => {
                    let anchored = self.enter(node, position);
                    let slot = self.slot_for(position);
                    let step = self.visit_node(node, slot).await;
                    if anchored {
                        self.anchors.pop();
                    }
                    step
                }
            }
        }
        .boxed_local()
    }

    fn enter(&mut self, node: &Node, position: usize) -> bool {
        let Some(key) = node.key() else {
            return false;
        };
        let path: Arc<str> = match self.anchors.last() {
            Some(parent) => format!("{}/{key}", parent.path).into(),
            None => key.into(),
        };
        if !self.keys.insert(path.clone()) {
            self.stats.duplicate_keys += 1;
            warn!(
                render_target = %self.target,
                pass = self.pass,
                key = %path,
                "duplicate key; the nodes share one slot"
            );
        }
        self.anchors.push(Anchor {
            path,
            base: position,
        });
        true
    }

    async fn visit_node(&mut self, node: &Node, slot: SlotId) -> Step<C::Output> {
        match node.target() {
            Target::Intrinsic(_) => self.visit_intrinsic(node, slot).await,
            Target::Component(component) => self.visit_component(node, component, slot).await,
            Target::Unsupported(description) => {
                self.report(ComposeError::UnsupportedTarget {
                    slot,
                    description: description.clone(),
                });
                Step::stable(Composed::Empty)
            }
        }
    }

    async fn visit_children(&mut self, children: &[Child]) -> (Vec<Composed<C::Output>>, bool) {
        let mut composed = Vec::with_capacity(children.len());
        let mut fresh = false;
        for child in children {
            let step = self.visit(child).await;
            fresh |= step.fresh;
            composed.push(step.output);
        }
        (composed, fresh)
    }

    async fn visit_intrinsic(&mut self, node: &Node, slot: SlotId) -> Step<C::Output> {
        let (children, children_fresh) = self.visit_children(node.children()).await;
        let print = node_fingerprint(node, &slot);

        if !children_fresh {
            let cached = self
                .record
                .borrow()
                .slots
                .get(&slot)
                .and_then(|entry| entry.cached::<Composed<C::Output>>(print));
            if let Some(output) = cached {
                self.stats.cached += 1;
                return Step::stable(output);
            }
        }

        self.record.borrow_mut().slot_mut(&slot).fingerprint = Some(print);
        self.stats.composed += 1;
        let output = if node.target().is_fragment() {
            Composed::Fragment(children)
        } else {
            Composed::Node(self.composer.compose(node, &children).await)
        };
        self.store(&slot, &output);
        Step {
            output,
            fresh: true,
        }
    }

    async fn visit_component(&mut self, node: &Node, component: &Component, slot: SlotId) -> Step<C::Output> {
        let hooks = Hooks::new(
            self.target.clone(),
            slot.clone(),
            self.pass,
            &self.record,
            self.mounts.clone(),
            self.requests.clone(),
        );
        let props = node.props().clone().with_children(node.children().to_vec());
        self.stats.components += 1;

        let returned = match component.call(props, hooks).await {
            Ok(returned) => returned,
            Err(err) => {
                self.report(ComposeError::Component {
                    slot: slot.clone(),
                    component: component.name().to_owned(),
                    message: format!("{err:#}"),
                });
                {
                    let mut record = self.record.borrow_mut();
                    let entry = record.slot_mut(&slot);
                    entry.fingerprint = None;
                    entry.rendered = None;
                }
                return Step {
                    output: Composed::Empty,
                    fresh: true,
                };
            }
        };

        let print = fingerprint(&returned, &slot);
        let changed = self
            .record
            .borrow()
            .slots
            .get(&slot)
            .is_none_or(|entry| entry.fingerprint != Some(print));

        let step = self.visit(&returned).await;
        {
            let mut record = self.record.borrow_mut();
            record.slot_mut(&slot).fingerprint = Some(print);
        }
        self.store(&slot, &step.output);
        Step {
            fresh: step.fresh || changed,
            output: step.output,
        }
    }

    fn store(&self, slot: &SlotId, output: &Composed<C::Output>) {
        self.record.borrow_mut().slot_mut(slot).rendered = Some(Rc::new(output.clone()));
    }
}
