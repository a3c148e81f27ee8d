//! The render entry point and the re-render scheduler loop.
//!
//! A [`Runtime`] owns the render state store, the pass lock and the re-render
//! queue. All three used to be process-wide; owning them here lets independent
//! runtimes (one per test, one per window) coexist.
//!
//! # Re-rendering
//!
//! ```text
//! Setter::set ──▶ pending update ──▶ RerenderRequest ──▶ Runtime::run ──▶ listener ──▶ pass
//! ```
//!
//! A render call with [`RenderOptions::allow_rerender`] installs a listener on the
//! target's record. [`Runtime::run`] (or [`Runtime::run_until_idle`]) drains the
//! request queue and invokes the listener, which runs a full pass from the root
//! descriptor of the original call.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use futures::FutureExt;
use futures::lock::Mutex;
use tracing::{debug, error, info, warn};

use crate::{
    compose::Pass,
    composer::{Composer, Sink},
    config::{LockScope, RenderOptions, RuntimeConfig},
    error::{ComposeError, HookError, RenderError},
    hooks::MountQueue,
    node::Child,
    scheduler::{RerenderRequest, Scheduler},
    store::{Record, Rerender, Store, TargetId},
};

pub use crate::compose::PassStats;

// ============================================================================
// Results
// ============================================================================

/// Result of one composition pass.
#[derive(Debug, Clone)]
pub struct Rendered<T> {
    /// What the sink produced.
    pub output: T,
    /// Pass number for the target, starting at 1.
    pub pass: u64,
    /// Walker counters.
    pub stats: PassStats,
    /// Nodes that composed to nothing, in visitation order.
    pub diagnostics: Vec<ComposeError>,
}

impl<T> Rendered<T> {
    /// Discards everything but the sink output.
    pub fn into_output(self) -> T {
        self.output
    }
}

/// Snapshot of a target's record, for inspection and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordSummary {
    /// Passes run so far.
    pub passes: u64,
    /// Slots holding state, effects or cached output.
    pub slots: usize,
    /// Whether a pass is running right now.
    pub in_progress: bool,
    /// Whether a re-render listener is installed.
    pub subscribed: bool,
    /// Setter writes waiting for the next pass.
    pub pending_updates: usize,
}

// ============================================================================
// Runtime
// ============================================================================

struct RuntimeInner {
    config: RuntimeConfig,
    store: Store,
    lock: Mutex<()>,
    scheduler: Scheduler,
}

/// Owner of render state and the re-render queue.
///
/// Cloning is cheap; clones share everything. A runtime is single-threaded and
/// executor-agnostic: drive its futures with whatever local executor the
/// application uses.
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

impl core::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Runtime")
            .field("config", &self.inner.config)
            .field("targets", &self.inner.store.targets())
            .finish_non_exhaustive()
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl Runtime {
    /// Creates a runtime with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::new())
    }

    /// Creates a runtime with `config`.
    #[must_use]
    pub fn with_config(config: RuntimeConfig) -> Self {
        debug!(?config, "runtime created");
        Self {
            inner: Rc::new(RuntimeInner {
                config,
                store: Store::default(),
                lock: Mutex::new(()),
                scheduler: Scheduler::new(config.coalesces()),
            }),
        }
    }

    /// The runtime's configuration.
    #[must_use]
    pub fn config(&self) -> RuntimeConfig {
        self.inner.config
    }

    /// Runs a composition pass of `root` for `target` and hands the result to `sink`.
    ///
    /// The target's record is created on first use. When `options` subscribe, later
    /// state changes re-run this same root through the same composer and sink.
    ///
    /// # Errors
    ///
    /// [`RenderError::MissingTarget`] when `target` is empty. Per-node failures do
    /// not fail the call; they are returned in [`Rendered::diagnostics`].
    pub async fn render<C, S>(
        &self,
        root: impl Into<Child>,
        composer: Rc<C>,
        sink: Rc<S>,
        target: impl Into<TargetId>,
        options: RenderOptions<S::Output>,
    ) -> Result<Rendered<S::Output>, RenderError>
    where
        C: Composer,
        S: Sink<C::Output>,
        S::Output: 'static,
    {
        let target = target.into();
        if target.is_empty() {
            error!("render rejected: {}", RenderError::MissingTarget);
            return Err(RenderError::MissingTarget);
        }

        let root = Rc::new(root.into());
        let listener = options.subscribes().then(|| {
            self.listener(
                root.clone(),
                composer.clone(),
                sink.clone(),
                target.clone(),
                options.on_rerender.clone(),
            )
        });
        let record = self.inner.store.get_or_create(&target);
        record.borrow_mut().listener = listener;

        Ok(self.pass(&root, composer.as_ref(), sink.as_ref(), &target).await)
    }

    fn listener<C, S>(
        &self,
        root: Rc<Child>,
        composer: Rc<C>,
        sink: Rc<S>,
        target: TargetId,
        on_rerender: Option<Rc<dyn Fn(&Rendered<S::Output>)>>,
    ) -> Rerender
    where
        C: Composer,
        S: Sink<C::Output>,
        S::Output: 'static,
    {
        let runtime: Weak<RuntimeInner> = Rc::downgrade(&self.inner);
        Rc::new(move || {
            let runtime = runtime.clone();
            let root = root.clone();
            let composer = composer.clone();
            let sink = sink.clone();
            let target = target.clone();
            let on_rerender = on_rerender.clone();
            async move {
                let Some(inner) = runtime.upgrade() else {
                    return;
                };
                let runtime = Runtime { inner };
                let rendered = runtime
                    .pass(&root, composer.as_ref(), sink.as_ref(), &target)
                    .await;
                if let Some(callback) = on_rerender {
                    callback(&rendered);
                }
            }
            .boxed_local()
        })
    }

    async fn pass<C, S>(&self, root: &Child, composer: &C, sink: &S, target: &TargetId) -> Rendered<S::Output>
    where
        C: Composer,
        S: Sink<C::Output>,
    {
        let record = self.inner.store.get_or_create(target);
        let target_lock = record.borrow().lock.clone();
        let guard = match self.inner.config.scope() {
            LockScope::Global => self.inner.lock.lock().await,
            LockScope::PerTarget => target_lock.lock().await,
        };

        let (pass, applied) = {
            let mut record = record.borrow_mut();
            let applied = record.apply_pending();
            record.pass += 1;
            record.in_progress = true;
            (record.pass, applied)
        };
        debug!(render_target = %target, pass, applied, "pass started");

        let mut walker = Pass::new(composer, target.clone(), record.clone(), pass, self.inner.scheduler.sender());
        let step = walker.visit(root).await;
        record.borrow_mut().in_progress = false;

        let stats = walker.stats;
        let diagnostics = core::mem::take(&mut walker.diagnostics);
        let mounts = walker.mounts();
        drop(walker);

        let output = sink.mount(step.output).await;
        let effects = run_mounts(&record, &mounts).await;
        drop(guard);

        info!(
            render_target = %target,
            pass,
            visited = stats.visited,
            composed = stats.composed,
            cached = stats.cached,
            effects,
            diagnostics = diagnostics.len(),
            "pass finished"
        );

        Rendered {
            output,
            pass,
            stats,
            diagnostics,
        }
    }

    // ------------------------------------------------------------------------
    // Scheduler
    // ------------------------------------------------------------------------

    /// Queues a re-render of `target`, as a state setter would.
    ///
    /// # Errors
    ///
    /// [`HookError::SchedulerClosed`] after [`shutdown`](Self::shutdown).
    pub fn request_rerender(&self, target: impl Into<TargetId>) -> Result<(), HookError> {
        self.inner
            .scheduler
            .sender()
            .try_send(RerenderRequest::new(target.into()))
            .map_err(|_| HookError::SchedulerClosed)
    }

    /// Processes re-render requests until [`shutdown`](Self::shutdown) is called.
    ///
    /// Requests for targets without a listener are dropped.
    pub async fn run(&self) {
        while let Some(batch) = self.inner.scheduler.next_batch().await {
            for request in batch {
                self.dispatch(&request).await;
            }
        }
        debug!("scheduler stopped");
    }

    /// Processes every queued re-render request, including the ones raised by the
    /// passes it runs, and returns the number of passes run.
    ///
    /// A component that sets state unconditionally on every pass never lets this
    /// return.
    pub async fn run_until_idle(&self) -> usize {
        let mut passes = 0;
        while let Some(batch) = self.inner.scheduler.ready_batch() {
            for request in batch {
                if self.dispatch(&request).await {
                    passes += 1;
                }
            }
        }
        passes
    }

    async fn dispatch(&self, request: &RerenderRequest) -> bool {
        let listener = match self.inner.store.get(request.target()) {
            Some(record) => {
                let record = record.borrow();
                record.listener.clone()
            }
            None => None,
        };
        match listener {
            Some(listener) => {
                listener().await;
                true
            }
            None => {
                debug!(render_target = %request.target(), "re-render request dropped: no subscription");
                false
            }
        }
    }

    /// Closes the re-render queue. [`run`](Self::run) returns once the queued
    /// requests are drained, and setters fail with [`HookError::SchedulerClosed`].
    pub fn shutdown(&self) {
        if self.inner.scheduler.close() {
            info!("scheduler shut down");
        }
    }

    /// Whether [`shutdown`](Self::shutdown) has been called.
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.inner.scheduler.is_closed()
    }

    // ------------------------------------------------------------------------
    // Records
    // ------------------------------------------------------------------------

    /// Drops the record of `target`, running every captured effect teardown.
    ///
    /// Waits for a running pass of the target to finish first. Returns `false` if
    /// the target was never rendered.
    pub async fn dispose(&self, target: impl Into<TargetId>) -> bool {
        let target = target.into();
        let Some(record) = self.inner.store.get(&target) else {
            return false;
        };
        let target_lock = record.borrow().lock.clone();
        let guard = match self.inner.config.scope() {
            LockScope::Global => self.inner.lock.lock().await,
            LockScope::PerTarget => target_lock.lock().await,
        };

        self.inner.store.remove(&target);
        let teardowns = {
            let mut record = record.borrow_mut();
            record.listener = None;
            record.take_teardowns()
        };
        drop(guard);

        let count = teardowns.len();
        for teardown in teardowns {
            teardown.run();
        }
        info!(render_target = %target, teardowns = count, "render target disposed");
        true
    }

    /// Summarizes the record of `target`.
    #[must_use]
    pub fn inspect(&self, target: impl Into<TargetId>) -> Option<RecordSummary> {
        let record = self.inner.store.get(&target.into())?;
        let record = record.borrow();
        Some(RecordSummary {
            passes: record.pass,
            slots: record.slots.len(),
            in_progress: record.in_progress,
            subscribed: record.listener.is_some(),
            pending_updates: record.pending.len(),
        })
    }

    /// Every target with a record, sorted.
    #[must_use]
    pub fn targets(&self) -> Vec<TargetId> {
        self.inner.store.targets()
    }
}

/// Runs the mount callbacks queued during a pass, in registration order, and keeps
/// their teardowns.
async fn run_mounts(record: &Rc<RefCell<Record>>, mounts: &MountQueue) -> usize {
    let pending = core::mem::take(&mut *mounts.borrow_mut());
    let count = pending.len();
    for mount in pending {
        let teardown = (mount.mount)().await;
        if teardown.is_none() {
            continue;
        }
        let orphan = {
            let mut record = record.borrow_mut();
            match record.slot_mut(&mount.slot).effects.get_mut(mount.index) {
                Some(effect) => {
                    effect.teardowns.push(teardown);
                    None
                }
                None => Some(teardown),
            }
        };
        if let Some(teardown) = orphan {
            warn!(slot = %mount.slot, index = mount.index, "effect slot vanished; running teardown now");
            teardown.run();
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Harness, PassThrough, RecordingComposer, text_of, yield_now};
    use crate::{Component, Hooks, Node, Props, Teardown, composable};
    use futures::executor::{LocalPool, block_on};
    use futures::task::LocalSpawnExt;
    use std::cell::Cell;

    fn clicker(clicks: Rc<RefCell<Vec<crate::Setter<u32>>>>) -> Component {
        Component::from_fn("Clicker", move |_props: Props, hooks: Hooks| {
            let (count, set_count) = hooks.use_state(0_u32)?;
            clicks.borrow_mut().push(set_count);
            Ok(Node::new("button").child(count).into())
        })
    }

    #[test]
    fn unchanged_renders_make_no_composer_calls() {
        let harness = Harness::new();
        let tree = || crate::composable!("div", Props::new().with("id", "x"), "a", crate::composable!("b", Props::new(), 1));
        harness.render(tree(), "same");
        let calls = harness.calls().len();
        let second = harness.render(tree(), "same");
        assert_eq!(harness.calls().len(), calls);
        assert_eq!(text_of(&second), "<div>a<b>1</b></div>");
        assert_eq!(second.pass, 2);
    }

    #[test]
    fn unkeyed_state_follows_position() {
        let harness = Harness::new();
        let named = Component::from_fn("Named", |props: Props, hooks: Hooks| {
            let name: String = props.get_as("name").unwrap_or_default();
            let (first_seen, _) = hooks.use_state(name)?;
            Ok(Child::from(first_seen))
        });
        let row = |name: &'static str| Child::from(Node::new(named.clone()).prop("name", name));

        harness.render(composable("ul", Props::new(), [row("a"), row("b")]), "pos");
        let rendered = harness.render(composable("ul", Props::new(), [row("b")]), "pos");
        // "b" now sits where "a" was and inherits its state.
        assert_eq!(text_of(&rendered), "<ul>a</ul>");
    }

    #[test]
    fn keyed_state_survives_reordering() {
        let harness = Harness::new();
        let named = Component::from_fn("Named", |props: Props, hooks: Hooks| {
            let name: String = props.get_as("name").unwrap_or_default();
            let (first_seen, _) = hooks.use_state(name)?;
            Ok(Child::from(first_seen))
        });
        let row = |name: &'static str| Child::from(Node::new(named.clone()).prop("name", name).with_key(name));

        harness.render(composable("ul", Props::new(), [row("a"), row("b")]), "keys");
        let rendered = harness.render(composable("ul", Props::new(), [row("b")]), "keys");
        assert_eq!(text_of(&rendered), "<ul>b</ul>");
    }

    fn interleaving(scope: LockScope) -> Vec<String> {
        let runtime = Runtime::with_config(RuntimeConfig::new().lock_scope(scope));
        let log = Rc::new(RefCell::new(Vec::new()));
        let slow = Component::new("Slow", {
            let log = log.clone();
            move |_props: Props, hooks: Hooks| {
                let log = log.clone();
                async move {
                    log.borrow_mut().push(format!("start {}", hooks.target()));
                    yield_now().await;
                    log.borrow_mut().push(format!("end {}", hooks.target()));
                    Ok::<_, anyhow::Error>(Child::from("done"))
                }
            }
        });

        let mut pool = LocalPool::new();
        let spawner = pool.spawner();
        for target in ["a", "b"] {
            let runtime = runtime.clone();
            let slow = slow.clone();
            spawner
                .spawn_local(async move {
                    runtime
                        .render(
                            Node::new(slow),
                            Rc::new(RecordingComposer::default()),
                            Rc::new(PassThrough),
                            target,
                            RenderOptions::new(),
                        )
                        .await
                        .unwrap();
                })
                .unwrap();
        }
        pool.run();
        let order = core::mem::take(&mut *log.borrow_mut());
        order
    }

    #[test]
    fn global_lock_serializes_passes_across_targets() {
        assert_eq!(interleaving(LockScope::Global), ["start a", "end a", "start b", "end b"]);
    }

    #[test]
    fn per_target_lock_lets_targets_interleave() {
        assert_eq!(interleaving(LockScope::PerTarget), ["start a", "start b", "end a", "end b"]);
    }

    #[test]
    fn mount_effects_finish_before_the_lock_is_released() {
        let runtime = Runtime::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let mounted = Component::from_fn("Mounted", {
            let log = log.clone();
            move |_props: Props, hooks: Hooks| {
                let target = hooks.target().to_string();
                log.borrow_mut().push(format!("pass {target}"));
                let log = log.clone();
                hooks.use_effect(move || async move {
                    log.borrow_mut().push(format!("effect start {target}"));
                    yield_now().await;
                    log.borrow_mut().push(format!("effect end {target}"));
                })?;
                Ok(Child::from("mounted"))
            }
        });

        let mut pool = LocalPool::new();
        let spawner = pool.spawner();
        for target in ["a", "b"] {
            let runtime = runtime.clone();
            let mounted = mounted.clone();
            spawner
                .spawn_local(async move {
                    runtime
                        .render(
                            Node::new(mounted),
                            Rc::new(RecordingComposer::default()),
                            Rc::new(PassThrough),
                            target,
                            RenderOptions::new(),
                        )
                        .await
                        .unwrap();
                })
                .unwrap();
        }
        pool.run();
        assert_eq!(
            *log.borrow(),
            [
                "pass a",
                "effect start a",
                "effect end a",
                "pass b",
                "effect start b",
                "effect end b",
            ]
        );
    }

    #[test]
    fn setter_triggers_exactly_one_rerender() {
        let runtime = Runtime::new();
        let setters = Rc::new(RefCell::new(Vec::new()));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let options = RenderOptions::new().on_rerender({
            let seen = seen.clone();
            move |rendered: &Rendered<crate::Composed<String>>| {
                seen.borrow_mut().push(crate::testing::flatten(&rendered.output));
            }
        });

        let first = block_on(runtime.render(
            Node::new(clicker(setters.clone())),
            Rc::new(RecordingComposer::default()),
            Rc::new(PassThrough),
            "clicks",
            options,
        ))
        .unwrap();
        assert_eq!(crate::testing::flatten(&first.output), "<button>0</button>");
        assert_eq!(block_on(runtime.run_until_idle()), 0);

        let setter = setters.borrow()[0].clone();
        setter.set(1).unwrap();
        assert_eq!(runtime.inspect("clicks").unwrap().pending_updates, 1);
        assert_eq!(block_on(runtime.run_until_idle()), 1);
        assert_eq!(*seen.borrow(), ["<button>1</button>"]);
        assert_eq!(runtime.inspect("clicks").unwrap().passes, 2);
    }

    #[test]
    fn coalescing_collapses_queued_requests() {
        let runtime = Runtime::with_config(RuntimeConfig::new().coalesce_rerenders(true));
        let setters = Rc::new(RefCell::new(Vec::new()));
        block_on(runtime.render(
            Node::new(clicker(setters.clone())),
            Rc::new(RecordingComposer::default()),
            Rc::new(PassThrough),
            "burst",
            RenderOptions::new().allow_rerender(true),
        ))
        .unwrap();

        let setter = setters.borrow()[0].clone();
        for value in 1..=3 {
            setter.set(value).unwrap();
        }
        assert_eq!(block_on(runtime.run_until_idle()), 1);
        assert_eq!(runtime.inspect("burst").unwrap().passes, 2);
    }

    #[test]
    fn requests_without_subscription_are_dropped() {
        let harness = Harness::new();
        harness.render(Node::new("p"), "quiet");
        harness.runtime.request_rerender("quiet").unwrap();
        harness.runtime.request_rerender("nobody").unwrap();
        assert_eq!(block_on(harness.runtime.run_until_idle()), 0);
        assert!(!harness.runtime.inspect("quiet").unwrap().subscribed);
    }

    #[test]
    fn scheduler_loop_stops_on_shutdown() {
        let runtime = Runtime::new();
        let setters = Rc::new(RefCell::new(Vec::new()));
        block_on(runtime.render(
            Node::new(clicker(setters.clone())),
            Rc::new(RecordingComposer::default()),
            Rc::new(PassThrough),
            "loop",
            RenderOptions::new().allow_rerender(true),
        ))
        .unwrap();

        let mut pool = LocalPool::new();
        pool.spawner()
            .spawn_local({
                let runtime = runtime.clone();
                async move { runtime.run().await }
            })
            .unwrap();

        setters.borrow()[0].set(5).unwrap();
        pool.run_until_stalled();
        assert_eq!(runtime.inspect("loop").unwrap().passes, 2);

        runtime.shutdown();
        pool.run();
        assert!(runtime.is_shut_down());
        assert!(matches!(setters.borrow()[0].set(6), Err(HookError::SchedulerClosed)));
    }

    #[test]
    fn dispose_runs_teardowns_and_forgets_state() {
        let harness = Harness::new();
        let torn = Rc::new(Cell::new(0));
        let component = Component::from_fn("Subscribed", {
            let torn = torn.clone();
            move |_props: Props, hooks: Hooks| {
                let torn = torn.clone();
                hooks.use_effect(move || async move { Teardown::new(move || torn.set(torn.get() + 1)) })?;
                Ok(Child::from("live"))
            }
        });

        harness.render(Node::new(component.clone()), "gone");
        harness.render(Node::new(component), "gone");
        assert_eq!(torn.get(), 0);

        assert!(block_on(harness.runtime.dispose("gone")));
        assert_eq!(torn.get(), 1);
        assert!(harness.runtime.inspect("gone").is_none());
        assert!(!block_on(harness.runtime.dispose("gone")));
    }

    #[test]
    fn empty_target_is_rejected() {
        let runtime = Runtime::new();
        let result = block_on(runtime.render(
            Node::new("div"),
            Rc::new(RecordingComposer::default()),
            Rc::new(PassThrough),
            "  ",
            RenderOptions::new(),
        ));
        assert!(matches!(result, Err(RenderError::MissingTarget)));
        assert!(runtime.targets().is_empty());
    }

    #[test]
    fn state_is_independent_across_targets() {
        let harness = Harness::new();
        let setters = Rc::new(RefCell::new(Vec::new()));
        let component = clicker(setters.clone());

        harness.render(Node::new(component.clone()), "left");
        harness.render(Node::new(component.clone()), "right");
        let left = setters.borrow()[0].clone();
        left.set(3).unwrap();

        let left_pass = harness.render(Node::new(component.clone()), "left");
        let right_pass = harness.render(Node::new(component), "right");
        assert_eq!(text_of(&left_pass), "<button>3</button>");
        assert_eq!(text_of(&right_pass), "<button>0</button>");
        assert_eq!(harness.runtime.inspect("right").unwrap().pending_updates, 0);
    }

    #[test]
    fn records_are_per_target() {
        let harness = Harness::new();
        harness.render(Node::new("a"), "one");
        harness.render(Node::new("b"), "two");
        harness.render(Node::new("b"), "two");
        assert_eq!(harness.runtime.targets(), [TargetId::from("one"), TargetId::from("two")]);
        assert_eq!(harness.runtime.inspect("one").unwrap().passes, 1);
        assert_eq!(harness.runtime.inspect("two").unwrap().passes, 2);
        assert!(!harness.runtime.inspect("two").unwrap().in_progress);
    }
}
