//! Component-local state and mount effects.
//!
//! Every component invocation receives a [`Hooks`] handle bound to the node's slot.
//! Hook calls inside one invocation are numbered in call order, so each call site
//! gets a stable state or effect index as long as hooks are called unconditionally
//! and in the same order on every pass.
//!
//! ```text
//! slot 4 ─┬─ state[0]   use_state(0)
//!         ├─ state[1]   use_state(Form::default())
//!         └─ effects[0] use_effect(|| async { .. })
//! ```

use std::any::TypeId;
use std::cell::{Cell, RefCell};
use std::collections::hash_map::DefaultHasher;
use std::future::Future;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::rc::{Rc, Weak};

use async_channel::Sender;
use futures::FutureExt;
use futures::future::LocalBoxFuture;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use tracing::trace;

use crate::{
    error::HookError,
    scheduler::RerenderRequest,
    store::{EffectSignature, EffectSlot, Record, SlotId, StateUpdate, TargetId},
};

// ============================================================================
// Teardown
// ============================================================================

/// Value returned by a mount effect, run when the render target is disposed.
#[derive(Default)]
pub struct Teardown(Option<Box<dyn FnOnce()>>);

impl Teardown {
    /// A teardown that does nothing.
    #[must_use]
    pub const fn none() -> Self {
        Self(None)
    }

    /// Wraps a cleanup closure.
    pub fn new(cleanup: impl FnOnce() + 'static) -> Self {
        Self(Some(Box::new(cleanup)))
    }

    /// Returns `true` when there is nothing to run.
    #[must_use]
    pub const fn is_none(&self) -> bool {
        self.0.is_none()
    }

    /// Runs the cleanup, if any.
    pub fn run(self) {
        if let Some(cleanup) = self.0 {
            cleanup();
        }
    }
}

impl From<()> for Teardown {
    fn from((): ()) -> Self {
        Self::none()
    }
}

impl core::fmt::Debug for Teardown {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(if self.is_none() { "Teardown(none)" } else { "Teardown(..)" })
    }
}

// ============================================================================
// Pending mounts
// ============================================================================

type Mount = Box<dyn FnOnce() -> LocalBoxFuture<'static, Teardown>>;

/// A mount callback queued during a pass, run once the pass has been sunk.
pub(crate) struct PendingMount {
    pub(crate) slot: SlotId,
    pub(crate) index: usize,
    pub(crate) mount: Mount,
}

impl_debug!(PendingMount);

pub(crate) type MountQueue = Rc<RefCell<Vec<PendingMount>>>;

// ============================================================================
// Hooks
// ============================================================================

struct HookScope {
    target: TargetId,
    slot: SlotId,
    pass: u64,
    record: Weak<RefCell<Record>>,
    state_index: Cell<usize>,
    effect_index: Cell<usize>,
    mounts: MountQueue,
    requests: Sender<RerenderRequest>,
}

/// Hook handle for one component invocation.
///
/// Valid only during the composition pass that created it; afterwards every hook
/// returns [`HookError::OutsidePass`].
#[derive(Clone)]
pub struct Hooks {
    scope: Rc<HookScope>,
}

impl core::fmt::Debug for Hooks {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Hooks")
            .field("target", &self.scope.target)
            .field("slot", &self.scope.slot)
            .field("pass", &self.scope.pass)
            .finish_non_exhaustive()
    }
}

impl Hooks {
    pub(crate) fn new(
        target: TargetId,
        slot: SlotId,
        pass: u64,
        record: &Rc<RefCell<Record>>,
        mounts: MountQueue,
        requests: Sender<RerenderRequest>,
    ) -> Self {
        Self {
            scope: Rc::new(HookScope {
                target,
                slot,
                pass,
                record: Rc::downgrade(record),
                state_index: Cell::new(0),
                effect_index: Cell::new(0),
                mounts,
                requests,
            }),
        }
    }

    /// The render target this handle belongs to.
    #[must_use]
    pub fn target(&self) -> &TargetId {
        &self.scope.target
    }

    /// The slot of the component node.
    #[must_use]
    pub fn slot(&self) -> &SlotId {
        &self.scope.slot
    }

    fn active(&self) -> Result<Rc<RefCell<Record>>, HookError> {
        let record = self
            .scope
            .record
            .upgrade()
            .ok_or_else(|| HookError::TargetDisposed {
                target: self.scope.target.clone(),
            })?;
        let live = {
            let record = record.borrow();
            record.in_progress && record.pass == self.scope.pass
        };
        if live {
            Ok(record)
        } else {
            Err(HookError::OutsidePass {
                target: self.scope.target.clone(),
            })
        }
    }

    fn next(counter: &Cell<usize>) -> usize {
        let index = counter.get();
        counter.set(index + 1);
        index
    }

    /// Persistent state for this call site.
    ///
    /// The first pass stores `initial`; later passes return a fresh snapshot of the
    /// stored value. Mutate it only through the returned [`Setter`].
    ///
    /// # Errors
    ///
    /// [`HookError::OutsidePass`] when called after the pass ended,
    /// [`HookError::Serialize`] when `initial` is not representable, and
    /// [`HookError::StateShape`] when the stored value no longer fits `T`.
    pub fn use_state<T>(&self, initial: T) -> Result<(T, Setter<T>), HookError>
    where
        T: Serialize + DeserializeOwned,
    {
        let record = self.active()?;
        let index = Self::next(&self.scope.state_index);

        let stored = {
            let mut record = record.borrow_mut();
            let state = &mut record.slot_mut(&self.scope.slot).state;
            if index < state.len() {
                Some(state[index].clone())
            } else {
                let value = serde_json::to_value(&initial).map_err(HookError::Serialize)?;
                state.resize(index, Value::Null);
                state.push(value);
                None
            }
        };

        let current = match stored {
            Some(value) => serde_json::from_value(value).map_err(|source| HookError::StateShape {
                slot: self.scope.slot.clone(),
                index,
                source,
            })?,
            None => initial,
        };

        let setter = Setter {
            target: self.scope.target.clone(),
            slot: self.scope.slot.clone(),
            index,
            record: Rc::downgrade(&record),
            requests: self.scope.requests.clone(),
            _marker: PhantomData,
        };
        Ok((current, setter))
    }

    /// Registers a mount effect for this call site.
    ///
    /// The effect runs after the pass has been handed to the sink, the first time
    /// this call site is reached. On later passes it runs again only if a different
    /// closure (a different closure type) is passed here; captured values are not
    /// compared. The returned [`Teardown`] is kept until the target is disposed.
    ///
    /// # Errors
    ///
    /// [`HookError::OutsidePass`] when called after the pass ended.
    pub fn use_effect<F, Fut>(&self, effect: F) -> Result<(), HookError>
    where
        F: FnOnce() -> Fut + 'static,
        Fut: Future + 'static,
        Fut::Output: Into<Teardown>,
    {
        let signature = signature_of::<F, _>(&());
        self.register_effect(signature, effect)
    }

    /// Like [`use_effect`](Self::use_effect), but re-runs whenever `deps` changes.
    ///
    /// # Errors
    ///
    /// [`HookError::OutsidePass`] when called after the pass ended.
    pub fn use_effect_with<D, F, Fut>(&self, deps: &D, effect: F) -> Result<(), HookError>
    where
        D: Hash + ?Sized,
        F: FnOnce() -> Fut + 'static,
        Fut: Future + 'static,
        Fut::Output: Into<Teardown>,
    {
        let signature = signature_of::<F, D>(deps);
        self.register_effect(signature, effect)
    }

    fn register_effect<F, Fut>(&self, signature: EffectSignature, effect: F) -> Result<(), HookError>
    where
        F: FnOnce() -> Fut + 'static,
        Fut: Future + 'static,
        Fut::Output: Into<Teardown>,
    {
        let record = self.active()?;
        let index = Self::next(&self.scope.effect_index);

        let fire = {
            let mut record = record.borrow_mut();
            let effects = &mut record.slot_mut(&self.scope.slot).effects;
            match effects.get_mut(index) {
                Some(slot) if slot.signature == signature => false,
                Some(slot) => {
                    slot.signature = signature;
                    true
                }
                None => {
                    effects.push(EffectSlot {
                        signature,
                        teardowns: Vec::new(),
                    });
                    true
                }
            }
        };

        if fire {
            trace!(render_target = %self.scope.target, slot = %self.scope.slot, index, "effect scheduled");
            self.scope.mounts.borrow_mut().push(PendingMount {
                slot: self.scope.slot.clone(),
                index,
                mount: Box::new(move || {
                    let pending = effect();
                    async move { pending.await.into() }.boxed_local()
                }),
            });
        }
        Ok(())
    }
}

fn signature_of<F: 'static, D: Hash + ?Sized>(deps: &D) -> EffectSignature {
    let mut hasher = DefaultHasher::new();
    TypeId::of::<F>().hash(&mut hasher);
    deps.hash(&mut hasher);
    hasher.finish()
}

// ============================================================================
// Setter
// ============================================================================

/// Writes a state slot and requests a re-render of the owning target.
///
/// Writes are queued and applied at the start of the target's next pass, so a
/// pass that is already running never observes a half-applied update. The setter
/// does not wait for the re-render.
pub struct Setter<T> {
    target: TargetId,
    slot: SlotId,
    index: usize,
    record: Weak<RefCell<Record>>,
    requests: Sender<RerenderRequest>,
    _marker: PhantomData<fn(T)>,
}

impl<T> Clone for Setter<T> {
    fn clone(&self) -> Self {
        Self {
            target: self.target.clone(),
            slot: self.slot.clone(),
            index: self.index,
            record: self.record.clone(),
            requests: self.requests.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> core::fmt::Debug for Setter<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Setter")
            .field("target", &self.target)
            .field("slot", &self.slot)
            .field("index", &self.index)
            .finish_non_exhaustive()
    }
}

impl<T: Serialize> Setter<T> {
    /// Stores `value`. If both the stored value and `value` serialize to JSON objects
    /// the new fields are merged over the old ones; otherwise the value is replaced.
    ///
    /// # Errors
    ///
    /// See [`update`](Self::update); additionally [`HookError::Serialize`].
    pub fn set(&self, value: T) -> Result<(), HookError> {
        let value = serde_json::to_value(value).map_err(HookError::Serialize)?;
        self.update(value)
    }
}

impl<T> Setter<T> {
    /// Stores a raw JSON value: objects are shallow-merged over a stored object,
    /// anything else replaces the stored value.
    ///
    /// # Errors
    ///
    /// [`HookError::TargetDisposed`] when the target no longer exists and
    /// [`HookError::SchedulerClosed`] when the runtime was shut down.
    pub fn update(&self, value: Value) -> Result<(), HookError> {
        let record = self
            .record
            .upgrade()
            .ok_or_else(|| HookError::TargetDisposed {
                target: self.target.clone(),
            })?;
        record.borrow_mut().pending.push(StateUpdate {
            slot: self.slot.clone(),
            index: self.index,
            value,
        });
        trace!(render_target = %self.target, slot = %self.slot, index = self.index, "state update queued");
        self.requests
            .try_send(RerenderRequest::new(self.target.clone()))
            .map_err(|_| HookError::SchedulerClosed)
    }

    /// The render target this setter re-renders.
    #[must_use]
    pub const fn target(&self) -> &TargetId {
        &self.target
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Harness, text_of};
    use crate::{Child, Component, Node, Props};
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Form {
        name: String,
        age: u32,
    }

    #[test]
    fn state_initializes_once_and_persists() {
        let harness = Harness::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let counter = Component::from_fn("Counter", {
            let seen = seen.clone();
            move |_props: Props, hooks: Hooks| {
                let (count, set_count) = hooks.use_state(0_i32)?;
                seen.borrow_mut().push(count);
                if count < 2 {
                    set_count.set(count + 1)?;
                }
                Ok(Child::from(format!("{count}")))
            }
        });

        harness.render(Node::new(counter.clone()), "t");
        harness.render(Node::new(counter.clone()), "t");
        harness.render(Node::new(counter), "t");
        assert_eq!(*seen.borrow(), vec![0, 1, 2]);
    }

    #[test]
    fn setter_merges_mappings_and_replaces_other_values() {
        let harness = Harness::new();
        let component = Component::from_fn("Form", |_props: Props, hooks: Hooks| {
            let (value, set_value) = hooks.use_state(json!({ "name": "ada", "age": 36 }))?;
            if value["age"] == json!(36) {
                set_value.update(json!({ "age": 37 }))?;
            } else if value["age"] == json!(37) {
                set_value.update(json!("gone"))?;
            }
            Ok(Child::from(value.to_string()))
        });

        let first = harness.render(Node::new(component.clone()), "form");
        assert_eq!(text_of(&first), json!({ "name": "ada", "age": 36 }).to_string());
        let second = harness.render(Node::new(component.clone()), "form");
        assert_eq!(text_of(&second), json!({ "name": "ada", "age": 37 }).to_string());
        let third = harness.render(Node::new(component), "form");
        assert_eq!(text_of(&third), "\"gone\"");
    }

    #[test]
    fn typed_state_round_trips_through_the_store() {
        let harness = Harness::new();
        let component = Component::from_fn("Typed", |_props: Props, hooks: Hooks| {
            let (form, set_form) = hooks.use_state(Form { name: "a".into(), age: 1 })?;
            if form.age == 1 {
                set_form.set(Form { name: "b".into(), age: 2 })?;
            }
            Ok(Child::from(format!("{}:{}", form.name, form.age)))
        });

        assert_eq!(text_of(&harness.render(Node::new(component.clone()), "x")), "a:1");
        assert_eq!(text_of(&harness.render(Node::new(component), "x")), "b:2");
    }

    #[test]
    fn mismatched_state_reports_its_shape() {
        let harness = Harness::new();
        let component = Component::from_fn("Shape", |_props: Props, hooks: Hooks| {
            let (value, set_value) = hooks.use_state(5_u32)?;
            set_value.update(json!("five"))?;
            Ok(Child::from(value))
        });

        harness.render(Node::new(component.clone()), "shape");
        let rendered = harness.render(Node::new(component), "shape");
        assert_eq!(rendered.diagnostics.len(), 1);
        assert!(rendered.diagnostics[0].to_string().contains("does not match"));
    }

    #[test]
    fn hooks_fail_outside_their_pass() {
        let harness = Harness::new();
        let escaped = Rc::new(RefCell::new(None));
        let component = Component::from_fn("Leak", {
            let escaped = escaped.clone();
            move |_props: Props, hooks: Hooks| {
                *escaped.borrow_mut() = Some(hooks);
                Ok(Child::from("ok"))
            }
        });

        harness.render(Node::new(component), "leak");
        let hooks = escaped.borrow_mut().take().unwrap();
        assert!(matches!(hooks.use_state(1), Err(HookError::OutsidePass { .. })));
        assert!(matches!(
            hooks.use_effect(|| async {}),
            Err(HookError::OutsidePass { .. })
        ));
    }

    #[test]
    fn effects_fire_once_per_closure() {
        let harness = Harness::new();
        let fired = Rc::new(RefCell::new(Vec::new()));
        let variant = Rc::new(Cell::new(false));
        let component = Component::from_fn("Effects", {
            let fired = fired.clone();
            let variant = variant.clone();
            move |_props: Props, hooks: Hooks| {
                let log = fired.clone();
                if variant.get() {
                    hooks.use_effect(move || async move { log.borrow_mut().push("second") })?;
                } else {
                    hooks.use_effect(move || async move { log.borrow_mut().push("first") })?;
                }
                Ok(Child::from("fx"))
            }
        });

        for _ in 0..3 {
            harness.render(Node::new(component.clone()), "fx");
        }
        assert_eq!(*fired.borrow(), vec!["first"]);

        variant.set(true);
        harness.render(Node::new(component.clone()), "fx");
        harness.render(Node::new(component), "fx");
        assert_eq!(*fired.borrow(), vec!["first", "second"]);
    }

    #[test]
    fn effects_with_deps_refire_on_change() {
        let harness = Harness::new();
        let fired = Rc::new(Cell::new(0));
        let dep = Rc::new(Cell::new(1));
        let component = Component::from_fn("Deps", {
            let fired = fired.clone();
            let dep = dep.clone();
            move |_props: Props, hooks: Hooks| {
                let fired = fired.clone();
                hooks.use_effect_with(&dep.get(), move || async move { fired.set(fired.get() + 1) })?;
                Ok(Child::Empty)
            }
        });

        harness.render(Node::new(component.clone()), "deps");
        harness.render(Node::new(component.clone()), "deps");
        assert_eq!(fired.get(), 1);
        dep.set(2);
        harness.render(Node::new(component), "deps");
        assert_eq!(fired.get(), 2);
    }

    #[test]
    fn teardown_runs_its_cleanup() {
        let ran = Rc::new(Cell::new(false));
        let teardown = Teardown::new({
            let ran = ran.clone();
            move || ran.set(true)
        });
        assert!(!teardown.is_none());
        teardown.run();
        assert!(ran.get());
        assert!(Teardown::from(()).is_none());
    }
}
