//! Render state store: one record per render target.
//!
//! A record holds, per slot, the last fingerprint, the cached composed result,
//! the hook state values and the effect slots. Records are created lazily on the
//! first render of a target and live until [`Runtime::dispose`](crate::Runtime::dispose).

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use futures::lock::Mutex;
use serde_json::Value;

use crate::hooks::Teardown;

// ============================================================================
// Identifiers
// ============================================================================

/// Identifier of a render target (a mount point or a string-render session).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(String);

impl TargetId {
    /// Creates a target identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` for the empty identifier, which no render may use.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl core::fmt::Display for TargetId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TargetId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for TargetId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&String> for TargetId {
    fn from(id: &String) -> Self {
        Self(id.clone())
    }
}

/// Identity of a node within one render target.
///
/// Unkeyed nodes are identified by their pre-order position in the pass. Nodes at
/// or below a keyed node are identified by the key path and their offset from the
/// keyed node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId {
    anchor: Option<Arc<str>>,
    offset: usize,
}

impl SlotId {
    /// A slot addressed by pass position.
    #[must_use]
    pub const fn position(position: usize) -> Self {
        Self {
            anchor: None,
            offset: position,
        }
    }

    /// A slot addressed relative to a keyed ancestor.
    #[must_use]
    pub fn keyed(anchor: impl Into<Arc<str>>, offset: usize) -> Self {
        Self {
            anchor: Some(anchor.into()),
            offset,
        }
    }

    /// The key path this slot is anchored to, if any.
    #[must_use]
    pub fn anchor(&self) -> Option<&str> {
        self.anchor.as_deref()
    }

    /// Position, or offset from the anchor for keyed slots.
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }
}

impl core::fmt::Display for SlotId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match &self.anchor {
            Some(anchor) => write!(f, "{anchor}+{}", self.offset),
            None => write!(f, "{}", self.offset),
        }
    }
}

// ============================================================================
// Slots
// ============================================================================

/// Dedup signature of an effect callback.
pub(crate) type EffectSignature = u64;

pub(crate) struct EffectSlot {
    pub(crate) signature: EffectSignature,
    pub(crate) teardowns: Vec<Teardown>,
}

#[derive(Default)]
pub(crate) struct Slot {
    pub(crate) fingerprint: Option<u64>,
    pub(crate) rendered: Option<Rc<dyn Any>>,
    pub(crate) state: Vec<Value>,
    pub(crate) effects: Vec<EffectSlot>,
}

impl Slot {
    pub(crate) fn cached<T: Clone + 'static>(&self, fingerprint: u64) -> Option<T> {
        if self.fingerprint != Some(fingerprint) {
            return None;
        }
        self.rendered
            .as_ref()
            .and_then(|rendered| rendered.downcast_ref::<T>())
            .cloned()
    }
}

/// A queued write to one hook state value.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct StateUpdate {
    pub(crate) slot: SlotId,
    pub(crate) index: usize,
    pub(crate) value: Value,
}

/// Writes `value` over `current`: objects are shallow-merged, anything else replaces.
pub(crate) fn merge_state(current: &mut Value, value: Value) {
    match (current, value) {
        (Value::Object(current), Value::Object(patch)) => {
            for (key, item) in patch {
                current.insert(key, item);
            }
        }
        (current, value) => *current = value,
    }
}

// ============================================================================
// Record
// ============================================================================

pub(crate) type Rerender = Rc<dyn Fn() -> futures::future::LocalBoxFuture<'static, ()>>;

/// Per-target render state.
pub(crate) struct Record {
    pub(crate) slots: HashMap<SlotId, Slot>,
    pub(crate) in_progress: bool,
    pub(crate) pass: u64,
    pub(crate) pending: Vec<StateUpdate>,
    pub(crate) listener: Option<Rerender>,
    pub(crate) lock: Rc<Mutex<()>>,
}

impl_debug!(Record);

impl Record {
    fn new() -> Self {
        Self {
            slots: HashMap::new(),
            in_progress: false,
            pass: 0,
            pending: Vec::new(),
            listener: None,
            lock: Rc::new(Mutex::new(())),
        }
    }

    pub(crate) fn slot_mut(&mut self, slot: &SlotId) -> &mut Slot {
        self.slots.entry(slot.clone()).or_default()
    }

    /// Applies queued setter writes in the order they were made.
    pub(crate) fn apply_pending(&mut self) -> usize {
        let pending = core::mem::take(&mut self.pending);
        let applied = pending.len();
        for StateUpdate { slot, index, value } in pending {
            let state = &mut self.slot_mut(&slot).state;
            if let Some(current) = state.get_mut(index) {
                merge_state(current, value);
            } else {
                state.resize(index, Value::Null);
                state.push(value);
            }
        }
        applied
    }

    /// Takes every captured effect teardown, ordered by slot then effect index.
    pub(crate) fn take_teardowns(&mut self) -> Vec<Teardown> {
        let mut slots: Vec<_> = self.slots.iter_mut().collect();
        slots.sort_by(|(a, _), (b, _)| a.cmp(b));
        let mut teardowns = Vec::new();
        for (_, slot) in slots {
            for effect in &mut slot.effects {
                teardowns.append(&mut effect.teardowns);
            }
        }
        teardowns
    }
}

// ============================================================================
// Store
// ============================================================================

/// Mapping from render target to its record.
#[derive(Default)]
pub(crate) struct Store {
    records: RefCell<HashMap<TargetId, Rc<RefCell<Record>>>>,
}

impl_debug!(Store);

impl Store {
    /// Returns the record for `target`, creating an empty one on first use.
    pub(crate) fn get_or_create(&self, target: &TargetId) -> Rc<RefCell<Record>> {
        self.records
            .borrow_mut()
            .entry(target.clone())
            .or_insert_with(|| Rc::new(RefCell::new(Record::new())))
            .clone()
    }

    pub(crate) fn get(&self, target: &TargetId) -> Option<Rc<RefCell<Record>>> {
        self.records.borrow().get(target).cloned()
    }

    pub(crate) fn remove(&self, target: &TargetId) -> Option<Rc<RefCell<Record>>> {
        self.records.borrow_mut().remove(target)
    }

    pub(crate) fn targets(&self) -> Vec<TargetId> {
        let mut targets: Vec<_> = self.records.borrow().keys().cloned().collect();
        targets.sort();
        targets
    }
}
