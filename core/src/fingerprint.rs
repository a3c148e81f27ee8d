//! Structural fingerprints used to memoize composer calls.
//!
//! Two structurally equal nodes at the same slot in consecutive passes produce the
//! same fingerprint; any change to a target, key, property value or child produces
//! a different one. Handler props contribute their callback identity: a node whose
//! handler was recreated is composed again, so a cached artifact never keeps a
//! stale callback. The cached artifact holds the old callback alive, so its
//! address cannot be reused by a new one while the comparison matters.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde_json::Value;

use crate::{
    node::{Child, Node, Target},
    props::{Prop, Props},
    store::SlotId,
};

/// Fingerprint of `child` as seen at `slot`.
#[must_use]
pub fn fingerprint(child: &Child, slot: &SlotId) -> u64 {
    let mut hasher = DefaultHasher::new();
    slot.hash(&mut hasher);
    hash_child(child, &mut hasher);
    hasher.finish()
}

/// Fingerprint of `node` as seen at `slot`.
#[must_use]
pub fn node_fingerprint(node: &Node, slot: &SlotId) -> u64 {
    let mut hasher = DefaultHasher::new();
    slot.hash(&mut hasher);
    hash_node(node, &mut hasher);
    hasher.finish()
}

fn hash_child(child: &Child, state: &mut impl Hasher) {
    match child {
        Child::Node(node) => {
            state.write_u8(0);
            hash_node(node, state);
        }
        Child::Text(text) => {
            state.write_u8(1);
            text.hash(state);
        }
        Child::Number(number) => {
            state.write_u8(2);
            number.to_bits().hash(state);
        }
        Child::Empty => state.write_u8(3),
        Child::Invalid(description) => {
            state.write_u8(4);
            description.hash(state);
        }
    }
}

fn hash_node(node: &Node, state: &mut impl Hasher) {
    match node.target() {
        Target::Intrinsic(name) => {
            state.write_u8(0);
            name.hash(state);
        }
        Target::Component(component) => {
            state.write_u8(1);
            component.name().hash(state);
        }
        Target::Unsupported(description) => {
            state.write_u8(2);
            description.hash(state);
        }
    }
    node.key().hash(state);
    hash_props(node.props(), state);
    state.write_usize(node.children().len());
    for child in node.children() {
        hash_child(child, state);
    }
}

fn hash_props(props: &Props, state: &mut impl Hasher) {
    state.write_usize(props.len());
    for (key, prop) in props.iter() {
        key.hash(state);
        match prop {
            Prop::Value(value) => hash_value(value, state),
            Prop::Handler(handler) => {
                state.write_u8(0xff);
                handler.address().hash(state);
            }
        }
    }
}

fn hash_value(value: &Value, state: &mut impl Hasher) {
    match value {
        Value::Null => state.write_u8(0),
        Value::Bool(flag) => {
            state.write_u8(1);
            flag.hash(state);
        }
        Value::Number(number) => {
            state.write_u8(2);
            number.to_string().hash(state);
        }
        Value::String(text) => {
            state.write_u8(3);
            text.hash(state);
        }
        Value::Array(items) => {
            state.write_u8(4);
            state.write_usize(items.len());
            for item in items {
                hash_value(item, state);
            }
        }
        Value::Object(object) => {
            state.write_u8(5);
            state.write_usize(object.len());
            for (key, item) in object {
                key.hash(state);
                hash_value(item, state);
            }
        }
    }
}
