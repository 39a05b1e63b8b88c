//! The form tree: construction, navigation and the mutation surface.

use std::sync::Arc;

use log::debug;
use serde_json::Value;

use crate::error::TreeError;
use crate::node::{self, NodeHandle, NodeKind, NodeRef};
use crate::path::{Path, Segment};
use crate::schema::Schema;
use crate::status::Status;

/// A reactive tree of form fields with composite validation.
///
/// Built once from a [`Schema`]; afterwards the tree is driven entirely
/// through the mutation surface (`set_value` / `patch_value` / `append` /
/// `remove`) and observed through node handles. Structural errors are
/// returned synchronously with the tree left unmodified; validator
/// failures are node state, not errors.
///
/// Leaves with asynchronous validators need an ambient tokio runtime: the
/// deferred checks are spawned as tasks. The engine assumes exclusive
/// access; a multi-threaded host must serialize calls into it.
pub struct FormTree {
    root: NodeRef,
}

impl FormTree {
    /// Construct the tree recursively from a schema. Leaves are validated
    /// synchronously against their defaults; asynchronous checks start
    /// with the first value write.
    pub fn build(schema: Schema) -> Self {
        let root = node::build(schema);
        debug!("built form tree ({} root)", root.kind().name());
        Self { root }
    }

    /// Handle onto the root node.
    pub fn root(&self) -> NodeHandle {
        NodeHandle {
            inner: Arc::clone(&self.root),
        }
    }

    /// The aggregate value of the whole tree.
    pub fn value(&self) -> Value {
        self.root.value()
    }

    /// The aggregate status of the whole tree.
    pub fn status(&self) -> Status {
        self.root.status()
    }

    /// Navigate a dotted/indexed path (`addresses.0.street`). The empty
    /// path resolves to the root.
    pub fn get(&self, path: &str) -> Result<NodeHandle, TreeError> {
        Ok(NodeHandle {
            inner: self.resolve(path)?,
        })
    }

    /// Replace a node's value.
    ///
    /// For a composite the value must match the children's shape exactly:
    /// the same key set for a group, the same length for a collection,
    /// recursively. The shape is checked before anything is written, so a
    /// `ShapeMismatch` leaves the tree untouched.
    pub fn set_value(&self, path: &str, value: impl Into<Value>) -> Result<(), TreeError> {
        let target = self.resolve(path)?;
        let value = value.into();
        check_shape(&target, &value, path)?;
        apply_value(&target, value);
        Ok(())
    }

    /// Like [`set_value`](Self::set_value) but partial: a group patch may
    /// name a subset of keys, a collection patch covers a prefix of the
    /// children. Unnamed children keep their value and status. Keys that
    /// don't exist in the group are ignored.
    pub fn patch_value(&self, path: &str, value: impl Into<Value>) -> Result<(), TreeError> {
        let target = self.resolve(path)?;
        let value = value.into();
        check_patch_shape(&target, &value, path)?;
        apply_patch(&target, value);
        Ok(())
    }

    /// Append a child built from `schema` to the collection at `path`.
    /// Returns the new child's index (the collection's previous length).
    ///
    /// Indices are positional only: they are not stable identities and a
    /// later `remove` shifts them.
    pub fn append(&self, path: &str, schema: Schema) -> Result<usize, TreeError> {
        let target = self.resolve(path)?;
        let child = node::build(schema);
        let Some(index) = target.append_child(&child) else {
            return Err(TreeError::kind_mismatch(
                path,
                NodeKind::Collection.name(),
                target.kind().name(),
            ));
        };
        debug!("appended child {index} at '{path}'");
        let status_changed = target.refresh_status();
        node::publish_update(&target, true, status_changed);
        Ok(index)
    }

    /// Remove the child at `index` from the collection at `path`. Later
    /// children shift down by one position; the removed subtree is
    /// detached and no longer contributes to any aggregate.
    pub fn remove(&self, path: &str, index: usize) -> Result<(), TreeError> {
        let target = self.resolve(path)?;
        if target.kind() != NodeKind::Collection {
            return Err(TreeError::kind_mismatch(
                path,
                NodeKind::Collection.name(),
                target.kind().name(),
            ));
        }
        let len = target.child_count();
        if target.remove_child(index).is_none() {
            return Err(TreeError::index_out_of_range(path, index, len));
        }
        debug!("removed child {index} at '{path}'");
        let status_changed = target.refresh_status();
        node::publish_update(&target, true, status_changed);
        Ok(())
    }

    /// Disable or re-enable the subtree at `path`. Disabled nodes keep
    /// their value but are excluded from validation and from ancestor
    /// status aggregation; disabling supersedes in-flight asynchronous
    /// checks, re-enabling revalidates from the current value.
    pub fn set_disabled(&self, path: &str, disabled: bool) -> Result<(), TreeError> {
        let target = self.resolve(path)?;
        node::set_disabled(&target, disabled);
        Ok(())
    }

    /// Mark the node at `path` (and its ancestors) as touched.
    pub fn mark_touched(&self, path: &str) -> Result<(), TreeError> {
        let target = self.resolve(path)?;
        target.mark_touched_up();
        Ok(())
    }

    fn resolve(&self, raw: &str) -> Result<NodeRef, TreeError> {
        let path = Path::parse(raw).ok_or_else(|| TreeError::path_not_found(raw))?;
        let mut current = Arc::clone(&self.root);
        for segment in path.segments() {
            let next = match segment {
                Segment::Key(key) => current.child_by_key(key),
                // A numeric segment indexes a collection; on a group it
                // falls back to the literal key ("0" is a legal key).
                Segment::Index(index) => match current.kind() {
                    NodeKind::Collection => current.child_by_index(*index),
                    _ => current.child_by_key(&index.to_string()),
                },
            };
            current = next.ok_or_else(|| TreeError::path_not_found(raw))?;
        }
        Ok(current)
    }
}

fn join_path(base: &str, segment: &str) -> String {
    if base.is_empty() {
        segment.to_string()
    } else {
        format!("{base}.{segment}")
    }
}

fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn describe_keys(keys: impl IntoIterator<Item = impl AsRef<str>>) -> String {
    let keys: Vec<String> = keys
        .into_iter()
        .map(|key| key.as_ref().to_string())
        .collect();
    format!("keys {{{}}}", keys.join(", "))
}

/// Verify that `value` matches the target subtree's shape exactly.
fn check_shape(target: &NodeRef, value: &Value, path: &str) -> Result<(), TreeError> {
    match target.kind() {
        NodeKind::Leaf => Ok(()),
        NodeKind::Group => {
            let Value::Object(map) = value else {
                return Err(TreeError::shape_mismatch(
                    path,
                    "an object",
                    value_type_name(value),
                ));
            };
            let children = target.group_children();
            let matching = map.len() == children.len()
                && children.iter().all(|(name, _)| map.contains_key(name));
            if !matching {
                return Err(TreeError::shape_mismatch(
                    path,
                    describe_keys(children.iter().map(|(name, _)| name)),
                    describe_keys(map.keys()),
                ));
            }
            for (name, child) in &children {
                check_shape(child, &map[name], &join_path(path, name))?;
            }
            Ok(())
        }
        NodeKind::Collection => {
            let Value::Array(items) = value else {
                return Err(TreeError::shape_mismatch(
                    path,
                    "an array",
                    value_type_name(value),
                ));
            };
            let children = target.collection_children();
            if items.len() != children.len() {
                return Err(TreeError::shape_mismatch(
                    path,
                    format!("length {}", children.len()),
                    format!("length {}", items.len()),
                ));
            }
            for (index, (child, item)) in children.iter().zip(items).enumerate() {
                check_shape(child, item, &join_path(path, &index.to_string()))?;
            }
            Ok(())
        }
    }
}

/// Verify a patch structurally (composite patches must be the matching
/// container type) without requiring completeness. Unknown group keys are
/// allowed here and ignored on application.
fn check_patch_shape(target: &NodeRef, value: &Value, path: &str) -> Result<(), TreeError> {
    match target.kind() {
        NodeKind::Leaf => Ok(()),
        NodeKind::Group => {
            let Value::Object(map) = value else {
                return Err(TreeError::shape_mismatch(
                    path,
                    "an object",
                    value_type_name(value),
                ));
            };
            for (name, item) in map {
                if let Some(child) = target.child_by_key(name) {
                    check_patch_shape(&child, item, &join_path(path, name))?;
                }
            }
            Ok(())
        }
        NodeKind::Collection => {
            let Value::Array(items) = value else {
                return Err(TreeError::shape_mismatch(
                    path,
                    "an array",
                    value_type_name(value),
                ));
            };
            for (index, item) in items.iter().enumerate() {
                if let Some(child) = target.child_by_index(index) {
                    check_patch_shape(&child, item, &join_path(path, &index.to_string()))?;
                }
            }
            Ok(())
        }
    }
}

/// Write a shape-checked value into the subtree.
fn apply_value(target: &NodeRef, value: Value) {
    match target.kind() {
        NodeKind::Leaf => node::set_leaf_value(target, value),
        NodeKind::Group => {
            if let Value::Object(mut map) = value {
                for (name, child) in target.group_children() {
                    if let Some(item) = map.remove(&name) {
                        apply_value(&child, item);
                    }
                }
            }
        }
        NodeKind::Collection => {
            if let Value::Array(items) = value {
                for (child, item) in target.collection_children().iter().zip(items) {
                    apply_value(child, item);
                }
            }
        }
    }
}

/// Write a shape-checked patch into the subtree. Children the patch does
/// not name are left untouched.
fn apply_patch(target: &NodeRef, value: Value) {
    match target.kind() {
        NodeKind::Leaf => node::set_leaf_value(target, value),
        NodeKind::Group => {
            if let Value::Object(map) = value {
                for (name, item) in map {
                    match target.child_by_key(&name) {
                        Some(child) => apply_patch(&child, item),
                        None => log::trace!("patch key '{name}' has no child, ignored"),
                    }
                }
            }
        }
        NodeKind::Collection => {
            if let Value::Array(items) = value {
                for (index, item) in items.into_iter().enumerate() {
                    if let Some(child) = target.child_by_index(index) {
                        apply_patch(&child, item);
                    }
                }
            }
        }
    }
}
