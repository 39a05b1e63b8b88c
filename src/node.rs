//! Tree node internals: kind-tagged nodes, flags, upward aggregation.
//!
//! Nodes use interior mutability (`Arc` + `RwLock` + atomics) so a cloned
//! reference can be moved into an asynchronous validation task and apply
//! its result directly. Parent links are weak: they exist only for upward
//! propagation and never own anything.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, Weak};
use std::time::Duration;

use serde_json::{Map, Value};

use crate::schema::{LeafSchema, Schema, SchemaKind};
use crate::status::{self, Status};
use crate::subscription::{StatusCallback, SubscriptionId, Subscriptions, ValueCallback};
use crate::validation::runner;
use crate::validation::{AsyncValidator, Failure, FailurePolicy, SyncValidator};

pub(crate) type NodeRef = Arc<NodeInner>;

/// The kind of a node, as reported by [`NodeHandle::kind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Leaf,
    Group,
    Collection,
}

impl NodeKind {
    pub(crate) fn name(self) -> &'static str {
        match self {
            Self::Leaf => "leaf",
            Self::Group => "group",
            Self::Collection => "collection",
        }
    }
}

/// Validator state of a leaf.
pub(crate) struct LeafState {
    value: RwLock<Value>,
    generation: AtomicU64,
    sync_rules: Vec<SyncValidator>,
    async_rules: Vec<AsyncValidator>,
    debounce: Option<Duration>,
    policy: FailurePolicy,
}

impl LeafState {
    fn new(schema: LeafSchema) -> Self {
        Self {
            value: RwLock::new(schema.default),
            generation: AtomicU64::new(0),
            sync_rules: schema.sync_rules,
            async_rules: schema.async_rules,
            debounce: schema.debounce,
            policy: schema.policy,
        }
    }

    pub(crate) fn value(&self) -> Value {
        self.value
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the value, superseding any in-flight asynchronous check.
    pub(crate) fn store(&self, value: Value) {
        *self.value.write().unwrap_or_else(PoisonError::into_inner) = value;
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Invalidate in-flight asynchronous results without a value write
    /// (used when the leaf is disabled).
    pub(crate) fn bump_generation(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn sync_rules(&self) -> &[SyncValidator] {
        &self.sync_rules
    }

    pub(crate) fn async_rules(&self) -> &[AsyncValidator] {
        &self.async_rules
    }

    pub(crate) fn debounce(&self) -> Option<Duration> {
        self.debounce
    }

    pub(crate) fn policy(&self) -> FailurePolicy {
        self.policy
    }
}

enum Body {
    Leaf(LeafState),
    Group(RwLock<Vec<(String, NodeRef)>>),
    Collection(RwLock<Vec<NodeRef>>),
}

struct Validity {
    status: Status,
    failures: Vec<Failure>,
}

pub(crate) struct NodeInner {
    parent: RwLock<Weak<NodeInner>>,
    dirty: AtomicBool,
    touched: AtomicBool,
    validity: RwLock<Validity>,
    subscriptions: Subscriptions,
    body: Body,
}

impl NodeInner {
    fn new(body: Body) -> Self {
        Self {
            parent: RwLock::new(Weak::new()),
            dirty: AtomicBool::new(false),
            touched: AtomicBool::new(false),
            validity: RwLock::new(Validity {
                status: Status::Valid,
                failures: Vec::new(),
            }),
            subscriptions: Subscriptions::default(),
            body,
        }
    }

    pub(crate) fn kind(&self) -> NodeKind {
        match &self.body {
            Body::Leaf(_) => NodeKind::Leaf,
            Body::Group(_) => NodeKind::Group,
            Body::Collection(_) => NodeKind::Collection,
        }
    }

    pub(crate) fn leaf(&self) -> Option<&LeafState> {
        match &self.body {
            Body::Leaf(leaf) => Some(leaf),
            _ => None,
        }
    }

    pub(crate) fn parent(&self) -> Option<NodeRef> {
        self.parent
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .upgrade()
    }

    fn set_parent(&self, parent: &NodeRef) {
        *self.parent.write().unwrap_or_else(PoisonError::into_inner) = Arc::downgrade(parent);
    }

    pub(crate) fn clear_parent(&self) {
        *self.parent.write().unwrap_or_else(PoisonError::into_inner) = Weak::new();
    }

    fn adopt_children(self: &Arc<Self>) {
        match &self.body {
            Body::Leaf(_) => {}
            Body::Group(children) => {
                for (_, child) in children.read().unwrap_or_else(PoisonError::into_inner).iter() {
                    child.set_parent(self);
                }
            }
            Body::Collection(children) => {
                for child in children.read().unwrap_or_else(PoisonError::into_inner).iter() {
                    child.set_parent(self);
                }
            }
        }
    }

    /// Current value. Composite values are derived from children on every
    /// call; they are never stored.
    pub(crate) fn value(&self) -> Value {
        match &self.body {
            Body::Leaf(leaf) => leaf.value(),
            Body::Group(children) => {
                let children = children.read().unwrap_or_else(PoisonError::into_inner);
                let mut map = Map::with_capacity(children.len());
                for (name, child) in children.iter() {
                    map.insert(name.clone(), child.value());
                }
                Value::Object(map)
            }
            Body::Collection(children) => {
                let children = children.read().unwrap_or_else(PoisonError::into_inner);
                Value::Array(children.iter().map(|child| child.value()).collect())
            }
        }
    }

    pub(crate) fn status(&self) -> Status {
        self.validity
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .status
    }

    pub(crate) fn failures(&self) -> Vec<Failure> {
        self.validity
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .failures
            .clone()
    }

    /// Update the validity cache. Returns whether the status changed.
    /// Emits nothing; callers publish through [`publish_update`].
    pub(crate) fn set_validity(&self, status: Status, failures: Vec<Failure>) -> bool {
        let mut validity = self.validity.write().unwrap_or_else(PoisonError::into_inner);
        let changed = validity.status != status;
        validity.status = status;
        validity.failures = failures;
        changed
    }

    /// Recompute this composite's status from its children.
    /// Returns whether the status changed. A no-op for leaves.
    pub(crate) fn refresh_status(&self) -> bool {
        let aggregated = match &self.body {
            Body::Leaf(_) => return false,
            Body::Group(children) => status::aggregate(
                children
                    .read()
                    .unwrap_or_else(PoisonError::into_inner)
                    .iter()
                    .map(|(_, child)| child.status()),
            ),
            Body::Collection(children) => status::aggregate(
                children
                    .read()
                    .unwrap_or_else(PoisonError::into_inner)
                    .iter()
                    .map(|child| child.status()),
            ),
        };
        self.set_validity(aggregated, Vec::new())
    }

    pub(crate) fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    pub(crate) fn is_touched(&self) -> bool {
        self.touched.load(Ordering::SeqCst)
    }

    /// Mark this node and every ancestor dirty.
    pub(crate) fn mark_dirty_up(&self) {
        self.dirty.store(true, Ordering::SeqCst);
        let mut current = self.parent();
        while let Some(node) = current {
            node.dirty.store(true, Ordering::SeqCst);
            current = node.parent();
        }
    }

    /// Mark this node and every ancestor touched.
    pub(crate) fn mark_touched_up(&self) {
        self.touched.store(true, Ordering::SeqCst);
        let mut current = self.parent();
        while let Some(node) = current {
            node.touched.store(true, Ordering::SeqCst);
            current = node.parent();
        }
    }

    pub(crate) fn subscriptions(&self) -> &Subscriptions {
        &self.subscriptions
    }

    // ------------------------------------------------------------------
    // Child access
    // ------------------------------------------------------------------

    pub(crate) fn child_by_key(&self, key: &str) -> Option<NodeRef> {
        match &self.body {
            Body::Group(children) => children
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .iter()
                .find(|(name, _)| name == key)
                .map(|(_, child)| Arc::clone(child)),
            _ => None,
        }
    }

    pub(crate) fn child_by_index(&self, index: usize) -> Option<NodeRef> {
        match &self.body {
            Body::Collection(children) => children
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .get(index)
                .map(Arc::clone),
            _ => None,
        }
    }

    pub(crate) fn child_count(&self) -> usize {
        match &self.body {
            Body::Leaf(_) => 0,
            Body::Group(children) => children
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .len(),
            Body::Collection(children) => children
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .len(),
        }
    }

    /// Group children in insertion order.
    pub(crate) fn group_children(&self) -> Vec<(String, NodeRef)> {
        match &self.body {
            Body::Group(children) => children
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
            _ => Vec::new(),
        }
    }

    /// Collection children in positional order.
    pub(crate) fn collection_children(&self) -> Vec<NodeRef> {
        match &self.body {
            Body::Collection(children) => children
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
            _ => Vec::new(),
        }
    }

    /// Append a built child to this collection. Returns the new child's
    /// index (the length before the append).
    pub(crate) fn append_child(self: &Arc<Self>, child: &NodeRef) -> Option<usize> {
        let Body::Collection(children) = &self.body else {
            return None;
        };
        child.set_parent(self);
        let mut children = children.write().unwrap_or_else(PoisonError::into_inner);
        let index = children.len();
        children.push(Arc::clone(child));
        Some(index)
    }

    /// Detach and return the child at `index`. Later children shift down.
    pub(crate) fn remove_child(&self, index: usize) -> Option<NodeRef> {
        let Body::Collection(children) = &self.body else {
            return None;
        };
        let removed = {
            let mut children = children.write().unwrap_or_else(PoisonError::into_inner);
            if index >= children.len() {
                return None;
            }
            children.remove(index)
        };
        removed.clear_parent();
        Some(removed)
    }
}

/// Build a subtree from a schema, bottom-up. Leaves get their initial
/// synchronous validation (asynchronous checks start with the first value
/// write); composites aggregate their freshly built children.
pub(crate) fn build(schema: Schema) -> NodeRef {
    match schema.into_kind() {
        SchemaKind::Leaf(leaf) => {
            let node = Arc::new(NodeInner::new(Body::Leaf(LeafState::new(leaf))));
            runner::revalidate(&node, false);
            node
        }
        SchemaKind::Group(entries) => {
            let children: Vec<(String, NodeRef)> = entries
                .into_iter()
                .map(|(name, child)| (name, build(child)))
                .collect();
            let node = Arc::new(NodeInner::new(Body::Group(RwLock::new(children))));
            node.adopt_children();
            node.refresh_status();
            node
        }
        SchemaKind::Collection(items) => {
            let children: Vec<NodeRef> = items.into_iter().map(build).collect();
            let node = Arc::new(NodeInner::new(Body::Collection(RwLock::new(children))));
            node.adopt_children();
            node.refresh_status();
            node
        }
    }
}

/// Write a leaf value: bump the generation, mark dirty, revalidate and
/// publish. Writing while disabled updates the value but skips validation.
pub(crate) fn set_leaf_value(node: &NodeRef, value: Value) {
    let Some(leaf) = node.leaf() else {
        return;
    };
    leaf.store(value);
    node.mark_dirty_up();

    if node.status().is_disabled() {
        publish_update(node, true, false);
        return;
    }
    let status_changed = runner::revalidate(node, true);
    publish_update(node, true, status_changed);
}

/// Enable or disable a subtree. Disabling a leaf supersedes its in-flight
/// asynchronous checks; re-enabling revalidates from the current value.
pub(crate) fn set_disabled(node: &NodeRef, disabled: bool) {
    match node.kind() {
        NodeKind::Leaf => {
            let Some(leaf) = node.leaf() else {
                return;
            };
            if disabled {
                leaf.bump_generation();
                let changed = node.set_validity(Status::Disabled, Vec::new());
                publish_update(node, false, changed);
            } else if node.status().is_disabled() {
                let changed = runner::revalidate(node, true);
                publish_update(node, false, changed);
            }
        }
        NodeKind::Group => {
            for (_, child) in node.group_children() {
                set_disabled(&child, disabled);
            }
        }
        NodeKind::Collection => {
            for child in node.collection_children() {
                set_disabled(&child, disabled);
            }
        }
    }
}

/// Deliver events for a changed node and re-aggregate every ancestor.
///
/// Ancestors re-derive their status; `statusChanged` fires only when the
/// cached status actually changed, `valueChanged` whenever a descendant
/// value changed (the derived value changed with it). Propagation stops
/// early once nothing changes.
pub(crate) fn publish_update(node: &NodeRef, value_changed: bool, status_changed: bool) {
    if value_changed {
        node.subscriptions().emit_value(&node.value());
    }
    if status_changed {
        node.subscriptions().emit_status(node.status());
    }

    let mut changed_status = status_changed;
    let mut current = Arc::clone(node);
    loop {
        if !value_changed && !changed_status {
            break;
        }
        let Some(parent) = current.parent() else {
            break;
        };
        changed_status = parent.refresh_status();
        if value_changed {
            parent.subscriptions().emit_value(&parent.value());
        }
        if changed_status {
            parent.subscriptions().emit_status(parent.status());
        }
        current = parent;
    }
}

/// Read-only handle onto one node plus its subscription surface.
///
/// Handles are cheap to clone and stay valid after the node is removed
/// from the tree (they then observe the detached subtree).
#[derive(Clone)]
pub struct NodeHandle {
    pub(crate) inner: NodeRef,
}

impl PartialEq for NodeHandle {
    /// Two handles are equal when they point at the same node.
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for NodeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeHandle")
            .field("kind", &self.kind())
            .field("status", &self.status())
            .field("value", &self.value())
            .finish()
    }
}

impl NodeHandle {
    /// The node's kind.
    pub fn kind(&self) -> NodeKind {
        self.inner.kind()
    }

    /// Current value. Composite values are derived from children.
    pub fn value(&self) -> Value {
        self.inner.value()
    }

    /// Current validity status.
    pub fn status(&self) -> Status {
        self.inner.status()
    }

    /// Named failures recorded on this node (empty unless `Invalid`).
    pub fn failures(&self) -> Vec<Failure> {
        self.inner.failures()
    }

    /// Whether the node's value has changed since construction.
    pub fn is_dirty(&self) -> bool {
        self.inner.is_dirty()
    }

    /// Whether the node was marked touched.
    pub fn is_touched(&self) -> bool {
        self.inner.is_touched()
    }

    /// Whether the node is currently disabled.
    pub fn is_disabled(&self) -> bool {
        self.inner.status().is_disabled()
    }

    /// Number of direct children (0 for a leaf).
    pub fn child_count(&self) -> usize {
        self.inner.child_count()
    }

    /// Register a callback invoked after every value change on this node.
    /// No replay: only changes after registration are delivered.
    pub fn subscribe_value<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let callback: ValueCallback = Arc::new(callback);
        self.inner.subscriptions().subscribe_value(callback)
    }

    /// Register a callback invoked whenever this node's status changes.
    pub fn subscribe_status<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(Status) + Send + Sync + 'static,
    {
        let callback: StatusCallback = Arc::new(callback);
        self.inner.subscriptions().subscribe_status(callback)
    }

    /// Release a registration. Returns false when the id was not found on
    /// this node.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.subscriptions().unsubscribe(id)
    }
}
