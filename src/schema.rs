//! Declarative schema used to build a tree.
//!
//! A schema describes the tree once, at construction: a leaf carries its
//! default value and validator lists, a group a name→schema mapping, a
//! collection an initial list of child schemas.
//!
//! # Example
//!
//! ```
//! use formtree::{Schema, validation::rules};
//!
//! let signup = Schema::group([
//!     ("username", Schema::leaf("").validator(rules::required)),
//!     ("gender", Schema::leaf("male")),
//! ]);
//! # let _ = signup;
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::validation::{AsyncValidator, Failure, FailurePolicy, SyncValidator};

/// Declarative description of one node and its subtree.
pub struct Schema {
    kind: SchemaKind,
}

pub(crate) enum SchemaKind {
    Leaf(LeafSchema),
    Group(Vec<(String, Schema)>),
    Collection(Vec<Schema>),
}

pub(crate) struct LeafSchema {
    pub(crate) default: Value,
    pub(crate) sync_rules: Vec<SyncValidator>,
    pub(crate) async_rules: Vec<AsyncValidator>,
    pub(crate) debounce: Option<Duration>,
    pub(crate) policy: FailurePolicy,
}

impl Schema {
    /// A terminal field holding `default` as its initial value.
    pub fn leaf(default: impl Into<Value>) -> Self {
        Self {
            kind: SchemaKind::Leaf(LeafSchema {
                default: default.into(),
                sync_rules: Vec::new(),
                async_rules: Vec::new(),
                debounce: None,
                policy: FailurePolicy::default(),
            }),
        }
    }

    /// A named composite. Keys must be unique; insertion order is preserved
    /// for iteration and output shape.
    ///
    /// # Panics
    ///
    /// Panics on a duplicate key.
    pub fn group<K>(entries: impl IntoIterator<Item = (K, Schema)>) -> Self
    where
        K: Into<String>,
    {
        let mut children: Vec<(String, Schema)> = Vec::new();
        for (key, child) in entries {
            let key = key.into();
            if children.iter().any(|(existing, _)| *existing == key) {
                panic!("duplicate key '{key}' in group schema");
            }
            children.push((key, child));
        }
        Self {
            kind: SchemaKind::Group(children),
        }
    }

    /// An ordered, dynamically resizable composite.
    pub fn collection(children: impl IntoIterator<Item = Schema>) -> Self {
        Self {
            kind: SchemaKind::Collection(children.into_iter().collect()),
        }
    }

    /// Append a synchronous validator. Rules run in declaration order.
    ///
    /// # Panics
    ///
    /// Panics when called on a group or collection schema.
    pub fn validator<F>(mut self, rule: F) -> Self
    where
        F: Fn(&Value) -> Option<Failure> + Send + Sync + 'static,
    {
        self.leaf_mut("validator").sync_rules.push(Arc::new(rule));
        self
    }

    /// Append an asynchronous validator, invoked only when every
    /// synchronous rule passed.
    ///
    /// # Panics
    ///
    /// Panics when called on a group or collection schema.
    pub fn async_validator<F, Fut>(mut self, rule: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Option<Failure>> + Send + 'static,
    {
        let wrapped: AsyncValidator = Arc::new(move |value: Value| {
            let fut: futures::future::BoxFuture<'static, Option<Failure>> =
                Box::pin(rule(value));
            fut
        });
        self.leaf_mut("async_validator").async_rules.push(wrapped);
        self
    }

    /// Delay asynchronous validation by `interval` after the triggering
    /// value change, coalescing rapid successive edits into one check.
    ///
    /// # Panics
    ///
    /// Panics when called on a group or collection schema.
    pub fn debounce(mut self, interval: Duration) -> Self {
        self.leaf_mut("debounce").debounce = Some(interval);
        self
    }

    /// How multiple synchronous failures are recorded for this field.
    ///
    /// # Panics
    ///
    /// Panics when called on a group or collection schema.
    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.leaf_mut("failure_policy").policy = policy;
        self
    }

    pub(crate) fn into_kind(self) -> SchemaKind {
        self.kind
    }

    fn leaf_mut(&mut self, method: &str) -> &mut LeafSchema {
        match &mut self.kind {
            SchemaKind::Leaf(leaf) => leaf,
            SchemaKind::Group(_) | SchemaKind::Collection(_) => {
                panic!("{method}() only applies to leaf schemas")
            }
        }
    }
}
