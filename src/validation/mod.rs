//! Synchronous and asynchronous validation.
//!
//! Validators are plain closures over the node's value. Synchronous rules
//! run inline on every value change; asynchronous rules are scheduled as
//! deferred tasks only when every synchronous rule passed, with an optional
//! per-leaf debounce. A generation counter on each leaf discards results
//! that resolve after the value they checked was overwritten.

mod failure;
pub mod rules;
pub(crate) mod runner;

pub use failure::{Failure, VALIDATOR_FAULT};

use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::Value;

/// Synchronous rule: immediate pass/fail over a value.
///
/// Returns `None` when the value is acceptable, or the named failure.
pub type SyncValidator = Arc<dyn Fn(&Value) -> Option<Failure> + Send + Sync>;

/// Asynchronous rule: deferred pass/fail over a value.
pub type AsyncValidator = Arc<dyn Fn(Value) -> BoxFuture<'static, Option<Failure>> + Send + Sync>;

/// How multiple synchronous failures on one field are recorded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Run every synchronous rule and record all failures.
    #[default]
    CollectAll,
    /// Stop at the first failing rule.
    ShortCircuit,
}
