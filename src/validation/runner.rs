//! Validator execution: synchronous pass, asynchronous scheduling, stale
//! discard.
//!
//! Asynchronous checks are spawned onto the ambient tokio runtime and apply
//! their result themselves, guarded by the leaf's generation counter: a
//! result whose captured generation no longer matches is silently dropped.
//! A validator that panics is isolated to its own node and recorded as a
//! [`VALIDATOR_FAULT`](super::VALIDATOR_FAULT) failure.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use futures::FutureExt;
use log::trace;
use serde_json::Value;

use crate::node::{self, LeafState, NodeRef};
use crate::status::Status;

use super::{Failure, FailurePolicy};

/// Run a leaf's validators against its current value and update its
/// validity cache. Returns whether the status changed; the caller is
/// responsible for publishing.
///
/// Synchronous rules run inline. When they all pass and the leaf has
/// asynchronous rules, the leaf goes `Pending` and a deferred check is
/// scheduled. With `schedule_async` false (tree construction) only the
/// synchronous outcome applies.
pub(crate) fn revalidate(node: &NodeRef, schedule_async: bool) -> bool {
    let Some(leaf) = node.leaf() else {
        return false;
    };
    let value = leaf.value();
    let generation = leaf.generation();

    let failures = run_sync(leaf, &value);
    if !failures.is_empty() {
        return node.set_validity(Status::Invalid, failures);
    }
    if leaf.async_rules().is_empty() || !schedule_async {
        return node.set_validity(Status::Valid, Vec::new());
    }

    // Pending is observable before the deferred check resolves.
    let changed = node.set_validity(Status::Pending, Vec::new());
    schedule(node, value, generation);
    changed
}

fn run_sync(leaf: &LeafState, value: &Value) -> Vec<Failure> {
    let mut failures = Vec::new();
    for rule in leaf.sync_rules() {
        match catch_unwind(AssertUnwindSafe(|| rule(value))) {
            Ok(None) => {}
            Ok(Some(failure)) => {
                failures.push(failure);
                if leaf.policy() == FailurePolicy::ShortCircuit {
                    break;
                }
            }
            Err(panic) => {
                failures.push(Failure::fault(panic_message(panic.as_ref())));
                if leaf.policy() == FailurePolicy::ShortCircuit {
                    break;
                }
            }
        }
    }
    failures
}

/// Spawn the deferred check for `generation`. Requires an ambient tokio
/// runtime.
fn schedule(node: &NodeRef, value: Value, generation: u64) {
    let node = Arc::clone(node);
    trace!("scheduling async validation (generation {generation})");
    tokio::spawn(async move {
        let Some(leaf) = node.leaf() else {
            return;
        };

        if let Some(interval) = leaf.debounce() {
            tokio::time::sleep(interval).await;
            if leaf.generation() != generation {
                trace!("debounced check superseded (generation {generation}), skipped");
                return;
            }
        }

        let mut failures = Vec::new();
        for rule in leaf.async_rules() {
            // Both building the future and awaiting it may panic.
            let fut = match catch_unwind(AssertUnwindSafe(|| rule(value.clone()))) {
                Ok(fut) => fut,
                Err(panic) => {
                    failures.push(Failure::fault(panic_message(panic.as_ref())));
                    if leaf.policy() == FailurePolicy::ShortCircuit {
                        break;
                    }
                    continue;
                }
            };
            match AssertUnwindSafe(fut).catch_unwind().await {
                Ok(None) => {}
                Ok(Some(failure)) => {
                    failures.push(failure);
                    if leaf.policy() == FailurePolicy::ShortCircuit {
                        break;
                    }
                }
                Err(panic) => {
                    failures.push(Failure::fault(panic_message(panic.as_ref())));
                    if leaf.policy() == FailurePolicy::ShortCircuit {
                        break;
                    }
                }
            }
        }

        if leaf.generation() != generation {
            trace!("async result stale (generation {generation}), discarded");
            return;
        }

        let status = if failures.is_empty() {
            Status::Valid
        } else {
            Status::Invalid
        };
        let changed = node.set_validity(status, failures);
        node::publish_update(&node, false, changed);
    });
}

/// Extract a human-readable message from a panic payload.
fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "validator panicked".to_string()
    }
}
