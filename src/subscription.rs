//! Push-based change subscriptions.
//!
//! Every node carries two callback registries, one for value changes and
//! one for status changes. Delivery is push-based with no replay: a new
//! subscriber only sees changes made after registration. Callbacks on one
//! node are invoked in registration order.

use std::sync::{Arc, PoisonError, RwLock};

use log::trace;
use serde_json::Value;
use uuid::Uuid;

use crate::status::Status;

/// Identifier for a registered subscription, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

pub(crate) type ValueCallback = Arc<dyn Fn(&Value) + Send + Sync>;
pub(crate) type StatusCallback = Arc<dyn Fn(Status) + Send + Sync>;

/// Per-node callback registries.
#[derive(Default)]
pub(crate) struct Subscriptions {
    value: RwLock<Vec<(SubscriptionId, ValueCallback)>>,
    status: RwLock<Vec<(SubscriptionId, StatusCallback)>>,
}

impl Subscriptions {
    pub(crate) fn subscribe_value(&self, callback: ValueCallback) -> SubscriptionId {
        let id = SubscriptionId::new();
        self.value
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, callback));
        id
    }

    pub(crate) fn subscribe_status(&self, callback: StatusCallback) -> SubscriptionId {
        let id = SubscriptionId::new();
        self.status
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, callback));
        id
    }

    /// Remove a registration. Returns false when the id was not found.
    pub(crate) fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut values = self.value.write().unwrap_or_else(PoisonError::into_inner);
        let before = values.len();
        values.retain(|(sub, _)| *sub != id);
        if values.len() != before {
            return true;
        }
        drop(values);

        let mut statuses = self.status.write().unwrap_or_else(PoisonError::into_inner);
        let before = statuses.len();
        statuses.retain(|(sub, _)| *sub != id);
        statuses.len() != before
    }

    pub(crate) fn emit_value(&self, value: &Value) {
        // Clone the callbacks out so none of the registry locks are held
        // while user code runs (a callback may subscribe or unsubscribe).
        let callbacks: Vec<ValueCallback> = self
            .value
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, cb)| Arc::clone(cb))
            .collect();
        if !callbacks.is_empty() {
            trace!("delivering value change to {} subscriber(s)", callbacks.len());
        }
        for callback in callbacks {
            callback(value);
        }
    }

    pub(crate) fn emit_status(&self, status: Status) {
        let callbacks: Vec<StatusCallback> = self
            .status
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, cb)| Arc::clone(cb))
            .collect();
        if !callbacks.is_empty() {
            trace!(
                "delivering status {status:?} to {} subscriber(s)",
                callbacks.len()
            );
        }
        for callback in callbacks {
            callback(status);
        }
    }
}
