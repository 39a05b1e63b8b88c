//! Reactive form-state tree with composite validation.
//!
//! A tree of named/indexed fields, each carrying a value and a validity
//! status derived from synchronous and asynchronous rules. Leaf changes
//! propagate upward: every composite derives its value from its children
//! and aggregates their statuses (`Invalid` > `Pending` > `Valid`, with
//! `Disabled` children ignored), so the root always carries one aggregate
//! the surrounding application can observe.
//!
//! # Example
//!
//! ```
//! use formtree::{FormTree, Schema, Status, validation::rules};
//!
//! let tree = FormTree::build(Schema::group([
//!     ("username", Schema::leaf("").validator(rules::forbidden(
//!         ["Chris", "Anna"],
//!         "nameIsForbidden",
//!     ))),
//!     ("gender", Schema::leaf("male")),
//! ]));
//!
//! tree.set_value("username", "Chris").unwrap();
//! assert_eq!(tree.status(), Status::Invalid);
//!
//! tree.set_value("username", "bob").unwrap();
//! assert_eq!(tree.status(), Status::Valid);
//! ```
//!
//! Asynchronous validators are scheduled on the ambient tokio runtime; a
//! leaf with async rules goes `Pending` as soon as its synchronous rules
//! pass and settles when the deferred check resolves, unless the value
//! was overwritten in the meantime, in which case the result is discarded.

pub mod error;
pub mod node;
pub mod path;
pub mod schema;
pub mod status;
pub mod subscription;
pub mod tree;
pub mod validation;

pub use error::TreeError;
pub use node::{NodeHandle, NodeKind};
pub use schema::Schema;
pub use status::Status;
pub use subscription::SubscriptionId;
pub use tree::FormTree;
pub use validation::{Failure, FailurePolicy, VALIDATOR_FAULT};
