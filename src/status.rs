//! Node validity status and composite aggregation.

use serde::{Deserialize, Serialize};

/// Aggregate validity classification of a node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    /// Every validator passed (or the node has no validators).
    #[default]
    Valid,
    /// At least one validator failed.
    Invalid,
    /// An asynchronous check is in flight.
    Pending,
    /// The node is excluded from validation and aggregation.
    Disabled,
}

impl Status {
    pub fn is_valid(self) -> bool {
        self == Self::Valid
    }

    pub fn is_invalid(self) -> bool {
        self == Self::Invalid
    }

    pub fn is_pending(self) -> bool {
        self == Self::Pending
    }

    pub fn is_disabled(self) -> bool {
        self == Self::Disabled
    }
}

/// Fold child statuses into a composite status.
///
/// Precedence: `Invalid` > `Pending` > `Valid`. `Disabled` children are
/// ignored; a composite with no enabled children is itself `Disabled`.
pub fn aggregate<I>(children: I) -> Status
where
    I: IntoIterator<Item = Status>,
{
    let mut any_enabled = false;
    let mut any_pending = false;

    for status in children {
        match status {
            Status::Invalid => return Status::Invalid,
            Status::Pending => {
                any_enabled = true;
                any_pending = true;
            }
            Status::Valid => any_enabled = true,
            Status::Disabled => {}
        }
    }

    if !any_enabled {
        Status::Disabled
    } else if any_pending {
        Status::Pending
    } else {
        Status::Valid
    }
}
