//! Named validation failures.

use std::fmt;

use serde::Serialize;

/// Failure code synthesized when a validator itself panics.
pub const VALIDATOR_FAULT: &str = "validatorFault";

/// A named failure produced by a validator.
///
/// The code is the machine-readable name of the rule that failed, e.g.
/// `nameIsForbidden`; the message is an optional human-readable detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    /// Machine-readable failure name.
    pub code: String,
    /// Optional human-readable detail.
    pub message: Option<String>,
}

impl Failure {
    /// Creates a new failure with just a code.
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: None,
        }
    }

    /// Creates a new failure with a code and a message.
    pub fn with_message(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: Some(message.into()),
        }
    }

    /// Failure recorded when a validator panicked.
    pub(crate) fn fault(message: impl Into<String>) -> Self {
        Self::with_message(VALIDATOR_FAULT, message)
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(message) = &self.message {
            write!(f, "{}: {}", self.code, message)
        } else {
            write!(f, "{}", self.code)
        }
    }
}
