//! Error taxonomy for the dispatch interpreter.
//!
//! Per spec §7, opcode handlers never raise: they encode outcomes into
//! state flags. `RblError` is the currency crossed only at the
//! primitive-dispatch and env-lookup boundaries.

use std::fmt;

/// Errors that can cross the primitive-dispatch / env-lookup boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum RblError {
    /// The current strand has terminated; the scheduler should pick another.
    DeadThread,
    /// Generic invalid-state signal from the object system.
    Invalid,
    /// A primitive wants the current strand parked (moved to the sleeper pool).
    Suspend,
    /// An environment lookup found no binding.
    Absent,
    /// The object system wants to re-dispatch method resolution.
    Upcall,
    /// A primitive was applied with an argument shape it doesn't accept.
    PrimMismatch(String),
    /// A user-visible runtime diagnostic.
    RuntimeError(String),
}

impl fmt::Display for RblError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeadThread => write!(f, "dead thread"),
            Self::Invalid => write!(f, "invalid"),
            Self::Suspend => write!(f, "suspend"),
            Self::Absent => write!(f, "absent"),
            Self::Upcall => write!(f, "upcall"),
            Self::PrimMismatch(msg) => write!(f, "primitive argument mismatch: {msg}"),
            Self::RuntimeError(msg) => write!(f, "runtime error: {msg}"),
        }
    }
}

impl std::error::Error for RblError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_message() {
        let e = RblError::RuntimeError("&rest value is not a tuple".to_string());
        assert_eq!(e.to_string(), "runtime error: &rest value is not a tuple");
    }
}
