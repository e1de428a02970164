//! `StdOprn` dispatch (spec §6 `StdOprn.dispatch(state) -> state`).
//!
//! The object system's method-resolution internals are explicitly out of
//! scope (spec §1); this module defines only the dispatch contract
//! `doXmit` (spec §4.2) consumes when `ctxt.trgt` is a standard operation.

use std::fmt;
use std::sync::Arc;

use crate::state::VMState;

/// `StdOprn.dispatch(state) -> state` (spec §4.2 `doXmit`).
///
/// A host registers named standard operations; `doXmit` looks one up by
/// the name carried in `Ob::StdOprn` and hands it the whole `VMState`,
/// mirroring the source's state-threading style (object dispatch can
/// install a new `ctxt`, schedule strands, or touch the global env).
pub trait StdOprn: fmt::Debug {
    fn dispatch(&self, state: VMState) -> VMState;
}

/// `primTable`-style registry, keyed by the name in `Ob::StdOprn`.
pub trait StdOprnRegistry: fmt::Debug {
    fn resolve(&self, name: &str) -> Option<Arc<dyn StdOprn>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Identity;
    impl StdOprn for Identity {
        fn dispatch(&self, state: VMState) -> VMState {
            state
        }
    }

    #[derive(Debug, Default)]
    struct EmptyRegistry;
    impl StdOprnRegistry for EmptyRegistry {
        fn resolve(&self, _name: &str) -> Option<Arc<dyn StdOprn>> {
            None
        }
    }

    #[test]
    fn empty_registry_resolves_nothing() {
        let r = EmptyRegistry;
        assert!(r.resolve("anything").is_none());
        let _ = Identity; // constructed to confirm the trait implements cleanly
    }
}
