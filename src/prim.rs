//! The primitive-function table (spec §6 `primTable`/`Prim`).
//!
//! Explicitly out of scope per spec §1: "the primitive function table (we
//! consume a `Prim` dispatch contract)". This module defines only that
//! contract; no concrete primitives live here. A host links in an
//! implementation of [`Prim`] per table slot.

use std::fmt;
use std::sync::Arc;

use crate::ctxt::Ctxt;
use crate::error::RblError;
use crate::ob::Ob;

/// An externally-defined primitive operation callable from bytecode
/// (spec §6, Glossary "Prim").
pub trait Prim: fmt::Debug {
    /// `Prim.dispatchHelper(ctxt) -> Result<Ob, RblError>` (spec §4.4).
    fn dispatch_helper(&self, ctxt: &Ctxt) -> Result<Ob, RblError>;
}

/// `Prim.runtimeError(msg, state) -> (RblError, state)` (spec §6).
///
/// The source signature threads `state` through for parity with other
/// state-returning operations; this crate's primitives are pure with
/// respect to `VMState` (they only read `ctxt`), so there is nothing to
/// thread — callers already hold `state` and can act on the returned
/// error directly.
pub fn runtime_error(msg: impl Into<String>) -> RblError {
    RblError::RuntimeError(msg.into())
}

/// `primTable[k] -> Prim` (spec §6).
#[derive(Debug, Clone, Default)]
pub struct PrimTable {
    prims: Vec<Arc<dyn Prim>>,
}

impl PrimTable {
    pub fn new() -> Self {
        Self { prims: Vec::new() }
    }

    pub fn register(&mut self, prim: Arc<dyn Prim>) -> u16 {
        self.prims.push(prim);
        (self.prims.len() - 1) as u16
    }

    pub fn get(&self, k: u16) -> Option<&Arc<dyn Prim>> {
        self.prims.get(k as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct AlwaysDead;
    impl Prim for AlwaysDead {
        fn dispatch_helper(&self, _ctxt: &Ctxt) -> Result<Ob, RblError> {
            Err(RblError::DeadThread)
        }
    }

    #[test]
    fn register_then_get_round_trips() {
        let mut table = PrimTable::new();
        let k = table.register(Arc::new(AlwaysDead));
        assert!(table.get(k).is_some());
        assert!(table.get(k + 1).is_none());
    }
}
