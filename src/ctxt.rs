//! The per-strand execution record (spec §3 `Ctxt`) and its arena.
//!
//! Spec §9 flags `ctxt` ↔ parent-`ctxt` as cyclic ownership needing
//! re-architecture, and recommends exactly this shape: "model as
//! arena-allocated ctxts with integer indices, with the 'parent' slot a
//! handle. Strand-pool and sleeper-pool store handles, not owned
//! contexts." `CtxtArena` below is that arena.

use std::sync::Arc;

use tracing::error;

use crate::code::Code;
use crate::env::Env;
use crate::location::{Location, StoreResult};
use crate::monitor::Monitor;
use crate::ob::{Ob, Tuple};
use crate::state::VMState;

/// Number of addressable context registers (spec §6 operand `r`).
pub const REG_COUNT: usize = 32;

/// A handle into a [`CtxtArena`]. Cheap to copy, stored in pools instead of
/// an owned `Ctxt`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CtxtHandle(usize);

/// The execution record of one strand (spec §3 `Ctxt`).
#[derive(Debug, Clone)]
pub struct Ctxt {
    /// Where `ret`'s result should be stored in the parent.
    pub tag: Location,
    pub argvec: Tuple,
    pub nargs: u16,
    pub env: Env,
    pub self_env: Env,
    pub code: Arc<Code>,
    /// Program counter, relative to `code`.
    pub pc: u32,
    pub rslt: Ob,
    /// Transmit target (spec §4.2 `doXmit`).
    pub trgt: Ob,
    pub monitor: Arc<Monitor>,
    pub outstanding: i32,
    /// Continuation / parent link, `None` at the root of a strand.
    pub parent: Option<CtxtHandle>,
    regs: Vec<Ob>,
}

impl Ctxt {
    fn blank(parent: Option<CtxtHandle>, code: Arc<Code>, monitor: Arc<Monitor>) -> Self {
        Self {
            tag: Location::Limbo,
            argvec: Tuple::NIL,
            nargs: 0,
            env: Env::empty(),
            self_env: Env::empty(),
            code,
            pc: 0,
            rslt: Ob::Niv,
            trgt: Ob::Niv,
            monitor,
            outstanding: 0,
            parent,
            regs: vec![Ob::Niv; REG_COUNT],
        }
    }

    /// `setReg(r, ob) -> option<Ctxt>` (spec §4.8): returns the mutated
    /// context on success, `None` ("no such register") out of range.
    pub fn set_reg(mut self, r: usize, ob: Ob) -> Option<Ctxt> {
        if r >= REG_COUNT {
            return None;
        }
        self.regs[r] = ob;
        Some(self)
    }

    /// `getReg(r) -> option<Ob>` (spec §4.8).
    pub fn get_reg(&self, r: usize) -> Option<&Ob> {
        self.regs.get(r)
    }

    pub fn regs_len(&self) -> usize {
        self.regs.len()
    }
}

/// Arena of strands, indexed by [`CtxtHandle`]. No reclamation: per spec
/// §1 objects (and, by extension, strand records) are externally managed
/// with no GC Non-goal, so a simple grow-only arena is sufficient — a
/// terminated strand's slot is just never referenced again.
#[derive(Debug, Default)]
pub struct CtxtArena {
    slots: Vec<Ctxt>,
}

impl CtxtArena {
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    pub fn alloc(&mut self, ctxt: Ctxt) -> CtxtHandle {
        self.slots.push(ctxt);
        CtxtHandle(self.slots.len() - 1)
    }

    pub fn get(&self, handle: CtxtHandle) -> &Ctxt {
        &self.slots[handle.0]
    }

    pub fn get_mut(&mut self, handle: CtxtHandle) -> &mut Ctxt {
        &mut self.slots[handle.0]
    }

    pub fn set(&mut self, handle: CtxtHandle, ctxt: Ctxt) {
        self.slots[handle.0] = ctxt;
    }
}

/// Construct a fresh child of `parent` on `state`'s arena (spec §4.6
/// `Push`/`PushAlloc`).
pub fn push_child(state: &mut VMState) -> CtxtHandle {
    let parent = state.ctxt;
    let code = state.arena.get(parent).code.clone();
    let monitor = state.current_monitor.clone();
    let mut child = Ctxt::blank(Some(parent), code, monitor);
    // Push/Pop swap which ctxt owns the argvec/env/registers without
    // changing the instruction stream, so the child starts at the
    // parent's current position, not program start.
    child.pc = state.pc;
    state.arena.alloc(child)
}

/// A strand with no parent and no program — used by tests and as the
/// bootstrap root for `VMState::new`.
impl Ctxt {
    pub fn root() -> Ctxt {
        Ctxt::blank(None, Arc::new(Code::empty()), Arc::new(Monitor::new(0)))
    }
}

/// `ctxt.scheduleStrand(state) -> state` (spec §3): append this strand to
/// the ready pool (spec §5: newly-forked strands are prepended by `Fork`
/// itself; `scheduleStrand` always appends, used by sleeper wake-up and by
/// `UpcallResume`).
pub fn schedule_strand(state: &mut VMState, handle: CtxtHandle) {
    state.strand_pool.push_back(handle);
}

/// `ctxt.ret(result) -> (isError, newState)` (spec §3, §4.2 `doRtn`).
///
/// Stores `result` into the parent's `tag` location. If there is no
/// parent, the strand has returned past the root: per spec §3 lifecycle
/// ("Destroyed ... when its owning strand terminates ... or returns past
/// the root"), this asks the flag machine for a strand switch by leaving
/// `do_rtn_flag` set (see spec §8 scenario 6 and the ordering note in
/// §4.2) rather than reporting an error.
pub fn ret(state: &mut VMState, result: Ob) -> bool {
    let handle = state.ctxt;
    state.arena.get_mut(handle).rslt = result.clone();
    let parent = state.arena.get(handle).parent;
    match parent {
        None => {
            state.do_rtn_flag = true;
            false
        }
        Some(parent_handle) => {
            let loc = state.arena.get(handle).tag.clone();
            let parent_ctxt = state.arena.get(parent_handle).clone();
            // Parent and child share one `code`/`pc` stream (the parent was
            // created by `Push`/`PushAlloc`, never suspended elsewhere), so
            // `state.pc`/`state.code`/`state.current_monitor` — which have
            // been tracking that shared stream all along — need no reset
            // here. Only a genuine cross-strand switch (`scheduler::
            // install_strand`) refreshes those.
            match Location::store(&loc, parent_ctxt, &state.global_env, result) {
                StoreResult::StoreFail => true,
                StoreResult::StoreCtxt(new_ctxt) => {
                    state.arena.set(parent_handle, new_ctxt);
                    state.ctxt = parent_handle;
                    false
                }
                StoreResult::StoreGlobal(new_env) => {
                    state.global_env = new_env;
                    state.ctxt = parent_handle;
                    false
                }
            }
        }
    }
}

/// `ctxt.vmError(state) -> (_, state)` (spec §3, §7).
///
/// A stub extension point per spec §7 ("VM-error handler is a stub in
/// this revision"): logs and leaves state otherwise untouched. Only
/// reached under [`crate::config::VmErrorPolicy::DelegateToCtxt`].
pub fn vm_error(state: &mut VMState, handle: CtxtHandle) {
    error!(target: "rosette_vm::ctxt", ?handle, "vm_error delegated to ctxt (stub)");
    if state.config.trace {
        state.debug_info.push(format!("vm_error on {:?}", handle));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_reg_out_of_range_is_none() {
        let ctxt = Ctxt::root();
        assert!(ctxt.set_reg(REG_COUNT, Ob::Niv).is_none());
    }

    #[test]
    fn set_reg_then_get_reg_round_trips() {
        let ctxt = Ctxt::root().set_reg(3, Ob::Fixnum(7)).unwrap();
        assert_eq!(ctxt.get_reg(3), Some(&Ob::Fixnum(7)));
    }
}
