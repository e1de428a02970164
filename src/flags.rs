//! The flag machine (spec §4.2): after every opcode handler runs, these
//! four checks fire in a fixed order — `doXmit`, `doRtn`, `vmError`,
//! `doNextThread` — each consuming and clearing its own flag before the
//! next is examined. The ordering is load-bearing (spec §4.2): a `Rtn`
//! that also sets `doNextThreadFlag` must finish switching parent ctxts
//! before the scheduler looks for a new strand.

use crate::code::Code;
use crate::config::{VmConfig, VmErrorPolicy};
use crate::ctxt::{ret, vm_error};
use crate::ob::Ob;
use crate::scheduler::get_next_strand;
use crate::state::VMState;

/// `doXmit(state) -> state` (spec §4.2): dispatch `ctxt.trgt` if it names
/// a registered `StdOprn`; any other target is a documented pass-through
/// (spec §9 Open Question: the source never defines non-`StdOprn` xmit
/// targets, so this crate leaves them inert rather than guessing).
///
/// The handler, not the opcode that set `doXmitFlag`, is responsible for
/// clearing it (spec §4.2).
pub fn do_xmit(state: &mut VMState) {
    if !state.do_xmit_flag {
        return;
    }
    let trgt = state.arena.get(state.ctxt).trgt.clone();
    if let Ob::StdOprn(name) = &trgt {
        if let Some(registry) = state.std_oprns.clone() {
            if let Some(op) = registry.resolve(name) {
                let owned = std::mem::replace(state, VMState::new(Code::empty(), 0, VmConfig::default()));
                *state = op.dispatch(owned);
            }
        }
    }
    state.do_xmit_flag = false;
}

/// `doRtn(state) -> state` (spec §4.2): invoke `ctxt.ret`, then honor
/// `doRtnData` (the opcode's `n` operand) for a forced strand switch.
///
/// `doRtnFlag` is cleared *before* calling `ret`, not after: `ret` only
/// ever *sets* `doRtnFlag` again, on its past-root branch (spec §8
/// scenario 6), and leaves it untouched on the normal parent-return
/// branch. Clearing first means the flag read back afterward reflects
/// what `ret` itself did, not the handler's original request that got us
/// into `do_rtn` in the first place.
pub fn do_rtn(state: &mut VMState) {
    if !state.do_rtn_flag {
        return;
    }
    state.do_rtn_flag = false;
    let result = state.rslt().clone();
    let store_failed = ret(state, result);
    if store_failed {
        state.vm_error_flag = true;
    }
    let returned_past_root = state.do_rtn_flag;
    state.do_rtn_flag = false;
    if returned_past_root || state.do_rtn_data {
        state.do_next_thread_flag = true;
    }
    state.do_rtn_data = false;
}

/// `vmError(state) -> state` (spec §3, §7, §9): resolves the Open
/// Question of what a vm-error actually does via [`VmErrorPolicy`].
pub fn do_vm_error(state: &mut VMState) {
    if !state.vm_error_flag {
        return;
    }
    match state.config.vm_error_policy {
        VmErrorPolicy::NextThreadOnly => state.do_next_thread_flag = true,
        VmErrorPolicy::DelegateToCtxt => {
            let h = state.ctxt;
            vm_error(state, h);
        }
    }
    state.vm_error_flag = false;
}

/// `doNextThread(state) -> (exit: bool, state)` (spec §4.2, §4.3):
/// consume the flag and ask the scheduler for the next strand. Returns
/// `true` when there was no work left to switch to.
pub fn do_next_thread(state: &mut VMState) -> bool {
    if !state.do_next_thread_flag {
        return false;
    }
    state.do_next_thread_flag = false;
    get_next_strand(state)
}

/// Run all four checks in spec §4.2's fixed order. Returns `true` if the
/// dispatch loop should treat this as "no work left."
pub fn run_flag_machine(state: &mut VMState) -> bool {
    do_xmit(state);
    do_rtn(state);
    do_vm_error(state);
    do_next_thread(state)
}
