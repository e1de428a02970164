//! `handleException` and the related extension-point stubs (spec §4.5,
//! plus the "malformed destination" hooks §4.6/§4.7 reference in passing).
//!
//! Spec §4.5 gives a dispatch table on the sys-value code but leaves the
//! concrete hooks unspecified beyond "may enqueue to sleeper pool, may
//! signal async wait, may log." We implement that contract literally:
//! every hook here is a stub except `handle_sleep`, whose pool-move is the
//! one piece of concrete behavior the spec actually describes.

use tracing::{error, warn};

use crate::ob::{Ob, SysCode};
use crate::state::VMState;

/// `handleException(ob, op, tag, state) -> state` (spec §4.5).
///
/// `is_apply_prim_family` distinguishes the two branches the table keys
/// on: `ApplyPrimTag`/`ApplyPrimArg`/`ApplyPrimReg`/`ApplyCmd` versus the
/// xmit-family opcodes.
pub fn handle_exception(state: &mut VMState, ob: &Ob, is_apply_prim_family: bool) {
    match ob.sysval() {
        Some(SysCode::Upcall) => {
            if is_apply_prim_family {
                handle_apply_prim_upcall(state);
            } else {
                handle_xmit_upcall(state);
            }
        }
        Some(SysCode::Suspend) => {
            if is_apply_prim_family {
                handle_apply_prim_suspend(state);
            }
            // Suspend outside the apply-prim family has no defined effect.
        }
        Some(SysCode::Sleep) => handle_sleep(state),
        Some(SysCode::Invalid) | Some(SysCode::DeadThread) => {}
        Some(SysCode::Interrupt) => fatal(state, "interrupt sys-value reached handleException"),
        None => fatal(state, "handleException called on a non-sysval object"),
    }
}

/// Stub: a primitive wants the object system to retry method resolution.
/// Extension-point contract: may enqueue to the sleeper pool, may signal
/// async wait, may log.
pub fn handle_apply_prim_upcall(state: &mut VMState) {
    warn!(target: "rosette_vm::handlers::exception", "apply-prim upcall (stub)");
    state.push_debug("handle_apply_prim_upcall (stub)");
}

/// Stub: an xmit-family opcode's target raised Upcall.
pub fn handle_xmit_upcall(state: &mut VMState) {
    warn!(target: "rosette_vm::handlers::exception", "xmit upcall (stub)");
    state.push_debug("handle_xmit_upcall (stub)");
}

/// Stub: a primitive wants the current strand parked pending some
/// external event, without (yet) moving it off the strand pool itself.
pub fn handle_apply_prim_suspend(state: &mut VMState) {
    warn!(target: "rosette_vm::handlers::exception", "apply-prim suspend (stub)");
    state.push_debug("handle_apply_prim_suspend (stub)");
}

/// A sys-value `Sleep` moves the current strand to the sleeper pool
/// (spec §5): the one hook whose effect is concretely specified rather
/// than left to a host extension.
pub fn handle_sleep(state: &mut VMState) {
    let h = state.ctxt;
    state.sleeper_pool.push(h);
    state.do_next_thread_flag = true;
}

/// `handleFormalsMismatch` (spec §4.6 `Extend`): arity mismatch between a
/// template and the argvec it's matched against.
pub fn handle_formals_mismatch(state: &mut VMState) {
    warn!(target: "rosette_vm::handlers::exception", "formals mismatch (stub)");
    state.push_debug("handle_formals_mismatch (stub)");
}

/// `handleMissingBinding` (spec §4.7 `LookupTo*`): an absent key once the
/// lexical search terminates without an upcall.
pub fn handle_missing_binding(state: &mut VMState, key: String) {
    warn!(target: "rosette_vm::handlers::exception", key = %key, "missing binding (stub)");
    state.push_debug(format!("handle_missing_binding: {key} (stub)"));
}

fn fatal(state: &mut VMState, msg: &str) {
    error!(target: "rosette_vm::handlers::exception", "{msg}");
    state.push_debug(msg.to_string());
    state.exit_flag = true;
    state.exit_code = 1;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::Code;
    use crate::config::VmConfig;

    #[test]
    fn sleep_moves_current_strand_to_sleeper_pool() {
        let mut state = VMState::new(Code::empty(), 0, VmConfig::default());
        let h = state.ctxt;
        handle_exception(&mut state, &Ob::SysVal(SysCode::Sleep), false);
        assert_eq!(state.sleeper_pool, vec![h]);
        assert!(state.do_next_thread_flag);
    }

    #[test]
    fn interrupt_is_fatal() {
        let mut state = VMState::new(Code::empty(), 0, VmConfig::default());
        handle_exception(&mut state, &Ob::SysVal(SysCode::Interrupt), false);
        assert!(state.exit_flag);
        assert_eq!(state.exit_code, 1);
    }

    #[test]
    fn invalid_and_dead_thread_are_no_ops() {
        let mut state = VMState::new(Code::empty(), 0, VmConfig::default());
        handle_exception(&mut state, &Ob::SysVal(SysCode::Invalid), false);
        assert!(!state.exit_flag);
        assert!(!state.do_next_thread_flag);
    }
}
