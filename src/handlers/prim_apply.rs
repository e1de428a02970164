//! Primitive-application opcode handlers (spec §4.4).
//!
//! All four opcodes (`ApplyPrimTag`, `ApplyPrimArg`, `ApplyPrimReg`,
//! `ApplyCmd`) share one pipeline, differing only in where a non-sysval
//! result is stored (`ApplyCmd` discards it).

use crate::error::RblError;
use crate::location::Location;
use crate::ob::{FlattenResult, Ob, Tuple};
use crate::prim::Prim;
use crate::state::VMState;
use std::sync::Arc;

use super::exception::handle_exception;

enum Dest {
    Tag(u16),
    Arg(u16),
    Reg(u16),
    Discard,
}

pub fn apply_prim_tag(state: &mut VMState, k: u16, u: bool, m: u16, n: bool, v: u16) {
    apply_prim(state, k, u, m, n, Dest::Tag(v));
}

pub fn apply_prim_arg(state: &mut VMState, k: u16, u: bool, m: u16, n: bool, a: u16) {
    apply_prim(state, k, u, m, n, Dest::Arg(a));
}

pub fn apply_prim_reg(state: &mut VMState, k: u16, u: bool, m: u16, n: bool, r: u16) {
    apply_prim(state, k, u, m, n, Dest::Reg(r));
}

pub fn apply_cmd(state: &mut VMState, k: u16, u: bool, m: u16, n: bool) {
    apply_prim(state, k, u, m, n, Dest::Discard);
}

fn apply_prim(state: &mut VMState, k: u16, u: bool, m: u16, n: bool, dest: Dest) {
    let h = state.ctxt;
    state.arena.get_mut(h).nargs = m;
    if let Dest::Tag(v) = dest {
        let lit = state.code.lit(v);
        state.loc = Location::LocationAtom(Box::new(lit));
    }

    let prim = match state.prim_table.get(k).cloned() {
        Some(p) => p,
        None => {
            state.vm_error_flag = true;
            return;
        }
    };

    let result = if u {
        unwind_and_apply_prim(state, &prim)
    } else {
        prim.dispatch_helper(state.arena.get(h))
    };

    match result {
        Err(RblError::DeadThread) => state.do_next_thread_flag = true,
        Ok(ob) if ob.is_sysval() => {
            handle_exception(state, &ob, true);
            state.do_next_thread_flag = true;
        }
        Ok(ob) => store_result(state, h, dest, ob, n),
        Err(_) => state.vm_error_flag = true,
    }
}

fn store_result(state: &mut VMState, h: crate::ctxt::CtxtHandle, dest: Dest, ob: Ob, n: bool) {
    match dest {
        Dest::Discard => {
            if n {
                state.do_next_thread_flag = true;
            }
        }
        Dest::Arg(a) => {
            if (a as usize) >= state.arena.get(h).argvec.len() {
                state.vm_error_flag = true;
            } else {
                state.arena.get_mut(h).argvec.set_elem(a as usize, ob);
                if n {
                    state.do_next_thread_flag = true;
                }
            }
        }
        Dest::Reg(r) => match state.arena.get(h).clone().set_reg(r as usize, ob) {
            Some(c) => {
                state.arena.set(h, c);
                if n {
                    state.do_next_thread_flag = true;
                }
            }
            None => state.vm_error_flag = true,
        },
        Dest::Tag(_) => {
            let loc = state.loc.clone();
            let ctxt = state.arena.get(h).clone();
            let result = Location::store(&loc, ctxt, &state.global_env, ob);
            if state.apply_store_result(h, result) {
                if n {
                    state.do_next_thread_flag = true;
                }
            } else {
                state.vm_error_flag = true;
            }
        }
    }
}

/// `unwindAndApplyPrim(k, ctxt) -> (Result<Ob, RblError>, ctxt)` (spec
/// §4.4): splices the conventional trailing `&rest` tuple into the
/// argvec before the call, then restores the *entire* pre-call ctxt
/// (not just argvec/nargs) once the primitive returns.
///
/// Since [`Prim::dispatch_helper`] only ever sees `&Ctxt` (this crate's
/// primitives cannot reach `VMState` at all), full restoration and
/// "argvec/nargs only" restoration are equivalent here — the Open
/// Question in DESIGN.md about other mutations being discarded is
/// satisfied by construction rather than by a special-cased restore.
fn unwind_and_apply_prim(state: &mut VMState, prim: &Arc<dyn Prim>) -> Result<Ob, RblError> {
    let h = state.ctxt;
    let original = state.arena.get(h).clone();
    let (flattened, nargs) = match original.argvec.flatten_rest() {
        FlattenResult::Flattened(t) => {
            let n = t.len() as u16;
            (t, n)
        }
        FlattenResult::AbsentRest => (Tuple::NIL, 0),
        FlattenResult::InvalidRest => {
            return Err(crate::prim::runtime_error("&rest value is not a tuple"));
        }
    };
    let mut tmp = original.clone();
    tmp.argvec = flattened;
    tmp.nargs = nargs;
    state.arena.set(h, tmp);
    let result = prim.dispatch_helper(state.arena.get(h));
    state.arena.set(h, original);
    result
}
