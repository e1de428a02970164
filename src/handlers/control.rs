//! Control-transfer opcode handlers (spec §4.6).
//!
//! Each function implements exactly one `Op` variant's effect table entry,
//! named after it so `dispatch.rs`'s match arms read as a restatement of
//! the spec table rather than inline logic.

use crate::ctxt::{push_child, schedule_strand};
use crate::env::Env;
use crate::location::Location;
use crate::ob::Ob;
use crate::scheduler::get_next_strand;
use crate::state::VMState;

use super::exception::handle_formals_mismatch;

pub fn halt(state: &mut VMState) {
    state.exit_flag = true;
    state.exit_code = 0;
}

pub fn push(state: &mut VMState) {
    state.ctxt = push_child(state);
}

pub fn pop(state: &mut VMState) {
    if let Some(parent) = state.arena.get(state.ctxt).parent {
        state.ctxt = parent;
    }
}

pub fn nargs(state: &mut VMState, n: u16) {
    state.arena.get_mut(state.ctxt).nargs = n;
}

pub fn alloc(state: &mut VMState, n: u16) {
    use crate::ob::Tuple;
    state.arena.get_mut(state.ctxt).argvec = Tuple::filled(n, Ob::Niv);
}

pub fn push_alloc(state: &mut VMState, n: u16) {
    use crate::ob::Tuple;
    let h = push_child(state);
    state.arena.get_mut(h).argvec = Tuple::filled(n, Ob::Niv);
    state.ctxt = h;
}

pub fn extend(state: &mut VMState, v: u16) {
    let lit = state.code.lit(v);
    let template = match lit {
        Ob::Template(t) => t,
        _ => {
            handle_formals_mismatch(state);
            state.do_next_thread_flag = true;
            return;
        }
    };
    let h = state.ctxt;
    let (argvec, nargs, env) = {
        let c = state.arena.get(h);
        (c.argvec.clone(), c.nargs, c.env.clone())
    };
    match template.match_pattern(&argvec, nargs) {
        Some(actuals) => {
            let new_env = env.extend_with(&template, actuals);
            let c = state.arena.get_mut(h);
            c.nargs = 0;
            c.env = new_env;
        }
        None => {
            handle_formals_mismatch(state);
            state.do_next_thread_flag = true;
        }
    }
}

pub fn outstanding(state: &mut VMState, p: u32, n: i32) {
    let h = state.ctxt;
    state.arena.get_mut(h).outstanding = n;
    state.set_pc(p);
}

/// `Fork(p)`: clone the current ctxt with `pc := p`, prepend to the
/// strand pool (spec §5: newly-forked strands are prepended, unlike
/// `scheduleStrand`'s append).
pub fn fork(state: &mut VMState, p: u32) {
    let h = state.ctxt;
    let mut clone = state.arena.get(h).clone();
    clone.pc = p;
    let new_handle = state.arena.alloc(clone);
    state.strand_pool.push_front(new_handle);
}

pub fn xmit_tag(state: &mut VMState, v: u16, m: u16, u: bool, n: bool) {
    let lit = state.code.lit(v);
    set_xmit(state, Location::LocationAtom(Box::new(lit)), m, u, n);
}

pub fn xmit_arg(state: &mut VMState, a: u16, m: u16, u: bool, n: bool) {
    set_xmit(state, Location::ArgReg(a), m, u, n);
}

pub fn xmit_reg(state: &mut VMState, r: u16, m: u16, u: bool, n: bool) {
    set_xmit(state, Location::CtxtReg(r), m, u, n);
}

fn set_xmit(state: &mut VMState, tag: Location, m: u16, u: bool, n: bool) {
    let h = state.ctxt;
    let c = state.arena.get_mut(h);
    c.nargs = m;
    c.tag = tag;
    state.xmit_data.unwind = u;
    state.xmit_data.next = n;
    state.do_xmit_flag = true;
}

/// `Send(m,u,n)`: a one-way message. Breaks the parent link first so a
/// reply has nowhere to land (spec §4.6).
pub fn send(state: &mut VMState, m: u16, u: bool, n: bool) {
    let h = state.ctxt;
    state.arena.get_mut(h).parent = None;
    state.arena.get_mut(h).nargs = m;
    state.xmit_data.unwind = u;
    state.xmit_data.next = n;
    state.do_xmit_flag = true;
}

pub fn rtn(state: &mut VMState, n: bool) {
    state.do_rtn_data = n;
    state.do_rtn_flag = true;
}

pub fn rtn_tag(state: &mut VMState, v: u16, n: bool) {
    let lit = state.code.lit(v);
    state.arena.get_mut(state.ctxt).tag = Location::LocationAtom(Box::new(lit));
    rtn(state, n);
}

pub fn rtn_arg(state: &mut VMState, a: u16, n: bool) {
    state.arena.get_mut(state.ctxt).tag = Location::ArgReg(a);
    rtn(state, n);
}

pub fn rtn_reg(state: &mut VMState, r: u16, n: bool) {
    state.arena.get_mut(state.ctxt).tag = Location::CtxtReg(r);
    rtn(state, n);
}

/// `UpcallRtn(n)`: store `ctxt.rslt` directly into the parent's `tag`
/// location, bypassing `doRtn`'s own ctxt-switch bookkeeping.
///
/// Per the Open Question resolution in DESIGN.md, this clears
/// `doRtnFlag`/`doRtnData` the way the other return-family opcodes leave
/// them for `doRtn` to clear — the source's omission reads as an
/// oversight, not a deliberate difference.
pub fn upcall_rtn(state: &mut VMState, n: bool) {
    let h = state.ctxt;
    let cur = state.arena.get(h).clone();
    match cur.parent {
        None => state.vm_error_flag = true,
        Some(parent_handle) => {
            let parent_ctxt = state.arena.get(parent_handle).clone();
            let result = Location::store(&cur.tag, parent_ctxt, &state.global_env, cur.rslt);
            if state.apply_store_result(parent_handle, result) {
                // See the note in `ctxt::ret`: parent and child share one
                // `code`/`pc` stream, so no refresh is needed here.
                state.ctxt = parent_handle;
                if n {
                    state.do_next_thread_flag = true;
                }
            } else {
                state.vm_error_flag = true;
            }
        }
    }
    state.do_rtn_flag = false;
    state.do_rtn_data = false;
}

/// `UpcallResume`: wake the parent strand without transferring a result.
pub fn upcall_resume(state: &mut VMState) {
    if let Some(parent) = state.arena.get(state.ctxt).parent {
        schedule_strand(state, parent);
    }
    state.do_next_thread_flag = true;
}

pub fn nxt(state: &mut VMState) {
    if get_next_strand(state) {
        state.exit_flag = true;
        state.exit_code = 0;
    }
}

pub fn jmp(state: &mut VMState, p: u32) {
    state.set_pc(p);
}

/// `JmpCut(m,p)`: walk `env` up `m` parents, then jump.
pub fn jmp_cut(state: &mut VMState, m: u32, p: u32) {
    let h = state.ctxt;
    let walked: Option<Env> = state.arena.get(h).env.ancestor(m).cloned();
    if let Some(env) = walked {
        state.arena.get_mut(h).env = env;
    }
    state.set_pc(p);
}

pub fn jmp_false(state: &mut VMState, p: u32) {
    if state.rslt().is_false() {
        state.set_pc(p);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::Code;
    use crate::config::VmConfig;

    fn fresh() -> VMState {
        VMState::new(Code::empty(), 4, VmConfig::default())
    }

    #[test]
    fn halt_sets_exit_flag_with_code_zero() {
        let mut state = fresh();
        halt(&mut state);
        assert!(state.exit_flag);
        assert_eq!(state.exit_code, 0);
    }

    #[test]
    fn push_then_pop_restores_ctxt_handle() {
        let mut state = fresh();
        let original = state.ctxt;
        push(&mut state);
        assert_ne!(state.ctxt, original);
        pop(&mut state);
        assert_eq!(state.ctxt, original);
    }

    #[test]
    fn fork_prepends_clone_to_strand_pool() {
        let mut state = fresh();
        fork(&mut state, 7);
        let forked = *state.strand_pool.front().unwrap();
        assert_eq!(state.arena.get(forked).pc, 7);
    }

    #[test]
    fn jmp_false_only_jumps_when_rslt_is_false() {
        let mut state = fresh();
        state.set_rslt(Ob::Bool(true));
        jmp_false(&mut state, 99);
        assert_eq!(state.pc, 0);
        state.set_rslt(Ob::Bool(false));
        jmp_false(&mut state, 99);
        assert_eq!(state.pc, 99);
    }

    #[test]
    fn xmit_tag_sets_flag_and_scratch() {
        let mut state = fresh();
        xmit_tag(&mut state, 0, 2, true, false);
        assert!(state.do_xmit_flag);
        assert_eq!(state.xmit_data.unwind, true);
        assert_eq!(state.arena.get(state.ctxt).nargs, 2);
    }
}
