//! The dispatch loop (spec §4.1).
//!
//! Grounded on the teacher's `BytecodeVM::run`/`eval_step` (fetch, trace,
//! execute, loop), widened from its single-strand `Vec<u8>` walk to the
//! spec's fetch → bump-pc → count → handle → flag-machine → re-check
//! cycle, driven across whatever strand is currently installed rather
//! than a single chunk.

use tracing::trace;

use crate::flags::run_flag_machine;
use crate::handlers::{control, prim_apply, transfer};
use crate::opcode::Op;
use crate::scheduler::get_next_strand;
use crate::state::VMState;

/// One full cycle of spec §4.1: fetch, advance `pc`, count, dispatch the
/// opcode's handler, run the flag machine, and fold its verdict back into
/// `exitFlag`.
pub fn step(state: &mut VMState) {
    let op = match state.code.op(state.pc as usize) {
        Some(op) => op.clone(),
        None => {
            // Running off the end of `code` with no pending xmit/rtn is
            // only valid if another strand is waiting; otherwise there is
            // nothing left to do.
            if get_next_strand(state) {
                state.exit_flag = true;
                state.exit_code = 0;
            }
            return;
        }
    };
    state.set_pc(state.pc + 1);

    if state.config.trace {
        trace!(target: "rosette_vm::dispatch", pc = state.pc - 1, op = %op, "step");
    }
    bump_counters(state, &op);

    dispatch_op(state, &op);

    if run_flag_machine(state) {
        state.exit_flag = true;
        state.exit_code = 0;
    }
}

/// Run until `exitFlag` is set, honoring `VmConfig::max_steps` as a
/// host-side safety net against runaway loops (not part of the spec's own
/// termination contract, which is "both pools empty, no pending flags").
pub fn run(state: &mut VMState) {
    let mut steps: u64 = 0;
    while !state.exit_flag {
        if let Some(max) = state.config.max_steps {
            if steps >= max {
                state.exit_flag = true;
                state.exit_code = 1;
                state.push_debug("max_steps exceeded");
                break;
            }
        }
        step(state);
        steps += 1;
    }
}

fn bump_counters(state: &mut VMState, op: &Op) {
    *state.bytecodes.entry(op.clone()).or_insert(0) += 1;
    let mut monitor = (*state.current_monitor).clone();
    monitor.bump_opcode(op);
    state.current_monitor = std::sync::Arc::new(monitor);
    state.arena.get_mut(state.ctxt).monitor = state.current_monitor.clone();
}

fn dispatch_op(state: &mut VMState, op: &Op) {
    match op {
        Op::Halt => control::halt(state),
        Op::Push => control::push(state),
        Op::Pop => control::pop(state),
        Op::Nargs { n } => control::nargs(state, *n),
        Op::Alloc { n } => control::alloc(state, *n),
        Op::PushAlloc { n } => control::push_alloc(state, *n),
        Op::Extend { v } => control::extend(state, *v),
        Op::Outstanding { p, n } => control::outstanding(state, *p, *n),
        Op::Fork { p } => control::fork(state, *p),
        Op::XmitTag { v, m, u, n } => control::xmit_tag(state, *v, *m, *u, *n),
        Op::XmitArg { a, m, u, n } => control::xmit_arg(state, *a, *m, *u, *n),
        Op::XmitReg { r, m, u, n } => control::xmit_reg(state, *r, *m, *u, *n),
        Op::Send { m, u, n } => control::send(state, *m, *u, *n),
        Op::Rtn { n } => control::rtn(state, *n),
        Op::RtnTag { v, n } => control::rtn_tag(state, *v, *n),
        Op::RtnArg { a, n } => control::rtn_arg(state, *a, *n),
        Op::RtnReg { r, n } => control::rtn_reg(state, *r, *n),
        Op::UpcallRtn { n } => control::upcall_rtn(state, *n),
        Op::UpcallResume => control::upcall_resume(state),
        Op::Nxt => control::nxt(state),
        Op::Jmp { p } => control::jmp(state, *p),
        Op::JmpCut { m, p } => control::jmp_cut(state, *m, *p),
        Op::JmpFalse { p } => control::jmp_false(state, *p),

        Op::LookupToArg { a, v } => transfer::lookup_to_arg(state, *a, *v),
        Op::LookupToReg { r, v } => transfer::lookup_to_reg(state, *r, *v),
        Op::XferLexToArg { l, i, o, a } => transfer::xfer_lex_to_arg(state, *l, *i, *o, *a),
        Op::XferLexToReg { l, i, o, r } => transfer::xfer_lex_to_reg(state, *l, *i, *o, *r),
        Op::XferGlobalToArg { g, a } => transfer::xfer_global_to_arg(state, *g, *a),
        Op::XferGlobalToReg { g, r } => transfer::xfer_global_to_reg(state, *g, *r),
        Op::XferArgToArg { s, d } => transfer::xfer_arg_to_arg(state, *s, *d),
        Op::XferRsltToArg { a } => transfer::xfer_rslt_to_arg(state, *a),
        Op::XferRsltToReg { r } => transfer::xfer_rslt_to_reg(state, *r),
        Op::XferRsltToDest => transfer::xfer_rslt_to_dest(state),
        Op::XferArgToRslt { a } => transfer::xfer_arg_to_rslt(state, *a),
        Op::XferRegToRslt { r } => transfer::xfer_reg_to_rslt(state, *r),
        Op::XferSrcToRslt => transfer::xfer_src_to_rslt(state),
        Op::IndLitToArg { v, a } => transfer::ind_lit_to_arg(state, *v, *a),
        Op::IndLitToReg { v, r } => transfer::ind_lit_to_reg(state, *v, *r),
        Op::IndLitToRslt { v } => transfer::ind_lit_to_rslt(state, *v),
        Op::ImmediateLitToArg { v, a } => transfer::immediate_lit_to_arg(state, *v, *a),
        Op::ImmediateLitToReg { v, r } => transfer::immediate_lit_to_reg(state, *v, *r),
        Op::ImmediateLitToRslt { v } => transfer::immediate_lit_to_rslt(state, *v),

        Op::ApplyPrimTag { k, u, m, n, v } => prim_apply::apply_prim_tag(state, *k, *u, *m, *n, *v),
        Op::ApplyPrimArg { k, u, m, n, a } => prim_apply::apply_prim_arg(state, *k, *u, *m, *n, *a),
        Op::ApplyPrimReg { k, u, m, n, r } => prim_apply::apply_prim_reg(state, *k, *u, *m, *n, *r),
        Op::ApplyCmd { k, u, m, n } => prim_apply::apply_cmd(state, *k, *u, *m, *n),

        Op::Unknown => {
            state.push_debug("unknown opcode: fatal");
            state.exit_flag = true;
            state.exit_code = 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::Code;
    use crate::config::VmConfig;
    use crate::ob::Ob;

    #[test]
    fn halt_is_a_single_step_and_exits_cleanly() {
        let code = Code::builder().op(Op::Halt).build();
        let mut state = VMState::new(code, 0, VmConfig::default());
        run(&mut state);
        assert!(state.exit_flag);
        assert_eq!(state.exit_code, 0);
    }

    #[test]
    fn immediate_literal_into_rslt_then_halt() {
        let code = Code::builder()
            .op(Op::ImmediateLitToRslt { v: 8 })
            .op(Op::Halt)
            .build();
        let mut state = VMState::new(code, 0, VmConfig::default());
        run(&mut state);
        assert_eq!(state.rslt(), &Ob::Bool(true));
        assert_eq!(state.exit_code, 0);
    }

    #[test]
    fn jmp_skips_the_next_instruction() {
        let code = Code::builder()
            .op(Op::Jmp { p: 2 })
            .op(Op::Halt)
            .op(Op::ImmediateLitToRslt { v: 9 })
            .op(Op::Halt)
            .build();
        let mut state = VMState::new(code, 0, VmConfig::default());
        run(&mut state);
        assert_eq!(state.rslt(), &Ob::Bool(false));
        assert_eq!(state.exit_code, 0);
    }

    #[test]
    fn unknown_opcode_is_fatal() {
        let code = Code::builder().op(Op::Unknown).build();
        let mut state = VMState::new(code, 0, VmConfig::default());
        run(&mut state);
        assert!(state.exit_flag);
        assert_eq!(state.exit_code, 1);
    }

    #[test]
    fn running_off_the_end_with_no_more_strands_exits_cleanly() {
        let code = Code::builder().op(Op::Nargs { n: 0 }).build();
        let mut state = VMState::new(code, 0, VmConfig::default());
        run(&mut state);
        assert!(state.exit_flag);
        assert_eq!(state.exit_code, 0);
    }

    #[test]
    fn fork_prepends_a_strand_that_halt_does_not_consume() {
        // `Halt` stops the whole machine (spec §4.6), so the strand forked
        // a moment earlier is left parked in the strand pool rather than
        // run — a well-formed program schedules a `Nxt` instead of
        // `Halt`ing if it wants the forked strand to actually execute.
        let code = Code::builder()
            .op(Op::Fork { p: 3 })
            .op(Op::Halt)
            .op(Op::Halt)
            .op(Op::ImmediateLitToRslt { v: 8 })
            .op(Op::Halt)
            .build();
        let mut state = VMState::new(code, 0, VmConfig::default());
        run(&mut state);
        assert!(state.exit_flag);
        assert_eq!(state.exit_code, 0);
        assert_eq!(state.strand_pool.len(), 1);
    }
}
