//! A small demonstration harness: assembles the concrete scenarios from
//! spec §8 directly with [`rosette_vm::code::CodeBuilder`] (there is no
//! compiler in this crate, spec §1) and runs each to completion, printing
//! the observable outcome. Grounded on the teacher's `main.rs`, which
//! likewise wires a `tracing_subscriber` and walks a fixed list of
//! hand-built inputs through the VM rather than parsing argv into a
//! pipeline.

use std::sync::Arc;

use rosette_vm::code::Code;
use rosette_vm::config::VmConfig;
use rosette_vm::ctxt::Ctxt;
use rosette_vm::dispatch::run;
use rosette_vm::error::RblError;
use rosette_vm::ob::Ob;
use rosette_vm::opcode::Op;
use rosette_vm::prim::Prim;
use rosette_vm::state::VMState;

fn main() {
    tracing_subscriber::fmt::init();

    scenario_halt_immediate();
    scenario_immediate_literal_to_register();
    scenario_jump();
    scenario_fork_and_next();
    scenario_apply_prim_dead_thread();
    scenario_return_and_switch();
}

fn scenario_halt_immediate() {
    let code = Code::builder().op(Op::Halt).build();
    let mut state = VMState::new(code, 0, VmConfig::default());
    run(&mut state);
    println!("halt_immediate: exit_code={}", state.exit_code);
}

fn scenario_immediate_literal_to_register() {
    let code = Code::builder()
        .op(Op::ImmediateLitToReg { v: 8, r: 0 })
        .op(Op::Halt)
        .build();
    let mut state = VMState::new(code, 0, VmConfig::default());
    run(&mut state);
    let reg0 = state.arena.get(state.ctxt).get_reg(0).cloned();
    println!("immediate_literal_to_register: reg0={reg0:?} exit_code={}", state.exit_code);
}

fn scenario_jump() {
    let code = Code::builder()
        .op(Op::Jmp { p: 2 })
        .op(Op::Halt)
        .op(Op::ImmediateLitToRslt { v: 9 })
        .op(Op::Halt)
        .build();
    let mut state = VMState::new(code, 0, VmConfig::default());
    run(&mut state);
    println!("jump: rslt={:?} exit_code={}", state.rslt(), state.exit_code);
}

fn scenario_fork_and_next() {
    let code = Code::builder()
        .op(Op::Fork { p: 3 })
        .op(Op::Nxt)
        .op(Op::Halt)
        .op(Op::ImmediateLitToRslt { v: 8 })
        .op(Op::Halt)
        .build();
    let mut state = VMState::new(code, 0, VmConfig::default());
    run(&mut state);
    println!("fork_and_next: rslt={:?} exit_code={}", state.rslt(), state.exit_code);
}

#[derive(Debug)]
struct AlwaysDead;
impl Prim for AlwaysDead {
    fn dispatch_helper(&self, _ctxt: &Ctxt) -> Result<Ob, RblError> {
        Err(RblError::DeadThread)
    }
}

fn scenario_apply_prim_dead_thread() {
    let code = Code::builder()
        .op(Op::ApplyCmd { k: 0, u: false, m: 0, n: false })
        .op(Op::Halt)
        .build();
    let mut state = VMState::new(code, 0, VmConfig::default());
    state.prim_table.register(Arc::new(AlwaysDead));
    run(&mut state);
    println!(
        "apply_prim_dead_thread: exit_code={} (no further strand, so it exits via empty pools)",
        state.exit_code
    );
}

fn scenario_return_and_switch() {
    // Push opens a child ctxt; the child computes RBLTRUE and returns it
    // into the parent's register 0; the parent then halts.
    let code = Code::builder()
        .op(Op::Push)
        .op(Op::ImmediateLitToRslt { v: 8 })
        .op(Op::RtnReg { r: 0, n: false })
        .op(Op::Halt)
        .build();
    let mut state = VMState::new(code, 0, VmConfig::default());
    run(&mut state);
    let reg0 = state.arena.get(state.ctxt).get_reg(0).cloned();
    println!("return_and_switch: parent_reg0={reg0:?} exit_code={}", state.exit_code);
}
