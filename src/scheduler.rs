//! The strand scheduler (spec §4.3): `getNextStrand`, `installStrand`,
//! `installMonitor`, `installCtxt`.
//!
//! Grounded on the teacher's single-strand `BytecodeVM::run` loop,
//! widened to the spec's strand-pool model: where the teacher just falls
//! off the end of `self.chunk.code`, this crate pops the next ready
//! strand and keeps going, only truly halting once both pools are empty
//! and there are no outstanding async signals (`nsigs`).

use std::sync::Arc;

use crate::ctxt::CtxtHandle;
use crate::state::VMState;

/// `installCtxt(handle, state) -> state` (spec §4.3): make `handle` the
/// current strand, refreshing the cached `code`/`pc`.
pub fn install_ctxt(state: &mut VMState, handle: CtxtHandle) {
    state.ctxt = handle;
    let ctxt = state.arena.get(handle);
    state.code = ctxt.code.clone();
    state.pc = ctxt.pc;
}

/// `installMonitor(handle, state) -> state` (spec §4.3): stop the
/// outgoing monitor, copy its `opcodeCounts -> bytecodes`,
/// `tracing -> debug`, and `obCounts` onto `state`, install the incoming
/// monitor as the new reference, and start it.
pub fn install_monitor(state: &mut VMState, handle: CtxtHandle) {
    let mut outgoing = (*state.current_monitor).clone();
    outgoing.stop();
    state.bytecodes = outgoing.opcode_counts().clone();
    state.ob_counts = outgoing.obj_counts().clone();
    state.debug = outgoing.tracing();

    let mut incoming = (*state.arena.get(handle).monitor).clone();
    incoming.start();
    let incoming = Arc::new(incoming);
    state.arena.get_mut(handle).monitor = incoming.clone();
    state.current_monitor = incoming;
}

/// `installStrand(handle, state) -> state`: per spec §4.3, `installMonitor`
/// only runs when the incoming strand's monitor differs from the one
/// currently installed (invariant 4); `installCtxt` always runs.
pub fn install_strand(state: &mut VMState, handle: CtxtHandle) {
    if state.arena.get(handle).monitor.id() != state.current_monitor.id() {
        install_monitor(state, handle);
    }
    install_ctxt(state, handle);
}

/// `getNextStrand(state) -> (exit: bool, state)` (spec §4.3): pop the
/// next ready strand off the front of the strand pool and install it. If
/// the strand pool is empty, fall through to `tryAwakeSleepingStrand`.
/// Returns `true` ("no work left") only when both pools are empty and
/// there are no outstanding async signals.
pub fn get_next_strand(state: &mut VMState) -> bool {
    match state.strand_pool.pop_front() {
        Some(handle) => {
            install_strand(state, handle);
            false
        }
        None => try_awake_sleeping_strand(state),
    }
}

/// `tryAwakeSleepingStrand(state) -> (exit: bool, state)` (spec §4.3):
///
/// - sleeper pool empty, no outstanding signals → `NoWorkLeft`, exit.
/// - sleeper pool empty, signals outstanding → `WaitForAsync`: set
///   `doAsyncWaitFlag` and cede control to the host without exiting.
/// - sleeper pool non-empty → reschedule every sleeper (en masse, before
///   installing the new head, per spec §5), clear the sleeper pool, then
///   pop and install the head exactly like the strand-pool case above.
fn try_awake_sleeping_strand(state: &mut VMState) -> bool {
    if state.sleeper_pool.is_empty() {
        if state.nsigs == 0 {
            return true;
        }
        state.do_async_wait_flag = true;
        return false;
    }
    for handle in std::mem::take(&mut state.sleeper_pool) {
        crate::ctxt::schedule_strand(state, handle);
    }
    let handle = state
        .strand_pool
        .pop_front()
        .expect("just rescheduled at least one sleeper");
    install_strand(state, handle);
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::Code;
    use crate::config::VmConfig;
    use crate::ctxt::Ctxt;

    #[test]
    fn get_next_strand_reports_no_work_left_on_empty_pool() {
        let mut state = VMState::new(Code::empty(), 0, VmConfig::default());
        assert!(get_next_strand(&mut state));
    }

    #[test]
    fn get_next_strand_installs_front_of_pool() {
        let mut state = VMState::new(Code::empty(), 0, VmConfig::default());
        let mut other = Ctxt::root();
        other.pc = 3;
        let handle = state.arena.alloc(other);
        state.strand_pool.push_back(handle);
        assert!(!get_next_strand(&mut state));
        assert_eq!(state.ctxt, handle);
        assert_eq!(state.pc, 3);
    }

    #[test]
    fn installing_a_strand_with_a_different_monitor_stops_the_old_one_and_starts_the_new_one() {
        use crate::monitor::Monitor;

        let mut state = VMState::new(Code::empty(), 0, VmConfig::default());
        let mut outgoing = Monitor::new(0);
        outgoing.start();
        outgoing.bump_opcode(&crate::opcode::Op::Halt);
        outgoing.set_tracing(true);
        state.current_monitor = std::sync::Arc::new(outgoing);

        let mut other = Ctxt::root();
        other.monitor = std::sync::Arc::new(Monitor::new(1));
        other.pc = 9;
        let handle = state.arena.alloc(other);
        state.strand_pool.push_back(handle);

        assert!(!get_next_strand(&mut state));

        assert_eq!(state.current_monitor.id(), 1);
        assert!(state.current_monitor.is_running());
        assert_eq!(state.bytecodes.get(&crate::opcode::Op::Halt), Some(&1));
        assert!(state.debug);
        assert_eq!(state.arena.get(handle).monitor.id(), 1);
        assert!(state.arena.get(handle).monitor.is_running());
    }

    #[test]
    fn installing_a_strand_with_the_same_monitor_leaves_it_untouched() {
        let mut state = VMState::new(Code::empty(), 0, VmConfig::default());
        let mut other = Ctxt::root();
        other.monitor = state.current_monitor.clone();
        other.pc = 4;
        let handle = state.arena.alloc(other);
        state.strand_pool.push_back(handle);

        assert!(!get_next_strand(&mut state));
        assert!(!state.current_monitor.is_running(), "no lifecycle transition should fire when the monitor is unchanged");
    }

    #[test]
    fn empty_pools_with_outstanding_signals_waits_instead_of_exiting() {
        let mut state = VMState::new(Code::empty(), 0, VmConfig::default());
        state.nsigs = 1;
        assert!(!get_next_strand(&mut state));
        assert!(state.do_async_wait_flag);
    }

    #[test]
    fn sleepers_are_rescheduled_en_masse_before_installing_the_head() {
        let mut state = VMState::new(Code::empty(), 0, VmConfig::default());
        let mut first = Ctxt::root();
        first.pc = 5;
        let first_handle = state.arena.alloc(first);
        let mut second = Ctxt::root();
        second.pc = 7;
        let second_handle = state.arena.alloc(second);
        state.sleeper_pool.push(first_handle);
        state.sleeper_pool.push(second_handle);

        assert!(!get_next_strand(&mut state));
        assert!(state.sleeper_pool.is_empty());
        assert_eq!(state.ctxt, first_handle);
        assert_eq!(state.pc, 5);
        assert_eq!(state.strand_pool.len(), 1);
        assert_eq!(state.strand_pool[0], second_handle);
    }
}
