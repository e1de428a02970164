//! The aggregate VM state (spec §3 `VMState`).
//!
//! Everything the dispatch loop, flag machine, and scheduler mutate lives
//! here. Grounded on the teacher's `BytecodeVM` struct (`vm.rs`), widened
//! per spec §3 with the strand/sleeper pools, control flags, and xmit/rtn
//! scratch the teacher's single-strand VM doesn't need.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use crate::code::Code;
use crate::config::VmConfig;
use crate::ctxt::{Ctxt, CtxtArena, CtxtHandle};
use crate::env::ActorEnvView;
use crate::global_env::GlobalEnv;
use crate::location::{Location, StoreResult};
use crate::monitor::Monitor;
use crate::ob::Ob;
use crate::opcode::Op;
use crate::prim::PrimTable;
use crate::stdoprn::StdOprnRegistry;

/// `xmitData = (unwind: bool, next: bool)` (spec §3 VMState scratch).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct XmitData {
    pub unwind: bool,
    pub next: bool,
}

pub struct VMState {
    pub arena: CtxtArena,
    /// The currently-installed strand.
    pub ctxt: CtxtHandle,
    /// Mirrors `ctxt.code`, refreshed on strand install (spec §4.3
    /// `installCtxt`).
    pub code: Arc<Code>,
    /// Mirrors `ctxt.pc.relative`, refreshed on strand install.
    pub pc: u32,
    pub global_env: GlobalEnv,
    pub current_monitor: Arc<Monitor>,

    /// Ready strands. `Fork` prepends (spec §5: "newly-forked strands are
    /// prepended"); `scheduleStrand` appends.
    pub strand_pool: VecDeque<CtxtHandle>,
    /// Strands parked awaiting a wake (spec §4.3, §5).
    pub sleeper_pool: Vec<CtxtHandle>,

    // --- control flags (spec §3) ---
    pub do_xmit_flag: bool,
    pub do_rtn_flag: bool,
    pub do_next_thread_flag: bool,
    pub vm_error_flag: bool,
    pub exit_flag: bool,
    pub do_async_wait_flag: bool,
    pub debug: bool,

    // --- scratch (spec §3) ---
    pub xmit_data: XmitData,
    pub do_rtn_data: bool,
    pub loc: Location,

    // --- counters (spec §3) ---
    pub bytecodes: HashMap<Op, u64>,
    pub ob_counts: HashMap<String, u64>,
    pub nsigs: u32,
    pub exit_code: i32,

    // --- debug trail (spec §3, §7) ---
    pub debug_info: Vec<String>,

    pub config: VmConfig,
    pub prim_table: PrimTable,
    pub std_oprns: Option<Arc<dyn StdOprnRegistry>>,
    /// Extension point for `XferLexTo*`'s indirect read (spec §4.7).
    pub actor_env: Option<Arc<dyn ActorEnvView>>,
}

impl VMState {
    /// Build a fresh VM with `code` installed as the root strand running
    /// against a `global_env_size`-slot global environment.
    pub fn new(code: Code, global_env_size: usize, config: VmConfig) -> Self {
        let code = Arc::new(code);
        let monitor = Arc::new(Monitor::new(0));
        let mut arena = CtxtArena::new();
        let root = arena.alloc(Ctxt {
            code: code.clone(),
            monitor: monitor.clone(),
            ..Ctxt::root()
        });
        Self {
            arena,
            ctxt: root,
            code,
            pc: 0,
            global_env: GlobalEnv::new(global_env_size),
            current_monitor: monitor,
            strand_pool: VecDeque::new(),
            sleeper_pool: Vec::new(),
            do_xmit_flag: false,
            do_rtn_flag: false,
            do_next_thread_flag: false,
            vm_error_flag: false,
            exit_flag: false,
            do_async_wait_flag: false,
            debug: config.trace,
            xmit_data: XmitData::default(),
            do_rtn_data: false,
            loc: Location::Limbo,
            bytecodes: HashMap::new(),
            ob_counts: HashMap::new(),
            nsigs: 0,
            exit_code: 0,
            debug_info: Vec::new(),
            config,
            prim_table: PrimTable::new(),
            std_oprns: None,
            actor_env: None,
        }
    }

    /// Move the program counter for the currently-installed strand,
    /// keeping `state.pc` (the dispatch loop's fast read) and the ctxt's
    /// own `pc` field (its resume point once it's no longer current) in
    /// sync (spec §4.1 step 2, §4.6 `Jmp`/`JmpCut`/`JmpFalse`/`Outstanding`).
    pub fn set_pc(&mut self, p: u32) {
        self.pc = p;
        let h = self.ctxt;
        self.arena.get_mut(h).pc = p;
    }

    /// Commit a [`StoreResult`] produced by [`Location::store`], routing it
    /// to the right half of state and reporting whether it succeeded.
    pub fn apply_store_result(&mut self, handle: CtxtHandle, result: StoreResult) -> bool {
        match result {
            StoreResult::StoreFail => false,
            StoreResult::StoreCtxt(c) => {
                self.arena.set(handle, c);
                true
            }
            StoreResult::StoreGlobal(g) => {
                self.global_env = g;
                true
            }
        }
    }

    /// `ctxt.rslt` of the currently-installed strand, a frequent read in
    /// handlers (spec §4.6 `JmpFalse`, §8 scenario assertions).
    pub fn rslt(&self) -> &Ob {
        &self.arena.get(self.ctxt).rslt
    }

    pub fn set_rslt(&mut self, ob: Ob) {
        self.arena.get_mut(self.ctxt).rslt = ob;
    }

    pub fn push_debug(&mut self, line: impl Into<String>) {
        if self.debug {
            self.debug_info.push(line.into());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_state_installs_root_strand_at_pc_zero() {
        let state = VMState::new(Code::empty(), 0, VmConfig::default());
        assert_eq!(state.pc, 0);
        assert_eq!(state.code.len(), 0);
    }
}
