//! Per-strand instrumentation (spec §2.6 `Monitor`): opcode-count map,
//! object-count map, tracing flag, start/stop lifecycle.
//!
//! Grounded on the teacher's counting idiom (`bytecodes: map<Op,u64>` is
//! lifted straight from spec §3's `VMState`, mirroring how the teacher
//! tracks per-opcode dispatch counts); here it lives per-`Monitor` so it
//! can be swapped wholesale on strand switch (spec §4.3 `installMonitor`).

use std::collections::HashMap;

use crate::opcode::Op;

/// Discriminates monitors on strand switch (spec invariant 4: `currentMonitor`
/// equals `ctxt.monitor` for the installed ctxt).
pub type MonitorId = u64;

#[derive(Debug, Clone)]
pub struct Monitor {
    id: MonitorId,
    opcode_counts: HashMap<Op, u64>,
    obj_counts: HashMap<String, u64>,
    tracing: bool,
    running: bool,
}

impl Monitor {
    pub fn new(id: MonitorId) -> Self {
        Self {
            id,
            opcode_counts: HashMap::new(),
            obj_counts: HashMap::new(),
            tracing: false,
            running: false,
        }
    }

    pub fn id(&self) -> MonitorId {
        self.id
    }

    pub fn tracing(&self) -> bool {
        self.tracing
    }

    pub fn set_tracing(&mut self, tracing: bool) {
        self.tracing = tracing;
    }

    pub fn opcode_counts(&self) -> &HashMap<Op, u64> {
        &self.opcode_counts
    }

    pub fn obj_counts(&self) -> &HashMap<String, u64> {
        &self.obj_counts
    }

    pub fn bump_opcode(&mut self, op: &Op) {
        *self.opcode_counts.entry(op.clone()).or_insert(0) += 1;
    }

    pub fn bump_obj(&mut self, kind: &str) {
        *self.obj_counts.entry(kind.to_string()).or_insert(0) += 1;
    }

    pub fn start(&mut self) {
        self.running = true;
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_stop_lifecycle() {
        let mut m = Monitor::new(1);
        assert!(!m.is_running());
        m.start();
        assert!(m.is_running());
        m.stop();
        assert!(!m.is_running());
    }

    #[test]
    fn bump_opcode_counts() {
        let mut m = Monitor::new(1);
        m.bump_opcode(&Op::Halt);
        m.bump_opcode(&Op::Halt);
        assert_eq!(m.opcode_counts().get(&Op::Halt), Some(&2));
    }
}
