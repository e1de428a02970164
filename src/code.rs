//! The read-only `Code` object (spec §2.4, §6): opcode sequence + literal
//! pool, indexed by opcode operands.
//!
//! Grounded on `chunk.rs::BytecodeChunk`/`ChunkBuilder` — a builder that
//! accumulates instructions and constants, then freezes into an immutable,
//! `Arc`-shareable value — trimmed of the teacher's jump-table/line-info/
//! disassembly metadata, which belong to the compiler and debugger that
//! spec §1 places out of scope. Per SPEC_FULL.md §B.1, this crate builds
//! no surface-language compiler; `CodeBuilder` exists only so the VM's own
//! tests and demonstration binary can assemble `Code` values directly.

use crate::ob::Ob;
use crate::opcode::Op;

/// A compiled, read-only instruction sequence with its literal pool.
#[derive(Debug, Clone, Default)]
pub struct Code {
    ops: Vec<Op>,
    lits: Vec<Ob>,
}

impl Code {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn builder() -> CodeBuilder {
        CodeBuilder::new()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// `code.ops[pc]` (spec §4.1 step 1).
    pub fn op(&self, pc: usize) -> Option<&Op> {
        self.ops.get(pc)
    }

    /// `code.lit(v)` (spec §4.6 `Extend`, §4.7 `IndLitTo*`).
    pub fn lit(&self, v: u16) -> Ob {
        self.lits.get(v as usize).cloned().unwrap_or(Ob::Niv)
    }
}

/// Assembles a [`Code`] value one instruction/literal at a time.
#[derive(Debug, Default)]
pub struct CodeBuilder {
    ops: Vec<Op>,
    lits: Vec<Ob>,
}

impl CodeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn op(mut self, op: Op) -> Self {
        self.ops.push(op);
        self
    }

    /// Interns `ob` into the literal pool and returns its index, for
    /// building operands like `Extend { v }` inline.
    pub fn push_lit(&mut self, ob: Ob) -> u16 {
        self.lits.push(ob);
        (self.lits.len() - 1) as u16
    }

    pub fn build(self) -> Code {
        Code { ops: self.ops, lits: self.lits }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn op_out_of_bounds_is_none() {
        let code = Code::empty();
        assert!(code.op(0).is_none());
    }

    #[test]
    fn lit_out_of_bounds_is_niv() {
        let code = Code::builder().build();
        assert_eq!(code.lit(0), Ob::Niv);
    }

    #[test]
    fn builder_round_trips_ops_and_lits() {
        let mut b = Code::builder();
        let v = b.push_lit(Ob::Fixnum(42));
        let code = b.op(Op::IndLitToRslt { v }).op(Op::Halt).build();
        assert_eq!(code.len(), 2);
        assert_eq!(code.lit(v), Ob::Fixnum(42));
        assert_eq!(code.op(0), Some(&Op::IndLitToRslt { v }));
    }
}
