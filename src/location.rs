//! Location algebra (spec §3 `Location`): addresses within a machine.
//!
//! Four variants per spec §3: `ArgReg`, `CtxtReg`, `LocationAtom`,
//! `LIMBO`. `LocationAtom` is the spec's catch-all "tag/atom literal"
//! address — per spec §4.4/§4.6 it is the destination opcodes pass to
//! `store` for both tag-form primitive application and `UpcallRtn`, and
//! its `StoreResult` can be either `StoreCtxt` or `StoreGlobal`. We
//! resolve that ambiguity (no Open Question left unresolved, per the
//! transformation rules) as: a `Fixnum` literal addresses a global-env
//! slot by index (consistent with the `g` operand convention, spec §6);
//! any other literal addresses the current context's result register.
//! This is recorded in DESIGN.md.

use crate::ctxt::Ctxt;
use crate::global_env::GlobalEnv;
use crate::ob::Ob;

#[derive(Debug, Clone, PartialEq)]
pub enum Location {
    /// An argument register: `ctxt.argvec[n]`.
    ArgReg(u16),
    /// A context register: `ctxt.regs[n]`.
    CtxtReg(u16),
    /// A literal/atom address (spec §3); see module doc for resolution.
    LocationAtom(Box<Ob>),
    /// The "nowhere" location: fetch yields `Niv`, store is a no-op.
    Limbo,
}

/// Outcome of [`Location::store`] (spec §3 `StoreResult`).
pub enum StoreResult {
    StoreFail,
    StoreCtxt(Ctxt),
    StoreGlobal(GlobalEnv),
}

impl Location {
    pub fn fetch(&self, ctxt: &Ctxt, _global_env: &GlobalEnv) -> Ob {
        match self {
            Location::ArgReg(n) => ctxt.argvec.elem(*n as usize).cloned().unwrap_or(Ob::Niv),
            Location::CtxtReg(n) => ctxt.get_reg(*n as usize).cloned().unwrap_or(Ob::Niv),
            Location::LocationAtom(lit) => (**lit).clone(),
            Location::Limbo => Ob::Niv,
        }
    }

    /// `store(loc, ctxt, globalEnv, ob) -> StoreResult` (spec §3).
    ///
    /// Takes `ctxt` by value and returns the mutated copy on success,
    /// matching `Ctxt::set_reg`'s own by-value style.
    pub fn store(&self, ctxt: Ctxt, global_env: &GlobalEnv, ob: Ob) -> StoreResult {
        match self {
            Location::ArgReg(n) => {
                let mut ctxt = ctxt;
                if ctxt.argvec.set_elem(*n as usize, ob) {
                    StoreResult::StoreCtxt(ctxt)
                } else {
                    StoreResult::StoreFail
                }
            }
            Location::CtxtReg(n) => match ctxt.set_reg(*n as usize, ob) {
                Some(ctxt) => StoreResult::StoreCtxt(ctxt),
                None => StoreResult::StoreFail,
            },
            Location::LocationAtom(lit) => match **lit {
                Ob::Fixnum(idx) if idx >= 0 => {
                    StoreResult::StoreGlobal(global_env.with_entry(idx as usize, ob))
                }
                _ => {
                    let mut ctxt = ctxt;
                    ctxt.rslt = ob;
                    StoreResult::StoreCtxt(ctxt)
                }
            },
            Location::Limbo => StoreResult::StoreCtxt(ctxt),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::Monitor;
    use std::sync::Arc;

    fn fresh_ctxt() -> Ctxt {
        Ctxt::root()
    }

    #[test]
    fn arg_reg_store_out_of_bounds_fails() {
        let ctxt = fresh_ctxt();
        let g = GlobalEnv::new(0);
        match Location::ArgReg(0).store(ctxt, &g, Ob::Fixnum(1)) {
            StoreResult::StoreFail => {}
            _ => panic!("expected StoreFail"),
        }
    }

    #[test]
    fn location_atom_fixnum_targets_global() {
        let ctxt = fresh_ctxt();
        let g = GlobalEnv::new(1);
        match Location::LocationAtom(Box::new(Ob::Fixnum(3))).store(ctxt, &g, Ob::Bool(true)) {
            StoreResult::StoreGlobal(new_g) => assert_eq!(new_g.entry(3), Ob::Bool(true)),
            _ => panic!("expected StoreGlobal"),
        }
    }

    #[test]
    fn location_atom_non_fixnum_targets_ctxt_rslt() {
        let ctxt = fresh_ctxt();
        let g = GlobalEnv::new(0);
        match Location::LocationAtom(Box::new(Ob::Bool(true))).store(ctxt, &g, Ob::Fixnum(9)) {
            StoreResult::StoreCtxt(c) => assert_eq!(c.rslt, Ob::Fixnum(9)),
            _ => panic!("expected StoreCtxt"),
        }
    }

    #[test]
    fn limbo_fetch_is_niv_and_store_is_noop() {
        let ctxt = fresh_ctxt();
        let g = GlobalEnv::new(0);
        assert_eq!(Location::Limbo.fetch(&ctxt, &g), Ob::Niv);
        let _ = Arc::new(Monitor::new(0));
        match Location::Limbo.store(ctxt, &g, Ob::Fixnum(1)) {
            StoreResult::StoreCtxt(c) => assert_eq!(c.rslt, Ob::Niv),
            _ => panic!("expected StoreCtxt"),
        }
    }
}
