//! The tagged object universe (`Ob`), spec §3.
//!
//! Grounded on `models/metta_value.rs::MettaValue`: a plain `#[derive(Debug,
//! Clone, PartialEq)]` enum with predicate methods, no interior mutability,
//! no GC (objects are ordinary Rust values; `Env`/`StdOprn`/`Actor` share
//! structure via `Arc`, per spec §1's Non-goals).

use std::sync::Arc;

use crate::env::Env;

/// Capability tag returned by [`Ob::otype`], mirroring the source's
/// `OTsysval`-style predicate family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OType {
    Fixnum,
    Bool,
    Tuple,
    Template,
    Env,
    StdOprn,
    Actor,
    SysVal,
    Niv,
    Absent,
    Atom,
    User,
}

/// System-value codes (spec §3 `SysCode`).
///
/// Distinguishes primitive-dispatch error/continuation signals from
/// ordinary return values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SysCode {
    Upcall,
    Suspend,
    Interrupt,
    Sleep,
    Invalid,
    DeadThread,
}

/// A binding pattern: which keys a `Tuple` of actuals binds to, and how
/// an `&rest` tail is handled.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    /// Bound parameter names, in order.
    keys: Vec<String>,
    /// Whether this template accepts a trailing `&rest` tuple.
    has_rest: bool,
}

impl Template {
    pub fn new(keys: Vec<String>, has_rest: bool) -> Self {
        Self { keys, has_rest }
    }

    /// The key set this template binds (spec §3 `keymeta`).
    pub fn keymeta(&self) -> &[String] {
        &self.keys
    }

    pub fn has_rest(&self) -> bool {
        self.has_rest
    }

    /// Attempt to bind `argvec[..nargs]` against this template.
    ///
    /// Returns `Some(Tuple)` of bound actuals (fixed keys followed by, if
    /// `has_rest`, the flattened remainder as a single trailing tuple slot)
    /// or `None` on arity mismatch.
    pub fn match_pattern(&self, argvec: &Tuple, nargs: u16) -> Option<Tuple> {
        let nargs = nargs as usize;
        let fixed = self.keys.len();
        if self.has_rest {
            if nargs < fixed {
                return None;
            }
            let mut actuals: Vec<Ob> = argvec.elems[..fixed].to_vec();
            let rest: Vec<Ob> = argvec.elems[fixed..nargs].to_vec();
            actuals.push(Ob::Tuple(Tuple::new(rest)));
            Some(Tuple::new(actuals))
        } else {
            if nargs != fixed {
                return None;
            }
            Some(Tuple::new(argvec.elems[..fixed].to_vec()))
        }
    }
}

/// Outcome of [`Tuple::flatten_rest`] (spec §3).
#[derive(Debug, Clone, PartialEq)]
pub enum FlattenResult {
    Flattened(Tuple),
    AbsentRest,
    InvalidRest,
}

/// Ordered sequence of `Ob` (spec §3 Tuple).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Tuple {
    elems: Vec<Ob>,
}

impl Tuple {
    pub const NIL: Tuple = Tuple { elems: Vec::new() };

    pub fn new(elems: Vec<Ob>) -> Self {
        Self { elems }
    }

    /// A tuple of `n` copies of `Niv` (spec §4.6 `Alloc(n)`).
    pub fn filled(n: u16, value: Ob) -> Self {
        Self { elems: vec![value; n as usize] }
    }

    pub fn len(&self) -> usize {
        self.elems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elems.is_empty()
    }

    pub fn elem(&self, i: usize) -> Option<&Ob> {
        self.elems.get(i)
    }

    pub fn set_elem(&mut self, i: usize, ob: Ob) -> bool {
        match self.elems.get_mut(i) {
            Some(slot) => {
                *slot = ob;
                true
            }
            None => false,
        }
    }

    pub fn as_slice(&self) -> &[Ob] {
        &self.elems
    }

    /// Flatten the conventional "last slot holds an `&rest` tuple" shape
    /// that the compiler sets up for `unwindAndApplyPrim` (spec §4.4).
    ///
    /// - If the tuple is empty, there's no rest slot to flatten:
    ///   `AbsentRest`.
    /// - If the last element is a `Tuple`, splice its elements in place of
    ///   the slot: `Flattened`.
    /// - If the last element is present but not a `Tuple`, the `&rest`
    ///   value is malformed: `InvalidRest`.
    pub fn flatten_rest(&self) -> FlattenResult {
        match self.elems.last() {
            None => FlattenResult::AbsentRest,
            Some(Ob::Tuple(rest)) => {
                let mut flat = self.elems[..self.elems.len() - 1].to_vec();
                flat.extend(rest.elems.iter().cloned());
                FlattenResult::Flattened(Tuple::new(flat))
            }
            Some(_) => FlattenResult::InvalidRest,
        }
    }
}

/// The discriminated value universe (spec §3 `Ob`).
#[derive(Debug, Clone, PartialEq)]
pub enum Ob {
    Fixnum(i64),
    Bool(bool),
    Tuple(Tuple),
    Template(Arc<Template>),
    Env(Env),
    StdOprn(Arc<str>),
    Actor(Arc<str>),
    SysVal(SysCode),
    /// No-value marker.
    Niv,
    /// Missing-binding marker.
    Absent,
    /// A symbolic literal: lookup keys (`LookupToArg`/`LookupToReg`) and
    /// `LocationAtom` tags are interned as this, distinct from `StdOprn`
    /// and `Actor` which name dispatch targets rather than bindings.
    Atom(Arc<str>),
    /// User-defined opaque payload, keyed by a type tag so equality and
    /// dispatch can still discriminate between distinct user types without
    /// this crate knowing their shapes (the object system is external,
    /// spec §1).
    User { tag: Arc<str>, payload: Arc<[Ob]> },
}

/// The fixed immediate-literal table addressed by `ImmediateLitTo*`'s `v`
/// operand (spec §4.7, §8 scenarios 3/4): eight small fixnums, then
/// `RBLTRUE`, `RBLFALSE`, `NIL`, `NIV`, in that order.
pub const VM_LITERALS: [Ob; 12] = [
    Ob::Fixnum(0),
    Ob::Fixnum(1),
    Ob::Fixnum(2),
    Ob::Fixnum(3),
    Ob::Fixnum(4),
    Ob::Fixnum(5),
    Ob::Fixnum(6),
    Ob::Fixnum(7),
    Ob::Bool(true),
    Ob::Bool(false),
    Ob::Tuple(Tuple::NIL),
    Ob::Niv,
];

/// `vmLiterals[v]`, clamped to `Niv` out of range (spec §4.7).
pub fn vm_literal(v: u16) -> Ob {
    VM_LITERALS.get(v as usize).cloned().unwrap_or(Ob::Niv)
}

impl Ob {
    /// Capability tag, mirroring the source's `isSysVal`-style predicates.
    pub fn otype(&self) -> OType {
        match self {
            Ob::Fixnum(_) => OType::Fixnum,
            Ob::Bool(_) => OType::Bool,
            Ob::Tuple(_) => OType::Tuple,
            Ob::Template(_) => OType::Template,
            Ob::Env(_) => OType::Env,
            Ob::StdOprn(_) => OType::StdOprn,
            Ob::Actor(_) => OType::Actor,
            Ob::SysVal(_) => OType::SysVal,
            Ob::Niv => OType::Niv,
            Ob::Absent => OType::Absent,
            Ob::Atom(_) => OType::Atom,
            Ob::User { .. } => OType::User,
        }
    }

    pub fn is_sysval(&self) -> bool {
        matches!(self, Ob::SysVal(_))
    }

    /// The `sysval` code carried by a `SysVal`, if any.
    pub fn sysval(&self) -> Option<SysCode> {
        match self {
            Ob::SysVal(code) => Some(*code),
            _ => None,
        }
    }

    /// Slot accessor for composite objects (spec §3 `Ob.slot(i)`).
    pub fn slot(&self, i: usize) -> Option<&Ob> {
        match self {
            Ob::Tuple(t) => t.elem(i),
            Ob::User { payload, .. } => payload.get(i),
            _ => None,
        }
    }

    pub fn is_false(&self) -> bool {
        matches!(self, Ob::Bool(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_fixed_arity_mismatch_is_none() {
        let t = Template::new(vec!["x".into(), "y".into()], false);
        let argvec = Tuple::new(vec![Ob::Fixnum(1)]);
        assert_eq!(t.match_pattern(&argvec, 1), None);
    }

    #[test]
    fn template_rest_binds_tail_as_tuple() {
        let t = Template::new(vec!["x".into()], true);
        let argvec = Tuple::new(vec![Ob::Fixnum(1), Ob::Fixnum(2), Ob::Fixnum(3)]);
        let bound = t.match_pattern(&argvec, 3).unwrap();
        assert_eq!(bound.elem(0), Some(&Ob::Fixnum(1)));
        assert_eq!(bound.elem(1), Some(&Ob::Tuple(Tuple::new(vec![Ob::Fixnum(2), Ob::Fixnum(3)]))));
    }

    #[test]
    fn flatten_rest_absent_on_empty_tuple() {
        assert_eq!(Tuple::NIL.flatten_rest(), FlattenResult::AbsentRest);
    }

    #[test]
    fn flatten_rest_invalid_when_last_not_tuple() {
        let t = Tuple::new(vec![Ob::Fixnum(1), Ob::Fixnum(2)]);
        assert_eq!(t.flatten_rest(), FlattenResult::InvalidRest);
    }

    #[test]
    fn vm_literal_table_matches_spec_ordering() {
        assert_eq!(vm_literal(0), Ob::Fixnum(0));
        assert_eq!(vm_literal(8), Ob::Bool(true));
        assert_eq!(vm_literal(9), Ob::Bool(false));
        assert_eq!(vm_literal(10), Ob::Tuple(Tuple::NIL));
        assert_eq!(vm_literal(11), Ob::Niv);
        assert_eq!(vm_literal(99), Ob::Niv);
    }

    #[test]
    fn flatten_rest_splices_trailing_tuple() {
        let t = Tuple::new(vec![Ob::Fixnum(1), Ob::Tuple(Tuple::new(vec![Ob::Fixnum(2), Ob::Fixnum(3)]))]);
        let FlattenResult::Flattened(flat) = t.flatten_rest() else { panic!("expected Flattened") };
        assert_eq!(flat.as_slice(), &[Ob::Fixnum(1), Ob::Fixnum(2), Ob::Fixnum(3)]);
    }
}
