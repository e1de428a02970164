//! Lexical environments (spec §3 `Env`).
//!
//! The object system's method-resolution internals are an external
//! collaborator (spec §1); this module only implements the lexical-frame
//! chain contract the dispatch loop actually consumes:
//! `parent`/`slot`/`extendWith`/`lookupOBO`. Grounded on the Arc-chained
//! frame style used throughout the teacher's `backend/environment/*`
//! modules, with the MORK-backed storage dropped (per DESIGN.md).

use std::sync::Arc;

use crate::ctxt::Ctxt;
use crate::error::RblError;
use crate::ob::{Ob, Template, Tuple};

#[derive(Debug)]
struct Frame {
    parent: Option<Env>,
    keys: Vec<String>,
    slots: Vec<Ob>,
}

/// A lexical-frame chain. Frames are immutable once built and shared via
/// `Arc`, matching the spec's Non-goal of externally-managed, value-like
/// references rather than a GC'd heap.
#[derive(Debug, Clone)]
pub struct Env(Arc<Frame>);

impl PartialEq for Env {
    /// Frame identity, not structural slot equality: two independently
    /// built frames with identical contents are still different lexical
    /// scopes.
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Env {
    /// The empty top-level frame (no parent, no bindings).
    pub fn empty() -> Self {
        Env(Arc::new(Frame { parent: None, keys: Vec::new(), slots: Vec::new() }))
    }

    pub fn parent(&self) -> Option<&Env> {
        self.0.parent.as_ref()
    }

    /// Slot accessor within this frame only (spec §3 `Env.slot(i)`).
    pub fn slot(&self, i: usize) -> Option<&Ob> {
        self.0.slots.get(i)
    }

    /// Walk `levels` parents up the chain.
    pub fn ancestor(&self, levels: u32) -> Option<&Env> {
        let mut cur = self;
        for _ in 0..levels {
            cur = cur.parent()?;
        }
        Some(cur)
    }

    /// Build a new child frame binding `template`'s keys against `actuals`
    /// (spec §3 `Env.extendWith`).
    pub fn extend_with(&self, template: &Template, actuals: Tuple) -> Env {
        let keys = if template.has_rest() {
            let mut k = template.keymeta().to_vec();
            k.push("&rest".to_string());
            k
        } else {
            template.keymeta().to_vec()
        };
        Env(Arc::new(Frame {
            parent: Some(self.clone()),
            keys,
            slots: actuals.as_slice().to_vec(),
        }))
    }

    /// Own-frame-by-one-bound-occurrence-of-`key` lookup, walking the
    /// parent chain (spec §3 `Env.lookupOBO`).
    ///
    /// `self_env` is the actor's self-binding environment, consulted by
    /// the object system for method resolution; since that resolution
    /// contract is external (spec §1), this implementation only performs
    /// the lexical-frame search and reports `Upcall` when `self_env` is
    /// distinct from `self` (signaling that resolution must continue in
    /// the object system) rather than attempting it itself.
    pub fn lookup_obo(&self, self_env: &Env, key: &str, _ctxt: &Ctxt) -> Result<Ob, RblError> {
        let mut cur = self;
        loop {
            if let Some(idx) = cur.0.keys.iter().position(|k| k == key) {
                return Ok(cur.0.slots[idx].clone());
            }
            match cur.parent() {
                Some(p) => cur = p,
                None => break,
            }
        }
        if self_env != self {
            Err(RblError::Upcall)
        } else {
            Err(RblError::Absent)
        }
    }
}

impl Default for Env {
    fn default() -> Self {
        Env::empty()
    }
}

/// Extension point for `XferLexTo*`'s `i` ("indirect") flag (spec §4.7):
/// when set, the slot is read through "an actor-extension view" of the
/// walked-to environment. That view is the object system's to define
/// (spec §1 Non-goals), so by default (no view installed) the indirect
/// and direct reads coincide; a host may install one to layer its own
/// method-resolution semantics on top of the lexical frame.
pub trait ActorEnvView: std::fmt::Debug {
    fn slot(&self, env: &Env, o: u16) -> Option<Ob>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extend_then_lookup_finds_bound_key() {
        let root = Env::empty();
        let t = Template::new(vec!["x".into()], false);
        let child = root.extend_with(&t, Tuple::new(vec![Ob::Fixnum(42)]));
        let found = child.lookup_obo(&child, "x", &Ctxt::root()).unwrap();
        assert_eq!(found, Ob::Fixnum(42));
    }

    #[test]
    fn lookup_walks_parent_chain() {
        let root = Env::empty();
        let t = Template::new(vec!["x".into()], false);
        let parent = root.extend_with(&t, Tuple::new(vec![Ob::Fixnum(1)]));
        let child = parent.extend_with(&Template::new(vec!["y".into()], false), Tuple::new(vec![Ob::Fixnum(2)]));
        assert_eq!(child.lookup_obo(&child, "x", &Ctxt::root()), Ok(Ob::Fixnum(1)));
    }

    #[test]
    fn lookup_absent_when_self_env_matches_and_key_missing() {
        let root = Env::empty();
        assert_eq!(root.lookup_obo(&root, "missing", &Ctxt::root()), Err(RblError::Absent));
    }

    #[test]
    fn lookup_upcall_when_self_env_differs_and_key_missing() {
        let root = Env::empty();
        let actor_self = Env::empty();
        assert_eq!(root.lookup_obo(&actor_self, "missing", &Ctxt::root()), Err(RblError::Upcall));
    }
}
