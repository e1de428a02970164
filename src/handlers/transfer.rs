//! Lookup & transfer opcode handlers (spec §4.7).

use crate::location::Location;
use crate::ob::{vm_literal, Ob};
use crate::state::VMState;

use super::exception::handle_missing_binding;
use crate::error::RblError;

fn lit_key(lit: &Ob) -> Option<String> {
    match lit {
        Ob::Atom(s) => Some(s.to_string()),
        _ => None,
    }
}

pub fn lookup_to_arg(state: &mut VMState, a: u16, v: u16) {
    if let Some(ob) = resolve_lookup(state, v) {
        state.arena.get_mut(state.ctxt).argvec.set_elem(a as usize, ob);
    }
}

pub fn lookup_to_reg(state: &mut VMState, r: u16, v: u16) {
    if let Some(ob) = resolve_lookup(state, v) {
        let h = state.ctxt;
        match state.arena.get(h).clone().set_reg(r as usize, ob) {
            Some(c) => state.arena.set(h, c),
            None => state.vm_error_flag = true,
        }
    }
}

/// Runs `env.lookupOBO` for `LookupTo*` (spec §4.7), dispatching the
/// `Upcall`/`Absent` outcomes the way the table describes. Returns
/// `Some(ob)` only when the lookup actually produced a value to store.
fn resolve_lookup(state: &mut VMState, v: u16) -> Option<Ob> {
    let lit = state.code.lit(v);
    let key = match lit_key(&lit) {
        Some(k) => k,
        None => {
            handle_missing_binding(state, "<non-atom literal>".to_string());
            state.do_next_thread_flag = true;
            return None;
        }
    };
    let h = state.ctxt;
    let (self_env, env, ctxt_snapshot) = {
        let c = state.arena.get(h);
        (c.self_env.clone(), c.env.clone(), c.clone())
    };
    match env.lookup_obo(&self_env, &key, &ctxt_snapshot) {
        Ok(ob) => Some(ob),
        Err(RblError::Upcall) => {
            state.do_next_thread_flag = true;
            None
        }
        Err(RblError::Absent) => {
            handle_missing_binding(state, key);
            state.do_next_thread_flag = true;
            None
        }
        Err(_) => {
            state.vm_error_flag = true;
            None
        }
    }
}

/// `XferLexTo*(l,i,o,dest)`: walk `l` parents up `env`, then read slot `o`
/// either directly or (when `i`) through the installed [`crate::env::ActorEnvView`]
/// extension point, falling back to a direct read when none is installed.
fn xfer_lex(state: &VMState, l: u32, i: bool, o: u16) -> Ob {
    let h = state.ctxt;
    let env = state.arena.get(h).env.clone();
    let target = match env.ancestor(l) {
        Some(e) => e.clone(),
        None => return Ob::Niv,
    };
    if i {
        if let Some(view) = &state.actor_env {
            if let Some(ob) = view.slot(&target, o) {
                return ob;
            }
        }
    }
    target.slot(o as usize).cloned().unwrap_or(Ob::Niv)
}

pub fn xfer_lex_to_arg(state: &mut VMState, l: u32, i: bool, o: u16, a: u16) {
    let ob = xfer_lex(state, l, i, o);
    state.arena.get_mut(state.ctxt).argvec.set_elem(a as usize, ob);
}

pub fn xfer_lex_to_reg(state: &mut VMState, l: u32, i: bool, o: u16, r: u16) {
    let ob = xfer_lex(state, l, i, o);
    let h = state.ctxt;
    if let Some(c) = state.arena.get(h).clone().set_reg(r as usize, ob) {
        state.arena.set(h, c);
    } else {
        state.vm_error_flag = true;
    }
}

pub fn xfer_global_to_arg(state: &mut VMState, g: u16, a: u16) {
    let ob = state.global_env.entry(g as usize);
    state.arena.get_mut(state.ctxt).argvec.set_elem(a as usize, ob);
}

pub fn xfer_global_to_reg(state: &mut VMState, g: u16, r: u16) {
    let ob = state.global_env.entry(g as usize);
    let h = state.ctxt;
    if let Some(c) = state.arena.get(h).clone().set_reg(r as usize, ob) {
        state.arena.set(h, c);
    } else {
        state.vm_error_flag = true;
    }
}

pub fn xfer_arg_to_arg(state: &mut VMState, s: u16, d: u16) {
    let h = state.ctxt;
    let ob = state.arena.get(h).argvec.elem(s as usize).cloned().unwrap_or(Ob::Niv);
    state.arena.get_mut(h).argvec.set_elem(d as usize, ob);
}

pub fn xfer_rslt_to_arg(state: &mut VMState, a: u16) {
    let ob = state.rslt().clone();
    state.arena.get_mut(state.ctxt).argvec.set_elem(a as usize, ob);
}

pub fn xfer_rslt_to_reg(state: &mut VMState, r: u16) {
    let ob = state.rslt().clone();
    let h = state.ctxt;
    if let Some(c) = state.arena.get(h).clone().set_reg(r as usize, ob) {
        state.arena.set(h, c);
    } else {
        state.vm_error_flag = true;
    }
}

/// `XferRsltToDest`: store `ctxt.rslt` into `ctxt.tag` (spec §4.7).
pub fn xfer_rslt_to_dest(state: &mut VMState) {
    let h = state.ctxt;
    let cur = state.arena.get(h).clone();
    let ob = cur.rslt.clone();
    let result = Location::store(&cur.tag, cur, &state.global_env, ob);
    if !state.apply_store_result(h, result) {
        state.vm_error_flag = true;
    }
}

pub fn xfer_arg_to_rslt(state: &mut VMState, a: u16) {
    let h = state.ctxt;
    let ob = state.arena.get(h).argvec.elem(a as usize).cloned().unwrap_or(Ob::Niv);
    state.set_rslt(ob);
}

pub fn xfer_reg_to_rslt(state: &mut VMState, r: u16) {
    let h = state.ctxt;
    let ob = state.arena.get(h).get_reg(r as usize).cloned().unwrap_or(Ob::Niv);
    state.set_rslt(ob);
}

/// `XferSrcToRslt`: read `ctxt.tag` as a fetch source into `ctxt.rslt`.
pub fn xfer_src_to_rslt(state: &mut VMState) {
    let h = state.ctxt;
    let cur = state.arena.get(h).clone();
    let ob = cur.tag.fetch(&cur, &state.global_env);
    state.set_rslt(ob);
}

pub fn ind_lit_to_arg(state: &mut VMState, v: u16, a: u16) {
    let ob = state.code.lit(v);
    state.arena.get_mut(state.ctxt).argvec.set_elem(a as usize, ob);
}

pub fn ind_lit_to_reg(state: &mut VMState, v: u16, r: u16) {
    let ob = state.code.lit(v);
    let h = state.ctxt;
    if let Some(c) = state.arena.get(h).clone().set_reg(r as usize, ob) {
        state.arena.set(h, c);
    } else {
        state.vm_error_flag = true;
    }
}

pub fn ind_lit_to_rslt(state: &mut VMState, v: u16) {
    let ob = state.code.lit(v);
    state.set_rslt(ob);
}

pub fn immediate_lit_to_arg(state: &mut VMState, v: u16, a: u16) {
    let ob = vm_literal(v);
    state.arena.get_mut(state.ctxt).argvec.set_elem(a as usize, ob);
}

pub fn immediate_lit_to_reg(state: &mut VMState, v: u16, r: u16) {
    let ob = vm_literal(v);
    let h = state.ctxt;
    if let Some(c) = state.arena.get(h).clone().set_reg(r as usize, ob) {
        state.arena.set(h, c);
    } else {
        state.vm_error_flag = true;
    }
}

pub fn immediate_lit_to_rslt(state: &mut VMState, v: u16) {
    state.set_rslt(vm_literal(v));
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
    fn immediate_lit_to_rslt_reads_vm_literals_table() {
        let mut state = fresh();
        immediate_lit_to_rslt(&mut state, 9);
        assert_eq!(state.rslt(), &Ob::Bool(false));
    }

    #[test]
    fn ind_lit_to_rslt_reads_code_literal_pool() {
        let mut state = fresh();
        let mut builder = Code::builder();
        let v = builder.push_lit(Ob::Fixnum(42));
        state.code = std::sync::Arc::new(builder.build());
        ind_lit_to_rslt(&mut state, v);
        assert_eq!(state.rslt(), &Ob::Fixnum(42));
    }

    #[test]
    fn xfer_global_to_arg_reads_global_slot() {
        let mut state = fresh();
        state.global_env = state.global_env.with_entry(1, Ob::Fixnum(5));
        let h = state.ctxt;
        state.arena.get_mut(h).argvec = crate::ob::Tuple::filled(1, Ob::Niv);
        xfer_global_to_arg(&mut state, 1, 0);
        assert_eq!(state.arena.get(h).argvec.elem(0), Some(&Ob::Fixnum(5)));
    }

    #[test]
    fn lookup_to_arg_upcalls_when_self_env_differs() {
        let mut state = fresh();
        let h = state.ctxt;
        let actor_self = crate::env::Env::empty().extend_with(
            &crate::ob::Template::new(vec!["unrelated".into()], false),
            crate::ob::Tuple::new(vec![Ob::Niv]),
        );
        state.arena.get_mut(h).self_env = actor_self;
        state.arena.get_mut(h).argvec = crate::ob::Tuple::filled(1, Ob::Niv);
        let mut builder = Code::builder();
        let v = builder.push_lit(Ob::Atom("missing".into()));
        state.code = std::sync::Arc::new(builder.build());
        lookup_to_arg(&mut state, 0, v);
        assert!(state.do_next_thread_flag);
    }
}
