//! First-class environments.
//!
//! An environment holds an unordered symbol-to-value binding store (an
//! association list, or a hash table for the ground environment and its
//! standard children), an ordered set of parents forming a DAG, and the
//! keyed-variable fields: a precomputed closure of keyed ancestors and
//! an optional `(key . value)` node that makes the frame keyed.
//!
//! Lookup is depth-first left-to-right over the parent DAG with no
//! revisit suppression: a shared ancestor's bindings are identical on
//! every path, so re-traversal is correct (if quadratic for wide DAGs).
//! The walk runs on the explicit work stack, not the host stack.
//!
//! Symbols are not interned, so bindings compare by symbol name.

use vau_core::Value;

use crate::error::{Result, unbound_keyed, unbound_symbol};
use crate::heap::EnvData;
use crate::state::State;

/// Create an environment. `parents` is `Nil` (or the empty-environment
/// marker), a single environment, or a finite list of environments; the
/// caller has already validated the shape.
///
/// The keyed-parents closure is assembled here, once: a keyed parent
/// contributes itself, an unkeyed one contributes its own closure. A
/// single-element closure collapses to the environment itself.
pub fn make_environment(st: &mut State, parents: Value) -> Value {
    let parents = if parents.is_nil() { Value::EmptyEnv } else { parents };

    let keyed_parents = if parents == Value::EmptyEnv {
        Value::EmptyEnv
    } else if st.heap.is_environment(parents) {
        if is_keyed(st, parents) {
            parents
        } else {
            st.heap.env(parents).keyed_parents
        }
    } else {
        // list of parents: append each one's contribution
        st.push_root(parents);
        let dummy = st.cons(Value::Nil, Value::Nil);
        st.push_root(dummy);
        let mut tail = dummy;
        let mut ps = parents;
        while !ps.is_nil() {
            let parent = st.heap.car(ps);
            let mut contribution = if is_keyed(st, parent) {
                parent
            } else {
                st.heap.env(parent).keyed_parents
            };
            loop {
                let next;
                if contribution == Value::EmptyEnv || contribution.is_nil() {
                    break;
                } else if st.heap.is_environment(contribution) {
                    next = contribution;
                    contribution = Value::EmptyEnv;
                } else {
                    next = st.heap.car(contribution);
                    contribution = st.heap.cdr(contribution);
                }
                let new_pair = st.cons(next, Value::Nil);
                st.heap.set_cdr(tail, new_pair);
                tail = new_pair;
            }
            ps = st.heap.cdr(ps);
        }
        let mut kparents = st.heap.cdr(dummy);
        st.roots.discard(2);
        // a one-element closure collapses to the environment itself
        if st.heap.is_pair(kparents) && st.heap.cdr(kparents).is_nil() {
            kparents = st.heap.car(kparents);
        }
        if kparents.is_nil() {
            Value::EmptyEnv
        } else {
            kparents
        }
    };

    st.alloc_env(EnvData {
        parents,
        bindings: Value::Nil,
        table: None,
        keyed_parents,
        keyed_node: Value::Nil,
    })
}

/// Create an environment whose bindings live in a hash table, as the
/// ground environment's standard children do.
pub fn make_table_environment(st: &mut State, parent: Value) -> Value {
    let env = make_environment(st, parent);
    st.heap.env_mut(env).table = Some(std::collections::HashMap::new());
    env
}

fn is_keyed(st: &State, env: Value) -> bool {
    !st.heap.env(env).keyed_node.is_nil()
}

/// The local binding pair for `sym`, if any (alist environments).
fn find_local_binding(st: &State, env: Value, name: &str) -> Option<Value> {
    let mut bindings = st.heap.env(env).bindings;
    while !bindings.is_nil() {
        let first = st.heap.car(bindings);
        let first_sym = st.heap.car(first);
        if st.heap.sym_str(first_sym) == name {
            return Some(first);
        }
        bindings = st.heap.cdr(bindings);
    }
    None
}

/// Bind `sym` to `val` in `env`, rebinding in place if already local.
pub fn add_binding(st: &mut State, env: Value, sym: Value, val: Value) {
    let name = st.heap.sym_str(sym).to_string();
    if st.heap.env(env).table.is_some() {
        st.heap
            .env_mut(env)
            .table
            .as_mut()
            .expect("table environment")
            .insert(name, val);
        return;
    }
    match find_local_binding(st, env, &name) {
        Some(pair) => st.heap.set_cdr(pair, val),
        None => {
            let new_pair = st.cons(sym, val);
            let bindings = st.heap.env(env).bindings;
            let new_bindings = st.cons(new_pair, bindings);
            st.heap.env_mut(env).bindings = new_bindings;
        }
    }
}

/// The value locally bound to `name` in `env`, if any.
fn local_value(st: &State, env: Value, name: &str) -> Option<Value> {
    match &st.heap.env(env).table {
        Some(table) => table.get(name).copied(),
        None => find_local_binding(st, env, name).map(|pair| st.heap.cdr(pair)),
    }
}

/// Depth-first left-to-right lookup over the parent DAG.
fn try_get_binding(st: &mut State, env: Value, sym: Value) -> Option<Value> {
    let name = st.heap.sym_str(sym).to_string();
    let saved = st.wstack.len();
    st.wstack.push(env);

    while st.wstack.len() > saved {
        let obj = st.wstack.pop().expect("work stack non-empty");
        if obj.is_nil() || obj == Value::EmptyEnv {
            continue;
        } else if st.heap.is_environment(obj) {
            if let Some(value) = local_value(st, obj, &name) {
                // leave the stack as it was
                st.wstack.truncate(saved);
                return Some(value);
            }
            st.wstack.push(st.heap.env(obj).parents);
        } else {
            // parent list: left-to-right means the car goes on top
            st.wstack.push(st.heap.cdr(obj));
            st.wstack.push(st.heap.car(obj));
        }
    }
    None
}

pub fn get_binding(st: &mut State, env: Value, sym: Value) -> Result<Value> {
    match try_get_binding(st, env, sym) {
        Some(value) => Ok(value),
        None => Err(unbound_symbol(st.heap.sym_str(sym))),
    }
}

pub fn binds(st: &mut State, env: Value, sym: Value) -> bool {
    try_get_binding(st, env, sym).is_some()
}

// ---- keyed static variables --------------------------------------------

/// Create a keyed frame: a fresh child of `parent` whose keyed node is
/// `(key . val)`.
pub fn make_keyed_static_env(st: &mut State, parent: Value, key: Value, val: Value) -> Value {
    st.push_root(key);
    st.push_root(val);
    let env = make_environment(st, parent);
    st.push_root(env);
    let node = st.cons(key, val);
    st.heap.env_mut(env).keyed_node = node;
    st.roots.discard(3);
    env
}

/// The keyed-variable walk: same DAG discipline as binding lookup, but
/// restricted to the keyed-parents closures, so unkeyed frames are
/// never visited.
fn try_get_keyed(st: &mut State, env: Value, key: Value) -> Option<Value> {
    let saved = st.wstack.len();
    if is_keyed(st, env) {
        st.wstack.push(env);
    } else {
        st.wstack.push(st.heap.env(env).keyed_parents);
    }

    while st.wstack.len() > saved {
        let obj = st.wstack.pop().expect("work stack non-empty");
        if obj.is_nil() || obj == Value::EmptyEnv {
            continue;
        } else if st.heap.is_environment(obj) {
            // every entry here is a keyed frame
            let node = st.heap.env(obj).keyed_node;
            if crate::equal::eq(st.heap.car(node), key) {
                st.wstack.truncate(saved);
                return Some(st.heap.cdr(node));
            }
            st.wstack.push(st.heap.env(obj).keyed_parents);
        } else {
            st.wstack.push(st.heap.cdr(obj));
            st.wstack.push(st.heap.car(obj));
        }
    }
    None
}

pub fn get_keyed_static_var(st: &mut State, env: Value, key: Value) -> Result<Value> {
    match try_get_keyed(st, env, key) {
        Some(value) => Ok(value),
        None => Err(unbound_keyed("keyed-static-get")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_with(st: &mut State, parents: Value, bindings: &[(&str, Value)]) -> Value {
        let env = make_environment(st, parents);
        for (name, val) in bindings {
            let sym = st.symbol(name);
            add_binding(st, env, sym, *val);
        }
        env
    }

    #[test]
    fn add_then_get() {
        let mut st = State::new();
        let env = env_with(&mut st, Value::Nil, &[("x", Value::Fixint(1))]);
        let sym = st.symbol("x");
        assert_eq!(get_binding(&mut st, env, sym).unwrap(), Value::Fixint(1));
    }

    #[test]
    fn rebind_replaces_in_place() {
        let mut st = State::new();
        let env = env_with(&mut st, Value::Nil, &[("x", Value::Fixint(1))]);
        let sym = st.symbol("x");
        add_binding(&mut st, env, sym, Value::Fixint(2));
        assert_eq!(get_binding(&mut st, env, sym).unwrap(), Value::Fixint(2));
        // still a single local binding
        let bindings = st.heap.env(env).bindings;
        assert!(st.heap.cdr(bindings).is_nil());
    }

    #[test]
    fn local_shadows_inherited() {
        let mut st = State::new();
        let parent = env_with(&mut st, Value::Nil, &[("x", Value::Fixint(1))]);
        let child = env_with(&mut st, parent, &[("x", Value::Fixint(2))]);
        let sym = st.symbol("x");
        assert_eq!(get_binding(&mut st, child, sym).unwrap(), Value::Fixint(2));
    }

    #[test]
    fn lookup_is_depth_first_left_to_right() {
        let mut st = State::new();
        let grandparent = env_with(&mut st, Value::Nil, &[("x", Value::Fixint(1))]);
        let left = env_with(&mut st, grandparent, &[]);
        let right = env_with(&mut st, Value::Nil, &[("x", Value::Fixint(3))]);
        let parents = st.list2(left, right);
        let env = make_environment(&mut st, parents);
        let sym = st.symbol("x");
        // depth-first through `left` reaches the grandparent before
        // `right` is ever considered
        assert_eq!(get_binding(&mut st, env, sym).unwrap(), Value::Fixint(1));
    }

    #[test]
    fn shared_ancestors_are_tolerated() {
        let mut st = State::new();
        let shared = env_with(&mut st, Value::Nil, &[("y", Value::Fixint(7))]);
        let a = env_with(&mut st, shared, &[]);
        let b = env_with(&mut st, shared, &[]);
        let parents = st.list2(a, b);
        let env = make_environment(&mut st, parents);
        let sym = st.symbol("y");
        assert_eq!(get_binding(&mut st, env, sym).unwrap(), Value::Fixint(7));
    }

    #[test]
    fn unbound_symbol_is_recoverable() {
        let mut st = State::new();
        let env = make_environment(&mut st, Value::Nil);
        let sym = st.symbol("nope");
        let err = get_binding(&mut st, env, sym).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::UnboundSymbol);
        assert!(err.can_continue);
        // the work stack is back to its pre-call depth
        assert!(st.wstack.is_empty());
    }

    #[test]
    fn binds_probes_without_error() {
        let mut st = State::new();
        let env = env_with(&mut st, Value::Nil, &[("x", Value::Fixint(1))]);
        let x = st.symbol("x");
        let y = st.symbol("y");
        assert!(binds(&mut st, env, x));
        assert!(!binds(&mut st, env, y));
    }

    #[test]
    fn keyed_lookup_through_closure() {
        let mut st = State::new();
        let key = st.cons(Value::Inert, Value::Inert);
        let base = make_environment(&mut st, Value::Nil);
        let keyed = make_keyed_static_env(&mut st, base, key, Value::Fixint(42));
        // an unkeyed frame between the lookup point and the keyed frame
        let child = make_environment(&mut st, keyed);
        let grandchild = make_environment(&mut st, child);
        assert_eq!(
            get_keyed_static_var(&mut st, grandchild, key).unwrap(),
            Value::Fixint(42)
        );
        // a different key misses
        let other = st.cons(Value::Inert, Value::Inert);
        let err = get_keyed_static_var(&mut st, grandchild, other).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::UnboundKeyed);
    }

    #[test]
    fn inner_keyed_frame_shadows_outer() {
        let mut st = State::new();
        let key = st.cons(Value::Inert, Value::Inert);
        let outer = make_keyed_static_env(&mut st, Value::Nil, key, Value::Fixint(1));
        let inner = make_keyed_static_env(&mut st, outer, key, Value::Fixint(2));
        let child = make_environment(&mut st, inner);
        assert_eq!(
            get_keyed_static_var(&mut st, child, key).unwrap(),
            Value::Fixint(2)
        );
    }

    #[test]
    fn keyed_closure_collapses_single_entry() {
        let mut st = State::new();
        let key = st.cons(Value::Inert, Value::Inert);
        let keyed = make_keyed_static_env(&mut st, Value::Nil, key, Value::Fixint(1));
        let unkeyed = make_environment(&mut st, keyed);
        let parents = st.list1(unkeyed);
        let env = make_environment(&mut st, parents);
        assert!(st.heap.is_environment(st.heap.env(env).keyed_parents));
        assert_eq!(
            get_keyed_static_var(&mut st, env, key).unwrap(),
            Value::Fixint(1)
        );
    }
}
