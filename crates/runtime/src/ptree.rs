//! Parameter trees.
//!
//! A ptree is a tree of symbols, `#ignore`, `()`, and pairs.
//! `check_copy_ptree` validates one (leaves of the right kinds, all
//! symbol names distinct, acyclic and finite) and produces an immutable
//! copy for the constructed combiner to hold. `match_ptree` walks a
//! ptree and an argument object in lockstep, binding symbol leaves.

use std::collections::HashSet;

use vau_core::{Tag, Value};

use crate::env;
use crate::error::{Result, match_error};
use crate::pairs;
use crate::state::State;

/// Validate `ptree` and return an immutable copy. `extra_sym` is an
/// additional name that must not collide (the environment formal of
/// `$vau`), or `Ignore`.
pub fn check_copy_ptree(st: &mut State, name: &str, ptree: Value, extra_sym: Value) -> Result<Value> {
    let mut names: HashSet<String> = HashSet::new();
    if st.heap.is_symbol(extra_sym) {
        names.insert(st.heap.sym_str(extra_sym).to_string());
    }

    // validation pass: a visited side table detects cycles without
    // touching the mark word the copy pass will use
    let mut visited: HashSet<Value> = HashSet::new();
    let mut stack = vec![ptree];
    while let Some(p) = stack.pop() {
        match st.heap.tag_of(p) {
            Tag::Ignore | Tag::Nil => {}
            Tag::Symbol => {
                if !names.insert(st.heap.sym_str(p).to_string()) {
                    return Err(match_error(name, "repeated symbol in parameter tree"));
                }
            }
            Tag::Pair => {
                if !visited.insert(p) {
                    return Err(match_error(name, "cyclic parameter tree"));
                }
                stack.push(st.heap.cdr(p));
                stack.push(st.heap.car(p));
            }
            _ => return Err(match_error(name, "bad object in parameter tree")),
        }
    }

    Ok(pairs::copy_es(st, ptree, false))
}

/// Bind `obj` against `ptree` in `env`. Symbol leaves bind, `#ignore`
/// discards, `()` requires `()`, pairs recurse on both halves. Shape
/// mismatch is a match error.
pub fn match_ptree(st: &mut State, name: &str, env: Value, ptree: Value, obj: Value) -> Result<()> {
    let mut stack = vec![(ptree, obj)];
    while let Some((p, o)) = stack.pop() {
        match st.heap.tag_of(p) {
            Tag::Ignore => {}
            Tag::Nil => {
                if !o.is_nil() {
                    return Err(match_error(name, "ptree mismatch (expected ())"));
                }
            }
            Tag::Symbol => env::add_binding(st, env, p, o),
            Tag::Pair => {
                if st.heap.is_pair(o) {
                    stack.push((st.heap.cdr(p), st.heap.cdr(o)));
                    stack.push((st.heap.car(p), st.heap.car(o)));
                } else {
                    return Err(match_error(name, "ptree mismatch (expected pair)"));
                }
            }
            // check_copy_ptree already rejected anything else
            _ => return Err(match_error(name, "bad object in parameter tree")),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn accepts_and_copies_simple_trees() {
        let mut st = State::new();
        let x = st.symbol("x");
        let y = st.symbol("y");
        let ptree = st.list2(x, y);
        let copy = check_copy_ptree(&mut st, "$vau", ptree, Value::Ignore).unwrap();
        assert!(!st.heap.is_mutable_pair(copy));
        assert!(crate::equal::equal(&st.heap, ptree, copy));
    }

    #[test]
    fn bare_symbol_and_ignore_are_valid_ptrees() {
        let mut st = State::new();
        let x = st.symbol("x");
        assert_eq!(check_copy_ptree(&mut st, "t", x, Value::Ignore).unwrap(), x);
        assert_eq!(
            check_copy_ptree(&mut st, "t", Value::Ignore, Value::Ignore).unwrap(),
            Value::Ignore
        );
    }

    #[test]
    fn rejects_duplicates_cycles_and_bad_leaves() {
        let mut st = State::new();
        let x1 = st.symbol("x");
        let x2 = st.symbol("x");
        let dup = st.list2(x1, x2);
        assert_eq!(
            check_copy_ptree(&mut st, "t", dup, Value::Ignore).unwrap_err().kind,
            ErrorKind::Match
        );

        // the environment formal counts against duplicates
        let single = st.list1(x1);
        let e = st.symbol("x");
        assert!(check_copy_ptree(&mut st, "t", single, e).is_err());

        let cyc = st.list1(Value::Ignore);
        st.heap.set_cdr(cyc, cyc);
        assert!(check_copy_ptree(&mut st, "t", cyc, Value::Ignore).is_err());

        let bad = st.list1(Value::Fixint(3));
        assert!(check_copy_ptree(&mut st, "t", bad, Value::Ignore).is_err());
    }

    #[test]
    fn matching_binds_symbols() {
        let mut st = State::new();
        let x = st.symbol("x");
        let y = st.symbol("y");
        let inner = st.list1(y);
        let ptree = st.cons(x, inner);
        let env = env::make_environment(&mut st, Value::Nil);
        let args = st.list2(Value::Fixint(1), Value::Fixint(2));
        match_ptree(&mut st, "t", env, ptree, args).unwrap();
        assert_eq!(env::get_binding(&mut st, env, x).unwrap(), Value::Fixint(1));
        assert_eq!(env::get_binding(&mut st, env, y).unwrap(), Value::Fixint(2));
    }

    #[test]
    fn ignore_discards_and_nil_requires_nil() {
        let mut st = State::new();
        let env = env::make_environment(&mut st, Value::Nil);
        let ptree = st.list1(Value::Ignore);
        let args = st.list1(Value::Fixint(5));
        match_ptree(&mut st, "t", env, ptree, args).unwrap();

        let extra = st.list2(Value::Fixint(5), Value::Fixint(6));
        let err = match_ptree(&mut st, "t", env, ptree, extra).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Match);
    }

    #[test]
    fn symbol_ptree_binds_whole_operand_tree() {
        let mut st = State::new();
        let env = env::make_environment(&mut st, Value::Nil);
        let rest = st.symbol("rest");
        let args = st.list2(Value::Fixint(1), Value::Fixint(2));
        match_ptree(&mut st, "t", env, rest, args).unwrap();
        assert_eq!(env::get_binding(&mut st, env, rest).unwrap(), args);
    }
}
