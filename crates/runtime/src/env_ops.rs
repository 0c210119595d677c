//! Environment ground operations: `eval`, `make-environment`,
//! `$define!`, `$binds?`, and the whole `$let` family.
//!
//! All the lets share two pieces: `split_check_let_bindings`, which
//! validates `((sym expr) ...)` and splits it into a parameter tree (a
//! single one, or one per binding for the `*` variants) plus the
//! parallel list of value expressions, and the `do_let` continuation,
//! which matches each delivered value and either steps to the next
//! binding or tail-evaluates the body as a sequence.
//!
//! The non-`*` variants evaluate every value expression in one go by
//! evaluating `(list . exprs)` with the ground `list` applicative.

use vau_core::Value;

use crate::args;
use crate::cont;
use crate::control;
use crate::env;
use crate::error::{Result, structure_error, type_error};
use crate::marks;
use crate::pairs;
use crate::ptree;
use crate::state::State;

/// `(eval expr environment)`
pub fn op_eval(st: &mut State, _x: &[Value], ptree: Value, _denv: Value) -> Result<()> {
    let (expr, env) = args::take_2(st, "eval", ptree)?;
    if !st.heap.is_environment(env) {
        return Err(type_error("eval", "expected environment"));
    }
    st.tail_eval(expr, env);
    Ok(())
}

/// Copy a (possibly cyclic) list of environments into a fresh acyclic
/// list.
fn check_copy_env_list(st: &mut State, name: &str, obj: Value) -> Result<Value> {
    let (total, _cpairs) = pairs::check_typed_list(
        st,
        name,
        "environment",
        |st, v| st.heap.is_environment(v),
        true,
        obj,
    )?;
    st.push_root(obj);
    let dummy = st.cons(Value::Inert, Value::Nil);
    st.push_root(dummy);
    let mut last = dummy;
    let mut tail = obj;
    for _ in 0..total {
        let new_pair = st.cons(st.heap.car(tail), Value::Nil);
        st.heap.set_cdr(last, new_pair);
        last = new_pair;
        tail = st.heap.cdr(tail);
    }
    let copy = st.heap.cdr(dummy);
    st.roots.discard(2);
    Ok(copy)
}

/// `(make-environment . parents)`
pub fn op_make_environment(st: &mut State, _x: &[Value], ptree: Value, _denv: Value) -> Result<()> {
    let new_env = if ptree.is_nil() {
        env::make_environment(st, Value::Nil)
    } else if st.heap.is_pair(ptree) && st.heap.cdr(ptree).is_nil() {
        // common case of one parent, keep the environment itself
        let parent = st.heap.car(ptree);
        if !st.heap.is_environment(parent) {
            return Err(type_error("make-environment", "not an environment in parent list"));
        }
        env::make_environment(st, parent)
    } else {
        let parents = check_copy_env_list(st, "make-environment", ptree)?;
        st.push_root(parents);
        let e = env::make_environment(st, parents);
        st.pop_root();
        e
    };
    st.apply_cc(new_env);
    Ok(())
}

/// `($define! ptree expr)`
pub fn op_define(st: &mut State, _x: &[Value], ptree: Value, denv: Value) -> Result<()> {
    let (dptree, expr) = args::take_2(st, "$define!", ptree)?;
    let dptree = ptree::check_copy_ptree(st, "$define!", dptree, Value::Ignore)?;
    st.push_root(dptree);
    cont::push_continuation(st, "define", do_match, &[dptree, denv], denv);
    st.pop_root();
    st.tail_eval(expr, denv);
    Ok(())
}

fn do_match(st: &mut State, xparams: &[Value], obj: Value) -> Result<()> {
    ptree::match_ptree(st, "$define!", xparams[1], xparams[0], obj)?;
    st.apply_cc(Value::Inert);
    Ok(())
}

/// `($binds? env-expr . symbols)`
pub fn op_bindsp(st: &mut State, _x: &[Value], ptree: Value, denv: Value) -> Result<()> {
    let (env_expr, symbols) = args::take_1_rest(st, "$binds?", ptree)?;
    let (count, _) = pairs::check_typed_list(
        st,
        "$binds?",
        "symbol",
        |st, v| st.heap.is_symbol(v),
        true,
        symbols,
    )?;
    let (symbols, _, _) = pairs::check_copy_list(st, "$binds?", true, symbols)?;
    st.push_root(symbols);
    cont::push_continuation(
        st,
        "binds?",
        do_bindsp,
        &[symbols, Value::Fixint(count)],
        denv,
    );
    st.pop_root();
    st.tail_eval(env_expr, denv);
    Ok(())
}

fn do_bindsp(st: &mut State, xparams: &[Value], obj: Value) -> Result<()> {
    if !st.heap.is_environment(obj) {
        return Err(type_error("$binds?", "expected environment as first argument"));
    }
    let mut symbols = xparams[0];
    let mut count = xparams[1].fixint();
    let mut res = Value::TRUE;
    while count > 0 {
        let first = st.heap.car(symbols);
        symbols = st.heap.cdr(symbols);
        if !env::binds(st, obj, first) {
            res = Value::FALSE;
            break;
        }
        count -= 1;
    }
    st.apply_cc(res);
    Ok(())
}

/// `(get-current-environment)`
pub fn op_get_current_environment(
    st: &mut State,
    _x: &[Value],
    ptree: Value,
    denv: Value,
) -> Result<()> {
    args::take_0(st, "get-current-environment", ptree)?;
    st.apply_cc(denv);
    Ok(())
}

/// `(make-kernel-standard-environment)`
pub fn op_make_kernel_standard_environment(
    st: &mut State,
    _x: &[Value],
    ptree: Value,
    _denv: Value,
) -> Result<()> {
    args::take_0(st, "make-kernel-standard-environment", ptree)?;
    // standard environments get the hash-table binding store
    let ground = st.ground_env;
    let new_env = env::make_table_environment(st, ground);
    st.apply_cc(new_env);
    Ok(())
}

// ---- the let family ----------------------------------------------------

/// Validate `((sym expr) ...)` bindings and split them. With `starp`
/// each binding becomes its own ptree (repeated symbols across bindings
/// are fine); otherwise all binding names form one ptree. Returns the
/// ptree (or list of ptrees) and the parallel list of value
/// expressions. Uses dummy anchors 0 and 1.
fn split_check_let_bindings(
    st: &mut State,
    name: &str,
    bindings: Value,
    starp: bool,
) -> Result<(Value, Value)> {
    let mut last_car_pair = st.dummy(0);
    let mut last_cadr_pair = st.dummy(1);

    let mut tail = bindings;
    while st.heap.is_pair(tail) && !marks::is_marked(&st.heap, tail) {
        marks::mark(&mut st.heap, tail);
        let first = st.heap.car(tail);
        let well_formed = st.heap.is_pair(first) && st.heap.is_pair(st.heap.cdr(first)) && {
            let cddr = st.heap.cdr(st.heap.cdr(first));
            cddr.is_nil()
        };
        if !well_formed {
            marks::unmark_list(&mut st.heap, bindings);
            discard_split(st);
            return Err(structure_error(name, "bad structure in bindings"));
        }
        let sym = st.heap.car(first);
        let expr = st.heap.car(st.heap.cdr(first));

        let new_car = st.cons(sym, Value::Nil);
        st.heap.set_cdr(last_car_pair, new_car);
        last_car_pair = new_car;
        let new_cadr = st.cons(expr, Value::Nil);
        st.heap.set_cdr(last_cadr_pair, new_cadr);
        last_cadr_pair = new_cadr;

        tail = st.heap.cdr(tail);
    }
    marks::unmark_list(&mut st.heap, bindings);

    if !st.heap.is_pair(tail) && !tail.is_nil() {
        discard_split(st);
        return Err(structure_error(name, "expected list"));
    }
    if st.heap.is_pair(tail) {
        // stopped on a marked pair: the bindings list is cyclic
        discard_split(st);
        return Err(structure_error(name, "expected finite list"));
    }

    let bptree = if starp {
        // each binding is an independent ptree; replace in place
        let mut t = st.heap.cdr(st.dummy(0));
        while !t.is_nil() {
            let first = st.heap.car(t);
            match ptree::check_copy_ptree(st, name, first, Value::Ignore) {
                Ok(copy) => st.heap.set_car(t, copy),
                Err(e) => {
                    discard_split(st);
                    return Err(e);
                }
            }
            t = st.heap.cdr(t);
        }
        st.cutoff_dummy(0)
    } else {
        // all binding names form a single ptree
        let names = st.heap.cdr(st.dummy(0));
        match ptree::check_copy_ptree(st, name, names, Value::Ignore) {
            Ok(copy) => {
                let _ = st.cutoff_dummy(0);
                copy
            }
            Err(e) => {
                discard_split(st);
                return Err(e);
            }
        }
    };
    let exprs = st.cutoff_dummy(1);
    Ok((bptree, exprs))
}

fn discard_split(st: &mut State) {
    let _ = st.cutoff_dummy(0);
    let _ = st.cutoff_dummy(1);
}

/// Continuation shared by every let variant. Matches the delivered
/// value against the current ptree, then either steps to the next
/// binding (fresh child environment per step) or runs the body.
///
/// Extra parameters: name symbol, this ptree, remaining ptrees,
/// remaining exprs, match environment, rec flag, body.
fn do_let(st: &mut State, xparams: &[Value], obj: Value) -> Result<()> {
    let sname = xparams[0];
    let this_ptree = xparams[1];
    let bindings = xparams[2];
    let exprs = xparams[3];
    let env = xparams[4];
    let recp = xparams[5] == Value::TRUE;
    let body = xparams[6];
    let name = st.heap.sym_str(sname).to_string();

    ptree::match_ptree(st, &name, env, this_ptree, obj)?;

    if bindings.is_nil() {
        if body.is_nil() {
            st.apply_cc(Value::Inert);
        } else {
            let tail = st.heap.cdr(body);
            if st.heap.is_pair(tail) {
                cont::push_continuation(
                    st,
                    "sequence",
                    control::do_seq,
                    &[tail, env],
                    env,
                );
            }
            st.tail_eval(st.heap.car(body), env);
        }
        Ok(())
    } else {
        let new_env = env::make_environment(st, env);
        st.push_root(new_env);
        let this_ptree = st.heap.car(bindings);
        let rest_ptrees = st.heap.cdr(bindings);
        let rest_exprs = st.heap.cdr(exprs);
        cont::push_continuation(
            st,
            "let",
            do_let,
            &[
                sname,
                this_ptree,
                rest_ptrees,
                rest_exprs,
                new_env,
                Value::bool(recp),
                body,
            ],
            new_env,
        );
        st.pop_root();
        st.tail_eval(st.heap.car(exprs), if recp { new_env } else { env });
        Ok(())
    }
}

/// Shared front end of `$let`, `$let*`, `$letrec`, `$letrec*`.
fn let_variant(
    st: &mut State,
    sname: Value,
    ptree_arg: Value,
    denv: Value,
    starp: bool,
    recp: bool,
) -> Result<()> {
    let name = st.heap.sym_str(sname).to_string();
    let (bindings, body) = args::take_1_rest(st, &name, ptree_arg)?;

    let (bptree, exprs) = split_check_let_bindings(st, &name, bindings, starp)?;
    st.push_root(bptree);
    st.push_root(exprs);

    let result = let_variant_body(st, sname, &name, bptree, exprs, body, denv, starp, recp);
    st.roots.discard(2);
    result
}

#[allow(clippy::too_many_arguments)]
fn let_variant_body(
    st: &mut State,
    sname: Value,
    name: &str,
    bptree: Value,
    exprs: Value,
    body: Value,
    denv: Value,
    starp: bool,
    recp: bool,
) -> Result<()> {
    pairs::check_list(st, name, true, body)?;
    let body = pairs::copy_es(st, body, false);
    st.push_root(body);
    let new_env = env::make_environment(st, denv);
    st.push_root(new_env);

    if !starp || bptree.is_nil() {
        // evaluate every value expression at once via (list . exprs)
        cont::push_continuation(
            st,
            "let",
            do_let,
            &[
                sname,
                bptree,
                Value::Nil,
                Value::Nil,
                new_env,
                Value::bool(recp),
                body,
            ],
            new_env,
        );
        let expr = st.cons(st.list_app, exprs);
        st.roots.discard(2);
        // rec variants evaluate the values where they will be bound
        st.tail_eval(expr, if recp { new_env } else { denv });
    } else {
        let this_ptree = st.heap.car(bptree);
        let rest_ptrees = st.heap.cdr(bptree);
        let rest_exprs = st.heap.cdr(exprs);
        cont::push_continuation(
            st,
            "let",
            do_let,
            &[
                sname,
                this_ptree,
                rest_ptrees,
                rest_exprs,
                new_env,
                Value::bool(recp),
                body,
            ],
            new_env,
        );
        st.roots.discard(2);
        st.tail_eval(st.heap.car(exprs), if recp { new_env } else { denv });
    }
    Ok(())
}

/// `($let bindings . body)`
pub fn op_let(st: &mut State, xparams: &[Value], ptree: Value, denv: Value) -> Result<()> {
    let_variant(st, xparams[0], ptree, denv, false, false)
}

/// `($let* bindings . body)`
pub fn op_let_star(st: &mut State, xparams: &[Value], ptree: Value, denv: Value) -> Result<()> {
    let_variant(st, xparams[0], ptree, denv, true, false)
}

/// `($letrec bindings . body)`
pub fn op_letrec(st: &mut State, xparams: &[Value], ptree: Value, denv: Value) -> Result<()> {
    let_variant(st, xparams[0], ptree, denv, false, true)
}

/// `($letrec* bindings . body)`
pub fn op_letrec_star(st: &mut State, xparams: &[Value], ptree: Value, denv: Value) -> Result<()> {
    let_variant(st, xparams[0], ptree, denv, true, true)
}

/// `($let-redirect env-expr bindings . body)`
pub fn op_let_redirect(st: &mut State, xparams: &[Value], ptree: Value, denv: Value) -> Result<()> {
    let sname = xparams[0];
    let name = st.heap.sym_str(sname).to_string();
    let (env_expr, bindings, body) = args::take_2_rest(st, &name, ptree)?;

    let (bptree, exprs) = split_check_let_bindings(st, &name, bindings, false)?;
    st.push_root(bptree);
    st.push_root(exprs);

    let result = (|| -> Result<()> {
        pairs::check_list(st, &name, true, body)?;
        let body = pairs::copy_es(st, body, false);
        st.push_root(body);
        let eexpr = st.cons(st.list_app, exprs);
        st.push_root(eexpr);
        cont::push_continuation(
            st,
            "let-redirect",
            do_let_redirect,
            &[sname, bptree, eexpr, denv, body],
            denv,
        );
        st.roots.discard(2);
        st.tail_eval(env_expr, denv);
        Ok(())
    })();
    st.roots.discard(2);
    result
}

fn do_let_redirect(st: &mut State, xparams: &[Value], obj: Value) -> Result<()> {
    let sname = xparams[0];
    let bptree = xparams[1];
    let lexpr = xparams[2];
    let denv = xparams[3];
    let body = xparams[4];
    if !st.heap.is_environment(obj) {
        return Err(type_error(st.heap.sym_str(sname), "expected environment"));
    }
    let new_env = env::make_environment(st, obj);
    st.push_root(new_env);
    cont::push_continuation(
        st,
        "let",
        do_let,
        &[
            sname,
            bptree,
            Value::Nil,
            Value::Nil,
            new_env,
            Value::FALSE,
            body,
        ],
        new_env,
    );
    st.pop_root();
    st.tail_eval(lexpr, denv);
    Ok(())
}

/// `($let-safe bindings . body)`: the body environment is a fresh child
/// of the ground environment (equivalent to the report's grandchild,
/// since the child is fresh).
pub fn op_let_safe(st: &mut State, xparams: &[Value], ptree: Value, denv: Value) -> Result<()> {
    let sname = xparams[0];
    let name = st.heap.sym_str(sname).to_string();
    let (bindings, body) = args::take_1_rest(st, &name, ptree)?;

    let (bptree, exprs) = split_check_let_bindings(st, &name, bindings, false)?;
    st.push_root(bptree);
    st.push_root(exprs);

    let result = (|| -> Result<()> {
        pairs::check_list(st, &name, true, body)?;
        let body = pairs::copy_es(st, body, false);
        st.push_root(body);
        let ground = st.ground_env;
        let new_env = env::make_environment(st, ground);
        st.push_root(new_env);
        cont::push_continuation(
            st,
            "let",
            do_let,
            &[
                sname,
                bptree,
                Value::Nil,
                Value::Nil,
                new_env,
                Value::FALSE,
                body,
            ],
            new_env,
        );
        let expr = st.cons(st.list_app, exprs);
        st.roots.discard(2);
        st.tail_eval(expr, denv);
        Ok(())
    })();
    st.roots.discard(2);
    result
}

/// `($remote-eval expr env-expr)`
pub fn op_remote_eval(st: &mut State, _x: &[Value], ptree: Value, denv: Value) -> Result<()> {
    let (obj, env_expr) = args::take_2(st, "$remote-eval", ptree)?;
    cont::push_continuation(st, "remote-eval", do_remote_eval, &[obj], denv);
    st.tail_eval(env_expr, denv);
    Ok(())
}

fn do_remote_eval(st: &mut State, xparams: &[Value], obj: Value) -> Result<()> {
    if !st.heap.is_environment(obj) {
        return Err(type_error(
            "$remote-eval",
            "bad type from second operand evaluation (expected environment)",
        ));
    }
    st.tail_eval(xparams[0], obj);
    Ok(())
}

/// `($bindings->environment . bindings)`
pub fn op_bindings_to_environment(
    st: &mut State,
    _x: &[Value],
    ptree: Value,
    denv: Value,
) -> Result<()> {
    let (bptree, exprs) = split_check_let_bindings(st, "$bindings->environment", ptree, false)?;
    st.push_root(bptree);
    st.push_root(exprs);

    // a fresh rootless environment receives the matched bindings
    let new_env = env::make_environment(st, Value::Nil);
    st.push_root(new_env);
    cont::push_continuation(
        st,
        "bindings->environment",
        do_b_to_env,
        &[bptree, new_env],
        denv,
    );
    let expr = st.cons(st.list_app, exprs);
    st.roots.discard(3);
    st.tail_eval(expr, denv);
    Ok(())
}

fn do_b_to_env(st: &mut State, xparams: &[Value], obj: Value) -> Result<()> {
    ptree::match_ptree(st, "$bindings->environment", xparams[1], xparams[0], obj)?;
    st.apply_cc(xparams[1]);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::State;

    fn ground_child(st: &mut State) -> Value {
        let ground = st.ground_env;
        env::make_table_environment(st, ground)
    }

    fn split(st: &mut State, src_bindings: &[(&str, Value)], starp: bool) -> Result<(Value, Value)> {
        let mut bindings = Value::Nil;
        for (name, val) in src_bindings.iter().rev() {
            let sym = st.symbol(name);
            let binding = st.list2(sym, *val);
            bindings = st.cons(binding, bindings);
        }
        split_check_let_bindings(st, "$let", bindings, starp)
    }

    #[test]
    fn split_produces_ptree_and_exprs() {
        let mut st = State::new();
        let (bptree, exprs) =
            split(&mut st, &[("x", Value::Fixint(1)), ("y", Value::Fixint(2))], false).unwrap();
        // one ptree: (x y), immutable
        assert!(st.heap.is_pair(bptree));
        assert!(!st.heap.is_mutable_pair(bptree));
        assert_eq!(st.heap.sym_str(st.heap.car(bptree)), "x");
        // exprs: (1 2)
        assert_eq!(st.heap.car(exprs), Value::Fixint(1));
        assert_eq!(st.heap.car(st.heap.cdr(exprs)), Value::Fixint(2));
    }

    #[test]
    fn split_star_allows_repeated_symbols() {
        let mut st = State::new();
        assert!(split(&mut st, &[("x", Value::Fixint(1)), ("x", Value::Fixint(2))], false).is_err());
        let (bptrees, _exprs) =
            split(&mut st, &[("x", Value::Fixint(1)), ("x", Value::Fixint(2))], true).unwrap();
        assert!(st.heap.is_pair(bptrees));
        assert_eq!(st.heap.sym_str(st.heap.car(bptrees)), "x");
    }

    #[test]
    fn split_rejects_bad_structure_and_resets_anchors() {
        let mut st = State::new();
        let bad = st.list1(Value::Fixint(1)); // (1) is not ((sym expr) ...)
        assert!(split_check_let_bindings(&mut st, "$let", bad, false).is_err());
        assert!(st.heap.cdr(st.dummy(0)).is_nil());
        assert!(st.heap.cdr(st.dummy(1)).is_nil());
    }

    fn read_like(st: &mut State, op: &str, bindings: Vec<(&str, Value)>, body: Value) -> Value {
        // builds (op ((sym val) ...) body)
        let mut blist = Value::Nil;
        for (name, val) in bindings.into_iter().rev() {
            let sym = st.symbol(name);
            let b = st.list2(sym, val);
            blist = st.cons(b, blist);
        }
        let op_sym = st.symbol(op);
        let tail = st.list2(blist, body);
        st.cons(op_sym, tail)
    }

    #[test]
    fn let_binds_in_parallel() {
        let mut st = State::new();
        let env = ground_child(&mut st);
        // ($let ((x 1) (y 2)) (+ x y)) => 3
        let plus = st.symbol("+");
        let x = st.symbol("x");
        let y = st.symbol("y");
        let body = {
            let tail = st.list2(x, y);
            st.cons(plus, tail)
        };
        let expr = read_like(
            &mut st,
            "$let",
            vec![("x", Value::Fixint(1)), ("y", Value::Fixint(2))],
            body,
        );
        assert_eq!(st.run(expr, env).unwrap(), Value::Fixint(3));
    }

    #[test]
    fn let_star_sees_earlier_bindings() {
        let mut st = State::new();
        let env = ground_child(&mut st);
        // ($let* ((x 1) (y x)) y) => 1
        let x_for_y = st.symbol("x");
        let y_body = st.symbol("y");
        let expr = read_like(
            &mut st,
            "$let*",
            vec![("x", Value::Fixint(1)), ("y", x_for_y)],
            y_body,
        );
        assert_eq!(st.run(expr, env).unwrap(), Value::Fixint(1));
    }

    #[test]
    fn plain_let_does_not_see_outer_shadowed_binding() {
        let mut st = State::new();
        let env = ground_child(&mut st);
        let x_outer = st.symbol("x");
        env::add_binding(&mut st, env, x_outer, Value::Fixint(10));
        // ($let ((x 1) (y x)) y): y's expr evaluates in the dynamic env
        let x_for_y = st.symbol("x");
        let y_body = st.symbol("y");
        let expr = read_like(
            &mut st,
            "$let",
            vec![("x", Value::Fixint(1)), ("y", x_for_y)],
            y_body,
        );
        assert_eq!(st.run(expr, env).unwrap(), Value::Fixint(10));
    }

    #[test]
    fn empty_body_is_inert() {
        let mut st = State::new();
        let env = ground_child(&mut st);
        let op_sym = st.symbol("$let");
        let bindings = Value::Nil;
        let tail = st.list1(bindings);
        let expr = st.cons(op_sym, tail);
        assert_eq!(st.run(expr, env).unwrap(), Value::Inert);
    }

    #[test]
    fn bindings_to_environment_builds_rootless_env() {
        let mut st = State::new();
        let env = ground_child(&mut st);
        // ($bindings->environment (x 1))
        let x = st.symbol("x");
        let binding = st.list2(x, Value::Fixint(1));
        let op_sym = st.symbol("$bindings->environment");
        let tail = st.list1(binding);
        let expr = st.cons(op_sym, tail);
        let result = st.run(expr, env).unwrap();
        assert!(st.heap.is_environment(result));
        let x2 = st.symbol("x");
        assert_eq!(
            env::get_binding(&mut st, result, x2).unwrap(),
            Value::Fixint(1)
        );
        // rootless: nothing from ground is visible
        let cons_sym = st.symbol("cons");
        assert!(!env::binds(&mut st, result, cons_sym));
    }

    #[test]
    fn remote_eval_requires_environment() {
        let mut st = State::new();
        let env = ground_child(&mut st);
        let op_sym = st.symbol("$remote-eval");
        let tail = st.list2(Value::Fixint(1), Value::Fixint(2));
        let expr = st.cons(op_sym, tail);
        let err = st.run(expr, env).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::Type);
    }

    #[test]
    fn binds_probes_an_evaluated_environment() {
        let mut st = State::new();
        let env = ground_child(&mut st);
        // ($binds? (get-current-environment) cons) => #t
        let gce = st.symbol("get-current-environment");
        let gce_call = st.list1(gce);
        let cons_sym = st.symbol("cons");
        let op_sym = st.symbol("$binds?");
        let tail = st.list2(gce_call, cons_sym);
        let expr = st.cons(op_sym, tail);
        assert_eq!(st.run(expr, env).unwrap(), Value::TRUE);

        let gce = st.symbol("get-current-environment");
        let gce_call = st.list1(gce);
        let nope = st.symbol("completely-unbound");
        let op_sym = st.symbol("$binds?");
        let tail = st.list2(gce_call, nope);
        let expr = st.cons(op_sym, tail);
        assert_eq!(st.run(expr, env).unwrap(), Value::FALSE);
    }
}
