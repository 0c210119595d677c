//! The evaluator.
//!
//! One small step at a time: the trampoline in `State::run` dispatches
//! the pending work item to [`step`], and every path through here ends
//! by scheduling the next item (`tail_eval` / `apply_cc`) rather than
//! recursing, so host stack depth stays constant in Kernel call depth.
//!
//! Evaluation of a combination installs a continuation that receives
//! the evaluated operator and dispatches on its kind: operatives get
//! the operand tree raw; applicatives get a fresh copy of the operand
//! list with every element evaluated left to right through a chained
//! continuation, and the underlying combiner is then combined with the
//! evaluated list (uniformly, so wrapped wrappers evaluate again).

use vau_core::{Tag, Value};

use crate::combiner;
use crate::cont;
use crate::control;
use crate::env;
use crate::error::{Result, type_error};
use crate::heap::OperKind;
use crate::pairs;
use crate::ptree;
use crate::state::State;

/// One trampoline step: evaluate `expr` in `env` and schedule the next
/// step.
pub fn step(st: &mut State, expr: Value, env: Value) -> Result<()> {
    match st.heap.tag_of(expr) {
        Tag::Symbol => {
            tracing::trace!(symbol = st.heap.sym_str(expr), "eval symbol");
            let value = env::get_binding(st, env, expr)?;
            st.apply_cc(value);
            Ok(())
        }
        Tag::Pair => {
            tracing::trace!("eval combination");
            let op = st.heap.car(expr);
            let ops = st.heap.cdr(expr);
            cont::push_continuation(st, "combine", do_combine, &[ops, env], env);
            st.tail_eval(op, env);
            Ok(())
        }
        _ => {
            // self-evaluating
            st.apply_cc(expr);
            Ok(())
        }
    }
}

/// Continuation: the operator of a combination has been evaluated.
pub fn do_combine(st: &mut State, xparams: &[Value], comb: Value) -> Result<()> {
    let ops = xparams[0];
    let env = xparams[1];
    combine(st, comb, ops, env)
}

/// Apply combiner `comb` to operand tree `ops` in `env`.
pub fn combine(st: &mut State, comb: Value, ops: Value, env: Value) -> Result<()> {
    match st.heap.tag_of(comb) {
        Tag::Operative => apply_operative(st, comb, ops, env),
        Tag::Applicative => {
            let underlying = st.heap.applicative(comb).underlying;
            // the operand list may be cyclic (the arithmetic operations
            // depend on it) but must be a list
            let depth = st.activation.len();
            st.activation.push(comb);
            st.activation.push(env);
            let copied = pairs::check_copy_list(st, "combine", true, ops);
            let result = match copied {
                Ok((copy, pairs, _cpairs)) => {
                    if pairs == 0 {
                        st.activation.truncate(depth);
                        return combine(st, underlying, Value::Nil, env);
                    }
                    cont::push_continuation(
                        st,
                        "eval-argument",
                        do_eval_args,
                        &[underlying, env, copy, copy, Value::Fixint(pairs - 1)],
                        env,
                    );
                    st.tail_eval(st.heap.car(copy), env);
                    Ok(())
                }
                Err(e) => Err(e),
            };
            st.activation.truncate(depth);
            result
        }
        _ => Err(type_error("eval", "combiner expected in operator position")),
    }
}

/// Continuation: one operand has been evaluated; store it, move on, and
/// once the list is complete combine the underlying combiner with it.
fn do_eval_args(st: &mut State, xparams: &[Value], value: Value) -> Result<()> {
    let underlying = xparams[0];
    let env = xparams[1];
    let head = xparams[2];
    let current = xparams[3];
    let remaining = xparams[4].fixint();

    st.heap.set_car(current, value);
    if remaining > 0 {
        let next = st.heap.cdr(current);
        cont::push_continuation(
            st,
            "eval-argument",
            do_eval_args,
            &[underlying, env, head, next, Value::Fixint(remaining - 1)],
            env,
        );
        st.tail_eval(st.heap.car(next), env);
        Ok(())
    } else {
        combine(st, underlying, head, env)
    }
}

/// Apply an operative: primitives run their native function, derived
/// operatives match their ptree in a fresh child of the captured static
/// environment, bind the environment formal to the dynamic environment,
/// and tail-evaluate the body as a sequence.
pub fn apply_operative(st: &mut State, oper: Value, ptree_arg: Value, denv: Value) -> Result<()> {
    let depth = st.activation.len();
    st.activation.push(oper);
    st.activation.push(ptree_arg);
    st.activation.push(denv);

    let result = match &st.heap.operative(oper).kind {
        OperKind::Primitive { f, xparams, name } => {
            tracing::trace!(name, "apply primitive");
            let f = *f;
            let xp: Vec<Value> = xparams.to_vec();
            f(st, &xp, ptree_arg, denv)
        }
        OperKind::Derived {
            ptree,
            eformal,
            body,
            senv,
        } => {
            let (ptree, eformal, body, senv) = (*ptree, *eformal, *body, *senv);
            let env = env::make_environment(st, senv);
            st.push_root(env);
            let matched = ptree::match_ptree(st, "derived operative", env, ptree, ptree_arg);
            let r = match matched {
                Ok(()) => {
                    if st.heap.is_symbol(eformal) {
                        env::add_binding(st, env, eformal, denv);
                    }
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
                }
                Err(e) => Err(e),
            };
            st.pop_root();
            r
        }
    };
    st.activation.truncate(depth);
    result
}

/// Build a derived operative in `senv` (`$vau` and `$lambda` both land
/// here): validates the ptree and environment formal and takes an
/// immutable copy of the body.
pub fn make_vau(
    st: &mut State,
    name: &str,
    formals: Value,
    eformal: Value,
    body: Value,
    senv: Value,
) -> Result<Value> {
    if !eformal.is_ignore() && !st.heap.is_symbol(eformal) {
        return Err(type_error(name, "symbol or #ignore expected as environment parameter"));
    }
    let ptree = ptree::check_copy_ptree(st, name, formals, eformal)?;
    st.push_root(ptree);
    let checked = pairs::check_list(st, name, true, body);
    let result = match checked {
        Ok(_) => {
            let body_copy = pairs::copy_es(st, body, false);
            st.push_root(body_copy);
            let oper = combiner::make_derived(st, ptree, eformal, body_copy, senv);
            st.pop_root();
            Ok(oper)
        }
        Err(e) => Err(e),
    };
    st.pop_root();
    result
}
