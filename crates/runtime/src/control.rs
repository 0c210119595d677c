//! Control ground operatives: `$if` and `$sequence`.

use vau_core::Value;

use crate::args;
use crate::cont;
use crate::error::{Result, type_error};
use crate::pairs;
use crate::state::State;

/// Continuation shared by `$sequence`, derived-operative bodies, and
/// the let family: each resumption tail-evaluates the next expression;
/// the last one is tail-evaluated without a new frame.
pub fn do_seq(st: &mut State, xparams: &[Value], _obj: Value) -> Result<()> {
    let ls = xparams[0];
    let env = xparams[1];
    let first = st.heap.car(ls);
    let tail = st.heap.cdr(ls);
    if st.heap.is_pair(tail) {
        cont::push_continuation(st, "sequence", do_seq, &[tail, env], env);
    }
    st.tail_eval(first, env);
    Ok(())
}

/// `($sequence . body)`
pub fn op_sequence(st: &mut State, _xparams: &[Value], ptree: Value, denv: Value) -> Result<()> {
    if ptree.is_nil() {
        st.apply_cc(Value::Inert);
        return Ok(());
    }
    // a cyclic body is a legitimate infinite loop
    let (body, _pairs, _cpairs) = pairs::check_copy_list(st, "$sequence", true, ptree)?;
    let tail = st.heap.cdr(body);
    if st.heap.is_pair(tail) {
        cont::push_continuation(st, "sequence", do_seq, &[tail, denv], denv);
    }
    st.tail_eval(st.heap.car(body), denv);
    Ok(())
}

/// `($if test consequent alternative)`
pub fn op_if(st: &mut State, _xparams: &[Value], ptree: Value, denv: Value) -> Result<()> {
    let (test, cons, alt) = args::take_3(st, "$if", ptree)?;
    cont::push_continuation(st, "if", do_if, &[cons, alt, denv], denv);
    st.tail_eval(test, denv);
    Ok(())
}

fn do_if(st: &mut State, xparams: &[Value], obj: Value) -> Result<()> {
    match obj {
        Value::Bool(b) => {
            let branch = if b { xparams[0] } else { xparams[1] };
            st.tail_eval(branch, xparams[2]);
            Ok(())
        }
        _ => Err(type_error("$if", "boolean expected as test result")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env;
    use crate::state::State;

    fn ground_child(st: &mut State) -> Value {
        let ground = st.ground_env;
        env::make_table_environment(st, ground)
    }

    fn sym_list2(st: &mut State, name: &str, a: Value, b: Value) -> Value {
        let s = st.symbol(name);
        let tail = st.list2(a, b);
        st.cons(s, tail)
    }

    #[test]
    fn if_dispatches_on_the_test() {
        let mut st = State::new();
        let env = ground_child(&mut st);
        let s = st.symbol("$if");
        let tail = {
            let t = st.list2(Value::Fixint(1), Value::Fixint(2));
            st.cons(Value::Bool(true), t)
        };
        let expr = st.cons(s, tail);
        assert_eq!(st.run(expr, env).unwrap(), Value::Fixint(1));

        let s = st.symbol("$if");
        let tail = {
            let t = st.list2(Value::Fixint(1), Value::Fixint(2));
            st.cons(Value::Bool(false), t)
        };
        let expr = st.cons(s, tail);
        assert_eq!(st.run(expr, env).unwrap(), Value::Fixint(2));
    }

    #[test]
    fn if_requires_boolean_test() {
        let mut st = State::new();
        let env = ground_child(&mut st);
        let s = st.symbol("$if");
        let tail = {
            let t = st.list2(Value::Fixint(1), Value::Fixint(2));
            st.cons(Value::Fixint(0), t)
        };
        let expr = st.cons(s, tail);
        let err = st.run(expr, env).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::Type);
    }

    #[test]
    fn sequence_returns_last_and_empty_is_inert() {
        let mut st = State::new();
        let env = ground_child(&mut st);
        let expr = sym_list2(&mut st, "$sequence", Value::Fixint(1), Value::Fixint(2));
        assert_eq!(st.run(expr, env).unwrap(), Value::Fixint(2));

        let s = st.symbol("$sequence");
        let expr = st.list1(s);
        assert_eq!(st.run(expr, env).unwrap(), Value::Inert);
    }

    #[test]
    fn sequence_evaluates_in_order() {
        let mut st = State::new();
        let env = ground_child(&mut st);
        // ($sequence ($define! x 1) ($define! x 2) x) => 2
        let x1 = st.symbol("x");
        let d1 = sym_list2(&mut st, "$define!", x1, Value::Fixint(1));
        let x2 = st.symbol("x");
        let d2 = sym_list2(&mut st, "$define!", x2, Value::Fixint(2));
        let x3 = st.symbol("x");
        let s = st.symbol("$sequence");
        let tail = {
            let t2 = st.list2(d2, x3);
            st.cons(d1, t2)
        };
        let expr = st.cons(s, tail);
        assert_eq!(st.run(expr, env).unwrap(), Value::Fixint(2));
    }
}
