//! Continuation, keyed-variable, and error ground operations.

use vau_core::Value;

use crate::args;
use crate::combiner;
use crate::cont;
use crate::env;
use crate::error::{Result, type_error, user_error};
use crate::eval;
use crate::state::State;

/// `(call/cc combiner)`: combines `combiner` with a one-element list
/// holding the continuation to which `call/cc` would deliver its
/// result.
pub fn op_call_cc(st: &mut State, _x: &[Value], ptree: Value, denv: Value) -> Result<()> {
    let comb = args::take_1(st, "call/cc", ptree)?;
    if !st.heap.is_combiner(comb) {
        return Err(type_error("call/cc", "expected combiner"));
    }
    let captured = st.cc();
    let operands = st.list1(captured);
    eval::combine(st, comb, operands, denv)
}

/// `(continuation->applicative continuation)`: the underlying operative
/// abnormally passes its evaluated operand tree to the continuation.
pub fn op_continuation_to_applicative(
    st: &mut State,
    _x: &[Value],
    ptree: Value,
    _denv: Value,
) -> Result<()> {
    let c = args::take_1(st, "continuation->applicative", ptree)?;
    if !st.heap.is_continuation(c) {
        return Err(type_error("continuation->applicative", "expected continuation"));
    }
    let oper = combiner::make_primitive(st, "continuation-applicative", do_cont_app, &[c]);
    st.push_root(oper);
    let app = combiner::make_applicative(st, oper);
    st.pop_root();
    st.apply_cc(app);
    Ok(())
}

fn do_cont_app(st: &mut State, xparams: &[Value], ptree: Value, _denv: Value) -> Result<()> {
    cont::apply_continuation(st, xparams[0], ptree)
}

/// `(make-keyed-static-variable)`: a fresh `(binder accessor)` pair
/// over a key no other call shares.
pub fn op_make_keyed_static_variable(
    st: &mut State,
    _x: &[Value],
    ptree: Value,
    _denv: Value,
) -> Result<()> {
    args::take_0(st, "make-keyed-static-variable", ptree)?;
    // an allocation nothing else can reach: eq?-unique key
    let key = st.cons_g(false, Value::Inert, Value::Inert);
    st.push_root(key);
    let binder_op = combiner::make_primitive(st, "keyed-static-bind", do_keyed_bind, &[key]);
    st.push_root(binder_op);
    let binder = combiner::make_applicative(st, binder_op);
    st.push_root(binder);
    let accessor_op = combiner::make_primitive(st, "keyed-static-get", do_keyed_get, &[key]);
    st.push_root(accessor_op);
    let accessor = combiner::make_applicative(st, accessor_op);
    st.push_root(accessor);
    let result = st.list2(binder, accessor);
    st.roots.discard(5);
    st.apply_cc(result);
    Ok(())
}

fn do_keyed_bind(st: &mut State, xparams: &[Value], ptree: Value, _denv: Value) -> Result<()> {
    let (value, parent) = args::take_2(st, "keyed-static-bind", ptree)?;
    if !st.heap.is_environment(parent) {
        return Err(type_error("keyed-static-bind", "expected environment"));
    }
    let env = env::make_keyed_static_env(st, parent, xparams[0], value);
    st.apply_cc(env);
    Ok(())
}

fn do_keyed_get(st: &mut State, xparams: &[Value], ptree: Value, denv: Value) -> Result<()> {
    args::take_0(st, "keyed-static-get", ptree)?;
    let value = env::get_keyed_static_var(st, denv, xparams[0])?;
    st.apply_cc(value);
    Ok(())
}

/// `(error [message . irritants])`: a recoverable user-raised error.
pub fn op_error(st: &mut State, _x: &[Value], ptree: Value, _denv: Value) -> Result<()> {
    let msg = if st.heap.is_pair(ptree) && st.heap.is_string(st.heap.car(ptree)) {
        let bytes = &st.heap.str_data(st.heap.car(ptree)).bytes;
        String::from_utf8_lossy(bytes).into_owned()
    } else {
        "error raised".to_string()
    };
    Err(user_error(msg, None))
}
