//! Combiner ground operations: `$vau`, `$lambda`, `wrap`, `unwrap`,
//! `apply`.

use vau_core::Value;

use crate::args;
use crate::combiner;
use crate::env;
use crate::error::{Result, type_error};
use crate::eval;
use crate::state::State;

/// `($vau formals eformal . body)`
pub fn op_vau(st: &mut State, _x: &[Value], ptree: Value, denv: Value) -> Result<()> {
    let (formals, eformal, body) = args::take_2_rest(st, "$vau", ptree)?;
    let oper = eval::make_vau(st, "$vau", formals, eformal, body, denv)?;
    st.apply_cc(oper);
    Ok(())
}

/// `($lambda formals . body)`: sugar for wrapping a `$vau` that ignores
/// its dynamic environment.
pub fn op_lambda(st: &mut State, _x: &[Value], ptree: Value, denv: Value) -> Result<()> {
    let (formals, body) = args::take_1_rest(st, "$lambda", ptree)?;
    let oper = eval::make_vau(st, "$lambda", formals, Value::Ignore, body, denv)?;
    st.push_root(oper);
    let app = combiner::make_applicative(st, oper);
    st.pop_root();
    st.apply_cc(app);
    Ok(())
}

/// `(wrap combiner)`
pub fn op_wrap(st: &mut State, _x: &[Value], ptree: Value, _denv: Value) -> Result<()> {
    let c = args::take_1(st, "wrap", ptree)?;
    if !st.heap.is_combiner(c) {
        return Err(type_error("wrap", "expected combiner"));
    }
    let app = combiner::make_applicative(st, c);
    st.apply_cc(app);
    Ok(())
}

/// `(unwrap applicative)`
pub fn op_unwrap(st: &mut State, _x: &[Value], ptree: Value, _denv: Value) -> Result<()> {
    let a = args::take_1(st, "unwrap", ptree)?;
    let underlying = combiner::unwrap(st, "unwrap", a)?;
    st.apply_cc(underlying);
    Ok(())
}

/// `(apply applicative object [environment])`: combines the underlying
/// combiner with `object`, in the given environment or a fresh empty
/// one.
pub fn op_apply(st: &mut State, _x: &[Value], ptree: Value, _denv: Value) -> Result<()> {
    let (app, obj, maybe_env) = args::take_2_opt(st, "apply", ptree)?;
    let underlying = combiner::unwrap(st, "apply", app)?;
    let env = match maybe_env {
        Some(e) => {
            if !st.heap.is_environment(e) {
                return Err(type_error("apply", "expected environment"));
            }
            e
        }
        None => {
            st.push_root(underlying);
            st.push_root(obj);
            let e = env::make_environment(st, Value::Nil);
            st.roots.discard(2);
            e
        }
    };
    eval::combine(st, underlying, obj, env)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::State;

    fn ground_child(st: &mut State) -> Value {
        let ground = st.ground_env;
        env::make_table_environment(st, ground)
    }

    fn run_src(st: &mut State, expr: Value, env: Value) -> Value {
        st.run(expr, env).unwrap()
    }

    #[test]
    fn lambda_builds_a_callable_applicative() {
        let mut st = State::new();
        let env = ground_child(&mut st);
        // (($lambda (x) x) 42) => 42
        let lam = st.symbol("$lambda");
        let x1 = st.symbol("x");
        let x2 = st.symbol("x");
        let formals = st.list1(x1);
        let tail = st.list2(formals, x2);
        let lambda_expr = st.cons(lam, tail);
        let call_tail = st.list1(Value::Fixint(42));
        let call = st.cons(lambda_expr, call_tail);
        assert_eq!(run_src(&mut st, call, env), Value::Fixint(42));
    }

    #[test]
    fn vau_receives_operands_unevaluated_and_the_dynamic_env() {
        let mut st = State::new();
        let env = ground_child(&mut st);
        // (($vau (x) e x) (1 2)) => the literal pair (1 2), unevaluated
        let vau = st.symbol("$vau");
        let x1 = st.symbol("x");
        let e = st.symbol("e");
        let x2 = st.symbol("x");
        let formals = st.list1(x1);
        let body_and_rest = st.list1(x2);
        let rest = st.cons(e, body_and_rest);
        let tail = st.cons(formals, rest);
        let vau_expr = st.cons(vau, tail);
        let operand = st.list2(Value::Fixint(1), Value::Fixint(2));
        let call_tail = st.list1(operand);
        let call = st.cons(vau_expr, call_tail);
        let result = run_src(&mut st, call, env);
        assert!(crate::equal::eq(result, operand));
    }

    #[test]
    fn wrap_unwrap_round_trip_through_ground() {
        let mut st = State::new();
        let env = ground_child(&mut st);
        // (unwrap (wrap car)) is car's underlying... compare via eq?:
        // ($define! u (unwrap cons)) then (wrap u) applies like cons
        let unwrap_sym = st.symbol("unwrap");
        let wrap_sym = st.symbol("wrap");
        let cons_sym = st.symbol("cons");
        let inner = {
            let t = st.list1(cons_sym);
            st.cons(unwrap_sym, t)
        };
        let wrapped = {
            let t = st.list1(inner);
            st.cons(wrap_sym, t)
        };
        let call_tail = st.list2(Value::Fixint(1), Value::Fixint(2));
        let call = st.cons(wrapped, call_tail);
        let r = run_src(&mut st, call, env);
        assert!(st.heap.is_pair(r));
        assert_eq!(st.heap.car(r), Value::Fixint(1));
    }

    #[test]
    fn unwrap_rejects_operatives() {
        let mut st = State::new();
        let env = ground_child(&mut st);
        let unwrap_sym = st.symbol("unwrap");
        let if_sym = st.symbol("$if");
        let tail = st.list1(if_sym);
        let expr = st.cons(unwrap_sym, tail);
        let err = st.run(expr, env).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::Type);
    }

    #[test]
    fn apply_uses_the_evaluated_argument_list_verbatim() {
        let mut st = State::new();
        let env = ground_child(&mut st);
        // (apply list (list 1 2)) => (1 2)
        let apply_sym = st.symbol("apply");
        let list_sym = st.symbol("list");
        let list_sym2 = st.symbol("list");
        let inner = {
            let t = st.list2(Value::Fixint(1), Value::Fixint(2));
            st.cons(list_sym2, t)
        };
        let tail = st.list2(list_sym, inner);
        let expr = st.cons(apply_sym, tail);
        let r = run_src(&mut st, expr, env);
        assert_eq!(st.heap.car(r), Value::Fixint(1));
        assert_eq!(st.heap.car(st.heap.cdr(r)), Value::Fixint(2));
    }
}
