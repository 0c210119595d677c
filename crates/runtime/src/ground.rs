//! The ground environment.
//!
//! Registration of every ground combiner, plus the generic helpers the
//! predicates share: `typep` (n-ary type predicate over a tag code),
//! `ftyped_predp` (type-checked n-ary predicate), and `ftyped_bpredp`
//! (type-checked chained binary predicate, cycle-aware).

use vau_core::{Tag, Value};

use crate::arithmetic;
use crate::char_ops;
use crate::combiner;
use crate::combiner_ops;
use crate::cont_ops;
use crate::control;
use crate::env;
use crate::env_ops;
use crate::error::Result;
use crate::heap::OperFn;
use crate::pair_ops;
use crate::pairs;
use crate::ports;
use crate::state::State;
use crate::string_ops;

// ---- registration helpers ----------------------------------------------

pub fn add_applicative(
    st: &mut State,
    env: Value,
    name: &'static str,
    f: OperFn,
    xparams: &[Value],
) -> Value {
    let oper = combiner::make_primitive(st, name, f, xparams);
    st.push_root(oper);
    let app = combiner::make_applicative(st, oper);
    st.push_root(app);
    let sym = st.symbol(name);
    env::add_binding(st, env, sym, app);
    st.roots.discard(2);
    app
}

pub fn add_operative(
    st: &mut State,
    env: Value,
    name: &'static str,
    f: OperFn,
    xparams: &[Value],
) -> Value {
    let oper = combiner::make_primitive(st, name, f, xparams);
    st.push_root(oper);
    let sym = st.symbol(name);
    env::add_binding(st, env, sym, oper);
    st.pop_root();
    oper
}

// ---- generic predicate shapes ------------------------------------------

/// N-ary type predicate: true iff every operand carries the tag in the
/// extra parameters. Cyclic operand lists are fine.
pub fn prim_typep(st: &mut State, xparams: &[Value], ptree: Value, _denv: Value) -> Result<()> {
    let tag = Tag::from_code(xparams[0].fixint()).expect("registered tag code");
    let (total, _c) = pairs::check_list(st, "type predicate", true, ptree)?;
    let mut res = true;
    let mut tail = ptree;
    for _ in 0..total {
        if st.heap.tag_of(st.heap.car(tail)) != tag {
            res = false;
            break;
        }
        tail = st.heap.cdr(tail);
    }
    st.apply_cc(Value::bool(res));
    Ok(())
}

/// Type-checked n-ary predicate: every operand must satisfy the type
/// check (type error otherwise); the result is the conjunction of the
/// predicate over the operands.
pub fn ftyped_predp(
    st: &mut State,
    name: &str,
    ptree: Value,
    type_name: &str,
    type_pred: impl Fn(&State, Value) -> bool,
    pred: impl Fn(&State, Value) -> bool,
) -> Result<()> {
    let (total, _c) = pairs::check_typed_list(
        st,
        name,
        type_name,
        |st, v| type_pred(st, v),
        true,
        ptree,
    )?;
    let mut res = true;
    let mut tail = ptree;
    for _ in 0..total {
        if !pred(st, st.heap.car(tail)) {
            res = false;
            break;
        }
        tail = st.heap.cdr(tail);
    }
    st.apply_cc(Value::bool(res));
    Ok(())
}

/// Type-checked chained binary predicate: true iff the relation holds
/// between every adjacent operand pair, wrapping around the cycle of a
/// cyclic operand list.
pub fn ftyped_bpredp(
    st: &mut State,
    name: &str,
    ptree: Value,
    type_name: &str,
    type_pred: impl Fn(&State, Value) -> bool,
    rel: impl Fn(&State, Value, Value) -> bool,
) -> Result<()> {
    let (total, cpairs) = pairs::check_typed_list(
        st,
        name,
        type_name,
        |st, v| type_pred(st, v),
        true,
        ptree,
    )?;
    let mut res = true;
    if total > 1 {
        let mut prev = st.heap.car(ptree);
        let mut tail = st.heap.cdr(ptree);
        for _ in 1..total {
            let cur = st.heap.car(tail);
            if !rel(st, prev, cur) {
                res = false;
                break;
            }
            prev = cur;
            tail = st.heap.cdr(tail);
        }
        if res && cpairs > 0 {
            // close the chain around the cycle entrance
            let mut entry = ptree;
            for _ in 0..(total - cpairs) {
                entry = st.heap.cdr(entry);
            }
            if !rel(st, prev, st.heap.car(entry)) {
                res = false;
            }
        }
    }
    st.apply_cc(Value::bool(res));
    Ok(())
}

fn any(_st: &State, _v: Value) -> bool {
    true
}

fn numberp(_st: &State, v: Value) -> bool {
    v.is_number()
}

fn fixintp(_st: &State, v: Value) -> bool {
    v.is_fixint()
}

fn charp(_st: &State, v: Value) -> bool {
    v.is_char()
}

fn stringp(st: &State, v: Value) -> bool {
    st.heap.is_string(v)
}

// ---- predicate operatives ----------------------------------------------

fn op_numberp(st: &mut State, _x: &[Value], ptree: Value, _denv: Value) -> Result<()> {
    ftyped_predp(st, "number?", ptree, "any", any, numberp)
}

fn op_combinerp(st: &mut State, _x: &[Value], ptree: Value, _denv: Value) -> Result<()> {
    ftyped_predp(st, "combiner?", ptree, "any", any, |st, v| {
        st.heap.is_combiner(v)
    })
}

fn op_nullp(st: &mut State, _x: &[Value], ptree: Value, _denv: Value) -> Result<()> {
    ftyped_predp(st, "null?", ptree, "any", any, |_, v| v.is_nil())
}

fn op_finitep(st: &mut State, _x: &[Value], ptree: Value, _denv: Value) -> Result<()> {
    ftyped_predp(st, "finite?", ptree, "number", numberp, fixintp)
}

fn op_integerp(st: &mut State, _x: &[Value], ptree: Value, _denv: Value) -> Result<()> {
    ftyped_predp(st, "integer?", ptree, "number", numberp, fixintp)
}

fn op_zerop(st: &mut State, _x: &[Value], ptree: Value, _denv: Value) -> Result<()> {
    ftyped_predp(st, "zero?", ptree, "number", numberp, |_, v| {
        v == Value::Fixint(0)
    })
}

fn op_positivep(st: &mut State, _x: &[Value], ptree: Value, _denv: Value) -> Result<()> {
    ftyped_predp(st, "positive?", ptree, "number", numberp, |_, v| match v {
        Value::PosInf => true,
        Value::NegInf => false,
        _ => v.fixint() > 0,
    })
}

fn op_negativep(st: &mut State, _x: &[Value], ptree: Value, _denv: Value) -> Result<()> {
    ftyped_predp(st, "negative?", ptree, "number", numberp, |_, v| match v {
        Value::PosInf => false,
        Value::NegInf => true,
        _ => v.fixint() < 0,
    })
}

fn op_oddp(st: &mut State, _x: &[Value], ptree: Value, _denv: Value) -> Result<()> {
    ftyped_predp(st, "odd?", ptree, "finite integer", fixintp, |_, v| {
        v.fixint() & 1 != 0
    })
}

fn op_evenp(st: &mut State, _x: &[Value], ptree: Value, _denv: Value) -> Result<()> {
    ftyped_predp(st, "even?", ptree, "finite integer", fixintp, |_, v| {
        v.fixint() & 1 == 0
    })
}

fn op_num_eq(st: &mut State, _x: &[Value], ptree: Value, _denv: Value) -> Result<()> {
    ftyped_bpredp(st, "=?", ptree, "number", numberp, |_, a, b| {
        arithmetic::num_eqp(a, b)
    })
}

fn op_num_lt(st: &mut State, _x: &[Value], ptree: Value, _denv: Value) -> Result<()> {
    ftyped_bpredp(st, "<?", ptree, "number", numberp, |_, a, b| {
        arithmetic::num_ltp(a, b)
    })
}

fn op_num_le(st: &mut State, _x: &[Value], ptree: Value, _denv: Value) -> Result<()> {
    ftyped_bpredp(st, "<=?", ptree, "number", numberp, |_, a, b| {
        arithmetic::num_lep(a, b)
    })
}

fn op_num_gt(st: &mut State, _x: &[Value], ptree: Value, _denv: Value) -> Result<()> {
    ftyped_bpredp(st, ">?", ptree, "number", numberp, |_, a, b| {
        arithmetic::num_gtp(a, b)
    })
}

fn op_num_ge(st: &mut State, _x: &[Value], ptree: Value, _denv: Value) -> Result<()> {
    ftyped_bpredp(st, ">=?", ptree, "number", numberp, |_, a, b| {
        arithmetic::num_gep(a, b)
    })
}

fn op_char_alphabeticp(st: &mut State, _x: &[Value], ptree: Value, _denv: Value) -> Result<()> {
    ftyped_predp(st, "char-alphabetic?", ptree, "char", charp, |_, v| {
        char_ops::char_alphabeticp(v)
    })
}

fn op_char_numericp(st: &mut State, _x: &[Value], ptree: Value, _denv: Value) -> Result<()> {
    ftyped_predp(st, "char-numeric?", ptree, "char", charp, |_, v| {
        char_ops::char_numericp(v)
    })
}

fn op_char_whitespacep(st: &mut State, _x: &[Value], ptree: Value, _denv: Value) -> Result<()> {
    ftyped_predp(st, "char-whitespace?", ptree, "char", charp, |_, v| {
        char_ops::char_whitespacep(v)
    })
}

fn op_char_upper_casep(st: &mut State, _x: &[Value], ptree: Value, _denv: Value) -> Result<()> {
    ftyped_predp(st, "char-upper-case?", ptree, "char", charp, |_, v| {
        char_ops::char_upper_casep(v)
    })
}

fn op_char_lower_casep(st: &mut State, _x: &[Value], ptree: Value, _denv: Value) -> Result<()> {
    ftyped_predp(st, "char-lower-case?", ptree, "char", charp, |_, v| {
        char_ops::char_lower_casep(v)
    })
}

fn op_string_eq(st: &mut State, _x: &[Value], ptree: Value, _denv: Value) -> Result<()> {
    ftyped_bpredp(st, "string=?", ptree, "string", stringp, string_ops::string_eqp)
}

fn op_string_lt(st: &mut State, _x: &[Value], ptree: Value, _denv: Value) -> Result<()> {
    ftyped_bpredp(st, "string<?", ptree, "string", stringp, string_ops::string_ltp)
}

fn op_string_le(st: &mut State, _x: &[Value], ptree: Value, _denv: Value) -> Result<()> {
    ftyped_bpredp(st, "string<=?", ptree, "string", stringp, string_ops::string_lep)
}

fn op_string_gt(st: &mut State, _x: &[Value], ptree: Value, _denv: Value) -> Result<()> {
    ftyped_bpredp(st, "string>?", ptree, "string", stringp, string_ops::string_gtp)
}

fn op_string_ge(st: &mut State, _x: &[Value], ptree: Value, _denv: Value) -> Result<()> {
    ftyped_bpredp(st, "string>=?", ptree, "string", stringp, string_ops::string_gep)
}

fn op_string_ci_eq(st: &mut State, _x: &[Value], ptree: Value, _denv: Value) -> Result<()> {
    ftyped_bpredp(st, "string-ci=?", ptree, "string", stringp, string_ops::string_ci_eqp)
}

fn op_string_ci_lt(st: &mut State, _x: &[Value], ptree: Value, _denv: Value) -> Result<()> {
    ftyped_bpredp(st, "string-ci<?", ptree, "string", stringp, string_ops::string_ci_ltp)
}

fn op_string_ci_le(st: &mut State, _x: &[Value], ptree: Value, _denv: Value) -> Result<()> {
    ftyped_bpredp(st, "string-ci<=?", ptree, "string", stringp, string_ops::string_ci_lep)
}

fn op_string_ci_gt(st: &mut State, _x: &[Value], ptree: Value, _denv: Value) -> Result<()> {
    ftyped_bpredp(st, "string-ci>?", ptree, "string", stringp, string_ops::string_ci_gtp)
}

fn op_string_ci_ge(st: &mut State, _x: &[Value], ptree: Value, _denv: Value) -> Result<()> {
    ftyped_bpredp(st, "string-ci>=?", ptree, "string", stringp, string_ops::string_ci_gep)
}

// ---- the table ---------------------------------------------------------

fn add_type_pred(st: &mut State, env: Value, name: &'static str, tag: Tag) {
    add_applicative(st, env, name, prim_typep, &[Value::Fixint(tag as i32)]);
}

/// Populate the ground environment. Runs once, from `State::new`.
pub fn init_ground(st: &mut State) {
    let ground = st.ground_env;

    // type predicates
    add_type_pred(st, ground, "boolean?", Tag::Bool);
    add_type_pred(st, ground, "symbol?", Tag::Symbol);
    add_type_pred(st, ground, "inert?", Tag::Inert);
    add_type_pred(st, ground, "ignore?", Tag::Ignore);
    add_type_pred(st, ground, "pair?", Tag::Pair);
    add_type_pred(st, ground, "environment?", Tag::Environment);
    add_type_pred(st, ground, "operative?", Tag::Operative);
    add_type_pred(st, ground, "applicative?", Tag::Applicative);
    add_type_pred(st, ground, "continuation?", Tag::Continuation);
    add_type_pred(st, ground, "string?", Tag::String);
    add_type_pred(st, ground, "char?", Tag::Char);
    add_type_pred(st, ground, "port?", Tag::Port);
    add_applicative(st, ground, "null?", op_nullp, &[]);
    add_applicative(st, ground, "number?", op_numberp, &[]);
    add_applicative(st, ground, "combiner?", op_combinerp, &[]);

    // equality
    add_applicative(st, ground, "eq?", pair_ops::op_eq, &[]);
    add_applicative(st, ground, "equal?", pair_ops::op_equal, &[]);

    // control
    add_operative(st, ground, "$if", control::op_if, &[]);
    add_operative(st, ground, "$sequence", control::op_sequence, &[]);

    // pairs and lists
    add_applicative(st, ground, "cons", pair_ops::op_cons, &[]);
    add_applicative(st, ground, "car", pair_ops::op_car, &[]);
    add_applicative(st, ground, "cdr", pair_ops::op_cdr, &[]);
    let list_app = add_applicative(st, ground, "list", pair_ops::op_list, &[]);
    st.list_app = list_app;
    add_applicative(st, ground, "set-car!", pair_ops::op_set_car, &[]);
    add_applicative(st, ground, "set-cdr!", pair_ops::op_set_cdr, &[]);
    add_applicative(st, ground, "copy-es", pair_ops::op_copy_es, &[Value::TRUE]);
    add_applicative(
        st,
        ground,
        "copy-es-immutable",
        pair_ops::op_copy_es,
        &[Value::FALSE],
    );
    add_applicative(st, ground, "list-metrics", pair_ops::op_list_metrics, &[]);
    add_applicative(st, ground, "encycle!", pair_ops::op_encycle, &[]);
    add_applicative(st, ground, "append!", pair_ops::op_append, &[]);
    add_applicative(st, ground, "assq", pair_ops::op_assq, &[]);
    add_applicative(st, ground, "memq?", pair_ops::op_memq, &[]);

    // environments
    add_applicative(st, ground, "eval", env_ops::op_eval, &[]);
    add_applicative(st, ground, "make-environment", env_ops::op_make_environment, &[]);
    add_operative(st, ground, "$define!", env_ops::op_define, &[]);
    add_operative(st, ground, "$binds?", env_ops::op_bindsp, &[]);
    add_applicative(
        st,
        ground,
        "get-current-environment",
        env_ops::op_get_current_environment,
        &[],
    );
    add_applicative(
        st,
        ground,
        "make-kernel-standard-environment",
        env_ops::op_make_kernel_standard_environment,
        &[],
    );
    let sym = st.symbol("$let");
    add_operative(st, ground, "$let", env_ops::op_let, &[sym]);
    let sym = st.symbol("$let*");
    add_operative(st, ground, "$let*", env_ops::op_let_star, &[sym]);
    let sym = st.symbol("$letrec");
    add_operative(st, ground, "$letrec", env_ops::op_letrec, &[sym]);
    let sym = st.symbol("$letrec*");
    add_operative(st, ground, "$letrec*", env_ops::op_letrec_star, &[sym]);
    let sym = st.symbol("$let-redirect");
    add_operative(st, ground, "$let-redirect", env_ops::op_let_redirect, &[sym]);
    let sym = st.symbol("$let-safe");
    add_operative(st, ground, "$let-safe", env_ops::op_let_safe, &[sym]);
    add_operative(st, ground, "$remote-eval", env_ops::op_remote_eval, &[]);
    add_operative(
        st,
        ground,
        "$bindings->environment",
        env_ops::op_bindings_to_environment,
        &[],
    );

    // combiners
    add_operative(st, ground, "$vau", combiner_ops::op_vau, &[]);
    add_operative(st, ground, "$lambda", combiner_ops::op_lambda, &[]);
    add_applicative(st, ground, "wrap", combiner_ops::op_wrap, &[]);
    add_applicative(st, ground, "unwrap", combiner_ops::op_unwrap, &[]);
    add_applicative(st, ground, "apply", combiner_ops::op_apply, &[]);

    // continuations and errors
    add_applicative(st, ground, "call/cc", cont_ops::op_call_cc, &[]);
    add_applicative(
        st,
        ground,
        "continuation->applicative",
        cont_ops::op_continuation_to_applicative,
        &[],
    );
    add_applicative(
        st,
        ground,
        "make-keyed-static-variable",
        cont_ops::op_make_keyed_static_variable,
        &[],
    );
    add_applicative(st, ground, "error", cont_ops::op_error, &[]);

    // numbers
    add_applicative(st, ground, "finite?", op_finitep, &[]);
    add_applicative(st, ground, "integer?", op_integerp, &[]);
    add_applicative(st, ground, "=?", op_num_eq, &[]);
    add_applicative(st, ground, "<?", op_num_lt, &[]);
    add_applicative(st, ground, "<=?", op_num_le, &[]);
    add_applicative(st, ground, ">?", op_num_gt, &[]);
    add_applicative(st, ground, ">=?", op_num_ge, &[]);
    add_applicative(st, ground, "+", arithmetic::op_plus, &[]);
    add_applicative(st, ground, "*", arithmetic::op_times, &[]);
    add_applicative(st, ground, "-", arithmetic::op_minus, &[]);
    add_applicative(st, ground, "zero?", op_zerop, &[]);
    add_applicative(st, ground, "positive?", op_positivep, &[]);
    add_applicative(st, ground, "negative?", op_negativep, &[]);
    add_applicative(st, ground, "odd?", op_oddp, &[]);
    add_applicative(st, ground, "even?", op_evenp, &[]);
    add_applicative(st, ground, "abs", arithmetic::op_abs, &[]);
    let sym = st.symbol("min");
    add_applicative(st, ground, "min", arithmetic::op_min_max, &[sym, Value::TRUE]);
    let sym = st.symbol("max");
    add_applicative(st, ground, "max", arithmetic::op_min_max, &[sym, Value::FALSE]);
    add_applicative(st, ground, "gcd", arithmetic::op_gcd, &[]);
    add_applicative(st, ground, "lcm", arithmetic::op_lcm, &[]);
    let sym = st.symbol("div");
    add_applicative(
        st,
        ground,
        "div",
        arithmetic::op_div_mod,
        &[sym, Value::Fixint(arithmetic::FDIV_DIV)],
    );
    let sym = st.symbol("mod");
    add_applicative(
        st,
        ground,
        "mod",
        arithmetic::op_div_mod,
        &[sym, Value::Fixint(arithmetic::FDIV_MOD)],
    );
    let sym = st.symbol("div-and-mod");
    add_applicative(
        st,
        ground,
        "div-and-mod",
        arithmetic::op_div_mod,
        &[sym, Value::Fixint(arithmetic::FDIV_DIV | arithmetic::FDIV_MOD)],
    );
    let sym = st.symbol("div0");
    add_applicative(
        st,
        ground,
        "div0",
        arithmetic::op_div_mod,
        &[sym, Value::Fixint(arithmetic::FDIV_DIV | arithmetic::FDIV_ZERO)],
    );
    let sym = st.symbol("mod0");
    add_applicative(
        st,
        ground,
        "mod0",
        arithmetic::op_div_mod,
        &[sym, Value::Fixint(arithmetic::FDIV_MOD | arithmetic::FDIV_ZERO)],
    );
    let sym = st.symbol("div0-and-mod0");
    add_applicative(
        st,
        ground,
        "div0-and-mod0",
        arithmetic::op_div_mod,
        &[
            sym,
            Value::Fixint(arithmetic::FDIV_DIV | arithmetic::FDIV_MOD | arithmetic::FDIV_ZERO),
        ],
    );

    // strings
    add_applicative(st, ground, "make-string", string_ops::op_make_string, &[]);
    add_applicative(st, ground, "string-length", string_ops::op_string_length, &[]);
    add_applicative(st, ground, "string-ref", string_ops::op_string_ref, &[]);
    add_applicative(st, ground, "string-set!", string_ops::op_string_set, &[]);
    add_applicative(st, ground, "string", string_ops::op_string, &[]);
    add_applicative(st, ground, "string=?", op_string_eq, &[]);
    add_applicative(st, ground, "string<?", op_string_lt, &[]);
    add_applicative(st, ground, "string<=?", op_string_le, &[]);
    add_applicative(st, ground, "string>?", op_string_gt, &[]);
    add_applicative(st, ground, "string>=?", op_string_ge, &[]);
    add_applicative(st, ground, "string-ci=?", op_string_ci_eq, &[]);
    add_applicative(st, ground, "string-ci<?", op_string_ci_lt, &[]);
    add_applicative(st, ground, "string-ci<=?", op_string_ci_le, &[]);
    add_applicative(st, ground, "string-ci>?", op_string_ci_gt, &[]);
    add_applicative(st, ground, "string-ci>=?", op_string_ci_ge, &[]);
    add_applicative(st, ground, "substring", string_ops::op_substring, &[]);
    add_applicative(st, ground, "string-append", string_ops::op_string_append, &[]);
    add_applicative(st, ground, "string->list", string_ops::op_string_to_list, &[]);
    add_applicative(st, ground, "list->string", string_ops::op_list_to_string, &[]);
    add_applicative(st, ground, "string-copy", string_ops::op_string_copy, &[]);
    add_applicative(
        st,
        ground,
        "string->immutable-string",
        string_ops::op_string_to_immutable_string,
        &[],
    );
    add_applicative(st, ground, "string-fill!", string_ops::op_string_fill, &[]);
    add_applicative(st, ground, "symbol->string", string_ops::op_symbol_to_string, &[]);
    add_applicative(st, ground, "string->symbol", string_ops::op_string_to_symbol, &[]);

    // chars
    add_applicative(st, ground, "char-alphabetic?", op_char_alphabeticp, &[]);
    add_applicative(st, ground, "char-numeric?", op_char_numericp, &[]);
    add_applicative(st, ground, "char-whitespace?", op_char_whitespacep, &[]);
    add_applicative(st, ground, "char-upper-case?", op_char_upper_casep, &[]);
    add_applicative(st, ground, "char-lower-case?", op_char_lower_casep, &[]);
    add_applicative(st, ground, "char->integer", char_ops::op_char_to_integer, &[]);
    add_applicative(st, ground, "integer->char", char_ops::op_integer_to_char, &[]);

    // ports
    add_applicative(st, ground, "open-input-file", ports::op_open_input_file, &[]);
    add_applicative(st, ground, "open-output-file", ports::op_open_output_file, &[]);
    add_applicative(st, ground, "close-port", ports::op_close_port, &[]);
    add_applicative(st, ground, "read-char", ports::op_read_char, &[]);
    add_applicative(st, ground, "write-char", ports::op_write_char, &[]);
    add_applicative(st, ground, "eof?", ports::op_eofp, &[]);
}
