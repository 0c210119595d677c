//! End-to-end evaluator tests: the interpreter is driven through
//! programmatically built expressions against a standard environment.

use vau_runtime::{ErrorKind, State, Value, env, equal, pairs};

/// Tiny expression builder for the tests.
enum S {
    I(i32),
    B(bool),
    Sym(&'static str),
    L(Vec<S>),
}

use S::{B, I, L, Sym};

fn build(st: &mut State, s: &S) -> Value {
    match s {
        I(n) => Value::Fixint(*n),
        B(b) => Value::Bool(*b),
        Sym(name) => st.symbol(name),
        L(items) => {
            let mut tail = Value::Nil;
            for item in items.iter().rev() {
                st.push_root(tail);
                let v = build(st, item);
                let head = st.cons(v, tail);
                st.pop_root();
                tail = head;
            }
            tail
        }
    }
}

fn eval_s(st: &mut State, env: Value, s: S) -> Result<Value, vau_runtime::Error> {
    st.push_root(env);
    let expr = build(st, &s);
    st.pop_root();
    st.run(expr, env)
}

fn std_env(st: &mut State) -> Value {
    let ground = st.ground_env;
    env::make_table_environment(st, ground)
}

#[test]
fn scenario_let_adds_bindings() {
    let mut st = State::new();
    let e = std_env(&mut st);
    // ($let ((x 1) (y 2)) (+ x y)) => 3
    let r = eval_s(
        &mut st,
        e,
        L(vec![
            Sym("$let"),
            L(vec![L(vec![Sym("x"), I(1)]), L(vec![Sym("y"), I(2)])]),
            L(vec![Sym("+"), Sym("x"), Sym("y")]),
        ]),
    )
    .unwrap();
    assert_eq!(r, Value::Fixint(3));
}

#[test]
fn scenario_letrec_factorial() {
    let mut st = State::new();
    let e = std_env(&mut st);
    // ($letrec ((f ($lambda (n) ($if (=? n 0) 1 (* n (f (- n 1))))))) (f 5))
    let r = eval_s(
        &mut st,
        e,
        L(vec![
            Sym("$letrec"),
            L(vec![L(vec![
                Sym("f"),
                L(vec![
                    Sym("$lambda"),
                    L(vec![Sym("n")]),
                    L(vec![
                        Sym("$if"),
                        L(vec![Sym("=?"), Sym("n"), I(0)]),
                        I(1),
                        L(vec![
                            Sym("*"),
                            Sym("n"),
                            L(vec![Sym("f"), L(vec![Sym("-"), Sym("n"), I(1)])]),
                        ]),
                    ]),
                ]),
            ])]),
            L(vec![Sym("f"), I(5)]),
        ]),
    )
    .unwrap();
    assert_eq!(r, Value::Fixint(120));
}

#[test]
fn scenario_set_car_on_fresh_list() {
    let mut st = State::new();
    let e = std_env(&mut st);
    // ($sequence (set-car! (list 1 2 3) 9) #inert) — with the list
    // named so the mutation is observable
    let r = eval_s(
        &mut st,
        e,
        L(vec![
            Sym("$sequence"),
            L(vec![Sym("$define!"), Sym("l"), L(vec![Sym("list"), I(1), I(2), I(3)])]),
            L(vec![Sym("set-car!"), Sym("l"), I(9)]),
        ]),
    )
    .unwrap();
    assert_eq!(r, Value::Inert);
    let l_sym = st.symbol("l");
    let l = env::get_binding(&mut st, e, l_sym).unwrap();
    let expected = build(&mut st, &L(vec![I(9), I(2), I(3)]));
    assert!(equal::equal(&st.heap, l, expected));
}

#[test]
fn scenario_copy_es_immutable_preserves_cycles() {
    let mut st = State::new();
    // p = (cons 1 (cons 2 p)) via encycle
    let p2 = st.cons(Value::Fixint(2), Value::Nil);
    let p = st.cons(Value::Fixint(1), p2);
    st.heap.set_cdr(p2, p);

    let copy = pairs::copy_es(&mut st, p, false);
    assert_eq!(st.heap.car(copy), Value::Fixint(1));
    let second = st.heap.cdr(copy);
    assert_eq!(st.heap.car(second), Value::Fixint(2));
    assert!(equal::eq(st.heap.cdr(second), copy));
    assert!(!st.heap.is_mutable_pair(copy));
    assert!(!st.heap.is_mutable_pair(second));
    // equal? is a fixed point under copy-es-immutable
    assert!(equal::equal(&st.heap, p, copy));
}

#[test]
fn scenario_gcd_lcm_edge_cases() {
    let mut st = State::new();
    let e = std_env(&mut st);
    assert_eq!(
        eval_s(&mut st, e, L(vec![Sym("gcd"), I(0), I(0), I(0)]))
            .unwrap_err()
            .kind,
        ErrorKind::NoPrimaryValue
    );
    assert_eq!(eval_s(&mut st, e, L(vec![Sym("gcd")])).unwrap(), Value::PosInf);
    assert_eq!(
        eval_s(&mut st, e, L(vec![Sym("lcm"), I(3), I(0)]))
            .unwrap_err()
            .kind,
        ErrorKind::NoPrimaryValue
    );
    assert_eq!(eval_s(&mut st, e, L(vec![Sym("lcm")])).unwrap(), Value::Fixint(1));
}

#[test]
fn scenario_remote_eval_unbound_symbol() {
    let mut st = State::new();
    let e = std_env(&mut st);
    // ($remote-eval x (make-environment)) where x is unbound
    let err = eval_s(
        &mut st,
        e,
        L(vec![
            Sym("$remote-eval"),
            Sym("x"),
            L(vec![Sym("make-environment")]),
        ]),
    )
    .unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnboundSymbol);
    assert!(err.can_continue);
}

#[test]
fn deep_tail_recursion_does_not_grow_the_host_stack() {
    let mut st = State::new();
    let e = std_env(&mut st);
    // ($letrec ((loop ($lambda (n) ($if (=? n 0) 42 (loop (- n 1))))))
    //   (loop 100000))
    let r = eval_s(
        &mut st,
        e,
        L(vec![
            Sym("$letrec"),
            L(vec![L(vec![
                Sym("loop"),
                L(vec![
                    Sym("$lambda"),
                    L(vec![Sym("n")]),
                    L(vec![
                        Sym("$if"),
                        L(vec![Sym("=?"), Sym("n"), I(0)]),
                        I(42),
                        L(vec![Sym("loop"), L(vec![Sym("-"), Sym("n"), I(1)])]),
                    ]),
                ]),
            ])]),
            L(vec![Sym("loop"), I(100_000)]),
        ]),
    )
    .unwrap();
    assert_eq!(r, Value::Fixint(42));
}

#[test]
fn sequence_tail_position_is_flat() {
    let mut st = State::new();
    let e = std_env(&mut st);
    // a long $sequence evaluates left to right and returns the last
    let mut body = vec![Sym("$sequence")];
    for _ in 0..1000 {
        body.push(I(1));
    }
    body.push(I(7));
    let r = eval_s(&mut st, e, L(body)).unwrap();
    assert_eq!(r, Value::Fixint(7));
}

#[test]
fn collection_during_evaluation_preserves_live_data() {
    let mut st = State::new();
    let e = std_env(&mut st);
    // force a collection on nearly every allocation
    st.heap.set_threshold(1);
    let r = eval_s(
        &mut st,
        e,
        L(vec![
            Sym("$letrec"),
            L(vec![L(vec![
                Sym("f"),
                L(vec![
                    Sym("$lambda"),
                    L(vec![Sym("n")]),
                    L(vec![
                        Sym("$if"),
                        L(vec![Sym("=?"), Sym("n"), I(0)]),
                        L(vec![Sym("list"), I(1), I(2)]),
                        L(vec![Sym("f"), L(vec![Sym("-"), Sym("n"), I(1)])]),
                    ]),
                ]),
            ])]),
            L(vec![Sym("f"), I(50)]),
        ]),
    )
    .unwrap();
    st.push_root(r);
    let expected = build(&mut st, &L(vec![I(1), I(2)]));
    st.pop_root();
    assert!(equal::equal(&st.heap, r, expected));
}

#[test]
fn vau_receives_operands_raw_and_env_formal_binds_denv() {
    let mut st = State::new();
    let e = std_env(&mut st);
    // ($sequence
    //   ($define! quote-ish ($vau (a b) denv b))
    //   (quote-ish (1 2) (3 4)))
    // => the literal pair (3 4)
    let r = eval_s(
        &mut st,
        e,
        L(vec![
            Sym("$sequence"),
            L(vec![
                Sym("$define!"),
                Sym("quote-ish"),
                L(vec![Sym("$vau"), L(vec![Sym("a"), Sym("b")]), Sym("denv"), Sym("b")]),
            ]),
            L(vec![Sym("quote-ish"), L(vec![I(1), I(2)]), L(vec![I(3), I(4)])]),
        ]),
    )
    .unwrap();
    let expected = build(&mut st, &L(vec![I(3), I(4)]));
    assert!(equal::equal(&st.heap, r, expected));

    // ($sequence ($define! get-env ($vau () denv denv))
    //            (environment? (get-env)))
    let r = eval_s(
        &mut st,
        e,
        L(vec![
            Sym("$sequence"),
            L(vec![
                Sym("$define!"),
                Sym("get-env"),
                L(vec![Sym("$vau"), L(vec![]), Sym("denv"), Sym("denv")]),
            ]),
            L(vec![Sym("environment?"), L(vec![Sym("get-env")])]),
        ]),
    )
    .unwrap();
    assert_eq!(r, Value::Bool(true));
}

#[test]
fn error_restores_shadow_stack_depths() {
    let mut st = State::new();
    let e = std_env(&mut st);
    let before = st.roots.depth();
    let _ = eval_s(
        &mut st,
        e,
        L(vec![Sym("$let"), L(vec![L(vec![Sym("x"), Sym("unbound-here")])]), Sym("x")]),
    )
    .unwrap_err();
    assert_eq!(st.roots.depth(), before);
    assert!(st.wstack.is_empty());
    // the interpreter keeps working afterwards
    let r = eval_s(&mut st, e, L(vec![Sym("+"), I(1), I(2)])).unwrap();
    assert_eq!(r, Value::Fixint(3));
}
