//! Read-eval tests over literal source text, plus reader/writer round
//! trips.

use vau_reader::{read_all, write_value};
use vau_runtime::{ErrorKind, State, Value, env};

fn eval_src(st: &mut State, e: Value, src: &str) -> Result<Value, vau_runtime::Error> {
    let datums = read_all(st, src).expect("source reads");
    // later datums must survive collections triggered by earlier ones
    for &d in &datums {
        st.push_root(d);
    }
    let mut last = Ok(Value::Inert);
    for &d in &datums {
        last = st.run(d, e);
        if last.is_err() {
            break;
        }
    }
    st.roots.discard(datums.len());
    last
}

fn std_env(st: &mut State) -> Value {
    let ground = st.ground_env;
    env::make_table_environment(st, ground)
}

#[test]
fn let_scenario() {
    let mut st = State::new();
    let e = std_env(&mut st);
    let r = eval_src(&mut st, e, "($let ((x 1) (y 2)) (+ x y))").unwrap();
    assert_eq!(r, Value::Fixint(3));
}

#[test]
fn letrec_factorial_scenario() {
    let mut st = State::new();
    let e = std_env(&mut st);
    let r = eval_src(
        &mut st,
        e,
        "($letrec ((f ($lambda (n) ($if (=? n 0) 1 (* n (f (- n 1))))))) (f 5))",
    )
    .unwrap();
    assert_eq!(r, Value::Fixint(120));
}

#[test]
fn sequence_set_car_scenario() {
    let mut st = State::new();
    let e = std_env(&mut st);
    let r = eval_src(
        &mut st,
        e,
        "($define! l (list 1 2 3)) ($sequence (set-car! l 9) #inert)",
    )
    .unwrap();
    assert_eq!(r, Value::Inert);
    let r = eval_src(&mut st, e, "l").unwrap();
    assert_eq!(write_value(&st.heap, r), "(9 2 3)");
}

#[test]
fn copy_es_immutable_cycle_scenario() {
    let mut st = State::new();
    let e = std_env(&mut st);
    let r = eval_src(&mut st, e, "(copy-es-immutable #0=(1 2 . #0#))").unwrap();
    assert_eq!(st.heap.car(r), Value::Fixint(1));
    let second = st.heap.cdr(r);
    assert_eq!(st.heap.car(second), Value::Fixint(2));
    assert!(vau_runtime::equal::eq(st.heap.cdr(second), r));
    assert!(!st.heap.is_mutable_pair(r));
    assert_eq!(write_value(&st.heap, r), "#0=(1 2 . #0#)");
}

#[test]
fn gcd_lcm_scenarios() {
    let mut st = State::new();
    let e = std_env(&mut st);
    assert_eq!(
        eval_src(&mut st, e, "(gcd 0 0 0)").unwrap_err().kind,
        ErrorKind::NoPrimaryValue
    );
    assert_eq!(eval_src(&mut st, e, "(gcd)").unwrap(), Value::PosInf);
    assert_eq!(
        eval_src(&mut st, e, "(lcm 3 0)").unwrap_err().kind,
        ErrorKind::NoPrimaryValue
    );
    assert_eq!(eval_src(&mut st, e, "(lcm)").unwrap(), Value::Fixint(1));
}

#[test]
fn remote_eval_unbound_scenario() {
    let mut st = State::new();
    let e = std_env(&mut st);
    let err = eval_src(&mut st, e, "($remote-eval x (make-environment))").unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnboundSymbol);
    assert!(err.can_continue);
}

#[test]
fn cyclic_plus_scenarios() {
    let mut st = State::new();
    let e = std_env(&mut st);
    assert_eq!(
        eval_src(&mut st, e, "(+ 1 1 1 . #0=(0 . #0#))").unwrap(),
        Value::Fixint(3)
    );
    assert_eq!(
        eval_src(&mut st, e, "(+ 1 . #0=(1 . #0#))").unwrap(),
        Value::PosInf
    );
    assert_eq!(
        eval_src(&mut st, e, "(+ 1 . #0=(1 -1 . #0#))").unwrap_err().kind,
        ErrorKind::NoPrimaryValue
    );
}

#[test]
fn let_family_through_source() {
    let mut st = State::new();
    let e = std_env(&mut st);
    assert_eq!(
        eval_src(&mut st, e, "($let* ((x 1) (y (+ x 1))) (* x y))").unwrap(),
        Value::Fixint(2)
    );
    assert_eq!(
        eval_src(
            &mut st,
            e,
            "($letrec* ((f ($lambda (n) ($if (=? n 0) 0 (g (- n 1)))))
                        (g ($lambda (n) ($if (=? n 0) 7 (g (- n 1))))))
               (g 3))"
        )
        .unwrap(),
        Value::Fixint(7)
    );
    assert_eq!(
        eval_src(
            &mut st,
            e,
            "($let-redirect (make-kernel-standard-environment) ((x 5)) (+ x 1))"
        )
        .unwrap(),
        Value::Fixint(6)
    );
    assert_eq!(
        eval_src(&mut st, e, "($let-safe ((x 2)) (* x x))").unwrap(),
        Value::Fixint(4)
    );
    let env_val = eval_src(&mut st, e, "($bindings->environment (x 9))").unwrap();
    assert!(st.heap.is_environment(env_val));
    assert_eq!(
        eval_src(&mut st, e, "(eval (list + 1 2) (make-kernel-standard-environment))").unwrap(),
        Value::Fixint(3)
    );
}

#[test]
fn writer_round_trips_through_reader() {
    let mut st = State::new();
    for src in [
        "(1 2 3)",
        "(1 . 2)",
        "#0=(1 2 . #0#)",
        "(#0=(9) #0#)",
        "(a \"str\" #\\x #t #e-infinity)",
    ] {
        let datums = read_all(&mut st, src).unwrap();
        st.push_root(datums[0]);
        let printed = write_value(&st.heap, datums[0]);
        let again = read_all(&mut st, &printed).unwrap();
        st.pop_root();
        assert!(
            vau_runtime::equal::equal(&st.heap, datums[0], again[0]),
            "round trip of {src} via {printed}"
        );
    }
}

#[test]
fn binds_and_keyed_through_source() {
    let mut st = State::new();
    let e = std_env(&mut st);
    assert_eq!(
        eval_src(&mut st, e, "($binds? (get-current-environment) list cons)").unwrap(),
        Value::TRUE
    );
    let r = eval_src(
        &mut st,
        e,
        "($define! (b a) (make-keyed-static-variable))
         (eval (list a) (b 42 (get-current-environment)))",
    )
    .unwrap();
    assert_eq!(r, Value::Fixint(42));
}
