//! Pair and list ground operations.

use vau_core::Value;

use crate::args;
use crate::equal;
use crate::error::{
    Result, argc_error, immutability_error, structure_error,
};
use crate::marks;
use crate::pairs;
use crate::state::State;

/// `(cons a b)`
pub fn op_cons(st: &mut State, _x: &[Value], ptree: Value, _denv: Value) -> Result<()> {
    let (a, b) = args::take_2(st, "cons", ptree)?;
    let p = st.cons(a, b);
    st.apply_cc(p);
    Ok(())
}

/// `(car pair)`
pub fn op_car(st: &mut State, _x: &[Value], ptree: Value, _denv: Value) -> Result<()> {
    let p = args::take_1(st, "car", ptree)?;
    if !st.heap.is_pair(p) {
        return Err(crate::error::type_error("car", "expected pair"));
    }
    st.apply_cc(st.heap.car(p));
    Ok(())
}

/// `(cdr pair)`
pub fn op_cdr(st: &mut State, _x: &[Value], ptree: Value, _denv: Value) -> Result<()> {
    let p = args::take_1(st, "cdr", ptree)?;
    if !st.heap.is_pair(p) {
        return Err(crate::error::type_error("cdr", "expected pair"));
    }
    st.apply_cc(st.heap.cdr(p));
    Ok(())
}

/// `(list . args)`: the evaluated operand list is already the result.
pub fn op_list(st: &mut State, _x: &[Value], ptree: Value, _denv: Value) -> Result<()> {
    st.apply_cc(ptree);
    Ok(())
}

/// `(set-car! pair value)`
pub fn op_set_car(st: &mut State, _x: &[Value], ptree: Value, _denv: Value) -> Result<()> {
    let (p, v) = args::take_2(st, "set-car!", ptree)?;
    if !st.heap.is_pair(p) {
        return Err(crate::error::type_error("set-car!", "expected pair"));
    }
    if !st.heap.is_mutable_pair(p) {
        return Err(immutability_error("set-car!", "pair"));
    }
    st.heap.set_car(p, v);
    st.apply_cc(Value::Inert);
    Ok(())
}

/// `(set-cdr! pair value)`
pub fn op_set_cdr(st: &mut State, _x: &[Value], ptree: Value, _denv: Value) -> Result<()> {
    let (p, v) = args::take_2(st, "set-cdr!", ptree)?;
    if !st.heap.is_pair(p) {
        return Err(crate::error::type_error("set-cdr!", "expected pair"));
    }
    if !st.heap.is_mutable_pair(p) {
        return Err(immutability_error("set-cdr!", "pair"));
    }
    st.heap.set_cdr(p, v);
    st.apply_cc(Value::Inert);
    Ok(())
}

/// `(copy-es obj)` / `(copy-es-immutable obj)`, sharing one
/// implementation; the extra parameter picks the mutability of the
/// copies.
pub fn op_copy_es(st: &mut State, xparams: &[Value], ptree: Value, _denv: Value) -> Result<()> {
    let produce_mutable = xparams[0] == Value::TRUE;
    let name = if produce_mutable { "copy-es" } else { "copy-es-immutable" };
    let obj = args::take_1(st, name, ptree)?;
    let copy = pairs::copy_es(st, obj, produce_mutable);
    st.apply_cc(copy);
    Ok(())
}

/// `(list-metrics obj)` returns `(p n a c)`: pair count, nil
/// termination flag, acyclic prefix length, cycle length.
pub fn op_list_metrics(st: &mut State, _x: &[Value], ptree: Value, _denv: Value) -> Result<()> {
    let obj = args::take_1(st, "list-metrics", ptree)?;
    let (p, c, terminator) = pairs::list_metrics_raw(st, obj);
    let n = if c == 0 && terminator.is_nil() { 1 } else { 0 };
    let metrics = [
        Value::Fixint(p),
        Value::Fixint(n),
        Value::Fixint(p - c),
        Value::Fixint(c),
    ];
    let mut res = Value::Nil;
    for v in metrics.iter().rev() {
        res = st.cons(*v, res);
    }
    st.apply_cc(res);
    Ok(())
}

/// `(encycle! obj k1 k2)`
pub fn op_encycle(st: &mut State, _x: &[Value], ptree: Value, _denv: Value) -> Result<()> {
    let (obj, tk1, tk2) = args::take_3(st, "encycle!", ptree)?;
    if !tk1.is_fixint() || !tk2.is_fixint() {
        return Err(crate::error::type_error("encycle!", "expected finite integer"));
    }
    pairs::encycle(st, "encycle!", obj, tk1.fixint(), tk2.fixint())?;
    st.apply_cc(Value::Inert);
    Ok(())
}

// ---- append! -----------------------------------------------------------

/// Walk a chain of last pairs linked through their mark words, clearing
/// the marks.
fn clear_last_pairs(st: &mut State, mut ls: Value) {
    while st.heap.is_pair(ls) && marks::is_marked(&st.heap, ls) {
        let first = ls;
        ls = marks::get_mark(&st.heap, ls);
        marks::unmark(&mut st.heap, first);
    }
}

/// Collect the splice endpoints for `append!`: every non-final argument
/// must be an acyclic list with a distinct mutable last pair. The
/// result alternates `last-pair`, `next-first` so the caller can set
/// the cdrs; a cyclic argument list programs the encycling of the
/// result.
fn append_endpoints(
    st: &mut State,
    name: &str,
    lss: Value,
    mut apairs: i32,
    mut cpairs: i32,
) -> Result<Value> {
    let dummy = st.cons(Value::Inert, Value::Nil);
    st.push_root(dummy);
    let mut last_pair = dummy;
    let mut last_apair = dummy;
    let mut tail = lss;
    // chain of checked last pairs, linked through their mark words
    let mut last_pairs = Value::Nil;

    while apairs != 0 || cpairs != 0 {
        let count;
        if apairs == 0 {
            // second run of the loop: the cyclic part. Remember where
            // the acyclic part ended so the result can be encycled.
            last_apair = last_pair;
            count = cpairs;
        } else {
            count = apairs;
        }

        for _ in 0..count {
            let first = st.heap.car(tail);
            tail = st.heap.cdr(tail);

            // skip over nils
            if first.is_nil() {
                continue;
            }

            let mut ftail = first;
            let mut flastp = first;
            while st.heap.is_pair(ftail) && !marks::is_marked(&st.heap, ftail) {
                marks::mark(&mut st.heap, ftail);
                flastp = ftail;
                ftail = st.heap.cdr(ftail);
            }

            if tail.is_nil() {
                // final argument: only the repeated-last-pair check
                if st.heap.is_pair(ftail) && st.heap.cdr(ftail).is_nil() {
                    clear_last_pairs(st, last_pairs);
                    marks::unmark_list(&mut st.heap, first);
                    st.pop_root();
                    return Err(structure_error(name, "repeated last pairs"));
                }
                marks::unmark_list(&mut st.heap, first);
                let np = st.cons(first, Value::Nil);
                st.heap.set_cdr(last_pair, np);
            } else if ftail.is_nil() {
                // acyclic with a fresh last pair; check mutability
                marks::unmark_list(&mut st.heap, first);
                if !st.heap.is_mutable_pair(flastp) {
                    clear_last_pairs(st, last_pairs);
                    st.pop_root();
                    return Err(immutability_error(name, "pair"));
                }
                marks::mark_as(&mut st.heap, flastp, last_pairs);
                last_pairs = flastp;

                let np = st.cons(first, Value::Nil);
                st.heap.set_cdr(last_pair, np);
                last_pair = np;
                let np = st.cons(flastp, Value::Nil);
                st.heap.set_cdr(last_pair, np);
                last_pair = np;
            } else {
                // improper, cyclic, or sharing a last pair
                clear_last_pairs(st, last_pairs);
                marks::unmark_list(&mut st.heap, first);
                st.pop_root();
                return Err(if st.heap.is_pair(ftail) {
                    if st.heap.cdr(ftail).is_nil() {
                        structure_error(name, "repeated last pairs")
                    } else {
                        structure_error(name, "cyclic list as non last argument")
                    }
                } else {
                    structure_error(name, "improper list as non last argument")
                });
            }
        }

        if apairs != 0 {
            apairs = 0;
        } else {
            cpairs = 0;
            if !equal::eq(last_apair, last_pair) {
                // the cyclic part contributed lists: the preceding last
                // pair must point back at its first one
                let first_cpair = st.heap.car(st.heap.cdr(last_apair));
                let np = st.cons(first_cpair, Value::Nil);
                st.heap.set_cdr(last_pair, np);
            } else {
                // the whole cycle was nils
                let np = st.cons(Value::Nil, Value::Nil);
                st.heap.set_cdr(last_pair, np);
            }
        }
    }

    clear_last_pairs(st, last_pairs);
    // drop the first entry: the list pairs each last pair with the
    // following first pair
    let res = st.heap.cdr(st.heap.cdr(dummy));
    st.pop_root();
    Ok(res)
}

/// `(append! list . lists)`
pub fn op_append(st: &mut State, _x: &[Value], ptree: Value, _denv: Value) -> Result<()> {
    if ptree.is_nil() {
        return Err(argc_error("append!", "no lists"));
    }
    if !st.heap.is_pair(ptree) {
        return Err(argc_error("append!", "bad operand tree"));
    }
    let first_ls = st.heap.car(ptree);
    if first_ls.is_nil() {
        return Err(structure_error("append!", "empty first list"));
    }
    // the first list must be acyclic on its own
    pairs::check_list(st, "append!", false, first_ls)?;
    let (total, cpairs) = pairs::check_list(st, "append!", true, ptree)?;
    let apairs = total - cpairs;

    let endpoints = append_endpoints(st, "append!", ptree, apairs, cpairs)?;
    let mut e = endpoints;
    while st.heap.is_pair(e) && st.heap.is_pair(st.heap.cdr(e)) {
        let first = st.heap.car(e);
        e = st.heap.cdr(e);
        let second = st.heap.car(e);
        e = st.heap.cdr(e);
        st.heap.set_cdr(first, second);
    }
    st.apply_cc(Value::Inert);
    Ok(())
}

// ---- searching and equality --------------------------------------------

/// `(assq obj alist)`
pub fn op_assq(st: &mut State, _x: &[Value], ptree: Value, _denv: Value) -> Result<()> {
    let (obj, ls) = args::take_2(st, "assq", ptree)?;
    let (total, _c) = pairs::check_typed_list(
        st,
        "assq",
        "pair",
        |st, v| st.heap.is_pair(v),
        true,
        ls,
    )?;
    let mut tail = ls;
    let mut res = Value::Nil;
    for _ in 0..total {
        let first = st.heap.car(tail);
        if equal::eq(st.heap.car(first), obj) {
            res = first;
            break;
        }
        tail = st.heap.cdr(tail);
    }
    st.apply_cc(res);
    Ok(())
}

/// `(memq? obj list)`
pub fn op_memq(st: &mut State, _x: &[Value], ptree: Value, _denv: Value) -> Result<()> {
    let (obj, ls) = args::take_2(st, "memq?", ptree)?;
    let (total, _c) = pairs::check_list(st, "memq?", true, ls)?;
    let mut tail = ls;
    let mut res = Value::FALSE;
    for _ in 0..total {
        if equal::eq(st.heap.car(tail), obj) {
            res = Value::TRUE;
            break;
        }
        tail = st.heap.cdr(tail);
    }
    st.apply_cc(res);
    Ok(())
}

/// `(eq? . objects)`
pub fn op_eq(st: &mut State, _x: &[Value], ptree: Value, _denv: Value) -> Result<()> {
    crate::ground::ftyped_bpredp(st, "eq?", ptree, "any", |_, _| true, |_, a, b| {
        equal::eq(a, b)
    })
}

/// `(equal? . objects)`
pub fn op_equal(st: &mut State, _x: &[Value], ptree: Value, _denv: Value) -> Result<()> {
    crate::ground::ftyped_bpredp(st, "equal?", ptree, "any", |_, _| true, |st, a, b| {
        equal::equal(&st.heap, a, b)
    })
}
