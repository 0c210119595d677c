//! Cycle-aware list walking and copying.
//!
//! Lists may be improper (non-nil terminator) or cyclic, and every
//! walker here measures, validates, or copies them without diverging.
//! The walkers mark each visited pair with its visit index; hitting a
//! marked pair identifies the cycle and its length. All marks are
//! cleared before returning, on the error paths included.

use vau_core::Value;

use crate::error::{Result, structure_error, type_error};
use crate::marks;
use crate::state::State;

/// Copy states for the structural copy's state-byte stack.
const ST_PUSH: u8 = 0;
const ST_CAR: u8 = 1;
const ST_CDR: u8 = 2;

/// Walk the cdr chain of `obj` and return
/// `(total_pairs, cycle_pairs, terminator)`. The terminator is `Nil`
/// for cyclic chains (there is none to report). Never fails.
pub fn list_metrics_raw(st: &mut State, obj: Value) -> (i32, i32, Value) {
    let mut tail = obj;
    let mut pairs: i32 = 0;
    let mut cpairs: i32 = 0;
    let mut terminator = obj;
    while st.heap.is_pair(tail) {
        if marks::is_marked(&st.heap, tail) {
            cpairs = pairs - marks::get_mark(&st.heap, tail).fixint();
            terminator = Value::Nil;
            break;
        }
        marks::mark_as(&mut st.heap, tail, Value::Fixint(pairs));
        pairs += 1;
        tail = st.heap.cdr(tail);
        terminator = tail;
    }
    marks::unmark_list(&mut st.heap, obj);
    (pairs, cpairs, terminator)
}

/// Require `obj` to be a list: nil-terminated, and acyclic unless
/// `allow_cycles`. Returns `(total_pairs, cycle_pairs)`.
pub fn check_list(
    st: &mut State,
    name: &str,
    allow_cycles: bool,
    obj: Value,
) -> Result<(i32, i32)> {
    let (pairs, cpairs, terminator) = list_metrics_raw(st, obj);
    if cpairs == 0 && !terminator.is_nil() {
        return Err(structure_error(name, "expected list"));
    }
    if cpairs != 0 && !allow_cycles {
        return Err(structure_error(name, "expected finite list"));
    }
    Ok((pairs, cpairs))
}

/// `check_list` plus a per-element type check.
pub fn check_typed_list(
    st: &mut State,
    name: &str,
    type_name: &str,
    pred: impl Fn(&State, Value) -> bool,
    allow_cycles: bool,
    obj: Value,
) -> Result<(i32, i32)> {
    let (pairs, cpairs) = check_list(st, name, allow_cycles, obj)?;
    let mut tail = obj;
    for _ in 0..pairs {
        let first = st.heap.car(tail);
        if !pred(st, first) {
            return Err(type_error(name, &format!("expected {type_name}")));
        }
        tail = st.heap.cdr(tail);
    }
    Ok((pairs, cpairs))
}

/// Copy the spine of a list, sharing the elements. A cyclic source
/// produces an equally cyclic copy. Returns the copy and the metrics.
pub fn check_copy_list(
    st: &mut State,
    name: &str,
    allow_cycles: bool,
    obj: Value,
) -> Result<(Value, i32, i32)> {
    let (pairs, cpairs) = check_list(st, name, allow_cycles, obj)?;
    if pairs == 0 {
        return Ok((Value::Nil, 0, 0));
    }
    st.push_root(obj);
    let dummy = st.cons(Value::Inert, Value::Nil);
    st.push_root(dummy);
    let mut last = dummy;
    let mut tail = obj;
    for _ in 0..pairs {
        let new_pair = st.cons(st.heap.car(tail), Value::Nil);
        st.heap.set_cdr(last, new_pair);
        last = new_pair;
        tail = st.heap.cdr(tail);
    }
    let copy = st.heap.cdr(dummy);
    if cpairs > 0 {
        // splice the copy's cycle at the same offset
        let mut entry = copy;
        for _ in 0..(pairs - cpairs) {
            entry = st.heap.cdr(entry);
        }
        st.heap.set_cdr(last, entry);
    }
    st.roots.discard(2);
    Ok((copy, pairs, cpairs))
}

/// Produce a structure isomorphic to the pair skeleton of `obj`,
/// sharing every non-pair leaf, preserving cycles and shared subtrees.
///
/// The traversal is driven by the explicit work stack plus a state-byte
/// stack (push / car-done / cdr-done). A pair visited for the first
/// time is marked with its freshly allocated copy; later visits reuse
/// that copy, which is what keeps sharing and cycles intact. Original
/// cars and cdrs are untouched, and every mark is cleared on exit.
///
/// With `produce_mutable` false the copies are immutable, and pairs
/// that are already immutable are shared instead of copied; with it
/// true every pair is copied mutable (the `copy-es` behavior).
pub fn copy_es(st: &mut State, obj: Value, produce_mutable: bool) -> Value {
    let mut copy = obj;

    st.push_root(obj);
    let saved_w = st.wstack.len();
    let saved_tb = st.tbstack.len();

    st.wstack.push(obj);
    st.tbstack.push(ST_PUSH);

    while st.wstack.len() > saved_w {
        let state = st.tbstack.pop().expect("state-byte stack in step with work stack");
        let top = st.wstack.pop().expect("work stack non-empty");

        if state == ST_PUSH {
            if st.heap.is_pair(top) && (produce_mutable || st.heap.is_mutable_pair(top)) {
                if marks::is_marked(&st.heap, top) {
                    // already seen, reuse the same copy
                    copy = marks::get_mark(&st.heap, top);
                } else {
                    let new_pair = st.cons_g(produce_mutable, Value::Inert, Value::Inert);
                    marks::mark_as(&mut st.heap, top, new_pair);
                    // revisit for the car, then descend
                    st.wstack.push(top);
                    st.tbstack.push(ST_CAR);
                    st.wstack.push(st.heap.car(top));
                    st.tbstack.push(ST_PUSH);
                }
            } else {
                copy = top;
            }
        } else {
            let new_pair = marks::get_mark(&st.heap, top);
            if state == ST_CAR {
                st.heap.set_car(new_pair, copy);
                // revisit for the cdr, then descend
                st.wstack.push(top);
                st.tbstack.push(ST_CDR);
                st.wstack.push(st.heap.cdr(top));
                st.tbstack.push(ST_PUSH);
            } else {
                st.heap.set_cdr(new_pair, copy);
                copy = new_pair;
            }
        }
    }

    debug_assert_eq!(st.tbstack.len(), saved_tb);
    marks::unmark_tree(&mut st.heap, obj);
    st.pop_root();
    copy
}

/// Splice a cycle into a mutable list: advance `k1` pairs, then `k2 - 1`
/// further pairs, and point the last pair's cdr back at the pair after
/// the prefix, forming a cycle of length `k2`. With `k2 = 0` the first
/// `k1` pairs are still validated and nothing is mutated.
pub fn encycle(st: &mut State, name: &str, obj: Value, k1: i32, k2: i32) -> Result<()> {
    use crate::error::{immutability_error, range_error};

    if k1 < 0 || k2 < 0 {
        return Err(range_error(name, "negative index"));
    }

    let mut tail = obj;
    let mut k = k1;
    while k > 0 {
        if !st.heap.is_pair(tail) {
            marks::unmark_list(&mut st.heap, obj);
            return Err(range_error(name, "non pair found while traversing object"));
        }
        if marks::is_marked(&st.heap, tail) {
            marks::unmark_list(&mut st.heap, obj);
            return Err(range_error(name, "too few pairs in cyclic list"));
        }
        marks::mark(&mut st.heap, tail);
        tail = st.heap.cdr(tail);
        k -= 1;
    }

    let first_cycle_pair = tail;

    if k2 != 0 {
        let mut k = k2 - 1;
        while k > 0 {
            if !st.heap.is_pair(tail) {
                marks::unmark_list(&mut st.heap, obj);
                return Err(range_error(name, "non pair found while traversing object"));
            }
            if marks::is_marked(&st.heap, tail) {
                marks::unmark_list(&mut st.heap, obj);
                return Err(range_error(name, "too few pairs in cyclic list"));
            }
            marks::mark(&mut st.heap, tail);
            tail = st.heap.cdr(tail);
            k -= 1;
        }
        if !st.heap.is_pair(tail) {
            marks::unmark_list(&mut st.heap, obj);
            return Err(range_error(name, "non pair found while traversing object"));
        }
        if !st.heap.is_mutable_pair(tail) {
            marks::unmark_list(&mut st.heap, obj);
            return Err(immutability_error(name, "pair"));
        }
        st.heap.set_cdr(tail, first_cycle_pair);
    }
    marks::unmark_list(&mut st.heap, obj);
    Ok(())
}
