//! Structural equality.
//!
//! `eq?` is bit equality on immediates and handle equality on boxed
//! values. `equal?` is defined co-inductively over the pair skeleton:
//! two values are equal when they have the same shape and every leaf
//! position is equal. Cyclic graphs must not diverge, so the
//! co-traversal keeps a side table of pair pairs already assumed equal
//! (the hash-table variant of the mark-based co-traversal).
//!
//! Leaves compare by `eq?`, except strings (byte-wise) and symbols
//! (name-wise) — symbols are not interned, so equal-named symbols are
//! `equal?` without being `eq?`.

use std::collections::HashSet;

use vau_core::{Tag, Value};

use crate::heap::Heap;

/// Reference equality.
pub fn eq(a: Value, b: Value) -> bool {
    a == b
}

/// Structural equality, cycle-safe.
pub fn equal(heap: &Heap, a: Value, b: Value) -> bool {
    let mut assumed: HashSet<(Value, Value)> = HashSet::new();
    let mut stack = vec![(a, b)];
    while let Some((x, y)) = stack.pop() {
        if eq(x, y) {
            continue;
        }
        let (tx, ty) = (heap.tag_of(x), heap.tag_of(y));
        if tx != ty {
            return false;
        }
        match tx {
            Tag::Pair => {
                // Co-inductive step: assume the pair equal and check
                // the halves; revisiting the assumption terminates the
                // cycle instead of diverging.
                if !assumed.insert((x, y)) {
                    continue;
                }
                stack.push((heap.cdr(x), heap.cdr(y)));
                stack.push((heap.car(x), heap.car(y)));
            }
            Tag::String => {
                if heap.str_data(x).bytes != heap.str_data(y).bytes {
                    return false;
                }
            }
            Tag::Symbol => {
                if heap.sym_str(x) != heap.sym_str(y) {
                    return false;
                }
            }
            // Everything else is equal only when eq?, which was
            // already checked.
            _ => return false,
        }
    }
    true
}
