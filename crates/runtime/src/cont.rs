//! First-class continuations.
//!
//! A continuation is an immutable parent-linked record: the native
//! function to run when a value arrives, its extra parameters, and the
//! dynamic environment captured at creation. The root continuation has
//! no parent and terminates the trampoline.
//!
//! The ancestry probe marks one chain, walks the other, and always
//! clears its marks before returning; it is the seam where
//! dynamic-wind-style interception would attach, though this core
//! installs no interceptors.

use vau_core::Value;

use crate::error::Result;
use crate::heap::{ContData, ContFn, flags};
use crate::state::State;

/// Never invoked: the trampoline returns when the root continuation
/// (parent `Nil`) receives a value.
pub fn do_root(_st: &mut State, _xparams: &[Value], _value: Value) -> Result<()> {
    panic!("root continuation invoked");
}

pub fn make_continuation(
    st: &mut State,
    parent: Value,
    name: &'static str,
    f: ContFn,
    xparams: &[Value],
    denv: Value,
) -> Value {
    st.alloc_cont(ContData {
        parent,
        name,
        f,
        xparams: xparams.to_vec().into_boxed_slice(),
        denv,
    })
}

/// Create a child of the current continuation and install it as the
/// new current continuation. The usual way a primitive adds a frame
/// before tail-evaluating.
pub fn push_continuation(
    st: &mut State,
    name: &'static str,
    f: ContFn,
    xparams: &[Value],
    denv: Value,
) -> Value {
    let parent = st.cc();
    let c = make_continuation(st, parent, name, f, xparams, denv);
    st.set_cc(c);
    c
}

/// True iff `c1` is reachable from `c2` by following parent links
/// (including `c1 == c2`).
pub fn is_ancestor(st: &mut State, c1: Value, c2: Value) -> bool {
    // mark c1's chain
    let mut c = c1;
    while !c.is_nil() {
        st.heap.set_obj_flag(c, flags::MARKED);
        c = st.heap.cont(c).parent;
    }
    // walk c2's chain looking for a marked record
    let mut found = false;
    let mut c = c2;
    while !c.is_nil() {
        if st.heap.obj_flags(c) & flags::MARKED != 0 {
            found = true;
            break;
        }
        c = st.heap.cont(c).parent;
    }
    // always clear the marks before returning
    let mut c = c1;
    while !c.is_nil() {
        st.heap.clear_obj_flag(c, flags::MARKED);
        c = st.heap.cont(c).parent;
    }
    found
}

/// Transfer control: abandon the current chain and deliver `value` to
/// `cont`. The ancestry probe decides which records are being exited
/// and which entered; with no interceptors installed the answer does
/// not change the transfer.
pub fn apply_continuation(st: &mut State, cont: Value, value: Value) -> Result<()> {
    let current = st.cc();
    let _exiting_current = !is_ancestor(st, cont, current);
    st.set_cc(cont);
    st.apply_cc(value);
    Ok(())
}
