//! Combiner records.
//!
//! A combiner is an operative or an applicative. Operatives are either
//! primitive (a native function plus an extra-parameter array fixed at
//! construction) or derived (the product of `$vau`: parameter tree,
//! environment formal, body, and captured static environment, all
//! immutable). An applicative is a wrapper around one underlying
//! combiner.

use vau_core::Value;

use crate::error::{Result, type_error};
use crate::heap::{ApplicativeData, ObjData, OperFn, OperKind, OperativeData};
use crate::state::State;

pub fn make_primitive(st: &mut State, name: &'static str, f: OperFn, xparams: &[Value]) -> Value {
    st.alloc_raw(
        ObjData::Operative(OperativeData {
            kind: OperKind::Primitive {
                name,
                f,
                xparams: xparams.to_vec().into_boxed_slice(),
            },
        }),
        0,
        xparams,
    )
}

pub fn make_derived(
    st: &mut State,
    ptree: Value,
    eformal: Value,
    body: Value,
    senv: Value,
) -> Value {
    st.alloc_raw(
        ObjData::Operative(OperativeData {
            kind: OperKind::Derived {
                ptree,
                eformal,
                body,
                senv,
            },
        }),
        0,
        &[ptree, eformal, body, senv],
    )
}

/// `wrap`: a fresh applicative over `underlying`.
pub fn make_applicative(st: &mut State, underlying: Value) -> Value {
    st.alloc_raw(
        ObjData::Applicative(ApplicativeData { underlying }),
        0,
        &[underlying],
    )
}

/// `unwrap`: the underlying combiner of an applicative.
pub fn unwrap(st: &State, name: &str, app: Value) -> Result<Value> {
    if st.heap.is_applicative(app) {
        Ok(st.heap.applicative(app).underlying)
    } else {
        Err(type_error(name, "expected applicative"))
    }
}
