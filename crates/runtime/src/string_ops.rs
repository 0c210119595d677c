//! String ground operations, plus the symbol/string conversions.
//!
//! Strings are byte sequences in the ASCII range. Operations that build
//! new strings return mutable ones, except where the canonical shared
//! empty string or an already-immutable input can be returned as is.

use vau_core::{FIXINT_MAX, Value};

use crate::args;
use crate::error::{Result, immutability_error, range_error, type_error};
use crate::pairs;
use crate::state::State;

fn expect_string(st: &State, name: &str, v: Value) -> Result<()> {
    if st.heap.is_string(v) {
        Ok(())
    } else {
        Err(type_error(name, "expected string"))
    }
}

/// `(make-string k [char])`
pub fn op_make_string(st: &mut State, _x: &[Value], ptree: Value, _denv: Value) -> Result<()> {
    let (k, maybe_fill) = args::take_1_opt(st, "make-string", ptree)?;
    let fill = match maybe_fill {
        None => b' ',
        Some(Value::Char(c)) => c,
        Some(_) => return Err(type_error("make-string", "expected char")),
    };
    let len = match k {
        Value::Fixint(n) if n >= 0 => n as usize,
        Value::Fixint(_) => return Err(range_error("make-string", "negative size")),
        _ => return Err(type_error("make-string", "expected finite integer")),
    };
    let s = st.string_filled(len, fill);
    st.apply_cc(s);
    Ok(())
}

/// `(string-length string)`
pub fn op_string_length(st: &mut State, _x: &[Value], ptree: Value, _denv: Value) -> Result<()> {
    let s = args::take_1(st, "string-length", ptree)?;
    expect_string(st, "string-length", s)?;
    st.apply_cc(Value::Fixint(st.heap.str_len(s) as i32));
    Ok(())
}

/// `(string-ref string k)`
pub fn op_string_ref(st: &mut State, _x: &[Value], ptree: Value, _denv: Value) -> Result<()> {
    let (s, k) = args::take_2(st, "string-ref", ptree)?;
    expect_string(st, "string-ref", s)?;
    let i = match k {
        Value::Fixint(i) => i,
        _ => return Err(type_error("string-ref", "expected finite integer")),
    };
    if i < 0 || i as usize >= st.heap.str_len(s) {
        return Err(range_error("string-ref", "index out of bounds"));
    }
    let b = st.heap.str_data(s).bytes[i as usize];
    st.apply_cc(Value::Char(b));
    Ok(())
}

/// `(string-set! string k char)`
pub fn op_string_set(st: &mut State, _x: &[Value], ptree: Value, _denv: Value) -> Result<()> {
    let (s, k, c) = args::take_3(st, "string-set!", ptree)?;
    expect_string(st, "string-set!", s)?;
    if st.heap.is_immutable_string(s) {
        return Err(immutability_error("string-set!", "string"));
    }
    let i = match k {
        Value::Fixint(i) => i,
        _ => return Err(type_error("string-set!", "expected finite integer")),
    };
    let ch = match c {
        Value::Char(ch) => ch,
        _ => return Err(type_error("string-set!", "expected char")),
    };
    if i < 0 || i as usize >= st.heap.str_len(s) {
        return Err(range_error("string-set!", "index out of bounds"));
    }
    st.heap.str_data_mut(s).bytes[i as usize] = ch;
    st.apply_cc(Value::Inert);
    Ok(())
}

/// Shared by `string` and `list->string`: the chars must form a finite
/// acyclic list.
fn list_to_string(st: &mut State, name: &str, ls: Value) -> Result<Value> {
    let (total, _c) = pairs::check_typed_list(
        st,
        name,
        "char",
        |_, v| v.is_char(),
        false,
        ls,
    )?;
    if total == 0 {
        return Ok(st.heap.empty_string());
    }
    let mut bytes = Vec::with_capacity(total as usize);
    let mut tail = ls;
    for _ in 0..total {
        match st.heap.car(tail) {
            Value::Char(c) => bytes.push(c),
            _ => unreachable!("typed list checked above"),
        }
        tail = st.heap.cdr(tail);
    }
    Ok(st.string(&bytes))
}

/// `(string . chars)`
pub fn op_string(st: &mut State, _x: &[Value], ptree: Value, _denv: Value) -> Result<()> {
    let s = list_to_string(st, "string", ptree)?;
    st.apply_cc(s);
    Ok(())
}

/// `(list->string chars)`
pub fn op_list_to_string(st: &mut State, _x: &[Value], ptree: Value, _denv: Value) -> Result<()> {
    let ls = args::take_1(st, "list->string", ptree)?;
    let s = list_to_string(st, "list->string", ls)?;
    st.apply_cc(s);
    Ok(())
}

/// `(string->list string)`
pub fn op_string_to_list(st: &mut State, _x: &[Value], ptree: Value, _denv: Value) -> Result<()> {
    let s = args::take_1(st, "string->list", ptree)?;
    expect_string(st, "string->list", s)?;
    let bytes = st.heap.str_data(s).bytes.clone();
    let mut res = Value::Nil;
    for &b in bytes.iter().rev() {
        res = st.cons(Value::Char(b), res);
    }
    st.apply_cc(res);
    Ok(())
}

/// `(substring string start end)`
pub fn op_substring(st: &mut State, _x: &[Value], ptree: Value, _denv: Value) -> Result<()> {
    let (s, tv_start, tv_end) = args::take_3(st, "substring", ptree)?;
    expect_string(st, "substring", s)?;
    let len = st.heap.str_len(s) as i32;
    let start = match tv_start {
        Value::Fixint(i) if i >= 0 && i <= len => i,
        _ => return Err(range_error("substring", "start index out of bounds")),
    };
    let end = match tv_end {
        Value::Fixint(i) if i >= 0 && i <= len => i,
        _ => return Err(range_error("substring", "end index out of bounds")),
    };
    if start > end {
        return Err(range_error("substring", "end index is smaller than start index"));
    }
    let bytes = st.heap.str_data(s).bytes[start as usize..end as usize].to_vec();
    let res = st.string(&bytes);
    st.apply_cc(res);
    Ok(())
}

/// `(string-append . strings)`
pub fn op_string_append(st: &mut State, _x: &[Value], ptree: Value, _denv: Value) -> Result<()> {
    let (total, _c) = pairs::check_typed_list(
        st,
        "string-append",
        "string",
        |st, v| st.heap.is_string(v),
        false,
        ptree,
    )?;
    let mut size: i64 = 0;
    let mut tail = ptree;
    for _ in 0..total {
        size += st.heap.str_len(st.heap.car(tail)) as i64;
        if size > FIXINT_MAX as i64 {
            return Err(range_error("string-append", "resulting string is too big"));
        }
        tail = st.heap.cdr(tail);
    }
    let mut bytes = Vec::with_capacity(size as usize);
    let mut tail = ptree;
    for _ in 0..total {
        bytes.extend_from_slice(&st.heap.str_data(st.heap.car(tail)).bytes);
        tail = st.heap.cdr(tail);
    }
    let res = st.string(&bytes);
    st.apply_cc(res);
    Ok(())
}

/// `(string-copy string)`
pub fn op_string_copy(st: &mut State, _x: &[Value], ptree: Value, _denv: Value) -> Result<()> {
    let s = args::take_1(st, "string-copy", ptree)?;
    expect_string(st, "string-copy", s)?;
    let res = if crate::equal::eq(s, st.heap.empty_string()) {
        s
    } else {
        let bytes = st.heap.str_data(s).bytes.clone();
        st.string(&bytes)
    };
    st.apply_cc(res);
    Ok(())
}

/// `(string->immutable-string string)`
pub fn op_string_to_immutable_string(
    st: &mut State,
    _x: &[Value],
    ptree: Value,
    _denv: Value,
) -> Result<()> {
    let s = args::take_1(st, "string->immutable-string", ptree)?;
    expect_string(st, "string->immutable-string", s)?;
    let res = if st.heap.is_immutable_string(s) {
        s
    } else {
        let bytes = st.heap.str_data(s).bytes.clone();
        st.string_imm(&bytes)
    };
    st.apply_cc(res);
    Ok(())
}

/// `(string-fill! string char)`
pub fn op_string_fill(st: &mut State, _x: &[Value], ptree: Value, _denv: Value) -> Result<()> {
    let (s, c) = args::take_2(st, "string-fill!", ptree)?;
    expect_string(st, "string-fill!", s)?;
    if st.heap.is_immutable_string(s) {
        return Err(immutability_error("string-fill!", "string"));
    }
    let ch = match c {
        Value::Char(ch) => ch,
        _ => return Err(type_error("string-fill!", "expected char")),
    };
    st.heap.str_data_mut(s).bytes.fill(ch);
    st.apply_cc(Value::Inert);
    Ok(())
}

/// `(symbol->string symbol)`: symbol names are immutable strings, so
/// the name itself comes back.
pub fn op_symbol_to_string(st: &mut State, _x: &[Value], ptree: Value, _denv: Value) -> Result<()> {
    let sym = args::take_1(st, "symbol->string", ptree)?;
    if !st.heap.is_symbol(sym) {
        return Err(type_error("symbol->string", "expected symbol"));
    }
    let name = st.heap.symbol_data(sym).name;
    st.apply_cc(Value::Obj(name));
    Ok(())
}

/// `(string->symbol string)`
pub fn op_string_to_symbol(st: &mut State, _x: &[Value], ptree: Value, _denv: Value) -> Result<()> {
    let s = args::take_1(st, "string->symbol", ptree)?;
    expect_string(st, "string->symbol", s)?;
    let name = String::from_utf8_lossy(&st.heap.str_data(s).bytes).into_owned();
    let sym = st.symbol(&name);
    st.apply_cc(sym);
    Ok(())
}

// ---- comparison predicates (used through the chained helper) -----------

pub fn string_eqp(st: &State, a: Value, b: Value) -> bool {
    crate::equal::eq(a, b) || st.heap.str_data(a).bytes == st.heap.str_data(b).bytes
}

pub fn string_ltp(st: &State, a: Value, b: Value) -> bool {
    st.heap.str_data(a).bytes < st.heap.str_data(b).bytes
}

pub fn string_lep(st: &State, a: Value, b: Value) -> bool {
    !string_ltp(st, b, a)
}

pub fn string_gtp(st: &State, a: Value, b: Value) -> bool {
    string_ltp(st, b, a)
}

pub fn string_gep(st: &State, a: Value, b: Value) -> bool {
    !string_ltp(st, a, b)
}

fn lower(bytes: &[u8]) -> Vec<u8> {
    bytes.iter().map(|b| b.to_ascii_lowercase()).collect()
}

pub fn string_ci_eqp(st: &State, a: Value, b: Value) -> bool {
    lower(&st.heap.str_data(a).bytes) == lower(&st.heap.str_data(b).bytes)
}

pub fn string_ci_ltp(st: &State, a: Value, b: Value) -> bool {
    lower(&st.heap.str_data(a).bytes) < lower(&st.heap.str_data(b).bytes)
}

pub fn string_ci_lep(st: &State, a: Value, b: Value) -> bool {
    !string_ci_ltp(st, b, a)
}

pub fn string_ci_gtp(st: &State, a: Value, b: Value) -> bool {
    string_ci_ltp(st, b, a)
}

pub fn string_ci_gep(st: &State, a: Value, b: Value) -> bool {
    !string_ci_ltp(st, a, b)
}
