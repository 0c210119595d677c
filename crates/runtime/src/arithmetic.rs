//! Numeric ground operations over fixints and the exact infinities.
//!
//! `+`, `*`, and `-` are loop-aware: a cyclic argument list is summed
//! (or multiplied) over its acyclic prefix plus one revolution of the
//! cycle, and the cycle's contribution decides the result — an exactly
//! zero cycle of zeros keeps the acyclic value, a zero cycle with
//! non-zero elements has no primary value, and otherwise the cycle
//! diverges to the signed infinity.
//!
//! # Overflow
//!
//! Fixints are 30-bit; the report leaves overflow of `+ - *` undefined.
//! Here intermediate accumulation is exact in the host's 64-bit
//! integers and the final value wraps into the fixint range
//! (two's-complement modulo 2^30).

use vau_core::{Value, fixint_wrap};

use crate::args;
use crate::error::{Result, arith_error, no_primary_value, type_error};
use crate::pairs;
use crate::state::State;

fn is_number(_st: &State, v: Value) -> bool {
    v.is_number()
}

fn zerop(v: Value) -> bool {
    v == Value::Fixint(0)
}

fn onep(v: Value) -> bool {
    v == Value::Fixint(1)
}

// ---- comparisons (registered through the chained-predicate helper) -----

pub fn num_eqp(a: Value, b: Value) -> bool {
    a == b
}

pub fn num_ltp(a: Value, b: Value) -> bool {
    if a.is_fixint() && b.is_fixint() {
        a.fixint() < b.fixint()
    } else {
        a != b && (a == Value::NegInf || b == Value::PosInf)
    }
}

pub fn num_lep(a: Value, b: Value) -> bool {
    if a.is_fixint() && b.is_fixint() {
        a.fixint() <= b.fixint()
    } else {
        a == b || a == Value::NegInf || b == Value::PosInf
    }
}

pub fn num_gtp(a: Value, b: Value) -> bool {
    num_ltp(b, a)
}

pub fn num_gep(a: Value, b: Value) -> bool {
    num_lep(b, a)
}

// ---- + * - -------------------------------------------------------------

/// Accumulated walk shared by `+` and the subtrahend sum of `-`:
/// returns the sum of `apairs` elements then `cpairs` elements of the
/// cycle, combined per the report.
fn sum_with_cycle(
    st: &mut State,
    name: &str,
    mut tail: Value,
    apairs: i32,
    cpairs: i32,
) -> Result<Value> {
    // acyclic part
    let mut ares = Value::Fixint(0);
    let mut accum: i64 = 0;
    let mut seen_infinity = false;
    for _ in 0..apairs {
        let first = st.heap.car(tail);
        tail = st.heap.cdr(tail);
        if first.is_einf() {
            if seen_infinity && first != ares {
                return Err(no_primary_value(name));
            }
            seen_infinity = true;
            ares = first;
        } else if !seen_infinity {
            accum += first.fixint() as i64;
        }
    }
    if !seen_infinity {
        ares = Value::Fixint(fixint_wrap(accum));
    }

    if cpairs == 0 {
        return Ok(ares);
    }

    // one revolution of the cycle
    let mut cres = Value::Fixint(0);
    let mut all_zero = true;
    seen_infinity = false;
    accum = 0;
    for _ in 0..cpairs {
        let first = st.heap.car(tail);
        tail = st.heap.cdr(tail);
        all_zero = all_zero && zerop(first);
        if first.is_einf() {
            if seen_infinity && first != cres {
                return Err(no_primary_value(name));
            }
            seen_infinity = true;
            cres = first;
        } else if !seen_infinity {
            accum += first.fixint() as i64;
        }
    }
    if !seen_infinity {
        if accum == 0 {
            if !all_zero {
                return Err(no_primary_value(name));
            }
            cres = Value::Fixint(0);
        } else {
            cres = if accum < 0 { Value::NegInf } else { Value::PosInf };
        }
    }

    if ares.is_einf() {
        if !cres.is_einf() || ares == cres {
            Ok(ares)
        } else {
            Err(no_primary_value(name))
        }
    } else if cres.is_einf() {
        Ok(cres)
    } else {
        Ok(Value::Fixint(fixint_wrap(
            ares.fixint() as i64 + cres.fixint() as i64,
        )))
    }
}

/// `(+ . numbers)`
pub fn op_plus(st: &mut State, _x: &[Value], ptree: Value, _denv: Value) -> Result<()> {
    let (pairs, cpairs) =
        pairs::check_typed_list(st, "+", "number", is_number, true, ptree)?;
    let res = sum_with_cycle(st, "+", ptree, pairs - cpairs, cpairs)?;
    st.apply_cc(res);
    Ok(())
}

/// `(- first . numbers)`: at least two operands; the sum of the rest is
/// subtracted from the first.
pub fn op_minus(st: &mut State, _x: &[Value], ptree: Value, _denv: Value) -> Result<()> {
    if !st.heap.is_pair(ptree) || !st.heap.is_pair(st.heap.cdr(ptree)) {
        return Err(crate::error::argc_error("-", "at least two values are required"));
    }
    let first_val = st.heap.car(ptree);
    if !first_val.is_number() {
        return Err(type_error("-", "bad type on first argument (expected number)"));
    }
    let rest = st.heap.cdr(ptree);
    let (pairs, cpairs) =
        pairs::check_typed_list(st, "-", "number", is_number, true, rest)?;
    let sum = sum_with_cycle(st, "-", rest, pairs - cpairs, cpairs)?;

    let res = if first_val.is_einf() {
        if !sum.is_einf() || first_val != sum {
            first_val
        } else {
            return Err(no_primary_value("-"));
        }
    } else if sum.is_einf() {
        sum.neg_inf()
    } else {
        Value::Fixint(fixint_wrap(first_val.fixint() as i64 - sum.fixint() as i64))
    };
    st.apply_cc(res);
    Ok(())
}

/// `(* . numbers)`
pub fn op_times(st: &mut State, _x: &[Value], ptree: Value, _denv: Value) -> Result<()> {
    let (pairs, cpairs) =
        pairs::check_typed_list(st, "*", "number", is_number, true, ptree)?;
    let apairs = pairs - cpairs;
    let mut tail = ptree;

    // acyclic part: accum tracks the finite factor (and so the sign)
    let mut ares = Value::Fixint(1);
    let mut accum: i64 = 1;
    let mut seen_zero = false;
    let mut seen_infinity = false;
    for _ in 0..apairs {
        let first = st.heap.car(tail);
        tail = st.heap.cdr(tail);
        if first.is_einf() {
            if seen_zero {
                return Err(no_primary_value("*"));
            }
            if !seen_infinity {
                seen_infinity = true;
                ares = first;
            } else if first == Value::NegInf {
                ares = ares.neg_inf();
            }
        } else if first.fixint() == 0 {
            if seen_infinity {
                return Err(no_primary_value("*"));
            }
            seen_zero = true;
            accum = 0;
        } else if !seen_zero {
            accum = accum.wrapping_mul(first.fixint() as i64);
        }
    }
    if seen_infinity {
        if accum < 0 {
            ares = ares.neg_inf();
        }
    } else {
        ares = Value::Fixint(fixint_wrap(accum));
    }

    let res = if cpairs == 0 {
        ares
    } else {
        // one revolution of the cycle; the infinite product it stands
        // for decides the contribution
        let mut cres = Value::Fixint(1);
        let mut all_one = true;
        seen_zero = false;
        seen_infinity = false;
        accum = 1;
        for _ in 0..cpairs {
            let first = st.heap.car(tail);
            tail = st.heap.cdr(tail);
            all_one = all_one && onep(first);
            if first.is_einf() {
                if seen_zero {
                    return Err(no_primary_value("*"));
                }
                if !seen_infinity {
                    seen_infinity = true;
                    cres = first;
                } else if first == Value::NegInf {
                    cres = cres.neg_inf();
                }
            } else if zerop(first) {
                if seen_infinity {
                    return Err(no_primary_value("*"));
                }
                seen_zero = true;
                accum = 0;
            } else if !seen_zero {
                accum = accum.wrapping_mul(first.fixint() as i64);
            }
        }

        if seen_infinity {
            if accum < 0 {
                cres = cres.neg_inf();
            }
        } else if seen_zero || accum == 0 {
            cres = Value::Fixint(0);
        } else if accum == 1 {
            if all_one {
                cres = Value::Fixint(1);
            } else {
                return Err(no_primary_value("*"));
            }
        } else if accum > 1 {
            cres = Value::PosInf;
        } else {
            return Err(no_primary_value("*"));
        }

        if ares.is_einf() {
            if cres.is_einf() {
                if cres == ares { Value::PosInf } else { Value::NegInf }
            } else if cres.fixint() == 0 {
                return Err(no_primary_value("*"));
            } else if cres.fixint() < 0 {
                ares.neg_inf()
            } else {
                ares
            }
        } else if cres.is_einf() {
            if ares.fixint() == 0 {
                return Err(no_primary_value("*"));
            } else if ares.fixint() < 0 {
                cres.neg_inf()
            } else {
                cres
            }
        } else {
            Value::Fixint(fixint_wrap(ares.fixint() as i64 * cres.fixint() as i64))
        }
    };
    st.apply_cc(res);
    Ok(())
}

// ---- abs, min/max ------------------------------------------------------

/// `(abs number)`
pub fn op_abs(st: &mut State, _x: &[Value], ptree: Value, _denv: Value) -> Result<()> {
    let n = args::take_1(st, "abs", ptree)?;
    let res = match n {
        Value::Fixint(i) => {
            if i < 0 {
                Value::Fixint(fixint_wrap(-(i as i64)))
            } else {
                n
            }
        }
        Value::PosInf | Value::NegInf => Value::PosInf,
        _ => return Err(type_error("abs", "expected number")),
    };
    st.apply_cc(res);
    Ok(())
}

/// `(min . numbers)` / `(max . numbers)`: the extra parameters carry
/// the name symbol and the min/max flag. With no operands the identity
/// infinity comes back; the opposite infinity short-circuits.
pub fn op_min_max(st: &mut State, xparams: &[Value], ptree: Value, _denv: Value) -> Result<()> {
    let name = st.heap.sym_str(xparams[0]).to_string();
    let minp = xparams[1] == Value::TRUE;
    let (total, _c) = pairs::check_typed_list(st, &name, "number", is_number, true, ptree)?;

    let (mut res, break_val) = if minp {
        (Value::PosInf, Value::NegInf)
    } else {
        (Value::NegInf, Value::PosInf)
    };
    let mut one_finite = false;
    let mut tail = ptree;
    for _ in 0..total {
        let first = st.heap.car(tail);
        tail = st.heap.cdr(tail);
        if first.is_einf() {
            if first == break_val {
                res = first;
                break;
            }
        } else if !one_finite {
            res = first;
            one_finite = true;
        } else if minp {
            if first.fixint() < res.fixint() {
                res = first;
            }
        } else if first.fixint() > res.fixint() {
            res = first;
        }
    }
    st.apply_cc(res);
    Ok(())
}

// ---- div/mod family ----------------------------------------------------

pub const FDIV_ZERO: i32 = 1;
pub const FDIV_DIV: i32 = 2;
pub const FDIV_MOD: i32 = 4;

/// Euclidean division, plain (`0 <= mod < |d|`) or zero-centred
/// (`-|d|/2 <= mod0 < |d|/2`).
fn div_mod(zero_centred: bool, n: i64, d: i64) -> (i64, i64) {
    let mut div = n / d;
    let mut modv = n % d;
    if zero_centred {
        let dabs = (d.abs() + 1) / 2;
        if modv < -dabs {
            if d < 0 {
                modv -= d;
                div += 1;
            } else {
                modv += d;
                div -= 1;
            }
        } else if modv >= dabs {
            if d < 0 {
                modv += d;
                div -= 1;
            } else {
                modv -= d;
                div += 1;
            }
        }
    } else if modv < 0 {
        if d < 0 {
            modv -= d;
            div += 1;
        } else {
            modv += d;
            div -= 1;
        }
    }
    (div, modv)
}

/// `div` / `mod` / `div-and-mod` and the zero-centred variants, fanned
/// out by the flag word in the extra parameters.
pub fn op_div_mod(st: &mut State, xparams: &[Value], ptree: Value, _denv: Value) -> Result<()> {
    let name = st.heap.sym_str(xparams[0]).to_string();
    let flags = xparams[1].fixint();

    let (n, d) = args::take_2(st, &name, ptree)?;
    if !n.is_number() || !d.is_number() {
        return Err(type_error(&name, "expected number"));
    }

    let (tv_div, tv_mod) = if zerop(d) {
        return Err(arith_error(&name, "division by zero"));
    } else if n.is_einf() {
        return Err(arith_error(&name, "non finite dividend"));
    } else if d.is_einf() {
        // quotient is an infinity with the usual sign rule, zero rest
        let negative = (n.fixint() < 0) != (d == Value::NegInf);
        (
            if negative { Value::NegInf } else { Value::PosInf },
            Value::Fixint(0),
        )
    } else {
        let (div, modv) = div_mod(
            flags & FDIV_ZERO != 0,
            n.fixint() as i64,
            d.fixint() as i64,
        );
        (
            Value::Fixint(fixint_wrap(div)),
            Value::Fixint(fixint_wrap(modv)),
        )
    };

    let res = if flags & FDIV_DIV != 0 {
        if flags & FDIV_MOD != 0 {
            st.list2(tv_div, tv_mod)
        } else {
            tv_div
        }
    } else {
        tv_mod
    };
    st.apply_cc(res);
    Ok(())
}

// ---- gcd / lcm ---------------------------------------------------------

fn gcd2(a: i64, b: i64) -> i64 {
    let (mut a, mut b) = (a.abs(), b.abs());
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

/// `(gcd . numbers)`: no operands is `+infinity`, zeros only has no
/// primary value, infinities alone also come back as `+infinity`.
pub fn op_gcd(st: &mut State, _x: &[Value], ptree: Value, _denv: Value) -> Result<()> {
    let (total, _c) = pairs::check_typed_list(st, "gcd", "number", is_number, true, ptree)?;

    let res = if total > 0 {
        let mut seen_zero = false;
        let mut seen_finite_non_zero = false;
        let mut finite_gcd: i64 = 0;
        let mut tail = ptree;
        for _ in 0..total {
            let first = st.heap.car(tail);
            tail = st.heap.cdr(tail);
            if zerop(first) {
                seen_zero = true;
            } else if first.is_fixint() {
                seen_finite_non_zero = true;
                finite_gcd = gcd2(finite_gcd, first.fixint() as i64);
            }
        }
        if seen_finite_non_zero {
            Value::Fixint(fixint_wrap(finite_gcd))
        } else if seen_zero {
            return Err(no_primary_value("gcd"));
        } else {
            Value::PosInf
        }
    } else {
        Value::PosInf
    };
    st.apply_cc(res);
    Ok(())
}

/// `(lcm . numbers)`: no operands is `1`, any zero has no primary
/// value, any infinity forces `+infinity`.
pub fn op_lcm(st: &mut State, _x: &[Value], ptree: Value, _denv: Value) -> Result<()> {
    let (total, _c) = pairs::check_typed_list(st, "lcm", "number", is_number, true, ptree)?;

    let mut res = Value::Fixint(1);
    let mut seen_infinite = false;
    let mut finite_gcd: i64 = 0;

    let mut tail = ptree;
    for _ in 0..total {
        let first = st.heap.car(tail);
        tail = st.heap.cdr(tail);
        if first.is_einf() {
            seen_infinite = true;
            res = Value::PosInf;
        } else if zerop(first) {
            return Err(no_primary_value("lcm"));
        } else if !seen_infinite {
            finite_gcd = gcd2(finite_gcd, first.fixint() as i64);
        }
    }

    if !seen_infinite && total > 0 {
        // no zeros and no infinities here, so the gcd is non-zero
        let mut tail = ptree;
        let mut lcm: i64 = 1;
        for _ in 0..total {
            let first = st.heap.car(tail);
            tail = st.heap.cdr(tail);
            lcm = lcm.wrapping_mul((first.fixint() as i64).abs() / finite_gcd);
        }
        res = Value::Fixint(fixint_wrap(lcm));
    }
    st.apply_cc(res);
    Ok(())
}
