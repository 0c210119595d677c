//! Operand-tree destructuring for primitives.
//!
//! Operatives receive their operand tree raw, and applicatives receive
//! the freshly copied evaluated list, so every primitive starts by
//! taking its operands apart. These helpers validate the spine shape
//! and fail with an argument-count error; type checks stay at the call
//! site, where the expected type is known.

use vau_core::Value;

use crate::error::{Result, argc_error};
use crate::state::State;

/// Operand tree must be `()`.
pub fn take_0(_st: &State, name: &str, ptree: Value) -> Result<()> {
    if ptree.is_nil() {
        Ok(())
    } else {
        Err(argc_error(name, "expected no arguments"))
    }
}

/// Operand tree must be `(a)`.
pub fn take_1(st: &State, name: &str, ptree: Value) -> Result<Value> {
    if st.heap.is_pair(ptree) && st.heap.cdr(ptree).is_nil() {
        Ok(st.heap.car(ptree))
    } else {
        Err(argc_error(name, "expected one argument"))
    }
}

/// Operand tree must be `(a b)`.
pub fn take_2(st: &State, name: &str, ptree: Value) -> Result<(Value, Value)> {
    if st.heap.is_pair(ptree) {
        let rest = st.heap.cdr(ptree);
        if st.heap.is_pair(rest) && st.heap.cdr(rest).is_nil() {
            return Ok((st.heap.car(ptree), st.heap.car(rest)));
        }
    }
    Err(argc_error(name, "expected two arguments"))
}

/// Operand tree must be `(a b c)`.
pub fn take_3(st: &State, name: &str, ptree: Value) -> Result<(Value, Value, Value)> {
    if st.heap.is_pair(ptree) {
        let rest = st.heap.cdr(ptree);
        if st.heap.is_pair(rest) {
            let rest2 = st.heap.cdr(rest);
            if st.heap.is_pair(rest2) && st.heap.cdr(rest2).is_nil() {
                return Ok((st.heap.car(ptree), st.heap.car(rest), st.heap.car(rest2)));
            }
        }
    }
    Err(argc_error(name, "expected three arguments"))
}

/// Operand tree must be `(a . rest)`; returns `(a, rest)`.
pub fn take_1_rest(st: &State, name: &str, ptree: Value) -> Result<(Value, Value)> {
    if st.heap.is_pair(ptree) {
        Ok((st.heap.car(ptree), st.heap.cdr(ptree)))
    } else {
        Err(argc_error(name, "expected at least one argument"))
    }
}

/// Operand tree must be `(a b . rest)`; returns `(a, b, rest)`.
pub fn take_2_rest(st: &State, name: &str, ptree: Value) -> Result<(Value, Value, Value)> {
    if st.heap.is_pair(ptree) {
        let rest = st.heap.cdr(ptree);
        if st.heap.is_pair(rest) {
            return Ok((st.heap.car(ptree), st.heap.car(rest), st.heap.cdr(rest)));
        }
    }
    Err(argc_error(name, "expected at least two arguments"))
}

/// Operand tree must be `(a)` or `(a b)`; returns `(a, Option<b>)`.
pub fn take_1_opt(st: &State, name: &str, ptree: Value) -> Result<(Value, Option<Value>)> {
    if st.heap.is_pair(ptree) {
        let rest = st.heap.cdr(ptree);
        if rest.is_nil() {
            return Ok((st.heap.car(ptree), None));
        }
        if st.heap.is_pair(rest) && st.heap.cdr(rest).is_nil() {
            return Ok((st.heap.car(ptree), Some(st.heap.car(rest))));
        }
    }
    Err(argc_error(name, "expected one or two arguments"))
}

/// Operand tree must be `(a b)` or `(a b c)`; returns `(a, b, Option<c>)`.
pub fn take_2_opt(st: &State, name: &str, ptree: Value) -> Result<(Value, Value, Option<Value>)> {
    if st.heap.is_pair(ptree) {
        let rest = st.heap.cdr(ptree);
        if st.heap.is_pair(rest) {
            let rest2 = st.heap.cdr(rest);
            if rest2.is_nil() {
                return Ok((st.heap.car(ptree), st.heap.car(rest), None));
            }
            if st.heap.is_pair(rest2) && st.heap.cdr(rest2).is_nil() {
                return Ok((
                    st.heap.car(ptree),
                    st.heap.car(rest),
                    Some(st.heap.car(rest2)),
                ));
            }
        }
    }
    Err(argc_error(name, "expected two or three arguments"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn exact_arities() {
        let mut st = State::new();
        let one = st.list1(Value::Fixint(1));
        let two = st.list2(Value::Fixint(1), Value::Fixint(2));

        assert!(take_0(&st, "t", Value::Nil).is_ok());
        assert_eq!(take_1(&st, "t", one).unwrap(), Value::Fixint(1));
        assert_eq!(
            take_2(&st, "t", two).unwrap(),
            (Value::Fixint(1), Value::Fixint(2))
        );

        assert_eq!(take_0(&st, "t", one).unwrap_err().kind, ErrorKind::ArgumentCount);
        assert_eq!(take_1(&st, "t", two).unwrap_err().kind, ErrorKind::ArgumentCount);
        assert_eq!(take_2(&st, "t", one).unwrap_err().kind, ErrorKind::ArgumentCount);
    }

    #[test]
    fn improper_tails_are_rejected_for_exact_arities() {
        let mut st = State::new();
        let dotted = st.cons(Value::Fixint(1), Value::Fixint(2));
        assert!(take_1(&st, "t", dotted).is_err());
        let (a, rest) = take_1_rest(&st, "t", dotted).unwrap();
        assert_eq!(a, Value::Fixint(1));
        assert_eq!(rest, Value::Fixint(2));
    }

    #[test]
    fn optional_trailing_argument() {
        let mut st = State::new();
        let one = st.list1(Value::Fixint(1));
        let two = st.list2(Value::Fixint(1), Value::Fixint(2));
        assert_eq!(take_1_opt(&st, "t", one).unwrap(), (Value::Fixint(1), None));
        assert_eq!(
            take_1_opt(&st, "t", two).unwrap(),
            (Value::Fixint(1), Some(Value::Fixint(2)))
        );
    }
}
