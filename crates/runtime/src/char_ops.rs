//! Character ground operations. Characters are byte-wide and ASCII.

use vau_core::Value;

use crate::args;
use crate::error::{Result, range_error, type_error};
use crate::state::State;

// Classification helpers used through the typed-predicate maker.

pub fn char_alphabeticp(v: Value) -> bool {
    matches!(v, Value::Char(c) if c.is_ascii_alphabetic())
}

pub fn char_numericp(v: Value) -> bool {
    matches!(v, Value::Char(c) if c.is_ascii_digit())
}

pub fn char_whitespacep(v: Value) -> bool {
    matches!(v, Value::Char(c) if c.is_ascii_whitespace())
}

pub fn char_upper_casep(v: Value) -> bool {
    matches!(v, Value::Char(c) if c.is_ascii_uppercase())
}

pub fn char_lower_casep(v: Value) -> bool {
    matches!(v, Value::Char(c) if c.is_ascii_lowercase())
}

/// `(char->integer char)`
pub fn op_char_to_integer(st: &mut State, _x: &[Value], ptree: Value, _denv: Value) -> Result<()> {
    let c = args::take_1(st, "char->integer", ptree)?;
    match c {
        Value::Char(c) => {
            st.apply_cc(Value::Fixint(c as i32));
            Ok(())
        }
        _ => Err(type_error("char->integer", "expected character")),
    }
}

/// `(integer->char k)`: ASCII only.
pub fn op_integer_to_char(st: &mut State, _x: &[Value], ptree: Value, _denv: Value) -> Result<()> {
    let k = args::take_1(st, "integer->char", ptree)?;
    match k {
        Value::Fixint(i) => {
            if !(0..=127).contains(&i) {
                return Err(range_error(
                    "integer->char",
                    "integer out of ASCII range [0 - 127]",
                ));
            }
            st.apply_cc(Value::Char(i as u8));
            Ok(())
        }
        _ => Err(type_error("integer->char", "expected finite integer")),
    }
}

// char-upcase, char-downcase and the character comparison predicates
// are not implemented.
// TODO: settle their semantics first (case mapping for non-letters,
// comparison over the full byte range) and add them to the ground table.

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env;
    use crate::error::ErrorKind;
    use crate::state::State;

    fn run_n(st: &mut State, name: &str, operands: Value) -> Result<Value> {
        let sym = st.symbol(name);
        let ground = st.ground_env;
        let app = env::get_binding(st, ground, sym)?;
        let expr = st.cons(app, operands);
        let env = env::make_table_environment(st, ground);
        st.run(expr, env)
    }

    #[test]
    fn classification() {
        assert!(char_alphabeticp(Value::Char(b'a')));
        assert!(!char_alphabeticp(Value::Char(b'1')));
        assert!(char_numericp(Value::Char(b'7')));
        assert!(char_whitespacep(Value::Char(b' ')));
        assert!(char_upper_casep(Value::Char(b'Q')));
        assert!(char_lower_casep(Value::Char(b'q')));
    }

    #[test]
    fn conversions_round_trip() {
        let mut st = State::new();
        let operands = st.list1(Value::Char(b'A'));
        assert_eq!(
            run_n(&mut st, "char->integer", operands).unwrap(),
            Value::Fixint(65)
        );
        let operands = st.list1(Value::Fixint(65));
        assert_eq!(
            run_n(&mut st, "integer->char", operands).unwrap(),
            Value::Char(b'A')
        );
    }

    #[test]
    fn integer_to_char_is_ascii_only() {
        let mut st = State::new();
        let operands = st.list1(Value::Fixint(200));
        assert_eq!(
            run_n(&mut st, "integer->char", operands).unwrap_err().kind,
            ErrorKind::Range
        );
        let operands = st.list1(Value::Fixint(-1));
        assert!(run_n(&mut st, "integer->char", operands).is_err());
    }

    #[test]
    fn predicates_are_n_ary_with_type_check() {
        let mut st = State::new();
        let operands = st.list2(Value::Char(b'a'), Value::Char(b'b'));
        assert_eq!(
            run_n(&mut st, "char-alphabetic?", operands).unwrap(),
            Value::TRUE
        );
        let operands = st.list2(Value::Char(b'a'), Value::Char(b'1'));
        assert_eq!(
            run_n(&mut st, "char-alphabetic?", operands).unwrap(),
            Value::FALSE
        );
        let operands = st.list1(Value::Fixint(5));
        assert_eq!(
            run_n(&mut st, "char-alphabetic?", operands).unwrap_err().kind,
            ErrorKind::Type
        );
    }
}
