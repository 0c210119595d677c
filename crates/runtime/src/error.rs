//! Runtime error taxonomy.
//!
//! Faults are ordinary values: every fallible runtime entry point returns
//! `Result<T, Error>` and the trampoline unwinds an `Err` to its caller,
//! restoring the shadow stacks on the way out. The mandated report line
//!
//! ```text
//! *ERROR*: <message> [<extra>]
//! ```
//!
//! is written to stderr at throw time, before the unwind begins.
//!
//! `can_continue` distinguishes recoverable faults (a bad argument to a
//! user-level applicative; the REPL prompts again) from fatal ones (host
//! I/O failure; the REPL exits).

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Wrong type of value where a specific type was required.
    Type,
    /// Improper or cyclic list where none is allowed.
    Structure,
    /// Parameter-tree shape mismatch.
    Match,
    /// Symbol lookup failed along the whole parent DAG.
    UnboundSymbol,
    /// Keyed lookup failed along the keyed-parents closure.
    UnboundKeyed,
    /// Division by zero, non-finite dividend, and friends.
    Arith,
    /// The Kernel report defines no primary value for this result.
    NoPrimaryValue,
    /// Index or count out of bounds.
    Range,
    /// Mutation of an immutable pair or string.
    Immutability,
    /// Port-layer failure.
    Io,
    /// Operand tree has the wrong shape for the operation.
    ArgumentCount,
    /// Raised by the `error` applicative.
    User,
}

#[derive(Debug, Clone)]
pub struct Error {
    pub kind: ErrorKind,
    pub msg: String,
    pub extra: Option<String>,
    pub can_continue: bool,
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Build an error and write the report line. Every constructor below
    /// funnels through here so the line is printed exactly once, at
    /// throw time.
    pub fn throw(
        kind: ErrorKind,
        msg: impl Into<String>,
        extra: Option<String>,
        can_continue: bool,
    ) -> Error {
        let msg = msg.into();
        match &extra {
            Some(e) => eprintln!("*ERROR*: {msg} {e}"),
            None => eprintln!("*ERROR*: {msg}"),
        }
        Error {
            kind,
            msg,
            extra,
            can_continue,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.extra {
            Some(e) => write!(f, "{} {}", self.msg, e),
            None => write!(f, "{}", self.msg),
        }
    }
}

pub fn type_error(name: &str, msg: &str) -> Error {
    Error::throw(ErrorKind::Type, format!("{name}: {msg}"), None, true)
}

pub fn structure_error(name: &str, msg: &str) -> Error {
    Error::throw(ErrorKind::Structure, format!("{name}: {msg}"), None, true)
}

pub fn match_error(name: &str, msg: &str) -> Error {
    Error::throw(ErrorKind::Match, format!("{name}: {msg}"), None, true)
}

pub fn unbound_symbol(sym_name: &str) -> Error {
    Error::throw(
        ErrorKind::UnboundSymbol,
        "Unbound symbol:",
        Some(sym_name.to_string()),
        true,
    )
}

pub fn unbound_keyed(name: &str) -> Error {
    Error::throw(
        ErrorKind::UnboundKeyed,
        format!("{name}: unbound keyed static variable"),
        None,
        true,
    )
}

pub fn arith_error(name: &str, msg: &str) -> Error {
    Error::throw(ErrorKind::Arith, format!("{name}: {msg}"), None, true)
}

pub fn no_primary_value(name: &str) -> Error {
    Error::throw(
        ErrorKind::NoPrimaryValue,
        format!("{name}: result has no primary value"),
        None,
        true,
    )
}

pub fn range_error(name: &str, msg: &str) -> Error {
    Error::throw(ErrorKind::Range, format!("{name}: {msg}"), None, true)
}

pub fn immutability_error(name: &str, what: &str) -> Error {
    Error::throw(
        ErrorKind::Immutability,
        format!("{name}: immutable {what}"),
        None,
        true,
    )
}

pub fn io_error(name: &str, msg: &str, can_continue: bool) -> Error {
    Error::throw(
        ErrorKind::Io,
        format!("{name}: {msg}"),
        None,
        can_continue,
    )
}

pub fn argc_error(name: &str, msg: &str) -> Error {
    Error::throw(ErrorKind::ArgumentCount, format!("{name}: {msg}"), None, true)
}

pub fn user_error(msg: impl Into<String>, extra: Option<String>) -> Error {
    Error::throw(ErrorKind::User, msg, extra, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_and_flags() {
        let e = type_error("+", "expected number");
        assert_eq!(e.kind, ErrorKind::Type);
        assert!(e.can_continue);
        assert_eq!(e.to_string(), "+: expected number");

        let e = unbound_symbol("x");
        assert_eq!(e.kind, ErrorKind::UnboundSymbol);
        assert!(e.can_continue);
        assert_eq!(e.to_string(), "Unbound symbol: x");

        let e = io_error("write-char", "host write failed", false);
        assert!(!e.can_continue);
    }

    #[test]
    fn no_primary_value_message() {
        let e = no_primary_value("gcd");
        assert_eq!(e.to_string(), "gcd: result has no primary value");
        assert_eq!(e.kind, ErrorKind::NoPrimaryValue);
    }
}
