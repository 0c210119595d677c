//! The datum reader.
//!
//! A hand-written single-pass reader over ASCII source: tokens are
//! recognized and consumed in place, datums are built directly as
//! object-model values. Pairs and symbols carry their source position.
//!
//! Datum labels: `#n=datum` records the datum under label `n`,
//! `#n#` references it. A reference inside its own datum (the cyclic
//! case) reads as a placeholder pair that is patched once the labeled
//! datum is complete, so `#0=(1 2 . #0#)` builds a real cycle.
//!
//! Every value allocated while a datum is under construction is kept
//! on the interpreter's shadow stack, so a collection triggered by a
//! later allocation cannot reclaim the half-built datum.

use std::collections::{HashMap, HashSet};
use std::fmt;

use vau_core::{FIXINT_MAX, FIXINT_MIN, SourceInfo, Value};
use vau_runtime::State;

#[derive(Debug, Clone)]
pub struct ReadError {
    pub msg: String,
    pub line: u32,
    pub col: u32,
    /// True when more input could complete the datum (the REPL keeps
    /// reading lines instead of reporting).
    pub incomplete: bool,
}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.line, self.col, self.msg)
    }
}

type ReadResult<T> = Result<T, ReadError>;

enum Label {
    /// Forward reference: a placeholder pair to patch later.
    Placeholder(Value),
    Resolved(Value),
}

pub struct Reader<'a> {
    src: &'a [u8],
    pos: usize,
    line: u32,
    col: u32,
    labels: HashMap<u32, Label>,
}

impl<'a> Reader<'a> {
    pub fn new(src: &'a str) -> Reader<'a> {
        Reader {
            src: src.as_bytes(),
            pos: 0,
            line: 1,
            col: 1,
            labels: HashMap::new(),
        }
    }

    fn err(&self, msg: impl Into<String>) -> ReadError {
        ReadError {
            msg: msg.into(),
            line: self.line,
            col: self.col,
            incomplete: false,
        }
    }

    fn err_eof(&self, msg: impl Into<String>) -> ReadError {
        ReadError {
            msg: msg.into(),
            line: self.line,
            col: self.col,
            incomplete: true,
        }
    }

    fn si(&self) -> SourceInfo {
        SourceInfo {
            line: self.line,
            col: self.col,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        if b == b'\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(b)
    }

    fn skip_atmosphere(&mut self) {
        while let Some(b) = self.peek() {
            if b.is_ascii_whitespace() {
                self.bump();
            } else if b == b';' {
                while let Some(b) = self.peek() {
                    self.bump();
                    if b == b'\n' {
                        break;
                    }
                }
            } else {
                break;
            }
        }
    }

    fn is_delimiter(b: u8) -> bool {
        b.is_ascii_whitespace() || matches!(b, b'(' | b')' | b'"' | b';')
    }

    /// Read the next datum, or `None` at end of input.
    ///
    /// The result is left unrooted; root it before the next allocation
    /// if it must survive a collection.
    pub fn read(&mut self, st: &mut State) -> ReadResult<Option<Value>> {
        self.skip_atmosphere();
        if self.peek().is_none() {
            return Ok(None);
        }
        // datum labels are scoped to one top-level datum
        self.labels.clear();
        let saved = st.roots.depth();
        let result = self.read_datum(st);
        st.roots.truncate(saved);
        result.map(Some)
    }

    fn read_datum(&mut self, st: &mut State) -> ReadResult<Value> {
        self.skip_atmosphere();
        let si = self.si();
        match self.peek() {
            None => Err(self.err_eof("unexpected end of input")),
            Some(b'(') => {
                self.bump();
                self.read_list(st, si)
            }
            Some(b')') => Err(self.err("unexpected )")),
            Some(b'"') => {
                self.bump();
                self.read_string(st)
            }
            Some(b'#') => self.read_hash(st),
            Some(b) if b.is_ascii_digit() => self.read_number(),
            Some(b'+' | b'-')
                if self
                    .src
                    .get(self.pos + 1)
                    .is_some_and(|d| d.is_ascii_digit()) =>
            {
                self.read_number()
            }
            Some(_) => self.read_symbol(st, si),
        }
    }

    fn read_list(&mut self, st: &mut State, si: SourceInfo) -> ReadResult<Value> {
        let mut items: Vec<Value> = Vec::new();
        let mut tail = Value::Nil;
        loop {
            self.skip_atmosphere();
            match self.peek() {
                None => return Err(self.err_eof("unterminated list")),
                Some(b')') => {
                    self.bump();
                    break;
                }
                Some(b'.')
                    if self
                        .src
                        .get(self.pos + 1)
                        .is_none_or(|b| Self::is_delimiter(*b)) =>
                {
                    if items.is_empty() {
                        return Err(self.err("dotted tail with no leading datum"));
                    }
                    self.bump();
                    tail = self.read_datum(st)?;
                    st.push_root(tail);
                    self.skip_atmosphere();
                    match self.peek() {
                        Some(b')') => {
                            self.bump();
                        }
                        None => return Err(self.err_eof("unterminated list")),
                        Some(_) => return Err(self.err("more than one datum after .")),
                    }
                    break;
                }
                Some(_) => {
                    let item = self.read_datum(st)?;
                    st.push_root(item);
                    items.push(item);
                }
            }
        }
        let mut list = tail;
        for &item in items.iter().rev() {
            st.push_root(list);
            list = st.cons_si(item, list, si);
            st.roots.pop();
        }
        st.push_root(list);
        Ok(list)
    }

    fn read_string(&mut self, st: &mut State) -> ReadResult<Value> {
        let mut bytes = Vec::new();
        loop {
            match self.bump() {
                None => return Err(self.err_eof("unterminated string")),
                Some(b'"') => break,
                Some(b'\\') => match self.bump() {
                    None => return Err(self.err_eof("unterminated string")),
                    Some(b'\\') => bytes.push(b'\\'),
                    Some(b'"') => bytes.push(b'"'),
                    Some(b'n') => bytes.push(b'\n'),
                    Some(b't') => bytes.push(b'\t'),
                    Some(other) => {
                        return Err(self.err(format!("bad string escape \\{}", other as char)));
                    }
                },
                Some(b) => bytes.push(b),
            }
        }
        let s = st.string(&bytes);
        st.push_root(s);
        Ok(s)
    }

    fn read_number(&mut self) -> ReadResult<Value> {
        let mut text = String::new();
        if matches!(self.peek(), Some(b'+' | b'-')) {
            text.push(self.bump().expect("sign peeked") as char);
        }
        while let Some(b) = self.peek() {
            if b.is_ascii_digit() {
                text.push(self.bump().expect("digit peeked") as char);
            } else if Self::is_delimiter(b) {
                break;
            } else {
                return Err(self.err(format!("bad character in number: {}", b as char)));
            }
        }
        let n: i64 = text
            .parse()
            .map_err(|_| self.err("integer out of fixint range"))?;
        if n < FIXINT_MIN as i64 || n > FIXINT_MAX as i64 {
            return Err(self.err("integer out of fixint range"));
        }
        Ok(Value::Fixint(n as i32))
    }

    fn read_symbol(&mut self, st: &mut State, si: SourceInfo) -> ReadResult<Value> {
        let mut name = String::new();
        while let Some(b) = self.peek() {
            if Self::is_delimiter(b) {
                break;
            }
            if !b.is_ascii_graphic() {
                return Err(self.err("non-ASCII character in symbol"));
            }
            name.push(self.bump().expect("symbol byte peeked") as char);
        }
        if name.is_empty() {
            return Err(self.err("empty symbol"));
        }
        let sym = st.symbol_g(&name, Some(si));
        st.push_root(sym);
        Ok(sym)
    }

    fn read_hash(&mut self, st: &mut State) -> ReadResult<Value> {
        self.bump(); // '#'
        match self.peek() {
            None => Err(self.err_eof("unexpected end of input after #")),
            Some(b't') => self.read_named_constant("t", Value::TRUE),
            Some(b'f') => self.read_named_constant("f", Value::FALSE),
            Some(b'i') => {
                // #inert or #ignore
                let word = self.take_word();
                match word.as_str() {
                    "inert" => Ok(Value::Inert),
                    "ignore" => Ok(Value::Ignore),
                    _ => Err(self.err(format!("unknown constant #{word}"))),
                }
            }
            Some(b'e') => {
                let word = self.take_word();
                match word.as_str() {
                    "e+infinity" => Ok(Value::PosInf),
                    "e-infinity" => Ok(Value::NegInf),
                    _ => Err(self.err(format!("unknown constant #{word}"))),
                }
            }
            Some(b'\\') => {
                self.bump();
                self.read_char()
            }
            Some(b) if b.is_ascii_digit() => self.read_label(st),
            Some(b) => Err(self.err(format!("unknown dispatch #{}", b as char))),
        }
    }

    fn take_word(&mut self) -> String {
        let mut word = String::new();
        while let Some(b) = self.peek() {
            if Self::is_delimiter(b) {
                break;
            }
            word.push(self.bump().expect("word byte peeked") as char);
        }
        word
    }

    fn read_named_constant(&mut self, expect: &str, value: Value) -> ReadResult<Value> {
        let word = self.take_word();
        if word == expect {
            Ok(value)
        } else {
            Err(self.err(format!("unknown constant #{word}")))
        }
    }

    fn read_char(&mut self) -> ReadResult<Value> {
        let first = match self.bump() {
            None => return Err(self.err_eof("unexpected end of input in character")),
            Some(b) => b,
        };
        // a run of letters after the first is a character name
        if first.is_ascii_alphabetic()
            && self.peek().is_some_and(|b| !Self::is_delimiter(b))
        {
            let mut name = String::new();
            name.push(first as char);
            name.push_str(&self.take_word());
            match name.as_str() {
                "space" => Ok(Value::Char(b' ')),
                "newline" => Ok(Value::Char(b'\n')),
                "tab" => Ok(Value::Char(b'\t')),
                _ => Err(self.err(format!("unknown character name #\\{name}"))),
            }
        } else if first.is_ascii() {
            Ok(Value::Char(first))
        } else {
            Err(self.err("non-ASCII character literal"))
        }
    }

    fn read_label(&mut self, st: &mut State) -> ReadResult<Value> {
        let mut digits = String::new();
        while let Some(b) = self.peek() {
            if b.is_ascii_digit() {
                digits.push(self.bump().expect("digit peeked") as char);
            } else {
                break;
            }
        }
        let n: u32 = digits
            .parse()
            .map_err(|_| self.err("datum label out of range"))?;
        match self.bump() {
            Some(b'=') => {
                if self.labels.contains_key(&n) {
                    return Err(self.err(format!("duplicate datum label #{n}=")));
                }
                let placeholder = st.cons(Value::Ignore, Value::Ignore);
                st.push_root(placeholder);
                self.labels.insert(n, Label::Placeholder(placeholder));
                let datum = self.read_datum(st)?;
                if datum == placeholder {
                    return Err(self.err(format!("datum label #{n}= refers only to itself")));
                }
                patch_placeholder(st, datum, placeholder);
                self.labels.insert(n, Label::Resolved(datum));
                Ok(datum)
            }
            Some(b'#') => match self.labels.get(&n) {
                Some(Label::Placeholder(p)) => Ok(*p),
                Some(Label::Resolved(v)) => Ok(*v),
                None => Err(self.err(format!("undefined datum label #{n}#"))),
            },
            _ => Err(self.err("bad datum label (expected = or #)")),
        }
    }
}

/// Replace every reference to `placeholder` inside `datum` with `datum`
/// itself, walking the (possibly already cyclic) pair graph once.
fn patch_placeholder(st: &mut State, datum: Value, placeholder: Value) {
    let mut visited: HashSet<Value> = HashSet::new();
    let mut stack = vec![datum];
    while let Some(v) = stack.pop() {
        if !st.heap.is_pair(v) || !visited.insert(v) {
            continue;
        }
        if st.heap.car(v) == placeholder {
            st.heap.set_car(v, datum);
        } else {
            stack.push(st.heap.car(v));
        }
        if st.heap.cdr(v) == placeholder {
            st.heap.set_cdr(v, datum);
        } else {
            stack.push(st.heap.cdr(v));
        }
    }
}

/// Read every datum in `src`. The results are rooted on the shadow
/// stack until the caller pops them; here they are returned unrooted,
/// which is fine as long as the caller evaluates or roots them before
/// allocating.
pub fn read_all(st: &mut State, src: &str) -> Result<Vec<Value>, ReadError> {
    let saved = st.roots.depth();
    let mut reader = Reader::new(src);
    let mut datums = Vec::new();
    loop {
        match reader.read(st) {
            Ok(Some(v)) => {
                st.push_root(v);
                datums.push(v);
            }
            Ok(None) => break,
            Err(e) => {
                st.roots.truncate(saved);
                return Err(e);
            }
        }
    }
    st.roots.truncate(saved);
    Ok(datums)
}
