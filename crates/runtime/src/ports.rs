//! File ports.
//!
//! A port wraps a host file handle plus direction and open/closed flags
//! in its header. Closing a closed port is a no-op, and the collector
//! closes any port it sweeps while still open (dropping the handle).
//! `read-char` past the end of input is a recoverable io-error; `eof?`
//! probes without consuming.

use std::fs::File;
use std::io::{BufRead, BufReader, Read, Write};

use vau_core::Value;

use crate::args;
use crate::error::{Result, io_error, type_error};
use crate::heap::{ObjData, PortData, PortHandle, flags};
use crate::state::State;

fn expect_port(st: &State, name: &str, v: Value) -> Result<()> {
    if st.heap.is_port(v) {
        Ok(())
    } else {
        Err(type_error(name, "expected port"))
    }
}

fn filename_of(st: &State, name: &str, v: Value) -> Result<String> {
    if !st.heap.is_string(v) {
        return Err(type_error(name, "expected string"));
    }
    Ok(String::from_utf8_lossy(&st.heap.str_data(v).bytes).into_owned())
}

fn make_port(st: &mut State, filename: Value, handle: PortHandle, dir_flag: u8) -> Value {
    st.alloc_raw(
        ObjData::Port(PortData { filename, handle }),
        dir_flag,
        &[filename],
    )
}

/// `(open-input-file filename)`
pub fn op_open_input_file(st: &mut State, _x: &[Value], ptree: Value, _denv: Value) -> Result<()> {
    let fv = args::take_1(st, "open-input-file", ptree)?;
    let filename = filename_of(st, "open-input-file", fv)?;
    let file = File::open(&filename)
        .map_err(|e| io_error("open-input-file", &format!("couldn't open file ({e})"), true))?;
    let port = make_port(st, fv, PortHandle::In(BufReader::new(file)), flags::PORT_INPUT);
    st.apply_cc(port);
    Ok(())
}

/// `(open-output-file filename)`
pub fn op_open_output_file(st: &mut State, _x: &[Value], ptree: Value, _denv: Value) -> Result<()> {
    let fv = args::take_1(st, "open-output-file", ptree)?;
    let filename = filename_of(st, "open-output-file", fv)?;
    let file = File::create(&filename)
        .map_err(|e| io_error("open-output-file", &format!("couldn't open file ({e})"), true))?;
    let port = make_port(st, fv, PortHandle::Out(file), flags::PORT_OUTPUT);
    st.apply_cc(port);
    Ok(())
}

/// `(close-port port)`: re-closing is a no-op.
pub fn op_close_port(st: &mut State, _x: &[Value], ptree: Value, _denv: Value) -> Result<()> {
    let p = args::take_1(st, "close-port", ptree)?;
    expect_port(st, "close-port", p)?;
    if st.heap.obj_flags(p) & flags::PORT_CLOSED == 0 {
        st.heap.port_mut(p).handle = PortHandle::Closed;
        st.heap.set_obj_flag(p, flags::PORT_CLOSED);
    }
    st.apply_cc(Value::Inert);
    Ok(())
}

/// `(read-char port)`
pub fn op_read_char(st: &mut State, _x: &[Value], ptree: Value, _denv: Value) -> Result<()> {
    let p = args::take_1(st, "read-char", ptree)?;
    expect_port(st, "read-char", p)?;
    let mut buf = [0u8; 1];
    let n = match &mut st.heap.port_mut(p).handle {
        PortHandle::In(reader) => reader
            .read(&mut buf)
            .map_err(|e| io_error("read-char", &format!("host read failed ({e})"), false))?,
        PortHandle::Out(_) => return Err(io_error("read-char", "not an input port", true)),
        PortHandle::Closed => return Err(io_error("read-char", "port is closed", true)),
    };
    if n == 0 {
        return Err(io_error("read-char", "end of file", true));
    }
    st.apply_cc(Value::Char(buf[0]));
    Ok(())
}

/// `(write-char char port)`
pub fn op_write_char(st: &mut State, _x: &[Value], ptree: Value, _denv: Value) -> Result<()> {
    let (c, p) = args::take_2(st, "write-char", ptree)?;
    let ch = match c {
        Value::Char(ch) => ch,
        _ => return Err(type_error("write-char", "expected char")),
    };
    expect_port(st, "write-char", p)?;
    match &mut st.heap.port_mut(p).handle {
        PortHandle::Out(file) => file
            .write_all(&[ch])
            .map_err(|e| io_error("write-char", &format!("host write failed ({e})"), false))?,
        PortHandle::In(_) => return Err(io_error("write-char", "not an output port", true)),
        PortHandle::Closed => return Err(io_error("write-char", "port is closed", true)),
    }
    st.apply_cc(Value::Inert);
    Ok(())
}

/// `(eof? port)`: true when the input port has no byte left.
pub fn op_eofp(st: &mut State, _x: &[Value], ptree: Value, _denv: Value) -> Result<()> {
    let p = args::take_1(st, "eof?", ptree)?;
    expect_port(st, "eof?", p)?;
    let at_eof = match &mut st.heap.port_mut(p).handle {
        PortHandle::In(reader) => reader
            .fill_buf()
            .map_err(|e| io_error("eof?", &format!("host read failed ({e})"), false))?
            .is_empty(),
        PortHandle::Out(_) => return Err(io_error("eof?", "not an input port", true)),
        PortHandle::Closed => return Err(io_error("eof?", "port is closed", true)),
    };
    st.apply_cc(Value::bool(at_eof));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env;
    use crate::error::ErrorKind;
    use crate::state::State;
    use std::io::Write as _;

    fn run_n(st: &mut State, name: &str, operands: Value) -> Result<Value> {
        let sym = st.symbol(name);
        let ground = st.ground_env;
        let app = env::get_binding(st, ground, sym)?;
        let expr = st.cons(app, operands);
        let env = env::make_table_environment(st, ground);
        st.run(expr, env)
    }

    #[test]
    fn read_until_eof() {
        let mut st = State::new();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("in.txt");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(b"hi")
            .unwrap();

        let fname = st.string(path.to_str().unwrap().as_bytes());
        let operands = st.list1(fname);
        let port = run_n(&mut st, "open-input-file", operands).unwrap();
        assert!(st.heap.is_port(port));

        let operands = st.list1(port);
        assert_eq!(run_n(&mut st, "eof?", operands).unwrap(), Value::FALSE);
        let operands = st.list1(port);
        assert_eq!(run_n(&mut st, "read-char", operands).unwrap(), Value::Char(b'h'));
        let operands = st.list1(port);
        assert_eq!(run_n(&mut st, "read-char", operands).unwrap(), Value::Char(b'i'));
        let operands = st.list1(port);
        assert_eq!(run_n(&mut st, "eof?", operands).unwrap(), Value::TRUE);
        let operands = st.list1(port);
        let err = run_n(&mut st, "read-char", operands).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Io);
        assert!(err.can_continue);
    }

    #[test]
    fn write_and_close() {
        let mut st = State::new();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");

        let fname = st.string(path.to_str().unwrap().as_bytes());
        let operands = st.list1(fname);
        let port = run_n(&mut st, "open-output-file", operands).unwrap();

        let operands = st.list2(Value::Char(b'x'), port);
        run_n(&mut st, "write-char", operands).unwrap();
        let operands = st.list1(port);
        run_n(&mut st, "close-port", operands).unwrap();
        // closing again is a no-op
        let operands = st.list1(port);
        run_n(&mut st, "close-port", operands).unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"x");

        // writes after close fail recoverably
        let operands = st.list2(Value::Char(b'y'), port);
        let err = run_n(&mut st, "write-char", operands).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Io);
        assert!(err.can_continue);
    }

    #[test]
    fn direction_mismatch() {
        let mut st = State::new();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.txt");
        std::fs::write(&path, b"z").unwrap();

        let fname = st.string(path.to_str().unwrap().as_bytes());
        let operands = st.list1(fname);
        let port = run_n(&mut st, "open-input-file", operands).unwrap();
        let operands = st.list2(Value::Char(b'x'), port);
        assert_eq!(
            run_n(&mut st, "write-char", operands).unwrap_err().kind,
            ErrorKind::Io
        );
    }

    #[test]
    fn missing_file_is_recoverable() {
        let mut st = State::new();
        let fname = st.string(b"/definitely/not/here.txt");
        let operands = st.list1(fname);
        let err = run_n(&mut st, "open-input-file", operands).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Io);
        assert!(err.can_continue);
    }
}
