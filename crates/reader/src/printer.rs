//! The writer.
//!
//! Rendering is two passes over the pair graph: the first finds every
//! pair reachable more than once (shared substructure or a cycle), the
//! second prints, emitting `#n=` at the first occurrence of such a pair
//! and `#n#` afterwards. The traversal bookkeeping is a side table, so
//! printing never disturbs the runtime's mark words.

use std::collections::{HashMap, HashSet};

use vau_core::{Tag, Value};
use vau_runtime::Heap;
use vau_runtime::heap::OperKind;

/// Render `v` as external representation.
pub fn write_value(heap: &Heap, v: Value) -> String {
    let mut shared = find_shared(heap, v);
    let mut out = String::new();
    print_value(heap, v, &mut shared, &mut out);
    out
}

struct SharedPair {
    label: u32,
    emitted: bool,
}

fn find_shared(heap: &Heap, root: Value) -> HashMap<Value, SharedPair> {
    let mut seen: HashSet<Value> = HashSet::new();
    let mut shared: Vec<Value> = Vec::new();
    let mut stack = vec![root];
    while let Some(v) = stack.pop() {
        if !heap.is_pair(v) {
            continue;
        }
        if !seen.insert(v) {
            if !shared.contains(&v) {
                shared.push(v);
            }
            continue;
        }
        stack.push(heap.car(v));
        stack.push(heap.cdr(v));
    }
    shared
        .into_iter()
        .enumerate()
        .map(|(i, v)| {
            (
                v,
                SharedPair {
                    label: i as u32,
                    emitted: false,
                },
            )
        })
        .collect()
}

fn print_value(heap: &Heap, v: Value, shared: &mut HashMap<Value, SharedPair>, out: &mut String) {
    if heap.is_pair(v) {
        if let Some(entry) = shared.get_mut(&v) {
            if entry.emitted {
                out.push_str(&format!("#{}#", entry.label));
                return;
            }
            entry.emitted = true;
            out.push_str(&format!("#{}=", entry.label));
        }
        print_pair(heap, v, shared, out);
    } else {
        print_atom(heap, v, out);
    }
}

fn print_pair(heap: &Heap, p: Value, shared: &mut HashMap<Value, SharedPair>, out: &mut String) {
    out.push('(');
    print_value(heap, heap.car(p), shared, out);
    let mut tail = heap.cdr(p);
    loop {
        if tail.is_nil() {
            break;
        }
        if heap.is_pair(tail) && !shared.contains_key(&tail) {
            out.push(' ');
            print_value(heap, heap.car(tail), shared, out);
            tail = heap.cdr(tail);
        } else {
            // atom tail, or a shared/cyclic pair that needs its label
            out.push_str(" . ");
            print_value(heap, tail, shared, out);
            break;
        }
    }
    out.push(')');
}

fn print_atom(heap: &Heap, v: Value, out: &mut String) {
    match v {
        Value::Nil => out.push_str("()"),
        Value::Inert => out.push_str("#inert"),
        Value::Ignore => out.push_str("#ignore"),
        Value::Bool(true) => out.push_str("#t"),
        Value::Bool(false) => out.push_str("#f"),
        Value::EmptyEnv => out.push_str("#[empty-environment]"),
        Value::PosInf => out.push_str("#e+infinity"),
        Value::NegInf => out.push_str("#e-infinity"),
        Value::Fixint(n) => out.push_str(&n.to_string()),
        Value::Char(c) => match c {
            b' ' => out.push_str("#\\space"),
            b'\n' => out.push_str("#\\newline"),
            b'\t' => out.push_str("#\\tab"),
            c if c.is_ascii_graphic() => {
                out.push_str("#\\");
                out.push(c as char);
            }
            c => out.push_str(&format!("#\\x{c:02x}")),
        },
        Value::Obj(_) => match heap.tag_of(v) {
            Tag::String => {
                out.push('"');
                for &b in &heap.str_data(v).bytes {
                    match b {
                        b'"' => out.push_str("\\\""),
                        b'\\' => out.push_str("\\\\"),
                        b'\n' => out.push_str("\\n"),
                        b'\t' => out.push_str("\\t"),
                        b => out.push(b as char),
                    }
                }
                out.push('"');
            }
            Tag::Symbol => out.push_str(heap.sym_str(v)),
            Tag::Environment => out.push_str("#[environment]"),
            Tag::Operative => match &heap.operative(v).kind {
                OperKind::Primitive { name, .. } => {
                    out.push_str(&format!("#[operative {name}]"));
                }
                OperKind::Derived { .. } => out.push_str("#[operative]"),
            },
            Tag::Applicative => out.push_str("#[applicative]"),
            Tag::Continuation => out.push_str("#[continuation]"),
            Tag::Port => {
                out.push_str("#[port ");
                print_atom(heap, heap.port(v).filename, out);
                out.push(']');
            }
            _ => unreachable!("boxed tags handled above"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vau_runtime::{State, pairs};

    #[test]
    fn atoms_render() {
        let mut st = State::new();
        assert_eq!(write_value(&st.heap, Value::Fixint(-3)), "-3");
        assert_eq!(write_value(&st.heap, Value::TRUE), "#t");
        assert_eq!(write_value(&st.heap, Value::Inert), "#inert");
        assert_eq!(write_value(&st.heap, Value::PosInf), "#e+infinity");
        assert_eq!(write_value(&st.heap, Value::Char(b'a')), "#\\a");
        assert_eq!(write_value(&st.heap, Value::Char(b' ')), "#\\space");
        assert_eq!(write_value(&st.heap, Value::Nil), "()");
        let s = st.string(b"a\"b");
        assert_eq!(write_value(&st.heap, s), "\"a\\\"b\"");
        let sym = st.symbol("foo");
        assert_eq!(write_value(&st.heap, sym), "foo");
    }

    #[test]
    fn lists_render() {
        let mut st = State::new();
        let inner = st.list2(Value::Fixint(2), Value::Fixint(3));
        let l = st.cons(Value::Fixint(1), inner);
        assert_eq!(write_value(&st.heap, l), "(1 2 3)");

        let d = st.cons(Value::Fixint(1), Value::Fixint(2));
        assert_eq!(write_value(&st.heap, d), "(1 . 2)");
    }

    #[test]
    fn cycles_render_with_labels() {
        let mut st = State::new();
        let l = st.list2(Value::Fixint(1), Value::Fixint(2));
        pairs::encycle(&mut st, "t", l, 0, 2).unwrap();
        assert_eq!(write_value(&st.heap, l), "#0=(1 2 . #0#)");
    }

    #[test]
    fn shared_structure_renders_with_labels() {
        let mut st = State::new();
        let shared = st.list1(Value::Fixint(9));
        let tail = st.cons(shared, Value::Nil);
        let l = st.cons(shared, tail);
        assert_eq!(write_value(&st.heap, l), "(#0=(9) #0#)");
    }

    #[test]
    fn opaque_values_render() {
        let mut st = State::new();
        let sym = st.symbol("cons");
        let ground = st.ground_env;
        let app = vau_runtime::env::get_binding(&mut st, ground, sym).unwrap();
        assert_eq!(write_value(&st.heap, app), "#[applicative]");
        let under = st.heap.applicative(app).underlying;
        assert_eq!(write_value(&st.heap, under), "#[operative cons]");
        assert_eq!(write_value(&st.heap, ground), "#[environment]");
    }
}
