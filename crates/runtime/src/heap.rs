//! The heap arena and the boxed half of the object model.
//!
//! All boxed values live in one slot arena owned by [`Heap`]. A slot
//! holds a GC header (mark color + flags byte) and the payload. Values
//! reference slots through the copyable [`Gc`] handle, so reading a field
//! is one index, and the tag dispatch is a single load.
//!
//! Collection is mark-and-sweep over an explicit mark stack, driven from
//! the interpreter state's allocation wrappers; the heap itself never
//! decides when to run. Sweeping drops payloads, which closes any port
//! still open.
//!
//! Pairs carry a scratch `mark` word next to the usual flags. Every
//! cycle-detecting algorithm uses it (`Bool(false)` means unmarked), and
//! the structural copy piggybacks a forwarding value in it. Owners must
//! restore the word on every exit path; the collector traces it so a
//! piggybacked half-built copy survives a collection mid-traversal.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;

use vau_core::{Gc, SourceInfo, Tag, Value};

use crate::error::Result;
use crate::state::State;

/// Native implementation of a primitive operative.
///
/// Receives the interpreter state, the operative's extra parameters, the
/// operand tree, and the dynamic environment, and must finish by
/// scheduling the next trampoline step.
pub type OperFn = fn(&mut State, &[Value], Value, Value) -> Result<()>;

/// Native implementation of a continuation.
///
/// Receives the state, the continuation's extra parameters, and the
/// value being delivered.
pub type ContFn = fn(&mut State, &[Value], Value) -> Result<()>;

/// Object flag bits.
pub mod flags {
    /// Pair may be mutated.
    pub const MUTABLE: u8 = 1 << 0;
    /// Traversal mark (continuation ancestry probe).
    pub const MARKED: u8 = 1 << 1;
    /// Port was opened for input.
    pub const PORT_INPUT: u8 = 1 << 2;
    /// Port was opened for output.
    pub const PORT_OUTPUT: u8 = 1 << 3;
    /// Port has been closed.
    pub const PORT_CLOSED: u8 = 1 << 4;
    /// String may not be mutated.
    pub const STR_IMMUTABLE: u8 = 1 << 5;
}

#[derive(Debug)]
pub struct PairData {
    pub car: Value,
    pub cdr: Value,
    /// Scratch mark word. `Bool(false)` when clear; cycle walks store a
    /// visit index, the structural copy stores the forwarding pair.
    pub mark: Value,
    pub si: Option<SourceInfo>,
}

#[derive(Debug)]
pub struct StrData {
    pub bytes: Vec<u8>,
}

#[derive(Debug)]
pub struct SymbolData {
    /// Immutable string object holding the name.
    pub name: Gc,
    pub si: Option<SourceInfo>,
}

#[derive(Debug)]
pub struct EnvData {
    /// `EmptyEnv`, a single environment, or a list of environments.
    pub parents: Value,
    /// Association list of `(symbol . value)` pairs.
    pub bindings: Value,
    /// Hash-table binding store, used instead of the alist for the
    /// ground environment and its standard children.
    pub table: Option<HashMap<String, Value>>,
    /// Precomputed closure of keyed ancestors: `EmptyEnv`, a single
    /// keyed environment, or a list of them. Never mutated after
    /// construction.
    pub keyed_parents: Value,
    /// `Nil`, or a `(key . value)` pair making this a keyed frame.
    pub keyed_node: Value,
}

#[derive(Debug)]
pub enum OperKind {
    Primitive {
        name: &'static str,
        f: OperFn,
        /// Immutable after construction.
        xparams: Box<[Value]>,
    },
    Derived {
        /// Immutable copy of the parameter tree.
        ptree: Value,
        /// Symbol bound to the dynamic environment, or `Ignore`.
        eformal: Value,
        /// Immutable copy of the body list.
        body: Value,
        /// Captured static environment.
        senv: Value,
    },
}

#[derive(Debug)]
pub struct OperativeData {
    pub kind: OperKind,
}

#[derive(Debug)]
pub struct ApplicativeData {
    pub underlying: Value,
}

#[derive(Debug)]
pub struct ContData {
    /// Parent continuation, or `Nil` for the root.
    pub parent: Value,
    pub name: &'static str,
    pub f: ContFn,
    /// Immutable after construction.
    pub xparams: Box<[Value]>,
    /// Dynamic environment captured at creation.
    pub denv: Value,
}

#[derive(Debug)]
pub enum PortHandle {
    In(BufReader<File>),
    Out(File),
    Closed,
}

#[derive(Debug)]
pub struct PortData {
    /// String value naming the file.
    pub filename: Value,
    pub handle: PortHandle,
}

#[derive(Debug)]
pub enum ObjData {
    Pair(PairData),
    Str(StrData),
    Symbol(SymbolData),
    Env(EnvData),
    Operative(OperativeData),
    Applicative(ApplicativeData),
    Continuation(ContData),
    Port(PortData),
}

#[derive(Debug)]
pub struct Object {
    /// GC mark color.
    pub gc_marked: bool,
    pub flags: u8,
    pub data: ObjData,
}

/// Initial collection threshold (live objects). The ground environment
/// alone holds on the order of a thousand objects.
const INITIAL_THRESHOLD: usize = 16 * 1024;

#[derive(Debug)]
pub struct Heap {
    slots: Vec<Option<Object>>,
    free: Vec<u32>,
    live: usize,
    threshold: usize,
    min_threshold: usize,
    empty_string: Gc,
    mark_stack: Vec<Gc>,
}

impl Heap {
    pub fn new() -> Heap {
        let mut heap = Heap {
            slots: Vec::with_capacity(INITIAL_THRESHOLD),
            free: Vec::new(),
            live: 0,
            threshold: INITIAL_THRESHOLD,
            min_threshold: INITIAL_THRESHOLD,
            empty_string: Gc::new(0),
            mark_stack: Vec::new(),
        };
        // Slot 0: the canonical shared empty string. The collector
        // treats it as a root.
        heap.empty_string = heap.alloc(
            ObjData::Str(StrData { bytes: Vec::new() }),
            flags::STR_IMMUTABLE,
        );
        heap
    }

    pub fn alloc(&mut self, data: ObjData, flags: u8) -> Gc {
        self.live += 1;
        let object = Object {
            gc_marked: false,
            flags,
            data,
        };
        match self.free.pop() {
            Some(i) => {
                self.slots[i as usize] = Some(object);
                Gc::new(i as usize)
            }
            None => {
                self.slots.push(Some(object));
                Gc::new(self.slots.len() - 1)
            }
        }
    }

    pub fn live(&self) -> usize {
        self.live
    }

    pub fn needs_collect(&self) -> bool {
        self.live >= self.threshold
    }

    /// Lower the collection threshold (tests exercise the collector by
    /// forcing frequent runs). The threshold never grows back past
    /// twice the live count or this floor, whichever is larger.
    pub fn set_threshold(&mut self, threshold: usize) {
        self.threshold = threshold;
        self.min_threshold = threshold;
    }

    pub fn empty_string(&self) -> Value {
        Value::Obj(self.empty_string)
    }

    fn object(&self, gc: Gc) -> &Object {
        self.slots[gc.index()]
            .as_ref()
            .expect("access to freed heap slot")
    }

    fn object_mut(&mut self, gc: Gc) -> &mut Object {
        self.slots[gc.index()]
            .as_mut()
            .expect("access to freed heap slot")
    }

    // ---- tags and predicates -------------------------------------------

    pub fn tag_of(&self, v: Value) -> Tag {
        match v.immediate_tag() {
            Some(tag) => tag,
            None => match &self.object(v.as_obj().expect("boxed value")).data {
                ObjData::Pair(_) => Tag::Pair,
                ObjData::Str(_) => Tag::String,
                ObjData::Symbol(_) => Tag::Symbol,
                ObjData::Env(_) => Tag::Environment,
                ObjData::Operative(_) => Tag::Operative,
                ObjData::Applicative(_) => Tag::Applicative,
                ObjData::Continuation(_) => Tag::Continuation,
                ObjData::Port(_) => Tag::Port,
            },
        }
    }

    pub fn is_pair(&self, v: Value) -> bool {
        self.tag_of(v) == Tag::Pair
    }

    pub fn is_string(&self, v: Value) -> bool {
        self.tag_of(v) == Tag::String
    }

    pub fn is_symbol(&self, v: Value) -> bool {
        self.tag_of(v) == Tag::Symbol
    }

    pub fn is_environment(&self, v: Value) -> bool {
        self.tag_of(v) == Tag::Environment
    }

    pub fn is_operative(&self, v: Value) -> bool {
        self.tag_of(v) == Tag::Operative
    }

    pub fn is_applicative(&self, v: Value) -> bool {
        self.tag_of(v) == Tag::Applicative
    }

    pub fn is_combiner(&self, v: Value) -> bool {
        matches!(self.tag_of(v), Tag::Operative | Tag::Applicative)
    }

    pub fn is_continuation(&self, v: Value) -> bool {
        self.tag_of(v) == Tag::Continuation
    }

    pub fn is_port(&self, v: Value) -> bool {
        self.tag_of(v) == Tag::Port
    }

    // ---- typed access ---------------------------------------------------

    pub fn pair(&self, v: Value) -> &PairData {
        match &self.object(v.as_obj().expect("pair")).data {
            ObjData::Pair(p) => p,
            _ => panic!("pair access on non-pair"),
        }
    }

    pub fn pair_mut(&mut self, v: Value) -> &mut PairData {
        match &mut self.object_mut(v.as_obj().expect("pair")).data {
            ObjData::Pair(p) => p,
            _ => panic!("pair access on non-pair"),
        }
    }

    pub fn car(&self, v: Value) -> Value {
        self.pair(v).car
    }

    pub fn cdr(&self, v: Value) -> Value {
        self.pair(v).cdr
    }

    pub fn set_car(&mut self, v: Value, x: Value) {
        self.pair_mut(v).car = x;
    }

    pub fn set_cdr(&mut self, v: Value, x: Value) {
        self.pair_mut(v).cdr = x;
    }

    pub fn is_mutable_pair(&self, v: Value) -> bool {
        self.object(v.as_obj().expect("pair")).flags & flags::MUTABLE != 0
    }

    pub fn str_data(&self, v: Value) -> &StrData {
        match &self.object(v.as_obj().expect("string")).data {
            ObjData::Str(s) => s,
            _ => panic!("string access on non-string"),
        }
    }

    pub fn str_data_mut(&mut self, v: Value) -> &mut StrData {
        match &mut self.object_mut(v.as_obj().expect("string")).data {
            ObjData::Str(s) => s,
            _ => panic!("string access on non-string"),
        }
    }

    pub fn str_len(&self, v: Value) -> usize {
        self.str_data(v).bytes.len()
    }

    pub fn is_immutable_string(&self, v: Value) -> bool {
        self.object(v.as_obj().expect("string")).flags & flags::STR_IMMUTABLE != 0
    }

    pub fn symbol_data(&self, v: Value) -> &SymbolData {
        match &self.object(v.as_obj().expect("symbol")).data {
            ObjData::Symbol(s) => s,
            _ => panic!("symbol access on non-symbol"),
        }
    }

    /// Name of a symbol. Names are ASCII by construction.
    pub fn sym_str(&self, v: Value) -> &str {
        let name = self.symbol_data(v).name;
        std::str::from_utf8(&self.str_data(Value::Obj(name)).bytes).expect("ascii symbol name")
    }

    pub fn env(&self, v: Value) -> &EnvData {
        match &self.object(v.as_obj().expect("environment")).data {
            ObjData::Env(e) => e,
            _ => panic!("environment access on non-environment"),
        }
    }

    pub fn env_mut(&mut self, v: Value) -> &mut EnvData {
        match &mut self.object_mut(v.as_obj().expect("environment")).data {
            ObjData::Env(e) => e,
            _ => panic!("environment access on non-environment"),
        }
    }

    pub fn operative(&self, v: Value) -> &OperativeData {
        match &self.object(v.as_obj().expect("operative")).data {
            ObjData::Operative(o) => o,
            _ => panic!("operative access on non-operative"),
        }
    }

    pub fn applicative(&self, v: Value) -> &ApplicativeData {
        match &self.object(v.as_obj().expect("applicative")).data {
            ObjData::Applicative(a) => a,
            _ => panic!("applicative access on non-applicative"),
        }
    }

    pub fn cont(&self, v: Value) -> &ContData {
        match &self.object(v.as_obj().expect("continuation")).data {
            ObjData::Continuation(c) => c,
            _ => panic!("continuation access on non-continuation"),
        }
    }

    pub fn port(&self, v: Value) -> &PortData {
        match &self.object(v.as_obj().expect("port")).data {
            ObjData::Port(p) => p,
            _ => panic!("port access on non-port"),
        }
    }

    pub fn port_mut(&mut self, v: Value) -> &mut PortData {
        match &mut self.object_mut(v.as_obj().expect("port")).data {
            ObjData::Port(p) => p,
            _ => panic!("port access on non-port"),
        }
    }

    pub fn obj_flags(&self, v: Value) -> u8 {
        self.object(v.as_obj().expect("boxed value")).flags
    }

    pub fn set_obj_flag(&mut self, v: Value, flag: u8) {
        self.object_mut(v.as_obj().expect("boxed value")).flags |= flag;
    }

    pub fn clear_obj_flag(&mut self, v: Value, flag: u8) {
        self.object_mut(v.as_obj().expect("boxed value")).flags &= !flag;
    }

    // ---- collection -----------------------------------------------------

    /// Mark and sweep. `roots` must cover every live value the caller
    /// can still reach; the canonical empty string is always a root.
    pub fn collect(&mut self, roots: &[Value]) {
        let before = self.live;

        self.mark_value(Value::Obj(self.empty_string));
        for &root in roots {
            self.mark_value(root);
        }
        while let Some(gc) = self.mark_stack.pop() {
            let children = self.children_of(gc);
            for child in children {
                self.mark_value(child);
            }
        }

        for i in 0..self.slots.len() {
            match &mut self.slots[i] {
                Some(obj) if obj.gc_marked => obj.gc_marked = false,
                Some(_) => {
                    // Dropping the payload closes a still-open port.
                    self.slots[i] = None;
                    self.free.push(i as u32);
                    self.live -= 1;
                }
                None => {}
            }
        }

        self.threshold = (self.live * 2).max(self.min_threshold);
        tracing::debug!(before, after = self.live, "heap collected");
    }

    fn mark_value(&mut self, v: Value) {
        if let Value::Obj(gc) = v {
            let obj = self.object_mut(gc);
            if !obj.gc_marked {
                obj.gc_marked = true;
                self.mark_stack.push(gc);
            }
        }
    }

    fn children_of(&self, gc: Gc) -> Vec<Value> {
        match &self.object(gc).data {
            ObjData::Pair(p) => vec![p.car, p.cdr, p.mark],
            ObjData::Str(_) => Vec::new(),
            ObjData::Symbol(s) => vec![Value::Obj(s.name)],
            ObjData::Env(e) => {
                let mut children = vec![e.parents, e.bindings, e.keyed_parents, e.keyed_node];
                if let Some(table) = &e.table {
                    children.extend(table.values().copied());
                }
                children
            }
            ObjData::Operative(o) => match &o.kind {
                OperKind::Primitive { xparams, .. } => xparams.to_vec(),
                OperKind::Derived {
                    ptree,
                    eformal,
                    body,
                    senv,
                } => vec![*ptree, *eformal, *body, *senv],
            },
            ObjData::Applicative(a) => vec![a.underlying],
            ObjData::Continuation(c) => {
                let mut children = vec![c.parent, c.denv];
                children.extend(c.xparams.iter().copied());
                children
            }
            ObjData::Port(p) => vec![p.filename],
        }
    }
}

impl Default for Heap {
    fn default() -> Heap {
        Heap::new()
    }
}
