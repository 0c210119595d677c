//! The interpreter state.
//!
//! One `State` value owns the whole runtime: the heap, the current
//! continuation register, the pending trampoline step, the ground
//! environment, the shadow stacks, and the dummy-pair list anchors. It
//! is passed explicitly to every primitive; nothing is ambient.
//!
//! # GC protocol
//!
//! The collector may run inside any allocation wrapper on this type and
//! nowhere else. At that moment every live value must be reachable from
//! the root set: the registers (`cc`, the pending work, the ground
//! environment, the `list` applicative), the activation stack (the
//! continuation or operative currently executing, plus its operand tree
//! and dynamic environment), the shadow value stack, the work stacks,
//! and the dummy anchors. The wrappers root their own arguments, so a
//! single allocation is always safe; code that holds a value across two
//! allocations must root it with [`State::push_root`] in between.
//!
//! # Trampoline
//!
//! Primitives never recurse through the host stack. They finish by
//! calling [`State::tail_eval`] or [`State::apply_cc`], which store the
//! next step in the work register; [`State::run`] loops until the root
//! continuation receives a value or a primitive returns an error. On
//! error the shadow stacks are restored to their pre-run depths before
//! the error is handed to the caller.

use vau_core::{RootStack, Value};

use crate::cont;
use crate::error::Result;
use crate::eval;
use crate::ground;
use crate::heap::{ContData, EnvData, Heap, ObjData, PairData, StrData, SymbolData, flags};

/// The pending trampoline step.
#[derive(Debug, Clone, Copy)]
pub enum Work {
    /// Nothing scheduled (only outside `run`).
    Idle,
    /// Tail-evaluate `expr` in `env`, delivering to `cc`.
    Eval { expr: Value, env: Value },
    /// Deliver `value` to `cc`.
    Return(Value),
}

pub struct State {
    pub heap: Heap,
    /// Shadow value stack (transient allocation roots).
    pub roots: RootStack,
    /// Explicit work stack used by environment lookup and the
    /// structural copy.
    pub wstack: Vec<Value>,
    /// State-byte stack paired with `wstack` by the structural copy.
    pub tbstack: Vec<u8>,
    cc: Value,
    work: Work,
    work_gen: u64,
    /// The continuation or combiner currently executing, with its
    /// operand tree and dynamic environment. Rooted.
    pub(crate) activation: Vec<Value>,
    pub ground_env: Value,
    /// The ground `list` applicative; the let family builds
    /// `(list . exprs)` combinations with it.
    pub list_app: Value,
    dummies: [Value; 3],
}

impl State {
    /// A fresh interpreter with a fully populated ground environment.
    pub fn new() -> State {
        let mut st = State {
            heap: Heap::new(),
            roots: RootStack::new(),
            wstack: Vec::new(),
            tbstack: Vec::new(),
            cc: Value::Nil,
            work: Work::Idle,
            work_gen: 0,
            activation: Vec::new(),
            ground_env: Value::Nil,
            list_app: Value::Nil,
            dummies: [Value::Nil; 3],
        };
        for i in 0..st.dummies.len() {
            st.dummies[i] = st.cons(Value::Inert, Value::Nil);
        }
        st.ground_env = st.alloc_env(EnvData {
            parents: Value::EmptyEnv,
            bindings: Value::Nil,
            table: Some(std::collections::HashMap::new()),
            keyed_parents: Value::EmptyEnv,
            keyed_node: Value::Nil,
        });
        ground::init_ground(&mut st);
        st
    }

    // ---- registers ------------------------------------------------------

    pub fn cc(&self) -> Value {
        self.cc
    }

    pub fn set_cc(&mut self, cont: Value) {
        debug_assert!(self.heap.is_continuation(cont));
        self.cc = cont;
    }

    /// Schedule evaluation of `expr` in `env` as the next step.
    pub fn tail_eval(&mut self, expr: Value, env: Value) {
        self.work = Work::Eval { expr, env };
        self.work_gen += 1;
    }

    /// Schedule delivery of `value` to the current continuation.
    pub fn apply_cc(&mut self, value: Value) {
        self.work = Work::Return(value);
        self.work_gen += 1;
    }

    // ---- the trampoline -------------------------------------------------

    /// Evaluate `expr` in `env` under a fresh root continuation and run
    /// to completion.
    pub fn run(&mut self, expr: Value, env: Value) -> Result<Value> {
        let saved_roots = self.roots.depth();
        let saved_w = self.wstack.len();
        let saved_tb = self.tbstack.len();

        self.push_root(expr);
        self.push_root(env);
        let root = cont::make_continuation(self, Value::Nil, "root", cont::do_root, &[], Value::Nil);
        self.roots.discard(2);
        self.cc = root;
        self.tail_eval(expr, env);

        let result = self.trampoline();
        if result.is_err() {
            // Restore the shadow stacks to their pre-call depths; mark
            // users have already cleared their own marks on the way out.
            self.roots.truncate(saved_roots);
            self.wstack.truncate(saved_w);
            self.tbstack.truncate(saved_tb);
            self.activation.clear();
        }
        self.work = Work::Idle;
        result
    }

    fn trampoline(&mut self) -> Result<Value> {
        loop {
            // The work register stays populated while the step runs, so
            // the values it names remain rooted across allocations.
            let gen_ = self.work_gen;
            match self.work {
                Work::Idle => panic!("trampoline started without scheduled work"),
                Work::Eval { expr, env } => eval::step(self, expr, env)?,
                Work::Return(value) => {
                    let cont_value = self.cc;
                    let data = self.heap.cont(cont_value);
                    if data.parent.is_nil() {
                        // Root continuation terminates the loop.
                        return Ok(value);
                    }
                    let f = data.f;
                    let parent = data.parent;
                    let xparams: Vec<Value> = data.xparams.to_vec();
                    let depth = self.activation.len();
                    self.activation.push(cont_value);
                    self.cc = parent;
                    let r = f(self, &xparams, value);
                    self.activation.truncate(depth);
                    r?;
                }
            }
            debug_assert!(
                self.work_gen != gen_,
                "a primitive returned without scheduling the next step"
            );
        }
    }

    // ---- shadow stacks --------------------------------------------------

    pub fn push_root(&mut self, v: Value) {
        self.roots.push(v);
    }

    pub fn pop_root(&mut self) -> Value {
        self.roots.pop()
    }

    // ---- dummy anchors --------------------------------------------------

    /// A rooted dummy pair whose cdr accumulates a list under
    /// construction. Three anchors, as in the tail-first build idiom.
    pub fn dummy(&self, i: usize) -> Value {
        self.dummies[i]
    }

    /// Detach and return the list accumulated behind dummy `i`.
    pub fn cutoff_dummy(&mut self, i: usize) -> Value {
        let d = self.dummies[i];
        let list = self.heap.cdr(d);
        self.heap.set_cdr(d, Value::Nil);
        list
    }

    // ---- allocation wrappers --------------------------------------------

    fn collect_point(&mut self, extra: &[Value]) {
        if self.heap.needs_collect() {
            let mut roots: Vec<Value> = Vec::with_capacity(
                extra.len()
                    + 8
                    + self.activation.len()
                    + self.roots.depth()
                    + self.wstack.len(),
            );
            roots.extend_from_slice(extra);
            roots.push(self.cc);
            match self.work {
                Work::Idle => {}
                Work::Eval { expr, env } => {
                    roots.push(expr);
                    roots.push(env);
                }
                Work::Return(v) => roots.push(v),
            }
            roots.push(self.ground_env);
            roots.push(self.list_app);
            roots.extend_from_slice(&self.dummies);
            roots.extend(self.activation.iter().copied());
            roots.extend(self.roots.iter().copied());
            roots.extend(self.wstack.iter().copied());
            self.heap.collect(&roots);
        }
    }

    /// Allocate a mutable pair.
    pub fn cons(&mut self, car: Value, cdr: Value) -> Value {
        self.cons_g(true, car, cdr)
    }

    /// Allocate a pair, mutable or immutable.
    pub fn cons_g(&mut self, mutable: bool, car: Value, cdr: Value) -> Value {
        self.collect_point(&[car, cdr]);
        let f = if mutable { flags::MUTABLE } else { 0 };
        Value::Obj(self.heap.alloc(
            ObjData::Pair(PairData {
                car,
                cdr,
                mark: Value::FALSE,
                si: None,
            }),
            f,
        ))
    }

    /// Allocate a mutable pair carrying reader source info.
    pub fn cons_si(&mut self, car: Value, cdr: Value, si: vau_core::SourceInfo) -> Value {
        let p = self.cons(car, cdr);
        self.heap.pair_mut(p).si = Some(si);
        p
    }

    /// Allocate a mutable string. The empty string is the canonical
    /// shared (immutable) one.
    pub fn string(&mut self, bytes: &[u8]) -> Value {
        if bytes.is_empty() {
            return self.heap.empty_string();
        }
        self.collect_point(&[]);
        Value::Obj(self.heap.alloc(
            ObjData::Str(StrData {
                bytes: bytes.to_vec(),
            }),
            0,
        ))
    }

    /// Allocate an immutable string.
    pub fn string_imm(&mut self, bytes: &[u8]) -> Value {
        if bytes.is_empty() {
            return self.heap.empty_string();
        }
        self.collect_point(&[]);
        Value::Obj(self.heap.alloc(
            ObjData::Str(StrData {
                bytes: bytes.to_vec(),
            }),
            flags::STR_IMMUTABLE,
        ))
    }

    /// Allocate a mutable string of `len` copies of `fill`.
    pub fn string_filled(&mut self, len: usize, fill: u8) -> Value {
        if len == 0 {
            return self.heap.empty_string();
        }
        self.collect_point(&[]);
        Value::Obj(self.heap.alloc(
            ObjData::Str(StrData {
                bytes: vec![fill; len],
            }),
            0,
        ))
    }

    /// Allocate a symbol (name copied into a fresh immutable string).
    pub fn symbol(&mut self, name: &str) -> Value {
        self.symbol_g(name, None)
    }

    pub fn symbol_g(&mut self, name: &str, si: Option<vau_core::SourceInfo>) -> Value {
        let name_str = self.string_imm(name.as_bytes());
        self.collect_point(&[name_str]);
        Value::Obj(self.heap.alloc(
            ObjData::Symbol(SymbolData {
                name: name_str.as_obj().expect("string handle"),
                si,
            }),
            0,
        ))
    }

    pub(crate) fn alloc_env(&mut self, data: EnvData) -> Value {
        let roots = [data.parents, data.bindings, data.keyed_parents, data.keyed_node];
        self.collect_point(&roots);
        Value::Obj(self.heap.alloc(ObjData::Env(data), 0))
    }

    pub(crate) fn alloc_cont(&mut self, data: ContData) -> Value {
        let mut roots = vec![data.parent, data.denv];
        roots.extend(data.xparams.iter().copied());
        self.collect_point(&roots);
        Value::Obj(self.heap.alloc(ObjData::Continuation(data), 0))
    }

    pub(crate) fn alloc_raw(&mut self, data: ObjData, f: u8, extra_roots: &[Value]) -> Value {
        self.collect_point(extra_roots);
        Value::Obj(self.heap.alloc(data, f))
    }

    // ---- convenience ----------------------------------------------------

    /// Build a one-element list.
    pub fn list1(&mut self, a: Value) -> Value {
        self.cons(a, Value::Nil)
    }

    /// Build a two-element list.
    pub fn list2(&mut self, a: Value, b: Value) -> Value {
        let tail = self.cons(b, Value::Nil);
        self.cons(a, tail)
    }
}

impl Default for State {
    fn default() -> State {
        State::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ground_environment_is_populated() {
        let mut st = State::new();
        let sym = st.symbol("cons");
        let ground = st.ground_env;
        let v = crate::env::get_binding(&mut st, ground, sym).unwrap();
        assert!(st.heap.is_applicative(v));
    }

    #[test]
    fn dummy_anchor_cutoff() {
        let mut st = State::new();
        let d = st.dummy(0);
        let p = st.cons(Value::Fixint(1), Value::Nil);
        st.heap.set_cdr(d, p);
        let list = st.cutoff_dummy(0);
        assert_eq!(st.heap.car(list), Value::Fixint(1));
        assert!(st.heap.cdr(st.dummy(0)).is_nil());
    }

    #[test]
    fn collection_keeps_rooted_values() {
        let mut st = State::new();
        st.heap.set_threshold(1);
        let p = st.cons(Value::Fixint(5), Value::Nil);
        st.push_root(p);
        // every allocation is now a collection point
        let q = st.cons(Value::Fixint(6), p);
        st.pop_root();
        assert_eq!(st.heap.car(p), Value::Fixint(5));
        assert_eq!(st.heap.car(st.heap.cdr(q)), Value::Fixint(5));
    }

    #[test]
    fn self_evaluating_run() {
        let mut st = State::new();
        let ground = st.ground_env;
        let env = crate::env::make_environment(&mut st, ground);
        let r = st.run(Value::Fixint(42), env).unwrap();
        assert_eq!(r, Value::Fixint(42));
    }
}
