//! Vau Runtime: the evaluator core of the Kernel interpreter
//!
//! The runtime owns everything between the tagged value representation
//! (`vau-core`) and the surface syntax (`vau-reader`): the heap arena and
//! mark/sweep collector, first-class environments with multi-parent
//! lookup and keyed variables, first-class continuations, the
//! trampolined evaluator, and the whole ground environment.
//!
//! Everything runs against one explicit [`State`]; there is no ambient
//! interpreter state. Primitives receive `&mut State` plus their extra
//! parameters, and finish by scheduling the next trampoline step with
//! [`State::tail_eval`] or [`State::apply_cc`]. Faults are ordinary
//! `Result` values carrying an [`Error`] with a recoverability flag; the
//! trampoline unwinds them to its caller.
//!
//! # Modules
//!
//! - `heap`: slot arena, object payloads, mark/sweep collection
//! - `state`: the interpreter state, shadow stacks, allocation wrappers
//! - `error`: the error taxonomy and the `*ERROR*` report
//! - `marks`: the pair mark discipline (cycle detection + piggybacking)
//! - `pairs`: cycle-aware list walking, copying, splicing
//! - `equal`: structural equality over cyclic graphs
//! - `env`: environment records, lookup, keyed variables
//! - `combiner`: operative/applicative records
//! - `cont`: continuation records and the ancestry probe
//! - `eval`: the trampoline and the combination protocol
//! - `ptree`: parameter-tree validation and matching
//! - `args`: operand-tree destructuring helpers
//! - `control`, `env_ops`, `combiner_ops`, `cont_ops`, `pair_ops`,
//!   `arithmetic`, `string_ops`, `char_ops`, `ports`: ground primitives
//! - `ground`: ground-environment registration

pub mod args;
pub mod arithmetic;
pub mod char_ops;
pub mod combiner;
pub mod combiner_ops;
pub mod cont;
pub mod cont_ops;
pub mod control;
pub mod env;
pub mod env_ops;
pub mod equal;
pub mod error;
pub mod eval;
pub mod ground;
pub mod heap;
pub mod marks;
pub mod pair_ops;
pub mod pairs;
pub mod ports;
pub mod ptree;
pub mod state;
pub mod string_ops;

pub use error::{Error, ErrorKind, Result};
pub use heap::{Heap, ObjData, flags};
pub use state::State;
pub use vau_core::{FIXINT_MAX, FIXINT_MIN, Gc, RootStack, SourceInfo, Tag, Value, fixint_wrap};
