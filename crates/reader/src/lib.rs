//! Vau Reader: the surface syntax of the Kernel interpreter.
//!
//! The reader turns source text into object-model values (pairs carry
//! source positions, `#n=`/`#n#` datum labels build shared and cyclic
//! structure); the writer renders any value back out, detecting cycles
//! and sharing and emitting datum labels for them.

pub mod printer;
pub mod reader;

pub use printer::write_value;
pub use reader::{ReadError, Reader, read_all};
