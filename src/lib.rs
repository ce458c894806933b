//! A small Scheme interpreter.
//!
//! Values live in an arena heap managed by a mark-sweep collector. The
//! evaluator handles `if`, `define`, `lambda`, `and` and `or` natively and
//! applies primitives and closures; everything else is a library of
//! primitive procedures bound in the global environment.

pub mod config;
pub mod env;
pub mod error;
pub mod eval;
pub mod heap;
pub mod primitives;
pub mod printer;
pub mod reader;
pub mod stack;
pub mod symbol;
pub mod value;

pub use config::Limits;
pub use error::{SchemeError, SchemeResult};
pub use eval::Machine;
pub use value::Value;
