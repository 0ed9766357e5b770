//! A host-testable FORTH-83/2012-leaning interpreter: a threaded-code
//! dictionary and compiler, an outer interpreter, a block I/O cache, and
//! a companion set-associative data cache simulator.
//!
//! See [`vm::Vm`] for the tagged-dispatch executor that stands in for
//! real machine code, and `DESIGN.md` at the repository root for how
//! each module is grounded.

pub mod block;
pub mod cell;
pub mod compiler;
pub mod config;
pub mod dcache;
pub mod dict;
pub mod error;
pub mod input;
pub mod interpreter;
#[macro_use]
pub mod logging;
pub mod parser;
pub mod strings;
pub mod vm;

pub use error::{ForthError, Result};
pub use vm::Vm;
