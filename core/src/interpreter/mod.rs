//! # Generator Engine
//!
//! Goal-directed evaluation over resumable node trees.
//!
//! ## Core Principles
//!
//! 1. **Failure is a result**: `advance` reports `Fail` as an ordinary outcome;
//!    faults travel separately as [`EngineError`]
//! 2. **Non-local exits are signals**: break, next, return and suspend move up
//!    the tree as [`Signal`] variants until a loop or method body claims them
//! 3. **Trees are reused**: method bodies are reset and returned to a
//!    per-context pool instead of being rebuilt per call
//! 4. **Co-expressions are threads**: each runs with its own context and
//!    hands control back and forth over one-slot channels

pub mod access;
pub mod body;
pub mod coexpr;
pub mod combinators;
pub mod context;
pub mod errors;
pub mod node;
pub mod pool;
pub mod registry;
pub mod scan;
pub mod stdlib;
pub mod types;

#[cfg(test)]
mod tests;

// Re-export commonly used items
pub use body::Body;
pub use coexpr::{CoExpression, CoState};
pub use context::{run_main, Context, RunMode};
pub use errors::EngineError;
pub use node::{Generator, Keyword, Node};
pub use pool::{MethodBodyPool, PoolStats};
pub use registry::{Operation, Output, Program, ProgramBuilder};
pub use scan::ScanFunction;
pub use types::{Atom, Cell, Globals, Key, ScanEnv, Set, Signal, Step, Value};
