pub mod cli;
pub mod config;
pub mod interpreter;
pub mod model;

// Re-export main types
pub use crate::config::EngineConfig;
pub use interpreter::{
    run_main, Body, CoExpression, Context, EngineError, Generator, Node, Program, RunMode, Value,
};
pub use model::{compile, ProgramDecl};
