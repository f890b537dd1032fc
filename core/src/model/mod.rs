//! Serialized program model and its compiler

pub mod ast;
pub mod compile;

pub use ast::{Expr, Literal, MethodDecl, ProgramDecl, RecordDecl};
pub use compile::{compile, compile_with_output, validate, ModelError};
