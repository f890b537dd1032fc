//! Shared test helpers

use crate::config::EngineConfig;
use crate::interpreter::{Context, EngineError, Generator, Node, Output, Program, Signal, Value};
use crate::model::{compile_with_output, ProgramDecl};
use std::sync::Arc;

/// Guard against runaway generators in tests
const MAX_RESULTS: usize = 1000;

/// Context over a program with only the standard operations
pub fn empty_context() -> Context {
    Context::new(Arc::new(Program::builder().build()))
}

/// Drive `node` until it fails, collecting dereferenced results
pub fn drain(node: &mut Node, cx: &mut Context) -> Result<Vec<Value>, EngineError> {
    let mut results = Vec::new();
    while results.len() < MAX_RESULTS {
        match node.advance(cx)? {
            Signal::Yield(atom) => results.push(atom.deref()),
            Signal::Fail => return Ok(results),
            other => panic!("unexpected signal at top level: {:?}", other),
        }
    }
    panic!("node produced more than {} results", MAX_RESULTS);
}

/// Take up to `n` results without resetting
pub fn take(node: &mut Node, cx: &mut Context, n: usize) -> Vec<Value> {
    let mut results = Vec::new();
    while results.len() < n {
        match node.advance(cx).expect("advance failed") {
            Signal::Yield(atom) => results.push(atom.deref()),
            _ => break,
        }
    }
    results
}

pub fn images(values: &[Value]) -> Vec<String> {
    values.iter().map(Value::image).collect()
}

pub fn ints(values: &[Value]) -> Vec<i64> {
    values
        .iter()
        .map(|v| v.to_integer().expect("integer result"))
        .collect()
}

pub fn int(value: i64) -> Node {
    Node::constant(value)
}

/// Call of a standard operation
pub fn op(name: &str, args: Vec<Node>) -> Node {
    Node::invoke(name, args)
}

/// Parse program JSON, serialize and deserialize it again, then compile with
/// output captured in a buffer
pub fn load_program(source: &str) -> (Arc<Program>, Output) {
    let decl = ProgramDecl::from_json(source).expect("Parse program failed");
    let json = decl.to_json().expect("Program serialization failed");
    let decl = ProgramDecl::from_json(&json).expect("Program deserialization failed");
    let output = Output::buffer();
    let program = compile_with_output(&decl, output.clone()).expect("Compile failed");
    (Arc::new(program), output)
}

pub fn context_with(program: &Arc<Program>, config: EngineConfig) -> Context {
    Context::with_config(program.clone(), Arc::new(config))
}
