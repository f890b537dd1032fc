//! Standard library operations
//!
//! Every operation takes its arguments by slice and produces one value or
//! fails. Missing arguments read as null.

pub mod io;
pub mod math;
pub mod strings;
pub mod structures;

use super::errors::EngineError;
use super::registry::{Operation, Output};
use super::types::Value;

pub type OpResult = Result<Option<Value>, EngineError>;

/// Argument at `index`, null when absent
pub(crate) fn arg(args: &[Value], index: usize) -> Value {
    args.get(index).cloned().unwrap_or(Value::Null)
}

/* ===================== Registration ===================== */

/// All standard operations; `write` and `writes` print to `output`
pub fn operations(output: &Output) -> Vec<Operation> {
    let mut ops = vec![
        // Arithmetic
        Operation::new("+", math::add),
        Operation::new("-", math::sub),
        Operation::new("*", math::mul),
        Operation::new("/", math::div),
        Operation::new("%", math::rem),
        Operation::new("^", math::pow),
        Operation::new("neg", math::neg),
        Operation::new("abs", math::abs),
        Operation::new("max", math::max),
        Operation::new("min", math::min),
        // Comparison
        Operation::new("<", math::lt),
        Operation::new("<=", math::le),
        Operation::new(">", math::gt),
        Operation::new(">=", math::ge),
        Operation::new("=", math::num_eq),
        Operation::new("~=", math::num_ne),
        Operation::new("==", strings::str_eq),
        Operation::new("~==", strings::str_ne),
        Operation::new("<<", strings::str_lt),
        Operation::new(">>", strings::str_gt),
        Operation::new("===", structures::same),
        Operation::new("~===", structures::not_same),
        // Strings
        Operation::new("||", strings::concat),
        Operation::new("string", strings::string),
        Operation::new("integer", strings::integer),
        Operation::new("real", strings::real),
        Operation::new("type", strings::type_of),
        Operation::new("image", strings::image),
        Operation::new("repl", strings::repl),
        Operation::new("reverse", strings::reverse),
        // Structures
        Operation::new("size", structures::size),
        Operation::new("list", structures::list),
        Operation::new("table", structures::table),
        Operation::new("put", structures::put),
        Operation::new("push", structures::push),
        Operation::new("pop", structures::pop),
        Operation::new("get", structures::pop),
        Operation::new("pull", structures::pull),
        Operation::new("insert", structures::insert),
        Operation::new("delete", structures::delete),
        Operation::new("member", structures::member),
        Operation::new("set", structures::set),
        Operation::new("++", structures::union),
        Operation::new("**", structures::intersection),
        Operation::new("--", structures::difference),
        Operation::new("sort", structures::sort),
        Operation::new("copy", structures::copy),
        Operation::new("refresh", structures::refresh),
    ];

    let out = output.clone();
    ops.push(Operation::new("write", move |args| io::write(&out, args)));
    let out = output.clone();
    ops.push(Operation::new("writes", move |args| io::writes(&out, args)));
    ops
}
