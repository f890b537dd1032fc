//! Generator results and non-local exits

use super::cell::Atom;
use super::values::Value;
use crate::interpreter::errors::EngineError;

/// Outcome of one `advance` call
///
/// `Yield` and `Fail` are the ordinary results. The remaining variants are
/// non-local exits that travel up through enclosing nodes until a loop or
/// method body claims them.
#[derive(Debug, Clone)]
pub enum Signal {
    Yield(Atom),
    Fail,
    /// Leave the nearest loop; `None` makes the loop fail
    Break(Option<Atom>),
    Next,
    /// End the method body; `None` makes the call fail
    Return(Option<Atom>),
    /// Hand a result to the method's caller, resuming here afterwards
    Suspend(Atom),
}

impl Signal {
    pub fn is_exit(&self) -> bool {
        !matches!(self, Signal::Yield(_) | Signal::Fail)
    }

    pub fn value(value: impl Into<Value>) -> Signal {
        Signal::Yield(Atom::Value(value.into()))
    }
}

pub type Step = Result<Signal, EngineError>;
