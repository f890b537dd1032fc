//! Engine faults
//!
//! Generator failure and the non-local exits (break, next, return, suspend)
//! are ordinary results carried by [`Signal`](super::types::Signal). The
//! variants here are genuine faults: they abort the current call chain and
//! travel up to the embedding layer.

use super::types::Value;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// An external operation rejected its input
    #[error("{operation}: {message}")]
    Host { operation: String, message: String },

    #[error("unknown method or operation '{0}'")]
    UnknownCallee(String),

    #[error("{expected} expected, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: String,
    },

    #[error("value is not a variable: {0}")]
    NotAddressable(String),

    #[error("record {record} has no field '{field}'")]
    NoSuchField { record: String, field: String },

    #[error("range step must not be zero")]
    ZeroStep,

    #[error("loop exit escaped method body")]
    StrayBreak,

    #[error("co-expression #{0} has terminated")]
    CoexprTerminated(u64),

    #[error("co-expression #{0} is already running")]
    CoexprRunning(u64),

    #[error("co-expression channel closed: {0}")]
    ChannelClosed(String),

    #[error("failed to start co-expression thread: {0}")]
    Spawn(String),

    /// A fault annotated with the method it surfaced in
    #[error("in {method}: {source}")]
    InMethod {
        method: String,
        #[source]
        source: Box<EngineError>,
    },
}

impl EngineError {
    pub fn host(operation: impl Into<String>, message: impl Into<String>) -> Self {
        EngineError::Host {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn type_mismatch(expected: &'static str, found: &Value) -> Self {
        EngineError::TypeMismatch {
            expected,
            found: found.image(),
        }
    }

    /// Annotate with the innermost method only; outer frames keep the
    /// original annotation.
    pub fn within(self, method: &str) -> Self {
        match self {
            EngineError::InMethod { .. } => self,
            other => EngineError::InMethod {
                method: method.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// The fault with any method annotation stripped
    pub fn root(&self) -> &EngineError {
        match self {
            EngineError::InMethod { source, .. } => source.root(),
            other => other,
        }
    }
}
