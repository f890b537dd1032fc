//! Method bodies
//!
//! A [`Body`] is the root of one method's node tree together with the cells
//! its parameters and locals live in. Bodies are built by the method's
//! constructor, bound to arguments through the unpack closure, and recycled
//! through the context's pool.

use super::context::Context;
use super::errors::EngineError;
use super::node::{Generator, Node};
use super::types::{Cell, Signal, Step, Value};
use std::sync::Arc;

type Unpack = Box<dyn FnMut(&[Value])>;

pub struct Body {
    name: Arc<str>,
    pool_key: Option<Arc<str>>,
    root: Node,
    locals: Vec<Cell>,
    unpack: Option<Unpack>,
    finished: bool,
}

impl Body {
    pub fn new(name: &str, root: Node) -> Self {
        Self {
            name: name.into(),
            pool_key: None,
            root,
            locals: Vec::new(),
            unpack: None,
            finished: false,
        }
    }

    /// Cells cleared to null every time the body is reset
    pub fn with_locals(mut self, locals: Vec<Cell>) -> Self {
        self.locals.extend(locals);
        self
    }

    pub fn with_unpack(mut self, unpack: impl FnMut(&[Value]) + 'static) -> Self {
        self.unpack = Some(Box::new(unpack));
        self
    }

    /// Bind positional arguments to `params`. Missing arguments become null;
    /// with `variadic` the last parameter receives the remaining arguments as
    /// a list.
    pub fn with_params(mut self, params: Vec<Cell>, variadic: bool) -> Self {
        self.locals.extend(params.iter().cloned());
        self.with_unpack(move |args| bind_params(&params, variadic, args))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pool_key(&self) -> Option<&Arc<str>> {
        self.pool_key.as_ref()
    }

    pub(crate) fn set_pool_key(&mut self, key: Arc<str>) {
        self.pool_key = Some(key);
    }

    pub fn unpack_args(&mut self, args: &[Value]) {
        if let Some(unpack) = &mut self.unpack {
            unpack(args);
        }
    }

    /// True once the body returned; further advances fail
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Next result of the call
    ///
    /// `suspend` and `return` values come out as ordinary results with local
    /// cells dereferenced. Falling off the end, failing, or returning a
    /// failed expression ends the call with failure.
    pub fn advance(&mut self, cx: &mut Context) -> Step {
        if self.finished {
            return Ok(Signal::Fail);
        }
        match self.root.advance(cx) {
            Ok(Signal::Suspend(atom)) => Ok(Signal::Yield(atom.escape())),
            Ok(Signal::Return(Some(atom))) => {
                self.finished = true;
                Ok(Signal::Yield(atom.escape()))
            }
            Ok(Signal::Return(None)) | Ok(Signal::Yield(_)) | Ok(Signal::Fail) => {
                self.finished = true;
                Ok(Signal::Fail)
            }
            Ok(Signal::Break(_)) | Ok(Signal::Next) => {
                self.finished = true;
                Err(EngineError::StrayBreak.within(&self.name))
            }
            Err(err) => {
                self.finished = true;
                Err(err.within(&self.name))
            }
        }
    }

    pub fn reset(&mut self, cx: &mut Context) {
        self.root.reset(cx);
        for cell in &self.locals {
            cell.set(Value::Null);
        }
        self.finished = false;
    }

    /// Drive the body to exhaustion, collecting dereferenced results
    pub fn collect(&mut self, cx: &mut Context) -> Result<Vec<Value>, EngineError> {
        let mut results = Vec::new();
        while let Signal::Yield(atom) = self.advance(cx)? {
            results.push(atom.deref());
        }
        Ok(results)
    }
}

fn bind_params(params: &[Cell], variadic: bool, args: &[Value]) {
    let fixed = if variadic {
        params.len().saturating_sub(1)
    } else {
        params.len()
    };
    for (position, cell) in params.iter().take(fixed).enumerate() {
        cell.set(args.get(position).cloned().unwrap_or(Value::Null));
    }
    if variadic {
        if let Some(rest) = params.last() {
            let extra = args.get(fixed..).map(<[Value]>::to_vec).unwrap_or_default();
            rest.set(Value::list(extra));
        }
    }
}
