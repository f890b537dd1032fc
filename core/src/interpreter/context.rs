//! Execution context
//!
//! One [`Context`] exists per thread of evaluation: the main program and every
//! co-expression get their own. It carries the program, the configuration, the
//! method body pool, the co-expression currently running and the innermost
//! string scanning environment.

use super::body::Body;
use super::coexpr::CoExpression;
use super::errors::EngineError;
use super::pool::MethodBodyPool;
use super::registry::Program;
use super::types::{ScanEnv, Signal, Value};
use crate::config::EngineConfig;
use std::sync::Arc;
use tracing::info;

/// How many results of `main` to collect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    First,
    All,
}

pub struct Context {
    program: Arc<Program>,
    config: Arc<EngineConfig>,
    pool: MethodBodyPool,
    current: CoExpression,
    main: CoExpression,
    scan: ScanEnv,
}

impl Context {
    pub fn new(program: Arc<Program>) -> Self {
        Self::with_config(program, Arc::new(EngineConfig::default()))
    }

    pub fn with_config(program: Arc<Program>, config: Arc<EngineConfig>) -> Self {
        let root = CoExpression::root();
        Self::for_coexpr(program, config, root.clone(), root)
    }

    pub(crate) fn for_coexpr(
        program: Arc<Program>,
        config: Arc<EngineConfig>,
        current: CoExpression,
        main: CoExpression,
    ) -> Self {
        Self {
            program,
            config,
            pool: MethodBodyPool::new(),
            current,
            main,
            scan: ScanEnv::default(),
        }
    }

    pub fn program(&self) -> &Arc<Program> {
        &self.program
    }

    pub fn config(&self) -> &Arc<EngineConfig> {
        &self.config
    }

    pub fn current(&self) -> &CoExpression {
        &self.current
    }

    /// The program's outermost co-expression (`&main`)
    pub fn main(&self) -> &CoExpression {
        &self.main
    }

    /// The scanning environment `&subject` and `&pos` refer to
    pub fn scan(&self) -> &ScanEnv {
        &self.scan
    }

    /// Install `env` as the current scanning environment, returning the
    /// one it replaces
    pub(crate) fn swap_scan(&mut self, env: ScanEnv) -> ScanEnv {
        std::mem::replace(&mut self.scan, env)
    }

    pub fn pool(&self) -> &MethodBodyPool {
        &self.pool
    }

    /// A ready-to-bind body for `method`: an idle pooled instance when
    /// pooling is on, otherwise a fresh tree
    pub fn construct(&mut self, method: &str) -> Result<Body, EngineError> {
        if self.config.pool_enabled {
            if let Some(body) = self.pool.checkout(method) {
                return Ok(body);
            }
        }
        let constructor = self
            .program
            .constructor(method)
            .ok_or_else(|| EngineError::UnknownCallee(method.to_string()))?;
        let mut body = constructor(self.program.globals());
        body.set_pool_key(method.into());
        Ok(body)
    }

    /// Reset `body` and hand it back to the pool
    pub fn release(&mut self, mut body: Body) {
        body.reset(self);
        if self.config.pool_enabled {
            self.pool.release(body);
        }
    }

    /// Construct and bind a call of `method`
    pub fn call(&mut self, method: &str, args: &[Value]) -> Result<Body, EngineError> {
        let mut body = self.construct(method)?;
        body.unpack_args(args);
        Ok(body)
    }

    /// Every result of `method(args)`
    pub fn results(&mut self, method: &str, args: &[Value]) -> Result<Vec<Value>, EngineError> {
        let mut body = self.call(method, args)?;
        let results = body.collect(self);
        self.release(body);
        results
    }

    /// First result of `method(args)`, or `None` when the call fails
    pub fn first(&mut self, method: &str, args: &[Value]) -> Result<Option<Value>, EngineError> {
        let mut body = self.call(method, args)?;
        let result = body.advance(self).map(|signal| match signal {
            Signal::Yield(atom) => Some(atom.deref()),
            _ => None,
        });
        self.release(body);
        result
    }
}

/// Run `main` inside an entry co-expression, passing `args` as one list
pub fn run_main(
    program: Arc<Program>,
    config: Arc<EngineConfig>,
    args: Vec<Value>,
    mode: RunMode,
) -> Result<Vec<Value>, EngineError> {
    if !program.has_method("main") {
        return Err(EngineError::UnknownCallee("main".to_string()));
    }
    let mut cx = Context::with_config(program.clone(), config.clone());
    let entry = CoExpression::entry(program, config, "main");
    info!(coexpr = entry.id(), "starting main");

    let mut results = Vec::new();
    let mut transfer = Value::list(args);
    while let Some(value) = CoExpression::activate(&mut cx, &entry, transfer)? {
        results.push(value);
        if mode == RunMode::First {
            break;
        }
        transfer = Value::Null;
    }
    Ok(results)
}
