//! Program registry: method constructors, operations, globals and records

use super::body::Body;
use super::errors::EngineError;
use super::stdlib;
use super::types::{Globals, Record, Value};
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::io::Write;
use std::sync::Arc;

/// Builds one fresh node tree for a method
pub type Constructor = Arc<dyn Fn(&Globals) -> Body + Send + Sync>;

type OperationFn = dyn Fn(&[Value]) -> Result<Option<Value>, EngineError> + Send + Sync;

/* ===================== Operations ===================== */

/// A named variadic operation: one value, or `None` for failure
#[derive(Clone)]
pub struct Operation {
    name: Arc<str>,
    func: Arc<OperationFn>,
}

impl Operation {
    pub fn new(
        name: &str,
        func: impl Fn(&[Value]) -> Result<Option<Value>, EngineError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invoke; faults are reported under the operation's name
    pub fn call(&self, args: &[Value]) -> Result<Option<Value>, EngineError> {
        (self.func)(args).map_err(|err| match err {
            EngineError::Host { .. } => err,
            other => EngineError::host(self.name.to_string(), other.to_string()),
        })
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Operation({})", self.name)
    }
}

/* ===================== Output ===================== */

/// Destination of the `write` family of operations
#[derive(Clone, Default)]
pub enum Output {
    #[default]
    Stdout,
    Buffer(Arc<Mutex<String>>),
}

impl Output {
    pub fn buffer() -> Self {
        Output::Buffer(Arc::new(Mutex::new(String::new())))
    }

    pub fn write(&self, text: &str) -> Result<(), EngineError> {
        match self {
            Output::Stdout => {
                let mut stdout = std::io::stdout().lock();
                stdout
                    .write_all(text.as_bytes())
                    .and_then(|_| stdout.flush())
                    .map_err(|e| EngineError::host("write", e.to_string()))
            }
            Output::Buffer(buffer) => {
                buffer.lock().push_str(text);
                Ok(())
            }
        }
    }

    /// Text captured so far; empty for stdout
    pub fn contents(&self) -> String {
        match self {
            Output::Stdout => String::new(),
            Output::Buffer(buffer) => buffer.lock().clone(),
        }
    }
}

/* ===================== Program ===================== */

pub struct Program {
    methods: HashMap<Arc<str>, Constructor>,
    operations: HashMap<Arc<str>, Operation>,
    globals: Globals,
    records: IndexMap<Arc<str>, Vec<Arc<str>>>,
    output: Output,
}

impl Program {
    pub fn builder() -> ProgramBuilder {
        ProgramBuilder::default()
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    pub fn constructor(&self, name: &str) -> Option<&Constructor> {
        self.methods.get(name)
    }

    pub fn operation(&self, name: &str) -> Option<Operation> {
        self.operations.get(name).cloned()
    }

    pub fn globals(&self) -> &Globals {
        &self.globals
    }

    pub fn output(&self) -> &Output {
        &self.output
    }

    /// Method names in sorted order
    pub fn method_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.methods.keys().map(|name| name.as_ref()).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Program")
            .field("methods", &self.method_names())
            .field("operations", &self.operations.len())
            .field("records", &self.records.keys().collect::<Vec<_>>())
            .finish()
    }
}

/* ===================== Builder ===================== */

#[derive(Default)]
pub struct ProgramBuilder {
    methods: HashMap<Arc<str>, Constructor>,
    operations: HashMap<Arc<str>, Operation>,
    globals: Vec<(Arc<str>, Value)>,
    records: IndexMap<Arc<str>, Vec<Arc<str>>>,
    output: Output,
}

impl ProgramBuilder {
    pub fn method(
        mut self,
        name: &str,
        constructor: impl Fn(&Globals) -> Body + Send + Sync + 'static,
    ) -> Self {
        self.methods.insert(name.into(), Arc::new(constructor));
        self
    }

    pub fn operation(
        mut self,
        name: &str,
        func: impl Fn(&[Value]) -> Result<Option<Value>, EngineError> + Send + Sync + 'static,
    ) -> Self {
        self.operations.insert(name.into(), Operation::new(name, func));
        self
    }

    pub fn global(mut self, name: &str, initial: Value) -> Self {
        self.globals.push((name.into(), initial));
        self
    }

    /// Declare a record type; its name becomes a constructor operation
    pub fn record(mut self, name: &str, fields: &[&str]) -> Self {
        let fields = fields.iter().map(|field| Arc::from(*field)).collect();
        self.records.insert(name.into(), fields);
        self
    }

    pub fn output(mut self, output: Output) -> Self {
        self.output = output;
        self
    }

    pub fn build(self) -> Program {
        let mut operations = HashMap::new();
        for operation in stdlib::operations(&self.output) {
            operations.insert(Arc::from(operation.name()), operation);
        }
        for (name, fields) in &self.records {
            let (record, fields) = (name.clone(), fields.clone());
            let constructor = Operation::new(name, move |args| {
                let values = fields
                    .iter()
                    .enumerate()
                    .map(|(i, field)| (field.clone(), args.get(i).cloned().unwrap_or(Value::Null)))
                    .collect();
                Ok(Some(Value::Record(Record::new(record.clone(), values))))
            });
            operations.insert(name.clone(), constructor);
        }
        operations.extend(self.operations);

        let globals = Globals::default();
        for (name, initial) in self.globals {
            globals.declare(&name, initial);
        }

        Program {
            methods: self.methods,
            operations,
            globals,
            records: self.records,
            output: self.output,
        }
    }
}
