//! Compile a [`ProgramDecl`] into a runnable [`Program`]
//!
//! Each method declaration becomes a constructor closure that builds a fresh
//! node tree on demand, so the method body pool can ask for as many
//! instances as recursion requires.

use super::ast::{Expr, MethodDecl, ProgramDecl};
use crate::interpreter::node::{Keyword, Node};
use crate::interpreter::registry::{Output, Program};
use crate::interpreter::scan::ScanFunction;
use crate::interpreter::types::{Cell, Globals, Value};
use crate::interpreter::Body;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid program document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("duplicate method '{0}'")]
    DuplicateMethod(String),

    #[error("duplicate record '{0}'")]
    DuplicateRecord(String),

    #[error("duplicate name '{name}' in {scope}")]
    DuplicateName { scope: String, name: String },

    #[error("method {method} refers to unknown method or operation '{callee}'")]
    UnknownCallee { method: String, callee: String },

    #[error("method {method}: variadic method needs at least one parameter")]
    EmptyVariadic { method: String },
}

impl ProgramDecl {
    pub fn from_json(text: &str) -> Result<Self, ModelError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String, ModelError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Compile with output going to stdout
pub fn compile(decl: &ProgramDecl) -> Result<Program, ModelError> {
    compile_with_output(decl, Output::Stdout)
}

pub fn compile_with_output(decl: &ProgramDecl, output: Output) -> Result<Program, ModelError> {
    validate(decl)?;

    let global_names: Arc<HashSet<String>> = Arc::new(decl.globals.iter().cloned().collect());
    let method_names: Arc<HashSet<String>> =
        Arc::new(decl.methods.iter().map(|m| m.name.clone()).collect());
    let mut builder = Program::builder().output(output);
    for name in &decl.globals {
        builder = builder.global(name, Value::Null);
    }
    for record in &decl.records {
        let fields: Vec<&str> = record.fields.iter().map(String::as_str).collect();
        builder = builder.record(&record.name, &fields);
    }
    for method in &decl.methods {
        let name = method.name.clone();
        let method = Arc::new(method.clone());
        let names = Names {
            globals: global_names.clone(),
            methods: method_names.clone(),
        };
        builder = builder.method(&name, move |globals| build_body(&method, &names, globals));
    }
    let program = builder.build();

    for method in &decl.methods {
        for expr in &method.body {
            check_callees(&program, &method.name, expr)?;
        }
    }
    Ok(program)
}

/// Structural checks that would otherwise surface only at run time
pub fn validate(decl: &ProgramDecl) -> Result<(), ModelError> {
    let mut methods = HashSet::new();
    for method in &decl.methods {
        if !methods.insert(method.name.as_str()) {
            return Err(ModelError::DuplicateMethod(method.name.clone()));
        }
        if method.variadic && method.params.is_empty() {
            return Err(ModelError::EmptyVariadic {
                method: method.name.clone(),
            });
        }
        let mut names = HashSet::new();
        for name in method.params.iter().chain(&method.locals) {
            if !names.insert(name.as_str()) {
                return Err(ModelError::DuplicateName {
                    scope: format!("method {}", method.name),
                    name: name.clone(),
                });
            }
        }
    }

    let mut records = HashSet::new();
    for record in &decl.records {
        if !records.insert(record.name.as_str()) || methods.contains(record.name.as_str()) {
            return Err(ModelError::DuplicateRecord(record.name.clone()));
        }
        let mut fields = HashSet::new();
        for field in &record.fields {
            if !fields.insert(field.as_str()) {
                return Err(ModelError::DuplicateName {
                    scope: format!("record {}", record.name),
                    name: field.clone(),
                });
            }
        }
    }

    let mut globals = HashSet::new();
    for name in &decl.globals {
        if !globals.insert(name.as_str()) {
            return Err(ModelError::DuplicateName {
                scope: "globals".to_string(),
                name: name.clone(),
            });
        }
    }
    Ok(())
}

fn check_callees(program: &Program, method: &str, expr: &Expr) -> Result<(), ModelError> {
    let unknown = |callee: &str| ModelError::UnknownCallee {
        method: method.to_string(),
        callee: callee.to_string(),
    };
    match expr {
        Expr::Call { name, .. } => {
            let known = program.has_method(name)
                || program.operation(name).is_some()
                || ScanFunction::from_name(name).is_some();
            if !known {
                return Err(unknown(name));
            }
        }
        Expr::Create { name, .. } => {
            if !program.has_method(name) {
                return Err(unknown(name));
            }
        }
        Expr::AugAssign { op, .. } => {
            if program.operation(op).is_none() {
                return Err(unknown(op));
            }
        }
        _ => {}
    }
    for child in expr.children() {
        check_callees(program, method, child)?;
    }
    Ok(())
}

/* ===================== Tree construction ===================== */

/// Program-wide names a method body resolves against
struct Names {
    globals: Arc<HashSet<String>>,
    methods: Arc<HashSet<String>>,
}

/// Variable resolution for one method instance
///
/// Declared parameters and locals come first; names declared as program
/// globals resolve to global cells; anything else is an implicit local.
/// A call resolves to a declared method before a scanning function.
struct Scope<'a> {
    cells: HashMap<String, Cell>,
    locals: Vec<Cell>,
    names: &'a Names,
    globals: &'a Globals,
}

impl<'a> Scope<'a> {
    fn declare(&mut self, name: &str) -> Cell {
        let cell = Cell::local();
        self.cells.insert(name.to_string(), cell.clone());
        cell
    }

    fn lookup(&mut self, name: &str) -> Cell {
        if let Some(cell) = self.cells.get(name) {
            return cell.clone();
        }
        let cell = if self.names.globals.contains(name) {
            Cell::global(self.globals, name)
        } else {
            let cell = Cell::local();
            self.locals.push(cell.clone());
            cell
        };
        self.cells.insert(name.to_string(), cell.clone());
        cell
    }

    fn all(&mut self, exprs: &[Expr]) -> Vec<Node> {
        exprs.iter().map(|e| self.node(e)).collect()
    }

    fn boxed(&mut self, expr: &Option<Box<Expr>>) -> Option<Node> {
        expr.as_deref().map(|e| self.node(e))
    }

    fn node(&mut self, expr: &Expr) -> Node {
        match expr {
            Expr::Null => Node::null(),
            Expr::Fail => Node::fail(),
            Expr::Next => Node::next(),
            Expr::Current => Node::keyword(Keyword::Current),
            Expr::Source => Node::keyword(Keyword::Source),
            Expr::Main => Node::keyword(Keyword::Main),
            Expr::Subject => Node::keyword(Keyword::Subject),
            Expr::Pos => Node::keyword(Keyword::Pos),
            Expr::Lit { v } => Node::constant(v.to_value()),
            Expr::Var { name } => Node::var(&self.lookup(name)),
            Expr::Range { from, to, by } => {
                let (from, to) = (self.node(from), self.node(to));
                Node::range(from, to, self.boxed(by))
            }
            Expr::Seq { body } => Node::sequence(self.all(body)),
            Expr::Block { body } => Node::block(self.all(body)),
            Expr::Every { expr, body } => {
                let generator = self.node(expr);
                Node::every(generator, self.boxed(body))
            }
            Expr::Product { outer, inner } => {
                let outer = self.node(outer);
                Node::product(outer, self.node(inner))
            }
            Expr::If {
                cond,
                then_e,
                else_e,
            } => {
                let (cond, then_branch) = (self.node(cond), self.node(then_e));
                Node::if_then(cond, then_branch, self.boxed(else_e))
            }
            Expr::While { cond, body } => {
                let cond = self.node(cond);
                Node::while_do(cond, self.boxed(body))
            }
            Expr::Until { cond, body } => {
                let cond = self.node(cond);
                Node::until_do(cond, self.boxed(body))
            }
            Expr::Repeat { body } => Node::repeat(self.node(body)),
            Expr::Alt { alts } => Node::alternation(self.all(alts)),
            Expr::Not { expr } => Node::not(self.node(expr)),
            Expr::Limit { expr, count } => {
                let operand = self.node(expr);
                Node::limit(operand, self.node(count))
            }
            Expr::Break { value } => Node::break_with(self.boxed(value)),
            Expr::Return { value } => Node::return_with(self.boxed(value)),
            Expr::Suspend { value } => Node::suspend(self.node(value)),
            Expr::Index { object, key } => {
                let object = self.node(object);
                Node::index(object, self.node(key))
            }
            Expr::Field { object, name } => Node::field(self.node(object), name),
            Expr::Promote { expr } => Node::promote(self.node(expr)),
            Expr::Call { name, args } => {
                let args = self.all(args);
                match ScanFunction::from_name(name) {
                    Some(function) if !self.names.methods.contains(name) => {
                        Node::scan_call(function, args)
                    }
                    _ => Node::invoke(name, args),
                }
            }
            Expr::Assign { target, value } => {
                let target = self.node(target);
                Node::assign(target, self.node(value))
            }
            Expr::AugAssign { op, target, value } => {
                let target = self.node(target);
                Node::augmented(op, target, self.node(value))
            }
            Expr::Swap { left, right } => {
                let left = self.node(left);
                Node::swap(left, self.node(right))
            }
            Expr::RevAssign { target, value } => {
                let target = self.node(target);
                Node::reversible(target, self.node(value))
            }
            Expr::List { items } => Node::make_list(self.all(items)),
            Expr::ListComp { expr } => Node::collect(self.node(expr)),
            Expr::In { name, expr } => {
                let cell = self.lookup(name);
                Node::bind(&cell, self.node(expr))
            }
            Expr::Scan { subject, body } => {
                let subject = self.node(subject);
                Node::scan(subject, self.node(body))
            }
            Expr::Create { name, args } => Node::create(name, self.all(args)),
            Expr::Activate { target, value } => {
                let value = self.boxed(value);
                Node::activate(value, self.node(target))
            }
        }
    }
}

fn build_body(decl: &MethodDecl, names: &Names, globals: &Globals) -> Body {
    let mut scope = Scope {
        cells: HashMap::new(),
        locals: Vec::new(),
        names,
        globals,
    };
    let params: Vec<Cell> = decl.params.iter().map(|p| scope.declare(p)).collect();
    let declared: Vec<Cell> = decl.locals.iter().map(|l| scope.declare(l)).collect();
    let root = Node::block(scope.all(&decl.body));

    Body::new(&decl.name, root)
        .with_locals(declared)
        .with_locals(scope.locals)
        .with_params(params, decl.variadic)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ast::{Literal, RecordDecl};

    fn method(name: &str, body: Vec<Expr>) -> MethodDecl {
        MethodDecl {
            name: name.to_string(),
            params: Vec::new(),
            variadic: false,
            locals: Vec::new(),
            body,
        }
    }

    fn program(methods: Vec<MethodDecl>) -> ProgramDecl {
        ProgramDecl {
            globals: Vec::new(),
            records: Vec::new(),
            methods,
        }
    }

    #[test]
    fn test_duplicate_method_rejected() {
        let decl = program(vec![method("main", vec![]), method("main", vec![])]);
        assert!(matches!(validate(&decl), Err(ModelError::DuplicateMethod(name)) if name == "main"));
    }

    #[test]
    fn test_record_clashing_with_method_rejected() {
        let mut decl = program(vec![method("point", vec![])]);
        decl.records.push(RecordDecl {
            name: "point".to_string(),
            fields: vec!["x".to_string()],
        });
        assert!(matches!(validate(&decl), Err(ModelError::DuplicateRecord(_))));
    }

    #[test]
    fn test_unknown_callee_reported() {
        let call = Expr::Call {
            name: "nosuch".to_string(),
            args: vec![Expr::Lit { v: Literal::Integer(1) }],
        };
        let decl = program(vec![method("main", vec![call])]);
        let err = compile_with_output(&decl, Output::buffer()).unwrap_err();
        assert!(matches!(err, ModelError::UnknownCallee { callee, .. } if callee == "nosuch"));
    }

    #[test]
    fn test_scanning_names_are_callable() {
        let call = Expr::Call {
            name: "tab".to_string(),
            args: vec![Expr::Lit { v: Literal::Integer(0) }],
        };
        let decl = program(vec![method("main", vec![call])]);
        assert!(compile_with_output(&decl, Output::buffer()).is_ok());
    }

    #[test]
    fn test_literal_json_forms() {
        let exprs: Vec<Expr> = serde_json::from_str(
            r#"[{"type":"Lit","v":null},{"type":"Lit","v":3},{"type":"Lit","v":2.5},{"type":"Lit","v":"s"}]"#,
        )
        .unwrap();
        let values: Vec<Literal> = exprs
            .into_iter()
            .map(|e| match e {
                Expr::Lit { v } => v,
                other => panic!("expected literal, got {:?}", other),
            })
            .collect();
        assert_eq!(
            values,
            vec![
                Literal::Null,
                Literal::Integer(3),
                Literal::Real(2.5),
                Literal::Str("s".to_string())
            ]
        );
    }
}
