//! # Generator node protocol
//!
//! A method body is a tree of [`Node`]s built once and driven many times.
//! Each node is a resumable generator:
//!
//! - `advance` produces the next result: a [`Signal::Yield`] carrying an
//!   [`Atom`], [`Signal::Fail`], or one of the non-local exits.
//! - `reset` restores the just-constructed state without reallocating.
//!
//! A node that has failed keeps failing until it is reset. Parents reset a
//! child before driving it from the start again. Storage cells survive resets;
//! temporaries are cleared.
//!
//! The node set is closed, so dispatch is a `match` over [`Node`] rather than a
//! trait object per node.

use super::access::{
    Activate, Assign, AssignMode, Bind, Collect, Create, FieldAccess, Index, Invoke, MakeList,
    Promote, Range,
};
use super::combinators::{
    Alternation, Every, Exit, ExitKind, IfThen, Limit, Loop, Not, Product, Repeat, Sequence,
    SequenceMode, Suspend,
};
use super::context::Context;
use super::scan::{Scan, ScanCall, ScanFunction};
use super::types::{Atom, Cell, Signal, Step, Value};
use std::sync::Arc;

/// Resumable generator
pub trait Generator {
    fn advance(&mut self, cx: &mut Context) -> Step;

    /// Restore the just-constructed state; idle method bodies held by the
    /// node are handed back to the context's pool
    fn reset(&mut self, cx: &mut Context);
}

/// Take at most one result from `node`, resetting it afterwards.
///
/// Non-local exits leave the node untouched so it can be resumed.
pub(crate) fn bounded(node: &mut Node, cx: &mut Context) -> Step {
    let step = node.advance(cx)?;
    if !step.is_exit() {
        node.reset(cx);
    }
    Ok(step)
}

/* ===================== Leaves ===================== */

/// A single result, then failure
pub struct Once<T> {
    item: T,
    done: bool,
}

impl<T> Once<T> {
    fn new(item: T) -> Self {
        Self { item, done: false }
    }

    fn take(&mut self) -> Option<&T> {
        if self.done {
            None
        } else {
            self.done = true;
            Some(&self.item)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    /// The co-expression evaluating this node
    Current,
    /// The co-expression that last activated the current one
    Source,
    /// The co-expression the program started in
    Main,
    /// `&subject` of the innermost scan
    Subject,
    /// `&pos` of the innermost scan
    Pos,
}

/* ===================== Nodes ===================== */

pub enum Node {
    Fail,
    Null(Once<()>),
    Constant(Once<Value>),
    Var(Once<Cell>),
    Keyword(Once<Keyword>),
    Range(Box<Range>),
    Sequence(Sequence),
    Every(Box<Every>),
    Product(Box<Product>),
    If(Box<IfThen>),
    Loop(Box<Loop>),
    Repeat(Box<Repeat>),
    Alternation(Alternation),
    Not(Box<Not>),
    Limit(Box<Limit>),
    Exit(Box<Exit>),
    Next,
    Suspend(Box<Suspend>),
    Index(Box<Index>),
    Field(Box<FieldAccess>),
    Promote(Box<Promote>),
    Invoke(Box<Invoke>),
    Assign(Box<Assign>),
    MakeList(MakeList),
    Collect(Box<Collect>),
    Bind(Box<Bind>),
    Scan(Box<Scan>),
    ScanCall(Box<ScanCall>),
    Create(Create),
    Activate(Activate),
}

impl Node {
    pub fn fail() -> Node {
        Node::Fail
    }

    pub fn null() -> Node {
        Node::Null(Once::new(()))
    }

    pub fn constant(value: impl Into<Value>) -> Node {
        Node::Constant(Once::new(value.into()))
    }

    pub fn var(cell: &Cell) -> Node {
        Node::Var(Once::new(cell.clone()))
    }

    pub fn keyword(keyword: Keyword) -> Node {
        Node::Keyword(Once::new(keyword))
    }

    pub fn range(from: Node, to: Node, by: Option<Node>) -> Node {
        Node::Range(Box::new(Range::new(from, to, by.unwrap_or_else(|| Node::constant(1)))))
    }

    pub fn sequence(children: Vec<Node>) -> Node {
        Node::Sequence(Sequence::new(children, SequenceMode::Conjunction))
    }

    pub fn block(children: Vec<Node>) -> Node {
        Node::Sequence(Sequence::new(children, SequenceMode::Statements))
    }

    pub fn every(generator: Node, body: Option<Node>) -> Node {
        Node::Every(Box::new(Every::new(generator, body)))
    }

    pub fn product(outer: Node, inner: Node) -> Node {
        Node::Product(Box::new(Product::new(outer, inner)))
    }

    pub fn if_then(condition: Node, then_branch: Node, else_branch: Option<Node>) -> Node {
        Node::If(Box::new(IfThen::new(condition, then_branch, else_branch)))
    }

    pub fn while_do(condition: Node, body: Option<Node>) -> Node {
        Node::Loop(Box::new(Loop::new(condition, body, false)))
    }

    pub fn until_do(condition: Node, body: Option<Node>) -> Node {
        Node::Loop(Box::new(Loop::new(condition, body, true)))
    }

    pub fn repeat(body: Node) -> Node {
        Node::Repeat(Box::new(Repeat::new(body)))
    }

    pub fn alternation(alternatives: Vec<Node>) -> Node {
        Node::Alternation(Alternation::new(alternatives))
    }

    pub fn not(operand: Node) -> Node {
        Node::Not(Box::new(Not::new(operand)))
    }

    pub fn limit(operand: Node, count: Node) -> Node {
        Node::Limit(Box::new(Limit::new(operand, count)))
    }

    pub fn break_with(value: Option<Node>) -> Node {
        Node::Exit(Box::new(Exit::new(ExitKind::Break, value)))
    }

    pub fn next() -> Node {
        Node::Next
    }

    pub fn return_with(value: Option<Node>) -> Node {
        Node::Exit(Box::new(Exit::new(ExitKind::Return, value)))
    }

    pub fn suspend(operand: Node) -> Node {
        Node::Suspend(Box::new(Suspend::new(operand)))
    }

    pub fn index(target: Node, key: Node) -> Node {
        Node::Index(Box::new(Index::new(target, key)))
    }

    pub fn field(object: Node, name: &str) -> Node {
        Node::Field(Box::new(FieldAccess::new(object, name)))
    }

    pub fn promote(source: Node) -> Node {
        Node::Promote(Box::new(Promote::new(source)))
    }

    pub fn invoke(callee: &str, args: Vec<Node>) -> Node {
        Node::Invoke(Box::new(Invoke::new(callee, args)))
    }

    pub fn assign(target: Node, value: Node) -> Node {
        Node::Assign(Box::new(Assign::new(target, value, AssignMode::Plain)))
    }

    pub fn augmented(operator: &str, target: Node, value: Node) -> Node {
        let mode = AssignMode::Augmented(Arc::from(operator));
        Node::Assign(Box::new(Assign::new(target, value, mode)))
    }

    pub fn swap(left: Node, right: Node) -> Node {
        Node::Assign(Box::new(Assign::new(left, right, AssignMode::Swap)))
    }

    pub fn reversible(target: Node, value: Node) -> Node {
        Node::Assign(Box::new(Assign::new(target, value, AssignMode::Reversible)))
    }

    pub fn make_list(items: Vec<Node>) -> Node {
        Node::MakeList(MakeList::new(items))
    }

    pub fn collect(operand: Node) -> Node {
        Node::Collect(Box::new(Collect::new(operand)))
    }

    pub fn bind(cell: &Cell, generator: Node) -> Node {
        Node::Bind(Box::new(Bind::new(cell, generator)))
    }

    pub fn scan(subject: Node, body: Node) -> Node {
        Node::Scan(Box::new(Scan::new(subject, body)))
    }

    pub fn scan_call(function: ScanFunction, args: Vec<Node>) -> Node {
        Node::ScanCall(Box::new(ScanCall::new(function, args)))
    }

    pub fn create(method: &str, args: Vec<Node>) -> Node {
        Node::Create(Create::new(method, args))
    }

    pub fn activate(value: Option<Node>, target: Node) -> Node {
        Node::Activate(Activate::new(value.unwrap_or_else(Node::null), target))
    }
}

impl Generator for Node {
    fn advance(&mut self, cx: &mut Context) -> Step {
        match self {
            Node::Fail => Ok(Signal::Fail),
            Node::Null(once) => Ok(match once.take() {
                Some(()) => Signal::Yield(Atom::null()),
                None => Signal::Fail,
            }),
            Node::Constant(once) => Ok(match once.take() {
                Some(value) => Signal::Yield(Atom::Value(value.clone())),
                None => Signal::Fail,
            }),
            Node::Var(once) => Ok(match once.take() {
                Some(cell) => Signal::Yield(Atom::Cell(cell.clone())),
                None => Signal::Fail,
            }),
            Node::Keyword(once) => Ok(match once.take() {
                Some(Keyword::Current) => Signal::value(Value::CoExpr(cx.current().clone())),
                Some(Keyword::Source) => {
                    let source = cx.current().activator().unwrap_or_else(|| cx.current().clone());
                    Signal::value(Value::CoExpr(source))
                }
                Some(Keyword::Main) => Signal::value(Value::CoExpr(cx.main().clone())),
                Some(Keyword::Subject) => Signal::Yield(Atom::Subject(cx.scan().clone())),
                Some(Keyword::Pos) => Signal::Yield(Atom::Pos(cx.scan().clone())),
                None => Signal::Fail,
            }),
            Node::Range(node) => node.advance(cx),
            Node::Sequence(node) => node.advance(cx),
            Node::Every(node) => node.advance(cx),
            Node::Product(node) => node.advance(cx),
            Node::If(node) => node.advance(cx),
            Node::Loop(node) => node.advance(cx),
            Node::Repeat(node) => node.advance(cx),
            Node::Alternation(node) => node.advance(cx),
            Node::Not(node) => node.advance(cx),
            Node::Limit(node) => node.advance(cx),
            Node::Exit(node) => node.advance(cx),
            Node::Next => Ok(Signal::Next),
            Node::Suspend(node) => node.advance(cx),
            Node::Index(node) => node.advance(cx),
            Node::Field(node) => node.advance(cx),
            Node::Promote(node) => node.advance(cx),
            Node::Invoke(node) => node.advance(cx),
            Node::Assign(node) => node.advance(cx),
            Node::MakeList(node) => node.advance(cx),
            Node::Collect(node) => node.advance(cx),
            Node::Bind(node) => node.advance(cx),
            Node::Scan(node) => node.advance(cx),
            Node::ScanCall(node) => node.advance(cx),
            Node::Create(node) => node.advance(cx),
            Node::Activate(node) => node.advance(cx),
        }
    }

    fn reset(&mut self, cx: &mut Context) {
        match self {
            Node::Fail | Node::Next => {}
            Node::Null(once) => once.done = false,
            Node::Constant(once) => once.done = false,
            Node::Var(once) => once.done = false,
            Node::Keyword(once) => once.done = false,
            Node::Range(node) => node.reset(cx),
            Node::Sequence(node) => node.reset(cx),
            Node::Every(node) => node.reset(cx),
            Node::Product(node) => node.reset(cx),
            Node::If(node) => node.reset(cx),
            Node::Loop(node) => node.reset(cx),
            Node::Repeat(node) => node.reset(cx),
            Node::Alternation(node) => node.reset(cx),
            Node::Not(node) => node.reset(cx),
            Node::Limit(node) => node.reset(cx),
            Node::Exit(node) => node.reset(cx),
            Node::Suspend(node) => node.reset(cx),
            Node::Index(node) => node.reset(cx),
            Node::Field(node) => node.reset(cx),
            Node::Promote(node) => node.reset(cx),
            Node::Invoke(node) => node.reset(cx),
            Node::Assign(node) => node.reset(cx),
            Node::MakeList(node) => node.reset(cx),
            Node::Collect(node) => node.reset(cx),
            Node::Bind(node) => node.reset(cx),
            Node::Scan(node) => node.reset(cx),
            Node::ScanCall(node) => node.reset(cx),
            Node::Create(node) => node.reset(cx),
            Node::Activate(node) => node.reset(cx),
        }
    }
}
