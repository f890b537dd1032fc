//! Control-flow combinators
//!
//! Every combinator keeps its position across non-local exits: when a child
//! reports `Break`, `Next`, `Return` or `Suspend` that the combinator does not
//! claim, the signal is passed up unchanged and the next `advance` continues
//! at the same child. This is what lets `suspend` inside nested loops resume
//! where it left off.

use super::context::Context;
use super::errors::EngineError;
use super::node::{bounded, Generator, Node};
use super::types::{Atom, Signal, Step};

/// Result of a loop that ended through `break`
fn broke_out(value: Option<Atom>) -> Signal {
    match value {
        Some(atom) => Signal::Yield(atom),
        None => Signal::Fail,
    }
}

/* ===================== Sequence / Block ===================== */

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceMode {
    /// Any failing child fails the whole sequence
    Conjunction,
    /// Failures of non-final children are ignored
    Statements,
}

pub struct Sequence {
    children: Vec<Node>,
    mode: SequenceMode,
    index: usize,
    failed: bool,
}

impl Sequence {
    pub fn new(mut children: Vec<Node>, mode: SequenceMode) -> Self {
        if children.is_empty() {
            children.push(Node::null());
        }
        Self {
            children,
            mode,
            index: 0,
            failed: false,
        }
    }
}

impl Generator for Sequence {
    fn advance(&mut self, cx: &mut Context) -> Step {
        if self.failed {
            return Ok(Signal::Fail);
        }
        let last = self.children.len() - 1;
        while self.index < last {
            match bounded(&mut self.children[self.index], cx)? {
                Signal::Yield(_) => self.index += 1,
                Signal::Fail if self.mode == SequenceMode::Statements => self.index += 1,
                Signal::Fail => {
                    self.failed = true;
                    return Ok(Signal::Fail);
                }
                exit => return Ok(exit),
            }
        }
        let step = self.children[last].advance(cx)?;
        if matches!(step, Signal::Fail) {
            self.failed = true;
        }
        Ok(step)
    }

    fn reset(&mut self, cx: &mut Context) {
        for child in &mut self.children {
            child.reset(cx);
        }
        self.index = 0;
        self.failed = false;
    }
}

/* ===================== Every ===================== */

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopPhase {
    Head,
    Body,
    Done,
}

pub struct Every {
    generator: Node,
    body: Option<Node>,
    phase: LoopPhase,
}

impl Every {
    pub fn new(generator: Node, body: Option<Node>) -> Self {
        Self {
            generator,
            body,
            phase: LoopPhase::Head,
        }
    }

    fn finish(&mut self, cx: &mut Context, outcome: Signal) -> Step {
        self.phase = LoopPhase::Done;
        self.generator.reset(cx);
        if let Some(body) = &mut self.body {
            body.reset(cx);
        }
        Ok(outcome)
    }
}

impl Generator for Every {
    fn advance(&mut self, cx: &mut Context) -> Step {
        loop {
            match self.phase {
                LoopPhase::Done => return Ok(Signal::Fail),
                LoopPhase::Head => match self.generator.advance(cx)? {
                    Signal::Yield(_) | Signal::Next => {
                        if self.body.is_some() {
                            self.phase = LoopPhase::Body;
                        }
                    }
                    Signal::Fail => return self.finish(cx, Signal::Yield(Atom::null())),
                    Signal::Break(value) => return self.finish(cx, broke_out(value)),
                    exit => return Ok(exit),
                },
                LoopPhase::Body => {
                    let Some(body) = &mut self.body else {
                        self.phase = LoopPhase::Head;
                        continue;
                    };
                    match bounded(body, cx)? {
                        Signal::Yield(_) | Signal::Fail => self.phase = LoopPhase::Head,
                        Signal::Next => {
                            body.reset(cx);
                            self.phase = LoopPhase::Head;
                        }
                        Signal::Break(value) => return self.finish(cx, broke_out(value)),
                        exit => return Ok(exit),
                    }
                }
            }
        }
    }

    fn reset(&mut self, cx: &mut Context) {
        self.generator.reset(cx);
        if let Some(body) = &mut self.body {
            body.reset(cx);
        }
        self.phase = LoopPhase::Head;
    }
}

/* ===================== Product ===================== */

/// For every result of `outer`, all results of a freshly reset `inner`
pub struct Product {
    outer: Node,
    inner: Node,
    in_inner: bool,
    exhausted: bool,
}

impl Product {
    pub fn new(outer: Node, inner: Node) -> Self {
        Self {
            outer,
            inner,
            in_inner: false,
            exhausted: false,
        }
    }
}

impl Generator for Product {
    fn advance(&mut self, cx: &mut Context) -> Step {
        if self.exhausted {
            return Ok(Signal::Fail);
        }
        loop {
            if !self.in_inner {
                match self.outer.advance(cx)? {
                    Signal::Yield(_) => {
                        self.inner.reset(cx);
                        self.in_inner = true;
                    }
                    Signal::Fail => {
                        self.exhausted = true;
                        return Ok(Signal::Fail);
                    }
                    exit => return Ok(exit),
                }
            }
            match self.inner.advance(cx)? {
                Signal::Fail => self.in_inner = false,
                other => return Ok(other),
            }
        }
    }

    fn reset(&mut self, cx: &mut Context) {
        self.outer.reset(cx);
        self.inner.reset(cx);
        self.in_inner = false;
        self.exhausted = false;
    }
}

/* ===================== Conditionals ===================== */

pub struct IfThen {
    condition: Node,
    then_branch: Node,
    else_branch: Option<Node>,
    chosen: Option<bool>,
}

impl IfThen {
    pub fn new(condition: Node, then_branch: Node, else_branch: Option<Node>) -> Self {
        Self {
            condition,
            then_branch,
            else_branch,
            chosen: None,
        }
    }
}

impl Generator for IfThen {
    fn advance(&mut self, cx: &mut Context) -> Step {
        let took_then = match self.chosen {
            Some(branch) => branch,
            None => {
                let branch = match bounded(&mut self.condition, cx)? {
                    Signal::Yield(_) => true,
                    Signal::Fail => false,
                    exit => return Ok(exit),
                };
                self.chosen = Some(branch);
                branch
            }
        };
        match (took_then, &mut self.else_branch) {
            (true, _) => self.then_branch.advance(cx),
            (false, Some(otherwise)) => otherwise.advance(cx),
            (false, None) => Ok(Signal::Fail),
        }
    }

    fn reset(&mut self, cx: &mut Context) {
        self.condition.reset(cx);
        self.then_branch.reset(cx);
        if let Some(otherwise) = &mut self.else_branch {
            otherwise.reset(cx);
        }
        self.chosen = None;
    }
}

/* ===================== Loops ===================== */

/// `while` and `until` loops
pub struct Loop {
    condition: Node,
    body: Option<Node>,
    /// Run the body while the condition fails instead of while it succeeds
    until: bool,
    phase: LoopPhase,
}

impl Loop {
    pub fn new(condition: Node, body: Option<Node>, until: bool) -> Self {
        Self {
            condition,
            body,
            until,
            phase: LoopPhase::Head,
        }
    }

    fn finish(&mut self, cx: &mut Context, outcome: Signal) -> Step {
        self.phase = LoopPhase::Done;
        self.condition.reset(cx);
        if let Some(body) = &mut self.body {
            body.reset(cx);
        }
        Ok(outcome)
    }
}

impl Generator for Loop {
    fn advance(&mut self, cx: &mut Context) -> Step {
        loop {
            match self.phase {
                LoopPhase::Done => return Ok(Signal::Fail),
                LoopPhase::Head => {
                    let succeeded = match bounded(&mut self.condition, cx)? {
                        Signal::Yield(_) => true,
                        Signal::Fail => false,
                        Signal::Next => {
                            self.condition.reset(cx);
                            continue;
                        }
                        Signal::Break(value) => return self.finish(cx, broke_out(value)),
                        exit => return Ok(exit),
                    };
                    if succeeded == self.until {
                        return self.finish(cx, Signal::Yield(Atom::null()));
                    }
                    if self.body.is_some() {
                        self.phase = LoopPhase::Body;
                    }
                }
                LoopPhase::Body => {
                    let Some(body) = &mut self.body else {
                        self.phase = LoopPhase::Head;
                        continue;
                    };
                    match bounded(body, cx)? {
                        Signal::Yield(_) | Signal::Fail => self.phase = LoopPhase::Head,
                        Signal::Next => {
                            body.reset(cx);
                            self.phase = LoopPhase::Head;
                        }
                        Signal::Break(value) => return self.finish(cx, broke_out(value)),
                        exit => return Ok(exit),
                    }
                }
            }
        }
    }

    fn reset(&mut self, cx: &mut Context) {
        self.condition.reset(cx);
        if let Some(body) = &mut self.body {
            body.reset(cx);
        }
        self.phase = LoopPhase::Head;
    }
}

pub struct Repeat {
    body: Node,
    done: bool,
}

impl Repeat {
    pub fn new(body: Node) -> Self {
        Self { body, done: false }
    }
}

impl Generator for Repeat {
    fn advance(&mut self, cx: &mut Context) -> Step {
        if self.done {
            return Ok(Signal::Fail);
        }
        loop {
            match bounded(&mut self.body, cx)? {
                Signal::Yield(_) | Signal::Fail => {}
                Signal::Next => self.body.reset(cx),
                Signal::Break(value) => {
                    self.done = true;
                    self.body.reset(cx);
                    return Ok(broke_out(value));
                }
                exit => return Ok(exit),
            }
        }
    }

    fn reset(&mut self, cx: &mut Context) {
        self.body.reset(cx);
        self.done = false;
    }
}

/* ===================== Alternation / Not / Limit ===================== */

pub struct Alternation {
    alternatives: Vec<Node>,
    index: usize,
}

impl Alternation {
    pub fn new(alternatives: Vec<Node>) -> Self {
        Self {
            alternatives,
            index: 0,
        }
    }
}

impl Generator for Alternation {
    fn advance(&mut self, cx: &mut Context) -> Step {
        while let Some(alternative) = self.alternatives.get_mut(self.index) {
            match alternative.advance(cx)? {
                Signal::Fail => self.index += 1,
                other => return Ok(other),
            }
        }
        Ok(Signal::Fail)
    }

    fn reset(&mut self, cx: &mut Context) {
        for alternative in &mut self.alternatives {
            alternative.reset(cx);
        }
        self.index = 0;
    }
}

pub struct Not {
    operand: Node,
    done: bool,
}

impl Not {
    pub fn new(operand: Node) -> Self {
        Self {
            operand,
            done: false,
        }
    }
}

impl Generator for Not {
    fn advance(&mut self, cx: &mut Context) -> Step {
        if self.done {
            return Ok(Signal::Fail);
        }
        match bounded(&mut self.operand, cx)? {
            Signal::Yield(_) => {
                self.done = true;
                Ok(Signal::Fail)
            }
            Signal::Fail => {
                self.done = true;
                Ok(Signal::Yield(Atom::null()))
            }
            exit => Ok(exit),
        }
    }

    fn reset(&mut self, cx: &mut Context) {
        self.operand.reset(cx);
        self.done = false;
    }
}

/// At most `count` results of the operand
pub struct Limit {
    operand: Node,
    count: Node,
    remaining: Option<i64>,
}

impl Limit {
    pub fn new(operand: Node, count: Node) -> Self {
        Self {
            operand,
            count,
            remaining: None,
        }
    }
}

impl Generator for Limit {
    fn advance(&mut self, cx: &mut Context) -> Step {
        let remaining = match self.remaining {
            Some(n) => n,
            None => {
                let n = match bounded(&mut self.count, cx)? {
                    Signal::Yield(atom) => {
                        let value = atom.deref();
                        let n = value.to_integer()?;
                        if n < 0 {
                            return Err(EngineError::type_mismatch(
                                "non-negative integer",
                                &value,
                            ));
                        }
                        n
                    }
                    Signal::Fail => 0,
                    exit => return Ok(exit),
                };
                self.remaining = Some(n);
                n
            }
        };
        if remaining == 0 {
            return Ok(Signal::Fail);
        }
        let step = self.operand.advance(cx)?;
        if let Signal::Yield(_) = step {
            self.remaining = Some(remaining - 1);
            if remaining == 1 {
                self.operand.reset(cx);
            }
        }
        Ok(step)
    }

    fn reset(&mut self, cx: &mut Context) {
        self.operand.reset(cx);
        self.count.reset(cx);
        self.remaining = None;
    }
}

/* ===================== Non-local exits ===================== */

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitKind {
    Break,
    Return,
}

/// `break` and `return`: evaluate the first result of the operand, then exit
pub struct Exit {
    kind: ExitKind,
    value: Option<Node>,
}

impl Exit {
    pub fn new(kind: ExitKind, value: Option<Node>) -> Self {
        Self { kind, value }
    }
}

impl Generator for Exit {
    fn advance(&mut self, cx: &mut Context) -> Step {
        let value = match &mut self.value {
            None => Some(Atom::null()),
            Some(node) => match bounded(node, cx)? {
                Signal::Yield(atom) => Some(atom),
                Signal::Fail => None,
                exit => return Ok(exit),
            },
        };
        Ok(match self.kind {
            ExitKind::Break => Signal::Break(value),
            ExitKind::Return => Signal::Return(value),
        })
    }

    fn reset(&mut self, cx: &mut Context) {
        if let Some(node) = &mut self.value {
            node.reset(cx);
        }
    }
}

/// Pass each operand result to the method's caller; fail once exhausted
pub struct Suspend {
    operand: Node,
}

impl Suspend {
    pub fn new(operand: Node) -> Self {
        Self { operand }
    }
}

impl Generator for Suspend {
    fn advance(&mut self, cx: &mut Context) -> Step {
        match self.operand.advance(cx)? {
            Signal::Yield(atom) => Ok(Signal::Suspend(atom)),
            other => Ok(other),
        }
    }

    fn reset(&mut self, cx: &mut Context) {
        self.operand.reset(cx);
    }
}
