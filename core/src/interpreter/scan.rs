//! # String scanning
//!
//! `subject ? body` evaluates `body` against a scanning environment holding
//! the subject string and a cursor. Environments nest: a [`Scan`] installs its
//! own environment on the context for each `advance` of its body and puts the
//! enclosing one back before returning, so a body that suspends out of a
//! method leaves the caller's `&subject` and `&pos` alone.
//!
//! The scanning functions read the current environment. `tab` and `move`
//! change the cursor and undo the change when they are resumed; the others
//! only compute positions.

use super::access::{Tuple, TupleStep};
use super::context::Context;
use super::errors::EngineError;
use super::node::{Generator, Node};
use super::stdlib::arg;
use super::types::{ScanEnv, Signal, Step, Value};
use std::collections::VecDeque;

/* ===================== Scan ===================== */

pub struct Scan {
    subject: Tuple,
    body: Node,
    env: Option<ScanEnv>,
}

impl Scan {
    pub fn new(subject: Node, body: Node) -> Self {
        Self {
            subject: Tuple::new(vec![subject]),
            body,
            env: None,
        }
    }
}

impl Generator for Scan {
    fn advance(&mut self, cx: &mut Context) -> Step {
        loop {
            let env = match &self.env {
                Some(env) => env.clone(),
                None => match self.subject.next(cx)? {
                    TupleStep::Ready(values) => {
                        let env = ScanEnv::new(values[0].to_text()?);
                        self.body.reset(cx);
                        self.env = Some(env.clone());
                        env
                    }
                    TupleStep::Exhausted => return Ok(Signal::Fail),
                    TupleStep::Exit(signal) => return Ok(signal),
                },
            };
            let outer = cx.swap_scan(env);
            let step = self.body.advance(cx);
            cx.swap_scan(outer);
            match step? {
                Signal::Fail => self.env = None,
                other => return Ok(other),
            }
        }
    }

    fn reset(&mut self, cx: &mut Context) {
        self.subject.reset(cx);
        self.body.reset(cx);
        self.env = None;
    }
}

/* ===================== Scanning functions ===================== */

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanFunction {
    /// `tab(i)`: move the cursor to `i`, producing the text passed over
    Tab,
    /// `move(n)`: move the cursor by `n`, producing the text passed over
    Move,
    /// `pos(i)`: the cursor, if it is at `i`
    Pos,
    /// `match(s, ...)`: the position after `s` if the window starts with it
    Match,
    /// `find(s, ...)`: every position where `s` occurs
    Find,
    /// `upto(c, ...)`: every position holding a character of `c`
    Upto,
    /// `many(c, ...)`: the position after the longest run of characters of `c`
    Many,
    /// `any(c, ...)`: the position after a first character in `c`
    Any,
}

impl ScanFunction {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "tab" => ScanFunction::Tab,
            "move" => ScanFunction::Move,
            "pos" => ScanFunction::Pos,
            "match" => ScanFunction::Match,
            "find" => ScanFunction::Find,
            "upto" => ScanFunction::Upto,
            "many" => ScanFunction::Many,
            "any" => ScanFunction::Any,
            _ => return None,
        })
    }

    /// New cursor position for `tab` and `move`, or `None` when it would
    /// leave the subject
    fn target(self, env: &ScanEnv, args: &[Value]) -> Result<Option<i64>, EngineError> {
        let n = arg(args, 0).to_integer()?;
        Ok(match self {
            ScanFunction::Move => env
                .pos()
                .checked_add(n)
                .filter(|to| (1..=env.len() + 1).contains(to)),
            _ => env.resolve(n),
        })
    }

    /// Results of a position-producing function
    fn positions(self, env: &ScanEnv, args: &[Value]) -> Result<Vec<i64>, EngineError> {
        if self == ScanFunction::Pos {
            let wanted = env.resolve(arg(args, 0).to_integer()?);
            return Ok(wanted.filter(|&p| p == env.pos()).into_iter().collect());
        }
        let pattern: Vec<char> = match self {
            ScanFunction::Match | ScanFunction::Find => arg(args, 0).to_text()?.chars().collect(),
            _ => charset(&arg(args, 0))?,
        };
        let Some(window) = Window::new(env, args)? else {
            return Ok(Vec::new());
        };
        let text = &window.chars;
        let at = |offset: usize| window.from + offset as i64;
        Ok(match self {
            ScanFunction::Match => {
                if text.starts_with(&pattern) {
                    vec![at(pattern.len())]
                } else {
                    Vec::new()
                }
            }
            ScanFunction::Find => (0..=text.len().saturating_sub(pattern.len()))
                .filter(|&i| text.len() >= pattern.len() && text[i..].starts_with(&pattern))
                .map(at)
                .collect(),
            ScanFunction::Upto => (0..text.len())
                .filter(|&i| pattern.contains(&text[i]))
                .map(at)
                .collect(),
            ScanFunction::Many => {
                let run = text.iter().take_while(|c| pattern.contains(c)).count();
                if run > 0 {
                    vec![at(run)]
                } else {
                    Vec::new()
                }
            }
            _ => match text.first() {
                Some(c) if pattern.contains(c) => vec![at(1)],
                _ => Vec::new(),
            },
        })
    }
}

/// Characters of a string, or of the members of a set
fn charset(value: &Value) -> Result<Vec<char>, EngineError> {
    match value {
        Value::Set(set) => {
            let mut chars = Vec::new();
            for member in set.members() {
                chars.extend(member.to_value().to_text()?.chars());
            }
            Ok(chars)
        }
        other => Ok(other.to_text()?.chars().collect()),
    }
}

/// The part of a string a position-producing function looks at
///
/// Arguments after the first are `(subject, from, to)`. Without a subject the
/// current scan is used starting at its cursor; with one, `from` defaults to
/// 1. `to` defaults to the end.
struct Window {
    chars: Vec<char>,
    from: i64,
}

impl Window {
    fn new(env: &ScanEnv, args: &[Value]) -> Result<Option<Window>, EngineError> {
        let (env, from) = match arg(args, 1) {
            Value::Null => (env.clone(), env.pos()),
            subject => (ScanEnv::new(subject.to_text()?), 1),
        };
        let from = match arg(args, 2) {
            Value::Null => Some(from),
            position => env.resolve(position.to_integer()?),
        };
        let to = match arg(args, 3) {
            Value::Null => env.resolve(0),
            position => env.resolve(position.to_integer()?),
        };
        let (Some(from), Some(to)) = (from, to) else {
            return Ok(None);
        };
        let (from, to) = if from <= to { (from, to) } else { (to, from) };
        Ok(Some(Window {
            chars: env.slice(from, to).chars().collect(),
            from,
        }))
    }
}

/// Call of a scanning function for every argument tuple
pub struct ScanCall {
    function: ScanFunction,
    args: Tuple,
    pending: VecDeque<i64>,
    /// Cursor to restore when resumed after `tab` or `move`
    undo: Option<(ScanEnv, i64)>,
}

impl ScanCall {
    pub fn new(function: ScanFunction, args: Vec<Node>) -> Self {
        Self {
            function,
            args: Tuple::new(args),
            pending: VecDeque::new(),
            undo: None,
        }
    }
}

impl Generator for ScanCall {
    fn advance(&mut self, cx: &mut Context) -> Step {
        if let Some((env, pos)) = self.undo.take() {
            env.rewind(pos);
        }
        loop {
            if let Some(position) = self.pending.pop_front() {
                return Ok(Signal::value(position));
            }
            let args = match self.args.next(cx)? {
                TupleStep::Ready(args) => args,
                TupleStep::Exhausted => return Ok(Signal::Fail),
                TupleStep::Exit(signal) => return Ok(signal),
            };
            let env = cx.scan().clone();
            match self.function {
                ScanFunction::Tab | ScanFunction::Move => {
                    if let Some(to) = self.function.target(&env, &args)? {
                        let from = env.pos();
                        env.rewind(to);
                        self.undo = Some((env.clone(), from));
                        return Ok(Signal::value(env.slice(from, to)));
                    }
                }
                function => self.pending = function.positions(&env, &args)?.into(),
            }
        }
    }

    fn reset(&mut self, cx: &mut Context) {
        self.args.reset(cx);
        self.pending.clear();
        self.undo = None;
    }
}
