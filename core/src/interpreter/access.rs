//! Data and access generators: ranges, subscripts, element generation,
//! invocation, assignment, binding and structure construction

use super::body::Body;
use super::coexpr::CoExpression;
use super::context::Context;
use super::errors::EngineError;
use super::node::{Generator, Node};
use super::types::{Atom, Cell, Key, Numeric, Signal, Step, Temp, Value};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::trace;

/* ===================== Operand tuples ===================== */

pub(crate) enum TupleStep {
    Ready(Vec<Value>),
    Exhausted,
    Exit(Signal),
}

/// Goal-directed cross product of operand results
///
/// The rightmost operand varies fastest. When an operand fails the tuple
/// backtracks into the one to its left, resetting everything to the right.
/// Each position keeps its latest value in a temporary.
pub(crate) struct Tuple {
    operands: Vec<Node>,
    temps: Vec<Temp>,
    cursor: usize,
    resume_last: bool,
    exhausted: bool,
}

impl Tuple {
    pub(crate) fn new(operands: Vec<Node>) -> Self {
        let temps = operands.iter().map(|_| Temp::new()).collect();
        Self {
            operands,
            temps,
            cursor: 0,
            resume_last: false,
            exhausted: false,
        }
    }

    pub(crate) fn next(&mut self, cx: &mut Context) -> Result<TupleStep, EngineError> {
        if self.exhausted {
            return Ok(TupleStep::Exhausted);
        }
        if self.operands.is_empty() {
            self.exhausted = true;
            return Ok(TupleStep::Ready(Vec::new()));
        }
        if self.resume_last {
            self.resume_last = false;
            self.cursor = self.operands.len() - 1;
        }
        loop {
            match self.operands[self.cursor].advance(cx)? {
                Signal::Yield(atom) => {
                    self.temps[self.cursor].set(atom.deref());
                    if self.cursor + 1 == self.operands.len() {
                        self.resume_last = true;
                        return Ok(TupleStep::Ready(self.temps.iter().map(Temp::get).collect()));
                    }
                    self.cursor += 1;
                    self.operands[self.cursor].reset(cx);
                }
                Signal::Fail => {
                    self.temps[self.cursor].clear();
                    if self.cursor == 0 {
                        self.exhausted = true;
                        return Ok(TupleStep::Exhausted);
                    }
                    self.cursor -= 1;
                }
                exit => return Ok(TupleStep::Exit(exit)),
            }
        }
    }

    pub(crate) fn reset(&mut self, cx: &mut Context) {
        for operand in &mut self.operands {
            operand.reset(cx);
        }
        for temp in &self.temps {
            temp.clear();
        }
        self.cursor = 0;
        self.resume_last = false;
        self.exhausted = false;
    }
}

/* ===================== Range ===================== */

enum Progression {
    Int { next: Option<i64>, to: i64, by: i64 },
    Real { next: f64, to: f64, by: f64 },
}

impl Progression {
    fn new(bounds: &[Value]) -> Result<Self, EngineError> {
        let (from, to, by) = (&bounds[0], &bounds[1], &bounds[2]);
        let any_real = bounds
            .iter()
            .any(|b| matches!(b.to_numeric(), Ok(Numeric::Real(_))));
        if any_real {
            let by = by.to_numeric()?.as_f64();
            if by == 0.0 {
                return Err(EngineError::ZeroStep);
            }
            Ok(Progression::Real {
                next: from.to_numeric()?.as_f64(),
                to: to.to_numeric()?.as_f64(),
                by,
            })
        } else {
            let by = by.to_integer()?;
            if by == 0 {
                return Err(EngineError::ZeroStep);
            }
            Ok(Progression::Int {
                next: Some(from.to_integer()?),
                to: to.to_integer()?,
                by,
            })
        }
    }

    fn step(&mut self) -> Option<Value> {
        match self {
            Progression::Int { next, to, by } => {
                let current = (*next)?;
                if (*by > 0 && current > *to) || (*by < 0 && current < *to) {
                    return None;
                }
                *next = current.checked_add(*by);
                Some(Value::Integer(current))
            }
            Progression::Real { next, to, by } => {
                let current = *next;
                if (*by > 0.0 && current > *to) || (*by < 0.0 && current < *to) {
                    return None;
                }
                *next = current + *by;
                Some(Value::Real(current))
            }
        }
    }
}

/// Arithmetic progression `from to bound by step`
pub struct Range {
    bounds: Tuple,
    progression: Option<Progression>,
}

impl Range {
    pub fn new(from: Node, to: Node, by: Node) -> Self {
        Self {
            bounds: Tuple::new(vec![from, to, by]),
            progression: None,
        }
    }
}

impl Generator for Range {
    fn advance(&mut self, cx: &mut Context) -> Step {
        loop {
            if let Some(progression) = &mut self.progression {
                if let Some(value) = progression.step() {
                    return Ok(Signal::value(value));
                }
                self.progression = None;
            }
            match self.bounds.next(cx)? {
                TupleStep::Ready(bounds) => self.progression = Some(Progression::new(&bounds)?),
                TupleStep::Exhausted => return Ok(Signal::Fail),
                TupleStep::Exit(signal) => return Ok(signal),
            }
        }
    }

    fn reset(&mut self, cx: &mut Context) {
        self.bounds.reset(cx);
        self.progression = None;
    }
}

/* ===================== Subscripts ===================== */

/// Character at an Icon position, counted in chars
fn char_at(text: &str, position: i64) -> Option<Value> {
    let len = text.chars().count() as i64;
    let index = if position > 0 { position - 1 } else { len + position };
    if !(0..len).contains(&index) {
        return None;
    }
    text.chars()
        .nth(index as usize)
        .map(|c| Value::str(c.to_string()))
}

/// Location of `target[key]`, or `None` when the position is out of range
fn subscript(target: &Value, key: &Value) -> Result<Option<Atom>, EngineError> {
    match target {
        Value::List(list) => Ok(list
            .resolve(key.to_integer()?)
            .map(|index| Atom::Element {
                list: list.clone(),
                index,
            })),
        Value::Table(table) => Ok(Some(Atom::Entry {
            table: table.clone(),
            key: Key::from_value(key),
        })),
        Value::Record(record) => {
            let field = match key {
                Value::Str(name) => {
                    if !record.has_field(name) {
                        return Err(EngineError::NoSuchField {
                            record: record.name().to_string(),
                            field: name.to_string(),
                        });
                    }
                    name.clone()
                }
                other => match record.field_at(other.to_integer()?) {
                    Some(name) => name,
                    None => return Ok(None),
                },
            };
            Ok(Some(Atom::Field {
                record: record.clone(),
                field,
            }))
        }
        Value::Str(_) | Value::Integer(_) | Value::Real(_) => {
            let text = target.to_text()?;
            Ok(char_at(&text, key.to_integer()?).map(Atom::Value))
        }
        other => Err(EngineError::type_mismatch("subscriptable value", other)),
    }
}

/// `target[key]`
pub struct Index {
    operands: Tuple,
}

impl Index {
    pub fn new(target: Node, key: Node) -> Self {
        Self {
            operands: Tuple::new(vec![target, key]),
        }
    }
}

impl Generator for Index {
    fn advance(&mut self, cx: &mut Context) -> Step {
        loop {
            match self.operands.next(cx)? {
                TupleStep::Ready(values) => {
                    if let Some(atom) = subscript(&values[0], &values[1])? {
                        return Ok(Signal::Yield(atom));
                    }
                }
                TupleStep::Exhausted => return Ok(Signal::Fail),
                TupleStep::Exit(signal) => return Ok(signal),
            }
        }
    }

    fn reset(&mut self, cx: &mut Context) {
        self.operands.reset(cx);
    }
}

/// `object.name`
pub struct FieldAccess {
    object: Tuple,
    name: Arc<str>,
}

impl FieldAccess {
    pub fn new(object: Node, name: &str) -> Self {
        Self {
            object: Tuple::new(vec![object]),
            name: name.into(),
        }
    }
}

impl Generator for FieldAccess {
    fn advance(&mut self, cx: &mut Context) -> Step {
        match self.object.next(cx)? {
            TupleStep::Ready(values) => match &values[0] {
                Value::Record(record) if record.has_field(&self.name) => {
                    Ok(Signal::Yield(Atom::Field {
                        record: record.clone(),
                        field: self.name.clone(),
                    }))
                }
                Value::Record(record) => Err(EngineError::NoSuchField {
                    record: record.name().to_string(),
                    field: self.name.to_string(),
                }),
                other => Err(EngineError::type_mismatch("record", other)),
            },
            TupleStep::Exhausted => Ok(Signal::Fail),
            TupleStep::Exit(signal) => Ok(signal),
        }
    }

    fn reset(&mut self, cx: &mut Context) {
        self.object.reset(cx);
    }
}

/// `!source`: generate the elements of a structure or the characters of a string
pub struct Promote {
    source: Tuple,
    pending: VecDeque<Atom>,
}

impl Promote {
    pub fn new(source: Node) -> Self {
        Self {
            source: Tuple::new(vec![source]),
            pending: VecDeque::new(),
        }
    }

    fn elements(value: &Value) -> Result<VecDeque<Atom>, EngineError> {
        Ok(match value {
            Value::List(list) => (0..list.len())
                .map(|index| Atom::Element {
                    list: list.clone(),
                    index,
                })
                .collect(),
            Value::Table(table) => table
                .keys()
                .into_iter()
                .map(|key| Atom::Entry {
                    table: table.clone(),
                    key,
                })
                .collect(),
            Value::Record(record) => record
                .field_names()
                .into_iter()
                .map(|field| Atom::Field {
                    record: record.clone(),
                    field,
                })
                .collect(),
            Value::Set(set) => set
                .members()
                .iter()
                .map(|member| Atom::Value(member.to_value()))
                .collect(),
            Value::Str(_) | Value::Integer(_) | Value::Real(_) => value
                .to_text()?
                .chars()
                .map(|c| Atom::Value(Value::str(c.to_string())))
                .collect(),
            other => return Err(EngineError::type_mismatch("structure or string", other)),
        })
    }
}

impl Generator for Promote {
    fn advance(&mut self, cx: &mut Context) -> Step {
        loop {
            if let Some(atom) = self.pending.pop_front() {
                return Ok(Signal::Yield(atom));
            }
            match self.source.next(cx)? {
                TupleStep::Ready(values) => self.pending = Self::elements(&values[0])?,
                TupleStep::Exhausted => return Ok(Signal::Fail),
                TupleStep::Exit(signal) => return Ok(signal),
            }
        }
    }

    fn reset(&mut self, cx: &mut Context) {
        self.source.reset(cx);
        self.pending.clear();
    }
}

/* ===================== Invocation ===================== */

/// Call of a method or registry operation for every argument tuple
///
/// A method call checks a body out of the context's pool and owns it until
/// the body is exhausted or the invocation is reset.
pub struct Invoke {
    callee: Arc<str>,
    args: Tuple,
    active: Option<Body>,
}

impl Invoke {
    pub fn new(callee: &str, args: Vec<Node>) -> Self {
        Self {
            callee: callee.into(),
            args: Tuple::new(args),
            active: None,
        }
    }

    fn release_active(&mut self, cx: &mut Context) {
        if let Some(body) = self.active.take() {
            cx.release(body);
        }
    }
}

impl Generator for Invoke {
    fn advance(&mut self, cx: &mut Context) -> Step {
        loop {
            if let Some(body) = &mut self.active {
                match body.advance(cx) {
                    Ok(Signal::Yield(atom)) => {
                        if body.is_finished() {
                            self.release_active(cx);
                        }
                        return Ok(Signal::Yield(atom));
                    }
                    Ok(_) => self.release_active(cx),
                    Err(err) => {
                        self.active = None;
                        return Err(err);
                    }
                }
            }
            let args = match self.args.next(cx)? {
                TupleStep::Ready(args) => args,
                TupleStep::Exhausted => return Ok(Signal::Fail),
                TupleStep::Exit(signal) => return Ok(signal),
            };
            if cx.program().has_method(&self.callee) {
                let mut body = cx.construct(&self.callee)?;
                body.unpack_args(&args);
                self.active = Some(body);
                continue;
            }
            let operation = cx
                .program()
                .operation(&self.callee)
                .ok_or_else(|| EngineError::UnknownCallee(self.callee.to_string()))?;
            trace!(operation = %self.callee, args = args.len(), "call");
            if let Some(value) = operation.call(&args)? {
                return Ok(Signal::value(value));
            }
        }
    }

    fn reset(&mut self, cx: &mut Context) {
        self.release_active(cx);
        self.args.reset(cx);
    }
}

/* ===================== Assignment ===================== */

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssignMode {
    /// `:=`
    Plain,
    /// `op:=`, applying a registry operation first
    Augmented(Arc<str>),
    /// `:=:`
    Swap,
    /// `<-`, undone when resumed
    Reversible,
}

/// Assignment over every target result and every value result
pub struct Assign {
    target: Node,
    value: Node,
    mode: AssignMode,
    location: Option<Atom>,
    undo: Option<(Atom, Value)>,
}

impl Assign {
    pub fn new(target: Node, value: Node, mode: AssignMode) -> Self {
        Self {
            target,
            value,
            mode,
            location: None,
            undo: None,
        }
    }

    /// Store into `location`; `false` when an augmenting operation failed
    /// or the location refused the value
    fn store(&mut self, cx: &mut Context, location: &Atom, source: Atom) -> Result<bool, EngineError> {
        let previous = location.deref();
        let (value, trail) = match &self.mode {
            AssignMode::Plain => (source.deref(), cx.config().trail_assignments),
            AssignMode::Reversible => (source.deref(), true),
            AssignMode::Augmented(operator) => {
                let operation = cx
                    .program()
                    .operation(operator)
                    .ok_or_else(|| EngineError::UnknownCallee(operator.to_string()))?;
                match operation.call(&[previous.clone(), source.deref()])? {
                    Some(result) => (result, cx.config().trail_assignments),
                    None => return Ok(false),
                }
            }
            AssignMode::Swap => {
                if !source.is_addressable() {
                    return Err(EngineError::NotAddressable(source.deref().image()));
                }
                let other = source.deref();
                if !location.admits(&other) || !source.admits(&previous) {
                    return Ok(false);
                }
                location.assign(other)?;
                source.assign(previous)?;
                return Ok(true);
            }
        };
        if !location.admits(&value) {
            return Ok(false);
        }
        location.assign(value)?;
        if trail {
            self.undo = Some((location.clone(), previous));
        }
        Ok(true)
    }
}

impl Generator for Assign {
    fn advance(&mut self, cx: &mut Context) -> Step {
        if let Some((location, previous)) = self.undo.take() {
            location.assign(previous)?;
        }
        loop {
            let location = match &self.location {
                Some(location) => location.clone(),
                None => match self.target.advance(cx)? {
                    Signal::Yield(atom) => {
                        if !atom.is_addressable() {
                            return Err(EngineError::NotAddressable(atom.deref().image()));
                        }
                        self.value.reset(cx);
                        self.location = Some(atom.clone());
                        atom
                    }
                    other => return Ok(other),
                },
            };
            match self.value.advance(cx)? {
                Signal::Yield(source) => {
                    if self.store(cx, &location, source)? {
                        return Ok(Signal::Yield(location));
                    }
                }
                Signal::Fail => self.location = None,
                exit => return Ok(exit),
            }
        }
    }

    fn reset(&mut self, cx: &mut Context) {
        self.target.reset(cx);
        self.value.reset(cx);
        self.location = None;
        self.undo = None;
    }
}

/// `name in e`: bind each result of `e` to a variable, then produce it
pub struct Bind {
    cell: Cell,
    generator: Node,
}

impl Bind {
    pub fn new(cell: &Cell, generator: Node) -> Self {
        Self {
            cell: cell.clone(),
            generator,
        }
    }
}

impl Generator for Bind {
    fn advance(&mut self, cx: &mut Context) -> Step {
        match self.generator.advance(cx)? {
            Signal::Yield(atom) => {
                let value = atom.deref();
                self.cell.set(value.clone());
                Ok(Signal::value(value))
            }
            other => Ok(other),
        }
    }

    fn reset(&mut self, cx: &mut Context) {
        self.generator.reset(cx);
    }
}

/* ===================== Structures and co-expressions ===================== */

/// `[e1, e2, ...]`: one fresh list per argument tuple
pub struct MakeList {
    items: Tuple,
}

impl MakeList {
    pub fn new(items: Vec<Node>) -> Self {
        Self {
            items: Tuple::new(items),
        }
    }
}

impl Generator for MakeList {
    fn advance(&mut self, cx: &mut Context) -> Step {
        match self.items.next(cx)? {
            TupleStep::Ready(values) => Ok(Signal::value(Value::list(values))),
            TupleStep::Exhausted => Ok(Signal::Fail),
            TupleStep::Exit(signal) => Ok(signal),
        }
    }

    fn reset(&mut self, cx: &mut Context) {
        self.items.reset(cx);
    }
}

/// `[: e :]`: one list holding every result of `e`
pub struct Collect {
    operand: Node,
    done: bool,
}

impl Collect {
    pub fn new(operand: Node) -> Self {
        Self {
            operand,
            done: false,
        }
    }
}

impl Generator for Collect {
    fn advance(&mut self, cx: &mut Context) -> Step {
        if self.done {
            return Ok(Signal::Fail);
        }
        let mut items = Vec::new();
        loop {
            match self.operand.advance(cx)? {
                Signal::Yield(atom) => items.push(atom.deref()),
                Signal::Fail => break,
                exit => return Ok(exit),
            }
        }
        self.done = true;
        trace!(count = items.len(), "collected");
        Ok(Signal::value(Value::list(items)))
    }

    fn reset(&mut self, cx: &mut Context) {
        self.operand.reset(cx);
        self.done = false;
    }
}

/// `create method(args)`: a new co-expression per argument tuple
pub struct Create {
    method: Arc<str>,
    args: Tuple,
}

impl Create {
    pub fn new(method: &str, args: Vec<Node>) -> Self {
        Self {
            method: method.into(),
            args: Tuple::new(args),
        }
    }
}

impl Generator for Create {
    fn advance(&mut self, cx: &mut Context) -> Step {
        match self.args.next(cx)? {
            TupleStep::Ready(args) => {
                let coexpr = CoExpression::create(cx, &self.method, args)?;
                Ok(Signal::value(Value::CoExpr(coexpr)))
            }
            TupleStep::Exhausted => Ok(Signal::Fail),
            TupleStep::Exit(signal) => Ok(signal),
        }
    }

    fn reset(&mut self, cx: &mut Context) {
        self.args.reset(cx);
    }
}

/// `value @ target`: transfer control and a value to a co-expression
pub struct Activate {
    operands: Tuple,
}

impl Activate {
    pub fn new(value: Node, target: Node) -> Self {
        Self {
            operands: Tuple::new(vec![value, target]),
        }
    }
}

impl Generator for Activate {
    fn advance(&mut self, cx: &mut Context) -> Step {
        loop {
            match self.operands.next(cx)? {
                TupleStep::Ready(mut values) => {
                    let target = match values.pop() {
                        Some(Value::CoExpr(target)) => target,
                        Some(other) => return Err(EngineError::type_mismatch("co-expression", &other)),
                        None => return Ok(Signal::Fail),
                    };
                    let value = values.pop().unwrap_or(Value::Null);
                    if let Some(result) = CoExpression::activate(cx, &target, value)? {
                        return Ok(Signal::value(result));
                    }
                }
                TupleStep::Exhausted => return Ok(Signal::Fail),
                TupleStep::Exit(signal) => return Ok(signal),
            }
        }
    }

    fn reset(&mut self, cx: &mut Context) {
        self.operands.reset(cx);
    }
}
