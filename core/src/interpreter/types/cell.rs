//! Storage: cells, temporaries, scanning environments and addressable results
//!
//! Cells belong to the node tree of one execution context and never cross
//! threads, so they use `Rc<RefCell<..>>`. Anything reachable from a
//! [`Value`] is thread-safe instead.

use super::values::{Key, List, Record, Table, Value};
use crate::interpreter::errors::EngineError;
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

/* ===================== Cells ===================== */

/// Accessor pair backing a field cell
pub struct Accessor {
    get: Box<dyn Fn() -> Value>,
    set: Box<dyn Fn(Value)>,
}

/// A mutable slot that generator nodes read and write
///
/// Cloning a cell aliases it: both handles see the same slot. Identity
/// survives `reset`, so closures and parameters bound to a cell stay valid
/// across pooled reuse.
#[derive(Clone)]
pub enum Cell {
    Local(Rc<RefCell<Value>>),
    Field(Rc<Accessor>),
}

impl Cell {
    pub fn local() -> Self {
        Cell::Local(Rc::new(RefCell::new(Value::Null)))
    }

    pub fn with_value(value: Value) -> Self {
        Cell::Local(Rc::new(RefCell::new(value)))
    }

    /// Cell whose reads and writes go through the given accessors
    pub fn field(get: impl Fn() -> Value + 'static, set: impl Fn(Value) + 'static) -> Self {
        Cell::Field(Rc::new(Accessor {
            get: Box::new(get),
            set: Box::new(set),
        }))
    }

    /// Field cell over a named program global
    pub fn global(globals: &Globals, name: &str) -> Self {
        let name: Arc<str> = name.into();
        let (reader, writer) = (globals.clone(), globals.clone());
        let read_name = name.clone();
        Cell::field(
            move || reader.get(&read_name),
            move |value| writer.set(&name, value),
        )
    }

    pub fn get(&self) -> Value {
        match self {
            Cell::Local(slot) => slot.borrow().clone(),
            Cell::Field(accessor) => (accessor.get)(),
        }
    }

    pub fn set(&self, value: Value) {
        match self {
            Cell::Local(slot) => *slot.borrow_mut() = value,
            Cell::Field(accessor) => (accessor.set)(value),
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Cell::Local(_))
    }

    pub fn ptr_eq(&self, other: &Cell) -> bool {
        match (self, other) {
            (Cell::Local(a), Cell::Local(b)) => Rc::ptr_eq(a, b),
            (Cell::Field(a), Cell::Field(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Local(slot) => write!(f, "Local({:?})", slot.borrow()),
            Cell::Field(_) => f.write_str("Field(..)"),
        }
    }
}

/// Scratch slot owned by one structural position of a compound node
///
/// Allocated once with the tree and cleared on every reset.
#[derive(Debug, Clone, Default)]
pub struct Temp(Rc<RefCell<Option<Value>>>);

impl Temp {
    pub fn new() -> Self {
        Temp::default()
    }

    pub fn get(&self) -> Value {
        self.0.borrow().clone().unwrap_or(Value::Null)
    }

    pub fn set(&self, value: Value) {
        *self.0.borrow_mut() = Some(value);
    }

    pub fn take(&self) -> Option<Value> {
        self.0.borrow_mut().take()
    }

    pub fn clear(&self) {
        *self.0.borrow_mut() = None;
    }
}

/* ===================== Globals ===================== */

/// Program-wide variables, shared by every execution context
#[derive(Debug, Clone, Default)]
pub struct Globals(Arc<Mutex<IndexMap<Arc<str>, Value>>>);

impl Globals {
    pub fn declare(&self, name: &str, initial: Value) {
        self.0.lock().insert(name.into(), initial);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.lock().contains_key(name)
    }

    pub fn get(&self, name: &str) -> Value {
        self.0.lock().get(name).cloned().unwrap_or(Value::Null)
    }

    pub fn set(&self, name: &str, value: Value) {
        self.0.lock().insert(name.into(), value);
    }
}

/* ===================== Scanning ===================== */

struct ScanState {
    subject: Arc<str>,
    /// Cursor, a 1-based character position in `1..=len + 1`
    pos: i64,
}

/// Subject and cursor of one string scan
///
/// Clones share the environment, so `&subject` and `&pos` results stay
/// bound to the scan that produced them.
#[derive(Clone)]
pub struct ScanEnv(Rc<RefCell<ScanState>>);

impl ScanEnv {
    pub fn new(subject: Arc<str>) -> Self {
        ScanEnv(Rc::new(RefCell::new(ScanState { subject, pos: 1 })))
    }

    pub fn subject(&self) -> Arc<str> {
        self.0.borrow().subject.clone()
    }

    pub fn pos(&self) -> i64 {
        self.0.borrow().pos
    }

    /// Subject length in characters
    pub fn len(&self) -> i64 {
        self.0.borrow().subject.chars().count() as i64
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().subject.is_empty()
    }

    /// Replace the subject and move the cursor back to 1
    pub fn set_subject(&self, subject: Arc<str>) {
        *self.0.borrow_mut() = ScanState { subject, pos: 1 };
    }

    /// Move the cursor to an Icon position; `false` when out of range
    pub fn set_pos(&self, position: i64) -> bool {
        match self.resolve(position) {
            Some(pos) => {
                self.0.borrow_mut().pos = pos;
                true
            }
            None => false,
        }
    }

    /// Put the cursor back where an undone operation found it
    pub(crate) fn rewind(&self, pos: i64) {
        self.0.borrow_mut().pos = pos;
    }

    /// Positive form of an Icon position in the subject; non-positive
    /// positions count from the end, 0 being past the last character
    pub fn resolve(&self, position: i64) -> Option<i64> {
        let len = self.len();
        let pos = if position > 0 { position } else { len + 1 + position };
        (1..=len + 1).contains(&pos).then_some(pos)
    }

    /// Characters between two positive positions, in either order
    pub fn slice(&self, a: i64, b: i64) -> String {
        let (from, to) = if a <= b { (a, b) } else { (b, a) };
        self.0
            .borrow()
            .subject
            .chars()
            .skip((from - 1).max(0) as usize)
            .take((to - from).max(0) as usize)
            .collect()
    }

    pub fn ptr_eq(&self, other: &ScanEnv) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Default for ScanEnv {
    fn default() -> Self {
        ScanEnv::new("".into())
    }
}

impl fmt::Debug for ScanEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ScanEnv({:?} @ {})", self.subject(), self.pos())
    }
}

/* ===================== Atoms ===================== */

/// One result of a generator: a plain value or an assignable location
#[derive(Debug, Clone)]
pub enum Atom {
    Value(Value),
    Cell(Cell),
    Element { list: List, index: usize },
    Entry { table: Table, key: Key },
    Field { record: Record, field: Arc<str> },
    /// `&subject` of a scanning environment
    Subject(ScanEnv),
    /// `&pos` of a scanning environment
    Pos(ScanEnv),
}

impl Atom {
    pub fn null() -> Self {
        Atom::Value(Value::Null)
    }

    pub fn deref(&self) -> Value {
        match self {
            Atom::Value(v) => v.clone(),
            Atom::Cell(cell) => cell.get(),
            Atom::Element { list, index } => list.get(*index).unwrap_or(Value::Null),
            Atom::Entry { table, key } => table.get(key),
            Atom::Field { record, field } => record.get(field).unwrap_or(Value::Null),
            Atom::Subject(env) => Value::Str(env.subject()),
            Atom::Pos(env) => Value::Integer(env.pos()),
        }
    }

    /// Whether assigning `value` succeeds rather than fails; only a cursor
    /// position outside the subject is refused
    pub fn admits(&self, value: &Value) -> bool {
        match self {
            Atom::Pos(env) => value
                .to_integer()
                .map_or(true, |position| env.resolve(position).is_some()),
            _ => true,
        }
    }

    pub fn assign(&self, value: Value) -> Result<(), EngineError> {
        match self {
            Atom::Value(v) => Err(EngineError::NotAddressable(v.image())),
            Atom::Cell(cell) => {
                cell.set(value);
                Ok(())
            }
            Atom::Element { list, index } => {
                if list.set(*index, value) {
                    Ok(())
                } else {
                    Err(EngineError::NotAddressable(format!(
                        "list element {} of {}",
                        index + 1,
                        list.len()
                    )))
                }
            }
            Atom::Entry { table, key } => {
                table.insert(key.clone(), value);
                Ok(())
            }
            Atom::Field { record, field } => {
                if record.set(field, value) {
                    Ok(())
                } else {
                    Err(EngineError::NoSuchField {
                        record: record.name().to_string(),
                        field: field.to_string(),
                    })
                }
            }
            Atom::Subject(env) => {
                env.set_subject(value.to_text()?);
                Ok(())
            }
            Atom::Pos(env) => {
                let position = value.to_integer()?;
                if env.set_pos(position) {
                    Ok(())
                } else {
                    Err(EngineError::host("&pos", format!("position {} out of range", position)))
                }
            }
        }
    }

    pub fn is_addressable(&self) -> bool {
        !matches!(self, Atom::Value(_))
    }

    /// Dereference local cells, keep structure and global locations.
    /// Applied when a result leaves a method body.
    pub fn escape(self) -> Atom {
        match self {
            Atom::Cell(cell) if cell.is_local() => Atom::Value(cell.get()),
            other => other,
        }
    }
}

impl From<Value> for Atom {
    fn from(value: Value) -> Self {
        Atom::Value(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aliased_cells_share_slot() {
        let cell = Cell::local();
        let alias = cell.clone();
        alias.set(Value::Integer(7));
        assert_eq!(cell.get(), Value::Integer(7));
        assert!(cell.ptr_eq(&alias));
        assert!(!cell.ptr_eq(&Cell::local()));
    }

    #[test]
    fn test_global_cell_proxies_table() {
        let globals = Globals::default();
        globals.declare("count", Value::Integer(1));
        let cell = Cell::global(&globals, "count");
        cell.set(Value::Integer(5));
        assert_eq!(globals.get("count"), Value::Integer(5));
        assert!(!cell.is_local());
    }

    #[test]
    fn test_atom_assignment_targets() {
        let list = List::new(vec![1.into(), 2.into()]);
        let element = Atom::Element {
            list: list.clone(),
            index: 1,
        };
        element.assign(9.into()).unwrap();
        assert_eq!(list.snapshot(), vec![Value::Integer(1), Value::Integer(9)]);

        let err = Atom::Value(3.into()).assign(4.into()).unwrap_err();
        assert!(matches!(err, EngineError::NotAddressable(_)));
    }

    #[test]
    fn test_escape_derefs_only_locals() {
        let local = Cell::with_value("x".into());
        assert!(!Atom::Cell(local).escape().is_addressable());

        let list = List::new(vec![1.into()]);
        let element = Atom::Element { list, index: 0 };
        assert!(element.escape().is_addressable());
    }

    #[test]
    fn test_scan_positions() {
        let env = ScanEnv::new("hello".into());
        assert_eq!(env.resolve(0), Some(6));
        assert_eq!(env.resolve(-1), Some(5));
        assert_eq!(env.resolve(6), Some(6));
        assert_eq!(env.resolve(7), None);
        assert_eq!(env.resolve(-6), None);
        assert_eq!(env.slice(2, 4), "el");
        assert_eq!(env.slice(4, 2), "el");
    }

    #[test]
    fn test_scan_keyword_atoms() {
        let env = ScanEnv::new("abc".into());
        let pos = Atom::Pos(env.clone());
        assert!(pos.admits(&3.into()));
        assert!(!pos.admits(&9.into()));
        pos.assign(0.into()).unwrap();
        assert_eq!(env.pos(), 4);

        Atom::Subject(env.clone()).assign("xy".into()).unwrap();
        assert_eq!(env.pos(), 1);
        assert_eq!(Atom::Subject(env).deref(), Value::from("xy"));
    }
}
