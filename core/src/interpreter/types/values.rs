//! Runtime value types
//!
//! Scalars are immutable. Lists, tables, sets and records are shared
//! structures with reference identity; they sit behind `Arc<Mutex<..>>` so a
//! value can be handed across co-expression threads. A structure may contain
//! itself, so images and serialization track the structures on the current
//! path and print a repeated one by identity instead of descending again.

use crate::interpreter::coexpr::CoExpression;
use crate::interpreter::errors::EngineError;
use indexmap::{IndexMap, IndexSet};
use parking_lot::Mutex;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use std::cell::RefCell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/* ===================== Values ===================== */

/// Runtime value type
#[derive(Clone)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Str(Arc<str>),
    List(List),
    Table(Table),
    Set(Set),
    Record(Record),
    CoExpr(CoExpression),
}

impl Value {
    pub fn str(s: impl Into<Arc<str>>) -> Value {
        Value::Str(s.into())
    }

    pub fn list(items: Vec<Value>) -> Value {
        Value::List(List::new(items))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Integer(_) => "integer",
            Value::Real(_) => "real",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Table(_) => "table",
            Value::Set(_) => "set",
            Value::Record(_) => "record",
            Value::CoExpr(_) => "co-expression",
        }
    }

    /// Numeric view, converting numeric strings the way Icon does
    pub fn to_numeric(&self) -> Result<Numeric, EngineError> {
        match self {
            Value::Integer(i) => Ok(Numeric::Int(*i)),
            Value::Real(r) => Ok(Numeric::Real(*r)),
            Value::Str(s) => {
                let s = s.trim();
                if let Ok(i) = s.parse::<i64>() {
                    Ok(Numeric::Int(i))
                } else if let Ok(r) = s.parse::<f64>() {
                    Ok(Numeric::Real(r))
                } else {
                    Err(EngineError::type_mismatch("numeric", self))
                }
            }
            _ => Err(EngineError::type_mismatch("numeric", self)),
        }
    }

    pub fn to_integer(&self) -> Result<i64, EngineError> {
        match self.to_numeric()? {
            Numeric::Int(i) => Ok(i),
            Numeric::Real(r) if r.fract() == 0.0 && r.is_finite() => Ok(r as i64),
            Numeric::Real(_) => Err(EngineError::type_mismatch("integer", self)),
        }
    }

    /// String view, converting numbers the way Icon does
    pub fn to_text(&self) -> Result<Arc<str>, EngineError> {
        match self {
            Value::Str(s) => Ok(s.clone()),
            Value::Integer(i) => Ok(i.to_string().into()),
            Value::Real(r) => Ok(format_real(*r).into()),
            _ => Err(EngineError::type_mismatch("string", self)),
        }
    }

    /// Printable image of the value (used in diagnostics and `image`)
    pub fn image(&self) -> String {
        let mut out = String::new();
        self.write_image(&mut out, &mut Vec::new());
        out
    }

    fn write_image(&self, out: &mut String, path: &mut Vec<usize>) {
        match self {
            Value::Null => out.push_str("&null"),
            Value::Integer(i) => out.push_str(&i.to_string()),
            Value::Real(r) => out.push_str(&format_real(*r)),
            Value::Str(s) => out.push_str(&format!("{:?}", s)),
            Value::List(l) if path.contains(&l.addr()) => out.push_str(&self.label()),
            Value::List(l) => {
                path.push(l.addr());
                out.push('[');
                for (i, item) in l.snapshot().iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    item.write_image(out, path);
                }
                out.push(']');
                path.pop();
            }
            Value::Table(_) | Value::Set(_) => out.push_str(&self.label()),
            Value::Record(r) if path.contains(&r.addr()) => out.push_str(&self.label()),
            Value::Record(r) => {
                path.push(r.addr());
                out.push_str(r.name());
                out.push('(');
                for (i, field) in r.values().iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    field.write_image(out, path);
                }
                out.push(')');
                path.pop();
            }
            Value::CoExpr(c) => out.push_str(&format!("co-expression #{}({})", c.id(), c.results())),
        }
    }

    /// Short form naming a structure without its contents
    fn label(&self) -> String {
        match self {
            Value::List(l) => format!("list({})", l.len()),
            Value::Table(t) => format!("table({})", t.len()),
            Value::Set(s) => format!("set({})", s.len()),
            Value::Record(r) => format!("record {}", r.name()),
            other => other.image(),
        }
    }

    /// Address of a shared structure; `None` for scalars
    pub(crate) fn addr(&self) -> Option<usize> {
        match self {
            Value::List(l) => Some(l.addr()),
            Value::Table(t) => Some(t.addr()),
            Value::Set(s) => Some(s.addr()),
            Value::Record(r) => Some(r.addr()),
            Value::CoExpr(c) => Some(c.addr()),
            _ => None,
        }
    }

    /// Identity comparison (`===`): scalars by value, structures by reference
    pub fn identical(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Real(a), Value::Real(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a.ptr_eq(b),
            (Value::Table(a), Value::Table(b)) => a.ptr_eq(b),
            (Value::Set(a), Value::Set(b)) => a.ptr_eq(b),
            (Value::Record(a), Value::Record(b)) => a.ptr_eq(b),
            (Value::CoExpr(a), Value::CoExpr(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        self.identical(other)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.image())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Str(s) => f.write_str(s),
            other => f.write_str(&other.image()),
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(r: f64) -> Self {
        Value::Real(r)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s.into())
    }
}

fn format_real(r: f64) -> String {
    if r.fract() == 0.0 && r.is_finite() {
        format!("{:.1}", r)
    } else {
        r.to_string()
    }
}

/* ===================== Numbers ===================== */

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Numeric {
    Int(i64),
    Real(f64),
}

impl Numeric {
    pub fn as_f64(self) -> f64 {
        match self {
            Numeric::Int(i) => i as f64,
            Numeric::Real(r) => r,
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            Numeric::Int(i) => Value::Integer(i),
            Numeric::Real(r) => Value::Real(r),
        }
    }
}

/* ===================== Structures ===================== */

/// Shared, mutable list
#[derive(Clone, Default)]
pub struct List(Arc<Mutex<Vec<Value>>>);

impl List {
    pub fn new(items: Vec<Value>) -> Self {
        List(Arc::new(Mutex::new(items)))
    }

    pub fn len(&self) -> usize {
        self.0.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.lock().is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        self.0.lock().get(index).cloned()
    }

    pub fn set(&self, index: usize, value: Value) -> bool {
        match self.0.lock().get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub fn push(&self, value: Value) {
        self.0.lock().push(value);
    }

    pub fn push_front(&self, value: Value) {
        self.0.lock().insert(0, value);
    }

    pub fn pop_front(&self) -> Option<Value> {
        let mut items = self.0.lock();
        if items.is_empty() {
            None
        } else {
            Some(items.remove(0))
        }
    }

    pub fn pop_back(&self) -> Option<Value> {
        self.0.lock().pop()
    }

    /// Resolve an Icon position (1-based, non-positive counts from the end)
    /// to a 0-based index
    pub fn resolve(&self, position: i64) -> Option<usize> {
        let len = self.len() as i64;
        let index = if position > 0 { position - 1 } else { len + position };
        (0..len).contains(&index).then_some(index as usize)
    }

    pub fn snapshot(&self) -> Vec<Value> {
        self.0.lock().clone()
    }

    pub fn ptr_eq(&self, other: &List) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    fn addr(&self) -> usize {
        Arc::as_ptr(&self.0).cast::<()>() as usize
    }
}

impl fmt::Debug for List {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&Value::List(self.clone()).image())
    }
}

/// Hashable projection of a value, used for table keys and set members
///
/// Scalars compare by value, structures by identity.
#[derive(Debug, Clone)]
pub enum Key {
    Null,
    Integer(i64),
    Real(u64),
    Str(Arc<str>),
    Structure(Value),
}

impl Key {
    pub fn from_value(value: &Value) -> Key {
        match value {
            Value::Null => Key::Null,
            Value::Integer(i) => Key::Integer(*i),
            Value::Real(r) => Key::Real(r.to_bits()),
            Value::Str(s) => Key::Str(s.clone()),
            other => Key::Structure(other.clone()),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Key::Null => Value::Null,
            Key::Integer(i) => Value::Integer(*i),
            Key::Real(bits) => Value::Real(f64::from_bits(*bits)),
            Key::Str(s) => Value::Str(s.clone()),
            Key::Structure(value) => value.clone(),
        }
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Key) -> bool {
        match (self, other) {
            (Key::Null, Key::Null) => true,
            (Key::Integer(a), Key::Integer(b)) => a == b,
            (Key::Real(a), Key::Real(b)) => a == b,
            (Key::Str(a), Key::Str(b)) => a == b,
            (Key::Structure(a), Key::Structure(b)) => a.identical(b),
            _ => false,
        }
    }
}

impl Eq for Key {}

impl Hash for Key {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Key::Null => {}
            Key::Integer(i) => i.hash(state),
            Key::Real(bits) => bits.hash(state),
            Key::Str(s) => s.hash(state),
            Key::Structure(value) => value.addr().hash(state),
        }
    }
}

struct TableData {
    entries: IndexMap<Key, Value>,
    default: Value,
}

/// Shared, insertion-ordered table with a default value for missing keys
#[derive(Clone)]
pub struct Table(Arc<Mutex<TableData>>);

impl Table {
    pub fn new(default: Value) -> Self {
        Table(Arc::new(Mutex::new(TableData {
            entries: IndexMap::new(),
            default,
        })))
    }

    pub fn get(&self, key: &Key) -> Value {
        let data = self.0.lock();
        data.entries
            .get(key)
            .cloned()
            .unwrap_or_else(|| data.default.clone())
    }

    pub fn insert(&self, key: Key, value: Value) {
        self.0.lock().entries.insert(key, value);
    }

    pub fn default_value(&self) -> Value {
        self.0.lock().default.clone()
    }

    pub fn remove(&self, key: &Key) -> Option<Value> {
        self.0.lock().entries.shift_remove(key)
    }

    pub fn contains(&self, key: &Key) -> bool {
        self.0.lock().entries.contains_key(key)
    }

    pub fn keys(&self) -> Vec<Key> {
        self.0.lock().entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.0.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn entries(&self) -> Vec<(Key, Value)> {
        self.0
            .lock()
            .entries
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn ptr_eq(&self, other: &Table) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    fn addr(&self) -> usize {
        Arc::as_ptr(&self.0).cast::<()>() as usize
    }
}

impl fmt::Debug for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&Value::Table(self.clone()).image())
    }
}

/// Shared, insertion-ordered set of keys
#[derive(Clone, Default)]
pub struct Set(Arc<Mutex<IndexSet<Key>>>);

impl Set {
    pub fn new(members: impl IntoIterator<Item = Key>) -> Self {
        Set(Arc::new(Mutex::new(members.into_iter().collect())))
    }

    /// `false` when the member was already present
    pub fn insert(&self, member: Key) -> bool {
        self.0.lock().insert(member)
    }

    pub fn remove(&self, member: &Key) -> bool {
        self.0.lock().shift_remove(member)
    }

    pub fn contains(&self, member: &Key) -> bool {
        self.0.lock().contains(member)
    }

    pub fn len(&self) -> usize {
        self.0.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn members(&self) -> Vec<Key> {
        self.0.lock().iter().cloned().collect()
    }

    pub fn ptr_eq(&self, other: &Set) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    fn addr(&self) -> usize {
        Arc::as_ptr(&self.0).cast::<()>() as usize
    }
}

impl fmt::Debug for Set {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&Value::Set(self.clone()).image())
    }
}

struct RecordData {
    name: Arc<str>,
    fields: Mutex<IndexMap<Arc<str>, Value>>,
}

/// Instance of a declared record type
#[derive(Clone)]
pub struct Record(Arc<RecordData>);

impl Record {
    pub fn new(name: impl Into<Arc<str>>, fields: Vec<(Arc<str>, Value)>) -> Self {
        Record(Arc::new(RecordData {
            name: name.into(),
            fields: Mutex::new(fields.into_iter().collect()),
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn get(&self, field: &str) -> Option<Value> {
        self.0.fields.lock().get(field).cloned()
    }

    pub fn set(&self, field: &str, value: Value) -> bool {
        match self.0.fields.lock().get_mut(field) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.0.fields.lock().contains_key(field)
    }

    /// Field name at a 1-based position
    pub fn field_at(&self, position: i64) -> Option<Arc<str>> {
        let fields = self.0.fields.lock();
        let len = fields.len() as i64;
        let index = if position > 0 { position - 1 } else { len + position };
        if !(0..len).contains(&index) {
            return None;
        }
        fields.get_index(index as usize).map(|(name, _)| name.clone())
    }

    pub fn field_names(&self) -> Vec<Arc<str>> {
        self.0.fields.lock().keys().cloned().collect()
    }

    pub fn values(&self) -> Vec<Value> {
        self.0.fields.lock().values().cloned().collect()
    }

    pub fn ptr_eq(&self, other: &Record) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    fn addr(&self) -> usize {
        Arc::as_ptr(&self.0).cast::<()>() as usize
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&Value::Record(self.clone()).image())
    }
}

/* ===================== Serialization ===================== */

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let path = RefCell::new(Vec::new());
        Rendered { value: self, path: &path }.serialize(serializer)
    }
}

/// A value being serialized, with the structures enclosing it
struct Rendered<'a> {
    value: &'a Value,
    path: &'a RefCell<Vec<usize>>,
}

impl<'a> Rendered<'a> {
    fn nested(&self, value: &'a Value) -> Rendered<'a> {
        Rendered {
            value,
            path: self.path,
        }
    }

    /// Push the structure onto the path; `false` if it is already on it
    fn enter(&self) -> bool {
        match self.value.addr() {
            Some(addr) if self.path.borrow().contains(&addr) => false,
            Some(addr) => {
                self.path.borrow_mut().push(addr);
                true
            }
            None => true,
        }
    }

    fn leave(&self) {
        self.path.borrow_mut().pop();
    }
}

impl Serialize for Rendered<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.value {
            Value::Null => serializer.serialize_unit(),
            Value::Integer(i) => serializer.serialize_i64(*i),
            Value::Real(r) => serializer.serialize_f64(*r),
            Value::Str(s) => serializer.serialize_str(s),
            Value::CoExpr(_) => serializer.serialize_str(&self.value.image()),
            structure if !self.enter() => serializer.serialize_str(&structure.label()),
            Value::List(l) => {
                let items = l.snapshot();
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in &items {
                    seq.serialize_element(&self.nested(item))?;
                }
                self.leave();
                seq.end()
            }
            Value::Set(s) => {
                let members: Vec<Value> = s.members().iter().map(Key::to_value).collect();
                let mut seq = serializer.serialize_seq(Some(members.len()))?;
                for member in &members {
                    seq.serialize_element(&self.nested(member))?;
                }
                self.leave();
                seq.end()
            }
            Value::Table(t) => {
                let entries = t.entries();
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in &entries {
                    map.serialize_entry(&key.to_value().to_string(), &self.nested(value))?;
                }
                self.leave();
                map.end()
            }
            Value::Record(r) => {
                let names = r.field_names();
                let values = r.values();
                let mut map = serializer.serialize_map(Some(names.len()))?;
                for (name, value) in names.iter().zip(values.iter()) {
                    map.serialize_entry(name.as_ref(), &self.nested(value))?;
                }
                self.leave();
                map.end()
            }
        }
    }
}
