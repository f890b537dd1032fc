//! Lists, tables, sets, records and co-expression handles

use super::{arg, OpResult};
use crate::interpreter::errors::EngineError;
use crate::interpreter::types::{Key, List, Record, Set, Table, Value};
use std::cmp::Ordering;

fn as_list(value: &Value) -> Result<&List, EngineError> {
    match value {
        Value::List(list) => Ok(list),
        other => Err(EngineError::type_mismatch("list", other)),
    }
}

fn as_table(value: &Value) -> Result<&Table, EngineError> {
    match value {
        Value::Table(table) => Ok(table),
        other => Err(EngineError::type_mismatch("table", other)),
    }
}

fn as_set(value: &Value) -> Result<&Set, EngineError> {
    match value {
        Value::Set(set) => Ok(set),
        other => Err(EngineError::type_mismatch("set", other)),
    }
}

/// *x - length of a string or structure, or results produced by a co-expression
pub fn size(args: &[Value]) -> OpResult {
    let n = match arg(args, 0) {
        Value::List(list) => list.len() as i64,
        Value::Table(table) => table.len() as i64,
        Value::Set(set) => set.len() as i64,
        Value::Record(record) => record.field_names().len() as i64,
        Value::CoExpr(coexpr) => coexpr.results() as i64,
        other => other.to_text()?.chars().count() as i64,
    };
    Ok(Some(Value::Integer(n)))
}

/// list(n, x) - n copies of x
pub fn list(args: &[Value]) -> OpResult {
    let n = match arg(args, 0) {
        Value::Null => 0,
        other => other.to_integer()?,
    };
    let n = usize::try_from(n)
        .map_err(|_| EngineError::type_mismatch("non-negative integer", &Value::Integer(n)))?;
    let mut items = Vec::new();
    items
        .try_reserve_exact(n)
        .map_err(|e| EngineError::host("list", format!("cannot allocate {} elements: {}", n, e)))?;
    items.resize(n, arg(args, 1));
    Ok(Some(Value::list(items)))
}

/// table(x) - empty table whose missing keys read as x
pub fn table(args: &[Value]) -> OpResult {
    Ok(Some(Value::Table(Table::new(arg(args, 0)))))
}

/// put(L, x1, ...) - append to the back; produces L
pub fn put(args: &[Value]) -> OpResult {
    let target = arg(args, 0);
    let list = as_list(&target)?;
    for value in args.iter().skip(1) {
        list.push(value.clone());
    }
    Ok(Some(target))
}

/// push(L, x1, ...) - prepend to the front one by one; produces L
pub fn push(args: &[Value]) -> OpResult {
    let target = arg(args, 0);
    let list = as_list(&target)?;
    for value in args.iter().skip(1) {
        list.push_front(value.clone());
    }
    Ok(Some(target))
}

/// pop(L) / get(L) - remove from the front; fails on an empty list
pub fn pop(args: &[Value]) -> OpResult {
    Ok(as_list(&arg(args, 0))?.pop_front())
}

/// pull(L) - remove from the back; fails on an empty list
pub fn pull(args: &[Value]) -> OpResult {
    Ok(as_list(&arg(args, 0))?.pop_back())
}

/// set(x1, ...) - set of the arguments; list arguments contribute their elements
pub fn set(args: &[Value]) -> OpResult {
    let set = Set::default();
    for value in args {
        match value {
            Value::List(list) => {
                for item in list.snapshot() {
                    set.insert(Key::from_value(&item));
                }
            }
            other => {
                set.insert(Key::from_value(other));
            }
        }
    }
    Ok(Some(Value::Set(set)))
}

/// insert(T, k, v) / insert(S, x) - produces the structure
pub fn insert(args: &[Value]) -> OpResult {
    let target = arg(args, 0);
    match &target {
        Value::Set(set) => {
            set.insert(Key::from_value(&arg(args, 1)));
        }
        other => as_table(other)?.insert(Key::from_value(&arg(args, 1)), arg(args, 2)),
    }
    Ok(Some(target))
}

/// delete(T, k) / delete(S, x) - produces the structure
pub fn delete(args: &[Value]) -> OpResult {
    let target = arg(args, 0);
    let key = Key::from_value(&arg(args, 1));
    match &target {
        Value::Set(set) => {
            set.remove(&key);
        }
        other => {
            as_table(other)?.remove(&key);
        }
    }
    Ok(Some(target))
}

/// member(T, k) / member(S, x) - produces the key if present, fails otherwise
pub fn member(args: &[Value]) -> OpResult {
    let key = arg(args, 1);
    let present = match arg(args, 0) {
        Value::Set(set) => set.contains(&Key::from_value(&key)),
        other => as_table(&other)?.contains(&Key::from_value(&key)),
    };
    Ok(present.then_some(key))
}

/// S1 ++ S2 - union
pub fn union(args: &[Value]) -> OpResult {
    let (a, b) = (arg(args, 0), arg(args, 1));
    let (a, b) = (as_set(&a)?.members(), as_set(&b)?.members());
    Ok(Some(Value::Set(Set::new(a.into_iter().chain(b)))))
}

/// S1 ** S2 - intersection, in the order of S1
pub fn intersection(args: &[Value]) -> OpResult {
    let (a, b) = (arg(args, 0), arg(args, 1));
    let other = as_set(&b)?;
    let kept = as_set(&a)?.members().into_iter().filter(|key| other.contains(key));
    Ok(Some(Value::Set(Set::new(kept.collect::<Vec<_>>()))))
}

/// S1 -- S2 - members of S1 not in S2
pub fn difference(args: &[Value]) -> OpResult {
    let (a, b) = (arg(args, 0), arg(args, 1));
    let other = as_set(&b)?;
    let kept = as_set(&a)?.members().into_iter().filter(|key| !other.contains(key));
    Ok(Some(Value::Set(Set::new(kept.collect::<Vec<_>>()))))
}

/// Sort order: null, numbers, strings, then structures in creation order
fn rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Integer(_) | Value::Real(_) => 1,
        Value::Str(_) => 2,
        Value::CoExpr(_) => 3,
        Value::List(_) => 4,
        Value::Table(_) => 5,
        Value::Set(_) => 6,
        Value::Record(_) => 7,
    }
}

fn order(a: &Value, b: &Value) -> Ordering {
    rank(a).cmp(&rank(b)).then_with(|| match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => x.cmp(y),
        (Value::Str(x), Value::Str(y)) => x.cmp(y),
        _ => match (a.to_numeric(), b.to_numeric()) {
            (Ok(x), Ok(y)) => x.as_f64().total_cmp(&y.as_f64()),
            _ => Ordering::Equal,
        },
    })
}

/// sort(x) - sorted list of the elements of a list or set, or of a table's values
pub fn sort(args: &[Value]) -> OpResult {
    let mut items = match arg(args, 0) {
        Value::List(list) => list.snapshot(),
        Value::Table(table) => table.entries().into_iter().map(|(_, v)| v).collect(),
        Value::Set(set) => set.members().iter().map(Key::to_value).collect(),
        other => return Err(EngineError::type_mismatch("list, table or set", &other)),
    };
    items.sort_by(order);
    Ok(Some(Value::list(items)))
}

/// copy(x) - one-level copy of a structure; other values unchanged
pub fn copy(args: &[Value]) -> OpResult {
    Ok(Some(match arg(args, 0) {
        Value::List(list) => Value::list(list.snapshot()),
        Value::Table(table) => {
            let fresh = Table::new(table.default_value());
            for (key, value) in table.entries() {
                fresh.insert(key, value);
            }
            Value::Table(fresh)
        }
        Value::Set(set) => Value::Set(Set::new(set.members())),
        Value::Record(record) => {
            let fields = record.field_names().into_iter().zip(record.values()).collect();
            Value::Record(Record::new(record.name(), fields))
        }
        other => other,
    }))
}

/// refresh(C) - new co-expression restarting the same call
pub fn refresh(args: &[Value]) -> OpResult {
    match arg(args, 0) {
        Value::CoExpr(coexpr) => Ok(Some(Value::CoExpr(coexpr.refresh()?))),
        other => Err(EngineError::type_mismatch("co-expression", &other)),
    }
}

/// x1 === x2 - identity; succeeds with the right operand
pub fn same(args: &[Value]) -> OpResult {
    let rhs = arg(args, 1);
    Ok(arg(args, 0).identical(&rhs).then_some(rhs))
}

pub fn not_same(args: &[Value]) -> OpResult {
    let rhs = arg(args, 1);
    Ok((!arg(args, 0).identical(&rhs)).then_some(rhs))
}
