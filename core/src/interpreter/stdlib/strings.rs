//! String operations and conversions

use super::{arg, OpResult};
use crate::interpreter::errors::EngineError;
use crate::interpreter::types::{Numeric, Value};

/// Lexical comparison; succeeds with the right operand
fn lexical(args: &[Value], holds: fn(&str, &str) -> bool) -> OpResult {
    let (lhs, rhs) = (arg(args, 0).to_text()?, arg(args, 1).to_text()?);
    Ok(holds(&lhs, &rhs).then(|| Value::Str(rhs)))
}

pub fn str_eq(args: &[Value]) -> OpResult {
    lexical(args, |a, b| a == b)
}

pub fn str_ne(args: &[Value]) -> OpResult {
    lexical(args, |a, b| a != b)
}

pub fn str_lt(args: &[Value]) -> OpResult {
    lexical(args, |a, b| a < b)
}

pub fn str_gt(args: &[Value]) -> OpResult {
    lexical(args, |a, b| a > b)
}

/// s1 || s2
pub fn concat(args: &[Value]) -> OpResult {
    let mut out = String::new();
    for value in args {
        out.push_str(&value.to_text()?);
    }
    Ok(Some(Value::str(out)))
}

/// string(x) - fails when x has no string form
pub fn string(args: &[Value]) -> OpResult {
    Ok(arg(args, 0).to_text().ok().map(Value::Str))
}

/// integer(x) - fails when x is not numeric; reals truncate
pub fn integer(args: &[Value]) -> OpResult {
    Ok(match arg(args, 0).to_numeric() {
        Ok(Numeric::Int(i)) => Some(Value::Integer(i)),
        Ok(Numeric::Real(r)) if r.is_finite() && r.abs() < i64::MAX as f64 => {
            Some(Value::Integer(r.trunc() as i64))
        }
        _ => None,
    })
}

/// real(x) - fails when x is not numeric
pub fn real(args: &[Value]) -> OpResult {
    Ok(arg(args, 0)
        .to_numeric()
        .ok()
        .map(|n| Value::Real(n.as_f64())))
}

pub fn type_of(args: &[Value]) -> OpResult {
    let value = arg(args, 0);
    let name = match &value {
        Value::Record(record) => record.name().to_string(),
        other => other.type_name().to_string(),
    };
    Ok(Some(Value::str(name)))
}

pub fn image(args: &[Value]) -> OpResult {
    Ok(Some(Value::str(arg(args, 0).image())))
}

/// repl(s, n) - s repeated n times
pub fn repl(args: &[Value]) -> OpResult {
    let text = arg(args, 0).to_text()?;
    let count = arg(args, 1).to_integer()?;
    let count = usize::try_from(count)
        .map_err(|_| EngineError::type_mismatch("non-negative integer", &Value::Integer(count)))?;
    if text.is_empty() {
        return Ok(Some(Value::str("")));
    }
    let total = text
        .len()
        .checked_mul(count)
        .ok_or_else(|| EngineError::host("repl", "result too long"))?;
    let mut out = String::new();
    out.try_reserve_exact(total)
        .map_err(|e| EngineError::host("repl", format!("cannot allocate {} bytes: {}", total, e)))?;
    for _ in 0..count {
        out.push_str(&text);
    }
    Ok(Some(Value::str(out)))
}

pub fn reverse(args: &[Value]) -> OpResult {
    match arg(args, 0) {
        Value::List(list) => {
            let mut items = list.snapshot();
            items.reverse();
            Ok(Some(Value::list(items)))
        }
        other => {
            let text: String = other.to_text()?.chars().rev().collect();
            Ok(Some(Value::str(text)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concat_converts_numbers() {
        assert_eq!(
            concat(&["a".into(), 1.into(), 2.5.into()]).unwrap(),
            Some(Value::from("a12.5"))
        );
    }

    #[test]
    fn test_conversions_fail_instead_of_erroring() {
        assert_eq!(integer(&["12".into()]).unwrap(), Some(Value::Integer(12)));
        assert_eq!(integer(&[3.7.into()]).unwrap(), Some(Value::Integer(3)));
        assert_eq!(integer(&["twelve".into()]).unwrap(), None);
        assert_eq!(string(&[Value::list(vec![])]).unwrap(), None);
    }

    #[test]
    fn test_lexical_comparison() {
        assert_eq!(str_lt(&["abc".into(), "abd".into()]).unwrap(), Some(Value::from("abd")));
        assert_eq!(str_eq(&[1.into(), "1".into()]).unwrap(), Some(Value::from("1")));
        assert_eq!(str_ne(&["x".into(), "x".into()]).unwrap(), None);
    }

    #[test]
    fn test_repl_and_reverse() {
        assert_eq!(repl(&["ab".into(), 3.into()]).unwrap(), Some(Value::from("ababab")));
        assert_eq!(reverse(&["abc".into()]).unwrap(), Some(Value::from("cba")));
        assert!(repl(&["ab".into(), (-1).into()]).is_err());
        assert_eq!(repl(&["".into(), i64::MAX.into()]).unwrap(), Some(Value::from("")));
        assert!(matches!(
            repl(&["ab".into(), i64::MAX.into()]),
            Err(EngineError::Host { .. })
        ));
    }
}
