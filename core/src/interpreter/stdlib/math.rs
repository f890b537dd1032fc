//! Arithmetic and numeric comparison

use super::{arg, OpResult};
use crate::interpreter::errors::EngineError;
use crate::interpreter::types::{Numeric, Value};

/// Apply an integer or real operation, promoting to real when either side is real
fn arith(
    name: &str,
    args: &[Value],
    int_op: fn(i64, i64) -> Option<i64>,
    real_op: fn(f64, f64) -> f64,
) -> OpResult {
    let (lhs, rhs) = (arg(args, 0).to_numeric()?, arg(args, 1).to_numeric()?);
    let result = match (lhs, rhs) {
        (Numeric::Int(a), Numeric::Int(b)) => Value::Integer(
            int_op(a, b).ok_or_else(|| EngineError::host(name, "integer overflow"))?,
        ),
        (a, b) => Value::Real(real_op(a.as_f64(), b.as_f64())),
    };
    Ok(Some(result))
}

fn nonzero(name: &str, args: &[Value]) -> Result<(), EngineError> {
    match arg(args, 1).to_numeric()? {
        Numeric::Int(0) => Err(EngineError::host(name, "division by zero")),
        Numeric::Real(r) if r == 0.0 => Err(EngineError::host(name, "division by zero")),
        _ => Ok(()),
    }
}

/// x + y
pub fn add(args: &[Value]) -> OpResult {
    arith("+", args, i64::checked_add, |a, b| a + b)
}

/// x - y
pub fn sub(args: &[Value]) -> OpResult {
    arith("-", args, i64::checked_sub, |a, b| a - b)
}

/// x * y
pub fn mul(args: &[Value]) -> OpResult {
    arith("*", args, i64::checked_mul, |a, b| a * b)
}

/// x / y - integer division truncates toward zero
pub fn div(args: &[Value]) -> OpResult {
    nonzero("/", args)?;
    arith("/", args, i64::checked_div, |a, b| a / b)
}

/// x % y - remainder with the sign of x
pub fn rem(args: &[Value]) -> OpResult {
    nonzero("%", args)?;
    arith("%", args, i64::checked_rem, |a, b| a % b)
}

/// x ^ y
pub fn pow(args: &[Value]) -> OpResult {
    match (arg(args, 0).to_numeric()?, arg(args, 1).to_numeric()?) {
        (Numeric::Int(base), Numeric::Int(exp)) if exp >= 0 => {
            let exp = u32::try_from(exp).map_err(|_| EngineError::host("^", "integer overflow"))?;
            base.checked_pow(exp)
                .map(|v| Some(Value::Integer(v)))
                .ok_or_else(|| EngineError::host("^", "integer overflow"))
        }
        (Numeric::Int(base), Numeric::Int(exp)) => match base {
            0 => Err(EngineError::host("^", "division by zero")),
            1 => Ok(Some(Value::Integer(1))),
            -1 => Ok(Some(Value::Integer(if exp % 2 == 0 { 1 } else { -1 }))),
            _ => Ok(Some(Value::Integer(0))),
        },
        (base, exp) => Ok(Some(Value::Real(base.as_f64().powf(exp.as_f64())))),
    }
}

/// -x
pub fn neg(args: &[Value]) -> OpResult {
    match arg(args, 0).to_numeric()? {
        Numeric::Int(i) => i
            .checked_neg()
            .map(|v| Some(Value::Integer(v)))
            .ok_or_else(|| EngineError::host("neg", "integer overflow")),
        Numeric::Real(r) => Ok(Some(Value::Real(-r))),
    }
}

pub fn abs(args: &[Value]) -> OpResult {
    match arg(args, 0).to_numeric()? {
        Numeric::Int(i) => i
            .checked_abs()
            .map(|v| Some(Value::Integer(v)))
            .ok_or_else(|| EngineError::host("abs", "integer overflow")),
        Numeric::Real(r) => Ok(Some(Value::Real(r.abs()))),
    }
}

fn extreme(args: &[Value], pick_later: fn(f64, f64) -> bool) -> OpResult {
    let mut best: Option<Numeric> = None;
    for value in args {
        let n = value.to_numeric()?;
        best = match best {
            Some(current) if !pick_later(current.as_f64(), n.as_f64()) => Some(current),
            _ => Some(n),
        };
    }
    Ok(best.map(Numeric::into_value))
}

/// max(x1, x2, ...) - largest argument; fails with no arguments
pub fn max(args: &[Value]) -> OpResult {
    extreme(args, |current, candidate| candidate > current)
}

/// min(x1, x2, ...) - smallest argument; fails with no arguments
pub fn min(args: &[Value]) -> OpResult {
    extreme(args, |current, candidate| candidate < current)
}

/* ===================== Comparison ===================== */

/// Numeric comparison; succeeds with the right operand
fn compare(args: &[Value], holds: fn(f64, f64) -> bool, int_holds: fn(i64, i64) -> bool) -> OpResult {
    let (lhs, rhs) = (arg(args, 0).to_numeric()?, arg(args, 1).to_numeric()?);
    let ok = match (lhs, rhs) {
        (Numeric::Int(a), Numeric::Int(b)) => int_holds(a, b),
        (a, b) => holds(a.as_f64(), b.as_f64()),
    };
    Ok(ok.then(|| rhs.into_value()))
}

pub fn lt(args: &[Value]) -> OpResult {
    compare(args, |a, b| a < b, |a, b| a < b)
}

pub fn le(args: &[Value]) -> OpResult {
    compare(args, |a, b| a <= b, |a, b| a <= b)
}

pub fn gt(args: &[Value]) -> OpResult {
    compare(args, |a, b| a > b, |a, b| a > b)
}

pub fn ge(args: &[Value]) -> OpResult {
    compare(args, |a, b| a >= b, |a, b| a >= b)
}

pub fn num_eq(args: &[Value]) -> OpResult {
    compare(args, |a, b| a == b, |a, b| a == b)
}

pub fn num_ne(args: &[Value]) -> OpResult {
    compare(args, |a, b| a != b, |a, b| a != b)
}
