//! Comparison operations: =, !=, <, >, <=, >=
//!
//! `=` and `!=` are structural over any two values; the ordering
//! operators are numeric with int/double promotion. All return integer 1
//! or 0, there being no separate boolean type.

use super::unpack;
use crate::api::Cheax;
use crate::errors::Result;
use crate::value::Value;
use std::cmp::Ordering;

fn truth(b: bool) -> Value {
    Value::Int(b as i32)
}

/// Structural equality.
///
/// # Examples
///
/// ```lisp
/// (= '(1 2) '(1 2)) => 1
/// (= 1 1.0) => 0
/// ```
pub fn builtin_eq(cx: &mut Cheax, args: &[Value]) -> Result<Value> {
    let args = unpack(cx, "=", args, "..")?;
    Ok(truth(args[0] == args[1]))
}

pub fn builtin_ne(cx: &mut Cheax, args: &[Value]) -> Result<Value> {
    let args = unpack(cx, "!=", args, "..")?;
    Ok(truth(args[0] != args[1]))
}

fn ordering(name: &str, cx: &mut Cheax, args: &[Value]) -> Result<Option<Ordering>> {
    let args = unpack(cx, name, args, "dd")?;
    let a = args[0].as_num().expect("argument unpacked as a number");
    let b = args[1].as_num().expect("argument unpacked as a number");
    match (a, b) {
        (crate::value::Num::Int(x), crate::value::Num::Int(y)) => Ok(Some(x.cmp(&y))),
        (x, y) => Ok(x.as_f64().partial_cmp(&y.as_f64())),
    }
}

pub fn builtin_lt(cx: &mut Cheax, args: &[Value]) -> Result<Value> {
    Ok(truth(ordering("<", cx, args)? == Some(Ordering::Less)))
}

pub fn builtin_gt(cx: &mut Cheax, args: &[Value]) -> Result<Value> {
    Ok(truth(ordering(">", cx, args)? == Some(Ordering::Greater)))
}

pub fn builtin_le(cx: &mut Cheax, args: &[Value]) -> Result<Value> {
    Ok(truth(matches!(
        ordering("<=", cx, args)?,
        Some(Ordering::Less | Ordering::Equal)
    )))
}

pub fn builtin_ge(cx: &mut Cheax, args: &[Value]) -> Result<Value> {
    Ok(truth(matches!(
        ordering(">=", cx, args)?,
        Some(Ordering::Greater | Ordering::Equal)
    )))
}

/// Register all comparison builtins in the global environment
pub fn register(cx: &mut Cheax) {
    cx.defmacro("=", builtin_eq).expect("fresh environment");
    cx.defmacro("!=", builtin_ne).expect("fresh environment");
    cx.defmacro("<", builtin_lt).expect("fresh environment");
    cx.defmacro(">", builtin_gt).expect("fresh environment");
    cx.defmacro("<=", builtin_le).expect("fresh environment");
    cx.defmacro(">=", builtin_ge).expect("fresh environment");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ETYPE;

    fn eval(src: &str) -> Result<Value> {
        Cheax::new().eval_string(src)
    }

    #[test]
    fn test_structural_equality() {
        assert_eq!(eval("(= 1 1)").unwrap(), Value::Int(1));
        assert_eq!(eval("(= 1 2)").unwrap(), Value::Int(0));
        assert_eq!(eval("(= '(1 2) '(1 2))").unwrap(), Value::Int(1));
        assert_eq!(eval("(= \"a\" \"a\")").unwrap(), Value::Int(1));
        // Different resolved basic types are never equal.
        assert_eq!(eval("(= 1 1.0)").unwrap(), Value::Int(0));
        assert_eq!(eval("(!= 1 2)").unwrap(), Value::Int(1));
    }

    #[test]
    fn test_numeric_ordering() {
        assert_eq!(eval("(< 1 2)").unwrap(), Value::Int(1));
        assert_eq!(eval("(> 1 2)").unwrap(), Value::Int(0));
        assert_eq!(eval("(<= 2 2)").unwrap(), Value::Int(1));
        assert_eq!(eval("(>= 1 2)").unwrap(), Value::Int(0));
        assert_eq!(eval("(< 1 1.5)").unwrap(), Value::Int(1));
    }

    #[test]
    fn test_nan_is_unordered() {
        assert_eq!(eval("(< 0.0 (/ 0.0 0.0))").unwrap(), Value::Int(0));
        assert_eq!(eval("(>= 0.0 (/ 0.0 0.0))").unwrap(), Value::Int(0));
    }

    #[test]
    fn test_ordering_requires_numbers() {
        assert_eq!(eval("(< \"a\" \"b\")").unwrap_err().code, ETYPE);
    }
}
