//! Arithmetic operations: +, -, *, /, %
//!
//! Binary numeric operations over 32-bit signed integers and IEEE-754
//! doubles. Integer arithmetic is checked and raises `EOVERFLOW` on
//! wraparound; mixing an integer with a double promotes to double;
//! remainder is defined on integers only.

use super::unpack;
use crate::api::Cheax;
use crate::errors::{Error, Result, EDIVZERO, EOVERFLOW, ETYPE};
use crate::value::{Num, Value};

fn binop(
    name: &str,
    a: &Value,
    b: &Value,
    int_op: fn(i32, i32) -> Option<i32>,
    double_op: fn(f64, f64) -> f64,
) -> Result<Value> {
    let (a, b) = (numeric(a), numeric(b));
    match (a, b) {
        (Num::Int(x), Num::Int(y)) => int_op(x, y)
            .map(Value::Int)
            .ok_or_else(|| Error::new(EOVERFLOW, format!("{}: integer overflow", name))),
        (x, y) => Ok(Value::Double(double_op(x.as_f64(), y.as_f64()))),
    }
}

fn numeric(v: &Value) -> Num {
    // unpack has already type-checked with 'd'
    v.as_num().expect("argument unpacked as a number")
}

/// Adds two numbers.
///
/// # Examples
///
/// ```lisp
/// (+ 1 2) => 3
/// (+ 1 2.0) => 3.0
/// ```
pub fn builtin_add(cx: &mut Cheax, args: &[Value]) -> Result<Value> {
    let args = unpack(cx, "+", args, "dd")?;
    binop("+", &args[0], &args[1], i32::checked_add, |a, b| a + b)
}

/// Subtracts the second number from the first; with one argument,
/// negates it.
pub fn builtin_sub(cx: &mut Cheax, args: &[Value]) -> Result<Value> {
    let args = unpack(cx, "-", args, "dd?")?;
    if args.len() == 1 {
        return match numeric(&args[0]) {
            Num::Int(i) => i
                .checked_neg()
                .map(Value::Int)
                .ok_or_else(|| Error::new(EOVERFLOW, "-: integer overflow")),
            Num::Double(d) => Ok(Value::Double(-d)),
        };
    }
    binop("-", &args[0], &args[1], i32::checked_sub, |a, b| a - b)
}

/// Multiplies two numbers.
pub fn builtin_mul(cx: &mut Cheax, args: &[Value]) -> Result<Value> {
    let args = unpack(cx, "*", args, "dd")?;
    binop("*", &args[0], &args[1], i32::checked_mul, |a, b| a * b)
}

/// Divides the first number by the second.
///
/// Integer division truncates; dividing an integer by integer zero
/// raises `EDIVZERO`. Double division is IEEE and never signals.
pub fn builtin_div(cx: &mut Cheax, args: &[Value]) -> Result<Value> {
    let args = unpack(cx, "/", args, "dd")?;
    if let (Num::Int(_), Num::Int(0)) = (numeric(&args[0]), numeric(&args[1])) {
        return Err(Error::new(EDIVZERO, "/: division by zero"));
    }
    binop("/", &args[0], &args[1], i32::checked_div, |a, b| a / b)
}

/// Remainder of integer division.
///
/// # Examples
///
/// ```lisp
/// (% 17 5) => 2
/// (% 10 3) => 1
/// ```
pub fn builtin_mod(cx: &mut Cheax, args: &[Value]) -> Result<Value> {
    let args = unpack(cx, "%", args, "dd")?;
    let (a, b) = match (numeric(&args[0]), numeric(&args[1])) {
        (Num::Int(a), Num::Int(b)) => (a, b),
        _ => {
            return Err(Error::new(ETYPE, "%: defined on integers only"));
        }
    };
    if b == 0 {
        return Err(Error::new(EDIVZERO, "%: division by zero"));
    }
    a.checked_rem(b)
        .map(Value::Int)
        .ok_or_else(|| Error::new(EOVERFLOW, "%: integer overflow"))
}

/// Register all arithmetic builtins in the global environment
pub fn register(cx: &mut Cheax) {
    cx.defmacro("+", builtin_add).expect("fresh environment");
    cx.defmacro("-", builtin_sub).expect("fresh environment");
    cx.defmacro("*", builtin_mul).expect("fresh environment");
    cx.defmacro("/", builtin_div).expect("fresh environment");
    cx.defmacro("%", builtin_mod).expect("fresh environment");
}
