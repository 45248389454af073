//! Type registry operations: type-of, new-type, find-type, resolve-type, cast
//!
//! Type codes are plain integers at the language level. Codes at or
//! above the typestore bias are registered aliases; resolving follows
//! base links down to a basic type.

use super::unpack;
use crate::api::Cheax;
use crate::errors::{Error, Result, ETYPE};
use crate::typestore::{self, TypeCode};
use crate::value::{Num, Value};

/// Type code of a value.
///
/// # Examples
///
/// ```lisp
/// (type-of 1) => 2
/// (type-of (type-of 1)) => 2
/// ```
pub fn builtin_type_of(cx: &mut Cheax, args: &[Value]) -> Result<Value> {
    let args = unpack(cx, "type-of", args, ".")?;
    Ok(Value::Int(args[0].type_code()))
}

/// Registers a named alias of an existing type and returns its code.
pub fn builtin_new_type(cx: &mut Cheax, args: &[Value]) -> Result<Value> {
    let args = unpack(cx, "new-type", args, "si")?;
    let name = args[0]
        .as_str()
        .expect("argument unpacked as a string")
        .to_string();
    let base = args[1].as_int().expect("argument unpacked as an integer");
    let code = cx.new_type(&name, base)?;
    Ok(Value::Int(code))
}

/// Looks a type up by name; nil when unknown.
pub fn builtin_find_type(cx: &mut Cheax, args: &[Value]) -> Result<Value> {
    let args = unpack(cx, "find-type", args, "s")?;
    let name = args[0].as_str().expect("argument unpacked as a string");
    Ok(cx
        .find_type(name)
        .map_or(Value::Nil, Value::Int))
}

/// Follows base links down to the basic type.
pub fn builtin_resolve_type(cx: &mut Cheax, args: &[Value]) -> Result<Value> {
    let args = unpack(cx, "resolve-type", args, "i")?;
    let code = args[0].as_int().expect("argument unpacked as an integer");
    Ok(Value::Int(cx.typestore.resolve(code)?))
}

/// Casts a value to a type code: identity casts retag within the same
/// resolved basic type, and numbers cross-cast between int and double.
pub fn builtin_cast(cx: &mut Cheax, args: &[Value]) -> Result<Value> {
    let args = unpack(cx, "cast", args, ".i")?;
    let target = args[1].as_int().expect("argument unpacked as an integer");
    cast_value(cx, &args[0], target)
}

pub(crate) fn cast_value(cx: &mut Cheax, value: &Value, target: TypeCode) -> Result<Value> {
    let from = cx.typestore.resolve(value.type_code())?;
    let to = cx.typestore.resolve(target)?;

    if from == to {
        // Identity cast: retag the basic carrier.
        let carrier = match value.untagged() {
            Value::ErrorCode(code) => Value::Int(*code),
            other => other.clone(),
        };
        if target == to {
            return Ok(carrier);
        }
        if target == typestore::ERRORCODE {
            let code = carrier.as_int().expect("error codes carry integers");
            return Ok(Value::ErrorCode(code));
        }
        if let Value::UserPtr(p) = &carrier {
            return Ok(Value::UserPtr(p.retype(target)));
        }
        return Ok(Value::Tagged {
            ty: target,
            inner: Box::new(carrier),
        });
    }

    // Numeric cross-casts.
    match (value.as_num(), to) {
        (Some(n), typestore::DOUBLE) => cast_value(cx, &Value::Double(n.as_f64()), target),
        (Some(Num::Double(d)), typestore::INT) => cast_value(cx, &Value::Int(d as i32), target),
        _ => Err(Error::new(
            ETYPE,
            format!("cast: cannot cast {} to type {}", value.type_name(), target),
        )),
    }
}

/// Register all type builtins in the global environment
pub fn register(cx: &mut Cheax) {
    cx.defmacro("type-of", builtin_type_of).expect("fresh environment");
    cx.defmacro("new-type", builtin_new_type).expect("fresh environment");
    cx.defmacro("find-type", builtin_find_type).expect("fresh environment");
    cx.defmacro("resolve-type", builtin_resolve_type)
        .expect("fresh environment");
    cx.defmacro("cast", builtin_cast).expect("fresh environment");
}
