//! List operations: :, head, tail, list
//!
//! Proper lists only; the empty list is nil. Taking the head or tail of
//! nil raises `ENIL`.

use super::unpack;
use crate::api::Cheax;
use crate::errors::{Error, Result, ENIL, ETYPE};
use crate::value::Value;

/// Prepends a value to a list.
///
/// # Examples
///
/// ```lisp
/// (: 1 ()) => (1)
/// (: 1 (: 2 ())) => (1 2)
/// ```
pub fn builtin_prepend(cx: &mut Cheax, args: &[Value]) -> Result<Value> {
    let args = unpack(cx, ":", args, "..")?;
    let Some(tail) = args[1].list_items() else {
        return Err(Error::new(
            ETYPE,
            format!(":: expected a list tail, got {}", args[1].type_name()),
        ));
    };
    let mut items = Vec::with_capacity(tail.len() + 1);
    items.push(args[0].clone());
    items.extend_from_slice(tail);
    Ok(Value::List(items))
}

/// First element of a non-empty list.
pub fn builtin_head(cx: &mut Cheax, args: &[Value]) -> Result<Value> {
    let args = unpack(cx, "head", args, ".")?;
    match args[0].list_items() {
        Some([]) => Err(Error::new(ENIL, "head: empty list")),
        Some(items) => Ok(items[0].clone()),
        None => Err(Error::new(
            ETYPE,
            format!("head: expected a list, got {}", args[0].type_name()),
        )),
    }
}

/// Everything after the first element; the tail of a one-element list
/// is nil.
pub fn builtin_tail(cx: &mut Cheax, args: &[Value]) -> Result<Value> {
    let args = unpack(cx, "tail", args, ".")?;
    match args[0].list_items() {
        Some([]) => Err(Error::new(ENIL, "tail: empty list")),
        Some(items) => Ok(Value::list(items[1..].to_vec())),
        None => Err(Error::new(
            ETYPE,
            format!("tail: expected a list, got {}", args[0].type_name()),
        )),
    }
}

/// Builds a list of its evaluated arguments.
pub fn builtin_list(cx: &mut Cheax, args: &[Value]) -> Result<Value> {
    let args = unpack(cx, "list", args, ".*")?;
    Ok(Value::list(args))
}

/// Register all list builtins in the global environment
pub fn register(cx: &mut Cheax) {
    cx.defmacro(":", builtin_prepend).expect("fresh environment");
    cx.defmacro("head", builtin_head).expect("fresh environment");
    cx.defmacro("tail", builtin_tail).expect("fresh environment");
    cx.defmacro("list", builtin_list).expect("fresh environment");
}
