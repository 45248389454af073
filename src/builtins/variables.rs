//! Variable operations: var, const, set, let, env
//!
//! Definition is pattern-directed: `var` and `const` run the matcher
//! against the evaluated value, so destructuring definitions come for
//! free. `set` assigns through the environment chain and respects
//! read-only and synced bindings. `let` evaluates its body in a fresh
//! frame that is gone afterwards.

use crate::api::Cheax;
use crate::env::BindingFlags;
use crate::errors::{Error, Result, EMATCH, ETYPE, EVALUE};
use crate::matcher::match_pattern;
use crate::value::Value;

fn define(cx: &mut Cheax, name: &str, args: &[Value], flags: BindingFlags) -> Result<Value> {
    if args.is_empty() || args.len() > 2 {
        return Err(Error::new(
            EMATCH,
            format!("{}: expected a pattern and an optional value", name),
        ));
    }
    let value = match args.get(1) {
        Some(form) => cx.eval_inner(form)?,
        None => Value::Nil,
    };
    if !match_pattern(&cx.env, &args[0], &value, flags)? {
        return Err(Error::new(
            EMATCH,
            format!("{}: value {} does not match pattern {}", name, value, args[0]),
        ));
    }
    Ok(value)
}

/// Defines bindings in the current frame by matching a pattern against
/// the evaluated value.
///
/// # Examples
///
/// ```lisp
/// (var x 42)
/// (var (: h t) '(1 2 3))
/// ```
pub fn builtin_var(cx: &mut Cheax, args: &[Value]) -> Result<Value> {
    define(cx, "var", args, BindingFlags::empty())
}

/// Like `var`, but the bindings are read-only.
pub fn builtin_const(cx: &mut Cheax, args: &[Value]) -> Result<Value> {
    define(cx, "const", args, BindingFlags::READONLY)
}

/// Assigns to an existing binding found along the lookup chain.
pub fn builtin_set(cx: &mut Cheax, args: &[Value]) -> Result<Value> {
    if args.len() != 2 {
        return Err(Error::new(EMATCH, "set: expected a symbol and a value"));
    }
    let Some(name) = args[0].as_id() else {
        return Err(Error::new(
            ETYPE,
            format!("set: expected a symbol, got {}", args[0].type_name()),
        ));
    };
    let name = name.to_string();
    let value = cx.eval_inner(&args[1])?;
    cx.env.assign(&name, value.clone())?;
    Ok(value)
}

/// Evaluates a body under local bindings in a fresh frame.
///
/// ```lisp
/// (let ((x 1) (y 2)) (+ x y)) => 3
/// ```
pub fn builtin_let(cx: &mut Cheax, args: &[Value]) -> Result<Value> {
    if args.is_empty() {
        return Err(Error::new(EMATCH, "let: expected bindings and a body"));
    }
    cx.push_env();
    let result = let_body(cx, args);
    cx.pop_env().expect("frame pushed above");
    result
}

fn let_body(cx: &mut Cheax, args: &[Value]) -> Result<Value> {
    let Some(bindings) = args[0].list_items() else {
        return Err(Error::new(ETYPE, "let: bindings must be a list"));
    };
    let bindings = bindings.to_vec();
    for binding in &bindings {
        let pair = binding.list_items().unwrap_or(&[]);
        let [pattern, form] = pair else {
            return Err(Error::new(EVALUE, "let: binding must be (pattern value)"));
        };
        let value = cx.eval_inner(form)?;
        if !match_pattern(&cx.env, pattern, &value, BindingFlags::empty())? {
            return Err(Error::new(
                EMATCH,
                format!("let: value {} does not match pattern {}", value, pattern),
            ));
        }
    }
    let mut result = Value::Nil;
    for form in &args[1..] {
        result = cx.eval_inner(form)?;
    }
    Ok(result)
}

/// The current environment frame as a first-class value.
pub fn builtin_env(cx: &mut Cheax, args: &[Value]) -> Result<Value> {
    if !args.is_empty() {
        return Err(Error::new(EMATCH, "env: expected no arguments"));
    }
    Ok(Value::Env(cx.env.clone()))
}

/// Register all variable builtins in the global environment
pub fn register(cx: &mut Cheax) {
    cx.defmacro("var", builtin_var).expect("fresh environment");
    cx.defmacro("const", builtin_const).expect("fresh environment");
    cx.defmacro("set", builtin_set).expect("fresh environment");
    cx.defmacro("let", builtin_let).expect("fresh environment");
    cx.defmacro("env", builtin_env).expect("fresh environment");
}
