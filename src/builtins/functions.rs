//! Function operations: \, \\, case, eval, match
//!
//! `\` builds a function closing over the current frame; `\\` builds a
//! macro whose expansion is re-evaluated in the caller's frame. `case`
//! is the branching construct: clauses are tried top to bottom and the
//! first pattern that matches wins.

use super::unpack;
use crate::api::Cheax;
use crate::env::BindingFlags;
use crate::errors::{Error, Result, EMATCH, EVALUE};
use crate::matcher::match_pattern;
use crate::value::{Lambda, Value};
use std::rc::Rc;

fn lambda(cx: &mut Cheax, name: &str, args: &[Value], eval_args: bool) -> Result<Value> {
    if args.is_empty() {
        return Err(Error::new(
            EMATCH,
            format!("{}: expected a parameter pattern", name),
        ));
    }
    Ok(Value::Func(Rc::new(Lambda {
        params: args[0].clone(),
        body: args[1..].to_vec(),
        env: Rc::clone(&cx.env),
        eval_args,
    })))
}

/// Builds a function: `(\ params body…)`. Arguments are evaluated in
/// the caller's frame before being bound.
pub fn builtin_fn(cx: &mut Cheax, args: &[Value]) -> Result<Value> {
    lambda(cx, "\\", args, true)
}

/// Builds a macro: `(\\ params body…)`. Argument forms are bound
/// unevaluated and the body's value is evaluated in the caller's frame.
pub fn builtin_macro(cx: &mut Cheax, args: &[Value]) -> Result<Value> {
    lambda(cx, "\\\\", args, false)
}

/// Pattern-directed case analysis.
///
/// # Examples
///
/// ```lisp
/// (case 3
///   (1 'one)
///   (2 'two)
///   (x (: 'other (: x ()))))
/// => (other 3)
/// ```
pub fn builtin_case(cx: &mut Cheax, args: &[Value]) -> Result<Value> {
    if args.is_empty() {
        return Err(Error::new(EMATCH, "case: expected a subject"));
    }
    let subject = cx.eval_inner(&args[0])?;
    for clause in &args[1..] {
        let Some([pattern, body @ ..]) = clause.list_items() else {
            return Err(Error::new(EVALUE, "case: clause must be (pattern form...)"));
        };
        cx.push_env();
        let result = run_clause(cx, pattern, body, &subject);
        cx.pop_env().expect("frame pushed above");
        if let Some(result) = result? {
            return Ok(result);
        }
    }
    Err(Error::new(
        EMATCH,
        format!("case: no clause matches {}", subject),
    ))
}

fn run_clause(
    cx: &mut Cheax,
    pattern: &Value,
    body: &[Value],
    subject: &Value,
) -> Result<Option<Value>> {
    if !match_pattern(&cx.env, pattern, subject, BindingFlags::empty())? {
        return Ok(None);
    }
    let mut result = Value::Nil;
    for form in body {
        result = cx.eval_inner(form)?;
    }
    Ok(Some(result))
}

/// Evaluates a value as a form: the argument is evaluated once like any
/// argument, and the resulting form once more.
pub fn builtin_eval(cx: &mut Cheax, args: &[Value]) -> Result<Value> {
    let args = unpack(cx, "eval", args, ".")?;
    cx.eval_inner(&args[0])
}

/// Binds a pattern in the current frame; unlike `var`, a mismatch does
/// not define anything but still evaluates the subject.
pub fn builtin_match(cx: &mut Cheax, args: &[Value]) -> Result<Value> {
    if args.len() != 2 {
        return Err(Error::new(EMATCH, "match: expected a pattern and a value"));
    }
    let value = cx.eval_inner(&args[1])?;
    if !match_pattern(&cx.env, &args[0], &value, BindingFlags::empty())? {
        return Err(Error::new(
            EMATCH,
            format!("match: value {} does not match pattern {}", value, args[0]),
        ));
    }
    Ok(value)
}

/// Register all function builtins in the global environment
pub fn register(cx: &mut Cheax) {
    cx.defmacro("\\", builtin_fn).expect("fresh environment");
    cx.defmacro("\\\\", builtin_macro).expect("fresh environment");
    cx.defmacro("case", builtin_case).expect("fresh environment");
    cx.defmacro("eval", builtin_eval).expect("fresh environment");
    cx.defmacro("match", builtin_match).expect("fresh environment");
}
