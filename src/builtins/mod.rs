//! # Built-in Functions Module
//!
//! The builtin surface of the interpreter, organized into categories.
//! Every form is a bindable external function registered in the global
//! environment at startup; the evaluator itself only knows atoms,
//! quotes and application.
//!
//! ## Categories
//!
//! - **[arithmetic]** (5): +, -, *, /, % - Checked 32-bit and IEEE math
//! - **[comparison]** (6): =, !=, <, >, <=, >= - Structural and numeric comparisons
//! - **[lists]** (4): :, head, tail, list - List construction and access
//! - **[variables]** (5): var, const, set, let, env - Bindings and scopes
//! - **[functions]** (5): \, \\, case, eval, match - Abstraction and case analysis
//! - **[errors]** (5): throw, try, new-error-code, error-code, error-msg - Error flow
//! - **[types]** (5): type-of, new-type, find-type, resolve-type, cast - Type registry
//! - **[console]** (feature-gated): print, println, print-err, println-err, exit,
//!   set-max-stack-depth
//!
//! Each category is a sub-module with its own register function. The
//! console group is only bound when the host enables the matching
//! feature.

use crate::api::Cheax;
use crate::errors::{Error, Result, EMATCH, ETYPE};
use crate::value::Value;

pub mod arithmetic;
pub mod comparison;
pub mod console;
pub mod errors;
pub mod functions;
pub mod lists;
pub mod types;
pub mod variables;

/// Register the always-on builtin categories in the global environment
pub fn register_builtins(cx: &mut Cheax) {
    arithmetic::register(cx);
    comparison::register(cx);
    lists::register(cx);
    variables::register(cx);
    functions::register(cx);
    errors::register(cx);
    types::register(cx);
}

// ============================================================================
// Shared argument unpacker
// ============================================================================

/// Evaluates and type-checks the argument forms of a builtin call
/// against a format string.
///
/// Format characters:
/// - `i` - integer (an error code counts through its integer carrier)
/// - `d` - number (integer or double)
/// - `s` - string
/// - `c` - error code
/// - `.` - any value
///
/// A spec followed by `?` is optional; a spec followed by `*` consumes
/// every remaining argument. Arity mismatches raise `EMATCH`, type
/// mismatches `ETYPE`. The returned values are owned by the caller for
/// the duration of the call.
pub(crate) fn unpack(cx: &mut Cheax, name: &str, args: &[Value], fmt: &str) -> Result<Vec<Value>> {
    let mut out = Vec::with_capacity(args.len());
    let mut next = 0;
    let mut specs = fmt.chars().peekable();

    while let Some(spec) = specs.next() {
        let modifier = match specs.peek() {
            Some('?') | Some('*') => specs.next(),
            _ => None,
        };
        match modifier {
            Some('*') => {
                while next < args.len() {
                    let value = cx.eval_inner(&args[next])?;
                    next += 1;
                    check(name, spec, next, &value)?;
                    out.push(value);
                }
            }
            Some('?') => {
                if next < args.len() {
                    let value = cx.eval_inner(&args[next])?;
                    next += 1;
                    check(name, spec, next, &value)?;
                    out.push(value);
                }
            }
            _ => {
                if next >= args.len() {
                    return Err(Error::new(
                        EMATCH,
                        format!("{}: too few arguments, got {}", name, args.len()),
                    ));
                }
                let value = cx.eval_inner(&args[next])?;
                next += 1;
                check(name, spec, next, &value)?;
                out.push(value);
            }
        }
    }

    if next < args.len() {
        return Err(Error::new(
            EMATCH,
            format!("{}: too many arguments, got {}", name, args.len()),
        ));
    }
    Ok(out)
}

fn check(name: &str, spec: char, position: usize, value: &Value) -> Result<()> {
    let expected = match spec {
        'i' => {
            if value.as_int().is_some() {
                return Ok(());
            }
            "an integer"
        }
        'd' => {
            if value.as_num().is_some() {
                return Ok(());
            }
            "a number"
        }
        's' => {
            if value.as_str().is_some() {
                return Ok(());
            }
            "a string"
        }
        'c' => {
            if value.as_int().is_some() {
                return Ok(());
            }
            "an error code"
        }
        '.' => return Ok(()),
        other => unreachable!("unknown argument spec {:?}", other),
    };
    Err(Error::new(
        ETYPE,
        format!(
            "{}: expected {}, got {} at argument {}",
            name,
            expected,
            value.type_name(),
            position
        ),
    ))
}
