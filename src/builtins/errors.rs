//! Error flow operations: throw, try, new-error-code, error-code, error-msg
//!
//! `throw` raises an error value; `try` is the only form that observes
//! the thrown state and can reset it. Catch clauses are tried in textual
//! order; a `finally` tail block runs exactly once on every exit path.

use super::unpack;
use crate::api::Cheax;
use crate::errors::{Error, ErrorCode, Result, EAPI, EMATCH, ENOMEM, ETYPE, EVALUE};
use crate::value::Value;

/// Raises an error.
///
/// # Examples
///
/// ```lisp
/// (throw EVALUE "bad input")
/// (throw (new-error-code "EMINE"))
/// ```
pub fn builtin_throw(cx: &mut Cheax, args: &[Value]) -> Result<Value> {
    let args = unpack(cx, "throw", args, "cs?")?;
    let code = args[0].as_int().expect("argument unpacked as an error code");
    if code == crate::errors::ENOERR {
        return Err(Error::new(EAPI, "throw: error code zero is reserved"));
    }
    if code == EAPI || code == ENOMEM {
        return Err(Error::new(
            EAPI,
            "throw: EAPI and ENOMEM are reserved for the host",
        ));
    }
    let msg = args.get(1).map(|m| {
        m.as_str()
            .expect("argument unpacked as a string")
            .to_string()
    });
    Err(Error { code, msg })
}

/// `(try body (catch codes form…)… (finally form…))`.
///
/// Evaluates the body; on a throw, the first catch clause whose codes
/// contain the thrown code runs and its last form is the result. An
/// uncaught error re-raises after the finally block, and a throw from
/// inside finally replaces the prior outcome.
pub fn builtin_try(cx: &mut Cheax, args: &[Value]) -> Result<Value> {
    if args.is_empty() {
        return Err(Error::new(EMATCH, "try: expected a body"));
    }
    let (catches, finally) = split_clauses(&args[1..])?;

    let mut outcome = cx.eval_inner(&args[0]);

    if let Err(error) = &outcome {
        // Reset to running; keep the error observable for error-code
        // and error-msg inside the catch body.
        let error = error.clone();
        cx.error = Some(error.clone());
        outcome = run_catches(cx, &error, &catches);
    }

    if let Some(forms) = finally {
        let mut finally_outcome = Ok(());
        for form in forms {
            if let Err(e) = cx.eval_inner(form) {
                finally_outcome = Err(e);
                break;
            }
        }
        finally_outcome?;
    }

    outcome
}

type CatchClause<'a> = (&'a Value, &'a [Value]);

fn split_clauses<'a>(
    clauses: &'a [Value],
) -> Result<(Vec<CatchClause<'a>>, Option<&'a [Value]>)> {
    let mut catches = Vec::new();
    let mut finally = None;
    for (i, clause) in clauses.iter().enumerate() {
        let malformed = || {
            Error::new(
                EVALUE,
                "try: expected (catch codes form...) or a final (finally form...)",
            )
        };
        let Some([head, rest @ ..]) = clause.list_items() else {
            return Err(malformed());
        };
        match head.as_id() {
            Some("catch") if finally.is_none() => {
                let [codes, body @ ..] = rest else {
                    return Err(malformed());
                };
                catches.push((codes, body));
            }
            Some("finally") if i == clauses.len() - 1 => finally = Some(rest),
            _ => return Err(malformed()),
        }
    }
    Ok((catches, finally))
}

fn run_catches(cx: &mut Cheax, error: &Error, catches: &[CatchClause]) -> Result<Value> {
    for &(codes_form, body) in catches {
        let codes = cx.eval_inner(codes_form)?;
        if !codes_contain(&codes, error.code)? {
            continue;
        }
        let mut result = Value::Nil;
        for form in body {
            result = cx.eval_inner(form)?;
        }
        return Ok(result);
    }
    // No clause matched; the original error stands.
    Err(error.clone())
}

/// A catch clause's codes expression yields a single error code or a
/// list of them.
fn codes_contain(codes: &Value, thrown: ErrorCode) -> Result<bool> {
    if let Some(code) = codes.as_int() {
        return Ok(code == thrown);
    }
    if let Some(items) = codes.list_items() {
        for item in items {
            let Some(code) = item.as_int() else {
                return Err(Error::new(ETYPE, "catch: expected error codes"));
            };
            if code == thrown {
                return Ok(true);
            }
        }
        return Ok(false);
    }
    Err(Error::new(ETYPE, "catch: expected an error code or a list"))
}

/// Allocates a user error code under the given name and binds the name
/// globally.
pub fn builtin_new_error_code(cx: &mut Cheax, args: &[Value]) -> Result<Value> {
    let args = unpack(cx, "new-error-code", args, "s")?;
    let name = args[0].as_str().expect("argument unpacked as a string");
    let name = name.to_string();
    let code = cx.new_error_code(&name)?;
    Ok(Value::ErrorCode(code))
}

/// Code of the current error, or nil when none is recorded.
pub fn builtin_error_code(cx: &mut Cheax, args: &[Value]) -> Result<Value> {
    if !args.is_empty() {
        return Err(Error::new(EMATCH, "error-code: expected no arguments"));
    }
    Ok(cx
        .error
        .as_ref()
        .map_or(Value::Nil, |e| Value::ErrorCode(e.code)))
}

/// Message of the current error, or nil.
pub fn builtin_error_msg(cx: &mut Cheax, args: &[Value]) -> Result<Value> {
    if !args.is_empty() {
        return Err(Error::new(EMATCH, "error-msg: expected no arguments"));
    }
    Ok(cx
        .error
        .as_ref()
        .and_then(|e| e.msg.as_deref())
        .map_or(Value::Nil, Value::string))
}

/// Register all error flow builtins in the global environment
pub fn register(cx: &mut Cheax) {
    cx.defmacro("throw", builtin_throw).expect("fresh environment");
    cx.defmacro("try", builtin_try).expect("fresh environment");
    cx.defmacro("new-error-code", builtin_new_error_code)
        .expect("fresh environment");
    cx.defmacro("error-code", builtin_error_code)
        .expect("fresh environment");
    cx.defmacro("error-msg", builtin_error_msg)
        .expect("fresh environment");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ErrState;
    use crate::errors::{EDIVZERO, EUSER0};

    fn eval(src: &str) -> Result<Value> {
        Cheax::new().eval_string(src)
    }

    #[test]
    fn test_throw_carries_code_and_message() {
        let err = eval("(throw EVALUE \"bad\")").unwrap_err();
        assert_eq!(err.code, EVALUE);
        assert_eq!(err.msg.as_deref(), Some("bad"));

        let err = eval("(throw EVALUE)").unwrap_err();
        assert_eq!(err.msg, None);
    }

    #[test]
    fn test_throw_reserved_codes() {
        assert_eq!(eval("(throw EAPI)").unwrap_err().code, EAPI);
        assert_eq!(eval("(throw ENOMEM)").unwrap_err().code, EAPI);
    }

    #[test]
    fn test_try_catches_matching_code() {
        assert_eq!(
            eval("(try (throw EVALUE \"bad\") (catch EVALUE 'caught))").unwrap(),
            Value::id("caught")
        );
    }

    #[test]
    fn test_try_catch_list_of_codes() {
        assert_eq!(
            eval("(try (/ 1 0) (catch (list EVALUE EDIVZERO) 'caught))").unwrap(),
            Value::id("caught")
        );
    }

    #[test]
    fn test_try_first_matching_catch_wins() {
        assert_eq!(
            eval("(try (throw EVALUE) (catch EDIVZERO 'first) (catch EVALUE 'second) (catch EVALUE 'third))")
                .unwrap(),
            Value::id("second")
        );
    }

    #[test]
    fn test_try_uncaught_error_reraises() {
        let err = eval("(try (/ 1 0) (catch EVALUE 'nope))").unwrap_err();
        assert_eq!(err.code, EDIVZERO);
    }

    #[test]
    fn test_try_body_value_passes_through() {
        assert_eq!(
            eval("(try (+ 1 2) (catch EVALUE 'nope))").unwrap(),
            Value::Int(3)
        );
    }

    #[test]
    fn test_error_code_inside_catch() {
        let mut cx = Cheax::new();
        let v = cx
            .eval_string("(try (throw EVALUE \"bad\") (catch EVALUE (error-code)))")
            .unwrap();
        assert_eq!(v, Value::ErrorCode(EVALUE));
        assert_eq!(cx.errstate(), ErrState::Running);

        let v = cx
            .eval_string("(try (throw EVALUE \"bad\") (catch EVALUE (error-msg)))")
            .unwrap();
        assert_eq!(v, Value::string("bad"));
    }

    #[test]
    fn test_finally_runs_on_every_path() {
        let mut cx = Cheax::new();
        cx.eval_string("(var n 0)").unwrap();

        cx.eval_string("(try 1 (finally (set n (+ n 1))))").unwrap();
        assert_eq!(cx.eval_string("n").unwrap(), Value::Int(1));

        cx.eval_string("(try (throw EVALUE) (catch EVALUE 'c) (finally (set n (+ n 1))))")
            .unwrap();
        assert_eq!(cx.eval_string("n").unwrap(), Value::Int(2));

        cx.eval_string("(try (throw EVALUE) (finally (set n (+ n 1))))")
            .unwrap_err();
        assert_eq!(cx.eval_string("n").unwrap(), Value::Int(3));
    }

    #[test]
    fn test_throw_from_finally_replaces_outcome() {
        let err = eval("(try 1 (finally (throw EVALUE \"from finally\")))").unwrap_err();
        assert_eq!(err.code, EVALUE);
    }

    #[test]
    fn test_throw_inside_catch_replaces_error() {
        let err = eval("(try (throw EVALUE) (catch EVALUE (throw EDIVZERO)))").unwrap_err();
        assert_eq!(err.code, EDIVZERO);
    }

    #[test]
    fn test_malformed_try_clause() {
        assert_eq!(eval("(try 1 (oops))").unwrap_err().code, EVALUE);
        assert_eq!(
            eval("(try 1 (finally 1) (catch EVALUE 2))").unwrap_err().code,
            EVALUE
        );
    }

    #[test]
    fn test_new_error_code_from_language() {
        let mut cx = Cheax::new();
        let v = cx.eval_string("(new-error-code \"EMINE\")").unwrap();
        assert_eq!(v, Value::ErrorCode(EUSER0));
        assert_eq!(
            cx.eval_string("(try (throw EMINE) (catch EMINE 'mine))").unwrap(),
            Value::id("mine")
        );
    }

    #[test]
    fn test_state_running_after_recovery() {
        let mut cx = Cheax::new();
        cx.eval_string("(try (+ 2147483647 1) (catch EOVERFLOW 'saved))")
            .unwrap();
        assert_eq!(cx.errstate(), ErrState::Running);
    }
}
