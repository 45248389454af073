// ABOUTME: Pattern matcher binding identifiers against subject values

use crate::env::{BindingFlags, Environment};
use crate::errors::Result;
use crate::value::Value;
use std::rc::Rc;

/// Unifies `pattern` against `subject`, binding identifiers into the top
/// frame `env` with the caller's `flags`. Returns whether the match
/// succeeded; a failed attempt leaves no new bindings behind.
///
/// A mismatch is not an error. Callers (`var`, `case`, function
/// application) decide whether to raise `EMATCH`.
pub fn match_pattern(
    env: &Rc<Environment>,
    pattern: &Value,
    subject: &Value,
    flags: BindingFlags,
) -> Result<bool> {
    let mut added = Vec::new();
    let outcome = try_match(env, pattern, subject, flags, &mut added);
    if !matches!(outcome, Ok(true)) {
        // Rewind this attempt's additions.
        for name in added {
            env.remove(&name);
        }
    }
    outcome
}

fn try_match(
    env: &Rc<Environment>,
    pattern: &Value,
    subject: &Value,
    flags: BindingFlags,
    added: &mut Vec<Rc<str>>,
) -> Result<bool> {
    match pattern {
        // `_` matches anything without binding.
        Value::Id(name) if &**name == "_" => Ok(true),

        Value::Id(name) => {
            env.define(name, subject.clone(), flags)?;
            added.push(Rc::clone(name));
            Ok(true)
        }

        Value::Nil | Value::Int(_) | Value::Double(_) | Value::Str(_) | Value::ErrorCode(_) => {
            Ok(pattern == subject)
        }

        Value::Quote(inner) => match subject {
            Value::Quote(subject_inner) => try_match(env, inner, subject_inner, flags, added),
            _ => Ok(false),
        },

        Value::List(items) => {
            // The prepend operator in pattern position destructures any
            // non-empty list into head and remaining tail.
            if let [Value::Id(op), head_pat, tail_pat] = items.as_slice() {
                if &**op == ":" {
                    let Value::List(subject_items) = subject else {
                        return Ok(false);
                    };
                    if !try_match(env, head_pat, &subject_items[0], flags, added)? {
                        return Ok(false);
                    }
                    let tail = Value::list(subject_items[1..].to_vec());
                    return try_match(env, tail_pat, &tail, flags, added);
                }
            }

            // Plain list pattern: proper list of the same length,
            // element-wise.
            let Value::List(subject_items) = subject else {
                return Ok(false);
            };
            if subject_items.len() != items.len() {
                return Ok(false);
            }
            for (pat, sub) in items.iter().zip(subject_items.iter()) {
                if !try_match(env, pat, sub, flags, added)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }

        // Functions, environments, user pointers and the like do not
        // occur in patterns.
        _ => Ok(false),
    }
}
