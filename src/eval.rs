// ABOUTME: Evaluator executing forms against the environment stack

use crate::api::Cheax;
use crate::env::{BindingFlags, Environment};
use crate::errors::{Error, Result, EEVAL, EMATCH, ESTACK, ETYPE};
use crate::matcher::match_pattern;
use crate::value::{Lambda, Value};
use std::rc::Rc;

impl Cheax {
    /// Evaluates one form. Atoms are self-evaluating, identifiers
    /// resolve along the current chain (synced symbols materialise the
    /// host value), quotes return their inner form verbatim, lists are
    /// applications.
    pub(crate) fn eval_inner(&mut self, expr: &Value) -> Result<Value> {
        match expr {
            Value::Nil
            | Value::Int(_)
            | Value::Double(_)
            | Value::Str(_)
            | Value::Func(_)
            | Value::ExtFunc(_)
            | Value::Env(_)
            | Value::UserPtr(_)
            | Value::ErrorCode(_)
            | Value::Tagged { .. } => Ok(expr.clone()),

            Value::Id(name) => self.env.lookup(name),

            Value::Quote(inner) => Ok((**inner).clone()),
            Value::Backquote(inner) => self.eval_backquote(inner, 1),
            Value::Comma(_) => Err(Error::new(
                EEVAL,
                "comma is only meaningful inside a backquote",
            )),

            Value::List(items) => self.apply(items),
        }
    }

    /// Application of a non-empty list form, guarded by the stack-depth
    /// limit.
    fn apply(&mut self, items: &[Value]) -> Result<Value> {
        if self.stack_depth >= self.config.max_stack_depth {
            return Err(Error::new(ESTACK, "evaluation stack depth exceeded"));
        }
        self.stack_depth += 1;
        let result = self.apply_unguarded(items);
        self.stack_depth -= 1;
        result
    }

    fn apply_unguarded(&mut self, items: &[Value]) -> Result<Value> {
        let head = self.eval_inner(&items[0])?;
        let args = &items[1..];
        match head {
            Value::ExtFunc(ext) => ext.call(self, args),
            Value::Func(lambda) => self.apply_lambda(&lambda, args),
            other => Err(Error::new(
                ETYPE,
                format!("cannot apply {}", other.type_name()),
            )),
        }
    }

    /// Calls a function or macro value.
    ///
    /// Functions evaluate their arguments in the caller's frame; macros
    /// bind the raw forms and have their expansion re-evaluated in the
    /// caller's frame. Either way the body runs in a fresh frame that
    /// bifurcates to the captured lexical environment, and that frame is
    /// gone on every exit path.
    fn apply_lambda(&mut self, lambda: &Lambda, args: &[Value]) -> Result<Value> {
        let arg_list = if lambda.eval_args {
            let mut evaluated = Vec::with_capacity(args.len());
            for arg in args {
                evaluated.push(self.eval_inner(arg)?);
            }
            Value::list(evaluated)
        } else {
            Value::list(args.to_vec())
        };

        let frame = Environment::enter(Rc::clone(&lambda.env), Rc::clone(&self.env));
        let caller = std::mem::replace(&mut self.env, frame);
        let result = self.run_body(lambda, &arg_list);
        self.env = caller;

        let result = result?;
        if lambda.eval_args {
            Ok(result)
        } else {
            self.eval_inner(&result)
        }
    }

    fn run_body(&mut self, lambda: &Lambda, arg_list: &Value) -> Result<Value> {
        if !match_pattern(&self.env, &lambda.params, arg_list, BindingFlags::empty())? {
            return Err(Error::new(
                EMATCH,
                format!(
                    "arguments {} do not match parameter pattern {}",
                    arg_list, lambda.params
                ),
            ));
        }
        let mut result = Value::Nil;
        for form in &lambda.body {
            result = self.eval_inner(form)?;
        }
        Ok(result)
    }

    /// Walks a backquoted form. Comma subforms at the current depth are
    /// evaluated and substituted; everything else is rebuilt
    /// structurally. Nested backquotes raise the depth, commas lower it.
    fn eval_backquote(&mut self, form: &Value, depth: u32) -> Result<Value> {
        match form {
            Value::Comma(inner) => {
                if depth == 1 {
                    self.eval_inner(inner)
                } else {
                    let walked = self.eval_backquote(inner, depth - 1)?;
                    Ok(Value::Comma(Box::new(walked)))
                }
            }
            Value::Backquote(inner) => {
                let walked = self.eval_backquote(inner, depth + 1)?;
                Ok(Value::Backquote(Box::new(walked)))
            }
            Value::Quote(inner) => {
                let walked = self.eval_backquote(inner, depth)?;
                Ok(Value::Quote(Box::new(walked)))
            }
            Value::List(items) => {
                let mut rebuilt = Vec::with_capacity(items.len());
                for item in items {
                    rebuilt.push(self.eval_backquote(item, depth)?);
                }
                Ok(Value::List(rebuilt))
            }
            other => Ok(other.clone()),
        }
    }
}
