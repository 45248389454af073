//! Feature-gated console and control builtins
//!
//! None of these are bound by default; the host enables them through
//! `Cheax::load_feature` ("stdout", "stderr", "exit",
//! "set-max-stack-depth").

use super::unpack;
use crate::api::Cheax;
use crate::errors::{Error, Result, EIO, EVALUE};
use crate::value::Value;
use std::io::{self, Write};

fn write_value(cx: &Cheax, w: &mut dyn Write, value: &Value, newline: bool) -> Result<()> {
    cx.print(w, value)?;
    if newline {
        w.write_all(b"\n")
            .map_err(|e| Error::new(EIO, e.to_string()))?;
    }
    Ok(())
}

/// Prints a value to stdout and returns it.
pub fn builtin_print(cx: &mut Cheax, args: &[Value]) -> Result<Value> {
    let args = unpack(cx, "print", args, ".")?;
    write_value(cx, &mut io::stdout(), &args[0], false)?;
    Ok(args.into_iter().next().expect("one unpacked argument"))
}

/// Prints a value and a newline to stdout and returns it.
pub fn builtin_println(cx: &mut Cheax, args: &[Value]) -> Result<Value> {
    let args = unpack(cx, "println", args, ".")?;
    write_value(cx, &mut io::stdout(), &args[0], true)?;
    Ok(args.into_iter().next().expect("one unpacked argument"))
}

pub fn builtin_print_err(cx: &mut Cheax, args: &[Value]) -> Result<Value> {
    let args = unpack(cx, "print-err", args, ".")?;
    write_value(cx, &mut io::stderr(), &args[0], false)?;
    Ok(args.into_iter().next().expect("one unpacked argument"))
}

pub fn builtin_println_err(cx: &mut Cheax, args: &[Value]) -> Result<Value> {
    let args = unpack(cx, "println-err", args, ".")?;
    write_value(cx, &mut io::stderr(), &args[0], true)?;
    Ok(args.into_iter().next().expect("one unpacked argument"))
}

/// Terminates the process with the given status (default 0). Only bound
/// when the host opted into the `exit` feature.
pub fn builtin_exit(cx: &mut Cheax, args: &[Value]) -> Result<Value> {
    let args = unpack(cx, "exit", args, "i?")?;
    let status = args.first().and_then(|v| v.as_int()).unwrap_or(0);
    std::process::exit(status);
}

/// Reconfigures the evaluation stack depth limit.
pub fn builtin_set_max_stack_depth(cx: &mut Cheax, args: &[Value]) -> Result<Value> {
    let args = unpack(cx, "set-max-stack-depth", args, "i")?;
    let depth = args[0].as_int().expect("argument unpacked as an integer");
    if depth <= 0 {
        return Err(Error::new(
            EVALUE,
            "set-max-stack-depth: limit must be positive",
        ));
    }
    cx.set_max_stack_depth(depth as u32)?;
    Ok(Value::Int(depth))
}

pub fn register_stdout(cx: &mut Cheax) -> Result<()> {
    cx.defmacro("print", builtin_print)?;
    cx.defmacro("println", builtin_println)
}

pub fn register_stderr(cx: &mut Cheax) -> Result<()> {
    cx.defmacro("print-err", builtin_print_err)?;
    cx.defmacro("println-err", builtin_println_err)
}

pub fn register_exit(cx: &mut Cheax) -> Result<()> {
    cx.defmacro("exit", builtin_exit)
}

pub fn register_stack_depth(cx: &mut Cheax) -> Result<()> {
    cx.defmacro("set-max-stack-depth", builtin_set_max_stack_depth)
}
