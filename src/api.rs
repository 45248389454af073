// ABOUTME: The Cheax handle exposing the embedding surface of the interpreter

use crate::builtins;
use crate::config::{Config, VERSION};
use crate::env::{BindingFlags, Environment, Slot};
use crate::errors::{self, Error, ErrorCode, ErrorStore, Result, EAPI, EIO, EVALUE};
use crate::parser;
use crate::typestore::{self, PrintFn, TypeCode, TypeStore};
use crate::value::{ExtFn, Value};
use std::any::Any;
use std::cell::Cell;
use std::io::{self, Write};
use std::rc::Rc;

/// Interpreter state as observed by the embedder: either running
/// normally or unwinding from a thrown error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrState {
    Running,
    Thrown,
}

/// One independent interpreter instance.
///
/// The host creates a handle, populates the global environment with its
/// own bindings, then reads and evaluates programs. A handle is
/// single-threaded; distinct handles are fully independent.
pub struct Cheax {
    pub(crate) env: Rc<Environment>,
    global: Rc<Environment>,
    pub(crate) typestore: TypeStore,
    pub(crate) errstore: ErrorStore,
    pub(crate) config: Config,
    features: Vec<String>,
    pub(crate) stack_depth: u32,
    pub(crate) error: Option<Error>,
    thrown: bool,
}

impl Cheax {
    /// Creates a fresh interpreter with the builtin surface registered
    /// and every built-in error code bound read-only by name.
    pub fn new() -> Self {
        let global = Environment::new();
        let mut cx = Cheax {
            env: Rc::clone(&global),
            global,
            typestore: TypeStore::new(),
            errstore: ErrorStore::new(),
            config: Config::default(),
            features: Vec::new(),
            stack_depth: 0,
            error: None,
            thrown: false,
        };
        for (name, code) in errors::BUILTIN_CODES {
            cx.global
                .define(name, Value::ErrorCode(*code), BindingFlags::READONLY)
                .expect("built-in error code names are distinct");
        }
        cx.global
            .define("features", Value::Nil, BindingFlags::NODUMP)
            .expect("fresh environment");
        builtins::register_builtins(&mut cx);
        cx
    }

    pub fn version() -> &'static str {
        VERSION
    }

    // ===== Error state =====

    /// Updates the observable error state from an operation's outcome.
    fn record<T>(&mut self, result: Result<T>) -> Result<T> {
        match &result {
            Ok(_) => self.thrown = false,
            Err(e) => {
                self.error = Some(e.clone());
                self.thrown = true;
            }
        }
        result
    }

    pub fn errstate(&self) -> ErrState {
        if self.thrown {
            ErrState::Thrown
        } else {
            ErrState::Running
        }
    }

    /// Code of the most recent error, or zero.
    pub fn errno(&self) -> ErrorCode {
        self.error.as_ref().map_or(errors::ENOERR, |e| e.code)
    }

    pub fn errmsg(&self) -> Option<&str> {
        self.error.as_ref().and_then(|e| e.msg.as_deref())
    }

    /// Drops the recorded error and returns to the running state.
    pub fn clear(&mut self) {
        self.error = None;
        self.thrown = false;
    }

    /// Reports the current error to stderr, pairing the code's
    /// registered name with the attached message.
    pub fn perror(&self, prefix: &str) {
        match &self.error {
            Some(e) => {
                let name = self.errstore.name_of(e.code);
                match &e.msg {
                    Some(msg) => eprintln!("{}: {}: {}", prefix, name, msg),
                    None => eprintln!("{}: {}", prefix, name),
                }
            }
            None => eprintln!("{}: no error", prefix),
        }
    }

    /// Raises an error from host code: records it and hands back the
    /// value to propagate. A zero code is an API misuse.
    pub fn throw(&mut self, code: ErrorCode, msg: Option<String>) -> Error {
        let error = if code == errors::ENOERR {
            Error::new(EAPI, "cannot throw error code zero")
        } else {
            Error { code, msg }
        };
        self.error = Some(error.clone());
        self.thrown = true;
        error
    }

    /// Allocates a user error code and binds its name in the global
    /// environment, making it discoverable from the language.
    pub fn new_error_code(&mut self, name: &str) -> Result<ErrorCode> {
        let result = self.errstore.new_code(name).and_then(|code| {
            self.global
                .define(name, Value::ErrorCode(code), BindingFlags::READONLY)?;
            Ok(code)
        });
        self.record(result)
    }

    // ===== Read / eval / print =====

    /// Reads the first form of `text`; nil if it holds no form.
    pub fn read_string(&mut self, text: &str) -> Result<Value> {
        let result = parser::read_one(text).map(|form| form.unwrap_or(Value::Nil));
        self.record(result)
    }

    /// Reads the first form from a byte stream; nil when the stream
    /// holds no form. The stream is consumed to its end; use a
    /// [`parser::Reader`] to walk multiple forms.
    pub fn read(&mut self, stream: &mut dyn io::Read) -> Result<Value> {
        let mut text = String::new();
        let result = stream
            .read_to_string(&mut text)
            .map_err(|e| Error::new(EIO, e.to_string()))
            .and_then(|_| parser::read_one(&text))
            .map(|form| form.unwrap_or(Value::Nil));
        self.record(result)
    }

    /// Evaluates one expression against the current environment.
    pub fn eval(&mut self, expr: &Value) -> Result<Value> {
        let result = self.eval_inner(expr);
        self.record(result)
    }

    /// Reads and evaluates every top-level form of `text`, returning the
    /// last form's value (nil for empty input).
    pub fn eval_string(&mut self, text: &str) -> Result<Value> {
        let result = self.eval_string_inner(text);
        self.record(result)
    }

    fn eval_string_inner(&mut self, text: &str) -> Result<Value> {
        let mut reader = parser::Reader::new(text);
        let mut last = Value::Nil;
        while let Some(form) = reader.next_form()? {
            last = self.eval_inner(&form)?;
        }
        Ok(last)
    }

    /// Structural printer. Alias types with an installed printer
    /// dispatch through it; error codes print under their registered
    /// names.
    pub fn print(&self, w: &mut dyn Write, value: &Value) -> Result<()> {
        let rendered = self.format_value(value);
        w.write_all(rendered.as_bytes())
            .map_err(|e| Error::new(EIO, e.to_string()))
    }

    pub fn format_value(&self, value: &Value) -> String {
        if let Some(printer) = self.typestore.printer(value.type_code()) {
            return printer(value);
        }
        match value {
            Value::ErrorCode(code) => self.errstore.name_of(*code),
            other => format!("{}", other),
        }
    }

    // ===== Environment =====

    /// Defines `name` in the current top frame.
    pub fn def(&mut self, name: &str, value: Value, flags: BindingFlags) -> Result<()> {
        let result = self.env.define(name, value, flags);
        self.record(result)
    }

    /// Looks `name` up along the current chain.
    pub fn get(&mut self, name: &str) -> Result<Value> {
        let result = self.env.lookup(name);
        self.record(result)
    }

    /// Assigns to an existing binding.
    pub fn set(&mut self, name: &str, value: Value) -> Result<()> {
        let result = self.env.assign(name, value);
        self.record(result)
    }

    /// Pushes a fresh top frame; returns it as a first-class handle.
    pub fn push_env(&mut self) -> Rc<Environment> {
        self.env = Environment::push(Rc::clone(&self.env));
        Rc::clone(&self.env)
    }

    /// Pushes a top frame bifurcating to `main`: lookups prefer `main`'s
    /// chain, definitions land in the new frame.
    pub fn enter_env(&mut self, main: Rc<Environment>) -> Rc<Environment> {
        self.env = Environment::enter(main, Rc::clone(&self.env));
        Rc::clone(&self.env)
    }

    /// Tears down the top frame. Popping the root frame is an API
    /// misuse.
    pub fn pop_env(&mut self) -> Result<()> {
        let result = match self.env.below() {
            Some(below) => {
                let below = Rc::clone(below);
                self.env = below;
                Ok(())
            }
            None => Err(Error::new(EAPI, "cannot pop the root environment")),
        };
        self.record(result)
    }

    pub fn env(&self) -> &Rc<Environment> {
        &self.env
    }

    pub fn global_env(&self) -> &Rc<Environment> {
        &self.global
    }

    // ===== Host functions and synced variables =====

    /// Binds a host callback in the global environment. The callback
    /// receives the unevaluated argument forms; evaluation is its
    /// responsibility (normally through `unpack`).
    pub fn defmacro(
        &mut self,
        name: &str,
        func: impl Fn(&mut Cheax, &[Value]) -> Result<Value> + 'static,
    ) -> Result<()> {
        let result = self.global.define(
            name,
            Value::ExtFunc(ExtFn::new(name, func)),
            BindingFlags::empty(),
        );
        self.record(result)
    }

    /// Binds `name` to an integer variable whose storage lives with the
    /// host; reads and writes go through the shared cell.
    pub fn sync_int(&mut self, name: &str, cell: Rc<Cell<i32>>, flags: BindingFlags) -> Result<()> {
        let result =
            self.env
                .define_slot(name, Slot::SyncedInt(cell), flags | BindingFlags::SYNCED);
        self.record(result)
    }

    pub fn sync_float(
        &mut self,
        name: &str,
        cell: Rc<Cell<f32>>,
        flags: BindingFlags,
    ) -> Result<()> {
        let result =
            self.env
                .define_slot(name, Slot::SyncedFloat(cell), flags | BindingFlags::SYNCED);
        self.record(result)
    }

    pub fn sync_double(
        &mut self,
        name: &str,
        cell: Rc<Cell<f64>>,
        flags: BindingFlags,
    ) -> Result<()> {
        let result =
            self.env
                .define_slot(name, Slot::SyncedDouble(cell), flags | BindingFlags::SYNCED);
        self.record(result)
    }

    /// Wraps a host object as a user-pointer value of alias type `ty`.
    /// The alias must resolve to the user-pointer basic type, and a bare
    /// user pointer is forbidden at the interface.
    pub fn user_ptr(&mut self, ty: TypeCode, data: Rc<dyn Any>) -> Result<Value> {
        let result = (|| {
            if ty == typestore::USER_PTR {
                return Err(Error::new(EAPI, "bare user pointer type is forbidden"));
            }
            if self.typestore.resolve(ty)? != typestore::USER_PTR {
                return Err(Error::new(
                    EAPI,
                    format!("type {} is not a user pointer alias", ty),
                ));
            }
            Ok(Value::UserPtr(crate::value::UserPtr::new(ty, data)))
        })();
        self.record(result)
    }

    // ===== Types =====

    pub fn new_type(&mut self, name: &str, base: TypeCode) -> Result<TypeCode> {
        let result = self.typestore.new_type(name, base);
        self.record(result)
    }

    pub fn find_type(&self, name: &str) -> Option<TypeCode> {
        self.typestore.find(name)
    }

    pub fn resolve_type(&mut self, code: TypeCode) -> Result<TypeCode> {
        let result = self.typestore.resolve(code);
        self.record(result)
    }

    pub fn set_printer(&mut self, code: TypeCode, printer: PrintFn) -> Result<()> {
        let result = self.typestore.set_printer(code, printer);
        self.record(result)
    }

    // ===== Features =====

    /// Enables a named group of bindings. Loading a group twice is a
    /// no-op. The enabled set is readable from the language through the
    /// `features` symbol.
    pub fn load_feature(&mut self, name: &str) -> Result<()> {
        let result = self.load_feature_inner(name);
        self.record(result)
    }

    fn load_feature_inner(&mut self, name: &str) -> Result<()> {
        if self.features.iter().any(|f| f == name) {
            return Ok(());
        }
        match name {
            "stdout" => builtins::console::register_stdout(self)?,
            "stderr" => builtins::console::register_stderr(self)?,
            "stdio" => {
                self.load_feature_inner("stdout")?;
                self.load_feature_inner("stderr")?;
                return Ok(());
            }
            "exit" => builtins::console::register_exit(self)?,
            "set-max-stack-depth" => builtins::console::register_stack_depth(self)?,
            "file-io" | "gc" => {
                return Err(Error::new(
                    EAPI,
                    format!("feature {} is not available in this build", name),
                ));
            }
            _ => {
                return Err(Error::new(EAPI, format!("unknown feature {}", name)));
            }
        }
        log::debug!("enabled feature {}", name);
        self.features.push(name.to_string());
        let listing = self
            .features
            .iter()
            .map(|f| Value::string(f))
            .collect::<Vec<_>>();
        self.global
            .define_or_replace("features", Value::list(listing), BindingFlags::NODUMP);
        Ok(())
    }

    pub fn set_max_stack_depth(&mut self, depth: u32) -> Result<()> {
        let result = if depth == 0 {
            Err(Error::new(EVALUE, "stack depth limit must be positive"))
        } else {
            self.config.max_stack_depth = depth;
            Ok(())
        };
        self.record(result)
    }
}

impl Default for Cheax {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{EEXIST, ENOSYM, EREADONLY};

    #[test]
    fn test_def_get_set() {
        let mut cx = Cheax::new();
        cx.def("x", Value::Int(1), BindingFlags::empty()).unwrap();
        assert_eq!(cx.get("x").unwrap(), Value::Int(1));

        cx.set("x", Value::Int(2)).unwrap();
        assert_eq!(cx.get("x").unwrap(), Value::Int(2));

        let err = cx.get("missing").unwrap_err();
        assert_eq!(err.code, ENOSYM);
        assert_eq!(cx.errstate(), ErrState::Thrown);
        assert_eq!(cx.errno(), ENOSYM);

        cx.clear();
        assert_eq!(cx.errstate(), ErrState::Running);
        assert_eq!(cx.errno(), errors::ENOERR);
    }

    #[test]
    fn test_readonly_def() {
        let mut cx = Cheax::new();
        cx.def("k", Value::Int(1), BindingFlags::READONLY).unwrap();
        let err = cx.set("k", Value::Int(2)).unwrap_err();
        assert_eq!(err.code, EREADONLY);
    }

    #[test]
    fn test_builtin_error_codes_bound() {
        let mut cx = Cheax::new();
        assert_eq!(cx.get("EVALUE").unwrap(), Value::ErrorCode(errors::EVALUE));
        assert_eq!(cx.get("ESTACK").unwrap(), Value::ErrorCode(errors::ESTACK));
    }

    #[test]
    fn test_new_error_code_is_discoverable() {
        let mut cx = Cheax::new();
        let code = cx.new_error_code("EWHOOPS").unwrap();
        assert_eq!(code, errors::EUSER0);
        assert_eq!(cx.get("EWHOOPS").unwrap(), Value::ErrorCode(code));

        let err = cx.new_error_code("EWHOOPS").unwrap_err();
        assert_eq!(err.code, EEXIST);
    }

    #[test]
    fn test_push_pop_env() {
        let mut cx = Cheax::new();
        cx.push_env();
        cx.def("local", Value::Int(5), BindingFlags::empty()).unwrap();
        cx.pop_env().unwrap();
        assert_eq!(cx.get("local").unwrap_err().code, ENOSYM);

        while cx.pop_env().is_ok() {}
        assert_eq!(cx.errno(), EAPI);
    }

    #[test]
    fn test_user_ptr_requires_alias() {
        let mut cx = Cheax::new();
        let err = cx
            .user_ptr(typestore::USER_PTR, Rc::new(7u32))
            .unwrap_err();
        assert_eq!(err.code, EAPI);

        let handle_ty = cx.new_type("Widget", typestore::USER_PTR).unwrap();
        let v = cx.user_ptr(handle_ty, Rc::new(7u32)).unwrap();
        assert_eq!(v.type_code(), handle_ty);
    }

    #[test]
    fn test_features_listing() {
        let mut cx = Cheax::new();
        assert_eq!(cx.get("features").unwrap(), Value::Nil);

        cx.load_feature("stdio").unwrap();
        cx.load_feature("set-max-stack-depth").unwrap();
        let listing = cx.get("features").unwrap();
        let items = listing.list_items().unwrap().to_vec();
        assert!(items.contains(&Value::string("stdout")));
        assert!(items.contains(&Value::string("stderr")));
        assert!(items.contains(&Value::string("set-max-stack-depth")));

        // Unavailable and unknown groups are embedding errors.
        assert_eq!(cx.load_feature("gc").unwrap_err().code, EAPI);
        assert_eq!(cx.load_feature("warp-drive").unwrap_err().code, EAPI);
    }

    #[test]
    fn test_custom_printer_dispatch() {
        let mut cx = Cheax::new();
        let ty = cx.new_type("Handle", typestore::USER_PTR).unwrap();
        cx.set_printer(ty, Rc::new(|_| "#<widget>".to_string())).unwrap();
        let v = cx.user_ptr(ty, Rc::new(1u8)).unwrap();
        assert_eq!(cx.format_value(&v), "#<widget>");
    }

    #[test]
    fn test_throw_zero_is_api_misuse() {
        let mut cx = Cheax::new();
        let err = cx.throw(errors::ENOERR, None);
        assert_eq!(err.code, EAPI);
    }
}
