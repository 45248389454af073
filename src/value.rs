// ABOUTME: Value types representing cheax data and expressions

use crate::api::Cheax;
use crate::env::Environment;
use crate::errors::{self, Result};
use crate::typestore::{self, TypeCode};
use std::any::Any;
use std::fmt;
use std::rc::Rc;

/// A cheax value. Every variant maps to a basic type code; values of
/// registered alias types are carried by [`Value::Tagged`],
/// [`Value::ErrorCode`] and [`Value::UserPtr`].
#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Id(Rc<str>),
    Int(i32),
    Double(f64),
    /// Proper list; invariant: never empty (the empty list is `Nil`).
    List(Vec<Value>),
    Func(Rc<Lambda>),
    ExtFunc(ExtFn),
    Quote(Box<Value>),
    Backquote(Box<Value>),
    Comma(Box<Value>),
    Str(Rc<str>),
    Env(Rc<Environment>),
    UserPtr(UserPtr),
    /// An integer retyped to the `ErrorCode` alias.
    ErrorCode(i32),
    /// A value retyped to some other registered alias of its basic type.
    Tagged { ty: TypeCode, inner: Box<Value> },
}

/// A function or macro: parameter pattern, body forms, captured lexical
/// environment. `eval_args` distinguishes functions (arguments evaluated
/// in the caller's frame) from macros (raw forms bound, expansion
/// re-evaluated in the caller's frame).
#[derive(Debug)]
pub struct Lambda {
    pub params: Value,
    pub body: Vec<Value>,
    pub env: Rc<Environment>,
    pub eval_args: bool,
}

/// Host callback signature: the interpreter handle and the unevaluated
/// argument forms. Argument evaluation is the callback's job, normally
/// through the `unpack` helper.
pub type NativeFn = dyn Fn(&mut Cheax, &[Value]) -> Result<Value>;

/// A named host function value. Equality is callback pointer identity.
#[derive(Clone)]
pub struct ExtFn {
    name: Rc<str>,
    func: Rc<NativeFn>,
}

impl ExtFn {
    pub fn new(name: &str, func: impl Fn(&mut Cheax, &[Value]) -> Result<Value> + 'static) -> Self {
        ExtFn {
            name: Rc::from(name),
            func: Rc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, cx: &mut Cheax, args: &[Value]) -> Result<Value> {
        (self.func)(cx, args)
    }
}

impl fmt::Debug for ExtFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtFn").field("name", &self.name).finish()
    }
}

impl PartialEq for ExtFn {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.func, &other.func)
    }
}

/// Opaque host object carried through the value model under a registered
/// alias type code. Equality is pointer identity.
#[derive(Clone)]
pub struct UserPtr {
    ty: TypeCode,
    data: Rc<dyn Any>,
}

impl UserPtr {
    pub fn new(ty: TypeCode, data: Rc<dyn Any>) -> Self {
        UserPtr { ty, data }
    }

    pub fn type_code(&self) -> TypeCode {
        self.ty
    }

    pub fn retype(&self, ty: TypeCode) -> Self {
        UserPtr {
            ty,
            data: Rc::clone(&self.data),
        }
    }

    pub fn data(&self) -> &Rc<dyn Any> {
        &self.data
    }
}

impl fmt::Debug for UserPtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserPtr").field("ty", &self.ty).finish()
    }
}

impl PartialEq for UserPtr {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.data, &other.data)
    }
}

/// A number as carried by the value model: 32-bit signed integer or
/// IEEE-754 double. Mixed arithmetic promotes to double.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Num {
    Int(i32),
    Double(f64),
}

impl Num {
    pub fn as_f64(self) -> f64 {
        match self {
            Num::Int(i) => i as f64,
            Num::Double(d) => d,
        }
    }
}

impl Value {
    pub fn id(name: &str) -> Value {
        Value::Id(Rc::from(name))
    }

    pub fn string(s: &str) -> Value {
        Value::Str(Rc::from(s))
    }

    /// Builds a proper list; an empty vector is nil.
    pub fn list(items: Vec<Value>) -> Value {
        if items.is_empty() {
            Value::Nil
        } else {
            Value::List(items)
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// The elements of a proper list; nil is the empty list. `None` for
    /// anything that is not a list.
    pub fn list_items(&self) -> Option<&[Value]> {
        match self {
            Value::Nil => Some(&[]),
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Type code of this value. For every value, resolving this code
    /// yields a basic type.
    pub fn type_code(&self) -> TypeCode {
        match self {
            Value::Nil => typestore::NIL,
            Value::Id(_) => typestore::ID,
            Value::Int(_) => typestore::INT,
            Value::Double(_) => typestore::DOUBLE,
            Value::List(_) => typestore::LIST,
            Value::Func(_) => typestore::FUNC,
            Value::ExtFunc(_) => typestore::EXT_FUNC,
            Value::Quote(_) => typestore::QUOTE,
            Value::Backquote(_) => typestore::BACKQUOTE,
            Value::Comma(_) => typestore::COMMA,
            Value::Str(_) => typestore::STRING,
            Value::Env(_) => typestore::ENV,
            Value::UserPtr(p) => p.type_code(),
            Value::ErrorCode(_) => typestore::ERRORCODE,
            Value::Tagged { ty, .. } => *ty,
        }
    }

    /// Strips alias tags down to the basic-typed carrier.
    pub fn untagged(&self) -> &Value {
        let mut v = self;
        while let Value::Tagged { inner, .. } = v {
            v = inner;
        }
        v
    }

    /// Numeric view; error codes count as their integer carrier.
    pub fn as_num(&self) -> Option<Num> {
        match self.untagged() {
            Value::Int(i) | Value::ErrorCode(i) => Some(Num::Int(*i)),
            Value::Double(d) => Some(Num::Double(*d)),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self.untagged() {
            Value::Int(i) | Value::ErrorCode(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_id(&self) -> Option<&str> {
        match self {
            Value::Id(name) => Some(name),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self.untagged() {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// A short human-readable name of this value's basic type, for error
    /// messages.
    pub fn type_name(&self) -> &'static str {
        match self.untagged() {
            Value::Nil => "nil",
            Value::Id(_) => "identifier",
            Value::Int(_) => "integer",
            Value::Double(_) => "double",
            Value::List(_) => "list",
            Value::Func(_) => "function",
            Value::ExtFunc(_) => "builtin",
            Value::Quote(_) => "quote",
            Value::Backquote(_) => "backquote",
            Value::Comma(_) => "comma",
            Value::Str(_) => "string",
            Value::Env(_) => "environment",
            Value::UserPtr(_) => "user pointer",
            Value::ErrorCode(_) => "error code",
            Value::Tagged { .. } => unreachable!("untagged"),
        }
    }
}

/// Structural equality over resolved basic types: ids by name, integers
/// by value, doubles by `==`, strings bytewise, lists element-wise;
/// functions, host callbacks, user pointers and environments by identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        use Value::*;
        match (self.untagged(), other.untagged()) {
            (Nil, Nil) => true,
            (Id(a), Id(b)) => a == b,
            (Int(a) | ErrorCode(a), Int(b) | ErrorCode(b)) => a == b,
            (Double(a), Double(b)) => a == b,
            (Str(a), Str(b)) => a == b,
            (List(a), List(b)) => a == b,
            (Quote(a), Quote(b)) => a == b,
            (Backquote(a), Backquote(b)) => a == b,
            (Comma(a), Comma(b)) => a == b,
            (Func(a), Func(b)) => Rc::ptr_eq(a, b),
            (ExtFunc(a), ExtFunc(b)) => a == b,
            (Env(a), Env(b)) => Rc::ptr_eq(a, b),
            (UserPtr(a), UserPtr(b)) => a == b,
            _ => false,
        }
    }
}

fn write_escaped(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    write!(f, "\"")?;
    for c in s.chars() {
        match c {
            '\\' => write!(f, "\\\\")?,
            '"' => write!(f, "\\\"")?,
            '\n' => write!(f, "\\n")?,
            '\r' => write!(f, "\\r")?,
            '\t' => write!(f, "\\t")?,
            c if (c as u32) < 0x20 => write!(f, "\\x{:02x}", c as u32)?,
            c => write!(f, "{}", c)?,
        }
    }
    write!(f, "\"")
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "()"),
            Value::Id(name) => write!(f, "{}", name),
            Value::Int(i) => write!(f, "{}", i),
            // {:?} keeps a decimal point on whole doubles, so readback
            // yields a double again
            Value::Double(d) => write!(f, "{:?}", d),
            Value::List(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, ")")
            }
            Value::Func(l) if l.eval_args => write!(f, "#<lambda>"),
            Value::Func(_) => write!(f, "#<macro>"),
            Value::ExtFunc(ext) => write!(f, "#<builtin {}>", ext.name()),
            Value::Quote(inner) => write!(f, "'{}", inner),
            Value::Backquote(inner) => write!(f, "`{}", inner),
            Value::Comma(inner) => write!(f, ",{}", inner),
            Value::Str(s) => write_escaped(f, s),
            Value::Env(_) => write!(f, "#<environment>"),
            Value::UserPtr(_) => write!(f, "#<user-ptr>"),
            Value::ErrorCode(code) => match errors::builtin_name(*code) {
                Some(name) => write!(f, "{}", name),
                None if *code >= errors::EUSER0 => {
                    write!(f, "EUSER{}", code - errors::EUSER0)
                }
                None => write!(f, "#<errno {:#06x}>", code),
            },
            Value::Tagged { inner, .. } => write!(f, "{}", inner),
        }
    }
}
