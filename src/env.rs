// ABOUTME: Environment stack managing scoped bindings and synced host variables

use crate::errors::{Error, Result, EEXIST, ENOSYM, EREADONLY, ETYPE};
use crate::value::{Num, Value};
use bitflags::bitflags;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

bitflags! {
    /// Per-binding flags. `NODUMP` is advisory for hosts that serialise
    /// environments; the core never inspects it.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct BindingFlags: u32 {
        const READONLY = 1 << 0;
        const SYNCED = 1 << 1;
        const NODUMP = 1 << 2;
    }
}

/// Storage of a binding: an owned value, or a numeric cell shared with
/// the host for synced symbols.
#[derive(Debug, Clone)]
pub enum Slot {
    Owned(Value),
    SyncedInt(Rc<Cell<i32>>),
    SyncedFloat(Rc<Cell<f32>>),
    SyncedDouble(Rc<Cell<f64>>),
}

impl Slot {
    /// Materialises the current value. Synced carriers read through to
    /// the host cell.
    fn get(&self) -> Value {
        match self {
            Slot::Owned(v) => v.clone(),
            Slot::SyncedInt(cell) => Value::Int(cell.get()),
            Slot::SyncedFloat(cell) => Value::Double(cell.get() as f64),
            Slot::SyncedDouble(cell) => Value::Double(cell.get()),
        }
    }

    /// Writes a value into the slot, coercing numerics into synced
    /// carriers. Non-numeric values cannot enter a synced slot.
    fn set(&mut self, name: &str, value: Value) -> Result<()> {
        match self {
            Slot::Owned(stored) => {
                *stored = value;
                Ok(())
            }
            Slot::SyncedInt(cell) => {
                let n = numeric(name, &value)?;
                cell.set(match n {
                    Num::Int(i) => i,
                    Num::Double(d) => d as i32,
                });
                Ok(())
            }
            Slot::SyncedFloat(cell) => {
                cell.set(numeric(name, &value)?.as_f64() as f32);
                Ok(())
            }
            Slot::SyncedDouble(cell) => {
                cell.set(numeric(name, &value)?.as_f64());
                Ok(())
            }
        }
    }
}

fn numeric(name: &str, value: &Value) -> Result<Num> {
    value.as_num().ok_or_else(|| {
        Error::new(
            ETYPE,
            format!("synced symbol {} takes a number, got {}", name, value.type_name()),
        )
    })
}

#[derive(Debug, Clone)]
pub struct Binding {
    pub slot: Slot,
    pub flags: BindingFlags,
}

/// One frame of the environment stack.
///
/// `below` links the dynamic stack. A frame created for a function call
/// additionally carries a `bifurcation` link to the callee's lexical
/// environment: lookups prefer the bifurcation chain, new definitions
/// land in this frame only.
#[derive(Debug)]
pub struct Environment {
    bindings: RefCell<HashMap<Rc<str>, Binding>>,
    below: Option<Rc<Environment>>,
    bifurcation: Option<Rc<Environment>>,
}

impl Environment {
    /// Creates a root frame. Bindings here persist for the life of the
    /// interpreter handle.
    pub fn new() -> Rc<Self> {
        Rc::new(Environment {
            bindings: RefCell::new(HashMap::new()),
            below: None,
            bifurcation: None,
        })
    }

    /// Creates a fresh top frame above `below`.
    pub fn push(below: Rc<Environment>) -> Rc<Self> {
        Rc::new(Environment {
            bindings: RefCell::new(HashMap::new()),
            below: Some(below),
            bifurcation: None,
        })
    }

    /// Creates a top frame that bifurcates to `main`: lookups scan
    /// `main`'s chain before continuing below. Used at every call site of
    /// a function value so the body sees its lexical environment.
    pub fn enter(main: Rc<Environment>, below: Rc<Environment>) -> Rc<Self> {
        Rc::new(Environment {
            bindings: RefCell::new(HashMap::new()),
            below: Some(below),
            bifurcation: Some(main),
        })
    }

    pub fn below(&self) -> Option<&Rc<Environment>> {
        self.below.as_ref()
    }

    pub fn is_root(&self) -> bool {
        self.below.is_none()
    }

    /// Inserts a binding into this frame. Duplicate names in the same
    /// frame are rejected.
    pub fn define(&self, name: &str, value: Value, flags: BindingFlags) -> Result<()> {
        self.define_slot(name, Slot::Owned(value), flags)
    }

    pub fn define_slot(&self, name: &str, slot: Slot, flags: BindingFlags) -> Result<()> {
        let mut bindings = self.bindings.borrow_mut();
        if bindings.contains_key(name) {
            return Err(Error::new(EEXIST, format!("{} already defined", name)));
        }
        bindings.insert(Rc::from(name), Binding { slot, flags });
        Ok(())
    }

    /// Inserts or replaces, bypassing the duplicate check. Reserved for
    /// interpreter-maintained symbols such as the feature list.
    pub(crate) fn define_or_replace(&self, name: &str, value: Value, flags: BindingFlags) {
        self.bindings.borrow_mut().insert(
            Rc::from(name),
            Binding {
                slot: Slot::Owned(value),
                flags,
            },
        );
    }

    /// Removes a binding from this frame only. Used by the matcher to
    /// rewind a failed match attempt.
    pub(crate) fn remove(&self, name: &str) {
        self.bindings.borrow_mut().remove(name);
    }

    /// Chain lookup: this frame, then the bifurcation chain, then the
    /// frames below.
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(binding) = self.bindings.borrow().get(name) {
            return Some(binding.slot.get());
        }
        if let Some(ref main) = self.bifurcation {
            if let Some(value) = main.get(name) {
                return Some(value);
            }
        }
        self.below.as_ref().and_then(|b| b.get(name))
    }

    pub fn lookup(&self, name: &str) -> Result<Value> {
        self.get(name)
            .ok_or_else(|| Error::new(ENOSYM, format!("unbound symbol {}", name)))
    }

    /// Locates the binding along the lookup chain and updates it in
    /// place. Read-only bindings reject the write; synced bindings
    /// coerce-and-store into the host cell.
    pub fn assign(&self, name: &str, value: Value) -> Result<()> {
        match self.try_assign(name, value)? {
            None => Ok(()),
            Some(_) => Err(Error::new(ENOSYM, format!("unbound symbol {}", name))),
        }
    }

    /// `Ok(None)` on success, `Ok(Some(value))` if the symbol is not
    /// bound anywhere along this chain (returning the value so the
    /// caller can keep searching without cloning).
    fn try_assign(&self, name: &str, value: Value) -> Result<Option<Value>> {
        {
            let mut bindings = self.bindings.borrow_mut();
            if let Some(binding) = bindings.get_mut(name) {
                if binding.flags.contains(BindingFlags::READONLY) {
                    return Err(Error::new(EREADONLY, format!("{} is read-only", name)));
                }
                binding.slot.set(name, value)?;
                return Ok(None);
            }
        }
        let value = match &self.bifurcation {
            Some(main) => match main.try_assign(name, value)? {
                None => return Ok(None),
                Some(v) => v,
            },
            None => value,
        };
        match &self.below {
            Some(below) => below.try_assign(name, value),
            None => Ok(Some(value)),
        }
    }

    /// Flags of a binding in this frame, if present. Host-side helper.
    pub fn local_flags(&self, name: &str) -> Option<BindingFlags> {
        self.bindings.borrow().get(name).map(|b| b.flags)
    }
}
