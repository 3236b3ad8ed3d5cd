//! Runtime values
//!
//! Everything that flows through a wiretapped call is a [`Value`]: plain
//! data, shared mutable cells, and references to classes, instances and
//! callables.

mod args;

pub use args::{Args, Bound, Signature};

use crate::runtime::{CallError, Class, Function, Instance};
use serde::{Serialize, Serializer};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A runtime value passed to and returned from callables
#[derive(Debug, Clone, Serialize)]
pub enum Value {
    // Primitives
    Unit,
    Bool(bool),
    S64(i64),
    U64(u64),
    F64(f64),
    Char(char),
    String(String),

    // Compound
    List(Vec<Value>),
    Tuple(Vec<Value>),
    Map(BTreeMap<String, Value>),

    // References (compared by identity)
    Shared(Shared),
    #[serde(serialize_with = "serialize_class")]
    Class(Arc<Class>),
    #[serde(serialize_with = "serialize_instance")]
    Instance(Arc<Instance>),
    #[serde(serialize_with = "serialize_function")]
    Function(Function),
}

impl Value {
    /// Short name of the value's kind, used in type mismatch errors
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Unit => "unit",
            Value::Bool(_) => "bool",
            Value::S64(_) => "s64",
            Value::U64(_) => "u64",
            Value::F64(_) => "f64",
            Value::Char(_) => "char",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
            Value::Map(_) => "map",
            Value::Shared(_) => "shared",
            Value::Class(_) => "class",
            Value::Instance(_) => "instance",
            Value::Function(_) => "function",
        }
    }

    pub fn as_i64(&self) -> Result<i64, CallError> {
        match self {
            Value::S64(v) => Ok(*v),
            Value::U64(v) => i64::try_from(*v).map_err(|_| self.mismatch("s64")),
            _ => Err(self.mismatch("s64")),
        }
    }

    pub fn as_str(&self) -> Result<&str, CallError> {
        match self {
            Value::String(s) => Ok(s),
            _ => Err(self.mismatch("string")),
        }
    }

    pub fn as_bool(&self) -> Result<bool, CallError> {
        match self {
            Value::Bool(b) => Ok(*b),
            _ => Err(self.mismatch("bool")),
        }
    }

    pub fn as_class(&self) -> Result<&Arc<Class>, CallError> {
        match self {
            Value::Class(class) => Ok(class),
            _ => Err(self.mismatch("class")),
        }
    }

    pub fn as_instance(&self) -> Result<&Arc<Instance>, CallError> {
        match self {
            Value::Instance(instance) => Ok(instance),
            _ => Err(self.mismatch("instance")),
        }
    }

    pub fn as_shared(&self) -> Result<&Shared, CallError> {
        match self {
            Value::Shared(shared) => Ok(shared),
            _ => Err(self.mismatch("shared")),
        }
    }

    /// Build a map value from keyword-style pairs
    pub fn map<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        Value::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    fn mismatch(&self, expected: &str) -> CallError {
        CallError::TypeMismatch {
            expected: expected.to_string(),
            got: self.type_name().to_string(),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Unit, Value::Unit) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::S64(a), Value::S64(b)) => a == b,
            (Value::U64(a), Value::U64(b)) => a == b,
            (Value::F64(a), Value::F64(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Tuple(a), Value::Tuple(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Shared(a), Value::Shared(b)) => a.ptr_eq(b),
            (Value::Class(a), Value::Class(b)) => Arc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => Arc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

/// A mutable cell shared by reference between callers, callees and reports.
///
/// Cloning the handle does not copy the contents, so a report holding a
/// `Shared` argument observes mutations made after the call.
#[derive(Debug, Clone, Default)]
pub struct Shared(Arc<Mutex<Value>>);

impl Shared {
    pub fn new(value: impl Into<Value>) -> Self {
        Self(Arc::new(Mutex::new(value.into())))
    }

    pub fn get(&self) -> Value {
        self.lock().clone()
    }

    pub fn set(&self, value: impl Into<Value>) -> Value {
        std::mem::replace(&mut *self.lock(), value.into())
    }

    /// Run `f` with exclusive access to the contents
    pub fn update<R>(&self, f: impl FnOnce(&mut Value) -> R) -> R {
        f(&mut *self.lock())
    }

    pub fn ptr_eq(&self, other: &Shared) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Run `f` on a snapshot of the contents, unless this cell is already
    /// being visited further up the current thread's stack.
    ///
    /// Returns `None` on re-entry, so recursive walks over values terminate
    /// on cells that (directly or indirectly) contain themselves.
    pub fn visit<R>(&self, f: impl FnOnce(&Value) -> R) -> Option<R> {
        let _guard = VisitGuard::enter(self)?;
        Some(f(&self.get()))
    }

    fn lock(&self) -> MutexGuard<'_, Value> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

thread_local! {
    static VISITING: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
}

/// Marks a cell as on the current thread's visit path until dropped
struct VisitGuard(usize);

impl VisitGuard {
    fn enter(cell: &Shared) -> Option<Self> {
        let key = Arc::as_ptr(&cell.0) as usize;
        VISITING.with(|visiting| {
            let mut visiting = visiting.borrow_mut();
            if visiting.contains(&key) {
                return None;
            }
            visiting.push(key);
            Some(VisitGuard(key))
        })
    }
}

impl Drop for VisitGuard {
    fn drop(&mut self) {
        VISITING.with(|visiting| visiting.borrow_mut().retain(|&k| k != self.0));
    }
}

/// Cells nested inside themselves serialize as the string `"<cycle>"`
impl Serialize for Shared {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match VisitGuard::enter(self) {
            Some(_guard) => self.get().serialize(serializer),
            None => serializer.serialize_str("<cycle>"),
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Unit
    }
}

fn serialize_class<S: Serializer>(class: &Arc<Class>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(class.name())
}

fn serialize_instance<S: Serializer>(
    instance: &Arc<Instance>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&format_args!("<{} #{}>", instance.class().name(), instance.id()))
}

fn serialize_function<S: Serializer>(
    function: &Function,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(function.name())
}

// From implementations for primitive types
impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Unit
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::S64(v.into())
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::S64(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::U64(v.into())
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::U64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::F64(v)
    }
}

impl From<char> for Value {
    fn from(v: char) -> Self {
        Value::Char(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

impl From<Shared> for Value {
    fn from(v: Shared) -> Self {
        Value::Shared(v)
    }
}

impl From<Arc<Class>> for Value {
    fn from(v: Arc<Class>) -> Self {
        Value::Class(v)
    }
}

impl From<Arc<Instance>> for Value {
    fn from(v: Arc<Instance>) -> Self {
        Value::Instance(v)
    }
}

impl From<Function> for Value {
    fn from(v: Function) -> Self {
        Value::Function(v)
    }
}
