//! Module-like namespaces
//!
//! A [`Namespace`] is a flat, settable map of named attributes. Callers look
//! members up by name at call time, so replacing a slot changes what every
//! later lookup sees. Handles cloned out before the replacement are
//! unaffected.

use super::{CallError, Function};
use crate::value::{Args, Value};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// The value held by a namespace slot
#[derive(Debug, Clone)]
pub enum Attribute {
    Function(Function),
    Value(Value),
}

impl Attribute {
    pub fn as_function(&self) -> Option<&Function> {
        match self {
            Attribute::Function(f) => Some(f),
            Attribute::Value(Value::Function(f)) => Some(f),
            Attribute::Value(_) => None,
        }
    }

    pub fn is_callable(&self) -> bool {
        self.as_function().is_some()
    }
}

impl From<Function> for Attribute {
    fn from(f: Function) -> Self {
        Attribute::Function(f)
    }
}

impl From<Value> for Attribute {
    fn from(v: Value) -> Self {
        Attribute::Value(v)
    }
}

/// A named, module-like collection of attributes
#[derive(Debug)]
pub struct Namespace {
    name: String,
    attributes: RwLock<HashMap<String, Attribute>>,
}

impl Namespace {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: RwLock::new(HashMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Define a function under its own name
    pub fn define(&self, function: Function) -> &Self {
        self.set_attr(function.name().to_string(), function);
        self
    }

    /// Set an attribute, returning the value it replaced
    pub fn set_attr(&self, name: impl Into<String>, value: impl Into<Attribute>) -> Option<Attribute> {
        self.attributes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), value.into())
    }

    pub fn get_attr(&self, name: &str) -> Option<Attribute> {
        self.attributes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attributes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Attribute names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .attributes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Look up a callable attribute
    pub fn function(&self, name: &str) -> Result<Function, CallError> {
        let attr = self.get_attr(name).ok_or_else(|| CallError::AttributeNotFound {
            owner: self.name.clone(),
            name: name.to_string(),
        })?;
        attr.as_function()
            .cloned()
            .ok_or_else(|| CallError::NotCallable {
                owner: self.name.clone(),
                name: name.to_string(),
            })
    }

    /// Call `namespace.name(args)`.
    ///
    /// The slot is read once and the lock released before the call, so the
    /// callee may itself use the namespace.
    pub fn call(&self, name: &str, args: Args) -> Result<Value, CallError> {
        self.function(name)?.call(args)
    }
}
