//! Classes, instances and method binding
//!
//! Members are stored with a [`MethodKind`] marker that decides how they
//! bind when looked up:
//!
//! | Kind       | Via class              | Via instance             |
//! |------------|------------------------|--------------------------|
//! | `Instance` | unbound, no receiver   | instance prepended       |
//! | `Static`   | no receiver            | no receiver              |
//! | `Class`    | accessing class first  | instance's class first   |
//!
//! Instances hold no copies of their class's methods. Every lookup goes
//! through the class, so members replaced after an instance was created are
//! seen by that instance.

use super::{Attribute, CallError, Function};
use crate::value::{Args, Value};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// The implicit receiver a method is called with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MethodKind {
    /// Receives the instance (`self`)
    Instance,
    /// Receives nothing
    Static,
    /// Receives the class (`cls`)
    Class,
}

impl fmt::Display for MethodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodKind::Instance => write!(f, "instance method"),
            MethodKind::Static => write!(f, "static method"),
            MethodKind::Class => write!(f, "class method"),
        }
    }
}

/// A class member: a function tagged with its binding kind, or a plain value
#[derive(Debug, Clone)]
pub enum Member {
    Method(Function),
    StaticMethod(Function),
    ClassMethod(Function),
    Value(Value),
}

impl Member {
    /// Tag `function` with the marker for `kind`
    pub fn with_kind(kind: MethodKind, function: Function) -> Self {
        match kind {
            MethodKind::Instance => Member::Method(function),
            MethodKind::Static => Member::StaticMethod(function),
            MethodKind::Class => Member::ClassMethod(function),
        }
    }

    pub fn kind(&self) -> Option<MethodKind> {
        match self {
            Member::Method(_) => Some(MethodKind::Instance),
            Member::StaticMethod(_) => Some(MethodKind::Static),
            Member::ClassMethod(_) => Some(MethodKind::Class),
            Member::Value(_) => None,
        }
    }

    /// The underlying function, without any binding applied
    pub fn function(&self) -> Option<&Function> {
        match self {
            Member::Method(f) | Member::StaticMethod(f) | Member::ClassMethod(f) => Some(f),
            Member::Value(_) => None,
        }
    }
}

/// A class: named members plus an optional base class to inherit from
pub struct Class {
    name: String,
    base: Option<Arc<Class>>,
    members: RwLock<HashMap<String, Member>>,
}

impl Class {
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            base: None,
            members: RwLock::new(HashMap::new()),
        })
    }

    /// Create a class inheriting from `base`
    pub fn subclass(name: impl Into<String>, base: &Arc<Class>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            base: Some(Arc::clone(base)),
            members: RwLock::new(HashMap::new()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base(&self) -> Option<&Arc<Class>> {
        self.base.as_ref()
    }

    /// Define an instance method under the function's name
    pub fn method(&self, function: Function) -> &Self {
        self.define(MethodKind::Instance, function)
    }

    /// Define a static method under the function's name
    pub fn static_method(&self, function: Function) -> &Self {
        self.define(MethodKind::Static, function)
    }

    /// Define a class method under the function's name
    pub fn class_method(&self, function: Function) -> &Self {
        self.define(MethodKind::Class, function)
    }

    fn define(&self, kind: MethodKind, function: Function) -> &Self {
        self.set_member(function.name().to_string(), Member::with_kind(kind, function));
        self
    }

    /// Set a member on this class, returning the one it replaced
    pub fn set_member(&self, name: impl Into<String>, member: Member) -> Option<Member> {
        self.members
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), member)
    }

    /// Member defined directly on this class
    pub fn own_member(&self, name: &str) -> Option<Member> {
        self.members
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Member defined on this class or the nearest base that has it
    pub fn lookup(&self, name: &str) -> Option<Member> {
        let mut class = Some(self);
        while let Some(current) = class {
            if let Some(member) = current.own_member(name) {
                return Some(member);
            }
            class = current.base.as_deref();
        }
        None
    }

    /// `Class.name`: look up and bind a member accessed through the class
    pub fn attribute(self: &Arc<Self>, name: &str) -> Result<Attribute, CallError> {
        let member = self.lookup(name).ok_or_else(|| CallError::AttributeNotFound {
            owner: self.name.clone(),
            name: name.to_string(),
        })?;
        Ok(match member {
            Member::Method(f) | Member::StaticMethod(f) => Attribute::Function(f),
            Member::ClassMethod(f) => Attribute::Function(f.bind(Value::Class(Arc::clone(self)))),
            Member::Value(v) => Attribute::Value(v),
        })
    }

    /// `Class.name(args)`
    pub fn call_method(self: &Arc<Self>, name: &str, args: Args) -> Result<Value, CallError> {
        callable(&self.name, name, self.attribute(name)?)?.call(args)
    }

    /// Create a new, empty instance
    pub fn instantiate(self: &Arc<Self>) -> Arc<Instance> {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        Arc::new(Instance {
            class: Arc::clone(self),
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            fields: RwLock::new(HashMap::new()),
        })
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Class")
            .field("name", &self.name)
            .field("base", &self.base.as_ref().map(|b| b.name()))
            .finish()
    }
}

/// An object of some class, with its own field map
pub struct Instance {
    class: Arc<Class>,
    id: u64,
    fields: RwLock<HashMap<String, Value>>,
}

impl Instance {
    pub fn class(&self) -> &Arc<Class> {
        &self.class
    }

    /// Process-unique identity
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn get_field(&self, name: &str) -> Option<Value> {
        self.fields
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub fn set_field(&self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), value.into())
    }

    /// `instance.name`: fields shadow class members; methods are bound
    pub fn attribute(self: &Arc<Self>, name: &str) -> Result<Attribute, CallError> {
        if let Some(value) = self.get_field(name) {
            return Ok(Attribute::Value(value));
        }
        let member = self
            .class
            .lookup(name)
            .ok_or_else(|| CallError::AttributeNotFound {
                owner: self.class.name.clone(),
                name: name.to_string(),
            })?;
        Ok(match member {
            Member::Method(f) => Attribute::Function(f.bind(Value::Instance(Arc::clone(self)))),
            Member::StaticMethod(f) => Attribute::Function(f),
            Member::ClassMethod(f) => {
                Attribute::Function(f.bind(Value::Class(Arc::clone(&self.class))))
            }
            Member::Value(v) => Attribute::Value(v),
        })
    }

    /// `instance.name(args)`
    pub fn call_method(self: &Arc<Self>, name: &str, args: Args) -> Result<Value, CallError> {
        callable(&self.class.name, name, self.attribute(name)?)?.call(args)
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("class", &self.class.name)
            .field("id", &self.id)
            .finish()
    }
}

fn callable(owner: &str, name: &str, attribute: Attribute) -> Result<Function, CallError> {
    attribute
        .as_function()
        .cloned()
        .ok_or_else(|| CallError::NotCallable {
            owner: owner.to_string(),
            name: name.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Signature;

    /// Returns `(receiver or unit, rest)`
    fn probe(name: &str, receiver: Option<&str>) -> Function {
        match receiver {
            Some(param) => {
                let param = param.to_string();
                Function::new(name, Signature::new().param(param.clone()).var_args("a"), move |b| {
                    Ok(Value::Tuple(vec![
                        b.require(&param)?.clone(),
                        Value::List(b.rest().to_vec()),
                    ]))
                })
            }
            None => Function::new(name, Signature::new().var_args("a"), |b| {
                Ok(Value::Tuple(vec![Value::Unit, Value::List(b.rest().to_vec())]))
            }),
        }
    }

    fn testing_class() -> Arc<Class> {
        let class = Class::new("TestingClass");
        class
            .method(probe("normal_method", Some("self")))
            .static_method(probe("static_method", None))
            .class_method(probe("class_method", Some("cls")));
        class
    }

    #[test]
    fn test_instance_method_binds_instance() {
        let class = testing_class();
        let obj = class.instantiate();
        let result = obj.call_method("normal_method", Args::new().arg(1)).unwrap();
        assert_eq!(
            result,
            Value::Tuple(vec![Value::Instance(obj.clone()), Value::List(vec![Value::S64(1)])])
        );
    }

    #[test]
    fn test_instance_method_via_class_needs_receiver() {
        let class = testing_class();
        let err = class.call_method("normal_method", Args::new()).unwrap_err();
        assert_eq!(
            err,
            CallError::MissingArgument {
                function: "normal_method".into(),
                parameter: "self".into()
            }
        );

        let obj = class.instantiate();
        let explicit = class
            .call_method("normal_method", Args::new().arg(obj.clone()))
            .unwrap();
        assert_eq!(
            explicit,
            Value::Tuple(vec![Value::Instance(obj), Value::List(vec![])])
        );
    }

    #[test]
    fn test_static_method_gets_no_receiver() {
        let class = testing_class();
        let expected = Value::Tuple(vec![Value::Unit, Value::List(vec![Value::S64(7)])]);
        assert_eq!(
            class.call_method("static_method", Args::new().arg(7)).unwrap(),
            expected
        );
        assert_eq!(
            class
                .instantiate()
                .call_method("static_method", Args::new().arg(7))
                .unwrap(),
            expected
        );
    }

    #[test]
    fn test_class_method_receives_accessing_class() {
        let base = testing_class();
        let derived = Class::subclass("Derived", &base);

        let via_base = base.call_method("class_method", Args::new()).unwrap();
        let via_derived = derived.call_method("class_method", Args::new()).unwrap();
        let via_instance = derived
            .instantiate()
            .call_method("class_method", Args::new())
            .unwrap();

        assert_eq!(via_base, Value::Tuple(vec![Value::Class(base), Value::List(vec![])]));
        assert_eq!(
            via_derived,
            Value::Tuple(vec![Value::Class(derived.clone()), Value::List(vec![])])
        );
        assert_eq!(
            via_instance,
            Value::Tuple(vec![Value::Class(derived), Value::List(vec![])])
        );
    }

    #[test]
    fn test_fields_shadow_methods() {
        let obj = testing_class().instantiate();
        obj.set_field("normal_method", 3);
        assert!(matches!(
            obj.call_method("normal_method", Args::new()),
            Err(CallError::NotCallable { .. })
        ));
    }

    #[test]
    fn test_subclass_relationship() {
        let base = testing_class();
        let derived = Class::subclass("Derived", &base);
        assert!(Arc::ptr_eq(derived.base().unwrap(), &base));
        assert!(derived.lookup("static_method").is_some());
        assert!(derived.own_member("static_method").is_none());
    }
}
