//! Wiretaps
//!
//! Attach a recording [`Interceptor`] to a namespace function or a class
//! method. The slot's current callable is replaced by a wrapper that pushes
//! a [`CallReport`] to the caller's [`EventSink`] and then forwards the call.
//!
//! Interception is scoped to the slot: code that cloned the original
//! [`Function`] before attachment keeps calling it directly.
//!
//! Attachment mutates the slot once and is meant for a setup phase. Wiring
//! the same slot from several threads at once is not supported.

mod interceptor;
mod report;
mod sink;

pub use interceptor::{intercept, Interceptor};
pub use report::CallReport;
pub use sink::{EventSink, Logbook};

use crate::runtime::{Attribute, Class, Function, Member, MethodKind, Namespace};
use crate::value::Value;
use std::sync::Arc;
use thiserror::Error;

/// Errors from attaching a wiretap
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WiretapError {
    #[error("'{owner}' has no member '{member}'")]
    MemberNotFound { owner: String, member: String },

    #[error("'{owner}.{member}' is not callable")]
    NotCallable { owner: String, member: String },
}

/// A wiretap installed on a namespace slot.
///
/// Holds the original function for as long as the attachment lives.
/// Dropping it leaves the wiretap in place.
#[derive(Debug, Clone)]
pub struct FunctionAttachment {
    namespace: String,
    member: String,
    original: Function,
    interceptor: Function,
}

impl FunctionAttachment {
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn member(&self) -> &str {
        &self.member
    }

    /// The function that was in the slot before attachment
    pub fn original(&self) -> &Function {
        &self.original
    }

    /// The wrapper now in the slot
    pub fn interceptor(&self) -> &Function {
        &self.interceptor
    }
}

/// A wiretap installed on a class member
#[derive(Debug, Clone)]
pub struct MethodAttachment {
    class: Arc<Class>,
    member: String,
    kind: MethodKind,
    original: Function,
    interceptor: Function,
}

impl MethodAttachment {
    pub fn class(&self) -> &Arc<Class> {
        &self.class
    }

    pub fn member(&self) -> &str {
        &self.member
    }

    /// Binding kind detected on the original and re-applied to the wrapper
    pub fn kind(&self) -> MethodKind {
        self.kind
    }

    /// The underlying function of the original member
    pub fn original(&self) -> &Function {
        &self.original
    }

    /// The wrapper now installed on the class
    pub fn interceptor(&self) -> &Function {
        &self.interceptor
    }
}

/// Wiretap the callable attribute `member_name` of `namespace`.
///
/// Later calls through the namespace push one report to `sink` each.
///
/// # Example
///
/// ```
/// use wiretap::{wiretap_function, Logbook};
/// use wiretap::runtime::{Function, Namespace};
/// use wiretap::value::{Args, Value};
///
/// let module = Namespace::new("module");
/// module.define(Function::variadic("my_fun", |_| Ok(Value::S64(5))));
///
/// let logbook = Logbook::new();
/// wiretap_function(&module, "my_fun", logbook.clone()).unwrap();
///
/// assert_eq!(module.call("my_fun", Args::new()).unwrap(), Value::S64(5));
/// let report = logbook.try_pop().unwrap();
/// assert_eq!(report.function_name, "my_fun");
/// assert!(report.function_args.is_empty());
/// assert!(report.function_kwargs.is_empty());
/// ```
pub fn wiretap_function<S>(
    namespace: &Namespace,
    member_name: &str,
    sink: S,
) -> Result<FunctionAttachment, WiretapError>
where
    S: EventSink + 'static,
{
    let attribute = namespace
        .get_attr(member_name)
        .ok_or_else(|| WiretapError::MemberNotFound {
            owner: namespace.name().to_string(),
            member: member_name.to_string(),
        })?;
    let original = attribute
        .as_function()
        .cloned()
        .ok_or_else(|| WiretapError::NotCallable {
            owner: namespace.name().to_string(),
            member: member_name.to_string(),
        })?;
    warn_if_wrapped(namespace.name(), member_name, &original);

    let interceptor = intercept(member_name, original.clone(), Arc::new(sink));
    let replacement = match attribute {
        Attribute::Function(_) => Attribute::Function(interceptor.clone()),
        Attribute::Value(_) => Attribute::Value(Value::Function(interceptor.clone())),
    };
    namespace.set_attr(member_name, replacement);
    tracing::debug!(
        namespace = namespace.name(),
        member = member_name,
        "wiretap attached"
    );

    Ok(FunctionAttachment {
        namespace: namespace.name().to_string(),
        member: member_name.to_string(),
        original,
        interceptor,
    })
}

/// Wiretap the method `method_name` of `class`.
///
/// The member may be inherited; the wrapper is installed on `class` itself
/// and carries the same [`MethodKind`] as the original, so it binds exactly
/// as before when accessed through the class, a subclass, or an instance
/// created before or after attachment.
pub fn wiretap_class_method<S>(
    class: &Arc<Class>,
    method_name: &str,
    sink: S,
) -> Result<MethodAttachment, WiretapError>
where
    S: EventSink + 'static,
{
    let member = class
        .lookup(method_name)
        .ok_or_else(|| WiretapError::MemberNotFound {
            owner: class.name().to_string(),
            member: method_name.to_string(),
        })?;
    let (kind, original) = match (member.kind(), member.function()) {
        (Some(kind), Some(function)) => (kind, function.clone()),
        _ => {
            return Err(WiretapError::NotCallable {
                owner: class.name().to_string(),
                member: method_name.to_string(),
            })
        }
    };
    warn_if_wrapped(class.name(), method_name, &original);

    let interceptor = intercept(method_name, original.clone(), Arc::new(sink));
    class.set_member(method_name, Member::with_kind(kind, interceptor.clone()));
    tracing::debug!(
        class = class.name(),
        member = method_name,
        %kind,
        "wiretap attached"
    );

    Ok(MethodAttachment {
        class: Arc::clone(class),
        member: method_name.to_string(),
        kind,
        original,
        interceptor,
    })
}

fn warn_if_wrapped(owner: &str, member: &str, function: &Function) {
    if function.is_wrapper() {
        tracing::warn!(owner, member, "slot is already wrapped, wrapping again");
    }
}
