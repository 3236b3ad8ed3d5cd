//! Callables
//!
//! A [`Function`] is a named native body behind an `Arc`, so installing it
//! in several places, or keeping the original around after it has been
//! replaced, is a cheap handle clone.

use super::CallError;
use crate::value::{Args, Bound, Signature, Value};
use std::fmt;
use std::sync::Arc;

/// Native body of a [`Function`]
pub type NativeFn = dyn Fn(Bound) -> Result<Value, CallError> + Send + Sync;

/// A named callable with a declared [`Signature`]
#[derive(Clone)]
pub struct Function {
    inner: Arc<FunctionInner>,
}

struct FunctionInner {
    name: String,
    signature: Signature,
    body: Box<NativeFn>,
    /// The callable this one forwards to, if it is a wrapper
    wraps: Option<Function>,
}

impl Function {
    /// Create a function from a signature and a native body
    ///
    /// # Example
    ///
    /// ```
    /// use wiretap::runtime::Function;
    /// use wiretap::value::{Args, Signature, Value};
    ///
    /// let add = Function::new("add", Signature::new().param("a").param("b"), |args| {
    ///     Ok(Value::S64(args.require("a")?.as_i64()? + args.require("b")?.as_i64()?))
    /// });
    /// assert_eq!(add.call(Args::new().arg(2).arg(3)).unwrap(), Value::S64(5));
    /// ```
    pub fn new<F>(name: impl Into<String>, signature: Signature, body: F) -> Self
    where
        F: Fn(Bound) -> Result<Value, CallError> + Send + Sync + 'static,
    {
        Self::build(name.into(), signature, Box::new(body), None)
    }

    /// Create a function accepting `(*args, **kwargs)`
    pub fn variadic<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(Bound) -> Result<Value, CallError> + Send + Sync + 'static,
    {
        Self::new(name, Signature::variadic(), body)
    }

    /// Create a `(*args, **kwargs)` function that forwards to `original`.
    ///
    /// The original stays reachable through [`Function::wrapped`].
    pub fn wrapping<F>(name: impl Into<String>, original: Function, body: F) -> Self
    where
        F: Fn(Args) -> Result<Value, CallError> + Send + Sync + 'static,
    {
        Self::build(
            name.into(),
            Signature::variadic(),
            Box::new(move |bound: Bound| body(bound.into_args())),
            Some(original),
        )
    }

    fn build(
        name: String,
        signature: Signature,
        body: Box<NativeFn>,
        wraps: Option<Function>,
    ) -> Self {
        Self {
            inner: Arc::new(FunctionInner {
                name,
                signature,
                body,
                wraps,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn signature(&self) -> &Signature {
        &self.inner.signature
    }

    /// The function this wrapper forwards to
    pub fn wrapped(&self) -> Option<&Function> {
        self.inner.wraps.as_ref()
    }

    pub fn is_wrapper(&self) -> bool {
        self.inner.wraps.is_some()
    }

    /// Call the function. Binding errors are reported before the body runs.
    pub fn call(&self, args: Args) -> Result<Value, CallError> {
        let bound = self.inner.signature.bind(&self.inner.name, args)?;
        (self.inner.body)(bound)
    }

    /// Produce a bound method: every call gets `receiver` prepended to its
    /// positional arguments.
    pub fn bind(&self, receiver: Value) -> Function {
        let target = self.clone();
        Self::build(
            self.inner.name.clone(),
            Signature::variadic(),
            Box::new(move |bound: Bound| {
                target.call(bound.into_args().with_receiver(receiver.clone()))
            }),
            None,
        )
    }

    /// True if both handles refer to the same function
    pub fn ptr_eq(&self, other: &Function) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.inner.name)
            .field("wrapper", &self.is_wrapper())
            .finish()
    }
}
