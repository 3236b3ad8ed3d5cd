//! Call Interceptor
//!
//! Wraps a callable so that every invocation is recorded to an
//! [`EventSink`] before being forwarded to the original.
//!
//! # Ordering
//!
//! The report is pushed before the original runs, so a report exists even
//! for calls that fail. Reports from one thread reach the sink in call order.
//!
//! # Transparency
//!
//! The wrapper accepts any arguments and forwards them verbatim. The
//! original's return value or error is handed back untouched, including
//! binding errors raised by the original's own signature.

use super::{CallReport, EventSink};
use crate::runtime::{CallError, Function};
use crate::value::{Args, Value};
use std::sync::Arc;

/// Records and forwards calls to an original function
#[derive(Clone)]
pub struct Interceptor {
    name: String,
    original: Function,
    sink: Arc<dyn EventSink>,
}

impl Interceptor {
    pub fn new(name: impl Into<String>, original: Function, sink: Arc<dyn EventSink>) -> Self {
        Self {
            name: name.into(),
            original,
            sink,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn original(&self) -> &Function {
        &self.original
    }

    /// Record one call, then forward it
    pub fn intercept(&self, args: Args) -> Result<Value, CallError> {
        let report = CallReport::new(&self.name, &args);
        tracing::trace!(
            function = %self.name,
            sequence = report.sequence,
            positional = args.positional.len(),
            keyword = args.keyword.len(),
            "intercepted call"
        );
        self.sink.push(report);
        self.original.call(args)
    }

    /// Turn this interceptor into a drop-in replacement for the original
    pub fn into_function(self) -> Function {
        let name = self.name.clone();
        let original = self.original.clone();
        Function::wrapping(name, original, move |args| self.intercept(args))
    }
}

/// Wrap `original` so that each call pushes a [`CallReport`] named `name`
/// to `sink` before forwarding.
pub fn intercept(name: impl Into<String>, original: Function, sink: Arc<dyn EventSink>) -> Function {
    Interceptor::new(name, original, sink).into_function()
}
