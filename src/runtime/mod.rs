//! Object Runtime
//!
//! The mutable object model that wiretaps operate on: callables, module-like
//! namespaces, and classes with instance, static and class methods.

mod class;
mod function;
mod namespace;

pub use class::{Class, Instance, Member, MethodKind};
pub use function::{Function, NativeFn};
pub use namespace::{Attribute, Namespace};

use thiserror::Error;

/// Errors raised while calling into the runtime.
///
/// A wiretap never creates, swallows or rewraps these: whatever the original
/// callable returns reaches the caller unchanged.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CallError {
    #[error("{function}() missing required argument: '{parameter}'")]
    MissingArgument { function: String, parameter: String },

    #[error("{function}() takes {expected} positional arguments but {given} were given")]
    TooManyArguments {
        function: String,
        expected: usize,
        given: usize,
    },

    #[error("{function}() got an unexpected keyword argument '{keyword}'")]
    UnexpectedKeyword { function: String, keyword: String },

    #[error("{function}() got multiple values for argument '{parameter}'")]
    DuplicateArgument { function: String, parameter: String },

    #[error("'{owner}' has no attribute '{name}'")]
    AttributeNotFound { owner: String, name: String },

    #[error("'{owner}.{name}' is not callable")]
    NotCallable { owner: String, name: String },

    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },

    /// An error raised by a function body
    #[error("{kind}: {message}")]
    Raised { kind: String, message: String },
}

impl CallError {
    /// Raise an application error of the given kind
    pub fn raise(kind: impl Into<String>, message: impl Into<String>) -> Self {
        CallError::Raised {
            kind: kind.into(),
            message: message.into(),
        }
    }
}
