//! Call arguments and parameter binding
//!
//! [`Args`] is what a caller passes; [`Signature`] is what a callable
//! declares. Binding one against the other produces [`Bound`] arguments or
//! the same binding errors regardless of whether the callable is wrapped.

use super::Value;
use crate::runtime::CallError;
use std::collections::HashMap;

/// Positional and keyword arguments of a single call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    pub positional: Vec<Value>,
    pub keyword: HashMap<String, Value>,
}

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a positional argument
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Set a keyword argument
    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.keyword.insert(name.into(), value.into());
        self
    }

    /// Prepend an implicit receiver, as method binding does
    pub fn with_receiver(mut self, receiver: Value) -> Self {
        self.positional.insert(0, receiver);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.keyword.is_empty()
    }
}

impl<T: Into<Value>> FromIterator<T> for Args {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            positional: iter.into_iter().map(Into::into).collect(),
            keyword: HashMap::new(),
        }
    }
}

/// A declared parameter
#[derive(Debug, Clone)]
struct Param {
    name: String,
    default: Option<Value>,
    /// Only assignable by keyword (declared after `*args`)
    keyword_only: bool,
}

/// The calling convention of a callable.
///
/// Parameters are filled from positional arguments first, then by keyword.
/// Leftovers go to the `*args` / `**kwargs` catch-alls when declared and
/// are an error otherwise.
#[derive(Debug, Clone, Default)]
pub struct Signature {
    params: Vec<Param>,
    var_positional: Option<String>,
    var_keyword: Option<String>,
}

impl Signature {
    /// A signature with no parameters
    pub fn new() -> Self {
        Self::default()
    }

    /// `(*args, **kwargs)`: accepts anything
    pub fn variadic() -> Self {
        Self::new().var_args("args").var_kwargs("kwargs")
    }

    /// Add a required positional-or-keyword parameter
    pub fn param(mut self, name: impl Into<String>) -> Self {
        self.params.push(Param {
            name: name.into(),
            default: None,
            keyword_only: false,
        });
        self
    }

    /// Add a positional-or-keyword parameter with a default
    pub fn param_default(mut self, name: impl Into<String>, default: impl Into<Value>) -> Self {
        self.params.push(Param {
            name: name.into(),
            default: Some(default.into()),
            keyword_only: false,
        });
        self
    }

    /// Add a keyword-only parameter, optionally with a default
    pub fn keyword_only(mut self, name: impl Into<String>, default: Option<Value>) -> Self {
        self.params.push(Param {
            name: name.into(),
            default,
            keyword_only: true,
        });
        self
    }

    pub fn var_args(mut self, name: impl Into<String>) -> Self {
        self.var_positional = Some(name.into());
        self
    }

    pub fn var_kwargs(mut self, name: impl Into<String>) -> Self {
        self.var_keyword = Some(name.into());
        self
    }

    /// Bind call arguments to this signature
    pub fn bind(&self, function: &str, args: Args) -> Result<Bound, CallError> {
        let mut slots: Vec<Option<Value>> = vec![None; self.params.len()];
        let positional_slots: Vec<usize> = self
            .params
            .iter()
            .enumerate()
            .filter(|(_, p)| !p.keyword_only)
            .map(|(i, _)| i)
            .collect();

        let given = args.positional.len();
        let mut rest = Vec::new();
        for (index, value) in args.positional.into_iter().enumerate() {
            match positional_slots.get(index) {
                Some(&slot) => slots[slot] = Some(value),
                None if self.var_positional.is_some() => rest.push(value),
                None => {
                    return Err(CallError::TooManyArguments {
                        function: function.to_string(),
                        expected: positional_slots.len(),
                        given,
                    })
                }
            }
        }

        let mut extra = HashMap::new();
        for (name, value) in args.keyword {
            match self.params.iter().position(|p| p.name == name) {
                Some(slot) if slots[slot].is_some() => {
                    return Err(CallError::DuplicateArgument {
                        function: function.to_string(),
                        parameter: name,
                    })
                }
                Some(slot) => slots[slot] = Some(value),
                None if self.var_keyword.is_some() => {
                    extra.insert(name, value);
                }
                None => {
                    return Err(CallError::UnexpectedKeyword {
                        function: function.to_string(),
                        keyword: name,
                    })
                }
            }
        }

        let mut values = Vec::with_capacity(self.params.len());
        for (param, slot) in self.params.iter().zip(slots) {
            let value = match (slot, &param.default) {
                (Some(value), _) => value,
                (None, Some(default)) => default.clone(),
                (None, None) => {
                    return Err(CallError::MissingArgument {
                        function: function.to_string(),
                        parameter: param.name.clone(),
                    })
                }
            };
            values.push((param.name.clone(), value));
        }

        Ok(Bound {
            function: function.to_string(),
            values,
            rest,
            extra,
        })
    }
}

/// Arguments after binding against a [`Signature`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bound {
    function: String,
    values: Vec<(String, Value)>,
    rest: Vec<Value>,
    extra: HashMap<String, Value>,
}

impl Bound {
    /// Value of a declared parameter
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Value of a declared parameter, or `MissingArgument` naming it
    pub fn require(&self, name: &str) -> Result<&Value, CallError> {
        self.get(name).ok_or_else(|| CallError::MissingArgument {
            function: self.function.clone(),
            parameter: name.to_string(),
        })
    }

    /// Positional arguments collected by `*args`
    pub fn rest(&self) -> &[Value] {
        &self.rest
    }

    /// Keyword arguments collected by `**kwargs`
    pub fn extra(&self) -> &HashMap<String, Value> {
        &self.extra
    }

    /// Reassemble call arguments: declared parameters positionally, then
    /// `*args`, with `**kwargs` as keywords.
    ///
    /// Exact for [`Signature::variadic`], where nothing is declared.
    pub fn into_args(self) -> Args {
        let mut positional: Vec<Value> = self.values.into_iter().map(|(_, v)| v).collect();
        positional.extend(self.rest);
        Args {
            positional,
            keyword: self.extra,
        }
    }
}
