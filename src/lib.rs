//! Wiretap: non-invasive call interception
//!
//! Replace a function in a namespace, or a method on a class, with a
//! transparent proxy that records every call to an observer-supplied sink
//! and then forwards it unchanged.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │               wiretap                   │
//! │                                         │
//! │  intercept - Interceptor, reports, sink │
//! │  runtime   - Namespaces, classes, calls │
//! │  value     - Values, args, signatures   │
//! │                                         │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Method kinds
//!
//! Class members keep their binding after wiretapping:
//!
//! - instance methods still receive the instance when called through one,
//!   and still fail without a receiver when called through the class
//! - static methods never receive a receiver
//! - class methods always receive the class they were accessed through

pub mod intercept;
pub mod runtime;
pub mod value;

pub use intercept::{
    wiretap_class_method, wiretap_function, CallReport, EventSink, FunctionAttachment, Logbook,
    MethodAttachment, WiretapError,
};
pub use runtime::{CallError, Class, Function, Instance, MethodKind, Namespace};
pub use value::{Args, Signature, Value};
