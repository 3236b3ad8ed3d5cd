//! Call reports

use crate::value::{Args, Value};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Record of a single intercepted invocation.
///
/// Arguments are captured as passed: plain values are cloned, while
/// [`Value::Shared`] cells and object references keep pointing at the live
/// objects.
#[derive(Debug, Clone, Serialize)]
pub struct CallReport {
    /// Name the wrapped member was installed under
    pub function_name: String,
    /// Positional arguments, including any bound receiver
    pub function_args: Vec<Value>,
    /// Keyword arguments
    pub function_kwargs: HashMap<String, Value>,
    /// Process-wide creation order.
    ///
    /// Taken when the report is built, just before it is pushed. Reports
    /// from different threads may reach a sink in a different order than
    /// their sequence numbers; reports from one thread never do.
    pub sequence: u64,
    pub timestamp: SystemTime,
    /// Name of the calling thread, if it has one
    pub thread: Option<String>,
}

impl CallReport {
    pub fn new(function_name: impl Into<String>, args: &Args) -> Self {
        Self {
            function_name: function_name.into(),
            function_args: args.positional.clone(),
            function_kwargs: args.keyword.clone(),
            sequence: SEQUENCE.fetch_add(1, Ordering::Relaxed),
            timestamp: SystemTime::now(),
            thread: std::thread::current().name().map(str::to_string),
        }
    }

    /// The arguments as they were received
    pub fn args(&self) -> Args {
        Args {
            positional: self.function_args.clone(),
            keyword: self.function_kwargs.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intercept::{EventSink, Logbook};
    use crate::value::Shared;

    #[test]
    fn test_report_captures_arguments() {
        let args = Args::new().arg("Reyes").arg(78).kwarg("flag", true);
        let report = CallReport::new("my_fun", &args);
        assert_eq!(report.function_name, "my_fun");
        assert_eq!(report.function_args, vec![Value::from("Reyes"), Value::S64(78)]);
        assert_eq!(report.function_kwargs.get("flag"), Some(&Value::Bool(true)));
        assert_eq!(report.args(), args);
    }

    #[test]
    fn test_sequence_increases() {
        let first = CallReport::new("f", &Args::new());
        let second = CallReport::new("f", &Args::new());
        assert!(second.sequence > first.sequence);
    }

    #[test]
    fn test_sequence_is_taken_at_creation() {
        let logbook = Logbook::new();
        let early = CallReport::new("early", &Args::new());
        let late = CallReport::new("late", &Args::new());
        logbook.push(late);
        logbook.push(early);

        let drained = logbook.drain();
        assert_eq!(drained[0].function_name, "late");
        assert!(drained[0].sequence > drained[1].sequence);
    }

    #[test]
    fn test_shared_arguments_are_live() {
        let cell = Shared::new(1);
        let report = CallReport::new("f", &Args::new().arg(cell.clone()));
        cell.set(2);
        let captured = report.function_args[0].as_shared().unwrap();
        assert_eq!(captured.get(), Value::S64(2));
    }
}
