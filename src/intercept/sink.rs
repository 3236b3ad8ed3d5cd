//! Event sinks
//!
//! The sink is owned by the observer. Wiretaps only push into it, possibly
//! from many threads at once.

use super::CallReport;
use std::collections::VecDeque;
use std::sync::mpsc::Sender;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Destination for call reports.
///
/// Implementations must accept concurrent pushes and keep each pusher's
/// reports in the order they were pushed.
pub trait EventSink: Send + Sync {
    /// Push a report without blocking
    fn push(&self, report: CallReport);
}

impl<S: EventSink + ?Sized> EventSink for Arc<S> {
    fn push(&self, report: CallReport) {
        (**self).push(report)
    }
}

impl<S: EventSink + ?Sized> EventSink for Box<S> {
    fn push(&self, report: CallReport) {
        (**self).push(report)
    }
}

impl EventSink for Sender<CallReport> {
    fn push(&self, report: CallReport) {
        if let Err(e) = self.send(report) {
            tracing::warn!(
                function = %e.0.function_name,
                "event sink receiver dropped, report discarded"
            );
        }
    }
}

/// An unbounded FIFO queue of call reports.
///
/// Cloning yields another handle to the same queue.
///
/// # Example
///
/// ```
/// use wiretap::{CallReport, EventSink, Logbook};
/// use wiretap::value::Args;
///
/// let logbook = Logbook::new();
/// logbook.push(CallReport::new("my_fun", &Args::new()));
/// assert_eq!(logbook.try_pop().unwrap().function_name, "my_fun");
/// assert!(logbook.is_empty());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Logbook {
    shared: Arc<LogbookShared>,
}

#[derive(Debug, Default)]
struct LogbookShared {
    queue: Mutex<VecDeque<CallReport>>,
    available: Condvar,
}

impl Logbook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pop the oldest report, if any
    pub fn try_pop(&self) -> Option<CallReport> {
        self.lock().pop_front()
    }

    /// Pop the oldest report, waiting for one to arrive
    pub fn pop(&self) -> CallReport {
        let mut queue = self.lock();
        loop {
            if let Some(report) = queue.pop_front() {
                return report;
            }
            queue = self
                .shared
                .available
                .wait(queue)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Pop the oldest report, waiting at most `timeout`.
    ///
    /// A timeout too large to represent as a deadline waits like [`pop`](Self::pop).
    pub fn pop_timeout(&self, timeout: Duration) -> Option<CallReport> {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            return Some(self.pop());
        };
        let mut queue = self.lock();
        loop {
            if let Some(report) = queue.pop_front() {
                return Some(report);
            }
            let remaining = deadline.checked_duration_since(Instant::now())?;
            let (guard, result) = self
                .shared
                .available
                .wait_timeout(queue, remaining)
                .unwrap_or_else(PoisonError::into_inner);
            queue = guard;
            if result.timed_out() && queue.is_empty() {
                return None;
            }
        }
    }

    /// Take every queued report, oldest first
    pub fn drain(&self) -> Vec<CallReport> {
        self.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<CallReport>> {
        self.shared
            .queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl EventSink for Logbook {
    fn push(&self, report: CallReport) {
        self.lock().push_back(report);
        self.shared.available.notify_one();
    }
}
