// Run control — progress notifications and cooperative cancellation.
//
// The analyzer never yields to other work. Progress callbacks are pure
// notifications, and cancellation is a flag polled between pairs in the
// overlap engine and between recursive calls in the clique enumerator.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::normalize::DroppedRows;
use crate::error::AnalysisError;

/// Receives progress notifications from a running analysis.
///
/// Every method defaults to a no-op so sinks only implement what they show.
pub trait ProgressSink: Sync {
    /// Called once after normalization with the dropped-row summary.
    fn rows_dropped(&self, _dropped: &DroppedRows) {}

    /// Called periodically during the overlap stage.
    fn pairs_processed(&self, _done: u64, _total: u64) {}

    /// Called once after clique enumeration with the number of maximal
    /// cliques found (before the minimum-size filter).
    fn cliques_found(&self, _count: usize) {}
}

/// A sink that ignores everything.
pub struct NoProgress;

impl ProgressSink for NoProgress {}

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Per-run notification and cancellation handles.
pub struct RunControl<'a> {
    pub progress: &'a dyn ProgressSink,
    pub cancel: CancelFlag,
}

impl Default for RunControl<'static> {
    fn default() -> Self {
        Self {
            progress: &NoProgress,
            cancel: CancelFlag::new(),
        }
    }
}

impl<'a> RunControl<'a> {
    pub fn new(progress: &'a dyn ProgressSink, cancel: CancelFlag) -> Self {
        Self { progress, cancel }
    }

    /// Fail with `Cancelled` once the flag has been raised.
    pub fn check_cancelled(&self) -> Result<(), AnalysisError> {
        if self.cancel.is_cancelled() {
            Err(AnalysisError::Cancelled)
        } else {
            Ok(())
        }
    }
}
