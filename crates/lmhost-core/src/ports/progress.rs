//! Progress reporting port.
//!
//! Long-running operations (binary download, model install) report a
//! message and an optional percentage. CLI and GUI adapters render these;
//! headless hosts use [`NoopProgress`].

/// Sink for progress updates during long-running operations.
pub trait ProgressReporter: Send + Sync {
    /// Report the current phase and, when known, a percentage in `0..=100`.
    fn report(&self, message: &str, percent: Option<u8>);

    /// Called when the operation completes successfully.
    fn finish(&self, _message: &str) {}

    /// Called when the operation fails or is cancelled.
    fn finish_with_error(&self, _message: &str) {}
}

/// A no-op progress reporter that ignores all updates.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn report(&self, _message: &str, _percent: Option<u8>) {}
}
