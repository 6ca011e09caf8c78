//! Server log sink port for captured subprocess output.
//!
//! The supervised server writes diagnostics to stdout/stderr. Those lines
//! are always traced at `debug`; hosts that want to show them (an output
//! channel, a log file) provide a sink.

/// Port for appending server log lines to a sink.
///
/// Implementations should be thread-safe and non-blocking.
pub trait ServerLogSinkPort: Send + Sync {
    /// Append one line (without trailing newline) from `stream_type`
    /// (`"stdout"` or `"stderr"`).
    fn append(&self, stream_type: &str, line: String);
}

/// Sink that discards every line.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLogSink;

impl ServerLogSinkPort for NoopLogSink {
    fn append(&self, _stream_type: &str, _line: String) {}
}
