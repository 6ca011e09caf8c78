//! Port definitions: the seams between core logic and adapters.
//!
//! # Design Rules
//!
//! - Ports express intent, never a concrete UI or transport
//! - Every port has a no-op or test implementation so headless hosts work
//! - Adapters (`lmhost-runtime`, `lmhost-cli`) implement or consume these

mod executable;
mod progress;
mod server_log_sink;

pub use executable::ExecutableSource;
pub use progress::{NoopProgress, ProgressReporter};
pub use server_log_sink::{NoopLogSink, ServerLogSinkPort};
