//! Server process management.
//!
//! - [`supervisor`] - start/stop state machine for the single managed server
//! - [`health`] - liveness probe and bounded poll loop
//! - [`shutdown`] - SIGTERM → SIGKILL escalation
//! - [`stream`] - stdout/stderr capture

pub mod health;
mod shutdown;
mod stream;
pub mod supervisor;

pub use health::{HealthPolicy, LivenessFailure, list_server_models, probe_liveness, wait_for_liveness};
pub use shutdown::shutdown_child;
pub use supervisor::{HOST_ENV, MODELS_ENV, ProcessSupervisor, SupervisorConfig};
