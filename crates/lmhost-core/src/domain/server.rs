//! Server lifecycle state machine.
//!
//! The supervisor never assigns a status directly; every change goes
//! through [`ServerStatus::apply`], which makes the set of legal moves
//! explicit and testable without spawning anything.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle status of the managed inference server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    #[default]
    Stopped,
    Starting,
    Running,
    Stopping,
}

/// Events that drive [`ServerStatus`] transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerTransition {
    /// A caller asked for a running server and no start is in flight.
    StartRequested,
    /// The liveness endpoint answered (spawned or adopted server).
    BecameReady,
    /// Startup gave up (timeout, spawn error, early exit).
    StartFailed,
    /// A caller asked to stop a running server.
    StopRequested,
    /// The stop sequence finished.
    StopCompleted,
    /// The OS reported that the owned process exited, or an adopted
    /// external server stopped answering.
    Exited { code: Option<i32> },
}

/// A transition that is not legal from the current status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid server transition {transition:?} from {from:?}")]
pub struct TransitionError {
    pub from: ServerStatus,
    pub transition: ServerTransition,
}

impl ServerStatus {
    /// Compute the status that follows `transition`.
    ///
    /// `Exited` while starting or stopping leaves the status unchanged: the
    /// task that owns the start or stop sequence observes the exit and
    /// finishes the sequence itself. `Exited` while already stopped is a
    /// stale notification and is ignored.
    pub const fn apply(self, transition: ServerTransition) -> Result<Self, TransitionError> {
        use ServerStatus::{Running, Starting, Stopped, Stopping};
        use ServerTransition::{
            BecameReady, Exited, StartFailed, StartRequested, StopCompleted, StopRequested,
        };

        let next = match (self, transition) {
            (Stopped, StartRequested) => Starting,
            (Starting, BecameReady) => Running,
            (Starting, StartFailed) => Stopped,
            (Running, StopRequested) => Stopping,
            (Stopping, StopCompleted) => Stopped,
            (Running, Exited { .. }) => Stopped,
            (Starting | Stopping | Stopped, Exited { .. }) => self,
            (from, transition) => return Err(TransitionError { from, transition }),
        };
        Ok(next)
    }

    pub const fn is_running(self) -> bool {
        matches!(self, Self::Running)
    }
}

impl std::fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Stopped => "stopped",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
        };
        f.write_str(label)
    }
}
