//! Download progress derived from server pull events.

use serde::{Deserialize, Serialize};

/// Progress of a single streamed pull.
///
/// Built from one progress event at a time. Byte counters are absent until
/// the server first reports them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadProgress {
    pub completed_bytes: Option<u64>,
    pub total_bytes: Option<u64>,
    /// Phase label emitted by the server ("pulling manifest", "verifying sha256 digest", ...).
    pub status: Option<String>,
}

impl DownloadProgress {
    pub fn new(completed: Option<u64>, total: Option<u64>, status: Option<String>) -> Self {
        Self {
            completed_bytes: completed,
            total_bytes: total,
            status,
        }
    }

    /// Rounded percentage, present only when both counters are known and
    /// the total is non-zero.
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn percent(&self) -> Option<u8> {
        match (self.completed_bytes, self.total_bytes) {
            (Some(completed), Some(total)) if total > 0 => {
                let pct = (completed as f64 / total as f64 * 100.0).round();
                Some(pct.clamp(0.0, 100.0) as u8)
            }
            _ => None,
        }
    }

    /// Human-readable line for progress sinks.
    pub fn message(&self) -> String {
        let status = self.status.as_deref().unwrap_or("downloading");
        match self.percent() {
            Some(pct) => format!("{status} ({pct}%)"),
            None => status.to_string(),
        }
    }
}
