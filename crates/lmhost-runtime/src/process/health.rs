//! Liveness probing for the managed server.
//!
//! The server has no dedicated health route; `GET /api/tags` answering
//! 200 is the readiness signal.

use std::time::Duration;

use reqwest::Client;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::api::{TAGS_PATH, TagEntry, TagsResponse};

/// Bounded retry policy for the health-poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthPolicy {
    /// Attempt ceiling before giving up.
    pub max_attempts: u32,
    /// Wait before each attempt.
    pub interval: Duration,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl Default for HealthPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 15,
            interval: Duration::from_secs(1),
            request_timeout: Duration::from_secs(2),
        }
    }
}

impl HealthPolicy {
    /// Worst-case time spent waiting between attempts.
    pub fn total_wait(&self) -> Duration {
        self.interval * self.max_attempts
    }
}

/// Why the health-poll loop stopped without success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LivenessFailure {
    /// The attempt ceiling was reached.
    Exhausted {
        attempts: u32,
        last_error: Option<String>,
    },
    /// The watched process exited first.
    ProcessExited {
        code: Option<i32>,
        last_error: Option<String>,
    },
}

/// Issue a single liveness request.
///
/// Returns `Ok(())` on HTTP 200 and a short description of what went
/// wrong otherwise.
pub async fn probe_liveness(client: &Client, base_url: &str, timeout: Duration) -> Result<(), String> {
    let url = format!("{base_url}{TAGS_PATH}");
    match client.get(&url).timeout(timeout).send().await {
        Ok(response) if response.status().is_success() => Ok(()),
        Ok(response) => Err(format!("{url} returned {}", response.status())),
        Err(e) => Err(e.to_string()),
    }
}

/// Models the server currently has in its store, from `GET /api/tags`.
pub async fn list_server_models(
    client: &Client,
    base_url: &str,
    timeout: Duration,
) -> Result<Vec<TagEntry>, String> {
    let url = format!("{base_url}{TAGS_PATH}");
    let response = client
        .get(&url)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| e.to_string())?;
    if !response.status().is_success() {
        return Err(format!("{url} returned {}", response.status()));
    }
    let tags: TagsResponse = response.json().await.map_err(|e| e.to_string())?;
    Ok(tags.models)
}

/// Poll the liveness endpoint until it answers, the attempt ceiling is
/// reached, or `exit_rx` reports that the process died.
///
/// Each attempt waits `policy.interval` first, so a process that never
/// opens its port is given up on after `max_attempts * interval`.
pub async fn wait_for_liveness(
    client: &Client,
    base_url: &str,
    policy: HealthPolicy,
    mut exit_rx: Option<watch::Receiver<Option<Option<i32>>>>,
) -> Result<u32, LivenessFailure> {
    info!("Waiting for server to be ready at {}", base_url);
    let mut last_error = None;

    for attempt in 1..=policy.max_attempts {
        sleep(policy.interval).await;

        if let Some(rx) = exit_rx.as_mut() {
            if let Some(code) = *rx.borrow_and_update() {
                return Err(LivenessFailure::ProcessExited { code, last_error });
            }
        }

        match probe_liveness(client, base_url, policy.request_timeout).await {
            Ok(()) => {
                info!(attempt, "Server is ready at {}", base_url);
                return Ok(attempt);
            }
            Err(e) => {
                debug!(attempt, max = policy.max_attempts, "Health check failed: {}, retrying...", e);
                last_error = Some(e);
            }
        }
    }

    Err(LivenessFailure::Exhausted {
        attempts: policy.max_attempts,
        last_error,
    })
}
