//! Streamed model pull against the running server.

use lmhost_core::ports::ProgressReporter;
use lmhost_core::{DownloadProgress, InstallError};
use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::{PULL_PATH, PullEvent, PullRequest};
use crate::ndjson::{NdjsonError, StreamStep, decode_ndjson, next_step};

/// When a pull stream that ends without an error counts as complete.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PullPolicy {
    /// The last reported percentage must be strictly above this.
    pub completion_threshold: f64,
}

impl Default for PullPolicy {
    fn default() -> Self {
        Self {
            completion_threshold: 50.0,
        }
    }
}

impl PullPolicy {
    pub fn is_complete(&self, last_percent: Option<u8>) -> bool {
        last_percent.is_some_and(|p| f64::from(p) > self.completion_threshold)
    }
}

/// Pull `model` through the server at `base_url`.
///
/// Returns once the stream ends past the completion threshold.
pub async fn pull_model(
    client: &Client,
    base_url: &str,
    model: &str,
    policy: PullPolicy,
    progress: &dyn ProgressReporter,
    cancel: &CancellationToken,
) -> Result<(), InstallError> {
    let url = format!("{base_url}{PULL_PATH}");
    info!(model, "Pulling model from {}", url);

    let request = client.post(&url).json(&PullRequest {
        name: model,
        stream: true,
        insecure: false,
    });
    let response = tokio::select! {
        biased;
        () = cancel.cancelled() => return Err(InstallError::DownloadCancelled),
        response = request.send() => response,
    };
    let response = response
        .map_err(|e| InstallError::download_failed(format!("pull request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(InstallError::DownloadFailed {
            message: format!("server returned {status}: {}", body.trim()),
            status_code: Some(status.as_u16()),
        });
    }

    let mut events = Box::pin(decode_ndjson::<PullEvent, _, _>(response.bytes_stream()));
    let mut last_percent = None;

    loop {
        let event = match next_step(&mut events, Some(cancel)).await {
            StreamStep::Item(Ok(event)) => event,
            StreamStep::Item(Err(NdjsonError::Decode { line, message })) => {
                debug!(%line, %message, "Skipping malformed pull event");
                continue;
            }
            StreamStep::Item(Err(NdjsonError::Transport(message))) => {
                return Err(InstallError::download_failed(message));
            }
            StreamStep::End => break,
            StreamStep::Cancelled => {
                info!(model, "Pull cancelled");
                return Err(InstallError::DownloadCancelled);
            }
        };

        if let Some(error) = event.error {
            return Err(InstallError::download_failed(error));
        }

        let update = DownloadProgress::new(event.completed, event.total, event.status);
        if let Some(percent) = update.percent() {
            last_percent = Some(percent);
        }
        progress.report(&update.message(), update.percent());
    }

    if policy.is_complete(last_percent) {
        info!(model, percent = ?last_percent, "Pull finished");
        Ok(())
    } else {
        warn!(model, percent = ?last_percent, "Pull stream ended before completion");
        Err(InstallError::DownloadIncomplete {
            percent: last_percent,
        })
    }
}
