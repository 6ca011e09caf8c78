//! Text generation against the managed server.

use std::sync::Arc;
use std::time::Duration;

use lmhost_core::GenerateError;
use reqwest::Client;
use tracing::{debug, warn};

use crate::api::{GENERATE_PATH, GenerateChunk, GenerateRequest, GenerateRequestOptions};
use crate::ndjson::{NdjsonError, StreamStep, decode_ndjson, next_step};
use crate::process::ProcessSupervisor;

/// Sampling knobs and the batch-mode timeout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerateOptions {
    /// Maximum tokens to generate (`num_predict`).
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    /// Whole-request timeout for non-streaming calls.
    pub timeout: Duration,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            max_tokens: None,
            temperature: None,
            timeout: Duration::from_secs(120),
        }
    }
}

impl GenerateOptions {
    const fn request_options(&self) -> GenerateRequestOptions {
        GenerateRequestOptions {
            num_predict: self.max_tokens,
            temperature: self.temperature,
        }
    }
}

/// Notification delivered to a streaming caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationChunk<'a> {
    /// Sent once before the request goes out.
    Pending,
    /// A text fragment, in arrival order.
    Text(&'a str),
    /// The stream failed; no final text follows.
    Failed(&'a str),
}

pub struct GenerationClient {
    supervisor: Arc<ProcessSupervisor>,
    http: Client,
}

impl GenerationClient {
    pub fn new(supervisor: Arc<ProcessSupervisor>) -> Self {
        Self {
            supervisor,
            http: Client::new(),
        }
    }

    fn url(&self) -> String {
        format!("{}{GENERATE_PATH}", self.supervisor.base_url())
    }

    /// Generate a full completion in one request.
    pub async fn generate(
        &self,
        model: &str,
        prompt: &str,
        options: &GenerateOptions,
    ) -> Result<String, GenerateError> {
        self.supervisor.ensure_running().await?;

        let response = self
            .http
            .post(self.url())
            .timeout(options.timeout)
            .json(&GenerateRequest {
                model,
                prompt,
                stream: false,
                options: options.request_options(),
            })
            .send()
            .await
            .map_err(|e| GenerateError::request(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GenerateError::request(e.to_string()))?;
        if !status.is_success() {
            return Err(GenerateError::Request {
                message: format!("server returned {status}: {}", body.trim()),
                status_code: Some(status.as_u16()),
            });
        }

        let chunk: GenerateChunk =
            serde_json::from_str(&body).map_err(|e| GenerateError::InvalidApiResponse {
                message: format!("response is not valid JSON: {e}"),
            })?;
        if let Some(error) = chunk.error {
            return Err(GenerateError::request(error));
        }
        chunk.response.ok_or_else(|| GenerateError::InvalidApiResponse {
            message: "response has no `response` field".to_string(),
        })
    }

    /// Generate with incremental delivery.
    ///
    /// `on_chunk` sees `Pending` first, then every fragment. The returned
    /// text is the concatenation of all fragments; on a transport error the
    /// partial text is dropped and `on_chunk` receives `Failed`.
    pub async fn generate_streaming<F>(
        &self,
        model: &str,
        prompt: &str,
        options: &GenerateOptions,
        mut on_chunk: F,
    ) -> Result<String, GenerateError>
    where
        F: FnMut(GenerationChunk<'_>) + Send,
    {
        self.supervisor.ensure_running().await?;
        on_chunk(GenerationChunk::Pending);

        match self.stream_into(model, prompt, options, &mut on_chunk).await {
            Ok(text) => Ok(text),
            Err(e) => {
                warn!(error = %e, "Streaming generation failed");
                on_chunk(GenerationChunk::Failed(&e.to_string()));
                Err(e)
            }
        }
    }

    async fn stream_into<F>(
        &self,
        model: &str,
        prompt: &str,
        options: &GenerateOptions,
        on_chunk: &mut F,
    ) -> Result<String, GenerateError>
    where
        F: FnMut(GenerationChunk<'_>) + Send,
    {
        let response = self
            .http
            .post(self.url())
            .json(&GenerateRequest {
                model,
                prompt,
                stream: true,
                options: options.request_options(),
            })
            .send()
            .await
            .map_err(|e| GenerateError::request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerateError::Request {
                message: format!("server returned {status}: {}", body.trim()),
                status_code: Some(status.as_u16()),
            });
        }

        let mut events = Box::pin(decode_ndjson::<GenerateChunk, _, _>(response.bytes_stream()));
        let mut text = String::new();

        loop {
            let chunk = match next_step(&mut events, None).await {
                StreamStep::Item(Ok(chunk)) => chunk,
                StreamStep::Item(Err(NdjsonError::Decode { line, message })) => {
                    debug!(%line, %message, "Skipping malformed generate event");
                    continue;
                }
                StreamStep::Item(Err(NdjsonError::Transport(message))) => {
                    return Err(GenerateError::request(message));
                }
                StreamStep::End | StreamStep::Cancelled => break,
            };

            if let Some(error) = chunk.error {
                return Err(GenerateError::request(error));
            }
            if let Some(fragment) = chunk.response.as_deref().filter(|f| !f.is_empty()) {
                text.push_str(fragment);
                on_chunk(GenerationChunk::Text(fragment));
            }
            if chunk.done {
                break;
            }
        }

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timeout() {
        assert_eq!(GenerateOptions::default().timeout, Duration::from_secs(120));
    }

    #[test]
    fn test_options_map_to_wire_names() {
        let options = GenerateOptions {
            max_tokens: Some(32),
            temperature: Some(0.2),
            ..GenerateOptions::default()
        };
        let wire = options.request_options();
        assert_eq!(wire.num_predict, Some(32));
        assert_eq!(wire.temperature, Some(0.2));
    }
}
