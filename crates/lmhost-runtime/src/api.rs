//! Wire types for the managed server's HTTP API.
//!
//! Endpoints consumed:
//! - `GET /api/tags` - liveness probe and installed model list
//! - `POST /api/generate` - text generation (batch or NDJSON stream)
//! - `POST /api/pull` - model download (NDJSON progress stream)

use serde::{Deserialize, Serialize};

pub const TAGS_PATH: &str = "/api/tags";
pub const GENERATE_PATH: &str = "/api/generate";
pub const PULL_PATH: &str = "/api/pull";

/// Response of `GET /api/tags`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TagsResponse {
    #[serde(default)]
    pub models: Vec<TagEntry>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TagEntry {
    pub name: String,
    #[serde(default)]
    pub size: Option<u64>,
}

/// Body of `POST /api/generate`.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub stream: bool,
    pub options: GenerateRequestOptions,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct GenerateRequestOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// One generate response object: the whole answer in batch mode, or one
/// NDJSON line in streaming mode.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GenerateChunk {
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// Body of `POST /api/pull`.
#[derive(Debug, Clone, Serialize)]
pub struct PullRequest<'a> {
    pub name: &'a str,
    pub stream: bool,
    pub insecure: bool,
}

/// One NDJSON progress event from `POST /api/pull`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PullEvent {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub digest: Option<String>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub completed: Option<u64>,
    #[serde(default)]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_request_omits_unset_options() {
        let request = GenerateRequest {
            model: "m",
            prompt: "p",
            stream: false,
            options: GenerateRequestOptions {
                num_predict: Some(64),
                temperature: None,
            },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["options"]["num_predict"], 64);
        assert!(json["options"].get("temperature").is_none());
    }

    #[test]
    fn test_pull_event_tolerates_missing_fields() {
        let event: PullEvent = serde_json::from_str(r#"{"status":"pulling manifest"}"#).unwrap();
        assert_eq!(event.status.as_deref(), Some("pulling manifest"));
        assert!(event.total.is_none() && event.completed.is_none());
    }
}
