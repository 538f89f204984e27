//! OpenAI provider implementation (Responses API).

use super::{Completion, CompletionProvider, CompletionRequest, ProviderError};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// OpenAI API provider.
pub struct OpenAiProvider {
    client: reqwest::Client,
    base_url: String,
}

impl OpenAiProvider {
    /// Create a new OpenAI provider.
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Self {
        Self::with_base_url(api_key, "https://api.openai.com", timeout)
    }

    /// Create with custom base URL (for Azure OpenAI or compatible APIs).
    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let api_key = api_key.into();
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key))
                .unwrap_or_else(|_| HeaderValue::from_static("")),
        );

        // The timeout bounds the completion call; a timed-out request is
        // reported the same way as any other provider failure.
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<Completion, ProviderError> {
        let start = Instant::now();
        let url = format!("{}/v1/responses", self.base_url);

        let api_request = ResponsesRequest {
            model: request.model.clone(),
            input: request.input,
        };

        let response = self
            .client
            .post(&url)
            .json(&api_request)
            .send()
            .await
            .map_err(|e| ProviderError {
                provider: "openai".into(),
                model: request.model.clone(),
                message: format!("Request failed: {}", e),
                status_code: None,
            })?;

        let status = response.status();
        let latency_ms = start.elapsed().as_millis() as u64;

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError {
                provider: "openai".into(),
                model: request.model,
                message: format!("API error: {}", body),
                status_code: Some(status.as_u16()),
            });
        }

        let api_response: ResponsesResponse =
            response.json().await.map_err(|e| ProviderError {
                provider: "openai".into(),
                model: request.model.clone(),
                message: format!("Failed to parse response: {}", e),
                status_code: None,
            })?;

        let text = extract_output_text(&api_response).ok_or_else(|| ProviderError {
            provider: "openai".into(),
            model: request.model.clone(),
            message: "Response contained no output text".into(),
            status_code: None,
        })?;

        Ok(Completion {
            provider: "openai".into(),
            model: api_response.model,
            text,
            latency_ms,
        })
    }
}

/// Pull the generated text out of the typed response.
///
/// The Responses API nests it as `output[].content[].text`; a response
/// missing any level is treated as a provider failure upstream, never an
/// unhandled fault.
fn extract_output_text(response: &ResponsesResponse) -> Option<String> {
    response
        .output
        .iter()
        .flat_map(|item| item.content.iter())
        .find_map(|content| {
            content
                .text
                .as_deref()
                .filter(|t| !t.is_empty())
                .map(String::from)
        })
}

// ============================================================================
// OpenAI API Types
// ============================================================================

#[derive(Debug, Serialize)]
struct ResponsesRequest {
    model: String,
    input: String,
}

#[derive(Debug, Deserialize)]
struct ResponsesResponse {
    model: String,
    #[serde(default)]
    output: Vec<OutputItem>,
}

#[derive(Debug, Deserialize)]
struct OutputItem {
    #[serde(default)]
    content: Vec<OutputContent>,
}

#[derive(Debug, Deserialize)]
struct OutputContent {
    #[serde(default)]
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let request = ResponsesRequest {
            model: "gpt-4o-mini".into(),
            input: "User: Hello".into(),
        };

        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("gpt-4o-mini"));
        assert!(json.contains("User: Hello"));
    }

    #[test]
    fn test_extract_output_text() {
        let json = r#"{
            "model": "gpt-4o-mini",
            "output": [
                { "content": [ { "type": "output_text", "text": "Hi there!" } ] }
            ]
        }"#;

        let response: ResponsesResponse = serde_json::from_str(json).unwrap();
        assert_eq!(extract_output_text(&response).as_deref(), Some("Hi there!"));
    }

    #[test]
    fn test_extract_skips_empty_content() {
        let json = r#"{
            "model": "gpt-4o-mini",
            "output": [
                { "content": [] },
                { "content": [ { "text": "" }, { "text": "second item" } ] }
            ]
        }"#;

        let response: ResponsesResponse = serde_json::from_str(json).unwrap();
        assert_eq!(
            extract_output_text(&response).as_deref(),
            Some("second item")
        );
    }

    #[test]
    fn test_missing_output_is_none() {
        let json = r#"{ "model": "gpt-4o-mini" }"#;
        let response: ResponsesResponse = serde_json::from_str(json).unwrap();
        assert!(extract_output_text(&response).is_none());
    }
}
