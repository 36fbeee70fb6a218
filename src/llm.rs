//! Model serving client used for draft enrichment.
//!
//! The model is an untrusted collaborator: whatever it returns only reaches
//! the catalog after grounding validation.

use crate::config::LlmConfig;
use crate::error::{CatalogError, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::warn;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const MAX_ATTEMPTS: u32 = 3;

/// A producer of candidate catalog drafts.
#[async_trait]
pub trait DraftModel: Send + Sync {
    async fn draft(&self, prompt: &str) -> Result<String>;
}

pub struct LlmClient {
    http: reqwest::Client,
    config: LlmConfig,
}

enum CallError {
    Transient(String),
    Fatal(String),
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| CatalogError::Llm(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { http, config })
    }

    async fn invoke(&self, prompt: &str) -> std::result::Result<String, CallError> {
        let url = format!(
            "{}/serving-endpoints/{}/invocations",
            self.config.host, self.config.endpoint
        );
        let body = serde_json::json!({
            "messages": [
                {"role": "user", "content": prompt}
            ],
            "temperature": self.config.temperature,
        });

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| CallError::Transient(format!("LLM API call failed: {}", e)))?;

        let status = response.status();
        if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(CallError::Transient(format!("LLM endpoint returned {}", status)));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(CallError::Fatal(format!("LLM endpoint returned {}: {}", status, text)));
        }

        let response_json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| CallError::Transient(format!("malformed LLM response: {}", e)))?;

        let content = response_json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| CallError::Fatal("no content in LLM response".to_string()))?;

        if content.trim().is_empty() {
            return Err(CallError::Fatal("empty LLM response".to_string()));
        }
        Ok(content.to_string())
    }
}

#[async_trait]
impl DraftModel for LlmClient {
    async fn draft(&self, prompt: &str) -> Result<String> {
        let mut last_error = String::new();
        for attempt in 1..=MAX_ATTEMPTS {
            match self.invoke(prompt).await {
                Ok(text) => return Ok(text),
                Err(CallError::Fatal(message)) => return Err(CatalogError::Llm(message)),
                Err(CallError::Transient(message)) => {
                    warn!("LLM call failed (attempt {}/{}): {}", attempt, MAX_ATTEMPTS, message);
                    last_error = message;
                }
            }
            if attempt < MAX_ATTEMPTS {
                tokio::time::sleep(Duration::from_millis(500 * u64::from(attempt))).await;
            }
        }
        Err(CatalogError::Llm(last_error))
    }
}

/// Extract JSON from a model response (handles markdown code blocks).
pub fn extract_json(response: &str) -> String {
    let json_start = response.find('[').or_else(|| response.find('{'));
    let json_end = response.rfind(']').or_else(|| response.rfind('}'));

    if let (Some(start), Some(end)) = (json_start, json_end) {
        if start <= end {
            return response[start..=end].to_string();
        }
    }

    if let Some(start) = response.find("```json") {
        let after_start = &response[start + 7..];
        if let Some(end) = after_start.find("```") {
            return after_start[..end].trim().to_string();
        }
    }
    if let Some(start) = response.find("```") {
        let after_start = &response[start + 3..];
        if let Some(end) = after_start.find("```") {
            return after_start[..end].trim().to_string();
        }
    }
    response.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_json_from_code_block() {
        let response = "Here's the JSON:\n```json\n{\"descricao\": \"x\"}\n```";
        let extracted = extract_json(response);
        assert_eq!(extracted, "{\"descricao\": \"x\"}");
    }

    #[test]
    fn test_extract_json_plain_object() {
        let response = "prefix {\"contexto\": \"y\"} suffix";
        assert_eq!(extract_json(response), "{\"contexto\": \"y\"}");
    }

    #[test]
    fn test_extract_json_passthrough_when_no_json() {
        assert_eq!(extract_json("no json here"), "no json here");
    }
}
