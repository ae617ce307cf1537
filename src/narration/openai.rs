// OpenAI chat completions implementation
// Frames are attached as base64 data URIs so the model can describe what it sees.

use async_trait::async_trait;
use base64::Engine as _;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use crate::config::GenerationConfig;
use crate::error::{Result, VoxoverError};
use super::{GenerationRequest, TextGenerator};

#[derive(Debug, Clone, Serialize)]
struct ChatCompletionRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<Value>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

pub struct OpenAiTextGenerator {
    client: Client,
    endpoint: String,
    model: String,
    max_tokens: u32,
    api_key: String,
    timeout_secs: u64,
}

impl OpenAiTextGenerator {
    pub fn new(config: &GenerationConfig, api_key: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            api_key: api_key.to_string(),
            timeout_secs: config.timeout_secs,
        })
    }

    async fn build_messages(&self, request: &GenerationRequest) -> Result<Vec<Value>> {
        let mut content = vec![json!({ "type": "text", "text": request.instructions })];

        for frame in &request.frames {
            let bytes = tokio::fs::read(frame).await?;
            let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
            content.push(json!({
                "type": "image_url",
                "image_url": { "url": format!("data:image/jpeg;base64,{}", encoded) }
            }));
        }

        Ok(vec![
            json!({ "role": "system", "content": request.system_prompt }),
            json!({ "role": "user", "content": content }),
        ])
    }
}

#[async_trait]
impl TextGenerator for OpenAiTextGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let body = ChatCompletionRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            messages: self.build_messages(request).await?,
        };

        let url = format!("{}/chat/completions", self.endpoint);
        debug!("Sending narration request to: {} ({} frames)", url, request.frames.len());

        let response = self.client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    VoxoverError::GenerationFailed(format!("request timed out after {}s", self.timeout_secs))
                } else {
                    VoxoverError::GenerationFailed(format!("HTTP request failed: {}", e))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(VoxoverError::GenerationFailed(format!(
                "OpenAI API error {}: {}", status, error_text
            )));
        }

        let completion: ChatCompletionResponse = response.json().await
            .map_err(|e| VoxoverError::GenerationFailed(format!("Failed to parse response: {}", e)))?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| VoxoverError::GenerationFailed("response contained no message".to_string()))
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[tokio::test]
    async fn test_messages_embed_frames_as_data_uris() {
        let dir = tempfile::tempdir().unwrap();
        let frame = dir.path().join("frame_000.jpg");
        std::fs::write(&frame, b"jpeg").unwrap();

        let generator = OpenAiTextGenerator::new(&Config::default().generation, "sk-test").unwrap();
        let request = GenerationRequest {
            system_prompt: "You write voiceovers.".to_string(),
            instructions: "calm tone".to_string(),
            frames: vec![frame],
        };

        let messages = generator.build_messages(&request).await.unwrap();
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[1]["content"][0]["text"], "calm tone");
        assert_eq!(messages[1]["content"][1]["image_url"]["url"], "data:image/jpeg;base64,anBlZw==");
    }

    #[test]
    fn test_response_parsing() {
        let json = r#"{"choices": [{"index": 0, "message": {"role": "assistant", "content": "Hello viewers."}}]}"#;
        let parsed: ChatCompletionResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.choices[0].message.content.as_deref(), Some("Hello viewers."));
    }
}
