// OpenAI text-to-speech implementation

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use crate::config::SpeechConfig;
use crate::error::{Result, VoxoverError};
use super::{SpeechRequest, SpeechSynthesizer};

#[derive(Debug, Clone, Serialize)]
struct SpeechBody<'a> {
    model: &'a str,
    voice: &'a str,
    input: &'a str,
    speed: f64,
    response_format: &'a str,
}

pub struct OpenAiSpeechSynthesizer {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
    timeout_secs: u64,
}

impl OpenAiSpeechSynthesizer {
    pub fn new(config: &SpeechConfig, api_key: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint().trim_end_matches('/').to_string(),
            model: config.model().to_string(),
            api_key: api_key.to_string(),
            timeout_secs: config.timeout_secs,
        })
    }
}

#[async_trait]
impl SpeechSynthesizer for OpenAiSpeechSynthesizer {
    async fn synthesize(&self, request: &SpeechRequest) -> Result<Vec<u8>> {
        let body = SpeechBody {
            model: &self.model,
            voice: request.voice.name(),
            input: &request.text,
            speed: request.speed,
            response_format: "mp3",
        };

        let url = format!("{}/audio/speech", self.endpoint);
        debug!("Sending speech request to: {}", url);

        let response = self.client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    VoxoverError::SynthesisFailed(format!("request timed out after {}s", self.timeout_secs))
                } else {
                    VoxoverError::SynthesisFailed(format!("HTTP request failed: {}", e))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(VoxoverError::SynthesisFailed(format!(
                "OpenAI API error {}: {}", status, error_text
            )));
        }

        let bytes = response.bytes().await
            .map_err(|e| VoxoverError::SynthesisFailed(format!("Failed to read audio: {}", e)))?;
        Ok(bytes.to_vec())
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}
