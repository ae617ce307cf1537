// ElevenLabs text-to-speech implementation
// ElevenLabs addresses voices by opaque ids, so each of the ten voices is
// mapped through `speech.elevenlabs_voice_ids`.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use crate::config::SpeechConfig;
use crate::error::{Result, VoxoverError};
use super::{SpeechRequest, SpeechSynthesizer, Voice};

#[derive(Debug, Clone, Serialize)]
struct TextToSpeechBody<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceSettings,
}

#[derive(Debug, Clone, Serialize)]
struct VoiceSettings {
    stability: f64,
    similarity_boost: f64,
    speed: f64,
}

pub struct ElevenLabsSpeechSynthesizer {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
    voice_ids: HashMap<String, String>,
    timeout_secs: u64,
}

impl ElevenLabsSpeechSynthesizer {
    /// Fails with a configuration error unless every voice has an id
    pub fn new(config: &SpeechConfig, api_key: &str) -> Result<Self> {
        let missing: Vec<&str> = Voice::ALL
            .iter()
            .map(|voice| voice.name())
            .filter(|name| !config.elevenlabs_voice_ids.contains_key(*name))
            .collect();
        if !missing.is_empty() {
            return Err(VoxoverError::Config(format!(
                "speech.elevenlabs_voice_ids has no id for: {}",
                missing.join(", ")
            )));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint().trim_end_matches('/').to_string(),
            model: config.model().to_string(),
            api_key: api_key.to_string(),
            voice_ids: config.elevenlabs_voice_ids.clone(),
            timeout_secs: config.timeout_secs,
        })
    }

    fn voice_id(&self, voice: Voice) -> Result<&str> {
        self.voice_ids
            .get(voice.name())
            .map(String::as_str)
            .ok_or_else(|| VoxoverError::SynthesisFailed(format!(
                "no ElevenLabs voice id configured for '{}'", voice
            )))
    }

    fn build_request(&self, request: &SpeechRequest) -> Result<reqwest::Request> {
        let voice_id = self.voice_id(request.voice)?;
        let url = format!("{}/text-to-speech/{}", self.endpoint, voice_id);
        debug!("Sending speech request to: {}", url);

        let body = TextToSpeechBody {
            text: &request.text,
            model_id: &self.model,
            voice_settings: VoiceSettings {
                stability: 0.5,
                similarity_boost: 0.75,
                speed: request.speed,
            },
        };

        let built = self.client
            .post(&url)
            .header("xi-api-key", &self.api_key)
            .header("Accept", "audio/mpeg")
            .json(&body)
            .build()?;
        Ok(built)
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsSpeechSynthesizer {
    async fn synthesize(&self, request: &SpeechRequest) -> Result<Vec<u8>> {
        let http_request = self.build_request(request)?;

        let response = self.client
            .execute(http_request)
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
                "ElevenLabs API error {}: {}", status, error_text
            )));
        }

        let bytes = response.bytes().await
            .map_err(|e| VoxoverError::SynthesisFailed(format!("Failed to read audio: {}", e)))?;
        Ok(bytes.to_vec())
    }

    fn name(&self) -> &'static str {
        "elevenlabs"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, SpeechProvider};

    fn config() -> SpeechConfig {
        let mut config = Config::default().speech;
        config.provider = SpeechProvider::ElevenLabs;
        config
    }

    fn request(voice: Voice) -> SpeechRequest {
        SpeechRequest {
            text: "Hello there".to_string(),
            voice,
            speed: 1.2,
        }
    }

    #[test]
    fn test_defaults_target_elevenlabs_api() {
        let synth = ElevenLabsSpeechSynthesizer::new(&config(), "xi-key").unwrap();
        let built = synth.build_request(&request(Voice::Nova)).unwrap();

        assert_eq!(built.method(), reqwest::Method::POST);
        assert_eq!(
            built.url().as_str(),
            "https://api.elevenlabs.io/v1/text-to-speech/MF3mGyEYCl7XYWbV9V6O"
        );
        assert_eq!(built.headers()["xi-api-key"], "xi-key");
        assert!(built.headers().get(reqwest::header::AUTHORIZATION).is_none());

        let body: serde_json::Value =
            serde_json::from_slice(built.body().and_then(|b| b.as_bytes()).unwrap()).unwrap();
        assert_eq!(body["text"], "Hello there");
        assert_eq!(body["model_id"], "eleven_multilingual_v2");
        assert_eq!(body["voice_settings"]["speed"], 1.2);
    }

    #[test]
    fn test_custom_mapping_and_endpoint() {
        let mut config = config();
        config.endpoint = Some("http://127.0.0.1:9/v1/".to_string());
        config.elevenlabs_voice_ids.insert("onyx".to_string(), "custom-onyx".to_string());

        let synth = ElevenLabsSpeechSynthesizer::new(&config, "xi-key").unwrap();
        assert_eq!(synth.voice_id(Voice::Onyx).unwrap(), "custom-onyx");
        let built = synth.build_request(&request(Voice::Onyx)).unwrap();
        assert_eq!(built.url().as_str(), "http://127.0.0.1:9/v1/text-to-speech/custom-onyx");
    }

    #[test]
    fn test_incomplete_mapping_is_config_error() {
        let mut config = config();
        config.elevenlabs_voice_ids.remove("echo");
        config.elevenlabs_voice_ids.remove("sage");

        match ElevenLabsSpeechSynthesizer::new(&config, "xi-key") {
            Err(VoxoverError::Config(msg)) => {
                assert!(msg.contains("echo"));
                assert!(msg.contains("sage"));
            }
            Err(other) => panic!("expected Config, got {:?}", other),
            Ok(_) => panic!("expected Config error"),
        }
    }
}
