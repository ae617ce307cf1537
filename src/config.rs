use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use crate::error::{Result, VoxoverError};
use crate::speech::Voice;

fn default_timeout_secs() -> u64 {
    300
}

fn default_frame_count() -> usize {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub generation: GenerationConfig,
    pub speech: SpeechConfig,
    pub script: ScriptConfig,
    pub media: MediaConfig,
    pub mix: MixConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Text generation provider
    pub provider: GenerationProvider,
    /// API base URL
    pub endpoint: String,
    /// Model used to write the narration
    pub model: String,
    /// Environment variable holding the provider credential
    pub api_key_env: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Number of frames sampled from the video and attached to the prompt
    #[serde(default = "default_frame_count")]
    pub frame_count: usize,
    /// Maximum tokens in the generated response
    pub max_tokens: u32,
    /// System prompt sent with every request
    pub system_prompt: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationProvider {
    /// OpenAI chat completions with image inputs
    OpenAi,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    /// Speech synthesis provider
    pub provider: SpeechProvider,
    /// API base URL, the provider's public API when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Synthesis model, the provider's default model when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Environment variable holding the provider credential
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Voice used when none is given on the command line
    pub default_voice: Voice,
    /// Speaking speed used when none is given on the command line
    pub default_speed: f64,
    /// ElevenLabs voice id for each of the ten voices (keyed by voice name)
    #[serde(default = "default_elevenlabs_voice_ids")]
    pub elevenlabs_voice_ids: HashMap<String, String>,
}

impl SpeechConfig {
    pub fn endpoint(&self) -> &str {
        self.endpoint.as_deref().unwrap_or_else(|| self.provider.default_endpoint())
    }

    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or_else(|| self.provider.default_model())
    }

    pub fn api_key_env(&self) -> &str {
        self.api_key_env.as_deref().unwrap_or_else(|| self.provider.default_api_key_env())
    }
}

/// ElevenLabs premade voices standing in for the ten voice names
fn default_elevenlabs_voice_ids() -> HashMap<String, String> {
    [
        ("alloy", "21m00Tcm4TlvDq8ikWAM"),
        ("ash", "pNInz6obpgDQGcFmaJgB"),
        ("ballad", "ErXwobaYiN019PkySvjV"),
        ("coral", "EXAVITQu4vr4xnSDxMaL"),
        ("echo", "TxGEqnHWrfWFTfGW9XjX"),
        ("fable", "AZnzlk1XvdvUeBnXmlld"),
        ("onyx", "VR6AewLTigWG4xSOukaG"),
        ("nova", "MF3mGyEYCl7XYWbV9V6O"),
        ("sage", "yoZ06aMxZJJ28mfd3POQ"),
        ("shimmer", "XB0fDUnXU5powFXDhCwa"),
    ]
    .into_iter()
    .map(|(name, id)| (name.to_string(), id.to_string()))
    .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeechProvider {
    /// OpenAI `/audio/speech`
    OpenAi,
    /// ElevenLabs `/text-to-speech/{voice_id}`
    ElevenLabs,
}

impl SpeechProvider {
    pub fn default_endpoint(&self) -> &'static str {
        match self {
            Self::OpenAi => "https://api.openai.com/v1",
            Self::ElevenLabs => "https://api.elevenlabs.io/v1",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Self::OpenAi => "gpt-4o-mini-tts",
            Self::ElevenLabs => "eleven_multilingual_v2",
        }
    }

    pub fn default_api_key_env(&self) -> &'static str {
        match self {
            Self::OpenAi => "OPENAI_API_KEY",
            Self::ElevenLabs => "ELEVENLABS_API_KEY",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptConfig {
    /// Speaking rate used for word budgets and duration estimates
    pub words_per_minute: f64,
    /// Allowed ratio of estimated speech duration to video duration
    pub length_tolerance: f64,
    /// What to do when a script exceeds the tolerance
    pub length_policy: LengthPolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LengthPolicy {
    /// Fail synthesis with ScriptTooLong
    Reject,
    /// Log a warning and synthesize anyway
    Warn,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Path to ffmpeg binary
    pub binary_path: String,
    /// Path to ffprobe binary
    pub probe_binary_path: String,
    /// Audio codec for the final mux
    pub audio_codec: String,
    /// Additional options appended to the mux command
    /// Common options: ["-b:a", "192k", "-movflags", "+faststart"]
    pub mux_options: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MixConfig {
    /// Sample rate both tracks are resampled to before mixing
    pub sample_rate: u32,
    /// Channel count both tracks are converted to before mixing
    pub channels: u16,
    /// Narration weight used when none is given on the command line
    pub default_ratio: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            generation: GenerationConfig {
                provider: GenerationProvider::OpenAi,
                endpoint: "https://api.openai.com/v1".to_string(),
                model: "gpt-4o-mini".to_string(),
                api_key_env: "OPENAI_API_KEY".to_string(),
                timeout_secs: default_timeout_secs(),
                frame_count: default_frame_count(),
                max_tokens: 1000,
                system_prompt: "You are a professional voiceover writer. Write narration text only, \
                                with no stage directions, headings or formatting."
                    .to_string(),
            },
            speech: SpeechConfig {
                provider: SpeechProvider::OpenAi,
                endpoint: None,
                model: None,
                api_key_env: None,
                timeout_secs: default_timeout_secs(),
                default_voice: Voice::Nova,
                default_speed: 1.0,
                elevenlabs_voice_ids: default_elevenlabs_voice_ids(),
            },
            script: ScriptConfig {
                words_per_minute: 200.0,
                length_tolerance: 1.1,
                length_policy: LengthPolicy::Reject,
            },
            media: MediaConfig {
                binary_path: "ffmpeg".to_string(),
                probe_binary_path: "ffprobe".to_string(),
                audio_codec: "aac".to_string(),
                mux_options: vec![],
            },
            mix: MixConfig {
                sample_rate: 48_000,
                channels: 2,
                default_ratio: 0.7,
            },
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| VoxoverError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| VoxoverError::Config(format!("Failed to parse config file: {}", e)))
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| VoxoverError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| VoxoverError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }
}

/// Provider credentials, one per capability. Loaded once at startup.
#[derive(Clone)]
pub struct Credentials {
    pub text_generation: String,
    pub speech_synthesis: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("text_generation", &"<redacted>")
            .field("speech_synthesis", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    pub fn from_env(config: &Config) -> Result<Self> {
        Self::from_lookup(config, |name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(config: &Config, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let fetch = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .ok_or_else(|| VoxoverError::ConfigMissing(format!("environment variable {} is not set", name)))
        };

        Ok(Self {
            text_generation: fetch(&config.generation.api_key_env)?,
            speech_synthesis: fetch(config.speech.api_key_env())?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_survives_toml() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();

        assert_eq!(parsed.generation.model, "gpt-4o-mini");
        assert_eq!(parsed.speech.default_voice, Voice::Nova);
        assert_eq!(parsed.script.length_policy, LengthPolicy::Reject);
        assert_eq!(parsed.mix.sample_rate, 48_000);
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("voxover.toml");

        let mut config = Config::default();
        config.speech.provider = SpeechProvider::ElevenLabs;
        config.speech.api_key_env = Some("XI_KEY".to_string());
        config.save_to_file(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.speech.provider, SpeechProvider::ElevenLabs);
        assert_eq!(loaded.speech.api_key_env(), "XI_KEY");
        assert_eq!(loaded.speech.elevenlabs_voice_ids.len(), 10);
    }

    #[test]
    fn test_speech_defaults_follow_provider() {
        let mut speech = Config::default().speech;
        assert_eq!(speech.endpoint(), "https://api.openai.com/v1");
        assert_eq!(speech.model(), "gpt-4o-mini-tts");
        assert_eq!(speech.api_key_env(), "OPENAI_API_KEY");

        speech.provider = SpeechProvider::ElevenLabs;
        assert_eq!(speech.endpoint(), "https://api.elevenlabs.io/v1");
        assert_eq!(speech.model(), "eleven_multilingual_v2");
        assert_eq!(speech.api_key_env(), "ELEVENLABS_API_KEY");

        speech.endpoint = Some("http://localhost:8080/v1".to_string());
        assert_eq!(speech.endpoint(), "http://localhost:8080/v1");
    }

    #[test]
    fn test_provider_only_toml_uses_provider_defaults() {
        let text = toml::to_string_pretty(&Config::default()).unwrap();
        let mut table: toml::Table = toml::from_str(&text).unwrap();
        let speech = table.get_mut("speech").and_then(|v| v.as_table_mut()).unwrap();
        speech.insert("provider".to_string(), toml::Value::String("eleven_labs".to_string()));
        speech.remove("elevenlabs_voice_ids");

        let parsed: Config = toml::from_str(&toml::to_string(&table).unwrap()).unwrap();

        assert_eq!(parsed.speech.provider, SpeechProvider::ElevenLabs);
        assert_eq!(parsed.speech.endpoint(), "https://api.elevenlabs.io/v1");
        for voice in Voice::ALL {
            assert!(parsed.speech.elevenlabs_voice_ids.contains_key(voice.name()));
        }
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "generation = 42").unwrap();

        assert!(matches!(Config::from_file(&path), Err(VoxoverError::Config(_))));
    }

    #[test]
    fn test_credentials_from_lookup() {
        let mut config = Config::default();
        config.speech.provider = SpeechProvider::ElevenLabs;

        let creds = Credentials::from_lookup(&config, |name| match name {
            "OPENAI_API_KEY" => Some("sk-text".to_string()),
            "ELEVENLABS_API_KEY" => Some("xi-speech".to_string()),
            _ => None,
        })
        .unwrap();

        assert_eq!(creds.text_generation, "sk-text");
        assert_eq!(creds.speech_synthesis, "xi-speech");
        assert!(!format!("{:?}", creds).contains("sk-text"));
    }

    #[test]
    fn test_missing_credential_is_config_missing() {
        let mut config = Config::default();
        config.speech.provider = SpeechProvider::ElevenLabs;

        let result = Credentials::from_lookup(&config, |name| {
            (name == "OPENAI_API_KEY").then(|| "sk-text".to_string())
        });
        match result {
            Err(VoxoverError::ConfigMissing(msg)) => assert!(msg.contains("ELEVENLABS_API_KEY")),
            other => panic!("expected ConfigMissing, got {:?}", other),
        }

        let blank = Credentials::from_lookup(&config, |_| Some("   ".to_string()));
        assert!(matches!(blank, Err(VoxoverError::ConfigMissing(_))));
    }
}
