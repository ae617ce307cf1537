// Voice synthesis
//
// Providers implement SpeechSynthesizer; VoiceSynthesizer applies the
// pipeline rules around them (non-empty script, length policy, file staging).

pub mod elevenlabs;
pub mod openai;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{info, warn};

use crate::config::{LengthPolicy, ScriptConfig, SpeechConfig, SpeechProvider};
use crate::error::{Result, VoxoverError};
use crate::media::MediaProcessorTrait;
use crate::script::NarrationScript;

pub const MIN_SPEED: f64 = 0.5;
pub const MAX_SPEED: f64 = 2.0;

/// The ten selectable voices. Ids run 1..=10 in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Voice {
    Alloy,
    Ash,
    Ballad,
    Coral,
    Echo,
    Fable,
    Onyx,
    Nova,
    Sage,
    Shimmer,
}

impl Voice {
    pub const ALL: [Voice; 10] = [
        Self::Alloy,
        Self::Ash,
        Self::Ballad,
        Self::Coral,
        Self::Echo,
        Self::Fable,
        Self::Onyx,
        Self::Nova,
        Self::Sage,
        Self::Shimmer,
    ];

    pub fn id(&self) -> u8 {
        Self::ALL.iter().position(|v| v == self).map(|i| i as u8 + 1).unwrap_or(0)
    }

    pub fn from_id(id: u8) -> Option<Self> {
        (1..=10).contains(&id).then(|| Self::ALL[id as usize - 1])
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Alloy => "alloy",
            Self::Ash => "ash",
            Self::Ballad => "ballad",
            Self::Coral => "coral",
            Self::Echo => "echo",
            Self::Fable => "fable",
            Self::Onyx => "onyx",
            Self::Nova => "nova",
            Self::Sage => "sage",
            Self::Shimmer => "shimmer",
        }
    }
}

impl fmt::Display for Voice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Voice {
    type Err = VoxoverError;

    /// Accepts a voice name or its numeric id
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Ok(id) = s.parse::<u8>() {
            return Self::from_id(id)
                .ok_or_else(|| VoxoverError::InvalidVoiceConfig(format!("voice id {} is not in 1..=10", id)));
        }
        Self::ALL
            .iter()
            .copied()
            .find(|v| v.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| VoxoverError::InvalidVoiceConfig(format!("unknown voice '{}'", s)))
    }
}

/// Voice selection for one synthesis call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceConfig {
    voice: Voice,
    speed: f64,
    mix_ratio: f64,
}

impl VoiceConfig {
    pub fn new(voice: Voice, speed: f64, mix_ratio: f64) -> Result<Self> {
        if !(MIN_SPEED..=MAX_SPEED).contains(&speed) {
            return Err(VoxoverError::InvalidVoiceConfig(format!(
                "speed {} outside [{}, {}]", speed, MIN_SPEED, MAX_SPEED
            )));
        }
        if !(0.0..=1.0).contains(&mix_ratio) {
            return Err(VoxoverError::InvalidVoiceConfig(format!(
                "mix ratio {} outside [0, 1]", mix_ratio
            )));
        }
        Ok(Self { voice, speed, mix_ratio })
    }

    pub fn voice(&self) -> Voice {
        self.voice
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Weight of the narration in the final mix; the original gets `1 - ratio`
    pub fn mix_ratio(&self) -> f64 {
        self.mix_ratio
    }
}

/// Synthesized speech staged in the session directory
#[derive(Debug, Clone, PartialEq)]
pub struct NarrationAudio {
    pub path: PathBuf,
    pub duration: f64,
    pub voice: Voice,
}

/// Provider-neutral synthesis request
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechRequest {
    pub text: String,
    pub voice: Voice,
    pub speed: f64,
}

/// Speech synthesis capability
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Return encoded (mp3) audio for the request
    async fn synthesize(&self, request: &SpeechRequest) -> Result<Vec<u8>>;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}

/// Factory for creating speech synthesizer instances
pub struct SpeechSynthesizerFactory;

impl SpeechSynthesizerFactory {
    pub fn create_synthesizer(config: &SpeechConfig, api_key: &str) -> Result<Box<dyn SpeechSynthesizer>> {
        match config.provider {
            SpeechProvider::OpenAi => {
                Ok(Box::new(openai::OpenAiSpeechSynthesizer::new(config, api_key)?))
            }
            SpeechProvider::ElevenLabs => {
                Ok(Box::new(elevenlabs::ElevenLabsSpeechSynthesizer::new(config, api_key)?))
            }
        }
    }
}

pub struct VoiceSynthesizer {
    provider: Box<dyn SpeechSynthesizer>,
    script_config: ScriptConfig,
}

impl VoiceSynthesizer {
    pub fn new(provider: Box<dyn SpeechSynthesizer>, script_config: ScriptConfig) -> Self {
        Self { provider, script_config }
    }

    /// Apply the configured length policy to a script about to be spoken
    pub fn check_length(&self, script: &NarrationScript, speed: f64, video_duration: f64) -> Result<()> {
        let estimated = script.estimated_duration(self.script_config.words_per_minute, speed);
        if estimated <= video_duration * self.script_config.length_tolerance {
            return Ok(());
        }

        match self.script_config.length_policy {
            LengthPolicy::Reject => Err(VoxoverError::ScriptTooLong {
                estimated,
                available: video_duration,
            }),
            LengthPolicy::Warn => {
                warn!("Script needs about {:.1}s of speech but the video is {:.1}s; the end will be cut",
                      estimated, video_duration);
                Ok(())
            }
        }
    }

    pub async fn synthesize(
        &self,
        script: &NarrationScript,
        voice_config: &VoiceConfig,
        video_duration: f64,
        media: &dyn MediaProcessorTrait,
        workdir: &Path,
    ) -> Result<NarrationAudio> {
        if script.is_empty() {
            return Err(VoxoverError::EmptyScript);
        }
        self.check_length(script, voice_config.speed(), video_duration)?;

        info!("Synthesizing {} words with {} (voice {}, speed {:.2})",
              script.word_count(), self.provider.name(), voice_config.voice(), voice_config.speed());

        let request = SpeechRequest {
            text: script.text().to_string(),
            voice: voice_config.voice(),
            speed: voice_config.speed(),
        };
        let bytes = self.provider.synthesize(&request).await.map_err(|e| match e {
            VoxoverError::SynthesisFailed(_) => e,
            other => VoxoverError::SynthesisFailed(other.to_string()),
        })?;
        if bytes.is_empty() {
            return Err(VoxoverError::SynthesisFailed("provider returned no audio".to_string()));
        }

        let path = workdir.join(format!("voiceover_{}.mp3", uuid::Uuid::new_v4()));
        tokio::fs::write(&path, &bytes).await?;

        let duration = match media.probe(&path).await {
            Ok(info) => info.duration,
            Err(e) => {
                let _ = tokio::fs::remove_file(&path).await;
                return Err(VoxoverError::SynthesisFailed(format!("synthesized audio is unreadable: {}", e)));
            }
        };

        info!("Synthesized {:.2}s of narration to {}", duration, path.display());
        Ok(NarrationAudio {
            path,
            duration,
            voice: voice_config.voice(),
        })
    }
}
