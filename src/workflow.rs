use std::fmt;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};

use crate::config::{Config, Credentials};
use crate::delivery::{self, OutputVideo};
use crate::error::{Result, VoxoverError};
use crate::ingest::{self, VideoAsset};
use crate::media::{MediaProcessorFactory, MediaProcessorTrait};
use crate::mixer::AudioMixer;
use crate::narration::{NarrationGenerator, NarrationRequest, TextGenerator, TextGeneratorFactory};
use crate::script::{NarrationScript, ScriptEditor};
use crate::speech::{NarrationAudio, SpeechSynthesizer, SpeechSynthesizerFactory, VoiceConfig, VoiceSynthesizer};

/// Where a session is in the narration pipeline. Ordered front to back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PipelineStage {
    Idle,
    Ingested,
    ScriptDrafted,
    ScriptFinalized,
    Synthesized,
    Mixed,
    Delivered,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Ingested => "ingested",
            Self::ScriptDrafted => "script drafted",
            Self::ScriptFinalized => "script finalized",
            Self::Synthesized => "synthesized",
            Self::Mixed => "mixed",
            Self::Delivered => "delivered",
        };
        f.write_str(name)
    }
}

/// Inputs for a non-interactive run
#[derive(Debug, Clone)]
pub struct PipelineRequest {
    pub input: PathBuf,
    pub instructions: String,
    /// Use this text instead of generating a draft
    pub script_override: Option<String>,
    pub voice: VoiceConfig,
    pub destination: PathBuf,
}

/// One user's pipeline run: current stage, artifacts and the scoped working directory.
///
/// Every stage method either advances the stage or leaves the session exactly
/// as it was. Dropping the session removes all working files.
pub struct Session {
    stage: PipelineStage,
    workdir: TempDir,
    media: Box<dyn MediaProcessorTrait>,
    generator: NarrationGenerator,
    synthesizer: VoiceSynthesizer,
    mixer: AudioMixer,
    asset: Option<VideoAsset>,
    editor: ScriptEditor,
    voice: Option<VoiceConfig>,
    narration: Option<NarrationAudio>,
    output: Option<OutputVideo>,
    delivered: Option<PathBuf>,
}

impl Session {
    /// Build a session with the configured providers and the ffmpeg media processor
    pub fn new(config: &Config, credentials: &Credentials) -> Result<Self> {
        let media = MediaProcessorFactory::create_processor(config.media.clone());
        media.check_availability()?;

        let text = TextGeneratorFactory::create_generator(&config.generation, &credentials.text_generation)?;
        let speech = SpeechSynthesizerFactory::create_synthesizer(&config.speech, &credentials.speech_synthesis)?;

        Self::with_components(config, media, text, speech)
    }

    /// Build a session from explicit collaborators
    pub fn with_components(
        config: &Config,
        media: Box<dyn MediaProcessorTrait>,
        text: Box<dyn TextGenerator>,
        speech: Box<dyn SpeechSynthesizer>,
    ) -> Result<Self> {
        let workdir = tempfile::Builder::new().prefix("voxover-").tempdir()?;
        debug!("Session directory: {}", workdir.path().display());

        Ok(Self {
            stage: PipelineStage::Idle,
            workdir,
            media,
            generator: NarrationGenerator::new(text, &config.generation, config.script.words_per_minute),
            synthesizer: VoiceSynthesizer::new(speech, config.script.clone()),
            mixer: AudioMixer::new(config.mix.clone()),
            asset: None,
            editor: ScriptEditor::new(),
            voice: None,
            narration: None,
            output: None,
            delivered: None,
        })
    }

    pub fn stage(&self) -> PipelineStage {
        self.stage
    }

    pub fn workdir(&self) -> &Path {
        self.workdir.path()
    }

    pub fn asset(&self) -> Option<&VideoAsset> {
        self.asset.as_ref()
    }

    pub fn script(&self) -> Option<&NarrationScript> {
        self.editor.current()
    }

    pub fn voice(&self) -> Option<&VoiceConfig> {
        self.voice.as_ref()
    }

    pub fn narration(&self) -> Option<&NarrationAudio> {
        self.narration.as_ref()
    }

    pub fn output(&self) -> Option<&OutputVideo> {
        self.output.as_ref()
    }

    pub fn delivered_path(&self) -> Option<&Path> {
        self.delivered.as_deref()
    }

    /// Stage a new video. Allowed from any stage; drops everything derived from a previous video.
    pub async fn ingest(&mut self, path: &Path) -> Result<&VideoAsset> {
        let asset = ingest::ingest(path, self.workdir.path(), self.media.as_ref()).await?;

        if let Some(previous) = self.asset.take() {
            remove_quietly(&previous.path);
        }
        self.editor.clear();
        self.discard_synthesis();
        self.asset = Some(asset);
        self.transition(PipelineStage::Ingested);

        Ok(self.current_asset()?)
    }

    /// Ask the text generator for a fresh draft, replacing the current one
    pub async fn generate_script(&mut self, instructions: &str) -> Result<&NarrationScript> {
        self.require("generate a script", PipelineStage::Ingested..=PipelineStage::Delivered)?;

        let asset = self.current_asset()?;
        let request = NarrationRequest::new(asset, instructions);
        let script = self
            .generator
            .generate(&request, self.media.as_ref(), self.workdir.path())
            .await?;

        self.editor.load(script);
        self.discard_synthesis();
        self.transition(PipelineStage::ScriptDrafted);

        self.editor.current().ok_or(VoxoverError::EmptyScript)
    }

    /// Replace the draft with user-edited text
    pub fn edit_script<S: Into<String>>(&mut self, text: S) -> Result<()> {
        self.require("edit the script", PipelineStage::Ingested..=PipelineStage::Delivered)?;

        self.editor.replace(text);
        self.discard_synthesis();
        self.transition(PipelineStage::ScriptDrafted);
        Ok(())
    }

    /// Accept the current draft for synthesis
    pub fn finalize_script(&mut self) -> Result<()> {
        self.require("finalize the script", PipelineStage::ScriptDrafted..=PipelineStage::ScriptFinalized)?;

        if !self.editor.is_ready() {
            return Err(VoxoverError::EmptyScript);
        }
        self.transition(PipelineStage::ScriptFinalized);
        Ok(())
    }

    /// Speak the finalized script. May be repeated with a different voice.
    pub async fn synthesize(&mut self, voice: VoiceConfig) -> Result<&NarrationAudio> {
        self.require("synthesize", PipelineStage::ScriptFinalized..=PipelineStage::Delivered)?;

        let script = self
            .editor
            .current()
            .filter(|s| !s.is_empty())
            .ok_or(VoxoverError::EmptyScript)?;
        let duration = self.current_asset()?.duration;

        let audio = self
            .synthesizer
            .synthesize(script, &voice, duration, self.media.as_ref(), self.workdir.path())
            .await?;

        self.discard_synthesis();
        self.voice = Some(voice);
        self.narration = Some(audio);
        self.transition(PipelineStage::Synthesized);

        self.narration.as_ref().ok_or(VoxoverError::EmptyScript)
    }

    /// Mix the narration into the video using the ratio chosen at synthesis
    pub async fn mix(&mut self) -> Result<&OutputVideo> {
        self.require("mix", PipelineStage::Synthesized..=PipelineStage::Delivered)?;

        let (asset, narration, voice) = match (&self.asset, &self.narration, &self.voice) {
            (Some(a), Some(n), Some(v)) => (a, n, v),
            _ => return Err(self.invalid("mix")),
        };

        let output = self
            .mixer
            .mix(asset, narration, voice.mix_ratio(), self.media.as_ref(), self.workdir.path())
            .await?;

        if let Some(previous) = self.output.replace(output) {
            remove_quietly(&previous.path);
        }
        self.delivered = None;
        self.transition(PipelineStage::Mixed);

        self.output.as_ref().ok_or_else(|| VoxoverError::MixFailed("no output".to_string()))
    }

    /// Export the mixed video to `destination`
    pub async fn deliver(&mut self, destination: &Path) -> Result<PathBuf> {
        self.require("deliver", PipelineStage::Mixed..=PipelineStage::Delivered)?;

        let output = self.output.as_ref().ok_or_else(|| self.invalid("deliver"))?;
        let path = delivery::deliver(output, destination).await?;

        self.delivered = Some(path.clone());
        self.transition(PipelineStage::Delivered);
        Ok(path)
    }

    /// Forget everything and go back to Idle
    pub fn reset(&mut self) {
        if let Some(asset) = self.asset.take() {
            remove_quietly(&asset.path);
        }
        self.editor.clear();
        self.discard_synthesis();
        self.transition(PipelineStage::Idle);
    }

    /// Run every stage in order without user interaction
    pub async fn run_pipeline(&mut self, request: &PipelineRequest) -> Result<PathBuf> {
        self.ingest(&request.input).await?;

        match &request.script_override {
            Some(text) => self.edit_script(text.clone())?,
            None => {
                self.generate_script(&request.instructions).await?;
            }
        }
        self.finalize_script()?;
        self.synthesize(request.voice).await?;
        self.mix().await?;
        self.deliver(&request.destination).await
    }

    fn require(&self, operation: &'static str, allowed: RangeInclusive<PipelineStage>) -> Result<()> {
        if allowed.contains(&self.stage) {
            Ok(())
        } else {
            Err(self.invalid(operation))
        }
    }

    fn invalid(&self, operation: &'static str) -> VoxoverError {
        VoxoverError::InvalidTransition {
            operation,
            stage: self.stage.to_string(),
        }
    }

    fn current_asset(&self) -> Result<&VideoAsset> {
        self.asset.as_ref().ok_or_else(|| self.invalid("use the video"))
    }

    fn transition(&mut self, next: PipelineStage) {
        if self.stage != next {
            info!("Pipeline stage: {} -> {}", self.stage, next);
        }
        self.stage = next;
    }

    fn discard_synthesis(&mut self) {
        if let Some(narration) = self.narration.take() {
            remove_quietly(&narration.path);
        }
        if let Some(output) = self.output.take() {
            remove_quietly(&output.path);
        }
        self.voice = None;
        self.delivered = None;
    }
}

fn remove_quietly(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        debug!("Could not remove {}: {}", path.display(), e);
    }
}
