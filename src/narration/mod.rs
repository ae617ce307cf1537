// Narration script generation
//
// The generator turns a video and free-text instructions into a draft script:
// - samples frames so the provider can see the video
// - adds the word budget and read-aloud constraints to the instructions
// - calls the configured TextGenerator once (retries are user-initiated)

pub mod openai;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::{GenerationConfig, GenerationProvider};
use crate::error::{Result, VoxoverError};
use crate::ingest::VideoAsset;
use crate::media::MediaProcessorTrait;
use crate::script::{word_budget, NarrationScript};

/// One generation attempt: what the user asked for, about which video
#[derive(Debug, Clone)]
pub struct NarrationRequest<'a> {
    pub asset: &'a VideoAsset,
    pub instructions: String,
}

impl<'a> NarrationRequest<'a> {
    pub fn new<S: Into<String>>(asset: &'a VideoAsset, instructions: S) -> Self {
        Self {
            asset,
            instructions: instructions.into(),
        }
    }
}

/// Provider-neutral request handed to a TextGenerator
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub system_prompt: String,
    pub instructions: String,
    /// JPEG frames sampled from the video, in playback order
    pub frames: Vec<PathBuf>,
}

/// Text generation capability
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Return the raw narration text for the request
    async fn generate(&self, request: &GenerationRequest) -> Result<String>;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}

/// Factory for creating text generator instances
pub struct TextGeneratorFactory;

impl TextGeneratorFactory {
    pub fn create_generator(config: &GenerationConfig, api_key: &str) -> Result<Box<dyn TextGenerator>> {
        match config.provider {
            GenerationProvider::OpenAi => {
                Ok(Box::new(openai::OpenAiTextGenerator::new(config, api_key)?))
            }
        }
    }
}

pub struct NarrationGenerator {
    provider: Box<dyn TextGenerator>,
    frame_count: usize,
    system_prompt: String,
    words_per_minute: f64,
}

impl NarrationGenerator {
    pub fn new(provider: Box<dyn TextGenerator>, config: &GenerationConfig, words_per_minute: f64) -> Self {
        Self {
            provider,
            frame_count: config.frame_count,
            system_prompt: config.system_prompt.clone(),
            words_per_minute,
        }
    }

    /// Produce a draft script for the request
    pub async fn generate(
        &self,
        request: &NarrationRequest<'_>,
        media: &dyn MediaProcessorTrait,
        workdir: &Path,
    ) -> Result<NarrationScript> {
        let asset = request.asset;
        let budget = word_budget(asset.duration, self.words_per_minute);
        info!("Generating narration with {} (video {:.2}s, at most {} words)",
              self.provider.name(), asset.duration, budget);

        // Frames only live for the duration of this attempt.
        let frame_dir = tempfile::Builder::new()
            .prefix("frames_")
            .tempdir_in(workdir)?;
        let frames = self.sample_frames(asset, media, frame_dir.path()).await?;

        let generation_request = GenerationRequest {
            system_prompt: self.system_prompt.clone(),
            instructions: build_instructions(&request.instructions, budget),
            frames,
        };
        debug!("Narration instructions: {}", generation_request.instructions);

        let raw = self.provider.generate(&generation_request).await.map_err(|e| match e {
            VoxoverError::GenerationFailed(_) => e,
            other => VoxoverError::GenerationFailed(other.to_string()),
        })?;

        let script = NarrationScript::new(clean_response(&raw));
        if script.is_empty() {
            return Err(VoxoverError::GenerationFailed("provider returned an empty script".to_string()));
        }
        if script.word_count() > budget {
            warn!("Generated script has {} words, budget was {}", script.word_count(), budget);
        }

        info!("Generated narration draft: {} words", script.word_count());
        Ok(script)
    }

    async fn sample_frames(
        &self,
        asset: &VideoAsset,
        media: &dyn MediaProcessorTrait,
        frame_dir: &Path,
    ) -> Result<Vec<PathBuf>> {
        let mut frames = Vec::with_capacity(self.frame_count);
        for (index, timestamp) in frame_timestamps(asset.duration, self.frame_count).into_iter().enumerate() {
            let frame_path = frame_dir.join(format!("frame_{:03}.jpg", index));
            media
                .extract_frame(&asset.path, timestamp, &frame_path)
                .await
                .map_err(|e| VoxoverError::GenerationFailed(format!("frame sampling failed: {}", e)))?;
            frames.push(frame_path);
        }
        Ok(frames)
    }
}

/// Append the word budget and read-aloud constraints to the user's instructions
pub fn build_instructions(instructions: &str, word_budget: usize) -> String {
    let mut modified = instructions.trim().to_string();
    modified.push_str(&format!(
        "\nYour voiceover text should be less than {} words long.",
        word_budget
    ));
    modified.push_str(
        "\nDo not use any hashtags or emojis in the voiceover text as this will be read aloud.",
    );
    modified
}

/// Evenly spaced timestamps covering the whole video, first frame at 0
pub fn frame_timestamps(duration: f64, count: usize) -> Vec<f64> {
    // Seeking exactly to the end yields no frame.
    let last = (duration - 0.1).max(0.0);
    match count {
        0 => Vec::new(),
        1 => vec![duration / 2.0],
        n => (0..n)
            .map(|i| (i as f64 * duration / (n - 1) as f64).min(last))
            .collect(),
    }
}

/// Strip Markdown code fences some models wrap around plain text
pub fn clean_response(raw: &str) -> String {
    raw.replace("```html", "")
        .replace("```text", "")
        .replace("```", "")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::ingest::VideoFormat;
    use crate::testing::FakeMedia;

    fn asset(dir: &Path, duration: f64) -> VideoAsset {
        VideoAsset {
            path: dir.join("source.mp4"),
            source_path: PathBuf::from("product.mp4"),
            format: VideoFormat::Mp4,
            duration,
            width: 1920,
            height: 1080,
            has_audio: true,
        }
    }

    #[test]
    fn test_instructions_carry_budget_and_constraints() {
        let text = build_instructions("cheerful tone, explain the product", 100);
        assert!(text.starts_with("cheerful tone, explain the product\n"));
        assert!(text.contains("less than 100 words long"));
        assert!(text.contains("hashtags or emojis"));
    }

    #[test]
    fn test_frame_timestamps_span_video() {
        let stamps = frame_timestamps(9.0, 10);
        assert_eq!(stamps.len(), 10);
        assert_eq!(stamps[0], 0.0);
        assert_eq!(stamps[1], 1.0);
        assert!((stamps[9] - 8.9).abs() < 1e-9);
        assert!(stamps.windows(2).all(|w| w[0] <= w[1]));

        assert_eq!(frame_timestamps(8.0, 1), vec![4.0]);
        assert!(frame_timestamps(8.0, 0).is_empty());
    }

    #[test]
    fn test_clean_response_strips_fences() {
        assert_eq!(clean_response("```\nWelcome to the show.\n```"), "Welcome to the show.");
        assert_eq!(clean_response("```html Hi there ```"), "Hi there");
    }

    #[tokio::test]
    async fn test_generate_sends_frames_and_budget() {
        let work = tempfile::tempdir().unwrap();
        let media = FakeMedia::with_video(30.0, 1920, 1080);
        let asset = asset(work.path(), 30.0);

        let mut provider = MockTextGenerator::new();
        provider.expect_name().return_const("mock");
        provider
            .expect_generate()
            .withf(|req: &GenerationRequest| {
                req.frames.len() == 10
                    && req.frames.iter().all(|f| f.exists())
                    && req.instructions.contains("less than 100 words")
            })
            .times(1)
            .returning(|_| Ok("```\nMeet the blender that does it all.\n```".to_string()));

        let generator = NarrationGenerator::new(Box::new(provider), &Config::default().generation, 200.0);
        let request = NarrationRequest::new(&asset, "cheerful tone, explain the product");
        let script = generator.generate(&request, &media, work.path()).await.unwrap();

        assert_eq!(script.text(), "Meet the blender that does it all.");
        assert_eq!(media.frames.lock().unwrap().len(), 10);
        // Frame directory is removed once the attempt is over
        assert!(std::fs::read_dir(work.path()).unwrap().next().is_none());
    }

    #[tokio::test]
    async fn test_provider_errors_become_generation_failed() {
        let work = tempfile::tempdir().unwrap();
        let media = FakeMedia::with_video(30.0, 1920, 1080);
        let asset = asset(work.path(), 30.0);

        let mut provider = MockTextGenerator::new();
        provider.expect_name().return_const("mock");
        provider
            .expect_generate()
            .times(1)
            .returning(|_| Err(VoxoverError::Config("HTTP 500".to_string())));

        let generator = NarrationGenerator::new(Box::new(provider), &Config::default().generation, 200.0);
        let request = NarrationRequest::new(&asset, "calm");
        let result = generator.generate(&request, &media, work.path()).await;
        assert!(matches!(result, Err(VoxoverError::GenerationFailed(msg)) if msg.contains("HTTP 500")));
    }

    #[tokio::test]
    async fn test_empty_response_is_generation_failed() {
        let work = tempfile::tempdir().unwrap();
        let media = FakeMedia::with_video(30.0, 1920, 1080);
        let asset = asset(work.path(), 30.0);

        let mut provider = MockTextGenerator::new();
        provider.expect_name().return_const("mock");
        provider.expect_generate().returning(|_| Ok("```\n```".to_string()));

        let generator = NarrationGenerator::new(Box::new(provider), &Config::default().generation, 200.0);
        let request = NarrationRequest::new(&asset, "calm");
        assert!(matches!(
            generator.generate(&request, &media, work.path()).await,
            Err(VoxoverError::GenerationFailed(_))
        ));
    }
}
