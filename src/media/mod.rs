// Modular media processing architecture
//
// This module provides a clean abstraction over media processing operations:
// - Processor: ffmpeg/ffprobe implementation built on abstract commands
// - Commands: Command builders and abstractions
// - Probe: ffprobe output parsing

pub mod commands;
pub mod probe;
pub mod processor;

use async_trait::async_trait;
use std::path::Path;

pub use commands::*;
pub use probe::*;
pub use processor::*;

use crate::config::MediaConfig;
use crate::error::Result;

/// Main trait for media processing operations
#[async_trait]
pub trait MediaProcessorTrait: Send + Sync {
    /// Check if the media tools are available
    fn check_availability(&self) -> Result<()>;

    /// Read duration, resolution and stream layout of a media file
    async fn probe(&self, path: &Path) -> Result<MediaInfo>;

    /// Decode the audio of any media file to 16-bit PCM WAV
    async fn extract_audio(
        &self,
        input_path: &Path,
        wav_path: &Path,
        sample_rate: u32,
        channels: u16,
    ) -> Result<()>;

    /// Save a single frame at `timestamp` seconds as an image
    async fn extract_frame(&self, video_path: &Path, timestamp: f64, image_path: &Path) -> Result<()>;

    /// Replace the audio of a video, copying the visual track unchanged
    async fn mux_audio(
        &self,
        video_path: &Path,
        audio_path: &Path,
        output_path: &Path,
        duration: f64,
    ) -> Result<()>;
}

/// Factory for creating media processor instances
pub struct MediaProcessorFactory;

impl MediaProcessorFactory {
    /// Create the default media processor implementation (FFmpeg-based)
    pub fn create_processor(config: MediaConfig) -> Box<dyn MediaProcessorTrait> {
        Box::new(processor::MediaProcessorImpl::new(config))
    }
}
