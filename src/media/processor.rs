use async_trait::async_trait;
use std::path::Path;
use std::process::Command;
use tracing::{debug, info};

use crate::config::MediaConfig;
use crate::error::{Result, VoxoverError};
use super::{parse_probe_output, MediaCommandBuilder, MediaInfo, MediaProcessorTrait};

/// Concrete implementation of media processor (FFmpeg-based)
pub struct MediaProcessorImpl {
    config: MediaConfig,
    command_builder: MediaCommandBuilder,
}

impl MediaProcessorImpl {
    /// Create a new media processor implementation
    pub fn new(config: MediaConfig) -> Self {
        let command_builder = MediaCommandBuilder::new(&config.binary_path, &config.probe_binary_path);

        Self {
            config,
            command_builder,
        }
    }

    fn check_binary(binary: &str) -> Result<()> {
        let output = Command::new(binary)
            .arg("-version")
            .output()
            .map_err(|e| VoxoverError::Media(format!("{} not found: {}", binary, e)))?;

        if output.status.success() {
            let version_info = String::from_utf8_lossy(&output.stdout);
            debug!("{}", version_info.lines().next().unwrap_or("Unknown version"));
            Ok(())
        } else {
            Err(VoxoverError::Media(format!("{} version check failed", binary)))
        }
    }
}

#[async_trait]
impl MediaProcessorTrait for MediaProcessorImpl {
    fn check_availability(&self) -> Result<()> {
        Self::check_binary(&self.config.binary_path)?;
        Self::check_binary(&self.config.probe_binary_path)?;
        info!("Media processor is available");
        Ok(())
    }

    async fn probe(&self, path: &Path) -> Result<MediaInfo> {
        debug!("Probing {}", path.display());

        let stdout = self.command_builder.probe(path).execute_capture().await?;
        let info = parse_probe_output(&stdout)?;

        debug!("Probe result for {}: {:?}", path.display(), info);
        Ok(info)
    }

    async fn extract_audio(
        &self,
        input_path: &Path,
        wav_path: &Path,
        sample_rate: u32,
        channels: u16,
    ) -> Result<()> {
        info!("Extracting audio from {} to {}", input_path.display(), wav_path.display());

        self.command_builder
            .extract_audio(input_path, wav_path, sample_rate, channels)
            .execute()
            .await?;

        info!("Audio extraction completed");
        Ok(())
    }

    async fn extract_frame(&self, video_path: &Path, timestamp: f64, image_path: &Path) -> Result<()> {
        debug!("Extracting frame at {:.2}s from {}", timestamp, video_path.display());

        self.command_builder
            .extract_frame(video_path, timestamp, image_path)
            .execute()
            .await
    }

    async fn mux_audio(
        &self,
        video_path: &Path,
        audio_path: &Path,
        output_path: &Path,
        duration: f64,
    ) -> Result<()> {
        info!("Muxing {} into {} -> {}",
              audio_path.display(), video_path.display(), output_path.display());

        let command = self.command_builder.mux_audio(
            video_path,
            audio_path,
            output_path,
            duration,
            &self.config.audio_codec,
            &self.config.mux_options,
        );

        command.execute().await?;

        info!("Mux completed successfully");
        Ok(())
    }
}
