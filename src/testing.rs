//! Test doubles shared by the unit tests. Nothing here shells out or touches the network.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{Result, VoxoverError};
use crate::media::{MediaInfo, MediaProcessorTrait};

/// Media processor that fabricates probe results and writes constant-level WAV files.
pub struct FakeMedia {
    pub video: MediaInfo,
    pub narration_duration: f64,
    pub original_level: i16,
    pub narration_level: i16,
    pub fail_probe: bool,
    pub fail_mux: bool,
    /// Decode at this rate instead of the requested one
    pub decoded_rate: Option<u32>,
    /// Decode with this channel count instead of the requested one
    pub decoded_channels: Option<u16>,
    pub frames: Mutex<Vec<f64>>,
    pub muxed: Mutex<Vec<(PathBuf, f64)>>,
}

impl FakeMedia {
    pub fn with_video(duration: f64, width: u32, height: u32) -> Self {
        Self {
            video: MediaInfo {
                duration,
                width: Some(width),
                height: Some(height),
                has_video: true,
                has_audio: true,
                format_name: "mov,mp4,m4a,3gp,3g2,mj2".to_string(),
            },
            narration_duration: duration / 2.0,
            original_level: 1000,
            narration_level: 2000,
            fail_probe: false,
            fail_mux: false,
            decoded_rate: None,
            decoded_channels: None,
            frames: Mutex::new(Vec::new()),
            muxed: Mutex::new(Vec::new()),
        }
    }

    fn is_narration(path: &Path) -> bool {
        path.extension().and_then(|e| e.to_str()) == Some("mp3")
    }
}

#[async_trait]
impl MediaProcessorTrait for FakeMedia {
    fn check_availability(&self) -> Result<()> {
        Ok(())
    }

    async fn probe(&self, path: &Path) -> Result<MediaInfo> {
        if Self::is_narration(path) {
            return Ok(MediaInfo {
                duration: self.narration_duration,
                width: None,
                height: None,
                has_video: false,
                has_audio: true,
                format_name: "mp3".to_string(),
            });
        }
        if self.fail_probe {
            return Err(VoxoverError::Media("Invalid data found when processing input".to_string()));
        }
        Ok(self.video.clone())
    }

    async fn extract_audio(
        &self,
        input_path: &Path,
        wav_path: &Path,
        sample_rate: u32,
        channels: u16,
    ) -> Result<()> {
        let (level, duration) = if Self::is_narration(input_path) {
            (self.narration_level, self.narration_duration)
        } else {
            (self.original_level, self.video.duration)
        };
        write_constant_wav(
            wav_path,
            self.decoded_rate.unwrap_or(sample_rate),
            self.decoded_channels.unwrap_or(channels),
            level,
            duration,
        );
        Ok(())
    }

    async fn extract_frame(&self, _video_path: &Path, timestamp: f64, image_path: &Path) -> Result<()> {
        self.frames.lock().unwrap().push(timestamp);
        std::fs::write(image_path, b"\xFF\xD8\xFF\xE0fake-jpeg")?;
        Ok(())
    }

    async fn mux_audio(
        &self,
        _video_path: &Path,
        audio_path: &Path,
        output_path: &Path,
        duration: f64,
    ) -> Result<()> {
        if self.fail_mux {
            return Err(VoxoverError::Media("Narration mux failed: encoder error".to_string()));
        }
        // The "muxed" file is the mixed WAV itself so tests can inspect the samples.
        std::fs::copy(audio_path, output_path)?;
        self.muxed.lock().unwrap().push((output_path.to_path_buf(), duration));
        Ok(())
    }
}

pub fn write_constant_wav(path: &Path, sample_rate: u32, channels: u16, level: i16, duration: f64) {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    let frames = (duration * sample_rate as f64).round() as usize;
    for _ in 0..frames * channels as usize {
        writer.write_sample(level).unwrap();
    }
    writer.finalize().unwrap();
}

pub fn read_wav(path: &Path) -> (hound::WavSpec, Vec<i16>) {
    let mut reader = hound::WavReader::open(path).unwrap();
    let spec = reader.spec();
    let samples = reader.samples::<i16>().map(|s| s.unwrap()).collect();
    (spec, samples)
}
