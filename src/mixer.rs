use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::MixConfig;
use crate::delivery::OutputVideo;
use crate::error::{Result, VoxoverError};
use crate::ingest::VideoAsset;
use crate::media::MediaProcessorTrait;
use crate::speech::NarrationAudio;

/// Weighted mix of one sample pair: `ratio * narration + (1 - ratio) * original`.
///
/// Ratios 0 and 1 return the original or narration sample unchanged.
pub fn mix_sample(original: i16, narration: i16, ratio: f64) -> i16 {
    (ratio * narration as f64 + (1.0 - ratio) * original as f64)
        .round()
        .clamp(i16::MIN as f64, i16::MAX as f64) as i16
}

/// Stream two decoded tracks into `output`, writing exactly `len` interleaved samples.
///
/// Samples past the end of either input count as silence, and narration
/// beyond `len` is dropped. `original` is `None` for videos without audio.
pub fn mix_files(
    original: Option<&Path>,
    narration: &Path,
    output: &Path,
    spec: hound::WavSpec,
    ratio: f64,
    len: usize,
) -> Result<()> {
    let mut original_reader = match original {
        Some(path) => Some(open_wav(path, spec, "original audio")?),
        None => None,
    };
    let mut narration_reader = open_wav(narration, spec, "narration")?;

    let mut original_samples = original_reader.as_mut().map(|r| r.samples::<i16>());
    let mut narration_samples = narration_reader.samples::<i16>();

    let encode_err = |e: hound::Error| VoxoverError::MixFailed(format!("cannot write {}: {}", output.display(), e));
    let mut writer = hound::WavWriter::create(output, spec).map_err(encode_err)?;
    for _ in 0..len {
        let o = next_sample(original_samples.as_mut(), "original audio")?;
        let n = next_sample(Some(&mut narration_samples), "narration")?;
        writer.write_sample(mix_sample(o, n, ratio)).map_err(encode_err)?;
    }
    writer.finalize().map_err(encode_err)?;
    Ok(())
}

/// Interleaved sample count covering `duration` seconds
pub fn target_sample_count(duration: f64, sample_rate: u32, channels: u16) -> usize {
    (duration * sample_rate as f64).round() as usize * channels as usize
}

pub struct AudioMixer {
    config: MixConfig,
}

impl AudioMixer {
    pub fn new(config: MixConfig) -> Self {
        Self { config }
    }

    /// Mix narration over the video's own audio and mux the result with the untouched visual track
    pub async fn mix(
        &self,
        asset: &VideoAsset,
        narration: &NarrationAudio,
        ratio: f64,
        media: &dyn MediaProcessorTrait,
        workdir: &Path,
    ) -> Result<OutputVideo> {
        if !(0.0..=1.0).contains(&ratio) {
            return Err(VoxoverError::InvalidVoiceConfig(format!("mix ratio {} outside [0, 1]", ratio)));
        }
        info!("Mixing narration into {} (ratio {:.2})", asset.source_path.display(), ratio);

        if narration.duration > asset.duration {
            warn!("Narration is {:.2}s but the video is {:.2}s; the narration will be cut",
                  narration.duration, asset.duration);
        }

        let scratch = tempfile::Builder::new()
            .prefix("mix_")
            .tempdir_in(workdir)
            .map_err(|e| VoxoverError::MixFailed(format!("cannot create scratch directory: {}", e)))?;

        let original_wav = if asset.has_audio {
            let wav = scratch.path().join("original.wav");
            self.extract(media, &asset.path, &wav, "original audio").await?;
            Some(wav)
        } else {
            debug!("Video has no audio track; mixing against silence");
            None
        };
        let narration_wav = scratch.path().join("narration.wav");
        self.extract(media, &narration.path, &narration_wav, "narration").await?;

        let len = target_sample_count(asset.duration, self.config.sample_rate, self.config.channels);
        let mixed_wav = scratch.path().join("mixed.wav");
        let spec = self.wav_spec();
        let mixed_path = mixed_wav.clone();
        tokio::task::spawn_blocking(move || {
            mix_files(original_wav.as_deref(), &narration_wav, &mixed_path, spec, ratio, len)
        })
        .await
        .map_err(|e| VoxoverError::MixFailed(format!("mix task failed: {}", e)))??;

        let output_path = self.output_path(asset, workdir);
        media
            .mux_audio(&asset.path, &mixed_wav, &output_path, asset.duration)
            .await
            .map_err(|e| VoxoverError::MixFailed(e.to_string()))?;

        info!("Mixed output written to {}", output_path.display());
        Ok(OutputVideo {
            path: output_path,
            duration: asset.duration,
            mix_ratio: ratio,
            format: asset.format,
        })
    }

    async fn extract(
        &self,
        media: &dyn MediaProcessorTrait,
        input: &Path,
        wav_path: &Path,
        label: &str,
    ) -> Result<()> {
        media
            .extract_audio(input, wav_path, self.config.sample_rate, self.config.channels)
            .await
            .map_err(|e| VoxoverError::MixFailed(format!("cannot extract {}: {}", label, e)))
    }

    fn wav_spec(&self) -> hound::WavSpec {
        hound::WavSpec {
            channels: self.config.channels,
            sample_rate: self.config.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        }
    }

    fn output_path(&self, asset: &VideoAsset, workdir: &Path) -> PathBuf {
        workdir.join(format!(
            "{}_narrated_{}.{}",
            asset.file_stem(),
            uuid::Uuid::new_v4().simple(),
            asset.format.extension()
        ))
    }
}

type WavFileReader = hound::WavReader<std::io::BufReader<std::fs::File>>;

/// Open a decoded track and check it has the PCM layout the mix runs at
fn open_wav(path: &Path, expected: hound::WavSpec, label: &str) -> Result<WavFileReader> {
    let reader = hound::WavReader::open(path)
        .map_err(|e| VoxoverError::MixFailed(format!("cannot open {}: {}", path.display(), e)))?;
    let spec = reader.spec();
    if spec.bits_per_sample != 16 || spec.sample_format != hound::SampleFormat::Int {
        return Err(VoxoverError::MixFailed(format!("{} is not 16-bit PCM", label)));
    }
    if spec.sample_rate != expected.sample_rate || spec.channels != expected.channels {
        return Err(VoxoverError::MixFailed(format!(
            "{} decoded as {} Hz/{} ch, expected {} Hz/{} ch",
            label, spec.sample_rate, spec.channels, expected.sample_rate, expected.channels
        )));
    }
    Ok(reader)
}

fn next_sample<I>(samples: Option<&mut I>, label: &str) -> Result<i16>
where
    I: Iterator<Item = hound::Result<i16>>,
{
    match samples.and_then(|s| s.next()) {
        Some(Ok(sample)) => Ok(sample),
        Some(Err(e)) => Err(VoxoverError::MixFailed(format!("cannot decode {}: {}", label, e))),
        None => Ok(0),
    }
}
