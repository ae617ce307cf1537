use std::fmt;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

use crate::error::{Result, VoxoverError};
use crate::media::MediaProcessorTrait;

/// Container formats accepted for upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoFormat {
    Mp4,
    Mov,
    Avi,
    Mkv,
}

impl VideoFormat {
    pub const ALL: [VideoFormat; 4] = [Self::Mp4, Self::Mov, Self::Avi, Self::Mkv];

    /// Determine the format from the file extension (case-insensitive)
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .ok_or_else(|| VoxoverError::UnsupportedFormat(format!(
                "{} has no file extension", path.display()
            )))?;

        match extension.as_str() {
            "mp4" => Ok(Self::Mp4),
            "mov" => Ok(Self::Mov),
            "avi" => Ok(Self::Avi),
            "mkv" => Ok(Self::Mkv),
            other => Err(VoxoverError::UnsupportedFormat(format!(
                ".{} (supported: mp4, mov, avi, mkv)", other
            ))),
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Mov => "mov",
            Self::Avi => "avi",
            Self::Mkv => "mkv",
        }
    }
}

impl fmt::Display for VideoFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// An uploaded video staged in the session directory
#[derive(Debug, Clone, PartialEq)]
pub struct VideoAsset {
    /// Copy inside the session directory; removed with the session
    pub path: PathBuf,
    /// Where the user's file came from
    pub source_path: PathBuf,
    pub format: VideoFormat,
    pub duration: f64,
    pub width: u32,
    pub height: u32,
    pub has_audio: bool,
}

impl VideoAsset {
    pub fn resolution(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }

    pub fn file_stem(&self) -> String {
        self.source_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "video".to_string())
    }
}

/// Validate and probe a video in place. The returned asset points at `source_path`.
pub async fn inspect(source_path: &Path, media: &dyn MediaProcessorTrait) -> Result<VideoAsset> {
    let format = VideoFormat::from_path(source_path)?;

    if !source_path.is_file() {
        return Err(VoxoverError::FileNotFound(source_path.display().to_string()));
    }

    let info = media
        .probe(source_path)
        .await
        .map_err(|e| VoxoverError::CorruptMedia(format!("{}: {}", source_path.display(), e)))?;

    if !info.has_video {
        return Err(VoxoverError::CorruptMedia(format!(
            "{} contains no video stream", source_path.display()
        )));
    }
    let (width, height) = match (info.width, info.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => {
            return Err(VoxoverError::CorruptMedia(format!(
                "{} has no readable resolution", source_path.display()
            )))
        }
    };
    if !(info.duration.is_finite() && info.duration > 0.0) {
        return Err(VoxoverError::CorruptMedia(format!(
            "{} has no readable duration", source_path.display()
        )));
    }

    Ok(VideoAsset {
        path: source_path.to_path_buf(),
        source_path: source_path.to_path_buf(),
        format,
        duration: info.duration,
        width,
        height,
        has_audio: info.has_audio,
    })
}

/// Validate, probe and stage a video into `workdir`
pub async fn ingest(
    source_path: &Path,
    workdir: &Path,
    media: &dyn MediaProcessorTrait,
) -> Result<VideoAsset> {
    info!("Ingesting video: {}", source_path.display());

    let mut asset = inspect(source_path, media).await?;

    let staged = workdir.join(format!("source_{}.{}", uuid::Uuid::new_v4(), asset.format.extension()));
    fs::copy(source_path, &staged).await?;
    debug!("Staged {} at {}", source_path.display(), staged.display());

    info!("Ingested {} ({}, {}, {:.2}s, audio: {})",
          source_path.display(), asset.format, asset.resolution(), asset.duration, asset.has_audio);

    asset.path = staged;
    Ok(asset)
}
