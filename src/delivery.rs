use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

use crate::error::{Result, VoxoverError};
use crate::ingest::VideoFormat;

/// Final muxed video, living in the session directory until delivered
#[derive(Debug, Clone, PartialEq)]
pub struct OutputVideo {
    pub path: PathBuf,
    pub duration: f64,
    pub mix_ratio: f64,
    pub format: VideoFormat,
}

impl OutputVideo {
    /// File to hand to a player for inline preview
    pub fn preview_path(&self) -> &Path {
        &self.path
    }
}

/// Copy the output to `destination`, creating parent directories as needed
pub async fn deliver(output: &OutputVideo, destination: &Path) -> Result<PathBuf> {
    if !output.path.is_file() {
        return Err(VoxoverError::FileNotFound(output.path.display().to_string()));
    }

    if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    fs::copy(&output.path, destination).await?;

    info!("Delivered {} ({:.2}s) to {}", output.path.display(), output.duration, destination.display());
    Ok(destination.to_path_buf())
}

/// Default download name: `<stem>_narrated_<timestamp>.<ext>` next to the source
pub fn default_destination(source: &Path, format: VideoFormat) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video".to_string());
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let name = format!("{}_narrated_{}.{}", stem, stamp, format.extension());

    match source.parent() {
        Some(parent) => parent.join(name),
        None => PathBuf::from(name),
    }
}
