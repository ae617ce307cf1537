use std::path::Path;
use tokio::process::Command;
use tracing::debug;

use crate::error::{Result, VoxoverError};

/// Abstract media processing command representation
#[derive(Debug, Clone)]
pub struct MediaCommand {
    pub binary_path: String,
    pub args: Vec<String>,
    pub description: String,
}

impl MediaCommand {
    /// Create a new media processing command
    pub fn new<S1: Into<String>, S2: Into<String>>(binary_path: S1, description: S2) -> Self {
        Self {
            binary_path: binary_path.into(),
            args: Vec::new(),
            description: description.into(),
        }
    }

    /// Add an argument
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(|s| s.into()));
        self
    }

    /// Add input file
    pub fn input<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg("-i").arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Add output file
    pub fn output<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Force overwrite output
    pub fn overwrite(self) -> Self {
        self.arg("-y")
    }

    /// Select a stream for the output
    pub fn map<S: Into<String>>(self, selector: S) -> Self {
        self.arg("-map").arg(selector)
    }

    /// Seek to a position (seconds) before the next input
    pub fn seek(self, seconds: f64) -> Self {
        self.arg("-ss").arg(format!("{:.3}", seconds))
    }

    /// Limit output duration (seconds)
    pub fn duration(self, seconds: f64) -> Self {
        self.arg("-t").arg(format!("{:.3}", seconds))
    }

    /// Set video codec
    pub fn video_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:v").arg(codec)
    }

    /// Set audio codec
    pub fn audio_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:a").arg(codec)
    }

    /// Copy video stream
    pub fn copy_video(self) -> Self {
        self.video_codec("copy")
    }

    /// Disable video
    pub fn no_video(self) -> Self {
        self.arg("-vn")
    }

    /// Set audio sample rate
    pub fn audio_sample_rate(self, rate: u32) -> Self {
        self.arg("-ar").arg(rate.to_string())
    }

    /// Set audio channels
    pub fn audio_channels(self, channels: u16) -> Self {
        self.arg("-ac").arg(channels.to_string())
    }

    /// Execute the command
    pub async fn execute(&self) -> Result<()> {
        self.execute_capture().await.map(|_| ())
    }

    /// Execute the command and return its stdout
    pub async fn execute_capture(&self) -> Result<String> {
        debug!("Executing media processing command: {} {:?}", self.binary_path, self.args);
        debug!("Description: {}", self.description);

        let output = Command::new(&self.binary_path)
            .args(&self.args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| VoxoverError::Media(format!("Failed to execute media processor: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(VoxoverError::Media(format!(
                "{} failed: {}",
                self.description,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Builder for the media operations the narration pipeline needs
pub struct MediaCommandBuilder {
    binary_path: String,
    probe_binary_path: String,
}

impl MediaCommandBuilder {
    /// Create a new command builder
    pub fn new<S1: Into<String>, S2: Into<String>>(binary_path: S1, probe_binary_path: S2) -> Self {
        Self {
            binary_path: binary_path.into(),
            probe_binary_path: probe_binary_path.into(),
        }
    }

    /// Build ffprobe command emitting streams and format as JSON
    pub fn probe<P: AsRef<Path>>(&self, path: P) -> MediaCommand {
        MediaCommand::new(&self.probe_binary_path, "Media probe")
            .args(["-v", "error", "-print_format", "json", "-show_format", "-show_streams"])
            .output(path)
    }

    /// Build audio extraction command producing 16-bit PCM WAV
    pub fn extract_audio<P: AsRef<Path>>(
        &self,
        input_path: P,
        wav_path: P,
        sample_rate: u32,
        channels: u16,
    ) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Audio extraction")
            .overwrite()
            .input(input_path)
            .no_video()
            .audio_codec("pcm_s16le")
            .audio_sample_rate(sample_rate)
            .audio_channels(channels)
            .output(wav_path)
    }

    /// Build single-frame extraction command
    pub fn extract_frame<P: AsRef<Path>>(
        &self,
        video_path: P,
        timestamp: f64,
        image_path: P,
    ) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Frame extraction")
            .overwrite()
            .seek(timestamp)
            .input(video_path)
            .arg("-frames:v").arg("1")
            .arg("-q:v").arg("3")
            .output(image_path)
    }

    /// Build mux command: video stream copied from the first input, audio from the second
    pub fn mux_audio<P: AsRef<Path>>(
        &self,
        video_path: P,
        audio_path: P,
        output_path: P,
        duration: f64,
        audio_codec: &str,
        additional_options: &[String],
    ) -> MediaCommand {
        let mut cmd = MediaCommand::new(&self.binary_path, "Narration mux")
            .overwrite()
            .input(video_path)
            .input(audio_path)
            .map("0:v:0")
            .map("1:a:0")
            .copy_video()
            .audio_codec(audio_codec)
            .duration(duration);

        for option in additional_options {
            cmd = cmd.arg(option);
        }

        cmd.output(output_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> MediaCommandBuilder {
        MediaCommandBuilder::new("ffmpeg", "ffprobe")
    }

    #[test]
    fn test_mux_copies_visual_track_and_caps_duration() {
        let cmd = builder().mux_audio(
            Path::new("in.mp4"),
            Path::new("mix.wav"),
            Path::new("out.mp4"),
            30.0,
            "aac",
            &["-movflags".to_string(), "+faststart".to_string()],
        );

        assert_eq!(cmd.binary_path, "ffmpeg");
        let joined = cmd.args.join(" ");
        assert!(joined.contains("-i in.mp4 -i mix.wav"));
        assert!(joined.contains("-map 0:v:0 -map 1:a:0"));
        assert!(joined.contains("-c:v copy"));
        assert!(joined.contains("-c:a aac"));
        assert!(joined.contains("-t 30.000"));
        assert!(joined.ends_with("-movflags +faststart out.mp4"));
    }

    #[test]
    fn test_extract_audio_resamples_to_pcm() {
        let cmd = builder().extract_audio(Path::new("voice.mp3"), Path::new("voice.wav"), 48_000, 2);
        let joined = cmd.args.join(" ");
        assert!(joined.contains("-vn -c:a pcm_s16le -ar 48000 -ac 2"));
        assert_eq!(cmd.args.last().map(String::as_str), Some("voice.wav"));
    }

    #[test]
    fn test_frame_seek_precedes_input() {
        let cmd = builder().extract_frame(Path::new("in.mov"), 12.5, Path::new("frame_003.jpg"));
        let joined = cmd.args.join(" ");
        assert!(joined.contains("-ss 12.500 -i in.mov -frames:v 1"));
    }

    #[test]
    fn test_probe_uses_probe_binary() {
        let cmd = builder().probe(Path::new("in.mkv"));
        assert_eq!(cmd.binary_path, "ffprobe");
        assert!(cmd.args.contains(&"-show_streams".to_string()));
    }
}
