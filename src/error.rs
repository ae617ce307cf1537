use thiserror::Error;

#[derive(Error, Debug)]
pub enum VoxoverError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Corrupt media: {0}")]
    CorruptMedia(String),

    #[error("Narration generation failed: {0}")]
    GenerationFailed(String),

    #[error("Script too long: estimated {estimated:.1}s of speech for a {available:.1}s video")]
    ScriptTooLong { estimated: f64, available: f64 },

    #[error("Narration script is empty")]
    EmptyScript,

    #[error("Speech synthesis failed: {0}")]
    SynthesisFailed(String),

    #[error("Audio/video mix failed: {0}")]
    MixFailed(String),

    #[error("Invalid voice configuration: {0}")]
    InvalidVoiceConfig(String),

    #[error("Cannot {operation} while pipeline is {stage}")]
    InvalidTransition { operation: &'static str, stage: String },

    #[error("Missing configuration: {0}")]
    ConfigMissing(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Media processing error: {0}")]
    Media(String),

    #[error("File not found: {0}")]
    FileNotFound(String),
}

impl VoxoverError {
    /// Stage errors leave the session usable; only configuration problems are fatal.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::ConfigMissing(_) | Self::Config(_))
    }
}

pub type Result<T> = std::result::Result<T, VoxoverError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_errors_are_fatal() {
        assert!(!VoxoverError::ConfigMissing("OPENAI_API_KEY".into()).is_recoverable());
        assert!(!VoxoverError::Config("bad".into()).is_recoverable());
        assert!(VoxoverError::SynthesisFailed("timeout".into()).is_recoverable());
        assert!(VoxoverError::UnsupportedFormat("txt".into()).is_recoverable());

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        assert!(VoxoverError::from(io).is_recoverable());
    }
}
