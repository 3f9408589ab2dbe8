use crate::config::ConfigError;
use crate::transcode::TranscodeError;
use crate::tts::TTSError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, YakyakError>;

#[derive(Error, Debug)]
pub enum YakyakError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Server {0} is offline")]
    Offline(String),

    #[error("Synthesis failed: {0}")]
    Synthesis(#[from] TTSError),

    #[error("Transcoding failed: {0}")]
    Transcode(#[from] TranscodeError),

    #[error("ffmpeg is not installed or not found in PATH")]
    FfmpegMissing,

    #[error("Failed to write {target}: {source}")]
    Output {
        target: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Self-test failed: {0}")]
    SelfTest(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl YakyakError {
    /// Process exit status for this failure
    pub fn exit_code(&self) -> u8 {
        match self {
            YakyakError::Io(_) => 1,
            YakyakError::InvalidInput(_) | YakyakError::Synthesis(TTSError::EmptyText) => 2,
            YakyakError::Offline(_) => 3,
            YakyakError::Synthesis(_) => 4,
            YakyakError::Transcode(_) | YakyakError::FfmpegMissing => 5,
            YakyakError::Output { .. } => 6,
            YakyakError::SelfTest(_) => 7,
            YakyakError::Config(_) => 8,
        }
    }
}
