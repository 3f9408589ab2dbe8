pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod probe;
pub mod transcode;
pub mod tts;
pub mod wav;

pub use config::{ClientConfig, Endpoint};
pub use error::{Result, YakyakError};
pub use output::OutputSink;
pub use pipeline::{RunReport, Synthesizer};
pub use transcode::{FfmpegTranscoder, OutputFormat, Transcoder};
pub use tts::{StreamEnd, SynthesisRequest, SynthesizedAudio, TTSError, Voice, WyomingTTS};
pub use wav::{AssembledWav, AudioParams, WavAssembler};
