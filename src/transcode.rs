//! Output formats and conversion of assembled WAV audio to compressed formats.
//!
//! Compression is delegated to `ffmpeg`, which is also probed up front so a
//! missing install is reported before any synthesis starts.

use log::debug;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use strum::{Display, EnumString};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TranscodeError {
    #[error("{program} could not be started: {source}")]
    Unavailable {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("Transcoder produced no output for {0}")]
    EmptyOutput(OutputFormat),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Audio formats the client can write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, clap::ValueEnum)]
#[strum(serialize_all = "lowercase")]
pub enum OutputFormat {
    /// Uncompressed linear PCM in a WAV container
    Wav,
    /// MPEG-1 Layer III, encoded by ffmpeg
    Mp3,
}

impl OutputFormat {
    pub fn is_compressed(&self) -> bool {
        !matches!(self, OutputFormat::Wav)
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Wav => "wav",
            OutputFormat::Mp3 => "mp3",
        }
    }
}

/// Converts a WAV container into another format
pub trait Transcoder {
    fn transcode(&self, wav: &[u8], format: OutputFormat) -> Result<Vec<u8>, TranscodeError>;
}

/// Pipes audio through an `ffmpeg` child process
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    program: PathBuf,
}

impl FfmpegTranscoder {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl Transcoder for FfmpegTranscoder {
    fn transcode(&self, wav: &[u8], format: OutputFormat) -> Result<Vec<u8>, TranscodeError> {
        if !format.is_compressed() {
            return Ok(wav.to_vec());
        }

        let program = self.program.display().to_string();
        debug!("🎛️ Transcoding {} bytes of WAV to {} with {}", wav.len(), format, program);

        let mut child = Command::new(&self.program)
            .args(["-hide_banner", "-loglevel", "error"])
            .args(["-f", "wav", "-i", "pipe:0"])
            .args(["-f", format.extension(), "pipe:1"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| TranscodeError::Unavailable {
                program: program.clone(),
                source,
            })?;

        // Feed stdin from another thread so a full stdout pipe cannot deadlock us
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "ffmpeg stdin unavailable"))?;
        let input = wav.to_vec();
        let feeder = thread::spawn(move || -> io::Result<()> {
            stdin.write_all(&input)?;
            stdin.flush()
        });

        let output = child.wait_with_output()?;
        let fed = feeder
            .join()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "ffmpeg stdin writer panicked"))?;

        if !output.status.success() {
            return Err(TranscodeError::Failed {
                program,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        fed?;

        if output.stdout.is_empty() {
            return Err(TranscodeError::EmptyOutput(format));
        }

        debug!("✅ Transcoded to {} bytes of {}", output.stdout.len(), format);
        Ok(output.stdout)
    }
}

/// First line of `<program> -version` when it carries an ffmpeg version banner.
///
/// Returns `None` when the program cannot be run, exits non-zero, or prints
/// something else.
pub fn ffmpeg_version(program: &Path) -> Option<String> {
    let output = match Command::new(program)
        .arg("-version")
        .stdin(Stdio::null())
        .output()
    {
        Ok(output) => output,
        Err(e) => {
            debug!("Could not run {}: {}", program.display(), e);
            return None;
        }
    };

    if !output.status.success() {
        debug!("{} -version exited with {}", program.display(), output.status);
        return None;
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let first_line = stdout.lines().next()?.trim();
    first_line
        .contains("ffmpeg version")
        .then(|| first_line.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    const MISSING_PROGRAM: &str = "/nonexistent/bin/ffmpeg-yakyak";

    #[test]
    fn test_format_parsing() {
        assert_eq!(OutputFormat::from_str("wav").unwrap(), OutputFormat::Wav);
        assert_eq!(OutputFormat::from_str("mp3").unwrap(), OutputFormat::Mp3);
        assert!(OutputFormat::from_str("ogg").is_err());
        assert_eq!(OutputFormat::Mp3.to_string(), "mp3");
    }

    #[test]
    fn test_compression_flags() {
        assert!(!OutputFormat::Wav.is_compressed());
        assert!(OutputFormat::Mp3.is_compressed());
        assert_eq!(OutputFormat::Wav.extension(), "wav");
    }

    #[test]
    fn test_wav_passes_through() {
        let transcoder = FfmpegTranscoder::new(MISSING_PROGRAM);
        let bytes = transcoder.transcode(b"RIFF", OutputFormat::Wav).unwrap();
        assert_eq!(bytes, b"RIFF");
    }

    #[test]
    fn test_missing_ffmpeg_is_unavailable() {
        let transcoder = FfmpegTranscoder::new(MISSING_PROGRAM);
        let err = transcoder.transcode(b"RIFF", OutputFormat::Mp3).unwrap_err();
        assert!(matches!(err, TranscodeError::Unavailable { .. }));
    }

    #[test]
    fn test_missing_ffmpeg_has_no_version() {
        assert_eq!(ffmpeg_version(Path::new(MISSING_PROGRAM)), None);
    }

    #[test]
    fn test_other_program_has_no_version() {
        // `true` exits 0 without printing a banner
        #[cfg(unix)]
        assert_eq!(ffmpeg_version(Path::new("true")), None);
    }
}
