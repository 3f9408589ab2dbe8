//! Incremental assembly of raw PCM chunks into a WAV container.
//!
//! The first chunk of a stream fixes the sample rate, sample width and channel
//! count; every later chunk is appended as raw frames in arrival order.

use hound::{SampleFormat, WavSpec, WavWriter};
use log::{debug, warn};
use std::fmt;
use std::io::Cursor;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssemblerError {
    #[error("Audio stream already opened with {0}")]
    AlreadyOpen(AudioParams),

    #[error("Audio stream has not been opened")]
    NotOpen,

    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),

    #[error("Audio format changed mid-stream: expected {expected}, got {actual}")]
    FormatMismatch {
        expected: AudioParams,
        actual: AudioParams,
    },

    #[error("WAV encoding error: {0}")]
    Wav(#[from] hound::Error),
}

/// Format of a PCM stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioParams {
    /// Samples per second
    pub rate: u32,
    /// Bytes per sample (1 to 4)
    pub width: u16,
    pub channels: u16,
}

impl AudioParams {
    pub fn new(rate: u32, width: u16, channels: u16) -> Self {
        Self {
            rate,
            width,
            channels,
        }
    }

    /// Bytes in one frame (one sample for every channel)
    pub fn frame_size(&self) -> usize {
        self.width as usize * self.channels as usize
    }

    pub fn validate(&self) -> Result<(), AssemblerError> {
        if self.rate == 0 {
            return Err(AssemblerError::UnsupportedFormat(
                "sample rate must be non-zero".to_string(),
            ));
        }
        if self.channels == 0 {
            return Err(AssemblerError::UnsupportedFormat(
                "channel count must be non-zero".to_string(),
            ));
        }
        if !(1..=4).contains(&self.width) {
            return Err(AssemblerError::UnsupportedFormat(format!(
                "sample width of {} bytes",
                self.width
            )));
        }
        Ok(())
    }

    fn wav_spec(&self) -> WavSpec {
        WavSpec {
            channels: self.channels,
            sample_rate: self.rate,
            bits_per_sample: self.width * 8,
            sample_format: SampleFormat::Int,
        }
    }
}

impl fmt::Display for AudioParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} Hz, {}-bit, {} channel(s)",
            self.rate,
            self.width * 8,
            self.channels
        )
    }
}

/// A finished WAV file
#[derive(Debug, Clone)]
pub struct AssembledWav {
    pub params: AudioParams,
    /// Complete RIFF/WAVE bytes
    pub bytes: Vec<u8>,
    /// Length of the sample data inside `bytes`
    pub data_len: usize,
}

impl AssembledWav {
    pub fn header_len(&self) -> usize {
        self.bytes.len() - self.data_len
    }

    pub fn frames(&self) -> usize {
        self.data_len / self.params.frame_size()
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.frames() as f64 / self.params.rate as f64)
    }
}

/// Collects the frames of one audio stream
#[derive(Debug, Default)]
pub struct WavAssembler {
    params: Option<AudioParams>,
    data: Vec<u8>,
}

impl WavAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.params.is_some()
    }

    pub fn params(&self) -> Option<AudioParams> {
        self.params
    }

    /// Bytes appended so far
    pub fn data_len(&self) -> usize {
        self.data.len()
    }

    /// Fix the stream format. Only the first call succeeds.
    pub fn open(&mut self, params: AudioParams) -> Result<(), AssemblerError> {
        if let Some(current) = self.params {
            return Err(AssemblerError::AlreadyOpen(current));
        }
        params.validate()?;

        debug!("🎼 Opening audio stream: {}", params);
        self.params = Some(params);
        Ok(())
    }

    /// Fail if `params` differs from the format the stream was opened with
    pub fn check_format(&self, params: &AudioParams) -> Result<(), AssemblerError> {
        match self.params {
            None => Err(AssemblerError::NotOpen),
            Some(expected) if expected != *params => Err(AssemblerError::FormatMismatch {
                expected,
                actual: *params,
            }),
            Some(_) => Ok(()),
        }
    }

    pub fn append(&mut self, frames: &[u8]) -> Result<(), AssemblerError> {
        if self.params.is_none() {
            return Err(AssemblerError::NotOpen);
        }
        self.data.extend_from_slice(frames);
        Ok(())
    }

    /// Produce the WAV container: header followed by every appended frame
    pub fn finalize(self) -> Result<AssembledWav, AssemblerError> {
        let params = self.params.ok_or(AssemblerError::NotOpen)?;

        let frame_size = params.frame_size();
        let whole = self.data.len() - self.data.len() % frame_size;
        if whole < self.data.len() {
            warn!(
                "⚠️ Dropping {} trailing byte(s) that do not form a whole frame",
                self.data.len() - whole
            );
        }
        let data = &self.data[..whole];

        let mut cursor = Cursor::new(Vec::with_capacity(whole + 68));
        {
            let mut writer = WavWriter::new(&mut cursor, params.wav_spec())?;
            match params.width {
                1 => {
                    // WAV stores 8-bit audio unsigned; hound takes it signed
                    for &sample in data {
                        writer.write_sample(sample.wrapping_sub(128) as i8)?;
                    }
                }
                2 => {
                    for sample in data.chunks_exact(2) {
                        writer.write_sample(i16::from_le_bytes([sample[0], sample[1]]))?;
                    }
                }
                3 => {
                    for sample in data.chunks_exact(3) {
                        let value = i32::from_le_bytes([0, sample[0], sample[1], sample[2]]) >> 8;
                        writer.write_sample(value)?;
                    }
                }
                4 => {
                    for sample in data.chunks_exact(4) {
                        writer.write_sample(i32::from_le_bytes([
                            sample[0], sample[1], sample[2], sample[3],
                        ]))?;
                    }
                }
                width => {
                    return Err(AssemblerError::UnsupportedFormat(format!(
                        "sample width of {} bytes",
                        width
                    )))
                }
            }
            writer.finalize()?;
        }

        let bytes = cursor.into_inner();
        debug!(
            "📦 Assembled WAV: {} bytes ({} bytes of samples)",
            bytes.len(),
            whole
        );

        Ok(AssembledWav {
            params,
            bytes,
            data_len: whole,
        })
    }
}
