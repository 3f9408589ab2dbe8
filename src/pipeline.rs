//! End-to-end synthesis: request → audio stream → optional transcode → sink.

use crate::config::{ClientConfig, DEFAULT_VOICE};
use crate::error::{Result, YakyakError};
use crate::output::OutputSink;
use crate::probe;
use crate::transcode::{FfmpegTranscoder, OutputFormat, Transcoder};
use crate::tts::{StreamEnd, SynthesisRequest, SynthesizedAudio, Voice, WyomingTTS};
use crate::wav::AudioParams;
use log::{debug, error, info, warn};
use std::fs;
use std::time::Duration;

/// Phrase spoken by the self-test
pub const SELFTEST_PHRASE: &str = "Hello world";

/// What a successful run produced
#[derive(Debug, Clone)]
pub struct RunReport {
    pub format: OutputFormat,
    pub bytes_written: usize,
    pub params: AudioParams,
    pub duration: Duration,
    pub end: StreamEnd,
}

/// Ties the TTS client, the transcoder and the output sink together
pub struct Synthesizer<T: Transcoder = FfmpegTranscoder> {
    config: ClientConfig,
    tts: WyomingTTS,
    transcoder: T,
}

impl Synthesizer<FfmpegTranscoder> {
    pub fn new(config: ClientConfig) -> Self {
        let transcoder = FfmpegTranscoder::new(config.ffmpeg_path.clone());
        Self::with_transcoder(config, transcoder)
    }
}

impl<T: Transcoder> Synthesizer<T> {
    pub fn with_transcoder(config: ClientConfig, transcoder: T) -> Self {
        Self {
            tts: WyomingTTS::new(&config),
            config,
            transcoder,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Connect-only reachability check against the configured server
    pub fn is_server_online(&self) -> bool {
        probe::is_server_online(&self.config.endpoint, self.config.probe_timeout)
    }

    /// Synthesize `request`, convert it to `format` and write it to `sink`.
    ///
    /// Nothing is written unless synthesis and transcoding both succeed.
    pub fn run(
        &self,
        request: &SynthesisRequest,
        format: OutputFormat,
        sink: &OutputSink,
    ) -> Result<RunReport> {
        debug!(
            "tts len: {}, message: {}",
            request.text().len(),
            request.text()
        );

        let SynthesizedAudio { wav, end, .. } = self.tts.synthesize(request).map_err(|e| {
            error!("❌ TTS error: {}", e);
            YakyakError::from(e)
        })?;

        if !end.is_clean() {
            warn!(
                "⚠️ Audio stream ended abnormally ({}), keeping {} bytes of audio",
                end, wav.data_len
            );
        }

        let params = wav.params;
        let duration = wav.duration();

        let bytes = if format.is_compressed() {
            self.transcoder
                .transcode(&wav.bytes, format)
                .map_err(|e| {
                    error!("❌ Could not convert audio to {}: {}", format, e);
                    YakyakError::from(e)
                })?
        } else {
            wav.bytes
        };

        sink.write(&bytes).map_err(|source| {
            error!("❌ Failed to write {}: {}", sink, source);
            YakyakError::Output {
                target: sink.to_string(),
                source,
            }
        })?;

        info!("💾 Wrote {} bytes of {} to {}", bytes.len(), format, sink);

        Ok(RunReport {
            format,
            bytes_written: bytes.len(),
            params,
            duration,
            end,
        })
    }

    /// Speak [`SELFTEST_PHRASE`] into a scratch file and check that audio came back.
    ///
    /// The scratch directory is removed before returning, pass or fail.
    pub fn run_selftest(&self, format: OutputFormat) -> (bool, String) {
        let endpoint = &self.config.endpoint;
        debug!("Starting test {}, host: {}", format, endpoint);

        if let Err(e) = probe::check_liveness(endpoint, self.config.probe_timeout) {
            let msg = format!("Server {} is offline", endpoint);
            info!("{} ({})", msg, e);
            return (false, msg);
        }
        info!("Server {} is online", endpoint);

        let scratch = match tempfile::Builder::new().prefix("yakyak-selftest-").tempdir() {
            Ok(dir) => dir,
            Err(e) => {
                let msg = format!("Fail, test: {} (no scratch directory: {})", format, e);
                error!("{}", msg);
                return (false, msg);
            }
        };
        let path = scratch.path().join(format!("selftest.{}", format.extension()));

        let outcome = SynthesisRequest::new(SELFTEST_PHRASE, Voice::named(DEFAULT_VOICE))
            .map_err(YakyakError::from)
            .and_then(|request| self.run(&request, format, &OutputSink::File(path.clone())));
        if let Err(e) = &outcome {
            warn!("Self-test synthesis failed: {}", e);
        }

        let written = fs::metadata(&path).map(|meta| meta.len()).unwrap_or(0);

        if let Err(e) = scratch.close() {
            warn!("Could not remove self-test scratch directory: {}", e);
        }

        if written > 0 {
            let msg = format!("Success, test: {}", format);
            info!("{}", msg);
            (true, msg)
        } else {
            let msg = format!("Fail, test: {}", format);
            info!("{}", msg);
            (false, msg)
        }
    }
}
