use crate::config::{ClientConfig, Endpoint};
use crate::probe;
use crate::wav::{AssembledWav, AssemblerError, AudioParams, WavAssembler};
use log::{debug, error, info, warn};
use std::io;
use std::time::Duration;
use thiserror::Error;
use wyoming_protocol::{Connection, Message, ProtocolError, Synthesize, SynthesizeVoice};

#[derive(Error, Debug)]
pub enum TTSError {
    #[error("Text to synthesize is empty")]
    EmptyText,

    #[error("Failed to connect to {endpoint}: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: io::Error,
    },

    #[error("Timed out while {0}")]
    Timeout(&'static str),

    #[error("Network error while {context}: {source}")]
    Network {
        context: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Server error: {message}")]
    Server {
        message: String,
        code: Option<String>,
    },

    #[error("Audio error: {0}")]
    Audio(#[from] AssemblerError),

    #[error("No audio received ({0})")]
    NoAudio(StreamEnd),
}

impl TTSError {
    /// Connect failures and timeouts, as opposed to bad data from the server
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            TTSError::Connect { .. } | TTSError::Timeout(_) | TTSError::Network { .. }
        )
    }

    fn from_io(context: &'static str, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TTSError::Timeout(context),
            _ => TTSError::Network { context, source },
        }
    }

    fn from_protocol(context: &'static str, error: ProtocolError) -> Self {
        match error {
            ProtocolError::Io(source) => Self::from_io(context, source),
            other => TTSError::Protocol(other),
        }
    }
}

/// Which voice the server should use
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Voice {
    /// Let the server pick its configured voice
    #[default]
    ServerDefault,
    Named {
        name: String,
        speaker: Option<String>,
    },
}

impl Voice {
    pub fn named(name: impl Into<String>) -> Self {
        Voice::Named {
            name: name.into(),
            speaker: None,
        }
    }

    pub fn with_speaker(name: impl Into<String>, speaker: impl Into<String>) -> Self {
        Voice::Named {
            name: name.into(),
            speaker: Some(speaker.into()),
        }
    }

    fn to_wire(&self) -> Option<SynthesizeVoice> {
        match self {
            Voice::ServerDefault => None,
            Voice::Named { name, speaker } => Some(SynthesizeVoice {
                name: Some(name.clone()),
                language: None,
                speaker: speaker.clone(),
            }),
        }
    }
}

/// Text plus voice for one synthesis call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisRequest {
    text: String,
    voice: Voice,
}

impl SynthesisRequest {
    pub fn new(text: impl Into<String>, voice: Voice) -> Result<Self, TTSError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(TTSError::EmptyText);
        }
        Ok(Self { text, voice })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn voice(&self) -> &Voice {
        &self.voice
    }

    fn to_message(&self) -> Synthesize {
        Synthesize::new(self.text.clone(), self.voice.to_wire())
    }
}

/// How the audio stream finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    /// The server sent `audio-stop`
    Stopped,
    /// The connection closed before `audio-stop`
    ConnectionLost,
    /// An unreadable frame arrived before `audio-stop`
    Malformed,
}

impl StreamEnd {
    pub fn is_clean(&self) -> bool {
        *self == StreamEnd::Stopped
    }
}

impl std::fmt::Display for StreamEnd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamEnd::Stopped => write!(f, "stream stopped"),
            StreamEnd::ConnectionLost => write!(f, "connection lost before audio-stop"),
            StreamEnd::Malformed => write!(f, "malformed frame before audio-stop"),
        }
    }
}

/// Result of one synthesis call
#[derive(Debug, Clone)]
pub struct SynthesizedAudio {
    pub wav: AssembledWav,
    pub end: StreamEnd,
    pub chunks: usize,
}

/// Client for a Wyoming TTS server. Every call to [`synthesize`](Self::synthesize)
/// opens its own connection and closes it before returning.
#[derive(Debug, Clone)]
pub struct WyomingTTS {
    endpoint: Endpoint,
    connect_timeout: Duration,
    read_timeout: Option<Duration>,
    write_timeout: Duration,
}

impl WyomingTTS {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            connect_timeout: config.connect_timeout,
            read_timeout: config.read_timeout,
            write_timeout: config.write_timeout,
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Send `request` and collect the streamed audio into a WAV container
    pub fn synthesize(&self, request: &SynthesisRequest) -> Result<SynthesizedAudio, TTSError> {
        let mut connection = self.connect()?;

        let result = self.exchange(&mut connection, request);

        if let Err(e) = connection.close() {
            debug!("Ignoring error while closing connection: {}", e);
        }

        result
    }

    fn connect(&self) -> Result<Connection, TTSError> {
        info!("📡 Connecting to TTS server at {}", self.endpoint);

        let stream = probe::connect(&self.endpoint, self.connect_timeout).map_err(|source| {
            TTSError::Connect {
                endpoint: self.endpoint.to_string(),
                source,
            }
        })?;
        stream
            .set_read_timeout(self.read_timeout)
            .map_err(|e| TTSError::from_io("configuring the connection", e))?;
        stream
            .set_write_timeout(Some(self.write_timeout))
            .map_err(|e| TTSError::from_io("configuring the connection", e))?;

        let connection = Connection::new(stream)
            .map_err(|e| TTSError::from_protocol("configuring the connection", e))?;

        debug!("✅ Connected to TTS server");
        Ok(connection)
    }

    fn exchange(
        &self,
        connection: &mut Connection,
        request: &SynthesisRequest,
    ) -> Result<SynthesizedAudio, TTSError> {
        let event = request.to_message().to_event()?;
        debug!(
            "📤 Sending synthesize request ({} chars, voice {:?})",
            request.text().chars().count(),
            request.voice()
        );
        connection
            .write_event(&event)
            .map_err(|e| TTSError::from_protocol("sending the request", e))?;

        let mut assembler = WavAssembler::new();
        let mut chunks = 0usize;

        let end = loop {
            let event = match connection.read_event() {
                Ok(Some(event)) => event,
                Ok(None) => {
                    warn!("🔌 Connection lost before audio-stop");
                    break StreamEnd::ConnectionLost;
                }
                Err(e) if e.is_malformed() => {
                    warn!("⚠️ Malformed frame from server, ending stream: {}", e);
                    break StreamEnd::Malformed;
                }
                Err(e) => return Err(TTSError::from_protocol("reading audio", e)),
            };

            let message = match Message::from_event(event) {
                Ok(message) => message,
                Err(e) => {
                    warn!("⚠️ Unreadable event from server, ending stream: {}", e);
                    break StreamEnd::Malformed;
                }
            };

            match message {
                Message::AudioChunk(chunk) => {
                    let params = AudioParams::new(chunk.rate, chunk.width, chunk.channels);
                    if assembler.is_open() {
                        assembler.check_format(&params)?;
                    } else {
                        assembler.open(params)?;
                    }
                    assembler.append(&chunk.audio)?;
                    chunks += 1;
                    debug!(
                        "📥 Received audio chunk {}: {} bytes",
                        chunks,
                        chunk.audio.len()
                    );
                }
                Message::AudioStop(_) => {
                    debug!("⏹️ Received audio-stop after {} chunk(s)", chunks);
                    break StreamEnd::Stopped;
                }
                Message::AudioStart(start) => {
                    debug!(
                        "🎙️ Server announced audio: {}",
                        AudioParams::new(start.rate, start.width, start.channels)
                    );
                }
                Message::Error(server_error) => {
                    error!("❌ Server error: {}", server_error.text);
                    return Err(TTSError::Server {
                        message: server_error.text,
                        code: server_error.code,
                    });
                }
                other => {
                    debug!("Ignoring '{}' event", other.event_type());
                }
            }
        };

        if !assembler.is_open() {
            return Err(TTSError::NoAudio(end));
        }

        let wav = assembler.finalize()?;
        info!(
            "✅ Synthesized {:.2}s of audio in {} chunk(s) ({})",
            wav.duration().as_secs_f64(),
            chunks,
            end
        );

        Ok(SynthesizedAudio { wav, end, chunks })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text_is_rejected() {
        assert!(matches!(
            SynthesisRequest::new("", Voice::ServerDefault),
            Err(TTSError::EmptyText)
        ));
        assert!(matches!(
            SynthesisRequest::new(" \n\t", Voice::named("en_US-amy-medium")),
            Err(TTSError::EmptyText)
        ));
    }

    #[test]
    fn test_voice_wire_shape() {
        assert_eq!(Voice::ServerDefault.to_wire(), None);

        let wire = Voice::with_speaker("en_US-libritts-high", "12")
            .to_wire()
            .unwrap();
        assert_eq!(wire.name.as_deref(), Some("en_US-libritts-high"));
        assert_eq!(wire.speaker.as_deref(), Some("12"));
        assert_eq!(wire.language, None);
    }

    #[test]
    fn test_request_message_keeps_text() {
        let request = SynthesisRequest::new("Hello world", Voice::named("amy")).unwrap();
        let message = request.to_message();
        assert_eq!(message.text, "Hello world");
        assert_eq!(message.voice.unwrap().name.as_deref(), Some("amy"));
    }

    #[test]
    fn test_error_classification() {
        let timeout = TTSError::from_io(
            "reading audio",
            io::Error::new(io::ErrorKind::WouldBlock, "slow"),
        );
        assert!(matches!(timeout, TTSError::Timeout("reading audio")));
        assert!(timeout.is_connectivity());

        let malformed = TTSError::from_protocol(
            "reading audio",
            ProtocolError::InvalidHeader("bad".to_string()),
        );
        assert!(!malformed.is_connectivity());
    }

    #[test]
    fn test_connect_failure_is_reported() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let config = ClientConfig {
            endpoint: Endpoint::new("127.0.0.1", port),
            connect_timeout: Duration::from_secs(1),
            ..Default::default()
        };
        let request = SynthesisRequest::new("Hello", Voice::ServerDefault).unwrap();

        let err = WyomingTTS::new(&config).synthesize(&request).unwrap_err();
        assert!(matches!(err, TTSError::Connect { .. }));
        assert!(err.is_connectivity());
    }
}
