//! Typed views over the Wyoming events used for text-to-speech.

use crate::protocol::{Event, EventType, ProtocolError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Voice selection sent with a synthesis request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynthesizeVoice {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
}

/// Client → Server: synthesize `text`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Synthesize {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice: Option<SynthesizeVoice>,
}

impl Synthesize {
    pub fn new(text: impl Into<String>, voice: Option<SynthesizeVoice>) -> Self {
        Self {
            text: text.into(),
            voice,
        }
    }

    pub fn to_event(&self) -> Result<Event, ProtocolError> {
        Ok(Event::new(EventType::Synthesize.as_ref()).with_data(to_data(self)?))
    }
}

/// Server → Client: the audio format of the stream that follows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioStart {
    pub rate: u32,
    pub width: u16,
    pub channels: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
}

impl AudioStart {
    pub fn to_event(&self) -> Result<Event, ProtocolError> {
        Ok(Event::new(EventType::AudioStart.as_ref()).with_data(to_data(self)?))
    }
}

/// Server → Client: raw PCM frames plus the format they are in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioChunk {
    /// Sample rate in Hz
    pub rate: u32,
    /// Bytes per sample
    pub width: u16,
    pub channels: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
    /// Carried as the binary payload, not in the JSON data
    #[serde(skip)]
    pub audio: Vec<u8>,
}

impl AudioChunk {
    pub fn new(rate: u32, width: u16, channels: u16, audio: Vec<u8>) -> Self {
        Self {
            rate,
            width,
            channels,
            timestamp: None,
            audio,
        }
    }

    pub fn to_event(&self) -> Result<Event, ProtocolError> {
        Ok(Event::new(EventType::AudioChunk.as_ref())
            .with_data(to_data(self)?)
            .with_payload(self.audio.clone()))
    }
}

/// Server → Client: end of the audio stream
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioStop {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
}

impl AudioStop {
    pub fn to_event(&self) -> Result<Event, ProtocolError> {
        Ok(Event::new(EventType::AudioStop.as_ref()).with_data(to_data(self)?))
    }
}

/// Server → Client: the request could not be served
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEvent {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ErrorEvent {
    pub fn to_event(&self) -> Result<Event, ProtocolError> {
        Ok(Event::new(EventType::Error.as_ref()).with_data(to_data(self)?))
    }
}

/// Events classified by type
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Synthesize(Synthesize),
    AudioStart(AudioStart),
    AudioChunk(AudioChunk),
    AudioStop(AudioStop),
    Error(ErrorEvent),
    /// Any event type this client does not act on
    Other(Event),
}

impl Message {
    pub fn from_event(event: Event) -> Result<Self, ProtocolError> {
        let event_type = match event.event_type.parse::<EventType>() {
            Ok(event_type) => event_type,
            Err(_) => return Ok(Message::Other(event)),
        };

        match event_type {
            EventType::Synthesize => Ok(Message::Synthesize(from_data(event.data)?)),
            EventType::AudioStart => Ok(Message::AudioStart(from_data(event.data)?)),
            EventType::AudioChunk => {
                let mut chunk: AudioChunk = from_data(event.data)?;
                chunk.audio = event.payload.unwrap_or_default();
                Ok(Message::AudioChunk(chunk))
            }
            EventType::AudioStop => Ok(Message::AudioStop(from_data(event.data)?)),
            EventType::Error => Ok(Message::Error(from_data(event.data)?)),
        }
    }

    pub fn event_type(&self) -> &str {
        match self {
            Message::Synthesize(_) => EventType::Synthesize.as_ref(),
            Message::AudioStart(_) => EventType::AudioStart.as_ref(),
            Message::AudioChunk(_) => EventType::AudioChunk.as_ref(),
            Message::AudioStop(_) => EventType::AudioStop.as_ref(),
            Message::Error(_) => EventType::Error.as_ref(),
            Message::Other(event) => &event.event_type,
        }
    }

    pub fn to_event(&self) -> Result<Event, ProtocolError> {
        match self {
            Message::Synthesize(synthesize) => synthesize.to_event(),
            Message::AudioStart(start) => start.to_event(),
            Message::AudioChunk(chunk) => chunk.to_event(),
            Message::AudioStop(stop) => stop.to_event(),
            Message::Error(error) => error.to_event(),
            Message::Other(event) => Ok(event.clone()),
        }
    }
}

fn to_data<T: Serialize>(value: &T) -> Result<Map<String, Value>, ProtocolError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(ProtocolError::InvalidHeader(format!(
            "event data must be a JSON object, got {}",
            other
        ))),
    }
}

fn from_data<T: DeserializeOwned>(data: Map<String, Value>) -> Result<T, ProtocolError> {
    Ok(serde_json::from_value(Value::Object(data))?)
}
