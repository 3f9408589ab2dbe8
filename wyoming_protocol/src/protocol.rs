use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::net::{Shutdown, TcpStream};
use strum::{AsRefStr, Display, EnumString};
use thiserror::Error;

/// Protocol version announced in every outgoing header
pub const PROTOCOL_VERSION: &str = "1.5.2";

const MAX_HEADER_LINE: u64 = 64 * 1024;
const MAX_DATA_LENGTH: usize = 1024 * 1024;
const MAX_PAYLOAD_LENGTH: usize = 16 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error("Header line exceeds {0} bytes")]
    HeaderTooLong(u64),

    #[error("Invalid data length: {0}")]
    InvalidDataLength(usize),

    #[error("Invalid payload size: {0}")]
    InvalidPayloadSize(usize),
}

impl ProtocolError {
    /// True when the bytes on the wire could not be understood, as opposed
    /// to the transport failing underneath us.
    pub fn is_malformed(&self) -> bool {
        !matches!(self, ProtocolError::Io(_))
    }
}

/// Event types this client knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "kebab-case")]
pub enum EventType {
    // Client → Server
    Synthesize,

    // Server → Client
    AudioStart,
    AudioChunk,
    AudioStop,
    Error,
}

/// Header line of a frame: `{"type": ..., "version": ..., "data_length": ..., "payload_length": ...}`
#[derive(Debug, Serialize, Deserialize)]
struct Header {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    version: Option<String>,
    /// Inline data, only sent by older peers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    payload_length: Option<usize>,
}

/// One Wyoming event: a type tag, JSON data and an optional binary payload
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub event_type: String,
    pub data: Map<String, Value>,
    pub payload: Option<Vec<u8>>,
}

impl Event {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            data: Map::new(),
            payload: None,
        }
    }

    pub fn with_data(mut self, data: Map<String, Value>) -> Self {
        self.data = data;
        self
    }

    pub fn with_payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn is_type(&self, event_type: EventType) -> bool {
        self.event_type == event_type.as_ref()
    }

    /// Serialize the event: header line, then data bytes, then payload
    pub fn to_bytes(&self) -> Result<Vec<u8>, ProtocolError> {
        let data_bytes = if self.data.is_empty() {
            None
        } else {
            Some(serde_json::to_vec(&self.data)?)
        };

        let header = Header {
            event_type: self.event_type.clone(),
            version: Some(PROTOCOL_VERSION.to_string()),
            data: None,
            data_length: data_bytes.as_ref().map(Vec::len),
            payload_length: self.payload.as_ref().map(Vec::len),
        };

        let mut bytes = serde_json::to_vec(&header)?;
        bytes.push(b'\n');
        if let Some(data_bytes) = data_bytes {
            bytes.extend_from_slice(&data_bytes);
        }
        if let Some(payload) = &self.payload {
            bytes.extend_from_slice(payload);
        }

        Ok(bytes)
    }
}

/// Read one event from `reader`, blocking until the whole frame is buffered.
///
/// Returns `Ok(None)` when the peer closed the connection, whether at a frame
/// boundary or part way through a frame.
pub fn read_event<R: BufRead>(reader: &mut R) -> Result<Option<Event>, ProtocolError> {
    match read_frame(reader) {
        Err(ProtocolError::Io(e)) if is_disconnect(&e) => {
            debug!("🔌 Connection closed inside a frame: {}", e);
            Ok(None)
        }
        other => other,
    }
}

/// Write one event to `writer` and flush it
pub fn write_event<W: Write>(writer: &mut W, event: &Event) -> Result<(), ProtocolError> {
    let bytes = event.to_bytes()?;
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

fn read_frame<R: BufRead>(reader: &mut R) -> Result<Option<Event>, ProtocolError> {
    let mut line = Vec::new();
    let read = reader
        .by_ref()
        .take(MAX_HEADER_LINE + 1)
        .read_until(b'\n', &mut line)?;

    if read == 0 {
        return Ok(None);
    }

    if line.last() != Some(&b'\n') {
        if line.len() as u64 > MAX_HEADER_LINE {
            return Err(ProtocolError::HeaderTooLong(MAX_HEADER_LINE));
        }
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "connection closed inside event header",
        )
        .into());
    }

    let header: Header = serde_json::from_slice(&line)?;
    if header.event_type.is_empty() {
        return Err(ProtocolError::InvalidHeader("empty event type".to_string()));
    }

    let mut data = header.data.unwrap_or_default();
    if let Some(data_length) = header.data_length.filter(|len| *len > 0) {
        if data_length > MAX_DATA_LENGTH {
            return Err(ProtocolError::InvalidDataLength(data_length));
        }
        let mut data_bytes = vec![0u8; data_length];
        reader.read_exact(&mut data_bytes)?;
        let extra: Map<String, Value> = serde_json::from_slice(&data_bytes)?;
        data.extend(extra);
    }

    let payload = match header.payload_length {
        Some(payload_length) => {
            if payload_length > MAX_PAYLOAD_LENGTH {
                return Err(ProtocolError::InvalidPayloadSize(payload_length));
            }
            let mut payload = vec![0u8; payload_length];
            reader.read_exact(&mut payload)?;
            Some(payload)
        }
        None => None,
    };

    Ok(Some(Event {
        event_type: header.event_type,
        data,
        payload,
    }))
}

fn is_disconnect(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::UnexpectedEof
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
    )
}

/// Connection wrapper for reading/writing events
pub struct Connection {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl Connection {
    pub fn new(stream: TcpStream) -> Result<Self, ProtocolError> {
        let reader_stream = stream.try_clone()?;
        let reader = BufReader::new(reader_stream);
        let writer = BufWriter::new(stream);

        Ok(Connection { reader, writer })
    }

    /// Read the next event; `None` means the server closed the connection
    pub fn read_event(&mut self) -> Result<Option<Event>, ProtocolError> {
        read_event(&mut self.reader)
    }

    /// Write an event to the connection
    pub fn write_event(&mut self, event: &Event) -> Result<(), ProtocolError> {
        write_event(&mut self.writer, event)
    }

    /// Shut down both directions of the socket
    pub fn close(mut self) -> Result<(), ProtocolError> {
        self.writer.flush()?;
        match self.writer.get_ref().shutdown(Shutdown::Both) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotConnected => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
