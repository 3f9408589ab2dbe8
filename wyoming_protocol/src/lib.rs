//! # Wyoming Protocol
//!
//! Event framing and message types for talking to a Wyoming TTS server
//! (for example wyoming-piper).
//!
//! This crate provides:
//! - Low-level framing (JSON header line, JSON data block, binary payload)
//! - Typed TTS messages (`synthesize`, `audio-start`, `audio-chunk`, `audio-stop`, `error`)
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::net::TcpStream;
//! use wyoming_protocol::{Connection, Message, Synthesize};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let stream = TcpStream::connect("127.0.0.1:10200")?;
//! let mut connection = Connection::new(stream)?;
//!
//! connection.write_event(&Synthesize::new("Hello world", None).to_event()?)?;
//!
//! while let Some(event) = connection.read_event()? {
//!     match Message::from_event(event)? {
//!         Message::AudioChunk(chunk) => println!("Received {} bytes", chunk.audio.len()),
//!         Message::AudioStop(_) => break,
//!         _ => {}
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod messages;
pub mod protocol;

// Re-export commonly used types
pub use messages::{
    AudioChunk, AudioStart, AudioStop, ErrorEvent, Message, Synthesize, SynthesizeVoice,
};
pub use protocol::{
    read_event, write_event, Connection, Event, EventType, ProtocolError, PROTOCOL_VERSION,
};
