//! Scripted Wyoming TTS server for integration tests.
//!
//! The server accepts connections until one of them sends a request, replays
//! its script on that connection and then drops it. Connect-only probes (a
//! connection that closes without sending anything) are skipped.

#![allow(dead_code)]

use std::io::{BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use wyoming_protocol::{read_event, AudioChunk, AudioStart, AudioStop, ErrorEvent, Event};

/// One scripted action after the request has been read
pub enum Step {
    Send(Event),
    Raw(Vec<u8>),
    Pause(Duration),
}

pub fn chunk(rate: u32, width: u16, channels: u16, audio: Vec<u8>) -> Step {
    Step::Send(AudioChunk::new(rate, width, channels, audio).to_event().unwrap())
}

pub fn start(rate: u32, width: u16, channels: u16) -> Step {
    Step::Send(
        AudioStart {
            rate,
            width,
            channels,
            timestamp: None,
        }
        .to_event()
        .unwrap(),
    )
}

pub fn stop() -> Step {
    Step::Send(AudioStop::default().to_event().unwrap())
}

pub fn server_error(text: &str) -> Step {
    Step::Send(
        ErrorEvent {
            text: text.to_string(),
            code: Some("voice-missing".to_string()),
        }
        .to_event()
        .unwrap(),
    )
}

/// Little-endian 16-bit PCM
pub fn pcm16(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

pub struct MockTtsServer {
    port: u16,
    handle: JoinHandle<Option<Event>>,
}

impl MockTtsServer {
    pub fn start(script: Vec<Step>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind mock server");
        let port = listener.local_addr().unwrap().port();

        let handle = thread::spawn(move || {
            for stream in listener.incoming() {
                let stream = match stream {
                    Ok(stream) => stream,
                    Err(e) => {
                        println!("❌ Mock server accept error: {}", e);
                        return None;
                    }
                };

                if let Some(request) = Self::handle_client(stream, &script) {
                    return Some(request);
                }
            }
            None
        });

        println!("🎙️ Mock TTS server listening on 127.0.0.1:{}", port);
        Self { port, handle }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Wait for the served request and return it
    pub fn finish(self) -> Option<Event> {
        self.handle.join().expect("Mock server thread panicked")
    }

    fn handle_client(stream: TcpStream, script: &[Step]) -> Option<Event> {
        let mut writer = stream.try_clone().ok()?;
        let mut reader = BufReader::new(stream);

        let request = match read_event(&mut reader) {
            Ok(Some(event)) => event,
            _ => {
                println!("📡 Connection closed without a request (probe)");
                return None;
            }
        };
        println!("📥 Mock server received '{}'", request.event_type);

        for step in script {
            let result = match step {
                Step::Send(event) => writer.write_all(&event.to_bytes().unwrap()),
                Step::Raw(bytes) => writer.write_all(bytes),
                Step::Pause(duration) => {
                    thread::sleep(*duration);
                    Ok(())
                }
            };
            if let Err(e) = result {
                println!("⚠️ Mock server write failed: {}", e);
                break;
            }
        }
        let _ = writer.flush();

        Some(request)
    }
}
