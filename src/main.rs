use anyhow::Context;
use clap::Parser;
use log::{error, info, warn, LevelFilter};
use std::fs;
use std::io::{self, Read};
use std::process::ExitCode;
use yakyak::config::{read_timeout_from_secs, ClientConfig, DEFAULT_VOICE};
use yakyak::transcode::ffmpeg_version;
use yakyak::{
    OutputFormat, OutputSink, Result, SynthesisRequest, Synthesizer, Voice, YakyakError,
};

#[derive(Parser)]
#[command(name = "yakyak", version)]
#[command(about = "YakYak client for Piper TTS Server")]
#[command(long_about = "
Send text to a Wyoming (Piper) text-to-speech server and save the spoken audio.

EXAMPLES:
  # Speak a file into an MP3
  yakyak -i story.txt -o story.mp3

  # Pipe text in, WAV out
  echo \"Hello world\" | yakyak -f wav > hello.wav

  # Check that the server answers and produces audio
  yakyak --host 192.168.1.20 --test wav
")]
struct Args {
    /// Print debug messages to console
    #[arg(long)]
    debug: bool,

    /// Hostname or IP address (default: localhost, or YAKYAK_HOST)
    #[arg(long)]
    host: Option<String>,

    /// Server port (default: 10200, or YAKYAK_PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Audio output format
    #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Mp3)]
    audio_format: OutputFormat,

    /// Path to input text file (default: stdin)
    #[arg(short, long, default_value = "stdin")]
    input_file: String,

    /// Path to output audio file, WAV or MP3 (default: stdout)
    #[arg(short, long, default_value = "stdout")]
    output_file: String,

    /// Voice model name; an empty name lets the server choose
    #[arg(short, long, default_value = DEFAULT_VOICE)]
    voice: String,

    /// Speaker id for multi-speaker voice models
    #[arg(short, long)]
    speaker: Option<String>,

    /// Seconds to wait for each server event, 0 waits forever (default: 30)
    #[arg(long)]
    read_timeout: Option<u64>,

    /// Run an end-to-end test producing the given format, then exit
    #[arg(short, long, value_enum)]
    test: Option<OutputFormat>,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.debug);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

/// Configure logging once for the whole process; stderr only, stdout carries audio
fn init_logging(debug: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if debug {
        builder.filter_level(LevelFilter::Debug);
    }
    builder.init();
}

fn run(args: Args) -> Result<()> {
    let mut config = ClientConfig::from_env()?;
    if let Some(host) = args.host {
        config.endpoint.host = host;
    }
    if let Some(port) = args.port {
        config.endpoint.port = port;
    }
    if let Some(secs) = args.read_timeout {
        config.read_timeout = read_timeout_from_secs(secs);
    }

    if let Some(format) = args.test {
        return selftest(config, format);
    }

    let text = read_input(&args.input_file).map_err(input_error)?;

    let voice = if args.voice.trim().is_empty() {
        if args.speaker.is_some() {
            warn!("⚠️ Ignoring --speaker because no voice was given");
        }
        Voice::ServerDefault
    } else {
        Voice::Named {
            name: args.voice,
            speaker: args.speaker,
        }
    };
    let request = SynthesisRequest::new(text, voice)?;

    if args.audio_format.is_compressed() {
        require_ffmpeg(&config)?;
    }

    let synthesizer = Synthesizer::new(config);
    let endpoint = synthesizer.config().endpoint.to_string();
    if !synthesizer.is_server_online() {
        info!("Server {} is offline", endpoint);
        return Err(YakyakError::Offline(endpoint));
    }
    info!("Server {} is online", endpoint);

    let sink = OutputSink::from_arg(&args.output_file);
    synthesizer.run(&request, args.audio_format, &sink)?;
    Ok(())
}

fn selftest(config: ClientConfig, format: OutputFormat) -> Result<()> {
    if format.is_compressed() {
        require_ffmpeg(&config)?;
    }

    let (passed, msg) = Synthesizer::new(config).run_selftest(format);
    println!("{}", msg);

    if passed {
        Ok(())
    } else {
        Err(YakyakError::SelfTest(msg))
    }
}

fn require_ffmpeg(config: &ClientConfig) -> Result<()> {
    match ffmpeg_version(&config.ffmpeg_path) {
        Some(version) => {
            info!("🎛️ {}", version);
            Ok(())
        }
        None => Err(YakyakError::FfmpegMissing),
    }
}

fn read_input(source: &str) -> anyhow::Result<String> {
    if source == "stdin" || source == "-" {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read text from stdin")?;
        Ok(text)
    } else {
        fs::read_to_string(source).with_context(|| format!("Failed to read input file {}", source))
    }
}

/// Undecodable text is invalid input; any other read failure is an IO error
fn input_error(e: anyhow::Error) -> YakyakError {
    let context = format!("{:#}", e);
    match e.downcast::<io::Error>() {
        Ok(source) if source.kind() == io::ErrorKind::InvalidData => {
            YakyakError::InvalidInput(context)
        }
        Ok(source) => YakyakError::Io(io::Error::new(source.kind(), context)),
        Err(_) => YakyakError::InvalidInput(context),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_input_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.txt");

        let err = input_error(read_input(path.to_str().unwrap()).unwrap_err());

        assert!(matches!(err, YakyakError::Io(_)));
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().contains("missing.txt"));
    }

    #[test]
    fn test_non_utf8_input_is_invalid_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latin1.txt");
        fs::write(&path, [0x47, 0x72, 0xfc, 0xdf, 0x65]).unwrap();

        let err = input_error(read_input(path.to_str().unwrap()).unwrap_err());

        assert!(matches!(err, YakyakError::InvalidInput(_)));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_input_file_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("story.txt");
        fs::write(&path, "Hello world\n").unwrap();

        assert_eq!(read_input(path.to_str().unwrap()).unwrap(), "Hello world\n");
    }
}
