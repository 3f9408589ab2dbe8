use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 10200;
pub const DEFAULT_VOICE: &str = "en_US-amy-medium";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {reason}")]
    InvalidValue { var: String, reason: String },
}

/// Address of a Wyoming TTS server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self::new(DEFAULT_HOST, DEFAULT_PORT)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Connection and tooling settings shared by every component
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub endpoint: Endpoint,
    /// Bound on establishing the synthesis connection
    pub connect_timeout: Duration,
    /// Bound on the connect-only liveness probe
    pub probe_timeout: Duration,
    /// Bound on each event read; `None` blocks until the server answers
    pub read_timeout: Option<Duration>,
    pub write_timeout: Duration,
    /// ffmpeg executable used for MP3 output and the version check
    pub ffmpeg_path: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: Endpoint::default(),
            connect_timeout: Duration::from_secs(5),
            probe_timeout: Duration::from_secs(1),
            read_timeout: Some(Duration::from_secs(30)),
            write_timeout: Duration::from_secs(10),
            ffmpeg_path: PathBuf::from("ffmpeg"),
        }
    }
}

impl ClientConfig {
    /// Defaults overlaid with `YAKYAK_*` environment variables (and `.env` if present)
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if it exists (for development)
        dotenvy::dotenv().ok();

        let mut config = Self::default();

        if let Some(host) = read_var("YAKYAK_HOST") {
            config.endpoint.host = host;
        }
        if let Some(port) = read_var("YAKYAK_PORT") {
            config.endpoint.port = parse_var("YAKYAK_PORT", &port)?;
        }
        if let Some(secs) = read_var("YAKYAK_CONNECT_TIMEOUT_SECS") {
            let secs: u64 = parse_var("YAKYAK_CONNECT_TIMEOUT_SECS", &secs)?;
            if secs == 0 {
                return Err(ConfigError::InvalidValue {
                    var: "YAKYAK_CONNECT_TIMEOUT_SECS".to_string(),
                    reason: "connect timeout must be at least 1 second".to_string(),
                });
            }
            config.connect_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = read_var("YAKYAK_READ_TIMEOUT_SECS") {
            config.read_timeout = read_timeout_from_secs(parse_var(
                "YAKYAK_READ_TIMEOUT_SECS",
                &secs,
            )?);
        }
        if let Some(path) = read_var("YAKYAK_FFMPEG") {
            config.ffmpeg_path = PathBuf::from(path);
        }

        log::debug!("Loaded client configuration: {:?}", config);
        Ok(config)
    }
}

/// `0` disables the read timeout
pub fn read_timeout_from_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

fn read_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_var<T>(name: &str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    value.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        var: name.to_string(),
        reason: format!("'{}': {}", value, e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: [&str; 5] = [
        "YAKYAK_HOST",
        "YAKYAK_PORT",
        "YAKYAK_CONNECT_TIMEOUT_SECS",
        "YAKYAK_READ_TIMEOUT_SECS",
        "YAKYAK_FFMPEG",
    ];

    fn clear_vars() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.endpoint.to_string(), "localhost:10200");
        assert_eq!(config.probe_timeout, Duration::from_secs(1));
        assert_eq!(config.read_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        clear_vars();
        env::set_var("YAKYAK_HOST", "tts.local");
        env::set_var("YAKYAK_PORT", "10300");
        env::set_var("YAKYAK_READ_TIMEOUT_SECS", "0");
        env::set_var("YAKYAK_FFMPEG", "/opt/ffmpeg/bin/ffmpeg");

        let config = ClientConfig::from_env().unwrap();
        clear_vars();

        assert_eq!(config.endpoint, Endpoint::new("tts.local", 10300));
        assert_eq!(config.read_timeout, None);
        assert_eq!(config.ffmpeg_path, PathBuf::from("/opt/ffmpeg/bin/ffmpeg"));
    }

    #[test]
    #[serial]
    fn test_invalid_port_is_reported() {
        clear_vars();
        env::set_var("YAKYAK_PORT", "not-a-port");

        let err = ClientConfig::from_env().unwrap_err();
        clear_vars();

        assert!(err.to_string().contains("YAKYAK_PORT"));
    }

    #[test]
    #[serial]
    fn test_zero_connect_timeout_is_rejected() {
        clear_vars();
        env::set_var("YAKYAK_CONNECT_TIMEOUT_SECS", "0");

        let result = ClientConfig::from_env();
        clear_vars();

        assert!(result.is_err());
    }
}
