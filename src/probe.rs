//! Connect-only reachability checks.

use crate::config::Endpoint;
use log::debug;
use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

/// Open a TCP connection to `endpoint`. All resolved addresses share one
/// `timeout` budget; address resolution itself is not bounded.
pub fn connect(endpoint: &Endpoint, timeout: Duration) -> io::Result<TcpStream> {
    let addresses: Vec<SocketAddr> =
        (endpoint.host.as_str(), endpoint.port).to_socket_addrs()?.collect();
    if addresses.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("{} did not resolve to any address", endpoint),
        ));
    }
    connect_any(addresses, timeout)
}

/// Try `addresses` in order until one connects or the shared deadline passes
fn connect_any(
    addresses: impl IntoIterator<Item = SocketAddr>,
    timeout: Duration,
) -> io::Result<TcpStream> {
    let deadline = Instant::now() + timeout;

    let mut last_error = None;
    for address in addresses {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            last_error = Some(io::Error::new(
                io::ErrorKind::TimedOut,
                "connect timed out before every address was tried",
            ));
            break;
        }
        match TcpStream::connect_timeout(&address, remaining) {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                debug!("Connect to {} failed: {}", address, e);
                last_error = Some(e);
            }
        }
    }

    Err(last_error
        .unwrap_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no addresses to try")))
}

/// Check that the server accepts connections. No protocol bytes are exchanged
/// and the connection is closed straight away.
pub fn check_liveness(endpoint: &Endpoint, timeout: Duration) -> io::Result<()> {
    let stream = connect(endpoint, timeout)?;
    drop(stream);
    Ok(())
}

/// Boolean form of [`check_liveness`]; every failure counts as offline
pub fn is_server_online(endpoint: &Endpoint, timeout: Duration) -> bool {
    match check_liveness(endpoint, timeout) {
        Ok(()) => true,
        Err(e) => {
            debug!("Liveness probe of {} failed: {}", endpoint, e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    fn closed_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    }

    #[test]
    fn test_online_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let endpoint = Endpoint::new("127.0.0.1", listener.local_addr().unwrap().port());

        assert!(is_server_online(&endpoint, Duration::from_secs(1)));
        // Same answer twice for a stable endpoint
        assert!(is_server_online(&endpoint, Duration::from_secs(1)));
    }

    #[test]
    fn test_closed_port_is_offline_within_bound() {
        let endpoint = Endpoint::new("127.0.0.1", closed_port());

        let started = Instant::now();
        assert!(!is_server_online(&endpoint, Duration::from_secs(1)));
        assert!(!is_server_online(&endpoint, Duration::from_secs(1)));
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[test]
    fn test_addresses_share_one_timeout() {
        // Non-routable addresses; each attempt either stalls or fails fast
        let addresses: Vec<SocketAddr> = vec![
            "10.255.255.1:10200".parse().unwrap(),
            "10.255.255.2:10200".parse().unwrap(),
            "10.255.255.3:10200".parse().unwrap(),
        ];

        let started = Instant::now();
        assert!(connect_any(addresses, Duration::from_millis(300)).is_err());
        assert!(started.elapsed() < Duration::from_millis(700));
    }

    #[test]
    fn test_no_addresses_is_not_found() {
        let err = connect_any(Vec::new(), Duration::from_secs(1)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_unresolvable_host_reports_error() {
        let endpoint = Endpoint::new("host.invalid", 10200);
        assert!(check_liveness(&endpoint, Duration::from_secs(1)).is_err());
    }
}
