//! Reachability-only database client
//!
//! `TcpDbTool` is the [`DbTool`] the command line uses. It checks that the
//! configured server accepts TCP connections within a timeout, using
//! `TcpStream::connect_timeout` rather than a full database driver.
//!
//! It cannot log in, so it never claims a database session or any privilege.
//! The probe therefore always ends up asking the user for privileged
//! credentials, which is the safe answer when nothing can be verified.

use crate::logic::probe::{DbTool, ProbeError};
use crate::types::DbResourceConfig;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

/// Database client limited to TCP reachability checks
#[derive(Debug, Clone)]
pub struct TcpDbTool {
    timeout: Duration,
}

impl TcpDbTool {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn reach(&self, config: &DbResourceConfig) -> Result<(), ProbeError> {
        let target = (config.host.as_str(), config.effective_port());
        let addrs = target
            .to_socket_addrs()
            .map_err(|e| ProbeError::Connection(format!("cannot resolve {}: {}", config.host, e)))?;

        let mut last_error = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, self.timeout) {
                Ok(_stream) => {
                    tracing::info!("Database server {} is reachable", addr);
                    return Ok(());
                }
                Err(e) => {
                    tracing::debug!("TCP connect to {} failed: {}", addr, e);
                    last_error = Some(e);
                }
            }
        }

        Err(ProbeError::Connection(match last_error {
            Some(e) => format!("{}:{}: {}", config.host, config.effective_port(), e),
            None => format!("{} resolved to no addresses", config.host),
        }))
    }
}

impl DbTool for TcpDbTool {
    fn connect_to_db(&mut self, _config: &DbResourceConfig) -> Result<(), ProbeError> {
        Err(ProbeError::Unsupported("database login".into()))
    }

    fn connect_to_host(&mut self, config: &DbResourceConfig) -> Result<(), ProbeError> {
        self.reach(config)
    }

    fn list_tables(&mut self) -> Result<Vec<String>, ProbeError> {
        Err(ProbeError::Unsupported("listing tables".into()))
    }

    fn check_privileges(&mut self, _privileges: &[&str], _tables: &[&str]) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::probe::{probe, Connection};
    use std::net::TcpListener;

    fn resource(port: u16) -> DbResourceConfig {
        DbResourceConfig {
            name: "icingaweb_db".into(),
            host: "127.0.0.1".into(),
            port: Some(port),
            ..Default::default()
        }
    }

    #[test]
    fn test_listening_server_is_host_only() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let mut tool = TcpDbTool::new(Duration::from_secs(2));

        let verdict = probe(&mut tool, &resource(port));
        assert_eq!(verdict.connection, Connection::HostOnly);
        assert!(!verdict.should_skip());
    }

    #[test]
    fn test_closed_port_is_unreachable() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let mut tool = TcpDbTool::new(Duration::from_millis(500));

        let verdict = probe(&mut tool, &resource(port));
        assert_eq!(verdict.connection, Connection::Unreachable);
        assert!(!verdict.should_skip());
    }
}
