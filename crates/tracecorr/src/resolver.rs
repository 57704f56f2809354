// Numan Thabit 2025
use std::fmt;

use serde::Serialize;

use crate::{
    error::{AnalysisError, Result},
    event::{Direction, Endpoint, PacketEvent},
};

/// Identity of the client side of an exchange.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ClientKey {
    pub ip: String,
    pub port: String,
}

impl From<&Endpoint> for ClientKey {
    fn from(endpoint: &Endpoint) -> Self {
        Self {
            ip: endpoint.ip.clone(),
            port: endpoint.port.clone(),
        }
    }
}

impl fmt::Display for ClientKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.ip, self.port)
    }
}

/// Which endpoint of every event is the server. Fixed once resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerRole {
    port: String,
    ip: Option<String>,
}

impl ServerRole {
    /// Build the role from configuration alone.
    pub fn configured(port: impl Into<String>, ip: Option<String>) -> Self {
        Self {
            port: port.into(),
            ip,
        }
    }

    /// Resolve the role, auto-detecting the server address from `first` when
    /// no address was configured.
    pub fn resolve(port: &str, ip: Option<&str>, first: Option<&PacketEvent>) -> Result<Self> {
        if let Some(ip) = ip {
            return Ok(Self::configured(port, Some(ip.to_string())));
        }

        let Some(first) = first else {
            return Err(AnalysisError::Configuration(format!(
                "server port {port} not observed: input contains no events"
            )));
        };

        let ip = if first.source.port == port {
            first.source.ip.clone()
        } else if first.dest.port == port {
            first.dest.ip.clone()
        } else {
            return Err(AnalysisError::Configuration(format!(
                "server port {port} not observed on line {} ({})",
                first.line, first.raw_line
            )));
        };

        tracing::info!(server_ip = %ip, server_port = port, "auto-detected server address");
        Ok(Self::configured(port, Some(ip)))
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    pub fn ip(&self) -> Option<&str> {
        self.ip.as_deref()
    }

    /// A packet sent from the server port is a response; anything else is a request.
    pub fn classify(&self, event: &PacketEvent) -> Direction {
        if event.source.port == self.port {
            Direction::Response
        } else {
            Direction::Request
        }
    }

    /// The non-server endpoint of `event` together with its direction.
    pub fn client_of(&self, event: &PacketEvent) -> (Direction, ClientKey) {
        match self.classify(event) {
            Direction::Response => (Direction::Response, ClientKey::from(&event.dest)),
            Direction::Request => (Direction::Request, ClientKey::from(&event.source)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::parse_line;

    #[test]
    fn configured_ip_skips_detection() {
        let role = ServerRole::resolve("6379", Some("10.0.0.1"), None).expect("configured");
        assert_eq!(role.ip(), Some("10.0.0.1"));
        assert_eq!(role.port(), "6379");
    }

    #[test]
    fn detects_server_from_request_destination() {
        let first = parse_line(1, "1.0 10.0.0.9 10.0.0.1 5000 6379").expect("line");
        let role = ServerRole::resolve("6379", None, Some(&first)).expect("detected");
        assert_eq!(role.ip(), Some("10.0.0.1"));
    }

    #[test]
    fn detects_server_from_response_source() {
        let first = parse_line(1, "1.0 10.0.0.1 10.0.0.9 6379 5000").expect("line");
        let role = ServerRole::resolve("6379", None, Some(&first)).expect("detected");
        assert_eq!(role.ip(), Some("10.0.0.1"));
    }

    #[test]
    fn missing_port_on_first_event_fails() {
        let first = parse_line(1, "1.0 a b 1 2").expect("line");
        let err = ServerRole::resolve("6379", None, Some(&first)).expect_err("port absent");
        assert!(matches!(err, AnalysisError::Configuration(_)));
        assert!(err.to_string().contains("server port 6379 not observed"));
    }

    #[test]
    fn empty_input_fails_detection() {
        let err = ServerRole::resolve("6379", None, None).expect_err("no events");
        assert!(err.to_string().contains("not observed"));
    }

    #[test]
    fn client_key_is_the_non_server_side() {
        let role = ServerRole::configured("6379", None);
        let request = parse_line(1, "1.0 A B p1 6379").expect("line");
        let response = parse_line(2, "1.1 B A 6379 p1").expect("line");

        let (dir, key) = role.client_of(&request);
        assert_eq!(dir, Direction::Request);
        assert_eq!(key, ClientKey { ip: "A".into(), port: "p1".into() });

        let (dir, key) = role.client_of(&response);
        assert_eq!(dir, Direction::Response);
        assert_eq!(key, ClientKey { ip: "A".into(), port: "p1".into() });
    }

    #[test]
    fn composite_key_does_not_collide_like_concatenation() {
        let a = ClientKey { ip: "1.2.3.4".into(), port: "56".into() };
        let b = ClientKey { ip: "1.2.3.45".into(), port: "6".into() };
        assert_ne!(a, b);
    }
}
