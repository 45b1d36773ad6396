use serde::{Deserialize, Serialize};

use crate::error::{GuardError, Result};

/// A candidate SOCKS5 endpoint.
///
/// Identity is the canonical `host:port` string; two endpoints are the same
/// candidate exactly when their identities are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Endpoint {
    host: String,
    port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Result<Self> {
        let host = host.into();
        if host.is_empty() || host.contains(':') || host.chars().any(char::is_whitespace) {
            return Err(GuardError::InvalidEndpoint(format!("invalid host: {:?}", host)));
        }
        if port == 0 {
            return Err(GuardError::InvalidEndpoint("port must be non-zero".to_string()));
        }
        Ok(Self { host, port })
    }

    /// Parse a `host:port` line
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        let (host, port) = raw
            .rsplit_once(':')
            .ok_or_else(|| GuardError::InvalidEndpoint(format!("missing ':' in {:?}", raw)))?;

        if port.is_empty() || !port.bytes().all(|b| b.is_ascii_digit()) {
            return Err(GuardError::InvalidEndpoint(format!(
                "port is not numeric in {:?}",
                raw
            )));
        }
        let port = port
            .parse::<u16>()
            .map_err(|_| GuardError::InvalidEndpoint(format!("port out of range in {:?}", raw)))?;

        Self::new(host, port)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Canonical identity string
    pub fn identity(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Proxy URL with remote DNS resolution
    pub fn socks5h_url(&self) -> String {
        format!("socks5h://{}:{}", self.host, self.port)
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl std::str::FromStr for Endpoint {
    type Err = GuardError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Endpoint {
    type Error = GuardError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Endpoint> for String {
    fn from(endpoint: Endpoint) -> Self {
        endpoint.identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        let endpoint = Endpoint::parse(" 10.0.0.1:1080\n").unwrap();
        assert_eq!(endpoint.host(), "10.0.0.1");
        assert_eq!(endpoint.port(), 1080);
        assert_eq!(endpoint.identity(), "10.0.0.1:1080");
        assert_eq!(endpoint.to_string(), "10.0.0.1:1080");
        assert_eq!(endpoint.socks5h_url(), "socks5h://10.0.0.1:1080");
    }

    #[test]
    fn test_parse_hostname() {
        let endpoint: Endpoint = "proxy.example.net:9050".parse().unwrap();
        assert_eq!(endpoint.host(), "proxy.example.net");
        assert_eq!(endpoint.port(), 9050);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for raw in [
            "not-an-endpoint",
            "",
            ":1080",
            "10.0.0.1:",
            "10.0.0.1:http",
            "10.0.0.1:-1",
            "10.0.0.1:70000",
            "10.0.0.1:0",
            "::1:1080",
            "10.0.0.1:1080:extra",
            "bad host:1080",
        ] {
            assert!(
                matches!(Endpoint::parse(raw), Err(GuardError::InvalidEndpoint(_))),
                "{:?} should be rejected",
                raw
            );
        }
    }

    #[test]
    fn test_serde_as_identity_string() {
        let endpoint = Endpoint::parse("10.0.0.2:1080").unwrap();
        let json = serde_json::to_string(&endpoint).unwrap();
        assert_eq!(json, "\"10.0.0.2:1080\"");

        let back: Endpoint = serde_json::from_str(&json).unwrap();
        assert_eq!(back, endpoint);

        assert!(serde_json::from_str::<Endpoint>("\"nope\"").is_err());
    }

    #[test]
    fn test_ordering_follows_host_then_port() {
        let mut endpoints = vec![
            Endpoint::parse("10.0.0.2:1080").unwrap(),
            Endpoint::parse("10.0.0.1:9050").unwrap(),
            Endpoint::parse("10.0.0.1:1080").unwrap(),
        ];
        endpoints.sort();
        let ids: Vec<_> = endpoints.iter().map(Endpoint::identity).collect();
        assert_eq!(ids, ["10.0.0.1:1080", "10.0.0.1:9050", "10.0.0.2:1080"]);
    }
}
