//! Application-layer forwarding check
//!
//! An open SOCKS port is not proof that the endpoint relays traffic. This
//! check fetches an echo service through the proxy and requires the echoed
//! caller address to be the endpoint's own host.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Proxy as ReqwestProxy};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::error::{GuardError, Result};
use crate::models::Endpoint;

/// Confirms an endpoint forwards real application traffic
#[async_trait]
pub trait TrafficVerifier: Send + Sync {
    async fn verify(&self, endpoint: &Endpoint) -> Result<()>;
}

/// Round-trips an HTTP(S) request through the endpoint to an IP echo service
pub struct EchoVerifier {
    echo_url: String,
    timeout: Duration,
}

impl EchoVerifier {
    pub fn new(echo_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            echo_url: echo_url.into(),
            timeout,
        }
    }

    /// Create a reqwest client that routes everything through the endpoint
    fn create_client(&self, endpoint: &Endpoint) -> Result<Client> {
        // socks5h: the proxy resolves the echo host, so DNS goes through it too
        let proxy = ReqwestProxy::all(endpoint.socks5h_url())?;

        let client = Client::builder()
            .proxy(proxy)
            .timeout(self.timeout)
            .build()?;

        Ok(client)
    }
}

#[async_trait]
impl TrafficVerifier for EchoVerifier {
    #[instrument(skip(self), fields(endpoint = %endpoint))]
    async fn verify(&self, endpoint: &Endpoint) -> Result<()> {
        let client = self.create_client(endpoint)?;

        let response = tokio::time::timeout(self.timeout, client.get(&self.echo_url).send())
            .await
            .map_err(|_| GuardError::Timeout)??;

        let status = response.status();
        if !status.is_success() {
            return Err(GuardError::TrafficCheckFailed(format!(
                "echo returned HTTP {}",
                status
            )));
        }

        let body = tokio::time::timeout(self.timeout, response.text())
            .await
            .map_err(|_| GuardError::Timeout)??;

        if echoed_origin_matches(&body, endpoint.host()) {
            debug!("Echoed origin matches endpoint host");
            Ok(())
        } else {
            Err(GuardError::TrafficCheckFailed(format!(
                "echoed origin {:?} does not match {}",
                body.trim(),
                endpoint.host()
            )))
        }
    }
}

/// Whether the echo body reports `host` as the caller.
///
/// Accepts httpbin-style `{"origin": "a, b"}`, ipify-style `{"ip": "a"}` or a
/// bare address. Forwarded chains are comma separated; any hop may match.
pub fn echoed_origin_matches(body: &str, host: &str) -> bool {
    let origin = match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => map
            .get("origin")
            .or_else(|| map.get("ip"))
            .and_then(Value::as_str)
            .map(str::to_string),
        Ok(Value::String(s)) => Some(s),
        Ok(_) => None,
        Err(_) => Some(body.to_string()),
    };

    origin
        .map(|origin| origin.split(',').any(|hop| hop.trim() == host))
        .unwrap_or(false)
}
