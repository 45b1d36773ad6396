//! Connectivity probing through a candidate SOCKS5 endpoint
//!
//! A probe succeeds when the endpoint completes a SOCKS5 CONNECT to a fixed
//! reachability target within the timeout. The established stream is dropped
//! immediately; no application data is exchanged.

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::timeout;
use tokio_socks::tcp::Socks5Stream;
use tracing::{debug, instrument};

use crate::error::{GuardError, Result};
use crate::models::Endpoint;

/// Low-level reachability check through an endpoint
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    async fn probe(&self, endpoint: &Endpoint) -> Result<()>;
}

/// SOCKS5 handshake + CONNECT to a well-known address
pub struct Socks5Probe {
    target: SocketAddr,
    timeout: Duration,
}

impl Socks5Probe {
    pub fn new(target: &str, timeout: Duration) -> Result<Self> {
        let target = target.parse().map_err(|_| {
            GuardError::InvalidConfig(format!("Invalid probe target: {}", target))
        })?;
        Ok(Self { target, timeout })
    }
}

#[async_trait]
impl ConnectivityProbe for Socks5Probe {
    #[instrument(skip(self), fields(endpoint = %endpoint, target = %self.target))]
    async fn probe(&self, endpoint: &Endpoint) -> Result<()> {
        debug!("Probing SOCKS5 endpoint");

        let connect = Socks5Stream::connect((endpoint.host(), endpoint.port()), self.target);
        match timeout(self.timeout, connect).await {
            Ok(Ok(stream)) => {
                drop(stream);
                debug!("SOCKS5 CONNECT established");
                Ok(())
            }
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(GuardError::Timeout),
        }
    }
}
