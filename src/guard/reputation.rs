//! IP reputation lookups against AbuseIPDB
//!
//! Reputation filters endpoints that already proved functional; it never
//! gates availability. Missing credentials and lookup failures fail open.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::config::ReputationConfig;
use crate::error::{GuardError, Result};
use crate::models::ReputationVerdict;

/// Source of 0-100 abuse confidence scores
#[async_trait]
pub trait ReputationSource: Send + Sync {
    async fn score(&self, ip: &str) -> Result<u8>;
}

#[derive(Debug, Deserialize)]
struct CheckResponse {
    data: CheckData,
}

#[derive(Debug, Deserialize)]
struct CheckData {
    #[serde(rename = "abuseConfidenceScore", default)]
    abuse_confidence_score: Option<u8>,
}

/// AbuseIPDB v2 `check` client
pub struct AbuseIpDbClient {
    client: Client,
    url: String,
    api_key: String,
    max_age_days: u32,
}

impl AbuseIpDbClient {
    pub fn new(
        url: impl Into<String>,
        api_key: impl Into<String>,
        max_age_days: u32,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
            api_key: api_key.into(),
            max_age_days,
        })
    }
}

#[async_trait]
impl ReputationSource for AbuseIpDbClient {
    async fn score(&self, ip: &str) -> Result<u8> {
        let max_age = self.max_age_days.to_string();
        let response = self
            .client
            .get(&self.url)
            .header("Key", &self.api_key)
            .header("Accept", "application/json")
            .query(&[("ipAddress", ip), ("maxAgeInDays", max_age.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GuardError::ReputationUnavailable(format!(
                "AbuseIPDB returned HTTP {}",
                status
            )));
        }

        let body: CheckResponse = response.json().await?;
        Ok(parse_score(body))
    }
}

fn parse_score(body: CheckResponse) -> u8 {
    body.data.abuse_confidence_score.unwrap_or(0).min(100)
}

/// Score thresholds; both bounds are exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    pub malicious_above: u8,
    pub moderate_above: u8,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            malicious_above: 50,
            moderate_above: 10,
        }
    }
}

impl Thresholds {
    pub fn classify(&self, score: u8) -> ReputationVerdict {
        if score > self.malicious_above {
            ReputationVerdict::Malicious(score)
        } else if score > self.moderate_above {
            ReputationVerdict::Moderate(score)
        } else {
            ReputationVerdict::Clean(score)
        }
    }
}

/// Applies thresholds and the fail-open policy on top of a source
#[derive(Clone)]
pub struct ReputationChecker {
    source: Option<Arc<dyn ReputationSource>>,
    thresholds: Thresholds,
    timeout: Duration,
}

impl ReputationChecker {
    pub fn new(
        source: Option<Arc<dyn ReputationSource>>,
        thresholds: Thresholds,
        timeout: Duration,
    ) -> Self {
        Self {
            source,
            thresholds,
            timeout,
        }
    }

    /// Build from configuration; an absent API key yields a checker that
    /// always fails open.
    pub fn from_config(config: &ReputationConfig, timeout: Duration) -> Result<Self> {
        let source = match &config.api_key {
            Some(key) => {
                let client = AbuseIpDbClient::new(&config.url, key, config.max_age_days, timeout)?;
                Some(Arc::new(client) as Arc<dyn ReputationSource>)
            }
            None => None,
        };

        let thresholds = Thresholds {
            malicious_above: config.malicious_above,
            moderate_above: config.moderate_above,
        };

        Ok(Self::new(source, thresholds, timeout))
    }

    #[instrument(skip(self))]
    pub async fn assess(&self, ip: &str) -> ReputationVerdict {
        let Some(source) = &self.source else {
            warn!("Missing API key for AbuseIPDB, treating {} as not malicious", ip);
            return ReputationVerdict::Unavailable(
                GuardError::MissingCredential("ABUSEIPDB_API_KEY").to_string(),
            );
        };

        let score = match tokio::time::timeout(self.timeout, source.score(ip)).await {
            Ok(Ok(score)) => score,
            Ok(Err(e)) => {
                warn!("AbuseIPDB query failed for {}: {}", ip, e);
                return ReputationVerdict::Unavailable(e.to_string());
            }
            Err(_) => {
                warn!("AbuseIPDB query for {} timed out", ip);
                return ReputationVerdict::Unavailable(GuardError::Timeout.to_string());
            }
        };

        let verdict = self.thresholds.classify(score);
        match verdict {
            ReputationVerdict::Malicious(s) => {
                info!("Proxy {} is highly abusive ({}%)", ip, s)
            }
            ReputationVerdict::Moderate(s) => {
                info!("Proxy {} has a moderate abuse probability ({}%)", ip, s)
            }
            ReputationVerdict::Clean(s) => info!("Proxy {} appears clean ({}%)", ip, s),
            ReputationVerdict::Unavailable(_) => {}
        }
        verdict
    }
}
