//! Candidate batch sources
//!
//! The pipeline only sees parsed endpoints; where they come from is decided
//! here. Malformed entries are logged and dropped before any claim is made.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::{GuardError, Result};
use crate::models::Endpoint;

/// Supplies the next batch of candidates for the periodic driver
#[async_trait]
pub trait BatchSource: Send + Sync {
    async fn next_batch(&self) -> Result<Vec<Endpoint>>;

    /// Human-readable origin for logs
    fn describe(&self) -> String;
}

/// Parse one candidate per line, keeping order and duplicates.
///
/// Blank lines and `#` comments are ignored.
pub fn parse_batch(content: &str) -> Vec<Endpoint> {
    parse_entries(content.lines())
}

fn parse_entries<I, S>(entries: I) -> Vec<Endpoint>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut endpoints = Vec::new();
    for entry in entries {
        let trimmed = entry.as_ref().trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        match Endpoint::parse(trimmed) {
            Ok(endpoint) => endpoints.push(endpoint),
            Err(e) => warn!("Skipping malformed entry {:?}: {}", trimmed, e),
        }
    }
    endpoints
}

/// Reads a `host:port` list from disk on every cycle
pub struct FileBatchSource {
    path: PathBuf,
}

impl FileBatchSource {
    /// The file must exist when the guard starts
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.is_file() {
            return Err(GuardError::InputNotFound(path));
        }
        Ok(Self { path })
    }
}

#[async_trait]
impl BatchSource for FileBatchSource {
    async fn next_batch(&self) -> Result<Vec<Endpoint>> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        let batch = parse_batch(&content);
        debug!("Loaded {} candidates from {}", batch.len(), self.path.display());
        Ok(batch)
    }

    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }
}

/// A fixed list given at startup
pub struct StaticBatchSource {
    endpoints: Vec<Endpoint>,
}

impl StaticBatchSource {
    pub fn new(endpoints: Vec<Endpoint>) -> Self {
        Self { endpoints }
    }

    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::new(parse_entries(entries))
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

#[async_trait]
impl BatchSource for StaticBatchSource {
    async fn next_batch(&self) -> Result<Vec<Endpoint>> {
        Ok(self.endpoints.clone())
    }

    fn describe(&self) -> String {
        format!("{} static entries", self.endpoints.len())
    }
}
