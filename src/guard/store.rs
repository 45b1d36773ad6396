//! Result sets and their persistence
//!
//! Writers publish a fresh immutable snapshot on every insertion; readers
//! (the API and the persistence step) load the current snapshot without
//! locking and never observe a half-applied update.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::error::Result;
use crate::models::{Disposition, Endpoint};

/// Point-in-time copy of both result sets
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResultSnapshot {
    pub blacklist: BTreeSet<String>,
    pub not_working: BTreeSet<String>,
}

/// Blacklist and not-working sets shared between the pipeline and readers
#[derive(Clone, Default)]
pub struct ResultStore {
    current: Arc<ArcSwap<ResultSnapshot>>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a terminal disposition. `Clean` is not stored.
    pub fn record(&self, endpoint: &Endpoint, disposition: Disposition) {
        let malicious = disposition == Disposition::Malicious;
        if !malicious && !disposition.is_not_working() {
            return;
        }

        let identity = endpoint.identity();
        self.current.rcu(|snapshot| {
            let mut next = ResultSnapshot::clone(snapshot);
            if malicious {
                next.blacklist.insert(identity.clone());
            } else {
                next.not_working.insert(identity.clone());
            }
            next
        });
    }

    pub fn snapshot(&self) -> Arc<ResultSnapshot> {
        self.current.load_full()
    }

    pub fn blacklist(&self) -> Vec<String> {
        self.current.load().blacklist.iter().cloned().collect()
    }

    pub fn not_working(&self) -> Vec<String> {
        self.current.load().not_working.iter().cloned().collect()
    }
}

/// Writes result sets to flat JSON files, replacing previous contents
#[derive(Debug, Clone)]
pub struct ResultWriter {
    blacklist_path: PathBuf,
    not_working_path: PathBuf,
}

impl ResultWriter {
    pub fn new(blacklist_path: impl Into<PathBuf>, not_working_path: impl Into<PathBuf>) -> Self {
        Self {
            blacklist_path: blacklist_path.into(),
            not_working_path: not_working_path.into(),
        }
    }

    #[instrument(skip(self, snapshot), fields(
        blacklist = snapshot.blacklist.len(),
        not_working = snapshot.not_working.len()
    ))]
    pub async fn persist(&self, snapshot: &ResultSnapshot) -> Result<()> {
        write_json_array(&self.blacklist_path, &snapshot.blacklist).await?;
        write_json_array(&self.not_working_path, &snapshot.not_working).await?;
        debug!("Result sets persisted");
        Ok(())
    }

    /// Read a persisted set back
    #[cfg(test)]
    pub(crate) async fn load(path: &Path) -> Result<BTreeSet<String>> {
        let raw = tokio::fs::read(path).await?;
        Ok(serde_json::from_slice(&raw)?)
    }
}

/// Write through a sibling temp file and rename it into place
async fn write_json_array(path: &Path, items: &BTreeSet<String>) -> Result<()> {
    let json = serde_json::to_vec_pretty(items)?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, json).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}
