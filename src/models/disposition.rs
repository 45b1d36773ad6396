use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Terminal classification of an endpoint for this run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    /// The SOCKS5 handshake to the reachability target failed or timed out
    Unreachable,
    /// The proxy accepted connections but did not relay traffic correctly
    NonForwarding,
    /// The origin address has a high abuse score
    Malicious,
    /// Functional and not known to be abusive
    Clean,
}

impl Disposition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Disposition::Unreachable => "unreachable",
            Disposition::NonForwarding => "non_forwarding",
            Disposition::Malicious => "malicious",
            Disposition::Clean => "clean",
        }
    }

    /// Dispositions recorded in the not-working set
    pub fn is_not_working(&self) -> bool {
        matches!(self, Disposition::Unreachable | Disposition::NonForwarding)
    }
}

impl std::fmt::Display for Disposition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of a reputation assessment.
///
/// Only `Malicious` blocks an endpoint; `Unavailable` is the fail-open case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReputationVerdict {
    Clean(u8),
    Moderate(u8),
    Malicious(u8),
    Unavailable(String),
}

impl ReputationVerdict {
    pub fn is_malicious(&self) -> bool {
        matches!(self, ReputationVerdict::Malicious(_))
    }

    pub fn score(&self) -> Option<u8> {
        match self {
            ReputationVerdict::Clean(s)
            | ReputationVerdict::Moderate(s)
            | ReputationVerdict::Malicious(s) => Some(*s),
            ReputationVerdict::Unavailable(_) => None,
        }
    }
}

/// Summary of one batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Candidates submitted
    pub submitted: usize,
    /// Already claimed earlier in the process lifetime
    pub skipped: usize,
    pub unreachable: usize,
    pub non_forwarding: usize,
    pub malicious: usize,
    pub clean: usize,
    /// Evaluations that died before reaching a disposition
    pub failed: usize,
}

impl BatchReport {
    pub fn new(submitted: usize) -> Self {
        let now = Utc::now();
        Self {
            started_at: now,
            finished_at: now,
            submitted,
            skipped: 0,
            unreachable: 0,
            non_forwarding: 0,
            malicious: 0,
            clean: 0,
            failed: 0,
        }
    }

    pub fn record(&mut self, disposition: Disposition) {
        match disposition {
            Disposition::Unreachable => self.unreachable += 1,
            Disposition::NonForwarding => self.non_forwarding += 1,
            Disposition::Malicious => self.malicious += 1,
            Disposition::Clean => self.clean += 1,
        }
    }

    pub fn evaluated(&self) -> usize {
        self.unreachable + self.non_forwarding + self.malicious + self.clean
    }

    pub fn finish(mut self) -> Self {
        self.finished_at = Utc::now();
        self
    }
}

/// Progress of the periodic driver, published after every cycle
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GuardStatus {
    pub cycles: u64,
    pub checked: usize,
    pub last_batch: Option<BatchReport>,
    pub last_persisted_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disposition_sets() {
        assert!(Disposition::Unreachable.is_not_working());
        assert!(Disposition::NonForwarding.is_not_working());
        assert!(!Disposition::Malicious.is_not_working());
        assert!(!Disposition::Clean.is_not_working());
    }

    #[test]
    fn test_disposition_serde() {
        let json = serde_json::to_string(&Disposition::NonForwarding).unwrap();
        assert_eq!(json, "\"non_forwarding\"");
        assert_eq!(Disposition::NonForwarding.to_string(), "non_forwarding");
    }

    #[test]
    fn test_verdict_blocks_only_when_malicious() {
        assert!(ReputationVerdict::Malicious(51).is_malicious());
        assert!(!ReputationVerdict::Moderate(50).is_malicious());
        assert!(!ReputationVerdict::Clean(0).is_malicious());
        assert!(!ReputationVerdict::Unavailable("timeout".into()).is_malicious());
        assert_eq!(ReputationVerdict::Unavailable("x".into()).score(), None);
        assert_eq!(ReputationVerdict::Moderate(30).score(), Some(30));
    }

    #[test]
    fn test_batch_report_counts() {
        let mut report = BatchReport::new(5);
        report.record(Disposition::Unreachable);
        report.record(Disposition::Clean);
        report.record(Disposition::Clean);
        report.skipped += 1;
        report.failed += 1;

        let report = report.finish();
        assert_eq!(report.evaluated(), 3);
        assert_eq!(report.clean, 2);
        assert!(report.finished_at >= report.started_at);
    }
}
