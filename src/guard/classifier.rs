//! Per-endpoint evaluation pipeline
//!
//! `Unchecked -> Claimed -> {Unreachable | NonForwarding | Malicious | Clean}`.
//! Each stage short-circuits on failure. Transport errors are mapped to a
//! disposition and never leave this module.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::error::GuardError;
use crate::guard::dedup::CheckedSet;
use crate::guard::probe::ConnectivityProbe;
use crate::guard::reputation::ReputationChecker;
use crate::guard::store::ResultStore;
use crate::guard::traffic::TrafficVerifier;
use crate::models::{Disposition, Endpoint};

/// Combines the three checks into a disposition and records it
pub struct Classifier {
    checked: CheckedSet,
    store: ResultStore,
    probe: Arc<dyn ConnectivityProbe>,
    traffic: Arc<dyn TrafficVerifier>,
    reputation: ReputationChecker,
}

impl Classifier {
    pub fn new(
        checked: CheckedSet,
        store: ResultStore,
        probe: Arc<dyn ConnectivityProbe>,
        traffic: Arc<dyn TrafficVerifier>,
        reputation: ReputationChecker,
    ) -> Self {
        Self {
            checked,
            store,
            probe,
            traffic,
            reputation,
        }
    }

    pub fn checked(&self) -> &CheckedSet {
        &self.checked
    }

    pub fn store(&self) -> &ResultStore {
        &self.store
    }

    /// Evaluate an endpoint once per process lifetime.
    ///
    /// Returns `None` when another caller already claimed it.
    #[instrument(skip(self), fields(endpoint = %endpoint))]
    pub async fn evaluate(&self, endpoint: &Endpoint) -> Option<Disposition> {
        if !self.checked.try_claim(endpoint) {
            debug!("Already evaluated, skipping");
            return None;
        }

        let disposition = self.run_checks(endpoint).await;
        self.store.record(endpoint, disposition);
        debug!(%disposition, "Evaluation complete");
        Some(disposition)
    }

    async fn run_checks(&self, endpoint: &Endpoint) -> Disposition {
        if let Err(e) = self.probe.probe(endpoint).await {
            warn!("Proxy {} failed - Cannot establish connection: {}", endpoint, e);
            return Disposition::Unreachable;
        }

        if let Err(e) = self.traffic.verify(endpoint).await {
            warn!("Proxy {} {}: {}", endpoint, forwarding_failure(&e), e);
            return Disposition::NonForwarding;
        }

        let verdict = self.reputation.assess(endpoint.host()).await;
        if verdict.is_malicious() {
            warn!(score = ?verdict.score(), "Proxy {} is confirmed malicious", endpoint);
            Disposition::Malicious
        } else {
            info!(
                score = ?verdict.score(),
                "Proxy {} works and is not marked as malicious", endpoint
            );
            Disposition::Clean
        }
    }
}

/// Log wording for a failed traffic check
fn forwarding_failure(err: &GuardError) -> &'static str {
    match err {
        // the round trip completed but the echo was wrong
        GuardError::TrafficCheckFailed(_) => "does not properly forward traffic",
        _ => "failed",
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::error::Result;
    use crate::guard::reputation::{ReputationSource, Thresholds};

    /// Per-endpoint scripted behaviour for the three checks
    #[derive(Clone, Default)]
    pub(crate) struct Script {
        pub unreachable: Vec<&'static str>,
        pub non_forwarding: Vec<&'static str>,
        pub scores: HashMap<&'static str, u8>,
        pub reputation_down: bool,
    }

    pub(crate) struct FakeNetwork {
        pub script: Script,
        pub probes: AtomicUsize,
    }

    #[async_trait]
    impl ConnectivityProbe for FakeNetwork {
        async fn probe(&self, endpoint: &Endpoint) -> Result<()> {
            self.probes.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            if self.script.unreachable.contains(&endpoint.identity().as_str()) {
                Err(GuardError::ProxyConnectionFailed("refused".into()))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl TrafficVerifier for FakeNetwork {
        async fn verify(&self, endpoint: &Endpoint) -> Result<()> {
            if self.script.non_forwarding.contains(&endpoint.identity().as_str()) {
                Err(GuardError::TrafficCheckFailed("origin mismatch".into()))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl ReputationSource for FakeNetwork {
        async fn score(&self, ip: &str) -> Result<u8> {
            if self.script.reputation_down {
                return Err(GuardError::ReputationUnavailable("network down".into()));
            }
            Ok(self.script.scores.get(ip).copied().unwrap_or(0))
        }
    }

    pub(crate) fn classifier_for(script: Script) -> (Classifier, Arc<FakeNetwork>) {
        let network = Arc::new(FakeNetwork {
            script,
            probes: AtomicUsize::new(0),
        });
        let reputation = ReputationChecker::new(
            Some(network.clone() as Arc<dyn ReputationSource>),
            Thresholds::default(),
            Duration::from_secs(1),
        );
        let classifier = Classifier::new(
            CheckedSet::new(),
            ResultStore::new(),
            network.clone(),
            network.clone(),
            reputation,
        );
        (classifier, network)
    }

    fn ep(raw: &str) -> Endpoint {
        Endpoint::parse(raw).unwrap()
    }

    #[tokio::test]
    async fn test_unreachable_goes_to_not_working_regardless_of_score() {
        let (classifier, _) = classifier_for(Script {
            unreachable: vec!["10.0.0.1:1080"],
            scores: HashMap::from([("10.0.0.1", 100)]),
            ..Default::default()
        });

        let disposition = classifier.evaluate(&ep("10.0.0.1:1080")).await;
        assert_eq!(disposition, Some(Disposition::Unreachable));
        assert_eq!(classifier.store().not_working(), vec!["10.0.0.1:1080"]);
        assert!(classifier.store().blacklist().is_empty());
    }

    #[tokio::test]
    async fn test_non_forwarding_goes_to_not_working() {
        let (classifier, _) = classifier_for(Script {
            non_forwarding: vec!["10.0.0.2:1080"],
            ..Default::default()
        });

        let disposition = classifier.evaluate(&ep("10.0.0.2:1080")).await;
        assert_eq!(disposition, Some(Disposition::NonForwarding));
        assert_eq!(classifier.store().not_working(), vec!["10.0.0.2:1080"]);
    }

    #[tokio::test]
    async fn test_score_boundary() {
        let (classifier, _) = classifier_for(Script {
            scores: HashMap::from([("10.0.0.50", 50), ("10.0.0.51", 51)]),
            ..Default::default()
        });

        assert_eq!(
            classifier.evaluate(&ep("10.0.0.50:1080")).await,
            Some(Disposition::Clean)
        );
        assert_eq!(
            classifier.evaluate(&ep("10.0.0.51:1080")).await,
            Some(Disposition::Malicious)
        );
        assert_eq!(classifier.store().blacklist(), vec!["10.0.0.51:1080"]);
        assert!(classifier.store().not_working().is_empty());
    }

    #[tokio::test]
    async fn test_reputation_failure_fails_open() {
        let (classifier, _) = classifier_for(Script {
            reputation_down: true,
            ..Default::default()
        });

        let disposition = classifier.evaluate(&ep("10.0.0.2:1080")).await;
        assert_eq!(disposition, Some(Disposition::Clean));
        let snapshot = classifier.store().snapshot();
        assert!(snapshot.blacklist.is_empty());
        assert!(snapshot.not_working.is_empty());
    }

    #[tokio::test]
    async fn test_second_evaluation_is_a_no_op() {
        let (classifier, network) = classifier_for(Script::default());

        assert!(classifier.evaluate(&ep("10.0.0.2:1080")).await.is_some());
        assert!(classifier.evaluate(&ep("10.0.0.2:1080")).await.is_none());
        assert_eq!(network.probes.load(Ordering::SeqCst), 1);
        assert_eq!(classifier.checked().len(), 1);
    }

    #[test]
    fn test_forwarding_failure_wording() {
        assert_eq!(
            forwarding_failure(&GuardError::TrafficCheckFailed("origin mismatch".into())),
            "does not properly forward traffic"
        );
        assert_eq!(forwarding_failure(&GuardError::Timeout), "failed");
        assert_eq!(
            forwarding_failure(&GuardError::ProxyConnectionFailed("refused".into())),
            "failed"
        );
    }
}
