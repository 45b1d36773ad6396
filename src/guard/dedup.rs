//! Claim tracking for endpoints evaluated during this process lifetime

use std::sync::Arc;

use dashmap::DashSet;

use crate::models::Endpoint;

/// Set of endpoint identities already claimed for evaluation.
///
/// Grows monotonically; there is no removal or expiry.
#[derive(Clone, Default)]
pub struct CheckedSet {
    claimed: Arc<DashSet<String>>,
}

impl CheckedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim an endpoint. Returns `true` for exactly one caller per identity.
    pub fn try_claim(&self, endpoint: &Endpoint) -> bool {
        // DashSet::insert tests and inserts under the same shard lock
        self.claimed.insert(endpoint.identity())
    }

    pub fn len(&self) -> usize {
        self.claimed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claimed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_claim_once() {
        let checked = CheckedSet::new();
        let endpoint = Endpoint::parse("10.0.0.1:1080").unwrap();

        assert!(checked.try_claim(&endpoint));
        assert!(!checked.try_claim(&endpoint));
        assert_eq!(checked.len(), 1);
    }

    #[test]
    fn test_clones_share_state() {
        let checked = CheckedSet::new();
        let other = checked.clone();
        let endpoint = Endpoint::parse("10.0.0.1:1080").unwrap();

        assert!(other.try_claim(&endpoint));
        assert!(!checked.try_claim(&endpoint));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_claims_have_single_winner() {
        let checked = CheckedSet::new();
        let winners = Arc::new(AtomicUsize::new(0));
        let endpoint = Endpoint::parse("10.0.0.9:1080").unwrap();

        let handles: Vec<_> = (0..64)
            .map(|_| {
                let checked = checked.clone();
                let winners = winners.clone();
                let endpoint = endpoint.clone();
                tokio::spawn(async move {
                    if checked.try_claim(&endpoint) {
                        winners.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(winners.load(Ordering::SeqCst), 1);
        assert_eq!(checked.len(), 1);
    }
}
