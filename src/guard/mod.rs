//! Proxy validation pipeline
//!
//! This module provides:
//! - Claim tracking so each endpoint is evaluated once per process
//! - SOCKS5 connectivity probing
//! - Traffic forwarding verification against an IP echo service
//! - AbuseIPDB reputation checks with a fail-open policy
//! - Classification into blacklist / not-working result sets
//! - Bounded-concurrency batch scheduling

pub mod classifier;
pub mod dedup;
pub mod probe;
pub mod reputation;
pub mod scheduler;
pub mod store;
pub mod traffic;

pub use classifier::Classifier;
pub use dedup::CheckedSet;
pub use probe::{ConnectivityProbe, Socks5Probe};
pub use reputation::{AbuseIpDbClient, ReputationChecker, ReputationSource, Thresholds};
pub use scheduler::WorkerPool;
pub use store::{ResultSnapshot, ResultStore, ResultWriter};
pub use traffic::{EchoVerifier, TrafficVerifier};
