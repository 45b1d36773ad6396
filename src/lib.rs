//! Sockguard - SOCKS5 proxy vetting service
//!
//! Periodically checks candidate SOCKS5 endpoints and sorts them into
//! result sets.
//!
//! ## Features
//!
//! - Connectivity probing through the candidate proxy
//! - Traffic forwarding verification against an IP echo service
//! - AbuseIPDB reputation checks that fail open
//! - Bounded-concurrency batches with once-per-process evaluation
//! - JSON result files plus a small read-only HTTP API
//! - ipinfo.io geolocation of static proxy lists

pub mod api;
pub mod config;
pub mod error;
pub mod geo;
pub mod guard;
pub mod models;
pub mod services;

pub use config::Config;
pub use error::{GuardError, Result};
