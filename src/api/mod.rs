//! API server implementation
//!
//! Read-only REST endpoints exposing the current result sets.

pub mod handlers;
pub mod routes;
pub mod server;

pub use server::ApiServer;
