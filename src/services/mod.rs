//! Background services

pub mod batch_source;
pub mod guard_service;

pub use batch_source::{BatchSource, FileBatchSource, StaticBatchSource};
pub use guard_service::GuardService;
