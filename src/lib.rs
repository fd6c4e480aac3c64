//! Storage Insights - usage analytics over local records and B2 buckets
//!
//! Holds the credential vault, the remote listing cursor, the usage
//! aggregator with its report cache, and the lightweight stats summarizer.
//! The daemon binary wires these to a Unix socket.

pub mod catalog;
pub mod classify;
pub mod config;
pub mod errors;
pub mod insights;
pub mod ipc;
pub mod remote;
pub mod service;
pub mod vault;

pub use config::Config;
pub use errors::InsightsError;
pub use service::InsightsService;
