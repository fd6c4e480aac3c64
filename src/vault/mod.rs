//! Credential vault
//!
//! Keeps remote-storage credentials in memory only, scoped per principal
//! and bounded by a TTL. Nothing here is ever written to disk.

pub mod credential;
pub mod store;

pub use credential::Credential;
pub use store::{CredentialEntry, CredentialVault};
