//! Credential lifecycle.
//!
//! - [`CredentialManager`]: verify ticket recording and cache-aside access token
//!   retrieval with single-flight exchange
//! - [`ExchangeFailureTracker`]: consecutive exchange failures per app id

mod flight;
mod manager;
mod tracker;

pub use manager::CredentialManager;
pub use tracker::{ESCALATION_THRESHOLD, ExchangeFailureTracker, FailureInfo};
