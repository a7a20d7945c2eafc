// src/error.rs
//! Error taxonomy shared by the pipeline components.
//!
//! Per-asset errors (`ProviderError`, `StoreError`) are recorded in the
//! ingestion report and never abort a run. `ChannelError::Connection` is only
//! fatal when raised while a binary is starting up.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    /// Upstream could not be reached, timed out, or answered with a non-2xx status.
    #[error("price provider unavailable: {0}")]
    Unavailable(String),
    /// Upstream answered 2xx but the body could not be decoded.
    #[error("price provider returned a malformed payload: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ProviderError::Malformed(e.to_string())
        } else {
            ProviderError::Unavailable(e.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to persist snapshot: {0}")]
    Persistence(String),
    #[error("failed to read snapshots: {0}")]
    Query(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Query(e.to_string())
    }
}

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("channel connection failed: {0}")]
    Connection(String),
    #[error("publish to '{topic}' failed: {reason}")]
    Publish { topic: String, reason: String },
    #[error("subscribe to '{topic}' failed: {reason}")]
    Subscribe { topic: String, reason: String },
    #[error("channel already closed")]
    Closed,
}
