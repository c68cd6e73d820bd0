//! Probe module for HTTP liveness checks.
//!
//! A probe is a bounded series of GET attempts against one target.

mod http;
mod retry;

pub use http::*;
pub use retry::*;

use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Probe error types.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("probe timed out after {0:?}")]
    Timeout(Duration),
    #[error("network error: {0}")]
    Network(String),
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// A single HTTP GET attempt.
///
/// Implementations return the response status code, or an error when no
/// response was received at all.
pub trait HttpCheck: Send + Sync + 'static {
    fn get_status(&self, url: &str) -> impl Future<Output = Result<u16, ProbeError>> + Send;
}
