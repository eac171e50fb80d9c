pub mod console;
pub mod http;

use crate::pipeline::entry::CanonicalEntry;
use async_trait::async_trait;
use thiserror::Error;

pub use console::ConsoleSender;
pub use http::HttpSender;

#[derive(Debug, Error)]
pub enum SenderError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("collector returned error status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Delivers canonical entries to wherever they are collected.
///
/// Delivery is at-most-once: a failed send is reported, never retried here.
#[async_trait]
pub trait Sender: Send + Sync {
    async fn send(&self, entry: &CanonicalEntry) -> Result<(), SenderError>;
}
