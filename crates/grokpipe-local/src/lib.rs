//! Local (reqwest) implementations for grokpipe.

pub mod env;
pub mod xai;

pub use xai::{XaiClient, XaiConfig};

/// Shared HTTP client; per-request timeouts are set by the backends.
pub fn http_client() -> grokpipe_core::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("grokpipe/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| grokpipe_core::Error::NotConfigured(format!("http client: {e}")))
}
