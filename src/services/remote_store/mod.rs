use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("{operation} returned HTTP {status}: {body}")]
    Status {
        operation: &'static str,
        status: u16,
        body: String,
    },

    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Local file error: {0}")]
    Io(#[from] std::io::Error),
}

/// A document library that files can be fetched from and stored into.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Provider identifier (e.g., "sharepoint")
    fn provider_id(&self) -> &'static str;

    /// Download the library file `name` into `local_path`.
    /// Returns the number of bytes written.
    async fn download(&self, name: &str, local_path: &Path) -> Result<u64, RemoteError>;

    /// Upload `local_path` into the library as `name`, replacing any
    /// existing file of that name.
    async fn upload(&self, local_path: &Path, name: &str) -> Result<(), RemoteError>;
}

pub mod sharepoint;
