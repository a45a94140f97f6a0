use std::path::PathBuf;

use thiserror::Error;

/// Failure to obtain or decode the displayed image.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Transport-level failure (DNS, TLS, timeout, ...).
    #[error("request to {url} failed")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered, but not with a success status.
    #[error("{url} answered with status {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    /// Reading a local image file failed.
    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The bytes are not an image the decoder understands.
    #[error("failed to decode image")]
    Decode(#[from] image::ImageError),

    /// The blocking decode task panicked or was cancelled.
    #[error("decode task did not complete")]
    Join(#[from] tokio::task::JoinError),
}
