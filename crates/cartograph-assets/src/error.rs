//! Asset loading error types.

use std::path::PathBuf;

/// Reasons a single asset could not be produced.
///
/// These never cross the worker boundary as errors: the worker logs them,
/// reports them through [`LoaderEvent::Failed`](crate::LoaderEvent) and stores
/// an absent value.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    /// The asset file could not be opened or read.
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The image bytes could not be decoded.
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    /// A caller-supplied data loader returned an error.
    #[error("loader failed: {0}")]
    Loader(String),

    /// The loader panicked; the payload message is preserved when it is a string.
    #[error("loader panicked: {0}")]
    Panicked(String),

    /// A cached value under this key has a different type than requested.
    #[error("cached value for {key} has a different type")]
    TypeMismatch { key: String },

    /// The loader was disposed before the work started.
    #[error("resource loader has been disposed")]
    Disposed,

    /// A worker thread could not be spawned.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] std::io::Error),
}
