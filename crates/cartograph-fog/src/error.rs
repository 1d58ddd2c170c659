/// Errors raised when sizing the fog mask.
#[derive(Debug, thiserror::Error)]
pub enum FogError {
    #[error("invalid fog mask size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },

    #[error("failed to spawn fog worker thread: {0}")]
    Spawn(#[source] std::io::Error),
}
