//! Asynchronous image and data loading with an in-memory cache.
//!
//! [`ResourceLoader`] resolves cache hits synchronously on the calling thread
//! and hands misses to a fixed pool of at most two worker threads. Every
//! failure, including a panicking loader, is caught on the worker, logged and
//! cached as an absent value; nothing is re-thrown across threads.

mod cache;
mod error;
mod handle;
mod loader;
mod pool;

pub use error::AssetError;
pub use handle::{LoadHandle, LoadState};
pub use loader::{LoaderEvent, MAX_LOADER_WORKERS, ResourceLoader};
pub use pool::WorkerPool;
