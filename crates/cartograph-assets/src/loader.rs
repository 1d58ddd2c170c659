//! The resource loader: image and generic data caches over a small worker pool.

use std::any::Any;
use std::fmt::Display;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use image::RgbaImage;
use parking_lot::RwLock;
use tracing::{debug, trace, warn};

use crate::cache::{AssetCache, Begin, Waiter, call_guarded, panic_message};
use crate::handle::LoadHandle;
use crate::pool::WorkerPool;
use crate::AssetError;

/// Upper bound on concurrent loads.
pub const MAX_LOADER_WORKERS: usize = 2;

const POOL_NAME: &str = "asset-loader";

type AnyValue = dyn Any + Send + Sync;
type Listener = Arc<dyn Fn(&LoaderEvent) + Send + Sync>;

/// Notification emitted on a worker thread after each underlying load.
#[derive(Debug, Clone, PartialEq)]
pub enum LoaderEvent {
    Loaded { key: String },
    Failed { key: String, error: String },
}

impl LoaderEvent {
    pub fn key(&self) -> &str {
        match self {
            Self::Loaded { key } | Self::Failed { key, .. } => key,
        }
    }
}

/// State the worker jobs need besides the cache itself.
#[derive(Clone)]
struct JobContext {
    listeners: Arc<RwLock<Vec<Listener>>>,
    disposed: Arc<AtomicBool>,
}

impl JobContext {
    fn emit(&self, event: LoaderEvent) {
        // Snapshot so a listener may register another listener without deadlocking.
        let listeners: Vec<Listener> = self.listeners.read().clone();
        for listener in listeners {
            call_guarded(event.key(), "loader event listener", || listener(&event));
        }
    }
}

/// Loads images from disk and arbitrary data from caller-supplied closures,
/// caching both for the lifetime of the scene.
///
/// Cache hits answer synchronously on the calling thread. Misses run on one of
/// at most [`MAX_LOADER_WORKERS`] named `asset-loader-N` threads and answer on
/// that thread. Concurrent requests for a key that is already loading join the
/// running load instead of starting another.
pub struct ResourceLoader {
    asset_root: PathBuf,
    images: Arc<AssetCache<RgbaImage>>,
    data: Arc<AssetCache<AnyValue>>,
    context: JobContext,
    pool: WorkerPool,
}

impl ResourceLoader {
    /// Create a loader resolving image paths against `asset_root`.
    ///
    /// `worker_count` is clamped to `1..=MAX_LOADER_WORKERS`.
    pub fn new(asset_root: impl Into<PathBuf>, worker_count: usize) -> Result<Self, AssetError> {
        let workers = worker_count.clamp(1, MAX_LOADER_WORKERS);
        Ok(Self {
            asset_root: asset_root.into(),
            images: Arc::new(AssetCache::new()),
            data: Arc::new(AssetCache::new()),
            context: JobContext {
                listeners: Arc::new(RwLock::new(Vec::new())),
                disposed: Arc::new(AtomicBool::new(false)),
            },
            pool: WorkerPool::new(POOL_NAME, workers)?,
        })
    }

    pub fn asset_root(&self) -> &Path {
        &self.asset_root
    }

    // --- images ---

    /// Request an image; poll or wait on the returned handle.
    pub fn load_image(&self, path: &str) -> LoadHandle<RgbaImage> {
        let (tx, rx) = crossbeam_channel::bounded(1);
        self.load_image_with(path, move |image| {
            let _ = tx.send(image);
        });
        LoadHandle::new(rx)
    }

    /// Request an image and get `on_loaded` called exactly once: inline on a
    /// cache hit, on a worker thread otherwise. `None` means the image failed
    /// to load.
    pub fn load_image_with(
        &self,
        path: &str,
        on_loaded: impl FnOnce(Option<Arc<RgbaImage>>) + Send + 'static,
    ) {
        let full_path = self.asset_root.join(path);
        request(
            &self.images,
            &self.pool,
            &self.context,
            path,
            Box::new(on_loaded),
            move || decode_image(&full_path),
        );
    }

    /// Warm the image cache without a callback.
    pub fn preload_image(&self, path: &str) {
        self.load_image_with(path, |_| {});
    }

    /// The cached image, if it finished loading successfully.
    pub fn cached_image(&self, path: &str) -> Option<Arc<RgbaImage>> {
        self.images.get(path).flatten()
    }

    // --- generic data ---

    /// Run `loader` on a worker (or answer from cache) and return a handle.
    pub fn load_data<T, E, F>(&self, key: &str, loader: F) -> LoadHandle<T>
    where
        T: Send + Sync + 'static,
        E: Display,
        F: FnOnce() -> Result<T, E> + Send + 'static,
    {
        let (tx, rx) = crossbeam_channel::bounded(1);
        self.load_data_with(key, loader, move |value| {
            let _ = tx.send(value);
        });
        LoadHandle::new(rx)
    }

    /// Callback form of [`load_data`](Self::load_data), with the same timing
    /// contract as [`load_image_with`](Self::load_image_with).
    pub fn load_data_with<T, E, F, C>(&self, key: &str, loader: F, on_loaded: C)
    where
        T: Send + Sync + 'static,
        E: Display,
        F: FnOnce() -> Result<T, E> + Send + 'static,
        C: FnOnce(Option<Arc<T>>) + Send + 'static,
    {
        let owned_key = key.to_string();
        let waiter: Waiter<AnyValue> =
            Box::new(move |value| on_loaded(downcast_value(&owned_key, value)));
        request(&self.data, &self.pool, &self.context, key, waiter, move || {
            loader()
                .map(|value| Arc::new(value) as Arc<AnyValue>)
                .map_err(|e| AssetError::Loader(e.to_string()))
        });
    }

    /// Warm the data cache without a callback.
    pub fn preload_data<T, E, F>(&self, key: &str, loader: F)
    where
        T: Send + Sync + 'static,
        E: Display,
        F: FnOnce() -> Result<T, E> + Send + 'static,
    {
        self.load_data_with(key, loader, |_: Option<Arc<T>>| {});
    }

    /// The cached value for `key`, if present and of type `T`.
    pub fn cached_data<T: Send + Sync + 'static>(&self, key: &str) -> Option<Arc<T>> {
        downcast_value(key, self.data.get(key).flatten())
    }

    // --- lifecycle and diagnostics ---

    /// Register a listener called on worker threads after every load, once
    /// the load's callers have been answered. A panicking listener is logged.
    pub fn on_event(&self, listener: impl Fn(&LoaderEvent) + Send + Sync + 'static) {
        self.context.listeners.write().push(Arc::new(listener));
    }

    /// Tear down for scene exit: stop accepting work, clear both caches and
    /// drop every listener.
    ///
    /// Loads already running still answer their callers; queued loads answer
    /// `None` without running. Later requests answer `None` immediately.
    pub fn dispose(&mut self) {
        self.context.disposed.store(true, Ordering::Release);
        self.pool.close();
        self.images.clear();
        self.data.clear();
        self.context.listeners.write().clear();
        debug!("resource loader disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.context.disposed.load(Ordering::Acquire)
    }

    /// Cached images, including ones that failed.
    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// Cached data values, including ones that failed.
    pub fn data_count(&self) -> usize {
        self.data.len()
    }

    /// Total underlying loader invocations across both caches.
    pub fn load_count(&self) -> u64 {
        self.images.load_count() + self.data.load_count()
    }

    /// Loads queued or running on the pool.
    pub fn in_flight_count(&self) -> usize {
        self.pool.in_flight_count()
    }

    pub fn worker_count(&self) -> usize {
        self.pool.worker_count()
    }
}

/// Answer from cache, join an in-flight load, or submit `load` to the pool.
fn request<T>(
    cache: &Arc<AssetCache<T>>,
    pool: &WorkerPool,
    context: &JobContext,
    key: &str,
    waiter: Waiter<T>,
    load: impl FnOnce() -> Result<Arc<T>, AssetError> + Send + 'static,
) where
    T: ?Sized + Send + Sync + 'static,
{
    if context.disposed.load(Ordering::Acquire) {
        waiter(None);
        return;
    }

    match cache.begin(key, waiter) {
        Begin::Hit(value, waiter) => waiter(value),
        Begin::Joined => trace!(key, "joined in-flight load"),
        Begin::Start => {
            let generation = cache.generation();
            let job_cache = Arc::clone(cache);
            let job_context = context.clone();
            let job_key = key.to_string();

            let submitted = pool.submit(move || {
                if job_context.disposed.load(Ordering::Acquire) {
                    debug!(key = %job_key, error = %AssetError::Disposed, "skipping queued load");
                    job_cache.resolve(&job_key, None, generation);
                    return;
                }

                job_cache.count_load();
                let (value, event) = match run_guarded(load) {
                    Ok(value) => {
                        trace!(key = %job_key, "asset loaded");
                        let event = LoaderEvent::Loaded {
                            key: job_key.clone(),
                        };
                        (Some(value), event)
                    }
                    Err(error) => {
                        warn!(key = %job_key, %error, "asset load failed");
                        let event = LoaderEvent::Failed {
                            key: job_key.clone(),
                            error: error.to_string(),
                        };
                        (None, event)
                    }
                };
                // Waiters are answered before listeners run.
                job_cache.resolve(&job_key, value, generation);
                job_context.emit(event);
            });

            if !submitted {
                // Closed between the disposed check and now: answer without caching.
                cache.resolve(key, None, generation.wrapping_sub(1));
            }
        }
    }
}

/// Run a loader, turning a panic into an [`AssetError::Panicked`].
fn run_guarded<T: ?Sized>(
    load: impl FnOnce() -> Result<Arc<T>, AssetError>,
) -> Result<Arc<T>, AssetError> {
    match panic::catch_unwind(AssertUnwindSafe(load)) {
        Ok(result) => result,
        Err(payload) => Err(AssetError::Panicked(panic_message(payload.as_ref()))),
    }
}

fn downcast_value<T: Send + Sync + 'static>(
    key: &str,
    value: Option<Arc<AnyValue>>,
) -> Option<Arc<T>> {
    match value?.downcast::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            let error = AssetError::TypeMismatch {
                key: key.to_string(),
            };
            warn!(%error, "cached data has unexpected type");
            None
        }
    }
}

fn decode_image(path: &Path) -> Result<Arc<RgbaImage>, AssetError> {
    let bytes = std::fs::read(path).map_err(|source| AssetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let image = image::load_from_memory(&bytes)?;
    Ok(Arc::new(image.to_rgba8()))
}
