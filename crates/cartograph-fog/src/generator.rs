//! Version-tracked fog mask generator with one background worker.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::Instant;

use cartograph_map::Surface;
use crossbeam_channel::{Receiver, Sender};
use glam::Vec2;
use parking_lot::Mutex;
use tiny_skia::Pixmap;
use tracing::{debug, trace, warn};

use crate::error::FogError;
use crate::mask::build_mask;

const WORKER_NAME: &str = "fog-mask";

type Completion = Box<dyn FnOnce(Arc<Pixmap>) + Send + 'static>;

/// Inputs the mask is built from, in viewport pixels.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FogParams {
    pub enabled: bool,
    pub reveal_radius: f32,
    /// Compared element-wise and in order.
    pub discovered_areas: Vec<Vec2>,
}

struct Job {
    version: u64,
    width: u32,
    height: u32,
    color: [u8; 4],
    params: FogParams,
}

/// State visible to both the render thread and the worker.
struct Shared {
    mask: Mutex<Arc<Pixmap>>,
    /// Version of the parameters `mask` was built from.
    generated_version: AtomicU64,
    /// Newest version submitted; older queued jobs are skipped.
    latest_requested: AtomicU64,
    /// Callbacks waiting for a version. Also guards publication of `mask`.
    waiters: Mutex<Vec<(u64, Completion)>>,
    /// Current viewport size; masks built for another size are dropped.
    size: Mutex<(u32, u32)>,
}

impl Shared {
    /// Install a freshly built mask and take every waiter it satisfies.
    fn publish(&self, version: u64, mask: Arc<Pixmap>) -> Vec<Completion> {
        let mut waiters = self.waiters.lock();
        if version < self.generated_version.load(Ordering::Acquire)
            || (mask.width(), mask.height()) != *self.size.lock()
        {
            return Vec::new();
        }
        *self.mask.lock() = mask;
        self.generated_version.store(version, Ordering::Release);
        let (ready, waiting): (Vec<_>, Vec<_>) =
            waiters.drain(..).partition(|(wanted, _)| *wanted <= version);
        *waiters = waiting;
        ready.into_iter().map(|(_, done)| done).collect()
    }
}

/// Builds the fog-of-war mask off the render thread.
///
/// Every parameter change bumps a version number. The mask is dirty while its
/// generated version lags the parameter version. Generation requests for a
/// version that is superseded before its job starts are skipped; their
/// callbacks are answered by the newer mask.
pub struct FogGenerator {
    width: u32,
    height: u32,
    color: [u8; 4],
    params: FogParams,
    params_version: u64,
    /// Last version handed to the worker, so a version is built once.
    submitted_version: u64,
    shared: Arc<Shared>,
    jobs: Option<Sender<Job>>,
    worker: Option<JoinHandle<()>>,
}

impl FogGenerator {
    /// Create a generator for a `width` x `height` viewport with fog `color`.
    ///
    /// Starts disabled with a transparent, up-to-date mask.
    pub fn new(width: u32, height: u32, color: [u8; 4]) -> Result<Self, FogError> {
        let blank = blank_mask(width, height)?;
        let shared = Arc::new(Shared {
            mask: Mutex::new(Arc::new(blank)),
            generated_version: AtomicU64::new(0),
            latest_requested: AtomicU64::new(0),
            waiters: Mutex::new(Vec::new()),
            size: Mutex::new((width, height)),
        });

        let (jobs, receiver) = crossbeam_channel::unbounded::<Job>();
        let worker_shared = Arc::clone(&shared);
        let worker = std::thread::Builder::new()
            .name(WORKER_NAME.into())
            .spawn(move || run_worker(&receiver, &worker_shared))
            .map_err(FogError::Spawn)?;

        Ok(Self {
            width,
            height,
            color,
            params: FogParams::default(),
            params_version: 0,
            submitted_version: 0,
            shared,
            jobs: Some(jobs),
            worker: Some(worker),
        })
    }

    /// Store new parameters. Returns true, and makes the mask dirty, only if
    /// they differ from the previous ones.
    pub fn update_params(
        &mut self,
        enabled: bool,
        reveal_radius: f32,
        discovered_areas: &[Vec2],
    ) -> bool {
        let changed = self.params.enabled != enabled
            || self.params.reveal_radius.to_bits() != reveal_radius.to_bits()
            || !same_points(&self.params.discovered_areas, discovered_areas);
        if changed {
            self.params = FogParams {
                enabled,
                reveal_radius,
                discovered_areas: discovered_areas.to_vec(),
            };
            self.params_version += 1;
        }
        changed
    }

    /// Returns true if the current mask was built from older parameters.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.shared.generated_version.load(Ordering::Acquire) != self.params_version
    }

    #[must_use]
    pub fn params(&self) -> &FogParams {
        &self.params
    }

    #[must_use]
    pub fn params_version(&self) -> u64 {
        self.params_version
    }

    #[must_use]
    pub fn generated_version(&self) -> u64 {
        self.shared.generated_version.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// The most recently generated mask.
    #[must_use]
    pub fn mask(&self) -> Arc<Pixmap> {
        Arc::clone(&self.shared.mask.lock())
    }

    /// Bring the mask up to date and call `on_complete` with it.
    ///
    /// When the mask is clean the callback runs inline on the caller's thread.
    /// Otherwise it runs on the `fog-mask` thread once a mask at least as new
    /// as the current parameters has been built.
    pub fn generate_async(&mut self, on_complete: impl FnOnce(Arc<Pixmap>) + Send + 'static) {
        let version = self.params_version;
        {
            let mut waiters = self.shared.waiters.lock();
            // Checked under the waiter lock so a concurrent publish cannot
            // miss this callback.
            if self.shared.generated_version.load(Ordering::Acquire) >= version {
                drop(waiters);
                on_complete(self.mask());
                return;
            }
            waiters.push((version, Box::new(on_complete)));
        }
        self.submit(version);
    }

    /// Hand `version` of the parameters to the worker unless already done.
    fn submit(&mut self, version: u64) {
        if self.submitted_version == version {
            return;
        }
        self.submitted_version = version;
        self.shared.latest_requested.store(version, Ordering::Release);

        let job = Job {
            version,
            width: self.width,
            height: self.height,
            color: self.color,
            params: self.params.clone(),
        };
        let rejected = match &self.jobs {
            Some(jobs) => jobs.send(job).err().map(|e| e.into_inner()),
            None => Some(job),
        };
        if let Some(job) = rejected {
            warn!("fog worker unavailable, generating on the caller's thread");
            run_job(&self.shared, job);
        }
    }

    /// Bring the mask up to date and block until it is.
    pub fn generate_blocking(&mut self) -> Arc<Pixmap> {
        let (tx, rx) = crossbeam_channel::bounded(1);
        self.generate_async(move |mask| {
            let _ = tx.send(mask);
        });
        rx.recv().unwrap_or_else(|_| self.mask())
    }

    /// Composite the current mask over `target`. Does nothing while fog is
    /// disabled and never triggers generation.
    pub fn render<S: Surface + ?Sized>(&self, target: &mut S) {
        if !self.params.enabled {
            return;
        }
        let mask = self.mask();
        target.draw_bitmap(0, 0, &mask);
    }

    /// Reallocate the mask for a new viewport size and mark it dirty.
    ///
    /// Masks still being built for the old size are discarded. Callbacks
    /// waiting on them are answered by a rebuild at the new size.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), FogError> {
        let blank = blank_mask(width, height)?;
        self.width = width;
        self.height = height;
        self.params_version += 1;
        let has_waiters = {
            let waiters = self.shared.waiters.lock();
            *self.shared.size.lock() = (width, height);
            *self.shared.mask.lock() = Arc::new(blank);
            self.shared
                .latest_requested
                .store(self.params_version, Ordering::Release);
            !waiters.is_empty()
        };
        if has_waiters {
            self.submit(self.params_version);
        }
        debug!(width, height, "fog mask resized");
        Ok(())
    }
}

impl Drop for FogGenerator {
    fn drop(&mut self) {
        self.jobs.take();
        if let Some(worker) = self.worker.take()
            && worker.join().is_err()
        {
            warn!("fog worker panicked");
        }
        debug!("fog generator shut down");
    }
}

/// Element-wise comparison by bit pattern, so NaN equals itself.
fn same_points(a: &[Vec2], b: &[Vec2]) -> bool {
    a.len() == b.len()
        && a.iter().zip(b).all(|(p, q)| {
            p.x.to_bits() == q.x.to_bits() && p.y.to_bits() == q.y.to_bits()
        })
}

fn blank_mask(width: u32, height: u32) -> Result<Pixmap, FogError> {
    Pixmap::new(width, height).ok_or(FogError::InvalidSize { width, height })
}

fn run_worker(receiver: &Receiver<Job>, shared: &Shared) {
    while let Ok(job) = receiver.recv() {
        if job.version < shared.latest_requested.load(Ordering::Acquire) {
            trace!(version = job.version, "skipping superseded fog job");
            continue;
        }
        run_job(shared, job);
    }
}

fn run_job(shared: &Shared, job: Job) {
    let started = Instant::now();
    let Some(mask) = build_mask(
        job.width,
        job.height,
        job.color,
        job.params.enabled,
        job.params.reveal_radius,
        &job.params.discovered_areas,
    ) else {
        return;
    };
    let mask = Arc::new(mask);
    let ready = shared.publish(job.version, Arc::clone(&mask));
    trace!(
        version = job.version,
        elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
        points = job.params.discovered_areas.len(),
        "fog mask generated"
    );
    for done in ready {
        done(Arc::clone(&mask));
    }
}
