//! Fixed-size worker pool fed through an unbounded channel.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, warn};

use crate::AssetError;
use crate::cache::panic_message;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// A fixed number of named worker threads draining one job queue.
///
/// The pool never grows and applies no backpressure: extra jobs wait in the
/// queue. Started jobs cannot be cancelled; jobs that care check their own
/// flags before doing expensive work.
pub struct WorkerPool {
    name: String,
    /// Dropped on [`close`](Self::close) so workers exit once the queue drains.
    job_sender: Option<Sender<Job>>,
    worker_handles: Vec<JoinHandle<()>>,
    /// Jobs queued or running.
    in_flight: Arc<AtomicUsize>,
}

impl WorkerPool {
    /// Spawn `worker_count` threads named `{name}-{index}`.
    pub fn new(name: &str, worker_count: usize) -> Result<Self, AssetError> {
        let (job_tx, job_rx) = crossbeam_channel::unbounded::<Job>();
        let in_flight = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::with_capacity(worker_count);
        for index in 0..worker_count {
            let rx: Receiver<Job> = job_rx.clone();
            let flight = Arc::clone(&in_flight);
            let handle = std::thread::Builder::new()
                .name(format!("{name}-{index}"))
                .spawn(move || {
                    while let Ok(job) = rx.recv() {
                        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
                            warn!(panic = %panic_message(payload.as_ref()), "worker job panicked");
                        }
                        flight.fetch_sub(1, Ordering::Relaxed);
                    }
                })
                .map_err(AssetError::Spawn)?;
            handles.push(handle);
        }

        Ok(Self {
            name: name.to_string(),
            job_sender: Some(job_tx),
            worker_handles: handles,
            in_flight,
        })
    }

    /// Queue a job. Returns `false` once the pool has been closed.
    pub fn submit(&self, job: impl FnOnce() + Send + 'static) -> bool {
        let Some(sender) = &self.job_sender else {
            return false;
        };
        self.in_flight.fetch_add(1, Ordering::Relaxed);
        if sender.send(Box::new(job)).is_err() {
            self.in_flight.fetch_sub(1, Ordering::Relaxed);
            return false;
        }
        true
    }

    /// Jobs queued or currently running.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.load(Ordering::Relaxed)
    }

    pub fn worker_count(&self) -> usize {
        self.worker_handles.len()
    }

    pub fn is_closed(&self) -> bool {
        self.job_sender.is_none()
    }

    /// Stop accepting jobs. Already-queued jobs still run.
    pub fn close(&mut self) {
        if self.job_sender.take().is_some() {
            debug!(pool = %self.name, "worker pool closed");
        }
    }

    /// Close the pool and join every worker.
    ///
    /// Blocks until queued jobs finish; a job that never returns blocks forever.
    pub fn shutdown(&mut self) {
        self.close();
        for handle in self.worker_handles.drain(..) {
            let _ = handle.join();
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}
