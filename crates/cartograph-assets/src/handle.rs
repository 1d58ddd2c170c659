//! Completion handles returned by the loader.

use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError};

/// Observed state of a load.
#[derive(Debug)]
pub enum LoadState<T: ?Sized> {
    /// The worker has not finished yet.
    Pending,
    Loaded(Arc<T>),
    /// The load failed or the loader was disposed; the failure was logged.
    Failed,
}

impl<T: ?Sized> Clone for LoadState<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Pending => Self::Pending,
            Self::Loaded(v) => Self::Loaded(Arc::clone(v)),
            Self::Failed => Self::Failed,
        }
    }
}

impl<T: ?Sized> LoadState<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// The loaded value, if any.
    pub fn loaded(&self) -> Option<Arc<T>> {
        match self {
            Self::Loaded(v) => Some(Arc::clone(v)),
            _ => None,
        }
    }
}

/// One-shot handle to a pending or finished load.
///
/// Poll with [`try_get`](Self::try_get) once per frame, or block with
/// [`wait`](Self::wait). Dropping the handle does not cancel the load; the
/// value still lands in the cache.
pub struct LoadHandle<T: ?Sized> {
    receiver: Receiver<Option<Arc<T>>>,
    resolved: Option<Option<Arc<T>>>,
}

impl<T: ?Sized> LoadHandle<T> {
    pub(crate) fn new(receiver: Receiver<Option<Arc<T>>>) -> Self {
        Self {
            receiver,
            resolved: None,
        }
    }

    fn state(&self) -> LoadState<T> {
        match &self.resolved {
            None => LoadState::Pending,
            Some(Some(v)) => LoadState::Loaded(Arc::clone(v)),
            Some(None) => LoadState::Failed,
        }
    }

    /// Non-blocking poll.
    pub fn try_get(&mut self) -> LoadState<T> {
        if self.resolved.is_none() {
            match self.receiver.try_recv() {
                Ok(value) => self.resolved = Some(value),
                // The sender vanished without answering: treat as a failed load.
                Err(TryRecvError::Disconnected) => self.resolved = Some(None),
                Err(TryRecvError::Empty) => {}
            }
        }
        self.state()
    }

    /// Returns true once the load has finished, successfully or not.
    pub fn is_ready(&mut self) -> bool {
        !self.try_get().is_pending()
    }

    /// Block until the load finishes. `None` means the load failed.
    pub fn wait(mut self) -> Option<Arc<T>> {
        if let Some(value) = self.resolved.take() {
            return value;
        }
        self.receiver.recv().ok().flatten()
    }

    /// Block for at most `timeout`.
    pub fn wait_timeout(&mut self, timeout: Duration) -> LoadState<T> {
        if self.resolved.is_none() {
            match self.receiver.recv_timeout(timeout) {
                Ok(value) => self.resolved = Some(value),
                Err(RecvTimeoutError::Disconnected) => self.resolved = Some(None),
                Err(RecvTimeoutError::Timeout) => {}
            }
        }
        self.state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_until_sent() {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let mut handle = LoadHandle::<u32>::new(rx);
        assert!(handle.try_get().is_pending());
        tx.send(Some(Arc::new(7))).unwrap();
        assert_eq!(*handle.try_get().loaded().unwrap(), 7);
        // Resolved values are remembered across polls.
        assert!(handle.is_ready());
        assert_eq!(handle.wait().as_deref(), Some(&7));
    }

    /// A dropped sender resolves the handle as failed instead of hanging.
    #[test]
    fn test_disconnected_sender_is_failure() {
        let (tx, rx) = crossbeam_channel::bounded::<Option<Arc<u32>>>(1);
        let mut handle = LoadHandle::new(rx);
        drop(tx);
        assert!(matches!(
            handle.wait_timeout(Duration::from_secs(1)),
            LoadState::Failed
        ));
    }
}
