//! Background cache writes.
//!
//! A response is returned to the caller as soon as the network delivers it;
//! storing the clone happens on a spawned task tracked here.

use std::future::Future;
use std::sync::{Mutex, PoisonError};

use tokio::task::JoinSet;

#[derive(Default)]
pub(crate) struct BackgroundWrites {
    tasks: Mutex<JoinSet<()>>,
}

impl BackgroundWrites {
    /// Spawn a write without waiting for it. Finished writes are reaped on
    /// the way in.
    pub(crate) fn spawn<F>(&self, write: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        while tasks.try_join_next().is_some() {}
        tasks.spawn(write);
    }

    /// Wait for every write spawned so far.
    pub(crate) async fn flush(&self) {
        let mut pending = std::mem::take(&mut *self.tasks.lock().unwrap_or_else(PoisonError::into_inner));
        while let Some(result) = pending.join_next().await {
            if let Err(e) = result {
                tracing::warn!(error = %e, "background cache write did not complete");
            }
        }
    }

    pub(crate) fn pending(&self) -> usize {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}
