//! Per-stream exclusivity with cancellable asynchronous acquisition.

use core::pin::pin;

use async_lock::{Mutex, MutexGuard};
use futures::future::{Either, select};
use tokio_util::sync::CancellationToken;

use crate::{domain::StreamError, log_macros::debug};

/// Guards a stream's state.
///
/// Synchronized instances serialize every caller: the synchronous API blocks
/// the calling thread, the asynchronous API waits without blocking. An
/// unsynchronized instance never waits; overlapping use is reported as
/// [`StreamError::Contended`].
pub(crate) struct Exclusive<T> {
    inner: Mutex<T>,
    synchronized: bool,
}

impl<T> Exclusive<T> {
    pub(crate) fn new(value: T, synchronized: bool) -> Self {
        Self {
            inner: Mutex::new(value),
            synchronized,
        }
    }

    /// Acquire from synchronous code.
    pub(crate) fn lock(&self) -> Result<MutexGuard<'_, T>, StreamError> {
        if self.synchronized {
            Ok(self.inner.lock_blocking())
        } else {
            self.inner.try_lock().ok_or(StreamError::Contended)
        }
    }

    /// Acquire from asynchronous code.
    ///
    /// A token that is already cancelled fails before the lock is touched.
    /// Cancelling while waiting abandons only this waiter.
    pub(crate) async fn lock_async(
        &self,
        cancel: &CancellationToken,
    ) -> Result<MutexGuard<'_, T>, StreamError> {
        if cancel.is_cancelled() {
            return Err(StreamError::Cancelled);
        }
        if !self.synchronized {
            return self.inner.try_lock().ok_or(StreamError::Contended);
        }
        if let Some(guard) = self.inner.try_lock() {
            return Ok(guard);
        }

        let acquire = pin!(self.inner.lock());
        let cancelled = pin!(cancel.cancelled());
        match select(acquire, cancelled).await {
            Either::Left((guard, _)) => Ok(guard),
            Either::Right(((), _)) => {
                debug!("lock wait cancelled");
                Err(StreamError::Cancelled)
            }
        }
    }
}
