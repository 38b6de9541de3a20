//! Cooperative cancellation token.
//!
//! A [`CancellationToken`] is shared across an entire multi-step operation
//! (submit, poll loop, pagination); canceling it aborts whichever step is
//! pending and surfaces a single [`MailCheckError::Canceled`] to the
//! original caller. Cancellation is cooperative only: no thread is ever
//! interrupted.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use mailcheck_domain::{MailCheckError, Result};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken as Signal;

type Callback = Box<dyn FnOnce() + Send>;

/// Handle returned by [`CancellationToken::register`]; pass it back to
/// [`CancellationToken::unregister`] to remove the callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registration(u64);

/// Registration id handed out when the token was already canceled and the
/// callback therefore ran synchronously. Unregistering it is a no-op.
const SPENT: Registration = Registration(0);

#[derive(Default)]
struct Inner {
    canceled: AtomicBool,
    signal: Signal,
    callbacks: Mutex<Vec<(u64, Callback)>>,
    next_id: AtomicU64,
}

/// Clonable cancellation token; every clone observes the same state.
#[derive(Clone, Default)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether [`cancel`](Self::cancel) has been called. Once true, stays
    /// true forever.
    pub fn is_canceled(&self) -> bool {
        self.inner.canceled.load(Ordering::SeqCst)
    }

    /// Cancel the token. The first call sets the flag and invokes every
    /// registered callback exactly once, in registration order; repeated
    /// calls have no further effect.
    pub fn cancel(&self) {
        let drained = {
            let mut callbacks = self.inner.callbacks.lock();
            if self.inner.canceled.swap(true, Ordering::SeqCst) {
                Vec::new()
            } else {
                std::mem::take(&mut *callbacks)
            }
        };
        self.inner.signal.cancel();
        for (_, callback) in drained {
            callback();
        }
    }

    /// Register a callback to run on cancellation. When the token is
    /// already canceled, the callback runs synchronously before this
    /// method returns.
    pub fn register(&self, callback: impl FnOnce() + Send + 'static) -> Registration {
        let mut callbacks = self.inner.callbacks.lock();
        if self.inner.canceled.load(Ordering::SeqCst) {
            drop(callbacks);
            callback();
            return SPENT;
        }
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        callbacks.push((id, Box::new(callback)));
        Registration(id)
    }

    /// Remove a previously registered callback; no-op when it already ran
    /// or was removed.
    pub fn unregister(&self, registration: Registration) {
        self.inner.callbacks.lock().retain(|(id, _)| *id != registration.0);
    }

    /// Fail with [`MailCheckError::Canceled`] when the token is canceled.
    pub fn ensure_not_canceled(&self) -> Result<()> {
        if self.is_canceled() {
            Err(MailCheckError::Canceled)
        } else {
            Ok(())
        }
    }

    /// Resolves once the token is canceled; used to race pending waits and
    /// in-flight transport calls inside `tokio::select!`.
    pub async fn cancelled(&self) {
        self.inner.signal.cancelled().await;
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken").field("canceled", &self.is_canceled()).finish()
    }
}
