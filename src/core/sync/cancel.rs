/*!
 * Cancellation Token
 *
 * One-way, cloneable cancellation signal for blocking source reads.
 *
 * # Design
 *
 * The token owns the only sender of a flume channel that never carries a
 * message. Cancelling drops that sender, which disconnects every receiver at
 * once. A blocked thread can therefore race "cancelled" against any other
 * flume channel with a `Selector`, with no polling.
 */

use crate::core::limits::CANCEL_TIMER_THREAD_NAME;
use parking_lot::Mutex;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::debug;

struct Inner {
    cancelled: AtomicBool,
    trigger: Mutex<Option<flume::Sender<()>>>,
    signal: flume::Receiver<()>,
}

/// Cooperative cancellation handle
///
/// # Example
///
/// ```ignore
/// let token = CancellationToken::new();
/// token.cancel_after(Duration::from_secs(1))?;
/// while writer.fill_from_source(&mut source, &token)? {}
/// writer.signal_completion();
/// ```
#[derive(Clone)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

impl CancellationToken {
    pub fn new() -> Self {
        let (trigger, signal) = flume::bounded(0);
        Self {
            inner: Arc::new(Inner {
                cancelled: AtomicBool::new(false),
                trigger: Mutex::new(Some(trigger)),
                signal,
            }),
        }
    }

    /// Request cancellation and wake every waiter. Idempotent.
    pub fn cancel(&self) {
        if self.inner.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }
        self.inner.trigger.lock().take();
        debug!("Cancellation requested");
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Cancel from a timer thread once `delay` elapses
    pub fn cancel_after(&self, delay: Duration) -> io::Result<thread::JoinHandle<()>> {
        let token = self.clone();
        thread::Builder::new()
            .name(CANCEL_TIMER_THREAD_NAME.to_string())
            .spawn(move || {
                thread::sleep(delay);
                token.cancel();
            })
    }

    /// Block until cancelled or `timeout` expires
    ///
    /// Returns true if the token is cancelled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        if self.is_cancelled() {
            return true;
        }
        match self.inner.signal.recv_timeout(timeout) {
            Err(flume::RecvTimeoutError::Disconnected) => true,
            _ => self.is_cancelled(),
        }
    }

    /// Receiver that disconnects when the token is cancelled
    ///
    /// Only useful as an arm of a `flume::Selector`; it never yields a value.
    pub(crate) fn signal(&self) -> &flume::Receiver<()> {
        &self.inner.signal
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
