//! Render scheduler: bounded concurrency and latest-wins sequencing.
//!
//! Every request carries a sequence number drawn from a monotonically
//! increasing counter. A render whose sequence is older than the newest one
//! handed out is stale; its result is dropped instead of delivered. Staleness
//! is checked before the render starts and again after it finishes, so a
//! slow render for an old request can never overwrite a newer one.

use crossbeam_channel::RecvTimeoutError;
use lazycut_core::{CancelToken, LazycutError, QualityPreset, RationalTime, Result, TextFrame};
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// How long a waiter sleeps on the slot condvar before rechecking its token.
const SLOT_POLL: Duration = Duration::from_millis(10);

/// A render job description. `sequence` comes from
/// [`RenderScheduler::next_sequence`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderRequest {
    pub position: RationalTime,
    pub width: u32,
    pub height: u32,
    pub quality: QualityPreset,
    pub sequence: u64,
}

struct Slots {
    active: Mutex<usize>,
    freed: Condvar,
    max: usize,
}

struct SchedulerShared {
    latest: AtomicU64,
    slots: Slots,
    pending: Mutex<Option<CancelToken>>,
}

/// Releases a render slot on drop.
struct SlotGuard(Arc<SchedulerShared>);

impl Drop for SlotGuard {
    fn drop(&mut self) {
        let slots = &self.0.slots;
        let mut active = slots.active.lock();
        *active = active.saturating_sub(1);
        slots.freed.notify_all();
    }
}

impl SchedulerShared {
    /// Block until a slot frees up, or give up once `token` is cancelled.
    fn acquire(self: &Arc<Self>, token: &CancelToken) -> Option<SlotGuard> {
        let mut active = self.slots.active.lock();
        while *active >= self.slots.max {
            if token.is_cancelled() {
                return None;
            }
            self.slots.freed.wait_for(&mut active, SLOT_POLL);
        }
        *active += 1;
        Some(SlotGuard(Arc::clone(self)))
    }

    fn is_stale(&self, sequence: u64) -> bool {
        sequence < self.latest.load(Ordering::Acquire)
    }
}

/// Runs still renders on worker threads, at most `max_concurrent` at a time.
pub struct RenderScheduler {
    shared: Arc<SchedulerShared>,
    timeout: Duration,
}

impl RenderScheduler {
    pub fn new(max_concurrent: usize, timeout: Duration) -> Self {
        Self {
            shared: Arc::new(SchedulerShared {
                latest: AtomicU64::new(0),
                slots: Slots {
                    active: Mutex::new(0),
                    freed: Condvar::new(),
                    max: max_concurrent.max(1),
                },
                pending: Mutex::new(None),
            }),
            timeout,
        }
    }

    /// Hand out the next sequence number. Everything issued earlier becomes
    /// stale.
    pub fn next_sequence(&self) -> u64 {
        self.shared.latest.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// True if a newer sequence has been handed out.
    pub fn is_stale(&self, sequence: u64) -> bool {
        self.shared.is_stale(sequence)
    }

    /// Renders currently holding a slot.
    pub fn active_count(&self) -> usize {
        *self.shared.slots.active.lock()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Schedule `render` and deliver its result to `on_result`, unless the
    /// request goes stale, is cancelled by a later submission, or runs past
    /// the timeout. Returns immediately.
    pub fn submit<F, C>(&self, request: RenderRequest, render: F, on_result: C)
    where
        F: FnOnce(&CancelToken) -> Result<TextFrame> + Send + 'static,
        C: FnOnce(Result<TextFrame>) + Send + 'static,
    {
        self.dispatch(request, render, on_result);
    }

    fn dispatch<F, C>(&self, request: RenderRequest, render: F, on_result: C) -> CancelToken
    where
        F: FnOnce(&CancelToken) -> Result<TextFrame> + Send + 'static,
        C: FnOnce(Result<TextFrame>) + Send + 'static,
    {
        let token = CancelToken::with_timeout(self.timeout);
        if let Some(previous) = self.shared.pending.lock().replace(token.clone()) {
            previous.cancel();
        }

        let shared = Arc::clone(&self.shared);
        let worker_token = token.clone();
        let spawned = thread::Builder::new()
            .name(format!("lazycut-render-{}", request.sequence))
            .spawn(move || {
                let token = worker_token;
                let Some(_slot) = shared.acquire(&token) else {
                    trace!(sequence = request.sequence, "Render abandoned waiting for a slot");
                    return;
                };
                if shared.is_stale(request.sequence) {
                    trace!(sequence = request.sequence, "Skipping stale render");
                    return;
                }

                let result = render(&token);

                if shared.is_stale(request.sequence) || token.is_cancelled() {
                    debug!(
                        sequence = request.sequence,
                        timed_out = token.timed_out(),
                        "Discarding render result"
                    );
                    return;
                }
                on_result(result);
            });

        if let Err(e) = spawned {
            warn!("Failed to spawn render thread: {e}");
        }
        token
    }

    /// Submit and block for the result.
    ///
    /// Fails with [`LazycutError::Timeout`] when the deadline passes and with
    /// [`LazycutError::Superseded`] when a newer request wins.
    pub fn submit_sync<F>(&self, request: RenderRequest, render: F) -> Result<TextFrame>
    where
        F: FnOnce(&CancelToken) -> Result<TextFrame> + Send + 'static,
    {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let token = self.dispatch(request, render, move |result| {
            let _ = tx.send(result);
        });

        match rx.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                token.cancel();
                Err(LazycutError::Timeout(self.timeout))
            }
            Err(RecvTimeoutError::Disconnected) if token.timed_out() => {
                Err(LazycutError::Timeout(self.timeout))
            }
            Err(RecvTimeoutError::Disconnected) => Err(LazycutError::Superseded),
        }
    }

    /// Cancel the most recent in-flight request.
    pub fn cancel_all(&self) {
        if let Some(token) = self.shared.pending.lock().take() {
            token.cancel();
        }
    }
}

impl Drop for RenderScheduler {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
