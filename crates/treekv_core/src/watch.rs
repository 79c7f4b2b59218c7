//! Watch subscriptions and the forwarding loop behind them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;
use treekv_engine::EngineEntry;

use crate::keys::KeyCodec;
use crate::types::Entry;

/// How often a blocked forwarding loop re-checks for cancellation.
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// A live, cancellable stream of change notifications.
///
/// Produced by [`crate::Store::watch`] (items are [`Entry`]) and
/// [`crate::Store::watch_tree`] (items are single-element `Vec<Entry>`
/// batches). Items arrive in the order the engine delivered them. The
/// stream is lazy and non-restartable: once cancelled, or once the engine
/// subscription closes, it yields `None` forever.
///
/// Dropping the handle cancels the subscription, which stops the
/// forwarding thread and releases the underlying engine watcher.
pub struct Watch<T> {
    rx: Receiver<T>,
    cancelled: Arc<AtomicBool>,
}

impl<T> Watch<T> {
    /// Blocks until the next notification, or `None` once the stream is
    /// cancelled or closed.
    pub fn recv(&self) -> Option<T> {
        self.rx.recv().ok()
    }

    /// Like [`Watch::recv`] with an upper bound on the wait.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<T> {
        self.rx.recv_timeout(timeout).ok()
    }

    /// Returns a pending notification without blocking.
    pub fn try_recv(&self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    /// Iterates over notifications until the stream is cancelled or
    /// closed.
    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        self.rx.iter()
    }

    /// Cancels the subscription.
    ///
    /// The forwarding thread stops and drops its engine subscription; the
    /// engine prunes the watcher on its next delivery attempt. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

impl<T> Drop for Watch<T> {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Spawns the forwarding thread bridging an engine subscription into a
/// [`Watch`] stream.
///
/// Updates arriving within `replay_window` of the subscription are drained
/// and discarded as the engine's historical replay; everything after is
/// decoded and mapped into the output stream. Delivery is rendezvous-style:
/// a slow consumer stalls the loop, which in turn stops draining the engine
/// subscription.
pub(crate) fn forward<T, F>(
    updates: Receiver<EngineEntry>,
    codec: KeyCodec,
    replay_window: Duration,
    map: F,
) -> Watch<T>
where
    T: Send + 'static,
    F: Fn(Entry) -> T + Send + 'static,
{
    let (tx, rx) = mpsc::sync_channel(0);
    let cancelled = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancelled);
    thread::spawn(move || run_forwarder(updates, codec, replay_window, map, &flag, &tx));
    Watch { rx, cancelled }
}

fn run_forwarder<T, F>(
    updates: Receiver<EngineEntry>,
    codec: KeyCodec,
    replay_window: Duration,
    map: F,
    cancelled: &AtomicBool,
    tx: &SyncSender<T>,
) where
    F: Fn(Entry) -> T,
{
    if !discard_replay(&updates, replay_window, cancelled) {
        return;
    }
    loop {
        if cancelled.load(Ordering::SeqCst) {
            debug!("watch cancelled, stopping forwarder");
            return;
        }
        match updates.recv_timeout(CANCEL_POLL_INTERVAL) {
            Ok(update) => {
                let entry = Entry {
                    key: codec.decode(&update.key),
                    value: update.value,
                    revision: update.revision,
                };
                // A send fails only when the watch handle is gone.
                if tx.send(map(entry)).is_err() {
                    return;
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                debug!("engine subscription closed, stopping forwarder");
                return;
            }
        }
    }
}

/// Drains updates for the duration of the replay window.
///
/// Returns false if the loop should exit (cancellation or a closed engine
/// subscription) instead of entering the live phase.
fn discard_replay(
    updates: &Receiver<EngineEntry>,
    replay_window: Duration,
    cancelled: &AtomicBool,
) -> bool {
    let deadline = Instant::now() + replay_window;
    loop {
        if cancelled.load(Ordering::SeqCst) {
            return false;
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return true;
        }
        match updates.recv_timeout(remaining.min(CANCEL_POLL_INTERVAL)) {
            Ok(_) | Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => return false,
        }
    }
}
