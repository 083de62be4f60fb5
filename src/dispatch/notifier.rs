//! Dispatcher worker thread.
//!
//! Rendered messages are queued on a bounded channel and delivered by one
//! worker, so delivery order per channel matches enqueue order. Enqueue never
//! blocks the caller: a full or closed queue drops the message and counts it.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use log::{debug, warn};

use crate::error::{WatchError, WatchResult};

use super::sink::{Sinks, Target};

#[allow(missing_docs)]
#[derive(Debug, Clone)]
pub struct NotifierConfig {
    /// Max queued messages before new ones are dropped.
    pub queue_capacity: usize,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self { queue_capacity: 1024 }
    }
}

#[derive(Debug)]
enum Job {
    Deliver { target: Target, text: String },
    Flush { reply: Sender<()> },
    Shutdown,
}

/// Owns the delivery worker.
#[derive(Debug)]
pub struct Notifier {
    tx: Sender<Job>,
    closed: AtomicBool,
    dropped: AtomicU64,
    delivered: Arc<AtomicU64>,
    failed: Arc<AtomicU64>,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl Notifier {
    /// Spawns the worker that delivers through `sinks`.
    pub fn new(cfg: &NotifierConfig, sinks: Sinks) -> WatchResult<Self> {
        let (tx, rx) = bounded::<Job>(cfg.queue_capacity.max(1));
        let delivered = Arc::new(AtomicU64::new(0));
        let failed = Arc::new(AtomicU64::new(0));

        let thread_delivered = Arc::clone(&delivered);
        let thread_failed = Arc::clone(&failed);
        let join = thread::Builder::new()
            .name("trainwatch-dispatch".to_string())
            .spawn(move || worker_loop(&sinks, &rx, &thread_delivered, &thread_failed))
            .map_err(|e| WatchError::internal(format!("failed to spawn dispatcher worker: {e}")))?;

        Ok(Self {
            tx,
            closed: AtomicBool::new(false),
            dropped: AtomicU64::new(0),
            delivered,
            failed,
            join: Mutex::new(Some(join)),
        })
    }

    /// Non-blocking enqueue. Returns false if the message was dropped.
    pub fn enqueue(&self, target: Target, text: String) -> bool {
        if self.is_closed() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        match self.tx.try_send(Job::Deliver { target, text }) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                debug!("dispatch queue rejected a message for {target}");
                false
            }
        }
    }

    /// Waits until everything queued before this call has been handled.
    pub fn flush(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let (reply_tx, reply_rx) = bounded::<()>(1);
        if self.tx.send_timeout(Job::Flush { reply: reply_tx }, timeout).is_err() {
            return false;
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        reply_rx.recv_timeout(remaining).is_ok()
    }

    /// Stops accepting messages, drains the queue and joins the worker.
    pub fn shutdown(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if self.tx.send(Job::Shutdown).is_err() {
            return;
        }
        let handle = self.join.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                warn!("dispatcher worker panicked");
            }
        }
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    /// Messages a sink refused or had no sink at all.
    #[must_use]
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }
}

impl Drop for Notifier {
    fn drop(&mut self) {
        // Detach rather than join: the worker exits on Shutdown or once the
        // sender is gone, and a slow sink must not stall the dropping thread.
        self.closed.store(true, Ordering::Release);
        let _ = self.tx.try_send(Job::Shutdown);
        if let Some(handle) = self.join.lock().unwrap_or_else(PoisonError::into_inner).take() {
            drop(handle);
        }
    }
}

fn worker_loop(sinks: &Sinks, rx: &Receiver<Job>, delivered: &AtomicU64, failed: &AtomicU64) {
    while let Ok(job) = rx.recv() {
        match job {
            Job::Deliver { target, text } => {
                let Some(sink) = sinks.for_target(target) else {
                    failed.fetch_add(1, Ordering::Relaxed);
                    debug!("no sink for {target}; message skipped");
                    continue;
                };
                match sink.send(target, &text) {
                    Ok(()) => {
                        delivered.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(e) => {
                        failed.fetch_add(1, Ordering::Relaxed);
                        debug!("delivery to {target} failed: {e}");
                    }
                }
            }
            Job::Flush { reply } => {
                let _ = reply.send(());
            }
            Job::Shutdown => break,
        }
    }
}
