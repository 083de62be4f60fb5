//! Monitor service and its threads.
//!
//! `Monitor` owns the state store, the simulation clock and the sweeper
//! bookkeeping behind one mutex. Snapshot handling and the periodic sweep both
//! take that lock for their whole update, including publishing the resulting
//! events, so notices reach each channel in the order the state changed.
//!
//! `Watcher` drives a `Monitor` from a `TelemetrySource`: one pump thread pulls
//! telemetry events and one sweeper thread ticks once per second.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, select, tick, Sender};
use log::{debug, info, warn};

use crate::config::WatchConfig;
use crate::dispatch::{Dispatcher, NotifierConfig, RadioLink, Sinks};
use crate::error::{TelemetryError, WatchError, WatchResult};
use crate::monitor::{self, MonitorEvent, Sweeper};
use crate::state::StateStore;
use crate::telemetry::{TelemetryEvent, TelemetrySource, TrainSnapshot};
use crate::time::SimClock;

#[derive(Debug)]
struct CoreState {
    store: StateStore,
    clock: SimClock,
    sweeper: Sweeper,
}

/// The monitor service: detection plus dispatch.
#[derive(Debug)]
pub struct Monitor {
    cfg: Arc<WatchConfig>,
    core: Mutex<CoreState>,
    dispatcher: Dispatcher,
}

impl Monitor {
    /// Builds a monitor and starts its dispatcher worker.
    pub fn new(
        cfg: WatchConfig,
        sinks: Sinks,
        radio: Option<Arc<dyn RadioLink>>,
        notifier_cfg: &NotifierConfig,
    ) -> WatchResult<Self> {
        let cfg = Arc::new(cfg);
        let dispatcher = Dispatcher::new(Arc::clone(&cfg), sinks, radio, notifier_cfg)?;
        let core = CoreState {
            store: StateStore::new(),
            clock: SimClock::new(),
            sweeper: Sweeper::new(cfg.periodic_announce_interval),
        };
        Ok(Self {
            cfg,
            core: Mutex::new(core),
            dispatcher,
        })
    }

    #[must_use]
    pub fn config(&self) -> &WatchConfig {
        &self.cfg
    }

    #[must_use]
    pub const fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    fn lock(&self) -> MutexGuard<'_, CoreState> {
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Handles one event from a telemetry source.
    pub fn handle_event(&self, event: TelemetryEvent) {
        match event {
            TelemetryEvent::Connected => {
                self.dispatcher.radio().set_connected(true);
                info!("connected to simulator");
            }
            TelemetryEvent::Disconnected => {
                self.dispatcher.radio().set_connected(false);
                warn!("disconnected from simulator");
            }
            TelemetryEvent::Permission(true) => info!("simulator granted telemetry permission"),
            TelemetryEvent::Permission(false) => warn!("simulator denied telemetry permission"),
            TelemetryEvent::SimulationTick(at) => {
                let mut core = self.lock();
                if core.clock.observe(at) {
                    let trains = core.store.rebase_timers(at);
                    if trains > 0 {
                        info!("simulation clock re-based to {at}; restarted timers for {trains} trains");
                    }
                }
            }
            TelemetryEvent::TrainData(snap) => {
                self.handle_snapshot(&snap);
            }
        }
    }

    /// Applies one train snapshot and publishes what it caused.
    pub fn handle_snapshot(&self, snap: &TrainSnapshot) -> Vec<MonitorEvent> {
        let mut core = self.lock();
        core.sweeper.note_snapshot(Instant::now());
        let now = core.clock.now();
        let events = monitor::apply_snapshot(&mut core.store, &self.cfg, snap, now);
        if self.cfg.verbose_logging {
            for ev in &events {
                debug!("train {:?}: {}", ev.train().map(|t| t.train_id), ev.kind());
            }
        }
        self.dispatcher.publish(&events);
        events
    }

    /// Runs one staleness sweep at wall-clock `wall_now`.
    pub fn sweep(&self, wall_now: Instant) -> Vec<MonitorEvent> {
        let mut core = self.lock();
        let now = core.clock.now();
        let CoreState { store, sweeper, .. } = &mut *core;
        let events = sweeper.sweep(store, now, wall_now);
        self.dispatcher.publish(&events);
        events
    }

    /// Read access to the state store under the monitor lock.
    pub fn with_store<R>(&self, f: impl FnOnce(&StateStore) -> R) -> R {
        f(&self.lock().store)
    }

    /// Announces on the status channel that monitoring has started.
    pub fn announce_ready(&self) {
        if self.dispatcher.chat_ready() {
            let _core = self.lock();
            self.dispatcher.publish(&[MonitorEvent::ChatConnected]);
        }
    }

    /// Waits for queued chat and console messages to be delivered.
    pub fn flush(&self, timeout: Duration) -> bool {
        self.dispatcher.flush(timeout)
    }

    /// Closes the dispatcher; later events are detected but not delivered.
    pub fn shutdown(&self) {
        self.dispatcher.shutdown();
    }
}

#[allow(missing_docs)]
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// How long the pump waits for one telemetry event before rechecking shutdown.
    pub poll_interval: Duration,
    /// Time between staleness sweeps.
    pub sweep_interval: Duration,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(250),
            sweep_interval: Duration::from_secs(1),
        }
    }
}

/// Pump and sweeper threads around a shared `Monitor`.
#[derive(Debug)]
pub struct Watcher {
    monitor: Arc<Monitor>,
    stopping: Arc<AtomicBool>,
    source_closed: Arc<AtomicBool>,
    stop_tx: Mutex<Option<Sender<()>>>,
    pump: Mutex<Option<JoinHandle<()>>>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl Watcher {
    /// Starts pumping `source` into `monitor` and sweeping once per interval.
    pub fn start(
        monitor: Arc<Monitor>,
        mut source: Box<dyn TelemetrySource>,
        cfg: &WatcherConfig,
    ) -> WatchResult<Self> {
        let stopping = Arc::new(AtomicBool::new(false));
        let source_closed = Arc::new(AtomicBool::new(false));
        let (stop_tx, stop_rx) = bounded::<()>(1);

        monitor.announce_ready();

        let pump_monitor = Arc::clone(&monitor);
        let pump_stopping = Arc::clone(&stopping);
        let pump_closed = Arc::clone(&source_closed);
        let poll = cfg.poll_interval;
        let pump = thread::Builder::new()
            .name("trainwatch-telemetry".to_string())
            .spawn(move || {
                while !pump_stopping.load(Ordering::Acquire) {
                    match source.next_event(poll) {
                        Ok(Some(event)) => pump_monitor.handle_event(event),
                        Ok(None) => {}
                        Err(TelemetryError::Closed) => {
                            info!("telemetry source closed");
                            break;
                        }
                        Err(e @ TelemetryError::Malformed { .. }) => warn!("{e}"),
                        Err(e) => {
                            warn!("telemetry source failed: {e}");
                            break;
                        }
                    }
                }
                pump_closed.store(true, Ordering::Release);
            })
            .map_err(|e| WatchError::internal(format!("failed to spawn telemetry pump: {e}")))?;

        let sweep_monitor = Arc::clone(&monitor);
        let ticker = tick(cfg.sweep_interval);
        let sweeper = thread::Builder::new()
            .name("trainwatch-sweeper".to_string())
            .spawn(move || loop {
                select! {
                    recv(ticker) -> _ => {
                        sweep_monitor.sweep(Instant::now());
                    }
                    recv(stop_rx) -> _ => break,
                }
            })
            .map_err(|e| WatchError::internal(format!("failed to spawn sweeper: {e}")))?;

        Ok(Self {
            monitor,
            stopping,
            source_closed,
            stop_tx: Mutex::new(Some(stop_tx)),
            pump: Mutex::new(Some(pump)),
            sweeper: Mutex::new(Some(sweeper)),
        })
    }

    #[must_use]
    pub fn monitor(&self) -> &Arc<Monitor> {
        &self.monitor
    }

    /// True once the pump has stopped reading telemetry.
    #[must_use]
    pub fn is_source_closed(&self) -> bool {
        self.source_closed.load(Ordering::Acquire)
    }

    /// Blocks until the telemetry source is exhausted.
    pub fn wait_for_source(&self) {
        let handle = self.pump.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                warn!("telemetry pump panicked");
            }
        }
    }

    /// Closes the dispatcher, stops both threads and joins them.
    ///
    /// A pump still blocked inside its source is detached instead of joined.
    pub fn shutdown(&self) {
        if self.stopping.swap(true, Ordering::AcqRel) {
            return;
        }
        self.monitor.shutdown();

        drop(self.stop_tx.lock().unwrap_or_else(PoisonError::into_inner).take());
        let sweeper = self.sweeper.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(handle) = sweeper {
            if handle.join().is_err() {
                warn!("sweeper thread panicked");
            }
        }

        let pump = self.pump.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(handle) = pump {
            if handle.is_finished() {
                let _ = handle.join();
            } else {
                debug!("telemetry pump still blocked on its source; detaching");
            }
        }
    }
}

impl Drop for Watcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}
