//! Connection monitor state machine.

use crate::backoff::BackoffPolicy;
use crate::config::MonitorConfig;
use crate::ports::{ConnectionObserver, LivenessProbe, ProbeError};
use bridge_telemetry::{metric_inc, metrics};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    /// Not reachable; the next tick starts a reconnect cycle.
    Disconnected,
    Reconnecting { attempt: u32 },
    /// A cycle ran out of attempts. Waits for `restart()`.
    Exhausted,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Connected => write!(f, "connected"),
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Reconnecting { attempt } => write!(f, "reconnecting({})", attempt),
            ConnectionState::Exhausted => write!(f, "exhausted"),
        }
    }
}

#[derive(Debug, Default)]
pub struct MonitorStats {
    pub probes: AtomicU64,
    pub probe_failures: AtomicU64,
    pub reconnect_attempts: AtomicU64,
    pub reconnections: AtomicU64,
}

pub struct ConnectionMonitor {
    config: MonitorConfig,
    backoff: BackoffPolicy,
    probe: Arc<dyn LivenessProbe>,
    observer: Arc<dyn ConnectionObserver>,
    state: watch::Sender<ConnectionState>,
    attempt: AtomicU32,
    last_schedule: Mutex<Vec<Duration>>,
    restart: Notify,
    /// Held for the duration of a reconnect cycle.
    cycle: tokio::sync::Mutex<()>,
    stats: MonitorStats,
}

impl ConnectionMonitor {
    pub fn new(
        config: MonitorConfig,
        probe: Arc<dyn LivenessProbe>,
        observer: Arc<dyn ConnectionObserver>,
    ) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            backoff: config.backoff(),
            config,
            probe,
            observer,
            state,
            attempt: AtomicU32::new(0),
            last_schedule: Mutex::new(Vec::new()),
            restart: Notify::new(),
            cycle: tokio::sync::Mutex::new(()),
            stats: MonitorStats::default(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Attempt number of the running cycle, 0 when none is running.
    pub fn current_attempt(&self) -> u32 {
        self.attempt.load(Ordering::Relaxed)
    }

    /// Delays used by the most recent reconnect cycle.
    pub fn last_backoff_schedule(&self) -> Vec<Duration> {
        self.last_schedule.lock().clone()
    }

    pub fn stats(&self) -> &MonitorStats {
        &self.stats
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    fn set_state(&self, next: ConnectionState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            debug!(from = %previous, to = %next, "Connection state changed");
        }
    }

    /// Record a connection established outside the monitor (initial handshake).
    pub fn mark_connected(&self) {
        self.attempt.store(0, Ordering::Relaxed);
        self.set_state(ConnectionState::Connected);
    }

    /// Record a connection known to be gone without running a cycle now.
    pub fn mark_disconnected(&self) {
        self.set_state(ConnectionState::Disconnected);
    }

    /// External trigger: start a new reconnect cycle if not connected.
    pub fn restart(&self) {
        self.restart.notify_one();
    }

    /// One probe bounded by the probe timeout.
    pub async fn probe_once(&self) -> Result<(), ProbeError> {
        self.stats.probes.fetch_add(1, Ordering::Relaxed);
        let outcome = match tokio::time::timeout(self.config.probe_timeout, self.probe.probe()).await {
            Ok(result) => result,
            Err(_) => Err(ProbeError::TimedOut),
        };
        if let Err(ref e) = outcome {
            self.stats.probe_failures.fetch_add(1, Ordering::Relaxed);
            metric_inc!(metrics::PROBE_FAILURES);
            debug!(error = %e, "Liveness probe failed");
        }
        outcome
    }

    /// One monitoring step.
    pub async fn check(&self) -> ConnectionState {
        match self.state() {
            ConnectionState::Connected => match self.probe_once().await {
                Ok(()) => ConnectionState::Connected,
                Err(e) => {
                    warn!(error = %e, "Relay stopped answering");
                    self.set_state(ConnectionState::Disconnected);
                    self.observer.connection_lost().await;
                    self.reconnect().await
                }
            },
            ConnectionState::Disconnected => self.reconnect().await,
            other => other,
        }
    }

    /// Run a reconnect cycle: up to `max_reconnect_attempts` probes separated
    /// by doubling delays. Only one cycle runs at a time.
    pub async fn reconnect(&self) -> ConnectionState {
        let Ok(_cycle) = self.cycle.try_lock() else {
            return self.state();
        };

        let max_attempts = self.config.max_reconnect_attempts;
        let mut schedule = Vec::with_capacity(max_attempts as usize);

        for attempt in 1..=max_attempts {
            let delay = self.backoff.delay(attempt);
            schedule.push(delay);
            *self.last_schedule.lock() = schedule.clone();

            self.attempt.store(attempt, Ordering::Relaxed);
            self.set_state(ConnectionState::Reconnecting { attempt });
            self.stats.reconnect_attempts.fetch_add(1, Ordering::Relaxed);
            metric_inc!(metrics::RECONNECT_ATTEMPTS);
            debug!(attempt = attempt, delay_ms = delay.as_millis(), "Reconnect attempt scheduled");

            tokio::time::sleep(delay).await;

            if self.probe_once().await.is_ok() {
                self.attempt.store(0, Ordering::Relaxed);
                self.set_state(ConnectionState::Connected);
                self.stats.reconnections.fetch_add(1, Ordering::Relaxed);
                metric_inc!(metrics::RECONNECTIONS);
                info!(attempts = attempt, "Relay reconnected");
                self.observer.connection_restored().await;
                return ConnectionState::Connected;
            }
        }

        self.attempt.store(0, Ordering::Relaxed);
        self.set_state(ConnectionState::Exhausted);
        warn!(attempts = max_attempts, "Reconnect attempts exhausted, waiting for restart");
        ConnectionState::Exhausted
    }

    /// Periodic probing plus restart handling. Runs until the task is aborted.
    pub async fn run(self: Arc<Self>) {
        let period = self.config.probe_interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if self.state() != ConnectionState::Exhausted {
                        self.check().await;
                    }
                }
                _ = self.restart.notified() => {
                    if !self.is_connected() {
                        info!("Reconnect cycle restarted");
                        self.reconnect().await;
                    }
                }
            }
        }
    }

    pub fn spawn(self: &Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(Arc::clone(self).run())
    }
}
