//! Polling controllers
//!
//! Each poller owns one background task that:
//! - Fetches immediately, then once per interval
//! - Accepts out-of-band refreshes
//! - Drops responses older than the last one it applied
//! - Keeps the last good value when a cycle fails
//!
//! Dropping the `Poller` handle cancels the task and any fetch in flight.

mod tasks;
#[cfg(test)]
mod tests;

pub use tasks::{PairQuoteTask, PairSnapshot, PoolMetricsTask};

use crate::error::{Result, WidgetError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{MissedTickBehavior, Sleep};
use tracing::{debug, info, warn};

/// One unit of polled work
#[async_trait]
pub trait PollTask: Send + Sync + 'static {
    type Output: Observation;

    async fn poll(&self) -> Result<Self::Output>;
}

/// A polled value that may derive state from the value it replaces
pub trait Observation: Clone + Send + Sync + 'static {
    /// Called right before this value replaces `previous`
    fn follow(&mut self, _previous: Option<&Self>) {}
}

impl Observation for crate::types::NormalizedPoolMetrics {}

#[derive(Debug, Clone, Copy)]
pub struct PollerConfig {
    pub interval: Duration,
    /// One extra fetch this long after start
    pub kick_delay: Option<Duration>,
}

impl PollerConfig {
    pub fn every(interval: Duration) -> Self {
        Self {
            interval,
            kick_delay: None,
        }
    }

    pub fn with_kick(mut self, delay: Duration) -> Self {
        self.kick_delay = Some(delay);
        self
    }
}

/// What the presentation layer sees of one poller
#[derive(Debug, Clone)]
pub struct PollState<T> {
    /// Last successfully applied value, kept across failed cycles
    pub value: Option<T>,
    pub loading: bool,
    pub last_error: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
    applied_seq: u64,
}

impl<T> Default for PollState<T> {
    fn default() -> Self {
        Self {
            value: None,
            loading: false,
            last_error: None,
            updated_at: None,
            applied_seq: 0,
        }
    }
}

impl<T: Observation> PollState<T> {
    /// Apply the result of fetch number `seq`.
    ///
    /// Returns false and changes nothing when a newer fetch was already applied.
    pub fn apply(&mut self, seq: u64, result: Result<T>) -> bool {
        if seq <= self.applied_seq {
            return false;
        }
        self.applied_seq = seq;

        match result {
            Ok(mut value) => {
                value.follow(self.value.as_ref());
                self.value = Some(value);
                self.last_error = None;
                self.updated_at = Some(Utc::now());
            }
            Err(e) => {
                self.last_error = Some(e.to_string());
            }
        }
        true
    }

    /// Number of the last applied fetch
    pub fn cycles(&self) -> u64 {
        self.applied_seq
    }
}

/// Handle to a running poller
pub struct Poller<T> {
    name: String,
    refresh: Arc<Notify>,
    state: watch::Receiver<PollState<T>>,
    handle: JoinHandle<()>,
}

impl<T: Observation> Poller<T> {
    /// Start polling `task` on the current runtime
    pub fn spawn<P>(name: impl Into<String>, task: P, config: PollerConfig) -> Self
    where
        P: PollTask<Output = T>,
    {
        let name = name.into();
        let refresh = Arc::new(Notify::new());
        let (tx, rx) = watch::channel(PollState::default());

        let handle = tokio::spawn(run_loop(
            name.clone(),
            Arc::new(task),
            config,
            Arc::clone(&refresh),
            tx,
        ));

        Self {
            name,
            refresh,
            state: rx,
            handle,
        }
    }

    /// Fetch now, outside the regular cadence
    pub fn refresh(&self) {
        self.refresh.notify_one();
    }

    pub fn subscribe(&self) -> watch::Receiver<PollState<T>> {
        self.state.clone()
    }

    pub fn snapshot(&self) -> PollState<T> {
        self.state.borrow().clone()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl<T> Drop for Poller<T> {
    fn drop(&mut self) {
        debug!(poller = %self.name, "Stopping poller");
        self.handle.abort();
    }
}

async fn run_loop<P: PollTask>(
    name: String,
    task: Arc<P>,
    config: PollerConfig,
    refresh: Arc<Notify>,
    tx: watch::Sender<PollState<P::Output>>,
) {
    info!(poller = %name, interval_secs = config.interval.as_secs(), "Poller started");

    let mut interval = tokio::time::interval(config.interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut kick: Option<Pin<Box<Sleep>>> = config.kick_delay.map(|d| Box::pin(tokio::time::sleep(d)));

    let mut in_flight: JoinSet<(u64, Result<P::Output>)> = JoinSet::new();
    let mut next_seq: u64 = 0;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if in_flight.is_empty() {
                    let seq = issue(&task, &mut next_seq, &mut in_flight, &tx);
                    debug!(poller = %name, seq, "Scheduled fetch");
                } else {
                    debug!(poller = %name, "Fetch still in flight, skipping tick");
                }
            }
            _ = refresh.notified() => {
                let seq = issue(&task, &mut next_seq, &mut in_flight, &tx);
                debug!(poller = %name, seq, "Out-of-band refresh");
            }
            Some(()) = wait_kick(&mut kick) => {
                kick = None;
                let seq = issue(&task, &mut next_seq, &mut in_flight, &tx);
                debug!(poller = %name, seq, "Kick fetch");
            }
            Some(joined) = in_flight.join_next() => {
                let still_loading = !in_flight.is_empty();
                let (seq, result) = match joined {
                    Ok(done) => done,
                    Err(e) => {
                        warn!(poller = %name, "{}", WidgetError::ClientPollFailure(e.to_string()));
                        tx.send_if_modified(|state| {
                            std::mem::replace(&mut state.loading, still_loading) != still_loading
                        });
                        continue;
                    }
                };

                if let Err(e) = &result {
                    warn!(poller = %name, seq, "{}", WidgetError::ClientPollFailure(e.to_string()));
                }

                tx.send_if_modified(|state| {
                    let applied = state.apply(seq, result);
                    if !applied {
                        debug!(poller = %name, seq, "Dropping stale response");
                    }
                    let was_loading = std::mem::replace(&mut state.loading, still_loading);
                    applied || was_loading != still_loading
                });
            }
        }
    }
}

fn issue<P: PollTask>(
    task: &Arc<P>,
    next_seq: &mut u64,
    in_flight: &mut JoinSet<(u64, Result<P::Output>)>,
    tx: &watch::Sender<PollState<P::Output>>,
) -> u64 {
    *next_seq += 1;
    let seq = *next_seq;
    let task = Arc::clone(task);
    in_flight.spawn(async move { (seq, task.poll().await) });
    tx.send_modify(|state| state.loading = true);
    seq
}

async fn wait_kick(kick: &mut Option<Pin<Box<Sleep>>>) -> Option<()> {
    match kick {
        Some(sleep) => {
            sleep.await;
            Some(())
        }
        None => std::future::pending().await,
    }
}
