//! Cancellable periodic work.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Boxed future produced by a tick.
pub type TickFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Work run on every tick.
pub type Tick = Arc<dyn Fn() -> TickFuture + Send + Sync>;

/// Source of periodic ticks.
pub trait Scheduler: Send + Sync {
    /// Run `tick` every `period`, first after one full period. Each tick runs detached, so a
    /// slow tick never delays the next one.
    fn every(&self, period: Duration, tick: Tick) -> ScheduledTask;
}

/// Handle to scheduled work. Cancelled on drop.
#[derive(Debug)]
pub struct ScheduledTask {
    cancel: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl ScheduledTask {
    pub fn new(cancel: oneshot::Sender<()>, handle: JoinHandle<()>) -> Self {
        Self {
            cancel: Some(cancel),
            handle: Some(handle),
        }
    }

    /// Stop future ticks. Ticks already running are not interrupted.
    pub fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    pub fn is_active(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Scheduler backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

impl Scheduler for TokioScheduler {
    fn every(&self, period: Duration, tick: Tick) -> ScheduledTask {
        let (cancel_tx, mut cancel_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = &mut cancel_rx => break,
                    _ = interval.tick() => {
                        tokio::spawn(tick());
                    }
                }
            }
        });

        ScheduledTask::new(cancel_tx, handle)
    }
}
