//! Keeps the directory and dashboard fresh while the desk is mounted.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use clinic_desk_push::{PushEvent, PushHub};
use tokio::task::JoinHandle;

use super::directory::PatientDirectory;
use super::stats::StatsAggregator;
use crate::schedule::{ScheduledTask, Scheduler, Tick};

struct LiveState {
    timer: Option<ScheduledTask>,
    listener: Option<JoinHandle<()>>,
}

/// Periodic refresh plus the push-triggered stats refresh.
pub struct LiveSync {
    directory: Arc<PatientDirectory>,
    stats: Arc<StatsAggregator>,
    scheduler: Arc<dyn Scheduler>,
    period: Duration,
    state: Mutex<LiveState>,
}

impl LiveSync {
    /// Arm the timer and register the visit-update listener.
    pub fn start(
        directory: Arc<PatientDirectory>,
        stats: Arc<StatsAggregator>,
        scheduler: Arc<dyn Scheduler>,
        hub: &PushHub,
        period: Duration,
    ) -> Self {
        let listener = Self::listen(hub, stats.clone());
        let live = Self {
            directory,
            stats,
            scheduler,
            period,
            state: Mutex::new(LiveState {
                timer: None,
                listener: Some(listener),
            }),
        };
        live.rearm();
        live
    }

    fn state(&self) -> MutexGuard<'_, LiveState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn listen(hub: &PushHub, stats: Arc<StatsAggregator>) -> JoinHandle<()> {
        let mut subscription = hub.subscribe(PushEvent::VisitUpdated);
        tokio::spawn(async move {
            while subscription.recv().await.is_some() {
                tracing::debug!("visit update received, refreshing stats");
                let stats = stats.clone();
                tokio::spawn(async move {
                    stats.refresh().await;
                });
            }
            tracing::debug!("push hub closed");
        })
    }

    fn tick(&self) -> Tick {
        let directory = self.directory.clone();
        let stats = self.stats.clone();
        Arc::new(move || {
            let directory = directory.clone();
            let stats = stats.clone();
            Box::pin(async move {
                let (page, search) = directory.current_query();
                tokio::join!(directory.refresh(page, &search, true), stats.refresh());
            })
        })
    }

    /// Restart the timer from a full period. No-op after teardown.
    pub fn rearm(&self) {
        let mut state = self.state();
        if state.listener.is_none() {
            return;
        }
        // Cancel first so two timers never overlap
        if let Some(mut timer) = state.timer.take() {
            timer.cancel();
        }
        state.timer = Some(self.scheduler.every(self.period, self.tick()));
        tracing::debug!(period_ms = self.period.as_millis() as u64, "live refresh armed");
    }

    /// Cancel the timer and drop the push subscription. Refreshes already running finish,
    /// but their owners discard the results once closed.
    pub fn teardown(&self) {
        let mut state = self.state();
        if let Some(mut timer) = state.timer.take() {
            timer.cancel();
        }
        if let Some(listener) = state.listener.take() {
            listener.abort();
        }
    }

    pub fn is_active(&self) -> bool {
        let state = self.state();
        state.listener.is_some() && state.timer.as_ref().is_some_and(|t| t.is_active())
    }
}

impl Drop for LiveSync {
    fn drop(&mut self) {
        self.teardown();
    }
}
