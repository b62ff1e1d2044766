//! Dashboard statistics aggregation.
//!
//! Four independent reads feed one snapshot. Each read is retried on its own, and a read that
//! still fails leaves its field at the last known value.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use super::sequence::RefreshSequence;
use crate::api::{ApiResult, ClinicApi, InvoiceQuery, PatientQuery, VisitQuery};
use crate::clock::Clock;
use crate::models::{paid_revenue_on, recent_visits, StatsSnapshot, RECENT_VISIT_LIMIT};
use crate::notify::NotificationQueue;

pub const STATS_FAILED: &str = "Failed to refresh dashboard statistics.";

/// One of the reads behind the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatSource {
    NewPatients,
    ActiveVisits,
    Revenue,
    RecentVisits,
}

impl StatSource {
    fn name(&self) -> &'static str {
        match self {
            StatSource::NewPatients => "new_patients",
            StatSource::ActiveVisits => "active_visits",
            StatSource::Revenue => "revenue",
            StatSource::RecentVisits => "recent_visits",
        }
    }
}

/// Result of a stats refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatsOutcome {
    /// Every read that succeeded was merged; `failed` kept their last values
    Applied { failed: Vec<StatSource> },
    /// A newer refresh was issued, or the aggregator was closed
    Superseded,
}

/// Keeps the dashboard snapshot current.
pub struct StatsAggregator {
    api: Arc<dyn ClinicApi>,
    notices: NotificationQueue,
    clock: Arc<dyn Clock>,
    snapshot: Mutex<StatsSnapshot>,
    sequence: RefreshSequence,
    attempts: u32,
}

impl StatsAggregator {
    pub fn new(
        api: Arc<dyn ClinicApi>,
        notices: NotificationQueue,
        clock: Arc<dyn Clock>,
        attempts: u32,
    ) -> Self {
        Self {
            api,
            notices,
            clock,
            snapshot: Mutex::new(StatsSnapshot::default()),
            sequence: RefreshSequence::new(),
            attempts: attempts.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StatsSnapshot> {
        match self.snapshot.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        self.lock().clone()
    }

    /// Run the four reads in parallel and merge what came back.
    pub async fn refresh(&self) -> StatsOutcome {
        if self.sequence.is_closed() {
            return StatsOutcome::Superseded;
        }
        let ticket = self.sequence.issue();
        let today = self.clock.today();

        let new_patients_query = &PatientQuery::registered_on(today);
        let active_query = &VisitQuery::active();
        let invoice_query = &InvoiceQuery::created_on(today);
        let recent_query = &VisitQuery::recent(RECENT_VISIT_LIMIT as u32);

        let api = &self.api;
        let (new_patients, active, invoices, recent) = tokio::join!(
            self.read(StatSource::NewPatients, move || api.list_patients(new_patients_query)),
            self.read(StatSource::ActiveVisits, move || api.list_visits(active_query)),
            self.read(StatSource::Revenue, move || api.list_invoices(invoice_query)),
            self.read(StatSource::RecentVisits, move || api.list_visits(recent_query)),
        );

        if !self.sequence.is_current(ticket) {
            tracing::debug!(ticket = ticket.number(), "discarding superseded stats");
            return StatsOutcome::Superseded;
        }

        let mut failed = Vec::new();
        {
            let mut snapshot = self.lock();
            match new_patients {
                Some(listing) => snapshot.new_patients_today = listing.total(),
                None => failed.push(StatSource::NewPatients),
            }
            match active {
                Some(listing) => snapshot.active_visits = listing.total(),
                None => failed.push(StatSource::ActiveVisits),
            }
            match invoices {
                Some(listing) => snapshot.today_revenue = paid_revenue_on(&listing.results, today),
                None => failed.push(StatSource::Revenue),
            }
            match recent {
                Some(listing) => snapshot.recent_visits = recent_visits(listing.results),
                None => failed.push(StatSource::RecentVisits),
            }
            if failed.len() < 4 {
                snapshot.refreshed_at = Some(self.clock.now());
            }
        }

        if failed.len() == 4 {
            self.notices.error(STATS_FAILED);
        }
        StatsOutcome::Applied { failed }
    }

    /// Run one read with retries. `None` once every attempt failed.
    async fn read<T, F, Fut>(&self, source: StatSource, op: F) -> Option<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = ApiResult<T>>,
    {
        for attempt in 1..=self.attempts {
            match op().await {
                Ok(value) => return Some(value),
                Err(e) => {
                    tracing::warn!(source = source.name(), attempt, error = %e, "stats read failed");
                }
            }
        }
        None
    }

    /// Stop applying refresh results.
    pub fn close(&self) {
        self.sequence.close();
    }
}
