//! The front-desk console and the components it wires together.
//!
//! [`FrontDesk`] owns one instance of each component for as long as the desk is mounted:
//! the patient directory, the dashboard stats, live refresh, visit assignment and patient
//! history. Components never fail outward. Every failure is logged, leaves the last good
//! state in place, and is reported through the shared [`NotificationQueue`].

mod directory;
mod history;
mod live;
mod sequence;
mod stats;
mod visit_flow;

pub use directory::*;
pub use history::*;
pub use live::*;
pub use sequence::*;
pub use stats::*;
pub use visit_flow::*;

use std::sync::Arc;

use clinic_desk_push::PushHub;

use crate::api::ClinicApi;
use crate::clock::{Clock, SystemClock};
use crate::config::DeskConfig;
use crate::export::{BillingStatement, PatientExport};
use crate::notify::NotificationQueue;
use crate::schedule::{Scheduler, TokioScheduler};
use crate::validation::PatientDraft;

/// Collaborators the desk needs besides the data API.
#[derive(Clone)]
pub struct DeskServices {
    pub scheduler: Arc<dyn Scheduler>,
    pub clock: Arc<dyn Clock>,
    pub confirmer: Arc<dyn Confirmer>,
}

impl DeskServices {
    /// Tokio timers and the system clock.
    pub fn new(confirmer: Arc<dyn Confirmer>) -> Self {
        Self {
            scheduler: Arc::new(TokioScheduler),
            clock: Arc::new(SystemClock),
            confirmer,
        }
    }
}

/// A mounted front desk.
pub struct FrontDesk {
    notices: NotificationQueue,
    directory: Arc<PatientDirectory>,
    stats: Arc<StatsAggregator>,
    visits: VisitAssignmentFlow,
    history: HistoryAggregator,
    live: LiveSync,
    clock: Arc<dyn Clock>,
}

impl FrontDesk {
    /// Build the components, load the first page and the dashboard, then start live refresh.
    pub async fn mount(
        api: Arc<dyn ClinicApi>,
        hub: &PushHub,
        config: &DeskConfig,
        services: DeskServices,
    ) -> Self {
        let notices = NotificationQueue::new(config.notice_lifetime());
        let directory = Arc::new(PatientDirectory::new(
            api.clone(),
            notices.clone(),
            config.min_loading(),
        ));
        let stats = Arc::new(StatsAggregator::new(
            api.clone(),
            notices.clone(),
            services.clock.clone(),
            config.stats_attempts(),
        ));
        let visits = VisitAssignmentFlow::new(api.clone(), notices.clone());
        let history = HistoryAggregator::new(api, notices.clone(), services.confirmer);

        tokio::join!(directory.refresh(1, "", false), stats.refresh());

        let live = LiveSync::start(
            directory.clone(),
            stats.clone(),
            services.scheduler,
            hub,
            config.poll_interval(),
        );
        tracing::info!(poll_ms = config.poll_interval().as_millis() as u64, "front desk mounted");

        Self {
            notices,
            directory,
            stats,
            visits,
            history,
            live,
            clock: services.clock,
        }
    }

    pub fn notices(&self) -> &NotificationQueue {
        &self.notices
    }

    pub fn directory(&self) -> &PatientDirectory {
        &self.directory
    }

    pub fn stats(&self) -> &StatsAggregator {
        &self.stats
    }

    pub fn visits(&self) -> &VisitAssignmentFlow {
        &self.visits
    }

    pub fn history(&self) -> &HistoryAggregator {
        &self.history
    }

    pub fn live(&self) -> &LiveSync {
        &self.live
    }

    /// Search from the first page.
    pub async fn search(&self, term: &str) -> RefreshOutcome {
        self.show(1, term).await
    }

    pub async fn go_to_page(&self, page: u32) -> RefreshOutcome {
        match self.directory.page_query(page) {
            Some((page, search)) => self.show(page, &search).await,
            None => RefreshOutcome::OutOfRange,
        }
    }

    pub async fn next_page(&self) -> RefreshOutcome {
        match self.directory.next_page_number() {
            Some(page) => self.go_to_page(page).await,
            None => RefreshOutcome::OutOfRange,
        }
    }

    pub async fn prev_page(&self) -> RefreshOutcome {
        match self.directory.prev_page_number() {
            Some(page) => self.go_to_page(page).await,
            None => RefreshOutcome::OutOfRange,
        }
    }

    /// Load a page the operator asked for. A new page or search term restarts the refresh
    /// period before the load is issued and reloads the dashboard alongside it.
    async fn show(&self, page: u32, search: &str) -> RefreshOutcome {
        let changed = self.directory.current_query() != (page, search.to_string());
        if !changed {
            return self.directory.refresh(page, search, false).await;
        }
        self.live.rearm();
        let (outcome, _) = tokio::join!(
            self.directory.refresh(page, search, false),
            self.stats.refresh()
        );
        outcome
    }

    /// Register a patient from `draft`.
    pub async fn register(&self, draft: PatientDraft) -> RegistrationOutcome {
        let before = self.directory.current_query();
        let outcome = self.directory.register(draft).await;
        self.query_changed(before).await;
        outcome
    }

    /// Register whatever the form currently holds.
    pub async fn submit_registration(&self) -> RegistrationOutcome {
        let before = self.directory.current_query();
        let outcome = self.directory.submit_form().await;
        self.query_changed(before).await;
        outcome
    }

    /// Registration can move the directory back to page 1; treat that like navigation.
    async fn query_changed(&self, before: (u32, String)) {
        if self.directory.current_query() == before {
            return;
        }
        self.live.rearm();
        self.stats.refresh().await;
    }

    /// The patients on the current page.
    pub fn export_patients(&self) -> PatientExport {
        PatientExport::new(&self.directory.view().patients, self.clock.now())
    }

    /// Statement for the patient whose history is open.
    pub fn billing_statement(&self) -> Option<BillingStatement> {
        match self.history.view() {
            HistoryView::Open(history) => Some(BillingStatement::new(
                &history.patient.id,
                &history.patient.full_name,
                &history.invoices,
                self.clock.now(),
            )),
            HistoryView::Closed => None,
        }
    }

    /// Stop every timer and listener and discard late completions.
    pub fn teardown(&self) {
        self.live.teardown();
        self.directory.close();
        self.stats.close();
        self.history.shutdown();
        self.visits.cancel();
        self.notices.dismiss();
        tracing::info!("front desk torn down");
    }
}
