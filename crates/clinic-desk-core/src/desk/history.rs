//! Patient history: visits and invoices for one patient, and payment collection.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use super::sequence::RefreshSequence;
use crate::api::{ClinicApi, InvoiceQuery, VisitQuery};
use crate::models::{Invoice, Patient, Visit};
use crate::notify::NotificationQueue;

pub const HISTORY_FAILED: &str = "Could not fetch patient history.";
pub const PAYMENT_COLLECTED: &str = "Payment collected successfully!";
pub const PAYMENT_FAILED: &str = "Failed to update payment status.";

/// Asks the operator to confirm an irreversible action.
#[async_trait]
pub trait Confirmer: Send + Sync {
    async fn confirm(&self, prompt: &str) -> bool;
}

/// Answers every prompt the same way.
#[derive(Debug, Clone, Copy)]
pub struct AutoConfirm(pub bool);

#[async_trait]
impl Confirmer for AutoConfirm {
    async fn confirm(&self, prompt: &str) -> bool {
        tracing::debug!(prompt, answer = self.0, "auto-confirmed");
        self.0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HistoryTab {
    #[default]
    Visits,
    Billing,
}

/// Loaded history for one patient.
#[derive(Debug, Clone, PartialEq)]
pub struct PatientHistory {
    pub patient: Patient,
    pub visits: Vec<Visit>,
    pub invoices: Vec<Invoice>,
    pub tab: HistoryTab,
}

impl PatientHistory {
    /// Invoices that still offer payment collection.
    pub fn collectable(&self) -> impl Iterator<Item = &Invoice> {
        self.invoices
            .iter()
            .filter(|invoice| invoice.payment_status.is_collectable())
    }
}

/// History dialog state.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum HistoryView {
    #[default]
    Closed,
    Open(PatientHistory),
}

/// Result of a collect-payment request.
#[derive(Debug, Clone, PartialEq)]
pub enum CollectOutcome {
    Collected(Invoice),
    /// The operator said no
    Declined,
    /// The invoice is not shown as pending in the open history
    NotOffered,
    Failed,
}

/// Drives the history dialog.
pub struct HistoryAggregator {
    api: Arc<dyn ClinicApi>,
    notices: NotificationQueue,
    confirmer: Arc<dyn Confirmer>,
    view: Mutex<HistoryView>,
    sequence: RefreshSequence,
}

impl HistoryAggregator {
    pub fn new(
        api: Arc<dyn ClinicApi>,
        notices: NotificationQueue,
        confirmer: Arc<dyn Confirmer>,
    ) -> Self {
        Self {
            api,
            notices,
            confirmer,
            view: Mutex::new(HistoryView::Closed),
            sequence: RefreshSequence::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HistoryView> {
        match self.view.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn view(&self) -> HistoryView {
        self.lock().clone()
    }

    /// Load and show the history of `patient`, starting on the visits tab.
    ///
    /// Returns whether the dialog opened.
    pub async fn open(&self, patient: Patient) -> bool {
        self.load(patient, HistoryTab::Visits).await
    }

    async fn load(&self, patient: Patient, tab: HistoryTab) -> bool {
        if self.sequence.is_closed() {
            return false;
        }
        let ticket = self.sequence.issue();

        let visit_query = VisitQuery::for_patient(&patient.id);
        let invoice_query = InvoiceQuery::for_patient(&patient.id);
        let (visits, invoices) = tokio::join!(
            self.api.list_visits(&visit_query),
            self.api.list_invoices(&invoice_query),
        );

        if !self.sequence.is_current(ticket) {
            tracing::debug!(patient_id = %patient.id, "discarding superseded history");
            return false;
        }

        match (visits, invoices) {
            (Ok(visits), Ok(invoices)) => {
                tracing::debug!(
                    patient_id = %patient.id,
                    visits = visits.results.len(),
                    invoices = invoices.results.len(),
                    "history loaded"
                );
                *self.lock() = HistoryView::Open(PatientHistory {
                    patient,
                    visits: visits.results,
                    invoices: invoices.results,
                    tab,
                });
                true
            }
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!(patient_id = %patient.id, error = %e, "history load failed");
                self.notices.error(HISTORY_FAILED);
                false
            }
        }
    }

    pub fn select_tab(&self, tab: HistoryTab) {
        if let HistoryView::Open(history) = &mut *self.lock() {
            history.tab = tab;
        }
    }

    /// Mark a pending invoice of the open history as paid, once confirmed.
    ///
    /// The history is reloaded afterwards on the same tab.
    pub async fn collect_payment(&self, invoice_id: &str) -> CollectOutcome {
        let (patient, tab, amount) = {
            let view = self.lock();
            let HistoryView::Open(history) = &*view else {
                return CollectOutcome::NotOffered;
            };
            let Some(invoice) = history.collectable().find(|i| i.id == invoice_id) else {
                return CollectOutcome::NotOffered;
            };
            (history.patient.clone(), history.tab, invoice.total_amount)
        };

        let prompt = format!("Confirm payment of {} received for {}?", amount, patient.full_name);
        if !self.confirmer.confirm(&prompt).await {
            return CollectOutcome::Declined;
        }

        match self.api.mark_invoice_paid(invoice_id).await {
            Ok(invoice) => {
                tracing::info!(invoice_id, "payment collected");
                self.notices.success(PAYMENT_COLLECTED);
                self.load(patient, tab).await;
                CollectOutcome::Collected(invoice)
            }
            Err(e) => {
                tracing::warn!(invoice_id, error = %e, "payment update failed");
                self.notices.error(PAYMENT_FAILED);
                CollectOutcome::Failed
            }
        }
    }

    /// Close the dialog. A load still in flight will not reopen it.
    pub fn close(&self) {
        self.sequence.invalidate();
        *self.lock() = HistoryView::Closed;
    }

    /// Close for good.
    pub fn shutdown(&self) {
        self.sequence.close();
        *self.lock() = HistoryView::Closed;
    }
}
