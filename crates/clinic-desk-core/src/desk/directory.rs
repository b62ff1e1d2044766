//! Paginated, searchable patient directory and the registration form.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::time::Instant;

use super::sequence::RefreshSequence;
use crate::api::{ApiError, ApiResult, ClinicApi, PatientQuery};
use crate::models::{Listing, PageState, Patient, Registration};
use crate::notify::NotificationQueue;
use crate::pagination::{page_control, PageControl};
use crate::validation::{validate, FieldErrors, PatientDraft};

pub const LOAD_FAILED: &str = "Failed to load patients list.";
pub const FORM_INVALID: &str = "Please fix the errors highlighted in the form.";
pub const ALREADY_REGISTERED: &str = "The patient is already there with this number";
pub const REGISTERED: &str = "New patient registered successfully!";
pub const REGISTRATION_FAILED: &str = "Registration failed. Please check network connection.";
pub const REGISTRATION_REJECTED: &str = "Registration was refused. Please check the patient details.";

/// What the directory currently shows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DirectoryView {
    pub page: PageState,
    /// Search term the rows were loaded with
    pub search: String,
    pub patients: Vec<Patient>,
    /// A user-visible load is in progress
    pub loading: bool,
}

impl DirectoryView {
    /// Page selector for the current view.
    pub fn control(&self) -> Option<PageControl> {
        page_control(self.page.page(), self.page.total_pages(), self.loading)
    }
}

/// Registration form contents and their inline errors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegistrationForm {
    pub draft: PatientDraft,
    pub errors: FieldErrors,
}

/// Result of a directory refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Rows and total replaced
    Applied,
    /// A newer refresh was issued, or the directory was closed
    Superseded,
    /// The read failed; the previous rows stay
    Failed,
    /// The requested page does not exist
    OutOfRange,
}

/// Result of submitting the registration form.
#[derive(Debug, Clone, PartialEq)]
pub enum RegistrationOutcome {
    Created(Patient),
    AlreadyExists(Patient),
    Invalid(FieldErrors),
    /// The server refused the record
    Rejected(String),
    Failed,
}

struct DirectoryState {
    view: DirectoryView,
    /// Page and search of the latest request, ahead of `view` while it is in flight
    requested: (u32, String),
    pending_loads: usize,
    form: RegistrationForm,
}

impl Default for DirectoryState {
    fn default() -> Self {
        Self {
            view: DirectoryView::default(),
            requested: (1, String::new()),
            pending_loads: 0,
            form: RegistrationForm::default(),
        }
    }
}

/// Patient list owned by the front desk.
pub struct PatientDirectory {
    api: Arc<dyn ClinicApi>,
    notices: NotificationQueue,
    state: Mutex<DirectoryState>,
    sequence: RefreshSequence,
    min_loading: Duration,
}

impl PatientDirectory {
    pub fn new(api: Arc<dyn ClinicApi>, notices: NotificationQueue, min_loading: Duration) -> Self {
        Self {
            api,
            notices,
            state: Mutex::new(DirectoryState::default()),
            sequence: RefreshSequence::new(),
            min_loading,
        }
    }

    fn state(&self) -> MutexGuard<'_, DirectoryState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn view(&self) -> DirectoryView {
        self.state().view.clone()
    }

    /// Page and search term most recently asked for. The timer reloads this, so a request
    /// still in flight is not undone by a tick.
    pub fn current_query(&self) -> (u32, String) {
        self.state().requested.clone()
    }

    /// Load one page of patients matching `search`.
    ///
    /// Only the most recently issued refresh applies its result. A visible refresh keeps the
    /// loading flag up for at least the configured minimum.
    pub async fn refresh(&self, page: u32, search: &str, suppress_loading: bool) -> RefreshOutcome {
        if self.sequence.is_closed() {
            return RefreshOutcome::Superseded;
        }
        let ticket = self.sequence.issue();
        let started = Instant::now();
        {
            let mut state = self.state();
            state.requested = (page, search.to_string());
            if !suppress_loading {
                state.pending_loads += 1;
            }
        }
        if !suppress_loading {
            self.sync_loading();
        }

        let result = self.fetch(page, search).await;

        let outcome = if !self.sequence.is_current(ticket) {
            tracing::debug!(ticket = ticket.number(), "discarding superseded patient page");
            RefreshOutcome::Superseded
        } else {
            match result {
                Ok((page, listing)) => {
                    let mut state = self.state();
                    state.view.page.apply(page, listing.total());
                    state.view.search = search.to_string();
                    state.view.patients = listing.results;
                    state.requested = (state.view.page.page(), search.to_string());
                    RefreshOutcome::Applied
                }
                Err(e) => {
                    tracing::warn!(page, error = %e, "patient list refresh failed");
                    // Fall back to what is on screen
                    let mut state = self.state();
                    state.requested = (state.view.page.page(), state.view.search.clone());
                    drop(state);
                    self.notices.error(LOAD_FAILED);
                    RefreshOutcome::Failed
                }
            }
        };

        if !suppress_loading {
            let elapsed = started.elapsed();
            if elapsed < self.min_loading {
                tokio::time::sleep(self.min_loading - elapsed).await;
            }
            let mut state = self.state();
            state.pending_loads = state.pending_loads.saturating_sub(1);
            drop(state);
            self.sync_loading();
        }

        outcome
    }

    fn sync_loading(&self) {
        let mut state = self.state();
        state.view.loading = state.pending_loads > 0;
    }

    async fn fetch(&self, page: u32, search: &str) -> ApiResult<(u32, Listing<Patient>)> {
        match self.api.list_patients(&PatientQuery::page(page, search)).await {
            // The list shrank under us; fall back to the first page
            Err(ApiError::NotFound(reason)) if page > 1 => {
                tracing::debug!(page, %reason, "page no longer exists");
                let listing = self.api.list_patients(&PatientQuery::page(1, search)).await?;
                Ok((1, listing))
            }
            other => other.map(|listing| (page, listing)),
        }
    }

    /// Query for `page` of the requested search, if that page is in the known range.
    pub fn page_query(&self, page: u32) -> Option<(u32, String)> {
        let state = self.state();
        state
            .view
            .page
            .contains(page)
            .then(|| (page, state.requested.1.clone()))
    }

    pub fn next_page_number(&self) -> Option<u32> {
        self.state().view.page.next()
    }

    pub fn prev_page_number(&self) -> Option<u32> {
        self.state().view.page.prev()
    }

    /// Show `page` of the current search. Pages outside the known range are refused.
    pub async fn go_to_page(&self, page: u32) -> RefreshOutcome {
        match self.page_query(page) {
            Some((page, search)) => self.refresh(page, &search, false).await,
            None => RefreshOutcome::OutOfRange,
        }
    }

    pub async fn next_page(&self) -> RefreshOutcome {
        match self.next_page_number() {
            Some(page) => self.go_to_page(page).await,
            None => RefreshOutcome::OutOfRange,
        }
    }

    pub async fn prev_page(&self) -> RefreshOutcome {
        match self.prev_page_number() {
            Some(page) => self.go_to_page(page).await,
            None => RefreshOutcome::OutOfRange,
        }
    }

    /// Search from the first page.
    pub async fn search(&self, term: &str) -> RefreshOutcome {
        self.refresh(1, term, false).await
    }

    pub fn form(&self) -> RegistrationForm {
        self.state().form.clone()
    }

    /// Edit the form draft in place.
    pub fn edit_draft(&self, edit: impl FnOnce(&mut PatientDraft)) {
        edit(&mut self.state().form.draft);
    }

    /// Validate the current draft for inline display.
    pub fn check_draft(&self) -> FieldErrors {
        let mut state = self.state();
        let errors = validate(&state.form.draft);
        state.form.errors = errors.clone();
        errors
    }

    /// Submit the current draft.
    pub async fn submit_form(&self) -> RegistrationOutcome {
        let draft = self.state().form.draft.clone();
        self.register(draft).await
    }

    /// Validate and register a patient.
    pub async fn register(&self, draft: PatientDraft) -> RegistrationOutcome {
        let request = match draft.to_request() {
            Ok(request) => request,
            Err(errors) => {
                self.state().form = RegistrationForm {
                    draft,
                    errors: errors.clone(),
                };
                self.notices.error(FORM_INVALID);
                return RegistrationOutcome::Invalid(errors);
            }
        };

        {
            let mut state = self.state();
            state.form.draft = draft;
            state.form.errors.clear();
        }

        match self.api.register_patient(&request).await {
            Ok(Registration::AlreadyExists(patient)) => {
                tracing::info!(patient_id = %patient.id, "phone number already registered");
                self.notices.error(ALREADY_REGISTERED);
                RegistrationOutcome::AlreadyExists(patient)
            }
            Ok(Registration::Created(patient)) => {
                tracing::info!(patient_id = %patient.id, "patient registered");
                self.state().form = RegistrationForm::default();
                self.notices.success(REGISTERED);

                let (_, search) = self.current_query();
                self.refresh(1, &search, false).await;
                RegistrationOutcome::Created(patient)
            }
            Err(ApiError::Rejected(reason)) => {
                tracing::warn!(%reason, "patient registration refused");
                self.notices.error(REGISTRATION_REJECTED);
                RegistrationOutcome::Rejected(reason)
            }
            Err(e) => {
                tracing::warn!(error = %e, "patient registration failed");
                self.notices.error(REGISTRATION_FAILED);
                RegistrationOutcome::Failed
            }
        }
    }

    /// Stop applying refresh results.
    pub fn close(&self) {
        self.sequence.close();
    }
}
