//! Visit assignment: triage a selected patient and route the visit to a department.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::api::ClinicApi;
use crate::models::{Assignment, Department, Doctor, NewVisit, Patient, Visit, Vitals, WorkArea};
use crate::notify::NotificationQueue;

pub const DOCTORS_FAILED: &str = "Could not fetch doctors list.";
pub const VISIT_FAILED: &str = "Failed to create visit record.";
pub const CASUALTY_FAILED: &str = "Failed to assign to Casualty.";

fn visit_created(name: &str) -> String {
    format!("Visit token generated for {}", name)
}

fn sent_to_casualty(name: &str) -> String {
    format!("Sent {} to Casualty", name)
}

/// Assignment form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VisitForm {
    pub department: Department,
    /// Only read when the department is [`Department::Doctor`]
    pub doctor_id: Option<String>,
    pub vitals: Vitals,
}

impl VisitForm {
    /// The routing this form describes, if it is complete.
    pub fn assignment(&self) -> Option<Assignment> {
        match self.department {
            Department::Doctor => self
                .doctor_id
                .as_deref()
                .filter(|id| !id.trim().is_empty())
                .map(|id| Assignment::Doctor(id.to_string())),
            Department::Lab => Some(Assignment::Lab),
            Department::Casualty => Some(Assignment::Casualty),
        }
    }

    pub fn can_submit(&self) -> bool {
        self.assignment().is_some()
    }
}

/// An open assignment dialog.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentSession {
    pub patient: Patient,
    /// Doctors offered for selection
    pub doctors: Vec<Doctor>,
    pub form: VisitForm,
}

/// Assignment dialog state.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum VisitFlowState {
    #[default]
    Idle,
    PatientSelected(AssignmentSession),
    Submitting(AssignmentSession),
}

impl VisitFlowState {
    pub fn session(&self) -> Option<&AssignmentSession> {
        match self {
            VisitFlowState::Idle => None,
            VisitFlowState::PatientSelected(s) | VisitFlowState::Submitting(s) => Some(s),
        }
    }
}

/// Why a submission did not go out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitBlock {
    NoPatientSelected,
    DoctorRequired,
    AlreadySubmitting,
}

/// Result of submitting the assignment form.
#[derive(Debug, Clone, PartialEq)]
pub enum VisitSubmitOutcome {
    Created(Visit),
    Failed,
    Blocked(SubmitBlock),
}

/// Result of sending a patient straight to casualty.
#[derive(Debug, Clone, PartialEq)]
pub enum CasualtyOutcome {
    /// Visit created; the desk should switch to `destination`
    Routed { visit: Visit, destination: WorkArea },
    Failed,
}

/// Drives the assignment dialog.
pub struct VisitAssignmentFlow {
    api: Arc<dyn ClinicApi>,
    notices: NotificationQueue,
    state: Mutex<VisitFlowState>,
}

impl VisitAssignmentFlow {
    pub fn new(api: Arc<dyn ClinicApi>, notices: NotificationQueue) -> Self {
        Self {
            api,
            notices,
            state: Mutex::new(VisitFlowState::Idle),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VisitFlowState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn state(&self) -> VisitFlowState {
        self.lock().clone()
    }

    /// Open the dialog for `patient` once the doctor list has loaded.
    ///
    /// If the doctors cannot be read the dialog still opens, with nobody to pick.
    pub async fn select_patient(&self, patient: Patient) {
        let doctors = match self.api.list_doctors().await {
            Ok(doctors) => doctors.into_iter().filter(|d| d.is_active).collect(),
            Err(e) => {
                tracing::warn!(error = %e, "doctor list unavailable");
                self.notices.error(DOCTORS_FAILED);
                Vec::new()
            }
        };

        tracing::debug!(patient_id = %patient.id, doctors = doctors.len(), "assignment opened");
        *self.lock() = VisitFlowState::PatientSelected(AssignmentSession {
            patient,
            doctors,
            form: VisitForm::default(),
        });
    }

    /// Edit the form. Ignored unless the dialog is open and idle.
    pub fn edit_form(&self, edit: impl FnOnce(&mut VisitForm)) {
        if let VisitFlowState::PatientSelected(session) = &mut *self.lock() {
            edit(&mut session.form);
        }
    }

    pub fn set_department(&self, department: Department) {
        self.edit_form(|form| form.department = department);
    }

    pub fn select_doctor(&self, doctor_id: Option<String>) {
        self.edit_form(|form| form.doctor_id = doctor_id);
    }

    pub fn can_submit(&self) -> bool {
        matches!(&*self.lock(), VisitFlowState::PatientSelected(s) if s.form.can_submit())
    }

    /// Create the visit described by the form.
    pub async fn submit(&self) -> VisitSubmitOutcome {
        let (session, request) = {
            let mut state = self.lock();
            let session = match &*state {
                VisitFlowState::Idle => {
                    return VisitSubmitOutcome::Blocked(SubmitBlock::NoPatientSelected)
                }
                VisitFlowState::Submitting(_) => {
                    return VisitSubmitOutcome::Blocked(SubmitBlock::AlreadySubmitting)
                }
                VisitFlowState::PatientSelected(session) => session.clone(),
            };
            let Some(assignment) = session.form.assignment() else {
                return VisitSubmitOutcome::Blocked(SubmitBlock::DoctorRequired);
            };
            let request = NewVisit {
                patient_id: session.patient.id.clone(),
                assignment,
                vitals: session.form.vitals.clone(),
            };
            *state = VisitFlowState::Submitting(session.clone());
            (session, request)
        };

        let result = self.api.create_visit(&request).await;

        let mut state = self.lock();
        let still_open = matches!(&*state, VisitFlowState::Submitting(_));
        match result {
            Ok(visit) => {
                tracing::info!(visit_id = %visit.id, department = request.assignment.department().as_str(), "visit created");
                if still_open {
                    *state = VisitFlowState::Idle;
                }
                drop(state);
                self.notices.success(visit_created(&session.patient.full_name));
                VisitSubmitOutcome::Created(visit)
            }
            Err(e) => {
                tracing::warn!(error = %e, "visit creation failed");
                if still_open {
                    *state = VisitFlowState::PatientSelected(session);
                }
                drop(state);
                self.notices.error(VISIT_FAILED);
                VisitSubmitOutcome::Failed
            }
        }
    }

    /// Close the dialog without creating anything.
    pub fn cancel(&self) {
        *self.lock() = VisitFlowState::Idle;
    }

    /// Send `patient` to casualty straight from the list, skipping triage.
    pub async fn approve_to_casualty(&self, patient: &Patient) -> CasualtyOutcome {
        let request = NewVisit {
            patient_id: patient.id.clone(),
            assignment: Assignment::Casualty,
            vitals: Vitals::default(),
        };

        match self.api.create_visit(&request).await {
            Ok(visit) => {
                tracing::info!(visit_id = %visit.id, "patient sent to casualty");
                self.notices.success(sent_to_casualty(&patient.full_name));
                CasualtyOutcome::Routed {
                    visit,
                    destination: Department::Casualty.work_area(),
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "casualty assignment failed");
                self.notices.error(CASUALTY_FAILED);
                CasualtyOutcome::Failed
            }
        }
    }
}
