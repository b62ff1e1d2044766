//! Front desk workflows end to end over the local store.

mod common;

use std::sync::Arc;

use clinic_desk_core::desk::{
    CasualtyOutcome, CollectOutcome, HistoryTab, HistoryView, RefreshOutcome, RegistrationOutcome,
    SubmitBlock, VisitFlowState, VisitSubmitOutcome, ALREADY_REGISTERED, CASUALTY_FAILED,
    DOCTORS_FAILED, FORM_INVALID, LOAD_FAILED, PAYMENT_COLLECTED, PAYMENT_FAILED, REGISTERED,
    REGISTRATION_FAILED, REGISTRATION_REJECTED, VISIT_FAILED,
};
use clinic_desk_core::models::{Assignment, Department, NewVisit, PaymentStatus, Vitals, WorkArea};
use clinic_desk_core::validation::Field;
use clinic_desk_core::{AutoConfirm, DeskConfig, DeskServices, FrontDesk, NotificationKind};
use clinic_desk_push::PushHub;
use common::{draft, flaky_store, seed_patients, FlakyApi, Op};
use rust_decimal::Decimal;

async fn mount(api: Arc<FlakyApi>) -> FrontDesk {
    let config = DeskConfig::new("http://127.0.0.1:8000/api/").unwrap();
    FrontDesk::mount(
        api,
        &PushHub::default(),
        &config,
        DeskServices::new(Arc::new(AutoConfirm(true))),
    )
    .await
}

fn message(desk: &FrontDesk) -> String {
    desk.notices().current().map(|n| n.message).unwrap_or_default()
}

// =========================================================================
// Registration
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_register_resets_form_and_lists_patient() {
    let (store, api) = flaky_store();
    let desk = mount(api).await;

    desk.directory()
        .edit_draft(|d| *d = draft("Suresh Babu", "41", "9876543210"));
    let outcome = desk.submit_registration().await;

    assert!(matches!(outcome, RegistrationOutcome::Created(_)));
    assert_eq!(message(&desk), REGISTERED);
    assert_eq!(desk.directory().form(), Default::default());
    assert_eq!(desk.directory().view().patients[0].full_name, "Suresh Babu");
    assert_eq!(store.patient_count().unwrap(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_phone_leaves_count_unchanged() {
    let (store, api) = flaky_store();
    seed_patients(&store, 3);
    let desk = mount(api).await;

    let existing_phone = desk.directory().view().patients[0].phone.clone();
    let outcome = desk
        .register(draft("Someone Else", "29", &existing_phone))
        .await;

    let RegistrationOutcome::AlreadyExists(patient) = outcome else {
        panic!("expected an existing patient, got {:?}", outcome);
    };
    assert_eq!(patient.phone, existing_phone);
    assert_eq!(message(&desk), ALREADY_REGISTERED);
    assert_eq!(store.patient_count().unwrap(), 3);
    assert_eq!(desk.directory().view().page.total_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_invalid_draft_never_reaches_server() {
    let (_, api) = flaky_store();
    let desk = mount(api.clone()).await;

    let outcome = desk.register(draft("  ", "0", "98765432")).await;

    let RegistrationOutcome::Invalid(errors) = outcome else {
        panic!("expected field errors");
    };
    assert!(errors.contains_key(&Field::FullName));
    assert!(errors.contains_key(&Field::Age));
    assert!(errors.contains_key(&Field::Phone));
    assert!(!errors.contains_key(&Field::Address));
    assert_eq!(message(&desk), FORM_INVALID);
    assert_eq!(api.calls(Op::RegisterPatient), 0);

    // The draft stays in the form with its errors for correction
    let form = desk.directory().form();
    assert_eq!(form.draft.phone, "98765432");
    assert_eq!(form.errors, errors);
}

#[tokio::test(start_paused = true)]
async fn test_registration_failure_keeps_draft() {
    let (store, api) = flaky_store();
    let desk = mount(api.clone()).await;
    api.fail(Op::RegisterPatient);

    let outcome = desk.register(draft("Gita Das", "33", "9000011111")).await;

    assert_eq!(outcome, RegistrationOutcome::Failed);
    assert_eq!(message(&desk), REGISTRATION_FAILED);
    assert_eq!(desk.notices().current().unwrap().kind, NotificationKind::Error);
    assert_eq!(desk.directory().form().draft.full_name, "Gita Das");
    assert_eq!(store.patient_count().unwrap(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_refused_registration_points_at_the_form() {
    let (store, api) = flaky_store();
    let desk = mount(api.clone()).await;

    // Passes the form, but the store only keeps whole years
    let outcome = desk.register(draft("Baby Iyer", "0.5", "9000022222")).await;

    assert!(matches!(outcome, RegistrationOutcome::Rejected(_)), "{:?}", outcome);
    assert_eq!(message(&desk), REGISTRATION_REJECTED);
    assert_eq!(api.calls(Op::RegisterPatient), 1);
    assert_eq!(desk.directory().form().draft.age, "0.5");
    assert_eq!(store.patient_count().unwrap(), 0);
}

// =========================================================================
// Directory
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_failed_load_keeps_last_rows() {
    let (store, api) = flaky_store();
    seed_patients(&store, 4);
    let desk = mount(api.clone()).await;
    let before = desk.directory().view();

    api.fail(Op::ListPatients);
    assert_eq!(desk.search("Patient 001").await, RefreshOutcome::Failed);

    let after = desk.directory().view();
    assert_eq!(after.patients, before.patients);
    assert_eq!(after.search, "");
    assert!(!after.loading);
    assert_eq!(message(&desk), LOAD_FAILED);
}

#[tokio::test(start_paused = true)]
async fn test_pagination_bounds() {
    let (store, api) = flaky_store();
    seed_patients(&store, 25);
    let desk = mount(api).await;

    let view = desk.directory().view();
    assert_eq!(view.page.total_pages(), 3);
    let control = view.control().unwrap();
    assert!(!control.prev_enabled);
    assert!(control.next_enabled);

    assert_eq!(desk.prev_page().await, RefreshOutcome::OutOfRange);
    assert_eq!(desk.go_to_page(4).await, RefreshOutcome::OutOfRange);
    assert_eq!(desk.go_to_page(0).await, RefreshOutcome::OutOfRange);

    assert_eq!(desk.go_to_page(3).await, RefreshOutcome::Applied);
    let view = desk.directory().view();
    assert_eq!(view.patients.len(), 5);
    assert_eq!(view.patients[4].full_name, "Patient 000");
    assert!(!view.control().unwrap().next_enabled);
}

#[tokio::test(start_paused = true)]
async fn test_search_matches_name_or_phone() {
    let (store, api) = flaky_store();
    seed_patients(&store, 12);
    let desk = mount(api).await;

    desk.search("patient 01").await;
    assert_eq!(desk.directory().view().patients.len(), 2);

    desk.search("9100000007").await;
    let view = desk.directory().view();
    assert_eq!(view.patients.len(), 1);
    assert_eq!(view.patients[0].full_name, "Patient 007");
    assert_eq!(view.search, "9100000007");
}

// =========================================================================
// Visit assignment
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_doctor_department_requires_doctor() {
    let (store, api) = flaky_store();
    let patient = seed_patients(&store, 1).remove(0);
    let desk = mount(api).await;

    desk.visits().select_patient(patient).await;
    assert!(!desk.visits().can_submit());
    assert_eq!(
        desk.visits().submit().await,
        VisitSubmitOutcome::Blocked(SubmitBlock::DoctorRequired)
    );

    for department in [Department::Lab, Department::Casualty] {
        desk.visits().set_department(department);
        assert!(desk.visits().can_submit(), "{:?} needs no doctor", department);
    }

    let VisitSubmitOutcome::Created(visit) = desk.visits().submit().await else {
        panic!("casualty visit should submit");
    };
    assert_eq!(visit.doctor, None);
    assert_eq!(visit.assigned_role.department(), Some(Department::Casualty));
}

#[tokio::test(start_paused = true)]
async fn test_doctor_list_failure_still_opens_dialog() {
    let (store, api) = flaky_store();
    let patient = seed_patients(&store, 1).remove(0);
    store.add_doctor("drsharma", None, None).unwrap();
    let desk = mount(api.clone()).await;
    api.fail(Op::ListDoctors);

    desk.visits().select_patient(patient.clone()).await;

    let VisitFlowState::PatientSelected(session) = desk.visits().state() else {
        panic!("dialog should be open");
    };
    assert_eq!(session.patient, patient);
    assert!(session.doctors.is_empty());
    assert_eq!(message(&desk), DOCTORS_FAILED);
}

#[tokio::test(start_paused = true)]
async fn test_inactive_doctors_not_offered() {
    let (store, api) = flaky_store();
    let patient = seed_patients(&store, 1).remove(0);
    let active = store.add_doctor("drsharma", None, Some(Decimal::new(500, 0))).unwrap();
    let inactive = store.add_doctor("drbose", None, None).unwrap();
    store.set_doctor_active(&inactive.id, false).unwrap();
    let desk = mount(api).await;

    desk.visits().select_patient(patient).await;
    let session = desk.visits().state().session().cloned().unwrap();
    assert_eq!(session.doctors, vec![active]);
}

#[tokio::test(start_paused = true)]
async fn test_visit_failure_keeps_dialog_open() {
    let (store, api) = flaky_store();
    let patient = seed_patients(&store, 1).remove(0);
    let doctor = store.add_doctor("drsharma", None, None).unwrap();
    let desk = mount(api.clone()).await;

    desk.visits().select_patient(patient).await;
    desk.visits().select_doctor(Some(doctor.id.clone()));
    desk.visits().edit_form(|form| form.vitals.blood_pressure = Some("120/80".into()));
    api.fail(Op::CreateVisit);

    assert_eq!(desk.visits().submit().await, VisitSubmitOutcome::Failed);
    assert_eq!(message(&desk), VISIT_FAILED);

    let VisitFlowState::PatientSelected(session) = desk.visits().state() else {
        panic!("dialog should stay open");
    };
    assert_eq!(session.form.doctor_id, Some(doctor.id));
    assert_eq!(session.form.vitals.blood_pressure.as_deref(), Some("120/80"));

    api.heal(Op::CreateVisit);
    assert!(matches!(
        desk.visits().submit().await,
        VisitSubmitOutcome::Created(_)
    ));
}

#[tokio::test(start_paused = true)]
async fn test_approve_to_casualty_fast_path() {
    let (store, api) = flaky_store();
    let patient = seed_patients(&store, 1).remove(0);
    let desk = mount(api.clone()).await;

    let CasualtyOutcome::Routed { visit, destination } =
        desk.visits().approve_to_casualty(&patient).await
    else {
        panic!("expected casualty routing");
    };
    assert_eq!(destination, WorkArea::Casualty);
    assert_eq!(visit.vitals, Vitals::default());
    assert_eq!(message(&desk), format!("Sent {} to Casualty", patient.full_name));

    api.fail(Op::CreateVisit);
    assert_eq!(
        desk.visits().approve_to_casualty(&patient).await,
        CasualtyOutcome::Failed
    );
    assert_eq!(message(&desk), CASUALTY_FAILED);
}

// =========================================================================
// Billing
// =========================================================================

fn bill(store: &clinic_desk_core::LocalStore, patient_id: &str, amounts: &[(i64, bool)]) -> Vec<String> {
    let visit = store
        .insert_visit(&NewVisit {
            patient_id: patient_id.to_string(),
            assignment: Assignment::Lab,
            vitals: Vitals::default(),
        })
        .unwrap();
    amounts
        .iter()
        .map(|&(amount, paid)| {
            let invoice = store.issue_invoice(&visit.id, Decimal::new(amount, 0), 1).unwrap();
            if paid {
                store.set_payment_status(&invoice.id, PaymentStatus::Paid).unwrap();
            }
            invoice.id
        })
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_revenue_counts_paid_invoices_only() {
    let (store, api) = flaky_store();
    let patient = seed_patients(&store, 1).remove(0);
    bill(&store, &patient.id, &[(500, true), (300, false), (200, true)]);

    let desk = mount(api).await;
    assert_eq!(desk.stats().snapshot().today_revenue, Decimal::new(700, 0));
}

#[tokio::test(start_paused = true)]
async fn test_collect_payment_is_one_way() {
    let (store, api) = flaky_store();
    let patient = seed_patients(&store, 1).remove(0);
    let invoices = bill(&store, &patient.id, &[(300, false)]);
    let desk = mount(api).await;

    assert!(desk.history().open(patient.clone()).await);
    desk.history().select_tab(HistoryTab::Billing);

    let CollectOutcome::Collected(invoice) = desk.history().collect_payment(&invoices[0]).await
    else {
        panic!("pending invoice should be collectable");
    };
    assert_eq!(invoice.payment_status, PaymentStatus::Paid);
    assert_eq!(message(&desk), PAYMENT_COLLECTED);

    let HistoryView::Open(history) = desk.history().view() else {
        panic!("history should stay open");
    };
    assert_eq!(history.tab, HistoryTab::Billing);
    assert_eq!(history.invoices[0].payment_status, PaymentStatus::Paid);
    assert_eq!(
        desk.history().collect_payment(&invoices[0]).await,
        CollectOutcome::NotOffered
    );

    // No path back to pending, even below the desk
    assert!(store.set_payment_status(&invoices[0], PaymentStatus::Pending).is_err());

    desk.stats().refresh().await;
    assert_eq!(desk.stats().snapshot().today_revenue, Decimal::new(300, 0));
}

#[tokio::test(start_paused = true)]
async fn test_payment_failure_leaves_invoice_pending() {
    let (store, api) = flaky_store();
    let patient = seed_patients(&store, 1).remove(0);
    let invoices = bill(&store, &patient.id, &[(150, false)]);
    let desk = mount(api.clone()).await;
    desk.history().open(patient).await;
    api.fail(Op::MarkPaid);

    assert_eq!(
        desk.history().collect_payment(&invoices[0]).await,
        CollectOutcome::Failed
    );
    assert_eq!(message(&desk), PAYMENT_FAILED);
    let invoice = store.get_invoice(&invoices[0]).unwrap().unwrap();
    assert_eq!(invoice.payment_status, PaymentStatus::Pending);
}

#[tokio::test(start_paused = true)]
async fn test_declined_confirmation_changes_nothing() {
    let (store, api) = flaky_store();
    let patient = seed_patients(&store, 1).remove(0);
    let invoices = bill(&store, &patient.id, &[(150, false)]);
    let config = DeskConfig::new("http://127.0.0.1:8000/api/").unwrap();
    let desk = FrontDesk::mount(
        api.clone(),
        &PushHub::default(),
        &config,
        DeskServices::new(Arc::new(AutoConfirm(false))),
    )
    .await;
    desk.history().open(patient).await;

    assert_eq!(
        desk.history().collect_payment(&invoices[0]).await,
        CollectOutcome::Declined
    );
    assert_eq!(api.calls(Op::MarkPaid), 0);
}

#[tokio::test(start_paused = true)]
async fn test_history_failure_keeps_dialog_closed() {
    let (store, api) = flaky_store();
    let patient = seed_patients(&store, 1).remove(0);
    let desk = mount(api.clone()).await;
    api.fail(Op::ListInvoices);

    assert!(!desk.history().open(patient).await);
    assert_eq!(desk.history().view(), HistoryView::Closed);
    assert_eq!(message(&desk), "Could not fetch patient history.");
}

#[tokio::test(start_paused = true)]
async fn test_billing_statement_export() {
    let (store, api) = flaky_store();
    let patient = seed_patients(&store, 1).remove(0);
    bill(&store, &patient.id, &[(500, true), (300, false)]);
    let desk = mount(api).await;
    desk.history().open(patient).await;

    let statement = desk.billing_statement().unwrap();
    assert_eq!(statement.total_paid, Decimal::new(500, 0));
    assert_eq!(statement.total_outstanding, Decimal::new(300, 0));
    assert_eq!(statement.to_csv().lines().count(), 3);
}
