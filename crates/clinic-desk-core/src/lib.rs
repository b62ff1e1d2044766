//! Clinic Desk Core Library
//!
//! Front-desk workflow orchestration for a clinic operations console: patient registration,
//! visit triage and routing, dashboard statistics and billing collection.
//!
//! # Architecture
//!
//! ```text
//!                 ┌──────────────────── FrontDesk ────────────────────┐
//!                 │                                                   │
//!   PatientDirectory   StatsAggregator   VisitAssignmentFlow   HistoryAggregator
//!          │                 │                    │                    │
//!          └────────┬────────┘                    │                    │
//!                LiveSync ◄── timer (Scheduler)   │                    │
//!                   ▲                             │                    │
//!                   └── push (PushHub) "visit_update"                  │
//!                                                 │                    │
//!                 ┌───────────────────────────────▼────────────────────▼┐
//!                 │      ClinicApi: HttpApi (server) | LocalStore       │
//!                 └─────────────────────────────────────────────────────┘
//! ```
//!
//! # Core Principle
//!
//! **Nothing the desk does is fatal.** A failed read or write leaves the last good state on
//! screen and posts a notification; the operator can always retry.
//!
//! # Modules
//!
//! - [`models`]: Domain types (Patient, Visit, Invoice, StatsSnapshot, ...)
//! - [`api`]: Data API contract and HTTP client
//! - [`store`]: SQLite-backed local implementation of the data API
//! - [`desk`]: The orchestration components and the [`FrontDesk`] that mounts them
//! - [`validation`], [`pagination`], [`notify`], [`schedule`]: Building blocks
//! - [`export`]: Patient and billing CSV/JSON export

pub mod api;
pub mod clock;
pub mod config;
pub mod desk;
pub mod export;
pub mod models;
pub mod notify;
pub mod pagination;
pub mod schedule;
pub mod store;
pub mod validation;

// Re-export commonly used types
pub use api::{ApiError, ClinicApi, HttpApi};
pub use config::{ConfigError, DeskConfig};
pub use desk::{AutoConfirm, Confirmer, DeskServices, FrontDesk};
pub use models::{Department, Invoice, Patient, PaymentStatus, StatsSnapshot, Visit};
pub use notify::{Notification, NotificationKind, NotificationQueue};
pub use store::{LocalStore, StoreError};

use std::sync::Arc;

use clinic_desk_push::PushError;

// =========================================================================
// Top-level Error Type
// =========================================================================

#[derive(Debug, thiserror::Error)]
pub enum DeskError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Push channel error: {0}")]
    Push(#[from] PushError),
}

pub type DeskResult<T> = Result<T, DeskError>;

/// Open the data API named by `config`: the local store when a database path is set,
/// otherwise the clinic server.
pub fn open_api(config: &DeskConfig) -> DeskResult<Arc<dyn ClinicApi>> {
    match config.local_db() {
        Some(path) => {
            tracing::info!(path = %path.display(), "using local store");
            Ok(Arc::new(LocalStore::open(path)?))
        }
        None => {
            tracing::info!(url = config.api_url(), "using clinic server");
            Ok(Arc::new(HttpApi::new(config)?))
        }
    }
}
