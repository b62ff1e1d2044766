use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use clinic_desk_core::{open_api, AutoConfirm, DeskConfig, DeskServices, FrontDesk, NotificationKind};
use clinic_desk_push::PushHub;

/// Headless front desk.
///
/// Mounts the desk against the configured data API, keeps it live until interrupted, and logs
/// every notification the desk posts.
///
/// # Environment Variables
/// - `CLINIC_API_URL`: Clinic server base URL (default: "http://127.0.0.1:8000/api/")
/// - `CLINIC_API_TOKEN`: Bearer token for the clinic server
/// - `CLINIC_PUSH_URL`: Socket.IO server for live updates (needs the `socket` feature)
/// - `CLINIC_LOCAL_DB`: Serve the desk from a local SQLite file instead of the server
/// - `CLINIC_POLL_SECS`, `CLINIC_TOAST_SECS`, `CLINIC_STATS_ATTEMPTS`, `CLINIC_TIMEOUT_SECS`
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("clinic_desk=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = DeskConfig::from_env()?;
    let api = open_api(&config)?;
    let hub = PushHub::default();

    #[cfg(feature = "socket")]
    let _transport = match config.push_url() {
        Some(url) => match clinic_desk_push::socket::connect(url, hub.clone()).await {
            Ok(transport) => Some(transport),
            Err(e) => {
                tracing::warn!(error = %e, "push channel unavailable, polling only");
                None
            }
        },
        None => None,
    };

    let desk = FrontDesk::mount(
        api,
        &hub,
        &config,
        DeskServices::new(Arc::new(AutoConfirm(false))),
    )
    .await;

    let view = desk.directory().view();
    let stats = desk.stats().snapshot();
    tracing::info!(
        patients = view.page.total_count(),
        pages = view.page.total_pages(),
        new_today = stats.new_patients_today,
        active_visits = stats.active_visits,
        revenue = %stats.today_revenue,
        "++ Front desk ready"
    );

    let mut notices = desk.notices().subscribe();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = notices.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = notices.borrow_and_update().clone();
                if let Some(notice) = current {
                    match notice.kind {
                        NotificationKind::Success => tracing::info!(message = %notice.message, "notice"),
                        NotificationKind::Error => tracing::warn!(message = %notice.message, "notice"),
                    }
                }
            }
        }
    }

    desk.teardown();
    Ok(())
}
