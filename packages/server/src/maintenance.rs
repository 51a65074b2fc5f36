//! Background loops spawned at startup: session and one-time-password
//! sweeps, and periodic extractor self-updates.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use tracing::{error, info};

use crate::entity::one_time_password;
use crate::external::YtDlp;
use crate::session::SessionStore;
use crate::state::AppState;

const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);
const OTP_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Spawn every maintenance loop for `state`.
pub fn spawn_all(state: &AppState) {
    tokio::spawn(run_session_sweeper(state.sessions.clone()));
    tokio::spawn(run_otp_sweeper(state.db.clone()));

    let interval = state.config.tools.update_interval_secs;
    if interval > 0 {
        tokio::spawn(run_extractor_updater(
            state.extractor.clone(),
            Duration::from_secs(interval),
        ));
    } else {
        info!("Extractor self-update disabled");
    }
}

/// Delete expired sessions every hour.
pub async fn run_session_sweeper(sessions: Arc<dyn SessionStore>) {
    let mut interval = tokio::time::interval(SESSION_SWEEP_INTERVAL);
    loop {
        interval.tick().await;
        match sessions.purge_expired().await {
            Ok(0) => {}
            Ok(removed) => info!(removed, "Purged expired sessions"),
            Err(e) => error!(error = %e, "Session sweep failed"),
        }
    }
}

/// Delete expired one-time passwords every minute.
pub async fn run_otp_sweeper(db: DatabaseConnection) {
    let mut interval = tokio::time::interval(OTP_SWEEP_INTERVAL);
    loop {
        interval.tick().await;
        if let Err(e) = purge_expired_otps(&db).await {
            error!(error = %e, "One-time password sweep failed");
        }
    }
}

/// Remove one-time passwords past their expiry, returning how many were removed.
pub async fn purge_expired_otps(db: &DatabaseConnection) -> anyhow::Result<u64> {
    let result = one_time_password::Entity::delete_many()
        .filter(one_time_password::Column::ExpiresAt.lte(Utc::now()))
        .exec(db)
        .await?;
    if result.rows_affected > 0 {
        info!(removed = result.rows_affected, "Purged expired one-time passwords");
    }
    Ok(result.rows_affected)
}

/// Run `yt-dlp -U` on a fixed interval.
pub async fn run_extractor_updater(extractor: YtDlp, every: Duration) {
    info!(interval_secs = every.as_secs(), "Starting extractor self-updater");

    let mut interval = tokio::time::interval(every);
    loop {
        interval.tick().await;
        match extractor.self_update().await {
            Ok(output) => info!(output = %output.trim(), "Extractor self-update finished"),
            Err(e) => error!(error = %e, "Extractor self-update failed"),
        }
    }
}
