use std::sync::Arc;

use sonicwave_server::config::AppConfig;
use sonicwave_server::database::init_db;
use sonicwave_server::external::{DisabledMailer, Mailer, SmtpMailer};
use sonicwave_server::seed::{ensure_indexes, seed_owner};
use sonicwave_server::state::AppState;
use sonicwave_server::{build_router, maintenance};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn")),
        )
        .init();

    let config = AppConfig::load()?;

    let db = init_db(&config.database.url).await?;
    ensure_indexes(&db).await?;
    seed_owner(&db, config.owner.as_ref()).await?;

    let mailer: Arc<dyn Mailer> = match &config.smtp {
        Some(smtp) => Arc::new(SmtpMailer::new(smtp)?),
        None => {
            warn!("No [smtp] section configured; one-time passwords cannot be sent");
            Arc::new(DisabledMailer)
        }
    };

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(db, config, mailer).await?;
    maintenance::spawn_all(&state);

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server running at http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
