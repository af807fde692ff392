use std::sync::Arc;

use anyhow::Context;
use dotenv::dotenv;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use slotlink::app;
use slotlink::app_state::AppState;
use slotlink::calendar::{CalendarWriter, HttpCalendarWriter};
use slotlink::config;
use slotlink::db;
use slotlink::modules::scheduling::SchedulingService;
use slotlink::notify::{HttpNotifier, NoopNotifier, Notifier};
use slotlink::store::PgStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}=debug", env!("CARGO_CRATE_NAME")).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenv().ok();

    let config = config::init()?;
    let pool = db::init_pool().await?;

    let store = Arc::new(PgStore::new(pool.clone()));
    let notifier: Arc<dyn Notifier> = match &config.notifier {
        Some(cfg) => Arc::new(HttpNotifier::new(cfg.endpoint.clone())),
        None => Arc::new(NoopNotifier),
    };
    let calendar: Option<Arc<dyn CalendarWriter>> = config.calendar.as_ref().map(|cfg| {
        Arc::new(HttpCalendarWriter::new(cfg.endpoint.clone())) as Arc<dyn CalendarWriter>
    });

    let scheduling = Arc::new(SchedulingService::new(
        store,
        notifier,
        calendar,
        config.app.public_base_url.clone(),
        config.scheduling.request_expiry_days,
    ));

    let state = AppState::new(pool, config.clone(), scheduling);
    let app = app::create_router(state);

    let addr = config.server_addr();
    info!("{} listening on {}", config.app.name, addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .await
        .context("Failed to serve application")?;

    Ok(())
}
