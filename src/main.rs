//! OpenSASE Storefront - cart and order service

use anyhow::Result;
use opensase_storefront::config::Config;
use opensase_storefront::http::{router, AppState};
use opensase_storefront::infrastructure::{EventSink, InMemoryStore, PgStore};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();
    let config = Config::from_env()?;

    let nats = match &config.nats_url {
        Some(url) => match async_nats::connect(url.as_str()).await {
            Ok(client) => Some(client),
            Err(e) => { tracing::warn!(error = %e, "NATS unavailable, domain events will only be logged"); None }
        },
        None => None,
    };
    let events = EventSink::new(nats);

    let state = match &config.database_url {
        Some(url) => {
            let db = PgPoolOptions::new().max_connections(config.max_connections).connect(url).await?;
            if config.run_migrations { sqlx::migrate!("./migrations").run(&db).await?; }
            AppState::new(Arc::new(PgStore::new(db)), events)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using the in-memory store");
            let store = match &config.seed_file {
                Some(path) => InMemoryStore::from_seed_file(path)?,
                None => InMemoryStore::new(),
            };
            AppState::new(Arc::new(store), events)
        }
    };

    let app = router(state);
    tracing::info!("🚀 OpenSASE Storefront listening on 0.0.0.0:{}", config.port);
    axum::serve(tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?, app).await?;
    Ok(())
}
