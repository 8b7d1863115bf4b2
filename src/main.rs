//! Liluxe Store - storefront and admin back end

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tower_http::services::ServeDir;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use liluxe_store::api::{self, AppState};
use liluxe_store::config::Config;
use liluxe_store::local::FileStore;
use liluxe_store::media::FsBlobStore;
use liluxe_store::services::events::{EventPublisher, LogPublisher, NatsPublisher};
use liluxe_store::store::{DocumentStore, MemoryStore, PgStore};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();

    let store: Arc<dyn DocumentStore> = match &config.database_url {
        Some(url) => {
            let pg = PgStore::connect(url).await?;
            pg.migrate().await?;
            Arc::new(pg)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, documents are kept in memory");
            Arc::new(MemoryStore::new())
        }
    };

    let events: Arc<dyn EventPublisher> = match &config.nats_url {
        Some(url) => match async_nats::connect(url.as_str()).await {
            Ok(client) => Arc::new(NatsPublisher::new(client, "liluxe")),
            Err(e) => {
                tracing::warn!(error = %e, "NATS unavailable, events will only be logged");
                Arc::new(LogPublisher)
            }
        },
        None => Arc::new(LogPublisher),
    };

    let local = Arc::new(FileStore::open(&config.data_dir)?);
    let blobs = Arc::new(FsBlobStore::new(&config.media_dir, &config.media_base_url));
    let state = AppState::new(store, local, blobs, events, &config.store_contact, config.products_per_page);

    api::spawn_session_sweeper(state.sessions.clone(), Duration::from_secs(5 * 60));

    let mut app = api::router(state);
    if config.media_base_url.starts_with('/') && config.media_base_url.len() > 1 {
        app = app.nest_service(&config.media_base_url, ServeDir::new(&config.media_dir));
    }

    let addr = config.socket_addr();
    tracing::info!("🚀 Liluxe Store listening on {}", addr);
    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;
    Ok(())
}
