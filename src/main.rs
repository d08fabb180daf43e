use receptionist_rs::config::Config;
use receptionist_rs::memory_store::MemoryStore;
use receptionist_rs::store::{PgStore, Store};
use receptionist_rs::types::AppState;
use receptionist_rs::vendor::BlandClient;

use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() {
    // A missing .env file is fine; the environment may already be populated.
    let _ = dotenvy::dotenv();
    let config = Config::from_env().expect("invalid configuration");

    let subscriber = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_file(true)
                .with_line_number(true),
        )
        .with(tracing_subscriber::filter::Targets::new().with_targets([
            ("hyper", tracing_subscriber::filter::LevelFilter::OFF),
            ("receptionist_rs", config.log_level),
        ]));
    tracing::subscriber::set_global_default(subscriber).unwrap();

    let store: Arc<dyn Store> = match &config.database_url {
        Some(database_url) => {
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(database_url)
                .await
                .expect("failed to connect to database");
            let store = PgStore::new(pool);
            sqlx::migrate!("./migrations")
                .run(store.pool())
                .await
                .expect("failed to run migrations");
            info!("connected to database");
            Arc::new(store)
        }
        None => {
            warn!("DATABASE_URL not set; using in-memory store, data will not survive a restart");
            Arc::new(MemoryStore::new())
        }
    };
    let vendor = BlandClient::new(
        &config.bland_api_url,
        &config.bland_api_key,
        config.vendor_timeout,
    )
    .expect("failed to build vendor client");

    let listen_addr = config.listen_addr;
    let app_state = Arc::new(AppState::new(config, store, Arc::new(vendor)));
    let app = receptionist_rs::app(app_state);

    info!(addr=%listen_addr, "listening");
    axum::Server::bind(&listen_addr)
        .serve(app.into_make_service())
        .await
        .unwrap();
}
