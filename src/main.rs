//! Nabaat Store - plant shop backend

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use nabaat_store::api::{self, AppState};
use nabaat_store::publisher::EventPublisher;
use nabaat_store::{CatalogService, Config, OrderService, PgStore};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();

    let config = Config::from_env()?;
    let db = PgPoolOptions::new().max_connections(config.max_connections).connect(&config.database_url).await?;
    sqlx::migrate!("./migrations").run(&db).await?;
    let store = PgStore::new(db);

    let state = AppState {
        orders: OrderService::new(store.clone(), config.inventory_policy),
        catalog: CatalogService::new(store),
        publisher: EventPublisher::connect(config.nats_url.as_deref()).await,
        currency: config.currency.clone(),
    };
    let app = api::router(state).layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive());

    tracing::info!(port = config.port, policy = ?config.inventory_policy, "nabaat-store listening on 0.0.0.0:{}", config.port);
    axum::serve(tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?, app).await?;
    Ok(())
}
