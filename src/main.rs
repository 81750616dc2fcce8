//! Bibliotek - library catalog and loan management service
//!
//! REST backend over PostgreSQL: book catalog with classifier relations,
//! physical copies, reader directory, and the borrow-record ledger.

mod api;
mod app;
mod config;
mod db;
mod error;

use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub use crate::app::AppState;
use crate::config::Config;
use crate::db::Database;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(Config::from_env()?);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bibliotek=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting bibliotek");

    // A bad column registry is a programming error; refuse to serve with one.
    db::query::registry::validate_all()?;

    let db = Database::connect(&config.database_url).await?;
    tracing::info!("Database connected");

    let state = AppState {
        config: config.clone(),
        db,
    };
    let app = app::build_app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
