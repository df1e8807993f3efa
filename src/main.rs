use api_rest::{build_router, AppState, RestConfig};
use api_shared::{api_prefix_from_env_value, TokenAuthenticator};
use nicu_core::config::{database_path_from_env_value, page_size_from_env_value};
use nicu_core::{CoreConfig, Database};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the NICU server
///
/// Opens (creating if needed) the SQLite database and serves the REST API.
///
/// # Environment Variables
/// - `NICU_REST_ADDR`: REST server address (default: "0.0.0.0:8000")
/// - `NICU_DATABASE_PATH`: SQLite database file (default: "nicu.sqlite3")
/// - `NICU_API_PREFIX`: Mount point of the record endpoints (default: "/api")
/// - `NICU_API_TOKENS`: Comma-separated bearer tokens accepted by the API
/// - `NICU_PAGE_SIZE`: Default page size for paginated lists (default: 20)
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - configuration values are invalid,
/// - the database cannot be opened, or
/// - the server address cannot be bound.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("nicu_run=info".parse()?)
                .add_directive("nicu_core=info".parse()?)
                .add_directive("api_rest=info".parse()?)
                .add_directive("tower_http=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("NICU_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".into());

    let database_path = database_path_from_env_value(std::env::var("NICU_DATABASE_PATH").ok());
    let page_size = page_size_from_env_value(std::env::var("NICU_PAGE_SIZE").ok())?;
    let cfg = Arc::new(CoreConfig::new(database_path, page_size)?);

    let rest_cfg = RestConfig::new(
        &api_prefix_from_env_value(std::env::var("NICU_API_PREFIX").ok()),
        env!("CARGO_PKG_VERSION"),
    );

    let auth = TokenAuthenticator::from_env_value(std::env::var("NICU_API_TOKENS").ok());
    if auth.is_empty() {
        tracing::warn!("NICU_API_TOKENS is not set; every record request will be rejected");
    }

    let db = Database::open(cfg.database_path())?;
    tracing::info!("++ Using database {}", cfg.database_path().display());

    let api_prefix = rest_cfg.api_prefix().to_string();
    let app = build_router(AppState::new(cfg, db, rest_cfg, Arc::new(auth)));

    tracing::info!("++ Starting NICU REST on {} (API at {}/)", rest_addr, api_prefix);

    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
