//! Chatter server entry point: wires all crates together and starts the
//! HTTP/WebSocket server.

use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt};

use chatter_core::config::AppConfig;
use chatter_core::error::AppError;

#[tokio::main]
async fn main() {
    let env = std::env::var("CHATTER_ENV").unwrap_or_else(|_| "development".to_string());

    let config = match AppConfig::load(&env) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Failed to load configuration: {err}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(err) = run(config).await {
        tracing::error!("Server error: {err}");
        std::process::exit(1);
    }
}

/// Initialize tracing output per the logging configuration.
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt().pretty().with_env_filter(filter).with_target(true).init();
        }
    }
}

async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting Chatter v{}", env!("CARGO_PKG_VERSION"));

    tracing::info!("Connecting to database...");
    let database = chatter_database::connection::DatabasePool::connect(&config.database).await?;
    let db_pool = database.into_pool();

    tracing::info!("Running database migrations...");
    chatter_database::migration::run_migrations(&db_pool).await?;
    tracing::info!("Database migrations complete");

    let user_repo = Arc::new(chatter_database::repositories::user::UserRepository::new(
        db_pool.clone(),
    ));
    let group_repo = Arc::new(chatter_database::repositories::group::GroupRepository::new(
        db_pool.clone(),
    ));
    let message_repo = Arc::new(
        chatter_database::repositories::message::MessageRepository::new(db_pool.clone()),
    );

    let password_hasher = Arc::new(chatter_auth::password::hasher::PasswordHasher::new());
    let jwt_encoder = Arc::new(chatter_auth::jwt::encoder::JwtEncoder::new(&config.auth));
    let jwt_decoder = Arc::new(chatter_auth::jwt::decoder::JwtDecoder::new(&config.auth));

    tracing::info!("Initializing realtime engine...");
    let identity_store = Arc::new(chatter_database::store_impl::PgIdentityStore::new(
        chatter_database::repositories::user::UserRepository::new(db_pool.clone()),
        chatter_database::repositories::group::GroupRepository::new(db_pool.clone()),
    ));
    let message_store = Arc::new(chatter_database::store_impl::PgMessageStore::new(
        chatter_database::repositories::message::MessageRepository::new(db_pool.clone()),
    ));
    let engine = Arc::new(chatter_realtime::engine::ChatEngine::new(
        config.realtime.clone(),
        identity_store,
        message_store,
    ));

    let addr = format!("{}:{}", config.server.host, config.server.port);

    let app_state = chatter_api::state::AppState {
        config: Arc::new(config),
        db_pool,
        jwt_encoder,
        jwt_decoder,
        password_hasher,
        engine,
        user_repo,
        group_repo,
        message_repo,
    };

    let app = chatter_api::router::build_router(app_state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;

    tracing::info!("Chatter server listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            shutdown_signal().await;
            tracing::info!("Shutdown signal received, starting graceful shutdown...");
        })
        .await
        .map_err(|e| AppError::internal(format!("Server error: {e}")))?;

    tracing::info!("Chatter server shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!("Failed to install SIGTERM handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
