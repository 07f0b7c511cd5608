//! CropWatch Server: proximity alert fanout and live notification delivery.
//!
//! Main entry point that wires all crates together and starts the server.

use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt};

use cropwatch_api::state::AppState;
use cropwatch_auth::identity::IdentityResolver;
use cropwatch_auth::jwt::JwtDecoder;
use cropwatch_core::config::{AppConfig, DatabaseProvider, RealtimeConfig, TransportKind};
use cropwatch_core::error::AppError;
use cropwatch_database::DatabasePool;
use cropwatch_entity::traits::{ApiTokenStore, NotificationStore, UserDirectory};
use cropwatch_realtime::channel::{GroupRegistry, MemoryGroupRegistry};
use cropwatch_realtime::server::RealtimeEngine;
use cropwatch_service::{AlertFanoutOrchestrator, NotificationComposer, ProximitySearch};

#[tokio::main]
async fn main() {
    let env = std::env::var("CROPWATCH_ENV").unwrap_or_else(|_| "development".to_string());
    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);
    tracing::info!(env = %env, "Configuration loaded");

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
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
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Collaborator backends selected by `database.provider`.
struct Backends {
    pool: Option<DatabasePool>,
    users: Arc<dyn UserDirectory>,
    notifications: Arc<dyn NotificationStore>,
    tokens: Arc<dyn ApiTokenStore>,
}

async fn init_backends(config: &AppConfig) -> Result<Backends, AppError> {
    match config.database.provider {
        DatabaseProvider::Memory => {
            tracing::warn!("Using in-memory backends; data is lost on restart");
            Ok(Backends {
                pool: None,
                users: Arc::new(cropwatch_database::MemoryUserDirectory::new()),
                notifications: Arc::new(cropwatch_database::MemoryNotificationStore::new()),
                tokens: Arc::new(cropwatch_database::MemoryApiTokenStore::new()),
            })
        }
        DatabaseProvider::Postgres => {
            let pool = DatabasePool::connect(&config.database).await?;
            let pg = pool.pool().clone();
            Ok(Backends {
                users: Arc::new(cropwatch_database::UserRepository::new(pg.clone())),
                notifications: Arc::new(cropwatch_database::NotificationRepository::new(
                    pg.clone(),
                )),
                tokens: Arc::new(cropwatch_database::ApiTokenRepository::new(pg)),
                pool: Some(pool),
            })
        }
    }
}

/// Group registry selected by `realtime.transport`.
struct Transport {
    registry: Arc<dyn GroupRegistry>,
    /// Stops the cross-node listener, if any.
    stop: Box<dyn FnOnce() + Send>,
}

impl Transport {
    fn memory() -> Self {
        Self {
            registry: Arc::new(MemoryGroupRegistry::new()),
            stop: Box::new(|| {}),
        }
    }
}

#[cfg(feature = "redis-pubsub")]
async fn init_transport(config: &RealtimeConfig) -> Result<Transport, AppError> {
    match config.transport {
        TransportKind::Memory => Ok(Transport::memory()),
        TransportKind::Redis => {
            let registry = Arc::new(
                cropwatch_realtime::bridge::RedisGroupRegistry::connect(
                    &config.redis_url,
                    config.redis_channel_prefix.clone(),
                )
                .await?,
            );
            registry.start().await?;
            let listener = Arc::clone(&registry);
            Ok(Transport {
                registry,
                stop: Box::new(move || listener.stop()),
            })
        }
    }
}

#[cfg(not(feature = "redis-pubsub"))]
async fn init_transport(config: &RealtimeConfig) -> Result<Transport, AppError> {
    match config.transport {
        TransportKind::Memory => Ok(Transport::memory()),
        TransportKind::Redis => Err(AppError::configuration(
            "realtime.transport = \"redis\" requires the redis-pubsub feature",
        )),
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting CropWatch v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Backends ─────────────────────────────────────────
    tracing::info!(provider = ?config.database.provider, "Initializing backends...");
    let backends = init_backends(&config).await?;

    // ── Step 2: Connection authentication ────────────────────────
    let jwt_decoder = JwtDecoder::new(&config.auth)?;
    let resolver = IdentityResolver::new(
        Arc::clone(&backends.tokens),
        jwt_decoder,
        Arc::clone(&backends.users),
    );

    // ── Step 3: Realtime engine ──────────────────────────────────
    tracing::info!(transport = ?config.realtime.transport, "Initializing realtime engine...");
    let transport = init_transport(&config.realtime).await?;
    let realtime = RealtimeEngine::new(
        config.realtime.clone(),
        resolver.clone(),
        Arc::clone(&transport.registry),
    );

    // ── Step 4: Alert fanout ─────────────────────────────────────
    let orchestrator = AlertFanoutOrchestrator::new(
        ProximitySearch::new(
            Arc::clone(&backends.users),
            config.fanout.proximity_max_results,
        ),
        NotificationComposer::new(Arc::clone(&backends.notifications)),
        Arc::new(realtime.broker.clone()),
        config.fanout.clone(),
    );

    // ── Step 5: Build and start HTTP server ──────────────────────
    let app_state = AppState {
        config: Arc::new(config.clone()),
        db_pool: backends.pool,
        resolver,
        orchestrator: Arc::new(orchestrator),
        realtime: realtime.clone(),
    };

    let app = cropwatch_api::build_router(app_state);

    let addr = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;

    tracing::info!(
        "CropWatch server listening on {} (notifications at {})",
        addr,
        config.realtime.path
    );

    // ── Step 6: Graceful shutdown ────────────────────────────────
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            tracing::info!("Shutdown signal received, closing connections...");
            let closed = realtime.shutdown();
            tracing::info!(closed, "Notification sockets asked to close");
            (transport.stop)();
        })
        .await
        .map_err(|e| AppError::internal(format!("Server error: {e}")))?;

    tracing::info!("CropWatch server shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
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
