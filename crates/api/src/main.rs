use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use ledgerwell_api::background;
use ledgerwell_api::config::ServerConfig;
use ledgerwell_api::engine::session_completion::SessionCompletionEngine;
use ledgerwell_api::router::build_app_router;
use ledgerwell_api::state::AppState;
use ledgerwell_integrations::cache::{
    MemorySubscriptionCache, RedisSubscriptionCache, SubscriptionCache,
};
use ledgerwell_integrations::calendar::GoogleCalendarClient;
use ledgerwell_integrations::identity::HttpIdentityProvider;
use ledgerwell_integrations::payments::stripe::StripeClient;
use ledgerwell_integrations::storage::{MemoryStorage, ObjectStorage, S3Storage};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    // LOG_FORMAT=json switches to machine-readable output.
    let fmt_layer = if std::env::var("LOG_FORMAT").is_ok_and(|v| v == "json") {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ledgerwell_api=debug,tower_http=debug".into()),
        )
        .with(fmt_layer)
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = ledgerwell_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    ledgerwell_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    ledgerwell_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Integrations ---
    let http = ledgerwell_integrations::http_client();

    let subscription_cache: Arc<dyn SubscriptionCache> = match &config.cache.redis_url {
        Some(url) => {
            let cache = RedisSubscriptionCache::from_url(url, config.cache.ttl_secs)
                .expect("Failed to create Redis pool");
            tracing::info!("Subscription cache: redis");
            Arc::new(cache)
        }
        None => {
            tracing::warn!("REDIS_URL not set, using in-process subscription cache");
            Arc::new(MemorySubscriptionCache::new(config.cache.ttl_secs))
        }
    };

    let storage: Arc<dyn ObjectStorage> = match &config.s3_bucket {
        Some(bucket) => {
            tracing::info!(bucket = %bucket, "Document storage: s3");
            Arc::new(S3Storage::from_env(bucket.clone()).await)
        }
        None => {
            tracing::warn!("S3_BUCKET not set, using in-process document storage");
            Arc::new(MemoryStorage::new())
        }
    };

    if config.payments.secret_key.is_none() {
        tracing::warn!("PAYMENTS_SECRET_KEY not set, payment calls will fail");
    }
    let payments = Arc::new(StripeClient::new(
        http.clone(),
        config.payments.api_url.clone(),
        config.payments.secret_key.clone(),
    ));
    let identity = Arc::new(HttpIdentityProvider::new(
        http.clone(),
        config.identity.api_url.clone(),
        config.identity.secret_key.clone(),
    ));
    let calendar = Arc::new(GoogleCalendarClient::new(http, config.calendar.clone()));
    tracing::info!("Integration clients created");

    // --- Event bus ---
    let event_bus = Arc::new(ledgerwell_events::EventBus::default());
    let cancel = CancellationToken::new();

    let logger_handle = tokio::spawn(ledgerwell_events::EventLogger::run(
        event_bus.subscribe(),
        cancel.clone(),
    ));
    tracing::info!("Event bus created");

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        event_bus: Arc::clone(&event_bus),
        payments,
        subscription_cache,
        identity,
        calendar,
        storage,
    };

    // --- Session completion loop ---
    let completion_handle = if config.session_completion_interval_secs > 0 {
        let engine = SessionCompletionEngine::from_state(&state);
        Some(tokio::spawn(background::session_completion::run(
            engine,
            Duration::from_secs(config.session_completion_interval_secs),
            cancel.clone(),
        )))
    } else {
        tracing::info!("In-process session completion disabled, relying on cron endpoint");
        None
    };

    // --- Router ---
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    cancel.cancel();
    if let Some(handle) = completion_handle {
        let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
        tracing::info!("Session completion job stopped");
    }

    drop(event_bus);
    let _ = tokio::time::timeout(Duration::from_secs(5), logger_handle).await;
    tracing::info!("Event logger shut down");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT or SIGTERM to initiate graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
