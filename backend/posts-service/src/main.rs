use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::Context;
use crypto_core::JwtKeys;
use posts_service::config::{Config, StoreBackend};
use posts_service::db::{create_pool, MemoryStore, PgStore, Store};
use posts_service::handlers::{self, AppState};
use posts_service::services::{geocoding, FileStorage, Geocoder, LocalFileStorage};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = terminate.recv() => {},
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "SIGTERM handler unavailable, waiting for Ctrl+C");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,actix_web=info,sqlx=warn".into());
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn open_store(config: &Config) -> anyhow::Result<Arc<dyn Store>> {
    match config.store.backend {
        StoreBackend::Postgres => {
            let pool = create_pool(&config.database)
                .await
                .context("failed to create database pool")?;
            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .context("failed to run database migrations")?;
            tracing::info!("Connected to PostgreSQL, migrations applied");
            Ok(Arc::new(PgStore::new(pool)))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

/// Posts Service
///
/// # Routes
///
/// - `/api/users/*` - list, signup, login, update own profile
/// - `/api/posts/*` - read posts, owner-only create/update/delete
/// - `/api/health` - store liveness
/// - `/metrics` - Prometheus metrics
#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let config = Config::from_env()
        .map_err(anyhow::Error::msg)
        .context("configuration loading failed")?;

    tracing::info!("Starting posts-service v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(env = %config.app.env, store = ?config.store.backend, "configuration loaded");

    let keys = Arc::new(JwtKeys::from_secret(&config.jwt.secret));
    let store = open_store(&config).await?;
    let geocoder: Arc<dyn Geocoder> = Arc::from(
        geocoding::from_config(&config.geocoding).context("failed to build geocoder")?,
    );
    let files: Arc<dyn FileStorage> = Arc::new(LocalFileStorage::new(
        &config.uploads.dir,
        config.uploads.max_bytes,
    ));

    let state = web::Data::new(AppState::new(
        store,
        geocoder,
        files,
        keys.clone(),
        Duration::from_millis(config.store.transaction_timeout_ms),
        config.uploads.max_bytes,
    ));

    let bind_address = format!("{}:{}", config.app.host, config.app.port);
    tracing::info!("Starting HTTP server at {}", bind_address);

    let cors_config = config.cors.clone();
    let server = HttpServer::new(move || {
        let mut cors = Cors::default();
        for origin in cors_config.origins() {
            if origin == "*" {
                cors = cors.allow_any_origin();
            } else {
                cors = cors.allowed_origin(origin);
            }
        }
        cors = cors.allow_any_method().allow_any_header().max_age(3600);

        App::new()
            .app_data(state.clone())
            .wrap(cors)
            .wrap(Logger::default())
            .wrap(tracing_actix_web::TracingLogger::default())
            .route(
                "/metrics",
                web::get().to(posts_service::metrics::serve_metrics),
            )
            .configure(handlers::configure(keys.clone()))
    })
    .bind(&bind_address)
    .with_context(|| format!("failed to bind {}", bind_address))?
    .run();

    let server_handle = server.handle();
    let mut server_task = tokio::spawn(server);

    tokio::select! {
        result = &mut server_task => {
            result
                .context("HTTP server task panicked")?
                .context("HTTP server failed")?;
        }
        _ = shutdown_signal() => {
            tracing::info!("Shutdown signal received, draining connections");
            server_handle.stop(true).await;
            server_task
                .await
                .context("HTTP server task panicked")?
                .context("HTTP server failed")?;
        }
    }

    tracing::info!("posts-service stopped");
    Ok(())
}
