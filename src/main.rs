use std::{sync::Arc, time::Duration};

use anyhow::Context;
use axum::http::HeaderValue;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use showtrack_api::{
    config::Config,
    db::{create_pool, create_redis_client, run_migrations, Cache, PgUserStore, UserStore},
    middleware::make_span_with_user,
    routes::{create_router, AppState},
    services::{EnrichmentEngine, GenreTable, ShowCatalog, StatusWriter, TmdbCatalog},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("showtrack_api=info,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;

    let pool = create_pool(&config.database_url, config.database_max_connections).await?;
    run_migrations(&pool).await?;

    let redis_client = create_redis_client(&config.redis_url)?;
    let (cache, cache_writer) = Cache::new(redis_client).await;

    let catalog: Arc<dyn ShowCatalog> = Arc::new(TmdbCatalog::new(
        cache,
        config.tmdb_api_key.clone(),
        config.tmdb_api_url.clone(),
        config.tmdb_image_url.clone(),
    ));
    let store: Arc<dyn UserStore> = Arc::new(PgUserStore::new(pool));

    let (status_queue, status_writer) = StatusWriter::spawn(Arc::clone(&store));
    let engine = Arc::new(EnrichmentEngine::new(
        Arc::clone(&catalog),
        Arc::clone(&store),
        status_queue,
    ));

    let genres = Arc::new(GenreTable::load(catalog.as_ref()).await);
    tracing::info!(genres = genres.len().await, "Genre table ready");
    let genre_refresh = GenreTable::spawn_refresh(
        Arc::clone(&genres),
        Arc::clone(&catalog),
        Duration::from_secs(config.genre_refresh_secs),
    );

    let state = AppState {
        store,
        catalog,
        engine,
        genres,
    };

    let cors = match &config.allowed_origin {
        Some(origin) => CorsLayer::new()
            .allow_origin(
                origin
                    .parse::<HeaderValue>()
                    .context("ALLOWED_ORIGIN is not a valid header value")?,
            )
            .allow_methods(Any)
            .allow_headers(Any),
        None => CorsLayer::permissive(),
    };

    let app = create_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http().make_span_with(make_span_with_user))
            .layer(cors),
    );

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(%addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    genre_refresh.abort();
    status_writer.shutdown().await;
    cache_writer.shutdown().await;
    tracing::info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}
