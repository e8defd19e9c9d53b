use anyhow::{Context, Result};
use movie_stream::{
    config::{AppConfig, StorageBackend},
    routes::routes::app,
    services::{
        catalog::SqliteMovieCatalog,
        local_store::LocalObjectStore,
        object_store::ObjectStore,
        s3_store::S3ObjectStore,
        streaming_service::{StreamSettings, StreamingService},
        url_signer::UrlSigner,
    },
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::{fs, io::ErrorKind, path::Path, str::FromStr, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config + migrate flag ---
    let (cfg, migrate) = AppConfig::from_env_and_args()?;

    tracing::info!(
        addr = %cfg.addr(),
        backend = ?cfg.backend,
        public_url = %cfg.public_url,
        qualities = ?cfg.qualities,
        "Starting movie-stream"
    );

    // --- Initialize SQLite catalog ---
    let db_url = &cfg.database_url;
    let db_path = db_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .trim_start_matches("file:");
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
            tracing::info!("Created missing directory {:?}", parent);
        }
    }

    let connect_options = SqliteConnectOptions::from_str(db_url)
        .with_context(|| format!("parsing database url `{}`", db_url))?
        .create_if_missing(true);
    let db = Arc::new(
        SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?,
    );
    let catalog = SqliteMovieCatalog::new(db);

    // --- Handle migration mode ---
    if migrate {
        catalog.migrate().await?;
        tracing::info!("Database migration complete.");
        return Ok(()); // exit after migration
    }

    // --- Initialize object store ---
    let signer = Arc::new(match cfg.signing_secret.as_deref() {
        Some(secret) => UrlSigner::new(secret.as_bytes().to_vec(), cfg.public_url.clone()),
        None => {
            tracing::warn!(
                "MOVIE_STREAM_SIGNING_SECRET not set; signed URLs will not survive a restart"
            );
            UrlSigner::ephemeral(cfg.public_url.clone())
        }
    });

    let store: Arc<dyn ObjectStore> = match cfg.backend {
        StorageBackend::Local => {
            if !Path::new(&cfg.storage_dir).exists() {
                fs::create_dir_all(&cfg.storage_dir)?;
                tracing::info!("Created storage directory at {}", cfg.storage_dir);
            }
            Arc::new(LocalObjectStore::new(&cfg.storage_dir, signer.clone()))
        }
        StorageBackend::S3 => {
            let bucket = cfg
                .s3_bucket
                .clone()
                .context("MOVIE_STREAM_S3_BUCKET is required for the s3 backend")?;
            Arc::new(S3ObjectStore::new(bucket, cfg.s3_region.clone(), cfg.s3_endpoint.clone()).await)
        }
    };

    // --- Initialize core service ---
    let service = StreamingService::new(
        store,
        Arc::new(catalog),
        signer,
        StreamSettings::from(&cfg),
    );

    // --- Build router ---
    let router = app(service);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received; draining connections");
}
