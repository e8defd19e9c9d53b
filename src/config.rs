use crate::models::media::is_valid_ident;
use anyhow::{Context, Result, bail};
use clap::Parser;
use std::{env, str::FromStr};

/// Upper bound for `MOVIE_STREAM_MAX_URL_TTL_HOURS`: seven days, the longest
/// lifetime S3 accepts for a presigned request.
pub const MAX_URL_TTL_CEILING_HOURS: f64 = 168.0;

/// Which object store serves the media objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Local,
    S3,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "s3" => Ok(Self::S3),
            other => bail!("unknown storage backend `{}` (expected `local` or `s3`)", other),
        }
    }
}

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub backend: StorageBackend,
    pub storage_dir: String,
    pub s3_bucket: Option<String>,
    pub s3_region: String,
    pub s3_endpoint: Option<String>,
    pub public_url: String,
    pub signing_secret: Option<String>,
    pub max_url_ttl_hours: f64,
    pub qualities: Vec<String>,
    pub default_quality: String,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Movie streaming service with HTTP range support")]
pub struct Args {
    /// Host to bind to (overrides MOVIE_STREAM_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides MOVIE_STREAM_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Catalog database URL (overrides MOVIE_STREAM_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Object store backend, `local` or `s3` (overrides MOVIE_STREAM_BACKEND)
    #[arg(long)]
    pub backend: Option<String>,

    /// Directory holding media objects for the local backend (overrides MOVIE_STREAM_STORAGE_DIR)
    #[arg(long)]
    pub storage_dir: Option<String>,

    /// Base URL clients use to reach this service (overrides MOVIE_STREAM_PUBLIC_URL)
    #[arg(long)]
    pub public_url: Option<String>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        let args = Args::parse();
        let migrate = args.migrate;
        let cfg = Self::from_sources(args, |name| env::var(name).ok())?;
        Ok((cfg, migrate))
    }

    /// Merge CLI args over values looked up with `var`, over defaults.
    pub fn from_sources(args: Args, var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let port = match args.port {
            Some(port) => port,
            None => match var("MOVIE_STREAM_PORT") {
                Some(value) => value
                    .parse::<u16>()
                    .with_context(|| format!("parsing MOVIE_STREAM_PORT value `{}`", value))?,
                None => 3000,
            },
        };

        let backend = match args.backend.or_else(|| var("MOVIE_STREAM_BACKEND")) {
            Some(value) => value.parse()?,
            None => StorageBackend::Local,
        };

        let max_url_ttl_hours = match var("MOVIE_STREAM_MAX_URL_TTL_HOURS") {
            Some(value) => value.parse::<f64>().with_context(|| {
                format!("parsing MOVIE_STREAM_MAX_URL_TTL_HOURS value `{}`", value)
            })?,
            None => 24.0,
        };
        if !max_url_ttl_hours.is_finite()
            || max_url_ttl_hours <= 0.0
            || max_url_ttl_hours > MAX_URL_TTL_CEILING_HOURS
        {
            bail!(
                "MOVIE_STREAM_MAX_URL_TTL_HOURS must be a positive number of at most {}",
                MAX_URL_TTL_CEILING_HOURS
            );
        }

        let qualities = parse_qualities(
            &var("MOVIE_STREAM_QUALITIES").unwrap_or_else(|| "480p,720p,1080p".into()),
        )?;
        let default_quality = var("MOVIE_STREAM_DEFAULT_QUALITY").unwrap_or_else(|| "720p".into());
        if !is_valid_ident(&default_quality) {
            bail!("invalid MOVIE_STREAM_DEFAULT_QUALITY `{}`", default_quality);
        }

        let s3_bucket = var("MOVIE_STREAM_S3_BUCKET");
        if backend == StorageBackend::S3 && s3_bucket.is_none() {
            bail!("MOVIE_STREAM_S3_BUCKET is required for the s3 backend");
        }

        let port_default_url = format!("http://localhost:{}", port);

        Ok(Self {
            host: args
                .host
                .or_else(|| var("MOVIE_STREAM_HOST"))
                .unwrap_or_else(|| "0.0.0.0".into()),
            port,
            database_url: args
                .database_url
                .or_else(|| var("MOVIE_STREAM_DATABASE_URL"))
                .unwrap_or_else(|| "sqlite://./data/meta/movies.db".into()),
            backend,
            storage_dir: args
                .storage_dir
                .or_else(|| var("MOVIE_STREAM_STORAGE_DIR"))
                .unwrap_or_else(|| "./data/objects".into()),
            s3_bucket,
            s3_region: var("MOVIE_STREAM_S3_REGION").unwrap_or_else(|| "us-east-1".into()),
            s3_endpoint: var("MOVIE_STREAM_S3_ENDPOINT"),
            public_url: args
                .public_url
                .or_else(|| var("MOVIE_STREAM_PUBLIC_URL"))
                .unwrap_or(port_default_url),
            signing_secret: var("MOVIE_STREAM_SIGNING_SECRET"),
            max_url_ttl_hours,
            qualities,
            default_quality,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_qualities(raw: &str) -> Result<Vec<String>> {
    let mut qualities = Vec::new();
    for label in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if !is_valid_ident(label) {
            bail!("invalid quality label `{}` in MOVIE_STREAM_QUALITIES", label);
        }
        if !qualities.iter().any(|q| q == label) {
            qualities.push(label.to_string());
        }
    }
    if qualities.is_empty() {
        bail!("MOVIE_STREAM_QUALITIES must list at least one quality");
    }
    Ok(qualities)
}
