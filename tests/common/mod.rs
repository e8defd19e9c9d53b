#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Method, Request, Response},
};
use bytes::Bytes;
use http_body_util::BodyExt;
use movie_stream::{
    models::signed_url::SignedUrl,
    routes::routes::app,
    services::{
        catalog::SqliteMovieCatalog,
        memory_store::MemoryObjectStore,
        object_store::{ByteStream, ObjectStore, ObjectStoreError, ObjectStoreResult},
        streaming_service::{StreamSettings, StreamingService},
        url_signer::UrlSigner,
    },
};
use serde_json::Value;
use sqlx::sqlite::SqlitePoolOptions;
use std::{
    io,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};
use tower::ServiceExt;

pub const PUBLIC_URL: &str = "http://stream.test";
pub const DEMO_SIZE: usize = 1_000_000;

/// Deterministic, non-repeating-looking payload so slice mismatches show up.
pub fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| ((i * 31 + i / 251) % 256) as u8).collect()
}

pub fn settings() -> StreamSettings {
    StreamSettings {
        public_url: PUBLIC_URL.into(),
        qualities: vec!["480p".into(), "720p".into(), "1080p".into()],
        default_quality: "720p".into(),
        max_url_ttl_hours: 24.0,
    }
}

pub fn signer() -> Arc<UrlSigner> {
    Arc::new(UrlSigner::new(b"integration-secret".to_vec(), PUBLIC_URL))
}

pub async fn catalog(movies: &[&str]) -> SqliteMovieCatalog {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    let catalog = SqliteMovieCatalog::new(Arc::new(pool));
    catalog.migrate().await.unwrap();
    for id in movies {
        catalog.insert_movie(id, &format!("{id} title")).await.unwrap();
    }
    catalog
}

pub struct TestApp {
    pub router: Router,
    pub service: StreamingService,
    pub demo: Vec<u8>,
}

/// Catalog: `demo` (720p + 1080p), `hd-only` (1080p), `empty` (no variants),
/// `tiny` (720p, 20 bytes).
pub async fn demo_app() -> TestApp {
    demo_app_with(settings()).await
}

pub async fn demo_app_with(settings: StreamSettings) -> TestApp {
    let signer = signer();
    let store = MemoryObjectStore::new(signer.clone());
    let demo = payload(DEMO_SIZE);
    store.insert("movies/demo-720p.mp4", demo.clone()).unwrap();
    store.insert("movies/demo-1080p.mp4", payload(2 * DEMO_SIZE)).unwrap();
    store.insert("movies/hd-only-1080p.mp4", payload(4096)).unwrap();
    store.insert("movies/tiny-720p.mp4", payload(20)).unwrap();

    let catalog = catalog(&["demo", "hd-only", "empty", "tiny"]).await;
    let service = StreamingService::new(Arc::new(store), Arc::new(catalog), signer, settings);
    TestApp {
        router: app(service.clone()),
        service,
        demo,
    }
}

pub async fn app_with_store(store: Arc<dyn ObjectStore>, movies: &[&str]) -> Router {
    let catalog = catalog(movies).await;
    app(StreamingService::new(store, Arc::new(catalog), signer(), settings()))
}

pub async fn get(router: &Router, uri: &str, range: Option<&str>) -> Response<Body> {
    send(router, Method::GET, uri, range).await
}

pub async fn send(router: &Router, method: Method, uri: &str, range: Option<&str>) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(range) = range {
        builder = builder.header("range", range);
    }
    router
        .clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn body_bytes(res: Response<Body>) -> Bytes {
    res.into_body().collect().await.unwrap().to_bytes()
}

pub async fn json_body(res: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(res).await).unwrap()
}

pub fn header<'a>(res: &'a Response<Body>, name: &str) -> &'a str {
    res.headers()
        .get(name)
        .unwrap_or_else(|| panic!("missing header {name}"))
        .to_str()
        .unwrap()
}

/// Store whose reads fail: `broken` before any byte, `flaky` after the first chunk.
pub struct FaultyStore;

#[async_trait]
impl ObjectStore for FaultyStore {
    fn backend_name(&self) -> &'static str {
        "faulty"
    }

    async fn exists(&self, _key: &str) -> ObjectStoreResult<bool> {
        Ok(true)
    }

    async fn stat(&self, _key: &str) -> ObjectStoreResult<u64> {
        Ok(100)
    }

    async fn read_range(&self, key: &str, _start: u64, _end: u64) -> ObjectStoreResult<ByteStream> {
        if key.contains("broken") {
            return Err(ObjectStoreError::Backend("connection refused".into()));
        }
        let chunks: Vec<io::Result<Bytes>> = vec![
            Ok(Bytes::from(vec![0u8; 10])),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset by peer")),
        ];
        Ok(Box::pin(futures::stream::iter(chunks)))
    }

    async fn sign_url(&self, key: &str, _ttl: Duration) -> ObjectStoreResult<SignedUrl> {
        Err(ObjectStoreError::Signing(format!("cannot sign {key}")))
    }

    async fn probe(&self) -> ObjectStoreResult<()> {
        Err(ObjectStoreError::Backend("unreachable".into()))
    }
}

/// Store serving an endless run of 64 KiB chunks for any key. Counts how often
/// its read stream is polled and notes when that stream is dropped.
#[derive(Clone, Default)]
pub struct CountingStore {
    pub polls: Arc<AtomicUsize>,
    pub released: Arc<AtomicBool>,
}

pub const COUNTING_CHUNK: usize = 64 * 1024;

struct ReleaseOnDrop(Arc<AtomicBool>);

impl Drop for ReleaseOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

impl CountingStore {
    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectStore for CountingStore {
    fn backend_name(&self) -> &'static str {
        "counting"
    }

    async fn exists(&self, _key: &str) -> ObjectStoreResult<bool> {
        Ok(true)
    }

    async fn stat(&self, _key: &str) -> ObjectStoreResult<u64> {
        Ok(100 * COUNTING_CHUNK as u64)
    }

    async fn read_range(&self, _key: &str, _start: u64, _end: u64) -> ObjectStoreResult<ByteStream> {
        let state = (ReleaseOnDrop(self.released.clone()), self.polls.clone());
        let stream = futures::stream::unfold(state, |(guard, polls)| async move {
            polls.fetch_add(1, Ordering::SeqCst);
            let chunk = Bytes::from(vec![7u8; COUNTING_CHUNK]);
            Some((Ok::<_, io::Error>(chunk), (guard, polls)))
        });
        Ok(Box::pin(stream))
    }

    async fn sign_url(&self, key: &str, _ttl: Duration) -> ObjectStoreResult<SignedUrl> {
        Err(ObjectStoreError::Signing(format!("cannot sign {key}")))
    }

    async fn probe(&self) -> ObjectStoreResult<()> {
        Ok(())
    }
}
