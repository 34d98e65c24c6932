//! JWKS fetching and caching
//!
//! The cache holds an immutable snapshot of the identity provider's signing
//! keys behind an `ArcSwap`, so lookups never take a lock. A lookup miss
//! triggers one fetch of the full key set; concurrent misses observed against
//! the same snapshot generation share a single in-flight fetch.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use async_trait::async_trait;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use jsonwebtoken::DecodingKey;
use parking_lot::Mutex;
use serde::Deserialize;
use url::Url;

use super::config::AuthConfig;
use super::error::{KeyFetchError, ResolveError};

/// JSON Web Key
#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    /// Key ID
    #[serde(default)]
    pub kid: Option<String>,
    /// Key type (RSA, EC, oct)
    pub kty: String,
    /// Algorithm
    #[serde(default)]
    pub alg: Option<String>,
    /// Key usage
    #[serde(default)]
    pub r#use: Option<String>,
    // RSA components, base64url
    #[serde(default)]
    pub n: Option<String>,
    #[serde(default)]
    pub e: Option<String>,
}

/// JSON Web Key Set
#[derive(Debug, Clone, Deserialize)]
pub struct JwkSet {
    pub keys: Vec<Jwk>,
}

/// Public key usable for RS256 verification, indexed by `kid`
#[derive(Clone)]
pub struct SigningKey {
    kid: String,
    kty: String,
    alg: Option<String>,
    key: DecodingKey,
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey")
            .field("kid", &self.kid)
            .field("kty", &self.kty)
            .field("alg", &self.alg)
            .finish_non_exhaustive()
    }
}

impl SigningKey {
    /// Build a signing key from a JWK.
    ///
    /// Returns `Ok(None)` for keys this gateway does not verify with (no
    /// `kid`, or not an RSA key).
    pub fn from_jwk(jwk: &Jwk) -> Result<Option<Self>, KeyFetchError> {
        let Some(kid) = jwk.kid.as_deref() else {
            return Ok(None);
        };
        if jwk.kty != "RSA" {
            tracing::debug!(kid, kty = %jwk.kty, "Skipping unsupported key type");
            return Ok(None);
        }

        let n = jwk
            .n
            .as_deref()
            .ok_or_else(|| KeyFetchError::Malformed(format!("key {kid} is missing 'n'")))?;
        let e = jwk
            .e
            .as_deref()
            .ok_or_else(|| KeyFetchError::Malformed(format!("key {kid} is missing 'e'")))?;

        let key = DecodingKey::from_rsa_components(strip_padding(n), strip_padding(e))
            .map_err(|err| KeyFetchError::Malformed(format!("key {kid}: {err}")))?;

        Ok(Some(Self {
            kid: kid.to_string(),
            kty: jwk.kty.clone(),
            alg: jwk.alg.clone(),
            key,
        }))
    }

    pub fn kid(&self) -> &str {
        &self.kid
    }

    pub fn kty(&self) -> &str {
        &self.kty
    }

    pub fn algorithm(&self) -> Option<&str> {
        self.alg.as_deref()
    }

    pub const fn decoding_key(&self) -> &DecodingKey {
        &self.key
    }
}

/// Providers publish base64url both with and without `=` padding
fn strip_padding(value: &str) -> &str {
    value.trim_end_matches('=')
}

/// Where the key set comes from
#[async_trait]
pub trait KeySetSource: Send + Sync {
    /// Fetch the complete, current key set
    async fn fetch(&self) -> Result<JwkSet, KeyFetchError>;
}

/// Fetches the key set from the identity provider over HTTPS
#[derive(Debug, Clone)]
pub struct HttpKeySetSource {
    uri: Url,
    client: reqwest::Client,
}

impl HttpKeySetSource {
    pub fn new(uri: Url, timeout: Duration) -> crate::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(5)))
            .user_agent(concat!("llm-gateway/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| crate::Error::Config(format!("Failed to build JWKS HTTP client: {e}")))?;
        Ok(Self { uri, client })
    }

    pub const fn uri(&self) -> &Url {
        &self.uri
    }
}

#[async_trait]
impl KeySetSource for HttpKeySetSource {
    async fn fetch(&self) -> Result<JwkSet, KeyFetchError> {
        tracing::debug!(jwks_uri = %self.uri, "Fetching JWKS");

        let response = self
            .client
            .get(self.uri.clone())
            .send()
            .await?
            .error_for_status()?;

        // Decode failures map to `Malformed`
        Ok(response.json::<JwkSet>().await?)
    }
}

/// One immutable generation of the cached key set
#[derive(Debug, Default)]
struct KeySnapshot {
    keys: HashMap<String, SigningKey>,
    fetched_at: Option<Instant>,
    generation: u64,
}

impl KeySnapshot {
    fn build(set: JwkSet, generation: u64) -> Self {
        let mut keys = HashMap::with_capacity(set.keys.len());
        for jwk in &set.keys {
            match SigningKey::from_jwk(jwk) {
                Ok(Some(key)) => {
                    keys.insert(key.kid.clone(), key);
                }
                Ok(None) => {}
                Err(e) => tracing::warn!(error = %e, "Ignoring unusable JWKS entry"),
            }
        }
        Self {
            keys,
            fetched_at: Some(Instant::now()),
            generation,
        }
    }

    fn get(&self, kid: &str) -> Option<&SigningKey> {
        self.keys.get(kid)
    }

    fn is_stale(&self, max_age: Option<Duration>) -> bool {
        match (self.fetched_at, max_age) {
            (Some(fetched_at), Some(max_age)) => fetched_at.elapsed() > max_age,
            _ => false,
        }
    }
}

type SharedFetch = Shared<BoxFuture<'static, Result<Arc<KeySnapshot>, KeyFetchError>>>;

struct InFlight {
    base_generation: u64,
    fetch: SharedFetch,
}

#[derive(Default)]
struct CacheState {
    snapshot: ArcSwap<KeySnapshot>,
    inflight: Mutex<Option<InFlight>>,
    fetch_attempts: AtomicU64,
}

/// Thread-safe, single-flight JWKS cache
pub struct KeySetCache {
    source: Arc<dyn KeySetSource>,
    state: Arc<CacheState>,
    fetch_timeout: Duration,
    max_age: Option<Duration>,
}

impl std::fmt::Debug for KeySetCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeySetCache")
            .field("keys_count", &self.len())
            .field("generation", &self.generation())
            .field("fetch_timeout", &self.fetch_timeout)
            .field("max_age", &self.max_age)
            .finish_non_exhaustive()
    }
}

impl KeySetCache {
    pub fn new(source: Arc<dyn KeySetSource>) -> Self {
        Self {
            source,
            state: Arc::new(CacheState::default()),
            fetch_timeout: AuthConfig::DEFAULT_FETCH_TIMEOUT,
            max_age: None,
        }
    }

    /// Cache backed by the HTTP endpoint named in the auth configuration
    pub fn from_config(config: &AuthConfig) -> crate::Result<Self> {
        let source = HttpKeySetSource::new(config.jwks_uri.clone(), config.jwks_fetch_timeout)?;
        Ok(Self::new(Arc::new(source))
            .with_fetch_timeout(config.jwks_fetch_timeout)
            .with_max_age(config.jwks_max_age))
    }

    #[must_use]
    pub const fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn with_max_age(mut self, max_age: Option<Duration>) -> Self {
        self.max_age = max_age;
        self
    }

    /// Resolve a key by `kid`, fetching the key set once on a miss
    pub async fn resolve(&self, kid: &str) -> Result<SigningKey, ResolveError> {
        let snapshot = self.state.snapshot.load_full();
        if !snapshot.is_stale(self.max_age)
            && let Some(key) = snapshot.get(kid)
        {
            return Ok(key.clone());
        }

        tracing::debug!(kid, generation = snapshot.generation, "Signing key cache miss");

        let fresh = self.fetch_after(snapshot.generation).await?;
        fresh
            .get(kid)
            .cloned()
            .ok_or_else(|| ResolveError::NotFound(kid.to_string()))
    }

    /// Fetch the key set now, returning the number of usable keys
    pub async fn refresh(&self) -> Result<usize, KeyFetchError> {
        let generation = self.generation();
        let snapshot = self.fetch_after(generation).await?;
        Ok(snapshot.keys.len())
    }

    /// Populate the cache before serving traffic; failures are logged only
    pub async fn warm(&self) -> bool {
        match self.refresh().await {
            Ok(count) => {
                tracing::info!(keys_count = count, "JWKS cache warmed");
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to warm JWKS cache (will retry on first token)");
                false
            }
        }
    }

    pub fn len(&self) -> usize {
        self.state.snapshot.load().keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, kid: &str) -> bool {
        self.state.snapshot.load().keys.contains_key(kid)
    }

    /// Number of successful fetches so far
    pub fn generation(&self) -> u64 {
        self.state.snapshot.load().generation
    }

    /// Number of outbound fetches attempted so far
    pub fn fetch_attempts(&self) -> u64 {
        self.state.fetch_attempts.load(Ordering::Relaxed)
    }

    /// Join the fetch that supersedes `seen_generation`, starting one if needed
    fn fetch_after(&self, seen_generation: u64) -> SharedFetch {
        let mut inflight = self.state.inflight.lock();

        let current = self.state.snapshot.load_full();
        if current.generation > seen_generation {
            return futures::future::ready(Ok(current)).boxed().shared();
        }

        if let Some(running) = inflight.as_ref()
            && running.base_generation == seen_generation
        {
            return running.fetch.clone();
        }

        let fetch = fetch_and_swap(
            Arc::clone(&self.source),
            Arc::downgrade(&self.state),
            self.fetch_timeout,
            seen_generation,
        )
        .boxed()
        .shared();

        *inflight = Some(InFlight {
            base_generation: seen_generation,
            fetch: fetch.clone(),
        });
        fetch
    }
}

async fn fetch_and_swap(
    source: Arc<dyn KeySetSource>,
    state: Weak<CacheState>,
    timeout: Duration,
    base_generation: u64,
) -> Result<Arc<KeySnapshot>, KeyFetchError> {
    if let Some(state) = state.upgrade() {
        state.fetch_attempts.fetch_add(1, Ordering::Relaxed);
    }

    let started = Instant::now();
    let outcome = match tokio::time::timeout(timeout, source.fetch()).await {
        Ok(result) => result,
        Err(_) => Err(KeyFetchError::Timeout(timeout)),
    };

    let result = outcome.map(|set| Arc::new(KeySnapshot::build(set, base_generation + 1)));

    if let Some(state) = state.upgrade() {
        if let Ok(snapshot) = &result {
            state.snapshot.store(Arc::clone(snapshot));
        }
        let mut inflight = state.inflight.lock();
        if inflight
            .as_ref()
            .is_some_and(|running| running.base_generation == base_generation)
        {
            *inflight = None;
        }
    }

    match &result {
        Ok(snapshot) => {
            tracing::info!(
                keys_count = snapshot.keys.len(),
                generation = snapshot.generation,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "JWKS refreshed successfully"
            );
            #[cfg(feature = "metrics")]
            crate::observability::record_key_set_fetch("success");
        }
        Err(e) => {
            tracing::warn!(error = %e, "JWKS fetch failed");
            #[cfg(feature = "metrics")]
            crate::observability::record_key_set_fetch("failure");
        }
    }

    result
}

/// Background JWKS refresh task builder
pub struct JwksRefreshTask {
    cache: Arc<KeySetCache>,
    interval: Duration,
}

impl std::fmt::Debug for JwksRefreshTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwksRefreshTask")
            .field("cache", &self.cache)
            .field("interval", &self.interval)
            .finish()
    }
}

impl JwksRefreshTask {
    #[must_use]
    pub const fn new(cache: Arc<KeySetCache>, interval: Duration) -> Self {
        Self { cache, interval }
    }

    pub fn spawn(
        self,
        shutdown: tokio_util::sync::CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // The first tick fires immediately; startup already warmed the cache.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = self.cache.refresh().await {
                            tracing::warn!(error = %e, "Background JWKS refresh failed");
                        }
                    }
                    () = shutdown.cancelled() => {
                        tracing::debug!("JWKS refresh task shutting down");
                        break;
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::auth::testing::{CountingSource, TEST_KID, jwk_set, rsa_jwk};

    fn cache_with(source: &Arc<CountingSource>) -> KeySetCache {
        KeySetCache::new(Arc::clone(source) as Arc<dyn KeySetSource>)
    }

    #[test]
    fn test_jwk_set_deserialize() {
        let json = r#"{
            "keys": [
                {
                    "kid": "key1",
                    "kty": "RSA",
                    "alg": "RS256",
                    "use": "sig",
                    "n": "test_n",
                    "e": "AQAB"
                }
            ]
        }"#;
        let jwks: JwkSet = serde_json::from_str(json).unwrap();
        assert_eq!(jwks.keys.len(), 1);
        assert_eq!(jwks.keys[0].kid, Some("key1".to_string()));
        assert_eq!(jwks.keys[0].kty, "RSA");
        assert_eq!(jwks.keys[0].r#use.as_deref(), Some("sig"));
    }

    #[test]
    fn test_signing_key_tolerates_padding() {
        let mut jwk = rsa_jwk(TEST_KID);
        jwk.e = Some("AQAB==".to_string());
        jwk.n = jwk.n.map(|n| format!("{n}="));

        let key = SigningKey::from_jwk(&jwk).unwrap().unwrap();
        assert_eq!(key.kid(), TEST_KID);
        assert_eq!(key.kty(), "RSA");
        assert_eq!(key.algorithm(), Some("RS256"));
    }

    #[test]
    fn test_signing_key_skips_unusable_entries() {
        let mut no_kid = rsa_jwk(TEST_KID);
        no_kid.kid = None;
        assert!(SigningKey::from_jwk(&no_kid).unwrap().is_none());

        let mut ec = rsa_jwk("ec");
        ec.kty = "EC".to_string();
        assert!(SigningKey::from_jwk(&ec).unwrap().is_none());

        let mut missing_n = rsa_jwk("broken");
        missing_n.n = None;
        assert!(matches!(
            SigningKey::from_jwk(&missing_n),
            Err(KeyFetchError::Malformed(_))
        ));
    }

    #[test]
    fn test_signing_key_debug_hides_material() {
        let key = SigningKey::from_jwk(&rsa_jwk(TEST_KID)).unwrap().unwrap();
        let debug_str = format!("{key:?}");
        assert!(debug_str.contains(TEST_KID));
        assert!(!debug_str.contains("AQAB"));
    }

    #[tokio::test]
    async fn test_first_resolve_fetches_lazily() {
        let source = Arc::new(CountingSource::new(jwk_set(&[TEST_KID])));
        let cache = cache_with(&source);
        assert!(cache.is_empty());
        assert_eq!(source.calls(), 0);

        let key = cache.resolve(TEST_KID).await.unwrap();
        assert_eq!(key.kid(), TEST_KID);
        assert_eq!(source.calls(), 1);
        assert_eq!(cache.generation(), 1);

        cache.resolve(TEST_KID).await.unwrap();
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_unknown_kid_refetches_exactly_once() {
        let source = Arc::new(CountingSource::new(jwk_set(&[TEST_KID])));
        let cache = cache_with(&source);
        cache.resolve(TEST_KID).await.unwrap();
        assert_eq!(source.calls(), 1);

        let result = cache.resolve("rotated-away").await;
        assert_eq!(result.unwrap_err(), ResolveError::NotFound("rotated-away".into()));
        assert_eq!(source.calls(), 2);
        assert_eq!(cache.fetch_attempts(), 2);
    }

    #[tokio::test]
    async fn test_rotated_key_is_found_after_refetch() {
        let source = Arc::new(CountingSource::new(jwk_set(&[TEST_KID])));
        let cache = cache_with(&source);
        cache.resolve(TEST_KID).await.unwrap();

        source.set_keys(jwk_set(&[TEST_KID, "next-key"]));
        let key = cache.resolve("next-key").await.unwrap();
        assert_eq!(key.kid(), "next-key");
        assert_eq!(source.calls(), 2);
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test]
    async fn test_cached_key_survives_rotation_without_miss() {
        let source = Arc::new(CountingSource::new(jwk_set(&[TEST_KID])));
        let cache = cache_with(&source);
        cache.resolve(TEST_KID).await.unwrap();

        // Provider dropped the key, but nothing has missed since.
        source.set_keys(jwk_set(&["other"]));
        assert!(cache.resolve(TEST_KID).await.is_ok());
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_misses_share_one_fetch() {
        let source = Arc::new(
            CountingSource::new(jwk_set(&[TEST_KID])).with_delay(Duration::from_millis(50)),
        );
        let cache = Arc::new(cache_with(&source));

        let tasks: Vec<_> = (0..32)
            .map(|_| {
                let cache = Arc::clone(&cache);
                tokio::spawn(async move { cache.resolve(TEST_KID).await })
            })
            .collect();

        for task in futures::future::join_all(tasks).await {
            assert_eq!(task.unwrap().unwrap().kid(), TEST_KID);
        }
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_unknown_kid_misses_share_one_fetch() {
        let source = Arc::new(
            CountingSource::new(jwk_set(&[TEST_KID])).with_delay(Duration::from_millis(50)),
        );
        let cache = Arc::new(cache_with(&source));

        let results = futures::future::join_all((0..16).map(|_| cache.resolve("absent"))).await;
        for result in results {
            assert!(matches!(result, Err(ResolveError::NotFound(_))));
        }
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_fetch_failure_is_distinct_from_not_found() {
        let source = Arc::new(CountingSource::failing(KeyFetchError::Status(503)));
        let cache = cache_with(&source);

        let result = cache.resolve(TEST_KID).await;
        assert_eq!(
            result.unwrap_err(),
            ResolveError::FetchFailure(KeyFetchError::Status(503))
        );
        assert_eq!(cache.generation(), 0);
    }

    #[tokio::test]
    async fn test_failed_fetch_is_retried_on_next_miss() {
        let source = Arc::new(CountingSource::failing(KeyFetchError::Status(502)));
        let cache = cache_with(&source);
        assert!(cache.resolve(TEST_KID).await.is_err());

        source.set_keys(jwk_set(&[TEST_KID]));
        assert!(cache.resolve(TEST_KID).await.is_ok());
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_waiters_share_fetch_failure() {
        let source = Arc::new(
            CountingSource::failing(KeyFetchError::Request("boom".into()))
                .with_delay(Duration::from_millis(30)),
        );
        let cache = Arc::new(cache_with(&source));

        let results = futures::future::join_all((0..8).map(|_| cache.resolve(TEST_KID))).await;
        for result in results {
            assert!(matches!(result, Err(ResolveError::FetchFailure(_))));
        }
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_fetch_timeout_is_fetch_failure() {
        let source = Arc::new(
            CountingSource::new(jwk_set(&[TEST_KID])).with_delay(Duration::from_secs(5)),
        );
        let cache = cache_with(&source).with_fetch_timeout(Duration::from_millis(20));

        let result = cache.resolve(TEST_KID).await;
        assert_eq!(
            result.unwrap_err(),
            ResolveError::FetchFailure(KeyFetchError::Timeout(Duration::from_millis(20)))
        );
    }

    #[tokio::test]
    async fn test_max_age_forces_refresh() {
        let source = Arc::new(CountingSource::new(jwk_set(&[TEST_KID])));
        let cache = cache_with(&source).with_max_age(Some(Duration::from_millis(10)));
        cache.resolve(TEST_KID).await.unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;
        cache.resolve(TEST_KID).await.unwrap();
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_refresh_and_warm() {
        let source = Arc::new(CountingSource::new(jwk_set(&[TEST_KID, "k2"])));
        let cache = cache_with(&source);

        assert!(cache.warm().await);
        assert!(cache.contains("k2"));
        assert_eq!(cache.refresh().await.unwrap(), 2);
        assert_eq!(cache.generation(), 2);

        let failing = Arc::new(CountingSource::failing(KeyFetchError::Status(500)));
        assert!(!cache_with(&failing).warm().await);
    }

    async fn serve(router: axum::Router) -> Url {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        Url::parse(&format!("http://{addr}/.well-known/jwks.json")).unwrap()
    }

    #[tokio::test]
    async fn test_http_source_fetches_key_set() {
        use axum::routing::get;

        let body = crate::auth::testing::jwk_set_json(&[TEST_KID, "k2"]);
        let uri = serve(axum::Router::new().route(
            "/.well-known/jwks.json",
            get(move || async move { axum::Json(body) }),
        ))
        .await;

        let source = HttpKeySetSource::new(uri.clone(), Duration::from_secs(2)).unwrap();
        assert_eq!(source.uri(), &uri);
        let set = source.fetch().await.unwrap();
        assert_eq!(set.keys.len(), 2);

        let cache = KeySetCache::new(Arc::new(source));
        assert!(cache.resolve("k2").await.is_ok());
    }

    #[tokio::test]
    async fn test_http_source_maps_status_and_body_errors() {
        use axum::http::StatusCode;
        use axum::routing::get;

        let uri = serve(
            axum::Router::new()
                .route(
                    "/.well-known/jwks.json",
                    get(|| async { StatusCode::SERVICE_UNAVAILABLE }),
                )
                .route("/garbage", get(|| async { "not json" }))
                .route(
                    "/wrong-shape",
                    get(|| async { axum::Json(serde_json::json!({"keys": 5})) }),
                ),
        )
        .await;

        let source = HttpKeySetSource::new(uri.clone(), Duration::from_secs(2)).unwrap();
        assert_eq!(source.fetch().await.unwrap_err(), KeyFetchError::Status(503));

        let garbage = HttpKeySetSource::new(uri.join("/garbage").unwrap(), Duration::from_secs(2))
            .unwrap();
        assert!(matches!(
            garbage.fetch().await,
            Err(KeyFetchError::Malformed(_))
        ));

        let wrong_shape =
            HttpKeySetSource::new(uri.join("/wrong-shape").unwrap(), Duration::from_secs(2))
                .unwrap();
        assert!(matches!(
            wrong_shape.fetch().await,
            Err(KeyFetchError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn test_http_source_unreachable_is_request_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let uri = Url::parse(&format!("http://{addr}/jwks.json")).unwrap();
        let cache = KeySetCache::new(Arc::new(
            HttpKeySetSource::new(uri, Duration::from_secs(1)).unwrap(),
        ));
        assert!(matches!(
            cache.resolve(TEST_KID).await,
            Err(ResolveError::FetchFailure(_))
        ));
    }

    #[tokio::test]
    async fn test_refresh_task_stops_on_cancel() {
        let source = Arc::new(CountingSource::new(jwk_set(&[TEST_KID])));
        let cache = Arc::new(cache_with(&source));
        let shutdown = tokio_util::sync::CancellationToken::new();

        let handle =
            JwksRefreshTask::new(Arc::clone(&cache), Duration::from_millis(10)).spawn(shutdown.clone());
        tokio::time::sleep(Duration::from_millis(45)).await;
        shutdown.cancel();
        handle.await.unwrap();

        assert!(source.calls_counter().load(Ordering::SeqCst) >= 1);
        assert!(cache.contains(TEST_KID));
    }
}
