//! Cache-then-fetch orchestration.
//!
//! `fetch` returns a cached result if one is fresh; otherwise it asks the
//! transport, validates the envelope, adds the attribution fields, stores the
//! result and returns it. Concurrent misses for the same query on one
//! service are collapsed into a single request.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::instrument;

use skyquery_cache::{CacheStore, FileCache, Payload};
use skyquery_core::{CacheError, Config, ResponseError, WeatherError};

use crate::branding::augment;
use crate::query::{location_search_query, scoped_query, Scope, Units};
use crate::transport::{Transport, TransportConfig, YqlTransport};

type KeyLock = Arc<tokio::sync::Mutex<()>>;

/// Weather query client with a response cache in front of the network.
pub struct QueryService {
    cache: Arc<dyn CacheStore>,
    transport: Arc<dyn Transport>,
    in_flight: Mutex<HashMap<String, KeyLock>>,
}

impl QueryService {
    pub fn new(cache: Arc<dyn CacheStore>, transport: Arc<dyn Transport>) -> Self {
        Self {
            cache,
            transport,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Build a service with a file cache and HTTP transport from `config`.
    ///
    /// # Errors
    /// Returns `WeatherError::Config` if the cache directory is unusable or
    /// the endpoint settings are invalid.
    pub fn from_config(config: &Config) -> Result<Self, WeatherError> {
        let cache = FileCache::new(&config.cache.dir, Duration::from_secs(config.cache.ttl_secs))?;
        let transport = YqlTransport::new(TransportConfig::from(&config.endpoint))?;
        Ok(Self::new(Arc::new(cache), Arc::new(transport)))
    }

    pub fn cache(&self) -> &Arc<dyn CacheStore> {
        &self.cache
    }

    /// Full forecast record for `woeid`.
    pub async fn data(&self, woeid: u64, units: Units) -> Result<Payload, WeatherError> {
        self.scoped(Scope::All, woeid, units).await
    }

    pub async fn wind(&self, woeid: u64, units: Units) -> Result<Payload, WeatherError> {
        self.scoped(Scope::Wind, woeid, units).await
    }

    pub async fn atmosphere(&self, woeid: u64, units: Units) -> Result<Payload, WeatherError> {
        self.scoped(Scope::Atmosphere, woeid, units).await
    }

    pub async fn astronomy(&self, woeid: u64, units: Units) -> Result<Payload, WeatherError> {
        self.scoped(Scope::Astronomy, woeid, units).await
    }

    pub async fn forecast(&self, woeid: u64, units: Units) -> Result<Payload, WeatherError> {
        self.scoped(Scope::Forecast, woeid, units).await
    }

    pub async fn conditions(&self, woeid: u64, units: Units) -> Result<Payload, WeatherError> {
        self.scoped(Scope::Conditions, woeid, units).await
    }

    pub async fn scoped(
        &self,
        scope: Scope,
        woeid: u64,
        units: Units,
    ) -> Result<Payload, WeatherError> {
        self.fetch(&scoped_query(scope, woeid, units)).await
    }

    /// Candidate WOEIDs for a free-text location.
    pub async fn search_locations(&self, text: &str) -> Result<Payload, WeatherError> {
        self.fetch(&location_search_query(text)).await
    }

    /// Result for `query`, from cache when fresh, otherwise from the service.
    ///
    /// # Errors
    /// `WeatherError::Response` when the service can't be reached or sends an
    /// unusable envelope; `WeatherError::Cache` when the cache can't be read
    /// or written.
    #[instrument(skip(self), level = "debug")]
    pub async fn fetch(&self, query: &str) -> Result<Payload, WeatherError> {
        if let Some(hit) = self.cache_get(query).await? {
            tracing::debug!("Serving cached result");
            return Ok(hit);
        }

        let lock = self.key_lock(query);
        let result = self.fetch_locked(query, &lock).await;
        self.release_key(query, &lock);
        result
    }

    async fn fetch_locked(&self, query: &str, lock: &KeyLock) -> Result<Payload, WeatherError> {
        let _guard = lock.lock().await;

        // Another caller may have filled the entry while we waited.
        if let Some(hit) = self.cache_get(query).await? {
            tracing::debug!("Serving result fetched by a concurrent caller");
            return Ok(hit);
        }

        let body = self.transport.fetch(query).await.map_err(|e| {
            tracing::warn!("Weather request failed: {}", e);
            ResponseError::Unreachable(e.to_string())
        })?;

        let payload = augment(parse_envelope(&body)?);
        let payload = self.cache_set(query, payload).await?;
        tracing::info!("Fetched and cached weather result");
        Ok(payload)
    }

    fn key_lock(&self, query: &str) -> KeyLock {
        self.in_flight
            .lock()
            .entry(query.to_string())
            .or_default()
            .clone()
    }

    fn release_key(&self, query: &str, lock: &KeyLock) {
        let mut in_flight = self.in_flight.lock();
        let ours = in_flight.get(query).is_some_and(|l| Arc::ptr_eq(l, lock));
        // One reference in the map, one held by this caller.
        if ours && Arc::strong_count(lock) <= 2 {
            in_flight.remove(query);
        }
    }

    async fn cache_get(&self, query: &str) -> Result<Option<Payload>, CacheError> {
        let cache = self.cache.clone();
        let query = query.to_string();
        tokio::task::spawn_blocking(move || cache.get(&query))
            .await
            .map_err(|e| CacheError::Task(e.to_string()))?
    }

    async fn cache_set(&self, query: &str, payload: Payload) -> Result<Payload, CacheError> {
        let cache = self.cache.clone();
        let query = query.to_string();
        tokio::task::spawn_blocking(move || cache.set(&query, &payload).map(|()| payload))
            .await
            .map_err(|e| CacheError::Task(e.to_string()))?
    }
}

/// Parse a raw response body and check that it carries results.
///
/// # Errors
/// `ResponseError::InvalidResponse` if the body is not a JSON object,
/// `ResponseError::NoResults` if `query.results` is missing or null.
pub fn parse_envelope(body: &str) -> Result<Payload, ResponseError> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| ResponseError::InvalidResponse(e.to_string()))?;

    let Value::Object(envelope) = value else {
        return Err(ResponseError::InvalidResponse(
            "expected a JSON object".to_string(),
        ));
    };

    match envelope.get("query").and_then(|q| q.get("results")) {
        None | Some(Value::Null) => Err(ResponseError::NoResults),
        Some(_) => Ok(envelope),
    }
}
