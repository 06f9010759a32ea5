use governor::{DefaultDirectRateLimiter, Jitter, Quota, RateLimiter};
use moka::future::Cache;
use octocrab::Octocrab;
use serde::de::DeserializeOwned;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::config::RateLimitConfig;
use crate::observability::source_metrics;
use crate::sources::SourceError;

/// Rate-limited GitHub client: Octocrab behind a token bucket, with a
/// short-lived cache of GET responses keyed by route and query.
#[derive(Debug, Clone)]
pub struct RateLimitedHttpClient {
    octocrab: Octocrab,
    rate_limiter: Arc<DefaultDirectRateLimiter>,
    cache: Cache<String, serde_json::Value>,
}

impl RateLimitedHttpClient {
    pub fn new(
        api_base: &str,
        token: String,
        rate_limit: &RateLimitConfig,
        cache_ttl: Duration,
    ) -> Result<Self, SourceError> {
        let per_second = NonZeroU32::new(rate_limit.requests_per_second).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(rate_limit.burst_capacity).unwrap_or(per_second);
        let rate_limiter = Arc::new(RateLimiter::direct(
            Quota::per_second(per_second).allow_burst(burst),
        ));

        let octocrab = Octocrab::builder()
            .base_uri(api_base)?
            .personal_token(token)
            .build()?;

        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(cache_ttl)
            .build();

        Ok(Self {
            octocrab,
            rate_limiter,
            cache,
        })
    }

    /// GET `route` with query `params`, waiting for a rate-limit permit on a
    /// cache miss.
    pub async fn get_json<R>(&self, route: &str, params: &[(&str, String)]) -> Result<R, SourceError>
    where
        R: DeserializeOwned,
    {
        let cache_key = cache_key(route, params);

        let value = match self.cache.get(&cache_key).await {
            Some(cached) => {
                debug!("Cache hit for key: {}", cache_key);
                source_metrics().record_cache_hit();
                cached
            }
            None => {
                source_metrics().record_cache_miss();
                self.rate_limiter
                    .until_ready_with_jitter(Jitter::up_to(Duration::from_millis(100)))
                    .await;

                debug!(route, "Executing GitHub API request with rate limiting");
                let fetched: serde_json::Value = self.octocrab.get(route, Some(&params)).await?;
                self.cache.insert(cache_key, fetched.clone()).await;
                fetched
            }
        };

        serde_json::from_value(value).map_err(|e| SourceError::InvalidResponse {
            provider: "github",
            message: format!("{route}: {e}"),
        })
    }
}

fn cache_key(route: &str, params: &[(&str, String)]) -> String {
    let query: Vec<String> = params.iter().map(|(k, v)| format!("{k}={v}")).collect();
    format!("{route}?{}", query.join("&"))
}
