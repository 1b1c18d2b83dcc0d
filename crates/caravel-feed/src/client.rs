//! HTTP feed client with retry and response caching.

use crate::cache::FeedCache;
use crate::error::{FeedError, Result};
use backon::{ExponentialBuilder, Retryable};
use caravel_core::{Library, Version};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Feed client configuration.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Retry attempts for transient failures.
    pub max_retries: usize,
    /// Bypass the response cache.
    pub no_cache: bool,
    /// Upper bound for in-memory archive downloads.
    pub max_archive_bytes: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            max_retries: 2,
            no_cache: false,
            max_archive_bytes: 256 * 1024 * 1024,
        }
    }
}

/// Version listing response body.
#[derive(Debug, Deserialize)]
struct VersionIndex {
    versions: Vec<String>,
}

/// Client over one or more package feeds.
#[derive(Debug)]
pub struct FeedClient {
    http: reqwest::Client,
    config: FeedConfig,
    cache: FeedCache,
}

impl FeedClient {
    /// Create a client.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn new(config: FeedConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("caravel/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FeedError::Request {
                url: String::new(),
                message: e.to_string(),
            })?;
        Ok(Self {
            http,
            config,
            cache: FeedCache::new(),
        })
    }

    /// The response cache.
    #[must_use]
    pub const fn cache(&self) -> &FeedCache {
        &self.cache
    }

    /// List the versions a feed offers for `name`.
    ///
    /// Returns `None` when the feed does not know the name (HTTP 404); that
    /// answer is cached like any other.
    ///
    /// # Errors
    /// Returns error on transport failures or unparseable responses.
    pub async fn list_versions(&self, feed: &Url, name: &str) -> Result<Option<Arc<Vec<Version>>>> {
        if !self.config.no_cache
            && let Some(cached) = self.cache.get(feed, name)
        {
            return Ok(cached);
        }

        let url = join_feed(feed, &[name, "index.json"])?;
        debug!(%url, "listing versions");
        let response = self.get_with_retry(&url).await?;

        let listing = match response.status().as_u16() {
            200 => {
                let body = response.text().await.map_err(|e| FeedError::Request {
                    url: url.to_string(),
                    message: e.to_string(),
                })?;
                let index: VersionIndex =
                    sonic_parse(&body).map_err(|message| FeedError::InvalidResponse {
                        url: url.to_string(),
                        message,
                    })?;
                let mut versions = Vec::with_capacity(index.versions.len());
                for v in &index.versions {
                    match Version::parse(v) {
                        Ok(version) => versions.push(version),
                        Err(e) => warn!(feed = %feed, name, version = v, "skipping unparseable version: {e}"),
                    }
                }
                versions.sort();
                Some(Arc::new(versions))
            }
            404 => None,
            status => {
                return Err(FeedError::Status {
                    url: url.to_string(),
                    status,
                });
            }
        };

        self.cache.put(feed, name, listing.clone());
        Ok(listing)
    }

    /// Download a package archive into memory, bounded by
    /// [`FeedConfig::max_archive_bytes`].
    ///
    /// # Errors
    /// Returns error on transport failures, unexpected statuses, or when the
    /// archive exceeds the bound.
    pub async fn download(&self, feed: &Url, library: &Library) -> Result<Vec<u8>> {
        let file = format!("{}.{}.zip", library.name, library.version);
        let url = join_feed(
            feed,
            &[&library.name, &library.version.to_string(), &file],
        )?;
        debug!(%url, "downloading archive");

        let mut response = self.get_with_retry(&url).await?;
        if response.status().as_u16() != 200 {
            return Err(FeedError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| FeedError::Request {
            url: url.to_string(),
            message: e.to_string(),
        })? {
            if bytes.len() + chunk.len() > self.config.max_archive_bytes {
                return Err(FeedError::TooLarge {
                    url: url.to_string(),
                    limit: self.config.max_archive_bytes,
                });
            }
            bytes.extend_from_slice(&chunk);
        }
        Ok(bytes)
    }

    async fn get_with_retry(&self, url: &Url) -> Result<reqwest::Response> {
        let request = || async { self.http.get(url.clone()).send().await };
        request
            .retry(
                ExponentialBuilder::default()
                    .with_max_times(self.config.max_retries)
                    .with_min_delay(Duration::from_millis(100)),
            )
            .when(|e: &reqwest::Error| e.is_timeout() || e.is_connect() || e.is_request())
            .await
            .map_err(|e| FeedError::Request {
                url: url.to_string(),
                message: e.to_string(),
            })
    }
}

fn join_feed(feed: &Url, segments: &[&str]) -> Result<Url> {
    let mut url = feed.clone();
    {
        let mut path = url
            .path_segments_mut()
            .map_err(|()| FeedError::InvalidUrl(feed.to_string()))?;
        path.pop_if_empty();
        for segment in segments {
            path.push(segment);
        }
    }
    Ok(url)
}

fn sonic_parse<T: serde::de::DeserializeOwned>(body: &str) -> std::result::Result<T, String> {
    caravel_core::from_json(body).map_err(|e| e.to_string())
}
