use crate::parser::FeedParser;
use crate::traits::FeedFetcher;
use crate::types::{AutomationError, FeedSource, FetchConfig, RawItem, Result};
use async_trait::async_trait;
use chrono::Utc;
use futures::StreamExt;
use reqwest::Client;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info};
use url::Url;

/// Downloads a feed over HTTP and parses it with `feed-rs`.
/// One attempt per call; retrying is the orchestrator's business.
pub struct HttpFeedFetcher {
    client: Client,
    config: FetchConfig,
    rate_limiter: Arc<RwLock<HashMap<String, Instant>>>,
}

impl HttpFeedFetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let redirect_policy = if config.follow_redirects {
            reqwest::redirect::Policy::limited(config.max_redirects)
        } else {
            reqwest::redirect::Policy::none()
        };

        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .redirect(redirect_policy)
            .build()?;

        Ok(Self {
            client,
            config,
            rate_limiter: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    /// Download the raw feed document.
    pub async fn fetch_content(&self, url: &str) -> Result<String> {
        let start_time = Instant::now();
        debug!("Fetching feed: {}", url);

        self.apply_rate_limit(url).await?;

        let response = self.client.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(AutomationError::General(format!(
                "HTTP {}: {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        let limit = self.config.max_feed_size_mb * 1024 * 1024;
        if let Some(content_length) = response.content_length() {
            if content_length > limit as u64 {
                return Err(too_large(limit));
            }
        }

        // Chunked responses carry no length up front
        let mut body = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            if body.len() + chunk.len() > limit {
                return Err(too_large(limit));
            }
            body.extend_from_slice(&chunk);
        }

        let content = String::from_utf8_lossy(&body).into_owned();
        info!(
            "Fetched feed: {} ({} bytes in {}ms)",
            url,
            content.len(),
            start_time.elapsed().as_millis()
        );
        Ok(content)
    }

    async fn apply_rate_limit(&self, url: &str) -> Result<()> {
        let parsed_url = Url::parse(url)?;
        let host = parsed_url.host_str().unwrap_or("").to_string();
        let min_interval = Duration::from_millis(self.config.min_host_interval_ms);

        // Reserve the next slot for this host, then wait outside the lock
        let wait_time = {
            let mut rate_limiter = self.rate_limiter.write().await;
            let now = Instant::now();
            let slot = rate_limiter
                .get(&host)
                .map(|last_request| *last_request + min_interval)
                .filter(|slot| *slot > now)
                .unwrap_or(now);
            rate_limiter.insert(host.clone(), slot);
            slot - now
        };

        if !wait_time.is_zero() {
            debug!("Rate limiting {}: waiting {:?}", host, wait_time);
            tokio::time::sleep(wait_time).await;
        }
        Ok(())
    }
}

fn too_large(limit: usize) -> AutomationError {
    AutomationError::General(format!("Feed too large: over {}MB", limit / (1024 * 1024)))
}

#[async_trait]
impl FeedFetcher for HttpFeedFetcher {
    async fn fetch(&self, source: &FeedSource) -> Result<Vec<RawItem>> {
        let to_fetch_error = |e: AutomationError| AutomationError::Fetch {
            feed: source.name.clone(),
            message: e.to_string(),
        };

        let content = self.fetch_content(&source.url).await.map_err(to_fetch_error)?;

        if !FeedParser::is_valid_feed_content(&content) {
            return Err(AutomationError::Fetch {
                feed: source.name.clone(),
                message: "response is not an RSS or Atom document".to_string(),
            });
        }

        let parsed = FeedParser::parse_feed(&content, &source.name, Utc::now()).map_err(to_fetch_error)?;
        Ok(parsed.items)
    }
}
