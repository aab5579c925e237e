#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration, Utc};
use news_automation::store::PENDING_ARTICLES_KEY;
use news_automation::{
    AspectRatio, AutomationError, ContentParams, FeedFetcher, FeedSource, GeneratedArticle, GenerationProvider,
    ImageStyle, LocalGenerator, MemoryStore, Orchestrator, OrchestratorBuilder, Publisher, RawItem, Result,
    RewrittenContent, Store,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

pub fn source(name: &str) -> FeedSource {
    FeedSource::new(name, format!("https://{}.example.com/rss", name.to_lowercase()))
}

/// A keyword-matching item published `age_hours` ago.
pub fn ai_item(source_name: &str, n: usize, age_hours: i64) -> RawItem {
    RawItem {
        id: format!("{}-{}", source_name, n),
        title: format!("AI story {} from {}", n, source_name),
        description: "Artificial intelligence keeps moving".to_string(),
        content: format!("Body of story {} from {}.", n, source_name),
        link: format!("https://{}.example.com/{}", source_name.to_lowercase(), n),
        published_at: Utc::now() - Duration::hours(age_hours),
        source_name: source_name.to_string(),
    }
}

/// Serves canned items per source name; listed names fail.
#[derive(Default)]
pub struct StaticFetcher {
    items: HashMap<String, Vec<RawItem>>,
    failing: HashSet<String>,
    delay: Option<std::time::Duration>,
    pub calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items(mut self, source_name: &str, items: Vec<RawItem>) -> Self {
        self.items.insert(source_name.to_string(), items);
        self
    }

    pub fn failing(mut self, source_name: &str) -> Self {
        self.failing.insert(source_name.to_string());
        self
    }

    pub fn with_delay(mut self, delay: std::time::Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of fetches observed running at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl FeedFetcher for StaticFetcher {
    async fn fetch(&self, source: &FeedSource) -> Result<Vec<RawItem>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);
        // Decrements even when the caller times out and drops this future
        let _in_flight = InFlight(&self.in_flight);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.contains(&source.name) {
            return Err(AutomationError::Fetch {
                feed: source.name.clone(),
                message: "connection refused".to_string(),
            });
        }
        Ok(self.items.get(&source.name).cloned().unwrap_or_default())
    }
}

/// Local generation, except that the listed rewrite calls (1-based) fail
/// and, optionally, every image call panics.
#[derive(Default)]
pub struct ScriptedGenerator {
    inner: LocalGenerator,
    failing_rewrites: HashSet<usize>,
    panic_on_image: bool,
    rewrites: AtomicUsize,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_rewrite(mut self, call: usize) -> Self {
        self.failing_rewrites.insert(call);
        self
    }

    pub fn panicking_on_image(mut self) -> Self {
        self.panic_on_image = true;
        self
    }
}

#[async_trait]
impl GenerationProvider for ScriptedGenerator {
    fn name(&self) -> String {
        "Scripted".to_string()
    }

    async fn rewrite(
        &self,
        title: &str,
        content: &str,
        source_name: &str,
        params: &ContentParams,
    ) -> Result<RewrittenContent> {
        let call = self.rewrites.fetch_add(1, Ordering::SeqCst) + 1;
        if self.failing_rewrites.contains(&call) {
            return Err(AutomationError::generation("Scripted", format!("rewrite {} failed", call)));
        }
        self.inner.rewrite(title, content, source_name, params).await
    }

    async fn summarize(&self, content: &str, max_length: usize) -> Result<String> {
        self.inner.summarize(content, max_length).await
    }

    async fn generate_image(&self, prompt: &str, style: ImageStyle, aspect_ratio: AspectRatio) -> Result<String> {
        if self.panic_on_image {
            panic!("image backend exploded");
        }
        self.inner.generate_image(prompt, style, aspect_ratio).await
    }
}

/// Records what it is asked to publish.
pub struct RecordingPublisher {
    accept: bool,
    pub published: Mutex<Vec<GeneratedArticle>>,
}

impl RecordingPublisher {
    pub fn accepting() -> Self {
        Self {
            accept: true,
            published: Mutex::new(Vec::new()),
        }
    }

    pub fn declining() -> Self {
        Self {
            accept: false,
            published: Mutex::new(Vec::new()),
        }
    }

    pub fn published(&self) -> Vec<GeneratedArticle> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn publish(&self, article: &GeneratedArticle) -> Result<bool> {
        self.published.lock().unwrap().push(article.clone());
        Ok(self.accept)
    }
}

/// In-memory store whose approval-queue writes fail while armed.
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    failing: AtomicBool,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let store = Self::default();
        store.set_failing(true);
        store
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl Store for FlakyStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, value: &str) -> Result<()> {
        if key == PENDING_ARTICLES_KEY && self.failing.load(Ordering::SeqCst) {
            return Err(AutomationError::General("disk full".to_string()));
        }
        self.inner.put(key, value).await
    }
}

pub struct Harness {
    pub orchestrator: Orchestrator,
    pub fetcher: Arc<StaticFetcher>,
    pub publisher: Arc<RecordingPublisher>,
    pub store: Arc<dyn Store>,
}

pub async fn harness(fetcher: StaticFetcher, generator: ScriptedGenerator, publisher: RecordingPublisher) -> Harness {
    harness_with_store(fetcher, generator, publisher, Arc::new(MemoryStore::new())).await
}

pub async fn harness_with_store(
    fetcher: StaticFetcher,
    generator: ScriptedGenerator,
    publisher: RecordingPublisher,
    store: Arc<dyn Store>,
) -> Harness {
    init_tracing();

    let fetcher = Arc::new(fetcher);
    let publisher = Arc::new(publisher);
    let orchestrator = OrchestratorBuilder::new(
        fetcher.clone(),
        Arc::new(generator),
        publisher.clone(),
        store.clone(),
    )
    .with_seed(42)
    .build()
    .await;

    Harness {
        orchestrator,
        fetcher,
        publisher,
        store,
    }
}
