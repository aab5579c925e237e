use crate::activity_log::ActivityLog;
use crate::filter::{default_keywords, filter_items};
use crate::queue::ApprovalQueue;
use crate::store::{load_json, save_json, SETTINGS_KEY};
use crate::traits::{FeedFetcher, GenerationProvider, Publisher, Store};
use crate::types::{
    AutomationError, AutomationSettings, FeedSource, GeneratedArticle, LogEntry, LogSource, PendingArticle,
    RawItem, Result, ReviewDecision, ReviewStatus, RunStatus, SettingsUpdate,
};
use crate::utils::derive_tags;
use crate::utils::time::format_duration;
use backoff::{backoff::Backoff, exponential::ExponentialBackoff};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use futures::FutureExt;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{oneshot, Mutex as AsyncMutex, RwLock};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Tunables that are not part of the persisted settings.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// An item must mention one of these to be considered.
    pub keywords: Vec<String>,
    /// Upper bound on every fetch, generation and publish call.
    pub call_timeout: Duration,
    /// Extra attempts after a failed external call.
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub summary_length: usize,
    /// Fixed seed for item selection; entropy when unset.
    pub seed: Option<u64>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            keywords: default_keywords(),
            call_timeout: Duration::from_secs(60),
            max_retries: 0,
            retry_delay: Duration::from_secs(2),
            summary_length: 150,
            seed: None,
        }
    }
}

/// Outcome of one cycle.
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    /// Another cycle was in flight, nothing was done.
    pub skipped: bool,
    pub active_sources: usize,
    pub failed_sources: usize,
    pub fetched_items: usize,
    pub candidates: usize,
    pub selected: usize,
    pub failed_items: usize,
    pub queued: usize,
    pub queue_failures: usize,
    pub published: usize,
    pub publish_failures: usize,
    pub articles: Vec<GeneratedArticle>,
}

impl CycleReport {
    fn skipped() -> Self {
        Self {
            skipped: true,
            ..Default::default()
        }
    }
}

struct Inner {
    fetcher: Arc<dyn FeedFetcher>,
    generator: Arc<dyn GenerationProvider>,
    publisher: Arc<dyn Publisher>,
    store: Arc<dyn Store>,
    queue: ApprovalQueue,
    log: ActivityLog,
    settings: RwLock<AutomationSettings>,
    config: OrchestratorConfig,
    rng: Mutex<StdRng>,
    is_running: AtomicBool,
    cycle_in_progress: AtomicBool,
    last_run_at: Mutex<Option<DateTime<Utc>>>,
    shutdown: Mutex<Option<oneshot::Sender<()>>>,
    review_lock: AsyncMutex<()>,
}

/// Clears the in-progress flag however the cycle ends.
struct CycleGuard<'a>(&'a AtomicBool);

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

pub struct OrchestratorBuilder {
    fetcher: Arc<dyn FeedFetcher>,
    generator: Arc<dyn GenerationProvider>,
    publisher: Arc<dyn Publisher>,
    store: Arc<dyn Store>,
    config: OrchestratorConfig,
}

impl OrchestratorBuilder {
    pub fn new(
        fetcher: Arc<dyn FeedFetcher>,
        generator: Arc<dyn GenerationProvider>,
        publisher: Arc<dyn Publisher>,
        store: Arc<dyn Store>,
    ) -> Self {
        Self {
            fetcher,
            generator,
            publisher,
            store,
            config: OrchestratorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    /// Restore persisted settings and queue, then hand back a ready orchestrator.
    pub async fn build(self) -> Orchestrator {
        let settings = match load_json::<AutomationSettings>(self.store.as_ref(), SETTINGS_KEY).await {
            Ok(Some(settings)) => settings,
            Ok(None) => AutomationSettings::default(),
            Err(e) => {
                error!("Failed to load automation settings, using defaults: {}", e);
                AutomationSettings::default()
            }
        };

        let queue = ApprovalQueue::load(self.store.clone()).await;

        let rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let orchestrator = Orchestrator {
            inner: Arc::new(Inner {
                fetcher: self.fetcher,
                generator: self.generator,
                publisher: self.publisher,
                store: self.store,
                queue,
                log: ActivityLog::new(),
                settings: RwLock::new(settings),
                config: self.config,
                rng: Mutex::new(rng),
                is_running: AtomicBool::new(false),
                cycle_in_progress: AtomicBool::new(false),
                last_run_at: Mutex::new(None),
                shutdown: Mutex::new(None),
                review_lock: AsyncMutex::new(()),
            }),
        };

        orchestrator.inner.log.info("Automation service initialized", LogSource::Feed);
        orchestrator
    }
}

/// Drives recurring fetch, filter, transform and publish cycles.
/// Cheap to clone; all clones share one state.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

impl Orchestrator {
    /// Begin automation: run one cycle now, then one per `interval` minutes.
    /// Returns `false` if automation is already running.
    pub async fn start(&self, sources: Vec<FeedSource>, settings_override: Option<SettingsUpdate>) -> bool {
        if self
            .inner
            .is_running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            self.inner.log.warning("Automation is already running", LogSource::Feed);
            return false;
        }

        if let Some(update) = settings_override.filter(|u| !u.is_empty()) {
            if let Err(e) = self.update_settings(update).await {
                self.inner
                    .log
                    .error(format!("Failed to save automation settings: {}", e), LogSource::Feed);
            }
        }

        *lock(&self.inner.last_run_at) = Some(Utc::now());
        self.inner.log.info("Automation started", LogSource::Feed);

        self.run_cycle(&sources).await;

        let period = self.inner.settings.read().await.interval_duration();
        let mut shutdown = lock(&self.inner.shutdown);

        // stop() may have landed during the first cycle
        if self.inner.is_running.load(Ordering::SeqCst) {
            let (tx, rx) = oneshot::channel();
            *shutdown = Some(tx);
            tokio::spawn(self.clone().run_timer(sources, period, rx));
            info!("Automation timer armed, next cycle in {}", format_duration(period));
        }

        true
    }

    /// Disarm the timer. A cycle already in flight finishes normally.
    pub async fn stop(&self) -> bool {
        if self
            .inner
            .is_running
            .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            self.inner.log.warning("Automation is not running", LogSource::Feed);
            return false;
        }

        if let Some(tx) = lock(&self.inner.shutdown).take() {
            let _ = tx.send(());
        }

        self.inner.log.info("Automation stopped", LogSource::Feed);
        true
    }

    async fn run_timer(self, sources: Vec<FeedSource>, period: Duration, mut shutdown: oneshot::Receiver<()>) {
        let mut timer = tokio::time::interval_at(Instant::now() + period, period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = timer.tick() => {
                    self.run_cycle(&sources).await;
                }
            }
        }

        debug!("Automation timer exited");
    }

    /// Run a single cycle against `sources`. Never fails; problems end up in the activity log.
    pub async fn run_cycle(&self, sources: &[FeedSource]) -> CycleReport {
        if self
            .inner
            .cycle_in_progress
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            self.inner
                .log
                .warning("Automation cycle already in progress, skipping", LogSource::Feed);
            return CycleReport::skipped();
        }
        let _guard = CycleGuard(&self.inner.cycle_in_progress);

        let mut report = CycleReport::default();
        let outcome = AssertUnwindSafe(self.execute_cycle(sources, &mut report))
            .catch_unwind()
            .await;

        if let Err(panic) = outcome {
            self.inner.log.error(
                format!("Automation cycle failed: {}", panic_message(panic.as_ref())),
                LogSource::Feed,
            );
        }

        *lock(&self.inner.last_run_at) = Some(Utc::now());
        report
    }

    async fn execute_cycle(&self, sources: &[FeedSource], report: &mut CycleReport) {
        let log = &self.inner.log;
        let settings = self.inner.settings.read().await.clone();

        log.info("Starting automation cycle", LogSource::Feed);

        let active: Vec<&FeedSource> = sources.iter().filter(|s| s.active).collect();
        report.active_sources = active.len();
        if active.is_empty() {
            log.warning("No active feeds found", LogSource::Feed);
            return;
        }

        log.info(format!("Fetching articles from {} feeds", active.len()), LogSource::Feed);

        let results = join_all(active.iter().map(|source| self.fetch_source(source))).await;

        let mut items = Vec::new();
        for (source, result) in active.iter().zip(results) {
            match result {
                Ok(fetched) => {
                    log.success(
                        format!("Fetched {} articles from {}", fetched.len(), source.name),
                        LogSource::Feed,
                    );
                    items.extend(fetched);
                }
                Err(e) => {
                    report.failed_sources += 1;
                    log.error(format!("Failed to fetch from {}: {}", source.name, e), LogSource::Feed);
                }
            }
        }
        report.fetched_items = items.len();

        let candidates = filter_items(&items, settings.max_age, &self.inner.config.keywords, Utc::now());
        report.candidates = candidates.len();
        log.info(
            format!("Filtered down to {} relevant articles", candidates.len()),
            LogSource::Feed,
        );

        let selected = self.select(candidates, settings.max_articles);
        report.selected = selected.len();
        if selected.is_empty() {
            log.warning("No suitable articles found for processing", LogSource::Feed);
            return;
        }

        log.info(format!("Processing {} articles", selected.len()), LogSource::Content);

        for item in &selected {
            match self.transform(item, &settings).await {
                Some(article) => self.route(article, &settings, report).await,
                None => report.failed_items += 1,
            }
        }

        log.success("Automation cycle completed", LogSource::Publish);
    }

    async fn fetch_source(&self, source: &FeedSource) -> Result<Vec<RawItem>> {
        let fetcher = &self.inner.fetcher;
        self.call(&format!("fetch {}", source.name), || fetcher.fetch(source))
            .await
    }

    /// Uniformly sample up to `max_articles` candidates.
    fn select(&self, mut candidates: Vec<RawItem>, max_articles: usize) -> Vec<RawItem> {
        let mut rng = lock(&self.inner.rng);
        candidates.shuffle(&mut *rng);
        candidates.truncate(max_articles);
        candidates
    }

    /// Rewrite, summarize and illustrate one item. Failures are logged and yield `None`.
    async fn transform(&self, item: &RawItem, settings: &AutomationSettings) -> Option<GeneratedArticle> {
        let log = &self.inner.log;
        let generator = &self.inner.generator;

        let body = if item.content.trim().is_empty() {
            &item.description
        } else {
            &item.content
        };

        log.info(format!("Rewriting article: {}", item.title), LogSource::Content);
        let rewritten = match self
            .call("rewrite", || {
                generator.rewrite(&item.title, body, &item.source_name, &settings.content_params)
            })
            .await
        {
            Ok(rewritten) => rewritten,
            Err(e) => {
                log.error(format!("Error processing article: {}", e), LogSource::Content);
                return None;
            }
        };
        log.success("Content rewritten successfully", LogSource::Content);

        let summary_length = self.inner.config.summary_length;
        let summary = match self
            .call("summarize", || generator.summarize(&rewritten.content, summary_length))
            .await
        {
            Ok(summary) => summary,
            Err(e) => {
                log.error(format!("Error processing article: {}", e), LogSource::Content);
                return None;
            }
        };
        log.success("Summary generated successfully", LogSource::Content);

        let image_params = &settings.image_params;
        let prompt = format!("{}, {} style", item.title, image_params.style);
        log.info(format!("Generating image with prompt: {}", prompt), LogSource::Image);
        let image_url = match self
            .call("generate image", || {
                generator.generate_image(&prompt, image_params.style, image_params.aspect_ratio)
            })
            .await
        {
            Ok(url) => url,
            Err(e) => {
                log.error(format!("Error processing article: {}", e), LogSource::Image);
                return None;
            }
        };
        log.success("Image generated successfully", LogSource::Image);

        let tags = derive_tags(&rewritten.title, &rewritten.content);

        Some(GeneratedArticle {
            id: Uuid::new_v4().to_string(),
            title: rewritten.title,
            content: rewritten.content,
            summary,
            image_url,
            source_url: item.link.clone(),
            source_name: item.source_name.clone(),
            publish_date: Utc::now(),
            tags,
        })
    }

    async fn route(
        &self,
        article: GeneratedArticle,
        settings: &AutomationSettings,
        report: &mut CycleReport,
    ) {
        let log = &self.inner.log;

        if settings.require_approval {
            match self.inner.queue.enqueue(article.clone()).await {
                Ok(()) => {
                    log.success(format!("Article queued for approval: {}", article.title), LogSource::Publish);
                    report.queued += 1;
                }
                Err(e) => {
                    log.error(
                        format!("Failed to queue article: {}: {}", article.title, e),
                        LogSource::Publish,
                    );
                    report.queue_failures += 1;
                }
            }
        } else {
            let publisher = &self.inner.publisher;
            match self.call("publish", || publisher.publish(&article)).await {
                Ok(true) => {
                    log.success(format!("Published article: {}", article.title), LogSource::Publish);
                    report.published += 1;
                }
                Ok(false) => {
                    log.error(format!("Failed to publish article: {}", article.title), LogSource::Publish);
                    report.publish_failures += 1;
                }
                Err(e) => {
                    log.error(
                        format!("Failed to publish article: {}: {}", article.title, e),
                        LogSource::Publish,
                    );
                    report.publish_failures += 1;
                }
            }
        }

        report.articles.push(article);
    }

    /// Bound `f` by the call timeout and retry failures with exponential backoff.
    async fn call<T, F, Fut>(&self, operation: &str, mut f: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let config = &self.inner.config;
        let mut backoff: ExponentialBackoff<backoff::SystemClock> = ExponentialBackoff {
            current_interval: config.retry_delay,
            initial_interval: config.retry_delay,
            max_interval: config.retry_delay * 32,
            multiplier: 2.0,
            max_elapsed_time: None,
            ..Default::default()
        };

        let mut attempt = 0;
        loop {
            let result = match tokio::time::timeout(config.call_timeout, f()).await {
                Ok(result) => result,
                Err(_) => Err(AutomationError::Timeout {
                    operation: operation.to_string(),
                    seconds: config.call_timeout.as_secs(),
                }),
            };

            match result {
                Ok(value) => return Ok(value),
                Err(e) if attempt < config.max_retries => {
                    attempt += 1;
                    let delay = backoff.next_backoff().unwrap_or(config.retry_delay);
                    warn!(
                        "{} failed (attempt {}/{}), retrying in {:?}: {}",
                        operation,
                        attempt,
                        config.max_retries + 1,
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    pub fn get_status(&self) -> RunStatus {
        RunStatus {
            is_running: self.inner.is_running.load(Ordering::SeqCst),
            last_run_at: *lock(&self.inner.last_run_at),
        }
    }

    /// Activity log, newest first.
    pub fn get_logs(&self) -> Vec<LogEntry> {
        self.inner.log.list()
    }

    pub async fn list_pending(&self) -> Vec<PendingArticle> {
        self.inner.queue.list_pending().await
    }

    pub async fn pending_count(&self) -> usize {
        self.inner.queue.count().await
    }

    pub async fn get_settings(&self) -> AutomationSettings {
        self.inner.settings.read().await.clone()
    }

    /// Merge `update` into the current settings and persist the result.
    /// A running timer keeps its period until the next `start`.
    pub async fn update_settings(&self, update: SettingsUpdate) -> Result<AutomationSettings> {
        let updated = {
            let mut settings = self.inner.settings.write().await;
            settings.apply(update);
            settings.clone()
        };

        save_json(self.inner.store.as_ref(), SETTINGS_KEY, &updated).await?;
        self.inner.log.success("Automation settings updated", LogSource::Feed);
        Ok(updated)
    }

    /// Approve or reject a pending article. Approval is recorded before the
    /// article is published and reverted if the publisher does not accept it,
    /// so an article is published at most once.
    pub async fn mark_reviewed(&self, id: &str, decision: ReviewDecision) -> bool {
        let _review = self.inner.review_lock.lock().await;
        self.review(id, decision).await
    }

    /// Apply editor changes to a pending article, then approve it.
    pub async fn approve_with_edits(&self, id: &str, title: &str, content: &str) -> bool {
        let _review = self.inner.review_lock.lock().await;

        match self.inner.queue.update_content(id, title, content).await {
            Ok(true) => {}
            Ok(false) => {
                self.inner
                    .log
                    .warning(format!("Article {} is not awaiting review", id), LogSource::Publish);
                return false;
            }
            Err(e) => {
                self.inner
                    .log
                    .error(format!("Failed to save edits for article {}: {}", id, e), LogSource::Publish);
                return false;
            }
        }

        self.review(id, ReviewDecision::Approved).await
    }

    async fn review(&self, id: &str, decision: ReviewDecision) -> bool {
        let log = &self.inner.log;

        let Some(entry) = self.inner.queue.get(id).await else {
            log.warning(format!("Article {} not found in approval queue", id), LogSource::Publish);
            return false;
        };

        if !entry.is_pending() {
            let same = entry.status == ReviewStatus::from(decision);
            if !same {
                log.warning(
                    format!("Article {} was already {}", id, entry.status),
                    LogSource::Publish,
                );
            }
            return same;
        }

        match self.inner.queue.mark_reviewed(id, decision).await {
            Ok(true) => {}
            Ok(false) => return false,
            Err(e) => {
                log.error(format!("Failed to record review for {}: {}", id, e), LogSource::Publish);
                return false;
            }
        }

        if decision == ReviewDecision::Approved && !self.publish_reviewed(&entry.article).await {
            if let Err(e) = self.inner.queue.reopen(id).await {
                log.error(
                    format!("Article {} is marked approved but was not published: {}", id, e),
                    LogSource::Publish,
                );
            }
            return false;
        }

        log.success(format!("Article {} marked as {}", id, decision), LogSource::Publish);
        info!("Review of {} recorded", id);
        true
    }

    async fn publish_reviewed(&self, article: &GeneratedArticle) -> bool {
        let log = &self.inner.log;
        let publisher = &self.inner.publisher;

        match self.call("publish", || publisher.publish(article)).await {
            Ok(true) => {
                log.success(format!("Published article: {}", article.title), LogSource::Publish);
                true
            }
            Ok(false) => {
                log.error(format!("Failed to publish article: {}", article.title), LogSource::Publish);
                false
            }
            Err(e) => {
                log.error(
                    format!("Failed to publish article: {}: {}", article.title, e),
                    LogSource::Publish,
                );
                false
            }
        }
    }
}
