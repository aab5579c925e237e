use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// A configured feed the pipeline may pull from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedSource {
    pub id: String,
    pub name: String,
    pub url: String,
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}

impl FeedSource {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            url: url.into(),
            active: true,
        }
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }
}

/// An unprocessed entry as it came out of a feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawItem {
    pub id: String,
    pub title: String,
    pub description: String,
    pub content: String,
    pub link: String,
    pub published_at: DateTime<Utc>,
    pub source_name: String,
}

impl RawItem {
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now.signed_duration_since(self.published_at)
    }
}

/// A fully transformed, publish-ready article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedArticle {
    pub id: String,
    pub title: String,
    pub content: String,
    pub summary: String,
    pub image_url: String,
    pub source_url: String,
    pub source_name: String,
    pub publish_date: DateTime<Utc>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    Pending,
    Approved,
    Rejected,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::Pending => "pending",
            ReviewStatus::Approved => "approved",
            ReviewStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two terminal outcomes an editor can give a pending article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewDecision {
    Approved,
    Rejected,
}

impl From<ReviewDecision> for ReviewStatus {
    fn from(decision: ReviewDecision) -> Self {
        match decision {
            ReviewDecision::Approved => ReviewStatus::Approved,
            ReviewDecision::Rejected => ReviewStatus::Rejected,
        }
    }
}

impl fmt::Display for ReviewDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        ReviewStatus::from(*self).fmt(f)
    }
}

/// A generated article waiting in the approval queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingArticle {
    #[serde(flatten)]
    pub article: GeneratedArticle,
    pub status: ReviewStatus,
}

impl PendingArticle {
    pub fn new(article: GeneratedArticle) -> Self {
        Self {
            article,
            status: ReviewStatus::Pending,
        }
    }

    pub fn id(&self) -> &str {
        &self.article.id
    }

    pub fn is_pending(&self) -> bool {
        self.status == ReviewStatus::Pending
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    #[default]
    Professional,
    Casual,
    Academic,
}

impl Tone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Professional => "professional",
            Tone::Casual => "casual",
            Tone::Academic => "academic",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WritingStyle {
    Formal,
    #[default]
    Conversational,
    Technical,
}

impl WritingStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            WritingStyle::Formal => "formal",
            WritingStyle::Conversational => "conversational",
            WritingStyle::Technical => "technical",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArticleLength {
    Short,
    #[default]
    Medium,
    Long,
}

impl ArticleLength {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArticleLength::Short => "short",
            ArticleLength::Medium => "medium",
            ArticleLength::Long => "long",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Perspective {
    #[default]
    Neutral,
    Optimistic,
    Critical,
}

impl Perspective {
    pub fn as_str(&self) -> &'static str {
        match self {
            Perspective::Neutral => "neutral",
            Perspective::Optimistic => "optimistic",
            Perspective::Critical => "critical",
        }
    }
}

/// Options handed to the generation provider when rewriting an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContentParams {
    pub tone: Tone,
    pub style: WritingStyle,
    pub length: ArticleLength,
    pub perspective: Perspective,
    pub topic: String,
    pub use_premium: bool,
}

impl Default for ContentParams {
    fn default() -> Self {
        Self {
            tone: Tone::default(),
            style: WritingStyle::default(),
            length: ArticleLength::default(),
            perspective: Perspective::default(),
            topic: "technology".to_string(),
            use_premium: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImageStyle {
    #[default]
    Realistic,
    Photorealistic,
    DigitalArt,
    Illustration,
    #[serde(rename = "3d-render")]
    Render3d,
}

impl ImageStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageStyle::Realistic => "realistic",
            ImageStyle::Photorealistic => "photorealistic",
            ImageStyle::DigitalArt => "digital-art",
            ImageStyle::Illustration => "illustration",
            ImageStyle::Render3d => "3d-render",
        }
    }
}

impl fmt::Display for ImageStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    #[serde(rename = "1:1")]
    Square,
    #[default]
    #[serde(rename = "16:9")]
    Widescreen,
    #[serde(rename = "4:3")]
    Standard,
    #[serde(rename = "9:16")]
    Portrait,
}

impl AspectRatio {
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Widescreen => "16:9",
            AspectRatio::Standard => "4:3",
            AspectRatio::Portrait => "9:16",
        }
    }

    /// Pixel dimensions used when requesting a stock image.
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            AspectRatio::Square => (1200, 1200),
            AspectRatio::Widescreen => (1600, 900),
            AspectRatio::Standard => (1600, 1200),
            AspectRatio::Portrait => (900, 1600),
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageParams {
    pub style: ImageStyle,
    pub aspect_ratio: AspectRatio,
}

/// Longest timer period honoured: one year.
pub const MAX_INTERVAL_MINUTES: u64 = 365 * 24 * 60;

/// Knobs that shape every cycle. Snapshotted at the start of a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AutomationSettings {
    /// Minutes between cycles.
    pub interval: u64,
    /// Maximum item age in days.
    pub max_age: u32,
    pub max_articles: usize,
    pub content_params: ContentParams,
    pub image_params: ImageParams,
    pub require_approval: bool,
}

impl Default for AutomationSettings {
    fn default() -> Self {
        Self {
            interval: 60,
            max_age: 1,
            max_articles: 3,
            content_params: ContentParams::default(),
            image_params: ImageParams::default(),
            require_approval: true,
        }
    }
}

impl AutomationSettings {
    /// Timer period, clamped between one minute and [`MAX_INTERVAL_MINUTES`].
    pub fn interval_duration(&self) -> Duration {
        Duration::from_secs(self.interval.clamp(1, MAX_INTERVAL_MINUTES) * 60)
    }

    pub fn apply(&mut self, update: SettingsUpdate) {
        if let Some(interval) = update.interval {
            self.interval = interval;
        }
        if let Some(max_age) = update.max_age {
            self.max_age = max_age;
        }
        if let Some(max_articles) = update.max_articles {
            self.max_articles = max_articles;
        }
        if let Some(content_params) = update.content_params {
            self.content_params = content_params;
        }
        if let Some(image_params) = update.image_params {
            self.image_params = image_params;
        }
        if let Some(require_approval) = update.require_approval {
            self.require_approval = require_approval;
        }
    }
}

/// Partial settings; `Some` fields replace the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsUpdate {
    pub interval: Option<u64>,
    pub max_age: Option<u32>,
    pub max_articles: Option<usize>,
    pub content_params: Option<ContentParams>,
    pub image_params: Option<ImageParams>,
    pub require_approval: Option<bool>,
}

impl SettingsUpdate {
    pub fn is_empty(&self) -> bool {
        *self == SettingsUpdate::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogType {
    Info,
    Success,
    Warning,
    Error,
}

impl LogType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogType::Info => "info",
            LogType::Success => "success",
            LogType::Warning => "warning",
            LogType::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogSource {
    Feed,
    Content,
    Image,
    Publish,
}

impl LogSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogSource::Feed => "feed",
            LogSource::Content => "content",
            LogSource::Image => "image",
            LogSource::Publish => "publish",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub message: String,
    #[serde(rename = "type")]
    pub log_type: LogType,
    pub source: LogSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStatus {
    pub is_running: bool,
    pub last_run_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewrittenContent {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_feed_size_mb: usize,
    pub follow_redirects: bool,
    pub max_redirects: usize,
    /// Minimum spacing between two requests to the same host.
    pub min_host_interval_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "News-Automation/1.0".to_string(),
            timeout_seconds: 30,
            max_feed_size_mb: 10,
            follow_redirects: true,
            max_redirects: 5,
            min_host_interval_ms: 1000,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AutomationError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Feed parse error: {0}")]
    Parse(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Failed to fetch {feed}: {message}")]
    Fetch { feed: String, message: String },

    #[error("{provider} generation failed: {message}")]
    Generation { provider: String, message: String },

    #[error("Publish failed: {0}")]
    Publish(String),

    #[error("{operation} timed out after {seconds}s")]
    Timeout { operation: String, seconds: u64 },

    #[error("Not configured: {0}")]
    NotConfigured(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("General error: {0}")]
    General(String),
}

impl AutomationError {
    pub fn generation(provider: impl Into<String>, message: impl Into<String>) -> Self {
        AutomationError::Generation {
            provider: provider.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AutomationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_update_only_touches_given_fields() {
        let mut settings = AutomationSettings::default();
        settings.apply(SettingsUpdate {
            max_articles: Some(7),
            require_approval: Some(false),
            ..Default::default()
        });

        assert_eq!(settings.max_articles, 7);
        assert!(!settings.require_approval);
        assert_eq!(settings.interval, 60);
        assert_eq!(settings.max_age, 1);
    }

    #[test]
    fn interval_never_drops_below_a_minute() {
        let settings = AutomationSettings {
            interval: 0,
            ..Default::default()
        };
        assert_eq!(settings.interval_duration(), Duration::from_secs(60));
    }

    #[test]
    fn huge_interval_is_capped_at_a_year() {
        let settings = AutomationSettings {
            interval: u64::MAX / 2,
            ..Default::default()
        };
        assert_eq!(
            settings.interval_duration(),
            Duration::from_secs(MAX_INTERVAL_MINUTES * 60)
        );
    }

    #[test]
    fn pending_article_serializes_flat_with_status() {
        let article = GeneratedArticle {
            id: "a1".to_string(),
            title: "Title".to_string(),
            content: "Body".to_string(),
            summary: "Sum".to_string(),
            image_url: "https://img".to_string(),
            source_url: "https://src".to_string(),
            source_name: "Src".to_string(),
            publish_date: Utc::now(),
            tags: vec!["AI".to_string()],
        };
        let json = serde_json::to_value(PendingArticle::new(article)).unwrap();

        assert_eq!(json["id"], "a1");
        assert_eq!(json["imageUrl"], "https://img");
        assert_eq!(json["status"], "pending");
    }

    #[test]
    fn enums_use_wire_names() {
        assert_eq!(serde_json::to_string(&ImageStyle::Render3d).unwrap(), "\"3d-render\"");
        assert_eq!(serde_json::to_string(&ImageStyle::DigitalArt).unwrap(), "\"digital-art\"");
        assert_eq!(serde_json::to_string(&AspectRatio::Widescreen).unwrap(), "\"16:9\"");
        assert_eq!(serde_json::to_string(&LogType::Warning).unwrap(), "\"warning\"");

        let params: ContentParams = serde_json::from_str(r#"{"tone":"academic"}"#).unwrap();
        assert_eq!(params.tone, Tone::Academic);
        assert_eq!(params.topic, "technology");
    }
}
