use crate::generation::OpenAiConfig;
use crate::orchestrator::OrchestratorConfig;
use crate::types::{
    ArticleLength, AspectRatio, AutomationError, AutomationSettings, FeedSource, ImageParams, ImageStyle,
    Perspective, Result, SettingsUpdate, Tone, WritingStyle,
};
use crate::utils::url::is_valid_feed_url;
use clap::{Args, Parser, Subcommand};
use serde::de::DeserializeOwned;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "news-automation", about = "Fetch, rewrite and publish news from RSS feeds")]
pub struct AppConfig {
    /// SQLite database holding settings, the approval queue and published articles
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://news-automation.db")]
    pub database_url: String,

    /// Enables the OpenAI backend when set
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    #[arg(long, default_value = "gpt-4o")]
    pub text_model: String,

    #[arg(long, default_value = "dall-e-3")]
    pub image_model: String,

    #[arg(long, default_value_t = 0.7)]
    pub temperature: f32,

    #[arg(long, env = "OPENAI_BASE_URL", default_value = "https://api.openai.com/v1")]
    pub openai_base_url: String,

    /// Also use the OpenAI backend for summaries and images
    #[arg(long)]
    pub premium_media: bool,

    /// Upper bound on each fetch, generation and publish call
    #[arg(long, default_value_t = 60)]
    pub call_timeout_secs: u64,

    /// Retries after a failed external call
    #[arg(long, default_value_t = 0)]
    pub max_retries: u32,

    /// Seed for article selection
    #[arg(long)]
    pub seed: Option<u64>,

    /// JSON file with an array of feed sources
    #[arg(long)]
    pub sources: Option<PathBuf>,

    /// Extra feed as NAME=URL (repeatable)
    #[arg(long = "feed", value_parser = parse_feed_arg)]
    pub feeds: Vec<FeedSource>,

    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start automation and keep running until Ctrl-C
    Run(SettingsArgs),
    /// Run a single cycle and print its report
    Once {
        /// Print the activity log afterwards
        #[arg(long)]
        logs: bool,
    },
    /// List articles awaiting review
    Pending,
    /// Approve (and publish) a pending article
    Approve {
        id: String,
        /// Replace the title before approving
        #[arg(long)]
        title: Option<String>,
        /// Replace the content before approving
        #[arg(long)]
        content: Option<String>,
    },
    /// Reject a pending article
    Reject { id: String },
    /// Show settings, or update them when flags are given
    Settings(SettingsArgs),
    /// List published articles, newest first
    Published,
}

/// Flags mirroring `AutomationSettings`; only the given ones are changed.
#[derive(Args, Debug, Default, Clone)]
pub struct SettingsArgs {
    /// Minutes between cycles
    #[arg(long)]
    pub interval: Option<u64>,

    /// Maximum article age in days
    #[arg(long)]
    pub max_age: Option<u32>,

    #[arg(long)]
    pub max_articles: Option<usize>,

    #[arg(long)]
    pub require_approval: Option<bool>,

    #[arg(long, value_parser = parse_wire::<Tone>)]
    pub tone: Option<Tone>,

    #[arg(long, value_parser = parse_wire::<WritingStyle>)]
    pub style: Option<WritingStyle>,

    #[arg(long, value_parser = parse_wire::<ArticleLength>)]
    pub length: Option<ArticleLength>,

    #[arg(long, value_parser = parse_wire::<Perspective>)]
    pub perspective: Option<Perspective>,

    #[arg(long)]
    pub topic: Option<String>,

    #[arg(long)]
    pub use_premium: Option<bool>,

    #[arg(long, value_parser = parse_wire::<ImageStyle>)]
    pub image_style: Option<ImageStyle>,

    #[arg(long, value_parser = parse_wire::<AspectRatio>)]
    pub aspect_ratio: Option<AspectRatio>,
}

impl SettingsArgs {
    /// Build an update relative to `current`; nested params are merged field by field.
    pub fn to_update(&self, current: &AutomationSettings) -> SettingsUpdate {
        let content_changed = self.tone.is_some()
            || self.style.is_some()
            || self.length.is_some()
            || self.perspective.is_some()
            || self.topic.is_some()
            || self.use_premium.is_some();

        let content_params = content_changed.then(|| {
            let mut params = current.content_params.clone();
            if let Some(tone) = self.tone {
                params.tone = tone;
            }
            if let Some(style) = self.style {
                params.style = style;
            }
            if let Some(length) = self.length {
                params.length = length;
            }
            if let Some(perspective) = self.perspective {
                params.perspective = perspective;
            }
            if let Some(topic) = &self.topic {
                params.topic = topic.clone();
            }
            if let Some(use_premium) = self.use_premium {
                params.use_premium = use_premium;
            }
            params
        });

        let image_params = (self.image_style.is_some() || self.aspect_ratio.is_some()).then(|| ImageParams {
            style: self.image_style.unwrap_or(current.image_params.style),
            aspect_ratio: self.aspect_ratio.unwrap_or(current.image_params.aspect_ratio),
        });

        SettingsUpdate {
            interval: self.interval,
            max_age: self.max_age,
            max_articles: self.max_articles,
            content_params,
            image_params,
            require_approval: self.require_approval,
        }
    }
}

/// Parse a lowercase wire name (`casual`, `3d-render`, `16:9`) through serde.
fn parse_wire<T: DeserializeOwned>(value: &str) -> std::result::Result<T, String> {
    serde_json::from_value(serde_json::Value::String(value.to_string()))
        .map_err(|_| format!("unsupported value '{}'", value))
}

fn parse_feed_arg(value: &str) -> std::result::Result<FeedSource, String> {
    let (name, url) = value
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=URL, got '{}'", value))?;

    let (name, url) = (name.trim(), url.trim());
    if name.is_empty() {
        return Err("feed name must not be empty".to_string());
    }
    if !is_valid_feed_url(url) {
        return Err(format!("'{}' is not an http(s) URL", url));
    }

    Ok(FeedSource::new(name, url))
}

impl AppConfig {
    /// Sources from `--sources` followed by every `--feed`.
    pub fn load_sources(&self) -> Result<Vec<FeedSource>> {
        let mut sources = match &self.sources {
            Some(path) => {
                let raw = std::fs::read_to_string(path)?;
                parse_sources(&raw)?
            }
            None => Vec::new(),
        };
        sources.extend(self.feeds.iter().cloned());
        Ok(sources)
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            call_timeout: Duration::from_secs(self.call_timeout_secs.max(1)),
            max_retries: self.max_retries,
            seed: self.seed,
            ..Default::default()
        }
    }

    /// `None` when no API key is configured.
    pub fn openai_config(&self) -> Option<OpenAiConfig> {
        let api_key = self.openai_api_key.as_deref()?.trim();
        if api_key.is_empty() {
            return None;
        }

        Some(OpenAiConfig {
            api_key: api_key.to_string(),
            text_model: self.text_model.clone(),
            image_model: self.image_model.clone(),
            temperature: self.temperature,
            base_url: self.openai_base_url.clone(),
        })
    }
}

#[derive(serde::Deserialize)]
struct SourceEntry {
    #[serde(default)]
    id: Option<String>,
    name: String,
    url: String,
    #[serde(default = "default_active")]
    active: bool,
}

fn default_active() -> bool {
    true
}

/// Parse a JSON array of `{id?, name, url, active?}` objects.
pub fn parse_sources(raw: &str) -> Result<Vec<FeedSource>> {
    let entries: Vec<SourceEntry> = serde_json::from_str(raw)?;

    entries
        .into_iter()
        .map(|entry| {
            if !is_valid_feed_url(&entry.url) {
                return Err(AutomationError::General(format!(
                    "feed '{}' has an unsupported URL: {}",
                    entry.name, entry.url
                )));
            }
            let mut source = FeedSource::new(entry.name, entry.url);
            if let Some(id) = entry.id {
                source.id = id;
            }
            source.active = entry.active;
            Ok(source)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_global_flags_and_feeds() {
        let config = AppConfig::try_parse_from([
            "news-automation",
            "--database-url",
            "sqlite::memory:",
            "--feed",
            "Wired=https://www.wired.com/feed/rss",
            "--seed",
            "7",
            "once",
        ])
        .unwrap();

        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.feeds.len(), 1);
        assert_eq!(config.feeds[0].name, "Wired");
        assert_eq!(config.orchestrator_config().seed, Some(7));
        assert!(matches!(config.command, Command::Once { logs: false }));
    }

    #[test]
    fn rejects_malformed_feed_flags() {
        let result = AppConfig::try_parse_from(["news-automation", "--feed", "no-equals-sign", "once"]);
        assert!(result.is_err());

        let result = AppConfig::try_parse_from(["news-automation", "--feed", "X=ftp://host/rss", "once"]);
        assert!(result.is_err());
    }

    #[test]
    fn settings_flags_merge_into_current_params() {
        let config = AppConfig::try_parse_from([
            "news-automation",
            "settings",
            "--tone",
            "casual",
            "--aspect-ratio",
            "9:16",
            "--max-articles",
            "5",
        ])
        .unwrap();

        let Command::Settings(args) = config.command else {
            panic!("expected settings command");
        };

        let current = AutomationSettings::default();
        let update = args.to_update(&current);

        assert_eq!(update.max_articles, Some(5));
        let content = update.content_params.unwrap();
        assert_eq!(content.tone, Tone::Casual);
        assert_eq!(content.topic, "technology");
        let image = update.image_params.unwrap();
        assert_eq!(image.aspect_ratio, AspectRatio::Portrait);
        assert_eq!(image.style, ImageStyle::Realistic);
        assert!(update.interval.is_none());
    }

    #[test]
    fn empty_settings_flags_produce_empty_update() {
        let update = SettingsArgs::default().to_update(&AutomationSettings::default());
        assert!(update.is_empty());
    }

    #[test]
    fn sources_file_format() {
        let raw = r#"[
            {"name": "TechCrunch", "url": "https://techcrunch.com/feed/"},
            {"id": "mit", "name": "MIT", "url": "https://news.mit.edu/rss", "active": false}
        ]"#;

        let sources = parse_sources(raw).unwrap();
        assert_eq!(sources.len(), 2);
        assert!(sources[0].active);
        assert_eq!(sources[1].id, "mit");
        assert!(!sources[1].active);

        assert!(parse_sources(r#"[{"name": "Bad", "url": "nope"}]"#).is_err());
    }

    #[test]
    fn openai_needs_a_key() {
        let config = AppConfig::try_parse_from(["news-automation", "pending"]).unwrap();
        if std::env::var("OPENAI_API_KEY").is_err() {
            assert!(config.openai_config().is_none());
        }
    }
}
