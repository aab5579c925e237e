use crate::types::{
    AspectRatio, ContentParams, FeedSource, GeneratedArticle, ImageStyle, RawItem, Result,
    RewrittenContent,
};
use async_trait::async_trait;

/// Trait for pulling raw items out of a configured feed
#[async_trait]
pub trait FeedFetcher: Send + Sync {
    /// Fetch and parse every entry currently published by `source`.
    /// Network and parse failures come back as `Err`; callers decide how to log them.
    async fn fetch(&self, source: &FeedSource) -> Result<Vec<RawItem>>;
}

/// Trait for backends that rewrite text, summarize it and produce an image reference
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Human-readable name, used in logs and errors
    fn name(&self) -> String;

    async fn rewrite(
        &self,
        title: &str,
        content: &str,
        source_name: &str,
        params: &ContentParams,
    ) -> Result<RewrittenContent>;

    async fn summarize(&self, content: &str, max_length: usize) -> Result<String>;

    /// Returns a URL (or other reference) to the produced image
    async fn generate_image(
        &self,
        prompt: &str,
        style: ImageStyle,
        aspect_ratio: AspectRatio,
    ) -> Result<String>;
}

/// Final sink for articles that made it through the pipeline
#[async_trait]
pub trait Publisher: Send + Sync {
    /// `Ok(false)` means the sink declined the article without a hard error.
    async fn publish(&self, article: &GeneratedArticle) -> Result<bool>;
}

/// Durable string key-value storage
#[async_trait]
pub trait Store: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn put(&self, key: &str, value: &str) -> Result<()>;
}
