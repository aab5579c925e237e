pub mod local;
pub mod openai;

pub use local::LocalGenerator;
pub use openai::{OpenAiConfig, OpenAiGenerator};

use crate::traits::GenerationProvider;
use crate::types::{AspectRatio, ContentParams, ImageStyle, Result, RewrittenContent};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

/// Premium backend with an always-available fallback.
///
/// The premium backend is only consulted when asked for: `rewrite` follows
/// `ContentParams::use_premium`, while `summarize` and `generate_image` follow
/// the `premium_media` switch. A premium failure is logged and the call is
/// retried on the fallback; only a fallback failure reaches the caller.
pub struct TieredGenerator {
    premium: Option<Arc<dyn GenerationProvider>>,
    fallback: Arc<dyn GenerationProvider>,
    premium_media: bool,
}

impl TieredGenerator {
    pub fn new(fallback: Arc<dyn GenerationProvider>) -> Self {
        Self {
            premium: None,
            fallback,
            premium_media: false,
        }
    }

    pub fn with_premium(mut self, premium: Arc<dyn GenerationProvider>) -> Self {
        self.premium = Some(premium);
        self
    }

    pub fn with_premium_media(mut self, enabled: bool) -> Self {
        self.premium_media = enabled;
        self
    }

    fn premium_if(&self, wanted: bool) -> Option<&Arc<dyn GenerationProvider>> {
        if wanted {
            self.premium.as_ref()
        } else {
            None
        }
    }
}

#[async_trait]
impl GenerationProvider for TieredGenerator {
    fn name(&self) -> String {
        match &self.premium {
            Some(premium) => format!("Tiered({} with {} fallback)", premium.name(), self.fallback.name()),
            None => self.fallback.name(),
        }
    }

    async fn rewrite(
        &self,
        title: &str,
        content: &str,
        source_name: &str,
        params: &ContentParams,
    ) -> Result<RewrittenContent> {
        if let Some(premium) = self.premium_if(params.use_premium) {
            match premium.rewrite(title, content, source_name, params).await {
                Ok(rewritten) => return Ok(rewritten),
                Err(e) => warn!("{} rewrite failed, falling back to {}: {}", premium.name(), self.fallback.name(), e),
            }
        }

        debug!("Rewriting with {}", self.fallback.name());
        self.fallback.rewrite(title, content, source_name, params).await
    }

    async fn summarize(&self, content: &str, max_length: usize) -> Result<String> {
        if let Some(premium) = self.premium_if(self.premium_media) {
            match premium.summarize(content, max_length).await {
                Ok(summary) => return Ok(summary),
                Err(e) => warn!("{} summary failed, falling back to {}: {}", premium.name(), self.fallback.name(), e),
            }
        }

        self.fallback.summarize(content, max_length).await
    }

    async fn generate_image(
        &self,
        prompt: &str,
        style: ImageStyle,
        aspect_ratio: AspectRatio,
    ) -> Result<String> {
        if let Some(premium) = self.premium_if(self.premium_media) {
            match premium.generate_image(prompt, style, aspect_ratio).await {
                Ok(url) => return Ok(url),
                Err(e) => warn!("{} image failed, falling back to {}: {}", premium.name(), self.fallback.name(), e),
            }
        }

        self.fallback.generate_image(prompt, style, aspect_ratio).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AutomationError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Scripted {
        label: &'static str,
        fail: bool,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new(label: &'static str, fail: bool) -> Arc<Self> {
            Arc::new(Self {
                label,
                fail,
                calls: AtomicUsize::new(0),
            })
        }

        fn answer(&self) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(AutomationError::generation(self.label, "scripted failure"))
            } else {
                Ok(self.label.to_string())
            }
        }
    }

    #[async_trait]
    impl GenerationProvider for Scripted {
        fn name(&self) -> String {
            self.label.to_string()
        }

        async fn rewrite(&self, _: &str, _: &str, _: &str, _: &ContentParams) -> Result<RewrittenContent> {
            let title = self.answer()?;
            Ok(RewrittenContent {
                title,
                content: String::new(),
            })
        }

        async fn summarize(&self, _: &str, _: usize) -> Result<String> {
            self.answer()
        }

        async fn generate_image(&self, _: &str, _: ImageStyle, _: AspectRatio) -> Result<String> {
            self.answer()
        }
    }

    fn premium_params() -> ContentParams {
        ContentParams {
            use_premium: true,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn rewrite_uses_premium_only_when_requested() {
        let premium = Scripted::new("premium", false);
        let local = Scripted::new("local", false);
        let tiered = TieredGenerator::new(local.clone()).with_premium(premium.clone());

        let plain = tiered.rewrite("t", "c", "s", &ContentParams::default()).await.unwrap();
        assert_eq!(plain.title, "local");

        let fancy = tiered.rewrite("t", "c", "s", &premium_params()).await.unwrap();
        assert_eq!(fancy.title, "premium");
        assert_eq!(premium.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn premium_failure_falls_back() {
        let premium = Scripted::new("premium", true);
        let local = Scripted::new("local", false);
        let tiered = TieredGenerator::new(local.clone()).with_premium(premium.clone());

        let rewritten = tiered.rewrite("t", "c", "s", &premium_params()).await.unwrap();
        assert_eq!(rewritten.title, "local");
        assert_eq!(premium.calls.load(Ordering::SeqCst), 1);
        assert_eq!(local.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn fallback_failure_propagates() {
        let local = Scripted::new("local", true);
        let tiered = TieredGenerator::new(local);

        let result = tiered.summarize("text", 150).await;
        assert!(matches!(result, Err(AutomationError::Generation { .. })));
    }

    #[tokio::test]
    async fn media_calls_follow_the_premium_media_switch() {
        let premium = Scripted::new("premium", false);
        let local = Scripted::new("local", false);

        let without = TieredGenerator::new(local.clone()).with_premium(premium.clone());
        let image = without
            .generate_image("p", ImageStyle::Realistic, AspectRatio::Widescreen)
            .await
            .unwrap();
        assert_eq!(image, "local");

        let with = TieredGenerator::new(local).with_premium(premium).with_premium_media(true);
        assert_eq!(with.summarize("text", 10).await.unwrap(), "premium");
    }
}
