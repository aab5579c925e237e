use crate::store::{load_json, save_json, PUBLISHED_ARTICLES_KEY};
use crate::traits::{Publisher, Store};
use crate::types::{AutomationError, GeneratedArticle, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Publisher that archives articles in the key-value store.
pub struct ArchivePublisher {
    store: Arc<dyn Store>,
    // Serialises read-modify-write of the archive
    write_lock: Mutex<()>,
}

impl ArchivePublisher {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    async fn load(&self) -> Result<Vec<GeneratedArticle>> {
        Ok(load_json(self.store.as_ref(), PUBLISHED_ARTICLES_KEY)
            .await?
            .unwrap_or_default())
    }

    /// Published articles, newest publish date first.
    pub async fn list_articles(&self) -> Result<Vec<GeneratedArticle>> {
        let mut articles = self.load().await?;
        articles.sort_by(|a, b| b.publish_date.cmp(&a.publish_date));
        Ok(articles)
    }

    pub async fn get_article(&self, id: &str) -> Result<Option<GeneratedArticle>> {
        Ok(self.load().await?.into_iter().find(|a| a.id == id))
    }
}

#[async_trait]
impl Publisher for ArchivePublisher {
    async fn publish(&self, article: &GeneratedArticle) -> Result<bool> {
        if article.title.trim().is_empty() || article.content.trim().is_empty() {
            return Err(AutomationError::Publish(format!(
                "article {} has no title or content",
                article.id
            )));
        }

        let _guard = self.write_lock.lock().await;
        let mut articles = self.load().await?;

        if articles.iter().any(|a| a.id == article.id) {
            warn!("Article {} is already published", article.id);
            return Ok(false);
        }

        articles.push(article.clone());
        save_json(self.store.as_ref(), PUBLISHED_ARTICLES_KEY, &articles).await?;

        info!("Archived article {} ({} total)", article.id, articles.len());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::{Duration, Utc};

    fn article(id: &str, age_hours: i64) -> GeneratedArticle {
        GeneratedArticle {
            id: id.to_string(),
            title: format!("Title {}", id),
            content: "Body".to_string(),
            summary: "Summary".to_string(),
            image_url: "https://img".to_string(),
            source_url: "https://src".to_string(),
            source_name: "Source".to_string(),
            publish_date: Utc::now() - Duration::hours(age_hours),
            tags: vec![],
        }
    }

    #[tokio::test]
    async fn lists_newest_first() {
        let publisher = ArchivePublisher::new(Arc::new(MemoryStore::new()));
        assert!(publisher.publish(&article("old", 5)).await.unwrap());
        assert!(publisher.publish(&article("new", 1)).await.unwrap());

        let ids: Vec<String> = publisher.list_articles().await.unwrap().into_iter().map(|a| a.id).collect();
        assert_eq!(ids, vec!["new", "old"]);
        assert!(publisher.get_article("old").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn republishing_is_declined() {
        let publisher = ArchivePublisher::new(Arc::new(MemoryStore::new()));
        assert!(publisher.publish(&article("a", 0)).await.unwrap());
        assert!(!publisher.publish(&article("a", 0)).await.unwrap());
        assert_eq!(publisher.list_articles().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn empty_articles_are_rejected() {
        let publisher = ArchivePublisher::new(Arc::new(MemoryStore::new()));
        let mut blank = article("blank", 0);
        blank.content = "   ".to_string();

        assert!(matches!(publisher.publish(&blank).await, Err(AutomationError::Publish(_))));
    }
}
