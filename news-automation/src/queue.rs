use crate::store::{load_json, save_json, PENDING_ARTICLES_KEY};
use crate::traits::Store;
use crate::types::{GeneratedArticle, PendingArticle, Result, ReviewDecision, ReviewStatus};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

/// Durable list of generated articles awaiting an editor's decision.
/// Every mutation is written through to the store before returning.
pub struct ApprovalQueue {
    store: Arc<dyn Store>,
    articles: Mutex<Vec<PendingArticle>>,
}

impl ApprovalQueue {
    /// Restore the queue from `store`. Unreadable data is logged and dropped.
    pub async fn load(store: Arc<dyn Store>) -> Self {
        let articles = match load_json::<Vec<PendingArticle>>(store.as_ref(), PENDING_ARTICLES_KEY).await {
            Ok(Some(articles)) => {
                info!("Loaded {} queued articles", articles.len());
                articles
            }
            Ok(None) => Vec::new(),
            Err(e) => {
                error!("Failed to load approval queue, starting empty: {}", e);
                Vec::new()
            }
        };

        Self {
            store,
            articles: Mutex::new(articles),
        }
    }

    async fn persist(&self, articles: &[PendingArticle]) -> Result<()> {
        save_json(self.store.as_ref(), PENDING_ARTICLES_KEY, articles).await
    }

    pub async fn enqueue(&self, article: GeneratedArticle) -> Result<()> {
        let mut articles = self.articles.lock().await;
        debug!("Queueing article {}", article.id);
        articles.push(PendingArticle::new(article));
        if let Err(e) = self.persist(&articles).await {
            articles.pop();
            return Err(e);
        }
        Ok(())
    }

    /// Entries still awaiting review, in insertion order.
    pub async fn list_pending(&self) -> Vec<PendingArticle> {
        self.articles
            .lock()
            .await
            .iter()
            .filter(|a| a.is_pending())
            .cloned()
            .collect()
    }

    pub async fn count(&self) -> usize {
        self.articles.lock().await.iter().filter(|a| a.is_pending()).count()
    }

    pub async fn get(&self, id: &str) -> Option<PendingArticle> {
        self.articles.lock().await.iter().find(|a| a.id() == id).cloned()
    }

    /// Replace title and content of a pending entry. Reviewed entries are left alone.
    pub async fn update_content(&self, id: &str, title: &str, content: &str) -> Result<bool> {
        let mut articles = self.articles.lock().await;
        let Some(entry) = articles.iter_mut().find(|a| a.id() == id) else {
            return Ok(false);
        };
        if !entry.is_pending() {
            return Ok(false);
        }

        entry.article.title = title.to_string();
        entry.article.content = content.to_string();
        self.persist(&articles).await?;
        Ok(true)
    }

    /// Record a decision. Unknown ids give `false`; repeating the decision an
    /// entry already carries is a no-op `true`; contradicting it is `false`.
    pub async fn mark_reviewed(&self, id: &str, decision: ReviewDecision) -> Result<bool> {
        let target = ReviewStatus::from(decision);
        let mut articles = self.articles.lock().await;

        let Some(index) = articles.iter().position(|a| a.id() == id) else {
            return Ok(false);
        };

        match articles[index].status {
            ReviewStatus::Pending => {
                articles[index].status = target;
                if let Err(e) = self.persist(&articles).await {
                    articles[index].status = ReviewStatus::Pending;
                    return Err(e);
                }
                Ok(true)
            }
            current => Ok(current == target),
        }
    }

    /// Return an approved entry to review, e.g. when publishing it failed.
    pub async fn reopen(&self, id: &str) -> Result<bool> {
        let mut articles = self.articles.lock().await;

        let Some(index) = articles
            .iter()
            .position(|a| a.id() == id && a.status == ReviewStatus::Approved)
        else {
            return Ok(false);
        };

        articles[index].status = ReviewStatus::Pending;
        if let Err(e) = self.persist(&articles).await {
            articles[index].status = ReviewStatus::Approved;
            return Err(e);
        }
        Ok(true)
    }
}
