use anyhow::{Context, Result};
use clap::Parser;
use news_automation::config::Command;
use news_automation::{
    AppConfig, ArchivePublisher, FetchConfig, GenerationProvider, HttpFeedFetcher, LocalGenerator,
    OpenAiGenerator, OrchestratorBuilder, ReviewDecision, SqliteStore, Store, TieredGenerator,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)))
        .init();

    info!("Starting news automation");

    let store = Arc::new(
        SqliteStore::new(&config.database_url)
            .await
            .with_context(|| format!("Failed to open database {}", config.database_url))?,
    );
    let store_handle: Arc<dyn Store> = store.clone();

    let mut generator = TieredGenerator::new(Arc::new(LocalGenerator::new()));
    match config.openai_config() {
        Some(openai) => {
            generator = generator
                .with_premium(Arc::new(OpenAiGenerator::new(openai)?))
                .with_premium_media(config.premium_media);
        }
        None => warn!("OPENAI_API_KEY not set, using the local generator only"),
    }
    info!("Generation backend: {}", generator.name());

    let fetcher = Arc::new(HttpFeedFetcher::new(FetchConfig::default())?);
    let publisher = Arc::new(ArchivePublisher::new(store_handle.clone()));

    let orchestrator = OrchestratorBuilder::new(fetcher, Arc::new(generator), publisher.clone(), store_handle)
        .with_config(config.orchestrator_config())
        .build()
        .await;

    match &config.command {
        Command::Run(args) => {
            let sources = config.load_sources().context("Failed to load feed sources")?;
            let update = args.to_update(&orchestrator.get_settings().await);
            info!("Running automation over {} sources", sources.len());

            orchestrator.start(sources, Some(update)).await;
            tokio::signal::ctrl_c().await.context("Failed to listen for Ctrl-C")?;
            orchestrator.stop().await;
        }
        Command::Once { logs } => {
            let sources = config.load_sources().context("Failed to load feed sources")?;
            let report = orchestrator.run_cycle(&sources).await;
            info!(
                "Cycle finished: {} selected, {} queued, {} published, {} failed",
                report.selected,
                report.queued,
                report.published,
                report.failed_items + report.queue_failures + report.publish_failures
            );
            print_json(&report.articles)?;
            if *logs {
                print_json(&orchestrator.get_logs())?;
            }
        }
        Command::Pending => {
            print_json(&orchestrator.list_pending().await)?;
        }
        Command::Approve { id, title, content } => {
            let approved = match (title, content) {
                (None, None) => orchestrator.mark_reviewed(id, ReviewDecision::Approved).await,
                _ => {
                    let current = orchestrator
                        .list_pending()
                        .await
                        .into_iter()
                        .find(|a| a.id() == id.as_str())
                        .with_context(|| format!("Article {} is not awaiting review", id))?;
                    let title = title.as_deref().unwrap_or(&current.article.title);
                    let content = content.as_deref().unwrap_or(&current.article.content);
                    orchestrator.approve_with_edits(id, title, content).await
                }
            };
            println!("{}", if approved { "approved" } else { "not approved" });
        }
        Command::Reject { id } => {
            let rejected = orchestrator.mark_reviewed(id, ReviewDecision::Rejected).await;
            println!("{}", if rejected { "rejected" } else { "not rejected" });
        }
        Command::Settings(args) => {
            let update = args.to_update(&orchestrator.get_settings().await);
            let settings = if update.is_empty() {
                orchestrator.get_settings().await
            } else {
                orchestrator.update_settings(update).await?
            };
            print_json(&settings)?;
        }
        Command::Published => {
            print_json(&publisher.list_articles().await?)?;
        }
    }

    store.close().await;
    info!("News automation finished");
    Ok(())
}
