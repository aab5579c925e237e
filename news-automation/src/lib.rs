pub mod activity_log;
pub mod config;
pub mod fetcher;
pub mod filter;
pub mod generation;
pub mod orchestrator;
pub mod parser;
pub mod publisher;
pub mod queue;
pub mod store;
pub mod traits;
pub mod types;
pub mod utils;

pub use activity_log::{ActivityLog, MAX_LOG_ENTRIES};
pub use config::AppConfig;
pub use fetcher::HttpFeedFetcher;
pub use filter::filter_items;
pub use generation::{LocalGenerator, OpenAiConfig, OpenAiGenerator, TieredGenerator};
pub use orchestrator::{CycleReport, Orchestrator, OrchestratorBuilder, OrchestratorConfig};
pub use parser::FeedParser;
pub use publisher::ArchivePublisher;
pub use queue::ApprovalQueue;
pub use store::{MemoryStore, SqliteStore};
pub use traits::{FeedFetcher, GenerationProvider, Publisher, Store};
pub use types::*;
