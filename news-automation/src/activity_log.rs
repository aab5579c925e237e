use crate::types::{LogEntry, LogSource, LogType};
use chrono::Utc;
use std::collections::VecDeque;
use std::sync::Mutex;
use tracing::{error, info, warn};
use uuid::Uuid;

pub const MAX_LOG_ENTRIES: usize = 100;

/// Bounded, in-memory record of pipeline events, read newest first.
/// Every entry is also emitted through `tracing`.
#[derive(Debug, Default)]
pub struct ActivityLog {
    entries: Mutex<VecDeque<LogEntry>>,
}

impl ActivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, message: impl Into<String>, log_type: LogType, source: LogSource) {
        let message = message.into();

        match log_type {
            LogType::Error => error!(source = source.as_str(), "{}", message),
            LogType::Warning => warn!(source = source.as_str(), "{}", message),
            LogType::Info | LogType::Success => info!(source = source.as_str(), "{}", message),
        }

        let entry = LogEntry {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            message,
            log_type,
            source,
        };

        let mut entries = self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.push_front(entry);
        entries.truncate(MAX_LOG_ENTRIES);
    }

    pub fn info(&self, message: impl Into<String>, source: LogSource) {
        self.append(message, LogType::Info, source);
    }

    pub fn success(&self, message: impl Into<String>, source: LogSource) {
        self.append(message, LogType::Success, source);
    }

    pub fn warning(&self, message: impl Into<String>, source: LogSource) {
        self.append(message, LogType::Warning, source);
    }

    pub fn error(&self, message: impl Into<String>, source: LogSource) {
        self.append(message, LogType::Error, source);
    }

    /// Snapshot, newest first.
    pub fn list(&self) -> Vec<LogEntry> {
        let entries = self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.iter().cloned().collect()
    }
}
