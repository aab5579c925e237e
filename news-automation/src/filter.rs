use crate::types::RawItem;
use chrono::{DateTime, Duration, Utc};

/// Keywords an item must mention (title or description) to be considered.
pub const DEFAULT_KEYWORDS: [&str; 3] = ["artificial intelligence", "AI", "machine learning"];

pub fn default_keywords() -> Vec<String> {
    DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect()
}

/// Keep items no older than `max_age_days` whose title or description
/// mentions at least one keyword (case-insensitive). Input order is kept.
pub fn filter_items(
    items: &[RawItem],
    max_age_days: u32,
    keywords: &[String],
    now: DateTime<Utc>,
) -> Vec<RawItem> {
    let max_age = Duration::days(i64::from(max_age_days));
    let keywords: Vec<String> = keywords.iter().map(|k| k.to_lowercase()).collect();

    items
        .iter()
        .filter(|item| item.age(now) <= max_age)
        .filter(|item| mentions_any(item, &keywords))
        .cloned()
        .collect()
}

fn mentions_any(item: &RawItem, lowercase_keywords: &[String]) -> bool {
    let text = format!("{} {}", item.title, item.description).to_lowercase();
    lowercase_keywords.iter().any(|keyword| text.contains(keyword.as_str()))
}
