use crate::types::{AutomationError, RawItem, Result};
use crate::utils::text::strip_html;
use chrono::{DateTime, Utc};
use feed_rs::parser;
use std::collections::HashSet;
use tracing::{debug, info};
use uuid::Uuid;

/// Feed-level metadata alongside the parsed items
#[derive(Debug)]
pub struct ParsedFeed {
    pub title: Option<String>,
    pub description: Option<String>,
    pub items: Vec<RawItem>,
}

pub struct FeedParser;

impl FeedParser {
    /// Parse RSS/Atom content into raw items attributed to `source_name`.
    /// Entries without a date are stamped with `fetched_at`.
    pub fn parse_feed(content: &str, source_name: &str, fetched_at: DateTime<Utc>) -> Result<ParsedFeed> {
        debug!("Parsing feed content ({} bytes)", content.len());

        let feed = parser::parse(content.as_bytes())
            .map_err(|e| AutomationError::Parse(format!("Failed to parse feed: {}", e)))?;

        let title = feed.title.map(|t| t.content);
        let description = feed.description.map(|d| d.content);

        let mut seen_guids = HashSet::new();
        let mut seen_links = HashSet::new();
        let mut items = Vec::new();

        for entry in feed.entries {
            if let Some(item) = Self::parse_entry(entry, source_name, fetched_at, &mut seen_guids, &mut seen_links) {
                items.push(item);
            }
        }

        info!("Parsed feed {} with {} entries", source_name, items.len());

        Ok(ParsedFeed {
            title,
            description,
            items,
        })
    }

    fn parse_entry(
        entry: feed_rs::model::Entry,
        source_name: &str,
        fetched_at: DateTime<Utc>,
        seen_guids: &mut HashSet<String>,
        seen_links: &mut HashSet<String>,
    ) -> Option<RawItem> {
        let title = entry.title.map(|t| t.content).unwrap_or_else(|| "Untitled".to_string());

        // Entries without a link cannot be attributed back to their source
        let link = entry.links.first()?.href.clone();

        let guid = if entry.id.is_empty() { None } else { Some(entry.id.clone()) };

        if let Some(ref guid) = guid {
            if !seen_guids.insert(guid.clone()) {
                debug!("Skipping duplicate entry with GUID: {}", guid);
                return None;
            }
        }

        if !seen_links.insert(link.clone()) {
            debug!("Skipping duplicate entry with URL: {}", link);
            return None;
        }

        let description = entry.summary.map(|s| strip_html(&s.content)).unwrap_or_default();

        // Prefer full content over the summary
        let content = entry
            .content
            .and_then(|c| c.body)
            .unwrap_or_else(|| description.clone());

        let published_at = entry.published.or(entry.updated).unwrap_or(fetched_at);

        Some(RawItem {
            id: guid.unwrap_or_else(|| Uuid::new_v4().to_string()),
            title: title.trim().to_string(),
            description,
            content,
            link,
            published_at,
            source_name: source_name.to_string(),
        })
    }

    pub fn is_valid_feed_content(content: &str) -> bool {
        let content_lower = content.to_lowercase();

        let has_feed_indicators = content_lower.contains("<rss")
            || content_lower.contains("<feed")
            || content_lower.contains("xmlns=\"http://www.w3.org/2005/atom\"")
            || content_lower.contains("<channel");

        let has_xml_declaration = content.trim_start().starts_with("<?xml");

        has_feed_indicators && (has_xml_declaration || content_lower.contains('<'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Example AI Feed</title>
    <link>https://example.com</link>
    <description>Latest AI news</description>
    <item>
      <title>New AI model released</title>
      <link>https://example.com/a</link>
      <guid>guid-a</guid>
      <description>&lt;p&gt;A new machine learning model&lt;/p&gt;</description>
      <pubDate>Fri, 10 May 2024 10:00:00 GMT</pubDate>
    </item>
    <item>
      <title>Duplicate by guid</title>
      <link>https://example.com/b</link>
      <guid>guid-a</guid>
    </item>
    <item>
      <title>No date here</title>
      <link>https://example.com/c</link>
      <guid>guid-c</guid>
      <description>Undated</description>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn parses_items_and_dedups_by_guid() {
        let fetched_at = Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap();
        let parsed = FeedParser::parse_feed(RSS, "Example", fetched_at).unwrap();

        assert_eq!(parsed.title.as_deref(), Some("Example AI Feed"));
        assert_eq!(parsed.items.len(), 2);

        let first = &parsed.items[0];
        assert_eq!(first.id, "guid-a");
        assert_eq!(first.title, "New AI model released");
        assert_eq!(first.description, "A new machine learning model");
        assert_eq!(first.link, "https://example.com/a");
        assert_eq!(first.source_name, "Example");
        assert_eq!(first.published_at, Utc.with_ymd_and_hms(2024, 5, 10, 10, 0, 0).unwrap());
    }

    #[test]
    fn undated_entries_use_fetch_time() {
        let fetched_at = Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap();
        let parsed = FeedParser::parse_feed(RSS, "Example", fetched_at).unwrap();

        let undated = parsed.items.iter().find(|i| i.id == "guid-c").unwrap();
        assert_eq!(undated.published_at, fetched_at);
        assert_eq!(undated.content, "Undated");
    }

    #[test]
    fn garbage_is_a_parse_error() {
        let result = FeedParser::parse_feed("definitely not xml", "Broken", Utc::now());
        assert!(matches!(result, Err(AutomationError::Parse(_))));
    }

    #[test]
    fn recognises_feed_documents() {
        assert!(FeedParser::is_valid_feed_content(RSS));
        assert!(!FeedParser::is_valid_feed_content("<html><body>hi</body></html>"));
    }
}
