/// Tags every generated article carries.
pub const BASE_TAGS: [&str; 3] = ["AI", "News", "Technology"];

const MAX_EXTRA_TAGS: usize = 3;

const HASHTAG_VOCABULARY: &[(&str, &str)] = &[
    ("machine learning", "MachineLearning"),
    ("deep learning", "DeepLearning"),
    ("neural", "NeuralNetworks"),
    ("language model", "NLP"),
    ("computer vision", "ComputerVision"),
    ("robot", "Robotics"),
    ("automation", "Automation"),
    ("cloud", "Cloud"),
    ("big data", "BigData"),
    ("blockchain", "Blockchain"),
    ("fintech", "FinTech"),
    ("health", "HealthTech"),
    ("education", "EdTech"),
    ("startup", "Startup"),
    ("sustainab", "Sustainability"),
];

/// Base tags plus a few hashtags picked from what the article talks about.
pub fn derive_tags(title: &str, content: &str) -> Vec<String> {
    let haystack = format!("{} {}", title, content).to_lowercase();
    let mut tags: Vec<String> = BASE_TAGS.iter().map(|t| t.to_string()).collect();

    let extras = HASHTAG_VOCABULARY
        .iter()
        .filter(|(needle, _)| haystack.contains(needle))
        .map(|(_, tag)| tag.to_string())
        .take(MAX_EXTRA_TAGS);

    for tag in extras {
        if !tags.iter().any(|t| t.eq_ignore_ascii_case(&tag)) {
            tags.push(tag);
        }
    }

    tags
}

/// Deterministic index into a list of `len` options, derived from `seed`.
pub fn stable_index(seed: &str, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    let hash = seed
        .bytes()
        .fold(17u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
    (hash % len as u64) as usize
}

/// Text processing utilities
pub mod text {
    use regex::Regex;
    use std::sync::LazyLock;

    static TAG_PATTERN: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"<[^>]*>").expect("static tag pattern"));

    /// Remove markup and collapse whitespace
    pub fn strip_html(text: &str) -> String {
        let without_tags = TAG_PATTERN.replace_all(text, " ");
        without_tags
            .replace("&nbsp;", " ")
            .replace("&amp;", "&")
            .replace("&quot;", "\"")
            .replace("&#39;", "'")
            .replace("&lt;", "<")
            .replace("&gt;", ">")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Truncate to at most `max_length` characters, preferring to end on a
    /// sentence boundary. Without one, cut hard and append an ellipsis.
    pub fn truncate_at_sentence(text: &str, max_length: usize) -> String {
        let text = text.trim();
        if text.chars().count() <= max_length {
            return text.to_string();
        }

        let cut = text
            .char_indices()
            .nth(max_length)
            .map(|(idx, _)| idx)
            .unwrap_or(text.len());
        let window = &text[..cut];

        if let Some(end) = window.rfind(|c: char| matches!(c, '.' | '!' | '?')) {
            let sentence = window[..=end].trim();
            if !sentence.is_empty() {
                return sentence.to_string();
            }
        }

        format!("{}...", window.trim_end())
    }

    /// Split on blank lines, dropping empty paragraphs
    pub fn paragraphs(text: &str) -> Vec<String> {
        text.split("\n\n")
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// URL utilities
pub mod url {
    use url::Url;

    /// Validate feed URL format
    pub fn is_valid_feed_url(url_str: &str) -> bool {
        if let Ok(url) = Url::parse(url_str) {
            url.scheme() == "http" || url.scheme() == "https"
        } else {
            false
        }
    }
}

/// Time utilities
pub mod time {
    use std::time::Duration;

    /// Format duration in human-readable form
    pub fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();

        if total_seconds < 60 {
            format!("{}s", total_seconds)
        } else if total_seconds < 3600 {
            format!("{}m", total_seconds / 60)
        } else if total_seconds < 86400 {
            format!("{}h", total_seconds / 3600)
        } else {
            format!("{}d", total_seconds / 86400)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_markup_and_entities() {
        let html = "<h2>Heading</h2>\n<p>First &amp; second</p>";
        assert_eq!(text::strip_html(html), "Heading First & second");
    }

    #[test]
    fn truncation_prefers_sentence_boundary() {
        let text = "One short sentence. Another sentence that runs on for a while.";
        assert_eq!(text::truncate_at_sentence(text, 30), "One short sentence.");
    }

    #[test]
    fn truncation_falls_back_to_hard_cut() {
        let text = "no sentence boundary anywhere in this text";
        assert_eq!(text::truncate_at_sentence(text, 10), "no sentenc...");
    }

    #[test]
    fn truncation_leaves_short_text_alone() {
        assert_eq!(text::truncate_at_sentence("  tiny  ", 150), "tiny");
    }

    #[test]
    fn truncation_is_char_safe() {
        let text = "héllo wörld ünïcode text";
        let out = text::truncate_at_sentence(text, 5);
        assert_eq!(out, "héllo...");
    }

    #[test]
    fn tags_start_with_base_and_stay_unique() {
        let tags = derive_tags(
            "Machine learning meets robotics",
            "Robot arms trained with machine learning and deep learning",
        );
        assert_eq!(&tags[..3], &["AI", "News", "Technology"]);
        assert!(tags.contains(&"MachineLearning".to_string()));
        assert!(tags.contains(&"DeepLearning".to_string()));
        assert!(tags.len() <= BASE_TAGS.len() + MAX_EXTRA_TAGS);
    }

    #[test]
    fn stable_index_is_deterministic_and_in_range() {
        let a = stable_index("some title", 4);
        let b = stable_index("some title", 4);
        assert_eq!(a, b);
        assert!(a < 4);
        assert_eq!(stable_index("anything", 0), 0);
    }

    #[test]
    fn only_http_feed_urls_are_valid() {
        assert!(super::url::is_valid_feed_url("https://example.com/rss"));
        assert!(!super::url::is_valid_feed_url("ftp://example.com/rss"));
    }

    #[test]
    fn durations_format_compactly() {
        use std::time::Duration;
        assert_eq!(time::format_duration(Duration::from_secs(3600)), "1h");
        assert_eq!(time::format_duration(Duration::from_secs(90)), "1m");
    }
}
