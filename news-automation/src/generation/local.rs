use crate::traits::GenerationProvider;
use crate::types::{
    ArticleLength, AspectRatio, ContentParams, ImageStyle, Perspective, Result, RewrittenContent, Tone,
};
use crate::utils::stable_index;
use crate::utils::text::{paragraphs, strip_html, truncate_at_sentence};
use async_trait::async_trait;
use tracing::debug;

const LEAD_INS: [&str; 5] = ["How to", "Why", "The", "A Guide to", "Understanding"];

/// Titles longer than this are kept as they are.
const MAX_PREFIXED_TITLE_LEN: usize = 30;

/// Content shorter than this gets no introduction or conclusion.
const MIN_FRAMED_CONTENT_LEN: usize = 200;

const STOCK_IMAGES: [&str; 4] = [
    "https://images.unsplash.com/photo-1620712943543-bcc4688e7485",
    "https://images.unsplash.com/photo-1677442135148-1456be40dd28",
    "https://images.unsplash.com/photo-1611162617213-7d7a39e9b1d7",
    "https://images.unsplash.com/photo-1591696331111-ef9586a5b17a",
];

const TOPIC_TERMS: &[(&str, &[&str])] = &[
    (
        "technology",
        &[
            "artificial intelligence",
            "machine learning",
            "blockchain",
            "cloud computing",
            "edge computing",
            "IoT",
            "big data",
            "neural networks",
        ],
    ),
    (
        "finance",
        &[
            "cryptocurrency",
            "blockchain",
            "financial technology",
            "risk management",
            "portfolio diversification",
            "market volatility",
            "asset allocation",
        ],
    ),
    (
        "health",
        &[
            "telemedicine",
            "preventive care",
            "healthcare informatics",
            "patient-centered care",
            "evidence-based medicine",
            "holistic approaches",
        ],
    ),
    (
        "education",
        &[
            "e-learning",
            "adaptive learning systems",
            "educational technology",
            "student-centered pedagogy",
            "continuous assessment",
            "lifelong learning",
        ],
    ),
    (
        "marketing",
        &[
            "customer segmentation",
            "digital marketing",
            "content strategy",
            "conversion optimization",
            "engagement metrics",
            "brand positioning",
        ],
    ),
    (
        "general",
        &[
            "strategic implementation",
            "optimization",
            "innovative approaches",
            "systematic methodology",
            "best practices",
            "efficiency measures",
        ],
    ),
];

/// Template-based generator that needs no network access.
/// Output depends only on its inputs.
#[derive(Debug, Default, Clone)]
pub struct LocalGenerator;

impl LocalGenerator {
    pub fn new() -> Self {
        Self
    }

    fn rewrite_title(title: &str, tone: Tone) -> String {
        let title = title.trim();
        if LEAD_INS.iter().any(|p| title.starts_with(p)) || title.chars().count() > MAX_PREFIXED_TITLE_LEN {
            return title.to_string();
        }

        let prefix = match tone {
            Tone::Professional => "The Complete Guide to",
            Tone::Casual => "Everything You Need to Know About",
            Tone::Academic => "A Comprehensive Analysis of",
        };
        format!("{} {}", prefix, title)
    }

    fn topic_terms(topic: &str) -> &'static [&'static str] {
        let topic = topic.to_lowercase();
        TOPIC_TERMS
            .iter()
            .find(|(key, _)| topic.contains(key) || (!topic.is_empty() && key.contains(topic.as_str())))
            .or_else(|| TOPIC_TERMS.iter().find(|(key, _)| *key == "general"))
            .map(|(_, terms)| *terms)
            .unwrap_or(&[])
    }

    fn rewrite_body(content: &str, params: &ContentParams) -> String {
        let terms = Self::topic_terms(&params.topic);

        let mut body: Vec<String> = paragraphs(content)
            .into_iter()
            .map(|p| {
                let lower = p.to_lowercase();
                if p.len() < 10 || terms.is_empty() || terms.iter().any(|t| lower.contains(&t.to_lowercase())) {
                    p
                } else {
                    let term = terms[stable_index(&p, terms.len())];
                    format!("{} This relates to {} in important ways.", p, term)
                }
            })
            .collect();

        if params.length == ArticleLength::Long {
            body.push(Self::perspective_paragraph(params.perspective, &params.topic));
        }

        if content.len() > MIN_FRAMED_CONTENT_LEN && params.length != ArticleLength::Short {
            body.insert(0, Self::introduction(params.tone, &params.topic, content));
            body.push(Self::conclusion(params.tone, content));
        }

        body.join("\n\n")
    }

    fn introduction(tone: Tone, topic: &str, seed: &str) -> String {
        let options = match tone {
            Tone::Professional => [
                format!("In today's rapidly evolving {} landscape, professionals are constantly seeking innovative solutions to address emerging challenges. This article examines key developments and provides actionable insights for practitioners in the field.", topic),
                format!("The {} sector has undergone significant transformation in recent years, with new technologies and methodologies reshaping traditional approaches. This analysis explores current trends and their implications for industry stakeholders.", topic),
            ],
            Tone::Casual => [
                format!("Ever wondered what's really going on in the world of {}? You're not alone! Let's break down the latest news and pull out a few insights you can actually use.", topic),
                format!("Let's face it, {} can be confusing sometimes. Don't worry. We'll walk through what happened in simple, straightforward terms.", topic),
            ],
            Tone::Academic => [
                format!("This piece examines recent developments in {} with attention to the methodological approaches behind them and the evidence available so far.", topic),
                format!("Recent work in {} points to a notable shift in established practice. The following synthesises the reported findings and situates them within the wider literature.", topic),
            ],
        };
        let idx = stable_index(seed, options.len());
        options[idx].clone()
    }

    fn conclusion(tone: Tone, seed: &str) -> String {
        let options: [&str; 2] = match tone {
            Tone::Professional => [
                "Organizations that adopt these evidence-based approaches will be better positioned to navigate what comes next. Implementing the ideas outlined above can improve efficiency while supporting sustainable growth.",
                "Moving forward, industry leaders should consider how these insights can inform their strategic planning. Those who integrate them early will likely gain an advantage in an increasingly competitive market.",
            ],
            Tone::Casual => [
                "So there you have it! Now you're up to speed. Keep learning, stay curious, and don't be afraid to try some of these ideas yourself.",
                "Bottom line? This stuff matters, and now you know why. Take these takeaways and run with them.",
            ],
            Tone::Academic => [
                "These observations identify several intersections between theory and empirical results. Longitudinal studies would help establish whether the effects persist over time.",
                "The findings carry implications for both theory development and research methodology, while the limitations of the available evidence call for further investigation.",
            ],
        };
        options[stable_index(seed, options.len())].to_string()
    }

    fn perspective_paragraph(perspective: Perspective, topic: &str) -> String {
        match perspective {
            Perspective::Neutral => format!(
                "As with most developments in {}, the full impact will depend on how the technology is adopted and evaluated in practice.",
                topic
            ),
            Perspective::Optimistic => format!(
                "There is good reason for optimism: progress like this tends to open new opportunities across {} and beyond.",
                topic
            ),
            Perspective::Critical => format!(
                "Still, caution is warranted. Claims in {} often outpace independent verification, and the risks deserve as much attention as the promises.",
                topic
            ),
        }
    }

    fn stock_image_url(prompt: &str, aspect_ratio: AspectRatio) -> String {
        let (width, height) = aspect_ratio.dimensions();
        let base = STOCK_IMAGES[stable_index(prompt, STOCK_IMAGES.len())];
        format!("{}?w={}&h={}&fit=crop", base, width, height)
    }
}

#[async_trait]
impl GenerationProvider for LocalGenerator {
    fn name(&self) -> String {
        "Local".to_string()
    }

    async fn rewrite(
        &self,
        title: &str,
        content: &str,
        source_name: &str,
        params: &ContentParams,
    ) -> Result<RewrittenContent> {
        debug!(
            "Local rewrite of '{}' from {} (tone: {}, topic: {})",
            title,
            source_name,
            params.tone.as_str(),
            params.topic
        );

        Ok(RewrittenContent {
            title: Self::rewrite_title(title, params.tone),
            content: Self::rewrite_body(content, params),
        })
    }

    async fn summarize(&self, content: &str, max_length: usize) -> Result<String> {
        Ok(truncate_at_sentence(&strip_html(content), max_length))
    }

    async fn generate_image(
        &self,
        prompt: &str,
        style: ImageStyle,
        aspect_ratio: AspectRatio,
    ) -> Result<String> {
        debug!("Picking stock image for '{}' ({}, {})", prompt, style, aspect_ratio);
        Ok(Self::stock_image_url(prompt, aspect_ratio))
    }
}
