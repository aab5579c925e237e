use crate::traits::GenerationProvider;
use crate::types::{AspectRatio, AutomationError, ContentParams, ImageStyle, Result, RewrittenContent};
use crate::utils::text::truncate_at_sentence;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

const OPENAI_API_URL: &str = "https://api.openai.com/v1";
const PROVIDER: &str = "OpenAI";

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub text_model: String,
    pub image_model: String,
    pub temperature: f32,
    pub base_url: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            text_model: "gpt-4o".to_string(),
            image_model: "dall-e-3".to_string(),
            temperature: 0.7,
            base_url: OPENAI_API_URL.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct ImageRequest {
    model: String,
    prompt: String,
    n: u8,
    size: &'static str,
    response_format: &'static str,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    url: Option<String>,
}

/// Generation backed by the OpenAI chat completions and image endpoints
pub struct OpenAiGenerator {
    config: OpenAiConfig,
    http: reqwest::Client,
}

impl OpenAiGenerator {
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(AutomationError::NotConfigured("OpenAI API key".to_string()));
        }

        Ok(Self {
            config,
            http: reqwest::Client::new(),
        })
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.config.api_key))
            .map_err(|e| AutomationError::generation(PROVIDER, format!("invalid API key header: {}", e)))?;
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    async fn post<Req: Serialize, Resp: for<'de> Deserialize<'de>>(&self, path: &str, request: &Req) -> Result<Resp> {
        let url = format!("{}/{}", self.config.base_url.trim_end_matches('/'), path);

        let response = self
            .http
            .post(&url)
            .headers(self.headers()?)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            return Err(AutomationError::generation(
                PROVIDER,
                format!("API error ({}): {}", status, error_text),
            ));
        }

        Ok(response.json().await?)
    }

    async fn chat(&self, prompt: String, json_object: bool) -> Result<String> {
        debug!(model = %self.config.text_model, "OpenAI chat request");

        let request = ChatRequest {
            model: self.config.text_model.clone(),
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.config.temperature,
            response_format: json_object.then_some(ResponseFormat {
                format_type: "json_object",
            }),
        };

        let response: ChatResponse = self.post("chat/completions", &request).await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| AutomationError::generation(PROVIDER, "No response from OpenAI"))
    }

    fn rewrite_prompt(title: &str, content: &str, source_name: &str, params: &ContentParams) -> String {
        format!(
            r#"You are an expert content rewriter specializing in {topic} news, particularly AI.
Please rewrite the following article with a {tone} tone, a {style} writing style and a {perspective} perspective.
Aim for a {length} article. Maintain the factual accuracy but improve the clarity and readability.
Use HTML formatting for the rewritten content.

Original Title: {title}
Original Source: {source_name}
Original Content: {content}

Response Format:
{{
  "title": "The rewritten title",
  "content": "The rewritten content in HTML format"
}}"#,
            topic = params.topic,
            tone = params.tone.as_str(),
            style = params.style.as_str(),
            perspective = params.perspective.as_str(),
            length = params.length.as_str(),
        )
    }

    fn image_size(aspect_ratio: AspectRatio) -> &'static str {
        match aspect_ratio {
            AspectRatio::Square | AspectRatio::Standard => "1024x1024",
            AspectRatio::Widescreen => "1792x1024",
            AspectRatio::Portrait => "1024x1792",
        }
    }
}

#[async_trait]
impl GenerationProvider for OpenAiGenerator {
    fn name(&self) -> String {
        PROVIDER.to_string()
    }

    async fn rewrite(
        &self,
        title: &str,
        content: &str,
        source_name: &str,
        params: &ContentParams,
    ) -> Result<RewrittenContent> {
        info!("Rewriting '{}' with {}", title, self.config.text_model);

        let raw = self
            .chat(Self::rewrite_prompt(title, content, source_name, params), true)
            .await?;

        serde_json::from_str(&raw)
            .map_err(|e| AutomationError::generation(PROVIDER, format!("malformed rewrite response: {}", e)))
    }

    async fn summarize(&self, content: &str, max_length: usize) -> Result<String> {
        let prompt = format!(
            "Summarize the following article in plain text, in at most {} characters:\n\n{}",
            max_length, content
        );
        let summary = self.chat(prompt, false).await?;
        Ok(truncate_at_sentence(&summary, max_length))
    }

    async fn generate_image(
        &self,
        prompt: &str,
        style: ImageStyle,
        aspect_ratio: AspectRatio,
    ) -> Result<String> {
        let size = Self::image_size(aspect_ratio);
        debug!(model = %self.config.image_model, size, "OpenAI image request");

        let request = ImageRequest {
            model: self.config.image_model.clone(),
            prompt: format!("{}. Rendered in a {} style.", prompt, style),
            n: 1,
            size,
            response_format: "url",
        };

        let response: ImageResponse = self.post("images/generations", &request).await?;

        response
            .data
            .into_iter()
            .next()
            .and_then(|d| d.url)
            .ok_or_else(|| AutomationError::generation(PROVIDER, "No image URL in response"))
    }
}
