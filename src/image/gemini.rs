//! Gemini (Google) image edit client.

use crate::config::ClientConfig;
use crate::error::{sanitize_error_message, EditError, Result};
use crate::image::client::EditClient;
use crate::image::codec::{strip_encoding_marker, EncodedImage, DEFAULT_CONTENT_TYPE};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Instant;

const MISSING_KEY_MESSAGE: &str = "API Key is missing. Please configure the environment.";
const NO_CANDIDATES_MESSAGE: &str = "No candidates returned from Gemini.";
const NO_PARTS_MESSAGE: &str = "No content parts returned.";
const NO_IMAGE_MESSAGE: &str = "No image generated.";

/// Gemini image model variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GeminiModel {
    /// Nano Banana - Gemini 2.5 Flash Image (fast, economical).
    #[default]
    NanoBanana,
    /// Nano Banana Pro - Gemini 3 Pro Image (highest quality).
    NanoBananaPro,
}

impl GeminiModel {
    /// Returns the API model identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NanoBanana => "gemini-2.5-flash-image",
            Self::NanoBananaPro => "nano-banana-pro-preview",
        }
    }

    /// Parses a short name or API identifier.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim() {
            "nano-banana" | "gemini-2.5-flash-image" => Some(Self::NanoBanana),
            "nano-banana-pro" | "nano-banana-pro-preview" => Some(Self::NanoBananaPro),
            _ => None,
        }
    }
}

impl std::fmt::Display for GeminiModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builder for GeminiEditClient.
#[derive(Debug, Clone, Default)]
pub struct GeminiEditClientBuilder {
    config: ClientConfig,
}

impl GeminiEditClientBuilder {
    /// Creates a new builder with default settings and no API key.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the API key.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config = self.config.with_api_key(key);
        self
    }

    /// Sets the Gemini model variant.
    pub fn model(mut self, model: GeminiModel) -> Self {
        self.config = self.config.with_model(model);
        self
    }

    /// Sets the endpoint base URL.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config = self.config.with_base_url(base_url);
        self
    }

    /// Builds the client.
    pub fn build(self) -> GeminiEditClient {
        GeminiEditClient::new(self.config)
    }
}

/// Gemini image edit client.
pub struct GeminiEditClient {
    client: reqwest::Client,
    config: ClientConfig,
}

impl GeminiEditClient {
    /// Creates a client from an explicit configuration.
    pub fn new(config: ClientConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    #[cfg(test)]
    fn with_http_client(config: ClientConfig, client: reqwest::Client) -> Self {
        Self { client, config }
    }

    /// Creates a client configured from the process environment.
    pub fn from_env() -> Self {
        Self::new(ClientConfig::from_env())
    }

    /// Creates a new `GeminiEditClientBuilder`.
    pub fn builder() -> GeminiEditClientBuilder {
        GeminiEditClientBuilder::new()
    }

    /// Returns the client's configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn model_url(&self) -> String {
        format!("{}/models/{}", self.config.base_url, self.config.model.as_str())
    }

    fn api_key(&self) -> Result<&str> {
        self.config
            .credential()
            .ok_or_else(|| EditError::Configuration(MISSING_KEY_MESSAGE.into()))
    }

    async fn edit_impl(&self, image: &EncodedImage, prompt: &str) -> Result<EncodedImage> {
        let api_key = self.api_key()?;
        let start = Instant::now();

        let url = format!("{}:generateContent", self.model_url());
        let body = GeminiRequest::new(image, prompt);

        tracing::debug!(
            model = %self.config.model,
            mime_type = image.content_type(),
            prompt_len = prompt.len(),
            "sending Gemini edit request"
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(parse_error(status.as_u16(), &text));
        }

        let text = response.text().await?;
        let gemini_response: GeminiResponse = serde_json::from_str(&text)?;
        let edited = parse_edit_response(gemini_response)?;

        tracing::debug!(
            duration_ms = start.elapsed().as_millis() as u64,
            mime_type = edited.content_type(),
            "Gemini edit complete"
        );

        Ok(edited)
    }
}

#[async_trait]
impl EditClient for GeminiEditClient {
    async fn request_edit(&self, image: &EncodedImage, prompt: &str) -> Result<EncodedImage> {
        self.edit_impl(image, prompt).await
    }

    fn name(&self) -> &str {
        "Gemini (Google)"
    }

    async fn health_check(&self) -> Result<()> {
        let api_key = self.api_key()?;

        let response = self
            .client
            .get(self.model_url())
            .header("x-goog-api-key", api_key)
            .send()
            .await?;

        match response.status().as_u16() {
            s if (200..300).contains(&s) => Ok(()),
            s => {
                let text = response.text().await.unwrap_or_default();
                Err(parse_error(s, &text))
            }
        }
    }
}

/// Maps a non-success HTTP response to an error.
fn parse_error(status: u16, text: &str) -> EditError {
    if status == 404 {
        return EditError::Api {
            status,
            message: "Model not found. Verify the model name is correct.".into(),
        };
    }

    // Google wraps failures as {"error": {"message": ...}}.
    let message = serde_json::from_str::<GeminiErrorEnvelope>(text)
        .ok()
        .and_then(|envelope| envelope.error.message)
        .unwrap_or_else(|| text.to_string());

    EditError::Api {
        status,
        message: sanitize_error_message(&message),
    }
}

/// Applies the response policy: first image wins, then first text is a
/// refusal, otherwise the response is empty.
fn parse_edit_response(response: GeminiResponse) -> Result<EncodedImage> {
    if let Some(reason) = response
        .prompt_feedback
        .as_ref()
        .and_then(|f| f.block_reason.as_deref())
    {
        tracing::warn!(block_reason = reason, "Gemini blocked the prompt");
    }

    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| EditError::EmptyResponse(NO_CANDIDATES_MESSAGE.into()))?;

    if let Some(ref finish_reason) = candidate.finish_reason {
        tracing::debug!(finish_reason = %finish_reason, "Gemini candidate finished");
    }

    let parts = candidate
        .content
        .and_then(|c| c.parts)
        .ok_or_else(|| EditError::MalformedResponse(NO_PARTS_MESSAGE.into()))?;

    if let Some(inline) = parts.iter().find_map(|p| p.inline_data.as_ref()) {
        if !inline.data.is_empty() {
            let mime_type = inline
                .mime_type
                .as_deref()
                .filter(|m| !m.is_empty())
                .unwrap_or(DEFAULT_CONTENT_TYPE);
            return Ok(EncodedImage::from_base64(&inline.data, mime_type));
        }
    }

    if let Some(text) = parts
        .into_iter()
        .filter_map(|p| p.text)
        .find(|t| !t.is_empty())
    {
        return Err(EditError::Refusal(text));
    }

    Err(EditError::EmptyResponse(NO_IMAGE_MESSAGE.into()))
}

// Request/Response types
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GeminiConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    parts: Vec<GeminiRequestPart>,
}

/// A part in a Gemini request - can be text or inline image data.
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum GeminiRequestPart {
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: GeminiInlineData,
    },
    Text {
        text: String,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiConfig {
    response_modalities: Vec<String>,
}

impl GeminiRequest {
    fn new(image: &EncodedImage, prompt: &str) -> Self {
        let parts = vec![
            GeminiRequestPart::InlineData {
                inline_data: GeminiInlineData {
                    mime_type: image.content_type().to_string(),
                    data: strip_encoding_marker(image.content()).to_string(),
                },
            },
            GeminiRequestPart::Text {
                text: prompt.to_string(),
            },
        ];

        Self {
            contents: vec![GeminiContent { parts }],
            generation_config: GeminiConfig {
                response_modalities: vec!["TEXT".to_string(), "IMAGE".to_string()],
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContentResponse>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiContentResponse {
    #[serde(default)]
    parts: Option<Vec<GeminiPartResponse>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPartResponse {
    #[serde(default, alias = "inline_data")]
    inline_data: Option<InlineData>,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    #[serde(default, alias = "mime_type")]
    mime_type: Option<String>,
    #[serde(default)]
    data: String,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorEnvelope {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    #[serde(default)]
    message: Option<String>,
}
