//! Client configuration.

use crate::image::GeminiModel;

/// Primary environment variable holding the API key.
pub const API_KEY_ENV: &str = "API_KEY";
/// Fallback environment variable holding the API key.
pub const GOOGLE_API_KEY_ENV: &str = "GOOGLE_API_KEY";
/// Optional model override (`nano-banana`, `nano-banana-pro`, or an API id).
pub const MODEL_ENV: &str = "VISIONAI_MODEL";
/// Optional endpoint base URL override.
pub const BASE_URL_ENV: &str = "VISIONAI_BASE_URL";

/// Default Gemini REST endpoint base.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Configuration for [`GeminiEditClient`](crate::GeminiEditClient).
///
/// A missing key is not an error here; it is reported by each edit attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// API credential, if configured.
    pub api_key: Option<String>,
    /// Model used for edits.
    pub model: GeminiModel,
    /// Endpoint base URL, without a trailing slash.
    pub base_url: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: GeminiModel::default(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl ClientConfig {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let mut config = Self {
            api_key: non_empty(API_KEY_ENV).or_else(|| non_empty(GOOGLE_API_KEY_ENV)),
            ..Self::default()
        };

        if let Some(model) = non_empty(MODEL_ENV) {
            match GeminiModel::parse(&model) {
                Some(model) => config.model = model,
                None => tracing::warn!(%model, "ignoring unknown model override"),
            }
        }
        if let Some(base_url) = non_empty(BASE_URL_ENV) {
            config = config.with_base_url(base_url);
        }

        config
    }

    /// Sets the API key.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the model.
    pub fn with_model(mut self, model: GeminiModel) -> Self {
        self.model = model;
        self
    }

    /// Sets the endpoint base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Returns the configured key, treating an empty string as absent.
    pub fn credential(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.is_empty())
    }
}
