//! Gemini image generation client.
//!
//! The generation handler talks to an [`ImageGenerator`]; [`GeminiClient`] is
//! the production implementation over the `generateContent` REST API. Input
//! photos and output images travel as base64 inline data.

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use hairvision_core::Resolution;

/// Timeout for one upstream generation call.
const GENERATION_TIMEOUT: Duration = Duration::from_secs(45);

/// Error type for upstream generation calls.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Gemini API returned an error.
    #[error("Gemini API error: {status} - {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message.
        message: String,
    },

    /// The prompt was blocked by safety filters.
    #[error("generation blocked: {0}")]
    Blocked(String),

    /// The response carried no image.
    #[error("response contained no image")]
    NoImage,

    /// The returned image data was not valid base64.
    #[error("invalid image data: {0}")]
    InvalidImage(String),
}

/// A request to restyle a client photo.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Styling instructions.
    pub prompt: String,
    /// Source photo, base64 encoded.
    pub image_base64: String,
    /// MIME type of the source photo.
    pub mime_type: String,
    /// Model to call.
    pub model: String,
    /// Requested output resolution.
    pub resolution: Resolution,
}

/// A generated image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    /// Image bytes, base64 encoded.
    pub image_base64: String,
    /// MIME type of the image.
    pub mime_type: String,
    /// Any text the model returned alongside the image.
    pub text: Option<String>,
}

/// Something that can produce a styled image.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Generate one image.
    ///
    /// # Errors
    ///
    /// Returns an `UpstreamError` for any failed or unusable response.
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedImage, UpstreamError>;
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart<'a> {
    Text {
        text: &'a str,
    },
    #[serde(rename_all = "camelCase")]
    Image {
        inline_data: InlineData<'a>,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: [&'static str; 2],
    #[serde(skip_serializing_if = "Option::is_none")]
    image_config: Option<ImageConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageConfig {
    image_size: &'static str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<ResponseContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
    #[serde(default, alias = "inline_data")]
    inline_data: Option<ResponseInlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponseInlineData {
    #[serde(alias = "mime_type")]
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    message: String,
}

const fn image_size(resolution: Resolution) -> Option<&'static str> {
    match resolution {
        Resolution::Standard => None,
        Resolution::High => Some("2K"),
        Resolution::Ultra => Some("4K"),
    }
}

// ============================================================================
// Client
// ============================================================================

/// Gemini API client.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl GeminiClient {
    /// Create a new Gemini client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - API URL (e.g., `"https://generativelanguage.googleapis.com"`)
    /// * `api_key` - Gemini API key
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, UpstreamError> {
        let client = Client::builder().timeout(GENERATION_TIMEOUT).build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    async fn handle_response(
        response: reqwest::Response,
    ) -> Result<GenerateContentResponse, UpstreamError> {
        let status = response.status();

        if status.is_success() {
            return Ok(response.json().await?);
        }

        // Try to parse error response
        let message = match response.json::<GeminiErrorResponse>().await {
            Ok(body) => body.error.message,
            Err(_) => format!("HTTP {status}"),
        };

        Err(UpstreamError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl ImageGenerator for GeminiClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedImage, UpstreamError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, request.model
        );

        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![
                    RequestPart::Text {
                        text: &request.prompt,
                    },
                    RequestPart::Image {
                        inline_data: InlineData {
                            mime_type: &request.mime_type,
                            data: &request.image_base64,
                        },
                    },
                ],
            }],
            generation_config: GenerationConfig {
                response_modalities: ["TEXT", "IMAGE"],
                image_config: image_size(request.resolution)
                    .map(|image_size| ImageConfig { image_size }),
            },
        };

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let parsed = Self::handle_response(response).await?;
        extract_image(parsed)
    }
}

fn extract_image(response: GenerateContentResponse) -> Result<GeneratedImage, UpstreamError> {
    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(UpstreamError::Blocked(reason));
    }

    let mut text = None;
    let mut finish_reason = None;

    for candidate in response.candidates {
        finish_reason = finish_reason.or(candidate.finish_reason);

        for part in candidate.content.map(|c| c.parts).unwrap_or_default() {
            if let Some(image) = part.inline_data {
                general_purpose::STANDARD
                    .decode(&image.data)
                    .map_err(|e| UpstreamError::InvalidImage(e.to_string()))?;

                return Ok(GeneratedImage {
                    image_base64: image.data,
                    mime_type: image.mime_type,
                    text,
                });
            }
            if part.text.is_some() {
                text = part.text;
            }
        }
    }

    let blocked = matches!(
        finish_reason.as_deref(),
        Some("SAFETY" | "PROHIBITED_CONTENT" | "IMAGE_SAFETY")
    );
    match finish_reason {
        Some(reason) if blocked => Err(UpstreamError::Blocked(reason)),
        _ => Err(UpstreamError::NoImage),
    }
}
