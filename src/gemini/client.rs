use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use tracing::debug;

use super::error::GeminiError;
use super::types::{
    Content, ErrorEnvelope, GenerateContentRequest, GenerateContentResponse, GeneratedImage,
    GenerationConfig, ImageConfig,
};
use crate::content::{self, ContentFetcher, FetchError, RegionData};
use crate::credential::Credential;
use crate::regions::Language;

pub const API_URL: &str = "https://generativelanguage.googleapis.com";
pub const TEXT_MODEL: &str = "gemini-2.5-flash";
pub const IMAGE_MODEL: &str = "gemini-2.5-flash-image";
const IMAGE_ASPECT_RATIO: &str = "4:3";

/// Produces one image per prompt. Stateless; every call stands alone.
pub trait ImageGenerator: Send + Sync + 'static {
    fn generate(
        &self,
        prompt: &str,
        credential: &Credential,
    ) -> impl Future<Output = Result<GeneratedImage, GeminiError>> + Send;
}

#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    base_url: String,
    text_model: String,
    image_model: String,
}

impl GeminiClient {
    pub fn new() -> Result<Self, GeminiError> {
        Self::with_base_url(API_URL.to_string())
    }

    /// Create a client pointing at a custom base URL (useful for testing).
    pub fn with_base_url(base_url: String) -> Result<Self, GeminiError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(120))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            text_model: TEXT_MODEL.to_string(),
            image_model: IMAGE_MODEL.to_string(),
        })
    }

    pub fn with_models(mut self, text_model: String, image_model: String) -> Self {
        self.text_model = text_model;
        self.image_model = image_model;
        self
    }

    pub async fn generate_content(
        &self,
        model: &str,
        req: &GenerateContentRequest,
        credential: &Credential,
    ) -> Result<GenerateContentResponse, GeminiError> {
        if credential.is_empty() {
            return Err(GeminiError::MissingCredential);
        }

        let url = format!("{}/v1beta/models/{model}:generateContent", self.base_url);
        debug!(%model, "sending generateContent request");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", credential.as_str())
            .header("content-type", "application/json")
            .json(req)
            .send()
            .await?;

        let status = response.status();

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(error_from_body(status.as_u16(), body));
        }

        let text = response.text().await?;
        serde_json::from_str::<GenerateContentResponse>(&text)
            .map_err(|e| GeminiError::ParseError(e.to_string()))
    }

    pub async fn generate_image(
        &self,
        prompt: &str,
        credential: &Credential,
    ) -> Result<GeneratedImage, GeminiError> {
        let req = GenerateContentRequest {
            generation_config: Some(GenerationConfig {
                image_config: Some(ImageConfig {
                    aspect_ratio: IMAGE_ASPECT_RATIO.to_string(),
                }),
                ..Default::default()
            }),
            ..GenerateContentRequest::user_text(prompt)
        };

        let response = self.generate_content(&self.image_model, &req, credential).await?;
        let inline = response
            .first_inline_data()
            .ok_or_else(|| GeminiError::EmptyResult("No image generated".to_string()))?;
        GeneratedImage::from_inline(inline).map_err(|e| GeminiError::ParseError(e.to_string()))
    }

    pub async fn fetch_region_data(
        &self,
        region_name: &str,
        language: Language,
        credential: &Credential,
    ) -> Result<RegionData, GeminiError> {
        let req = GenerateContentRequest {
            system_instruction: Some(Content::system(content::system_instruction(language))),
            generation_config: Some(GenerationConfig {
                response_mime_type: Some("application/json".to_string()),
                response_schema: Some(content::response_schema()),
                image_config: None,
            }),
            ..GenerateContentRequest::user_text(content::user_prompt(region_name, language))
        };

        let response = self.generate_content(&self.text_model, &req, credential).await?;
        let text = response
            .text()
            .ok_or_else(|| GeminiError::EmptyResult("No data returned from API".to_string()))?;
        serde_json::from_str::<RegionData>(&text).map_err(|e| GeminiError::ParseError(e.to_string()))
    }
}

fn error_from_body(status: u16, body: String) -> GeminiError {
    match serde_json::from_str::<ErrorEnvelope>(&body) {
        Ok(envelope) => GeminiError::ApiError {
            status: Some(envelope.error.code.unwrap_or(status)),
            code: envelope.error.status,
            message: envelope.error.message,
        },
        Err(_) => GeminiError::ApiError {
            status: Some(status),
            code: None,
            message: body,
        },
    }
}

impl ImageGenerator for GeminiClient {
    async fn generate(
        &self,
        prompt: &str,
        credential: &Credential,
    ) -> Result<GeneratedImage, GeminiError> {
        self.generate_image(prompt, credential).await
    }
}

impl ContentFetcher for GeminiClient {
    async fn fetch(
        &self,
        region_name: &str,
        language: Language,
        credential: &Credential,
    ) -> Result<RegionData, FetchError> {
        Ok(self.fetch_region_data(region_name, language, credential).await?)
    }
}
