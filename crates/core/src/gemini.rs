//! Gemini-backed image transform client.
//!
//! One request per call: the instruction and the selfie go out together, and
//! whatever the model answers with comes back as a [`TransformOutput`]. There
//! is no retry and no streaming here; the caller decides what to do with a
//! failure.

use crate::config::{Config, OutputMode};
use crate::error::{AppError, Result};
use crate::image_processing::EncodedImage;
use futures::future::BoxFuture;
use gemini_rust::{Blob, Content, Gemini, GenerationConfig, Message, Part, Role};
use tracing::{debug, info, warn};

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/";

/// What the model sent back.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransformOutput {
    /// Commentary or description, if the model produced any.
    pub text: Option<String>,
    /// The edited image, if the model produced one.
    pub image: Option<EncodedImage>,
}

/// Anything that can turn a selfie and an instruction into a result.
///
/// The session controller only talks to this trait, so the hosted model can
/// be swapped for a scripted double in tests.
pub trait ImageTransformer: Send + Sync {
    fn transform<'a>(
        &'a self,
        image: &'a EncodedImage,
        instruction: &'a str,
    ) -> BoxFuture<'a, Result<TransformOutput>>;
}

pub struct GeminiClient {
    client: Gemini,
    output_mode: OutputMode,
}

impl GeminiClient {
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_base_url(config, BASE_URL)
    }

    /// Creates a client that talks to another endpoint, such as a proxy.
    ///
    /// `base` must end with a slash.
    pub fn with_base_url(config: &Config, base: &str) -> Result<Self> {
        // Explicit base URL avoids the BadScheme error on custom model paths
        let base_url = url::Url::parse(base)
            .map_err(|e| AppError::config(format!("Invalid base URL: {}", e)))?;

        let model_url = format!("{}{}", base, model_path(&config.model_name));

        let client = Gemini::with_model_and_base_url(&config.gemini_api_key, model_url, base_url)
            .map_err(|e| AppError::config(format!("Failed to create Gemini client: {}", e)))?;

        Ok(Self {
            client,
            output_mode: config.output_mode,
        })
    }

    /// Sends the image and the instruction, returning the model's output.
    pub async fn transform_image(
        &self,
        image: &EncodedImage,
        instruction: &str,
    ) -> Result<TransformOutput> {
        if image.is_empty() {
            return Err(AppError::InvalidInput("empty image payload".to_string()));
        }

        let blob = Blob {
            mime_type: image.mime_type().to_string(),
            data: image.to_base64(),
        };

        let text_part = Part::Text {
            text: instruction.to_string(),
            thought: None,
            thought_signature: None,
        };
        let image_part = Part::InlineData { inline_data: blob };

        let message = Message {
            role: Role::User,
            content: Content {
                role: Some(Role::User),
                parts: Some(vec![text_part, image_part]),
            },
        };

        let mut request = self.client.generate_content().with_messages(vec![message]);

        if self.output_mode == OutputMode::Image {
            request = request.with_generation_config(GenerationConfig {
                response_modalities: Some(vec!["TEXT".to_string(), "IMAGE".to_string()]),
                ..Default::default()
            });
        }

        info!(
            bytes = image.len(),
            mime = image.mime_type(),
            mode = %self.output_mode,
            "Sending transform request"
        );

        let response = request.execute().await.map_err(|e| {
            let err = AppError::from(e);
            warn!(error = %err, "Transform request failed");
            err
        })?;

        let parts = response
            .candidates
            .first()
            .and_then(|candidate| candidate.content.parts.as_deref())
            .ok_or_else(|| AppError::MalformedResponse("response has no candidates".to_string()))?;

        collect_output(parts, self.output_mode)
    }
}

impl ImageTransformer for GeminiClient {
    fn transform<'a>(
        &'a self,
        image: &'a EncodedImage,
        instruction: &'a str,
    ) -> BoxFuture<'a, Result<TransformOutput>> {
        Box::pin(self.transform_image(image, instruction))
    }
}

/// Normalizes a model name to the `models/<name>` path the API expects.
pub fn model_path(model_name: &str) -> String {
    if model_name.starts_with("models/") {
        model_name.to_string()
    } else {
        format!("models/{}", model_name)
    }
}

/// Pulls text and the first image out of the response parts.
///
/// Thought parts are skipped. The mode decides which payload is mandatory.
fn collect_output(parts: &[Part], mode: OutputMode) -> Result<TransformOutput> {
    let mut text = String::new();
    let mut image = None;

    for part in parts {
        match part {
            Part::Text { text: chunk, thought, .. } => {
                if thought.unwrap_or(false) {
                    continue;
                }
                text.push_str(chunk);
            }
            Part::InlineData { inline_data } => {
                if image.is_none() && inline_data.mime_type.starts_with("image/") {
                    image = Some(EncodedImage::from_base64(
                        &inline_data.data,
                        inline_data.mime_type.clone(),
                    )?);
                }
            }
            _ => {}
        }
    }

    let text = (!text.trim().is_empty()).then_some(text);
    debug!(
        has_text = text.is_some(),
        has_image = image.is_some(),
        "Parsed transform response"
    );

    match mode {
        OutputMode::Image if image.is_none() => Err(AppError::MalformedResponse(format!(
            "no image in response{}",
            text.as_deref()
                .map(|t| format!(" (model said: {})", t))
                .unwrap_or_default()
        ))),
        OutputMode::Text if text.is_none() => Err(AppError::MalformedResponse(
            "no text in response".to_string(),
        )),
        _ => Ok(TransformOutput { text, image }),
    }
}
