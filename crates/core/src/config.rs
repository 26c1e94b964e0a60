use crate::error::{AppError, Result};
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::str::FromStr;

/// Model used when `GEMINI_MODEL` is not set. It can answer with images.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-image-preview";

/// Instruction sent with every selfie unless overridden.
pub const DEFAULT_INSTRUCTION: &str = "Edit this selfie so the person's teeth look professionally \
whitened, as after a dental cleaning that removed coffee and tea stains. Keep the face, lighting, \
background and everything else exactly as it is. Return the edited photo.";

/// What the transform service is asked to return.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// An edited image (plus optional commentary).
    #[default]
    Image,
    /// A text description only.
    Text,
}

impl FromStr for OutputMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "image" => Ok(Self::Image),
            "text" => Ok(Self::Text),
            other => Err(AppError::config(format!(
                "Unknown output mode '{}', expected 'image' or 'text'",
                other
            ))),
        }
    }
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Image => f.write_str("image"),
            Self::Text => f.write_str("text"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub gemini_api_key: String,
    pub model_name: String,
    pub instruction: String,
    pub output_mode: OutputMode,
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load .env file if it exists, ignore if it doesn't
        let _ = dotenv();

        let api_key = env::var("GEMINI_API_KEY").map_err(|_| {
            AppError::config("GEMINI_API_KEY must be set in environment or .env file")
        })?;

        let model_name = env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        let instruction = env::var("SMILE_INSTRUCTION")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_INSTRUCTION.to_string());

        let output_mode = match env::var("SMILE_OUTPUT") {
            Ok(raw) => raw.parse()?,
            Err(_) => OutputMode::default(),
        };

        Ok(Self {
            gemini_api_key: api_key,
            model_name,
            instruction,
            output_mode,
        })
    }

    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builds a [`Config`] without touching the environment.
#[derive(Default)]
pub struct ConfigBuilder {
    api_key: Option<String>,
    model: Option<String>,
    instruction: Option<String>,
    output_mode: Option<OutputMode>,
}

impl ConfigBuilder {
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = Some(instruction.into());
        self
    }

    pub fn with_output_mode(mut self, mode: OutputMode) -> Self {
        self.output_mode = Some(mode);
        self
    }

    /// Fails if no API key was given. Empty model or instruction fall back to defaults.
    pub fn build(self) -> Result<Config> {
        let gemini_api_key = self
            .api_key
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| AppError::MissingEnvVar("GEMINI_API_KEY".to_string()))?;

        Ok(Config {
            gemini_api_key,
            model_name: self
                .model
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            instruction: self
                .instruction
                .filter(|i| !i.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_INSTRUCTION.to_string()),
            output_mode: self.output_mode.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_requires_api_key() {
        assert!(matches!(
            Config::builder().with_model("m").build(),
            Err(AppError::MissingEnvVar(_))
        ));
        assert!(Config::builder().with_api_key("  ").build().is_err());
    }

    #[test]
    fn builder_fills_defaults() {
        let config = Config::builder()
            .with_api_key("key")
            .with_model("")
            .build()
            .unwrap();
        assert_eq!(config.model_name, DEFAULT_MODEL);
        assert_eq!(config.instruction, DEFAULT_INSTRUCTION);
        assert_eq!(config.output_mode, OutputMode::Image);
    }

    #[test]
    fn builder_keeps_overrides() {
        let config = Config::builder()
            .with_api_key("key")
            .with_model("gemini-flash-latest")
            .with_instruction("describe the smile")
            .with_output_mode(OutputMode::Text)
            .build()
            .unwrap();
        assert_eq!(config.model_name, "gemini-flash-latest");
        assert_eq!(config.instruction, "describe the smile");
        assert_eq!(config.output_mode, OutputMode::Text);
    }

    #[test]
    fn output_mode_parsing() {
        assert_eq!("IMAGE".parse::<OutputMode>().unwrap(), OutputMode::Image);
        assert_eq!(" text ".parse::<OutputMode>().unwrap(), OutputMode::Text);
        assert!("video".parse::<OutputMode>().is_err());
        assert_eq!(OutputMode::Text.to_string(), "text");
    }
}
