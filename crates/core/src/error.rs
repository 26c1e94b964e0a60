//! Error types for the smile-preview-core library.
//!
//! Transform failures are split by cause so callers can tell a transient
//! failure (worth retrying) from a permanent one. The session still collapses
//! all of them into a single user-facing message; the detail is only logged.

use gemini_rust::ClientError;
use thiserror::Error;

/// Errors that can occur within the smile-preview-core library.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors (missing keys, invalid values).
    #[error("Configuration error: {0}")]
    Config(String),

    /// A required environment variable was not found.
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    /// Opening or reading the camera failed.
    #[error("Camera error: {0}")]
    Camera(String),

    /// Requested camera device was not found.
    #[error("Camera not found: index {0}")]
    CameraNotFound(usize),

    /// The camera stream has not produced a frame yet.
    #[error("Camera stream is not ready")]
    CameraNotReady,

    /// Image decoding or encoding failed.
    #[error("Image processing failed: {0}")]
    ImageProcessing(String),

    /// The request never reached the service, or the connection broke.
    #[error("Network error: {0}")]
    Network(String),

    /// Rate limited by the Gemini API.
    #[error("Rate limited by Gemini API, please retry later")]
    RateLimited,

    /// The API key was rejected.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The service refused the request payload.
    #[error("Invalid request: {0}")]
    InvalidInput(String),

    /// The service answered, but without a usable payload.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Any other Gemini API failure, with the HTTP status if one was reported.
    #[error("Gemini API error: {message}")]
    GeminiApi { status: Option<u16>, message: String },

    /// UI-related errors (rendering, window management).
    #[error("UI error: {0}")]
    Ui(String),

    /// Standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AppError {
    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a camera error with the given message.
    pub fn camera(msg: impl Into<String>) -> Self {
        Self::Camera(msg.into())
    }

    /// Creates an image processing error with the given message.
    pub fn image(msg: impl Into<String>) -> Self {
        Self::ImageProcessing(msg.into())
    }

    /// Creates a Gemini API error without a known status code.
    pub fn gemini(msg: impl Into<String>) -> Self {
        Self::GeminiApi {
            status: None,
            message: msg.into(),
        }
    }

    /// Creates a UI error with the given message.
    pub fn ui(msg: impl Into<String>) -> Self {
        Self::Ui(msg.into())
    }

    /// Whether repeating the same request has a reasonable chance to succeed.
    ///
    /// Transient transport problems, rate limiting and server-side (5xx)
    /// failures are retryable. Bad credentials, rejected input, malformed
    /// responses and local errors are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::RateLimited => true,
            Self::GeminiApi { status, .. } => matches!(status, Some(500..=599)),
            _ => false,
        }
    }

    /// Maps an HTTP status and a diagnostic message onto the error taxonomy.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 | 403 => Self::Auth(message),
            429 => Self::RateLimited,
            400 | 404 | 413 | 422 => Self::InvalidInput(message),
            _ => Self::GeminiApi {
                status: Some(status),
                message,
            },
        }
    }
}

impl From<ClientError> for AppError {
    fn from(err: ClientError) -> Self {
        let message = error_chain(&err);
        match err {
            ClientError::BadResponse { code, .. } => Self::from_status(code, message),
            ClientError::PerformRequest { .. } => Self::Network(message),
            ClientError::Deserialize { .. } | ClientError::DecodeResponse { .. } => {
                Self::MalformedResponse(message)
            }
            ClientError::InvalidApiKey { .. } => Self::Auth(message),
            ClientError::ConstructUrl { .. } | ClientError::UrlParse { .. } => {
                Self::Config(message)
            }
            // Remaining variants are transport-side: streaming, headers, local io
            _ => Self::Network(message),
        }
    }
}

/// Display of an error followed by each of its sources.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// A convenient alias for Result with [`AppError`].
pub type Result<T> = std::result::Result<T, AppError>;
