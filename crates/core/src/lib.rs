//! Smile Preview Core Library
//!
//! This library provides the core functionality for the smile-preview app:
//! take a selfie, ask Gemini to whiten the teeth, and compare before/after.
//!
//! # Overview
//!
//! - **Camera Capture**: webcam and still-image frame sources via [`capture`]
//! - **Image Payloads**: encoded images and data-URI handling via [`image_processing`]
//! - **AI Integration**: single-shot Gemini image transform via [`gemini`]
//! - **Session**: the view state machine in [`session`], driven by [`controller`]
//! - **Slider**: before/after comparison interaction model in [`slider`]
//! - **User Interface**: the eframe window in [`ui`]
//!
//! # Quick Start
//!
//! ```ignore
//! use smile_preview_core::{SmilePreview, capture::WebcamSource};
//!
//! let app = SmilePreview::new()?;
//! app.run_interactive(Box::new(WebcamSource::open(0)?))?;
//! ```

pub mod capture;
pub mod config;
pub mod controller;
pub mod error;
pub mod gemini;
pub mod image_processing;
pub mod session;
pub mod slider;
pub mod ui;

// Re-export primary types for convenience
pub use capture::{FrameSource, Mirrored, StillImageSource, WebcamSource};
pub use config::{Config, OutputMode};
pub use controller::{CaptureOutcome, SessionController};
pub use error::{AppError, Result};
pub use gemini::{GeminiClient, ImageTransformer, TransformOutput};
pub use image_processing::EncodedImage;
pub use session::{Session, View};
pub use slider::ComparisonSlider;

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::info;

/// How long a headless run waits for the camera's first frame.
const CAMERA_WARMUP: Duration = Duration::from_secs(5);

/// How long a headless run waits for the transform to come back.
const HEADLESS_WAIT: Duration = Duration::from_secs(180);

/// Main entry point for the smile-preview application.
///
/// Holds the configuration and launches either the window or a headless
/// capture-and-transform run.
pub struct SmilePreview {
    config: Config,
}

impl SmilePreview {
    /// Creates an instance configured from the environment (including `.env`).
    pub fn new() -> Result<Self> {
        Ok(Self {
            config: Config::load()?,
        })
    }

    /// Creates an instance with custom configuration.
    pub fn with_config(config: Config) -> Self {
        Self { config }
    }

    /// Opens the window and blocks until it is closed.
    pub fn run_interactive(&self, source: Box<dyn FrameSource>) -> Result<()> {
        ui::run_app(self.config.clone(), source)
    }

    /// Runs one session without a window: start, capture, transform.
    ///
    /// Returns the finished session, on either the result or the error view.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::CameraNotReady`] if no frame arrives during warm-up,
    /// and [`AppError::Network`] if the transform does not finish in time.
    pub fn run_headless(&self, source: &dyn FrameSource) -> Result<Session> {
        let client = GeminiClient::new(&self.config)?;
        let controller = SessionController::new(Arc::new(client), self.config.instruction.clone());
        run_session(controller, source, CAMERA_WARMUP, HEADLESS_WAIT)
    }

    /// Returns a reference to the current configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns a mutable reference to the configuration.
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }
}

/// Drives a controller through one start → capture → completion cycle.
pub fn run_session(
    mut controller: SessionController,
    source: &dyn FrameSource,
    warmup: Duration,
    wait: Duration,
) -> Result<Session> {
    let deadline = Instant::now() + warmup;
    while !source.is_ready() {
        if Instant::now() >= deadline {
            return Err(AppError::CameraNotReady);
        }
        thread::sleep(Duration::from_millis(50));
    }

    controller.start();
    match controller.capture(source) {
        CaptureOutcome::Started { generation } => {
            info!(generation, source = %source.describe(), "Captured frame");
        }
        CaptureOutcome::NoFrame | CaptureOutcome::NotCapturing => {
            return Err(AppError::CameraNotReady);
        }
    }

    match controller.wait_for_completion(wait) {
        View::Processing => Err(AppError::Network(format!(
            "no response within {} seconds",
            wait.as_secs()
        ))),
        _ => Ok(controller.session().clone()),
    }
}

/// Initializes the library by loading environment variables.
///
/// Call this once at application startup before using any other functions.
pub fn init() {
    let _ = dotenvy::dotenv();
}
