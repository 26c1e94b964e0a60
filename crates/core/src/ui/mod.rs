//! User interface for smile-preview.
//!
//! A single window that shows one view per session state: landing, camera,
//! processing, result (with the before/after slider) and error.
//!
//! # Architecture
//!
//! The UI is split into focused submodules:
//! - [`state`]: UI actions and the decoded texture cache
//! - [`settings`]: User preferences and persistence
//! - [`rendering`]: Layout math and drawing helpers
//! - [`comparison`]: Slider widget wiring pointer input to the slider model
//! - [`app`]: Main application logic
//!
//! # Usage
//!
//! ```ignore
//! use smile_preview_core::{capture::WebcamSource, ui, Config};
//!
//! let config = Config::load()?;
//! let camera = WebcamSource::open(0)?;
//! ui::run_app(config, Box::new(camera))?;
//! ```

mod app;
mod comparison;
mod rendering;
mod settings;
mod state;

// Public API exports
pub use app::SmileApp;
pub use comparison::{SliderEvent, comparison_slider};
pub use settings::{AVAILABLE_MODELS, Settings};

use crate::capture::FrameSource;
use crate::config::Config;
use crate::error::Result;

/// Opens the application window and blocks until the user closes it.
///
/// # Arguments
/// * `config` - Application configuration with API key and model
/// * `source` - Where camera frames come from
pub fn run_app(config: Config, source: Box<dyn FrameSource>) -> Result<()> {
    app::run(config, source)
}
