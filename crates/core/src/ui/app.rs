//! Main smile preview application.
//!
//! This module contains the `SmileApp` struct which implements the
//! `eframe::App` trait and renders one of the five session views.

use super::comparison::comparison_slider;
use super::rendering::{FRAME_ASPECT, aspect_box, draw_cover, draw_face_guide};
use super::settings::{AVAILABLE_MODELS, Settings};
use super::state::{Textures, UiAction};
use crate::capture::{FrameSource, Mirrored};
use crate::config::{Config, OutputMode};
use crate::controller::{CaptureOutcome, SessionController};
use crate::error::{AppError, Result};
use crate::gemini::GeminiClient;
use crate::image_processing::{EncodedImage, ImageProcessor};
use crate::session::View;
use crate::slider::ComparisonSlider;
use eframe::egui;
use egui_commonmark::{CommonMarkCache, CommonMarkViewer};
use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Live preview refresh interval while the camera view is open.
const PREVIEW_INTERVAL: Duration = Duration::from_millis(33);

const COFFEE_DARK: egui::Color32 = egui::Color32::from_rgb(67, 40, 24);
const COFFEE_MID: egui::Color32 = egui::Color32::from_rgb(120, 80, 50);
const COFFEE_LIGHT: egui::Color32 = egui::Color32::from_rgb(250, 245, 240);

/// The windowed application.
pub struct SmileApp {
    controller: SessionController,
    source: Box<dyn FrameSource>,
    slider: ComparisonSlider,
    textures: Textures,
    last_generation: u64,

    settings: Settings,
    show_settings: bool,
    markdown_cache: CommonMarkCache,

    /// One-line notice shown under the current view.
    notice: Option<String>,
}

impl SmileApp {
    /// Creates the app. Saved settings override the given config.
    ///
    /// # Arguments
    /// * `ctx` - egui context, used to wake the UI when a request completes
    /// * `config` - Application configuration
    /// * `source` - Camera frame source
    pub fn new(ctx: egui::Context, config: Config, source: Box<dyn FrameSource>) -> Result<Self> {
        let settings = Settings::load(&config);
        let effective = settings.to_config().unwrap_or(config);

        let client = GeminiClient::new(&effective)?;
        let mut controller = SessionController::new(Arc::new(client), effective.instruction);
        controller.set_waker(Arc::new(move || ctx.request_repaint()));

        info!(model = %effective.model_name, source = %source.describe(), "Starting smile preview");

        Ok(Self {
            controller,
            source,
            slider: ComparisonSlider::new(),
            textures: Textures::default(),
            last_generation: 0,
            settings,
            show_settings: false,
            markdown_cache: CommonMarkCache::default(),
            notice: None,
        })
    }

    /// Picks up completions and resets per-session UI state on a new generation.
    fn sync_session(&mut self) {
        if self.controller.poll() > 0 {
            self.notice = None;
        }

        let generation = self.controller.session().generation();
        if generation != self.last_generation {
            self.last_generation = generation;
            self.textures.clear_session();
            self.slider = ComparisonSlider::new();
        }
    }

    fn apply(&mut self, action: UiAction, ctx: &egui::Context) {
        match action {
            UiAction::Start => {
                self.notice = None;
                self.show_settings = false;
                self.controller.start();
            }
            UiAction::Capture => match self.controller.capture(&Mirrored(self.source.as_ref())) {
                CaptureOutcome::Started { generation } => {
                    info!(generation, "Captured frame");
                    self.notice = None;
                }
                CaptureOutcome::NoFrame => {
                    self.notice = Some("The camera isn't ready yet. Hold on a moment.".to_string());
                }
                CaptureOutcome::NotCapturing => {}
            },
            UiAction::Retry => {
                self.notice = None;
                self.controller.retry();
            }
            UiAction::Reset => {
                self.notice = None;
                self.controller.reset();
            }
            UiAction::CopyResult => {
                let result = self.controller.session().result_image().cloned();
                self.notice = Some(match result.map(|img| copy_image_to_clipboard(&img)) {
                    Some(Ok(())) => "Copied to clipboard".to_string(),
                    Some(Err(e)) => {
                        warn!(error = %e, "Failed to copy result");
                        "Could not copy the image".to_string()
                    }
                    None => "Nothing to copy".to_string(),
                });
            }
            UiAction::ToggleSettings => {
                self.show_settings = !self.show_settings;
            }
            UiAction::SaveSettings => {
                self.notice = Some(match self.save_settings() {
                    Ok(()) => "Settings saved".to_string(),
                    Err(e) => {
                        warn!(error = %e, "Failed to apply settings");
                        format!("Settings not applied: {}", e)
                    }
                });
            }
            UiAction::Quit => {
                ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            }
        }
    }

    /// Persists settings and rebuilds the client for later captures.
    fn save_settings(&mut self) -> Result<()> {
        let config = self.settings.to_config()?;
        let client = GeminiClient::new(&config)?;
        self.controller
            .reconfigure(Arc::new(client), config.instruction);
        self.settings.save()
    }

    /// Renders the landing view.
    fn render_landing(&mut self, ui: &mut egui::Ui, actions: &mut Vec<UiAction>) {
        ui.vertical_centered(|ui| {
            ui.add_space(ui.available_height() * 0.12);
            ui.label(egui::RichText::new("☕").size(56.0));
            ui.add_space(8.0);
            ui.heading(
                egui::RichText::new("Smile Preview")
                    .size(40.0)
                    .strong()
                    .color(COFFEE_DARK),
            );
            ui.add_space(12.0);
            ui.label(
                egui::RichText::new(
                    "Love your daily brew but hate the stains?\n\
                     See how a professional whitening treatment can bring back your sparkle in seconds.",
                )
                .size(16.0)
                .color(COFFEE_MID),
            );
            ui.add_space(24.0);

            let start = egui::Button::new(
                egui::RichText::new("📷  Preview My Smile")
                    .size(20.0)
                    .strong()
                    .color(egui::Color32::WHITE),
            )
            .fill(COFFEE_DARK)
            .corner_radius(24.0)
            .min_size(egui::vec2(240.0, 52.0));

            let can_start = self.settings.has_api_key();
            if ui.add_enabled(can_start, start).clicked() {
                actions.push(UiAction::Start);
            }
            if !can_start {
                ui.label(
                    egui::RichText::new("Add a Gemini API key in settings to get started.")
                        .color(egui::Color32::DARK_RED),
                );
            }

            ui.add_space(32.0);
            ui.horizontal(|ui| {
                ui.add_space((ui.available_width() - 360.0).max(0.0) / 2.0);
                for (icon, label) in [("✨", "AI Powered"), ("☕", "Stain Removal"), ("📷", "Instant")]
                {
                    ui.vertical(|ui| {
                        ui.set_width(120.0);
                        ui.vertical_centered(|ui| {
                            ui.label(egui::RichText::new(icon).size(22.0));
                            ui.label(egui::RichText::new(label).small().color(COFFEE_MID));
                        });
                    });
                }
            });

            ui.add_space(24.0);
            if ui.button("⚙ Settings").clicked() {
                actions.push(UiAction::ToggleSettings);
            }
        });

        if self.show_settings {
            self.render_settings(ui, actions);
        }
    }

    /// Renders the settings panel.
    fn render_settings(&mut self, ui: &mut egui::Ui, actions: &mut Vec<UiAction>) {
        egui::Frame::group(ui.style())
            .inner_margin(12.0)
            .show(ui, |ui| {
                ui.set_max_width(520.0);
                ui.label(egui::RichText::new("Settings").strong());

                egui::ComboBox::from_label("Model")
                    .selected_text(&self.settings.model)
                    .show_ui(ui, |ui| {
                        for model in AVAILABLE_MODELS {
                            ui.selectable_value(&mut self.settings.model, model.to_string(), *model);
                        }
                    });

                ui.horizontal(|ui| {
                    ui.label("Result:");
                    ui.radio_value(&mut self.settings.output_mode, OutputMode::Image, "Edited photo");
                    ui.radio_value(&mut self.settings.output_mode, OutputMode::Text, "Description");
                });

                ui.label("API Key:");
                ui.add(
                    egui::TextEdit::singleline(&mut self.settings.api_key)
                        .password(true)
                        .hint_text("Paste Gemini API Key"),
                );

                ui.label("Instruction:");
                ui.add(
                    egui::TextEdit::multiline(&mut self.settings.instruction)
                        .desired_rows(4)
                        .desired_width(f32::INFINITY),
                );

                if ui.button("Save").clicked() {
                    actions.push(UiAction::SaveSettings);
                }
            });
    }

    /// Renders the camera view with live preview and shutter.
    fn render_camera(&mut self, ui: &mut egui::Ui, actions: &mut Vec<UiAction>) {
        let full = ui.max_rect();
        ui.painter().rect_filled(full, 0.0, egui::Color32::BLACK);

        let frame_rect = aspect_box(full.shrink(24.0), FRAME_ASPECT);
        let ready = self.source.is_ready();

        if let Some(frame) = self.source.current_frame() {
            let sequence = self.source.sequence();
            if let Some(texture) = self.textures.preview.get(ui.ctx(), sequence, &frame) {
                draw_cover(ui.painter(), texture, frame_rect);
            }
        }
        draw_face_guide(ui.painter(), frame_rect);

        // Close button, top right
        let close_rect = egui::Rect::from_min_size(
            egui::pos2(full.max.x - 56.0, full.min.y + 16.0),
            egui::vec2(40.0, 40.0),
        );
        if ui
            .put(close_rect, egui::Button::new(egui::RichText::new("✕").size(20.0)))
            .clicked()
        {
            actions.push(UiAction::Reset);
        }

        // Shutter, bottom center. Disabled until the stream has a frame.
        let shutter_rect = egui::Rect::from_center_size(
            egui::pos2(frame_rect.center().x, frame_rect.max.y - 56.0),
            egui::vec2(80.0, 80.0),
        );
        let shutter = egui::Button::new("")
            .fill(COFFEE_DARK)
            .stroke(egui::Stroke::new(4.0, egui::Color32::WHITE))
            .corner_radius(40.0);
        let clicked = ui.put(shutter_rect, |ui: &mut egui::Ui| ui.add_enabled(ready, shutter)).clicked();
        let key_pressed = ui.input(|i| i.key_pressed(egui::Key::Space) || i.key_pressed(egui::Key::Enter));
        if ready && (clicked || key_pressed) {
            actions.push(UiAction::Capture);
        }

        if !ready {
            ui.painter().text(
                frame_rect.center(),
                egui::Align2::CENTER_CENTER,
                "Waiting for camera…",
                egui::FontId::proportional(18.0),
                egui::Color32::LIGHT_GRAY,
            );
        }
    }

    /// Renders the processing view.
    fn render_processing(&mut self, ui: &mut egui::Ui) {
        ui.vertical_centered(|ui| {
            ui.add_space(ui.available_height() * 0.35);
            ui.add(egui::Spinner::new().size(48.0).color(COFFEE_DARK));
            ui.add_space(16.0);
            ui.label(
                egui::RichText::new("Brewing your new smile…")
                    .size(20.0)
                    .color(COFFEE_DARK),
            );
        });
    }

    /// Renders the result view with the comparison slider.
    fn render_result(&mut self, ui: &mut egui::Ui, actions: &mut Vec<UiAction>) {
        let generation = self.controller.session().generation();
        let original = self.controller.session().original_image().cloned();
        let result = self.controller.session().result_image().cloned();
        let text = self.controller.session().result_text().map(str::to_string);

        ui.horizontal(|ui| {
            ui.label(egui::RichText::new("☕ Smile Preview").strong().color(COFFEE_DARK));
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.button("Start over").clicked() {
                    actions.push(UiAction::Reset);
                }
                if ui.button("⟳ Retake").clicked() {
                    actions.push(UiAction::Retry);
                }
            });
        });
        ui.separator();

        egui::ScrollArea::vertical().show(ui, |ui| {
            ui.vertical_centered(|ui| {
                ui.set_max_width(480.0);
                ui.heading(egui::RichText::new("Your New Smile").strong().color(COFFEE_DARK));
                ui.label(
                    egui::RichText::new(
                        "Slide to see the difference a professional cleaning can make for a coffee lover like you.",
                    )
                    .small()
                    .color(COFFEE_MID),
                );
                ui.add_space(12.0);

                if let (Some(original), Some(result)) = (original.as_ref(), result.as_ref()) {
                    let before = self.textures.before.get(ui.ctx(), generation, original).cloned();
                    let after = self.textures.after.get(ui.ctx(), generation, result).cloned();

                    let width = ui.available_width();
                    let (rect, _) = ui.allocate_exact_size(
                        egui::vec2(width, width / FRAME_ASPECT),
                        egui::Sense::hover(),
                    );
                    match (before, after) {
                        (Some(before), Some(after)) => {
                            comparison_slider(ui, rect, &before, &after, &mut self.slider);
                        }
                        _ => {
                            ui.painter().text(
                                rect.center(),
                                egui::Align2::CENTER_CENTER,
                                "The images could not be displayed",
                                egui::FontId::proportional(16.0),
                                egui::Color32::DARK_RED,
                            );
                        }
                    }
                    ui.add_space(8.0);
                    if ui.button("Copy result").clicked() {
                        actions.push(UiAction::CopyResult);
                    }
                }

                if let Some(text) = text {
                    ui.add_space(12.0);
                    egui::Frame::group(ui.style()).inner_margin(12.0).show(ui, |ui| {
                        CommonMarkViewer::new().show(ui, &mut self.markdown_cache, &text);
                    });
                }

                ui.add_space(16.0);
                egui::Frame::group(ui.style())
                    .fill(egui::Color32::WHITE)
                    .inner_margin(16.0)
                    .show(ui, |ui| {
                        ui.label(egui::RichText::new("✨ Treatment Plan").strong().color(COFFEE_DARK));
                        ui.label(
                            "Based on your analysis, our Espresso-Guard Whitening package is perfect for you. \
                             It removes deep tannins while protecting enamel.",
                        );
                        ui.horizontal(|ui| {
                            ui.label(egui::RichText::new("Estimated Duration").strong());
                            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                                ui.label(egui::RichText::new("45 Mins").strong());
                            });
                        });
                    });

                ui.add_space(12.0);
                ui.label(
                    egui::RichText::new("*Simulation only. Actual results may vary based on dental health.")
                        .small()
                        .weak(),
                );
            });
        });
    }

    /// Renders the error view.
    fn render_error(&mut self, ui: &mut egui::Ui, actions: &mut Vec<UiAction>) {
        let session = self.controller.session();
        let message = session
            .error_message()
            .unwrap_or("Something went wrong.")
            .to_string();
        let retryable = session.error_is_retryable();

        ui.vertical_centered(|ui| {
            ui.add_space(ui.available_height() * 0.3);
            ui.label(egui::RichText::new("✕").size(40.0).color(egui::Color32::from_rgb(248, 113, 113)));
            ui.heading(egui::RichText::new("Oops!").strong().color(COFFEE_DARK));
            ui.add_space(8.0);
            ui.label(egui::RichText::new(message).color(COFFEE_MID));
            if !retryable {
                ui.label(
                    egui::RichText::new("If this keeps happening, check the settings.")
                        .small()
                        .weak(),
                );
            }
            ui.add_space(24.0);
            if ui.button(egui::RichText::new("Try Again").size(18.0)).clicked() {
                actions.push(UiAction::Retry);
            }
            if ui.button("Start over").clicked() {
                actions.push(UiAction::Reset);
            }
        });
    }
}

impl eframe::App for SmileApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        ctx.set_visuals(egui::Visuals::light());

        self.sync_session();

        let view = self.controller.view();
        if view == View::Capturing {
            ctx.request_repaint_after(PREVIEW_INTERVAL);
        }

        let mut actions = Vec::new();
        if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            actions.push(UiAction::Quit);
        }

        let panel_frame = egui::Frame::default()
            .fill(COFFEE_LIGHT)
            .inner_margin(egui::Margin::same(16));

        egui::CentralPanel::default()
            .frame(panel_frame)
            .show(ctx, |ui| {
                match view {
                    View::Landing => self.render_landing(ui, &mut actions),
                    View::Capturing => self.render_camera(ui, &mut actions),
                    View::Processing => self.render_processing(ui),
                    View::Result => self.render_result(ui, &mut actions),
                    View::Error => self.render_error(ui, &mut actions),
                }

                if let Some(notice) = &self.notice {
                    ui.with_layout(egui::Layout::bottom_up(egui::Align::Center), |ui| {
                        ui.label(egui::RichText::new(notice).italics().color(COFFEE_MID));
                    });
                }
            });

        for action in actions {
            self.apply(action, ctx);
        }
    }
}

/// Puts the decoded image on the system clipboard.
fn copy_image_to_clipboard(image: &EncodedImage) -> Result<()> {
    let decoded = ImageProcessor::decode(image)?.to_rgba8();
    let (width, height) = decoded.dimensions();

    let mut clipboard = arboard::Clipboard::new()
        .map_err(|e| AppError::ui(format!("Clipboard unavailable: {}", e)))?;
    clipboard
        .set_image(arboard::ImageData {
            width: width as usize,
            height: height as usize,
            bytes: Cow::Owned(decoded.into_raw()),
        })
        .map_err(|e| AppError::ui(format!("Failed to copy image: {}", e)))
}

/// Opens the application window and blocks until it is closed.
///
/// # Arguments
/// * `config` - Application configuration
/// * `source` - Camera frame source
pub fn run(config: Config, source: Box<dyn FrameSource>) -> Result<()> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Smile Preview")
            .with_inner_size([480.0, 820.0])
            .with_min_inner_size([360.0, 560.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Smile Preview",
        options,
        Box::new(move |cc| {
            let app = SmileApp::new(cc.egui_ctx.clone(), config, source)?;
            Ok(Box::new(app) as Box<dyn eframe::App>)
        }),
    )
    .map_err(|e| AppError::ui(format!("Failed to run UI: {}", e)))
}
