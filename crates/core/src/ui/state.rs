//! UI-side state: user actions and the decoded texture cache.

use crate::image_processing::{EncodedImage, ImageProcessor};
use eframe::egui;
use tracing::warn;

/// Actions the views can request. They are collected while drawing and
/// applied once the frame is laid out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum UiAction {
    Start,
    Capture,
    Retry,
    Reset,
    CopyResult,
    ToggleSettings,
    SaveSettings,
    Quit,
}

/// A texture decoded from an [`EncodedImage`], tagged with the key it was
/// decoded for so it is only rebuilt when the source changes.
pub(crate) struct TextureSlot {
    name: &'static str,
    key: Option<u64>,
    texture: Option<egui::TextureHandle>,
    mirrored: bool,
}

impl TextureSlot {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            key: None,
            texture: None,
            mirrored: false,
        }
    }

    /// A slot that flips images horizontally, for a selfie-style preview.
    pub fn mirrored(name: &'static str) -> Self {
        Self {
            mirrored: true,
            ..Self::new(name)
        }
    }

    /// Returns the texture for `image`, decoding it if `key` changed.
    ///
    /// Decode failures are cached too, so a broken payload is not decoded
    /// again every frame.
    pub fn get(
        &mut self,
        ctx: &egui::Context,
        key: u64,
        image: &EncodedImage,
    ) -> Option<&egui::TextureHandle> {
        if self.key != Some(key) {
            self.key = Some(key);
            self.texture = match to_color_image(image, self.mirrored) {
                Some(color_image) => {
                    Some(ctx.load_texture(self.name, color_image, egui::TextureOptions::LINEAR))
                }
                None => None,
            };
        }
        self.texture.as_ref()
    }

    pub fn clear(&mut self) {
        self.key = None;
        self.texture = None;
    }
}

/// Decodes an encoded image into egui's pixel format.
pub(crate) fn to_color_image(image: &EncodedImage, mirrored: bool) -> Option<egui::ColorImage> {
    let decoded = match ImageProcessor::decode(image) {
        Ok(decoded) => decoded,
        Err(e) => {
            warn!(error = %e, "Cannot display image");
            return None;
        }
    };
    let decoded = if mirrored { decoded.fliph() } else { decoded };

    let size = [decoded.width() as usize, decoded.height() as usize];
    let buffer = decoded.to_rgba8();
    let pixels = buffer.as_flat_samples();
    Some(egui::ColorImage::from_rgba_unmultiplied(
        size,
        pixels.as_slice(),
    ))
}

/// Textures used across the views.
pub(crate) struct Textures {
    pub preview: TextureSlot,
    pub before: TextureSlot,
    pub after: TextureSlot,
}

impl Default for Textures {
    fn default() -> Self {
        Self {
            preview: TextureSlot::mirrored("camera_preview"),
            before: TextureSlot::new("before"),
            after: TextureSlot::new("after"),
        }
    }
}

impl Textures {
    /// Drops the session images, keeping the live preview.
    pub fn clear_session(&mut self) {
        self.before.clear();
        self.after.clear();
    }
}
