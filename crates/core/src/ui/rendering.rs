//! Drawing helpers for the comparison slider and the camera view.

use crate::slider::ComparisonSlider;
use eframe::egui;

/// Aspect ratio (width / height) of the comparison and preview frames.
pub const FRAME_ASPECT: f32 = 3.0 / 4.0;

const HANDLE_LINE_WIDTH: f32 = 3.0;
const HANDLE_KNOB_RADIUS: f32 = 16.0;
const HANDLE_ACCENT: egui::Color32 = egui::Color32::from_rgb(234, 88, 12);

/// Largest rectangle with the given aspect ratio centered in `available`.
pub fn aspect_box(available: egui::Rect, aspect: f32) -> egui::Rect {
    if available.height() <= 0.0 || aspect <= 0.0 {
        return available;
    }

    let size = if available.width() / available.height() > aspect {
        egui::vec2(available.height() * aspect, available.height())
    } else {
        egui::vec2(available.width(), available.width() / aspect)
    };
    egui::Rect::from_center_size(available.center(), size)
}

/// UV rectangle that crops a texture to fill a target without distortion
/// (CSS `object-fit: cover`).
pub fn cover_uv(texture_aspect: f32, target_aspect: f32) -> egui::Rect {
    if texture_aspect <= 0.0 || target_aspect <= 0.0 {
        return full_uv();
    }

    if texture_aspect > target_aspect {
        // Texture is wider: crop left and right
        let visible = target_aspect / texture_aspect;
        let margin = (1.0 - visible) / 2.0;
        egui::Rect::from_min_max(egui::pos2(margin, 0.0), egui::pos2(1.0 - margin, 1.0))
    } else {
        // Texture is taller: crop top and bottom
        let visible = texture_aspect / target_aspect;
        let margin = (1.0 - visible) / 2.0;
        egui::Rect::from_min_max(egui::pos2(0.0, margin), egui::pos2(1.0, 1.0 - margin))
    }
}

fn full_uv() -> egui::Rect {
    egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0))
}

fn texture_aspect(texture: &egui::TextureHandle) -> f32 {
    let [w, h] = texture.size();
    w as f32 / h.max(1) as f32
}

/// Paints a texture over `rect`, cropping to fill.
pub fn draw_cover(painter: &egui::Painter, texture: &egui::TextureHandle, rect: egui::Rect) {
    let uv = cover_uv(texture_aspect(texture), rect.width() / rect.height().max(1.0));
    painter.image(texture.id(), rect, uv, egui::Color32::WHITE);
}

/// The horizontal span of `rect` where the "after" image is visible.
pub fn after_clip_rect(rect: egui::Rect, slider: &ComparisonSlider) -> egui::Rect {
    let split_x = rect.min.x + slider.clip_width(rect.width());
    egui::Rect::from_min_max(rect.min, egui::pos2(split_x, rect.max.y))
}

/// Draws "before" full-bleed, "after" clipped to the split, and the handle.
pub fn draw_comparison(
    painter: &egui::Painter,
    rect: egui::Rect,
    before: &egui::TextureHandle,
    after: &egui::TextureHandle,
    slider: &ComparisonSlider,
) {
    draw_cover(painter, before, rect);

    let clip = after_clip_rect(rect, slider);
    if clip.width() > 0.0 {
        draw_cover(&painter.with_clip_rect(clip), after, rect);
    }

    draw_handle(painter, rect, clip.max.x, slider.is_dragging());
}

fn draw_handle(painter: &egui::Painter, rect: egui::Rect, x: f32, active: bool) {
    painter.line_segment(
        [egui::pos2(x, rect.min.y), egui::pos2(x, rect.max.y)],
        egui::Stroke::new(HANDLE_LINE_WIDTH, egui::Color32::WHITE),
    );

    let center = egui::pos2(x, rect.center().y);
    let radius = if active {
        HANDLE_KNOB_RADIUS * 1.15
    } else {
        HANDLE_KNOB_RADIUS
    };
    painter.circle_filled(center, radius, egui::Color32::WHITE);
    painter.text(
        center,
        egui::Align2::CENTER_CENTER,
        "↔",
        egui::FontId::proportional(18.0),
        HANDLE_ACCENT,
    );
}

/// Oval face guide and hint shown over the live camera preview.
pub fn draw_face_guide(painter: &egui::Painter, rect: egui::Rect) {
    let center = rect.center() - egui::vec2(0.0, rect.height() * 0.06);
    let radius = egui::vec2(rect.width() * 0.36, rect.height() * 0.3);
    painter.add(egui::Shape::ellipse_stroke(
        center,
        radius,
        egui::Stroke::new(2.0, egui::Color32::from_white_alpha(128)),
    ));

    let hint_pos = egui::pos2(rect.center().x, rect.max.y - rect.height() * 0.2);
    painter.text(
        hint_pos,
        egui::Align2::CENTER_CENTER,
        "Smile & Show Teeth!",
        egui::FontId::proportional(20.0),
        egui::Color32::WHITE,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn aspect_box_fits_wide_container() {
        let available = egui::Rect::from_min_size(egui::pos2(0.0, 0.0), egui::vec2(1000.0, 800.0));
        let frame = aspect_box(available, FRAME_ASPECT);
        assert!(approx(frame.height(), 800.0));
        assert!(approx(frame.width(), 600.0));
        assert!(approx(frame.center().x, 500.0));
    }

    #[test]
    fn aspect_box_fits_tall_container() {
        let available = egui::Rect::from_min_size(egui::pos2(0.0, 0.0), egui::vec2(300.0, 900.0));
        let frame = aspect_box(available, FRAME_ASPECT);
        assert!(approx(frame.width(), 300.0));
        assert!(approx(frame.height(), 400.0));
    }

    #[test]
    fn cover_uv_crops_wider_texture_sideways() {
        let uv = cover_uv(16.0 / 9.0, 1.0);
        assert!(approx(uv.min.y, 0.0) && approx(uv.max.y, 1.0));
        assert!(approx(uv.width(), 9.0 / 16.0));
        assert!(approx(uv.center().x, 0.5));
    }

    #[test]
    fn cover_uv_crops_taller_texture_vertically() {
        let uv = cover_uv(0.5, 1.0);
        assert!(approx(uv.min.x, 0.0) && approx(uv.max.x, 1.0));
        assert!(approx(uv.height(), 0.5));
    }

    #[test]
    fn after_clip_follows_slider() {
        let rect = egui::Rect::from_min_size(egui::pos2(100.0, 0.0), egui::vec2(300.0, 400.0));
        let mut slider = ComparisonSlider::new();
        assert!(approx(after_clip_rect(rect, &slider).max.x, 250.0));

        slider.set_position(0.0);
        assert!(approx(after_clip_rect(rect, &slider).width(), 0.0));
        slider.set_position(1.0);
        assert_eq!(after_clip_rect(rect, &slider), rect);
    }
}
