//! Comparison slider widget: feeds egui pointer input into [`ComparisonSlider`].

use super::rendering::draw_comparison;
use crate::slider::{ComparisonSlider, ContainerBounds, PointerEvent};
use eframe::egui;

/// Outcome of processing one frame of slider input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliderEvent {
    /// A drag started on the handle.
    Grabbed,
    /// The split moved.
    Moved,
    /// The drag ended (release or pointer left the frame).
    Released,
    None,
}

/// Active touch x-coordinates for this frame.
fn touch_points(ui: &egui::Ui) -> Vec<f32> {
    ui.input(|i| {
        i.events
            .iter()
            .filter_map(|event| match event {
                egui::Event::Touch { pos, phase, .. }
                    if matches!(phase, egui::TouchPhase::Start | egui::TouchPhase::Move) =>
                {
                    Some(pos.x)
                }
                _ => None,
            })
            .collect()
    })
}

/// Touch wins over the mouse when both are present.
fn sample(touches: &[f32], pos: Option<egui::Pos2>) -> Option<PointerEvent<'_>> {
    if !touches.is_empty() {
        Some(PointerEvent::Touch { xs: touches })
    } else {
        pos.map(|p| PointerEvent::Mouse { x: p.x })
    }
}

/// Translates this frame's pointer input into slider transitions.
pub fn process_slider_input(
    ui: &egui::Ui,
    response: &egui::Response,
    rect: egui::Rect,
    slider: &mut ComparisonSlider,
) -> SliderEvent {
    let bounds = ContainerBounds::new(rect.min.x, rect.width());
    let touches = touch_points(ui);

    if response.drag_started() {
        // Hit-test where the press began, not where the pointer is now
        let origin = ui.input(|i| i.pointer.press_origin());
        if let Some(event) = sample(&touches, origin) {
            if slider.pointer_down_at(event, bounds) {
                if let Some(now) = sample(&touches, response.interact_pointer_pos()) {
                    slider.pointer_move(now, bounds);
                }
                return SliderEvent::Grabbed;
            }
        }
    }

    if slider.is_dragging() {
        let hover = ui.input(|i| i.pointer.latest_pos());
        let left = hover.is_none_or(|p| !rect.contains(p));
        if left || response.drag_stopped() || !response.dragged() {
            if left {
                slider.pointer_leave();
            } else {
                slider.pointer_up();
            }
            return SliderEvent::Released;
        }

        if let Some(event) = sample(&touches, response.interact_pointer_pos()) {
            if slider.pointer_move(event, bounds) {
                return SliderEvent::Moved;
            }
        }
    }

    SliderEvent::None
}

/// Shows the before/after frame in `rect` and handles dragging.
pub fn comparison_slider(
    ui: &mut egui::Ui,
    rect: egui::Rect,
    before: &egui::TextureHandle,
    after: &egui::TextureHandle,
    slider: &mut ComparisonSlider,
) -> SliderEvent {
    let response = ui.interact(rect, ui.id().with("comparison_slider"), egui::Sense::drag());
    let event = process_slider_input(ui, &response, rect, slider);

    if slider.is_dragging()
        || response
            .hover_pos()
            .is_some_and(|p| slider.hits_handle(p.x, ContainerBounds::new(rect.min.x, rect.width())))
    {
        ui.ctx().set_cursor_icon(egui::CursorIcon::ResizeHorizontal);
    }

    draw_comparison(ui.painter(), rect, before, after, slider);

    if event != SliderEvent::None {
        ui.ctx().request_repaint();
    }
    event
}
