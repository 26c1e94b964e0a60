//! Before/after comparison slider interaction model.
//!
//! The slider splits a container at `position` (a ratio in `[0, 1]`). The
//! "before" image fills the container; the "after" image is clipped to
//! `[0, position * width]` on top of it. Dragging the handle moves the split.
//!
//! Only the handle starts a drag. While dragging, every pointer move maps the
//! pointer's horizontal coordinate into the container and clamps it. Releasing
//! the pointer or leaving the container ends the drag.

/// Initial split: half before, half after.
pub const DEFAULT_POSITION: f32 = 0.5;

/// Half-width of the grab area around the handle, in points.
pub const HANDLE_GRAB_RADIUS: f32 = 16.0;

/// Horizontal extent of the slider container in screen coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ContainerBounds {
    pub left: f32,
    pub width: f32,
}

impl ContainerBounds {
    pub fn new(left: f32, width: f32) -> Self {
        Self { left, width }
    }

    /// Maps a horizontal screen coordinate to a clamped ratio.
    ///
    /// Returns `None` for degenerate containers or non-finite input, so a
    /// zero-width layout never yields NaN.
    pub fn ratio_at(&self, x: f32) -> Option<f32> {
        if !(self.width > 0.0) || !x.is_finite() || !self.left.is_finite() {
            return None;
        }
        Some(((x - self.left) / self.width).clamp(0.0, 1.0))
    }

    /// Screen x of the split for a given ratio.
    pub fn x_at(&self, ratio: f32) -> f32 {
        self.left + ratio * self.width
    }
}

/// A pointer sample. Mouse and touch differ only in where x comes from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PointerEvent<'a> {
    Mouse { x: f32 },
    /// Active touch points; the first one drives the slider.
    Touch { xs: &'a [f32] },
}

impl PointerEvent<'_> {
    /// Horizontal coordinate of the sample, if it has one.
    pub fn horizontal(&self) -> Option<f32> {
        match self {
            Self::Mouse { x } => Some(*x),
            Self::Touch { xs } => xs.first().copied(),
        }
    }
}

/// Slider position and drag state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ComparisonSlider {
    position: f32,
    dragging: bool,
}

impl Default for ComparisonSlider {
    fn default() -> Self {
        Self::new()
    }
}

impl ComparisonSlider {
    pub fn new() -> Self {
        Self {
            position: DEFAULT_POSITION,
            dragging: false,
        }
    }

    /// Current split as a ratio in `[0, 1]`.
    pub fn position(&self) -> f32 {
        self.position
    }

    /// Current split as a percentage in `[0, 100]`.
    pub fn percent(&self) -> f32 {
        self.position * 100.0
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Sets the split directly, clamping into range. NaN is ignored.
    pub fn set_position(&mut self, ratio: f32) {
        if !ratio.is_nan() {
            self.position = ratio.clamp(0.0, 1.0);
        }
    }

    /// Whether `x` falls on the handle's grab area.
    pub fn hits_handle(&self, x: f32, bounds: ContainerBounds) -> bool {
        (x - bounds.x_at(self.position)).abs() <= HANDLE_GRAB_RADIUS
    }

    /// Pointer pressed on the handle.
    pub fn pointer_down(&mut self) {
        self.dragging = true;
    }

    /// Pointer pressed anywhere; starts a drag only if it lands on the handle.
    ///
    /// Returns whether a drag started.
    pub fn pointer_down_at(&mut self, event: PointerEvent<'_>, bounds: ContainerBounds) -> bool {
        match event.horizontal() {
            Some(x) if self.hits_handle(x, bounds) => {
                self.pointer_down();
                true
            }
            _ => false,
        }
    }

    /// Pointer moved. Updates the split while dragging.
    ///
    /// Returns whether the position changed.
    pub fn pointer_move(&mut self, event: PointerEvent<'_>, bounds: ContainerBounds) -> bool {
        if !self.dragging {
            return false;
        }

        let Some(ratio) = event.horizontal().and_then(|x| bounds.ratio_at(x)) else {
            return false;
        };

        let changed = ratio != self.position;
        self.position = ratio;
        changed
    }

    /// Pointer released.
    pub fn pointer_up(&mut self) {
        self.dragging = false;
    }

    /// Pointer left the container. Ends any drag so it cannot get stuck.
    pub fn pointer_leave(&mut self) {
        self.dragging = false;
    }

    /// Width of the visible "after" region for a container of `width`.
    pub fn clip_width(&self, width: f32) -> f32 {
        (self.position * width.max(0.0)).clamp(0.0, width.max(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOUNDS: ContainerBounds = ContainerBounds {
        left: 0.0,
        width: 300.0,
    };

    fn dragging() -> ComparisonSlider {
        let mut slider = ComparisonSlider::new();
        slider.pointer_down();
        slider
    }

    #[test]
    fn starts_centered_and_idle() {
        let slider = ComparisonSlider::new();
        assert_eq!(slider.position(), 0.5);
        assert_eq!(slider.percent(), 50.0);
        assert!(!slider.is_dragging());
    }

    #[test]
    fn clamps_outside_container() {
        let mut slider = dragging();
        slider.pointer_move(PointerEvent::Mouse { x: -50.0 }, BOUNDS);
        assert_eq!(slider.position(), 0.0);

        slider.pointer_move(PointerEvent::Mouse { x: 400.0 }, BOUNDS);
        assert_eq!(slider.position(), 1.0);
    }

    #[test]
    fn exact_bounds_map_to_zero_and_one() {
        let bounds = ContainerBounds::new(120.0, 300.0);
        let mut slider = dragging();
        slider.pointer_move(PointerEvent::Mouse { x: 120.0 }, bounds);
        assert_eq!(slider.position(), 0.0);
        slider.pointer_move(PointerEvent::Mouse { x: 420.0 }, bounds);
        assert_eq!(slider.position(), 1.0);
        slider.pointer_move(PointerEvent::Mouse { x: 195.0 }, bounds);
        assert_eq!(slider.position(), 0.25);
    }

    #[test]
    fn moves_are_ignored_when_not_dragging() {
        let mut slider = ComparisonSlider::new();
        assert!(!slider.pointer_move(PointerEvent::Mouse { x: 30.0 }, BOUNDS));
        assert_eq!(slider.position(), 0.5);
    }

    #[test]
    fn leave_ends_drag_until_next_press() {
        let mut slider = dragging();
        slider.pointer_move(PointerEvent::Mouse { x: 90.0 }, BOUNDS);
        assert_eq!(slider.position(), 0.3);

        slider.pointer_leave();
        assert!(!slider.is_dragging());
        slider.pointer_move(PointerEvent::Mouse { x: 270.0 }, BOUNDS);
        assert_eq!(slider.position(), 0.3);

        slider.pointer_down();
        slider.pointer_move(PointerEvent::Mouse { x: 270.0 }, BOUNDS);
        assert_eq!(slider.position(), 0.9);
    }

    #[test]
    fn release_ends_drag() {
        let mut slider = dragging();
        slider.pointer_up();
        assert!(!slider.pointer_move(PointerEvent::Mouse { x: 0.0 }, BOUNDS));
    }

    #[test]
    fn touch_and_mouse_resolve_identically() {
        let mut by_mouse = dragging();
        let mut by_touch = dragging();
        by_mouse.pointer_move(PointerEvent::Mouse { x: 75.0 }, BOUNDS);
        by_touch.pointer_move(PointerEvent::Touch { xs: &[75.0, 280.0] }, BOUNDS);
        assert_eq!(by_mouse.position(), by_touch.position());
    }

    #[test]
    fn touch_without_points_changes_nothing() {
        let mut slider = dragging();
        assert!(!slider.pointer_move(PointerEvent::Touch { xs: &[] }, BOUNDS));
        assert_eq!(slider.position(), 0.5);
    }

    #[test]
    fn zero_width_container_never_yields_nan() {
        let mut slider = dragging();
        slider.pointer_move(PointerEvent::Mouse { x: 10.0 }, ContainerBounds::new(10.0, 0.0));
        assert_eq!(slider.position(), 0.5);
        assert!(ContainerBounds::new(0.0, 100.0).ratio_at(f32::NAN).is_none());
    }

    #[test]
    fn only_the_handle_starts_a_drag() {
        let mut slider = ComparisonSlider::new();
        assert!(!slider.pointer_down_at(PointerEvent::Mouse { x: 20.0 }, BOUNDS));
        assert!(!slider.is_dragging());

        assert!(slider.pointer_down_at(PointerEvent::Mouse { x: 155.0 }, BOUNDS));
        assert!(slider.is_dragging());
    }

    #[test]
    fn clip_width_follows_position() {
        let mut slider = ComparisonSlider::new();
        assert_eq!(slider.clip_width(300.0), 150.0);
        slider.set_position(2.0);
        assert_eq!(slider.clip_width(300.0), 300.0);
        slider.set_position(-1.0);
        assert_eq!(slider.clip_width(300.0), 0.0);
        slider.set_position(f32::NAN);
        assert_eq!(slider.position(), 0.0);
    }
}
