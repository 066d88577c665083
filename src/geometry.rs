//! Pan/zoom transform and the small amount of shape math the canvas needs.
//!
//! Everything here works in two spaces: *screen* space, the pointer position
//! relative to the canvas' top-left corner, and *image* space, where
//! annotations live. The forward transform is translate-by-pan then
//! scale-by-zoom, so `screen = image * zoom + pan`.

use egui::{Pos2, Rect, Vec2};

pub const MIN_ZOOM: f32 = 0.1;
pub const MAX_ZOOM: f32 = 5.0;

/// Pan and zoom of the drawing surface.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewTransform {
    pub zoom: f32,
    pub pan: Vec2,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            pan: Vec2::ZERO,
        }
    }
}

impl ViewTransform {
    pub fn new(zoom: f32, pan: Vec2) -> Self {
        Self {
            zoom: zoom.clamp(MIN_ZOOM, MAX_ZOOM),
            pan,
        }
    }

    /// Convert image-space coords to screen-space
    pub fn to_screen(&self, img_pos: Pos2) -> Pos2 {
        (img_pos.to_vec2() * self.zoom + self.pan).to_pos2()
    }

    /// Convert screen-space coords to image-space
    pub fn to_image(&self, screen_pos: Pos2) -> Pos2 {
        ((screen_pos.to_vec2() - self.pan) / self.zoom).to_pos2()
    }

    pub fn rect_to_screen(&self, rect: Rect) -> Rect {
        Rect::from_min_max(self.to_screen(rect.min), self.to_screen(rect.max))
    }

    /// Step the zoom level by `delta`, keeping it inside `[MIN_ZOOM, MAX_ZOOM]`.
    pub fn zoom_by(&mut self, delta: f32) {
        self.zoom = (self.zoom + delta).clamp(MIN_ZOOM, MAX_ZOOM);
    }

    /// Change the zoom level while keeping the image point under `cursor`
    /// fixed on screen.
    pub fn zoom_to_cursor(&mut self, new_zoom: f32, cursor: Pos2) {
        let new_zoom = new_zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        let img = self.to_image(cursor);
        self.pan = cursor.to_vec2() - img.to_vec2() * new_zoom;
        self.zoom = new_zoom;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Rectangle of an image of `image_size` scaled to fit `surface`, keeping
/// its aspect ratio and centered on the surface.
pub fn fit_rect(surface: Vec2, image_size: Vec2) -> Rect {
    if image_size.x <= 0.0 || image_size.y <= 0.0 {
        return Rect::from_min_size(Pos2::ZERO, Vec2::ZERO);
    }
    let scale = (surface.x / image_size.x).min(surface.y / image_size.y);
    let size = image_size * scale;
    let min = ((surface - size) * 0.5).to_pos2();
    Rect::from_min_size(min, size)
}

/// Normalized rectangle spanned by a drag from `anchor` to `current`:
/// top-left origin, non-negative extents, whatever the drag direction.
pub fn drag_rect(anchor: Pos2, current: Pos2) -> Rect {
    Rect::from_two_pos(anchor, current)
}

/// Center and radius of the circle drawn for a circle annotation whose
/// bounding box is `rect`. The larger extent is the diameter.
pub fn circle_in(rect: Rect) -> (Pos2, f32) {
    let radius = rect.width().abs().max(rect.height().abs()) * 0.5;
    (rect.center(), radius)
}
