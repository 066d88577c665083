//! Images, annotations and the store that owns them.

use std::fmt;

use egui::{Pos2, Rect};
use image::RgbaImage;
use serde::Serialize;

/// Identifier handed out by [`ImageStore`] when an image is added. Two files
/// with the same name still get different ids.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageId(u64);

/// Identifier of a committed annotation, unique for the whole session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnnotationId(u64);

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "img#{}", self.0)
    }
}

impl fmt::Display for AnnotationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ann#{}", self.0)
    }
}

// ── Annotations ─────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    Box,
    Circle,
}

impl ShapeKind {
    pub fn name(&self) -> &'static str {
        match self {
            ShapeKind::Box => "box",
            ShapeKind::Circle => "circle",
        }
    }
}

/// A committed shape in image space. `width` and `height` are never negative.
#[derive(Clone, Debug, PartialEq)]
pub struct Annotation {
    pub id: AnnotationId,
    pub kind: ShapeKind,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub label: String,
}

impl Annotation {
    pub fn new(id: AnnotationId, kind: ShapeKind, rect: Rect, label: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            x: rect.min.x,
            y: rect.min.y,
            width: rect.width().abs(),
            height: rect.height().abs(),
            label: label.into(),
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::from_min_size(Pos2::new(self.x, self.y), egui::vec2(self.width, self.height))
    }

    /// One-line summary for the annotation list, e.g. `box | 40×30`.
    pub fn summary(&self) -> String {
        format!(
            "{} | {}×{}",
            self.kind.name(),
            self.width.round() as i64,
            self.height.round() as i64
        )
    }
}

// ── Images ──────────────────────────────────────────────────────────────────

pub struct ImageEntry {
    pub id: ImageId,
    pub name: String,
    pub pixels: RgbaImage,
    /// Whole-image labels (classification mode), in the order they were set.
    pub labels: Vec<String>,
    pub annotations: Vec<Annotation>,
}

impl ImageEntry {
    pub fn natural_width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn natural_height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn natural_size(&self) -> egui::Vec2 {
        egui::vec2(self.natural_width() as f32, self.natural_height() as f32)
    }

    /// Add `label` if absent, remove it if present.
    pub fn toggle_label(&mut self, label: &str) {
        if let Some(idx) = self.labels.iter().position(|l| l == label) {
            self.labels.remove(idx);
        } else {
            self.labels.push(label.to_owned());
        }
    }

    pub fn remove_annotation(&mut self, id: AnnotationId) -> Option<Annotation> {
        let idx = self.annotations.iter().position(|a| a.id == id)?;
        Some(self.annotations.remove(idx))
    }
}

impl fmt::Debug for ImageEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageEntry")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("size", &(self.natural_width(), self.natural_height()))
            .field("labels", &self.labels)
            .field("annotations", &self.annotations.len())
            .finish()
    }
}

/// Ordered images plus the index of the one being shown.
#[derive(Debug, Default)]
pub struct ImageStore {
    images: Vec<ImageEntry>,
    current: usize,
    next_image_id: u64,
    next_annotation_id: u64,
}

impl ImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an image and return its freshly generated id.
    pub fn push(&mut self, name: impl Into<String>, pixels: RgbaImage) -> ImageId {
        let id = ImageId(self.next_image_id);
        self.next_image_id += 1;
        self.images.push(ImageEntry {
            id,
            name: name.into(),
            pixels,
            labels: Vec::new(),
            annotations: Vec::new(),
        });
        id
    }

    pub fn allocate_annotation_id(&mut self) -> AnnotationId {
        let id = AnnotationId(self.next_annotation_id);
        self.next_annotation_id += 1;
        id
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ImageEntry> {
        self.images.iter()
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current(&self) -> Option<&ImageEntry> {
        self.images.get(self.current)
    }

    pub fn current_mut(&mut self) -> Option<&mut ImageEntry> {
        self.images.get_mut(self.current)
    }

    pub fn get(&self, id: ImageId) -> Option<&ImageEntry> {
        self.images.iter().find(|img| img.id == id)
    }

    /// Returns false when `index` is out of range; the selection is unchanged.
    pub fn select(&mut self, index: usize) -> bool {
        if index < self.images.len() {
            self.current = index;
            true
        } else {
            false
        }
    }

    pub fn select_next(&mut self) {
        if self.current + 1 < self.images.len() {
            self.current += 1;
        }
    }

    pub fn select_prev(&mut self) {
        self.current = self.current.saturating_sub(1);
    }

    /// Remove an image. The selection stays on the same index when possible,
    /// otherwise moves to the new last image.
    pub fn remove(&mut self, id: ImageId) -> Option<ImageEntry> {
        let idx = self.images.iter().position(|img| img.id == id)?;
        let removed = self.images.remove(idx);
        if idx < self.current || self.current >= self.images.len() {
            self.current = self.current.saturating_sub(1);
        }
        Some(removed)
    }
}
