//! Builds the display list for the canvas from application state.
//!
//! A [`Scene`] is recomputed from scratch whenever [`AppState::revision`]
//! changes; the egui layer only paints what is in it. All coordinates in a
//! scene are screen coordinates relative to the canvas' top-left corner.

use egui::{Color32, Pos2, Rect, Stroke};

use crate::geometry::{circle_in, fit_rect, ViewTransform};
use crate::model::{ImageEntry, ImageId, ShapeKind};
use crate::state::{AppState, Profile};

pub const LABEL_FONT_SIZE: f32 = 14.0;
const STROKE_WIDTH: f32 = 2.0;
const LABEL_GAP: f32 = 5.0;

/// Colours used for one profile.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Palette {
    pub background: Color32,
    pub stroke: Color32,
    /// Stroke of the most recently added annotation.
    pub latest_stroke: Color32,
    pub fill: Color32,
    pub label_text: Color32,
    /// Filled tag behind the label text, if any.
    pub label_tag: Option<Color32>,
    pub in_progress_stroke: Color32,
    pub in_progress_fill: Color32,
}

impl Palette {
    pub fn for_profile(profile: Profile) -> Self {
        match profile {
            Profile::Annotator => Self {
                background: Color32::from_rgb(17, 24, 39),
                stroke: Color32::from_rgb(255, 0, 0),
                latest_stroke: Color32::from_rgb(0, 255, 0),
                fill: Color32::from_rgba_unmultiplied(255, 0, 0, 26),
                label_text: Color32::from_rgb(255, 0, 0),
                label_tag: None,
                in_progress_stroke: Color32::from_rgb(0, 255, 0),
                in_progress_fill: Color32::from_rgba_unmultiplied(0, 255, 0, 26),
            },
            Profile::Labeler => {
                let blue = Color32::from_rgb(59, 130, 246);
                Self {
                    background: Color32::from_rgb(243, 244, 246),
                    stroke: blue,
                    latest_stroke: blue,
                    fill: Color32::TRANSPARENT,
                    label_text: Color32::WHITE,
                    label_tag: Some(blue),
                    in_progress_stroke: Color32::from_rgb(239, 68, 68),
                    in_progress_fill: Color32::TRANSPARENT,
                }
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Primitive {
    Rect {
        rect: Rect,
        fill: Color32,
        stroke: Stroke,
    },
    Circle {
        center: Pos2,
        radius: f32,
        fill: Color32,
        stroke: Stroke,
    },
    /// Text whose bottom-left corner sits at `pos`.
    Label {
        pos: Pos2,
        text: String,
        color: Color32,
        tag: Option<Color32>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ImagePlacement {
    pub image: ImageId,
    pub rect: Rect,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Scene {
    pub revision: u64,
    pub background: Color32,
    pub image: Option<ImagePlacement>,
    pub primitives: Vec<Primitive>,
}

fn image_rect(profile: Profile, view: &ViewTransform, surface: egui::Vec2, img: &ImageEntry) -> Rect {
    match profile {
        Profile::Annotator => view.rect_to_screen(fit_rect(surface, img.natural_size())),
        Profile::Labeler => Rect::from_min_size(Pos2::ZERO, img.natural_size()),
    }
}

fn shape_primitive(kind: ShapeKind, screen_rect: Rect, fill: Color32, stroke: Stroke) -> Primitive {
    match kind {
        ShapeKind::Box => Primitive::Rect {
            rect: screen_rect,
            fill,
            stroke,
        },
        ShapeKind::Circle => {
            let (center, radius) = circle_in(screen_rect);
            Primitive::Circle {
                center,
                radius,
                fill,
                stroke,
            }
        }
    }
}

/// Recompute the whole canvas for the current image.
pub fn build_scene(state: &AppState) -> Scene {
    let palette = Palette::for_profile(state.profile());
    let mut scene = Scene {
        revision: state.revision(),
        background: palette.background,
        image: None,
        primitives: Vec::new(),
    };
    let Some(img) = state.current_image() else {
        return scene;
    };

    let surface = state.surface();
    let view = surface.view;
    scene.image = Some(ImagePlacement {
        image: img.id,
        rect: image_rect(state.profile(), &view, state.surface_size(), img),
    });

    let last = img.annotations.len().saturating_sub(1);
    for (i, ann) in img.annotations.iter().enumerate() {
        let color = if i == last {
            palette.latest_stroke
        } else {
            palette.stroke
        };
        let rect = view.rect_to_screen(ann.rect());
        scene.primitives.push(shape_primitive(
            ann.kind,
            rect,
            palette.fill,
            Stroke::new(STROKE_WIDTH, color),
        ));
        scene.primitives.push(Primitive::Label {
            pos: rect.min - egui::vec2(0.0, LABEL_GAP),
            text: ann.label.clone(),
            color: palette.label_text,
            tag: palette.label_tag,
        });
    }

    if let Some((kind, rect)) = surface.in_progress() {
        scene.primitives.push(shape_primitive(
            kind,
            view.rect_to_screen(rect),
            palette.in_progress_fill,
            Stroke::new(STROKE_WIDTH, palette.in_progress_stroke),
        ));
    }
    scene
}
