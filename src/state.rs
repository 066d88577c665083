//! Application state and the single `update` entry point that mutates it.
//!
//! The egui shell never touches the stores directly: every click, drag and
//! key press becomes a [`Message`] applied through [`AppState::update`].

use egui::{Pos2, Vec2};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::drawing::{DrawError, DrawingSurface, PointerOutcome, Tool};
use crate::labels::LabelRegistry;
use crate::loader::LoadedImage;
use crate::model::{Annotation, AnnotationId, ImageEntry, ImageId, ImageStore};

/// Default drawing surface, the canvas size the annotator fits images into.
pub const DEFAULT_SURFACE: Vec2 = Vec2::new(800.0, 600.0);

/// Which flavour of the tool is running.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// Boxes and circles with pan/zoom, exported as a filename map.
    #[default]
    Annotator,
    /// Whole-image classification plus boxes, exported as a list.
    Labeler,
}

impl Profile {
    pub fn name(&self) -> &'static str {
        match self {
            Profile::Annotator => "annotator",
            Profile::Labeler => "labeler",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Profile::Annotator => "Image Annotation Tool",
            Profile::Labeler => "Image Labeling Tool",
        }
    }

    /// Shapes with either extent at or below this are discarded.
    pub fn min_extent(&self) -> f32 {
        match self {
            Profile::Annotator => 5.0,
            Profile::Labeler => 10.0,
        }
    }

    pub fn tools(&self) -> &'static [Tool] {
        match self {
            Profile::Annotator => &[Tool::Box, Tool::Circle, Tool::Pan],
            Profile::Labeler => &[Tool::Box],
        }
    }

    pub fn has_view_transform(&self) -> bool {
        matches!(self, Profile::Annotator)
    }

    pub fn export_file_name(&self) -> &'static str {
        match self {
            Profile::Annotator => "annotations.json",
            Profile::Labeler => "labeled_data.json",
        }
    }

    pub fn default_labels(&self) -> &'static [&'static str] {
        match self {
            Profile::Annotator => &["person", "car", "object"],
            Profile::Labeler => &[],
        }
    }
}

/// Labeler interaction mode. The annotator is always in detection mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Classification,
    Detection,
}

#[derive(Debug)]
pub enum Message {
    ImagesLoaded(Vec<LoadedImage>),
    SelectImage(usize),
    NextImage,
    PrevImage,
    RemoveImage(ImageId),

    AddLabel(String),
    RemoveLabel(String),
    SelectLabel(String),

    SelectTool(Tool),
    SetMode(Mode),

    /// Pointer positions are relative to the canvas' top-left corner.
    PointerDown(Pos2),
    PointerMove(Pos2),
    PointerUp,
    PointerLeave,

    ZoomBy(f32),
    ZoomAt { zoom: f32, cursor: Pos2 },
    ResetView,

    DeleteAnnotation(AnnotationId),
    DeleteLast,
    ToggleClassification(String),
}

#[derive(Debug, Error, PartialEq)]
pub enum StateError {
    #[error(transparent)]
    Draw(#[from] DrawError),

    #[error("no image loaded")]
    NoImage,

    #[error("image index {index} out of range ({len} images)")]
    ImageIndexOutOfRange { index: usize, len: usize },

    #[error("unknown image {0}")]
    UnknownImage(ImageId),

    #[error("unknown label '{0}'")]
    UnknownLabel(String),

    #[error("no annotation {0} on the current image")]
    UnknownAnnotation(AnnotationId),

    #[error("{what} is not available in the {profile} profile")]
    Unsupported {
        what: &'static str,
        profile: &'static str,
    },
}

pub struct AppState {
    profile: Profile,
    images: ImageStore,
    labels: LabelRegistry,
    surface: DrawingSurface,
    surface_size: Vec2,
    mode: Mode,
    revision: u64,
}

impl AppState {
    pub fn new(profile: Profile) -> Self {
        Self::with_labels(profile, profile.default_labels().iter().copied())
    }

    pub fn with_labels<I, S>(profile: Profile, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mode = match profile {
            Profile::Annotator => Mode::Detection,
            Profile::Labeler => Mode::Classification,
        };
        Self {
            profile,
            images: ImageStore::new(),
            labels: LabelRegistry::with_labels(labels),
            surface: DrawingSurface::new(profile.min_extent()),
            surface_size: DEFAULT_SURFACE,
            mode,
            revision: 0,
        }
    }

    pub fn with_surface_size(mut self, size: Vec2) -> Self {
        self.surface_size = size;
        self
    }

    pub fn profile(&self) -> Profile {
        self.profile
    }

    pub fn images(&self) -> &ImageStore {
        &self.images
    }

    pub fn labels(&self) -> &LabelRegistry {
        &self.labels
    }

    pub fn surface(&self) -> &DrawingSurface {
        &self.surface
    }

    pub fn surface_size(&self) -> Vec2 {
        self.surface_size
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn tool(&self) -> Tool {
        self.surface.tool
    }

    pub fn current_image(&self) -> Option<&ImageEntry> {
        self.images.current()
    }

    pub fn current_annotations(&self) -> &[Annotation] {
        self.images
            .current()
            .map(|img| img.annotations.as_slice())
            .unwrap_or(&[])
    }

    /// Bumped whenever something the canvas draws has changed.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    fn unsupported(&self, what: &'static str) -> StateError {
        StateError::Unsupported {
            what,
            profile: self.profile.name(),
        }
    }

    pub fn update(&mut self, msg: Message) -> Result<(), StateError> {
        match msg {
            Message::ImagesLoaded(loaded) => {
                let count = loaded.len();
                for img in loaded {
                    self.images.push(img.name, img.pixels);
                }
                log::info!("Added {} image(s), {} total", count, self.images.len());
                self.touch();
            }
            Message::SelectImage(index) => {
                if !self.images.select(index) {
                    return Err(StateError::ImageIndexOutOfRange {
                        index,
                        len: self.images.len(),
                    });
                }
                self.surface.cancel();
                self.touch();
            }
            Message::NextImage => {
                self.images.select_next();
                self.surface.cancel();
                self.touch();
            }
            Message::PrevImage => {
                self.images.select_prev();
                self.surface.cancel();
                self.touch();
            }
            Message::RemoveImage(id) => {
                let removed = self.images.remove(id).ok_or(StateError::UnknownImage(id))?;
                log::info!("Removed image {} ({})", removed.name, id);
                self.surface.cancel();
                self.touch();
            }

            Message::AddLabel(name) => {
                if !self.labels.add(&name) {
                    log::debug!("Ignoring empty or duplicate label {:?}", name);
                }
            }
            Message::RemoveLabel(name) => {
                if !self.labels.remove(&name) {
                    return Err(StateError::UnknownLabel(name));
                }
                let dangling = self
                    .images
                    .iter()
                    .flat_map(|img| img.annotations.iter())
                    .filter(|a| a.label == name)
                    .count();
                if dangling > 0 {
                    log::info!(
                        "Label {:?} removed while {} annotation(s) still use it",
                        name,
                        dangling
                    );
                }
            }
            Message::SelectLabel(name) => {
                if !self.labels.select(&name) {
                    return Err(StateError::UnknownLabel(name));
                }
            }

            Message::SelectTool(tool) => {
                if !self.profile.tools().contains(&tool) {
                    return Err(self.unsupported(tool.name()));
                }
                self.surface.cancel();
                self.surface.tool = tool;
                self.touch();
            }
            Message::SetMode(mode) => {
                if self.profile == Profile::Annotator && mode != Mode::Detection {
                    return Err(self.unsupported("classification mode"));
                }
                self.surface.cancel();
                self.mode = mode;
                self.touch();
            }

            Message::PointerDown(pos) => {
                if self.images.current().is_none() {
                    return Err(StateError::NoImage);
                }
                if self.mode != Mode::Detection {
                    return Ok(());
                }
                self.surface.pointer_down(pos, self.labels.selected())?;
                self.touch();
            }
            Message::PointerMove(pos) => {
                if self.surface.pointer_move(pos) != PointerOutcome::Ignored {
                    self.touch();
                }
            }
            Message::PointerUp => {
                let outcome = self.surface.pointer_up();
                self.finish_drag(outcome)?;
            }
            Message::PointerLeave => {
                let outcome = self.surface.pointer_leave();
                self.finish_drag(outcome)?;
            }

            Message::ZoomBy(delta) => {
                if !self.profile.has_view_transform() {
                    return Err(self.unsupported("zoom"));
                }
                self.surface.view.zoom_by(delta);
                self.touch();
            }
            Message::ZoomAt { zoom, cursor } => {
                if !self.profile.has_view_transform() {
                    return Err(self.unsupported("zoom"));
                }
                self.surface.view.zoom_to_cursor(zoom, cursor);
                self.touch();
            }
            Message::ResetView => {
                self.surface.view.reset();
                self.touch();
            }

            Message::DeleteAnnotation(id) => {
                let img = self.images.current_mut().ok_or(StateError::NoImage)?;
                img.remove_annotation(id)
                    .ok_or(StateError::UnknownAnnotation(id))?;
                self.touch();
            }
            Message::DeleteLast => {
                let img = self.images.current_mut().ok_or(StateError::NoImage)?;
                if img.annotations.pop().is_some() {
                    self.touch();
                }
            }
            Message::ToggleClassification(label) => {
                if !self.labels.contains(&label) {
                    return Err(StateError::UnknownLabel(label));
                }
                let img = self.images.current_mut().ok_or(StateError::NoImage)?;
                img.toggle_label(&label);
                self.touch();
            }
        }
        Ok(())
    }

    fn finish_drag(&mut self, outcome: PointerOutcome) -> Result<(), StateError> {
        match outcome {
            PointerOutcome::Ignored => return Ok(()),
            PointerOutcome::Committed(shape) => {
                let id = self.images.allocate_annotation_id();
                let img = self.images.current_mut().ok_or(StateError::NoImage)?;
                log::debug!(
                    "Committed {} {} on {} at {:?}",
                    shape.kind.name(),
                    id,
                    img.name,
                    shape.rect
                );
                img.annotations
                    .push(Annotation::new(id, shape.kind, shape.rect, shape.label));
            }
            PointerOutcome::Discarded => {
                log::debug!("Discarded drag below {}px", self.surface.min_extent);
            }
            PointerOutcome::Started | PointerOutcome::Updated | PointerOutcome::Panned => {}
        }
        self.touch();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ShapeKind;
    use image::RgbaImage;

    fn loaded(name: &str) -> LoadedImage {
        LoadedImage {
            name: name.to_owned(),
            pixels: RgbaImage::new(100, 100),
        }
    }

    fn annotator_with_image() -> AppState {
        let mut state = AppState::new(Profile::Annotator);
        state
            .update(Message::ImagesLoaded(vec![loaded("a.png")]))
            .unwrap();
        state
    }

    fn drag(state: &mut AppState, from: (f32, f32), to: (f32, f32)) -> Result<(), StateError> {
        state.update(Message::PointerDown(egui::pos2(from.0, from.1)))?;
        state.update(Message::PointerMove(egui::pos2(to.0, to.1)))?;
        state.update(Message::PointerUp)
    }

    #[test]
    fn test_draws_commit_in_order_with_stable_ids() {
        let mut state = annotator_with_image();
        state.update(Message::SelectLabel("car".into())).unwrap();
        drag(&mut state, (0.0, 0.0), (20.0, 20.0)).unwrap();
        state.update(Message::SelectTool(Tool::Circle)).unwrap();
        drag(&mut state, (40.0, 40.0), (10.0, 10.0)).unwrap();
        drag(&mut state, (0.0, 0.0), (3.0, 30.0)).unwrap();

        let anns = state.current_annotations();
        assert_eq!(anns.len(), 2);
        assert_eq!(anns[0].kind, ShapeKind::Box);
        assert_eq!(anns[1].kind, ShapeKind::Circle);
        assert_eq!((anns[1].x, anns[1].y, anns[1].width), (10.0, 10.0, 30.0));
        assert_ne!(anns[0].id, anns[1].id);
    }

    #[test]
    fn test_pointer_down_without_label_is_refused() {
        let mut state = annotator_with_image();
        let err = drag(&mut state, (0.0, 0.0), (50.0, 50.0)).unwrap_err();
        assert_eq!(err, StateError::Draw(DrawError::NoLabelSelected));
        assert!(state.current_annotations().is_empty());
        assert!(!state.surface().is_dragging());
    }

    #[test]
    fn test_pointer_down_without_image() {
        let mut state = AppState::new(Profile::Annotator);
        state.update(Message::SelectLabel("car".into())).unwrap();
        assert_eq!(
            state.update(Message::PointerDown(egui::pos2(1.0, 1.0))),
            Err(StateError::NoImage)
        );
    }

    #[test]
    fn test_delete_by_id_and_delete_last() {
        let mut state = annotator_with_image();
        state.update(Message::SelectLabel("person".into())).unwrap();
        for i in 0..3 {
            let o = i as f32 * 20.0;
            drag(&mut state, (o, o), (o + 10.0, o + 10.0)).unwrap();
        }
        let middle = state.current_annotations()[1].id;
        state.update(Message::DeleteAnnotation(middle)).unwrap();
        assert_eq!(state.current_annotations().len(), 2);
        assert!(state.current_annotations().iter().all(|a| a.id != middle));
        assert_eq!(
            state.update(Message::DeleteAnnotation(middle)),
            Err(StateError::UnknownAnnotation(middle))
        );

        state.update(Message::DeleteLast).unwrap();
        assert_eq!(state.current_annotations().len(), 1);
        assert_eq!(state.current_annotations()[0].x, 0.0);
        state.update(Message::DeleteLast).unwrap();
        state.update(Message::DeleteLast).unwrap();
        assert!(state.current_annotations().is_empty());
    }

    #[test]
    fn test_labeler_ignores_drags_in_classification_mode() {
        let mut state = AppState::new(Profile::Labeler);
        state
            .update(Message::ImagesLoaded(vec![loaded("a.png")]))
            .unwrap();
        state.update(Message::AddLabel("cat".into())).unwrap();
        state.update(Message::SelectLabel("cat".into())).unwrap();
        drag(&mut state, (0.0, 0.0), (50.0, 50.0)).unwrap();
        assert!(state.current_annotations().is_empty());

        state.update(Message::SetMode(Mode::Detection)).unwrap();
        drag(&mut state, (0.0, 0.0), (10.0, 50.0)).unwrap();
        assert!(state.current_annotations().is_empty());
        drag(&mut state, (0.0, 0.0), (11.0, 50.0)).unwrap();
        assert_eq!(state.current_annotations().len(), 1);
    }

    #[test]
    fn test_classification_and_boxes_persist_across_modes() {
        let mut state = AppState::new(Profile::Labeler);
        state
            .update(Message::ImagesLoaded(vec![loaded("a.png")]))
            .unwrap();
        state.update(Message::AddLabel("cat".into())).unwrap();
        state
            .update(Message::ToggleClassification("cat".into()))
            .unwrap();
        state.update(Message::SetMode(Mode::Detection)).unwrap();
        state.update(Message::SelectLabel("cat".into())).unwrap();
        drag(&mut state, (0.0, 0.0), (20.0, 20.0)).unwrap();
        state.update(Message::SetMode(Mode::Classification)).unwrap();

        let img = state.current_image().unwrap();
        assert_eq!(img.labels, vec!["cat".to_string()]);
        assert_eq!(img.annotations.len(), 1);

        state
            .update(Message::ToggleClassification("cat".into()))
            .unwrap();
        assert!(state.current_image().unwrap().labels.is_empty());
    }

    #[test]
    fn test_labeler_rejects_view_and_pan() {
        let mut state = AppState::new(Profile::Labeler);
        assert!(matches!(
            state.update(Message::ZoomBy(0.1)),
            Err(StateError::Unsupported { .. })
        ));
        assert!(matches!(
            state.update(Message::SelectTool(Tool::Pan)),
            Err(StateError::Unsupported { .. })
        ));
    }

    #[test]
    fn test_annotator_has_no_classification_mode() {
        let mut state = AppState::new(Profile::Annotator);
        assert!(state.update(Message::SetMode(Mode::Classification)).is_err());
        assert_eq!(state.mode(), Mode::Detection);
    }

    #[test]
    fn test_removing_label_keeps_annotations() {
        let mut state = annotator_with_image();
        state.update(Message::SelectLabel("car".into())).unwrap();
        drag(&mut state, (0.0, 0.0), (20.0, 20.0)).unwrap();
        state.update(Message::RemoveLabel("car".into())).unwrap();
        assert_eq!(state.labels().selected(), None);
        assert_eq!(state.current_annotations()[0].label, "car");
        assert!(drag(&mut state, (0.0, 0.0), (20.0, 20.0)).is_err());
    }

    #[test]
    fn test_revision_tracks_canvas_changes() {
        let mut state = annotator_with_image();
        state.update(Message::SelectLabel("car".into())).unwrap();
        let r0 = state.revision();
        state.update(Message::PointerDown(egui::pos2(0.0, 0.0))).unwrap();
        let r1 = state.revision();
        assert!(r1 > r0);
        state.update(Message::PointerMove(egui::pos2(9.0, 9.0))).unwrap();
        assert!(state.revision() > r1);
        let r2 = state.revision();
        state.update(Message::AddLabel("tree".into())).unwrap();
        assert_eq!(state.revision(), r2);
        state.update(Message::ZoomBy(0.1)).unwrap();
        assert!(state.revision() > r2);
    }

    #[test]
    fn test_switching_image_drops_in_progress_shape() {
        let mut state = annotator_with_image();
        state
            .update(Message::ImagesLoaded(vec![loaded("b.png")]))
            .unwrap();
        state.update(Message::SelectLabel("car".into())).unwrap();
        state.update(Message::PointerDown(egui::pos2(0.0, 0.0))).unwrap();
        state.update(Message::PointerMove(egui::pos2(50.0, 50.0))).unwrap();
        state.update(Message::NextImage).unwrap();
        state.update(Message::PointerUp).unwrap();
        assert!(state.images().iter().all(|img| img.annotations.is_empty()));
    }

    #[test]
    fn test_select_image_out_of_range() {
        let mut state = annotator_with_image();
        assert_eq!(
            state.update(Message::SelectImage(4)),
            Err(StateError::ImageIndexOutOfRange { index: 4, len: 1 })
        );
    }
}
