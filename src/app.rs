//! eframe shell: panels, canvas painting and file dialogs.
//!
//! The shell turns egui input into [`Message`]s and paints the [`Scene`]
//! built from [`AppState`]. It holds no annotation state of its own.

use std::collections::HashMap;
use std::path::PathBuf;

use eframe::egui;
use egui_extras::{Column, TableBuilder};

use crate::config::AppConfig;
use crate::drawing::Tool;
use crate::export;
use crate::loader;
use crate::model::ImageId;
use crate::render::{build_scene, Primitive, Scene, LABEL_FONT_SIZE};
use crate::state::{AppState, Message, Mode, Profile};

const IMAGE_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "bmp", "webp", "tif", "tiff", "ico", "tga",
];
const THUMBNAIL_SIZE: f32 = 80.0;
const SCROLL_ZOOM_RATE: f32 = 0.002;
const WARNING_COLOR: egui::Color32 = egui::Color32::from_rgb(234, 179, 8);

enum Action {
    Update(Message),
    OpenImages,
    Export,
}

impl From<Message> for Action {
    fn from(msg: Message) -> Self {
        Action::Update(msg)
    }
}

struct Status {
    text: String,
    warning: bool,
}

impl Status {
    fn info(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            warning: false,
        }
    }

    fn warning(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            warning: true,
        }
    }
}

// ── App ─────────────────────────────────────────────────────────────────────

pub struct LabelerApp {
    state: AppState,
    config: AppConfig,
    textures: HashMap<ImageId, egui::TextureHandle>,
    scene: Option<Scene>,
    new_label: String,
    status: Option<Status>,
}

impl LabelerApp {
    pub fn new(state: AppState, config: AppConfig) -> Self {
        Self {
            state,
            config,
            textures: HashMap::new(),
            scene: None,
            new_label: String::new(),
            status: None,
        }
    }

    fn dispatch(&mut self, msg: Message) {
        if let Err(e) = self.state.update(msg) {
            log::warn!("{}", e);
            self.status = Some(Status::warning(e.to_string()));
        }
    }

    /// Decode `paths` and append the readable ones, in order.
    pub fn load_paths(&mut self, paths: &[PathBuf]) {
        let (images, errors) = loader::load_paths(paths);
        if let Some(first) = errors.first() {
            self.status = Some(Status::warning(format!(
                "Skipped {} file(s): {}",
                errors.len(),
                first
            )));
        }
        if !images.is_empty() {
            self.dispatch(Message::ImagesLoaded(images));
        }
    }

    fn open_images(&mut self) {
        let Some(paths) = rfd::FileDialog::new()
            .add_filter("Images", IMAGE_EXTENSIONS)
            .pick_files()
        else {
            return;
        };
        self.load_paths(&paths);
    }

    fn export(&mut self) {
        let mut dialog = rfd::FileDialog::new()
            .add_filter("JSON", &["json"])
            .set_file_name(self.state.profile().export_file_name());
        if let Some(dir) = &self.config.export_dir {
            dialog = dialog.set_directory(dir);
        }
        let Some(path) = dialog.save_file() else {
            return;
        };
        self.status = Some(match export::write_export(&self.state, &path) {
            Ok(report) if report.has_warnings() => Status::warning(format!(
                "Exported to {} with {} warning(s): {}",
                path.display(),
                report.warnings.len(),
                report.warnings[0]
            )),
            Ok(report) => Status::info(format!(
                "Exported {} image(s), {} annotation(s) to {}",
                report.images_exported,
                report.annotations_exported,
                path.display()
            )),
            Err(e) => {
                log::error!("Export failed: {}", e);
                Status::warning(format!("Export failed: {e}"))
            }
        });
    }

    fn apply(&mut self, actions: Vec<Action>) {
        for action in actions {
            match action {
                Action::Update(msg) => self.dispatch(msg),
                Action::OpenImages => self.open_images(),
                Action::Export => self.export(),
            }
        }
    }

    fn sync_textures(&mut self, ctx: &egui::Context) {
        let images = self.state.images();
        self.textures.retain(|id, _| images.get(*id).is_some());
        for img in images.iter() {
            self.textures.entry(img.id).or_insert_with(|| {
                let size = [img.natural_width() as usize, img.natural_height() as usize];
                let color_image =
                    egui::ColorImage::from_rgba_unmultiplied(size, img.pixels.as_raw());
                ctx.load_texture(img.id.to_string(), color_image, egui::TextureOptions::LINEAR)
            });
        }
    }

    // ── Panels ──────────────────────────────────────────────────────────────

    fn toolbar(&self, ui: &mut egui::Ui, actions: &mut Vec<Action>) {
        ui.horizontal(|ui| {
            if ui.button("Upload Images").clicked() {
                actions.push(Action::OpenImages);
            }
            ui.separator();
            match self.state.profile() {
                Profile::Annotator => {
                    for &tool in self.state.profile().tools() {
                        if ui
                            .selectable_label(self.state.tool() == tool, tool.name())
                            .clicked()
                        {
                            actions.push(Message::SelectTool(tool).into());
                        }
                    }
                    ui.separator();
                    let step = self.config.zoom_step;
                    if ui.button("Zoom In").clicked() {
                        actions.push(Message::ZoomBy(step).into());
                    }
                    if ui.button("Zoom Out").clicked() {
                        actions.push(Message::ZoomBy(-step).into());
                    }
                    if ui.button("Reset View").clicked() {
                        actions.push(Message::ResetView.into());
                    }
                    ui.separator();
                    if ui.button("Delete Last").clicked() {
                        actions.push(Message::DeleteLast.into());
                    }
                }
                Profile::Labeler => {
                    let mode = self.state.mode();
                    if ui
                        .selectable_label(mode == Mode::Classification, "Classification")
                        .clicked()
                    {
                        actions.push(Message::SetMode(Mode::Classification).into());
                    }
                    if ui
                        .selectable_label(mode == Mode::Detection, "Object Detection")
                        .clicked()
                    {
                        actions.push(Message::SetMode(Mode::Detection).into());
                    }
                }
            }
            ui.separator();
            if ui.button("Export JSON").clicked() {
                actions.push(Action::Export);
            }
        });
    }

    fn label_panel(&mut self, ui: &mut egui::Ui, actions: &mut Vec<Action>) {
        ui.heading("Labels");
        let selected = self.state.labels().selected();
        for label in self.state.labels().iter() {
            ui.horizontal(|ui| {
                if ui.selectable_label(selected == Some(label), label).clicked() {
                    actions.push(Message::SelectLabel(label.to_owned()).into());
                }
                if ui.small_button("×").on_hover_text("Remove label").clicked() {
                    actions.push(Message::RemoveLabel(label.to_owned()).into());
                }
            });
        }
        ui.horizontal(|ui| {
            let edit = ui.add(
                egui::TextEdit::singleline(&mut self.new_label)
                    .hint_text("New label")
                    .desired_width(140.0),
            );
            let submitted = edit.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
            if ui.button("Add").clicked() || submitted {
                actions.push(Message::AddLabel(std::mem::take(&mut self.new_label)).into());
            }
        });
    }

    fn image_panel(&self, ui: &mut egui::Ui, actions: &mut Vec<Action>) {
        let Some(img) = self.state.current_image() else {
            return;
        };
        ui.separator();
        if self.state.profile() == Profile::Labeler && self.state.mode() == Mode::Classification
        {
            ui.heading("Assign Labels");
            for label in self.state.labels().iter() {
                let assigned = img.labels.iter().any(|l| l == label);
                if ui.selectable_label(assigned, label).clicked() {
                    actions.push(Message::ToggleClassification(label.to_owned()).into());
                }
            }
            return;
        }

        match self.state.profile() {
            Profile::Annotator => ui.heading("Current Annotations"),
            Profile::Labeler => ui.heading("Bounding Boxes"),
        };
        if let Some(label) = self.state.labels().selected() {
            ui.label(format!("Draw with: {label}"));
        }
        if img.annotations.is_empty() {
            ui.weak("No annotations yet");
            return;
        }
        TableBuilder::new(ui)
            .striped(true)
            .vscroll(false)
            .column(Column::auto().at_least(60.0))
            .column(Column::remainder())
            .column(Column::auto())
            .header(20.0, |mut header| {
                header.col(|ui| {
                    ui.strong("Label");
                });
                header.col(|ui| {
                    ui.strong("Shape");
                });
                header.col(|_| {});
            })
            .body(|mut body| {
                for ann in &img.annotations {
                    body.row(20.0, |mut row| {
                        row.col(|ui| {
                            ui.label(&ann.label);
                        });
                        row.col(|ui| {
                            ui.label(ann.summary());
                        });
                        row.col(|ui| {
                            if ui.small_button("🗑").clicked() {
                                actions.push(Message::DeleteAnnotation(ann.id).into());
                            }
                        });
                    });
                }
            });
    }

    fn thumbnails(&self, ui: &mut egui::Ui, actions: &mut Vec<Action>) {
        let images = self.state.images();
        ui.horizontal(|ui| {
            if ui
                .add_enabled(images.current_index() > 0, egui::Button::new("Previous"))
                .clicked()
            {
                actions.push(Message::PrevImage.into());
            }
            ui.label(format!("{} / {}", images.current_index() + 1, images.len()));
            if ui
                .add_enabled(
                    images.current_index() + 1 < images.len(),
                    egui::Button::new("Next"),
                )
                .clicked()
            {
                actions.push(Message::NextImage.into());
            }
            ui.separator();
            ui.label(format!("Images ({})", images.len()));
        });
        egui::ScrollArea::horizontal().show(ui, |ui| {
            ui.horizontal(|ui| {
                for (idx, img) in images.iter().enumerate() {
                    let Some(tex) = self.textures.get(&img.id) else {
                        continue;
                    };
                    ui.vertical(|ui| {
                        let thumb = ui.add(
                            egui::Image::new((tex.id(), egui::Vec2::splat(THUMBNAIL_SIZE)))
                                .sense(egui::Sense::click()),
                        );
                        if idx == images.current_index() {
                            ui.painter().rect_stroke(
                                thumb.rect.expand(2.0),
                                2.0,
                                egui::Stroke::new(2.0, egui::Color32::from_rgb(59, 130, 246)),
                                egui::StrokeKind::Outside,
                            );
                        }
                        if thumb.clicked() {
                            actions.push(Message::SelectImage(idx).into());
                        }
                        thumb.context_menu(|ui| {
                            if ui.button("Remove image").clicked() {
                                actions.push(Message::RemoveImage(img.id).into());
                                ui.close_menu();
                            }
                        });
                        ui.add(egui::Label::new(egui::RichText::new(&img.name).small()).truncate());
                    });
                }
            });
        });
    }

    // ── Canvas ──────────────────────────────────────────────────────────────

    fn canvas(&mut self, ui: &mut egui::Ui, actions: &mut Vec<Action>) {
        let Some(img) = self.state.current_image() else {
            ui.centered_and_justified(|ui| {
                ui.label(match self.state.profile() {
                    Profile::Annotator => "Upload images to start annotating",
                    Profile::Labeler => "Upload images to start labeling",
                });
            });
            return;
        };
        let size = match self.state.profile() {
            Profile::Annotator => self.state.surface_size(),
            Profile::Labeler => img.natural_size(),
        };

        if self.scene.as_ref().map(|s| s.revision) != Some(self.state.revision()) {
            self.scene = Some(build_scene(&self.state));
        }

        let (response, painter) = ui.allocate_painter(size, egui::Sense::click_and_drag());
        let origin = response.rect.min.to_vec2();
        if let Some(scene) = &self.scene {
            paint_scene(&painter, scene, origin, &self.textures);
        }

        let ctx = ui.ctx().clone();
        let local = |p: egui::Pos2| p - origin;

        if response.drag_started_by(egui::PointerButton::Primary) {
            let pressed = ctx
                .input(|i| i.pointer.press_origin())
                .or(response.interact_pointer_pos());
            if let Some(pos) = pressed {
                actions.push(Message::PointerDown(local(pos)).into());
            }
        } else if response.dragged_by(egui::PointerButton::Primary)
            && self.state.surface().is_dragging()
        {
            // Only the part of the canvas not scrolled out of view counts as inside.
            let visible = ui.clip_rect().intersect(response.rect);
            if let Some(pos) = ctx.input(|i| i.pointer.latest_pos()) {
                actions.push(drag_message(pos, visible, origin).into());
            }
        }
        if response.drag_stopped_by(egui::PointerButton::Primary) {
            actions.push(Message::PointerUp.into());
        }

        // Zoom (scroll wheel), keeping the point under the cursor fixed
        if self.state.profile().has_view_transform() && response.hovered() {
            let scroll = ctx.input(|i| i.smooth_scroll_delta.y);
            if scroll != 0.0 {
                // Consumed here so the surrounding scroll area does not move too.
                ctx.input_mut(|i| i.smooth_scroll_delta.y = 0.0);
                if let Some(cursor) = response.hover_pos() {
                    let zoom = self.state.surface().view.zoom * (1.0 + scroll * SCROLL_ZOOM_RATE);
                    actions.push(
                        Message::ZoomAt {
                            zoom,
                            cursor: local(cursor),
                        }
                        .into(),
                    );
                }
            }
        }

        if self.state.profile() == Profile::Annotator {
            ui.label(format!(
                "Zoom: {:.0}% | Annotations: {}",
                self.state.surface().view.zoom * 100.0,
                self.state.current_annotations().len()
            ));
        }
    }

    fn shortcuts(&self, ctx: &egui::Context, actions: &mut Vec<Action>) {
        if ctx.wants_keyboard_input() {
            return;
        }
        let annotator = self.state.profile() == Profile::Annotator;
        ctx.input(|i| {
            if i.modifiers.command && i.key_pressed(egui::Key::O) {
                actions.push(Action::OpenImages);
            }
            if i.modifiers.command && i.key_pressed(egui::Key::S) {
                actions.push(Action::Export);
            }
            if i.key_pressed(egui::Key::ArrowLeft) {
                actions.push(Message::PrevImage.into());
            }
            if i.key_pressed(egui::Key::ArrowRight) {
                actions.push(Message::NextImage.into());
            }
            if annotator {
                if i.key_pressed(egui::Key::Delete) || i.key_pressed(egui::Key::Backspace) {
                    actions.push(Message::DeleteLast.into());
                }
                if i.key_pressed(egui::Key::B) {
                    actions.push(Message::SelectTool(Tool::Box).into());
                }
                if i.key_pressed(egui::Key::C) {
                    actions.push(Message::SelectTool(Tool::Circle).into());
                }
                if i.key_pressed(egui::Key::Space) {
                    actions.push(Message::SelectTool(Tool::Pan).into());
                }
            }
        });
    }
}

/// Pointer position during a drag, in canvas coordinates, or a leave once it
/// is outside the visible part of the canvas.
fn drag_message(pos: egui::Pos2, visible: egui::Rect, origin: egui::Vec2) -> Message {
    if visible.contains(pos) {
        Message::PointerMove(pos - origin)
    } else {
        Message::PointerLeave
    }
}

fn paint_scene(
    painter: &egui::Painter,
    scene: &Scene,
    origin: egui::Vec2,
    textures: &HashMap<ImageId, egui::TextureHandle>,
) {
    painter.rect_filled(painter.clip_rect(), 0.0, scene.background);

    if let Some(placement) = scene.image {
        if let Some(tex) = textures.get(&placement.image) {
            painter.image(
                tex.id(),
                placement.rect.translate(origin),
                egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                egui::Color32::WHITE,
            );
        }
    }

    for primitive in &scene.primitives {
        match primitive {
            Primitive::Rect { rect, fill, stroke } => {
                let rect = rect.translate(origin);
                painter.rect_filled(rect, 0.0, *fill);
                painter.rect_stroke(rect, 0.0, *stroke, egui::StrokeKind::Middle);
            }
            Primitive::Circle {
                center,
                radius,
                fill,
                stroke,
            } => {
                painter.circle(*center + origin, *radius, *fill, *stroke);
            }
            Primitive::Label {
                pos,
                text,
                color,
                tag,
            } => {
                let galley = painter.layout_no_wrap(
                    text.clone(),
                    egui::FontId::proportional(LABEL_FONT_SIZE),
                    *color,
                );
                let top_left = *pos + origin - egui::vec2(0.0, galley.size().y);
                if let Some(tag) = tag {
                    let bg = egui::Rect::from_min_size(top_left, galley.size())
                        .expand2(egui::vec2(5.0, 2.0));
                    painter.rect_filled(bg, 0.0, *tag);
                }
                painter.galley(top_left, galley, *color);
            }
        }
    }
}

// ── eframe App impl ────────────────────────────────────────────────────────

impl eframe::App for LabelerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.sync_textures(ctx);
        let mut actions = Vec::new();

        self.shortcuts(ctx, &mut actions);

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            self.toolbar(ui, &mut actions);
        });

        egui::TopBottomPanel::bottom("status").show(ctx, |ui| match &self.status {
            Some(status) if status.warning => {
                ui.colored_label(WARNING_COLOR, &status.text);
            }
            Some(status) => {
                ui.label(&status.text);
            }
            None => {
                ui.weak(self.state.profile().title());
            }
        });

        if !self.state.images().is_empty() {
            egui::TopBottomPanel::bottom("images")
                .resizable(false)
                .show(ctx, |ui| {
                    self.thumbnails(ui, &mut actions);
                });
        }

        egui::SidePanel::right("labels")
            .default_width(240.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    self.label_panel(ui, &mut actions);
                    self.image_panel(ui, &mut actions);
                });
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::both().show(ui, |ui| {
                self.canvas(ui, &mut actions);
            });
        });

        if !actions.is_empty() {
            self.apply(actions);
            ctx.request_repaint();
        }
    }
}
