//! Pointer interaction on the canvas: shape drags and pan drags.
//!
//! The surface only knows about screen positions relative to the canvas and
//! its own [`ViewTransform`]. Committed shapes are handed back to the caller,
//! which decides which image they belong to.

use egui::{Pos2, Rect, Vec2};
use thiserror::Error;

use crate::geometry::{drag_rect, ViewTransform};
use crate::model::ShapeKind;

// ── Tool / Interaction State ────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tool {
    Box,
    Circle,
    Pan,
}

impl Tool {
    pub fn name(&self) -> &'static str {
        match self {
            Tool::Box => "Box",
            Tool::Circle => "Circle",
            Tool::Pan => "Pan",
        }
    }

    pub fn shape_kind(&self) -> Option<ShapeKind> {
        match self {
            Tool::Box => Some(ShapeKind::Box),
            Tool::Circle => Some(ShapeKind::Circle),
            Tool::Pan => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum DragState {
    None,
    Drawing {
        kind: ShapeKind,
        anchor: Pos2,
        current: Pos2,
        label: String,
    },
    /// `origin` is the pointer position minus the pan at drag start.
    Panning { origin: Vec2 },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DrawError {
    #[error("select a label before drawing")]
    NoLabelSelected,
}

/// A shape released with large enough extents.
#[derive(Clone, Debug, PartialEq)]
pub struct CommittedShape {
    pub kind: ShapeKind,
    pub rect: Rect,
    pub label: String,
}

#[derive(Clone, Debug, PartialEq)]
pub enum PointerOutcome {
    /// Nothing was being tracked.
    Ignored,
    Started,
    Updated,
    Panned,
    Committed(CommittedShape),
    /// The drag was smaller than the minimum extent.
    Discarded,
}

// ── Surface ─────────────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
pub struct DrawingSurface {
    pub tool: Tool,
    pub view: ViewTransform,
    pub drag: DragState,
    /// Both extents must be strictly larger than this to commit.
    pub min_extent: f32,
}

impl DrawingSurface {
    pub fn new(min_extent: f32) -> Self {
        Self {
            tool: Tool::Box,
            view: ViewTransform::default(),
            drag: DragState::None,
            min_extent,
        }
    }

    pub fn is_dragging(&self) -> bool {
        !matches!(self.drag, DragState::None)
    }

    /// Normalized in-progress shape in image space, if a shape drag is live.
    pub fn in_progress(&self) -> Option<(ShapeKind, Rect)> {
        match &self.drag {
            DragState::Drawing {
                kind,
                anchor,
                current,
                ..
            } => Some((*kind, drag_rect(*anchor, *current))),
            _ => None,
        }
    }

    pub fn pointer_down(
        &mut self,
        screen: Pos2,
        label: Option<&str>,
    ) -> Result<PointerOutcome, DrawError> {
        let Some(kind) = self.tool.shape_kind() else {
            self.drag = DragState::Panning {
                origin: screen.to_vec2() - self.view.pan,
            };
            return Ok(PointerOutcome::Started);
        };
        let label = label.ok_or(DrawError::NoLabelSelected)?;
        let anchor = self.view.to_image(screen);
        self.drag = DragState::Drawing {
            kind,
            anchor,
            current: anchor,
            label: label.to_owned(),
        };
        Ok(PointerOutcome::Started)
    }

    pub fn pointer_move(&mut self, screen: Pos2) -> PointerOutcome {
        match &mut self.drag {
            DragState::None => PointerOutcome::Ignored,
            DragState::Panning { origin } => {
                self.view.pan = screen.to_vec2() - *origin;
                PointerOutcome::Panned
            }
            DragState::Drawing { current, .. } => {
                *current = self.view.to_image(screen);
                PointerOutcome::Updated
            }
        }
    }

    pub fn pointer_up(&mut self) -> PointerOutcome {
        match std::mem::replace(&mut self.drag, DragState::None) {
            DragState::None => PointerOutcome::Ignored,
            DragState::Panning { .. } => PointerOutcome::Panned,
            DragState::Drawing {
                kind,
                anchor,
                current,
                label,
            } => {
                let rect = drag_rect(anchor, current);
                if rect.width() > self.min_extent && rect.height() > self.min_extent {
                    PointerOutcome::Committed(CommittedShape { kind, rect, label })
                } else {
                    PointerOutcome::Discarded
                }
            }
        }
    }

    /// Leaving the canvas mid-drag ends the drag exactly like a release.
    pub fn pointer_leave(&mut self) -> PointerOutcome {
        self.pointer_up()
    }

    pub fn cancel(&mut self) {
        self.drag = DragState::None;
    }
}
