//! JSON export of the annotation state.
//!
//! Two document shapes are produced, one per profile:
//!
//! - annotator: `{ "<filename>": [ {x, y, width, height, type, label}, ... ] }`
//! - labeler: `[ {filename, labels: [..], boxes: [ {x, y, width, height, label} ] } ]`
//!
//! Export never fails on content. Problems such as labels that were removed
//! from the registry while annotations still use them are collected in the
//! returned [`ExportReport`].

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::path::Path;

use serde::Serialize;
use thiserror::Error;

use crate::labels::LabelRegistry;
use crate::model::{Annotation, ShapeKind};
use crate::state::{AppState, Profile};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExportWarning {
    /// An annotation or image label refers to a label no longer registered.
    DanglingLabel { image: String, label: String },
    /// Another image already used this filename as its key.
    RenamedDuplicate { image: String, key: String },
    /// The document shape cannot express this annotation.
    SkippedShape { image: String, kind: ShapeKind },
}

impl fmt::Display for ExportWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportWarning::DanglingLabel { image, label } => {
                write!(f, "{image}: label '{label}' is no longer defined")
            }
            ExportWarning::RenamedDuplicate { image, key } => {
                write!(f, "{image}: duplicate filename exported as '{key}'")
            }
            ExportWarning::SkippedShape { image, kind } => {
                write!(f, "{image}: {} annotation skipped", kind.name())
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct ExportReport {
    pub images_exported: usize,
    pub annotations_exported: usize,
    pub warnings: Vec<ExportWarning>,
}

impl ExportReport {
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    fn check_label(&mut self, labels: &LabelRegistry, image: &str, label: &str) {
        if labels.contains(label) {
            return;
        }
        let warning = ExportWarning::DanglingLabel {
            image: image.to_owned(),
            label: label.to_owned(),
        };
        if !self.warnings.contains(&warning) {
            self.warnings.push(warning);
        }
    }
}

// ── Document records ────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ShapeRecord<'a> {
    x: f32,
    y: f32,
    width: f32,
    height: f32,
    #[serde(rename = "type")]
    kind: ShapeKind,
    label: &'a str,
}

impl<'a> From<&'a Annotation> for ShapeRecord<'a> {
    fn from(a: &'a Annotation) -> Self {
        Self {
            x: a.x,
            y: a.y,
            width: a.width,
            height: a.height,
            kind: a.kind,
            label: &a.label,
        }
    }
}

#[derive(Serialize)]
struct BoxRecord<'a> {
    x: f32,
    y: f32,
    width: f32,
    height: f32,
    label: &'a str,
}

#[derive(Serialize)]
struct ImageRecord<'a> {
    filename: &'a str,
    labels: &'a [String],
    boxes: Vec<BoxRecord<'a>>,
}

// ── Export ──────────────────────────────────────────────────────────────────

fn annotator_document<'a>(
    state: &'a AppState,
    report: &mut ExportReport,
) -> BTreeMap<String, Vec<ShapeRecord<'a>>> {
    let exported: Vec<_> = state
        .images()
        .iter()
        .filter(|img| !img.annotations.is_empty())
        .collect();
    // Real filenames win over generated keys, so `a.png#2` on disk keeps its name.
    let names: HashSet<&str> = exported.iter().map(|img| img.name.as_str()).collect();
    let mut doc: BTreeMap<String, Vec<ShapeRecord<'a>>> = BTreeMap::new();
    let mut next_suffix: HashMap<&str, usize> = HashMap::new();
    for img in exported.iter().copied() {
        let key = if !doc.contains_key(&img.name) {
            img.name.clone()
        } else {
            let n = next_suffix.entry(img.name.as_str()).or_insert(2);
            let key = loop {
                let candidate = format!("{}#{}", img.name, n);
                *n += 1;
                if !names.contains(candidate.as_str()) && !doc.contains_key(&candidate) {
                    break candidate;
                }
            };
            report.warnings.push(ExportWarning::RenamedDuplicate {
                image: img.name.clone(),
                key: key.clone(),
            });
            key
        };
        for ann in &img.annotations {
            report.check_label(state.labels(), &img.name, &ann.label);
        }
        report.images_exported += 1;
        report.annotations_exported += img.annotations.len();
        doc.insert(key, img.annotations.iter().map(ShapeRecord::from).collect());
    }
    doc
}

fn labeler_document<'a>(state: &'a AppState, report: &mut ExportReport) -> Vec<ImageRecord<'a>> {
    let mut doc = Vec::with_capacity(state.images().len());
    for img in state.images().iter() {
        for label in &img.labels {
            report.check_label(state.labels(), &img.name, label);
        }
        let mut boxes = Vec::with_capacity(img.annotations.len());
        for ann in &img.annotations {
            if ann.kind != ShapeKind::Box {
                report.warnings.push(ExportWarning::SkippedShape {
                    image: img.name.clone(),
                    kind: ann.kind,
                });
                continue;
            }
            report.check_label(state.labels(), &img.name, &ann.label);
            boxes.push(BoxRecord {
                x: ann.x,
                y: ann.y,
                width: ann.width,
                height: ann.height,
                label: &ann.label,
            });
        }
        report.images_exported += 1;
        report.annotations_exported += boxes.len();
        doc.push(ImageRecord {
            filename: &img.name,
            labels: &img.labels,
            boxes,
        });
    }
    doc
}

/// Serialize the state into the profile's JSON document.
pub fn export_json(state: &AppState) -> Result<(String, ExportReport), ExportError> {
    let mut report = ExportReport::default();
    let json = match state.profile() {
        Profile::Annotator => serde_json::to_string_pretty(&annotator_document(state, &mut report))?,
        Profile::Labeler => serde_json::to_string_pretty(&labeler_document(state, &mut report))?,
    };
    Ok((json, report))
}

pub fn write_export(state: &AppState, path: &Path) -> Result<ExportReport, ExportError> {
    log::info!("Exporting {} data to {:?}", state.profile().name(), path);
    let (json, report) = export_json(state)?;
    std::fs::write(path, json)?;
    log::info!(
        "Exported {} images with {} annotations",
        report.images_exported,
        report.annotations_exported
    );
    for warning in &report.warnings {
        log::warn!("{}", warning);
    }
    Ok(report)
}
