use std::io::Cursor;

use image::{ImageFormat, RgbaImage};
use serde_json::{json, Value};

use image_labeler::drawing::Tool;
use image_labeler::export::{export_json, write_export};
use image_labeler::loader::load_bytes;
use image_labeler::model::ShapeKind;
use image_labeler::{AppState, Message, Mode, Profile};

fn png(w: u32, h: u32) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    RgbaImage::new(w, h)
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

fn drag(state: &mut AppState, from: (f32, f32), to: (f32, f32)) {
    state
        .update(Message::PointerDown(egui::pos2(from.0, from.1)))
        .unwrap();
    state
        .update(Message::PointerMove(egui::pos2(to.0, to.1)))
        .unwrap();
    state.update(Message::PointerUp).unwrap();
}

#[test]
fn upload_label_draw_export() {
    let mut state = AppState::with_labels(Profile::Annotator, Vec::<String>::new());
    let img = load_bytes("street.png", &png(100, 100)).unwrap();
    state.update(Message::ImagesLoaded(vec![img])).unwrap();
    state.update(Message::AddLabel("car".into())).unwrap();
    state.update(Message::SelectLabel("car".into())).unwrap();
    drag(&mut state, (10.0, 10.0), (50.0, 40.0));

    let anns = state.current_annotations();
    assert_eq!(anns.len(), 1);
    assert_eq!(anns[0].kind, ShapeKind::Box);
    assert_eq!(
        (anns[0].x, anns[0].y, anns[0].width, anns[0].height),
        (10.0, 10.0, 40.0, 30.0)
    );

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(Profile::Annotator.export_file_name());
    let report = write_export(&state, &path).unwrap();
    assert!(!report.has_warnings());

    let doc: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(
        doc,
        json!({
            "street.png": [
                {"x": 10.0, "y": 10.0, "width": 40.0, "height": 30.0, "type": "box", "label": "car"}
            ]
        })
    );
}

#[test]
fn every_large_drag_is_kept_in_draw_order() {
    let mut state = AppState::new(Profile::Annotator);
    state
        .update(Message::ImagesLoaded(vec![load_bytes("a.png", &png(10, 10)).unwrap()]))
        .unwrap();
    state.update(Message::SelectLabel("object".into())).unwrap();

    let drags = [
        ((0.0, 0.0), (6.0, 6.0)),
        ((100.0, 100.0), (20.0, 50.0)),
        ((300.0, 10.0), (310.0, 400.0)),
        ((5.0, 500.0), (50.0, 450.0)),
    ];
    for (i, (from, to)) in drags.iter().enumerate() {
        if i % 2 == 1 {
            state.update(Message::SelectTool(Tool::Circle)).unwrap();
        } else {
            state.update(Message::SelectTool(Tool::Box)).unwrap();
        }
        drag(&mut state, *from, *to);
    }

    let anns = state.current_annotations();
    assert_eq!(anns.len(), drags.len());
    for (ann, (from, to)) in anns.iter().zip(drags) {
        assert_eq!(ann.x, from.0.min(to.0));
        assert_eq!(ann.y, from.1.min(to.1));
        assert_eq!(ann.width, (to.0 - from.0).abs());
        assert_eq!(ann.height, (to.1 - from.1).abs());
    }
}

#[test]
fn panned_and_zoomed_drag_lands_in_image_space() {
    let mut state = AppState::new(Profile::Annotator);
    state
        .update(Message::ImagesLoaded(vec![load_bytes("a.png", &png(10, 10)).unwrap()]))
        .unwrap();
    state.update(Message::SelectLabel("person".into())).unwrap();

    state.update(Message::SelectTool(Tool::Pan)).unwrap();
    drag(&mut state, (0.0, 0.0), (40.0, 20.0));
    assert!(state.current_annotations().is_empty());
    state.update(Message::ZoomBy(1.0)).unwrap();

    state.update(Message::SelectTool(Tool::Box)).unwrap();
    drag(&mut state, (60.0, 40.0), (140.0, 100.0));
    let ann = &state.current_annotations()[0];
    assert_eq!((ann.x, ann.y, ann.width, ann.height), (10.0, 10.0, 40.0, 30.0));
}

#[test]
fn labeler_session_exports_list() {
    let mut state = AppState::new(Profile::Labeler);
    state
        .update(Message::ImagesLoaded(vec![
            load_bytes("first.png", &png(64, 64)).unwrap(),
            load_bytes("second.png", &png(64, 64)).unwrap(),
        ]))
        .unwrap();
    state.update(Message::AddLabel(" bird ".into())).unwrap();
    state.update(Message::AddLabel("bird".into())).unwrap();
    assert_eq!(state.labels().len(), 1);

    state.update(Message::NextImage).unwrap();
    state
        .update(Message::ToggleClassification("bird".into()))
        .unwrap();
    state.update(Message::SetMode(Mode::Detection)).unwrap();

    let err = state
        .update(Message::PointerDown(egui::pos2(1.0, 1.0)))
        .unwrap_err();
    assert_eq!(err.to_string(), "select a label before drawing");

    state.update(Message::SelectLabel("bird".into())).unwrap();
    drag(&mut state, (40.0, 40.0), (2.0, 8.0));

    let (json, report) = export_json(&state).unwrap();
    let doc: Value = serde_json::from_str(&json).unwrap();
    assert_eq!(
        doc,
        json!([
            {"filename": "first.png", "labels": [], "boxes": []},
            {
                "filename": "second.png",
                "labels": ["bird"],
                "boxes": [{"x": 2.0, "y": 8.0, "width": 38.0, "height": 32.0, "label": "bird"}]
            }
        ])
    );
    assert_eq!(report.annotations_exported, 1);
}
