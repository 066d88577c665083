//! Image annotation tool: draw boxes and circles over images, tag them with
//! labels and export the result as JSON.
//!
//! The annotation logic lives in plain modules ([`state`], [`drawing`],
//! [`render`], [`export`]) that never touch a window; [`app`] is the eframe
//! shell on top of them.

pub mod app;
pub mod config;
pub mod drawing;
pub mod export;
pub mod geometry;
pub mod labels;
pub mod loader;
pub mod model;
pub mod render;
pub mod state;

pub use app::LabelerApp;
pub use config::AppConfig;
pub use state::{AppState, Message, Mode, Profile};
