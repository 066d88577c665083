//! Reading picked files into decoded RGBA images.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{ImageReader, RgbaImage};
use thiserror::Error;

/// A decoded image ready to be added to the store.
pub struct LoadedImage {
    pub name: String,
    pub pixels: RgbaImage,
}

impl std::fmt::Debug for LoadedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedImage")
            .field("name", &self.name)
            .field("size", &self.pixels.dimensions())
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{name} is not a recognised image")]
    NotAnImage { name: String },

    #[error("failed to decode {name}: {source}")]
    Decode {
        name: String,
        source: image::ImageError,
    },
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_owned)
        .unwrap_or_else(|| path.display().to_string())
}

/// Load a single file. The format is sniffed from the content, so a text
/// file renamed to `.png` is still rejected.
pub fn load_path(path: &Path) -> Result<LoadedImage, LoadError> {
    let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_bytes(display_name(path), &bytes)
}

pub fn load_bytes(name: impl Into<String>, bytes: &[u8]) -> Result<LoadedImage, LoadError> {
    let name = name.into();
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|source| LoadError::Io {
            path: PathBuf::from(&name),
            source,
        })?;
    if reader.format().is_none() {
        return Err(LoadError::NotAnImage { name });
    }
    let decoded = reader
        .decode()
        .map_err(|source| LoadError::Decode {
            name: name.clone(),
            source,
        })?;
    Ok(LoadedImage {
        name,
        pixels: decoded.to_rgba8(),
    })
}

/// Load a batch of files in the order they were picked. Files that cannot
/// be read or decoded are skipped and returned alongside the good ones.
pub fn load_paths<P: AsRef<Path>>(paths: &[P]) -> (Vec<LoadedImage>, Vec<LoadError>) {
    let mut images = Vec::with_capacity(paths.len());
    let mut errors = Vec::new();
    for path in paths {
        match load_path(path.as_ref()) {
            Ok(img) => {
                log::debug!(
                    "Loaded {} ({}x{})",
                    img.name,
                    img.pixels.width(),
                    img.pixels.height()
                );
                images.push(img);
            }
            Err(e) => {
                log::warn!("Skipping file: {}", e);
                errors.push(e);
            }
        }
    }
    (images, errors)
}
