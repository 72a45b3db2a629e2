//! Image source: turns a directory of files into a catalog

use crate::catalog::{Catalog, ImageHandle};
use crate::AppError;
use image::{GenericImageView, ImageReader};
use rayon::prelude::*;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use xxhash_rust::xxh3::xxh3_64;

/// Options for loading a directory
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Sort files by name instead of keeping directory enumeration order
    pub sort_by_name: bool,
    /// Downscale decoded pixels so the long edge fits this size
    pub max_dimension: Option<u32>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            sort_by_name: true,
            max_dimension: Some(4096),
        }
    }
}

/// A file that was left out of the catalog, and why
#[derive(Debug)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub error: AppError,
}

/// Outcome of loading a directory
#[derive(Debug)]
pub struct LoadReport {
    pub catalog: Catalog,
    pub skipped: Vec<SkippedFile>,
}

/// Decoded file, ready to be appended to a catalog
struct DecodedFile {
    handle: ImageHandle,
    width: u32,
    height: u32,
    caption: String,
    hash: u64,
}

/// Load every supported image in `dir` into a new catalog.
///
/// Unsupported and undecodable files are skipped with a warning. Fails with
/// `InputNotFound` for a missing directory and `EmptyCatalog` when nothing
/// could be loaded.
pub fn load_directory(dir: &Path, options: &LoadOptions) -> Result<LoadReport, AppError> {
    if !dir.is_dir() {
        return Err(AppError::InputNotFound(dir.display().to_string()));
    }

    let entries = std::fs::read_dir(dir)
        .map_err(|e| AppError::InputNotFound(format!("{}: {}", dir.display(), e)))?;

    let mut candidates = Vec::new();
    let mut skipped = Vec::new();

    for entry in entries {
        let path = match entry {
            Ok(entry) => entry.path(),
            Err(e) => {
                tracing::warn!("Cannot read entry in {:?}: {}", dir, e);
                continue;
            }
        };
        if path.is_dir() {
            continue;
        }

        if is_supported_image(&path) {
            candidates.push(path);
        } else {
            tracing::warn!("Skipping unsupported file: {:?}", path);
            let ext = path
                .extension()
                .map(|e| e.to_string_lossy().to_string())
                .unwrap_or_default();
            skipped.push(SkippedFile {
                path,
                error: AppError::UnsupportedFormat(ext),
            });
        }
    }

    if options.sort_by_name {
        candidates.sort_by_key(|p| p.file_name().map(|n| n.to_string_lossy().to_lowercase()));
    }

    // Decoding is the expensive part; results come back in input order.
    let decoded: Vec<_> = candidates
        .par_iter()
        .map(|path| decode_file(path, options.max_dimension))
        .collect();

    let mut catalog = Catalog::new();
    for (path, result) in candidates.into_iter().zip(decoded) {
        match result {
            Ok(file) => {
                tracing::debug!("Loaded {:?} ({}x{})", path, file.width, file.height);
                catalog.push(file.handle, file.width, file.height, file.caption, file.hash);
            }
            Err(error) => {
                tracing::warn!("{}", error);
                skipped.push(SkippedFile { path, error });
            }
        }
    }

    if catalog.is_empty() {
        return Err(AppError::EmptyCatalog);
    }

    tracing::info!(
        "{} images loaded from {:?} ({} skipped)",
        catalog.len(),
        dir,
        skipped.len()
    );
    Ok(LoadReport { catalog, skipped })
}

fn decode_file(path: &Path, max_dimension: Option<u32>) -> Result<DecodedFile, AppError> {
    let label = path.display().to_string();

    let data = std::fs::read(path).map_err(|e| AppError::decode(label.as_str(), e))?;
    let hash = xxh3_64(&data);

    let img = ImageReader::new(Cursor::new(&data))
        .with_guessed_format()
        .map_err(|e| AppError::decode(label.as_str(), e))?
        .decode()
        .map_err(|e| AppError::decode(label.as_str(), e))?;

    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return Err(AppError::decode(label, "image has no pixels"));
    }

    let img = match max_dimension {
        Some(max) if width > max || height > max => img.thumbnail(max, max),
        _ => img,
    };

    Ok(DecodedFile {
        handle: ImageHandle::new(img.to_rgba8()),
        width,
        height,
        caption: caption_for(path),
        hash,
    })
}

/// Caption shown for an image: its file name without extension
pub fn caption_for(path: &Path) -> String {
    path.file_stem()
        .or_else(|| path.file_name())
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Check if a file is a supported image format
pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            matches!(
                e.to_lowercase().as_str(),
                "jpg" | "jpeg" | "png" | "gif" | "webp" | "bmp"
            )
        })
        .unwrap_or(false)
}
