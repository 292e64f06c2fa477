use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageReader};
use tracing::warn;
use walkdir::WalkDir;

/// Decodes a picked image file.
///
/// A file that is missing, unreadable or not a decodable image is a normal
/// outcome when the user picks something, so this yields `None` instead of
/// an error.
pub fn load_image(path: &Path) -> Option<DynamicImage> {
    let reader = match ImageReader::open(path) {
        Ok(reader) => reader,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to open image");
            return None;
        }
    };
    let reader = match reader.with_guessed_format() {
        Ok(reader) => reader,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read image header");
            return None;
        }
    };
    match reader.decode() {
        Ok(image) => Some(image),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to decode image");
            None
        }
    }
}

pub fn is_supported_image_format(path: &Path) -> bool {
    if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
        matches!(
            extension.to_lowercase().as_str(),
            "jpg" | "jpeg" | "png" | "webp" | "bmp" | "gif" | "tiff"
        )
    } else {
        false
    }
}

/// Every supported image under `dir`, in a stable order.
pub fn collect_image_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_supported_image_format(e.path()))
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files
}
