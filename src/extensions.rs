//! Recognized image file names and the stem key shared by staged images and transcripts.

use std::path::Path;

/// Image extensions we transcribe, in the priority order used when joining a transcript back
/// to its staged image.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "bmp", "tiff"];

/// Whether `name` ends in one of [`IMAGE_EXTENSIONS`] (case-insensitive).
pub fn is_image_name(name: &str) -> bool {
    extension_priority(name).is_some()
}

/// Position of `name`'s extension in [`IMAGE_EXTENSIONS`], or `None` when it isn't an image.
///
/// Lower is preferred.
pub fn extension_priority(name: &str) -> Option<usize> {
    let (_, ext) = name.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    IMAGE_EXTENSIONS.iter().position(|known| *known == ext)
}

/// Whether `name` can be stored as a single flat file inside a directory.
pub fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}

/// File name without its extension.
///
/// `scan.2024.png` → `scan.2024`. Names without a usable stem are returned unchanged.
pub fn stem_of(name: &str) -> &str {
    Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name)
}
