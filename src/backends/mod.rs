/// Tesseract OCR backend (via `leptess`).
#[cfg(feature = "tesseract")]
pub mod tesseract;
