use image::GrayImage;

use crate::Result;
use crate::token::OcrToken;

/// Everything an OCR pass reports for one bitmap.
#[derive(Debug, Clone, PartialEq)]
pub struct OcrPage {
    /// Full recognized text, layout newlines included.
    pub text: String,
    /// Per-token output used for confidence scoring.
    pub tokens: Vec<OcrToken>,
}

/// Pluggable OCR engine used by [`crate::recognizer::Recognizer`].
///
/// Backends receive the already enhanced single-channel bitmap. They take `&mut self`
/// because engine handles (Tesseract's included) keep per-image state.
pub trait OcrBackend {
    /// Recognize the full text of `image`.
    fn recognize_text(&mut self, image: &GrayImage) -> Result<String>;

    /// Recognize per-token text and confidence for `image`.
    fn recognize_tokens(&mut self, image: &GrayImage) -> Result<Vec<OcrToken>>;

    /// Run both recognitions for one image.
    ///
    /// The default makes two engine calls; backends that can report text and tokens from a
    /// single pass should override it.
    fn recognize(&mut self, image: &GrayImage) -> Result<OcrPage> {
        let text = self.recognize_text(image)?;
        let tokens = self.recognize_tokens(image)?;
        Ok(OcrPage { text, tokens })
    }
}

impl<B: OcrBackend + ?Sized> OcrBackend for Box<B> {
    fn recognize_text(&mut self, image: &GrayImage) -> Result<String> {
        (**self).recognize_text(image)
    }

    fn recognize_tokens(&mut self, image: &GrayImage) -> Result<Vec<OcrToken>> {
        (**self).recognize_tokens(image)
    }

    fn recognize(&mut self, image: &GrayImage) -> Result<OcrPage> {
        (**self).recognize(image)
    }
}
