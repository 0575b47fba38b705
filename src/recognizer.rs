use image::GrayImage;

use crate::Result;
use crate::backend::OcrBackend;
use crate::token::OcrToken;

/// Result of recognizing one image.
///
/// `confidence` is a run-time diagnostic only; transcripts persist `text` alone.
#[derive(Debug, Clone, PartialEq)]
pub struct Recognition {
    pub text: String,
    /// Mean token confidence in `[0, 100]`, rounded to two decimals.
    pub confidence: f64,
}

/// Wraps an [`OcrBackend`] and scores its output.
pub struct Recognizer<B: OcrBackend> {
    backend: B,
}

impl<B: OcrBackend> Recognizer<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn run(&mut self, image: &GrayImage) -> Result<Recognition> {
        let page = self.backend.recognize(image)?;
        Ok(Recognition {
            confidence: mean_confidence(&page.tokens),
            text: page.text,
        })
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

/// Arithmetic mean of the scores of tokens with non-blank text and a non-negative score.
///
/// Zero is a valid score. Returns `0.0` when no token qualifies.
pub fn mean_confidence(tokens: &[OcrToken]) -> f64 {
    let (sum, count) = tokens
        .iter()
        .filter(|t| !t.text.trim().is_empty() && t.confidence >= 0.0)
        .fold((0.0f64, 0usize), |(sum, count), t| {
            (sum + t.confidence as f64, count + 1)
        });

    if count == 0 {
        return 0.0;
    }
    round2(sum / count as f64)
}

/// Two decimal places; exact halves go to the even neighbour.
fn round2(v: f64) -> f64 {
    (v * 100.0).round_ties_even() / 100.0
}
