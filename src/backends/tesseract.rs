use std::io::Cursor;

use anyhow::{Context, anyhow};
use image::{GrayImage, ImageFormat};
use leptess::LepTess;

use crate::Result;
use crate::backend::{OcrBackend, OcrPage};
use crate::token::{OcrToken, parse_tsv_tokens};

/// Language used when the caller does not pick one.
pub const DEFAULT_LANGUAGE: &str = "eng";

/// Built-in backend powered by `leptess` / Tesseract.
pub struct TesseractBackend {
    engine: LepTess,
    language: String,
}

impl TesseractBackend {
    /// Initialize Tesseract for `language`.
    ///
    /// `data_path` points at a `tessdata` directory; `None` uses Tesseract's default lookup
    /// (`TESSDATA_PREFIX` or the compiled-in location).
    pub fn new(data_path: Option<&str>, language: impl Into<String>) -> Result<Self> {
        let language = language.into();
        let engine = LepTess::new(data_path, &language).map_err(|err| {
            anyhow!("failed to initialize Tesseract for language '{language}': {err}")
        })?;

        Ok(Self { engine, language })
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// Hand `image` to the engine. Recognition runs lazily on the first result query.
    fn load(&mut self, image: &GrayImage) -> anyhow::Result<()> {
        // leptess reads encoded images, not raw buffers.
        let mut png = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .context("failed to encode image as PNG")?;

        self.engine
            .set_image_from_mem(&png)
            .map_err(|err| anyhow!("failed to load image into Tesseract: {err}"))?;
        Ok(())
    }

    fn text(&mut self) -> anyhow::Result<String> {
        self.engine
            .get_utf8_text()
            .context("failed to read recognized text")
    }

    fn tokens(&mut self) -> anyhow::Result<Vec<OcrToken>> {
        let tsv = self
            .engine
            .get_tsv_text(0)
            .context("failed to read recognized word table")?;
        Ok(parse_tsv_tokens(&tsv))
    }
}

impl OcrBackend for TesseractBackend {
    fn recognize_text(&mut self, image: &GrayImage) -> Result<String> {
        self.load(image)?;
        Ok(self.text()?)
    }

    fn recognize_tokens(&mut self, image: &GrayImage) -> Result<Vec<OcrToken>> {
        self.load(image)?;
        Ok(self.tokens()?)
    }

    /// Single recognition pass: both results come from the same loaded image.
    fn recognize(&mut self, image: &GrayImage) -> Result<OcrPage> {
        self.load(image)?;
        let text = self.text()?;
        let tokens = self.tokens()?;
        Ok(OcrPage { text, tokens })
    }
}
