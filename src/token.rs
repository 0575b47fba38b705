use serde::Serialize;

/// A single recognized token produced by an OCR backend.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct OcrToken {
    /// Token text (may be empty for layout rows).
    pub text: String,
    /// Engine confidence in `[0, 100]`, or negative when unavailable.
    pub confidence: f32,
}

impl OcrToken {
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            confidence,
        }
    }
}

// level page_num block_num par_num line_num word_num left top width height conf text
const TSV_CONF_COLUMN: usize = 10;
const TSV_COLUMNS: usize = 12;

/// Parse Tesseract's TSV word table into tokens, one per row.
///
/// Rows above word level carry a confidence of `-1` and no text; they are kept so callers
/// see the same rows the engine produced. Header and malformed rows are ignored.
pub fn parse_tsv_tokens(tsv: &str) -> Vec<OcrToken> {
    tsv.lines()
        .filter_map(|line| {
            let fields: Vec<&str> = line.splitn(TSV_COLUMNS, '\t').collect();
            if fields.len() <= TSV_CONF_COLUMN {
                return None;
            }
            let confidence = fields[TSV_CONF_COLUMN].trim().parse::<f32>().ok()?;
            let text = fields.get(TSV_CONF_COLUMN + 1).copied().unwrap_or("");
            Some(OcrToken::new(text, confidence))
        })
        .collect()
}
