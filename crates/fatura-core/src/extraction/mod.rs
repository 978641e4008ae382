pub mod layout;
pub mod pdftotext;

use crate::error::FaturaError;

/// A positioned text fragment from one page. Coordinates are PDF points,
/// origin top-left, `y` increasing downwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub text: String,
    pub x_min: f32,
    pub x_max: f32,
    pub y: f32,
}

/// All tokens of a single page. Pages that yielded no tokens are still
/// represented, with an empty token list.
#[derive(Debug, Clone)]
pub struct PageTokens {
    pub page_index: usize,
    pub tokens: Vec<Token>,
}

/// Which printed column of the two-column statement layout a line
/// belongs to. Single-column pages use `Left`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Left,
    Right,
}

/// One printed line in reading order, assembled from positioned tokens.
#[derive(Debug, Clone)]
pub struct RawLine {
    pub page_index: usize,
    pub column: Column,
    /// Top-to-bottom position within its column.
    pub vertical_order: usize,
    pub text: String,
    pub tokens: Vec<Token>,
}

/// Trait for positioned-text extraction backends.
///
/// Both methods take the full byte buffer: the fallback must be able to
/// re-read the same immutable snapshot, never a consumed stream cursor.
pub trait TokenExtractor: Send + Sync {
    /// Word-level tokens for every page of the document.
    fn word_tokens(&self, pdf_bytes: &[u8]) -> Result<Vec<PageTokens>, FaturaError>;

    /// Character-level tokens for one page. Used when that page yielded
    /// no word-level tokens (e.g. embedded fonts that defeat word
    /// segmentation).
    fn char_tokens(&self, pdf_bytes: &[u8], page_index: usize)
        -> Result<Vec<Token>, FaturaError>;

    /// Name of this extraction backend (for diagnostics).
    fn backend_name(&self) -> &str;
}

/// Extract the full ordered `RawLine` sequence for a document.
///
/// Word-level tokens are preferred; a page with no words falls back to
/// character-level tokens from the same buffer. A page empty under both
/// granularities contributes zero lines and is not an error.
pub fn extract_raw_lines(
    pdf_bytes: &[u8],
    extractor: &dyn TokenExtractor,
) -> Result<Vec<RawLine>, FaturaError> {
    let pages = extractor.word_tokens(pdf_bytes)?;

    let mut lines = Vec::new();
    for page in &pages {
        if page.tokens.is_empty() {
            let chars = extractor.char_tokens(pdf_bytes, page.page_index)?;
            if chars.is_empty() {
                tracing::debug!(page = page.page_index, "page yielded no tokens");
                continue;
            }
            tracing::debug!(
                page = page.page_index,
                backend = extractor.backend_name(),
                "no word tokens, using character-level fallback"
            );
            lines.extend(layout::lines_from_tokens(page.page_index, &chars));
        } else {
            lines.extend(layout::lines_from_tokens(page.page_index, &page.tokens));
        }
    }

    Ok(lines)
}
