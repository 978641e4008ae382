//! Positioned-token extraction backend using pdftotext (poppler-utils).
//!
//! Word-level tokens come from `pdftotext -bbox-layout`, which runs
//! poppler's layout analysis. Some statements embed fonts that defeat
//! word segmentation and yield pages with no words at all; for those
//! pages `char_tokens` re-reads the same byte buffer with `pdftotext
//! -bbox` (raw reading order) and splits each box into evenly spaced
//! per-character tokens.

use std::io::Write;
use std::process::Command;

use crate::error::FaturaError;
use crate::extraction::{PageTokens, Token, TokenExtractor};

pub struct PdftotextExtractor;

impl PdftotextExtractor {
    pub fn new() -> Self {
        PdftotextExtractor
    }

    /// Check if pdftotext is available on the system.
    pub fn is_available() -> bool {
        Command::new("pdftotext")
            .arg("-v")
            .output()
            .map(|o| o.status.success() || !o.stderr.is_empty())
            .unwrap_or(false)
    }
}

impl Default for PdftotextExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenExtractor for PdftotextExtractor {
    fn word_tokens(&self, pdf_bytes: &[u8]) -> Result<Vec<PageTokens>, FaturaError> {
        let xml = run_pdftotext(pdf_bytes, "-bbox-layout")?;
        Ok(parse_bbox_pages(&xml))
    }

    fn char_tokens(
        &self,
        pdf_bytes: &[u8],
        page_index: usize,
    ) -> Result<Vec<Token>, FaturaError> {
        let xml = run_pdftotext(pdf_bytes, "-bbox")?;
        let pages = parse_bbox_pages(&xml);
        let words = pages
            .into_iter()
            .find(|p| p.page_index == page_index)
            .map(|p| p.tokens)
            .unwrap_or_default();

        Ok(words.iter().flat_map(explode_into_chars).collect())
    }

    fn backend_name(&self) -> &str {
        "pdftotext"
    }
}

/// Write the in-memory byte snapshot to a temp file and run pdftotext
/// with the given bbox mode, returning the XML on stdout.
fn run_pdftotext(pdf_bytes: &[u8], mode: &str) -> Result<String, FaturaError> {
    if !pdf_bytes.starts_with(b"%PDF") {
        return Err(FaturaError::NotAPdf);
    }

    let mut tmpfile =
        tempfile::NamedTempFile::new().map_err(|e| FaturaError::Extraction(e.to_string()))?;
    tmpfile
        .write_all(pdf_bytes)
        .map_err(|e| FaturaError::Extraction(e.to_string()))?;

    let output = Command::new("pdftotext")
        .arg(mode)
        .arg(tmpfile.path())
        .arg("-") // output to stdout
        .output()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                FaturaError::PdftotextNotFound
            } else {
                FaturaError::Extraction(format!("pdftotext failed: {}", e))
            }
        })?;

    if !output.status.success() {
        let code = output.status.code().unwrap_or(-1);
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        return Err(FaturaError::PdftotextFailed { code, stderr });
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// Parse pdftotext bbox XML into per-page token lists.
///
/// Pages are numbered by document order of `<page>` elements, so pages
/// without any words still appear, with an empty token list.
fn parse_bbox_pages(xml: &str) -> Vec<PageTokens> {
    let mut pages: Vec<PageTokens> = Vec::new();

    for raw in xml.lines() {
        let line = raw.trim();

        if line.starts_with("<page") {
            pages.push(PageTokens {
                page_index: pages.len(),
                tokens: Vec::new(),
            });
            continue;
        }

        if line.starts_with("<word ") {
            let token = (|| {
                let text = decode_xml_entities(parse_word_text(line)?);
                if text.trim().is_empty() {
                    return None;
                }
                Some(Token {
                    text,
                    x_min: parse_attr_f32(line, "xMin")?,
                    x_max: parse_attr_f32(line, "xMax")?,
                    y: parse_attr_f32(line, "yMin")?,
                })
            })();

            if let (Some(token), Some(page)) = (token, pages.last_mut()) {
                page.tokens.push(token);
            }
        }
    }

    pages
}

/// Split a word box into per-character tokens, dividing its horizontal
/// span evenly. Approximate, but keeps characters of one word within the
/// line-assembly word gap and characters of adjacent words outside it.
fn explode_into_chars(word: &Token) -> Vec<Token> {
    let chars: Vec<char> = word.text.chars().collect();
    if chars.is_empty() {
        return Vec::new();
    }
    let step = (word.x_max - word.x_min) / chars.len() as f32;

    chars
        .iter()
        .enumerate()
        .map(|(i, c)| Token {
            text: c.to_string(),
            x_min: word.x_min + i as f32 * step,
            x_max: word.x_min + (i + 1) as f32 * step,
            y: word.y,
        })
        .collect()
}

fn parse_attr_f32(tag: &str, name: &str) -> Option<f32> {
    parse_attr(tag, name)?.parse().ok()
}

fn parse_attr<'a>(tag: &'a str, name: &str) -> Option<&'a str> {
    let needle = format!("{}=\"", name);
    let start = tag.find(&needle)? + needle.len();
    let rest = &tag[start..];
    let end = rest.find('"')?;
    Some(&rest[..end])
}

fn parse_word_text(word_tag: &str) -> Option<&str> {
    let start = word_tag.find('>')? + 1;
    let end = word_tag.rfind("</word>")?;
    Some(&word_tag[start..end])
}

fn decode_xml_entities(s: &str) -> String {
    s.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
}
