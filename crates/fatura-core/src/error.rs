use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum FaturaError {
    #[error("PDF extraction failed: {0}")]
    Extraction(String),

    #[error("pdftotext not found. Install poppler: brew install poppler (macOS) or apt install poppler-utils (Linux)")]
    PdftotextNotFound,

    #[error("pdftotext failed with exit code {code}: {stderr}")]
    PdftotextFailed { code: i32, stderr: String },

    #[error("input is not a PDF document (missing %PDF header)")]
    NotAPdf,

    #[error("failed to parse statement: {0}")]
    ParseError(String),

    #[error("failed to load section config from {path}: {reason}")]
    SectionConfigLoad { path: PathBuf, reason: String },

    #[error("invalid section config: {0}")]
    SectionConfigInvalid(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
