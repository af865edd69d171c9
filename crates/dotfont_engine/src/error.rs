//! Unified error types for dotfont_engine

use thiserror::Error;

/// Main error type for dotfont_engine operations
#[derive(Debug, Error)]
pub enum EngineError {
    // === Disallowed operations (policy rejections, state left untouched) ===
    #[error("glyph {code} is already attached to a font")]
    GlyphAlreadyAttached { code: u32 },

    #[error("cannot change the code of a glyph while it is attached to a font")]
    AttachedCodeChange,

    #[error("width {width} rejected by the font's size policy")]
    WidthRejected { width: i32 },

    #[error("height {height} rejected by the font's size policy")]
    HeightRejected { height: i32 },

    // === Invalid arguments (programmer errors, fail fast) ===
    #[error("pixel ({x}, {y}) is outside the {width}x{height} grid")]
    PixelOutOfRange { x: i32, y: i32, width: i32, height: i32 },

    #[error("negative grid size: {width}x{height}")]
    NegativeSize { width: i32, height: i32 },

    #[error("negative {metric}: {value}")]
    NegativeMetric { metric: &'static str, value: i32 },

    #[error("{what} {pos} is outside the {width}x{height} grid")]
    LineOutOfRange {
        what: &'static str,
        pos: i32,
        width: i32,
        height: i32,
    },

    #[error("no glyph with code {code} in this font")]
    GlyphNotFound { code: u32 },

    // === Iteration ===
    #[error("scan advanced past the end of its region")]
    ScanExhausted,

    // === Persistence ===
    #[error("'{key}' must be declared before the first symbol block")]
    MissingDeclaration { key: &'static str },

    #[error("line {line}: {message}")]
    MalformedFontFile { line: usize, message: String },

    #[error("pixel data too short: got {actual} bytes, need {expected}")]
    NotEnoughData { expected: usize, actual: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for dotfont_engine operations
pub type EngineResult<T> = std::result::Result<T, EngineError>;

impl EngineError {
    /// Whether this is a policy rejection the caller can recover from by
    /// retrying differently. The rejected operation left all state untouched.
    pub fn is_disallowed(&self) -> bool {
        matches!(
            self,
            EngineError::GlyphAlreadyAttached { .. } | EngineError::AttachedCodeChange | EngineError::WidthRejected { .. } | EngineError::HeightRejected { .. }
        )
    }

    /// Create a malformed-file error carrying the 1-based source line
    pub fn malformed(line: usize, message: impl Into<String>) -> Self {
        Self::MalformedFontFile {
            line,
            message: message.into(),
        }
    }
}
