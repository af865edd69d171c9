//! Font file format handling.

mod dft;
pub use dft::*;

use std::path::Path;

/// Supported font file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontFormat {
    /// Native line-oriented text format. Extension: .dft
    Dft,
}

impl FontFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Dft => "dft",
        }
    }

    /// Try to detect the format from a file extension.
    ///
    /// Accepts extensions with or without leading dot.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_lowercase().as_str() {
            "dft" => Some(Self::Dft),
            _ => None,
        }
    }

    /// Try to detect the format from a file path.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension().and_then(|ext| ext.to_str()).and_then(Self::from_extension)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Dft => "DotFont Text",
        }
    }
}

impl std::fmt::Display for FontFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
