//! Filename-extension based mime type resolution.
//!
//! Only the extension is inspected; file contents are never sniffed.

use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Errors raised while classifying an uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MimeError {
    /// The extension is missing or not one of the supported document formats.
    #[error("Unsupported file type: {extension}")]
    UnsupportedType {
        /// Lowercased extension that was rejected (empty when absent).
        extension: String,
    },
}

/// Document formats accepted by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MimeType {
    /// `application/pdf`
    Pdf,
    /// `image/jpeg`
    Jpeg,
    /// `image/png`
    Png,
}

impl MimeType {
    /// IANA media type string sent to the model provider.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }
}

impl fmt::Display for MimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolve the mime type of `filename` from its (case-insensitive) extension.
pub fn resolve(filename: &str) -> Result<MimeType, MimeError> {
    let extension = extension_of(filename);
    match extension.as_str() {
        "pdf" => Ok(MimeType::Pdf),
        "jpg" | "jpeg" => Ok(MimeType::Jpeg),
        "png" => Ok(MimeType::Png),
        _ => Err(MimeError::UnsupportedType { extension }),
    }
}

/// Resolve the mime type of a path on disk.
pub fn resolve_path(path: &Path) -> Result<MimeType, MimeError> {
    resolve(&path.to_string_lossy())
}

/// Lowercased extension of `filename`, or an empty string when there is none.
pub fn extension_of(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}
