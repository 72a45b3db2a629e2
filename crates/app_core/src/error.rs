//! Application error types

use thiserror::Error;

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    // ===== Recoverable Errors (report, continue) =====
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Cannot decode {path}: {reason}")]
    DecodeFailure { path: String, reason: String },

    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Settings could not be read: {0}")]
    ConfigRead(String),

    #[error("Export failed: {0}")]
    ExportFailure(String),

    // ===== Session-blocking Errors (no Grid/Slideshow is entered) =====
    #[error("Input directory not found: {0}")]
    InputNotFound(String),

    #[error("No images could be loaded")]
    EmptyCatalog,
}

impl AppError {
    /// Can the session keep running after this error?
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AppError::Io(_)
                | AppError::UnsupportedFormat(_)
                | AppError::DecodeFailure { .. }
                | AppError::InvalidGeometry(_)
                | AppError::ConfigRead(_)
                | AppError::ExportFailure(_)
        )
    }

    /// Does this error prevent the session from starting?
    pub fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }

    /// Get a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            AppError::InputNotFound(path) => {
                format!("The folder {} does not exist or cannot be read.", path)
            }
            AppError::EmptyCatalog => {
                "No images found. Please check the folder path and try again.".to_string()
            }
            AppError::DecodeFailure { path, .. } => format!("Cannot load image: {}", path),
            AppError::ExportFailure(msg) => format!("Export failed: {}", msg),
            _ => self.to_string(),
        }
    }

    pub(crate) fn decode(path: impl Into<String>, reason: impl ToString) -> Self {
        AppError::DecodeFailure {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<image::ImageError> for AppError {
    fn from(e: image::ImageError) -> Self {
        AppError::decode("<memory>", e)
    }
}
