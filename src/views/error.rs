//! View engine error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ViewError {
    /// Configured override directory does not exist
    #[error("Template directory not found: {0}")]
    DirectoryNotFound(String),

    /// Template parse or render error
    #[error("Template error: {0}")]
    TemplateError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
