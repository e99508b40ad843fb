//! Error types for canvas core operations.

use thiserror::Error;

/// Errors that can occur while loading, editing or persisting annotations.
#[derive(Error, Debug)]
pub enum CanvasError {
    /// The image for the current page could not be fetched or decoded.
    #[error("image load failed: {message}")]
    ImageLoad {
        /// Description of the load failure
        message: String,
    },

    /// The annotation list for an image could not be fetched.
    ///
    /// Treated as "zero annotations" by the editor, never fatal.
    #[error("annotation fetch failed: {message}")]
    AnnotationLoad {
        /// Description of the fetch failure
        message: String,
    },

    /// Persisting the annotation list failed.
    #[error("save failed: {message}")]
    Save {
        /// Description of the save failure
        message: String,
    },

    /// JSON serialization or parsing error on the wire format.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An operation that needs a loaded image was invoked without one.
    #[error("no image loaded")]
    NoImage,
}

impl CanvasError {
    /// Create an image load error with a message.
    pub fn image_load(message: impl Into<String>) -> Self {
        Self::ImageLoad {
            message: message.into(),
        }
    }

    /// Create an annotation fetch error with a message.
    pub fn annotation_load(message: impl Into<String>) -> Self {
        Self::AnnotationLoad {
            message: message.into(),
        }
    }

    /// Create a save error with a message.
    pub fn save(message: impl Into<String>) -> Self {
        Self::Save {
            message: message.into(),
        }
    }
}
