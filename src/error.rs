//! Error types for the wildlife detection pipeline

use thiserror::Error;

/// Result type alias for the detection pipeline
pub type Result<T> = std::result::Result<T, DetectionError>;

/// Errors that can occur during detection operations
///
/// Only [`DetectionError::ModelLoad`] is fatal to a detection session; every
/// other variant is recoverable at the cycle boundary (the loop logs it,
/// skips the cycle, and re-arms for the next frame).
#[derive(Error, Debug)]
pub enum DetectionError {
    #[error("model loading failed: {0}")]
    ModelLoad(String),

    #[error("frame dimensions {actual:?} cannot be reconciled with model input {expected:?}")]
    ShapeMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("overlay rendering failed: {0}")]
    Render(String),

    #[error("session was stopped before it became active")]
    Canceled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(#[from] serde_json::Error),
}

impl DetectionError {
    pub fn model_load<S: Into<String>>(msg: S) -> Self {
        Self::ModelLoad(msg.into())
    }

    pub fn inference<S: Into<String>>(msg: S) -> Self {
        Self::Inference(msg.into())
    }

    pub fn render<S: Into<String>>(msg: S) -> Self {
        Self::Render(msg.into())
    }

    /// Whether this error terminates the detection session
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ModelLoad(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_model_load_is_fatal() {
        assert!(DetectionError::model_load("missing artifact").is_fatal());
        assert!(!DetectionError::inference("bad output").is_fatal());
        assert!(!DetectionError::render("surface gone").is_fatal());
        assert!(!DetectionError::ShapeMismatch {
            expected: (640, 640),
            actual: (0, 480),
        }
        .is_fatal());
    }
}
