use std::path::PathBuf;
use thiserror::Error;

/// Structured error types for the plant disease classifier.
///
/// Each variant carries the context of its failure domain so callers can
/// tell an unusable photo apart from a broken model or a misconfigured
/// label table without parsing strings. None of them are retried locally.
#[derive(Error, Debug)]
pub enum PlantClassifierError {
    #[error("Invalid image: {width}x{height} {reason}")]
    InvalidImage {
        width: u32,
        height: u32,
        reason: String,
    },

    #[error("Inference error: {operation} failed")]
    Inference {
        operation: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Label table mismatch for {artifact}: {expected} labels but {actual} scores")]
    TableMismatch {
        artifact: String,
        expected: usize,
        actual: usize,
    },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Filesystem error: {operation} failed for {path:?}")]
    FileSystem {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Validation error: {field} {reason}")]
    Validation { field: String, reason: String },
}

pub type Result<T> = std::result::Result<T, PlantClassifierError>;

impl PlantClassifierError {
    /// Wraps a backend failure with the name of the step that produced it.
    pub fn inference(
        operation: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Inference {
            operation: operation.into(),
            source: source.into(),
        }
    }

    /// This error's message followed by every `source()` below it,
    /// joined with `": "`.
    pub fn display_chain(&self) -> String {
        use std::error::Error as _;

        let mut message = self.to_string();
        let mut cause = self.source();
        while let Some(err) = cause {
            message.push_str(": ");
            message.push_str(&err.to_string());
            cause = err.source();
        }
        message
    }
}

/// Convert I/O errors to filesystem errors.
///
/// Code that knows the path and operation should build
/// `PlantClassifierError::FileSystem` directly instead.
impl From<std::io::Error> for PlantClassifierError {
    fn from(err: std::io::Error) -> Self {
        Self::FileSystem {
            path: PathBuf::from("unknown"),
            operation: "unknown".to_string(),
            source: err,
        }
    }
}

/// Manifest parse failures are configuration errors.
impl From<serde_json::Error> for PlantClassifierError {
    fn from(err: serde_json::Error) -> Self {
        Self::Configuration {
            message: format!("invalid variant manifest: {err}"),
        }
    }
}

/// Convert ONNX Runtime errors to inference errors.
impl From<ort::Error> for PlantClassifierError {
    fn from(err: ort::Error) -> Self {
        Self::inference("ort operation", err)
    }
}

/// Shape errors only happen while building or reading model tensors, so they
/// are part of the inference domain.
impl From<ndarray::ShapeError> for PlantClassifierError {
    fn from(err: ndarray::ShapeError) -> Self {
        Self::inference("tensor shape conversion", err)
    }
}
