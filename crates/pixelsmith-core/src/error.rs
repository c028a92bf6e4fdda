//! Error taxonomy shared by every stage of the transform pipeline.

use thiserror::Error;

/// A terminal failure of a transform request.
///
/// Every stage maps its own failures into one of these variants. None of them
/// are retried; the caller receives exactly one of these or a complete image.
#[derive(Debug, Error)]
pub enum TransformError {
    /// A required field is missing or a numeric/enum field is malformed.
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    /// The crop rectangle has no area after clamping to the source bounds.
    #[error("Crop rectangle is empty")]
    EmptyCrop,

    /// The requested output format is not one of jpeg, png, webp or avif.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The uploaded payload exceeds the configured limit.
    #[error("Payload of {size} bytes exceeds the limit of {limit} bytes")]
    PayloadTooLarge { size: usize, limit: usize },

    /// The source bytes are corrupt or in an unsupported container.
    #[error("Failed to decode image: {0}")]
    DecodeFailed(String),

    /// The encoder rejected the raster.
    #[error("Failed to encode image: {0}")]
    EncodeFailed(String),

    /// The background-removal collaborator rejected the image.
    #[error("Background removal failed: {0}")]
    BackgroundRemovalFailed(String),
}

/// Payload-free mirror of [`TransformError`], used by the request state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidParameters,
    EmptyCrop,
    UnsupportedFormat,
    PayloadTooLarge,
    DecodeFailed,
    EncodeFailed,
    BackgroundRemovalFailed,
}

impl ErrorKind {
    /// Stable snake_case identifier, suitable for logs and API bodies.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::InvalidParameters => "invalid_parameters",
            ErrorKind::EmptyCrop => "empty_crop",
            ErrorKind::UnsupportedFormat => "unsupported_format",
            ErrorKind::PayloadTooLarge => "payload_too_large",
            ErrorKind::DecodeFailed => "decode_failed",
            ErrorKind::EncodeFailed => "encode_failed",
            ErrorKind::BackgroundRemovalFailed => "background_removal_failed",
        }
    }

    /// True for failures caused by the caller's input rather than by processing.
    pub fn is_client_error(self) -> bool {
        matches!(
            self,
            ErrorKind::InvalidParameters
                | ErrorKind::EmptyCrop
                | ErrorKind::UnsupportedFormat
                | ErrorKind::PayloadTooLarge
        )
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TransformError {
    /// Shorthand for [`TransformError::InvalidParameters`].
    pub fn invalid(message: impl Into<String>) -> Self {
        TransformError::InvalidParameters(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            TransformError::InvalidParameters(_) => ErrorKind::InvalidParameters,
            TransformError::EmptyCrop => ErrorKind::EmptyCrop,
            TransformError::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            TransformError::PayloadTooLarge { .. } => ErrorKind::PayloadTooLarge,
            TransformError::DecodeFailed(_) => ErrorKind::DecodeFailed,
            TransformError::EncodeFailed(_) => ErrorKind::EncodeFailed,
            TransformError::BackgroundRemovalFailed(_) => ErrorKind::BackgroundRemovalFailed,
        }
    }
}

pub type Result<T> = std::result::Result<T, TransformError>;
