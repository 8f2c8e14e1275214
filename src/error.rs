//! # Pipeline Error Handling
//!
//! Error types for the capture-and-filter pipeline, covering every failure
//! domain a session can surface: capture, precondition violations, transcode,
//! the remote filter round-trip, and persistence into the media library.
//!
//! ## Error Classification
//!
//! Errors are classified with the [`Retryable`] trait. Nothing in the
//! pipeline retries automatically; a retry is always a caller decision
//! (re-tapping a filter button). The classification tells the caller
//! which failures are worth offering a retry for: transient network and
//! server-side remote failures are, precondition failures are not.
//!
//! ## Usage
//!
//! ```rust
//! use digicam::error::{PipelineError, Retryable};
//!
//! let err = PipelineError::remote_status(503, "service unavailable");
//! assert_eq!(err.category(), "remote_filter");
//! assert!(err.is_retryable());
//! ```

use std::{error::Error as StdError, fmt, io};

/// Base error type for the capture-and-filter pipeline.
#[derive(Debug)]
pub enum PipelineError {
    /// The camera collaborator produced no frame.
    Capture { reason: String },
    /// A filter was requested with no captured original to filter.
    NoOriginalImage,
    /// A save was requested with no working image present.
    NoImageToSave,
    /// A filter round-trip is already in flight for this session.
    FilterBusy { filter: String },
    /// Transcode stage failures: unreadable source, failed dimension
    /// probe, resize or encode failure.
    Transcode {
        operation: String,
        reason: String,
    },
    /// Remote filter round-trip failures.
    RemoteFilter { kind: RemoteFailure },
    /// Persistence failures: payload decode, cache write, or media
    /// library operations.
    Persist {
        operation: String,
        path: Option<String>,
        reason: String,
    },
    /// Configuration validation errors.
    Config {
        field: String,
        value: String,
        reason: String,
    },
    /// Plain I/O errors outside a more specific domain.
    Io {
        operation: String,
        source: io::Error,
    },
}

/// The ways a remote filter call can fail. Carried inside
/// [`PipelineError::RemoteFilter`] so callers can distinguish a dead
/// network from a live-but-unhappy endpoint.
#[derive(Debug)]
pub enum RemoteFailure {
    /// Network-level failure: connect, send, or timeout.
    Network {
        source: Box<dyn StdError + Send + Sync>,
    },
    /// The endpoint answered with a non-2xx status.
    Status { code: u16, body: String },
    /// 2xx response whose body is missing or has an invalid
    /// `processed_image` field.
    MalformedResponse { reason: String },
}

impl PipelineError {
    /// Create a capture error.
    pub fn capture(reason: impl Into<String>) -> Self {
        Self::Capture {
            reason: reason.into(),
        }
    }

    /// Create a single-flight suppression error.
    pub fn filter_busy(filter: impl Into<String>) -> Self {
        Self::FilterBusy {
            filter: filter.into(),
        }
    }

    /// Create a transcode error.
    pub fn transcode(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Transcode {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Create a network-level remote filter error.
    pub fn remote_network(source: impl StdError + Send + Sync + 'static) -> Self {
        Self::RemoteFilter {
            kind: RemoteFailure::Network {
                source: Box::new(source),
            },
        }
    }

    /// Create a non-2xx remote filter error.
    pub fn remote_status(code: u16, body: impl Into<String>) -> Self {
        Self::RemoteFilter {
            kind: RemoteFailure::Status {
                code,
                body: body.into(),
            },
        }
    }

    /// Create a malformed-response remote filter error.
    pub fn remote_malformed(reason: impl Into<String>) -> Self {
        Self::RemoteFilter {
            kind: RemoteFailure::MalformedResponse {
                reason: reason.into(),
            },
        }
    }

    /// Create a persistence error.
    pub fn persist(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Persist {
            operation: operation.into(),
            path: None,
            reason: reason.into(),
        }
    }

    /// Create a persistence error tied to a path.
    pub fn persist_at(
        operation: impl Into<String>,
        path: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Persist {
            operation: operation.into(),
            path: Some(path.into()),
            reason: reason.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Config {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create an I/O error.
    pub fn io(operation: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    /// Get the error category as a string, for logging and metrics.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Capture { .. } => "capture",
            Self::NoOriginalImage => "no_original_image",
            Self::NoImageToSave => "no_image_to_save",
            Self::FilterBusy { .. } => "filter_busy",
            Self::Transcode { .. } => "transcode",
            Self::RemoteFilter { .. } => "remote_filter",
            Self::Persist { .. } => "persist",
            Self::Config { .. } => "config",
            Self::Io { .. } => "io",
        }
    }

    /// Whether this error is a session precondition violation rather
    /// than a real I/O or processing failure.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::NoOriginalImage | Self::NoImageToSave | Self::FilterBusy { .. }
        )
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Capture { reason } => {
                write!(f, "Camera produced no frame: {}", reason)
            }
            PipelineError::NoOriginalImage => {
                write!(f, "No captured image to filter")
            }
            PipelineError::NoImageToSave => {
                write!(f, "No image to save")
            }
            PipelineError::FilterBusy { filter } => {
                write!(
                    f,
                    "A filter request is already in flight; '{}' was not issued",
                    filter
                )
            }
            PipelineError::Transcode { operation, reason } => {
                write!(f, "Transcode failed during {}: {}", operation, reason)
            }
            PipelineError::RemoteFilter { kind } => match kind {
                RemoteFailure::Network { source } => {
                    write!(f, "Remote filter network failure: {}", source)
                }
                RemoteFailure::Status { code, body } => {
                    write!(f, "Remote filter endpoint returned {}: {}", code, body)
                }
                RemoteFailure::MalformedResponse { reason } => {
                    write!(f, "Remote filter response malformed: {}", reason)
                }
            },
            PipelineError::Persist {
                operation,
                path,
                reason,
            } => {
                if let Some(path) = path {
                    write!(
                        f,
                        "Persist failed during {} on '{}': {}",
                        operation, path, reason
                    )
                } else {
                    write!(f, "Persist failed during {}: {}", operation, reason)
                }
            }
            PipelineError::Config {
                field,
                value,
                reason,
            } => {
                write!(
                    f,
                    "Configuration error in '{}': {} (value: {})",
                    field, reason, value
                )
            }
            PipelineError::Io { operation, source } => {
                write!(f, "I/O error during {}: {}", operation, source)
            }
        }
    }
}

impl StdError for PipelineError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::RemoteFilter {
                kind: RemoteFailure::Network { source },
            } => Some(source.as_ref()),
            _ => None,
        }
    }
}

/// Result type alias used throughout the pipeline.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Trait for errors a caller may sensibly retry.
pub trait Retryable {
    /// Check if this error can be retried.
    fn is_retryable(&self) -> bool;
}

impl Retryable for PipelineError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::RemoteFilter { kind } => match kind {
                RemoteFailure::Network { .. } => true,
                RemoteFailure::Status { code, .. } => *code >= 500,
                RemoteFailure::MalformedResponse { .. } => false,
            },
            Self::Io { .. } => true,
            _ => false,
        }
    }
}

impl From<io::Error> for PipelineError {
    fn from(error: io::Error) -> Self {
        Self::io("unknown", error)
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(error: serde_json::Error) -> Self {
        Self::remote_malformed(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        let error = PipelineError::config("max_width", "0", "must be greater than 0");
        assert_eq!(error.category(), "config");
        assert!(!error.is_retryable());

        assert_eq!(
            PipelineError::NoOriginalImage.category(),
            "no_original_image"
        );
        assert!(PipelineError::NoImageToSave.is_precondition());
    }

    #[test]
    fn test_remote_retryability() {
        assert!(PipelineError::remote_status(503, "unavailable").is_retryable());
        assert!(!PipelineError::remote_status(400, "bad filter").is_retryable());
        assert!(!PipelineError::remote_malformed("no processed_image").is_retryable());

        let io_err = io::Error::new(io::ErrorKind::ConnectionRefused, "refused");
        assert!(PipelineError::remote_network(io_err).is_retryable());
    }

    #[test]
    fn test_display_carries_detail() {
        let error = PipelineError::transcode("probe", "not an image");
        assert_eq!(
            error.to_string(),
            "Transcode failed during probe: not an image"
        );

        let error = PipelineError::persist_at("cache_write", "/tmp/x.jpg", "disk full");
        assert!(error.to_string().contains("/tmp/x.jpg"));
    }

    #[test]
    fn test_source_chain() {
        let io_err = io::Error::new(io::ErrorKind::TimedOut, "timed out");
        let error = PipelineError::remote_network(io_err);
        assert!(error.source().is_some());
        assert!(PipelineError::NoOriginalImage.source().is_none());
    }
}
