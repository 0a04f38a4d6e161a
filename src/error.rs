//! Error types for the email-image-match crate.
//!
//! All errors implement [`std::error::Error`] and provide context about what went wrong.
//! Most errors never leave the matching pipeline: they are logged and the affected
//! element or comparison is treated as "no match". See [`Error::is_localized`].

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading references or scanning a page.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    // ─────────────────────────────────────────────────────────────────────────
    // Configuration / source errors (propagated to the caller)
    // ─────────────────────────────────────────────────────────────────────────
    /// Invalid configuration provided.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the configuration error.
        message: String,
    },

    /// The reference image directory does not exist.
    #[error("reference image source not found: {}", path.display())]
    ReferenceSourceNotFound {
        /// The missing directory.
        path: PathBuf,
    },

    /// The reference image directory exists but could not be read.
    #[error("failed to read reference image source {}", path.display())]
    ReferenceSourceRead {
        /// The directory or file that failed.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Codec errors (localized to one image)
    // ─────────────────────────────────────────────────────────────────────────
    /// Failed to decode compressed image bytes.
    #[error("failed to decode image")]
    Decode {
        /// The underlying codec error.
        #[source]
        source: image::ImageError,
    },

    /// Failed to encode a raster back to PNG.
    #[error("failed to encode image")]
    Encode {
        /// The underlying codec error.
        #[source]
        source: image::ImageError,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Page automation errors (localized to one element or one scan)
    // ─────────────────────────────────────────────────────────────────────────
    /// Querying elements or their layout failed.
    #[error("element query failed: {message}")]
    ElementQuery {
        /// Description reported by the page automation layer.
        message: String,
    },

    /// Capturing an element screenshot failed.
    #[error("screenshot capture failed: {message}")]
    Capture {
        /// Description reported by the page automation layer.
        message: String,
    },

    /// Evaluating a script in the page failed.
    #[error("script evaluation failed: {message}")]
    Script {
        /// Description reported by the page automation layer.
        message: String,
    },

    /// Waiting for images to finish loading took too long.
    #[error("image load wait timed out after {timeout:?}")]
    LoadWaitTimeout {
        /// The timeout duration that was exceeded.
        timeout: Duration,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Diagnostics errors (always swallowed)
    // ─────────────────────────────────────────────────────────────────────────
    /// Writing a diagnostics artifact failed.
    #[error("failed to write diagnostics image {}", path.display())]
    DiagnosticsWrite {
        /// The artifact path.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: image::ImageError,
    },
}

impl Error {
    /// Returns `true` if the pipeline degrades this error to "no match for this item"
    /// instead of surfacing it.
    ///
    /// Only configuration and reference source errors are fatal.
    #[must_use]
    pub fn is_localized(&self) -> bool {
        match self {
            Error::InvalidConfig { .. }
            | Error::ReferenceSourceNotFound { .. }
            | Error::ReferenceSourceRead { .. } => false,

            Error::Decode { .. }
            | Error::Encode { .. }
            | Error::ElementQuery { .. }
            | Error::Capture { .. }
            | Error::Script { .. }
            | Error::LoadWaitTimeout { .. }
            | Error::DiagnosticsWrite { .. } => true,
        }
    }

    /// Returns the error category for logging purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::InvalidConfig { .. } => ErrorCategory::Configuration,

            Error::ReferenceSourceNotFound { .. } | Error::ReferenceSourceRead { .. } => {
                ErrorCategory::Source
            }

            Error::Decode { .. } | Error::Encode { .. } => ErrorCategory::Codec,

            Error::ElementQuery { .. } | Error::Capture { .. } | Error::Script { .. } => {
                ErrorCategory::Page
            }

            Error::LoadWaitTimeout { .. } => ErrorCategory::Timeout,

            Error::DiagnosticsWrite { .. } => ErrorCategory::Diagnostics,
        }
    }
}

/// Error categories for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Configuration or validation errors.
    Configuration,
    /// Reference image source errors.
    Source,
    /// Image decode/encode errors.
    Codec,
    /// Page automation errors.
    Page,
    /// Timeout errors.
    Timeout,
    /// Diagnostics persistence errors.
    Diagnostics,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Configuration => write!(f, "configuration"),
            ErrorCategory::Source => write!(f, "source"),
            ErrorCategory::Codec => write!(f, "codec"),
            ErrorCategory::Page => write!(f, "page"),
            ErrorCategory::Timeout => write!(f, "timeout"),
            ErrorCategory::Diagnostics => write!(f, "diagnostics"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_localized_classification() {
        // Source errors are fatal
        let err = Error::ReferenceSourceNotFound {
            path: PathBuf::from("./images"),
        };
        assert!(!err.is_localized());

        // Capture errors only affect one element
        let err = Error::Capture {
            message: "element detached".into(),
        };
        assert!(err.is_localized());

        let err = Error::LoadWaitTimeout {
            timeout: Duration::from_millis(2000),
        };
        assert!(err.is_localized());
    }

    #[test]
    fn test_error_categories() {
        let err = Error::InvalidConfig {
            message: "bad".into(),
        };
        assert_eq!(err.category(), ErrorCategory::Configuration);

        let err = Error::ReferenceSourceRead {
            path: PathBuf::from("./images"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(err.category(), ErrorCategory::Source);

        let err = Error::Script {
            message: "document is gone".into(),
        };
        assert_eq!(err.category(), ErrorCategory::Page);
        assert_eq!(err.category().to_string(), "page");
    }

    #[test]
    fn test_not_found_message_includes_path() {
        let err = Error::ReferenceSourceNotFound {
            path: PathBuf::from("/tmp/missing-images"),
        };
        assert!(err.to_string().contains("/tmp/missing-images"));
    }
}
