//! Error types for ferro-vep
//!
//! Every failure in the annotation path is local to one variant. The kinds
//! here mirror how a failure is treated by the pipeline:
//!
//! - classification and lookup failures skip the variant
//! - network failures degrade to "no annotation available"
//! - malformed responses are tolerated per field by the extractor
//!
//! I/O, JSON, table and configuration errors are the only ones that can stop
//! a run. Inside the per-variant loop that means a failed cache write.

use std::fmt;
use thiserror::Error;

/// Error codes for categorizing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    // Classification errors (E1xxx)
    /// Variant could not be turned into a region string
    UnparseableVariant = 1001,

    // Lookup errors (E2xxx)
    /// Locus is outside every known gene region
    GeneNotFound = 2001,
    /// Gene has no canonical transcript mapping
    TranscriptNotFound = 2002,

    // Network errors (E3xxx)
    /// Retry budget exhausted on transient failures
    TransientNetwork = 3001,
    /// Remote service rejected the request (HTTP 400)
    TerminalRequest = 3002,

    // Response errors (E4xxx)
    /// Expected keys absent from a response
    MalformedResponse = 4001,

    // IO errors (E9xxx)
    /// File IO error
    IoError = 9001,
    /// JSON parsing error
    JsonError = 9002,
    /// Delimited table error
    TableError = 9003,
    /// Configuration error
    ConfigError = 9004,
}

impl ErrorCode {
    /// Get the error code as a string (e.g., "E1001")
    pub fn as_str(&self) -> String {
        format!("E{:04}", *self as u16)
    }

    /// Get a brief description of this error code
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::UnparseableVariant => "variant cannot be expressed as a region",
            ErrorCode::GeneNotFound => "locus outside known gene regions",
            ErrorCode::TranscriptNotFound => "no canonical transcript for gene",
            ErrorCode::TransientNetwork => "network retries exhausted",
            ErrorCode::TerminalRequest => "request rejected by remote service",
            ErrorCode::MalformedResponse => "malformed remote response",
            ErrorCode::IoError => "file I/O error",
            ErrorCode::JsonError => "JSON parsing error",
            ErrorCode::TableError => "delimited table error",
            ErrorCode::ConfigError => "configuration error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Main error type for ferro-vep operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VepError {
    /// The classifier cannot derive a region string for the variant
    #[error("Could not parse variant {variant}: {reason}")]
    UnparseableVariant { variant: String, reason: String },

    /// The locus does not fall inside any known gene region
    #[error("No gene region contains {chrom}:{pos}")]
    GeneNotFound { chrom: String, pos: u64 },

    /// The gene has no canonical transcript mapping
    #[error("No transcript mapping for gene {gene}")]
    TranscriptNotFound { gene: String },

    /// Transient failures persisted past the retry budget
    #[error("Request to {url} failed after {attempts} attempts: {msg}")]
    TransientNetwork {
        url: String,
        attempts: u32,
        msg: String,
    },

    /// The remote service rejected the request as malformed
    #[error("Request to {url} rejected with HTTP {status}")]
    TerminalRequest { url: String, status: u16 },

    /// A response lacked the structure the caller needs
    #[error("Malformed response: {msg}")]
    MalformedResponse { msg: String },

    /// IO error (for file operations)
    #[error("IO error: {msg}")]
    Io { msg: String },

    /// JSON parsing error
    #[error("JSON error: {msg}")]
    Json { msg: String },

    /// Delimited table error
    #[error("Table error: {msg}")]
    Table { msg: String },

    /// Configuration error
    #[error("Config error: {msg}")]
    Config { msg: String },
}

impl VepError {
    /// Create an unparseable-variant error
    pub fn unparseable(variant: impl Into<String>, reason: impl Into<String>) -> Self {
        VepError::UnparseableVariant {
            variant: variant.into(),
            reason: reason.into(),
        }
    }

    /// Create a malformed-response error
    pub fn malformed(msg: impl Into<String>) -> Self {
        VepError::MalformedResponse { msg: msg.into() }
    }

    /// Get the error code
    pub fn code(&self) -> ErrorCode {
        match self {
            VepError::UnparseableVariant { .. } => ErrorCode::UnparseableVariant,
            VepError::GeneNotFound { .. } => ErrorCode::GeneNotFound,
            VepError::TranscriptNotFound { .. } => ErrorCode::TranscriptNotFound,
            VepError::TransientNetwork { .. } => ErrorCode::TransientNetwork,
            VepError::TerminalRequest { .. } => ErrorCode::TerminalRequest,
            VepError::MalformedResponse { .. } => ErrorCode::MalformedResponse,
            VepError::Io { .. } => ErrorCode::IoError,
            VepError::Json { .. } => ErrorCode::JsonError,
            VepError::Table { .. } => ErrorCode::TableError,
            VepError::Config { .. } => ErrorCode::ConfigError,
        }
    }

    /// Whether this error only affects a single variant.
    ///
    /// The batch driver relies on this: variant-local errors are logged and
    /// the row is left unannotated.
    pub fn is_variant_local(&self) -> bool {
        !matches!(
            self,
            VepError::Io { .. }
                | VepError::Json { .. }
                | VepError::Table { .. }
                | VepError::Config { .. }
        )
    }

    /// Whether the variant should be reported at ERROR level when skipped.
    ///
    /// A missing transcript mapping is expected for genes outside the panel
    /// and is skipped quietly.
    pub fn is_loud(&self) -> bool {
        !matches!(self, VepError::TranscriptNotFound { .. })
    }

    /// Format with the error code prefix, e.g. `[E2001] No gene region ...`
    pub fn detailed_message(&self) -> String {
        format!("[{}] {}", self.code(), self)
    }
}

impl From<std::io::Error> for VepError {
    fn from(err: std::io::Error) -> Self {
        VepError::Io {
            msg: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for VepError {
    fn from(err: serde_json::Error) -> Self {
        VepError::Json {
            msg: err.to_string(),
        }
    }
}

impl From<csv::Error> for VepError {
    fn from(err: csv::Error) -> Self {
        VepError::Table {
            msg: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for VepError {
    fn from(err: toml::de::Error) -> Self {
        VepError::Config {
            msg: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for VepError {
    fn from(err: toml::ser::Error) -> Self {
        VepError::Config {
            msg: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_as_str() {
        assert_eq!(ErrorCode::UnparseableVariant.as_str(), "E1001");
        assert_eq!(ErrorCode::TranscriptNotFound.as_str(), "E2002");
        assert_eq!(ErrorCode::TerminalRequest.as_str(), "E3002");
        assert_eq!(ErrorCode::ConfigError.as_str(), "E9004");
    }

    #[test]
    fn test_error_code_display() {
        assert_eq!(format!("{}", ErrorCode::GeneNotFound), "E2001");
    }

    #[test]
    fn test_codes_match_variants() {
        let err = VepError::unparseable("1 100 . AC GT . . .", "multi-base substitution");
        assert_eq!(err.code(), ErrorCode::UnparseableVariant);

        let err = VepError::TerminalRequest {
            url: "http://x".to_string(),
            status: 400,
        };
        assert_eq!(err.code(), ErrorCode::TerminalRequest);

        let err = VepError::malformed("no mappings");
        assert_eq!(err.code(), ErrorCode::MalformedResponse);
    }

    #[test]
    fn test_variant_local_classification() {
        assert!(VepError::GeneNotFound {
            chrom: "17".to_string(),
            pos: 1
        }
        .is_variant_local());
        assert!(VepError::TransientNetwork {
            url: "u".to_string(),
            attempts: 10,
            msg: "timeout".to_string()
        }
        .is_variant_local());
        assert!(!VepError::Io {
            msg: "disk full".to_string()
        }
        .is_variant_local());
    }

    #[test]
    fn test_transcript_not_found_is_quiet() {
        let err = VepError::TranscriptNotFound {
            gene: "TTN".to_string(),
        };
        assert!(!err.is_loud());
        assert!(VepError::malformed("x").is_loud());
    }

    #[test]
    fn test_detailed_message() {
        let err = VepError::GeneNotFound {
            chrom: "17".to_string(),
            pos: 41244936,
        };
        assert_eq!(
            err.detailed_message(),
            "[E2001] No gene region contains 17:41244936"
        );
    }

    #[test]
    fn test_from_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: VepError = io.into();
        assert!(matches!(err, VepError::Io { .. }));
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: VepError = json_err.into();
        assert_eq!(err.code(), ErrorCode::JsonError);
    }
}
