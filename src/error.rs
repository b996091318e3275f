//! Error types for melody-lstm.
//!
//! Defines all error codes and types used throughout the pipeline for
//! consistent error handling and reporting.

use std::fmt;
use std::path::Path;

/// Error codes identifying the failing condition.
///
/// Preprocessing skips inputs that fail with [`ErrorCode::InputFormat`];
/// every other code is fatal for the stage that raised it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// A dataset file could not be parsed.
    /// Trigger: malformed kern token, unsupported spine layout.
    InputFormat,

    /// The key of a score could not be determined.
    /// Trigger: no pitched notes, flat pitch-class histogram, tied correlation.
    KeyDetectionAmbiguous,

    /// A symbol or id has no vocabulary entry.
    /// Trigger: unknown seed token, sampled id out of range.
    Lookup,

    /// Sampling temperature is not strictly positive.
    /// Trigger: temperature <= 0, NaN or infinite.
    InvalidTemperature,

    /// A required file or directory does not exist.
    /// Trigger: dataset, corpus, mapping or model missing on disk.
    MissingArtifact,

    /// A persisted file exists but its content is unusable.
    /// Trigger: corrupt JSON, inconsistent ids, vocabulary fingerprint mismatch.
    InvalidArtifact,

    /// Model training could not proceed.
    /// Trigger: corpus shorter than one window, non-finite loss.
    TrainingFailed,

    /// A generated score could not be written.
    /// Trigger: unsupported output extension, unrepresentable pitch.
    ExportFailed,

    /// Configuration rejected by validation.
    InvalidConfig,

    /// Any other file-system failure.
    Io,
}

impl ErrorCode {
    /// Returns the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InputFormat => "INPUT_FORMAT",
            ErrorCode::KeyDetectionAmbiguous => "KEY_DETECTION_AMBIGUOUS",
            ErrorCode::Lookup => "LOOKUP",
            ErrorCode::InvalidTemperature => "INVALID_TEMPERATURE",
            ErrorCode::MissingArtifact => "MISSING_ARTIFACT",
            ErrorCode::InvalidArtifact => "INVALID_ARTIFACT",
            ErrorCode::TrainingFailed => "TRAINING_FAILED",
            ErrorCode::ExportFailed => "EXPORT_FAILED",
            ErrorCode::InvalidConfig => "INVALID_CONFIG",
            ErrorCode::Io => "IO",
        }
    }

    /// Returns a human-readable description of the error.
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::InputFormat => "Dataset file could not be parsed",
            ErrorCode::KeyDetectionAmbiguous => "Key of the score could not be determined",
            ErrorCode::Lookup => "Symbol or id is not part of the vocabulary",
            ErrorCode::InvalidTemperature => "Temperature must be a finite value greater than 0",
            ErrorCode::MissingArtifact => "Required file or directory is missing",
            ErrorCode::InvalidArtifact => "Persisted file is corrupt or inconsistent",
            ErrorCode::TrainingFailed => "Model training failed",
            ErrorCode::ExportFailed => "Generated melody could not be exported",
            ErrorCode::InvalidConfig => "Configuration is invalid",
            ErrorCode::Io => "File system operation failed",
        }
    }

    /// Returns a recovery hint suggesting how to resolve this error.
    pub fn recovery_hint(&self) -> &'static str {
        match self {
            ErrorCode::InputFormat => {
                "Check that the file is a single-spine **kern score; \
                 unparseable files are skipped during preprocessing"
            }
            ErrorCode::KeyDetectionAmbiguous => {
                "Annotate the key in the score (e.g. '*G:' or '*e:') \
                 or exclude the piece from the dataset"
            }
            ErrorCode::Lookup => {
                "Use only symbols present in mapping.json for the seed, \
                 or re-run preprocessing so the vocabulary covers them"
            }
            ErrorCode::InvalidTemperature => {
                "Pass a temperature greater than 0 (e.g. --temperature 0.3)"
            }
            ErrorCode::MissingArtifact => {
                "Run the earlier pipeline stages first: \
                 'melody-lstm preprocess' then 'melody-lstm train'"
            }
            ErrorCode::InvalidArtifact => {
                "Delete the affected file and regenerate it; a model must be \
                 trained against the same mapping.json it is used with"
            }
            ErrorCode::TrainingFailed => {
                "Provide more songs, shorten the sequence length, \
                 or lower the learning rate"
            }
            ErrorCode::ExportFailed => {
                "Use an output path ending in .mid, .midi or .krn \
                 in a writable directory"
            }
            ErrorCode::InvalidConfig => {
                "Correct the reported value in the config file, \
                 environment or command line"
            }
            ErrorCode::Io => "Check file permissions and available disk space",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Main error type for pipeline operations.
#[derive(Debug)]
pub struct MelodyError {
    /// The error code identifying the type of error.
    pub code: ErrorCode,
    /// Human-readable error message with context.
    pub message: String,
    /// Optional underlying cause of the error.
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl MelodyError {
    /// Creates a new MelodyError with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new MelodyError with an underlying cause.
    pub fn with_source(
        code: ErrorCode,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates an INPUT_FORMAT error for a specific file.
    pub fn input_format(path: &Path, reason: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::InputFormat,
            format!("Cannot parse {}: {}", path.display(), reason.into()),
        )
    }

    /// Creates a KEY_DETECTION_AMBIGUOUS error.
    pub fn key_ambiguous(reason: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::KeyDetectionAmbiguous,
            format!("Key detection failed: {}", reason.into()),
        )
    }

    /// Creates a LOOKUP error for a symbol token.
    pub fn unknown_symbol(token: &str) -> Self {
        Self::new(
            ErrorCode::Lookup,
            format!("Symbol '{}' is not in the vocabulary", token),
        )
    }

    /// Creates a LOOKUP error for an id.
    pub fn unknown_id(id: usize, vocab_size: usize) -> Self {
        Self::new(
            ErrorCode::Lookup,
            format!(
                "Id {} is outside the vocabulary (size {})",
                id, vocab_size
            ),
        )
    }

    /// Creates an INVALID_TEMPERATURE error.
    pub fn invalid_temperature(temperature: f32) -> Self {
        Self::new(
            ErrorCode::InvalidTemperature,
            format!("Invalid temperature: {} (must be > 0)", temperature),
        )
    }

    /// Creates a MISSING_ARTIFACT error carrying the missing path.
    pub fn missing_artifact(path: &Path) -> Self {
        Self::new(
            ErrorCode::MissingArtifact,
            format!("Required file not found: {}", path.display()),
        )
    }

    /// Creates an INVALID_ARTIFACT error.
    pub fn invalid_artifact(reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidArtifact, reason.into())
    }

    /// Creates a TRAINING_FAILED error.
    pub fn training_failed(reason: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::TrainingFailed,
            format!("Training failed: {}", reason.into()),
        )
    }

    /// Creates an EXPORT_FAILED error.
    pub fn export_failed(reason: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ExportFailed,
            format!("Export failed: {}", reason.into()),
        )
    }

    /// Creates an INVALID_CONFIG error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::InvalidConfig,
            format!("Invalid configuration: {}", reason.into()),
        )
    }

    /// Wraps an I/O error with the path it concerns.
    ///
    /// A `NotFound` error becomes MISSING_ARTIFACT so the caller sees which
    /// stage output is absent.
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            let mut err = Self::missing_artifact(path);
            err.source = Some(Box::new(source));
            return err;
        }
        Self::with_source(
            ErrorCode::Io,
            format!("I/O error on {}", path.display()),
            source,
        )
    }
}

impl fmt::Display for MelodyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}. Recovery: {}",
            self.code,
            self.message,
            self.code.recovery_hint()
        )
    }
}

impl std::error::Error for MelodyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Result type alias using MelodyError.
pub type Result<T> = std::result::Result<T, MelodyError>;
