//! Error types for the review pipeline.
//!
//! Each component owns one enum. Analysis-time errors are flattened to their
//! `Display` text before they reach a record, so none of these types are
//! ever persisted.

use thiserror::Error;

/// Failures of the binary encoder.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// The screenshot blob could not be read into memory.
    #[error("Failed to read screenshot: {0}")]
    Unreadable(String),

    /// The input is not a `data:<mime>;base64,<payload>` string.
    #[error("Malformed data URL: {0}")]
    Format(String),
}

/// Failures of one analysis attempt.
///
/// The `Display` text of each variant is what the user sees on a record in
/// ERROR, so messages are written to be actionable on their own.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("Gemini API key is not configured. Set GEMINI_API_KEY in your environment or .env file, or run `ui-refine set-key`.")]
    Config,

    #[error("{0}")]
    Validation(String),

    #[error("Gemini API key is invalid. Check GEMINI_API_KEY and try again.")]
    Auth,

    #[error("Network error while contacting Gemini API. Check your internet connection. Details: {0}")]
    Network(String),

    #[error("Failed to get analysis from Gemini: {0}")]
    Provider(String),

    #[error("Received an empty response from Gemini API.")]
    EmptyResponse,
}

/// Failures writing the durable mirror of the record collection.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize records: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("A record with id {0} already exists")]
    DuplicateId(String),
}

/// Refused status transitions.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Analysis is already in progress for this record")]
    AlreadyAnalyzing,

    #[error("Record already has a completed analysis; add a new screen to re-analyze")]
    AlreadyCompleted,

    #[error("Record is not being analyzed")]
    NotAnalyzing,
}

/// Failures creating a new record.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("Screen Name is required.")]
    MissingScreenName,

    #[error("Screenshot is required for analysis.")]
    MissingScreenshot,

    #[error("{0}")]
    InvalidScreenshot(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}
