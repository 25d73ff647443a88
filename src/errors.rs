//! Error types for the confidence pipeline
//!
//! Only `MalformedDocument` (and a bad policy, which is caught before any
//! document is touched) stops a conversion. Everything else the pipeline
//! finds is reported as a lower confidence or an issue string on a tier.

use thiserror::Error;

/// Fatal document errors: no `ScoreDocument` can be built, so no report exists.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedDocument {
    /// Input is not well-formed XML
    #[error("Invalid XML: {0}")]
    InvalidXml(String),

    /// Well-formed XML, but not a score-partwise MusicXML document
    #[error("Unsupported MusicXML format: {0}")]
    UnsupportedFormat(String),

    /// No usable part in the document (strict mode only)
    #[error("Document contains no parts with measures")]
    NoParts,

    /// The cleaned document could not be written back out
    #[error("Could not rewrite document: {0}")]
    Rewrite(String),
}

/// Policy loading and validation errors
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("Policy parse error: {0}")]
    Parse(String),

    #[error("Cannot read policy file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported policy file extension: {0:?}")]
    UnsupportedExtension(String),

    #[error("Tier weights must sum to 1, got {0}")]
    WeightsSum(f64),

    #[error("Tier weight {index} is negative or not finite: {value}")]
    InvalidWeight { index: usize, value: f64 },

    #[error("Tier weights must not increase with rank: tier {rank} outweighs tier {higher}")]
    WeightsNotDescending { rank: usize, higher: usize },

    #[error("Strict metadata floor must be within 0..=100, got {0}")]
    FloorOutOfRange(u32),

    #[error("Note range is empty: lowest {lowest} is above highest {highest}")]
    EmptyNoteRange { lowest: u8, highest: u8 },
}

impl From<serde_json::Error> for PolicyError {
    fn from(err: serde_json::Error) -> Self {
        PolicyError::Parse(err.to_string())
    }
}

impl From<serde_yaml::Error> for PolicyError {
    fn from(err: serde_yaml::Error) -> Self {
        PolicyError::Parse(err.to_string())
    }
}

/// Top-level pipeline error
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Malformed(#[from] MalformedDocument),

    #[error("Invalid policy: {0}")]
    Policy(#[from] PolicyError),

    /// The caller's wall-clock limit expired before a report existed
    #[error("Conversion exceeded its {limit_ms} ms time limit")]
    Timeout { limit_ms: u128 },

    /// The worker thread went away without sending a result
    #[error("Conversion worker stopped without producing a result")]
    WorkerLost,
}

pub type Result<T> = std::result::Result<T, PipelineError>;
