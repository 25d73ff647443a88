//! OMR confidence pipeline
//!
//! Takes the MusicXML an optical music recognition engine produced and
//! returns a cleaned copy of it together with a priority-weighted confidence
//! report covering metadata, clefs, time signatures, tempos and notes.
//!
//! ```no_run
//! use omr_confidence::{convert, Policy};
//!
//! let xml = std::fs::read_to_string("scan.musicxml").unwrap();
//! let outcome = convert(&xml, &Policy::strict()).unwrap();
//! println!("{}", outcome.report.to_json().unwrap());
//! ```

pub mod errors;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod policy;
pub mod repair;
pub mod utils;
pub mod validators;

// Re-export commonly used types
pub use errors::{MalformedDocument, PipelineError, PolicyError};
pub use models::{ScoreDocument, SourceTag};
pub use normalize::{normalize, CoercionIssue, NormalizedScore, RepairPlan};
pub use pipeline::{ConversionOutcome, OrchestratorState, Pipeline, ValidationReport};
pub use policy::{Mode, NoteRange, Policy, TierWeights};
pub use repair::apply_repairs;
pub use utils::{FixedClock, ProcessingClock, SystemClock};
pub use validators::{Detected, Tier, ValidationResult};

/// One-shot conversion with the system clock
pub fn convert(xml: &str, policy: &Policy) -> errors::Result<ConversionOutcome> {
    Pipeline::new(policy.clone())?.run(xml)
}
