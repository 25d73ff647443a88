//! End-to-end conversion
//!
//! ```text
//! raw MusicXML
//!   ↓ normalize        (ScoreDocument, deferred coercions, RepairPlan)
//!   ↓ orchestrate      (five ValidationResults, terminal state)
//!   ↓ apply_repairs    (cleaned MusicXML)
//!   ↓ build report     (ValidationReport)
//! ConversionOutcome
//! ```
//!
//! A `Pipeline` holds only the validated policy and a clock; it keeps no
//! state between conversions.

pub mod aggregator;
pub mod orchestrator;
pub mod report;

use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

pub use aggregator::aggregate;
pub use orchestrator::{Orchestrator, OrchestratorState, TierRun};
pub use report::{ReportBuilder, ValidationReport};

use crate::errors::{PipelineError, PolicyError, Result};
use crate::normalize::normalize;
use crate::policy::{Policy, TierWeights};
use crate::repair::apply_repairs;
use crate::utils::{ProcessingClock, StageTimings, SystemClock};

/// Both artifacts of one conversion
#[derive(Debug, Clone)]
pub struct ConversionOutcome {
    pub report: ValidationReport,
    pub cleaned_musicxml: String,
    pub state: OrchestratorState,
}

impl ConversionOutcome {
    pub fn is_aborted(&self) -> bool {
        self.state.is_aborted()
    }
}

#[derive(Debug, Clone)]
pub struct Pipeline {
    policy: Policy,
    weights: TierWeights,
    clock: Arc<dyn ProcessingClock>,
}

impl Pipeline {
    /// Validate `policy` and build a pipeline around it
    pub fn new(policy: Policy) -> std::result::Result<Self, PolicyError> {
        policy.validate()?;
        let weights = policy.weights()?;
        Ok(Self {
            policy,
            weights,
            clock: Arc::new(SystemClock),
        })
    }

    /// Replace the clock behind `processingTimeMs`
    pub fn with_clock(mut self, clock: impl ProcessingClock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Convert one raw document. Only a document that cannot be read at all
    /// is an error; everything else ends up in the report.
    pub fn run(&self, xml: &str) -> Result<ConversionOutcome> {
        let started = Instant::now();
        let mut timings = StageTimings::new();

        let normalized = timings.time("normalize", || normalize(xml, self.policy.mode))?;
        let run = timings.time("validate", || {
            Orchestrator::new(&self.policy).run(&normalized.document)
        });
        let state = run.state;
        let cleaned_musicxml = timings.time("repair", || apply_repairs(xml, &normalized.repairs))?;

        let report = timings.time("report", || {
            ReportBuilder::new(&self.policy, &self.weights)
                .deferred(normalized.deferred)
                .source(normalized.document.source.clone())
                .processing_time_ms(self.clock.elapsed_ms(started))
                .build(run)
        });

        log::debug!("Stage timings: {}", timings.summary());
        log::info!(
            "Converted {} part(s): overall confidence {:.2} ({:?})",
            normalized.document.parts.len(),
            report.overall_confidence,
            state
        );

        Ok(ConversionOutcome {
            report,
            cleaned_musicxml,
            state,
        })
    }

    /// Like `run`, but gives up after `limit`. The conversion continues on
    /// its worker thread and its result is discarded.
    pub fn run_with_timeout(&self, xml: String, limit: Duration) -> Result<ConversionOutcome> {
        let pipeline = self.clone();
        let (tx, rx) = mpsc::channel();

        thread::Builder::new()
            .name("omr-confidence".to_string())
            .spawn(move || {
                // the receiver may already have timed out
                let _ = tx.send(pipeline.run(&xml));
            })
            .map_err(|e| {
                log::error!("Failed to spawn conversion worker: {}", e);
                PipelineError::WorkerLost
            })?;

        match rx.recv_timeout(limit) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                log::warn!("Conversion timed out after {} ms", limit.as_millis());
                Err(PipelineError::Timeout {
                    limit_ms: limit.as_millis(),
                })
            }
            Err(RecvTimeoutError::Disconnected) => Err(PipelineError::WorkerLost),
        }
    }
}
