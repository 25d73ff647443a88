//! Tier orchestration
//!
//! Permissive runs every validator. Strict runs Metadata first and only
//! continues when it clears the policy floor; otherwise the remaining tiers
//! become zero-confidence placeholders.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::models::ScoreDocument;
use crate::policy::{Mode, Policy};
use crate::validators::{self, Tier, ValidationResult};

/// Running → Completed | Aborted. There is no way back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum OrchestratorState {
    Running,
    Completed,
    #[serde(rename_all = "camelCase")]
    Aborted { metadata_confidence: u8, floor: u32 },
}

impl OrchestratorState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, OrchestratorState::Running)
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, OrchestratorState::Aborted { .. })
    }
}

/// All five results, slotted by tier, plus the terminal state
#[derive(Debug, Clone)]
pub struct TierRun {
    pub results: [ValidationResult; 5],
    pub state: OrchestratorState,
}

pub struct Orchestrator<'a> {
    policy: &'a Policy,
    state: OrchestratorState,
}

impl<'a> Orchestrator<'a> {
    pub fn new(policy: &'a Policy) -> Self {
        Self {
            policy,
            state: OrchestratorState::Running,
        }
    }

    pub fn state(&self) -> OrchestratorState {
        self.state
    }

    /// Evaluate `doc` and move to a terminal state
    pub fn run(mut self, doc: &ScoreDocument) -> TierRun {
        let mut slots: [Option<ValidationResult>; 5] = Default::default();

        match self.policy.mode {
            Mode::Permissive => {
                for result in self.run_tiers(&Tier::ALL, doc) {
                    let index = result.tier().index();
                    slots[index] = Some(result);
                }
                self.state = OrchestratorState::Completed;
            }
            Mode::Strict => {
                // phase A: metadata alone, then the gate
                let metadata = validators::validate(Tier::Metadata, doc, self.policy);
                let confidence = metadata.confidence;
                let floor = self.policy.strict_metadata_floor;
                slots[Tier::Metadata.index()] = Some(metadata);

                if u32::from(confidence) < floor {
                    log::info!(
                        "Strict mode aborted: metadata confidence {} is below the floor {}",
                        confidence,
                        floor
                    );
                    self.state = OrchestratorState::Aborted {
                        metadata_confidence: confidence,
                        floor,
                    };
                } else {
                    // phase B
                    for result in self.run_tiers(&Tier::ALL[1..], doc) {
                        let index = result.tier().index();
                        slots[index] = Some(result);
                    }
                    self.state = OrchestratorState::Completed;
                }
            }
        }

        let state = self.state;
        let results = std::array::from_fn(|i| {
            slots[i].take().unwrap_or_else(|| placeholder(Tier::ALL[i], state))
        });
        TierRun { results, state }
    }

    fn run_tiers(&self, tiers: &[Tier], doc: &ScoreDocument) -> Vec<ValidationResult> {
        let policy = self.policy;
        if policy.parallel {
            tiers
                .par_iter()
                .map(|&tier| validators::validate(tier, doc, policy))
                .collect()
        } else {
            tiers
                .iter()
                .map(|&tier| validators::validate(tier, doc, policy))
                .collect()
        }
    }
}

fn placeholder(tier: Tier, state: OrchestratorState) -> ValidationResult {
    let reason = match state {
        OrchestratorState::Aborted {
            metadata_confidence,
            floor,
        } => format!(
            "not evaluated: metadata confidence {} is below the strict floor {}",
            metadata_confidence, floor
        ),
        _ => "not evaluated".to_string(),
    };
    ValidationResult::placeholder(tier, reason)
}
