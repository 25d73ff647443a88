//! Priority validators
//!
//! One validator per tier, each a pure function of the document (and the
//! policy, for configurable ranges). Validators never mutate the document and
//! never call each other, so they can run in any order or in parallel.
//!
//! Priority order: metadata > clefs > time signatures > tempos > notes.

pub mod clefs;
pub mod metadata;
pub mod notes;
pub mod tempos;
pub mod time_signatures;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::{ClefSign, ScoreDocument};
use crate::policy::Policy;

/// The five fixed priority tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Tier {
    Metadata,
    Clefs,
    TimeSignatures,
    Tempos,
    Notes,
}

impl Tier {
    /// All tiers in priority (and report) order
    pub const ALL: [Tier; 5] = [
        Tier::Metadata,
        Tier::Clefs,
        Tier::TimeSignatures,
        Tier::Tempos,
        Tier::Notes,
    ];

    /// 0-based position in the report
    pub fn index(self) -> usize {
        match self {
            Tier::Metadata => 0,
            Tier::Clefs => 1,
            Tier::TimeSignatures => 2,
            Tier::Tempos => 3,
            Tier::Notes => 4,
        }
    }

    /// 1-based priority rank
    pub fn rank(self) -> usize {
        self.index() + 1
    }

    pub fn name(self) -> &'static str {
        match self {
            Tier::Metadata => "metadata",
            Tier::Clefs => "clefs",
            Tier::TimeSignatures => "timeSignatures",
            Tier::Tempos => "tempos",
            Tier::Notes => "notes",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Tier-specific findings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Detected {
    Metadata {
        title: String,
        composer: Option<String>,
        instruments: Vec<String>,
    },
    Clefs {
        count: usize,
        types: Vec<ClefSign>,
    },
    TimeSignatures {
        signatures: Vec<String>,
    },
    Tempos {
        markings: Vec<String>,
    },
    Notes {
        count: usize,
        rests: usize,
    },
    /// Placeholder for a tier a strict run never reached
    NotEvaluated,
}

/// Outcome of one tier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub tier_name: Tier,
    /// Always within 0..=100
    pub confidence: u8,
    pub detected: Detected,
    pub issues: Vec<String>,
    /// A default was substituted because no signal was found
    pub used_fallback: bool,
}

impl ValidationResult {
    pub fn new(tier: Tier, confidence: i32, detected: Detected) -> Self {
        Self {
            tier_name: tier,
            confidence: clamp_confidence(confidence),
            detected,
            issues: Vec::new(),
            used_fallback: false,
        }
    }

    /// Zero-confidence stand-in for a tier that was not evaluated
    pub fn placeholder(tier: Tier, reason: impl Into<String>) -> Self {
        Self {
            tier_name: tier,
            confidence: 0,
            detected: Detected::NotEvaluated,
            issues: vec![reason.into()],
            used_fallback: true,
        }
    }

    pub fn with_issues(mut self, issues: Vec<String>) -> Self {
        self.issues = issues;
        self
    }

    pub fn with_fallback(mut self, used_fallback: bool) -> Self {
        self.used_fallback = used_fallback;
        self
    }

    pub fn tier(&self) -> Tier {
        self.tier_name
    }

    pub fn is_placeholder(&self) -> bool {
        self.detected == Detected::NotEvaluated
    }
}

/// Floor at 0, cap at 100
pub fn clamp_confidence(score: i32) -> u8 {
    score.clamp(0, 100) as u8
}

/// Run the validator for one tier
pub fn validate(tier: Tier, doc: &ScoreDocument, policy: &Policy) -> ValidationResult {
    match tier {
        Tier::Metadata => metadata::validate(doc),
        Tier::Clefs => clefs::validate(doc),
        Tier::TimeSignatures => time_signatures::validate(doc),
        Tier::Tempos => tempos::validate(doc),
        Tier::Notes => notes::validate(doc, &policy.note_range),
    }
}
